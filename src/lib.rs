//! Epiflux - Dashboard analytics for pediatric epilepsy monitoring
//!
//! Epiflux correlates caregiver-logged seizures and medication doses with
//! biomarkers derived from two mini-games through a deterministic pipeline:
//! backend rows → domain records → metrics and timeline → dashboard snapshot.
//!
//! ## Modules
//!
//! - **Pipeline**: crisis-impact ratio, medication adherence, cognitive
//!   stability score, descriptive statistics and the merged timeline
//! - **Refresh**: scheduled single-flight re-fetch of the four collections
//! - **Presentation**: gauges, KPI cards and chart series for the dashboard

pub mod config;
pub mod error;
pub mod metrics;
pub mod pipeline;
pub mod presentation;
pub mod refresh;
pub mod rounds;
pub mod schema;
pub mod stats;
pub mod storage;
pub mod time;
pub mod timeline;
pub mod types;

#[cfg(feature = "http")]
pub mod http;

// FFI bindings for C interop (always available for cdylib/staticlib builds)
pub mod ffi;

pub use config::PipelineConfig;
pub use error::{ComputeError, FetchError};
pub use pipeline::{analyze, compute_metrics, dashboard_from_json, DashboardProcessor};
pub use presentation::DashboardView;
pub use refresh::{DashboardRefresher, DataSource, RefreshOutcome, RefreshState};

// Schema exports
pub use schema::{RowAdapter, RowBundle, SCHEMA_VERSION};

#[cfg(feature = "http")]
pub use http::HttpDataSource;

/// Epiflux version embedded in every snapshot
pub const EPIFLUX_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Producer name for snapshots
pub const PRODUCER_NAME: &str = "epiflux";
