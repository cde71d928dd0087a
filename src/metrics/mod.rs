//! Metric calculators
//!
//! Four independent, total functions over the current batch:
//! - Crisis-impact ratio (seizure trend between two adjacent windows)
//! - Medication adherence over the trailing window
//! - Cognitive stability score from both games
//! - Descriptive statistics bundle

pub mod adherence;
pub mod descriptive;
pub mod impact;
pub mod stability;

pub use adherence::medication_adherence;
pub use descriptive::descriptive_stats;
pub use impact::crisis_impact_ratio;
pub use stability::{stability_breakdown, stability_score, StabilityBreakdown};
