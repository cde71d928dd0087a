//! Pipeline orchestration
//!
//! This module provides the public API for Epiflux. A run is a pure function of
//! the four input collections, the reference time and the configuration:
//! metrics and timeline are recomputed from scratch on every batch.

use crate::config::PipelineConfig;
use crate::error::ComputeError;
use crate::metrics::{
    crisis_impact_ratio, descriptive_stats, medication_adherence, stability_score,
};
use crate::schema::RowAdapter;
use crate::timeline;
use crate::types::{
    DashboardMetrics, DashboardSnapshot, PipelineInputs, Producer, TimelinePoint,
};
use crate::{EPIFLUX_VERSION, PRODUCER_NAME};
use chrono::{DateTime, Utc};
use tracing::debug;
use uuid::Uuid;

/// Compute every dashboard indicator for the batch.
///
/// The statistics bundle needs the timeline; it is built here with the same
/// configuration.
pub fn compute_metrics(
    inputs: &PipelineInputs,
    now: DateTime<Utc>,
    config: &PipelineConfig,
) -> DashboardMetrics {
    let timeline = build_timeline(inputs, config);
    metrics_with_timeline(inputs, &timeline, now, config)
}

/// Build the merged chronological timeline for the batch
pub fn build_timeline(inputs: &PipelineInputs, config: &PipelineConfig) -> Vec<TimelinePoint> {
    timeline::build_timeline(inputs, config)
}

/// Run the full pipeline with a fresh processor identity
pub fn analyze(
    inputs: &PipelineInputs,
    now: DateTime<Utc>,
    config: &PipelineConfig,
) -> DashboardSnapshot {
    DashboardProcessor {
        config: config.clone(),
        instance_id: Uuid::new_v4().to_string(),
    }
    .analyze(inputs, now)
}

fn metrics_with_timeline(
    inputs: &PipelineInputs,
    timeline: &[TimelinePoint],
    now: DateTime<Utc>,
    config: &PipelineConfig,
) -> DashboardMetrics {
    let window = config.trend_window();

    DashboardMetrics {
        impact_ratio: crisis_impact_ratio(&inputs.seizures, now, window),
        adherence: medication_adherence(
            &inputs.medications,
            now,
            window,
            config.weekly_dose_target,
        ),
        stability: stability_score(
            &inputs.cognitive_sessions,
            &inputs.motor_sessions,
            config.stability,
            &config.stability_tuning,
        ),
        stats: descriptive_stats(inputs, timeline),
    }
}

/// Convert a backend row bundle to a dashboard snapshot JSON (stateless, one-shot).
///
/// # Arguments
/// * `bundle_json` - JSON document with `seizures`, `medications`,
///   `cognitive_sessions` and `motor_sessions` row arrays
/// * `now` - Reference time for the trailing windows
///
/// # Example
/// ```ignore
/// let snapshot_json = dashboard_from_json(&bundle_json, Utc::now())?;
/// ```
pub fn dashboard_from_json(bundle_json: &str, now: DateTime<Utc>) -> Result<String, ComputeError> {
    let bundle = RowAdapter::parse_bundle(bundle_json)?;
    let inputs = RowAdapter::to_inputs(&bundle);
    let processor = DashboardProcessor::new();
    processor.to_json(&processor.analyze(&inputs, now))
}

/// Configured processor producing dashboard snapshots.
///
/// Holds no data between runs; only the configuration and a producer identity.
#[derive(Debug, Clone)]
pub struct DashboardProcessor {
    config: PipelineConfig,
    instance_id: String,
}

impl Default for DashboardProcessor {
    fn default() -> Self {
        Self::new()
    }
}

impl DashboardProcessor {
    /// Create a processor with the default configuration
    pub fn new() -> Self {
        Self {
            config: PipelineConfig::default(),
            instance_id: Uuid::new_v4().to_string(),
        }
    }

    /// Create a processor with a validated configuration
    pub fn with_config(config: PipelineConfig) -> Result<Self, ComputeError> {
        config.validate()?;
        Ok(Self {
            config,
            instance_id: Uuid::new_v4().to_string(),
        })
    }

    /// Use a fixed instance id (reproducible output)
    pub fn with_instance_id(mut self, instance_id: impl Into<String>) -> Self {
        self.instance_id = instance_id.into();
        self
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Run the full pipeline on one batch
    pub fn analyze(&self, inputs: &PipelineInputs, now: DateTime<Utc>) -> DashboardSnapshot {
        let timeline = build_timeline(inputs, &self.config);
        let metrics = metrics_with_timeline(inputs, &timeline, now, &self.config);

        debug!(
            seizures = inputs.seizures.len(),
            medications = inputs.medications.len(),
            cognitive_sessions = inputs.cognitive_sessions.len(),
            motor_sessions = inputs.motor_sessions.len(),
            points = timeline.len(),
            stability = metrics.stability,
            "Pipeline run complete"
        );

        DashboardSnapshot {
            producer: Producer {
                name: PRODUCER_NAME.to_string(),
                version: EPIFLUX_VERSION.to_string(),
                instance_id: self.instance_id.clone(),
            },
            computed_at: now,
            metrics,
            timeline,
        }
    }

    /// Run the pipeline on a backend row bundle
    pub fn analyze_rows_json(
        &self,
        bundle_json: &str,
        now: DateTime<Utc>,
    ) -> Result<DashboardSnapshot, ComputeError> {
        let bundle = RowAdapter::parse_bundle(bundle_json)?;
        Ok(self.analyze(&RowAdapter::to_inputs(&bundle), now))
    }

    /// Encode a snapshot to pretty JSON
    pub fn to_json(&self, snapshot: &DashboardSnapshot) -> Result<String, ComputeError> {
        serde_json::to_string_pretty(snapshot).map_err(ComputeError::JsonError)
    }
}
