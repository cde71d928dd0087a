//! Pipeline configuration
//!
//! Every tunable constant of the pipeline lives here so that callers can
//! persist a profile through the storage port instead of relying on globals.

use crate::error::ComputeError;
use crate::storage::KeyValueStore;
use chrono::Duration;
use serde::{Deserialize, Serialize};

/// Storage key under which the configuration is persisted
pub const CONFIG_STORAGE_KEY: &str = "pipeline_config";

/// Default expected doses per week (two per day)
pub const DEFAULT_WEEKLY_DOSE_TARGET: u32 = 14;

/// Default length of the trend/adherence window in days
pub const DEFAULT_TREND_WINDOW_DAYS: u32 = 7;

/// Default half-width of the proximity window around a game session (minutes)
pub const DEFAULT_PROXIMITY_WINDOW_MINUTES: u32 = 30;

/// Default number of recent sessions kept per game for the stability score
pub const DEFAULT_RECENT_SESSIONS: usize = 5;

/// Default polling period for the refresher (seconds)
pub const DEFAULT_REFRESH_INTERVAL_SECS: u64 = 15;

/// Which sessions feed the stability score
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum StabilityPolicy {
    /// Only the most recent `sessions` of each game
    RecentWindow { sessions: usize },
    /// Every session ever recorded
    AllTime,
}

impl Default for StabilityPolicy {
    fn default() -> Self {
        StabilityPolicy::RecentWindow {
            sessions: DEFAULT_RECENT_SESSIONS,
        }
    }
}

/// Constants of the stability sub-scores
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StabilityTuning {
    /// Reaction-time variability at which the IIV sub-score reaches 0 (ms)
    pub variability_ceiling_ms: f64,
    /// Motor planning time scoring 100 (ms)
    pub motor_optimum_ms: f64,
    /// Milliseconds of distance from the optimum costing one point
    pub motor_slope_ms_per_point: f64,
    pub iiv_weight: f64,
    pub motor_weight: f64,
}

impl Default for StabilityTuning {
    fn default() -> Self {
        Self {
            variability_ceiling_ms: 300.0,
            motor_optimum_ms: 400.0,
            motor_slope_ms_per_point: 8.0,
            iiv_weight: 0.5,
            motor_weight: 0.5,
        }
    }
}

/// How the timeline is constructed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimelinePolicy {
    /// One point per game session plus standalone treatment events
    #[default]
    PerSession,
    /// One point per calendar day
    PerDay,
}

/// Whether standalone medication/seizure points absorb nearby standalone events
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StandaloneMerge {
    /// Every unattributed event gets its own point
    #[default]
    Never,
    /// An unattributed event joins an already-placed standalone point within the window
    NearbyPoint,
}

/// Complete pipeline configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub weekly_dose_target: u32,
    pub trend_window_days: u32,
    pub proximity_window_minutes: u32,
    pub stability: StabilityPolicy,
    pub stability_tuning: StabilityTuning,
    pub timeline: TimelinePolicy,
    pub standalone_merge: StandaloneMerge,
    /// Offset from UTC used for labels and day buckets (minutes)
    pub day_offset_minutes: i32,
    pub refresh_interval_secs: u64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            weekly_dose_target: DEFAULT_WEEKLY_DOSE_TARGET,
            trend_window_days: DEFAULT_TREND_WINDOW_DAYS,
            proximity_window_minutes: DEFAULT_PROXIMITY_WINDOW_MINUTES,
            stability: StabilityPolicy::default(),
            stability_tuning: StabilityTuning::default(),
            timeline: TimelinePolicy::default(),
            standalone_merge: StandaloneMerge::default(),
            day_offset_minutes: 0,
            refresh_interval_secs: DEFAULT_REFRESH_INTERVAL_SECS,
        }
    }
}

impl PipelineConfig {
    /// Trend/adherence window as a duration
    pub fn trend_window(&self) -> Duration {
        Duration::days(i64::from(self.trend_window_days))
    }

    /// Proximity half-window as a duration
    pub fn proximity_window(&self) -> Duration {
        Duration::minutes(i64::from(self.proximity_window_minutes))
    }

    /// Refresh period for the polling task
    pub fn refresh_interval(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.refresh_interval_secs)
    }

    /// Check that every value is usable
    pub fn validate(&self) -> Result<(), ComputeError> {
        if self.trend_window_days == 0 || self.trend_window_days > 3650 {
            return Err(ComputeError::InvalidConfig(format!(
                "trend_window_days must be between 1 and 3650, got {}",
                self.trend_window_days
            )));
        }
        if self.proximity_window_minutes == 0 {
            return Err(ComputeError::InvalidConfig(
                "proximity_window_minutes must be positive".to_string(),
            ));
        }
        if self.refresh_interval_secs == 0 {
            return Err(ComputeError::InvalidConfig(
                "refresh_interval_secs must be positive".to_string(),
            ));
        }
        if let StabilityPolicy::RecentWindow { sessions: 0 } = self.stability {
            return Err(ComputeError::InvalidConfig(
                "recent stability window must keep at least one session".to_string(),
            ));
        }
        if self.day_offset_minutes.unsigned_abs() >= 24 * 60 {
            return Err(ComputeError::InvalidConfig(format!(
                "day_offset_minutes out of range: {}",
                self.day_offset_minutes
            )));
        }

        let tuning = &self.stability_tuning;
        if tuning.variability_ceiling_ms.is_nan() || tuning.variability_ceiling_ms <= 0.0 {
            return Err(ComputeError::InvalidConfig(
                "variability_ceiling_ms must be positive".to_string(),
            ));
        }
        if tuning.motor_slope_ms_per_point.is_nan() || tuning.motor_slope_ms_per_point <= 0.0 {
            return Err(ComputeError::InvalidConfig(
                "motor_slope_ms_per_point must be positive".to_string(),
            ));
        }
        if tuning.iiv_weight < 0.0
            || tuning.motor_weight < 0.0
            || ((tuning.iiv_weight + tuning.motor_weight) - 1.0).abs() > 1e-9
        {
            return Err(ComputeError::InvalidConfig(format!(
                "stability weights must be non-negative and sum to 1 (got {} + {})",
                tuning.iiv_weight, tuning.motor_weight
            )));
        }
        Ok(())
    }

    /// Parse and validate a configuration document
    pub fn from_json(json: &str) -> Result<Self, ComputeError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_json(&self) -> Result<String, ComputeError> {
        serde_json::to_string_pretty(self).map_err(|e| ComputeError::EncodingError(e.to_string()))
    }

    /// Load the persisted configuration, falling back to defaults when none is stored
    pub fn load(store: &dyn KeyValueStore) -> Result<Self, ComputeError> {
        match store.get(CONFIG_STORAGE_KEY)? {
            Some(json) => Self::from_json(&json),
            None => Ok(Self::default()),
        }
    }

    /// Persist the configuration after validating it
    pub fn save(&self, store: &mut dyn KeyValueStore) -> Result<(), ComputeError> {
        self.validate()?;
        store.set(CONFIG_STORAGE_KEY, &self.to_json()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_defaults_are_valid() {
        let config = PipelineConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.trend_window(), Duration::days(7));
        assert_eq!(config.proximity_window(), Duration::minutes(30));
        assert_eq!(
            config.stability,
            StabilityPolicy::RecentWindow { sessions: 5 }
        );
    }

    #[test]
    fn test_partial_document_fills_defaults() {
        let config = PipelineConfig::from_json(
            r#"{ "weekly_dose_target": 21, "stability": { "mode": "all_time" }, "timeline": "per_day" }"#,
        )
        .unwrap();

        assert_eq!(config.weekly_dose_target, 21);
        assert_eq!(config.stability, StabilityPolicy::AllTime);
        assert_eq!(config.timeline, TimelinePolicy::PerDay);
        assert_eq!(config.proximity_window_minutes, 30);
        assert_eq!(config.stability_tuning, StabilityTuning::default());
    }

    #[test]
    fn test_rejects_invalid_values() {
        let cases = [
            r#"{ "trend_window_days": 0 }"#,
            r#"{ "refresh_interval_secs": 0 }"#,
            r#"{ "proximity_window_minutes": 0 }"#,
            r#"{ "stability": { "mode": "recent_window", "sessions": 0 } }"#,
            r#"{ "stability_tuning": { "iiv_weight": 0.7, "motor_weight": 0.7 } }"#,
            r#"{ "stability_tuning": { "variability_ceiling_ms": 0.0 } }"#,
            r#"{ "day_offset_minutes": 1440 }"#,
        ];
        for case in cases {
            assert!(
                matches!(
                    PipelineConfig::from_json(case),
                    Err(ComputeError::InvalidConfig(_))
                ),
                "expected rejection for {case}"
            );
        }
    }

    #[test]
    fn test_storage_round_trip() {
        let mut store = MemoryStore::default();
        assert_eq!(PipelineConfig::load(&store).unwrap(), PipelineConfig::default());

        let config = PipelineConfig {
            weekly_dose_target: 7,
            standalone_merge: StandaloneMerge::NearbyPoint,
            day_offset_minutes: 120,
            ..Default::default()
        };
        config.save(&mut store).unwrap();

        assert_eq!(PipelineConfig::load(&store).unwrap(), config);
    }

    #[test]
    fn test_save_refuses_invalid_config() {
        let mut store = MemoryStore::default();
        let config = PipelineConfig {
            refresh_interval_secs: 0,
            ..Default::default()
        };
        assert!(config.save(&mut store).is_err());
        assert!(store.get(CONFIG_STORAGE_KEY).unwrap().is_none());
    }
}
