//! Core types for the Epiflux pipeline
//!
//! This module defines the data structures that flow through the pipeline:
//! the four input record kinds, the session tagged union, and the derived
//! metrics and timeline points consumed by the dashboard.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A logged seizure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeizureEvent {
    pub id: i64,
    /// Seizure duration (seconds)
    pub duration_seconds: f64,
    pub occurred_at: DateTime<Utc>,
}

/// A logged medication dose
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MedicationEvent {
    pub id: i64,
    /// Free-text medication name
    pub name: String,
    pub occurred_at: DateTime<Utc>,
}

/// Metrics from one completed round of the reaction/inhibition game
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CognitiveSession {
    pub id: i64,
    /// Mean reaction time (ms)
    pub mean_reaction_time_ms: f64,
    /// Fraction of distractors correctly avoided (0-1)
    pub inhibition_rate: f64,
    /// Intra-individual variability of reaction times (ms)
    pub reaction_time_variability_ms: f64,
    pub occurred_at: DateTime<Utc>,
}

/// Metrics from one completed round of the voice-controlled platformer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MotorSession {
    pub id: i64,
    /// Delay between prompt and vocal onset (ms)
    pub vocal_intention_latency_ms: f64,
    /// Mean airborne duration per jump (ms)
    pub motor_planning_ms: f64,
    pub occurred_at: DateTime<Utc>,
}

/// Game session metrics, tagged by the game that produced them
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "game", rename_all = "snake_case")]
pub enum SessionMetrics {
    Cognitive(CognitiveSession),
    Motor(MotorSession),
}

impl SessionMetrics {
    pub fn id(&self) -> i64 {
        match self {
            SessionMetrics::Cognitive(s) => s.id,
            SessionMetrics::Motor(s) => s.id,
        }
    }

    pub fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            SessionMetrics::Cognitive(s) => s.occurred_at,
            SessionMetrics::Motor(s) => s.occurred_at,
        }
    }
}

/// The four event collections a pipeline run operates on
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PipelineInputs {
    #[serde(default)]
    pub seizures: Vec<SeizureEvent>,
    #[serde(default)]
    pub medications: Vec<MedicationEvent>,
    #[serde(default)]
    pub cognitive_sessions: Vec<CognitiveSession>,
    #[serde(default)]
    pub motor_sessions: Vec<MotorSession>,
}

impl PipelineInputs {
    /// Total number of records across all four collections
    pub fn total_records(&self) -> usize {
        self.seizures.len()
            + self.medications.len()
            + self.cognitive_sessions.len()
            + self.motor_sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.total_records() == 0
    }

    /// All game sessions as tagged metrics
    pub fn sessions(&self) -> Vec<SessionMetrics> {
        self.cognitive_sessions
            .iter()
            .cloned()
            .map(SessionMetrics::Cognitive)
            .chain(self.motor_sessions.iter().cloned().map(SessionMetrics::Motor))
            .collect()
    }
}

/// Medication adherence over the trailing window
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AdherenceSummary {
    /// Doses logged in the window (may exceed `target`)
    pub count: u32,
    /// Expected doses for the window
    pub target: u32,
    /// Adherence percentage, clamped to 0-100
    pub percent: f64,
}

/// Descriptive statistics over the current batch
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DescriptiveStats {
    pub reaction_time_mean_ms: f64,
    pub reaction_time_std_dev_ms: f64,
    pub motor_planning_mean_ms: f64,
    pub motor_planning_std_dev_ms: f64,
    pub inhibition_rate_mean: f64,
    /// Pearson correlation between nearby medication count and reaction time
    pub medication_reaction_correlation: f64,
    pub total_records: usize,
}

/// All derived dashboard indicators
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DashboardMetrics {
    /// Signed seizure-count change between the two most recent windows (percentage)
    pub impact_ratio: f64,
    pub adherence: AdherenceSummary,
    /// Cognitive stability score (0-100)
    pub stability: u8,
    pub stats: DescriptiveStats,
}

/// What produced a timeline point.
///
/// Declaration order is the tie-break rank for points sharing a timestamp.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PointSource {
    Cognitive,
    Motor,
    Medication,
    Seizure,
    Day,
}

/// One point of the merged chronological timeline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimelinePoint {
    pub timestamp: DateTime<Utc>,
    pub label: String,
    pub source: PointSource,
    /// Mean reaction time (ms), when a cognitive session contributes
    pub cognitive_value: Option<f64>,
    /// Motor planning time (ms), when a motor session contributes
    pub motor_value: Option<f64>,
    pub medication_count: u32,
    pub seizure_count: u32,
}

/// Producer metadata embedded in snapshots
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Producer {
    pub name: String,
    pub version: String,
    pub instance_id: String,
}

/// Complete output of one pipeline run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DashboardSnapshot {
    pub producer: Producer,
    /// The reference time the windows were evaluated against
    pub computed_at: DateTime<Utc>,
    pub metrics: DashboardMetrics,
    pub timeline: Vec<TimelinePoint>,
}
