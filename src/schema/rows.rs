//! epiflux.rows.v1 schema definition
//!
//! Row shapes as served by the history endpoints of the backend. Field names
//! follow the relational tables (`crise_history`, `drug_history`,
//! `flash_pop_history`, `noise_game_history`).

use crate::types::{CognitiveSession, MedicationEvent, MotorSession, SeizureEvent};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Current schema version
pub const SCHEMA_VERSION: &str = "epiflux.rows.v1";

/// A `crise_history` row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CriseRow {
    pub id: i64,
    /// Seizure duration (seconds)
    pub duration: f64,
    pub created_at: String,
}

/// A `drug_history` row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DrugRow {
    pub id: i64,
    pub name: String,
    pub created_at: String,
}

/// A `flash_pop_history` row (reaction/inhibition game)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlashPopRow {
    pub id: i64,
    /// Mean reaction time (ms)
    pub mrt: f64,
    pub inhibition_rate: f64,
    /// Reaction-time variability (ms)
    pub iiv_score: f64,
    pub created_at: String,
}

/// A `noise_game_history` row (voice-controlled platformer)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NoiseGameRow {
    pub id: i64,
    pub vocal_initention_latence: f64,
    pub motrice_planification: f64,
    pub created_at: String,
}

/// The four history collections in one document
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RowBundle {
    #[serde(default, alias = "crise_history")]
    pub seizures: Vec<CriseRow>,
    #[serde(default, alias = "drug_history")]
    pub medications: Vec<DrugRow>,
    #[serde(default, alias = "flash_pop_history")]
    pub cognitive_sessions: Vec<FlashPopRow>,
    #[serde(default, alias = "noise_game_history")]
    pub motor_sessions: Vec<NoiseGameRow>,
}

impl RowBundle {
    pub fn total_rows(&self) -> usize {
        self.seizures.len()
            + self.medications.len()
            + self.cognitive_sessions.len()
            + self.motor_sessions.len()
    }
}

/// Problem found in a single row
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RowIssue {
    #[error("Invalid timestamp '{value}': {reason}")]
    InvalidTimestamp { value: String, reason: String },

    #[error("Field {field} is not a finite number")]
    NonFinite { field: &'static str },

    #[error("Field {field} out of range ({value}); it will be clamped")]
    OutOfRange { field: &'static str, value: f64 },
}

impl RowIssue {
    /// Fatal issues cause the row to be skipped; others are corrected
    pub fn is_fatal(&self) -> bool {
        !matches!(self, RowIssue::OutOfRange { .. })
    }
}

/// Common behaviour of backend rows
pub trait BackendRow {
    /// Domain record produced from the row
    type Record;

    /// Resource name, as used in the REST path
    const RESOURCE: &'static str;

    fn id(&self) -> i64;

    fn created_at(&self) -> &str;

    /// Issues with the row's values, excluding the timestamp
    fn value_issues(&self) -> Vec<RowIssue>;

    /// Build the domain record, correcting non-fatal issues
    fn to_record(&self, occurred_at: DateTime<Utc>) -> Self::Record;
}

fn check_finite(field: &'static str, value: f64, issues: &mut Vec<RowIssue>) {
    if !value.is_finite() {
        issues.push(RowIssue::NonFinite { field });
    }
}

fn check_non_negative(field: &'static str, value: f64, issues: &mut Vec<RowIssue>) {
    if value.is_finite() && value < 0.0 {
        issues.push(RowIssue::OutOfRange { field, value });
    }
}

impl BackendRow for CriseRow {
    type Record = SeizureEvent;
    const RESOURCE: &'static str = "crise-history";

    fn id(&self) -> i64 {
        self.id
    }

    fn created_at(&self) -> &str {
        &self.created_at
    }

    fn value_issues(&self) -> Vec<RowIssue> {
        let mut issues = Vec::new();
        check_finite("duration", self.duration, &mut issues);
        check_non_negative("duration", self.duration, &mut issues);
        issues
    }

    fn to_record(&self, occurred_at: DateTime<Utc>) -> SeizureEvent {
        SeizureEvent {
            id: self.id,
            duration_seconds: self.duration.max(0.0),
            occurred_at,
        }
    }
}

impl BackendRow for DrugRow {
    type Record = MedicationEvent;
    const RESOURCE: &'static str = "drug-history";

    fn id(&self) -> i64 {
        self.id
    }

    fn created_at(&self) -> &str {
        &self.created_at
    }

    fn value_issues(&self) -> Vec<RowIssue> {
        Vec::new()
    }

    fn to_record(&self, occurred_at: DateTime<Utc>) -> MedicationEvent {
        MedicationEvent {
            id: self.id,
            name: self.name.trim().to_string(),
            occurred_at,
        }
    }
}

impl BackendRow for FlashPopRow {
    type Record = CognitiveSession;
    const RESOURCE: &'static str = "flash-pop-history";

    fn id(&self) -> i64 {
        self.id
    }

    fn created_at(&self) -> &str {
        &self.created_at
    }

    fn value_issues(&self) -> Vec<RowIssue> {
        let mut issues = Vec::new();
        check_finite("mrt", self.mrt, &mut issues);
        check_finite("inhibition_rate", self.inhibition_rate, &mut issues);
        check_finite("iiv_score", self.iiv_score, &mut issues);
        check_non_negative("mrt", self.mrt, &mut issues);
        check_non_negative("iiv_score", self.iiv_score, &mut issues);
        if self.inhibition_rate.is_finite() && !(0.0..=1.0).contains(&self.inhibition_rate) {
            issues.push(RowIssue::OutOfRange {
                field: "inhibition_rate",
                value: self.inhibition_rate,
            });
        }
        issues
    }

    fn to_record(&self, occurred_at: DateTime<Utc>) -> CognitiveSession {
        CognitiveSession {
            id: self.id,
            mean_reaction_time_ms: self.mrt.max(0.0),
            inhibition_rate: self.inhibition_rate.clamp(0.0, 1.0),
            reaction_time_variability_ms: self.iiv_score.max(0.0),
            occurred_at,
        }
    }
}

impl BackendRow for NoiseGameRow {
    type Record = MotorSession;
    const RESOURCE: &'static str = "noise-game-history";

    fn id(&self) -> i64 {
        self.id
    }

    fn created_at(&self) -> &str {
        &self.created_at
    }

    fn value_issues(&self) -> Vec<RowIssue> {
        let mut issues = Vec::new();
        check_finite("vocal_initention_latence", self.vocal_initention_latence, &mut issues);
        check_finite("motrice_planification", self.motrice_planification, &mut issues);
        check_non_negative("vocal_initention_latence", self.vocal_initention_latence, &mut issues);
        check_non_negative("motrice_planification", self.motrice_planification, &mut issues);
        issues
    }

    fn to_record(&self, occurred_at: DateTime<Utc>) -> MotorSession {
        MotorSession {
            id: self.id,
            vocal_intention_latency_ms: self.vocal_initention_latence.max(0.0),
            motor_planning_ms: self.motrice_planification.max(0.0),
            occurred_at,
        }
    }
}
