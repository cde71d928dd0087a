//! Game-round summarisation
//!
//! The games report raw trials; these helpers reduce one completed round to
//! the per-session metrics the pipeline consumes.
//! - Reaction/inhibition game: MRT, IIV (population std-dev of reaction
//!   times) and inhibition rate
//! - Voice platformer: mean vocal intention latency and mean airborne time
//!   per jump as the motor planning proxy

use crate::error::ComputeError;
use crate::stats::{clamp, mean, population_std_dev};
use crate::types::{CognitiveSession, MotorSession};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Raw trials from one round of the reaction/inhibition game
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CognitiveRound {
    /// Reaction time of every correct hit (ms)
    pub reaction_times_ms: Vec<f64>,
    /// Distractor targets shown during the round
    pub distractors_shown: u32,
    /// Distractor targets the child correctly left alone
    pub distractors_avoided: u32,
}

impl CognitiveRound {
    /// Summarise the round
    pub fn summarize(&self, id: i64, finished_at: DateTime<Utc>) -> Result<CognitiveSession, ComputeError> {
        let reaction_times = finite(&self.reaction_times_ms);
        if reaction_times.is_empty() {
            return Err(ComputeError::InsufficientTrials(
                "cognitive round has no valid reaction times".to_string(),
            ));
        }

        let inhibition_rate = if self.distractors_shown == 0 {
            1.0
        } else {
            clamp(
                f64::from(self.distractors_avoided) / f64::from(self.distractors_shown),
                0.0,
                1.0,
            )
        };

        Ok(CognitiveSession {
            id,
            mean_reaction_time_ms: mean(&reaction_times),
            inhibition_rate,
            reaction_time_variability_ms: population_std_dev(&reaction_times),
            occurred_at: finished_at,
        })
    }
}

/// Raw trials from one round of the voice-controlled platformer
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MotorRound {
    /// Delay between each prompt and the vocal onset (ms)
    pub vocal_latencies_ms: Vec<f64>,
    /// Airborne duration of every jump (ms)
    pub airborne_durations_ms: Vec<f64>,
}

impl MotorRound {
    /// Summarise the round
    pub fn summarize(&self, id: i64, finished_at: DateTime<Utc>) -> Result<MotorSession, ComputeError> {
        let latencies = finite(&self.vocal_latencies_ms);
        let jumps = finite(&self.airborne_durations_ms);
        if jumps.is_empty() {
            return Err(ComputeError::InsufficientTrials(
                "motor round has no completed jumps".to_string(),
            ));
        }
        if latencies.is_empty() {
            return Err(ComputeError::InsufficientTrials(
                "motor round has no vocal onsets".to_string(),
            ));
        }

        Ok(MotorSession {
            id,
            vocal_intention_latency_ms: mean(&latencies),
            motor_planning_ms: mean(&jumps),
            occurred_at: finished_at,
        })
    }
}

fn finite(values: &[f64]) -> Vec<f64> {
    values
        .iter()
        .copied()
        .filter(|v| v.is_finite() && *v >= 0.0)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use pretty_assertions::assert_eq;

    fn finished() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 4, 15, 0, 0).unwrap()
    }

    #[test]
    fn test_cognitive_round_summary() {
        let round = CognitiveRound {
            reaction_times_ms: vec![400.0, 500.0, 600.0, 500.0],
            distractors_shown: 5,
            distractors_avoided: 4,
        };
        let session = round.summarize(12, finished()).unwrap();

        assert_eq!(session.id, 12);
        assert_eq!(session.mean_reaction_time_ms, 500.0);
        assert!((session.reaction_time_variability_ms - 50.0_f64.sqrt() * 10.0).abs() < 1e-9);
        assert_eq!(session.inhibition_rate, 0.8);
        assert_eq!(session.occurred_at, finished());
    }

    #[test]
    fn test_no_distractors_means_full_inhibition() {
        let round = CognitiveRound {
            reaction_times_ms: vec![450.0],
            ..Default::default()
        };
        let session = round.summarize(1, finished()).unwrap();
        assert_eq!(session.inhibition_rate, 1.0);
        assert_eq!(session.reaction_time_variability_ms, 0.0);
    }

    #[test]
    fn test_empty_rounds_are_rejected() {
        assert!(matches!(
            CognitiveRound::default().summarize(1, finished()),
            Err(ComputeError::InsufficientTrials(_))
        ));

        let no_jumps = MotorRound {
            vocal_latencies_ms: vec![500.0],
            airborne_durations_ms: vec![f64::NAN],
        };
        assert!(no_jumps.summarize(1, finished()).is_err());
    }

    #[test]
    fn test_motor_round_summary() {
        let round = MotorRound {
            vocal_latencies_ms: vec![600.0, 800.0],
            airborne_durations_ms: vec![380.0, 420.0, 400.0],
        };
        let session = round.summarize(3, finished()).unwrap();
        assert_eq!(session.vocal_intention_latency_ms, 700.0);
        assert_eq!(session.motor_planning_ms, 400.0);
    }
}
