//! Cognitive stability score
//!
//! Combines two sub-scores on a 0-100 scale:
//! - IIV: reaction-time variability from the reaction/inhibition game, 0 ms is
//!   perfect and the configured ceiling (300 ms) or more scores 0
//! - Motor: distance of the mean motor-planning time from the optimum (400 ms),
//!   losing one point per configured slope (8 ms) in either direction
//!
//! Under [`StabilityPolicy::RecentWindow`] only the most recent sessions of each
//! game are used so that old data does not dilute a recent trend.

use crate::config::{StabilityPolicy, StabilityTuning};
use crate::stats::{clamp, mean};
use crate::types::{CognitiveSession, MotorSession};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Sub-scores and final score, for display and diagnostics
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StabilityBreakdown {
    /// IIV sub-score (0-100), when cognitive sessions are available
    pub iiv: Option<f64>,
    /// Motor sub-score (0-100), when motor sessions are available
    pub motor: Option<f64>,
    pub score: u8,
}

/// Stability score in `[0, 100]`; 0 when neither game has sessions
pub fn stability_score(
    cognitive: &[CognitiveSession],
    motor: &[MotorSession],
    policy: StabilityPolicy,
    tuning: &StabilityTuning,
) -> u8 {
    stability_breakdown(cognitive, motor, policy, tuning).score
}

pub fn stability_breakdown(
    cognitive: &[CognitiveSession],
    motor: &[MotorSession],
    policy: StabilityPolicy,
    tuning: &StabilityTuning,
) -> StabilityBreakdown {
    let cognitive = select_sessions(cognitive, policy, |s| (s.occurred_at, s.id));
    let motor = select_sessions(motor, policy, |s| (s.occurred_at, s.id));

    let iiv = (!cognitive.is_empty()).then(|| {
        let variability: Vec<f64> = cognitive
            .iter()
            .map(|s| s.reaction_time_variability_ms)
            .collect();
        iiv_sub_score(mean(&variability), tuning)
    });

    let motor_score = (!motor.is_empty()).then(|| {
        let planning: Vec<f64> = motor.iter().map(|s| s.motor_planning_ms).collect();
        motor_sub_score(mean(&planning), tuning)
    });

    let combined = match (iiv, motor_score) {
        (Some(i), Some(m)) => tuning.iiv_weight * i + tuning.motor_weight * m,
        (Some(i), None) => i,
        (None, Some(m)) => m,
        (None, None) => 0.0,
    };

    StabilityBreakdown {
        iiv,
        motor: motor_score,
        score: clamp(combined.round(), 0.0, 100.0) as u8,
    }
}

/// Linear rescale of mean variability from `[0, ceiling]` onto `[100, 0]`
pub fn iiv_sub_score(mean_variability_ms: f64, tuning: &StabilityTuning) -> f64 {
    clamp(
        100.0 - mean_variability_ms / tuning.variability_ceiling_ms * 100.0,
        0.0,
        100.0,
    )
}

/// Penalise distance of the mean planning time from the optimum
pub fn motor_sub_score(mean_planning_ms: f64, tuning: &StabilityTuning) -> f64 {
    clamp(
        100.0 - (mean_planning_ms - tuning.motor_optimum_ms).abs() / tuning.motor_slope_ms_per_point,
        0.0,
        100.0,
    )
}

/// Sessions feeding the score under `policy`, newest first for the recent window
fn select_sessions<T, F>(sessions: &[T], policy: StabilityPolicy, key: F) -> Vec<&T>
where
    F: Fn(&T) -> (DateTime<Utc>, i64),
{
    let mut selected: Vec<&T> = sessions.iter().collect();
    if let StabilityPolicy::RecentWindow { sessions: keep } = policy {
        selected.sort_by(|a, b| key(b).cmp(&key(a)));
        selected.truncate(keep);
    }
    selected
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use pretty_assertions::assert_eq;

    fn base() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 9, 0, 0).unwrap()
    }

    fn cognitive(variability: &[f64]) -> Vec<CognitiveSession> {
        variability
            .iter()
            .enumerate()
            .map(|(i, v)| CognitiveSession {
                id: i as i64,
                mean_reaction_time_ms: 450.0,
                inhibition_rate: 0.8,
                reaction_time_variability_ms: *v,
                occurred_at: base() + Duration::hours(i as i64),
            })
            .collect()
    }

    fn motor(planning: &[f64]) -> Vec<MotorSession> {
        planning
            .iter()
            .enumerate()
            .map(|(i, p)| MotorSession {
                id: i as i64,
                vocal_intention_latency_ms: 600.0,
                motor_planning_ms: *p,
                occurred_at: base() + Duration::hours(i as i64),
            })
            .collect()
    }

    fn all_time(c: &[CognitiveSession], m: &[MotorSession]) -> StabilityBreakdown {
        stability_breakdown(c, m, StabilityPolicy::AllTime, &StabilityTuning::default())
    }

    #[test]
    fn test_no_sessions_scores_zero() {
        let breakdown = all_time(&[], &[]);
        assert_eq!(
            breakdown,
            StabilityBreakdown {
                iiv: None,
                motor: None,
                score: 0
            }
        );
        assert_eq!(
            stability_score(&[], &[], StabilityPolicy::default(), &StabilityTuning::default()),
            0
        );
    }

    #[test]
    fn test_zero_variability_is_perfect() {
        let breakdown = all_time(&cognitive(&[0.0, 0.0]), &[]);
        assert_eq!(breakdown.iiv, Some(100.0));
        assert_eq!(breakdown.score, 100);
    }

    #[test]
    fn test_iiv_rescaling_and_clamp() {
        let tuning = StabilityTuning::default();
        assert_eq!(iiv_sub_score(150.0, &tuning), 50.0);
        assert_eq!(iiv_sub_score(300.0, &tuning), 0.0);
        assert_eq!(iiv_sub_score(900.0, &tuning), 0.0);
    }

    #[test]
    fn test_motor_distance_is_symmetric() {
        let tuning = StabilityTuning::default();
        assert_eq!(motor_sub_score(400.0, &tuning), 100.0);
        assert_eq!(motor_sub_score(480.0, &tuning), 90.0);
        assert_eq!(motor_sub_score(320.0, &tuning), 90.0);
        assert_eq!(motor_sub_score(2000.0, &tuning), 0.0);
    }

    #[test]
    fn test_weighted_average_is_rounded() {
        // iiv = 100 - 100/300*100 = 66.67, motor = 100 - 100/8 = 87.5
        let breakdown = all_time(&cognitive(&[100.0]), &motor(&[500.0]));
        assert_eq!(breakdown.score, 77);
    }

    #[test]
    fn test_only_motor_is_used_directly() {
        let breakdown = all_time(&[], &motor(&[404.0]));
        assert_eq!(breakdown.motor, Some(99.5));
        assert_eq!(breakdown.score, 100);
    }

    #[test]
    fn test_recent_window_ignores_old_sessions() {
        // Five old sessions with poor variability, five recent perfect ones
        let sessions = cognitive(&[300.0, 300.0, 300.0, 300.0, 300.0, 0.0, 0.0, 0.0, 0.0, 0.0]);
        let tuning = StabilityTuning::default();

        let recent = stability_score(
            &sessions,
            &[],
            StabilityPolicy::RecentWindow { sessions: 5 },
            &tuning,
        );
        let all = stability_score(&sessions, &[], StabilityPolicy::AllTime, &tuning);

        assert_eq!(recent, 100);
        assert_eq!(all, 50);
    }

    #[test]
    fn test_recent_window_is_order_independent() {
        let mut sessions = cognitive(&[250.0, 10.0, 20.0, 30.0]);
        let policy = StabilityPolicy::RecentWindow { sessions: 3 };
        let tuning = StabilityTuning::default();
        let forward = stability_score(&sessions, &[], policy, &tuning);
        sessions.reverse();
        assert_eq!(stability_score(&sessions, &[], policy, &tuning), forward);
        assert_eq!(forward, 93);
    }
}
