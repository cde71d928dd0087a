//! Timeline construction
//!
//! Merges the four event collections into one ascending sequence of chart
//! points. Two policies are available:
//!
//! - [`TimelinePolicy::PerSession`]: one point per game session, each counting
//!   the treatment events within the symmetric proximity window. Treatment
//!   events near no session become standalone points.
//! - [`TimelinePolicy::PerDay`]: one point per calendar day with the day's mean
//!   game values and event counts.
//!
//! The two are not interchangeable; they give different correlations on the
//! same data.

use crate::config::{PipelineConfig, StandaloneMerge, TimelinePolicy};
use crate::stats::mean;
use crate::time::{
    day_start_utc, distance, format_day_label, format_point_label, local_day, offset_from_minutes,
};
use crate::types::{PipelineInputs, PointSource, SessionMetrics, TimelinePoint};
use chrono::{DateTime, Duration, FixedOffset, NaiveDate, Utc};
use std::collections::BTreeMap;
use tracing::debug;

/// Build the timeline for `inputs` under the configured policy
pub fn build_timeline(inputs: &PipelineInputs, config: &PipelineConfig) -> Vec<TimelinePoint> {
    let offset = offset_from_minutes(config.day_offset_minutes);
    let points = match config.timeline {
        TimelinePolicy::PerSession => {
            per_session(inputs, config.proximity_window(), config.standalone_merge, offset)
        }
        TimelinePolicy::PerDay => per_day(inputs, offset),
    };

    debug!(
        policy = ?config.timeline,
        records = inputs.total_records(),
        points = points.len(),
        "Built timeline"
    );
    points
}

/// A point plus the record id used to break timestamp ties
struct Placed {
    point: TimelinePoint,
    record_id: i64,
}

/// Treatment event not attributed to any game session
struct Unattributed {
    at: DateTime<Utc>,
    source: PointSource,
    id: i64,
}

fn per_session(
    inputs: &PipelineInputs,
    window: Duration,
    merge: StandaloneMerge,
    offset: FixedOffset,
) -> Vec<TimelinePoint> {
    let sessions = inputs.sessions();
    let mut medication_attributed = vec![false; inputs.medications.len()];
    let mut seizure_attributed = vec![false; inputs.seizures.len()];
    let mut placed: Vec<Placed> = Vec::with_capacity(inputs.total_records());

    for session in &sessions {
        let at = session.occurred_at();

        let mut medication_count = 0;
        for (i, medication) in inputs.medications.iter().enumerate() {
            if distance(medication.occurred_at, at) <= window {
                medication_count += 1;
                medication_attributed[i] = true;
            }
        }

        let mut seizure_count = 0;
        for (i, seizure) in inputs.seizures.iter().enumerate() {
            if distance(seizure.occurred_at, at) <= window {
                seizure_count += 1;
                seizure_attributed[i] = true;
            }
        }

        let (source, cognitive_value, motor_value) = match session {
            SessionMetrics::Cognitive(s) => (PointSource::Cognitive, Some(s.mean_reaction_time_ms), None),
            SessionMetrics::Motor(s) => (PointSource::Motor, None, Some(s.motor_planning_ms)),
        };

        placed.push(Placed {
            point: TimelinePoint {
                timestamp: at,
                label: format_point_label(&at, offset),
                source,
                cognitive_value,
                motor_value,
                medication_count,
                seizure_count,
            },
            record_id: session.id(),
        });
    }

    let mut leftovers: Vec<Unattributed> = inputs
        .medications
        .iter()
        .zip(&medication_attributed)
        .filter(|(_, attributed)| !**attributed)
        .map(|(m, _)| Unattributed {
            at: m.occurred_at,
            source: PointSource::Medication,
            id: m.id,
        })
        .chain(
            inputs
                .seizures
                .iter()
                .zip(&seizure_attributed)
                .filter(|(_, attributed)| !**attributed)
                .map(|(s, _)| Unattributed {
                    at: s.occurred_at,
                    source: PointSource::Seizure,
                    id: s.id,
                }),
        )
        .collect();
    // Greedy merging must not depend on input order
    leftovers.sort_by_key(|u| (u.at, u.source, u.id));

    let mut standalone: Vec<Placed> = Vec::new();
    for event in leftovers {
        if merge == StandaloneMerge::NearbyPoint {
            let nearby = standalone
                .iter_mut()
                .find(|p| distance(p.point.timestamp, event.at) <= window);
            if let Some(existing) = nearby {
                match event.source {
                    PointSource::Medication => existing.point.medication_count += 1,
                    _ => existing.point.seizure_count += 1,
                }
                continue;
            }
        }
        standalone.push(standalone_point(&event, offset));
    }

    placed.extend(standalone);
    placed.sort_by(|a, b| {
        (a.point.timestamp, a.point.source, a.record_id).cmp(&(
            b.point.timestamp,
            b.point.source,
            b.record_id,
        ))
    });
    placed.into_iter().map(|p| p.point).collect()
}

fn standalone_point(event: &Unattributed, offset: FixedOffset) -> Placed {
    let (medication_count, seizure_count) = match event.source {
        PointSource::Medication => (1, 0),
        _ => (0, 1),
    };
    Placed {
        point: TimelinePoint {
            timestamp: event.at,
            label: format_point_label(&event.at, offset),
            source: event.source,
            cognitive_value: None,
            motor_value: None,
            medication_count,
            seizure_count,
        },
        record_id: event.id,
    }
}

#[derive(Default)]
struct DayBucket {
    reaction_times: Vec<f64>,
    planning_times: Vec<f64>,
    medications: u32,
    seizures: u32,
}

fn per_day(inputs: &PipelineInputs, offset: FixedOffset) -> Vec<TimelinePoint> {
    let mut days: BTreeMap<NaiveDate, DayBucket> = BTreeMap::new();

    for s in &inputs.cognitive_sessions {
        days.entry(local_day(&s.occurred_at, offset))
            .or_default()
            .reaction_times
            .push(s.mean_reaction_time_ms);
    }
    for s in &inputs.motor_sessions {
        days.entry(local_day(&s.occurred_at, offset))
            .or_default()
            .planning_times
            .push(s.motor_planning_ms);
    }
    for m in &inputs.medications {
        days.entry(local_day(&m.occurred_at, offset))
            .or_default()
            .medications += 1;
    }
    for s in &inputs.seizures {
        days.entry(local_day(&s.occurred_at, offset))
            .or_default()
            .seizures += 1;
    }

    days.into_iter()
        .map(|(date, bucket)| TimelinePoint {
            timestamp: day_start_utc(&date, offset),
            label: format_day_label(&date),
            source: PointSource::Day,
            cognitive_value: (!bucket.reaction_times.is_empty()).then(|| mean(&bucket.reaction_times)),
            motor_value: (!bucket.planning_times.is_empty()).then(|| mean(&bucket.planning_times)),
            medication_count: bucket.medications,
            seizure_count: bucket.seizures,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{CognitiveSession, MedicationEvent, MotorSession, SeizureEvent};
    use chrono::TimeZone;
    use pretty_assertions::assert_eq;

    fn at(minutes: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 3, 8, 0, 0).unwrap() + Duration::minutes(minutes)
    }

    fn cognitive(id: i64, minutes: i64, reaction_ms: f64) -> CognitiveSession {
        CognitiveSession {
            id,
            mean_reaction_time_ms: reaction_ms,
            inhibition_rate: 0.9,
            reaction_time_variability_ms: 50.0,
            occurred_at: at(minutes),
        }
    }

    fn motor(id: i64, minutes: i64, planning_ms: f64) -> MotorSession {
        MotorSession {
            id,
            vocal_intention_latency_ms: 650.0,
            motor_planning_ms: planning_ms,
            occurred_at: at(minutes),
        }
    }

    fn medication(id: i64, minutes: i64) -> MedicationEvent {
        MedicationEvent {
            id,
            name: "Valproate".to_string(),
            occurred_at: at(minutes),
        }
    }

    fn seizure(id: i64, minutes: i64) -> SeizureEvent {
        SeizureEvent {
            id,
            duration_seconds: 40.0,
            occurred_at: at(minutes),
        }
    }

    fn mixed_inputs() -> PipelineInputs {
        PipelineInputs {
            seizures: vec![seizure(1, 200), seizure(2, 500), seizure(3, -10)],
            medications: vec![medication(1, 25), medication(2, 300), medication(3, 320)],
            cognitive_sessions: vec![cognitive(1, 0, 480.0), cognitive(2, 600, 520.0)],
            motor_sessions: vec![motor(1, 30, 410.0), motor(2, 1440, 390.0)],
        }
    }

    #[test]
    fn test_empty_inputs_give_empty_timeline() {
        let config = PipelineConfig::default();
        assert!(build_timeline(&PipelineInputs::default(), &config).is_empty());

        let per_day = PipelineConfig {
            timeline: TimelinePolicy::PerDay,
            ..Default::default()
        };
        assert!(build_timeline(&PipelineInputs::default(), &per_day).is_empty());
    }

    #[test]
    fn test_per_session_points_and_counts() {
        let points = build_timeline(&mixed_inputs(), &PipelineConfig::default());

        let summary: Vec<(PointSource, u32, u32)> = points
            .iter()
            .map(|p| (p.source, p.medication_count, p.seizure_count))
            .collect();
        assert_eq!(
            summary,
            vec![
                // seizure at -10 is within 30 min of the session at 0
                (PointSource::Cognitive, 1, 1),
                (PointSource::Motor, 1, 0),
                (PointSource::Seizure, 0, 1),
                (PointSource::Medication, 1, 0),
                (PointSource::Medication, 1, 0),
                (PointSource::Seizure, 0, 1),
                (PointSource::Cognitive, 0, 0),
                (PointSource::Motor, 0, 0),
            ]
        );

        assert_eq!(points[0].cognitive_value, Some(480.0));
        assert_eq!(points[0].motor_value, None);
        assert_eq!(points[1].motor_value, Some(410.0));
        assert_eq!(points[2].cognitive_value, None);
        assert_eq!(points[0].label, "03/06 08:00");
    }

    #[test]
    fn test_timestamps_are_non_decreasing() {
        let points = build_timeline(&mixed_inputs(), &PipelineConfig::default());
        assert!(points.windows(2).all(|w| w[0].timestamp <= w[1].timestamp));
    }

    #[test]
    fn test_output_independent_of_input_order() {
        let inputs = mixed_inputs();
        let mut shuffled = inputs.clone();
        shuffled.seizures.reverse();
        shuffled.medications.rotate_left(1);
        shuffled.cognitive_sessions.reverse();
        shuffled.motor_sessions.reverse();

        for merge in [StandaloneMerge::Never, StandaloneMerge::NearbyPoint] {
            let config = PipelineConfig {
                standalone_merge: merge,
                ..Default::default()
            };
            assert_eq!(build_timeline(&inputs, &config), build_timeline(&shuffled, &config));
        }
    }

    #[test]
    fn test_window_is_inclusive_and_symmetric() {
        let inputs = PipelineInputs {
            medications: vec![medication(1, -30), medication(2, 30), medication(3, 31)],
            cognitive_sessions: vec![cognitive(1, 0, 500.0)],
            ..Default::default()
        };
        let points = build_timeline(&inputs, &PipelineConfig::default());
        assert_eq!(points.len(), 2);
        assert_eq!(points[0].medication_count, 2);
        assert_eq!(points[1].source, PointSource::Medication);
        assert_eq!(points[1].timestamp, at(31));
    }

    #[test]
    fn test_attributed_event_never_becomes_standalone() {
        // Dose between two sessions counts on both, but never stands alone
        let inputs = PipelineInputs {
            medications: vec![medication(1, 20)],
            cognitive_sessions: vec![cognitive(1, 0, 500.0)],
            motor_sessions: vec![motor(1, 40, 400.0)],
            ..Default::default()
        };
        let points = build_timeline(&inputs, &PipelineConfig::default());
        assert_eq!(points.len(), 2);
        assert!(points.iter().all(|p| p.source != PointSource::Medication));
        assert!(points.iter().all(|p| p.medication_count == 1));
    }

    #[test]
    fn test_standalone_pair_kept_apart_by_default() {
        let inputs = PipelineInputs {
            medications: vec![medication(1, 0)],
            seizures: vec![seizure(1, 10)],
            ..Default::default()
        };
        let points = build_timeline(&inputs, &PipelineConfig::default());
        assert_eq!(points.len(), 2);
        assert_eq!(points[0].source, PointSource::Medication);
        assert_eq!(points[1].source, PointSource::Seizure);
    }

    #[test]
    fn test_standalone_pair_merged_when_configured() {
        let inputs = PipelineInputs {
            medications: vec![medication(1, 0), medication(2, 90)],
            seizures: vec![seizure(1, 10)],
            ..Default::default()
        };
        let config = PipelineConfig {
            standalone_merge: StandaloneMerge::NearbyPoint,
            ..Default::default()
        };
        let points = build_timeline(&inputs, &config);
        assert_eq!(points.len(), 2);
        assert_eq!(
            (points[0].source, points[0].medication_count, points[0].seizure_count),
            (PointSource::Medication, 1, 1)
        );
        assert_eq!(points[1].timestamp, at(90));
    }

    #[test]
    fn test_same_timestamp_ties_are_ranked() {
        let inputs = PipelineInputs {
            cognitive_sessions: vec![cognitive(9, 0, 500.0), cognitive(3, 0, 450.0)],
            motor_sessions: vec![motor(1, 0, 400.0)],
            ..Default::default()
        };
        let points = build_timeline(&inputs, &PipelineConfig::default());
        let order: Vec<(PointSource, Option<f64>)> =
            points.iter().map(|p| (p.source, p.cognitive_value)).collect();
        assert_eq!(
            order,
            vec![
                (PointSource::Cognitive, Some(450.0)),
                (PointSource::Cognitive, Some(500.0)),
                (PointSource::Motor, None),
            ]
        );
    }

    #[test]
    fn test_per_day_aggregation() {
        let config = PipelineConfig {
            timeline: TimelinePolicy::PerDay,
            ..Default::default()
        };
        let points = build_timeline(&mixed_inputs(), &config);

        assert_eq!(points.len(), 2);
        let first = &points[0];
        assert_eq!(first.source, PointSource::Day);
        assert_eq!(first.label, "03/06");
        assert_eq!(first.timestamp, Utc.with_ymd_and_hms(2024, 6, 3, 0, 0, 0).unwrap());
        assert_eq!(first.cognitive_value, Some(500.0));
        assert_eq!(first.motor_value, Some(410.0));
        assert_eq!((first.medication_count, first.seizure_count), (3, 3));

        let second = &points[1];
        assert_eq!(second.cognitive_value, None);
        assert_eq!(second.motor_value, Some(390.0));
        assert_eq!((second.medication_count, second.seizure_count), (0, 0));
    }

    #[test]
    fn test_per_day_respects_offset() {
        // 23:30 UTC falls on the next day two hours east
        let late = Utc.with_ymd_and_hms(2024, 6, 3, 23, 30, 0).unwrap();
        let inputs = PipelineInputs {
            seizures: vec![SeizureEvent {
                id: 1,
                duration_seconds: 20.0,
                occurred_at: late,
            }],
            ..Default::default()
        };
        let config = PipelineConfig {
            timeline: TimelinePolicy::PerDay,
            day_offset_minutes: 120,
            ..Default::default()
        };
        let points = build_timeline(&inputs, &config);
        assert_eq!(points.len(), 1);
        assert_eq!(points[0].label, "04/06");
        assert_eq!(
            points[0].timestamp,
            Utc.with_ymd_and_hms(2024, 6, 3, 22, 0, 0).unwrap()
        );
    }
}
