//! Crisis-impact ratio

use crate::time::age;
use crate::types::SeizureEvent;
use chrono::{DateTime, Duration, Utc};

/// Signed percentage change in seizure count between the previous and the
/// current window.
///
/// `current` counts seizures at most `window` old, `previous` those older than
/// `window` but at most `2 * window` old. Without a baseline (`previous == 0`)
/// any current activity reads as a full 100% regression. Negative values mean
/// fewer seizures recently.
pub fn crisis_impact_ratio(seizures: &[SeizureEvent], now: DateTime<Utc>, window: Duration) -> f64 {
    let (current, previous) = window_counts(seizures, now, window);

    if previous == 0 {
        return if current > 0 { 100.0 } else { 0.0 };
    }
    (f64::from(current) - f64::from(previous)) / f64::from(previous) * 100.0
}

/// Seizure counts in the current and previous windows
pub fn window_counts(seizures: &[SeizureEvent], now: DateTime<Utc>, window: Duration) -> (u32, u32) {
    let mut current = 0u32;
    let mut previous = 0u32;
    for seizure in seizures {
        let elapsed = age(now, seizure.occurred_at);
        if elapsed <= window {
            current += 1;
        } else if elapsed <= window * 2 {
            previous += 1;
        }
    }
    (current, previous)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 15, 12, 0, 0).unwrap()
    }

    fn seizures_days_ago(days: &[i64]) -> Vec<SeizureEvent> {
        days.iter()
            .enumerate()
            .map(|(i, d)| SeizureEvent {
                id: i as i64,
                duration_seconds: 45.0,
                occurred_at: now() - Duration::days(*d) + Duration::hours(1),
            })
            .collect()
    }

    #[test]
    fn test_no_baseline_with_current_activity_is_full_regression() {
        let seizures = seizures_days_ago(&[1, 3, 6]);
        assert_eq!(crisis_impact_ratio(&seizures, now(), Duration::days(7)), 100.0);
    }

    #[test]
    fn test_halved_seizures_is_minus_fifty() {
        let seizures = seizures_days_ago(&[2, 5, 8, 9, 11, 13]);
        assert_eq!(window_counts(&seizures, now(), Duration::days(7)), (2, 4));
        assert_eq!(crisis_impact_ratio(&seizures, now(), Duration::days(7)), -50.0);
    }

    #[test]
    fn test_empty_and_stale_history() {
        assert_eq!(crisis_impact_ratio(&[], now(), Duration::days(7)), 0.0);

        let stale = seizures_days_ago(&[20, 30]);
        assert_eq!(crisis_impact_ratio(&stale, now(), Duration::days(7)), 0.0);
    }

    #[test]
    fn test_window_boundaries_are_inclusive() {
        let seizures = vec![
            SeizureEvent {
                id: 1,
                duration_seconds: 10.0,
                occurred_at: now() - Duration::days(7),
            },
            SeizureEvent {
                id: 2,
                duration_seconds: 10.0,
                occurred_at: now() - Duration::days(14),
            },
        ];
        assert_eq!(window_counts(&seizures, now(), Duration::days(7)), (1, 1));
        assert_eq!(crisis_impact_ratio(&seizures, now(), Duration::days(7)), 0.0);
    }

    #[test]
    fn test_increase_is_positive() {
        let seizures = seizures_days_ago(&[1, 2, 3, 10]);
        assert_eq!(crisis_impact_ratio(&seizures, now(), Duration::days(7)), 200.0);
    }
}
