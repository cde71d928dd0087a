//! Medication adherence

use crate::stats::clamp;
use crate::time::age;
use crate::types::{AdherenceSummary, MedicationEvent};
use chrono::{DateTime, Duration, Utc};

/// Doses logged in the trailing window against the expected target.
///
/// `count` is the raw number and may exceed `target`; only `percent` is
/// clamped. A zero target yields 0%.
pub fn medication_adherence(
    medications: &[MedicationEvent],
    now: DateTime<Utc>,
    window: Duration,
    target: u32,
) -> AdherenceSummary {
    let in_window = medications
        .iter()
        .filter(|m| age(now, m.occurred_at) <= window)
        .count();
    let count = u32::try_from(in_window).unwrap_or(u32::MAX);

    let percent = if target == 0 {
        0.0
    } else {
        clamp(f64::from(count) / f64::from(target) * 100.0, 0.0, 100.0)
    };

    AdherenceSummary {
        count,
        target,
        percent,
    }
}
