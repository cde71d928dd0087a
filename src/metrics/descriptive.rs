//! Descriptive statistics bundle
//!
//! Advisory figures for the dashboard. The medication/reaction-time
//! correlation is taken over timeline points carrying a cognitive value, pairing
//! the number of doses attributed to the point with its mean reaction time.

use crate::stats::{mean, pearson_correlation, population_std_dev};
use crate::types::{DescriptiveStats, PipelineInputs, TimelinePoint};

pub fn descriptive_stats(inputs: &PipelineInputs, timeline: &[TimelinePoint]) -> DescriptiveStats {
    let reaction_times: Vec<f64> = inputs
        .cognitive_sessions
        .iter()
        .map(|s| s.mean_reaction_time_ms)
        .collect();
    let inhibition: Vec<f64> = inputs
        .cognitive_sessions
        .iter()
        .map(|s| s.inhibition_rate)
        .collect();
    let planning: Vec<f64> = inputs
        .motor_sessions
        .iter()
        .map(|s| s.motor_planning_ms)
        .collect();

    let (doses, reactions): (Vec<f64>, Vec<f64>) = timeline
        .iter()
        .filter_map(|p| p.cognitive_value.map(|v| (f64::from(p.medication_count), v)))
        .unzip();

    DescriptiveStats {
        reaction_time_mean_ms: mean(&reaction_times),
        reaction_time_std_dev_ms: population_std_dev(&reaction_times),
        motor_planning_mean_ms: mean(&planning),
        motor_planning_std_dev_ms: population_std_dev(&planning),
        inhibition_rate_mean: mean(&inhibition),
        medication_reaction_correlation: pearson_correlation(&doses, &reactions),
        total_records: inputs.total_records(),
    }
}
