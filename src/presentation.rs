//! Presentation adapter
//!
//! Maps a [`DashboardSnapshot`] onto display-ready shapes: gauge fractions, KPI
//! cards with a trend direction, counter animation frames and chart series.
//! Nothing here recomputes metrics.

use crate::config::PipelineConfig;
use crate::stats::clamp;
use crate::types::{DashboardSnapshot, TimelinePoint};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Frames used to animate a counter from zero to its value
pub const COUNTER_FRAMES: usize = 30;

/// Direction of the seizure trend, from the caregiver's point of view
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Trend {
    Improving,
    Stable,
    Worsening,
}

impl Trend {
    /// Fewer seizures than the previous window is an improvement
    pub fn from_impact_ratio(ratio: f64) -> Self {
        if ratio < 0.0 {
            Trend::Improving
        } else if ratio > 0.0 {
            Trend::Worsening
        } else {
            Trend::Stable
        }
    }
}

/// Half-ring gauge
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Gauge {
    pub label: String,
    /// Displayed value (0-100)
    pub value: f64,
    /// Filled share of the ring (0-1)
    pub fraction: f64,
}

impl Gauge {
    fn percent(label: &str, value: f64) -> Self {
        let value = clamp(value, 0.0, 100.0);
        Self {
            label: label.to_string(),
            value,
            fraction: value / 100.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KpiCard {
    pub title: String,
    pub value: f64,
    /// Formatted value, unit included
    pub display: String,
    pub caption: String,
    pub trend: Option<Trend>,
    /// Counter animation, ending on `value`
    pub frames: Vec<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartPoint {
    pub timestamp: DateTime<Utc>,
    pub label: String,
    pub value: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartSeries {
    pub name: String,
    pub unit: String,
    pub points: Vec<ChartPoint>,
}

/// Everything the dashboard screen renders
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DashboardView {
    /// False when the batch held no record at all
    pub has_data: bool,
    pub stability: Gauge,
    pub adherence: Gauge,
    pub cards: Vec<KpiCard>,
    pub series: Vec<ChartSeries>,
}

impl DashboardView {
    pub fn from_snapshot(snapshot: &DashboardSnapshot, config: &PipelineConfig) -> Self {
        let metrics = &snapshot.metrics;
        let window = format!("last {} days", config.trend_window_days);

        let cards = vec![
            KpiCard {
                title: "Seizure trend".to_string(),
                value: metrics.impact_ratio,
                display: format!("{:+.0}%", metrics.impact_ratio),
                caption: format!("vs previous {} days", config.trend_window_days),
                trend: Some(Trend::from_impact_ratio(metrics.impact_ratio)),
                frames: counter_frames(metrics.impact_ratio, COUNTER_FRAMES),
            },
            KpiCard {
                title: "Doses taken".to_string(),
                value: f64::from(metrics.adherence.count),
                display: format!("{}/{}", metrics.adherence.count, metrics.adherence.target),
                caption: window,
                trend: None,
                frames: counter_frames(f64::from(metrics.adherence.count), COUNTER_FRAMES),
            },
            KpiCard {
                title: "Mean reaction time".to_string(),
                value: metrics.stats.reaction_time_mean_ms,
                display: format!("{:.0} ms", metrics.stats.reaction_time_mean_ms),
                caption: format!("± {:.0} ms", metrics.stats.reaction_time_std_dev_ms),
                trend: None,
                frames: counter_frames(metrics.stats.reaction_time_mean_ms, COUNTER_FRAMES),
            },
            KpiCard {
                title: "Motor planning".to_string(),
                value: metrics.stats.motor_planning_mean_ms,
                display: format!("{:.0} ms", metrics.stats.motor_planning_mean_ms),
                caption: format!("± {:.0} ms", metrics.stats.motor_planning_std_dev_ms),
                trend: None,
                frames: counter_frames(metrics.stats.motor_planning_mean_ms, COUNTER_FRAMES),
            },
            KpiCard {
                title: "Dose / reaction correlation".to_string(),
                value: metrics.stats.medication_reaction_correlation,
                display: format!("{:.2}", metrics.stats.medication_reaction_correlation),
                caption: format!("{} records", metrics.stats.total_records),
                trend: None,
                frames: counter_frames(metrics.stats.medication_reaction_correlation, COUNTER_FRAMES),
            },
        ];

        Self {
            has_data: metrics.stats.total_records > 0,
            stability: Gauge::percent("Stability", f64::from(metrics.stability)),
            adherence: Gauge::percent("Adherence", metrics.adherence.percent),
            cards,
            series: chart_series(&snapshot.timeline),
        }
    }
}

/// Ease-out cubic progression from 0 to `target` over `frames` steps.
///
/// The last frame is exactly `target`.
pub fn counter_frames(target: f64, frames: usize) -> Vec<f64> {
    if frames == 0 || !target.is_finite() {
        return vec![if target.is_finite() { target } else { 0.0 }];
    }

    let mut out: Vec<f64> = (1..frames)
        .map(|i| {
            let t = i as f64 / frames as f64;
            target * (1.0 - (1.0 - t).powi(3))
        })
        .collect();
    out.push(target);
    out
}

/// Chart series: game values as lines, treatment events as markers
pub fn chart_series(timeline: &[TimelinePoint]) -> Vec<ChartSeries> {
    let series = |name: &str, unit: &str, value: fn(&TimelinePoint) -> Option<f64>| ChartSeries {
        name: name.to_string(),
        unit: unit.to_string(),
        points: timeline
            .iter()
            .filter_map(|p| {
                value(p).map(|v| ChartPoint {
                    timestamp: p.timestamp,
                    label: p.label.clone(),
                    value: v,
                })
            })
            .collect(),
    };

    vec![
        series("Reaction time", "ms", |p| p.cognitive_value),
        series("Motor planning", "ms", |p| p.motor_value),
        series("Medication", "doses", |p| {
            (p.medication_count > 0).then(|| f64::from(p.medication_count))
        }),
        series("Seizures", "events", |p| {
            (p.seizure_count > 0).then(|| f64::from(p.seizure_count))
        }),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::DashboardProcessor;
    use crate::types::{CognitiveSession, MedicationEvent, PipelineInputs, SeizureEvent};
    use chrono::{Duration, TimeZone};
    use pretty_assertions::assert_eq;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 20, 18, 0, 0).unwrap()
    }

    fn snapshot(inputs: &PipelineInputs) -> DashboardSnapshot {
        DashboardProcessor::new()
            .with_instance_id("view-test")
            .analyze(inputs, now())
    }

    #[test]
    fn test_trend_direction() {
        assert_eq!(Trend::from_impact_ratio(-50.0), Trend::Improving);
        assert_eq!(Trend::from_impact_ratio(0.0), Trend::Stable);
        assert_eq!(Trend::from_impact_ratio(100.0), Trend::Worsening);
    }

    #[test]
    fn test_counter_frames_end_on_target() {
        let frames = counter_frames(88.0, 10);
        assert_eq!(frames.len(), 10);
        assert_eq!(frames.last().copied(), Some(88.0));
        assert!(frames.windows(2).all(|w| w[0] <= w[1]));
        // ease-out: first step covers more than a linear step
        assert!(frames[0] > 8.8);

        assert_eq!(counter_frames(5.0, 0), vec![5.0]);
        assert_eq!(counter_frames(f64::NAN, 10), vec![0.0]);
    }

    #[test]
    fn test_empty_snapshot_view() {
        let view = DashboardView::from_snapshot(
            &snapshot(&PipelineInputs::default()),
            &PipelineConfig::default(),
        );
        assert!(!view.has_data);
        assert_eq!(view.stability.fraction, 0.0);
        assert_eq!(view.cards[1].display, "0/14");
        assert!(view.series.iter().all(|s| s.points.is_empty()));
    }

    #[test]
    fn test_view_from_snapshot() {
        let at = now() - Duration::days(1);
        let inputs = PipelineInputs {
            seizures: vec![SeizureEvent {
                id: 1,
                duration_seconds: 40.0,
                occurred_at: at - Duration::hours(3),
            }],
            medications: (0..7)
                .map(|i| MedicationEvent {
                    id: i,
                    name: "Keppra".to_string(),
                    occurred_at: at - Duration::hours(12 * i) - Duration::minutes(10),
                })
                .collect(),
            cognitive_sessions: vec![CognitiveSession {
                id: 1,
                mean_reaction_time_ms: 480.0,
                inhibition_rate: 0.9,
                reaction_time_variability_ms: 0.0,
                occurred_at: at,
            }],
            ..Default::default()
        };

        let view = DashboardView::from_snapshot(&snapshot(&inputs), &PipelineConfig::default());

        assert!(view.has_data);
        assert_eq!(view.stability.value, 100.0);
        assert_eq!(view.stability.fraction, 1.0);
        assert_eq!(view.adherence.value, 50.0);
        assert_eq!(view.cards[0].trend, Some(Trend::Worsening));
        assert_eq!(view.cards[0].display, "+100%");
        assert_eq!(view.cards[2].display, "480 ms");

        let names: Vec<(&str, usize)> = view
            .series
            .iter()
            .map(|s| (s.name.as_str(), s.points.len()))
            .collect();
        // one dose lands on the session point, six are standalone
        assert_eq!(
            names,
            vec![
                ("Reaction time", 1),
                ("Motor planning", 0),
                ("Medication", 7),
                ("Seizures", 1),
            ]
        );
    }
}
