//! Adapter for converting backend rows to pipeline inputs
//!
//! Rows whose timestamp cannot be parsed, or whose values are not finite, are
//! skipped with a warning so that one bad row never blanks the dashboard.
//! Out-of-range values are clamped.

use crate::error::ComputeError;
use crate::schema::rows::{BackendRow, RowBundle, RowIssue};
use crate::time::parse_timestamp;
use crate::types::PipelineInputs;
use tracing::warn;

/// Adapter for converting backend rows to domain records
pub struct RowAdapter;

impl RowAdapter {
    /// Parse a JSON document holding the four history arrays
    pub fn parse_bundle(json: &str) -> Result<RowBundle, ComputeError> {
        let bundle: RowBundle = serde_json::from_str(json)?;
        Ok(bundle)
    }

    /// Parse a JSON array of rows of one kind
    pub fn parse_rows<R>(json: &str) -> Result<Vec<R>, ComputeError>
    where
        R: serde::de::DeserializeOwned,
    {
        let rows: Vec<R> = serde_json::from_str(json)?;
        Ok(rows)
    }

    /// Convert rows of one kind, skipping rows with fatal issues
    pub fn convert<R: BackendRow>(rows: &[R]) -> Vec<R::Record> {
        rows.iter()
            .filter_map(|row| match Self::check_row(row) {
                Ok(occurred_at) => Some(row.to_record(occurred_at)),
                Err(issue) => {
                    warn!(
                        resource = R::RESOURCE,
                        row_id = row.id(),
                        error = %issue,
                        "Skipping malformed row"
                    );
                    None
                }
            })
            .collect()
    }

    /// Convert a whole bundle into pipeline inputs
    pub fn to_inputs(bundle: &RowBundle) -> PipelineInputs {
        PipelineInputs {
            seizures: Self::convert(&bundle.seizures),
            medications: Self::convert(&bundle.medications),
            cognitive_sessions: Self::convert(&bundle.cognitive_sessions),
            motor_sessions: Self::convert(&bundle.motor_sessions),
        }
    }

    /// Report every issue found in a bundle
    pub fn validate_bundle(bundle: &RowBundle) -> Vec<RowValidation> {
        let mut results = Vec::new();
        Self::validate_rows(&bundle.seizures, &mut results);
        Self::validate_rows(&bundle.medications, &mut results);
        Self::validate_rows(&bundle.cognitive_sessions, &mut results);
        Self::validate_rows(&bundle.motor_sessions, &mut results);
        results
    }

    fn validate_rows<R: BackendRow>(rows: &[R], results: &mut Vec<RowValidation>) {
        for (index, row) in rows.iter().enumerate() {
            let mut issues = Vec::new();
            if let Err(issue) = timestamp_issue(row) {
                issues.push(issue);
            }
            issues.extend(row.value_issues());

            results.extend(issues.into_iter().map(|issue| RowValidation {
                resource: R::RESOURCE,
                index,
                row_id: row.id(),
                issue,
            }));
        }
    }

    /// Parsed timestamp of a usable row, or its first fatal issue
    fn check_row<R: BackendRow>(row: &R) -> Result<chrono::DateTime<chrono::Utc>, RowIssue> {
        let occurred_at = timestamp_issue(row)?;
        match row.value_issues().into_iter().find(RowIssue::is_fatal) {
            Some(issue) => Err(issue),
            None => Ok(occurred_at),
        }
    }
}

fn timestamp_issue<R: BackendRow>(row: &R) -> Result<chrono::DateTime<chrono::Utc>, RowIssue> {
    parse_timestamp(row.created_at()).map_err(|e| RowIssue::InvalidTimestamp {
        value: row.created_at().to_string(),
        reason: e.to_string(),
    })
}

/// One issue found while validating a bundle
#[derive(Debug, Clone, PartialEq)]
pub struct RowValidation {
    pub resource: &'static str,
    pub index: usize,
    pub row_id: i64,
    pub issue: RowIssue,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::rows::{CriseRow, DrugRow, FlashPopRow, NoiseGameRow};
    use chrono::{TimeZone, Utc};

    fn sample_bundle_json() -> &'static str {
        r#"{
            "seizures": [
                { "id": 1, "duration": 65.0, "created_at": "2024-05-02 09:15:00" },
                { "id": 2, "duration": -3.0, "created_at": "2024-05-03T11:00:00Z" }
            ],
            "medications": [
                { "id": 10, "name": "  Keppra ", "created_at": "2024-05-02 08:00:00" },
                { "id": 11, "name": "Keppra", "created_at": "not a date" }
            ],
            "cognitive_sessions": [
                { "id": 20, "mrt": 480.0, "inhibition_rate": 1.4, "iiv_score": 55.0, "created_at": "2024-05-02 16:30:00" }
            ],
            "motor_sessions": [
                { "id": 30, "vocal_initention_latence": 700.0, "motrice_planification": 415.0, "created_at": "2024-05-02 17:00:00" }
            ]
        }"#
    }

    #[test]
    fn test_bundle_to_inputs() {
        let bundle = RowAdapter::parse_bundle(sample_bundle_json()).unwrap();
        let inputs = RowAdapter::to_inputs(&bundle);

        assert_eq!(inputs.seizures.len(), 2);
        assert_eq!(inputs.seizures[1].duration_seconds, 0.0);
        assert_eq!(
            inputs.seizures[0].occurred_at,
            Utc.with_ymd_and_hms(2024, 5, 2, 9, 15, 0).unwrap()
        );

        // Row with an unparsable timestamp is dropped
        assert_eq!(inputs.medications.len(), 1);
        assert_eq!(inputs.medications[0].name, "Keppra");

        assert_eq!(inputs.cognitive_sessions[0].inhibition_rate, 1.0);
        assert_eq!(inputs.motor_sessions[0].motor_planning_ms, 415.0);
    }

    #[test]
    fn test_validate_bundle_reports_issues() {
        let bundle = RowAdapter::parse_bundle(sample_bundle_json()).unwrap();
        let report = RowAdapter::validate_bundle(&bundle);

        let summary: Vec<(&str, i64, bool)> = report
            .iter()
            .map(|r| (r.resource, r.row_id, r.issue.is_fatal()))
            .collect();
        assert_eq!(
            summary,
            vec![
                ("crise-history", 2, false),
                ("drug-history", 11, true),
                ("flash-pop-history", 20, false),
            ]
        );
        assert_eq!(report[1].index, 1);
    }

    #[test]
    fn test_parse_rows_of_one_kind() {
        let rows: Vec<DrugRow> = RowAdapter::parse_rows(
            r#"[{ "id": 1, "name": "Keppra", "created_at": "2024-05-02 08:00:00" }]"#,
        )
        .unwrap();
        assert_eq!(RowAdapter::convert(&rows).len(), 1);

        let bad: Result<Vec<CriseRow>, _> = RowAdapter::parse_rows("{}");
        assert!(bad.is_err());
    }

    #[test]
    fn test_non_finite_rows_are_skipped() {
        let rows = vec![
            FlashPopRow {
                id: 1,
                mrt: f64::INFINITY,
                inhibition_rate: 0.5,
                iiv_score: 30.0,
                created_at: "2024-05-02 08:00:00".to_string(),
            },
            FlashPopRow {
                id: 2,
                mrt: 450.0,
                inhibition_rate: 0.5,
                iiv_score: 30.0,
                created_at: "2024-05-02 09:00:00".to_string(),
            },
        ];
        let sessions = RowAdapter::convert(&rows);
        assert_eq!(sessions.len(), 1);
        assert_eq!(sessions[0].id, 2);

        let motor: Vec<NoiseGameRow> = Vec::new();
        assert!(RowAdapter::convert(&motor).is_empty());
    }
}
