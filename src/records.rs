//! Training record input adapter
//!
//! Parses training logs as exported by the application backend (JSON array or
//! NDJSON) into `TrainingRecord`s. Numeric fields are read leniently: anything
//! that is not a finite number (or a string holding one) becomes absent and
//! later contributes zero load. Dates are the one field that must be well formed.

use crate::calendar::ReportingCalendar;
use crate::error::ComputeError;
use crate::types::TrainingRecord;
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;
use tracing::debug;

/// Training record as it appears on the wire
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawTrainingRecord {
    /// Optional record identifier, only used for reporting
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "lenient_string"
    )]
    pub id: Option<String>,
    #[serde(default, alias = "userId", deserialize_with = "lenient_string")]
    pub user_id: Option<String>,
    /// `YYYY-MM-DD` or an RFC 3339 timestamp
    #[serde(default, deserialize_with = "lenient_date")]
    pub date: Option<String>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub rpe: Option<f64>,
    #[serde(default, alias = "durationMinutes", deserialize_with = "lenient_f64")]
    pub duration_minutes: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub load: Option<f64>,
}

/// Accept numbers and numeric strings, treat everything else as absent
fn lenient_f64<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    let number = match value {
        serde_json::Value::Number(n) => n.as_f64(),
        serde_json::Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    Ok(number.filter(|n| n.is_finite()))
}

/// Accept string or numeric identifiers
fn lenient_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(match value {
        serde_json::Value::String(s) => Some(s),
        serde_json::Value::Number(n) => Some(n.to_string()),
        _ => None,
    })
}

/// Keep any non-null date as text so a malformed one is reported per record
fn lenient_date<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(match value {
        serde_json::Value::Null => None,
        serde_json::Value::String(s) => Some(s),
        other => Some(other.to_string()),
    })
}

/// Problem found while validating a raw record
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RecordIssue {
    MissingUserId,
    MissingDate,
    InvalidDate { value: String },
}

impl std::fmt::Display for RecordIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RecordIssue::MissingUserId => write!(f, "missing user_id"),
            RecordIssue::MissingDate => write!(f, "missing date"),
            RecordIssue::InvalidDate { value } => write!(f, "invalid date {value:?}"),
        }
    }
}

/// Result of validating one record
#[derive(Debug, Clone, Serialize)]
pub struct ValidationResult {
    pub index: usize,
    pub record_id: Option<String>,
    pub issues: Vec<RecordIssue>,
}

/// Adapter for converting wire records into engine input
pub struct RecordAdapter;

impl RecordAdapter {
    /// Parse a JSON string containing an array of records
    pub fn parse_array(json: &str) -> Result<Vec<RawTrainingRecord>, ComputeError> {
        let records: Vec<RawTrainingRecord> = serde_json::from_str(json)?;
        Ok(records)
    }

    /// Parse NDJSON (one record per line, blank lines ignored)
    pub fn parse_ndjson(ndjson: &str) -> Result<Vec<RawTrainingRecord>, ComputeError> {
        let mut records = Vec::new();
        for (line_num, line) in ndjson.lines().enumerate() {
            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }
            match serde_json::from_str::<RawTrainingRecord>(trimmed) {
                Ok(record) => records.push(record),
                Err(e) => {
                    return Err(ComputeError::ParseError(format!(
                        "Failed to parse line {}: {}",
                        line_num + 1,
                        e
                    )));
                }
            }
        }
        Ok(records)
    }

    /// Convert raw records into engine records.
    ///
    /// Dates are normalized through the calendar policy. An unparseable or
    /// missing date rejects the batch; a missing user id maps to an empty id.
    pub fn to_records(
        raw: &[RawTrainingRecord],
        calendar: &ReportingCalendar,
    ) -> Result<Vec<TrainingRecord>, ComputeError> {
        raw.iter()
            .enumerate()
            .map(|(idx, record)| {
                let date_str = record
                    .date
                    .as_deref()
                    .ok_or_else(|| ComputeError::MissingField(format!("date (record {idx})")))?;
                let date = calendar.normalize_day(date_str)?;

                Ok(TrainingRecord {
                    user_id: record.user_id.clone().unwrap_or_default(),
                    date,
                    rpe: record.rpe,
                    duration_minutes: record.duration_minutes,
                    load: record.load,
                })
            })
            .collect()
    }

    /// Split records by athlete, ordered by user id
    pub fn group_by_athlete(records: Vec<TrainingRecord>) -> BTreeMap<String, Vec<TrainingRecord>> {
        let mut by_athlete: BTreeMap<String, Vec<TrainingRecord>> = BTreeMap::new();
        for record in records {
            by_athlete
                .entry(record.user_id.clone())
                .or_default()
                .push(record);
        }
        debug!(athletes = by_athlete.len(), "grouped training records");
        by_athlete
    }

    /// Validate a batch of records, returning only the ones with issues
    pub fn validate_records(
        raw: &[RawTrainingRecord],
        calendar: &ReportingCalendar,
    ) -> Vec<ValidationResult> {
        raw.iter()
            .enumerate()
            .map(|(idx, record)| {
                let mut issues = Vec::new();

                if record.user_id.as_deref().map_or(true, |id| id.trim().is_empty()) {
                    issues.push(RecordIssue::MissingUserId);
                }

                match record.date.as_deref() {
                    None => issues.push(RecordIssue::MissingDate),
                    Some(date) if calendar.normalize_day(date).is_err() => {
                        issues.push(RecordIssue::InvalidDate {
                            value: date.to_string(),
                        });
                    }
                    Some(_) => {}
                }

                ValidationResult {
                    index: idx,
                    record_id: record.id.clone(),
                    issues,
                }
            })
            .filter(|r| !r.issues.is_empty())
            .collect()
    }
}
