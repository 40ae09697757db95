//! Pipeline orchestration
//!
//! This module provides the JSON-level API of ACWR Flux. It wires raw training
//! records through date normalization, the workload calculator and the alert
//! tiers, and encodes the result as JSON.

use crate::alerts::{AthleteStatus, TeamRiskSummary};
use crate::calculator::WorkloadSeriesCalculator;
use crate::calendar::ReportingCalendar;
use crate::config::EngineConfig;
use crate::error::ComputeError;
use crate::records::RecordAdapter;
use crate::types::{TrainingRecord, WorkloadPoint};
use crate::{FLUX_VERSION, PRODUCER_NAME};
use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Compute the workload series for one athlete.
///
/// # Arguments
/// * `records_json` - JSON array of training records for a single athlete
/// * `evaluation_time` - Reference instant for "days since last training"
/// * `timezone` - Calendar-day policy (`UTC`, `JST`, or `±HH:MM`)
///
/// # Returns
/// JSON array of workload points, oldest first
///
/// # Example
/// ```ignore
/// let series = workload_series_json(records_json, Utc::now(), "UTC")?;
/// ```
pub fn workload_series_json(
    records_json: &str,
    evaluation_time: DateTime<Utc>,
    timezone: &str,
) -> Result<String, ComputeError> {
    let calendar = ReportingCalendar::parse(timezone)?;
    let calculator = WorkloadSeriesCalculator::with_calendar(calendar);
    let series = workload_series(&calculator, records_json, evaluation_time)?;
    Ok(serde_json::to_string(&series)?)
}

/// Parse records and compute the series with the given calculator
pub fn workload_series(
    calculator: &WorkloadSeriesCalculator,
    records_json: &str,
    evaluation_time: DateTime<Utc>,
) -> Result<Vec<WorkloadPoint>, ComputeError> {
    let raw = RecordAdapter::parse_array(records_json)?;
    let records = RecordAdapter::to_records(&raw, &calculator.calendar())?;
    let series = calculator.compute(&records, evaluation_time);
    debug!(
        records = records.len(),
        points = series.len(),
        "computed workload series"
    );
    Ok(series)
}

/// Build the daily team report as JSON.
///
/// # Arguments
/// * `records_json` - JSON array of training records for any number of athletes
/// * `roster` - Athletes expected in the report; those without records are flagged as no data
/// * `evaluation_time` - Reference instant for the report
/// * `config` - Windows, alert thresholds and timezone
pub fn team_report_json(
    records_json: &str,
    roster: &[String],
    evaluation_time: DateTime<Utc>,
    config: &EngineConfig,
) -> Result<String, ComputeError> {
    let reporter = TeamReporter::new(config.clone())?;
    let raw = RecordAdapter::parse_array(records_json)?;
    let records = RecordAdapter::to_records(&raw, &reporter.calendar)?;
    let report = reporter.report(records, roster, evaluation_time);
    Ok(serde_json::to_string(&report)?)
}

/// Producer metadata attached to every report
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportProducer {
    pub name: String,
    pub version: String,
    /// Unique per report, usable as a de-duplication key by notifiers
    pub report_id: String,
}

/// Daily team risk report
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TeamRiskReport {
    pub producer: ReportProducer,
    pub evaluated_at_utc: String,
    /// Evaluation instant as a day in the reporting timezone
    pub reporting_day: NaiveDate,
    pub timezone: String,
    pub summary: TeamRiskSummary,
    pub athletes: Vec<AthleteStatus>,
}

/// Reusable team reporter holding a validated configuration
#[derive(Debug, Clone)]
pub struct TeamReporter {
    config: EngineConfig,
    calendar: ReportingCalendar,
    calculator: WorkloadSeriesCalculator,
}

impl TeamReporter {
    /// Create a reporter, validating the configuration
    pub fn new(config: EngineConfig) -> Result<Self, ComputeError> {
        config.validate()?;
        let calendar = config.calendar()?;
        let calculator = config.calculator()?;
        Ok(Self {
            config,
            calendar,
            calculator,
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn calendar(&self) -> ReportingCalendar {
        self.calendar
    }

    /// Evaluate every athlete in `records` plus any roster athlete without records.
    ///
    /// Each athlete's series is computed independently from its own records.
    pub fn report(
        &self,
        records: Vec<TrainingRecord>,
        roster: &[String],
        evaluation_time: DateTime<Utc>,
    ) -> TeamRiskReport {
        let by_athlete = RecordAdapter::group_by_athlete(records);
        let thresholds = &self.config.alerts;

        let mut athletes: Vec<AthleteStatus> = by_athlete
            .iter()
            .map(|(user_id, records)| {
                let latest = self.calculator.latest(records, evaluation_time);
                let status = thresholds.assess(user_id, latest);
                if status.no_data {
                    warn!(user_id = %user_id, "no recent training data");
                }
                status
            })
            .collect();

        for user_id in roster {
            if !by_athlete.contains_key(user_id) {
                warn!(user_id = %user_id, "no training records for rostered athlete");
                athletes.push(thresholds.assess(user_id, None));
            }
        }
        athletes.sort_by(|a, b| a.user_id.cmp(&b.user_id));

        let summary = TeamRiskSummary::from_statuses(&athletes);
        info!(
            athletes = athletes.len(),
            high_risk = summary.high_risk.len(),
            caution = summary.caution.len(),
            low_load = summary.low_load.len(),
            no_data = summary.no_data.len(),
            "team workload report built"
        );

        TeamRiskReport {
            producer: ReportProducer {
                name: PRODUCER_NAME.to_string(),
                version: FLUX_VERSION.to_string(),
                report_id: Uuid::new_v4().to_string(),
            },
            evaluated_at_utc: evaluation_time.to_rfc3339_opts(SecondsFormat::Secs, true),
            reporting_day: self.calendar.day_of(evaluation_time),
            timezone: self.calendar.label(),
            summary,
            athletes,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alerts::RiskTier;

    fn eval_time(s: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(s).unwrap().with_timezone(&Utc)
    }

    fn steady_month_json(user_id: &str) -> String {
        let records: Vec<serde_json::Value> = (1..=30)
            .map(|d| {
                serde_json::json!({
                    "user_id": user_id,
                    "date": format!("2025-01-{d:02}"),
                    "rpe": 6,
                    "duration_minutes": 60
                })
            })
            .collect();
        serde_json::to_string(&records).unwrap()
    }

    #[test]
    fn test_workload_series_json() {
        let json = steady_month_json("a1");
        let output = workload_series_json(&json, eval_time("2025-01-31T10:00:00Z"), "UTC").unwrap();

        let points: serde_json::Value = serde_json::from_str(&output).unwrap();
        let points = points.as_array().unwrap();
        assert_eq!(points.len(), 30);

        let last = &points[29];
        assert_eq!(last["date"], "2025-01-30");
        assert_eq!(last["acute_load"], 2520.0);
        assert_eq!(last["chronic_load"], 2520.0);
        assert_eq!(last["ratio"], 1.0);
        assert_eq!(last["has_enough_history"], true);
        assert_eq!(last["last_training_date"], "2025-01-30");
        assert_eq!(last["days_since_last_training"], 1);
    }

    #[test]
    fn test_empty_records() {
        let output = workload_series_json("[]", eval_time("2025-01-31T10:00:00Z"), "UTC").unwrap();
        assert_eq!(output, "[]");
    }

    #[test]
    fn test_invalid_json() {
        let result = workload_series_json("not valid json", Utc::now(), "UTC");
        assert!(result.is_err());
    }

    #[test]
    fn test_invalid_timezone() {
        let result = workload_series_json("[]", Utc::now(), "Moon/Base");
        assert!(matches!(result, Err(ComputeError::InvalidTimezone(_))));
    }

    #[test]
    fn test_team_report() {
        let mut records: Vec<serde_json::Value> =
            serde_json::from_str(&steady_month_json("steady")).unwrap();
        // a single hard week after a quiet start spikes the ratio
        for d in 24..=30 {
            records.push(serde_json::json!({
                "userId": "spike",
                "date": format!("2025-01-{d:02}"),
                "load": 900
            }));
        }
        let json = serde_json::to_string(&records).unwrap();
        let roster = vec!["steady".to_string(), "spike".to_string(), "absent".to_string()];

        let output = team_report_json(
            &json,
            &roster,
            eval_time("2025-01-31T06:00:00Z"),
            &EngineConfig::default(),
        )
        .unwrap();
        let report: TeamRiskReport = serde_json::from_str(&output).unwrap();

        assert_eq!(report.producer.name, PRODUCER_NAME);
        assert_eq!(report.reporting_day.to_string(), "2025-01-31");
        assert_eq!(report.timezone, "UTC");
        assert_eq!(report.evaluated_at_utc, "2025-01-31T06:00:00Z");

        let ids: Vec<&str> = report.athletes.iter().map(|a| a.user_id.as_str()).collect();
        assert_eq!(ids, vec!["absent", "spike", "steady"]);

        assert_eq!(report.athletes[2].tier, Some(RiskTier::Optimal));
        assert_eq!(report.athletes[1].tier, Some(RiskTier::HighRisk));
        assert_eq!(report.summary.high_risk, vec!["spike".to_string()]);
        assert_eq!(report.summary.no_data, vec!["absent".to_string()]);
        assert_eq!(report.summary.insufficient_history, vec!["spike".to_string()]);
    }

    #[test]
    fn test_reporter_uses_configured_timezone() {
        let config = EngineConfig {
            timezone: "JST".to_string(),
            ..Default::default()
        };
        let reporter = TeamReporter::new(config).unwrap();

        let report = reporter.report(Vec::new(), &[], eval_time("2025-01-31T20:00:00Z"));

        assert_eq!(report.reporting_day.to_string(), "2025-02-01");
        assert_eq!(report.timezone, "+09:00");
        assert!(report.athletes.is_empty());
    }

    #[test]
    fn test_reports_have_distinct_ids() {
        let reporter = TeamReporter::new(EngineConfig::default()).unwrap();
        let now = eval_time("2025-01-31T00:00:00Z");

        let first = reporter.report(Vec::new(), &[], now);
        let second = reporter.report(Vec::new(), &[], now);

        assert_ne!(first.producer.report_id, second.producer.report_id);
    }
}
