//! Acute:Chronic Workload Ratio series
//!
//! Turns an athlete's raw training log into one workload point per training day:
//! - Acute load: trailing 7-day summed load
//! - Chronic load: trailing 28-day summed load, expressed per week (÷ 4)
//! - Ratio: acute / chronic, 0 when chronic load is 0
//!
//! The calculator is a pure function of its input and the evaluation time. It holds
//! no mutable state, never fails, and recomputes the full series on every call.

use crate::calendar::{days_between, ReportingCalendar};
use crate::error::ComputeError;
use crate::types::{TrainingRecord, WorkloadPoint};
use chrono::{DateTime, Days, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Default acute window in days
pub const DEFAULT_ACUTE_DAYS: u32 = 7;

/// Default chronic window in days
pub const DEFAULT_CHRONIC_DAYS: u32 = 28;

/// Default number of weeks the chronic sum is averaged over
pub const DEFAULT_CHRONIC_DIVISOR: f64 = 4.0;

/// Days of history (inclusive of the first day) before ratios are considered reliable
pub const DEFAULT_MIN_HISTORY_DAYS: u32 = 21;

/// Window lengths and thresholds for the workload series
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WindowConfig {
    /// Trailing acute window, inclusive of the point's day
    pub acute_days: u32,
    /// Trailing chronic window, inclusive of the point's day
    pub chronic_days: u32,
    /// Divisor turning the chronic sum into a weekly average
    pub chronic_divisor: f64,
    /// Minimum elapsed days since the first record for `has_enough_history`
    pub min_history_days: u32,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            acute_days: DEFAULT_ACUTE_DAYS,
            chronic_days: DEFAULT_CHRONIC_DAYS,
            chronic_divisor: DEFAULT_CHRONIC_DIVISOR,
            min_history_days: DEFAULT_MIN_HISTORY_DAYS,
        }
    }
}

impl WindowConfig {
    /// Check that the windows describe a usable ratio
    pub fn validate(&self) -> Result<(), ComputeError> {
        if self.acute_days == 0 {
            return Err(ComputeError::InvalidConfig(
                "acute_days must be at least 1".to_string(),
            ));
        }
        if self.chronic_days < self.acute_days {
            return Err(ComputeError::InvalidConfig(format!(
                "chronic_days ({}) must not be shorter than acute_days ({})",
                self.chronic_days, self.acute_days
            )));
        }
        if !(self.chronic_divisor.is_finite() && self.chronic_divisor > 0.0) {
            return Err(ComputeError::InvalidConfig(format!(
                "chronic_divisor must be positive, got {}",
                self.chronic_divisor
            )));
        }
        if self.min_history_days == 0 {
            return Err(ComputeError::InvalidConfig(
                "min_history_days must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// Sum session loads into one load per calendar day
pub fn daily_loads(records: &[TrainingRecord]) -> BTreeMap<NaiveDate, f64> {
    let mut by_day: BTreeMap<NaiveDate, f64> = BTreeMap::new();
    for record in records {
        let total = by_day.entry(record.date).or_insert(0.0);
        *total = saturate(*total + record.session_load());
    }
    by_day
}

/// Clamp overflowed sums to the largest finite value; NaN becomes 0
fn saturate(value: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(-f64::MAX, f64::MAX)
    }
}

/// Computes the workload ratio series for a single athlete.
///
/// The caller guarantees all records belong to one athlete; no filtering by
/// `user_id` happens here.
#[derive(Debug, Clone, Default)]
pub struct WorkloadSeriesCalculator {
    config: WindowConfig,
    calendar: ReportingCalendar,
}

impl WorkloadSeriesCalculator {
    /// Create a calculator with explicit windows and calendar policy
    pub fn new(config: WindowConfig, calendar: ReportingCalendar) -> Self {
        Self { config, calendar }
    }

    /// Create a calculator with default windows using the given calendar policy
    pub fn with_calendar(calendar: ReportingCalendar) -> Self {
        Self::new(WindowConfig::default(), calendar)
    }

    pub fn config(&self) -> &WindowConfig {
        &self.config
    }

    pub fn calendar(&self) -> ReportingCalendar {
        self.calendar
    }

    /// Compute one point per distinct training day, in ascending date order.
    ///
    /// Days without records produce no point but count as zero load inside
    /// the windows of other points.
    pub fn compute(
        &self,
        records: &[TrainingRecord],
        evaluation_time: DateTime<Utc>,
    ) -> Vec<WorkloadPoint> {
        let by_day = daily_loads(records);

        let (first_day, last_day) = match (by_day.keys().next(), by_day.keys().next_back()) {
            (Some(first), Some(last)) => (*first, *last),
            _ => return Vec::new(),
        };

        let today = self.calendar.day_of(evaluation_time);
        let days_since_last_training = days_between(last_day, today);
        let min_history = i64::from(self.config.min_history_days);

        by_day
            .keys()
            .map(|&day| {
                let acute_load = window_sum(&by_day, day, self.config.acute_days);
                let chronic_sum = window_sum(&by_day, day, self.config.chronic_days);

                let chronic_load = if chronic_sum > 0.0 {
                    saturate(chronic_sum / self.config.chronic_divisor)
                } else {
                    0.0
                };

                let ratio = if chronic_load > 0.0 {
                    saturate(acute_load / chronic_load)
                } else {
                    0.0
                };

                WorkloadPoint {
                    date: day,
                    acute_load,
                    chronic_load,
                    ratio,
                    has_enough_history: days_between(first_day, day) + 1 >= min_history,
                    last_training_date: last_day,
                    days_since_last_training,
                }
            })
            .collect()
    }

    /// Most recent point of the series, if the athlete has any records
    pub fn latest(
        &self,
        records: &[TrainingRecord],
        evaluation_time: DateTime<Utc>,
    ) -> Option<WorkloadPoint> {
        self.compute(records, evaluation_time).pop()
    }
}

/// Sum of daily loads for known days in `[end - (len - 1), end]`
fn window_sum(by_day: &BTreeMap<NaiveDate, f64>, end: NaiveDate, len: u32) -> f64 {
    let span = u64::from(len.saturating_sub(1));
    let start = end.checked_sub_days(Days::new(span)).unwrap_or(NaiveDate::MIN);
    by_day
        .range(start..=end)
        .fold(0.0, |sum, (_, load)| saturate(sum + load))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn day(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn eval_time(s: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(s).unwrap().with_timezone(&Utc)
    }

    fn consecutive(start: &str, days: u64, load: f64) -> Vec<TrainingRecord> {
        let start = day(start);
        (0..days)
            .map(|i| TrainingRecord::with_load("athlete-1", start + Days::new(i), load))
            .collect()
    }

    #[test]
    fn test_empty_input() {
        let calc = WorkloadSeriesCalculator::default();
        let series = calc.compute(&[], eval_time("2025-02-01T00:00:00Z"));
        assert!(series.is_empty());
    }

    #[test]
    fn test_single_day() {
        let calc = WorkloadSeriesCalculator::default();
        let records = vec![TrainingRecord::from_rpe("athlete-1", day("2025-01-10"), 5.0, 60.0)];

        let series = calc.compute(&records, eval_time("2025-01-12T08:00:00Z"));

        assert_eq!(
            series,
            vec![WorkloadPoint {
                date: day("2025-01-10"),
                acute_load: 300.0,
                chronic_load: 75.0,
                ratio: 4.0,
                has_enough_history: false,
                last_training_date: day("2025-01-10"),
                days_since_last_training: 2,
            }]
        );
    }

    #[test]
    fn test_history_flag_turns_on_at_day_21() {
        let calc = WorkloadSeriesCalculator::default();
        let records = consecutive("2025-03-01", 25, 100.0);

        let series = calc.compute(&records, eval_time("2025-03-25T12:00:00Z"));

        assert_eq!(series.len(), 25);
        for (idx, point) in series.iter().enumerate() {
            // index 20 is the 21st elapsed day counting the first one
            assert_eq!(point.has_enough_history, idx >= 20, "index {idx}");
        }
    }

    #[test]
    fn test_zero_chronic_is_safe() {
        let calc = WorkloadSeriesCalculator::default();
        let records = vec![TrainingRecord::with_load("athlete-1", day("2025-01-01"), 0.0)];

        let series = calc.compute(&records, eval_time("2025-01-01T00:00:00Z"));

        assert_eq!(series.len(), 1);
        assert_eq!(series[0].chronic_load, 0.0);
        assert_eq!(series[0].ratio, 0.0);
        assert!(series[0].ratio.is_finite());
    }

    #[test]
    fn test_acute_window_boundaries() {
        let calc = WorkloadSeriesCalculator::default();
        let mut records = consecutive("2025-05-01", 7, 100.0);

        let series = calc.compute(&records, eval_time("2025-05-10T00:00:00Z"));
        assert_eq!(series.len(), 7);
        assert_eq!(series[6].date, day("2025-05-07"));
        assert_eq!(series[6].acute_load, 700.0);
        assert!(series.iter().all(|p| p.date != day("2025-05-08")));

        records.push(TrainingRecord::with_load("athlete-1", day("2025-05-08"), 0.0));
        let series = calc.compute(&records, eval_time("2025-05-10T00:00:00Z"));
        assert_eq!(series.len(), 8);
        assert_eq!(series[7].date, day("2025-05-08"));
        assert_eq!(series[7].acute_load, 600.0);
        // day 1 is still inside the 28-day window
        assert_eq!(series[7].chronic_load, 175.0);
    }

    #[test]
    fn test_chronic_window_drops_old_days() {
        let calc = WorkloadSeriesCalculator::default();
        let records = vec![
            TrainingRecord::with_load("athlete-1", day("2025-01-01"), 400.0),
            TrainingRecord::with_load("athlete-1", day("2025-01-28"), 400.0),
            TrainingRecord::with_load("athlete-1", day("2025-01-29"), 400.0),
        ];

        let series = calc.compute(&records, eval_time("2025-01-29T00:00:00Z"));

        // 2025-01-28 window is Jan 1..=Jan 28
        assert_eq!(series[1].chronic_load, 200.0);
        // 2025-01-29 window is Jan 2..=Jan 29
        assert_eq!(series[2].chronic_load, 200.0);
        assert_eq!(series[2].acute_load, 800.0);
        assert_eq!(series[2].ratio, 4.0);
    }

    #[test]
    fn test_gaps_produce_no_points() {
        let calc = WorkloadSeriesCalculator::default();
        let records = vec![
            TrainingRecord::with_load("athlete-1", day("2025-01-01"), 100.0),
            TrainingRecord::with_load("athlete-1", day("2025-01-05"), 100.0),
            TrainingRecord::with_load("athlete-1", day("2025-01-09"), 100.0),
        ];

        let series = calc.compute(&records, eval_time("2025-01-09T00:00:00Z"));

        let dates: Vec<NaiveDate> = series.iter().map(|p| p.date).collect();
        assert_eq!(dates, vec![day("2025-01-01"), day("2025-01-05"), day("2025-01-09")]);
        // Jan 1 has left the acute window by Jan 9
        assert_eq!(series[2].acute_load, 200.0);
        assert_eq!(series[2].chronic_load, 75.0);
    }

    #[test]
    fn test_multi_session_day() {
        let calc = WorkloadSeriesCalculator::default();
        let records = vec![
            TrainingRecord::with_load("athlete-1", day("2025-02-03"), 200.0),
            TrainingRecord::with_load("athlete-1", day("2025-02-03"), 150.0),
        ];

        let loads = daily_loads(&records);
        assert_eq!(loads.len(), 1);
        assert_eq!(loads[&day("2025-02-03")], 350.0);

        let series = calc.compute(&records, eval_time("2025-02-03T00:00:00Z"));
        assert_eq!(series.len(), 1);
        assert_eq!(series[0].acute_load, 350.0);
    }

    #[test]
    fn test_huge_loads_stay_finite() {
        let calc = WorkloadSeriesCalculator::default();
        let records = vec![
            TrainingRecord::with_load("athlete-1", day("2025-02-03"), 1e308),
            TrainingRecord::with_load("athlete-1", day("2025-02-03"), 1e308),
            TrainingRecord::with_load("athlete-1", day("2025-02-04"), 1e308),
        ];

        let series = calc.compute(&records, eval_time("2025-02-04T00:00:00Z"));

        assert_eq!(series.len(), 2);
        for point in &series {
            assert!(point.acute_load.is_finite());
            assert!(point.chronic_load.is_finite());
            assert!(point.ratio.is_finite());
        }
        assert_eq!(series[0].acute_load, f64::MAX);
        assert_eq!(series[0].ratio, 4.0);
        assert_eq!(series[1].ratio, 4.0);
    }

    #[test]
    fn test_unsorted_input_is_ordered() {
        let calc = WorkloadSeriesCalculator::default();
        let records = vec![
            TrainingRecord::with_load("athlete-1", day("2025-02-10"), 50.0),
            TrainingRecord::with_load("athlete-1", day("2025-02-01"), 50.0),
            TrainingRecord::with_load("athlete-1", day("2025-02-05"), 50.0),
        ];

        let series = calc.compute(&records, eval_time("2025-02-12T00:00:00Z"));

        assert!(series.windows(2).all(|w| w[0].date < w[1].date));
        assert!(series
            .iter()
            .all(|p| p.last_training_date == day("2025-02-10") && p.days_since_last_training == 2));
    }

    #[test]
    fn test_idempotent() {
        let calc = WorkloadSeriesCalculator::default();
        let records = consecutive("2025-01-01", 40, 250.0);
        let now = eval_time("2025-02-15T06:00:00Z");

        let first = calc.compute(&records, now);
        let second = calc.compute(&records, now);

        assert_eq!(first, second);
    }

    #[test]
    fn test_thirty_days_steady_load() {
        let calc = WorkloadSeriesCalculator::default();
        let records: Vec<TrainingRecord> = (0..30)
            .map(|i| {
                TrainingRecord::from_rpe("athlete-1", day("2025-01-01") + Days::new(i), 6.0, 60.0)
            })
            .collect();

        let series = calc.compute(&records, eval_time("2025-02-03T09:00:00Z"));
        let last = series.last().unwrap();

        assert_eq!(last.date, day("2025-01-30"));
        assert_eq!(last.acute_load, 2520.0);
        assert_eq!(last.chronic_load, 2520.0);
        assert_eq!(last.ratio, 1.0);
        assert!(last.has_enough_history);
        assert_eq!(last.last_training_date, day("2025-01-30"));
        assert_eq!(last.days_since_last_training, 4);
    }

    #[test]
    fn test_days_since_uses_reporting_calendar() {
        let records = vec![TrainingRecord::with_load("athlete-1", day("2025-01-30"), 100.0)];
        // 16:00 UTC on Jan 30 is already Jan 31 in Tokyo
        let now = eval_time("2025-01-30T16:00:00Z");

        let utc = WorkloadSeriesCalculator::with_calendar(ReportingCalendar::utc());
        let jst = WorkloadSeriesCalculator::with_calendar(ReportingCalendar::jst());

        assert_eq!(utc.latest(&records, now).unwrap().days_since_last_training, 0);
        assert_eq!(jst.latest(&records, now).unwrap().days_since_last_training, 1);
    }

    #[test]
    fn test_future_records_give_negative_days_since() {
        let calc = WorkloadSeriesCalculator::default();
        let records = vec![TrainingRecord::with_load("athlete-1", day("2025-03-05"), 100.0)];

        let point = calc.latest(&records, eval_time("2025-03-03T00:00:00Z")).unwrap();
        assert_eq!(point.days_since_last_training, -2);
    }

    #[test]
    fn test_shareable_across_threads() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<WorkloadSeriesCalculator>();

        let calc = std::sync::Arc::new(WorkloadSeriesCalculator::default());
        let now = eval_time("2025-02-01T00:00:00Z");
        let handles: Vec<_> = (0..4u64)
            .map(|i| {
                let calc = std::sync::Arc::clone(&calc);
                std::thread::spawn(move || {
                    let records = consecutive("2025-01-01", 10 + i, 100.0);
                    calc.compute(&records, now).len()
                })
            })
            .collect();

        let lens: Vec<usize> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        assert_eq!(lens, vec![10, 11, 12, 13]);
    }

    #[test]
    fn test_custom_windows() {
        let config = WindowConfig {
            acute_days: 3,
            chronic_days: 14,
            chronic_divisor: 2.0,
            min_history_days: 5,
        };
        let calc = WorkloadSeriesCalculator::new(config, ReportingCalendar::utc());
        let records = consecutive("2025-04-01", 5, 10.0);

        let series = calc.compute(&records, eval_time("2025-04-05T00:00:00Z"));
        let last = series.last().unwrap();

        assert_eq!(last.acute_load, 30.0);
        assert_eq!(last.chronic_load, 25.0);
        assert!((last.ratio - 1.2).abs() < 1e-9);
        assert!(last.has_enough_history);
        assert!(!series[3].has_enough_history);
    }

    #[test]
    fn test_window_config_validation() {
        assert!(WindowConfig::default().validate().is_ok());

        let bad = WindowConfig {
            acute_days: 0,
            ..Default::default()
        };
        assert!(bad.validate().is_err());

        let bad = WindowConfig {
            acute_days: 14,
            chronic_days: 7,
            ..Default::default()
        };
        assert!(bad.validate().is_err());

        let bad = WindowConfig {
            chronic_divisor: 0.0,
            ..Default::default()
        };
        assert!(bad.validate().is_err());
    }
}
