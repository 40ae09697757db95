//! Risk tiers and team summaries
//!
//! The daily alert job looks only at the most recent workload point of each
//! athlete and buckets it by ratio. Athletes whose last training is too old (or
//! who have no records at all) are reported separately as "no data".

use crate::error::ComputeError;
use crate::types::WorkloadPoint;
use serde::{Deserialize, Serialize};

/// Ratio tier of an athlete's latest workload point
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskTier {
    /// Ratio above the high-risk threshold (spike in load)
    HighRisk,
    /// Ratio inside the caution band
    Caution,
    /// Ratio in the normal range
    Optimal,
    /// Ratio below the low-load threshold (detraining)
    LowLoad,
}

impl RiskTier {
    pub fn as_str(&self) -> &'static str {
        match self {
            RiskTier::HighRisk => "high_risk",
            RiskTier::Caution => "caution",
            RiskTier::Optimal => "optimal",
            RiskTier::LowLoad => "low_load",
        }
    }
}

/// Tier boundaries used by the alerting job
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AlertThresholds {
    /// Ratios strictly above this are high risk
    pub high_risk_above: f64,
    /// Ratios at or above this (and not high risk) need caution
    pub caution_from: f64,
    /// Ratios strictly below this are low load
    pub low_load_below: f64,
    /// More days than this since the last session raises a no-data alert
    pub no_data_after_days: i64,
}

impl Default for AlertThresholds {
    fn default() -> Self {
        Self {
            high_risk_above: 1.5,
            caution_from: 1.3,
            low_load_below: 0.8,
            no_data_after_days: 3,
        }
    }
}

impl AlertThresholds {
    pub fn validate(&self) -> Result<(), ComputeError> {
        let ordered = self.low_load_below <= self.caution_from
            && self.caution_from <= self.high_risk_above;
        if !ordered {
            return Err(ComputeError::InvalidConfig(format!(
                "expected low_load_below <= caution_from <= high_risk_above, got {} / {} / {}",
                self.low_load_below, self.caution_from, self.high_risk_above
            )));
        }
        if self.no_data_after_days < 0 {
            return Err(ComputeError::InvalidConfig(
                "no_data_after_days must not be negative".to_string(),
            ));
        }
        Ok(())
    }

    /// Classify a ratio
    pub fn tier(&self, ratio: f64) -> RiskTier {
        if ratio > self.high_risk_above {
            RiskTier::HighRisk
        } else if ratio >= self.caution_from {
            RiskTier::Caution
        } else if ratio < self.low_load_below {
            RiskTier::LowLoad
        } else {
            RiskTier::Optimal
        }
    }

    /// Whether the athlete has gone too long without a recorded session
    pub fn is_stale(&self, point: &WorkloadPoint) -> bool {
        point.days_since_last_training > self.no_data_after_days
    }

    /// Status of one athlete from their latest point
    pub fn assess(&self, user_id: &str, latest: Option<WorkloadPoint>) -> AthleteStatus {
        match latest {
            Some(point) => AthleteStatus {
                user_id: user_id.to_string(),
                tier: Some(self.tier(point.ratio)),
                no_data: self.is_stale(&point),
                latest: Some(point),
            },
            None => AthleteStatus {
                user_id: user_id.to_string(),
                tier: None,
                no_data: true,
                latest: None,
            },
        }
    }
}

/// Alerting view of one athlete
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AthleteStatus {
    pub user_id: String,
    /// Tier of the latest point, absent when the athlete has no records
    pub tier: Option<RiskTier>,
    /// Latest workload point
    pub latest: Option<WorkloadPoint>,
    /// No records, or last session older than the no-data threshold
    pub no_data: bool,
}

/// Athlete ids bucketed by alert category
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TeamRiskSummary {
    pub high_risk: Vec<String>,
    pub caution: Vec<String>,
    pub optimal: Vec<String>,
    pub low_load: Vec<String>,
    pub no_data: Vec<String>,
    /// Latest point not yet backed by the minimum history
    pub insufficient_history: Vec<String>,
}

impl TeamRiskSummary {
    /// Bucket statuses; ids come out sorted
    pub fn from_statuses(statuses: &[AthleteStatus]) -> Self {
        let mut summary = Self::default();

        for status in statuses {
            let id = status.user_id.clone();

            match status.tier {
                Some(RiskTier::HighRisk) => summary.high_risk.push(id.clone()),
                Some(RiskTier::Caution) => summary.caution.push(id.clone()),
                Some(RiskTier::Optimal) => summary.optimal.push(id.clone()),
                Some(RiskTier::LowLoad) => summary.low_load.push(id.clone()),
                None => {}
            }

            if status
                .latest
                .as_ref()
                .is_some_and(|point| !point.has_enough_history)
            {
                summary.insufficient_history.push(id.clone());
            }

            if status.no_data {
                summary.no_data.push(id);
            }
        }

        for bucket in [
            &mut summary.high_risk,
            &mut summary.caution,
            &mut summary.optimal,
            &mut summary.low_load,
            &mut summary.no_data,
            &mut summary.insufficient_history,
        ] {
            bucket.sort();
        }

        summary
    }

    /// Whether anything in the summary warrants notifying a coach
    pub fn needs_attention(&self) -> bool {
        !(self.high_risk.is_empty()
            && self.caution.is_empty()
            && self.low_load.is_empty()
            && self.no_data.is_empty())
    }
}
