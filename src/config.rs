//! Engine configuration
//!
//! Window lengths, alert thresholds and the reporting timezone, loadable from a
//! JSON file. Every field has a default, so partial files are accepted.

use crate::alerts::AlertThresholds;
use crate::calculator::{WindowConfig, WorkloadSeriesCalculator};
use crate::calendar::ReportingCalendar;
use crate::error::ComputeError;
use serde::{Deserialize, Serialize};

/// Default reporting timezone
pub const DEFAULT_TIMEZONE: &str = "UTC";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub window: WindowConfig,
    pub alerts: AlertThresholds,
    /// Calendar-day policy (`UTC`, `JST`, or `±HH:MM`)
    pub timezone: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            window: WindowConfig::default(),
            alerts: AlertThresholds::default(),
            timezone: DEFAULT_TIMEZONE.to_string(),
        }
    }
}

impl EngineConfig {
    /// Load and validate configuration from JSON
    pub fn from_json(json: &str) -> Result<Self, ComputeError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize configuration to pretty JSON
    pub fn to_json(&self) -> Result<String, ComputeError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn validate(&self) -> Result<(), ComputeError> {
        self.window.validate()?;
        self.alerts.validate()?;
        self.calendar()?;
        Ok(())
    }

    /// Calendar policy named by `timezone`
    pub fn calendar(&self) -> Result<ReportingCalendar, ComputeError> {
        ReportingCalendar::parse(&self.timezone)
    }

    /// Calculator configured with these windows and calendar policy
    pub fn calculator(&self) -> Result<WorkloadSeriesCalculator, ComputeError> {
        Ok(WorkloadSeriesCalculator::new(
            self.window.clone(),
            self.calendar()?,
        ))
    }
}
