//! Core types for the ACWR Flux engine
//!
//! This module defines the data that crosses the engine boundary: the training
//! records an athlete logs, and the workload points derived from them.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// A single logged training session.
///
/// Records are owned by the caller and read-only to the engine. Several records
/// may share a `date`; their loads are summed into one daily load.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingRecord {
    /// Opaque athlete identifier
    pub user_id: String,
    /// Calendar day of the session (the unit of aggregation)
    pub date: NaiveDate,
    /// Session rating of perceived exertion
    pub rpe: Option<f64>,
    /// Session duration (minutes)
    pub duration_minutes: Option<f64>,
    /// Precomputed session load, takes precedence over `rpe × duration_minutes`
    pub load: Option<f64>,
}

impl TrainingRecord {
    /// Create a record from RPE and duration, leaving the load to be derived
    pub fn from_rpe(
        user_id: impl Into<String>,
        date: NaiveDate,
        rpe: f64,
        duration_minutes: f64,
    ) -> Self {
        Self {
            user_id: user_id.into(),
            date,
            rpe: Some(rpe),
            duration_minutes: Some(duration_minutes),
            load: None,
        }
    }

    /// Create a record carrying a precomputed load
    pub fn with_load(user_id: impl Into<String>, date: NaiveDate, load: f64) -> Self {
        Self {
            user_id: user_id.into(),
            date,
            rpe: None,
            duration_minutes: None,
            load: Some(load),
        }
    }

    /// Session load (sRPE).
    ///
    /// Uses `load` when present, otherwise `rpe × duration_minutes` with missing
    /// components treated as 0. Non-finite results contribute nothing.
    pub fn session_load(&self) -> f64 {
        let load = match self.load {
            Some(load) => load,
            None => self.rpe.unwrap_or(0.0) * self.duration_minutes.unwrap_or(0.0),
        };

        if load.is_finite() {
            load
        } else {
            0.0
        }
    }
}

/// Workload ratio data point for one training day
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkloadPoint {
    /// The day this point describes
    pub date: NaiveDate,
    /// Summed load over the trailing acute window (7 days, inclusive)
    pub acute_load: f64,
    /// Average weekly load over the trailing chronic window (28 days / 4)
    pub chronic_load: f64,
    /// `acute_load / chronic_load`, or 0 when chronic load is 0
    pub ratio: f64,
    /// Whether the athlete's history had reached the minimum length on this day
    pub has_enough_history: bool,
    /// Most recent training day in the whole input (same for every point)
    pub last_training_date: NaiveDate,
    /// Whole days between the evaluation day and `last_training_date`
    pub days_since_last_training: i64,
}
