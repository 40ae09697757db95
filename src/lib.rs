//! ACWR Flux - Acute:Chronic Workload Ratio engine for athlete monitoring
//!
//! Flux turns an athlete's raw training log into a rolling injury-risk signal
//! through a deterministic pipeline: record adaptation → calendar-day
//! normalization → daily load aggregation → acute/chronic windowing → risk tiers.
//!
//! ## Modules
//!
//! - **Calculator**: Per-athlete workload ratio series, one point per training day
//! - **Alerts**: Risk tiers and team summaries built from each athlete's latest point

pub mod alerts;
pub mod calculator;
pub mod calendar;
pub mod config;
pub mod error;
pub mod pipeline;
pub mod records;
pub mod types;

// FFI bindings for C interop (always available for cdylib/staticlib builds)
pub mod ffi;

pub use alerts::{AlertThresholds, AthleteStatus, RiskTier, TeamRiskSummary};
pub use calculator::{daily_loads, WindowConfig, WorkloadSeriesCalculator};
pub use calendar::ReportingCalendar;
pub use config::EngineConfig;
pub use error::ComputeError;
pub use pipeline::{team_report_json, workload_series_json, TeamReporter, TeamRiskReport};
pub use records::{RawTrainingRecord, RecordAdapter};
pub use types::{TrainingRecord, WorkloadPoint};

/// Flux version embedded in all reports
pub const FLUX_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Producer name for reports
pub const PRODUCER_NAME: &str = "acwr-flux";
