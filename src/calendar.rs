//! Calendar-day policy
//!
//! Training is aggregated per calendar day, and "days since last training" is
//! counted from the evaluation day. Which instant belongs to which day depends on
//! the reporting timezone, so the policy is injected rather than hardcoded.

use crate::error::ComputeError;
use chrono::{DateTime, FixedOffset, NaiveDate, Offset, Utc};

const JST_OFFSET_SECONDS: i32 = 9 * 3600;

/// Maps instants to reporting calendar days using a fixed UTC offset
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReportingCalendar {
    offset_seconds: i32,
}

impl Default for ReportingCalendar {
    fn default() -> Self {
        Self::utc()
    }
}

impl ReportingCalendar {
    /// Days begin at 00:00 UTC
    pub const fn utc() -> Self {
        Self { offset_seconds: 0 }
    }

    /// Days begin at 00:00 Japan Standard Time (UTC+09:00)
    pub const fn jst() -> Self {
        Self {
            offset_seconds: JST_OFFSET_SECONDS,
        }
    }

    /// Create a calendar from an offset east of UTC, in seconds
    pub fn from_offset_seconds(offset_seconds: i32) -> Result<Self, ComputeError> {
        FixedOffset::east_opt(offset_seconds).ok_or_else(|| {
            ComputeError::InvalidTimezone(format!("offset out of range: {offset_seconds}s"))
        })?;
        Ok(Self { offset_seconds })
    }

    /// Parse a timezone policy.
    ///
    /// Accepts `UTC`/`Z`, `JST`/`Asia/Tokyo`, or an explicit `±HH:MM` offset.
    pub fn parse(policy: &str) -> Result<Self, ComputeError> {
        let trimmed = policy.trim();
        match trimmed.to_ascii_uppercase().as_str() {
            "UTC" | "Z" | "ETC/UTC" | "GMT" => return Ok(Self::utc()),
            "JST" | "ASIA/TOKYO" => return Ok(Self::jst()),
            _ => {}
        }

        let (sign, rest) = match trimmed.as_bytes().first() {
            Some(b'+') => (1, &trimmed[1..]),
            Some(b'-') => (-1, &trimmed[1..]),
            _ => return Err(ComputeError::InvalidTimezone(trimmed.to_string())),
        };

        let (hours, minutes) = rest
            .split_once(':')
            .ok_or_else(|| ComputeError::InvalidTimezone(trimmed.to_string()))?;
        let hours: i32 = hours
            .parse()
            .map_err(|_| ComputeError::InvalidTimezone(trimmed.to_string()))?;
        let minutes: i32 = minutes
            .parse()
            .map_err(|_| ComputeError::InvalidTimezone(trimmed.to_string()))?;
        if !(0..24).contains(&hours) || !(0..60).contains(&minutes) {
            return Err(ComputeError::InvalidTimezone(trimmed.to_string()));
        }

        Self::from_offset_seconds(sign * (hours * 3600 + minutes * 60))
    }

    /// Offset east of UTC, in seconds
    pub fn offset_seconds(&self) -> i32 {
        self.offset_seconds
    }

    /// Human-readable offset label, e.g. `UTC` or `+09:00`
    pub fn label(&self) -> String {
        if self.offset_seconds == 0 {
            return "UTC".to_string();
        }
        let sign = if self.offset_seconds < 0 { '-' } else { '+' };
        let abs = self.offset_seconds.abs();
        format!("{}{:02}:{:02}", sign, abs / 3600, (abs % 3600) / 60)
    }

    fn offset(&self) -> FixedOffset {
        // Range is checked at construction.
        FixedOffset::east_opt(self.offset_seconds).unwrap_or_else(|| Utc.fix())
    }

    /// Calendar day an instant falls on in this reporting zone
    pub fn day_of(&self, instant: DateTime<Utc>) -> NaiveDate {
        instant.with_timezone(&self.offset()).date_naive()
    }

    /// Normalize a date field to a calendar day.
    ///
    /// A bare `YYYY-MM-DD` is already a calendar day and is taken as-is. A full
    /// RFC 3339 timestamp is bucketed into the reporting day it falls on.
    pub fn normalize_day(&self, raw: &str) -> Result<NaiveDate, ComputeError> {
        let trimmed = raw.trim();

        if let Ok(day) = NaiveDate::parse_from_str(trimmed, "%Y-%m-%d") {
            return Ok(day);
        }

        DateTime::parse_from_rfc3339(trimmed)
            .map(|dt| self.day_of(dt.with_timezone(&Utc)))
            .map_err(|e| ComputeError::DateParseError(format!("{trimmed:?}: {e}")))
    }
}

/// Whole days from `from` to `to` (negative when `to` is earlier)
pub fn days_between(from: NaiveDate, to: NaiveDate) -> i64 {
    (to - from).num_days()
}
