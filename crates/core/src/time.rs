use chrono::{DateTime, Utc};

use crate::error::{Result, TracefallError};

/// Epoch milliseconds, keeping sub-millisecond precision.
pub fn datetime_to_millis(ts: &DateTime<Utc>) -> f64 {
    ts.timestamp_millis() as f64 + f64::from(ts.timestamp_subsec_nanos() % 1_000_000) / 1_000_000.0
}

pub fn parse_timestamp(input: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(input.trim())
        .map(|ts| ts.with_timezone(&Utc))
        .map_err(|e| TracefallError::Parse(format!("expected RFC3339 time, got {input}: {e}")))
}

pub fn parse_timestamp_millis(input: &str) -> Result<f64> {
    parse_timestamp(input).map(|ts| datetime_to_millis(&ts))
}

/// Epoch nanoseconds to epoch milliseconds.
pub fn nanos_to_millis(nanos: u64) -> f64 {
    (nanos / 1_000_000) as f64 + (nanos % 1_000_000) as f64 / 1_000_000.0
}
