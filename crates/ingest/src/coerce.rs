//! Lenient cell conversions. Bad values fall back to safe defaults at the
//! point of use instead of failing the batch.

use chrono::SecondsFormat;
use tracefall_core::time::{datetime_to_millis, parse_timestamp_millis};

use crate::batch::Cell;

/// Numbers, big integers, dates (epoch millis), numeric strings and RFC 3339
/// strings. Anything else is 0.
pub fn to_number(cell: &Cell) -> f64 {
    match cell {
        Cell::Null => 0.0,
        Cell::Bool(b) => f64::from(u8::from(*b)),
        Cell::Int(i) => *i as f64,
        Cell::BigInt(i) => *i as f64,
        Cell::Float(f) => *f,
        Cell::Str(s) => s
            .trim()
            .parse::<f64>()
            .or_else(|_| parse_timestamp_millis(s))
            .unwrap_or(0.0),
        Cell::Date(ts) => datetime_to_millis(ts),
    }
}

/// Text form of a cell; null is `""`.
pub fn to_text(cell: &Cell) -> String {
    match cell {
        Cell::Null => String::new(),
        Cell::Bool(b) => b.to_string(),
        Cell::Int(i) => i.to_string(),
        Cell::BigInt(i) => i.to_string(),
        Cell::Float(f) => f.to_string(),
        Cell::Str(s) => s.clone(),
        Cell::Date(ts) => ts.to_rfc3339_opts(SecondsFormat::AutoSi, true),
    }
}

/// Empty or null parent ids mean "no parent".
pub fn to_parent(cell: &Cell) -> Option<String> {
    let text = to_text(cell);
    if text.trim().is_empty() {
        None
    } else {
        Some(text)
    }
}

pub fn to_optional_text(cell: &Cell) -> Option<String> {
    match cell {
        Cell::Null => None,
        other => Some(to_text(other)),
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use super::*;

    #[test]
    fn numbers_accept_every_numeric_shape() {
        assert_eq!(to_number(&Cell::Int(42)), 42.0);
        assert_eq!(to_number(&Cell::BigInt(1_700_000_000_000)), 1_700_000_000_000.0);
        assert_eq!(to_number(&Cell::Float(1.5)), 1.5);
        assert_eq!(to_number(&Cell::Str(" 12.5 ".into())), 12.5);
        assert_eq!(to_number(&Cell::Str("soon".into())), 0.0);
        assert_eq!(
            to_number(&Cell::Str("2026-02-01T00:00:00.250Z".into())),
            1_769_904_000_250.0
        );
        assert_eq!(to_number(&Cell::Null), 0.0);
        let ts = Utc.with_ymd_and_hms(2026, 2, 1, 0, 0, 0).unwrap();
        assert_eq!(to_number(&Cell::Date(ts)), ts.timestamp_millis() as f64);
    }

    #[test]
    fn text_and_parent_defaults() {
        assert_eq!(to_text(&Cell::Null), "");
        assert_eq!(to_text(&Cell::Int(7)), "7");
        assert_eq!(to_parent(&Cell::Str(String::new())), None);
        assert_eq!(to_parent(&Cell::Null), None);
        assert_eq!(to_parent(&Cell::Str("root".into())).as_deref(), Some("root"));
        assert_eq!(to_optional_text(&Cell::Null), None);
    }
}
