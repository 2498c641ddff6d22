use crate::model::span::RawSpan;

/// Human-readable span duration: microseconds under 1ms, milliseconds with
/// one decimal under a second, seconds with two decimals otherwise.
pub fn format_duration(duration_ms: f64) -> String {
    if !duration_ms.is_finite() {
        return "0µs".to_string();
    }
    if duration_ms < 1.0 {
        format!("{:.0}µs", (duration_ms * 1000.0).round())
    } else if duration_ms < 1000.0 {
        format!("{duration_ms:.1}ms")
    } else {
        format!("{:.2}s", duration_ms / 1000.0)
    }
}

/// Hover text: `"<service>: <span name>\n<duration>"`.
pub fn tooltip_text(span: &RawSpan) -> String {
    format!(
        "{}: {}\n{}",
        span.service_name,
        span.span_name,
        format_duration(span.duration)
    )
}

/// Axis label for an offset from trace start, with trailing zeros trimmed.
pub fn format_tick(offset_ms: f64) -> String {
    if !offset_ms.is_finite() || offset_ms == 0.0 {
        return "0".to_string();
    }
    let magnitude = offset_ms.abs();
    if magnitude < 1.0 {
        format!("{}µs", trim_decimals(offset_ms * 1000.0, 1))
    } else if magnitude < 1000.0 {
        format!("{}ms", trim_decimals(offset_ms, 3))
    } else {
        format!("{}s", trim_decimals(offset_ms / 1000.0, 3))
    }
}

fn trim_decimals(value: f64, places: usize) -> String {
    let rendered = format!("{value:.places$}");
    if rendered.contains('.') {
        rendered
            .trim_end_matches('0')
            .trim_end_matches('.')
            .to_string()
    } else {
        rendered
    }
}
