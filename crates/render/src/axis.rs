use tracefall_core::format::format_tick;

const NICE_MANTISSAS: [f64; 4] = [1.0, 2.0, 5.0, 10.0];

#[derive(Debug, Clone, PartialEq)]
pub struct Tick {
    /// Offset from trace start, millis.
    pub offset_ms: f64,
    pub x: f64,
    pub label: String,
}

/// Round `total / desired` up to 1, 2, 5 or 10 times its power of ten.
pub fn nice_interval(total_duration: f64, desired_ticks: usize) -> Option<f64> {
    if desired_ticks == 0 || !(total_duration.is_finite() && total_duration > 0.0) {
        return None;
    }
    let raw = total_duration / desired_ticks as f64;
    let magnitude = 10f64.powf(raw.log10().floor());
    if !(magnitude.is_finite() && magnitude > 0.0) {
        return None;
    }
    let residual = raw / magnitude;
    let mantissa = NICE_MANTISSAS
        .iter()
        .copied()
        .find(|&m| m >= residual)
        .unwrap_or(10.0);
    Some(mantissa * magnitude)
}

/// Ticks from trace start to trace end, mapped onto the timeline region.
pub fn ticks(
    total_duration: f64,
    desired_ticks: usize,
    timeline_x: f64,
    timeline_width: f64,
) -> Vec<Tick> {
    let Some(interval) = nice_interval(total_duration, desired_ticks) else {
        return Vec::new();
    };
    // Tolerate float drift on the last tick.
    let limit = total_duration + interval * 1e-9;
    let mut out = Vec::new();
    let mut i = 0u32;
    loop {
        let offset_ms = f64::from(i) * interval;
        if offset_ms > limit {
            break;
        }
        out.push(Tick {
            offset_ms,
            x: timeline_x + offset_ms / total_duration * timeline_width,
            label: format_tick(offset_ms),
        });
        i += 1;
    }
    out
}
