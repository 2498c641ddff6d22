/// Ellipsis appended to truncated labels.
pub const ELLIPSIS: char = '…';

/// Shorten `text` until `measure` says it fits in `max_width`, dropping
/// trailing characters and appending an ellipsis. Reapplying the function to
/// its own output returns the output unchanged.
pub fn truncate_to_width<F>(text: &str, max_width: f64, measure: F) -> String
where
    F: Fn(&str) -> f64,
{
    if !(max_width > 0.0) {
        return String::new();
    }
    if measure(text) <= max_width {
        return text.to_string();
    }

    let mut base: String = text.strip_suffix(ELLIPSIS).unwrap_or(text).to_string();
    loop {
        let mut candidate = base.clone();
        candidate.push(ELLIPSIS);
        if measure(&candidate) <= max_width {
            return candidate;
        }
        if base.pop().is_none() {
            return String::new();
        }
    }
}
