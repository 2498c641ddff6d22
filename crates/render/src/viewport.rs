use std::ops::Range;

/// Rows intersecting a viewport of `height` scrolled by `scroll_offset`,
/// clamped to `[0, row_count)`.
pub fn visible_rows(
    row_count: usize,
    scroll_offset: f64,
    height: f64,
    axis_height: f64,
    row_height: f64,
) -> Range<usize> {
    if row_count == 0 || !(row_height > 0.0) {
        return 0..0;
    }
    let scroll = if scroll_offset.is_finite() {
        scroll_offset.max(0.0)
    } else {
        0.0
    };
    let first = ((scroll / row_height).floor() as usize).min(row_count);
    let body = (height - axis_height).max(0.0);
    // Count from the top of the first row, which may sit partly above the band.
    let count = ((scroll % row_height + body) / row_height).ceil() as usize;
    first..first.saturating_add(count).min(row_count)
}

/// Largest scroll offset that still shows the last row at the bottom.
pub fn max_scroll(row_count: usize, height: f64, axis_height: f64, row_height: f64) -> f64 {
    let content = row_count as f64 * row_height;
    let body = (height - axis_height).max(0.0);
    (content - body).max(0.0)
}

/// Row under `pointer_y`, or `None` over the axis band or past the last row.
pub fn row_at(
    pointer_y: f64,
    scroll_offset: f64,
    axis_height: f64,
    row_height: f64,
    row_count: usize,
) -> Option<usize> {
    if !pointer_y.is_finite() || pointer_y < axis_height || !(row_height > 0.0) {
        return None;
    }
    let row = ((pointer_y - axis_height + scroll_offset) / row_height).floor();
    if !(row.is_finite() && row >= 0.0) {
        return None;
    }
    let row = row as usize;
    (row < row_count).then_some(row)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn culls_to_viewport() {
        assert_eq!(visible_rows(1000, 0.0, 128.0, 28.0, 20.0), 0..5);
        assert_eq!(visible_rows(1000, 0.0, 130.0, 28.0, 20.0), 0..6);
        assert_eq!(visible_rows(1000, 410.0, 128.0, 28.0, 20.0), 20..26);
        assert_eq!(visible_rows(3, 0.0, 500.0, 28.0, 20.0), 0..3);
        assert_eq!(visible_rows(10, 10_000.0, 128.0, 28.0, 20.0), 10..10);
        assert_eq!(visible_rows(0, 0.0, 128.0, 28.0, 20.0), 0..0);
        assert_eq!(visible_rows(10, -50.0, 128.0, 28.0, 20.0), 0..5);
    }

    #[test]
    fn max_scroll_reveals_last_row() {
        assert_eq!(max_scroll(10, 128.0, 28.0, 20.0), 100.0);
        assert_eq!(max_scroll(2, 128.0, 28.0, 20.0), 0.0);
    }

    #[test]
    fn maps_pointer_to_rows() {
        assert_eq!(row_at(10.0, 0.0, 28.0, 20.0, 5), None);
        assert_eq!(row_at(28.0, 0.0, 28.0, 20.0, 5), Some(0));
        assert_eq!(row_at(47.9, 0.0, 28.0, 20.0, 5), Some(0));
        assert_eq!(row_at(48.0, 0.0, 28.0, 20.0, 5), Some(1));
        assert_eq!(row_at(30.0, 40.0, 28.0, 20.0, 5), Some(2));
        assert_eq!(row_at(200.0, 0.0, 28.0, 20.0, 5), None);
        assert_eq!(row_at(f64::NAN, 0.0, 28.0, 20.0, 5), None);
    }
}
