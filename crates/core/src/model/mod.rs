pub mod span;

/// Geometry defaults for the waterfall view, in logical pixels.
pub mod constants {
    pub const ROW_HEIGHT: f64 = 36.0;
    pub const AXIS_HEIGHT: f64 = 28.0;
    pub const TREE_WIDTH: f64 = 320.0;
    pub const INDENT_UNIT: f64 = 14.0;
    pub const MIN_BAR_WIDTH: f64 = 2.0;
    pub const BAR_HEIGHT: f64 = 14.0;
    pub const PADDING: f64 = 8.0;
    pub const GLYPH_WIDTH: f64 = 16.0;
    pub const TICK_COUNT: usize = 8;
    pub const TICK_MARK_LENGTH: f64 = 5.0;
    pub const NAME_FONT_SIZE: f64 = 12.0;
    pub const SERVICE_FONT_SIZE: f64 = 10.0;
    pub const AXIS_FONT_SIZE: f64 = 10.0;
    pub const LABEL_GAP: f64 = 4.0;
}
