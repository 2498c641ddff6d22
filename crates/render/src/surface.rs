use serde::{Deserialize, Serialize};
use tracefall_core::palette::Color;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub const fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn right(&self) -> f64 {
        self.x + self.width
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TextAlign {
    Left,
    Center,
    Right,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FontWeight {
    Normal,
    Bold,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Font {
    pub size: f64,
    pub weight: FontWeight,
}

impl Font {
    pub const fn regular(size: f64) -> Self {
        Self {
            size,
            weight: FontWeight::Normal,
        }
    }

    pub const fn bold(size: f64) -> Self {
        Self {
            size,
            weight: FontWeight::Bold,
        }
    }
}

/// A 2D drawing target in logical pixels.
///
/// `set_scale` applies the display density transform once per frame; every
/// later coordinate, stroke width and font size is logical.
pub trait Surface {
    fn set_scale(&mut self, scale: f64);
    fn clear(&mut self, width: f64, height: f64, color: Color);
    fn fill_rect(&mut self, rect: Rect, color: Color);
    fn stroke_rect(&mut self, rect: Rect, color: Color, line_width: f64);
    fn line(&mut self, from: Point, to: Point, color: Color, line_width: f64);
    /// Draw text vertically centered on `at.y`.
    fn fill_text(&mut self, text: &str, at: Point, font: Font, color: Color, align: TextAlign);
    fn measure_text(&self, text: &str, font: Font) -> f64;
}

/// Advance-width model shared by the built-in surfaces: every character is
/// 0.6 em wide, which matches common monospace faces.
pub fn monospace_width(text: &str, font: Font) -> f64 {
    text.chars().count() as f64 * font.size * 0.6
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum DrawCommand {
    SetScale {
        scale: f64,
    },
    Clear {
        width: f64,
        height: f64,
        color: Color,
    },
    FillRect {
        rect: Rect,
        color: Color,
    },
    StrokeRect {
        rect: Rect,
        color: Color,
        line_width: f64,
    },
    Line {
        from: Point,
        to: Point,
        color: Color,
        line_width: f64,
    },
    Text {
        text: String,
        at: Point,
        font: Font,
        color: Color,
        align: TextAlign,
    },
}

/// Surface that keeps every call as a [`DrawCommand`].
#[derive(Debug, Default)]
pub struct RecordingSurface {
    commands: Vec<DrawCommand>,
}

impl RecordingSurface {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn commands(&self) -> &[DrawCommand] {
        &self.commands
    }

    pub fn take_commands(&mut self) -> Vec<DrawCommand> {
        std::mem::take(&mut self.commands)
    }

    pub fn texts(&self) -> Vec<&str> {
        self.commands
            .iter()
            .filter_map(|c| match c {
                DrawCommand::Text { text, .. } => Some(text.as_str()),
                _ => None,
            })
            .collect()
    }

    pub fn filled_rects(&self) -> Vec<(Rect, Color)> {
        self.commands
            .iter()
            .filter_map(|c| match c {
                DrawCommand::FillRect { rect, color } => Some((*rect, *color)),
                _ => None,
            })
            .collect()
    }

    pub fn stroked_rects(&self) -> Vec<(Rect, Color, f64)> {
        self.commands
            .iter()
            .filter_map(|c| match c {
                DrawCommand::StrokeRect {
                    rect,
                    color,
                    line_width,
                } => Some((*rect, *color, *line_width)),
                _ => None,
            })
            .collect()
    }

    /// Replay the recording onto another surface.
    pub fn replay<S: Surface + ?Sized>(&self, target: &mut S) {
        for command in &self.commands {
            match command {
                DrawCommand::SetScale { scale } => target.set_scale(*scale),
                DrawCommand::Clear {
                    width,
                    height,
                    color,
                } => target.clear(*width, *height, *color),
                DrawCommand::FillRect { rect, color } => target.fill_rect(*rect, *color),
                DrawCommand::StrokeRect {
                    rect,
                    color,
                    line_width,
                } => target.stroke_rect(*rect, *color, *line_width),
                DrawCommand::Line {
                    from,
                    to,
                    color,
                    line_width,
                } => target.line(*from, *to, *color, *line_width),
                DrawCommand::Text {
                    text,
                    at,
                    font,
                    color,
                    align,
                } => target.fill_text(text, *at, *font, *color, *align),
            }
        }
    }
}

impl Surface for RecordingSurface {
    fn set_scale(&mut self, scale: f64) {
        // Every frame begins with the density transform.
        self.commands.clear();
        self.commands.push(DrawCommand::SetScale { scale });
    }

    fn clear(&mut self, width: f64, height: f64, color: Color) {
        self.commands.push(DrawCommand::Clear {
            width,
            height,
            color,
        });
    }

    fn fill_rect(&mut self, rect: Rect, color: Color) {
        self.commands.push(DrawCommand::FillRect { rect, color });
    }

    fn stroke_rect(&mut self, rect: Rect, color: Color, line_width: f64) {
        self.commands.push(DrawCommand::StrokeRect {
            rect,
            color,
            line_width,
        });
    }

    fn line(&mut self, from: Point, to: Point, color: Color, line_width: f64) {
        self.commands.push(DrawCommand::Line {
            from,
            to,
            color,
            line_width,
        });
    }

    fn fill_text(&mut self, text: &str, at: Point, font: Font, color: Color, align: TextAlign) {
        self.commands.push(DrawCommand::Text {
            text: text.to_string(),
            at,
            font,
            color,
            align,
        });
    }

    fn measure_text(&self, text: &str, font: Font) -> f64 {
        monospace_width(text, font)
    }
}
