use std::fmt::Write as _;

use tracefall_core::palette::Color;

use crate::surface::{Font, FontWeight, Point, Rect, Surface, TextAlign, monospace_width};

const FONT_FAMILY: &str = "ui-monospace, Menlo, Consolas, monospace";

/// Surface that serializes draw calls into a standalone SVG document.
///
/// The document is sized in device pixels and every element sits inside a
/// single `scale(..)` group, so coordinates stay logical.
#[derive(Debug)]
pub struct SvgSurface {
    scale: f64,
    width: f64,
    height: f64,
    body: String,
}

impl Default for SvgSurface {
    fn default() -> Self {
        Self::new()
    }
}

impl SvgSurface {
    pub fn new() -> Self {
        Self {
            scale: 1.0,
            width: 0.0,
            height: 0.0,
            body: String::new(),
        }
    }

    /// Close the document and return it.
    pub fn finish(self) -> String {
        let mut out = String::with_capacity(self.body.len() + 256);
        let _ = write!(
            out,
            r#"<svg xmlns="http://www.w3.org/2000/svg" width="{}" height="{}" viewBox="0 0 {} {}">"#,
            num(self.width * self.scale),
            num(self.height * self.scale),
            num(self.width * self.scale),
            num(self.height * self.scale),
        );
        out.push('\n');
        let _ = writeln!(out, r#"<g transform="scale({})">"#, num(self.scale));
        out.push_str(&self.body);
        out.push_str("</g>\n</svg>\n");
        out
    }
}

impl Surface for SvgSurface {
    fn set_scale(&mut self, scale: f64) {
        self.scale = if scale.is_finite() && scale > 0.0 {
            scale
        } else {
            1.0
        };
        self.body.clear();
    }

    fn clear(&mut self, width: f64, height: f64, color: Color) {
        self.width = width.max(0.0);
        self.height = height.max(0.0);
        self.fill_rect(Rect::new(0.0, 0.0, self.width, self.height), color);
    }

    fn fill_rect(&mut self, rect: Rect, color: Color) {
        let _ = writeln!(
            self.body,
            r#"<rect x="{}" y="{}" width="{}" height="{}" fill="{}"{}/>"#,
            num(rect.x),
            num(rect.y),
            num(rect.width),
            num(rect.height),
            color.to_hex(),
            opacity("fill-opacity", color),
        );
    }

    fn stroke_rect(&mut self, rect: Rect, color: Color, line_width: f64) {
        let _ = writeln!(
            self.body,
            r#"<rect x="{}" y="{}" width="{}" height="{}" fill="none" stroke="{}" stroke-width="{}"{}/>"#,
            num(rect.x),
            num(rect.y),
            num(rect.width),
            num(rect.height),
            color.to_hex(),
            num(line_width),
            opacity("stroke-opacity", color),
        );
    }

    fn line(&mut self, from: Point, to: Point, color: Color, line_width: f64) {
        let _ = writeln!(
            self.body,
            r#"<line x1="{}" y1="{}" x2="{}" y2="{}" stroke="{}" stroke-width="{}"{}/>"#,
            num(from.x),
            num(from.y),
            num(to.x),
            num(to.y),
            color.to_hex(),
            num(line_width),
            opacity("stroke-opacity", color),
        );
    }

    fn fill_text(&mut self, text: &str, at: Point, font: Font, color: Color, align: TextAlign) {
        let anchor = match align {
            TextAlign::Left => "start",
            TextAlign::Center => "middle",
            TextAlign::Right => "end",
        };
        let weight = match font.weight {
            FontWeight::Normal => "",
            FontWeight::Bold => r#" font-weight="bold""#,
        };
        let _ = writeln!(
            self.body,
            r#"<text x="{}" y="{}" font-family="{FONT_FAMILY}" font-size="{}"{weight} text-anchor="{anchor}" dominant-baseline="middle" fill="{}"{}>{}</text>"#,
            num(at.x),
            num(at.y),
            num(font.size),
            color.to_hex(),
            opacity("fill-opacity", color),
            escape(text),
        );
    }

    fn measure_text(&self, text: &str, font: Font) -> f64 {
        monospace_width(text, font)
    }
}

fn opacity(attr: &str, color: Color) -> String {
    if color.a == 255 {
        String::new()
    } else {
        format!(r#" {attr}="{}""#, num(color.alpha_f64()))
    }
}

/// Shortest decimal form with at most two fractional digits.
fn num(value: f64) -> String {
    if !value.is_finite() {
        return "0".to_string();
    }
    let fixed = format!("{value:.2}");
    let trimmed = fixed.trim_end_matches('0').trim_end_matches('.');
    if trimmed == "-0" {
        "0".to_string()
    } else {
        trimmed.to_string()
    }
}

fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(ch),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use tracefall_core::config::Config;
    use tracefall_core::compute_layout;
    use testkit::sample_trace;

    use super::*;
    use crate::engine::{RenderContext, render};

    #[test]
    fn document_is_scaled_once() {
        let mut svg = SvgSurface::new();
        svg.set_scale(2.0);
        svg.clear(300.0, 100.0, Color::rgb(255, 255, 255));
        svg.fill_rect(Rect::new(1.5, 2.0, 10.0, 4.0), Color::rgba(255, 0, 0, 51));
        let out = svg.finish();
        assert!(out.starts_with(r#"<svg xmlns="http://www.w3.org/2000/svg" width="600" height="200""#));
        assert!(out.contains(r#"<g transform="scale(2)">"#));
        assert!(out.contains(r##"<rect x="1.5" y="2" width="10" height="4" fill="#ff0000" fill-opacity="0.2"/>"##));
    }

    #[test]
    fn text_is_escaped() {
        let mut svg = SvgSurface::new();
        svg.set_scale(1.0);
        svg.fill_text(
            "a<b & \"c\"",
            Point::new(4.0, 10.0),
            Font::bold(12.0),
            Color::rgb(0, 0, 0),
            TextAlign::Right,
        );
        let out = svg.finish();
        assert!(out.contains("a&lt;b &amp; &quot;c&quot;</text>"));
        assert!(out.contains(r#"text-anchor="end""#));
        assert!(out.contains(r#"font-weight="bold""#));
    }

    #[test]
    fn renders_sample_trace() {
        let layout = compute_layout(&sample_trace("t1"));
        let config = Config::default();
        let ctx = RenderContext {
            layout: &layout,
            selected_span_id: Some("cache"),
            hovered_span_id: None,
            scroll_offset: 0.0,
            width: 900.0,
            height: 240.0,
            pixel_ratio: 1.0,
            config: &config,
        };
        let mut svg = SvgSurface::new();
        let summary = render(&ctx, &mut svg);
        assert_eq!(summary.rows(), 0..3);
        let out = svg.finish();
        assert!(out.contains("GET /v1/orders"));
        assert!(out.contains("3 spans"));
        assert!(out.ends_with("</svg>\n"));
    }

    #[test]
    fn numbers_are_compact() {
        assert_eq!(num(3.0), "3");
        assert_eq!(num(0.126), "0.13");
        assert_eq!(num(-0.001), "0");
        assert_eq!(num(f64::NAN), "0");
    }
}
