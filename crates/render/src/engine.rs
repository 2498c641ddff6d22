use std::ops::Range;

use serde::Serialize;
use tracefall_core::config::Config;
use tracefall_core::format::format_duration;
use tracefall_core::model::constants::{
    AXIS_FONT_SIZE, GLYPH_WIDTH, LABEL_GAP, NAME_FONT_SIZE, PADDING, SERVICE_FONT_SIZE,
    TICK_MARK_LENGTH,
};
use tracefall_core::model::span::{LayoutSpan, TraceLayout};
use tracefall_core::palette::{Color, color_for};
use tracing::trace;

use crate::axis::{self, Tick};
use crate::surface::{Font, Point, Rect, Surface, TextAlign};
use crate::text::truncate_to_width;
use crate::viewport::{row_at, visible_rows};

pub const EMPTY_MESSAGE: &str = "No spans to display";
pub const OK_GLYPH: &str = "✓";
pub const ERROR_GLYPH: &str = "✗";

/// Everything one frame depends on.
#[derive(Debug, Clone, Copy)]
pub struct RenderContext<'a> {
    pub layout: &'a TraceLayout,
    pub selected_span_id: Option<&'a str>,
    pub hovered_span_id: Option<&'a str>,
    pub scroll_offset: f64,
    pub width: f64,
    pub height: f64,
    pub pixel_ratio: f64,
    pub config: &'a Config,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FrameSummary {
    pub empty: bool,
    pub first_row: usize,
    pub end_row: usize,
    pub ticks: usize,
    pub skipped_bars: usize,
    pub omitted_labels: usize,
}

impl FrameSummary {
    fn empty() -> Self {
        Self {
            empty: true,
            first_row: 0,
            end_row: 0,
            ticks: 0,
            skipped_bars: 0,
            omitted_labels: 0,
        }
    }

    pub fn rows(&self) -> Range<usize> {
        self.first_row..self.end_row
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Theme {
    pub background: Color,
    pub text: Color,
    pub muted_text: Color,
    pub guide: Color,
    pub axis_background: Color,
    pub axis_border: Color,
    pub divider: Color,
    pub hover_background: Color,
    pub selection_background: Color,
    pub selection_border: Color,
    pub error_fill: Color,
    pub error_border: Color,
    pub ok_glyph: Color,
    pub error_glyph: Color,
}

impl Theme {
    pub const LIGHT: Theme = Theme {
        background: Color::rgb(0xff, 0xff, 0xff),
        text: Color::rgb(0x1f, 0x29, 0x37),
        muted_text: Color::rgb(0x6b, 0x72, 0x80),
        guide: Color::rgba(0x94, 0xa3, 0xb8, 0x40),
        axis_background: Color::rgb(0xf8, 0xfa, 0xfc),
        axis_border: Color::rgb(0xcb, 0xd5, 0xe1),
        divider: Color::rgb(0xe2, 0xe8, 0xf0),
        hover_background: Color::rgba(0x0f, 0x17, 0x2a, 0x0d),
        selection_background: Color::rgba(0x3b, 0x82, 0xf6, 0x26),
        selection_border: Color::rgb(0x25, 0x63, 0xeb),
        error_fill: Color::rgb(0xef, 0x44, 0x44),
        error_border: Color::rgb(0x99, 0x1b, 0x1b),
        ok_glyph: Color::rgb(0x16, 0xa3, 0x4a),
        error_glyph: Color::rgb(0xdc, 0x26, 0x26),
    };
}

struct Geometry {
    tree_width: f64,
    timeline_x: f64,
    timeline_width: f64,
    row_height: f64,
    axis_height: f64,
}

impl Geometry {
    fn new(ctx: &RenderContext<'_>) -> Self {
        let tree_width = ctx.config.tree_width.min(ctx.width * 0.5).max(0.0);
        let timeline_x = tree_width + PADDING;
        Self {
            tree_width,
            timeline_x,
            timeline_width: (ctx.width - timeline_x - PADDING).max(0.0),
            row_height: ctx.config.row_height,
            axis_height: ctx.config.axis_height,
        }
    }

    fn row_top(&self, row: usize, scroll_offset: f64) -> f64 {
        self.axis_height + row as f64 * self.row_height - scroll_offset
    }
}

/// Draw one full frame. Only rows intersecting the viewport are visited.
pub fn render<S: Surface + ?Sized>(ctx: &RenderContext<'_>, surface: &mut S) -> FrameSummary {
    render_with_theme(ctx, &Theme::LIGHT, surface)
}

pub fn render_with_theme<S: Surface + ?Sized>(
    ctx: &RenderContext<'_>,
    theme: &Theme,
    surface: &mut S,
) -> FrameSummary {
    let scale = if ctx.pixel_ratio.is_finite() && ctx.pixel_ratio > 0.0 {
        ctx.pixel_ratio
    } else {
        1.0
    };
    surface.set_scale(scale);
    surface.clear(ctx.width, ctx.height, theme.background);

    let layout = ctx.layout;
    if layout.is_empty() || !(layout.total_duration > 0.0) {
        surface.fill_text(
            EMPTY_MESSAGE,
            Point::new(ctx.width / 2.0, ctx.height / 2.0),
            Font::regular(NAME_FONT_SIZE),
            theme.muted_text,
            TextAlign::Center,
        );
        trace!("empty frame drawn");
        return FrameSummary::empty();
    }

    let geo = Geometry::new(ctx);
    let ticks = axis::ticks(
        layout.total_duration,
        ctx.config.tick_count,
        geo.timeline_x,
        geo.timeline_width,
    );
    for tick in &ticks {
        surface.line(
            Point::new(tick.x, geo.axis_height),
            Point::new(tick.x, ctx.height),
            theme.guide,
            1.0,
        );
    }

    let rows = visible_rows(
        layout.len(),
        ctx.scroll_offset,
        ctx.height,
        geo.axis_height,
        geo.row_height,
    );
    let mut summary = FrameSummary {
        empty: false,
        first_row: rows.start,
        end_row: rows.end,
        ticks: ticks.len(),
        skipped_bars: 0,
        omitted_labels: 0,
    };
    for span in &layout.spans[rows] {
        draw_row(ctx, &geo, theme, span, surface, &mut summary);
    }

    surface.line(
        Point::new(geo.tree_width, geo.axis_height),
        Point::new(geo.tree_width, ctx.height),
        theme.divider,
        1.0,
    );
    draw_axis(ctx, &geo, theme, &ticks, surface);

    trace!(
        first_row = summary.first_row,
        end_row = summary.end_row,
        skipped_bars = summary.skipped_bars,
        "frame drawn"
    );
    summary
}

fn draw_row<S: Surface + ?Sized>(
    ctx: &RenderContext<'_>,
    geo: &Geometry,
    theme: &Theme,
    span: &LayoutSpan,
    surface: &mut S,
    summary: &mut FrameSummary,
) {
    let top = geo.row_top(span.row_index, ctx.scroll_offset);
    let span_id = span.span.span_id.as_str();
    let selected = ctx.selected_span_id == Some(span_id);
    let hovered = ctx.hovered_span_id == Some(span_id);

    let row_rect = Rect::new(0.0, top, ctx.width, geo.row_height);
    if selected {
        surface.fill_rect(row_rect, theme.selection_background);
    } else if hovered {
        surface.fill_rect(row_rect, theme.hover_background);
    }

    // Tree panel: glyph, name, then service on a second line.
    let name_y = top + geo.row_height * 0.35;
    let service_y = top + geo.row_height * 0.72;
    let indent_x = PADDING + span.depth as f64 * ctx.config.indent_unit;
    let (glyph, glyph_color) = if span.is_error {
        (ERROR_GLYPH, theme.error_glyph)
    } else {
        (OK_GLYPH, theme.ok_glyph)
    };
    surface.fill_text(
        glyph,
        Point::new(indent_x, name_y),
        Font::bold(NAME_FONT_SIZE),
        glyph_color,
        TextAlign::Left,
    );

    let text_x = indent_x + GLYPH_WIDTH;
    let column = geo.tree_width - text_x - PADDING;
    let name_font = if selected {
        Font::bold(NAME_FONT_SIZE)
    } else {
        Font::regular(NAME_FONT_SIZE)
    };
    let service_font = Font::regular(SERVICE_FONT_SIZE);
    let name = truncate_to_width(&span.span.span_name, column, |t| {
        surface.measure_text(t, name_font)
    });
    let service = truncate_to_width(&span.span.service_name, column, |t| {
        surface.measure_text(t, service_font)
    });
    if !name.is_empty() {
        surface.fill_text(
            &name,
            Point::new(text_x, name_y),
            name_font,
            theme.text,
            TextAlign::Left,
        );
    }
    if !service.is_empty() {
        surface.fill_text(
            &service,
            Point::new(text_x, service_y),
            service_font,
            theme.muted_text,
            TextAlign::Left,
        );
    }

    // Timeline panel.
    let Some(bar) = bar_rect(ctx, geo, span, top) else {
        summary.skipped_bars += 1;
        return;
    };
    let fill = if span.is_error {
        theme.error_fill
    } else {
        color_for(&span.span.service_name)
    };
    surface.fill_rect(bar, fill);
    if span.is_error {
        surface.stroke_rect(bar, theme.error_border, 1.0);
    }
    if selected {
        surface.stroke_rect(bar, theme.selection_border, 2.0);
    }

    let label = format_duration(span.span.duration);
    let label_font = Font::regular(SERVICE_FONT_SIZE);
    let label_x = bar.right() + LABEL_GAP;
    if label_x + surface.measure_text(&label, label_font) <= ctx.width {
        surface.fill_text(
            &label,
            Point::new(label_x, top + geo.row_height / 2.0),
            label_font,
            theme.muted_text,
            TextAlign::Left,
        );
    } else {
        summary.omitted_labels += 1;
    }
}

/// Bar geometry for a span, or `None` when its timing cannot be placed.
fn bar_rect(ctx: &RenderContext<'_>, geo: &Geometry, span: &LayoutSpan, top: f64) -> Option<Rect> {
    let layout = ctx.layout;
    let offset =
        (span.span.timestamp - layout.trace_start) / layout.total_duration * geo.timeline_width;
    let width = span.span.duration / layout.total_duration * geo.timeline_width;
    if !(offset.is_finite() && width.is_finite()) {
        return None;
    }
    let bar_height = ctx.config.bar_height.min(geo.row_height);
    Some(Rect::new(
        geo.timeline_x + offset,
        top + (geo.row_height - bar_height) / 2.0,
        width.max(ctx.config.min_bar_width),
        bar_height,
    ))
}

fn draw_axis<S: Surface + ?Sized>(
    ctx: &RenderContext<'_>,
    geo: &Geometry,
    theme: &Theme,
    ticks: &[Tick],
    surface: &mut S,
) {
    surface.fill_rect(
        Rect::new(0.0, 0.0, ctx.width, geo.axis_height),
        theme.axis_background,
    );
    surface.line(
        Point::new(0.0, geo.axis_height),
        Point::new(ctx.width, geo.axis_height),
        theme.axis_border,
        1.0,
    );

    let font = Font::bold(AXIS_FONT_SIZE);
    let title = format!("{} spans", ctx.layout.len());
    let title = truncate_to_width(&title, geo.tree_width - 2.0 * PADDING, |t| {
        surface.measure_text(t, font)
    });
    surface.fill_text(
        &title,
        Point::new(PADDING, geo.axis_height / 2.0),
        font,
        theme.text,
        TextAlign::Left,
    );

    let label_font = Font::regular(AXIS_FONT_SIZE);
    let label_y = (geo.axis_height - TICK_MARK_LENGTH) / 2.0;
    for (i, tick) in ticks.iter().enumerate() {
        surface.line(
            Point::new(tick.x, geo.axis_height - TICK_MARK_LENGTH),
            Point::new(tick.x, geo.axis_height),
            theme.axis_border,
            1.0,
        );
        let align = if i == 0 {
            TextAlign::Left
        } else {
            TextAlign::Center
        };
        surface.fill_text(
            &tick.label,
            Point::new(tick.x, label_y),
            label_font,
            theme.muted_text,
            align,
        );
    }
}

/// Span under `pointer_y`. Selection is by row: horizontal position is
/// irrelevant.
pub fn hit_test<'a>(ctx: &RenderContext<'a>, pointer_y: f64) -> Option<&'a LayoutSpan> {
    let row = row_at(
        pointer_y,
        ctx.scroll_offset,
        ctx.config.axis_height,
        ctx.config.row_height,
        ctx.layout.len(),
    )?;
    ctx.layout.row(row)
}
