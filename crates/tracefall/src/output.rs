use std::io::IsTerminal;

use owo_colors::OwoColorize;
use tracefall_core::config::Config;
use tracefall_core::format::format_duration;
use tracefall_core::model::span::{LayoutSpan, TraceLayout};
use tracefall_render::FrameSummary;

fn color_enabled() -> bool {
    std::io::stdout().is_terminal()
}

pub fn print_tree_human(layout: &TraceLayout) {
    if layout.is_empty() {
        println!("-- 0 spans --");
        return;
    }
    let mut trace_ids: Vec<&str> = layout.spans.iter().map(|s| s.span.trace_id.as_str()).collect();
    trace_ids.sort_unstable();
    trace_ids.dedup();
    println!(
        "TRACE {} duration={} spans={} errors={}",
        trace_ids.join(","),
        format_duration(layout.total_duration),
        layout.len(),
        layout.error_count()
    );

    let color = color_enabled();
    // Rows are already in pre-order, so a flat walk prints the tree.
    for span in &layout.spans {
        println!("{}", tree_line(span, color));
    }
}

fn tree_line(span: &LayoutSpan, color: bool) -> String {
    let indent = "  ".repeat(span.depth);
    let glyph = match (span.is_error, color) {
        (true, true) => "✗".red().to_string(),
        (true, false) => "✗".to_string(),
        (false, true) => "✓".green().to_string(),
        (false, false) => "✓".to_string(),
    };
    let service = if color {
        span.span.service_name.bright_black().to_string()
    } else {
        span.span.service_name.clone()
    };
    format!(
        "{indent}{glyph} {service} {} ({}) span={}",
        span.span.span_name,
        format_duration(span.span.duration),
        span.span.span_id
    )
}

pub fn print_hit_human(y: f64, hit: Option<(&LayoutSpan, &str)>) {
    match hit {
        Some((span, tooltip)) => {
            println!("row={} span={}", span.row_index, span.span.span_id);
            println!("{tooltip}");
        }
        None => println!("no span at y={y}"),
    }
}

pub fn print_summary_human(summary: &FrameSummary, out: &str) {
    if summary.empty {
        println!("wrote {out} (empty)");
        return;
    }
    println!(
        "wrote {out} rows={}..{} ticks={} skipped_bars={} omitted_labels={}",
        summary.first_row,
        summary.end_row,
        summary.ticks,
        summary.skipped_bars,
        summary.omitted_labels
    );
}

pub fn print_config_human(cfg: &Config) {
    println!("row_height={}", cfg.row_height);
    println!("axis_height={}", cfg.axis_height);
    println!("tree_width={}", cfg.tree_width);
    println!("indent_unit={}", cfg.indent_unit);
    println!("min_bar_width={}", cfg.min_bar_width);
    println!("bar_height={}", cfg.bar_height);
    println!("tick_count={}", cfg.tick_count);
    println!("pixel_ratio={}", cfg.pixel_ratio);
}
