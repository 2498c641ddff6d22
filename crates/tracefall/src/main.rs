mod output;
mod telemetry;

use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Parser, Subcommand};
use serde::Serialize;
use tracefall_core::compute_layout;
use tracefall_core::config::Config;
use tracefall_core::model::span::RawSpan;
use tracefall_ingest::load_spans;
use tracefall_render::registry::{ViewRegistry, WATERFALL_VIEW};
use tracefall_render::surface::Surface;
use tracefall_render::svg::SvgSurface;
use tracefall_render::view::{InputEvent, ViewState};
use tracefall_render::{FrameSummary, HostView, RecordingSurface, WaterfallView, hit_test};
use tracing::{info, warn};

use crate::output::{print_config_human, print_hit_human, print_summary_human, print_tree_human};
use crate::telemetry::init_cli_tracing;

#[derive(Parser, Debug)]
#[command(name = "tracefall")]
#[command(about = "Render and inspect trace waterfalls")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    #[arg(long, global = true)]
    json: bool,
}

#[derive(clap::Args, Debug, Clone, Copy)]
struct Viewport {
    #[arg(long, default_value_t = 1200.0)]
    width: f64,
    #[arg(long, default_value_t = 600.0)]
    height: f64,
    #[arg(long, default_value_t = 0.0, help = "Vertical scroll offset in pixels")]
    scroll: f64,
    #[arg(long, help = "Display density; defaults to the configured pixel_ratio")]
    pixel_ratio: Option<f64>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    #[command(about = "Draw a waterfall to SVG (or draw commands)")]
    Render {
        #[arg(help = "Span source: .json, .pb/.binpb, optionally .gz, or - for stdin")]
        input: PathBuf,
        #[arg(long, help = "Output file; stdout when omitted")]
        out: Option<PathBuf>,
        #[command(flatten)]
        viewport: Viewport,
        #[arg(long, help = "Span id to draw as selected")]
        select: Option<String>,
        #[arg(
            long,
            allow_negative_numbers = true,
            help = "Pointer y to draw a hover highlight at"
        )]
        hover_y: Option<f64>,
        #[arg(long, help = "Emit recorded draw commands as JSON instead of SVG")]
        commands: bool,
        #[arg(long, default_value = WATERFALL_VIEW)]
        view: String,
    },
    #[command(about = "Print the span tree in row order")]
    Tree { input: PathBuf },
    #[command(about = "Report the span under a pointer position")]
    Hit {
        input: PathBuf,
        #[arg(long, allow_negative_numbers = true)]
        y: f64,
        #[command(flatten)]
        viewport: Viewport,
    },
    #[command(about = "Show the effective configuration")]
    Config,
}

#[derive(Debug, Serialize)]
struct HitOutput {
    y: f64,
    row_index: Option<usize>,
    span_id: Option<String>,
    tooltip: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_cli_tracing();

    match cli.command {
        Commands::Render {
            input,
            out,
            viewport,
            select,
            hover_y,
            commands,
            view,
        } => {
            let cfg = load_config(viewport.pixel_ratio)?;
            let spans = read_spans(&input).await?;
            let registry = ViewRegistry::with_builtin()?;
            let mut host = registry
                .create(&view, &cfg)
                .with_context(|| format!("cannot create view {view}"))?;

            host.resize(viewport.width, viewport.height, cfg.pixel_ratio);
            let state = ViewState {
                selected_span_id: select,
                scroll_offset: viewport.scroll,
            };
            host.restore(&serde_json::to_string(&state)?)?;
            host.draw(&spans);
            if let Some(y) = hover_y {
                host.handle_input(InputEvent::PointerMove { y });
            }

            let (document, summary) = if commands {
                let mut surface = RecordingSurface::new();
                let summary = draw_frame(host.as_mut(), &mut surface)?;
                (serde_json::to_string_pretty(surface.commands())?, summary)
            } else {
                let mut surface = SvgSurface::new();
                let summary = draw_frame(host.as_mut(), &mut surface)?;
                (surface.finish(), summary)
            };
            host.dispose();

            match out {
                Some(path) => {
                    tokio::fs::write(&path, document)
                        .await
                        .with_context(|| format!("failed writing {}", path.display()))?;
                    if cli.json {
                        println!("{}", serde_json::to_string_pretty(&summary)?);
                    } else {
                        print_summary_human(&summary, &path.display().to_string());
                    }
                }
                None => {
                    info!(
                        rows = summary.end_row - summary.first_row,
                        empty = summary.empty,
                        "frame rendered"
                    );
                    print!("{document}");
                    if !document.ends_with('\n') {
                        println!();
                    }
                }
            }
            Ok(())
        }
        Commands::Tree { input } => {
            let spans = read_spans(&input).await?;
            let layout = compute_layout(&spans);
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&layout)?);
            } else {
                print_tree_human(&layout);
            }
            Ok(())
        }
        Commands::Hit { input, y, viewport } => {
            let cfg = load_config(viewport.pixel_ratio)?;
            let spans = read_spans(&input).await?;
            let mut view = WaterfallView::new(cfg.clone());
            view.resize(viewport.width, viewport.height, cfg.pixel_ratio);
            view.set_spans(&spans);
            view.scroll_to(viewport.scroll);
            let tooltip = view.pointer_move(y);
            let ctx = view.context();
            let hit = hit_test(&ctx, y);

            if cli.json {
                let payload = HitOutput {
                    y,
                    row_index: hit.map(|s| s.row_index),
                    span_id: hit.map(|s| s.span.span_id.clone()),
                    tooltip,
                };
                println!("{}", serde_json::to_string_pretty(&payload)?);
            } else {
                print_hit_human(y, hit.zip(tooltip.as_deref()));
            }
            Ok(())
        }
        Commands::Config => {
            let cfg = Config::load()?;
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&cfg)?);
            } else {
                print_config_human(&cfg);
            }
            Ok(())
        }
    }
}

/// Layered config with CLI flags applied last.
fn load_config(pixel_ratio: Option<f64>) -> anyhow::Result<Config> {
    let mut cfg = Config::load().context("failed to load configuration")?;
    if let Some(ratio) = pixel_ratio {
        cfg.pixel_ratio = ratio;
        cfg.validate()?;
    }
    Ok(cfg)
}

async fn read_spans(input: &Path) -> anyhow::Result<Vec<RawSpan>> {
    let spans = load_spans(input)
        .await
        .with_context(|| format!("failed to load spans from {}", input.display()))?;
    if spans.is_empty() {
        warn!(input = %input.display(), "no spans loaded");
    }
    Ok(spans)
}

fn draw_frame(host: &mut dyn HostView, surface: &mut dyn Surface) -> anyhow::Result<FrameSummary> {
    host.frame(surface)
        .context("view had no pending frame after loading data")
}
