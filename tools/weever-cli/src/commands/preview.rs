//! Headless preview: composite overlays onto a capture and save the result.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;

use weever_capture_engine::{CaptureProvider, CaptureRequest, SyntheticCaptureProvider};
use weever_common::clock::{format_duration, RateController};
use weever_common::config::AppConfig;
use weever_layer_model::{LayerId, ScrollDirection, TextBanner};
use weever_render_engine::{ContentState, LiveStudio, Studio, TickOutcome, TickReport};

use crate::{ScrollArg, SourceArg};

pub struct PreviewOptions {
    pub width: u32,
    pub height: u32,
    pub ticks: u32,
    pub duration_ms: Option<u64>,
    pub logo: Option<PathBuf>,
    pub clip: Option<PathBuf>,
    pub text: Option<String>,
    pub scroll: ScrollArg,
    pub speed: u32,
    pub page: Option<String>,
    pub source: SourceArg,
    pub output: PathBuf,
}

pub async fn run(config: &AppConfig, options: PreviewOptions) -> anyhow::Result<()> {
    println!("StreemWeever preview");
    println!("  Source: {:?} {}x{}", options.source, options.width, options.height);
    println!("  Output: {}", options.output.display());

    let mut studio = Studio::from_config(config);
    if !studio.has_font() {
        println!("  [WARN] No font found; banners draw without text");
    }

    if let Some(path) = &options.logo {
        let id = studio
            .add_logo_file(path)
            .with_context(|| format!("Failed to load logo {}", path.display()))?;
        warn_if_failed(&studio, id, "Logo");
    }

    if let Some(path) = &options.clip {
        let id = studio
            .add_video_file(path)
            .with_context(|| format!("Failed to load clip {}", path.display()))?;
        warn_if_failed(&studio, id, "Clip");
        studio.set_playing(id, true);
    }

    if let Some(text) = options.text.clone() {
        let direction = match options.scroll {
            ScrollArg::None => ScrollDirection::None,
            ScrollArg::Horizontal => ScrollDirection::Horizontal,
            ScrollArg::Vertical => ScrollDirection::Vertical,
        };
        studio.add_text(TextBanner::new(text).with_scroll(direction, options.speed));
    }

    if let Some(url) = &options.page {
        studio.add_page(url)?;
    }

    let mut provider = provider_for(&options)?;
    tracing::info!(
        provider = provider.name(),
        layers = studio.model().len(),
        "Starting preview capture"
    );
    let request = CaptureRequest {
        preferred_width: options.width,
        preferred_height: options.height,
        ..CaptureRequest::from(&config.capture)
    };

    match options.duration_ms {
        Some(ms) => run_live(studio, config, provider.as_mut(), &request, ms, &options).await,
        None => run_stepped(studio, config, provider.as_mut(), &request, &options),
    }
}

fn provider_for(options: &PreviewOptions) -> anyhow::Result<Box<dyn CaptureProvider>> {
    match options.source {
        SourceArg::Synthetic => Ok(Box::new(SyntheticCaptureProvider::granting(
            options.width,
            options.height,
        ))),
        #[cfg(feature = "gstreamer")]
        SourceArg::Screen => Ok(Box::new(weever_capture_engine::GstCaptureProvider::screen())),
        #[cfg(feature = "gstreamer")]
        SourceArg::GstTest => Ok(Box::new(
            weever_capture_engine::GstCaptureProvider::test_source(),
        )),
        #[cfg(not(feature = "gstreamer"))]
        SourceArg::Screen | SourceArg::GstTest => {
            anyhow::bail!("This source needs a build with `--features gstreamer`")
        }
    }
}

/// Deterministic run on simulated time: scroll ticks are gated at their
/// configured rate between render ticks.
fn run_stepped(
    mut studio: Studio,
    config: &AppConfig,
    provider: &mut dyn CaptureProvider,
    request: &CaptureRequest,
    options: &PreviewOptions,
) -> anyhow::Result<()> {
    studio.start_capture(provider, request)?;

    let frame_ns = config.render.frame_interval_ms() * 1_000_000;
    let mut scroll_gate = RateController::with_interval_ms(config.scroll.tick_interval_ms);
    let mut elapsed_ns = 0u64;
    let mut last: Option<TickReport> = None;

    for _ in 0..options.ticks {
        elapsed_ns += frame_ns;
        if scroll_gate.should_tick(elapsed_ns) {
            studio.tick_scroll();
        }
        let report = studio.tick_render();
        if report.outcome == TickOutcome::SourceEnded {
            tracing::warn!(elapsed_ms = elapsed_ns / 1_000_000, "Capture source ended early");
            println!("  Source ended after {}ms", elapsed_ns / 1_000_000);
            break;
        }
        last = Some(report);
    }

    let stats = studio.stop_capture();
    studio.surface().save_png(&options.output)?;

    println!();
    println!(
        "Rendered {} frames at {}x{}",
        studio.surface().frames_presented(),
        studio.surface().width(),
        studio.surface().height()
    );
    if let Some(stats) = stats {
        println!("  Frames received: {}", stats.frames_received);
    }
    if let Some(report) = last {
        print_report(&report);
    }
    println!("Saved to: {}", options.output.display());
    Ok(())
}

async fn run_live(
    studio: Studio,
    config: &AppConfig,
    provider: &mut dyn CaptureProvider,
    request: &CaptureRequest,
    duration_ms: u64,
    options: &PreviewOptions,
) -> anyhow::Result<()> {
    tracing::debug!(duration_ms, "Running live preview loops");
    let live = LiveStudio::start(studio, &config.render, &config.scroll);
    live.start_capture(provider, request)?;
    tokio::time::sleep(Duration::from_millis(duration_ms)).await;
    let on_air = live.with_studio(|s| s.session_status().elapsed_secs);
    let stats = live.stop_capture();

    let (frames, (width, height)) =
        live.with_studio(|s| (s.surface().frames_presented(), s.surface().dimensions()));
    live.with_studio(|s| s.surface().save_png(&options.output))?;
    live.shutdown().await;

    println!();
    println!(
        "Rendered {frames} frames at {width}x{height}, on air {}",
        format_duration(on_air.round() as u64)
    );
    if let Some(stats) = stats {
        println!(
            "  Frames received: {} (dropped {:.1}%)",
            stats.frames_received,
            stats.drop_rate()
        );
    }
    println!("Saved to: {}", options.output.display());
    Ok(())
}

fn warn_if_failed(studio: &Studio, id: LayerId, what: &str) {
    if let Some(ContentState::Failed { reason }) = studio.content_state(id) {
        tracing::warn!(layer_id = %id, %reason, "{what} content failed to decode");
        println!("  [WARN] {what} could not be decoded: {reason}");
    }
}

fn print_report(report: &TickReport) {
    println!("  Layers drawn: {}", report.layers_drawn);
    if !report.layers_failed.is_empty() {
        println!("  [WARN] Layers skipped: {}", report.layers_failed.len());
    }
    for page in &report.pages {
        println!(
            "  Page {} at ({:.0}, {:.0}) {:.0}x{:.0} sandbox=\"{}\"",
            page.url, page.rect.x, page.rect.y, page.rect.width, page.rect.height, page.sandbox
        );
    }
}
