//! Check fonts, capture backends and configuration.

use weever_capture_engine::{CaptureRequest, SyntheticCaptureProvider};
use weever_common::config::{config_file_path, AppConfig};
use weever_render_engine::{discover_font, Studio, TickOutcome};

pub fn run(config: &AppConfig) -> anyhow::Result<()> {
    println!("StreemWeever System Check");
    println!("{}", "=".repeat(50));

    // Config
    let path = config_file_path();
    if path.exists() {
        match AppConfig::load_from(&path) {
            Ok(_) => println!("[OK] Config: {}", path.display()),
            Err(e) => println!("[WARN] Config: {} ignored, using defaults ({e})", path.display()),
        }
    } else {
        println!("[OK] Config: defaults ({} not present)", path.display());
    }
    println!(
        "     Render {}Hz, preview {}px wide, scroll tick {}ms",
        config.render.refresh_hz, config.render.preview_width, config.scroll.tick_interval_ms
    );

    // Font
    match discover_font(config.render.font_path.as_deref()) {
        Some(font) => match font.source() {
            Some(source) => println!("[OK] Font: {}", source.display()),
            None => println!("[OK] Font: loaded"),
        },
        None => println!("[WARN] Font: none found; set render.font_path to draw banner text"),
    }

    // Compositing round trip on the synthetic source
    let mut studio = Studio::with_font(&config.render, None);
    let mut provider = SyntheticCaptureProvider::granting(320, 180);
    studio.start_capture(&mut provider, &CaptureRequest::from(&config.capture))?;
    let outcome = studio.tick_render().outcome;
    studio.stop_capture();
    if outcome == TickOutcome::Drawn && studio.surface().dimensions() == (320, 180) {
        println!("[OK] Compositor: synthetic frame drawn");
    } else {
        println!("[FAIL] Compositor: unexpected outcome {outcome:?}");
    }

    // Capture backends
    println!("[OK] Capture: synthetic");
    check_gstreamer();

    Ok(())
}

#[cfg(feature = "gstreamer")]
fn check_gstreamer() {
    use weever_capture_engine::{CaptureProvider, GstCaptureProvider};

    let mut provider = GstCaptureProvider::test_source();
    match provider.acquire(&CaptureRequest::default()) {
        Ok(mut source) => {
            println!("[OK] Capture: GStreamer pipeline");
            if let Err(e) = source.stop() {
                println!("[WARN] GStreamer pipeline did not stop cleanly: {e}");
            }
        }
        Err(e) => println!("[WARN] Capture: GStreamer unavailable ({e})"),
    }
}

#[cfg(not(feature = "gstreamer"))]
fn check_gstreamer() {
    println!("[--] Capture: GStreamer support not compiled in (--features gstreamer)");
}
