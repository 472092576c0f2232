//! Per-tick compositing of the capture frame and overlay layers.
//!
//! Layer geometry lives in preview space (the size the preview is shown at
//! on screen). Each tick scales it into surface space with one uniform
//! factor, `surface.width / preview_width`, so overlays keep their aspect
//! ratio relative to the captured frame.

use std::collections::HashSet;
use std::time::Duration;

use serde::Serialize;
use url::Url;

use weever_capture_engine::CaptureSession;
use weever_common::error::{WeeverError, WeeverResult};
use weever_layer_model::{scale, LayerId, LayerKind, LayerModel, OverlayLayer, Rect, ScrollDirection};
use weever_processing_core::text_metrics::{banner_wrap_width, BANNER_PADDING_X, BANNER_PADDING_Y};

use crate::content::ContentStore;
use crate::draw::{blit, fill_rect, fill_with, PixelRect};
use crate::surface::OutputSurface;
use crate::text::TextPainter;

const NO_SIGNAL_BACKGROUND: [u8; 4] = [18, 18, 22, 255];
const NO_SIGNAL_FOREGROUND: [u8; 4] = [200, 200, 210, 255];

/// What a tick did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TickOutcome {
    /// No capture session; the placeholder was drawn.
    NoSignal,
    /// Session active but no decoded frame yet; nothing drawn.
    AwaitingDimensions,
    /// Source frame and layers drawn.
    Drawn,
    /// The host ended the source; nothing drawn, teardown required.
    SourceEnded,
}

/// Where an embedded page should be shown. Pages are never pixel-merged;
/// the host positions its own isolated surface here.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PagePlacement {
    pub layer: LayerId,
    pub url: Url,
    /// `sandbox` attribute value for the isolated frame.
    pub sandbox: String,
    /// Placement in surface pixels.
    pub rect: Rect,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TickReport {
    pub outcome: TickOutcome,
    pub layers_drawn: usize,
    pub layers_failed: Vec<LayerId>,
    pub pages: Vec<PagePlacement>,
}

impl TickReport {
    fn new(outcome: TickOutcome) -> Self {
        Self {
            outcome,
            layers_drawn: 0,
            layers_failed: Vec::new(),
            pages: Vec::new(),
        }
    }
}

pub struct Compositor {
    preview_width: f64,
    frame_interval: Duration,
    painter: Option<TextPainter>,
    /// Layers that failed on the previous tick, so failures log once.
    failing: HashSet<LayerId>,
    last_source_size: Option<(u32, u32)>,
}

impl Compositor {
    pub fn new(preview_width: f64, frame_interval: Duration, painter: Option<TextPainter>) -> Self {
        Self {
            preview_width: preview_width.max(1.0),
            frame_interval,
            painter,
            failing: HashSet::new(),
            last_source_size: None,
        }
    }

    pub fn preview_width(&self) -> f64 {
        self.preview_width
    }

    /// Width the preview is currently displayed at. Non-positive widths are
    /// ignored.
    pub fn set_preview_width(&mut self, width: f64) {
        if width > 0.0 {
            self.preview_width = width;
        }
    }

    pub fn has_font(&self) -> bool {
        self.painter.is_some()
    }

    /// Surface pixels per preview pixel.
    pub fn scale_factor(&self, surface_width: u32) -> f64 {
        scale(1.0, self.preview_width, f64::from(surface_width))
    }

    /// Run one render-loop iteration.
    pub fn tick(
        &mut self,
        session: &mut CaptureSession,
        model: &LayerModel,
        content: &mut ContentStore,
        surface: &mut OutputSurface,
    ) -> TickReport {
        if !session.is_active() {
            self.last_source_size = None;
            self.draw_no_signal(surface);
            surface.present();
            return TickReport::new(TickOutcome::NoSignal);
        }

        session.poll();
        if session.source_ended() {
            return TickReport::new(TickOutcome::SourceEnded);
        }

        let (Some((width, height)), Some(frame)) =
            (session.intrinsic_dimensions(), session.current_frame())
        else {
            return TickReport::new(TickOutcome::AwaitingDimensions);
        };

        if self.last_source_size != Some((width, height)) {
            tracing::info!(width, height, "Capture source dimensions known");
            self.last_source_size = Some((width, height));
        }
        surface.resize(width, height);
        fill_with(surface.image_mut(), frame);

        let factor = self.scale_factor(surface.width());
        let mut report = TickReport::new(TickOutcome::Drawn);
        for layer in model.iter() {
            match self.draw_layer(layer, factor, content, surface) {
                Ok(page) => {
                    if self.failing.remove(&layer.id) {
                        tracing::info!(layer_id = %layer.id, "Layer drawing recovered");
                    }
                    report.pages.extend(page);
                    report.layers_drawn += 1;
                }
                Err(e) => {
                    if self.failing.insert(layer.id) {
                        tracing::warn!(
                            layer_id = %layer.id,
                            kind = layer.kind.name(),
                            error = %e,
                            "Skipping layer that failed to draw"
                        );
                    }
                    report.layers_failed.push(layer.id);
                }
            }
        }
        // Forget layers that no longer exist.
        self.failing.retain(|id| model.contains(*id));

        surface.present();
        report
    }

    fn draw_layer(
        &mut self,
        layer: &OverlayLayer,
        factor: f64,
        content: &mut ContentStore,
        surface: &mut OutputSurface,
    ) -> WeeverResult<Option<PagePlacement>> {
        let rect = layer.rect().scaled(factor);
        // Only the on-surface part is ever rasterized; layers entirely off
        // the surface draw nothing.
        let bounds = Rect::new(
            0.0,
            0.0,
            f64::from(surface.width()),
            f64::from(surface.height()),
        );
        let visible = rect
            .intersect(&bounds)
            .map(|area| PixelRect::from_rect(&area))
            .filter(|area| !area.is_empty());

        match &layer.kind {
            LayerKind::Logo {
                content: handle,
                opacity,
            } => {
                let Some(window) = visible else {
                    return Ok(None);
                };
                let image = content.visible_frame(*handle, &rect, window)?;
                blit(surface.image_mut(), image, window, *opacity, None);
            }
            LayerKind::VideoClip {
                content: handle,
                playing,
                ..
            } => {
                if *playing {
                    content.advance(*handle, self.frame_interval);
                }
                let Some(window) = visible else {
                    return Ok(None);
                };
                let image = content.visible_frame(*handle, &rect, window)?;
                blit(surface.image_mut(), image, window, 100, None);
            }
            LayerKind::TextBanner(banner) => {
                let Some(window) = visible else {
                    return Ok(None);
                };
                if !banner.background.is_transparent() {
                    fill_rect(surface.image_mut(), window, banner.background.to_array(), None);
                }

                let Some(painter) = self.painter.as_mut() else {
                    return Ok(None);
                };
                let offset = banner.scroll.offset * factor;
                let pad_x = BANNER_PADDING_X * factor;
                let pad_y = BANNER_PADDING_Y * factor;
                let (dx, dy) = match banner.scroll_direction {
                    ScrollDirection::Horizontal => (pad_x + offset, pad_y),
                    ScrollDirection::Vertical => (pad_x, pad_y + offset),
                    ScrollDirection::None => (pad_x, pad_y),
                };
                let wrap = banner_wrap_width(banner.scroll_direction, layer.size)
                    .map(|w| (f64::from(w) * factor) as f32);
                painter.draw(
                    surface.image_mut(),
                    &banner.content,
                    (f64::from(banner.font_size) * factor) as f32,
                    banner.color.to_array(),
                    ((rect.x + dx) as f32, (rect.y + dy) as f32),
                    wrap,
                    window,
                );
            }
            LayerKind::EmbeddedPage { url, sandbox } => {
                if !matches!(url.scheme(), "http" | "https") {
                    return Err(WeeverError::unsupported(format!(
                        "Embedded pages must be http(s), got {}",
                        url.scheme()
                    )));
                }
                return Ok(Some(PagePlacement {
                    layer: layer.id,
                    url: url.clone(),
                    sandbox: sandbox.to_attribute(),
                    rect,
                }));
            }
        }
        Ok(None)
    }

    fn draw_no_signal(&mut self, surface: &mut OutputSurface) {
        surface.fill(NO_SIGNAL_BACKGROUND);
        let (width, height) = surface.dimensions();

        // Framing bars so the placeholder reads without a font.
        let bar = (height / 60).max(1);
        let inset = (width / 8) as i32;
        let bar_width = width.saturating_sub(2 * inset as u32);
        let top = (height / 2) as i32 - (height / 8) as i32;
        let bottom = (height / 2) as i32 + (height / 8) as i32;
        for y in [top, bottom] {
            fill_rect(
                surface.image_mut(),
                PixelRect::new(inset, y, bar_width, bar),
                NO_SIGNAL_FOREGROUND,
                None,
            );
        }

        if let Some(painter) = self.painter.as_mut() {
            let font_size = height as f32 / 10.0;
            let text_x = width as f32 / 2.0 - font_size * 2.6;
            let text_y = height as f32 / 2.0 - font_size * 0.6;
            painter.draw(
                surface.image_mut(),
                "NO SIGNAL",
                font_size,
                NO_SIGNAL_FOREGROUND,
                (text_x, text_y),
                None,
                PixelRect::new(0, 0, width, height),
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgba, RgbaImage};
    use weever_capture_engine::{CaptureRequest, SyntheticCaptureProvider};
    use weever_layer_model::{ContentHandle, LayerPlacement, SandboxPolicy};

    fn compositor() -> Compositor {
        Compositor::new(960.0, Duration::from_millis(16), None)
    }

    #[test]
    fn no_session_draws_placeholder() {
        let mut session = CaptureSession::new();
        let mut surface = OutputSurface::new(64, 36);
        let report = compositor().tick(
            &mut session,
            &LayerModel::new(),
            &mut ContentStore::new(),
            &mut surface,
        );
        assert_eq!(report.outcome, TickOutcome::NoSignal);
        assert_eq!(surface.pixel(0, 0), Some(NO_SIGNAL_BACKGROUND));
        assert_eq!(surface.frames_presented(), 1);
    }

    #[test]
    fn warming_source_skips_draw() {
        let mut provider = SyntheticCaptureProvider::granting(320, 180).with_warmup(3);
        let mut session = CaptureSession::new();
        session.start(&mut provider, &CaptureRequest::default()).unwrap();
        let mut surface = OutputSurface::new(64, 36);
        let report = compositor().tick(
            &mut session,
            &LayerModel::new(),
            &mut ContentStore::new(),
            &mut surface,
        );
        assert_eq!(report.outcome, TickOutcome::AwaitingDimensions);
        assert_eq!(surface.dimensions(), (64, 36));
        assert_eq!(surface.frames_presented(), 0);
    }

    #[test]
    fn logo_is_scaled_by_surface_over_preview() {
        let mut provider = SyntheticCaptureProvider::granting(1920, 1080);
        let mut session = CaptureSession::new();
        session.start(&mut provider, &CaptureRequest::default()).unwrap();

        let mut content = ContentStore::new();
        let handle = content.insert_image(RgbaImage::from_pixel(4, 4, Rgba([0, 0, 255, 255])));
        let mut model = LayerModel::new();
        model.add_layer(
            LayerKind::Logo {
                content: handle,
                opacity: 100,
            },
            LayerPlacement::new(10.0, 10.0, 50.0, 50.0),
        );

        let mut surface = OutputSurface::new(64, 36);
        let report = compositor().tick(&mut session, &model, &mut content, &mut surface);
        assert_eq!(report.outcome, TickOutcome::Drawn);
        assert_eq!(report.layers_drawn, 1);
        // 1920 / 960 = 2: the 50px logo at (10,10) covers [20, 120).
        assert_eq!(surface.pixel(20, 20), Some([0, 0, 255, 255]));
        assert_eq!(surface.pixel(119, 119), Some([0, 0, 255, 255]));
        assert_ne!(surface.pixel(121, 121), Some([0, 0, 255, 255]));
    }

    #[test]
    fn failed_layer_does_not_block_later_layers() {
        let mut provider = SyntheticCaptureProvider::granting(960, 540);
        let mut session = CaptureSession::new();
        session.start(&mut provider, &CaptureRequest::default()).unwrap();

        let mut content = ContentStore::new();
        let broken = content.ingest_image(b"not an image");
        let good = content.insert_image(RgbaImage::from_pixel(2, 2, Rgba([255, 0, 0, 255])));
        let mut model = LayerModel::new();
        let bad_id = model.add_layer(
            LayerKind::Logo {
                content: broken,
                opacity: 100,
            },
            LayerPlacement::new(0.0, 0.0, 10.0, 10.0),
        );
        model.add_layer(
            LayerKind::Logo {
                content: good,
                opacity: 100,
            },
            LayerPlacement::new(100.0, 100.0, 10.0, 10.0),
        );
        model.add_layer(
            LayerKind::Logo {
                content: ContentHandle(999),
                opacity: 100,
            },
            LayerPlacement::new(200.0, 200.0, 10.0, 10.0),
        );

        let mut surface = OutputSurface::new(1, 1);
        let mut compositor = compositor();
        let report = compositor.tick(&mut session, &model, &mut content, &mut surface);
        assert_eq!(report.outcome, TickOutcome::Drawn);
        assert_eq!(report.layers_drawn, 1);
        assert_eq!(report.layers_failed.len(), 2);
        assert_eq!(report.layers_failed[0], bad_id);
        assert_eq!(surface.pixel(105, 105), Some([255, 0, 0, 255]));

        // Next tick still runs.
        let report = compositor.tick(&mut session, &model, &mut content, &mut surface);
        assert_eq!(report.outcome, TickOutcome::Drawn);
    }

    #[test]
    fn extreme_geometry_is_clipped_not_overflowed() {
        let mut provider = SyntheticCaptureProvider::granting(1920, 1080);
        let mut session = CaptureSession::new();
        session.start(&mut provider, &CaptureRequest::default()).unwrap();

        let mut content = ContentStore::new();
        let red = content.insert_image(RgbaImage::from_pixel(8, 8, Rgba([255, 0, 0, 255])));
        let mut model = LayerModel::new();
        let logo = |handle| LayerKind::Logo {
            content: handle,
            opacity: 100,
        };
        model.add_layer(logo(red), LayerPlacement::new(2.0e9, 0.0, 100.0, 100.0));
        model.add_layer(logo(red), LayerPlacement::new(-2.0e9, -2.0e9, 100.0, 100.0));
        model.add_layer(
            LayerKind::TextBanner(weever_layer_model::TextBanner::new("far")),
            LayerPlacement::new(0.0, 3.0e9, 600.0, 50.0),
        );
        // Oversized: 40000x40000 surface pixels, of which only the frame is drawn.
        model.add_layer(logo(red), LayerPlacement::new(0.0, 0.0, 20000.0, 20000.0));

        let mut surface = OutputSurface::new(1, 1);
        let mut compositor = compositor();
        for _ in 0..2 {
            let report = compositor.tick(&mut session, &model, &mut content, &mut surface);
            assert_eq!(report.outcome, TickOutcome::Drawn);
            assert_eq!(report.layers_drawn, 4);
            assert!(report.layers_failed.is_empty());
        }
        assert_eq!(surface.pixel(0, 0), Some([255, 0, 0, 255]));
        assert_eq!(surface.pixel(1919, 1079), Some([255, 0, 0, 255]));
    }

    #[test]
    fn pages_are_placed_not_drawn() {
        let mut provider = SyntheticCaptureProvider::granting(1920, 1080);
        let mut session = CaptureSession::new();
        session.start(&mut provider, &CaptureRequest::default()).unwrap();

        let mut model = LayerModel::new();
        let id = model.add_layer(
            LayerKind::EmbeddedPage {
                url: Url::parse("https://example.com/chat").unwrap(),
                sandbox: SandboxPolicy::default(),
            },
            LayerPlacement::new(100.0, 100.0, 640.0, 480.0),
        );

        let mut surface = OutputSurface::new(1, 1);
        let report =
            compositor().tick(&mut session, &model, &mut ContentStore::new(), &mut surface);
        assert_eq!(report.pages.len(), 1);
        assert_eq!(report.pages[0].layer, id);
        assert_eq!(report.pages[0].rect, Rect::new(200.0, 200.0, 1280.0, 960.0));
    }

    #[test]
    fn banner_background_is_filled_without_font() {
        let mut provider = SyntheticCaptureProvider::granting(960, 540);
        let mut session = CaptureSession::new();
        session.start(&mut provider, &CaptureRequest::default()).unwrap();

        let mut banner = weever_layer_model::TextBanner::new("LIVE");
        banner.background = weever_layer_model::Color::rgb(0, 255, 0);
        let mut model = LayerModel::new();
        model.add_layer(
            LayerKind::TextBanner(banner),
            LayerPlacement::new(10.0, 10.0, 100.0, 40.0),
        );

        let mut surface = OutputSurface::new(1, 1);
        let report =
            compositor().tick(&mut session, &model, &mut ContentStore::new(), &mut surface);
        assert_eq!(report.layers_drawn, 1);
        assert_eq!(surface.pixel(50, 30), Some([0, 255, 0, 255]));
    }

    #[test]
    fn ended_source_is_reported() {
        let mut provider = SyntheticCaptureProvider::granting(320, 180);
        let revoke = provider.revocation();
        let mut session = CaptureSession::new();
        session.start(&mut provider, &CaptureRequest::default()).unwrap();
        revoke.revoke();

        let mut surface = OutputSurface::new(1, 1);
        let report = compositor().tick(
            &mut session,
            &LayerModel::new(),
            &mut ContentStore::new(),
            &mut surface,
        );
        assert_eq!(report.outcome, TickOutcome::SourceEnded);
        assert_eq!(surface.frames_presented(), 0);
    }
}
