//! The live studio: one owner for everything the render loop touches.
//!
//! [`Studio`] is single-threaded. Every mutation (layer edits, drag input,
//! scroll ticks, capture start/stop) and every compositor read go through
//! `&mut Studio`, so the compositor always sees a consistent model.
//!
//! [`LiveStudio`] puts a `Studio` behind a mutex and drives the render loop
//! and the scroll animator as two independent [`ScheduledTask`]s.

use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use url::Url;

use weever_capture_engine::{
    CaptureProvider, CaptureRequest, CaptureSession, SessionStatus, SourceStats, StopReason,
};
use weever_common::config::{AppConfig, RenderSettings, ScrollSettings};
use weever_common::error::{WeeverError, WeeverResult};
use weever_layer_model::{
    anchored_position, Anchor, ContentHandle, LayerId, LayerKind, LayerModel, LayerPatch, LayerPlacement,
    OverlayLayer, Position, SandboxPolicy, Size, TextBanner,
};
use weever_processing_core::{
    default_banner_size, ApproxMetrics, DragController, ScrollAnimator, ScrollTick,
};

use crate::compositor::{Compositor, TickOutcome, TickReport};
use crate::content::{ContentState, ContentStore, FrameSource};
use crate::scheduler::{ScheduledTask, TaskControl};
use crate::surface::OutputSurface;
use crate::text::{discover_font, FontMetrics, TextMeasure, TextPainter};

/// Margin used by corner presets.
const ANCHOR_MARGIN: f64 = 20.0;

/// Initial layer geometry per kind, in preview pixels.
const LOGO_PLACEMENT: LayerPlacement = placement(20.0, 20.0, 100.0, 100.0);
const VIDEO_PLACEMENT: LayerPlacement = placement(50.0, 50.0, 320.0, 180.0);
const PAGE_PLACEMENT: LayerPlacement = placement(100.0, 100.0, 640.0, 480.0);
/// New text banners sit this far above the bottom of the preview.
const TEXT_BOTTOM_OFFSET: f64 = 150.0;
const TEXT_LEFT: f64 = 50.0;

const fn placement(x: f64, y: f64, width: f64, height: f64) -> LayerPlacement {
    LayerPlacement {
        position: Position { x, y },
        size: Size { width, height },
    }
}

pub struct Studio {
    model: LayerModel,
    content: ContentStore,
    drag: DragController,
    animator: ScrollAnimator<TextMeasure>,
    compositor: Compositor,
    session: CaptureSession,
    surface: OutputSurface,
}

impl Studio {
    /// Build a studio, loading the configured or a system font.
    pub fn new(settings: &RenderSettings) -> Self {
        let font = discover_font(settings.font_path.as_deref());
        Self::with_font(settings, font)
    }

    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(&config.render)
    }

    /// Build a studio with an explicit font. Without one, banners draw
    /// their background only and text is measured by estimate.
    pub fn with_font(settings: &RenderSettings, font: Option<FontMetrics>) -> Self {
        let (measure, painter) = match font {
            Some(font) => (TextMeasure::Font(font.clone()), Some(TextPainter::new(font))),
            None => (TextMeasure::Approx(ApproxMetrics), None),
        };
        Self {
            model: LayerModel::new(),
            content: ContentStore::new(),
            drag: DragController::new(),
            animator: ScrollAnimator::new(measure),
            compositor: Compositor::new(
                settings.preview_width,
                Duration::from_millis(settings.frame_interval_ms()),
                painter,
            ),
            session: CaptureSession::new(),
            surface: OutputSurface::new(settings.placeholder_width, settings.placeholder_height),
        }
    }

    // Preview geometry

    /// Size the preview is displayed at. Height follows the surface's
    /// aspect ratio.
    pub fn preview_size(&self) -> Size {
        let width = self.compositor.preview_width();
        let (sw, sh) = self.surface.dimensions();
        Size::new(width, width * f64::from(sh) / f64::from(sw.max(1)))
    }

    pub fn set_preview_width(&mut self, width: f64) {
        self.compositor.set_preview_width(width);
    }

    // Layers

    /// Add a layer with explicit geometry.
    pub fn add_layer(&mut self, kind: LayerKind, placement: LayerPlacement) -> LayerId {
        let name = kind.name();
        let id = self.model.add_layer(kind, placement);
        tracing::info!(layer_id = %id, kind = name, "Layer added");
        id
    }

    /// Add a logo from encoded image bytes at the default spot.
    pub fn add_logo(&mut self, bytes: &[u8]) -> LayerId {
        let handle = self.content.ingest_image(bytes);
        self.add_layer(
            LayerKind::Logo {
                content: handle,
                opacity: 100,
            },
            LOGO_PLACEMENT,
        )
    }

    /// Add a logo from an image file.
    pub fn add_logo_file(&mut self, path: &Path) -> WeeverResult<LayerId> {
        let handle = self.content.ingest_image_file(path)?;
        Ok(self.add_layer(
            LayerKind::Logo {
                content: handle,
                opacity: 100,
            },
            LOGO_PLACEMENT,
        ))
    }

    /// Add a logo of `size` preview pixels in a corner of the preview.
    pub fn add_logo_anchored(&mut self, bytes: &[u8], anchor: Anchor, size: f64, opacity: u8) -> LayerId {
        let handle = self.content.ingest_image(bytes);
        let box_size = Size::new(size.max(1.0), size.max(1.0));
        let position = anchored_position(anchor, self.preview_size(), box_size, ANCHOR_MARGIN);
        self.add_layer(
            LayerKind::Logo {
                content: handle,
                opacity: opacity.min(100),
            },
            LayerPlacement {
                position,
                size: box_size,
            },
        )
    }

    /// Add a text banner sized for its content, near the bottom left.
    pub fn add_text(&mut self, banner: TextBanner) -> LayerId {
        let size = default_banner_size(&banner, self.animator.metrics());
        let preview = self.preview_size();
        let position = Position::new(
            TEXT_LEFT,
            (preview.height - TEXT_BOTTOM_OFFSET).max(0.0),
        );
        self.add_layer(LayerKind::TextBanner(banner), LayerPlacement { position, size })
    }

    /// Add a video clip from encoded bytes (animated GIF or still image).
    pub fn add_video(&mut self, bytes: &[u8], name: impl Into<String>) -> LayerId {
        let handle = self.content.ingest_video(bytes);
        self.add_video_handle(handle, name.into())
    }

    /// Add a video clip from a file, named after the file.
    pub fn add_video_file(&mut self, path: &Path) -> WeeverResult<LayerId> {
        let handle = self.content.ingest_video_file(path)?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        Ok(self.add_video_handle(handle, name))
    }

    /// Add a video clip backed by any frame source.
    pub fn add_video_source(&mut self, source: Box<dyn FrameSource>, name: impl Into<String>) -> LayerId {
        let handle = self.content.insert_frame_source(source);
        self.add_video_handle(handle, name.into())
    }

    fn add_video_handle(&mut self, handle: ContentHandle, name: String) -> LayerId {
        self.add_layer(
            LayerKind::VideoClip {
                content: handle,
                playing: false,
                name,
            },
            VIDEO_PLACEMENT,
        )
    }

    /// Add an embedded page. Only http and https URLs are accepted.
    pub fn add_page(&mut self, url: &str) -> WeeverResult<LayerId> {
        let url = parse_page_url(url)?;
        Ok(self.add_layer(
            LayerKind::EmbeddedPage {
                url,
                sandbox: SandboxPolicy::default(),
            },
            PAGE_PLACEMENT,
        ))
    }

    /// Remove a layer and release its content. Unknown ids are ignored.
    pub fn remove_layer(&mut self, id: LayerId) -> bool {
        let Some(layer) = self.model.remove_layer(id) else {
            return false;
        };
        if self.drag.active_layer() == Some(id) {
            self.drag.pointer_up();
        }
        if let Some(handle) = layer.kind.content_handle() {
            self.content.release(handle);
        }
        tracing::info!(layer_id = %id, kind = layer.kind.name(), "Layer removed");
        true
    }

    /// Merge a partial update. Content replaced by the patch is released.
    pub fn update_layer(&mut self, id: LayerId, patch: LayerPatch) -> bool {
        let Some(applied) = self.model.update_layer(id, patch) else {
            return false;
        };
        if let Some(old) = applied.replaced_content {
            self.content.release(old);
        }
        true
    }

    /// Swap the image or video behind a logo or clip layer.
    pub fn replace_content(&mut self, id: LayerId, bytes: &[u8]) -> bool {
        let handle = match self.model.get(id).map(|l| &l.kind) {
            Some(LayerKind::Logo { .. }) => self.content.ingest_image(bytes),
            Some(LayerKind::VideoClip { .. }) => self.content.ingest_video(bytes),
            _ => return false,
        };
        self.update_layer(id, LayerPatch::content(handle))
    }

    /// Play or pause a clip. Paused clips resume from where they stopped.
    pub fn set_playing(&mut self, id: LayerId, playing: bool) -> bool {
        match self.model.get(id).map(|l| &l.kind) {
            Some(LayerKind::VideoClip { .. }) => self.update_layer(id, LayerPatch::playing(playing)),
            _ => false,
        }
    }

    /// Restart a clip from its first frame.
    pub fn rewind_clip(&mut self, id: LayerId) -> bool {
        match self.model.get(id).map(|l| &l.kind) {
            Some(LayerKind::VideoClip { content, .. }) => {
                self.content.rewind(*content);
                true
            }
            _ => false,
        }
    }

    /// Layers in draw order.
    pub fn layers(&self) -> Vec<OverlayLayer> {
        self.model.list_layers()
    }

    pub fn model(&self) -> &LayerModel {
        &self.model
    }

    pub fn content(&self) -> &ContentStore {
        &self.content
    }

    /// Load state of a layer's content, for layers that have content.
    pub fn content_state(&self, id: LayerId) -> Option<ContentState> {
        let handle = self.model.get(id)?.kind.content_handle()?;
        self.content.state(handle)
    }

    // Pointer input, in preview coordinates

    pub fn pointer_down(&mut self, x: f64, y: f64) -> Option<LayerId> {
        self.drag.pointer_down(Position::new(x, y), &self.model)
    }

    pub fn pointer_move(&mut self, x: f64, y: f64) -> Option<Position> {
        let bounds = self.preview_size();
        self.drag.pointer_move(Position::new(x, y), bounds, &mut self.model)
    }

    pub fn pointer_up(&mut self) {
        self.drag.pointer_up();
    }

    pub fn pointer_leave(&mut self) {
        self.drag.pointer_leave();
    }

    pub fn is_dragging(&self) -> bool {
        self.drag.is_dragging()
    }

    // Capture

    pub fn start_capture(
        &mut self,
        provider: &mut dyn CaptureProvider,
        request: &CaptureRequest,
    ) -> WeeverResult<()> {
        self.session.start(provider, request)
    }

    /// Release the capture source and return to Idle.
    pub fn stop_capture(&mut self) -> Option<SourceStats> {
        self.session.stop(StopReason::Requested)
    }

    pub fn is_capturing(&self) -> bool {
        self.session.is_active()
    }

    pub fn session_status(&self) -> SessionStatus {
        self.session.status()
    }

    // Ticks

    /// One render-loop iteration. A source the host ended is torn down here,
    /// exactly like an explicit stop.
    pub fn tick_render(&mut self) -> TickReport {
        let report = self.compositor.tick(
            &mut self.session,
            &self.model,
            &mut self.content,
            &mut self.surface,
        );
        if report.outcome == TickOutcome::SourceEnded {
            self.session.stop(StopReason::SourceEnded);
        }
        report
    }

    /// One scroll-animator iteration.
    pub fn tick_scroll(&mut self) -> ScrollTick {
        self.animator.tick(&mut self.model)
    }

    pub fn surface(&self) -> &OutputSurface {
        &self.surface
    }

    pub fn has_font(&self) -> bool {
        self.compositor.has_font()
    }
}

fn parse_page_url(raw: &str) -> WeeverResult<Url> {
    let url = Url::parse(raw.trim())
        .map_err(|e| WeeverError::layer(format!("Invalid page URL {raw:?}: {e}")))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(WeeverError::layer(format!(
            "Embedded pages must use http or https, got {}",
            url.scheme()
        )));
    }
    Ok(url)
}

struct LiveState {
    studio: Studio,
    render_task: Option<ScheduledTask>,
}

fn lock(state: &Mutex<LiveState>) -> MutexGuard<'_, LiveState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

/// A [`Studio`] driven by its render loop and scroll animator on tokio.
///
/// The render loop runs from [`LiveStudio::start`] (showing the no-signal
/// placeholder) until capture is stopped or the source ends; starting
/// capture again restarts it.
pub struct LiveStudio {
    state: Arc<Mutex<LiveState>>,
    scroll_task: Option<ScheduledTask>,
    frame_interval: Duration,
}

impl LiveStudio {
    /// Start both loops. Must be called from within a tokio runtime.
    pub fn start(studio: Studio, render: &RenderSettings, scroll: &ScrollSettings) -> Self {
        let frame_interval = Duration::from_millis(render.frame_interval_ms());
        let state = Arc::new(Mutex::new(LiveState {
            studio,
            render_task: None,
        }));

        let scroll_state = Arc::clone(&state);
        let scroll_task = ScheduledTask::spawn(
            "scroll",
            Duration::from_millis(scroll.tick_interval_ms),
            move |token| {
                let mut guard = lock(&scroll_state);
                if token.is_cancelled() {
                    return TaskControl::Stop;
                }
                guard.studio.tick_scroll();
                TaskControl::Continue
            },
        );

        {
            let mut guard = lock(&state);
            guard.render_task = Some(spawn_render(&state, frame_interval));
        }

        tracing::info!(frame_interval_ms = frame_interval.as_millis() as u64, "Live studio started");
        Self {
            state,
            scroll_task: Some(scroll_task),
            frame_interval,
        }
    }

    /// Run `f` with exclusive access to the studio.
    pub fn with_studio<R>(&self, f: impl FnOnce(&mut Studio) -> R) -> R {
        f(&mut lock(&self.state).studio)
    }

    /// Start capture and make sure the render loop is running.
    pub fn start_capture(
        &self,
        provider: &mut dyn CaptureProvider,
        request: &CaptureRequest,
    ) -> WeeverResult<()> {
        let mut guard = lock(&self.state);
        guard.studio.start_capture(provider, request)?;
        let running = guard.render_task.as_ref().is_some_and(|t| !t.is_finished() && !t.is_cancelled());
        if !running {
            guard.render_task = Some(spawn_render(&self.state, self.frame_interval));
        }
        Ok(())
    }

    /// Halt the render loop, release the source and go Idle, all under one
    /// lock. No frame is drawn after this returns.
    pub fn stop_capture(&self) -> Option<SourceStats> {
        let mut guard = lock(&self.state);
        if let Some(task) = guard.render_task.take() {
            task.cancel();
        }
        guard.studio.stop_capture()
    }

    pub fn is_rendering(&self) -> bool {
        lock(&self.state)
            .render_task
            .as_ref()
            .is_some_and(|t| !t.is_cancelled() && !t.is_finished())
    }

    /// Stop both loops and release the capture source.
    pub async fn shutdown(mut self) {
        let render = {
            let mut guard = lock(&self.state);
            let task = guard.render_task.take();
            guard.studio.stop_capture();
            task
        };
        if let Some(task) = render {
            task.shutdown().await;
        }
        if let Some(task) = self.scroll_task.take() {
            task.shutdown().await;
        }
        tracing::info!("Live studio shut down");
    }
}

impl Drop for LiveStudio {
    fn drop(&mut self) {
        // The render task holds the shared state, so it has to be cancelled
        // explicitly or it would keep the state alive.
        if let Some(task) = lock(&self.state).render_task.take() {
            task.cancel();
        }
    }
}

fn spawn_render(state: &Arc<Mutex<LiveState>>, period: Duration) -> ScheduledTask {
    let shared = Arc::clone(state);
    ScheduledTask::spawn("render", period, move |token| {
        let mut guard = lock(&shared);
        if token.is_cancelled() {
            return TaskControl::Stop;
        }
        let report = guard.studio.tick_render();
        if report.outcome == TickOutcome::SourceEnded {
            // The studio already tore the session down; drop our own handle
            // so a later start_capture spawns a fresh loop.
            guard.render_task.take();
            return TaskControl::Stop;
        }
        TaskControl::Continue
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_urls_must_be_web() {
        assert!(parse_page_url("https://example.com").is_ok());
        assert!(parse_page_url("  http://example.com/x ").is_ok());
        assert!(matches!(
            parse_page_url("file:///etc/passwd"),
            Err(WeeverError::Layer { .. })
        ));
        assert!(parse_page_url("not a url").is_err());
    }

    #[test]
    fn preview_height_follows_surface_aspect() {
        let studio = Studio::with_font(&RenderSettings::default(), None);
        assert_eq!(studio.preview_size(), Size::new(960.0, 540.0));
    }

    #[test]
    fn text_lands_near_bottom_left() {
        let mut studio = Studio::with_font(&RenderSettings::default(), None);
        let id = studio.add_text(TextBanner::new("hello"));
        let layer = studio.model().get(id).unwrap();
        assert_eq!(layer.position, Position::new(50.0, 390.0));
    }

    #[test]
    fn anchored_logo_uses_corner() {
        let mut studio = Studio::with_font(&RenderSettings::default(), None);
        let id = studio.add_logo_anchored(b"x", Anchor::TopRight, 100.0, 80);
        let layer = studio.model().get(id).unwrap();
        assert_eq!(layer.position, Position::new(840.0, 20.0));
    }
}
