//! GStreamer-backed capture.
//!
//! Builds a live pipeline that ends in an `appsink` delivering RGBA frames.
//! The caps are negotiated by the source, so the frame size is whatever the
//! host grants; the request only feeds the launch string's framerate.

use std::sync::OnceLock;

use gst::prelude::*;
use gstreamer as gst;
use gstreamer_app as gst_app;
use image::RgbaImage;

use weever_common::error::{WeeverError, WeeverResult};

use crate::session::CaptureRequest;
use crate::source::{CaptureProvider, CaptureSource, SourceStats};

const SINK_NAME: &str = "weever_sink";

/// Provider that captures through a GStreamer source element.
#[derive(Debug, Clone)]
pub struct GstCaptureProvider {
    name: String,
    source_element: String,
}

impl GstCaptureProvider {
    /// Any GStreamer source description, e.g. `"v4l2src device=/dev/video0"`.
    pub fn from_source_element(name: impl Into<String>, element: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            source_element: element.into(),
        }
    }

    /// The platform's screen capture element.
    pub fn screen() -> Self {
        #[cfg(target_os = "windows")]
        let element = "d3d11screencapturesrc show-cursor=true";
        #[cfg(target_os = "macos")]
        let element = "avfvideosrc capture-screen=true capture-screen-cursor=true";
        #[cfg(not(any(target_os = "windows", target_os = "macos")))]
        let element = "ximagesrc use-damage=false show-pointer=true";
        Self::from_source_element("screen", element)
    }

    /// `videotestsrc`, for hosts without a display.
    pub fn test_source() -> Self {
        Self::from_source_element("test", "videotestsrc is-live=true pattern=smpte")
    }

    fn launch_string(&self, request: &CaptureRequest) -> String {
        let fps = request.preferred_frame_rate.max(1);
        // Leaky queue keeps the source from stalling when the preview is slow.
        format!(
            "{src} ! queue max-size-buffers=4 leaky=downstream ! videoconvert ! videorate ! video/x-raw,format=RGBA,framerate={fps}/1 ! appsink name={SINK_NAME} max-buffers=2 drop=true sync=false",
            src = self.source_element
        )
    }
}

impl CaptureProvider for GstCaptureProvider {
    fn name(&self) -> &str {
        &self.name
    }

    fn acquire(&mut self, request: &CaptureRequest) -> WeeverResult<Box<dyn CaptureSource>> {
        init_gstreamer()?;

        let launch = self.launch_string(request);
        tracing::debug!(pipeline = %self.name, %launch, "Building capture pipeline");

        let element = gst::parse::launch(&launch).map_err(|e| {
            WeeverError::acquisition(format!("Failed to build {} pipeline: {e}", self.name))
        })?;
        let pipeline = element.dynamic_cast::<gst::Pipeline>().map_err(|_| {
            WeeverError::acquisition("Launch string did not produce a pipeline")
        })?;
        let appsink = pipeline
            .by_name(SINK_NAME)
            .and_then(|e| e.dynamic_cast::<gst_app::AppSink>().ok())
            .ok_or_else(|| WeeverError::acquisition("Capture pipeline has no appsink"))?;

        pipeline.set_state(gst::State::Playing).map_err(|e| {
            WeeverError::acquisition(format!("Failed to start {} pipeline: {e:?}", self.name))
        })?;

        // State changes are async; a refused source shows up here.
        match pipeline.state(gst::ClockTime::from_seconds(10)) {
            (Ok(_), gst::State::Playing, _) => {}
            (Ok(_), state, _) => {
                tracing::warn!(
                    pipeline = %self.name,
                    ?state,
                    "Pipeline did not reach Playing state within timeout"
                );
            }
            (Err(e), _, _) => {
                let _ = pipeline.set_state(gst::State::Null);
                return Err(WeeverError::acquisition(format!(
                    "{} pipeline failed to reach Playing state: {e:?}",
                    self.name
                )));
            }
        }

        Ok(Box::new(GstCaptureSource {
            label: self.name.clone(),
            pipeline,
            appsink,
            frame: None,
            ended: false,
            stats: SourceStats::default(),
        }))
    }
}

struct GstCaptureSource {
    label: String,
    pipeline: gst::Pipeline,
    appsink: gst_app::AppSink,
    frame: Option<RgbaImage>,
    ended: bool,
    stats: SourceStats,
}

impl GstCaptureSource {
    fn drain_bus(&mut self) {
        let Some(bus) = self.pipeline.bus() else {
            return;
        };
        while let Some(msg) = bus.pop() {
            match msg.view() {
                gst::MessageView::Eos(_) => {
                    tracing::info!(pipeline = %self.label, "Capture source reached end of stream");
                    self.ended = true;
                }
                gst::MessageView::Error(e) => {
                    tracing::warn!(
                        pipeline = %self.label,
                        error = %e.error(),
                        "Capture pipeline error; treating source as ended"
                    );
                    self.ended = true;
                }
                _ => {}
            }
        }
    }
}

impl CaptureSource for GstCaptureSource {
    fn label(&self) -> &str {
        &self.label
    }

    fn poll(&mut self) {
        self.drain_bus();
        if self.ended {
            return;
        }

        let mut latest = None;
        while let Some(sample) = self.appsink.try_pull_sample(gst::ClockTime::ZERO) {
            self.stats.frames_received += 1;
            if latest.replace(sample).is_some() {
                self.stats.frames_dropped += 1;
            }
        }
        if let Some(sample) = latest {
            match sample_to_image(&sample) {
                Some(image) => self.frame = Some(image),
                None => tracing::debug!(pipeline = %self.label, "Skipping undecodable sample"),
            }
        }
    }

    fn intrinsic_dimensions(&self) -> Option<(u32, u32)> {
        self.frame.as_ref().map(|f| f.dimensions())
    }

    fn current_frame(&self) -> Option<&RgbaImage> {
        self.frame.as_ref()
    }

    fn has_ended(&self) -> bool {
        self.ended
    }

    fn stop(&mut self) -> WeeverResult<()> {
        self.frame = None;
        self.pipeline.set_state(gst::State::Null).map_err(|e| {
            WeeverError::capture(format!("Failed to stop {} pipeline: {e:?}", self.label))
        })?;
        Ok(())
    }

    fn stats(&self) -> SourceStats {
        self.stats
    }
}

fn sample_to_image(sample: &gst::Sample) -> Option<RgbaImage> {
    let structure = sample.caps()?.structure(0)?;
    let width = u32::try_from(structure.get::<i32>("width").ok()?).ok()?;
    let height = u32::try_from(structure.get::<i32>("height").ok()?).ok()?;
    let map = sample.buffer()?.map_readable().ok()?;
    let data = map.as_slice();

    let row = width as usize * 4;
    let rows = height as usize;
    if row == 0 || rows == 0 || data.len() < row * rows {
        return None;
    }
    let stride = data.len() / rows;
    let mut pixels = Vec::with_capacity(row * rows);
    for r in 0..rows {
        pixels.extend_from_slice(&data[r * stride..r * stride + row]);
    }
    RgbaImage::from_raw(width, height, pixels)
}

fn init_gstreamer() -> WeeverResult<()> {
    static GST_INIT: OnceLock<Result<(), String>> = OnceLock::new();
    let init_res = GST_INIT.get_or_init(|| gst::init().map_err(|e| e.to_string()));
    match init_res {
        Ok(()) => Ok(()),
        Err(e) => Err(WeeverError::acquisition(format!(
            "Failed to initialize GStreamer: {e}"
        ))),
    }
}
