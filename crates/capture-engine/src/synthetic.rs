//! Synthetic capture source.
//!
//! Stands in for a real screen or camera: the provider "grants" a fixed
//! resolution (or refuses), and the source renders a moving test pattern at
//! that size. Used by the CLI preview and by tests.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use image::{ImageBuffer, Rgba, RgbaImage};
use imageproc::drawing::{draw_filled_circle_mut, draw_filled_rect_mut};
use imageproc::rect::Rect;

use weever_common::error::{WeeverError, WeeverResult};

use crate::session::CaptureRequest;
use crate::source::{CaptureProvider, CaptureSource, SourceStats};

/// How the synthetic host answers an acquisition request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyntheticOutcome {
    /// Grant a source at exactly this size, whatever was requested.
    Grant { width: u32, height: u32 },
    /// Grant a source at the requested size.
    HonorRequest,
    /// The operator declined the permission prompt.
    Deny,
    /// Nothing to capture.
    Unavailable,
}

/// Lets a test or host simulate the source being revoked.
#[derive(Debug, Clone)]
pub struct RevocationHandle(Arc<AtomicBool>);

impl RevocationHandle {
    pub fn revoke(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_revoked(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

#[derive(Debug)]
pub struct SyntheticCaptureProvider {
    outcome: SyntheticOutcome,
    warmup_polls: u32,
    revoked: Arc<AtomicBool>,
}

impl SyntheticCaptureProvider {
    pub fn new(outcome: SyntheticOutcome) -> Self {
        Self {
            outcome,
            warmup_polls: 0,
            revoked: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn granting(width: u32, height: u32) -> Self {
        Self::new(SyntheticOutcome::Grant { width, height })
    }

    pub fn denying() -> Self {
        Self::new(SyntheticOutcome::Deny)
    }

    /// Number of polls before the first frame "decodes". Until then the
    /// source has no intrinsic dimensions.
    pub fn with_warmup(mut self, polls: u32) -> Self {
        self.warmup_polls = polls;
        self
    }

    /// Handle that ends the most recently acquired source.
    pub fn revocation(&self) -> RevocationHandle {
        RevocationHandle(self.revoked.clone())
    }
}

impl CaptureProvider for SyntheticCaptureProvider {
    fn name(&self) -> &str {
        "synthetic"
    }

    fn acquire(&mut self, request: &CaptureRequest) -> WeeverResult<Box<dyn CaptureSource>> {
        let (width, height) = match self.outcome {
            SyntheticOutcome::Grant { width, height } => (width, height),
            SyntheticOutcome::HonorRequest => (request.preferred_width, request.preferred_height),
            SyntheticOutcome::Deny => {
                return Err(WeeverError::acquisition("Capture permission denied"));
            }
            SyntheticOutcome::Unavailable => {
                return Err(WeeverError::acquisition("No capture source available"));
            }
        };
        if width == 0 || height == 0 {
            return Err(WeeverError::acquisition(format!(
                "Invalid capture size {width}x{height}"
            )));
        }

        self.revoked.store(false, Ordering::SeqCst);
        tracing::debug!(width, height, "Synthetic source granted");
        Ok(Box::new(SyntheticSource {
            label: format!("synthetic {width}x{height}"),
            pattern: test_pattern(width, height),
            frame: None,
            warmup_remaining: self.warmup_polls,
            stats: SourceStats::default(),
            revoked: self.revoked.clone(),
            stopped: false,
        }))
    }
}

struct SyntheticSource {
    label: String,
    pattern: RgbaImage,
    frame: Option<RgbaImage>,
    warmup_remaining: u32,
    stats: SourceStats,
    revoked: Arc<AtomicBool>,
    stopped: bool,
}

impl CaptureSource for SyntheticSource {
    fn label(&self) -> &str {
        &self.label
    }

    fn poll(&mut self) {
        if self.stopped || self.has_ended() {
            return;
        }
        if self.warmup_remaining > 0 {
            self.warmup_remaining -= 1;
            return;
        }

        let mut frame = self.pattern.clone();
        draw_sweep(&mut frame, self.stats.frames_received);
        self.frame = Some(frame);
        self.stats.frames_received += 1;
    }

    fn intrinsic_dimensions(&self) -> Option<(u32, u32)> {
        self.frame.as_ref().map(|f| f.dimensions())
    }

    fn current_frame(&self) -> Option<&RgbaImage> {
        self.frame.as_ref()
    }

    fn has_ended(&self) -> bool {
        self.revoked.load(Ordering::SeqCst)
    }

    fn stop(&mut self) -> WeeverResult<()> {
        self.stopped = true;
        self.frame = None;
        Ok(())
    }

    fn stats(&self) -> SourceStats {
        self.stats
    }
}

/// Color bars with corner markers, sized to the granted resolution.
pub fn test_pattern(width: u32, height: u32) -> RgbaImage {
    let bars = [
        Rgba([192, 192, 192, 255]),
        Rgba([192, 192, 0, 255]),
        Rgba([0, 192, 192, 255]),
        Rgba([0, 192, 0, 255]),
        Rgba([192, 0, 192, 255]),
        Rgba([192, 0, 0, 255]),
        Rgba([0, 0, 192, 255]),
    ];
    let bar_width = (width / bars.len() as u32).max(1);
    let mut img: RgbaImage = ImageBuffer::from_fn(width, height, |x, _| {
        bars[((x / bar_width) as usize).min(bars.len() - 1)]
    });

    // Bottom strip
    let strip_top = height - height / 6;
    draw_filled_rect_mut(
        &mut img,
        Rect::at(0, strip_top as i32).of_size(width, (height - strip_top).max(1)),
        Rgba([30, 30, 35, 255]),
    );

    let radius = (width.min(height) / 40).max(2) as i32;
    let inset = radius + 4;
    for (x, y) in [
        (inset, inset),
        (width as i32 - inset, inset),
        (width as i32 - inset, height as i32 - inset),
        (inset, height as i32 - inset),
    ] {
        draw_filled_circle_mut(&mut img, (x, y), radius, Rgba([255, 50, 50, 255]));
    }

    img
}

/// Moving marker in the bottom strip so consecutive frames differ.
fn draw_sweep(frame: &mut RgbaImage, index: u64) {
    let (width, height) = frame.dimensions();
    let marker = (width / 20).max(1);
    let travel = u64::from(width.saturating_sub(marker).max(1));
    let x = ((index * 8) % travel) as i32;
    let strip_top = height - height / 6;
    draw_filled_rect_mut(
        frame,
        Rect::at(x, strip_top as i32).of_size(marker, (height / 6).max(1)),
        Rgba([240, 240, 240, 255]),
    );
}
