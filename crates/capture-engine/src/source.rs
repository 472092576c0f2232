use image::RgbaImage;

use weever_common::error::WeeverResult;

use crate::session::CaptureRequest;

/// Something that can hand out live video sources.
///
/// Acquisition may be refused (permission denied, nothing to capture).
/// That is reported once as [`weever_common::WeeverError::Acquisition`]; no
/// retry happens here.
pub trait CaptureProvider: Send {
    /// Short name for logs.
    fn name(&self) -> &str;

    /// Acquire a running source. The returned source may deliver frames at
    /// a size other than the one requested.
    fn acquire(&mut self, request: &CaptureRequest) -> WeeverResult<Box<dyn CaptureSource>>;
}

/// A running live video source.
pub trait CaptureSource: Send {
    /// Short name for logs.
    fn label(&self) -> &str;

    /// Pull whatever the source has produced since the last call.
    ///
    /// Never blocks. Sources that hit a fatal error mark themselves ended
    /// instead of returning it.
    fn poll(&mut self);

    /// Native frame size, known once the first frame has been decoded.
    fn intrinsic_dimensions(&self) -> Option<(u32, u32)>;

    /// Latest decoded frame.
    fn current_frame(&self) -> Option<&RgbaImage>;

    /// The host terminated the source (access revoked, device gone, EOS).
    fn has_ended(&self) -> bool;

    /// Release the underlying capture resource.
    fn stop(&mut self) -> WeeverResult<()>;

    /// Runtime statistics.
    fn stats(&self) -> SourceStats;
}

/// Runtime statistics from a capture source.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SourceStats {
    /// Frames received from the source.
    pub frames_received: u64,

    /// Frames superseded before anyone looked at them.
    pub frames_dropped: u64,
}

impl SourceStats {
    /// Drop rate as a percentage.
    pub fn drop_rate(&self) -> f64 {
        if self.frames_received == 0 {
            return 0.0;
        }
        self.frames_dropped as f64 / self.frames_received as f64 * 100.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn drop_rate_handles_empty_stats() {
        assert_eq!(SourceStats::default().drop_rate(), 0.0);
    }

    #[test]
    fn drop_rate_is_a_percentage() {
        let stats = SourceStats {
            frames_received: 200,
            frames_dropped: 50,
        };
        assert!((stats.drop_rate() - 25.0).abs() < 1e-9);
    }
}
