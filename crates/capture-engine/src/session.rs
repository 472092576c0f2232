//! Capture session lifecycle.

use image::RgbaImage;
use serde::{Deserialize, Serialize};

use weever_common::clock::SessionClock;
use weever_common::config::CaptureDefaults;
use weever_common::error::{WeeverError, WeeverResult};

use crate::source::{CaptureProvider, CaptureSource, SourceStats};

/// What the operator asks the host for when starting capture.
///
/// These are preferences. The host may grant something else.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaptureRequest {
    pub preferred_width: u32,
    pub preferred_height: u32,
    pub preferred_frame_rate: u32,
    pub include_audio: bool,
}

impl Default for CaptureRequest {
    fn default() -> Self {
        Self::from(&CaptureDefaults::default())
    }
}

impl From<&CaptureDefaults> for CaptureRequest {
    fn from(defaults: &CaptureDefaults) -> Self {
        Self {
            preferred_width: defaults.preferred_width,
            preferred_height: defaults.preferred_height,
            preferred_frame_rate: defaults.preferred_frame_rate,
            include_audio: defaults.include_audio,
        }
    }
}

/// State of a capture session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    /// No source bound.
    #[default]
    Idle,
    /// A live source is bound.
    Capturing,
}

/// Why a session went back to Idle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// The operator stopped capture.
    Requested,
    /// The host terminated the source.
    SourceEnded,
}

/// Point-in-time view of the session for status displays.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionStatus {
    pub state: SessionState,
    pub source: Option<String>,
    pub dimensions: Option<(u32, u32)>,
    pub elapsed_secs: f64,
    pub frames_received: u64,
}

/// The single live capture binding.
///
/// Owns the source it acquired and releases exactly that on stop or drop.
#[derive(Default)]
pub struct CaptureSession {
    state: SessionState,
    source: Option<Box<dyn CaptureSource>>,
    clock: Option<SessionClock>,
    request: Option<CaptureRequest>,
}

impl CaptureSession {
    /// Create an idle session.
    pub fn new() -> Self {
        Self::default()
    }

    /// Current session state.
    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn is_active(&self) -> bool {
        self.state == SessionState::Capturing
    }

    /// The request the running source was acquired with.
    pub fn request(&self) -> Option<&CaptureRequest> {
        self.request.as_ref()
    }

    /// Acquire a source from `provider` and start capturing.
    ///
    /// On acquisition failure the error is returned once and the session
    /// stays Idle.
    pub fn start(
        &mut self,
        provider: &mut dyn CaptureProvider,
        request: &CaptureRequest,
    ) -> WeeverResult<()> {
        if self.state != SessionState::Idle {
            return Err(WeeverError::capture("Session already started"));
        }

        tracing::info!(
            provider = provider.name(),
            preferred_width = request.preferred_width,
            preferred_height = request.preferred_height,
            preferred_frame_rate = request.preferred_frame_rate,
            include_audio = request.include_audio,
            "Requesting capture source"
        );

        let source = match provider.acquire(request) {
            Ok(source) => source,
            Err(e) => {
                tracing::warn!(provider = provider.name(), error = %e, "Capture acquisition failed");
                return Err(e);
            }
        };

        let clock = SessionClock::start();
        tracing::info!(
            source = source.label(),
            epoch_wall = %clock.epoch_wall(),
            "Capture session started"
        );

        self.source = Some(source);
        self.clock = Some(clock);
        self.request = Some(*request);
        self.state = SessionState::Capturing;
        Ok(())
    }

    /// Let the source deliver pending frames.
    pub fn poll(&mut self) {
        if let Some(source) = self.source.as_mut() {
            source.poll();
        }
    }

    /// The host terminated the bound source.
    pub fn source_ended(&self) -> bool {
        self.source.as_ref().is_some_and(|s| s.has_ended())
    }

    /// Native frame size of the bound source, once known.
    pub fn intrinsic_dimensions(&self) -> Option<(u32, u32)> {
        self.source.as_ref()?.intrinsic_dimensions()
    }

    /// Latest frame from the bound source.
    pub fn current_frame(&self) -> Option<&RgbaImage> {
        self.source.as_ref()?.current_frame()
    }

    /// Release the source and return to Idle.
    ///
    /// Stopping an idle session is a no-op and returns `None`. A source that
    /// fails to shut down cleanly is still dropped; the failure is logged.
    pub fn stop(&mut self, reason: StopReason) -> Option<SourceStats> {
        let mut source = self.source.take()?;
        let stats = source.stats();
        let elapsed = self.elapsed_secs();

        if let Err(e) = source.stop() {
            tracing::warn!(source = source.label(), error = %e, "Capture source did not stop cleanly");
        }

        self.state = SessionState::Idle;
        self.clock = None;
        self.request = None;

        tracing::info!(
            ?reason,
            elapsed_secs = elapsed,
            frames_received = stats.frames_received,
            drop_rate = stats.drop_rate(),
            "Capture session stopped"
        );
        Some(stats)
    }

    /// Time since capture started.
    pub fn elapsed_secs(&self) -> f64 {
        self.clock.as_ref().map(|c| c.elapsed_secs()).unwrap_or(0.0)
    }

    pub fn status(&self) -> SessionStatus {
        SessionStatus {
            state: self.state,
            source: self.source.as_ref().map(|s| s.label().to_string()),
            dimensions: self.intrinsic_dimensions(),
            elapsed_secs: self.elapsed_secs(),
            frames_received: self
                .source
                .as_ref()
                .map(|s| s.stats().frames_received)
                .unwrap_or(0),
        }
    }
}

impl Drop for CaptureSession {
    fn drop(&mut self) {
        self.stop(StopReason::Requested);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::synthetic::SyntheticCaptureProvider;

    #[test]
    fn request_defaults_follow_config() {
        let request = CaptureRequest::default();
        assert_eq!(request.preferred_width, 1920);
        assert_eq!(request.preferred_height, 1080);
        assert_eq!(request.preferred_frame_rate, 60);
        assert!(request.include_audio);
    }

    #[test]
    fn denied_acquisition_stays_idle() {
        let mut provider = SyntheticCaptureProvider::denying();
        let mut session = CaptureSession::new();
        let err = session
            .start(&mut provider, &CaptureRequest::default())
            .unwrap_err();
        assert!(matches!(err, WeeverError::Acquisition { .. }));
        assert_eq!(session.state(), SessionState::Idle);
        assert!(session.intrinsic_dimensions().is_none());
    }

    #[test]
    fn double_start_is_rejected() {
        let mut provider = SyntheticCaptureProvider::granting(640, 360);
        let mut session = CaptureSession::new();
        session.start(&mut provider, &CaptureRequest::default()).unwrap();
        assert!(session.start(&mut provider, &CaptureRequest::default()).is_err());
        assert!(session.is_active());
    }

    #[test]
    fn dimensions_come_from_the_source() {
        let mut provider = SyntheticCaptureProvider::granting(1280, 720).with_warmup(2);
        let mut session = CaptureSession::new();
        session.start(&mut provider, &CaptureRequest::default()).unwrap();

        session.poll();
        assert_eq!(session.intrinsic_dimensions(), None);
        session.poll();
        assert_eq!(session.intrinsic_dimensions(), None);
        session.poll();
        assert_eq!(session.intrinsic_dimensions(), Some((1280, 720)));
        assert_eq!(session.current_frame().map(|f| f.dimensions()), Some((1280, 720)));
    }

    #[test]
    fn stop_releases_and_is_idempotent() {
        let mut provider = SyntheticCaptureProvider::granting(320, 240);
        let mut session = CaptureSession::new();
        session.start(&mut provider, &CaptureRequest::default()).unwrap();
        session.poll();

        let stats = session.stop(StopReason::Requested).unwrap();
        assert_eq!(stats.frames_received, 1);
        assert_eq!(session.state(), SessionState::Idle);
        assert!(session.current_frame().is_none());
        assert!(session.stop(StopReason::Requested).is_none());
    }

    #[test]
    fn revoked_source_reports_ended() {
        let mut provider = SyntheticCaptureProvider::granting(320, 240);
        let revoke = provider.revocation();
        let mut session = CaptureSession::new();
        session.start(&mut provider, &CaptureRequest::default()).unwrap();
        assert!(!session.source_ended());
        revoke.revoke();
        assert!(session.source_ended());
    }
}
