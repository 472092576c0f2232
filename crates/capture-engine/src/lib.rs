//! StreemWeever Capture Engine
//!
//! Owns the binding to a live video source. A [`CaptureProvider`] turns a
//! [`CaptureRequest`] into a running [`CaptureSource`]; the
//! [`CaptureSession`] holds at most one such source and is the only place
//! it is started or released.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────┐
//! │              CaptureSession              │
//! │   Idle ──start()──▶ Capturing            │
//! │    ▲                   │                 │
//! │    └──stop() / ended───┘                 │
//! │                                          │
//! │  ┌───────────────┐    ┌───────────────┐  │
//! │  │CaptureProvider│──▶ │ CaptureSource │  │
//! │  │ synthetic/gst │    │ poll / frame  │  │
//! │  └───────────────┘    └───────────────┘  │
//! └──────────────────────────────────────────┘
//! ```
//!
//! The requested dimensions are only a preference. The source reports its
//! real frame size once the first frame has been decoded, and that size is
//! what the compositor must use.

#[cfg(feature = "gstreamer")]
pub mod pipeline;
pub mod session;
pub mod source;
pub mod synthetic;

pub use session::*;
pub use source::{CaptureProvider, CaptureSource, SourceStats};
pub use synthetic::{RevocationHandle, SyntheticCaptureProvider, SyntheticOutcome};

#[cfg(feature = "gstreamer")]
pub use pipeline::GstCaptureProvider;
