//! StreemWeever Render Engine
//!
//! Real-time compositing of overlay layers onto a live captured frame.
//!
//! # Frame Architecture
//!
//! ```text
//! CaptureSession ──► current frame ──┐
//!                                    ├── scale to surface
//! LayerModel ──► layers (z-order) ───┘         │
//!                                              ├── Logo (opacity blit)
//! ContentStore ──► decoded images / clips ─────┤
//!                                              ├── Video clip (advancing frames)
//! TextPainter ──► glyphs ──────────────────────┤
//!                                              ├── Text banner (bg + scrolled text)
//!                                              │
//!                                              ▼
//!                                        OutputSurface
//!                                              │
//!                                              ▼
//!                          PagePlacements (embedded pages, host-drawn)
//! ```
//!
//! [`Studio`] owns all of the above; [`LiveStudio`] runs its render loop and
//! scroll animator on tokio.

pub mod compositor;
pub mod content;
pub mod draw;
pub mod scheduler;
pub mod studio;
pub mod surface;
pub mod text;

pub use compositor::{Compositor, PagePlacement, TickOutcome, TickReport};
pub use content::{ContentState, ContentStore, FrameSequence, FrameSource};
pub use scheduler::{CancelToken, ScheduledTask, TaskControl};
pub use studio::{LiveStudio, Studio};
pub use surface::OutputSurface;
pub use text::{discover_font, FontMetrics, TextMeasure, TextPainter};
