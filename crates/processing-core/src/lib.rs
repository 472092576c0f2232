//! StreemWeever Processing Core — interaction and animation
//!
//! Turns pointer input and timer ticks into layer-model mutations:
//! - **Drag Controller:** press/move/release state machine that repositions
//!   the top-most layer under the pointer
//! - **Scroll Animator:** fixed-period marquee stepping for text banners
//! - **Text Metrics:** layout measurement the animator uses for wrap bounds
//!
//! This crate is pure computation: no I/O, no rendering. It mutates a
//! [`weever_layer_model::LayerModel`] handed to it by the owner.

pub mod drag;
pub mod scroll;
pub mod text_metrics;

pub use drag::{drag_target, DragController, DragState};
pub use scroll::{ScrollAnimator, ScrollTick};
pub use text_metrics::{
    banner_extents, default_banner_size, AxisExtents, ApproxMetrics, TextExtent, TextMetrics,
};
