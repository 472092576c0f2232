//! StreemWeever Layer Model
//!
//! Defines the core data contracts for the compositor:
//! - **Geometry:** positions, sizes, rectangles, clamping and ratio scaling
//! - **Colors:** CSS-like color values for text banners
//! - **Layers:** the closed set of overlay kinds (logo, text, video, page)
//! - **Store:** the ordered layer collection with add/remove/update/list
//!
//! All positions and sizes are expressed in the preview's displayed pixel
//! space; the compositor scales them to the output surface every tick.

pub mod color;
pub mod geometry;
pub mod layer;
pub mod store;

pub use color::*;
pub use geometry::*;
pub use layer::*;
pub use store::*;
