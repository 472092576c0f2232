//! Position, size, and rectangle math.
//!
//! Pure functions only. Coordinates are pixels with the origin at the
//! top-left of the surface they belong to.

use serde::{Deserialize, Serialize};

/// Clamp `value` into `[min, max]`.
///
/// A degenerate bound (`min > max`, e.g. a layer wider than its surface)
/// yields `min`.
pub fn clamp(value: f64, min: f64, max: f64) -> f64 {
    if min > max {
        return min;
    }
    value.max(min).min(max)
}

/// Rescale `value` from one extent to another: `value * (to / from)`.
///
/// `from_extent` must be non-zero; callers check before scaling.
pub fn scale(value: f64, from_extent: f64, to_extent: f64) -> f64 {
    debug_assert!(from_extent != 0.0, "scale() called with a zero source extent");
    value * (to_extent / from_extent)
}

/// Top-left offset of a layer.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

impl Position {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Vector from `origin` to this point.
    pub fn offset_from(&self, origin: &Position) -> (f64, f64) {
        (self.x - origin.x, self.y - origin.y)
    }
}

/// Render footprint of a layer.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Size {
    pub width: f64,
    pub height: f64,
}

impl Size {
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    pub fn is_empty(&self) -> bool {
        self.width <= 0.0 || self.height <= 0.0
    }
}

/// Axis-aligned rectangle.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn from_parts(position: Position, size: Size) -> Self {
        Self::new(position.x, position.y, size.width, size.height)
    }

    pub fn right(&self) -> f64 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f64 {
        self.y + self.height
    }

    /// Inclusive hit test: `[x, x + width] × [y, y + height]`.
    pub fn contains(&self, px: f64, py: f64) -> bool {
        px >= self.x && px <= self.right() && py >= self.y && py <= self.bottom()
    }

    /// Multiply origin and extent by the same factor.
    pub fn scaled(&self, factor: f64) -> Rect {
        Rect::new(
            self.x * factor,
            self.y * factor,
            self.width * factor,
            self.height * factor,
        )
    }

    /// Overlapping region, if any.
    pub fn intersect(&self, other: &Rect) -> Option<Rect> {
        let x = self.x.max(other.x);
        let y = self.y.max(other.y);
        let right = self.right().min(other.right());
        let bottom = self.bottom().min(other.bottom());
        if right <= x || bottom <= y {
            return None;
        }
        Some(Rect::new(x, y, right - x, bottom - y))
    }
}

/// Corner presets for quick logo placement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum Anchor {
    TopLeft,
    #[default]
    TopRight,
    BottomLeft,
    BottomRight,
}

/// Position that puts a box of `size` in `anchor`'s corner of `surface`,
/// inset by `margin`. Never negative.
pub fn anchored_position(anchor: Anchor, surface: Size, size: Size, margin: f64) -> Position {
    let max_x = (surface.width - size.width).max(0.0);
    let max_y = (surface.height - size.height).max(0.0);
    let (x, y) = match anchor {
        Anchor::TopLeft => (margin, margin),
        Anchor::TopRight => (surface.width - size.width - margin, margin),
        Anchor::BottomLeft => (margin, surface.height - size.height - margin),
        Anchor::BottomRight => (
            surface.width - size.width - margin,
            surface.height - size.height - margin,
        ),
    };
    Position::new(clamp(x, 0.0, max_x), clamp(y, 0.0, max_y))
}
