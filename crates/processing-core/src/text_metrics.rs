//! Text layout measurement.
//!
//! The scroll animator needs the laid-out extent of a banner's text along
//! its scroll axis. Real glyph metrics come from the render engine's font
//! painter; [`ApproxMetrics`] is the font-less fallback.

use serde::{Deserialize, Serialize};

use weever_layer_model::{ScrollDirection, Size, TextBanner};

/// Inner padding of a text banner box (horizontal, vertical).
pub const BANNER_PADDING_X: f64 = 20.0;
pub const BANNER_PADDING_Y: f64 = 12.0;

/// Laid-out size of a run of text.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct TextExtent {
    pub width: f64,
    pub height: f64,
}

/// Something that can lay out text and report its size.
pub trait TextMetrics {
    /// Extent of `text` at `font_size` pixels. With `wrap_width`, lines are
    /// broken to fit that width.
    fn measure(&self, text: &str, font_size: f32, wrap_width: Option<f32>) -> TextExtent;
}

/// Monospace-ish estimate: 0.6 em per character, 1.2 em per line.
#[derive(Debug, Clone, Copy, Default)]
pub struct ApproxMetrics;

impl ApproxMetrics {
    const ADVANCE_EM: f64 = 0.6;
    const LINE_EM: f64 = 1.2;
}

impl TextMetrics for ApproxMetrics {
    fn measure(&self, text: &str, font_size: f32, wrap_width: Option<f32>) -> TextExtent {
        let size = f64::from(font_size.max(1.0));
        let advance = size * Self::ADVANCE_EM;
        let max_cols = wrap_width
            .map(|w| ((f64::from(w) / advance).floor() as usize).max(1))
            .unwrap_or(usize::MAX);

        let mut lines = 0usize;
        let mut widest = 0usize;
        for line in text.split('\n') {
            let chars = line.chars().count();
            if chars == 0 {
                lines += 1;
                continue;
            }
            let wrapped = chars.div_ceil(max_cols);
            lines += wrapped;
            widest = widest.max(chars.min(max_cols));
        }

        TextExtent {
            width: widest as f64 * advance,
            height: lines.max(1) as f64 * size * Self::LINE_EM,
        }
    }
}

/// Content and container extents of a banner along its scroll axis.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct AxisExtents {
    pub content: f64,
    pub container: f64,
}

/// Wrap width used when laying out a banner's text.
///
/// Horizontal marquees never wrap; everything else wraps inside the box.
pub fn banner_wrap_width(direction: ScrollDirection, box_size: Size) -> Option<f32> {
    match direction {
        ScrollDirection::Horizontal => None,
        ScrollDirection::Vertical | ScrollDirection::None => {
            Some((box_size.width - 2.0 * BANNER_PADDING_X).max(1.0) as f32)
        }
    }
}

/// Measure a banner's extents along its scroll axis. Returns zeros for a
/// static banner.
pub fn banner_extents(banner: &TextBanner, box_size: Size, metrics: &dyn TextMetrics) -> AxisExtents {
    let wrap = banner_wrap_width(banner.scroll_direction, box_size);
    let text = metrics.measure(&banner.content, banner.font_size, wrap);
    match banner.scroll_direction {
        ScrollDirection::None => AxisExtents::default(),
        ScrollDirection::Horizontal => AxisExtents {
            content: text.width,
            container: box_size.width,
        },
        ScrollDirection::Vertical => AxisExtents {
            content: text.height,
            container: box_size.height,
        },
    }
}

/// Default box size for a new banner, mirroring the preset layout: wide
/// single-line strips for horizontal marquees, a taller card for vertical
/// ones, and a snug fit for static text.
pub fn default_banner_size(banner: &TextBanner, metrics: &dyn TextMetrics) -> Size {
    let line = f64::from(banner.font_size) * 1.2 + 2.0 * BANNER_PADDING_Y;
    match banner.scroll_direction {
        ScrollDirection::Horizontal => Size::new(600.0, line),
        ScrollDirection::Vertical => Size::new(400.0, 200.0),
        ScrollDirection::None => {
            let text = metrics.measure(&banner.content, banner.font_size, Some(560.0));
            Size::new(
                text.width + 2.0 * BANNER_PADDING_X,
                text.height + 2.0 * BANNER_PADDING_Y,
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn approx_single_line() {
        let extent = ApproxMetrics.measure("LIVE", 20.0, None);
        assert!((extent.width - 48.0).abs() < 1e-9);
        assert!((extent.height - 24.0).abs() < 1e-9);
    }

    #[test]
    fn approx_wraps_to_width() {
        // 10px font -> 6px advance -> 10 columns in 60px.
        let extent = ApproxMetrics.measure("abcdefghijklmnopqrstuvwxy", 10.0, Some(60.0));
        assert!((extent.width - 60.0).abs() < 1e-9);
        assert!((extent.height - 36.0).abs() < 1e-9);
    }

    #[test]
    fn approx_empty_text_has_one_line() {
        let extent = ApproxMetrics.measure("", 10.0, None);
        assert_eq!(extent.width, 0.0);
        assert!((extent.height - 12.0).abs() < 1e-9);
    }

    #[test]
    fn horizontal_extents_use_width() {
        let banner = TextBanner::new("LIVE").with_scroll(ScrollDirection::Horizontal, 5);
        let extents = banner_extents(&banner, Size::new(600.0, 48.0), &ApproxMetrics);
        assert_eq!(extents.container, 600.0);
        assert!((extents.content - 4.0 * 24.0 * 0.6).abs() < 1e-6);
    }

    #[test]
    fn static_banner_has_no_extents() {
        let banner = TextBanner::new("static");
        let extents = banner_extents(&banner, Size::new(200.0, 50.0), &ApproxMetrics);
        assert_eq!(extents, AxisExtents::default());
    }
}
