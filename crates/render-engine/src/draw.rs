//! Pixel-level drawing helpers on RGBA buffers.
//!
//! Everything here clips to the destination and to an optional clip box, so
//! callers can pass rectangles that hang off the surface.

use image::imageops::{self, FilterType};
use image::RgbaImage;

use weever_layer_model::Rect;

/// Integer rectangle in surface pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PixelRect {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

impl PixelRect {
    pub fn new(x: i32, y: i32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Round a floating-point rect to whole pixels.
    pub fn from_rect(rect: &Rect) -> Self {
        Self {
            x: rect.x.round() as i32,
            y: rect.y.round() as i32,
            width: rect.width.max(0.0).round() as u32,
            height: rect.height.max(0.0).round() as u32,
        }
    }

    pub fn of_image(image: &RgbaImage) -> Self {
        Self::new(0, 0, image.width(), image.height())
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Edges are summed in `i64`, so rects reaching past `i32::MAX` clip
    /// instead of overflowing.
    pub fn intersect(&self, other: &PixelRect) -> Option<PixelRect> {
        let x0 = self.x.max(other.x);
        let y0 = self.y.max(other.y);
        let x1 = self.right().min(other.right());
        let y1 = self.bottom().min(other.bottom());
        let width = x1 - i64::from(x0);
        let height = y1 - i64::from(y0);
        (width > 0 && height > 0).then(|| PixelRect::new(x0, y0, width as u32, height as u32))
    }

    fn right(&self) -> i64 {
        i64::from(self.x) + i64::from(self.width)
    }

    fn bottom(&self) -> i64 {
        i64::from(self.y) + i64::from(self.height)
    }
}

/// Source-over blend of `src` onto `dst`.
pub fn blend_pixel(dst: &mut [u8; 4], src: [u8; 4]) {
    let alpha = u16::from(src[3]);
    if alpha == 0 {
        return;
    }
    if alpha == 255 {
        *dst = src;
        return;
    }

    let inv_alpha = 255 - alpha;
    for channel in 0..3 {
        let d = u16::from(dst[channel]);
        let s = u16::from(src[channel]);
        dst[channel] = ((s * alpha + d * inv_alpha + 127) / 255) as u8;
    }
    let da = u16::from(dst[3]);
    dst[3] = (alpha + (da * inv_alpha + 127) / 255).min(255) as u8;
}

/// Blend a solid color over `rect`, clipped to `clip` and the frame.
pub fn fill_rect(frame: &mut RgbaImage, rect: PixelRect, color: [u8; 4], clip: Option<PixelRect>) {
    if color[3] == 0 {
        return;
    }
    let Some(area) = visible_area(frame, rect, clip) else {
        return;
    };
    for y in area.y..area.y + area.height as i32 {
        for x in area.x..area.x + area.width as i32 {
            blend_pixel(&mut frame.get_pixel_mut(x as u32, y as u32).0, color);
        }
    }
}

/// Blend `src` at `dest` (already scaled to `dest`'s size), with opacity in
/// percent.
pub fn blit(
    frame: &mut RgbaImage,
    src: &RgbaImage,
    dest: PixelRect,
    opacity: u8,
    clip: Option<PixelRect>,
) {
    let opacity = u16::from(opacity.min(100));
    if opacity == 0 {
        return;
    }
    let Some(area) = visible_area(frame, dest, clip) else {
        return;
    };
    for y in area.y..area.y + area.height as i32 {
        let sy = (y - dest.y) as u32;
        for x in area.x..area.x + area.width as i32 {
            let sx = (x - dest.x) as u32;
            if sx >= src.width() || sy >= src.height() {
                continue;
            }
            let mut px = src.get_pixel(sx, sy).0;
            px[3] = ((u16::from(px[3]) * opacity + 50) / 100) as u8;
            blend_pixel(&mut frame.get_pixel_mut(x as u32, y as u32).0, px);
        }
    }
}

/// Replace the whole frame with `src`, stretched to fit.
pub fn fill_with(frame: &mut RgbaImage, src: &RgbaImage) {
    if frame.dimensions() == src.dimensions() {
        frame.copy_from_slice(src.as_raw());
        return;
    }
    let scaled = imageops::resize(src, frame.width(), frame.height(), FilterType::Triangle);
    frame.copy_from_slice(scaled.as_raw());
}

/// Bilinear sample of `src` stretched over `placement`, keeping only the
/// `window` of it. Both are in destination pixels, and the result is
/// `window`-sized however large `placement` is.
pub fn resample_region(src: &RgbaImage, placement: &Rect, window: PixelRect) -> RgbaImage {
    let mut out = RgbaImage::new(window.width, window.height);
    let (src_width, src_height) = src.dimensions();
    if src_width == 0 || src_height == 0 || placement.width <= 0.0 || placement.height <= 0.0 {
        return out;
    }

    let kx = f64::from(src_width) / placement.width;
    let ky = f64::from(src_height) / placement.height;
    let max_x = f64::from(src_width - 1);
    let max_y = f64::from(src_height - 1);
    // Sample at pixel centres, mapped back into source coordinates.
    for (x, y, px) in out.enumerate_pixels_mut() {
        let dx = f64::from(window.x) + f64::from(x) + 0.5 - placement.x;
        let dy = f64::from(window.y) + f64::from(y) + 0.5 - placement.y;
        let fx = (dx * kx - 0.5).clamp(0.0, max_x);
        let fy = (dy * ky - 0.5).clamp(0.0, max_y);
        px.0 = sample_bilinear(src, fx, fy);
    }
    out
}

fn sample_bilinear(src: &RgbaImage, fx: f64, fy: f64) -> [u8; 4] {
    let x0 = fx.floor() as u32;
    let y0 = fy.floor() as u32;
    let x1 = (x0 + 1).min(src.width() - 1);
    let y1 = (y0 + 1).min(src.height() - 1);
    let tx = fx - f64::from(x0);
    let ty = fy - f64::from(y0);

    let top_left = src.get_pixel(x0, y0).0;
    let top_right = src.get_pixel(x1, y0).0;
    let bottom_left = src.get_pixel(x0, y1).0;
    let bottom_right = src.get_pixel(x1, y1).0;

    let mut out = [0u8; 4];
    for channel in 0..4 {
        let top = lerp(top_left[channel], top_right[channel], tx);
        let bottom = lerp(bottom_left[channel], bottom_right[channel], tx);
        out[channel] = (top + (bottom - top) * ty).round().clamp(0.0, 255.0) as u8;
    }
    out
}

fn lerp(a: u8, b: u8, t: f64) -> f64 {
    f64::from(a) + (f64::from(b) - f64::from(a)) * t
}

/// Coverage mask (e.g. a glyph bitmap) tinted with `color`.
pub fn blend_mask(
    frame: &mut RgbaImage,
    mask: &[u8],
    mask_width: usize,
    origin: (i32, i32),
    color: [u8; 4],
    clip: Option<PixelRect>,
) {
    if mask_width == 0 {
        return;
    }
    let mask_height = mask.len() / mask_width;
    let dest = PixelRect::new(origin.0, origin.1, mask_width as u32, mask_height as u32);
    let Some(area) = visible_area(frame, dest, clip) else {
        return;
    };
    for y in area.y..area.y + area.height as i32 {
        let row = (y - origin.1) as usize;
        for x in area.x..area.x + area.width as i32 {
            let col = (x - origin.0) as usize;
            let coverage = mask[row * mask_width + col];
            if coverage == 0 {
                continue;
            }
            let alpha = ((u16::from(coverage) * u16::from(color[3])) / 255) as u8;
            blend_pixel(
                &mut frame.get_pixel_mut(x as u32, y as u32).0,
                [color[0], color[1], color[2], alpha],
            );
        }
    }
}

fn visible_area(frame: &RgbaImage, rect: PixelRect, clip: Option<PixelRect>) -> Option<PixelRect> {
    let mut area = rect.intersect(&PixelRect::of_image(frame))?;
    if let Some(clip) = clip {
        area = area.intersect(&clip)?;
    }
    Some(area)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    #[test]
    fn opaque_source_replaces() {
        let mut dst = [10, 20, 30, 255];
        blend_pixel(&mut dst, [200, 100, 50, 255]);
        assert_eq!(dst, [200, 100, 50, 255]);
    }

    #[test]
    fn half_alpha_mixes() {
        let mut dst = [0, 0, 0, 255];
        blend_pixel(&mut dst, [255, 255, 255, 128]);
        assert_eq!(dst[0], 128);
        assert_eq!(dst[3], 255);
    }

    #[test]
    fn fill_is_clipped_to_frame() {
        let mut frame = RgbaImage::from_pixel(10, 10, Rgba([0, 0, 0, 255]));
        fill_rect(&mut frame, PixelRect::new(-5, 8, 100, 100), [255, 0, 0, 255], None);
        assert_eq!(frame.get_pixel(0, 9).0, [255, 0, 0, 255]);
        assert_eq!(frame.get_pixel(0, 7).0, [0, 0, 0, 255]);
    }

    #[test]
    fn fill_respects_clip_box() {
        let mut frame = RgbaImage::from_pixel(10, 10, Rgba([0, 0, 0, 255]));
        let clip = PixelRect::new(2, 2, 2, 2);
        fill_rect(&mut frame, PixelRect::new(0, 0, 10, 10), [0, 255, 0, 255], Some(clip));
        assert_eq!(frame.get_pixel(2, 2).0, [0, 255, 0, 255]);
        assert_eq!(frame.get_pixel(4, 4).0, [0, 0, 0, 255]);
    }

    #[test]
    fn blit_applies_opacity() {
        let mut frame = RgbaImage::from_pixel(4, 4, Rgba([0, 0, 0, 255]));
        let src = RgbaImage::from_pixel(2, 2, Rgba([200, 200, 200, 255]));
        blit(&mut frame, &src, PixelRect::new(1, 1, 2, 2), 50, None);
        assert_eq!(frame.get_pixel(1, 1).0[0], 100);
        assert_eq!(frame.get_pixel(0, 0).0[0], 0);
    }

    #[test]
    fn fill_with_stretches() {
        let mut frame = RgbaImage::new(8, 4);
        let src = RgbaImage::from_pixel(2, 1, Rgba([9, 9, 9, 255]));
        fill_with(&mut frame, &src);
        assert_eq!(frame.get_pixel(7, 3).0, [9, 9, 9, 255]);
    }

    #[test]
    fn intersect_survives_edges_past_i32_max() {
        let far = PixelRect::new(i32::MAX - 10, 0, u32::MAX, 50);
        let frame = PixelRect::new(0, 0, 1920, 1080);
        assert_eq!(far.intersect(&frame), None);

        let wide = PixelRect::new(i32::MIN, 0, u32::MAX, 50);
        assert_eq!(wide.intersect(&frame), Some(PixelRect::new(0, 0, 1920, 50)));
    }

    #[test]
    fn blit_far_off_frame_is_a_no_op() {
        let mut frame = RgbaImage::from_pixel(4, 4, Rgba([0, 0, 0, 255]));
        let src = RgbaImage::from_pixel(2, 2, Rgba([255, 255, 255, 255]));
        blit(&mut frame, &src, PixelRect::new(i32::MAX, 0, u32::MAX, 2), 100, None);
        assert!(frame.pixels().all(|p| p.0 == [0, 0, 0, 255]));
    }

    #[test]
    fn resample_region_keeps_only_the_window() {
        let mut src = RgbaImage::from_pixel(2, 1, Rgba([255, 0, 0, 255]));
        src.put_pixel(1, 0, Rgba([0, 255, 0, 255]));

        // Stretched over 40000 px, only a 10x4 window is produced.
        let placement = Rect::new(-20000.0, 0.0, 40000.0, 4.0);
        let right_half = resample_region(&src, &placement, PixelRect::new(15000, 0, 10, 4));
        assert_eq!(right_half.dimensions(), (10, 4));
        assert!(right_half.pixels().all(|p| p.0 == [0, 255, 0, 255]));

        let left_edge = resample_region(&src, &placement, PixelRect::new(-20000, 0, 10, 4));
        assert_eq!(left_edge.get_pixel(0, 0).0, [255, 0, 0, 255]);
    }

    #[test]
    fn pixel_rect_rounds() {
        let rect = PixelRect::from_rect(&Rect::new(1.4, 2.6, 10.5, -3.0));
        assert_eq!(rect, PixelRect::new(1, 3, 11, 0));
        assert!(rect.is_empty());
    }
}
