//! The composited output frame.

use std::path::Path;

use image::{Rgba, RgbaImage};

use weever_common::error::{WeeverError, WeeverResult};

/// Single RGBA8 output buffer read by downstream encoders.
///
/// While a capture session is drawing, its size tracks the source's
/// intrinsic dimensions.
#[derive(Debug, Clone)]
pub struct OutputSurface {
    image: RgbaImage,
    frames_presented: u64,
}

impl OutputSurface {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            image: RgbaImage::new(width.max(1), height.max(1)),
            frames_presented: 0,
        }
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn dimensions(&self) -> (u32, u32) {
        self.image.dimensions()
    }

    /// Reallocate the backing buffer if the size changed. Returns `true`
    /// when it did; the new buffer starts out transparent black.
    pub fn resize(&mut self, width: u32, height: u32) -> bool {
        if self.image.dimensions() == (width, height) || width == 0 || height == 0 {
            return false;
        }
        tracing::debug!(
            from_width = self.image.width(),
            from_height = self.image.height(),
            width,
            height,
            "Resizing output surface"
        );
        self.image = RgbaImage::new(width, height);
        true
    }

    pub fn fill(&mut self, color: [u8; 4]) {
        let pixel = Rgba(color);
        for p in self.image.pixels_mut() {
            *p = pixel;
        }
    }

    pub fn image(&self) -> &RgbaImage {
        &self.image
    }

    pub fn image_mut(&mut self) -> &mut RgbaImage {
        &mut self.image
    }

    /// Raw RGBA bytes, row-major, no padding.
    pub fn as_rgba(&self) -> &[u8] {
        self.image.as_raw()
    }

    /// Pixels in row-major order.
    pub fn pixels(&self) -> impl Iterator<Item = [u8; 4]> + '_ {
        self.image.pixels().map(|p| p.0)
    }

    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        (x < self.width() && y < self.height()).then(|| self.image.get_pixel(x, y).0)
    }

    /// Mark a completed frame.
    pub(crate) fn present(&mut self) {
        self.frames_presented += 1;
    }

    /// Number of completed frames drawn into this surface.
    pub fn frames_presented(&self) -> u64 {
        self.frames_presented
    }

    pub fn save_png(&self, path: &Path) -> WeeverResult<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        self.image
            .save_with_format(path, image::ImageFormat::Png)
            .map_err(|e| WeeverError::render(format!("Failed to write {}: {e}", path.display())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resize_only_when_changed() {
        let mut surface = OutputSurface::new(1280, 720);
        assert!(!surface.resize(1280, 720));
        assert!(surface.resize(1920, 1080));
        assert_eq!(surface.dimensions(), (1920, 1080));
        assert_eq!(surface.as_rgba().len(), 1920 * 1080 * 4);
    }

    #[test]
    fn zero_sizes_are_ignored() {
        let mut surface = OutputSurface::new(0, 0);
        assert_eq!(surface.dimensions(), (1, 1));
        assert!(!surface.resize(0, 50));
    }

    #[test]
    fn pixel_is_bounds_checked() {
        let mut surface = OutputSurface::new(4, 4);
        surface.fill([1, 2, 3, 255]);
        assert_eq!(surface.pixel(3, 3), Some([1, 2, 3, 255]));
        assert_eq!(surface.pixel(4, 0), None);
        assert!(surface.pixels().all(|p| p == [1, 2, 3, 255]));
    }
}
