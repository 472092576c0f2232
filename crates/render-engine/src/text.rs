//! Font loading, text measurement and glyph drawing.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use fontdue::layout::{
    CoordinateSystem, GlyphRasterConfig, Layout, LayoutSettings, TextStyle, WrapStyle,
};
use fontdue::{Font, FontSettings};
use image::RgbaImage;

use weever_common::error::{WeeverError, WeeverResult};
use weever_processing_core::{ApproxMetrics, TextExtent, TextMetrics};

use crate::draw::{blend_mask, PixelRect};

/// Fonts tried when no font is configured.
const SYSTEM_FONT_CANDIDATES: &[&str] = &[
    "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/TTF/DejaVuSans.ttf",
    "/usr/share/fonts/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/truetype/liberation/LiberationSans-Regular.ttf",
    "/usr/share/fonts/liberation-sans/LiberationSans-Regular.ttf",
    "/usr/share/fonts/noto/NotoSans-Regular.ttf",
    "/System/Library/Fonts/Supplemental/Arial.ttf",
    "/Library/Fonts/Arial.ttf",
    "C:\\Windows\\Fonts\\arial.ttf",
];

const GLYPH_CACHE_LIMIT: usize = 4096;

/// Glyph metrics backed by a real font. Cheap to clone.
#[derive(Clone)]
pub struct FontMetrics {
    font: Arc<Font>,
    source: Option<PathBuf>,
}

impl FontMetrics {
    pub fn from_bytes(bytes: Vec<u8>) -> WeeverResult<Self> {
        let font = Font::from_bytes(bytes, FontSettings::default())
            .map_err(|e| WeeverError::content(format!("Failed to parse font: {e}")))?;
        Ok(Self {
            font: Arc::new(font),
            source: None,
        })
    }

    pub fn load(path: &Path) -> WeeverResult<Self> {
        if !path.exists() {
            return Err(WeeverError::FileNotFound {
                path: path.to_path_buf(),
            });
        }
        let mut metrics = Self::from_bytes(std::fs::read(path)?)?;
        metrics.source = Some(path.to_path_buf());
        Ok(metrics)
    }

    /// File the font was loaded from, if any.
    pub fn source(&self) -> Option<&Path> {
        self.source.as_deref()
    }

    fn layout(&self, text: &str, font_size: f32, wrap_width: Option<f32>, origin: (f32, f32)) -> Layout {
        let mut layout = Layout::new(CoordinateSystem::PositiveYDown);
        layout.reset(&LayoutSettings {
            x: origin.0,
            y: origin.1,
            max_width: wrap_width,
            wrap_style: WrapStyle::Word,
            wrap_hard_breaks: true,
            ..LayoutSettings::default()
        });
        layout.append(&[self.font.as_ref()], &TextStyle::new(text, font_size.max(1.0), 0));
        layout
    }
}

impl std::fmt::Debug for FontMetrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FontMetrics").field("source", &self.source).finish()
    }
}

impl TextMetrics for FontMetrics {
    fn measure(&self, text: &str, font_size: f32, wrap_width: Option<f32>) -> TextExtent {
        let layout = self.layout(text, font_size, wrap_width, (0.0, 0.0));
        let width = layout
            .glyphs()
            .iter()
            .map(|g| g.x + g.width as f32)
            .fold(0.0f32, f32::max);
        TextExtent {
            width: f64::from(width),
            height: f64::from(layout.height()),
        }
    }
}

/// Whatever the studio measures text with: the loaded font, or the
/// estimate when no font could be found.
#[derive(Debug, Clone)]
pub enum TextMeasure {
    Font(FontMetrics),
    Approx(ApproxMetrics),
}

impl TextMetrics for TextMeasure {
    fn measure(&self, text: &str, font_size: f32, wrap_width: Option<f32>) -> TextExtent {
        match self {
            TextMeasure::Font(font) => font.measure(text, font_size, wrap_width),
            TextMeasure::Approx(approx) => approx.measure(text, font_size, wrap_width),
        }
    }
}

/// Load the configured font, or the first system font that parses.
pub fn discover_font(configured: Option<&Path>) -> Option<FontMetrics> {
    if let Some(path) = configured {
        match FontMetrics::load(path) {
            Ok(metrics) => return Some(metrics),
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Configured font unusable; probing system fonts");
            }
        }
    }

    let found = SYSTEM_FONT_CANDIDATES
        .iter()
        .map(Path::new)
        .filter(|p| p.exists())
        .find_map(|p| FontMetrics::load(p).ok());
    match &found {
        Some(metrics) => {
            tracing::debug!(font = ?metrics.source(), "Using system font");
        }
        None => tracing::warn!("No usable font found; text banners will draw without text"),
    }
    found
}

struct GlyphBitmap {
    width: usize,
    bitmap: Vec<u8>,
}

/// Rasterizes laid-out text into RGBA frames.
pub struct TextPainter {
    metrics: FontMetrics,
    glyph_cache: HashMap<GlyphRasterConfig, GlyphBitmap>,
}

impl TextPainter {
    pub fn new(metrics: FontMetrics) -> Self {
        Self {
            metrics,
            glyph_cache: HashMap::new(),
        }
    }

    pub fn metrics(&self) -> &FontMetrics {
        &self.metrics
    }

    /// Draw `text` with its layout box's top-left at `origin`, clipped to
    /// `clip`.
    #[allow(clippy::too_many_arguments)]
    pub fn draw(
        &mut self,
        frame: &mut RgbaImage,
        text: &str,
        font_size: f32,
        color: [u8; 4],
        origin: (f32, f32),
        wrap_width: Option<f32>,
        clip: PixelRect,
    ) {
        if color[3] == 0 || clip.is_empty() {
            return;
        }
        if self.glyph_cache.len() > GLYPH_CACHE_LIMIT {
            self.glyph_cache.clear();
        }

        let layout = self.metrics.layout(text, font_size, wrap_width, origin);
        for glyph in layout.glyphs() {
            if glyph.width == 0 || glyph.height == 0 {
                continue;
            }
            let font = &self.metrics.font;
            let cached = self.glyph_cache.entry(glyph.key).or_insert_with(|| {
                let (metrics, bitmap) = font.rasterize_config(glyph.key);
                GlyphBitmap {
                    width: metrics.width,
                    bitmap,
                }
            });
            blend_mask(
                frame,
                &cached.bitmap,
                cached.width,
                (glyph.x.round() as i32, glyph.y.round() as i32),
                color,
                Some(clip),
            );
        }
    }
}
