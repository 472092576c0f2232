//! Overlay layer types.
//!
//! A layer is one positioned, sized overlay composited on top of the
//! capture source. The set of kinds is closed; each kind carries only the
//! fields it needs and the compositor dispatches on [`LayerKind`].

use std::fmt;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::color::Color;
use crate::geometry::{Position, Rect, Size};

/// Stable, unique layer identifier. Never reused within a model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LayerId(pub u64);

impl fmt::Display for LayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "layer-{}", self.0)
    }
}

/// Opaque reference to decoded image or video content owned by the
/// render engine's content store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContentHandle(pub u64);

impl fmt::Display for ContentHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "content-{}", self.0)
    }
}

/// Marquee direction of a text banner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ScrollDirection {
    #[default]
    None,
    Horizontal,
    Vertical,
}

impl ScrollDirection {
    pub fn is_scrolling(self) -> bool {
        self != ScrollDirection::None
    }
}

/// Animator state carried by a text banner.
///
/// Lives inside the layer so that removing the layer also removes its
/// animator.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ScrollState {
    /// Signed offset along the scroll axis, in displayed pixels.
    pub offset: f64,
    /// Number of times the marquee has wrapped around.
    pub wraps: u64,
}

/// Sandbox restrictions applied to an embedded page's isolated surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SandboxPolicy {
    pub allow_scripts: bool,
    pub allow_same_origin: bool,
    pub allow_forms: bool,
    pub allow_popups: bool,
}

impl Default for SandboxPolicy {
    fn default() -> Self {
        Self {
            allow_scripts: true,
            allow_same_origin: false,
            allow_forms: false,
            allow_popups: false,
        }
    }
}

impl SandboxPolicy {
    /// Space-separated token list in the form browsers expect for a
    /// `sandbox` attribute.
    pub fn to_attribute(&self) -> String {
        [
            (self.allow_scripts, "allow-scripts"),
            (self.allow_same_origin, "allow-same-origin"),
            (self.allow_forms, "allow-forms"),
            (self.allow_popups, "allow-popups"),
        ]
        .iter()
        .filter(|(enabled, _)| *enabled)
        .map(|(_, token)| *token)
        .collect::<Vec<_>>()
        .join(" ")
    }
}

/// Text banner fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextBanner {
    pub content: String,
    pub scroll_direction: ScrollDirection,
    /// Pixels advanced per animator tick. Always at least 1.
    pub speed: u32,
    pub font_size: f32,
    pub color: Color,
    pub background: Color,
    #[serde(default)]
    pub scroll: ScrollState,
}

impl TextBanner {
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            scroll_direction: ScrollDirection::None,
            speed: 5,
            font_size: 24.0,
            color: Color::WHITE,
            background: Color::rgba(0, 0, 0, 179),
            scroll: ScrollState::default(),
        }
    }

    pub fn with_scroll(mut self, direction: ScrollDirection, speed: u32) -> Self {
        self.scroll_direction = direction;
        self.speed = speed.max(1);
        self
    }
}

/// Variant-specific layer payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum LayerKind {
    Logo {
        content: ContentHandle,
        /// 0–100.
        opacity: u8,
    },
    TextBanner(TextBanner),
    VideoClip {
        content: ContentHandle,
        playing: bool,
        name: String,
    },
    EmbeddedPage {
        url: Url,
        sandbox: SandboxPolicy,
    },
}

impl LayerKind {
    pub fn name(&self) -> &'static str {
        match self {
            LayerKind::Logo { .. } => "logo",
            LayerKind::TextBanner(_) => "text_banner",
            LayerKind::VideoClip { .. } => "video_clip",
            LayerKind::EmbeddedPage { .. } => "embedded_page",
        }
    }

    /// Content handle backing this layer, if it owns one.
    pub fn content_handle(&self) -> Option<ContentHandle> {
        match self {
            LayerKind::Logo { content, .. } | LayerKind::VideoClip { content, .. } => {
                Some(*content)
            }
            _ => None,
        }
    }
}

/// Initial geometry for a new layer.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct LayerPlacement {
    pub position: Position,
    pub size: Size,
}

impl LayerPlacement {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            position: Position::new(x, y),
            size: Size::new(width, height),
        }
    }
}

/// One overlay in the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OverlayLayer {
    pub id: LayerId,
    pub position: Position,
    pub size: Size,
    /// Creation order; higher draws on top.
    pub z_order: u64,
    pub kind: LayerKind,
}

impl OverlayLayer {
    /// Current bounding box in displayed coordinates.
    pub fn rect(&self) -> Rect {
        Rect::from_parts(self.position, self.size)
    }

    pub fn text_banner(&self) -> Option<&TextBanner> {
        match &self.kind {
            LayerKind::TextBanner(banner) => Some(banner),
            _ => None,
        }
    }
}

/// Partial update for a layer. `None` fields are left untouched; fields that
/// do not apply to the layer's kind are ignored.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct LayerPatch {
    pub position: Option<Position>,
    pub size: Option<Size>,
    pub opacity: Option<u8>,
    pub content: Option<ContentHandle>,
    pub text: Option<String>,
    pub scroll_direction: Option<ScrollDirection>,
    pub speed: Option<u32>,
    pub font_size: Option<f32>,
    pub color: Option<Color>,
    pub background: Option<Color>,
    pub playing: Option<bool>,
    pub url: Option<Url>,
    pub sandbox: Option<SandboxPolicy>,
}

impl LayerPatch {
    pub fn position(position: Position) -> Self {
        Self {
            position: Some(position),
            ..Self::default()
        }
    }

    pub fn size(size: Size) -> Self {
        Self {
            size: Some(size),
            ..Self::default()
        }
    }

    pub fn content(content: ContentHandle) -> Self {
        Self {
            content: Some(content),
            ..Self::default()
        }
    }

    pub fn playing(playing: bool) -> Self {
        Self {
            playing: Some(playing),
            ..Self::default()
        }
    }

    /// Merge into `layer`, returning the content handle this patch replaced.
    pub(crate) fn apply(self, layer: &mut OverlayLayer) -> Option<ContentHandle> {
        if let Some(position) = self.position {
            layer.position = Position::new(position.x.max(0.0), position.y.max(0.0));
        }
        if let Some(size) = self.size {
            layer.size = Size::new(size.width.max(0.0), size.height.max(0.0));
        }

        let mut replaced = None;
        match &mut layer.kind {
            LayerKind::Logo { content, opacity } => {
                if let Some(value) = self.opacity {
                    *opacity = value.min(100);
                }
                replaced = swap_content(content, self.content);
            }
            LayerKind::VideoClip {
                content, playing, ..
            } => {
                if let Some(value) = self.playing {
                    *playing = value;
                }
                replaced = swap_content(content, self.content);
            }
            LayerKind::TextBanner(banner) => {
                let mut reset_scroll = false;
                if let Some(text) = self.text {
                    banner.content = text;
                }
                if let Some(direction) = self.scroll_direction {
                    reset_scroll |= direction != banner.scroll_direction;
                    banner.scroll_direction = direction;
                }
                if let Some(speed) = self.speed {
                    let speed = speed.max(1);
                    reset_scroll |= speed != banner.speed;
                    banner.speed = speed;
                }
                if let Some(font_size) = self.font_size {
                    banner.font_size = font_size.max(1.0);
                }
                if let Some(color) = self.color {
                    banner.color = color;
                }
                if let Some(background) = self.background {
                    banner.background = background;
                }
                if reset_scroll {
                    banner.scroll = ScrollState::default();
                }
            }
            LayerKind::EmbeddedPage { url, sandbox } => {
                if let Some(value) = self.url {
                    *url = value;
                }
                if let Some(value) = self.sandbox {
                    *sandbox = value;
                }
            }
        }
        replaced
    }
}

fn swap_content(slot: &mut ContentHandle, next: Option<ContentHandle>) -> Option<ContentHandle> {
    match next {
        Some(next) if next != *slot => Some(std::mem::replace(slot, next)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn banner_layer() -> OverlayLayer {
        OverlayLayer {
            id: LayerId(1),
            position: Position::new(10.0, 10.0),
            size: Size::new(600.0, 48.0),
            z_order: 0,
            kind: LayerKind::TextBanner(
                TextBanner::new("LIVE").with_scroll(ScrollDirection::Horizontal, 5),
            ),
        }
    }

    #[test]
    fn sandbox_attribute_lists_enabled_tokens() {
        assert_eq!(SandboxPolicy::default().to_attribute(), "allow-scripts");
        let open = SandboxPolicy {
            allow_same_origin: true,
            ..SandboxPolicy::default()
        };
        assert_eq!(open.to_attribute(), "allow-scripts allow-same-origin");
    }

    #[test]
    fn patch_preserves_untouched_fields() {
        let mut layer = banner_layer();
        let patch = LayerPatch {
            color: Some(Color::rgb(255, 0, 0)),
            ..LayerPatch::default()
        };
        patch.apply(&mut layer);
        let banner = layer.text_banner().unwrap();
        assert_eq!(banner.content, "LIVE");
        assert_eq!(banner.color, Color::rgb(255, 0, 0));
        assert_eq!(layer.position, Position::new(10.0, 10.0));
    }

    #[test]
    fn changing_speed_resets_marquee() {
        let mut layer = banner_layer();
        if let LayerKind::TextBanner(banner) = &mut layer.kind {
            banner.scroll.offset = -120.0;
        }
        LayerPatch {
            speed: Some(8),
            ..LayerPatch::default()
        }
        .apply(&mut layer);
        assert_eq!(layer.text_banner().unwrap().scroll.offset, 0.0);
    }

    #[test]
    fn patch_ignores_fields_for_other_kinds() {
        let mut layer = banner_layer();
        let replaced = LayerPatch {
            opacity: Some(10),
            content: Some(ContentHandle(9)),
            ..LayerPatch::default()
        }
        .apply(&mut layer);
        assert!(replaced.is_none());
        assert!(layer.text_banner().is_some());
    }

    #[test]
    fn content_swap_reports_previous_handle() {
        let mut layer = OverlayLayer {
            id: LayerId(2),
            position: Position::default(),
            size: Size::new(100.0, 100.0),
            z_order: 1,
            kind: LayerKind::Logo {
                content: ContentHandle(3),
                opacity: 100,
            },
        };
        let replaced = LayerPatch::content(ContentHandle(4)).apply(&mut layer);
        assert_eq!(replaced, Some(ContentHandle(3)));
        assert_eq!(layer.kind.content_handle(), Some(ContentHandle(4)));

        let same = LayerPatch::content(ContentHandle(4)).apply(&mut layer);
        assert!(same.is_none());
    }

    #[test]
    fn opacity_is_capped() {
        let mut layer = OverlayLayer {
            id: LayerId(3),
            position: Position::default(),
            size: Size::new(10.0, 10.0),
            z_order: 0,
            kind: LayerKind::Logo {
                content: ContentHandle(1),
                opacity: 50,
            },
        };
        LayerPatch {
            opacity: Some(250),
            ..LayerPatch::default()
        }
        .apply(&mut layer);
        assert!(matches!(layer.kind, LayerKind::Logo { opacity: 100, .. }));
    }
}
