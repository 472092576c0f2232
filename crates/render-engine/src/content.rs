//! Decoded overlay content addressed by [`ContentHandle`].
//!
//! Logo and video-clip layers reference their pixels through handles into
//! this store. Undecodable input still gets a handle, in the `Failed` state,
//! so a bad upload shows up as a failed layer instead of an error at add
//! time. Handles must be released when their layer goes away or its
//! content is replaced.

use std::collections::HashMap;
use std::io::Cursor;
use std::path::Path;
use std::time::Duration;

use image::codecs::gif::GifDecoder;
use image::imageops::{self, FilterType};
use image::{AnimationDecoder, ImageFormat, RgbaImage};
use serde::Serialize;

use weever_common::error::{WeeverError, WeeverResult};
use weever_layer_model::{ContentHandle, Rect};

use crate::draw::{resample_region, PixelRect};

/// Shortest frame delay honoured for animated input.
const MIN_FRAME_DELAY: Duration = Duration::from_millis(20);

/// A sequence of frames that advances with time.
pub trait FrameSource: Send {
    /// Current frame.
    fn current(&self) -> &RgbaImage;

    /// Move playback forward by `elapsed`.
    fn advance(&mut self, elapsed: Duration);

    /// Back to the first frame.
    fn rewind(&mut self);
}

/// In-memory frames with per-frame delays, looping.
#[derive(Debug, Clone)]
pub struct FrameSequence {
    frames: Vec<(RgbaImage, Duration)>,
    index: usize,
    into_frame: Duration,
}

impl FrameSequence {
    pub fn new(frames: Vec<(RgbaImage, Duration)>) -> WeeverResult<Self> {
        if frames.is_empty() {
            return Err(WeeverError::content("Frame sequence has no frames"));
        }
        Ok(Self {
            frames: frames
                .into_iter()
                .map(|(frame, delay)| (frame, delay.max(MIN_FRAME_DELAY)))
                .collect(),
            index: 0,
            into_frame: Duration::ZERO,
        })
    }

    /// A single frame shown forever.
    pub fn still(frame: RgbaImage) -> Self {
        Self {
            frames: vec![(frame, Duration::MAX)],
            index: 0,
            into_frame: Duration::ZERO,
        }
    }

    /// Decode an animated GIF.
    pub fn decode_gif(bytes: &[u8]) -> WeeverResult<Self> {
        let decoder = GifDecoder::new(Cursor::new(bytes))
            .map_err(|e| WeeverError::content(format!("Invalid GIF: {e}")))?;
        let frames = decoder
            .into_frames()
            .collect_frames()
            .map_err(|e| WeeverError::content(format!("Failed to decode GIF frames: {e}")))?;
        Self::new(
            frames
                .into_iter()
                .map(|frame| {
                    let (num, den) = frame.delay().numer_denom_ms();
                    let ms = if den == 0 { 0 } else { num / den };
                    (frame.into_buffer(), Duration::from_millis(u64::from(ms)))
                })
                .collect(),
        )
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn index(&self) -> usize {
        self.index
    }
}

impl FrameSource for FrameSequence {
    fn current(&self) -> &RgbaImage {
        &self.frames[self.index].0
    }

    fn advance(&mut self, elapsed: Duration) {
        if self.frames.len() < 2 {
            return;
        }
        self.into_frame += elapsed;
        while self.into_frame >= self.frames[self.index].1 {
            self.into_frame -= self.frames[self.index].1;
            self.index = (self.index + 1) % self.frames.len();
        }
    }

    fn rewind(&mut self) {
        self.index = 0;
        self.into_frame = Duration::ZERO;
    }
}

/// Load state of one piece of content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum ContentState {
    Ready { width: u32, height: u32 },
    Failed { reason: String },
}

enum Content {
    Image(RgbaImage),
    Clip(Box<dyn FrameSource>),
    Failed(String),
}

/// What a cached rendition was produced for.
#[derive(Debug, Clone, Copy, PartialEq)]
enum Rendition {
    Whole(u32, u32),
    Window(Rect, PixelRect),
}

struct Entry {
    content: Content,
    /// Last scaled rendition, reused for still images.
    scaled: Option<(Rendition, RgbaImage)>,
}

impl Entry {
    fn new(content: Content) -> Self {
        Self {
            content,
            scaled: None,
        }
    }

    fn source(&self) -> WeeverResult<&RgbaImage> {
        match &self.content {
            Content::Image(image) => Ok(image),
            Content::Clip(clip) => Ok(clip.current()),
            Content::Failed(reason) => Err(WeeverError::content(reason.clone())),
        }
    }

    fn is_clip(&self) -> bool {
        matches!(self.content, Content::Clip(_))
    }

    /// Cached rendition for `key`, rebuilt when the key changes or the
    /// content is a clip.
    fn rendition(
        &mut self,
        key: Rendition,
        render: impl FnOnce(&RgbaImage) -> RgbaImage,
    ) -> WeeverResult<&RgbaImage> {
        let cached = self.scaled.as_ref().map(|(cached, _)| *cached);
        if self.is_clip() || cached != Some(key) {
            let image = render(self.source()?);
            self.scaled = Some((key, image));
        }
        match &self.scaled {
            Some((_, image)) => Ok(image),
            None => Err(WeeverError::content("No scaled frame")),
        }
    }
}

/// Arena of decoded content.
#[derive(Default)]
pub struct ContentStore {
    entries: HashMap<ContentHandle, Entry>,
    next_handle: u64,
}

impl ContentStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn insert(&mut self, content: Content) -> ContentHandle {
        self.next_handle += 1;
        let handle = ContentHandle(self.next_handle);
        if let Content::Failed(reason) = &content {
            tracing::warn!(%handle, %reason, "Overlay content failed to load");
        }
        self.entries.insert(handle, Entry::new(content));
        handle
    }

    /// Store an already decoded image.
    pub fn insert_image(&mut self, image: RgbaImage) -> ContentHandle {
        self.insert(Content::Image(image))
    }

    /// Store any frame source as video content.
    pub fn insert_frame_source(&mut self, source: Box<dyn FrameSource>) -> ContentHandle {
        self.insert(Content::Clip(source))
    }

    /// Decode image bytes (PNG, JPEG, GIF, WebP).
    pub fn ingest_image(&mut self, bytes: &[u8]) -> ContentHandle {
        let content = match image::load_from_memory(bytes) {
            Ok(decoded) => Content::Image(decoded.to_rgba8()),
            Err(e) => Content::Failed(format!("Undecodable image: {e}")),
        };
        self.insert(content)
    }

    /// Decode video bytes. Animated GIFs play their frames; any other
    /// decodable image becomes a one-frame clip.
    pub fn ingest_video(&mut self, bytes: &[u8]) -> ContentHandle {
        let decoded = match image::guess_format(bytes) {
            Ok(ImageFormat::Gif) => FrameSequence::decode_gif(bytes),
            _ => image::load_from_memory(bytes)
                .map(|img| FrameSequence::still(img.to_rgba8()))
                .map_err(|e| WeeverError::content(format!("Undecodable video: {e}"))),
        };
        let content = match decoded {
            Ok(sequence) => Content::Clip(Box::new(sequence)),
            Err(e) => Content::Failed(e.to_string()),
        };
        self.insert(content)
    }

    /// Read and decode an image file.
    pub fn ingest_image_file(&mut self, path: &Path) -> WeeverResult<ContentHandle> {
        Ok(self.ingest_image(&read_content_file(path)?))
    }

    /// Read and decode a video file.
    pub fn ingest_video_file(&mut self, path: &Path) -> WeeverResult<ContentHandle> {
        Ok(self.ingest_video(&read_content_file(path)?))
    }

    pub fn state(&self, handle: ContentHandle) -> Option<ContentState> {
        let entry = self.entries.get(&handle)?;
        Some(match entry.source() {
            Ok(image) => ContentState::Ready {
                width: image.width(),
                height: image.height(),
            },
            Err(e) => ContentState::Failed {
                reason: e.to_string(),
            },
        })
    }

    /// Native size of ready content.
    pub fn dimensions(&self, handle: ContentHandle) -> Option<(u32, u32)> {
        match self.state(handle)? {
            ContentState::Ready { width, height } => Some((width, height)),
            ContentState::Failed { .. } => None,
        }
    }

    /// Drop the content behind `handle`. Returns `false` if it was unknown.
    pub fn release(&mut self, handle: ContentHandle) -> bool {
        let released = self.entries.remove(&handle).is_some();
        if released {
            tracing::debug!(%handle, "Released overlay content");
        }
        released
    }

    pub fn contains(&self, handle: ContentHandle) -> bool {
        self.entries.contains_key(&handle)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Advance a clip's playback. No-op for stills and unknown handles.
    pub fn advance(&mut self, handle: ContentHandle, elapsed: Duration) {
        if let Some(Entry {
            content: Content::Clip(clip),
            ..
        }) = self.entries.get_mut(&handle)
        {
            clip.advance(elapsed);
        }
    }

    pub fn rewind(&mut self, handle: ContentHandle) {
        if let Some(Entry {
            content: Content::Clip(clip),
            ..
        }) = self.entries.get_mut(&handle)
        {
            clip.rewind();
        }
    }

    /// Current frame of `handle` resized to `width`×`height`.
    pub fn frame_at(
        &mut self,
        handle: ContentHandle,
        width: u32,
        height: u32,
    ) -> WeeverResult<&RgbaImage> {
        let entry = self.entry_mut(handle)?;
        if entry.source()?.dimensions() == (width, height) {
            return entry.source();
        }
        entry.rendition(Rendition::Whole(width, height), |source| {
            imageops::resize(source, width, height, FilterType::Triangle)
        })
    }

    /// Current frame of `handle` stretched over `placement` and cut to the
    /// `window` of it that lands on the surface. The result is never larger
    /// than `window`, so off-surface or oversized placements cost only what
    /// is visible.
    pub fn visible_frame(
        &mut self,
        handle: ContentHandle,
        placement: &Rect,
        window: PixelRect,
    ) -> WeeverResult<&RgbaImage> {
        if PixelRect::from_rect(placement) == window {
            return self.frame_at(handle, window.width, window.height);
        }
        self.entry_mut(handle)?
            .rendition(Rendition::Window(*placement, window), |source| {
                resample_region(source, placement, window)
            })
    }

    fn entry_mut(&mut self, handle: ContentHandle) -> WeeverResult<&mut Entry> {
        self.entries
            .get_mut(&handle)
            .ok_or_else(|| WeeverError::content(format!("{handle} is not loaded")))
    }
}

fn read_content_file(path: &Path) -> WeeverResult<Vec<u8>> {
    if !path.exists() {
        return Err(WeeverError::FileNotFound {
            path: path.to_path_buf(),
        });
    }
    Ok(std::fs::read(path)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    fn png_bytes(width: u32, height: u32, color: [u8; 4]) -> Vec<u8> {
        let img = RgbaImage::from_pixel(width, height, Rgba(color));
        let mut out = Cursor::new(Vec::new());
        img.write_to(&mut out, ImageFormat::Png).unwrap();
        out.into_inner()
    }

    #[test]
    fn png_ingests_as_ready() {
        let mut store = ContentStore::new();
        let handle = store.ingest_image(&png_bytes(8, 4, [255, 0, 0, 255]));
        assert_eq!(
            store.state(handle),
            Some(ContentState::Ready {
                width: 8,
                height: 4
            })
        );
    }

    #[test]
    fn garbage_ingests_as_failed() {
        let mut store = ContentStore::new();
        let handle = store.ingest_image(b"definitely not an image");
        assert!(matches!(store.state(handle), Some(ContentState::Failed { .. })));
        assert!(store.frame_at(handle, 10, 10).is_err());
    }

    #[test]
    fn release_forgets_content() {
        let mut store = ContentStore::new();
        let handle = store.ingest_image(&png_bytes(2, 2, [0, 0, 0, 255]));
        assert!(store.release(handle));
        assert!(!store.release(handle));
        assert!(store.state(handle).is_none());
        assert!(store.is_empty());
    }

    #[test]
    fn oversized_placement_renders_only_the_visible_window() {
        let mut store = ContentStore::new();
        let handle = store.ingest_image(&png_bytes(8, 8, [255, 0, 0, 255]));

        let placement = Rect::new(0.0, 0.0, 40000.0, 40000.0);
        let window = PixelRect::new(0, 0, 1920, 1080);
        let frame = store.visible_frame(handle, &placement, window).unwrap();
        assert_eq!(frame.dimensions(), (1920, 1080));
        assert_eq!(frame.get_pixel(1919, 1079).0, [255, 0, 0, 255]);

        // Fully visible placements use the whole-image rendition.
        let inside = Rect::new(10.0, 10.0, 16.0, 16.0);
        let frame = store
            .visible_frame(handle, &inside, PixelRect::new(10, 10, 16, 16))
            .unwrap();
        assert_eq!(frame.dimensions(), (16, 16));
    }

    #[test]
    fn frame_at_scales_and_caches() {
        let mut store = ContentStore::new();
        let handle = store.ingest_image(&png_bytes(10, 10, [0, 255, 0, 255]));
        assert_eq!(store.frame_at(handle, 10, 10).unwrap().dimensions(), (10, 10));
        assert_eq!(store.frame_at(handle, 40, 20).unwrap().dimensions(), (40, 20));
        assert_eq!(store.frame_at(handle, 40, 20).unwrap().get_pixel(39, 19).0, [0, 255, 0, 255]);
    }

    #[test]
    fn sequence_advances_by_delay_and_loops() {
        let frames = (0..3)
            .map(|i| {
                (
                    RgbaImage::from_pixel(1, 1, Rgba([i, 0, 0, 255])),
                    Duration::from_millis(100),
                )
            })
            .collect();
        let mut seq = FrameSequence::new(frames).unwrap();
        seq.advance(Duration::from_millis(99));
        assert_eq!(seq.index(), 0);
        seq.advance(Duration::from_millis(1));
        assert_eq!(seq.index(), 1);
        seq.advance(Duration::from_millis(250));
        assert_eq!(seq.index(), 0);
        seq.rewind();
        assert_eq!(seq.current().get_pixel(0, 0).0[0], 0);
    }

    #[test]
    fn still_video_never_advances() {
        let mut store = ContentStore::new();
        let handle = store.ingest_video(&png_bytes(3, 3, [1, 1, 1, 255]));
        store.advance(handle, Duration::from_secs(3600));
        assert_eq!(store.dimensions(handle), Some((3, 3)));
    }

    #[test]
    fn empty_sequence_is_rejected() {
        assert!(FrameSequence::new(Vec::new()).is_err());
    }

    #[test]
    fn missing_file_is_reported() {
        let mut store = ContentStore::new();
        let err = store
            .ingest_image_file(Path::new("/nonexistent/logo.png"))
            .unwrap_err();
        assert!(matches!(err, WeeverError::FileNotFound { .. }));
    }
}
