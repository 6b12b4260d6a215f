use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::EngineError;

static NEXT_SOURCE_ID: AtomicU64 = AtomicU64::new(1);

/// A CPU-side RGBA8 image handed to the compositor (static file, camera bitmap, ...).
///
/// Clones share pixels and identity; a new `ImageSource` always gets a fresh `id`, which is
/// what texture upload uses to tell "same source again" from "new source".
#[derive(Clone)]
pub struct ImageSource {
    id: u64,
    width: u32,
    height: u32,
    pixels: Arc<[u8]>,
}

impl ImageSource {
    pub fn from_rgba(width: u32, height: u32, pixels: Vec<u8>) -> Result<Self, EngineError> {
        let expected = width as usize * height as usize * 4;
        if width == 0 || height == 0 {
            return Err(EngineError::other("image dimensions must be > 0"));
        }
        if pixels.len() != expected {
            return Err(EngineError::other(format!(
                "rgba buffer is {} bytes, expected {expected} for {width}x{height}",
                pixels.len()
            )));
        }
        Ok(Self {
            id: NEXT_SOURCE_ID.fetch_add(1, Ordering::Relaxed),
            width,
            height,
            pixels: pixels.into(),
        })
    }

    /// Single-color image.
    pub fn solid(width: u32, height: u32, rgba: [u8; 4]) -> Self {
        let w = width.max(1);
        let h = height.max(1);
        let pixels: Vec<u8> = rgba
            .iter()
            .copied()
            .cycle()
            .take(w as usize * h as usize * 4)
            .collect();
        Self {
            id: NEXT_SOURCE_ID.fetch_add(1, Ordering::Relaxed),
            width: w,
            height: h,
            pixels: pixels.into(),
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    pub fn byte_len(&self) -> usize {
        self.pixels.len()
    }
}

impl fmt::Debug for ImageSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ImageSource")
            .field("id", &self.id)
            .field("width", &self.width)
            .field("height", &self.height)
            .field("pixels", &format_args!("<{} bytes>", self.pixels.len()))
            .finish()
    }
}
