use std::fmt;

use crate::CameraError;

type ReleaseHook = Box<dyn FnOnce() + Send>;

/// One captured or decoded video frame (RGBA8, tightly packed at display size).
///
/// Frames may hold a scarce native buffer; its release hook runs exactly once, when the
/// frame is dropped, evicted or converted.
pub struct DecodedFrame {
    display: (u32, u32),
    coded: (u32, u32),
    timestamp: u64,
    pixels: Vec<u8>,
    release: Option<ReleaseHook>,
}

impl DecodedFrame {
    pub fn new(width: u32, height: u32, timestamp: u64, pixels: Vec<u8>) -> Result<Self, CameraError> {
        let expected = width as usize * height as usize * 4;
        if width == 0 || height == 0 || pixels.len() != expected {
            return Err(CameraError::InvalidFrame(format!(
                "{width}x{height} frame carries {} bytes, expected {expected}",
                pixels.len()
            )));
        }
        Ok(Self {
            display: (width, height),
            coded: (width, height),
            timestamp,
            pixels,
            release: None,
        })
    }

    /// Declare a coded (buffer) size different from the display size.
    pub fn with_coded_size(mut self, width: u32, height: u32) -> Self {
        self.coded = (width, height);
        self
    }

    /// Run `hook` when this frame is released.
    pub fn on_release(mut self, hook: impl FnOnce() + Send + 'static) -> Self {
        self.release = Some(Box::new(hook));
        self
    }

    pub fn display_size(&self) -> (u32, u32) {
        self.display
    }

    pub fn coded_size(&self) -> (u32, u32) {
        self.coded
    }

    /// Only frames whose coded and display sizes agree enter the pipeline.
    pub fn has_matching_dims(&self) -> bool {
        self.coded == self.display
    }

    pub fn timestamp(&self) -> u64 {
        self.timestamp
    }

    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    pub fn byte_len(&self) -> usize {
        self.pixels.len()
    }

    /// Take the pixel buffer and release the frame.
    pub fn into_rgba(mut self) -> (u32, u32, Vec<u8>) {
        let pixels = std::mem::take(&mut self.pixels);
        let (w, h) = self.display;
        (w, h, pixels)
    }

    /// Release now instead of at drop.
    pub fn close(self) {}
}

impl Drop for DecodedFrame {
    fn drop(&mut self) {
        if let Some(hook) = self.release.take() {
            hook();
        }
    }
}

impl fmt::Debug for DecodedFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DecodedFrame")
            .field("display", &self.display)
            .field("coded", &self.coded)
            .field("timestamp", &self.timestamp)
            .field("bytes", &self.pixels.len())
            .field("release", &self.release.is_some())
            .finish()
    }
}
