//! Encode/decode stage between the capture track and the frame queue.

use crate::frame::DecodedFrame;
use crate::CameraError;

/// One encoded access unit.
#[derive(Debug, Clone, PartialEq)]
pub struct EncodedChunk {
    pub width: u32,
    pub height: u32,
    pub timestamp: u64,
    pub key_frame: bool,
    pub data: Vec<u8>,
}

/// A video codec pair driven synchronously by the capture worker.
pub trait FrameCodec: Send {
    fn name(&self) -> &str;
    fn encode(&mut self, frame: &DecodedFrame) -> Result<EncodedChunk, CameraError>;
    fn decode(&mut self, chunk: EncodedChunk) -> Result<DecodedFrame, CameraError>;

    /// Encode then decode; the decoded frame carries no release hook of its own.
    fn round_trip(&mut self, frame: &DecodedFrame) -> Result<DecodedFrame, CameraError> {
        let chunk = self.encode(frame)?;
        self.decode(chunk)
    }
}

/// Uncompressed RGBA passthrough. Every `key_interval`-th chunk is flagged as a key frame.
#[derive(Debug, Clone)]
pub struct RawCodec {
    key_interval: u64,
    encoded: u64,
}

impl RawCodec {
    pub fn new(key_interval: u64) -> Self {
        Self {
            key_interval: key_interval.max(1),
            encoded: 0,
        }
    }
}

impl Default for RawCodec {
    fn default() -> Self {
        Self::new(30)
    }
}

impl FrameCodec for RawCodec {
    fn name(&self) -> &str {
        "raw-rgba"
    }

    fn encode(&mut self, frame: &DecodedFrame) -> Result<EncodedChunk, CameraError> {
        let (width, height) = frame.display_size();
        let key_frame = self.encoded % self.key_interval == 0;
        self.encoded += 1;
        Ok(EncodedChunk {
            width,
            height,
            timestamp: frame.timestamp(),
            key_frame,
            data: frame.pixels().to_vec(),
        })
    }

    fn decode(&mut self, chunk: EncodedChunk) -> Result<DecodedFrame, CameraError> {
        DecodedFrame::new(chunk.width, chunk.height, chunk.timestamp, chunk.data)
            .map_err(|e| CameraError::Codec(format!("{}: {e}", self.name())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn raw_round_trip_keeps_pixels_and_timestamp() {
        let mut c = RawCodec::new(2);
        let src = DecodedFrame::new(2, 1, 42, vec![1, 2, 3, 4, 5, 6, 7, 8]).unwrap();
        let out = c.round_trip(&src).unwrap();
        assert_eq!(out.pixels(), src.pixels());
        assert_eq!(out.timestamp(), 42);
        assert_eq!(out.display_size(), (2, 1));
    }

    #[test]
    fn key_frames_follow_interval() {
        let mut c = RawCodec::new(2);
        let f = DecodedFrame::new(1, 1, 0, vec![0; 4]).unwrap();
        let keys: Vec<bool> = (0..4).map(|_| c.encode(&f).unwrap().key_frame).collect();
        assert_eq!(keys, vec![true, false, true, false]);
    }

    #[test]
    fn truncated_chunk_is_a_codec_error() {
        let mut c = RawCodec::default();
        let chunk = EncodedChunk {
            width: 4,
            height: 4,
            timestamp: 0,
            key_frame: true,
            data: vec![0; 3],
        };
        assert!(matches!(c.decode(chunk), Err(CameraError::Codec(_))));
    }
}
