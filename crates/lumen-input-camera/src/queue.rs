use std::collections::VecDeque;

use crate::frame::DecodedFrame;

/// Bounded FIFO of decoded frames with drop-oldest backpressure.
///
/// Bounded both by frame count and by total pixel bytes. Pushing never blocks: the oldest
/// frames are evicted (and released) until the new one fits. A single frame larger than the
/// byte budget is still accepted, alone.
#[derive(Debug)]
pub struct FrameQueue {
    frames: VecDeque<DecodedFrame>,
    max_frames: usize,
    max_bytes: usize,
    bytes: usize,
    evicted: u64,
}

impl FrameQueue {
    pub fn new(max_frames: usize, max_bytes: usize) -> Self {
        Self {
            frames: VecDeque::with_capacity(max_frames.min(64)),
            max_frames: max_frames.max(1),
            max_bytes: max_bytes.max(1),
            bytes: 0,
            evicted: 0,
        }
    }

    /// Append `frame`, evicting from the front as needed. Returns how many were evicted.
    pub fn push(&mut self, frame: DecodedFrame) -> usize {
        let mut n = 0;
        while let Some(front) = self.frames.front() {
            let over_count = self.frames.len() >= self.max_frames;
            let over_bytes = self.bytes + frame.byte_len() > self.max_bytes;
            if !over_count && !over_bytes {
                break;
            }
            self.bytes -= front.byte_len();
            self.frames.pop_front();
            n += 1;
        }
        self.evicted += n as u64;
        self.bytes += frame.byte_len();
        self.frames.push_back(frame);
        n
    }

    /// Oldest queued frame, if any.
    pub fn pop(&mut self) -> Option<DecodedFrame> {
        let f = self.frames.pop_front()?;
        self.bytes -= f.byte_len();
        Some(f)
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// Pixel bytes currently held.
    pub fn bytes(&self) -> usize {
        self.bytes
    }

    /// Frames dropped by backpressure since creation.
    pub fn evicted(&self) -> u64 {
        self.evicted
    }

    pub fn capacity(&self) -> usize {
        self.max_frames
    }

    /// Release every queued frame.
    pub fn clear(&mut self) {
        self.frames.clear();
        self.bytes = 0;
    }
}
