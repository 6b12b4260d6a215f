//! A capture device that generates frames in-process.
//!
//! Used when no real camera backend is compiled in, and by tests to script permission
//! states, open failures and padded frames.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::device::{
    MediaDevices, MediaKind, OpenError, PermissionState, StreamConstraints, TrackPoll, VideoTrack,
};
use crate::frame::DecodedFrame;

#[derive(Debug, Clone)]
pub struct SyntheticDevices {
    camera: PermissionState,
    microphone: PermissionState,
    open_error: Option<OpenError>,
    frame_limit: Option<u64>,
    padded_every: Option<u64>,
    interval: Option<Duration>,
    open_calls: Arc<AtomicUsize>,
    released: Arc<AtomicUsize>,
}

impl Default for SyntheticDevices {
    fn default() -> Self {
        Self {
            camera: PermissionState::Granted,
            microphone: PermissionState::Granted,
            open_error: None,
            frame_limit: None,
            padded_every: None,
            interval: None,
            open_calls: Arc::new(AtomicUsize::new(0)),
            released: Arc::new(AtomicUsize::new(0)),
        }
    }
}

impl SyntheticDevices {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn camera_permission(mut self, state: PermissionState) -> Self {
        self.camera = state;
        self
    }

    pub fn microphone_permission(mut self, state: PermissionState) -> Self {
        self.microphone = state;
        self
    }

    /// Make `open_stream` fail with `err`.
    pub fn fail_open(mut self, err: OpenError) -> Self {
        self.open_error = Some(err);
        self
    }

    /// End the track after `n` frames.
    pub fn frame_limit(mut self, n: u64) -> Self {
        self.frame_limit = Some(n);
        self
    }

    /// Give every `n`-th frame a coded size larger than its display size.
    pub fn padded_every(mut self, n: u64) -> Self {
        self.padded_every = Some(n.max(1));
        self
    }

    /// Frame spacing; defaults to the requested frame rate.
    pub fn interval(mut self, interval: Duration) -> Self {
        self.interval = Some(interval);
        self
    }

    /// How many times `open_stream` was called.
    pub fn open_calls(&self) -> usize {
        self.open_calls.load(Ordering::SeqCst)
    }

    /// How many generated frames have been released so far.
    pub fn released(&self) -> usize {
        self.released.load(Ordering::SeqCst)
    }
}

impl MediaDevices for SyntheticDevices {
    fn query_permission(&self, kind: MediaKind) -> PermissionState {
        match kind {
            MediaKind::Camera => self.camera,
            MediaKind::Microphone => self.microphone,
        }
    }

    fn open_stream(
        &mut self,
        constraints: &StreamConstraints,
    ) -> Result<Box<dyn VideoTrack>, OpenError> {
        self.open_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(err) = self.open_error.clone() {
            return Err(err);
        }
        let fps = constraints.video.frame_rate.max(1);
        let interval = self
            .interval
            .unwrap_or_else(|| Duration::from_secs(1) / fps);
        Ok(Box::new(SyntheticTrack {
            size: (constraints.video.width.max(1), constraints.video.height.max(1)),
            next: 0,
            limit: self.frame_limit,
            padded_every: self.padded_every,
            interval,
            last: None,
            stopped: false,
            released: Arc::clone(&self.released),
        }))
    }
}

struct SyntheticTrack {
    size: (u32, u32),
    next: u64,
    limit: Option<u64>,
    padded_every: Option<u64>,
    interval: Duration,
    last: Option<Instant>,
    stopped: bool,
    released: Arc<AtomicUsize>,
}

impl SyntheticTrack {
    fn make_frame(&self, ts: u64) -> Option<DecodedFrame> {
        let (w, h) = self.size;
        let shade = (ts % 256) as u8;
        let pixels = [shade, 255 - shade, 128, 255]
            .iter()
            .copied()
            .cycle()
            .take(w as usize * h as usize * 4)
            .collect();
        let released = Arc::clone(&self.released);
        let mut frame = DecodedFrame::new(w, h, ts, pixels).ok()?.on_release(move || {
            released.fetch_add(1, Ordering::SeqCst);
        });
        if self.padded_every.is_some_and(|n| (ts + 1) % n == 0) {
            frame = frame.with_coded_size(w.next_multiple_of(16) + 16, h.next_multiple_of(16));
        }
        Some(frame)
    }
}

impl VideoTrack for SyntheticTrack {
    fn poll_frame(&mut self) -> TrackPoll {
        if self.stopped || self.limit.is_some_and(|n| self.next >= n) {
            return TrackPoll::Ended;
        }
        if let Some(last) = self.last {
            if last.elapsed() < self.interval {
                return TrackPoll::Pending;
            }
        }
        self.last = Some(Instant::now());
        let ts = self.next;
        self.next += 1;
        match self.make_frame(ts) {
            Some(f) => TrackPoll::Frame(f),
            None => TrackPoll::Ended,
        }
    }

    fn stop(&mut self) {
        self.stopped = true;
    }
}
