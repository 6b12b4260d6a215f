//! Capture worker: track -> (codec round trip) -> frame queue.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread;
use std::time::Duration;

use crate::codec::FrameCodec;
use crate::device::{TrackPoll, VideoTrack};
use crate::queue::FrameQueue;

pub(crate) type SharedQueue = Arc<Mutex<FrameQueue>>;

pub(crate) fn lock_queue(queue: &SharedQueue) -> std::sync::MutexGuard<'_, FrameQueue> {
    queue.lock().unwrap_or_else(PoisonError::into_inner)
}

#[derive(Debug, Default)]
struct StatusInner {
    available: AtomicBool,
    ingested: AtomicU64,
    filtered: AtomicU64,
    codec_errors: AtomicU64,
}

/// Availability flag and counters shared between the worker and its owner.
#[derive(Debug, Clone, Default)]
pub struct PipelineStatus {
    inner: Arc<StatusInner>,
}

impl PipelineStatus {
    pub fn is_available(&self) -> bool {
        self.inner.available.load(Ordering::Acquire)
    }

    pub(crate) fn set_available(&self, v: bool) {
        self.inner.available.store(v, Ordering::Release);
    }

    /// Frames that made it into the queue.
    pub fn ingested(&self) -> u64 {
        self.inner.ingested.load(Ordering::Relaxed)
    }

    /// Frames dropped at ingestion because coded and display sizes differ.
    pub fn filtered(&self) -> u64 {
        self.inner.filtered.load(Ordering::Relaxed)
    }

    pub fn codec_errors(&self) -> u64 {
        self.inner.codec_errors.load(Ordering::Relaxed)
    }
}

/// Background thread pulling frames from a track until stopped, ended, or a codec error.
#[derive(Debug)]
pub(crate) struct CaptureWorker {
    stop: Arc<AtomicBool>,
    worker: Option<thread::JoinHandle<()>>,
}

impl CaptureWorker {
    pub(crate) fn spawn(
        track: Box<dyn VideoTrack>,
        codec: Option<Box<dyn FrameCodec>>,
        queue: SharedQueue,
        status: PipelineStatus,
        idle: Duration,
    ) -> Self {
        let stop = Arc::new(AtomicBool::new(false));
        let stop_for_thread = Arc::clone(&stop);
        let worker = thread::spawn(move || {
            capture_loop(track, codec, queue, status, stop_for_thread, idle);
        });
        Self {
            stop,
            worker: Some(worker),
        }
    }

    pub(crate) fn stop(&mut self) {
        self.stop.store(true, Ordering::SeqCst);
        if let Some(handle) = self.worker.take() {
            if handle.join().is_err() {
                tracing::warn!("camera capture worker panicked");
            }
        }
    }
}

impl Drop for CaptureWorker {
    fn drop(&mut self) {
        self.stop();
    }
}

fn capture_loop(
    mut track: Box<dyn VideoTrack>,
    mut codec: Option<Box<dyn FrameCodec>>,
    queue: SharedQueue,
    status: PipelineStatus,
    stop: Arc<AtomicBool>,
    idle: Duration,
) {
    while !stop.load(Ordering::SeqCst) {
        let frame = match track.poll_frame() {
            TrackPoll::Frame(f) => f,
            TrackPoll::Pending => {
                thread::sleep(idle);
                continue;
            }
            TrackPoll::Ended => {
                tracing::info!("camera track ended");
                status.set_available(false);
                break;
            }
        };

        if !frame.has_matching_dims() {
            status.inner.filtered.fetch_add(1, Ordering::Relaxed);
            tracing::trace!(
                display = ?frame.display_size(),
                coded = ?frame.coded_size(),
                "dropping padded frame"
            );
            continue;
        }

        let frame = match codec.as_mut() {
            None => frame,
            Some(c) => match c.round_trip(&frame) {
                Ok(decoded) => decoded,
                Err(e) => {
                    status.inner.codec_errors.fetch_add(1, Ordering::Relaxed);
                    status.set_available(false);
                    tracing::warn!(codec = c.name(), error = %e, "codec failed; camera pipeline unavailable");
                    break;
                }
            },
        };

        status.inner.ingested.fetch_add(1, Ordering::Relaxed);
        let evicted = lock_queue(&queue).push(frame);
        if evicted > 0 {
            tracing::trace!(evicted, "frame queue full; dropped oldest");
        }
    }
    track.stop();
}
