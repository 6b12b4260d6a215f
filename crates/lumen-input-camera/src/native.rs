//! Real capture devices through nokhwa.
//!
//! The nokhwa camera is not `Send`, so each track owns it on a dedicated reader thread and
//! hands decoded frames over a small bounded channel.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, TryRecvError};
use std::sync::Arc;
use std::thread;

use crate::device::{
    MediaDevices, MediaKind, OpenError, PermissionState, StreamConstraints, TrackPoll, VideoTrack,
};
use crate::frame::DecodedFrame;

/// Capture devices enumerated by the OS backend.
#[derive(Debug, Clone, Copy, Default)]
pub struct NokhwaDevices {
    index: u32,
}

impl NokhwaDevices {
    pub fn new(index: u32) -> Self {
        Self { index }
    }
}

impl MediaDevices for NokhwaDevices {
    fn query_permission(&self, _kind: MediaKind) -> PermissionState {
        // The native backends ask (or fail) on open.
        PermissionState::Prompt
    }

    fn open_stream(
        &mut self,
        constraints: &StreamConstraints,
    ) -> Result<Box<dyn VideoTrack>, OpenError> {
        let index = self.index;
        let (width, height) = (constraints.video.width, constraints.video.height);
        let (opened_tx, opened_rx) = mpsc::channel::<Result<(), String>>();
        let (frame_tx, frames) = mpsc::sync_channel::<DecodedFrame>(2);
        let stop = Arc::new(AtomicBool::new(false));
        let stop_for_thread = Arc::clone(&stop);

        let reader = thread::spawn(move || {
            use nokhwa::{
                pixel_format::{RgbAFormat, RgbFormat},
                utils::{CameraIndex, RequestedFormat, RequestedFormatType, Resolution},
                Camera,
            };

            let requested =
                RequestedFormat::new::<RgbFormat>(RequestedFormatType::AbsoluteHighestFrameRate);
            let mut cam = match Camera::new(CameraIndex::Index(index), requested)
                .and_then(|mut c| c.open_stream().map(|_| c))
            {
                Ok(c) => c,
                Err(e) => {
                    let _ = opened_tx.send(Err(e.to_string()));
                    return;
                }
            };
            if let Err(e) = cam.set_resolution(Resolution::new(width, height)) {
                tracing::debug!(error = %e, width, height, "camera kept its own resolution");
            }
            let _ = opened_tx.send(Ok(()));

            let mut ts = 0u64;
            while !stop_for_thread.load(Ordering::SeqCst) {
                let buf = match cam.frame() {
                    Ok(b) => b,
                    Err(e) => {
                        tracing::warn!(error = %e, "camera read failed");
                        break;
                    }
                };
                let res = buf.resolution();
                let img = match buf.decode_image::<RgbAFormat>() {
                    Ok(i) => i,
                    Err(e) => {
                        tracing::warn!(error = %e, "camera frame decode failed");
                        continue;
                    }
                };
                let frame = match DecodedFrame::new(res.width_x, res.height_y, ts, img.into_raw()) {
                    Ok(f) => f,
                    Err(e) => {
                        tracing::debug!(error = %e, "skipping malformed camera frame");
                        continue;
                    }
                };
                ts += 1;
                if frame_tx.send(frame).is_err() {
                    break;
                }
            }
            let _ = cam.stop_stream();
        });

        match opened_rx.recv() {
            Ok(Ok(())) => Ok(Box::new(NativeTrack {
                frames,
                stop,
                reader: Some(reader),
            })),
            Ok(Err(msg)) => {
                let _ = reader.join();
                Err(classify(msg))
            }
            Err(_) => {
                let _ = reader.join();
                Err(OpenError::Unavailable("camera thread exited".into()))
            }
        }
    }
}

fn classify(msg: String) -> OpenError {
    let lower = msg.to_ascii_lowercase();
    if lower.contains("permission") || lower.contains("denied") || lower.contains("not authorized") {
        OpenError::Denied
    } else {
        OpenError::Unavailable(msg)
    }
}

struct NativeTrack {
    frames: Receiver<DecodedFrame>,
    stop: Arc<AtomicBool>,
    reader: Option<thread::JoinHandle<()>>,
}

impl VideoTrack for NativeTrack {
    fn poll_frame(&mut self) -> TrackPoll {
        match self.frames.try_recv() {
            Ok(f) => TrackPoll::Frame(f),
            Err(TryRecvError::Empty) => TrackPoll::Pending,
            Err(TryRecvError::Disconnected) => TrackPoll::Ended,
        }
    }

    fn stop(&mut self) {
        self.stop.store(true, Ordering::SeqCst);
        // Unblock a reader waiting on a full channel.
        while self.frames.try_recv().is_ok() {}
        if let Some(handle) = self.reader.take() {
            if handle.join().is_err() {
                tracing::warn!("camera reader thread panicked");
            }
        }
    }
}

impl Drop for NativeTrack {
    fn drop(&mut self) {
        self.stop();
    }
}
