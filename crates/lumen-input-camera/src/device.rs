//! Capture device seam: permission queries, stream opening and frame tracks.

use lumen_core::config::StreamFormat;

use crate::frame::DecodedFrame;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    Camera,
    Microphone,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PermissionState {
    Granted,
    /// The user will be asked when the stream is opened.
    Prompt,
    Denied,
}

/// What to capture.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StreamConstraints {
    pub video: StreamFormat,
    pub audio: bool,
}

/// Why a device refused to open a stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OpenError {
    /// The user dismissed or rejected the prompt.
    Denied,
    /// No device, device busy, unsupported format, ...
    Unavailable(String),
}

/// Result of one non-blocking read from a track.
#[derive(Debug)]
pub enum TrackPoll {
    Frame(DecodedFrame),
    /// Nothing new yet.
    Pending,
    /// The track will never produce another frame.
    Ended,
}

/// A live video track.
pub trait VideoTrack: Send {
    fn poll_frame(&mut self) -> TrackPoll;
    fn stop(&mut self);
}

/// Entry point to the platform's capture devices.
pub trait MediaDevices {
    fn query_permission(&self, kind: MediaKind) -> PermissionState;
    fn open_stream(
        &mut self,
        constraints: &StreamConstraints,
    ) -> Result<Box<dyn VideoTrack>, OpenError>;
}
