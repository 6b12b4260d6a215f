//! Camera capture for the lumen compositor.
//!
//! A [`Camera`] opens a capture track through a [`MediaDevices`] backend, runs frames through
//! an optional encode/decode round trip on a worker thread, and buffers them in a bounded
//! drop-oldest [`FrameQueue`]. The render loop pulls at most one frame per tick with the
//! `consume_*` methods.
//!
//! Without the `native` feature only [`SyntheticDevices`] is available.

use lumen_core::EngineError;
use thiserror::Error;

pub mod camera;
pub mod codec;
pub mod device;
pub mod frame;
mod pipeline;
pub mod queue;
pub mod synthetic;

#[cfg(feature = "native")]
pub mod native;

pub use camera::{frame_to_bitmap, Camera, FailureReason, OpenOutcome, PipelineStats};
pub use codec::{EncodedChunk, FrameCodec, RawCodec};
pub use device::{
    MediaDevices, MediaKind, OpenError, PermissionState, StreamConstraints, TrackPoll, VideoTrack,
};
pub use frame::DecodedFrame;
pub use pipeline::PipelineStatus;
pub use queue::FrameQueue;
pub use synthetic::SyntheticDevices;

#[cfg(feature = "native")]
pub use native::NokhwaDevices;

#[derive(Debug, Error)]
pub enum CameraError {
    #[error("camera support not enabled (build with feature: lumen-input-camera/native)")]
    NotEnabled,

    #[error("{0}")]
    Backend(String),

    #[error("invalid frame: {0}")]
    InvalidFrame(String),

    #[error("codec error: {0}")]
    Codec(String),

    #[error("invalid camera config: {0}")]
    Config(String),

    #[error("frame upload failed: {0}")]
    Upload(#[from] EngineError),
}

/// The platform capture backend for camera `index`.
pub fn default_devices(index: u32) -> Result<Box<dyn MediaDevices>, CameraError> {
    #[cfg(feature = "native")]
    {
        Ok(Box::new(NokhwaDevices::new(index)))
    }

    #[cfg(not(feature = "native"))]
    {
        let _ = index;
        Err(CameraError::NotEnabled)
    }
}

#[cfg(all(test, not(feature = "native")))]
mod tests {
    use super::*;

    #[test]
    fn no_backend_without_native_feature() {
        assert!(matches!(default_devices(0), Err(CameraError::NotEnabled)));
    }
}
