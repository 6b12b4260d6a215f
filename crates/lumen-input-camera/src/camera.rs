use std::fmt;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use image::imageops::{self, FilterType};
use image::RgbaImage;
use lumen_core::config::OutputFormat;
use lumen_core::{CameraConfig, ImageSource, PipelineMode, MAX_FRAME_RATE};
use lumen_runtime_glow::{RenderContext, Texture};

use crate::codec::{FrameCodec, RawCodec};
use crate::device::{MediaDevices, MediaKind, OpenError, PermissionState, StreamConstraints};
use crate::frame::DecodedFrame;
use crate::pipeline::{lock_queue, CaptureWorker, PipelineStatus, SharedQueue};
use crate::queue::FrameQueue;
use crate::CameraError;

/// Why [`Camera::open`] failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureReason {
    /// Camera permission is denied; the stream was never requested.
    CameraPermission,
    /// The device could not be opened.
    CameraOpen,
    /// The user rejected the capture prompt.
    UserDenied,
    /// Video capture is switched off in the configuration.
    Disabled,
}

impl FailureReason {
    pub fn as_str(self) -> &'static str {
        match self {
            FailureReason::CameraPermission => "CAMERA_PERMISSION_ERROR",
            FailureReason::CameraOpen => "CAMERA_OPEN_ERROR",
            FailureReason::UserDenied => "USER_DENIED",
            FailureReason::Disabled => "CAMERA_DISABLED",
        }
    }
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenOutcome {
    Opened,
    Failed(FailureReason),
}

impl OpenOutcome {
    pub fn is_success(self) -> bool {
        matches!(self, OpenOutcome::Opened)
    }

    pub fn reason(self) -> Option<FailureReason> {
        match self {
            OpenOutcome::Opened => None,
            OpenOutcome::Failed(r) => Some(r),
        }
    }
}

/// Point-in-time view of the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PipelineStats {
    pub available: bool,
    pub queued: usize,
    pub ingested: u64,
    pub evicted: u64,
    pub filtered: u64,
    pub codec_errors: u64,
}

/// Live camera feeding a bounded queue of decoded frames.
///
/// All `consume_*` calls are non-blocking and meant to be called once per render tick.
pub struct Camera {
    config: CameraConfig,
    queue: SharedQueue,
    status: PipelineStatus,
    worker: Option<CaptureWorker>,
    codec: Option<Box<dyn FrameCodec>>,
}

impl fmt::Debug for Camera {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Camera")
            .field("config", &self.config)
            .field("open", &self.worker.is_some())
            .field("status", &self.status)
            .field("codec", &self.codec.as_ref().map(|c| c.name().to_string()))
            .finish()
    }
}

impl Camera {
    pub fn new(config: CameraConfig) -> Result<Self, CameraError> {
        config.validate().map_err(CameraError::Config)?;
        let queue = FrameQueue::new(config.queue.max_frames, config.queue.max_bytes);
        Ok(Self {
            config,
            queue: Arc::new(Mutex::new(queue)),
            status: PipelineStatus::default(),
            worker: None,
            codec: None,
        })
    }

    /// Use `codec` for the round trip instead of [`RawCodec`].
    pub fn with_codec(mut self, codec: Box<dyn FrameCodec>) -> Self {
        self.codec = Some(codec);
        self
    }

    pub fn config(&self) -> &CameraConfig {
        &self.config
    }

    pub fn is_open(&self) -> bool {
        self.worker.is_some()
    }

    /// Open the camera and start the capture worker.
    ///
    /// Permission is checked before the stream is requested: a denied camera never reaches
    /// `open_stream`. A denied microphone only drops audio.
    pub fn open(&mut self, devices: &mut dyn MediaDevices) -> OpenOutcome {
        if self.worker.is_some() {
            if self.status.is_available() {
                return OpenOutcome::Opened;
            }
            tracing::debug!("previous capture worker has stopped; reopening");
            self.close();
        }
        if !self.config.video.allow {
            tracing::info!("video capture disabled by config");
            return OpenOutcome::Failed(FailureReason::Disabled);
        }
        if devices.query_permission(MediaKind::Camera) == PermissionState::Denied {
            tracing::warn!("camera permission denied");
            return OpenOutcome::Failed(FailureReason::CameraPermission);
        }
        let audio = self.config.audio.allow
            && match devices.query_permission(MediaKind::Microphone) {
                PermissionState::Denied => {
                    tracing::info!("microphone permission denied; continuing without audio");
                    false
                }
                _ => true,
            };

        let constraints = StreamConstraints {
            video: self.config.video.input,
            audio,
        };
        let track = match devices.open_stream(&constraints) {
            Ok(t) => t,
            Err(OpenError::Denied) => {
                tracing::warn!("camera prompt rejected");
                return OpenOutcome::Failed(FailureReason::UserDenied);
            }
            Err(OpenError::Unavailable(msg)) => {
                tracing::warn!(error = %msg, "camera could not be opened");
                return OpenOutcome::Failed(FailureReason::CameraOpen);
            }
        };

        let codec = match self.config.mode {
            PipelineMode::RoundTrip => Some(
                self.codec
                    .take()
                    .unwrap_or_else(|| Box::new(RawCodec::default()) as Box<dyn FrameCodec>),
            ),
            PipelineMode::Direct => None,
        };
        let fps = self.config.video.input.frame_rate.clamp(1, MAX_FRAME_RATE);
        let idle = Duration::from_secs(1) / fps.saturating_mul(4);

        self.status = PipelineStatus::default();
        self.status.set_available(true);
        self.worker = Some(CaptureWorker::spawn(
            track,
            codec,
            Arc::clone(&self.queue),
            self.status.clone(),
            idle,
        ));
        tracing::info!(
            mode = ?self.config.mode,
            width = constraints.video.width,
            height = constraints.video.height,
            audio,
            "camera opened"
        );
        OpenOutcome::Opened
    }

    /// Open and delivering frames. Turns false when the track ends or the codec fails.
    pub fn is_available(&self) -> bool {
        self.worker.is_some() && self.status.is_available()
    }

    pub fn status(&self) -> &PipelineStatus {
        &self.status
    }

    pub fn stats(&self) -> PipelineStats {
        let q = lock_queue(&self.queue);
        PipelineStats {
            available: self.is_available(),
            queued: q.len(),
            ingested: self.status.ingested(),
            evicted: q.evicted(),
            filtered: self.status.filtered(),
            codec_errors: self.status.codec_errors(),
        }
    }

    /// Oldest queued frame, if any.
    pub fn consume_frame(&mut self) -> Option<DecodedFrame> {
        lock_queue(&self.queue).pop()
    }

    /// Oldest queued frame resized to the configured output size. The frame is released
    /// before this returns.
    pub fn consume_frame_as_bitmap(&mut self) -> Option<ImageSource> {
        let frame = self.consume_frame()?;
        match frame_to_bitmap(frame, self.config.video.output) {
            Ok(img) => Some(img),
            Err(e) => {
                tracing::warn!(error = %e, "frame to bitmap conversion failed");
                None
            }
        }
    }

    /// Oldest queued frame uploaded into a new texture. The intermediate bitmap is dropped
    /// after upload.
    pub fn consume_frame_as_texture<G: RenderContext>(
        &mut self,
        gl: &G,
    ) -> Result<Option<Texture<G>>, CameraError> {
        let Some(bitmap) = self.consume_frame_as_bitmap() else {
            return Ok(None);
        };
        let texture = Texture::from_image(gl, &bitmap)?;
        drop(bitmap);
        Ok(Some(texture))
    }

    /// Stop the worker and release every queued frame.
    pub fn close(&mut self) {
        if let Some(mut w) = self.worker.take() {
            w.stop();
            tracing::info!("camera closed");
        }
        self.status.set_available(false);
        lock_queue(&self.queue).clear();
    }
}

impl Drop for Camera {
    fn drop(&mut self) {
        self.close();
    }
}

/// Convert `frame` (consumed and released) into an `out`-sized RGBA image.
pub fn frame_to_bitmap(frame: DecodedFrame, out: OutputFormat) -> Result<ImageSource, CameraError> {
    let (w, h, pixels) = frame.into_rgba();
    let img = RgbaImage::from_raw(w, h, pixels)
        .ok_or_else(|| CameraError::InvalidFrame(format!("{w}x{h} buffer too short")))?;
    let img = if (w, h) == (out.width, out.height) {
        img
    } else {
        imageops::resize(&img, out.width, out.height, FilterType::Triangle)
    };
    ImageSource::from_rgba(out.width, out.height, img.into_raw())
        .map_err(|e| CameraError::InvalidFrame(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::EncodedChunk;
    use crate::synthetic::SyntheticDevices;
    use lumen_core::config::StreamFormat;
    use lumen_runtime_glow::testing::{Call, RecordingGl};
    use std::time::Instant;

    fn config(mode: PipelineMode) -> CameraConfig {
        let mut c = CameraConfig::default();
        c.video.input = StreamFormat {
            width: 8,
            height: 6,
            frame_rate: 30,
        };
        c.video.output = OutputFormat {
            width: 4,
            height: 4,
        };
        c.queue.max_frames = 3;
        c.mode = mode;
        c
    }

    fn wait_until(mut cond: impl FnMut() -> bool) -> bool {
        let deadline = Instant::now() + Duration::from_secs(5);
        while Instant::now() < deadline {
            if cond() {
                return true;
            }
            std::thread::sleep(Duration::from_millis(2));
        }
        false
    }

    #[test]
    fn denied_permission_never_opens_the_stream() {
        let mut dev = SyntheticDevices::new().camera_permission(PermissionState::Denied);
        let mut cam = Camera::new(config(PipelineMode::RoundTrip)).unwrap();
        let outcome = cam.open(&mut dev);
        assert!(!outcome.is_success());
        assert_eq!(outcome.reason().map(FailureReason::as_str), Some("CAMERA_PERMISSION_ERROR"));
        assert_eq!(dev.open_calls(), 0);
        assert!(!cam.is_available());
    }

    #[test]
    fn open_failures_are_distinguished() {
        let mut cam = Camera::new(config(PipelineMode::Direct)).unwrap();

        let mut busy = SyntheticDevices::new().fail_open(OpenError::Unavailable("busy".into()));
        assert_eq!(
            cam.open(&mut busy),
            OpenOutcome::Failed(FailureReason::CameraOpen)
        );

        let mut rejected = SyntheticDevices::new()
            .camera_permission(PermissionState::Prompt)
            .fail_open(OpenError::Denied);
        assert_eq!(
            cam.open(&mut rejected),
            OpenOutcome::Failed(FailureReason::UserDenied)
        );
        assert_eq!(rejected.open_calls(), 1);
    }

    #[test]
    fn disabled_video_does_not_touch_devices() {
        let mut c = config(PipelineMode::Direct);
        c.video.allow = false;
        let mut dev = SyntheticDevices::new();
        let mut cam = Camera::new(c).unwrap();
        assert_eq!(cam.open(&mut dev), OpenOutcome::Failed(FailureReason::Disabled));
        assert_eq!(dev.open_calls(), 0);
    }

    #[test]
    fn frames_flow_through_the_round_trip_in_order() {
        let mut dev = SyntheticDevices::new()
            .frame_limit(3)
            .interval(Duration::ZERO);
        let mut cam = Camera::new(config(PipelineMode::RoundTrip)).unwrap();
        assert!(cam.open(&mut dev).is_success());

        assert!(wait_until(|| cam.stats().ingested == 3));
        let ts: Vec<u64> = std::iter::from_fn(|| cam.consume_frame())
            .map(|f| f.timestamp())
            .collect();
        assert_eq!(ts, vec![0, 1, 2]);
        assert!(wait_until(|| !cam.is_available()));
    }

    #[test]
    fn padded_frames_are_never_consumable() {
        let mut dev = SyntheticDevices::new()
            .frame_limit(6)
            .padded_every(2)
            .interval(Duration::ZERO);
        let mut c = config(PipelineMode::Direct);
        c.queue.max_frames = 16;
        let mut cam = Camera::new(c).unwrap();
        assert!(cam.open(&mut dev).is_success());
        assert!(wait_until(|| !cam.is_available()));

        let stats = cam.stats();
        assert_eq!(stats.filtered, 3);
        assert_eq!(stats.ingested, 3);
        while let Some(f) = cam.consume_frame() {
            assert!(f.has_matching_dims());
            assert_eq!(f.timestamp() % 2, 0);
        }
    }

    #[test]
    fn backpressure_keeps_newest_and_releases_the_rest() {
        let mut dev = SyntheticDevices::new()
            .frame_limit(10)
            .interval(Duration::ZERO);
        let mut cam = Camera::new(config(PipelineMode::Direct)).unwrap();
        assert!(cam.open(&mut dev).is_success());
        assert!(wait_until(|| !cam.is_available()));

        let stats = cam.stats();
        assert_eq!(stats.queued, 3);
        assert_eq!(stats.evicted, 7);
        assert_eq!(dev.released(), 7);

        let ts: Vec<u64> = std::iter::from_fn(|| cam.consume_frame())
            .map(|f| f.timestamp())
            .collect();
        assert_eq!(ts, vec![7, 8, 9]);
        assert_eq!(dev.released(), 10);
    }

    struct BrokenDecoder;

    impl FrameCodec for BrokenDecoder {
        fn name(&self) -> &str {
            "broken"
        }
        fn encode(&mut self, frame: &DecodedFrame) -> Result<EncodedChunk, CameraError> {
            RawCodec::default().encode(frame)
        }
        fn decode(&mut self, _chunk: EncodedChunk) -> Result<DecodedFrame, CameraError> {
            Err(CameraError::Codec("decoder lost".into()))
        }
    }

    #[test]
    fn codec_error_marks_pipeline_unavailable() {
        let mut dev = SyntheticDevices::new().interval(Duration::ZERO);
        let mut cam = Camera::new(config(PipelineMode::RoundTrip))
            .unwrap()
            .with_codec(Box::new(BrokenDecoder));
        assert!(cam.open(&mut dev).is_success());

        assert!(wait_until(|| !cam.is_available()));
        let stats = cam.stats();
        assert_eq!(stats.codec_errors, 1);
        assert_eq!(stats.queued, 0);
        assert!(cam.consume_frame().is_none());
    }

    #[test]
    fn dead_pipeline_can_be_reopened() {
        let mut dev = SyntheticDevices::new().interval(Duration::ZERO);
        let mut cam = Camera::new(config(PipelineMode::RoundTrip))
            .unwrap()
            .with_codec(Box::new(BrokenDecoder));
        assert!(cam.open(&mut dev).is_success());
        assert!(wait_until(|| !cam.is_available()));
        assert!(cam.is_open());

        // the override was consumed; the second session round-trips through RawCodec
        assert!(cam.open(&mut dev).is_success());
        assert_eq!(dev.open_calls(), 2);
        assert!(wait_until(|| cam.stats().ingested > 0));
        assert!(cam.is_available());
        assert!(cam.consume_frame().is_some());
    }

    #[test]
    fn live_pipeline_open_is_a_no_op() {
        let mut dev = SyntheticDevices::new().interval(Duration::from_millis(5));
        let mut cam = Camera::new(config(PipelineMode::Direct)).unwrap();
        assert!(cam.open(&mut dev).is_success());
        assert!(cam.open(&mut dev).is_success());
        assert_eq!(dev.open_calls(), 1);
    }

    #[test]
    fn bitmap_is_resized_to_output_and_frame_released() {
        let mut dev = SyntheticDevices::new()
            .frame_limit(1)
            .interval(Duration::ZERO);
        let mut cam = Camera::new(config(PipelineMode::Direct)).unwrap();
        assert!(cam.open(&mut dev).is_success());
        assert!(wait_until(|| cam.stats().queued == 1));

        let bmp = cam.consume_frame_as_bitmap().unwrap();
        assert_eq!(bmp.dimensions(), (4, 4));
        assert_eq!(dev.released(), 1);
        assert!(cam.consume_frame_as_bitmap().is_none());
    }

    #[test]
    fn texture_path_uploads_once() {
        let gl = RecordingGl::new();
        let mut dev = SyntheticDevices::new()
            .frame_limit(1)
            .interval(Duration::ZERO);
        let mut cam = Camera::new(config(PipelineMode::Direct)).unwrap();
        assert!(cam.open(&mut dev).is_success());
        assert!(wait_until(|| cam.stats().queued == 1));

        let tex = cam.consume_frame_as_texture(&gl).unwrap().unwrap();
        assert_eq!(tex.size(), (4, 4));
        assert_eq!(
            gl.count(|c| matches!(c, Call::TexImage { with_pixels: true, .. })),
            1
        );
        assert!(cam.consume_frame_as_texture(&gl).unwrap().is_none());
    }

    #[test]
    fn close_releases_queued_frames() {
        let mut dev = SyntheticDevices::new()
            .frame_limit(3)
            .interval(Duration::ZERO);
        let mut cam = Camera::new(config(PipelineMode::Direct)).unwrap();
        assert!(cam.open(&mut dev).is_success());
        assert!(wait_until(|| cam.stats().ingested == 3));
        cam.close();
        assert!(!cam.is_open());
        assert_eq!(dev.released(), 3);
    }

    #[test]
    fn invalid_config_is_rejected() {
        let mut c = CameraConfig::default();
        c.queue.max_frames = 0;
        assert!(matches!(Camera::new(c), Err(CameraError::Config(_))));
    }

    #[test]
    fn huge_frame_rate_is_rejected_before_open() {
        let mut c = config(PipelineMode::Direct);
        c.video.input.frame_rate = 1 << 30;
        match Camera::new(c) {
            Err(CameraError::Config(msg)) => assert!(msg.contains("frame_rate"), "{msg}"),
            other => panic!("expected config error, got {other:?}"),
        }
    }
}
