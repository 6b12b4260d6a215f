//! JSON configuration for the playground.
//!
//! Every field has a default so an empty object (`{}`) is a valid config.

use std::fs;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::EngineError;

/// 100 MiB of decoded frames.
pub const DEFAULT_QUEUE_MAX_BYTES: usize = 100 * 1024 * 1024;
pub const DEFAULT_QUEUE_MAX_FRAMES: usize = 8;
/// Upper bound on the requested capture rate.
pub const MAX_FRAME_RATE: u32 = 240;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlaygroundConfig {
    pub canvas: CanvasConfig,
    pub shaders: ShaderPaths,
    /// Static image shown by the background sprite.
    pub background_image: Option<PathBuf>,
    pub camera: CameraConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CanvasConfig {
    pub width: u32,
    pub height: u32,
}

impl Default for CanvasConfig {
    fn default() -> Self {
        Self {
            width: 512,
            height: 512,
        }
    }
}

/// Optional shader file paths; `None` selects the built-in pair.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShaderPaths {
    pub vertex: Option<PathBuf>,
    pub fragment: Option<PathBuf>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    pub video: VideoConfig,
    pub audio: AudioConfig,
    pub queue: QueueConfig,
    pub mode: PipelineMode,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VideoConfig {
    pub allow: bool,
    pub input: StreamFormat,
    pub output: OutputFormat,
}

impl Default for VideoConfig {
    fn default() -> Self {
        Self {
            allow: true,
            input: StreamFormat::default(),
            output: OutputFormat::default(),
        }
    }
}

/// Requested capture format.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StreamFormat {
    pub width: u32,
    pub height: u32,
    pub frame_rate: u32,
}

impl Default for StreamFormat {
    fn default() -> Self {
        Self {
            width: 640,
            height: 480,
            frame_rate: 30,
        }
    }
}

/// Resolution frames are resized to before reaching the compositor.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputFormat {
    pub width: u32,
    pub height: u32,
}

impl Default for OutputFormat {
    fn default() -> Self {
        Self {
            width: 512,
            height: 512,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioConfig {
    pub allow: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QueueConfig {
    pub max_frames: usize,
    pub max_bytes: usize,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            max_frames: DEFAULT_QUEUE_MAX_FRAMES,
            max_bytes: DEFAULT_QUEUE_MAX_BYTES,
        }
    }
}

/// How captured frames reach the queue.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineMode {
    /// encode -> decode before queueing
    #[default]
    RoundTrip,
    /// track frames go straight to the queue
    Direct,
}

impl PlaygroundConfig {
    pub fn validate(&self, path: &Path) -> Result<(), EngineError> {
        let invalid = |msg: &str| EngineError::InvalidConfig {
            path: path.to_path_buf(),
            msg: msg.to_string(),
        };

        if self.canvas.width == 0 || self.canvas.height == 0 {
            return Err(invalid("canvas width/height must be > 0"));
        }
        self.camera.validate().map_err(|msg| invalid(&msg))?;
        Ok(())
    }
}

impl CameraConfig {
    pub fn validate(&self) -> Result<(), String> {
        let out = &self.video.output;
        if out.width == 0 || out.height == 0 {
            return Err("camera output width/height must be > 0".into());
        }
        let fps = self.video.input.frame_rate;
        if fps == 0 || fps > MAX_FRAME_RATE {
            return Err(format!(
                "camera frame_rate must be in 1..={MAX_FRAME_RATE}, got {fps}"
            ));
        }
        if self.queue.max_frames == 0 || self.queue.max_bytes == 0 {
            return Err("camera queue budget must be > 0".into());
        }
        Ok(())
    }
}

/// Read and deserialize any JSON document.
pub fn load_typed_json<T: DeserializeOwned>(path: &Path) -> Result<T, EngineError> {
    let text = fs::read_to_string(path).map_err(|source| EngineError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&text).map_err(|source| EngineError::Json {
        path: path.to_path_buf(),
        source,
    })
}

/// Load and validate a [`PlaygroundConfig`].
pub fn load_config_from(path: &Path) -> Result<PlaygroundConfig, EngineError> {
    let cfg: PlaygroundConfig = load_typed_json(path)?;
    cfg.validate(path)?;
    tracing::debug!(path = %path.display(), "loaded playground config");
    Ok(cfg)
}
