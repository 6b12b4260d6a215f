#![deny(rustdoc::broken_intra_doc_links)]
#![deny(missing_debug_implementations)]

pub mod config;
pub mod error;
pub mod image;
pub mod load;

pub use error::EngineError;
pub use image::ImageSource;
pub use load::{LoadState, Pending, PendingPoll};

pub use config::{
    load_config_from, load_typed_json, CameraConfig, CanvasConfig, PipelineMode,
    PlaygroundConfig, QueueConfig, ShaderPaths, MAX_FRAME_RATE,
};
