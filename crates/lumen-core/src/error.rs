use std::fmt;
use std::path::PathBuf;

/// Engine-level errors used across lumen crates.
///
/// Render-path variants are recoverable: the caller logs them and skips the frame.
#[derive(Debug)]
pub enum EngineError {
    // ---- Config / assets ----
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    Json {
        path: PathBuf,
        source: serde_json::Error,
    },

    InvalidConfig {
        path: PathBuf,
        msg: String,
    },

    Image {
        path: PathBuf,
        msg: String,
    },

    // ---- Backend ----
    VertexCompile(String),
    FragmentCompile(String),
    Link(String),
    GlCreate(String),
    FramebufferIncomplete(u32),

    // ---- Sprite contract ----
    InvalidSprite(String),
    Disposed,

    // ---- Fallback ----
    Other(String),
}

impl EngineError {
    pub fn other<T: Into<String>>(s: T) -> Self {
        EngineError::Other(s.into())
    }

    pub fn invalid_sprite<T: Into<String>>(s: T) -> Self {
        EngineError::InvalidSprite(s.into())
    }
}

impl fmt::Display for EngineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EngineError::Io { path, source } => {
                write!(f, "io error at {}: {}", path.display(), source)
            }
            EngineError::Json { path, source } => {
                write!(f, "json parse error at {}: {}", path.display(), source)
            }
            EngineError::InvalidConfig { path, msg } => {
                write!(f, "invalid config at {}: {}", path.display(), msg)
            }
            EngineError::Image { path, msg } => {
                write!(f, "image decode error at {}: {}", path.display(), msg)
            }

            EngineError::VertexCompile(msg) => write!(f, "vertex shader compile error: {msg}"),
            EngineError::FragmentCompile(msg) => write!(f, "fragment shader compile error: {msg}"),
            EngineError::Link(msg) => write!(f, "program link error: {msg}"),
            EngineError::GlCreate(msg) => write!(f, "backend object creation failed: {msg}"),
            EngineError::FramebufferIncomplete(status) => {
                write!(f, "framebuffer incomplete: 0x{status:x}")
            }

            EngineError::InvalidSprite(msg) => write!(f, "invalid sprite: {msg}"),
            EngineError::Disposed => write!(f, "resource already disposed"),

            EngineError::Other(msg) => write!(f, "{msg}"),
        }
    }
}

impl std::error::Error for EngineError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            EngineError::Io { source, .. } => Some(source),
            EngineError::Json { source, .. } => Some(source),
            _ => None,
        }
    }
}
