//! lumen runtime (glow/OpenGL backend)
//
// This crate contains the GPU object layer of the compositor:
// - compile/link shaders and upload uniforms by name
// - own textures and apply the upload policy (full vs sub-image)
// - manage offscreen render targets (FBO + color texture + depth)
// - upload vertex/index buffers for 9-slice and full-canvas meshes
//
// It does NOT contain windowing, pass sequencing, or camera capture.
#![allow(clippy::missing_safety_doc)]

pub mod buffers;
pub mod context;
pub mod shader;
pub mod target;
pub mod texture;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use buffers::{GeometryBuffers, IndexBuffer};
pub use context::RenderContext;
pub use shader::{compile_program, ShaderProgram, ShaderSource, DEFAULT_FRAG, DEFAULT_VERT};
pub use target::FrameBufferTarget;
pub use texture::{Texture, Upload};

pub use lumen_core::EngineError;
