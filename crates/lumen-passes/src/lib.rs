//! Multi-pass sprite compositing on top of the glow runtime.
//!
//! [`Sprite`] owns its program, texture, vertex buffers and a [`PingPongTarget`], and
//! renders itself in a fixed layout/effect/present sequence.

pub mod pingpong;
pub mod sprite;

pub use pingpong::PingPongTarget;
pub use sprite::{DrawOutcome, Sprite, SpriteConfig, TextureSlot};
