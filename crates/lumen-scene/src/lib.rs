//! Scene driver (policy layer).
//!
//! [`Graphics`] owns the registered [`Drawable`]s and runs one tick as begin-all, draw-all,
//! end-all. [`MainScene`] is the playground scene built on top of the sprite compositor
//! and the camera pipeline. No windowing here: the host owns the GL context and calls
//! [`Graphics::render`] once per frame.

pub mod default_draw;
pub mod drawable;
pub mod graphics;
pub mod image_file;
pub mod logging;
pub mod main_scene;

pub use default_draw::DefaultDraw;
pub use drawable::Drawable;
pub use graphics::Graphics;
pub use image_file::{load_image_async, load_image_file};
pub use logging::init_tracing;
pub use main_scene::MainScene;

use lumen_core::{EngineError, PlaygroundConfig};
use lumen_input_camera::MediaDevices;
use lumen_runtime::ParamSource;
use lumen_runtime_glow::RenderContext;

/// Build the standard playground: a clear step followed by [`MainScene`], with the camera
/// opened through `devices` when one is given.
pub fn build_playground<G: RenderContext + 'static>(
    gl: &G,
    config: &PlaygroundConfig,
    params: Box<dyn ParamSource>,
    devices: Option<&mut dyn MediaDevices>,
) -> Result<Graphics<G>, EngineError> {
    let mut scene = MainScene::new(gl, config, params)?;
    if let Some(devices) = devices {
        scene.open_camera(devices);
    }

    let mut graphics = Graphics::new(config.canvas.width, config.canvas.height);
    graphics.init(gl);
    graphics.push(Box::new(DefaultDraw::new()));
    graphics.push(Box::new(scene));
    Ok(graphics)
}
