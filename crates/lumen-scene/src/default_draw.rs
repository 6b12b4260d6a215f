use lumen_runtime_glow::RenderContext;

use crate::Drawable;

/// Clears the default framebuffer at the start of every tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DefaultDraw {
    color: [f32; 4],
    depth: f32,
}

impl Default for DefaultDraw {
    fn default() -> Self {
        Self {
            color: [0.0, 0.0, 0.0, 1.0],
            depth: 1.0,
        }
    }
}

impl DefaultDraw {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_clear_color(mut self, color: [f32; 4]) -> Self {
        self.color = color;
        self
    }
}

impl<G: RenderContext> Drawable<G> for DefaultDraw {
    fn on_begin_draw(&mut self, gl: &G) {
        let [r, g, b, a] = self.color;
        gl.clear_color(r, g, b, a);
        gl.clear_depth(self.depth);
        gl.clear(glow::COLOR_BUFFER_BIT | glow::DEPTH_BUFFER_BIT);
    }

    fn on_draw(&mut self, _gl: &G) {}
}
