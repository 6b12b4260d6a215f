use lumen_core::EngineError;

use crate::context::RenderContext;
use crate::texture::Texture;

/// Offscreen render target: FBO + color texture (+ optional depth renderbuffer).
///
/// `dispose` must run before the target is dropped; it releases all three objects.
#[derive(Debug)]
pub struct FrameBufferTarget<G: RenderContext> {
    fbo: Option<G::Framebuffer>,
    color: Texture<G>,
    depth: Option<G::Renderbuffer>,
    w: i32,
    h: i32,
}

impl<G: RenderContext> FrameBufferTarget<G> {
    pub fn new(gl: &G, w: i32, h: i32, with_depth: bool) -> Result<Self, EngineError> {
        let ww = w.max(1);
        let hh = h.max(1);

        let fbo = gl
            .create_framebuffer()
            .map_err(|e| EngineError::GlCreate(format!("create_framebuffer failed: {e:?}")))?;
        let mut color = match Texture::with_storage(gl, ww, hh) {
            Ok(t) => t,
            Err(e) => {
                gl.delete_framebuffer(fbo);
                return Err(e);
            }
        };

        let depth = if with_depth {
            match gl.create_renderbuffer() {
                Ok(rb) => {
                    gl.renderbuffer_depth_storage(rb, ww, hh);
                    Some(rb)
                }
                Err(e) => {
                    color.dispose(gl);
                    gl.delete_framebuffer(fbo);
                    return Err(EngineError::GlCreate(format!(
                        "create_renderbuffer failed: {e:?}"
                    )));
                }
            }
        } else {
            None
        };

        gl.bind_framebuffer(Some(fbo));
        gl.framebuffer_color_texture(color.handle());
        if depth.is_some() {
            gl.framebuffer_depth_renderbuffer(depth);
        }

        let status = gl.framebuffer_status();
        gl.bind_framebuffer(None);

        if status != glow::FRAMEBUFFER_COMPLETE {
            color.dispose(gl);
            if let Some(rb) = depth {
                gl.delete_renderbuffer(rb);
            }
            gl.delete_framebuffer(fbo);
            return Err(EngineError::FramebufferIncomplete(status));
        }

        Ok(Self {
            fbo: Some(fbo),
            color,
            depth,
            w: ww,
            h: hh,
        })
    }

    pub fn size(&self) -> (i32, i32) {
        (self.w, self.h)
    }

    pub fn has_depth(&self) -> bool {
        self.depth.is_some()
    }

    pub fn is_disposed(&self) -> bool {
        self.fbo.is_none()
    }

    /// Texture holding what was last rendered into this target.
    pub fn color_texture(&self) -> &Texture<G> {
        &self.color
    }

    /// Bind for drawing and set the viewport to the full target.
    pub fn bind(&self, gl: &G) -> Result<(), EngineError> {
        let fbo = self.fbo.ok_or(EngineError::Disposed)?;
        gl.bind_framebuffer(Some(fbo));
        gl.viewport(0, 0, self.w, self.h);
        Ok(())
    }

    /// Clear the bound target to transparent black (and depth to 1.0).
    pub fn clear(&self, gl: &G) {
        gl.clear_color(0.0, 0.0, 0.0, 0.0);
        let mut mask = glow::COLOR_BUFFER_BIT;
        if self.depth.is_some() {
            gl.clear_depth(1.0);
            mask |= glow::DEPTH_BUFFER_BIT;
        }
        gl.clear(mask);
    }

    /// Reallocate color (and depth) storage; keeps the same object ids.
    pub fn resize(&mut self, gl: &G, w: i32, h: i32) {
        if self.is_disposed() {
            return;
        }
        self.w = w.max(1);
        self.h = h.max(1);
        self.color.allocate(gl, self.w, self.h);
        if let Some(rb) = self.depth {
            gl.renderbuffer_depth_storage(rb, self.w, self.h);
        }
    }

    pub fn dispose(&mut self, gl: &G) {
        if let Some(fbo) = self.fbo.take() {
            gl.delete_framebuffer(fbo);
        }
        self.color.dispose(gl);
        if let Some(rb) = self.depth.take() {
            gl.delete_renderbuffer(rb);
        }
    }
}
