use lumen_core::{EngineError, ImageSource};

use crate::context::RenderContext;

/// What [`Texture::update_source`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Upload {
    /// Nothing to do (no source, or the same source as last time).
    Skipped,
    /// Storage (re)allocated with `tex_image_2d`.
    Full,
    /// Existing storage overwritten with `tex_sub_image_2d`.
    Sub,
}

/// One GPU texture handle and the identity of the image last uploaded into it.
///
/// Sampling always happens on unit 0 with LINEAR / CLAMP_TO_EDGE, which is what NPOT
/// sources (camera frames) require.
#[derive(Debug)]
pub struct Texture<G: RenderContext> {
    handle: Option<G::Texture>,
    width: i32,
    height: i32,
    source_id: Option<u64>,
}

impl<G: RenderContext> Texture<G> {
    /// Allocate a handle without storage.
    pub fn new(gl: &G) -> Result<Self, EngineError> {
        let handle = gl
            .create_texture()
            .map_err(|e| EngineError::GlCreate(format!("create_texture failed: {e:?}")))?;
        gl.bind_texture(Some(handle));
        set_npot_params(gl);
        gl.bind_texture(None);
        Ok(Self {
            handle: Some(handle),
            width: 0,
            height: 0,
            source_id: None,
        })
    }

    /// New texture filled from `image`.
    pub fn from_image(gl: &G, image: &ImageSource) -> Result<Self, EngineError> {
        let mut t = Self::new(gl)?;
        t.update_source(gl, Some(image))?;
        Ok(t)
    }

    /// Blank RGBA8 storage of the given size (render-target color buffers).
    pub fn with_storage(gl: &G, width: i32, height: i32) -> Result<Self, EngineError> {
        let mut t = Self::new(gl)?;
        t.allocate(gl, width, height);
        Ok(t)
    }

    pub fn handle(&self) -> Option<G::Texture> {
        self.handle
    }

    pub fn size(&self) -> (i32, i32) {
        (self.width, self.height)
    }

    pub fn is_disposed(&self) -> bool {
        self.handle.is_none()
    }

    pub fn source_id(&self) -> Option<u64> {
        self.source_id
    }

    /// Resize to `width`x`height` and drop the current contents.
    pub fn allocate(&mut self, gl: &G, width: i32, height: i32) {
        let Some(h) = self.handle else {
            return;
        };
        self.width = width.max(1);
        self.height = height.max(1);
        self.source_id = None;
        gl.bind_texture(Some(h));
        gl.tex_image_2d_rgba(self.width, self.height, None);
        gl.bind_texture(None);
    }

    /// Upload `src` if it is a new source.
    ///
    /// First upload allocates; later sources of the same size use a sub-image update;
    /// a size change reallocates storage on the same handle.
    pub fn update_source(&mut self, gl: &G, src: Option<&ImageSource>) -> Result<Upload, EngineError> {
        let Some(src) = src else {
            return Ok(Upload::Skipped);
        };
        let h = self.handle.ok_or(EngineError::Disposed)?;
        if self.source_id == Some(src.id()) {
            return Ok(Upload::Skipped);
        }

        let (w, hh) = (src.width() as i32, src.height() as i32);
        let kind = if self.source_id.is_some() && (w, hh) == (self.width, self.height) {
            Upload::Sub
        } else {
            Upload::Full
        };

        gl.bind_texture(Some(h));
        match kind {
            Upload::Sub => gl.tex_sub_image_2d_rgba(0, 0, w, hh, src.pixels()),
            _ => gl.tex_image_2d_rgba(w, hh, Some(src.pixels())),
        }
        gl.bind_texture(None);

        self.width = w;
        self.height = hh;
        self.source_id = Some(src.id());
        Ok(kind)
    }

    /// Bind on unit 0 for sampling.
    pub fn bind(&self, gl: &G) {
        gl.active_texture(glow::TEXTURE0);
        gl.bind_texture(self.handle);
        if self.handle.is_some() {
            set_npot_params(gl);
        }
    }

    pub fn unbind(&self, gl: &G) {
        gl.bind_texture(None);
    }

    pub fn dispose(&mut self, gl: &G) {
        if let Some(h) = self.handle.take() {
            gl.delete_texture(h);
        }
        self.source_id = None;
    }
}

fn set_npot_params<G: RenderContext>(gl: &G) {
    gl.tex_parameter_i32(glow::TEXTURE_MIN_FILTER, glow::LINEAR as i32);
    gl.tex_parameter_i32(glow::TEXTURE_MAG_FILTER, glow::LINEAR as i32);
    gl.tex_parameter_i32(glow::TEXTURE_WRAP_S, glow::CLAMP_TO_EDGE as i32);
    gl.tex_parameter_i32(glow::TEXTURE_WRAP_T, glow::CLAMP_TO_EDGE as i32);
}
