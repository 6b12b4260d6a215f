//! The sprite compositor.
//!
//! Per frame a sprite runs two offscreen passes and one present draw with a single program:
//!
//! | pass      | `nthPass` | geometry    | samples          | writes              |
//! |-----------|-----------|-------------|------------------|---------------------|
//! | `Layout`  | 0         | 9-slice     | source texture   | target A            |
//! | `Effect`  | 1         | full canvas | target A         | target B            |
//! | `Present` | 2         | full canvas | target B         | default framebuffer |
//!
//! The sprite leaves no texture, framebuffer, program or vertex array bound when it returns.

use std::rc::Rc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use lumen_core::{ImageSource, LoadState, Pending};
use lumen_geometry::{
    build_mesh, full_canvas_mesh, Border, Crop, Rotate, Scale, Size, SliceLayout,
    INDICES_PER_SPRITE, QUAD_INDICES,
};
use lumen_runtime::runtime_contract::{self as names, Pass};
use lumen_runtime::UniformEntry;
use lumen_runtime_glow::{
    EngineError, GeometryBuffers, IndexBuffer, RenderContext, ShaderProgram, ShaderSource,
    Texture,
};

use crate::pingpong::PingPongTarget;

/// Construction parameters of a [`Sprite`].
#[derive(Debug, Clone)]
pub struct SpriteConfig {
    /// Canvas size in pixels.
    pub canvas: (u32, u32),
    pub size: Size,
    /// Zero extents are filled from `size` on first draw.
    pub crop: Crop,
    pub border: Border,
    pub scale: Scale,
    pub rotate: Rotate,
    /// Written into the z of every layout vertex.
    pub depth: f32,
    /// `None` uses [`ShaderSource::builtin`].
    pub shader: Option<ShaderSource>,
}

impl SpriteConfig {
    pub fn new(canvas: (u32, u32), size: Size) -> Self {
        Self {
            canvas,
            size,
            crop: Crop::default(),
            border: Border::NONE,
            scale: Scale::default(),
            rotate: Rotate::default(),
            depth: 0.0,
            shader: None,
        }
    }

    pub fn border(mut self, border: Border) -> Self {
        self.border = border;
        self
    }

    pub fn crop(mut self, crop: Crop) -> Self {
        self.crop = crop;
        self
    }

    pub fn depth(mut self, depth: f32) -> Self {
        self.depth = depth;
        self
    }

    pub fn shader(mut self, shader: ShaderSource) -> Self {
        self.shader = Some(shader);
        self
    }
}

/// What one call to [`Sprite::draw`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DrawOutcome {
    /// Hidden or disposed; nothing touched.
    NotDrawable,
    /// Shader source has not arrived yet.
    ShaderPending,
    /// Shader source failed to load, or the program failed to compile (retried next frame).
    ShaderUnavailable,
    /// No image has been delivered yet, or the texture could not be created.
    NoTexture,
    /// `pass` could not bind its target; it and every later pass were skipped.
    Aborted(Pass),
    /// All passes ran.
    Drawn,
}

#[derive(Debug, Default)]
struct SlotInner {
    image: Mutex<Option<ImageSource>>,
    closed: AtomicBool,
}

/// Handle through which a background producer hands an image to a sprite.
///
/// The sprite picks the latest delivered image up on its next draw. Once the sprite is
/// disposed the slot is closed and deliveries are dropped.
#[derive(Debug, Clone, Default)]
pub struct TextureSlot {
    inner: Arc<SlotInner>,
}

impl TextureSlot {
    /// Store `image` for the next draw. Returns `false` (and drops the image) if the
    /// owning sprite is gone.
    pub fn deliver(&self, image: ImageSource) -> bool {
        let mut guard = self
            .inner
            .image
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if self.inner.closed.load(Ordering::Acquire) {
            return false;
        }
        *guard = Some(image);
        true
    }

    pub fn is_closed(&self) -> bool {
        self.inner.closed.load(Ordering::Acquire)
    }

    fn take(&self) -> Option<ImageSource> {
        self.inner
            .image
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
    }

    fn close(&self) {
        let mut guard = self
            .inner
            .image
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        self.inner.closed.store(true, Ordering::Release);
        *guard = None;
    }
}

/// One 9-slice sprite and every GPU object it renders with.
///
/// `dispose` must be called with the same context before the sprite is dropped.
#[derive(Debug)]
pub struct Sprite<G: RenderContext> {
    canvas: (u32, u32),
    size: Size,
    crop: Crop,
    border: Border,
    scale: Scale,
    rotate: Rotate,
    depth: f32,

    visible: bool,
    disposed: bool,
    dirty: bool,

    uniforms: Vec<UniformEntry>,

    shader: LoadState<ShaderSource>,
    program: Option<ShaderProgram<G>>,
    compile_failures: u32,

    source: Option<ImageSource>,
    slot: TextureSlot,
    texture: Option<Texture<G>>,

    slice_geometry: Option<GeometryBuffers<G>>,
    quad_geometry: Option<GeometryBuffers<G>>,
    indices: Option<Rc<IndexBuffer<G>>>,
    targets: Option<PingPongTarget<G>>,
}

impl<G: RenderContext> Sprite<G> {
    /// Validate `config` and build an uninitialized sprite (no GPU objects yet).
    pub fn new(config: SpriteConfig) -> Result<Self, EngineError> {
        let (cw, ch) = config.canvas;
        if cw == 0 || ch == 0 {
            return Err(EngineError::invalid_sprite(format!(
                "canvas must be non-empty, got {cw}x{ch}"
            )));
        }
        if !(config.size.width > 0.0 && config.size.height > 0.0) {
            return Err(EngineError::invalid_sprite(format!(
                "size must be non-empty, got {}x{}",
                config.size.width, config.size.height
            )));
        }
        config
            .border
            .validate()
            .map_err(|e| EngineError::invalid_sprite(e.to_string()))?;

        let shader = config.shader.unwrap_or_else(ShaderSource::builtin);
        Ok(Self {
            canvas: config.canvas,
            size: config.size,
            crop: config.crop,
            border: config.border,
            scale: config.scale,
            rotate: config.rotate,
            depth: config.depth,
            visible: true,
            disposed: false,
            dirty: true,
            uniforms: Vec::new(),
            shader: LoadState::Ready(shader),
            program: None,
            compile_failures: 0,
            source: None,
            slot: TextureSlot::default(),
            texture: None,
            slice_geometry: None,
            quad_geometry: None,
            indices: None,
            targets: None,
        })
    }

    /// Compile from `pending` once it resolves instead of the configured shader.
    pub fn with_shader_loading(mut self, pending: Pending<ShaderSource>) -> Self {
        self.shader = LoadState::loading(pending);
        self
    }

    /// Draw with an index buffer owned elsewhere (one per scene).
    pub fn with_shared_indices(mut self, indices: Rc<IndexBuffer<G>>) -> Self {
        self.indices = Some(indices);
        self
    }

    /// Allocate the two offscreen targets. Calling it again is a no-op.
    pub fn initialize(&mut self, gl: &G) -> Result<(), EngineError> {
        if self.disposed {
            return Err(EngineError::Disposed);
        }
        if self.targets.is_none() {
            let (w, h) = self.canvas;
            self.targets = Some(PingPongTarget::new(gl, w as i32, h as i32)?);
            tracing::debug!(width = w, height = h, "sprite targets allocated");
        }
        Ok(())
    }

    // ---- state ----

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    pub fn set_visible(&mut self, visible: bool) {
        self.visible = visible;
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed
    }

    pub fn is_drawable(&self) -> bool {
        self.visible && !self.disposed
    }

    /// Whether the vertex buffers will be rebuilt on the next draw.
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn has_program(&self) -> bool {
        self.program.is_some()
    }

    pub fn texture(&self) -> Option<&Texture<G>> {
        self.texture.as_ref()
    }

    pub fn canvas(&self) -> (u32, u32) {
        self.canvas
    }

    pub fn size(&self) -> Size {
        self.size
    }

    pub fn crop(&self) -> Crop {
        self.crop
    }

    pub fn border(&self) -> Border {
        self.border
    }

    pub fn scale(&self) -> Scale {
        self.scale
    }

    pub fn rotate(&self) -> Rotate {
        self.rotate
    }

    pub fn depth(&self) -> f32 {
        self.depth
    }

    // ---- geometry setters (mark the vertex buffers dirty) ----

    pub fn set_size(&mut self, size: Size) {
        self.size = size;
        self.dirty = true;
    }

    pub fn set_crop(&mut self, crop: Crop) {
        self.crop = crop;
        self.dirty = true;
    }

    pub fn set_border(&mut self, border: Border) -> Result<(), EngineError> {
        border
            .validate()
            .map_err(|e| EngineError::invalid_sprite(e.to_string()))?;
        self.border = border;
        self.dirty = true;
        Ok(())
    }

    /// `[left, top, right, bottom]`; any other count is rejected.
    pub fn set_border_values(&mut self, values: &[f32]) -> Result<(), EngineError> {
        let border =
            Border::from_slice(values).map_err(|e| EngineError::invalid_sprite(e.to_string()))?;
        self.set_border(border)
    }

    /// Called every tick by scenes; only a changed value dirties the geometry.
    pub fn set_scale(&mut self, scale: Scale) {
        if self.scale != scale {
            self.scale = scale;
            self.dirty = true;
        }
    }

    pub fn set_depth(&mut self, depth: f32) {
        if self.depth != depth {
            self.depth = depth;
            self.dirty = true;
        }
    }

    /// Rotation is a uniform only; the vertex buffers stay as they are.
    pub fn set_rotate(&mut self, rotate: Rotate) {
        self.rotate = rotate;
    }

    /// Resize the offscreen targets and relayout against the new canvas.
    pub fn resize_canvas(&mut self, gl: &G, width: u32, height: u32) {
        self.canvas = (width.max(1), height.max(1));
        if let Some(t) = self.targets.as_mut() {
            t.resize(gl, self.canvas.0 as i32, self.canvas.1 as i32);
        }
        self.dirty = true;
    }

    // ---- per-frame inputs ----

    /// Dynamic uniforms applied after the base set, in order, on every draw.
    pub fn set_uniforms(&mut self, uniforms: Vec<UniformEntry>) {
        self.uniforms = uniforms;
    }

    pub fn uniforms(&self) -> &[UniformEntry] {
        &self.uniforms
    }

    /// Replace the source image; uploaded on the next draw.
    pub fn update_texture(&mut self, image: ImageSource) {
        if self.disposed {
            tracing::debug!("image delivered to disposed sprite; dropped");
            return;
        }
        self.source = Some(image);
    }

    /// Handle for delivering images from another thread.
    pub fn texture_slot(&self) -> TextureSlot {
        self.slot.clone()
    }

    // ---- draw ----

    fn slice_layout(&self) -> SliceLayout {
        SliceLayout {
            canvas: (self.canvas.0 as f32, self.canvas.1 as f32),
            size: self.size,
            scale: self.scale,
            depth: self.depth,
            crop: self.crop,
            border: self.border,
        }
    }

    fn ensure_program(&mut self, gl: &G) -> Result<(), DrawOutcome> {
        if self.program.is_some() {
            return Ok(());
        }
        self.shader.poll();
        let Some(source) = self.shader.ready() else {
            return Err(if self.shader.is_loading() {
                DrawOutcome::ShaderPending
            } else {
                DrawOutcome::ShaderUnavailable
            });
        };
        match ShaderProgram::new(gl, source) {
            Ok(p) => {
                if self.compile_failures > 0 {
                    tracing::info!(attempts = self.compile_failures + 1, "sprite shader compiled");
                }
                self.compile_failures = 0;
                self.program = Some(p);
                Ok(())
            }
            Err(e) => {
                self.compile_failures += 1;
                if self.compile_failures == 1 {
                    tracing::warn!(
                        origin = source.origin.as_deref().unwrap_or("?"),
                        error = %e,
                        "sprite shader failed; retrying every frame"
                    );
                } else {
                    tracing::debug!(attempt = self.compile_failures, error = %e, "sprite shader still failing");
                }
                Err(DrawOutcome::ShaderUnavailable)
            }
        }
    }

    fn ensure_texture(&mut self, gl: &G) -> Result<(), DrawOutcome> {
        if let Some(img) = self.slot.take() {
            self.source = Some(img);
        }
        if self.texture.is_none() {
            if self.source.is_none() {
                return Err(DrawOutcome::NoTexture);
            }
            match Texture::new(gl) {
                Ok(t) => self.texture = Some(t),
                Err(e) => {
                    tracing::warn!(error = %e, "sprite texture unavailable");
                    return Err(DrawOutcome::NoTexture);
                }
            }
        }
        let Some(texture) = self.texture.as_mut() else {
            return Err(DrawOutcome::NoTexture);
        };
        let src = self.source.take();
        match texture.update_source(gl, src.as_ref()) {
            Ok(upload) => {
                tracing::trace!(?upload, "sprite texture update");
                Ok(())
            }
            Err(e) => {
                tracing::warn!(error = %e, "sprite texture upload failed");
                Err(DrawOutcome::NoTexture)
            }
        }
    }

    fn ensure_geometry(&mut self, gl: &G) -> Result<(), EngineError> {
        let Some(program) = self.program.as_ref() else {
            return Err(EngineError::other("geometry needs a linked program"));
        };
        if self.indices.is_none() {
            self.indices = Some(Rc::new(IndexBuffer::nine_slice(gl, 1)?));
        }
        if self.quad_geometry.is_none() {
            self.quad_geometry = Some(GeometryBuffers::upload(gl, program, &full_canvas_mesh())?);
        }
        if self.dirty || self.slice_geometry.is_none() {
            let mesh = build_mesh(&self.slice_layout());
            let fresh = GeometryBuffers::upload(gl, program, &mesh)?;
            if let Some(mut old) = self.slice_geometry.replace(fresh) {
                old.destroy(gl);
            }
            self.dirty = false;
        }
        Ok(())
    }

    /// Render this sprite for the current frame.
    ///
    /// Never fails: anything not ready yet makes the sprite contribute nothing this frame,
    /// reported through the returned [`DrawOutcome`].
    pub fn draw(&mut self, gl: &G) -> DrawOutcome {
        if !self.is_drawable() {
            return DrawOutcome::NotDrawable;
        }

        if !self.crop.is_resolved() {
            self.crop.resolve_from(&self.size);
            self.dirty = true;
        }

        if let Err(outcome) = self.ensure_program(gl) {
            return outcome;
        }
        if let Err(outcome) = self.ensure_texture(gl) {
            return outcome;
        }
        if self.targets.is_none() {
            tracing::debug!("sprite drawn before initialize(); skipping frame");
            return DrawOutcome::Aborted(Pass::Layout);
        }
        if let Err(e) = self.ensure_geometry(gl) {
            tracing::warn!(error = %e, "sprite geometry unavailable");
            return DrawOutcome::Aborted(Pass::Layout);
        }

        let (
            Some(program),
            Some(texture),
            Some(targets),
            Some(slice),
            Some(quad),
            Some(indices),
        ) = (
            self.program.as_mut(),
            self.texture.as_ref(),
            self.targets.as_mut(),
            self.slice_geometry.as_ref(),
            self.quad_geometry.as_ref(),
            self.indices.as_deref(),
        )
        else {
            return DrawOutcome::Aborted(Pass::Layout);
        };

        program.use_program(gl);
        program.apply(gl, &UniformEntry::int(names::U_SAMPLER, names::SAMPLER_UNIT));
        program.apply(gl, &UniformEntry::vec(names::U_SCALE, &self.scale.to_array()));
        program.apply(gl, &UniformEntry::vec(names::U_ROTATION, &self.rotate.to_array()));
        program.apply(
            gl,
            &UniformEntry::vec(names::U_TEXTURE_SIZE, &[self.size.width, self.size.height]),
        );
        program.apply_all(gl, &self.uniforms);

        let mut outcome = DrawOutcome::Drawn;
        targets.reset();
        for pass in Pass::ALL {
            program.apply(gl, &UniformEntry::int(names::U_NTH_PASS, pass.index()));

            let offscreen = pass.target_slot().is_some();
            if offscreen {
                let target = targets.next_target();
                if let Err(e) = target.bind(gl) {
                    tracing::debug!(?pass, error = %e, "pass target unavailable; skipping rest of frame");
                    outcome = DrawOutcome::Aborted(pass);
                    break;
                }
                target.clear(gl);
            } else {
                gl.bind_framebuffer(None);
                gl.viewport(0, 0, self.canvas.0 as i32, self.canvas.1 as i32);
            }

            if pass.uses_slice_geometry() {
                texture.bind(gl);
                slice.draw(gl, indices, INDICES_PER_SPRITE as i32);
            } else {
                targets.prev_texture().bind(gl);
                quad.draw(gl, indices, QUAD_INDICES.len() as i32);
            }

            if offscreen {
                targets.swap();
            }
        }

        gl.bind_texture(None);
        gl.bind_framebuffer(None);
        gl.use_program(None);
        outcome
    }

    /// Release every GPU object and close the texture slot. Idempotent.
    ///
    /// A shared index buffer is only deleted by its last owner.
    pub fn dispose(&mut self, gl: &G) {
        if self.disposed {
            return;
        }
        self.disposed = true;
        self.slot.close();
        self.source = None;

        if let Some(mut p) = self.program.take() {
            p.destroy(gl);
        }
        if let Some(mut t) = self.texture.take() {
            t.dispose(gl);
        }
        for mut geo in [self.slice_geometry.take(), self.quad_geometry.take()]
            .into_iter()
            .flatten()
        {
            geo.destroy(gl);
        }
        if let Some(ib) = self.indices.take() {
            if let Ok(mut ib) = Rc::try_unwrap(ib) {
                ib.destroy(gl);
            }
        }
        if let Some(mut t) = self.targets.take() {
            t.dispose(gl);
        }
        tracing::debug!("sprite disposed");
    }
}
