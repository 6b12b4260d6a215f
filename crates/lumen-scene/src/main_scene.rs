use std::fmt;
use std::path::Path;
use std::rc::Rc;

use lumen_core::{EngineError, ImageSource, Pending, PendingPoll, PlaygroundConfig, ShaderPaths};
use lumen_geometry::{Crop, Rotate, Scale, Size};
use lumen_input_camera::{Camera, MediaDevices, OpenOutcome};
use lumen_passes::{DrawOutcome, Sprite, SpriteConfig};
use lumen_runtime::ParamSource;
use lumen_runtime_glow::{IndexBuffer, RenderContext, ShaderSource};

use crate::image_file::load_image_async;
use crate::Drawable;

/// Depth of the full-canvas background sprite; the camera sprite sits in front at 0.
pub const BACK_DEPTH: f32 = 0.0001;
pub const FRONT_DEPTH: f32 = 0.0;

/// The playground scene: a static background sprite covering the canvas and a camera
/// sprite in its centre.
///
/// While the camera pipeline is available the camera sprite is shown and receives the
/// effect parameters; otherwise the scene falls back to the background sprite.
pub struct MainScene<G: RenderContext> {
    canvas: (u32, u32),
    back: Sprite<G>,
    front: Sprite<G>,
    background: Option<Pending<ImageSource>>,
    camera: Camera,
    params: Box<dyn ParamSource>,
    last: [DrawOutcome; 2],
}

impl<G: RenderContext> fmt::Debug for MainScene<G> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MainScene")
            .field("canvas", &self.canvas)
            .field("background_loading", &self.background.is_some())
            .field("camera", &self.camera)
            .field("last", &self.last)
            .finish()
    }
}

fn shader_pair(paths: &ShaderPaths) -> Option<(&Path, &Path)> {
    match (paths.vertex.as_deref(), paths.fragment.as_deref()) {
        (Some(v), Some(f)) => Some((v, f)),
        (None, None) => None,
        _ => {
            tracing::warn!("only one shader path configured; using the built-in pair");
            None
        }
    }
}

/// `(back, front)` destinations for a `w`x`h` canvas.
fn layout(w: u32, h: u32) -> (Size, Size) {
    let (wf, hf) = (w as f32, h as f32);
    (
        Size::new(0.0, 0.0, wf, hf),
        Size::new(wf / 4.0, hf / 4.0, wf / 2.0, hf / 2.0),
    )
}

impl<G: RenderContext> MainScene<G> {
    pub fn new(
        gl: &G,
        config: &PlaygroundConfig,
        params: Box<dyn ParamSource>,
    ) -> Result<Self, EngineError> {
        let (w, h) = (config.canvas.width, config.canvas.height);
        let (back_size, front_size) = layout(w, h);

        let camera = Camera::new(config.camera.clone()).map_err(|e| EngineError::other(e.to_string()))?;

        let back_cfg = SpriteConfig::new((w, h), back_size).depth(BACK_DEPTH);
        let front_cfg = SpriteConfig::new((w, h), front_size).depth(FRONT_DEPTH);
        let mut back = Sprite::new(back_cfg)?;
        let mut front = Sprite::new(front_cfg)?;

        if let Some((vs, fs)) = shader_pair(&config.shaders) {
            back = back.with_shader_loading(ShaderSource::load_async(vs, fs));
            front = front.with_shader_loading(ShaderSource::load_async(vs, fs));
        }

        let indices = Rc::new(IndexBuffer::nine_slice(gl, 1)?);
        let mut back = back.with_shared_indices(Rc::clone(&indices));
        let mut front = front.with_shared_indices(indices);
        if let Err(e) = back.initialize(gl).and_then(|()| front.initialize(gl)) {
            back.dispose(gl);
            front.dispose(gl);
            return Err(e);
        }
        front.set_visible(false);

        let background = config.background_image.as_deref().map(load_image_async);
        tracing::info!(width = w, height = h, "main scene ready");

        Ok(Self {
            canvas: (w, h),
            back,
            front,
            background,
            camera,
            params,
            last: [DrawOutcome::NotDrawable; 2],
        })
    }

    /// Replace the background image load.
    pub fn with_background(mut self, pending: Pending<ImageSource>) -> Self {
        self.background = Some(pending);
        self
    }

    /// Open the camera. On failure the scene keeps showing the background sprite.
    pub fn open_camera(&mut self, devices: &mut dyn MediaDevices) -> OpenOutcome {
        let outcome = self.camera.open(devices);
        if let Some(reason) = outcome.reason() {
            tracing::info!(%reason, "camera unavailable; showing background");
        }
        outcome
    }

    pub fn canvas(&self) -> (u32, u32) {
        self.canvas
    }

    pub fn back(&self) -> &Sprite<G> {
        &self.back
    }

    pub fn front(&self) -> &Sprite<G> {
        &self.front
    }

    pub fn camera(&self) -> &Camera {
        &self.camera
    }

    /// True when the camera sprite is the one being shown and edited.
    pub fn is_camera_active(&self) -> bool {
        self.front.is_visible()
    }

    /// Outcomes of the last `on_draw`, `[back, front]`.
    pub fn last_outcomes(&self) -> [DrawOutcome; 2] {
        self.last
    }

    fn poll_background(&mut self) {
        let polled = match self.background.as_ref() {
            Some(p) => p.poll(),
            None => return,
        };
        match polled {
            PendingPoll::NotReady => {}
            PendingPoll::Done(Ok(img)) => {
                tracing::info!(width = img.width(), height = img.height(), "background image loaded");
                self.back.update_texture(img);
                self.background = None;
            }
            PendingPoll::Done(Err(e)) => {
                tracing::warn!(error = %e, "background image failed to load");
                self.background = None;
            }
        }
    }

    fn pull_camera_frame(&mut self) {
        let available = self.camera.is_available();
        if available != self.front.is_visible() {
            tracing::info!(camera = available, "switching active sprite");
            self.front.set_visible(available);
        }
        if available {
            if let Some(bitmap) = self.camera.consume_frame_as_bitmap() {
                self.front.update_texture(bitmap);
            }
        }
    }
}

impl<G: RenderContext> Drawable<G> for MainScene<G> {
    fn on_begin_draw(&mut self, _gl: &G) {
        self.poll_background();
        self.pull_camera_frame();
    }

    fn on_draw(&mut self, gl: &G) {
        let p = self.params.snapshot();
        let active = if self.front.is_visible() {
            &mut self.front
        } else {
            &mut self.back
        };
        active.set_rotate(Rotate {
            x: p.rotation.x,
            y: p.rotation.y,
            z: p.rotation.z,
        });
        active.set_scale(Scale {
            x: p.scale.x,
            y: p.scale.y,
            z: p.scale.z,
        });
        active.set_uniforms(p.to_uniforms());

        self.last = [self.back.draw(gl), self.front.draw(gl)];
        tracing::trace!(back = ?self.last[0], front = ?self.last[1], "scene drawn");
    }

    fn on_resize(&mut self, gl: &G, width: u32, height: u32) {
        self.canvas = (width, height);
        let (back_size, front_size) = layout(width, height);
        for (sprite, size) in [(&mut self.back, back_size), (&mut self.front, front_size)] {
            sprite.resize_canvas(gl, width, height);
            sprite.set_size(size);
            sprite.set_crop(Crop::default());
        }
        tracing::info!(width, height, "main scene resized");
    }

    fn dispose(&mut self, gl: &G) {
        self.camera.close();
        self.background = None;
        self.back.dispose(gl);
        self.front.dispose(gl);
        tracing::info!("main scene disposed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lumen_core::config::{OutputFormat, StreamFormat};
    use lumen_core::PipelineMode;
    use lumen_input_camera::{FailureReason, PermissionState, SyntheticDevices};
    use lumen_runtime::{EffectParams, StaticParams, UniformValue};
    use lumen_runtime_glow::testing::{Call, RecordingGl};
    use std::time::{Duration, Instant};

    fn config() -> PlaygroundConfig {
        let mut c = PlaygroundConfig::default();
        c.canvas.width = 64;
        c.canvas.height = 64;
        c.camera.video.input = StreamFormat {
            width: 8,
            height: 8,
            frame_rate: 30,
        };
        c.camera.video.output = OutputFormat {
            width: 8,
            height: 8,
        };
        c.camera.mode = PipelineMode::Direct;
        c
    }

    fn params() -> Box<dyn ParamSource> {
        Box::new(StaticParams(EffectParams {
            effect_type: 2,
            ..EffectParams::default()
        }))
    }

    fn scene(gl: &RecordingGl) -> MainScene<RecordingGl> {
        MainScene::new(gl, &config(), params())
            .unwrap()
            .with_background(Pending::resolved(
                "bg",
                Ok(ImageSource::solid(16, 16, [0, 0, 255, 255])),
            ))
    }

    fn tick(scene: &mut MainScene<RecordingGl>, gl: &RecordingGl) {
        scene.on_begin_draw(gl);
        scene.on_draw(gl);
        scene.on_end_draw(gl);
    }

    fn wait_until(mut cond: impl FnMut() -> bool) -> bool {
        let deadline = Instant::now() + Duration::from_secs(5);
        while Instant::now() < deadline {
            if cond() {
                return true;
            }
            std::thread::sleep(Duration::from_millis(2));
        }
        false
    }

    #[test]
    fn sprites_are_laid_out_back_full_front_centred() {
        let gl = RecordingGl::new();
        let s = scene(&gl);
        assert_eq!(s.back().size(), Size::new(0.0, 0.0, 64.0, 64.0));
        assert_eq!(s.front().size(), Size::new(16.0, 16.0, 32.0, 32.0));
        assert_eq!(s.back().depth(), BACK_DEPTH);
        assert_eq!(s.front().depth(), FRONT_DEPTH);
        assert!(!s.is_camera_active());
    }

    #[test]
    fn without_camera_background_gets_the_params() {
        let gl = RecordingGl::new();
        let mut s = scene(&gl);
        tick(&mut s, &gl);

        assert_eq!(s.last_outcomes(), [DrawOutcome::Drawn, DrawOutcome::NotDrawable]);
        assert_eq!(gl.last_uniform("effectType"), Some(UniformValue::Int(2)));
        assert!(!s.back().uniforms().is_empty());
        assert!(s.front().uniforms().is_empty());
    }

    #[test]
    fn denied_camera_falls_back_to_background() {
        let gl = RecordingGl::new();
        let mut s = scene(&gl);
        let mut dev = SyntheticDevices::new().camera_permission(PermissionState::Denied);
        assert_eq!(
            s.open_camera(&mut dev),
            OpenOutcome::Failed(FailureReason::CameraPermission)
        );
        tick(&mut s, &gl);
        assert!(!s.is_camera_active());
        assert_eq!(s.last_outcomes()[0], DrawOutcome::Drawn);
    }

    #[test]
    fn open_camera_switches_params_to_front_sprite() {
        let gl = RecordingGl::new();
        let mut s = scene(&gl);
        let mut dev = SyntheticDevices::new().interval(Duration::ZERO);
        assert!(s.open_camera(&mut dev).is_success());
        assert!(wait_until(|| s.camera().stats().queued > 0));

        tick(&mut s, &gl);
        assert!(s.is_camera_active());
        assert_eq!(s.last_outcomes(), [DrawOutcome::Drawn, DrawOutcome::Drawn]);
        assert!(!s.front().uniforms().is_empty());
        assert!(s.back().uniforms().is_empty());
        assert_eq!(s.front().texture().map(|t| t.size()), Some((8, 8)));
    }

    #[test]
    fn ended_camera_hands_back_to_background() {
        let gl = RecordingGl::new();
        let mut s = scene(&gl);
        let mut dev = SyntheticDevices::new()
            .frame_limit(1)
            .interval(Duration::ZERO);
        assert!(s.open_camera(&mut dev).is_success());
        assert!(wait_until(|| !s.camera().is_available()));

        tick(&mut s, &gl);
        assert!(!s.is_camera_active());
        assert_eq!(s.last_outcomes()[1], DrawOutcome::NotDrawable);
    }

    #[test]
    fn missing_shader_files_leave_sprites_blank_but_ticking() {
        let gl = RecordingGl::new();
        let mut c = config();
        c.shaders.vertex = Some("/no/such/vs.glsl".into());
        c.shaders.fragment = Some("/no/such/fs.glsl".into());
        let mut s = MainScene::new(&gl, &c, params())
            .unwrap()
            .with_background(Pending::resolved("bg", Ok(ImageSource::solid(4, 4, [1, 2, 3, 4]))));

        assert!(wait_until(|| {
            tick(&mut s, &gl);
            s.last_outcomes()[0] == DrawOutcome::ShaderUnavailable
        }));
        assert!(gl.draws().is_empty());
    }

    #[test]
    fn resize_reallocates_targets_and_relayouts_sprites() {
        let gl = RecordingGl::new();
        let mut s = scene(&gl);
        tick(&mut s, &gl);
        assert_eq!(s.last_outcomes()[0], DrawOutcome::Drawn);
        let live = gl.live_total();
        gl.clear_calls();

        s.on_resize(&gl, 128, 96);
        let reallocated = gl.count(|c| {
            matches!(
                c,
                Call::TexImage { width: 128, height: 96, with_pixels: false, .. }
            )
        });
        assert_eq!(reallocated, 4);
        assert_eq!(s.canvas(), (128, 96));
        assert_eq!(s.back().canvas(), (128, 96));
        assert_eq!(s.back().size(), Size::new(0.0, 0.0, 128.0, 96.0));
        assert_eq!(s.front().size(), Size::new(32.0, 24.0, 64.0, 48.0));
        assert!(s.back().is_dirty());

        tick(&mut s, &gl);
        assert_eq!(s.last_outcomes()[0], DrawOutcome::Drawn);
        assert_eq!(s.back().crop(), Crop::new(0.0, 0.0, 128.0, 96.0));
        assert!(gl.calls().contains(&Call::Viewport(0, 0, 128, 96)));
        assert_eq!(gl.live_total(), live);
        s.dispose(&gl);
    }

    #[test]
    fn dispose_releases_every_gpu_object() {
        let gl = RecordingGl::new();
        let mut s = scene(&gl);
        let mut dev = SyntheticDevices::new()
            .frame_limit(2)
            .interval(Duration::ZERO);
        s.open_camera(&mut dev);
        tick(&mut s, &gl);
        tick(&mut s, &gl);

        s.dispose(&gl);
        assert_eq!(gl.live_total(), 0);
        assert!(!s.camera().is_open());
    }
}
