use lumen_runtime_glow::{EngineError, FrameBufferTarget, RenderContext, Texture};

/// A pair of offscreen targets that alternate between "written" and "sampled".
///
/// Semantics:
/// - `prev_texture()` is the texture you sample from (output of the last pass)
/// - `next_target()` is the target you render into for the current pass
/// - after each offscreen pass, call `swap()`
/// - `reset()` at the start of a frame makes target A the first one written
#[derive(Debug)]
pub struct PingPongTarget<G: RenderContext> {
    a: FrameBufferTarget<G>,
    b: FrameBufferTarget<G>,
    a_is_prev: bool,
    width: i32,
    height: i32,
}

impl<G: RenderContext> PingPongTarget<G> {
    pub fn new(gl: &G, width: i32, height: i32) -> Result<Self, EngineError> {
        let a = FrameBufferTarget::new(gl, width, height, true)?;
        let b = match FrameBufferTarget::new(gl, width, height, true) {
            Ok(b) => b,
            Err(e) => {
                let mut a = a;
                a.dispose(gl);
                return Err(e);
            }
        };

        let pp = Self {
            width: a.size().0,
            height: a.size().1,
            a,
            b,
            a_is_prev: false,
        };
        // avoid undefined sampling before the first full frame
        pp.clear_both(gl);
        Ok(pp)
    }

    fn clear_both(&self, gl: &G) {
        for rt in [&self.a, &self.b] {
            if rt.bind(gl).is_ok() {
                rt.clear(gl);
            }
        }
        gl.bind_framebuffer(None);
    }

    pub fn size(&self) -> (i32, i32) {
        (self.width, self.height)
    }

    /// Texture written by the most recent pass.
    pub fn prev_texture(&self) -> &Texture<G> {
        if self.a_is_prev {
            self.a.color_texture()
        } else {
            self.b.color_texture()
        }
    }

    /// Target the next pass renders into.
    pub fn next_target(&self) -> &FrameBufferTarget<G> {
        if self.a_is_prev {
            &self.b
        } else {
            &self.a
        }
    }

    pub fn swap(&mut self) {
        self.a_is_prev = !self.a_is_prev;
    }

    pub fn reset(&mut self) {
        self.a_is_prev = false;
    }

    /// Reallocate both targets at a new size (cleared to transparent).
    pub fn resize(&mut self, gl: &G, width: i32, height: i32) {
        self.a.resize(gl, width, height);
        self.b.resize(gl, width, height);
        (self.width, self.height) = self.a.size();
        self.reset();
        self.clear_both(gl);
    }

    pub fn is_disposed(&self) -> bool {
        self.a.is_disposed() && self.b.is_disposed()
    }

    pub fn dispose(&mut self, gl: &G) {
        self.a.dispose(gl);
        self.b.dispose(gl);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lumen_runtime_glow::testing::{Call, ObjectKind, RecordingGl};

    #[test]
    fn new_pair_starts_writing_into_a() {
        let gl = RecordingGl::new();
        let mut pp = PingPongTarget::new(&gl, 64, 32).unwrap();
        let a_tex = pp.a.color_texture().handle();
        let b_tex = pp.b.color_texture().handle();

        assert_eq!(pp.next_target().color_texture().handle(), a_tex);
        pp.swap();
        assert_eq!(pp.prev_texture().handle(), a_tex);
        assert_eq!(pp.next_target().color_texture().handle(), b_tex);
        pp.swap();
        assert_eq!(pp.prev_texture().handle(), b_tex);
        pp.reset();
        assert_eq!(pp.next_target().color_texture().handle(), a_tex);
    }

    #[test]
    fn creation_clears_both_targets_and_unbinds() {
        let gl = RecordingGl::new();
        let _pp = PingPongTarget::new(&gl, 16, 16).unwrap();
        assert_eq!(gl.count(|c| matches!(c, Call::Clear(_))), 2);
        assert_eq!(gl.bound_framebuffer(), None);
    }

    #[test]
    fn dispose_releases_both_targets() {
        let gl = RecordingGl::new();
        let mut pp = PingPongTarget::new(&gl, 16, 16).unwrap();
        assert_eq!(gl.live_count(ObjectKind::Framebuffer), 2);
        pp.dispose(&gl);
        assert!(pp.is_disposed());
        assert_eq!(gl.live_total(), 0);
    }

    #[test]
    fn resize_keeps_objects() {
        let gl = RecordingGl::new();
        let mut pp = PingPongTarget::new(&gl, 16, 16).unwrap();
        let before = gl.live_total();
        pp.resize(&gl, 128, 64);
        assert_eq!(pp.size(), (128, 64));
        assert_eq!(gl.live_total(), before);
    }
}
