use lumen_runtime_glow::RenderContext;

use crate::Drawable;

/// Tick driver: owns the drawables and runs begin-all, draw-all, end-all.
pub struct Graphics<G: RenderContext> {
    width: u32,
    height: u32,
    drawables: Vec<Box<dyn Drawable<G>>>,
    ticks: u64,
}

impl<G: RenderContext> std::fmt::Debug for Graphics<G> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Graphics")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("drawables", &self.drawables.len())
            .field("ticks", &self.ticks)
            .finish()
    }
}

impl<G: RenderContext> Graphics<G> {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width: width.max(1),
            height: height.max(1),
            drawables: Vec::new(),
            ticks: 0,
        }
    }

    /// Viewport plus the fixed-function state every sprite relies on: alpha blending and
    /// `LEQUAL` depth testing.
    pub fn init(&self, gl: &G) {
        gl.viewport(0, 0, self.width as i32, self.height as i32);
        gl.enable(glow::BLEND);
        gl.blend_func(glow::SRC_ALPHA, glow::ONE_MINUS_SRC_ALPHA);
        gl.enable(glow::DEPTH_TEST);
        gl.depth_func(glow::LEQUAL);
        tracing::info!(width = self.width, height = self.height, "graphics initialized");
    }

    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// New viewport, forwarded to every drawable in registration order.
    pub fn resize(&mut self, gl: &G, width: u32, height: u32) {
        let (w, h) = (width.max(1), height.max(1));
        if (w, h) == (self.width, self.height) {
            return;
        }
        self.width = w;
        self.height = h;
        gl.viewport(0, 0, w as i32, h as i32);
        for d in self.drawables.iter_mut() {
            d.on_resize(gl, w, h);
        }
        tracing::debug!(width = w, height = h, "graphics resized");
    }

    pub fn push(&mut self, drawable: Box<dyn Drawable<G>>) {
        self.drawables.push(drawable);
    }

    pub fn len(&self) -> usize {
        self.drawables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.drawables.is_empty()
    }

    /// Ticks rendered so far.
    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    /// Run one tick.
    pub fn render(&mut self, gl: &G) {
        for d in self.drawables.iter_mut() {
            d.on_begin_draw(gl);
        }
        for d in self.drawables.iter_mut() {
            d.on_draw(gl);
        }
        for d in self.drawables.iter_mut() {
            d.on_end_draw(gl);
        }
        gl.flush();
        self.ticks += 1;
        tracing::trace!(tick = self.ticks, "frame rendered");
    }

    /// Dispose and drop every drawable.
    pub fn dispose(&mut self, gl: &G) {
        for mut d in self.drawables.drain(..) {
            d.dispose(gl);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lumen_runtime_glow::testing::{Call, RecordingGl};
    use std::cell::RefCell;
    use std::rc::Rc;

    type Log = Rc<RefCell<Vec<String>>>;

    struct Recorder {
        id: usize,
        log: Log,
    }

    impl Drawable<RecordingGl> for Recorder {
        fn on_begin_draw(&mut self, _gl: &RecordingGl) {
            self.log.borrow_mut().push(format!("begin{}", self.id));
        }
        fn on_draw(&mut self, _gl: &RecordingGl) {
            self.log.borrow_mut().push(format!("draw{}", self.id));
        }
        fn on_end_draw(&mut self, _gl: &RecordingGl) {
            self.log.borrow_mut().push(format!("end{}", self.id));
        }
        fn dispose(&mut self, _gl: &RecordingGl) {
            self.log.borrow_mut().push(format!("dispose{}", self.id));
        }
        fn on_resize(&mut self, _gl: &RecordingGl, width: u32, height: u32) {
            self.log
                .borrow_mut()
                .push(format!("resize{}:{width}x{height}", self.id));
        }
    }

    fn with_recorders(n: usize) -> (Graphics<RecordingGl>, Log) {
        let log: Log = Rc::default();
        let mut g = Graphics::new(64, 32);
        for id in 0..n {
            g.push(Box::new(Recorder {
                id,
                log: Rc::clone(&log),
            }));
        }
        (g, log)
    }

    #[test]
    fn init_sets_viewport_blend_and_depth() {
        let gl = RecordingGl::new();
        Graphics::<RecordingGl>::new(64, 32).init(&gl);
        assert_eq!(
            gl.calls(),
            vec![
                Call::Viewport(0, 0, 64, 32),
                Call::Enable(glow::BLEND),
                Call::BlendFunc(glow::SRC_ALPHA, glow::ONE_MINUS_SRC_ALPHA),
                Call::Enable(glow::DEPTH_TEST),
                Call::DepthFunc(glow::LEQUAL),
            ]
        );
    }

    #[test]
    fn phases_run_across_all_drawables_then_flush() {
        let gl = RecordingGl::new();
        let (mut g, log) = with_recorders(3);
        g.render(&gl);
        assert_eq!(
            *log.borrow(),
            ["begin0", "begin1", "begin2", "draw0", "draw1", "draw2", "end0", "end1", "end2"]
        );
        assert_eq!(gl.calls().last(), Some(&Call::Flush));
        assert_eq!(g.ticks(), 1);
    }

    #[test]
    fn dispose_reaches_every_drawable_once() {
        let gl = RecordingGl::new();
        let (mut g, log) = with_recorders(2);
        g.dispose(&gl);
        g.dispose(&gl);
        assert_eq!(*log.borrow(), ["dispose0", "dispose1"]);
        assert!(g.is_empty());
    }

    #[test]
    fn resize_updates_viewport_and_reaches_every_drawable() {
        let gl = RecordingGl::new();
        let (mut g, log) = with_recorders(2);
        g.resize(&gl, 128, 0);
        assert_eq!(g.size(), (128, 1));
        assert_eq!(gl.calls(), vec![Call::Viewport(0, 0, 128, 1)]);
        assert_eq!(*log.borrow(), ["resize0:128x1", "resize1:128x1"]);

        // same size again is a no-op
        g.resize(&gl, 128, 1);
        assert_eq!(log.borrow().len(), 2);
    }

    #[test]
    fn empty_driver_still_flushes() {
        let gl = RecordingGl::new();
        let mut g = Graphics::<RecordingGl>::new(0, 0);
        assert_eq!(g.size(), (1, 1));
        g.render(&gl);
        assert_eq!(gl.calls(), vec![Call::Flush]);
    }
}
