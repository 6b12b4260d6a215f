use lumen_runtime_glow::RenderContext;

/// Something the [`crate::Graphics`] driver renders every tick.
///
/// Within one tick every drawable gets `on_begin_draw` before any gets `on_draw`, and
/// `on_draw` before any gets `on_end_draw`. Within a phase, registration order applies.
pub trait Drawable<G: RenderContext> {
    fn on_begin_draw(&mut self, _gl: &G) {}

    fn on_draw(&mut self, gl: &G);

    fn on_end_draw(&mut self, _gl: &G) {}

    /// The canvas changed size; reallocate anything sized to it.
    fn on_resize(&mut self, _gl: &G, _width: u32, _height: u32) {}

    /// Release GPU resources. Called once when the driver is torn down.
    fn dispose(&mut self, _gl: &G) {}
}
