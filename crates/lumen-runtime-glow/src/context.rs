//! The render context every GL call goes through.
//!
//! All compositor code is written against [`RenderContext`] and receives the context as an
//! explicit argument. The `glow::Context` implementation forwards to the driver; tests use
//! [`crate::testing::RecordingGl`].

use std::fmt::Debug;

use glow::HasContext;

/// Narrow view of the GL API used by the compositor.
///
/// Enum arguments (`target`, `pname`, `mask`, ...) are raw GL constants from `glow`.
pub trait RenderContext {
    type Texture: Copy + Eq + Debug;
    type Framebuffer: Copy + Eq + Debug;
    type Renderbuffer: Copy + Eq + Debug;
    type Buffer: Copy + Eq + Debug;
    type VertexArray: Copy + Eq + Debug;
    type Shader: Copy + Eq + Debug;
    type Program: Copy + Eq + Debug;
    type UniformLocation: Clone + Debug;

    // ---- textures ----
    fn create_texture(&self) -> Result<Self::Texture, String>;
    fn delete_texture(&self, texture: Self::Texture);
    fn active_texture(&self, unit: u32);
    fn bind_texture(&self, texture: Option<Self::Texture>);
    fn tex_parameter_i32(&self, pname: u32, value: i32);
    /// Allocate RGBA8 storage for the bound texture, optionally filling it.
    fn tex_image_2d_rgba(&self, width: i32, height: i32, pixels: Option<&[u8]>);
    /// Overwrite a region of the bound texture's existing storage.
    fn tex_sub_image_2d_rgba(&self, x: i32, y: i32, width: i32, height: i32, pixels: &[u8]);

    // ---- framebuffers ----
    fn create_framebuffer(&self) -> Result<Self::Framebuffer, String>;
    fn delete_framebuffer(&self, fbo: Self::Framebuffer);
    fn bind_framebuffer(&self, fbo: Option<Self::Framebuffer>);
    fn framebuffer_color_texture(&self, texture: Option<Self::Texture>);
    fn framebuffer_status(&self) -> u32;
    fn create_renderbuffer(&self) -> Result<Self::Renderbuffer, String>;
    fn delete_renderbuffer(&self, rb: Self::Renderbuffer);
    fn renderbuffer_depth_storage(&self, rb: Self::Renderbuffer, width: i32, height: i32);
    fn framebuffer_depth_renderbuffer(&self, rb: Option<Self::Renderbuffer>);

    // ---- shaders ----
    fn create_shader(&self, kind: u32) -> Result<Self::Shader, String>;
    fn shader_source(&self, shader: Self::Shader, source: &str);
    fn compile_shader(&self, shader: Self::Shader);
    fn shader_compile_status(&self, shader: Self::Shader) -> bool;
    fn shader_info_log(&self, shader: Self::Shader) -> String;
    fn delete_shader(&self, shader: Self::Shader);
    fn create_program(&self) -> Result<Self::Program, String>;
    fn attach_shader(&self, program: Self::Program, shader: Self::Shader);
    fn detach_shader(&self, program: Self::Program, shader: Self::Shader);
    fn link_program(&self, program: Self::Program);
    fn program_link_status(&self, program: Self::Program) -> bool;
    fn program_info_log(&self, program: Self::Program) -> String;
    fn delete_program(&self, program: Self::Program);
    fn use_program(&self, program: Option<Self::Program>);
    fn uniform_location(&self, program: Self::Program, name: &str)
        -> Option<Self::UniformLocation>;
    fn attrib_location(&self, program: Self::Program, name: &str) -> Option<u32>;
    fn uniform_1_i32(&self, location: &Self::UniformLocation, v: i32);
    fn uniform_1_f32(&self, location: &Self::UniformLocation, v: f32);
    fn uniform_2_f32(&self, location: &Self::UniformLocation, v: &[f32]);
    fn uniform_3_f32(&self, location: &Self::UniformLocation, v: &[f32]);
    fn uniform_4_f32(&self, location: &Self::UniformLocation, v: &[f32]);

    // ---- buffers ----
    fn create_buffer(&self) -> Result<Self::Buffer, String>;
    fn delete_buffer(&self, buffer: Self::Buffer);
    fn bind_buffer(&self, target: u32, buffer: Option<Self::Buffer>);
    fn buffer_data(&self, target: u32, bytes: &[u8]);
    fn create_vertex_array(&self) -> Result<Self::VertexArray, String>;
    fn delete_vertex_array(&self, vao: Self::VertexArray);
    fn bind_vertex_array(&self, vao: Option<Self::VertexArray>);
    fn enable_vertex_attrib_array(&self, index: u32);
    /// Tightly packed float attribute with `components` per vertex.
    fn vertex_attrib_pointer_f32(&self, index: u32, components: i32);

    // ---- fixed function / draw ----
    fn viewport(&self, x: i32, y: i32, width: i32, height: i32);
    fn clear_color(&self, r: f32, g: f32, b: f32, a: f32);
    fn clear_depth(&self, depth: f32);
    fn clear(&self, mask: u32);
    fn enable(&self, cap: u32);
    fn blend_func(&self, src: u32, dst: u32);
    fn depth_func(&self, func: u32);
    /// Indexed triangles from the bound element buffer (u16 indices, offset 0).
    fn draw_elements_u16(&self, count: i32);
    fn flush(&self);
}

// -------------------------------------------------------------------------------------------------
// glow backend
// -------------------------------------------------------------------------------------------------

type G = glow::Context;

// SAFETY (all methods below): the caller owns a current GL context for `self`, and every
// handle passed in was created by this same context. The compositor never hands out raw
// handles, so both hold for all calls made through this crate.
impl RenderContext for glow::Context {
    type Texture = <G as HasContext>::Texture;
    type Framebuffer = <G as HasContext>::Framebuffer;
    type Renderbuffer = <G as HasContext>::Renderbuffer;
    type Buffer = <G as HasContext>::Buffer;
    type VertexArray = <G as HasContext>::VertexArray;
    type Shader = <G as HasContext>::Shader;
    type Program = <G as HasContext>::Program;
    type UniformLocation = <G as HasContext>::UniformLocation;

    fn create_texture(&self) -> Result<Self::Texture, String> {
        unsafe { HasContext::create_texture(self) }
    }
    fn delete_texture(&self, texture: Self::Texture) {
        unsafe { HasContext::delete_texture(self, texture) }
    }
    fn active_texture(&self, unit: u32) {
        unsafe { HasContext::active_texture(self, unit) }
    }
    fn bind_texture(&self, texture: Option<Self::Texture>) {
        unsafe { HasContext::bind_texture(self, glow::TEXTURE_2D, texture) }
    }
    fn tex_parameter_i32(&self, pname: u32, value: i32) {
        unsafe { HasContext::tex_parameter_i32(self, glow::TEXTURE_2D, pname, value) }
    }
    fn tex_image_2d_rgba(&self, width: i32, height: i32, pixels: Option<&[u8]>) {
        unsafe {
            HasContext::tex_image_2d(
                self,
                glow::TEXTURE_2D,
                0,
                glow::RGBA8 as i32,
                width,
                height,
                0,
                glow::RGBA,
                glow::UNSIGNED_BYTE,
                pixels,
            )
        }
    }
    fn tex_sub_image_2d_rgba(&self, x: i32, y: i32, width: i32, height: i32, pixels: &[u8]) {
        unsafe {
            HasContext::tex_sub_image_2d(
                self,
                glow::TEXTURE_2D,
                0,
                x,
                y,
                width,
                height,
                glow::RGBA,
                glow::UNSIGNED_BYTE,
                glow::PixelUnpackData::Slice(pixels),
            )
        }
    }

    fn create_framebuffer(&self) -> Result<Self::Framebuffer, String> {
        unsafe { HasContext::create_framebuffer(self) }
    }
    fn delete_framebuffer(&self, fbo: Self::Framebuffer) {
        unsafe { HasContext::delete_framebuffer(self, fbo) }
    }
    fn bind_framebuffer(&self, fbo: Option<Self::Framebuffer>) {
        unsafe { HasContext::bind_framebuffer(self, glow::FRAMEBUFFER, fbo) }
    }
    fn framebuffer_color_texture(&self, texture: Option<Self::Texture>) {
        unsafe {
            HasContext::framebuffer_texture_2d(
                self,
                glow::FRAMEBUFFER,
                glow::COLOR_ATTACHMENT0,
                glow::TEXTURE_2D,
                texture,
                0,
            )
        }
    }
    fn framebuffer_status(&self) -> u32 {
        unsafe { HasContext::check_framebuffer_status(self, glow::FRAMEBUFFER) }
    }
    fn create_renderbuffer(&self) -> Result<Self::Renderbuffer, String> {
        unsafe { HasContext::create_renderbuffer(self) }
    }
    fn delete_renderbuffer(&self, rb: Self::Renderbuffer) {
        unsafe { HasContext::delete_renderbuffer(self, rb) }
    }
    fn renderbuffer_depth_storage(&self, rb: Self::Renderbuffer, width: i32, height: i32) {
        unsafe {
            HasContext::bind_renderbuffer(self, glow::RENDERBUFFER, Some(rb));
            HasContext::renderbuffer_storage(
                self,
                glow::RENDERBUFFER,
                glow::DEPTH_COMPONENT16,
                width,
                height,
            );
            HasContext::bind_renderbuffer(self, glow::RENDERBUFFER, None);
        }
    }
    fn framebuffer_depth_renderbuffer(&self, rb: Option<Self::Renderbuffer>) {
        unsafe {
            HasContext::framebuffer_renderbuffer(
                self,
                glow::FRAMEBUFFER,
                glow::DEPTH_ATTACHMENT,
                glow::RENDERBUFFER,
                rb,
            )
        }
    }

    fn create_shader(&self, kind: u32) -> Result<Self::Shader, String> {
        unsafe { HasContext::create_shader(self, kind) }
    }
    fn shader_source(&self, shader: Self::Shader, source: &str) {
        unsafe { HasContext::shader_source(self, shader, source) }
    }
    fn compile_shader(&self, shader: Self::Shader) {
        unsafe { HasContext::compile_shader(self, shader) }
    }
    fn shader_compile_status(&self, shader: Self::Shader) -> bool {
        unsafe { HasContext::get_shader_compile_status(self, shader) }
    }
    fn shader_info_log(&self, shader: Self::Shader) -> String {
        unsafe { HasContext::get_shader_info_log(self, shader) }
    }
    fn delete_shader(&self, shader: Self::Shader) {
        unsafe { HasContext::delete_shader(self, shader) }
    }
    fn create_program(&self) -> Result<Self::Program, String> {
        unsafe { HasContext::create_program(self) }
    }
    fn attach_shader(&self, program: Self::Program, shader: Self::Shader) {
        unsafe { HasContext::attach_shader(self, program, shader) }
    }
    fn detach_shader(&self, program: Self::Program, shader: Self::Shader) {
        unsafe { HasContext::detach_shader(self, program, shader) }
    }
    fn link_program(&self, program: Self::Program) {
        unsafe { HasContext::link_program(self, program) }
    }
    fn program_link_status(&self, program: Self::Program) -> bool {
        unsafe { HasContext::get_program_link_status(self, program) }
    }
    fn program_info_log(&self, program: Self::Program) -> String {
        unsafe { HasContext::get_program_info_log(self, program) }
    }
    fn delete_program(&self, program: Self::Program) {
        unsafe { HasContext::delete_program(self, program) }
    }
    fn use_program(&self, program: Option<Self::Program>) {
        unsafe { HasContext::use_program(self, program) }
    }
    fn uniform_location(
        &self,
        program: Self::Program,
        name: &str,
    ) -> Option<Self::UniformLocation> {
        unsafe { HasContext::get_uniform_location(self, program, name) }
    }
    fn attrib_location(&self, program: Self::Program, name: &str) -> Option<u32> {
        unsafe { HasContext::get_attrib_location(self, program, name) }
    }
    fn uniform_1_i32(&self, location: &Self::UniformLocation, v: i32) {
        unsafe { HasContext::uniform_1_i32(self, Some(location), v) }
    }
    fn uniform_1_f32(&self, location: &Self::UniformLocation, v: f32) {
        unsafe { HasContext::uniform_1_f32(self, Some(location), v) }
    }
    fn uniform_2_f32(&self, location: &Self::UniformLocation, v: &[f32]) {
        unsafe { HasContext::uniform_2_f32_slice(self, Some(location), v) }
    }
    fn uniform_3_f32(&self, location: &Self::UniformLocation, v: &[f32]) {
        unsafe { HasContext::uniform_3_f32_slice(self, Some(location), v) }
    }
    fn uniform_4_f32(&self, location: &Self::UniformLocation, v: &[f32]) {
        unsafe { HasContext::uniform_4_f32_slice(self, Some(location), v) }
    }

    fn create_buffer(&self) -> Result<Self::Buffer, String> {
        unsafe { HasContext::create_buffer(self) }
    }
    fn delete_buffer(&self, buffer: Self::Buffer) {
        unsafe { HasContext::delete_buffer(self, buffer) }
    }
    fn bind_buffer(&self, target: u32, buffer: Option<Self::Buffer>) {
        unsafe { HasContext::bind_buffer(self, target, buffer) }
    }
    fn buffer_data(&self, target: u32, bytes: &[u8]) {
        unsafe { HasContext::buffer_data_u8_slice(self, target, bytes, glow::STATIC_DRAW) }
    }
    fn create_vertex_array(&self) -> Result<Self::VertexArray, String> {
        unsafe { HasContext::create_vertex_array(self) }
    }
    fn delete_vertex_array(&self, vao: Self::VertexArray) {
        unsafe { HasContext::delete_vertex_array(self, vao) }
    }
    fn bind_vertex_array(&self, vao: Option<Self::VertexArray>) {
        unsafe { HasContext::bind_vertex_array(self, vao) }
    }
    fn enable_vertex_attrib_array(&self, index: u32) {
        unsafe { HasContext::enable_vertex_attrib_array(self, index) }
    }
    fn vertex_attrib_pointer_f32(&self, index: u32, components: i32) {
        unsafe { HasContext::vertex_attrib_pointer_f32(self, index, components, glow::FLOAT, false, 0, 0) }
    }

    fn viewport(&self, x: i32, y: i32, width: i32, height: i32) {
        unsafe { HasContext::viewport(self, x, y, width, height) }
    }
    fn clear_color(&self, r: f32, g: f32, b: f32, a: f32) {
        unsafe { HasContext::clear_color(self, r, g, b, a) }
    }
    fn clear_depth(&self, depth: f32) {
        unsafe { HasContext::clear_depth_f32(self, depth) }
    }
    fn clear(&self, mask: u32) {
        unsafe { HasContext::clear(self, mask) }
    }
    fn enable(&self, cap: u32) {
        unsafe { HasContext::enable(self, cap) }
    }
    fn blend_func(&self, src: u32, dst: u32) {
        unsafe { HasContext::blend_func(self, src, dst) }
    }
    fn depth_func(&self, func: u32) {
        unsafe { HasContext::depth_func(self, func) }
    }
    fn draw_elements_u16(&self, count: i32) {
        unsafe { HasContext::draw_elements(self, glow::TRIANGLES, count, glow::UNSIGNED_SHORT, 0) }
    }
    fn flush(&self) {
        unsafe { HasContext::flush(self) }
    }
}
