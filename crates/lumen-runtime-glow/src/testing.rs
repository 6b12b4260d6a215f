//! A [`RenderContext`] that records calls instead of talking to a driver.
//!
//! Handles are plain integers. The recorder tracks live objects (for leak checks), the
//! current bindings, and every uniform write by name.

use std::cell::{Cell, RefCell};
use std::collections::{BTreeSet, HashMap, HashSet};

use lumen_runtime::UniformValue;

use crate::context::RenderContext;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ObjectKind {
    Texture,
    Framebuffer,
    Renderbuffer,
    Shader,
    Program,
    Buffer,
    VertexArray,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    Create(ObjectKind, u32),
    Delete(ObjectKind, u32),
    ActiveTexture(u32),
    BindTexture(Option<u32>),
    TexParameter(u32, i32),
    TexImage {
        texture: Option<u32>,
        width: i32,
        height: i32,
        with_pixels: bool,
    },
    TexSubImage {
        texture: Option<u32>,
        width: i32,
        height: i32,
    },
    BindFramebuffer(Option<u32>),
    FramebufferColor(Option<u32>),
    FramebufferDepth(Option<u32>),
    RenderbufferStorage(u32, i32, i32),
    CompileShader(u32),
    LinkProgram(u32),
    UseProgram(Option<u32>),
    Uniform(String, UniformValue),
    BindBuffer(u32, Option<u32>),
    BufferData(u32, Vec<u8>),
    BindVertexArray(Option<u32>),
    EnableAttrib(u32),
    AttribPointer(u32, i32),
    Viewport(i32, i32, i32, i32),
    ClearColor([f32; 4]),
    ClearDepth(f32),
    Clear(u32),
    Enable(u32),
    BlendFunc(u32, u32),
    DepthFunc(u32),
    Draw {
        count: i32,
        framebuffer: Option<u32>,
        texture: Option<u32>,
        program: Option<u32>,
    },
    Flush,
}

/// Recording mock context.
#[derive(Debug, Default)]
pub struct RecordingGl {
    calls: RefCell<Vec<Call>>,
    next_id: Cell<u32>,
    live: RefCell<BTreeSet<(ObjectKind, u32)>>,

    bound_texture: Cell<Option<u32>>,
    bound_framebuffer: Cell<Option<u32>>,
    bound_program: Cell<Option<u32>>,
    active_unit: Cell<u32>,

    /// uniform location -> name
    locations: RefCell<HashMap<u32, String>>,
    /// names that resolve to no location
    missing_uniforms: RefCell<HashSet<String>>,

    /// shader ids of the fragment stage
    fragment_shaders: RefCell<HashSet<u32>>,

    pub fail_vertex_compile: Cell<bool>,
    pub fail_fragment_compile: Cell<bool>,
    pub fail_link: Cell<bool>,
    pub incomplete_framebuffer: Cell<bool>,
    pub fail_texture_create: Cell<bool>,
}

impl RecordingGl {
    pub fn new() -> Self {
        Self::default()
    }

    fn record(&self, c: Call) {
        self.calls.borrow_mut().push(c);
    }

    fn alloc(&self, kind: ObjectKind) -> u32 {
        let id = self.next_id.get() + 1;
        self.next_id.set(id);
        self.live.borrow_mut().insert((kind, id));
        self.record(Call::Create(kind, id));
        id
    }

    fn free(&self, kind: ObjectKind, id: u32) {
        self.live.borrow_mut().remove(&(kind, id));
        self.record(Call::Delete(kind, id));
    }

    // ---- inspection ----

    pub fn calls(&self) -> Vec<Call> {
        self.calls.borrow().clone()
    }

    pub fn clear_calls(&self) {
        self.calls.borrow_mut().clear();
    }

    pub fn count(&self, pred: impl Fn(&Call) -> bool) -> usize {
        self.calls.borrow().iter().filter(|c| pred(c)).count()
    }

    pub fn live_count(&self, kind: ObjectKind) -> usize {
        self.live.borrow().iter().filter(|(k, _)| *k == kind).count()
    }

    pub fn live_total(&self) -> usize {
        self.live.borrow().len()
    }

    pub fn is_live(&self, kind: ObjectKind, id: u32) -> bool {
        self.live.borrow().contains(&(kind, id))
    }

    pub fn bound_texture(&self) -> Option<u32> {
        self.bound_texture.get()
    }

    pub fn bound_framebuffer(&self) -> Option<u32> {
        self.bound_framebuffer.get()
    }

    pub fn bound_program(&self) -> Option<u32> {
        self.bound_program.get()
    }

    /// Every value written to uniform `name`, in order.
    pub fn uniform_writes(&self, name: &str) -> Vec<UniformValue> {
        self.calls
            .borrow()
            .iter()
            .filter_map(|c| match c {
                Call::Uniform(n, v) if n == name => Some(v.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn last_uniform(&self, name: &str) -> Option<UniformValue> {
        self.uniform_writes(name).pop()
    }

    /// Draw calls in order.
    pub fn draws(&self) -> Vec<Call> {
        self.calls
            .borrow()
            .iter()
            .filter(|c| matches!(c, Call::Draw { .. }))
            .cloned()
            .collect()
    }

    /// Data of every `buffer_data` upload to `target`, in order.
    pub fn buffer_uploads(&self, target: u32) -> Vec<Vec<u8>> {
        self.calls
            .borrow()
            .iter()
            .filter_map(|c| match c {
                Call::BufferData(t, bytes) if *t == target => Some(bytes.clone()),
                _ => None,
            })
            .collect()
    }

    /// Make `get_uniform_location(name)` return `None` (optimized-out uniform).
    pub fn hide_uniform(&self, name: &str) {
        self.missing_uniforms.borrow_mut().insert(name.to_string());
    }
}

impl RenderContext for RecordingGl {
    type Texture = u32;
    type Framebuffer = u32;
    type Renderbuffer = u32;
    type Buffer = u32;
    type VertexArray = u32;
    type Shader = u32;
    type Program = u32;
    type UniformLocation = u32;

    fn create_texture(&self) -> Result<u32, String> {
        if self.fail_texture_create.get() {
            return Err("texture allocation refused".into());
        }
        Ok(self.alloc(ObjectKind::Texture))
    }
    fn delete_texture(&self, texture: u32) {
        if self.bound_texture.get() == Some(texture) {
            self.bound_texture.set(None);
        }
        self.free(ObjectKind::Texture, texture);
    }
    fn active_texture(&self, unit: u32) {
        self.active_unit.set(unit);
        self.record(Call::ActiveTexture(unit));
    }
    fn bind_texture(&self, texture: Option<u32>) {
        self.bound_texture.set(texture);
        self.record(Call::BindTexture(texture));
    }
    fn tex_parameter_i32(&self, pname: u32, value: i32) {
        self.record(Call::TexParameter(pname, value));
    }
    fn tex_image_2d_rgba(&self, width: i32, height: i32, pixels: Option<&[u8]>) {
        self.record(Call::TexImage {
            texture: self.bound_texture.get(),
            width,
            height,
            with_pixels: pixels.is_some(),
        });
    }
    fn tex_sub_image_2d_rgba(&self, _x: i32, _y: i32, width: i32, height: i32, _pixels: &[u8]) {
        self.record(Call::TexSubImage {
            texture: self.bound_texture.get(),
            width,
            height,
        });
    }

    fn create_framebuffer(&self) -> Result<u32, String> {
        Ok(self.alloc(ObjectKind::Framebuffer))
    }
    fn delete_framebuffer(&self, fbo: u32) {
        if self.bound_framebuffer.get() == Some(fbo) {
            self.bound_framebuffer.set(None);
        }
        self.free(ObjectKind::Framebuffer, fbo);
    }
    fn bind_framebuffer(&self, fbo: Option<u32>) {
        self.bound_framebuffer.set(fbo);
        self.record(Call::BindFramebuffer(fbo));
    }
    fn framebuffer_color_texture(&self, texture: Option<u32>) {
        self.record(Call::FramebufferColor(texture));
    }
    fn framebuffer_status(&self) -> u32 {
        if self.incomplete_framebuffer.get() {
            glow::FRAMEBUFFER_INCOMPLETE_ATTACHMENT
        } else {
            glow::FRAMEBUFFER_COMPLETE
        }
    }
    fn create_renderbuffer(&self) -> Result<u32, String> {
        Ok(self.alloc(ObjectKind::Renderbuffer))
    }
    fn delete_renderbuffer(&self, rb: u32) {
        self.free(ObjectKind::Renderbuffer, rb);
    }
    fn renderbuffer_depth_storage(&self, rb: u32, width: i32, height: i32) {
        self.record(Call::RenderbufferStorage(rb, width, height));
    }
    fn framebuffer_depth_renderbuffer(&self, rb: Option<u32>) {
        self.record(Call::FramebufferDepth(rb));
    }

    fn create_shader(&self, kind: u32) -> Result<u32, String> {
        let id = self.alloc(ObjectKind::Shader);
        if kind == glow::FRAGMENT_SHADER {
            self.fragment_shaders.borrow_mut().insert(id);
        }
        Ok(id)
    }
    fn shader_source(&self, _shader: u32, _source: &str) {}
    fn compile_shader(&self, shader: u32) {
        self.record(Call::CompileShader(shader));
    }
    fn shader_compile_status(&self, shader: u32) -> bool {
        if self.fragment_shaders.borrow().contains(&shader) {
            !self.fail_fragment_compile.get()
        } else {
            !self.fail_vertex_compile.get()
        }
    }
    fn shader_info_log(&self, shader: u32) -> String {
        format!("0:1: error in shader {shader}")
    }
    fn delete_shader(&self, shader: u32) {
        self.free(ObjectKind::Shader, shader);
    }
    fn create_program(&self) -> Result<u32, String> {
        Ok(self.alloc(ObjectKind::Program))
    }
    fn attach_shader(&self, _program: u32, _shader: u32) {}
    fn detach_shader(&self, _program: u32, _shader: u32) {}
    fn link_program(&self, program: u32) {
        self.record(Call::LinkProgram(program));
    }
    fn program_link_status(&self, _program: u32) -> bool {
        !self.fail_link.get()
    }
    fn program_info_log(&self, program: u32) -> String {
        format!("link failed for program {program}")
    }
    fn delete_program(&self, program: u32) {
        if self.bound_program.get() == Some(program) {
            self.bound_program.set(None);
        }
        self.free(ObjectKind::Program, program);
    }
    fn use_program(&self, program: Option<u32>) {
        self.bound_program.set(program);
        self.record(Call::UseProgram(program));
    }
    fn uniform_location(&self, _program: u32, name: &str) -> Option<u32> {
        if self.missing_uniforms.borrow().contains(name) {
            return None;
        }
        let mut locs = self.locations.borrow_mut();
        if let Some((id, _)) = locs.iter().find(|(_, n)| n.as_str() == name) {
            return Some(*id);
        }
        let id = locs.len() as u32;
        locs.insert(id, name.to_string());
        Some(id)
    }
    fn attrib_location(&self, _program: u32, name: &str) -> Option<u32> {
        match name {
            "position" => Some(0),
            "texCoord" => Some(1),
            _ => None,
        }
    }
    fn uniform_1_i32(&self, location: &u32, v: i32) {
        self.record_uniform(*location, UniformValue::Int(v));
    }
    fn uniform_1_f32(&self, location: &u32, v: f32) {
        self.record_uniform(*location, UniformValue::Float(v));
    }
    fn uniform_2_f32(&self, location: &u32, v: &[f32]) {
        self.record_uniform(*location, UniformValue::FloatVec(v.to_vec()));
    }
    fn uniform_3_f32(&self, location: &u32, v: &[f32]) {
        self.record_uniform(*location, UniformValue::FloatVec(v.to_vec()));
    }
    fn uniform_4_f32(&self, location: &u32, v: &[f32]) {
        self.record_uniform(*location, UniformValue::FloatVec(v.to_vec()));
    }

    fn create_buffer(&self) -> Result<u32, String> {
        Ok(self.alloc(ObjectKind::Buffer))
    }
    fn delete_buffer(&self, buffer: u32) {
        self.free(ObjectKind::Buffer, buffer);
    }
    fn bind_buffer(&self, target: u32, buffer: Option<u32>) {
        self.record(Call::BindBuffer(target, buffer));
    }
    fn buffer_data(&self, target: u32, bytes: &[u8]) {
        self.record(Call::BufferData(target, bytes.to_vec()));
    }
    fn create_vertex_array(&self) -> Result<u32, String> {
        Ok(self.alloc(ObjectKind::VertexArray))
    }
    fn delete_vertex_array(&self, vao: u32) {
        self.free(ObjectKind::VertexArray, vao);
    }
    fn bind_vertex_array(&self, vao: Option<u32>) {
        self.record(Call::BindVertexArray(vao));
    }
    fn enable_vertex_attrib_array(&self, index: u32) {
        self.record(Call::EnableAttrib(index));
    }
    fn vertex_attrib_pointer_f32(&self, index: u32, components: i32) {
        self.record(Call::AttribPointer(index, components));
    }

    fn viewport(&self, x: i32, y: i32, width: i32, height: i32) {
        self.record(Call::Viewport(x, y, width, height));
    }
    fn clear_color(&self, r: f32, g: f32, b: f32, a: f32) {
        self.record(Call::ClearColor([r, g, b, a]));
    }
    fn clear_depth(&self, depth: f32) {
        self.record(Call::ClearDepth(depth));
    }
    fn clear(&self, mask: u32) {
        self.record(Call::Clear(mask));
    }
    fn enable(&self, cap: u32) {
        self.record(Call::Enable(cap));
    }
    fn blend_func(&self, src: u32, dst: u32) {
        self.record(Call::BlendFunc(src, dst));
    }
    fn depth_func(&self, func: u32) {
        self.record(Call::DepthFunc(func));
    }
    fn draw_elements_u16(&self, count: i32) {
        self.record(Call::Draw {
            count,
            framebuffer: self.bound_framebuffer.get(),
            texture: self.bound_texture.get(),
            program: self.bound_program.get(),
        });
    }
    fn flush(&self) {
        self.record(Call::Flush);
    }
}

impl RecordingGl {
    fn record_uniform(&self, location: u32, value: UniformValue) {
        let name = self
            .locations
            .borrow()
            .get(&location)
            .cloned()
            .unwrap_or_else(|| format!("<loc {location}>"));
        self.record(Call::Uniform(name, value));
    }
}
