use lumen_core::EngineError;
use lumen_geometry::{nine_slice_indices, Mesh, POSITION_COMPONENTS, UV_COMPONENTS};
use lumen_runtime::runtime_contract::{ATTR_POSITION, ATTR_TEXCOORD};

use crate::context::RenderContext;
use crate::shader::ShaderProgram;

/// Element buffer holding the 9-slice index pattern for `sprites` sprites.
#[derive(Debug)]
pub struct IndexBuffer<G: RenderContext> {
    buffer: Option<G::Buffer>,
    count: i32,
}

impl<G: RenderContext> IndexBuffer<G> {
    pub fn nine_slice(gl: &G, sprites: usize) -> Result<Self, EngineError> {
        let indices =
            nine_slice_indices(sprites).map_err(|e| EngineError::other(e.to_string()))?;
        let buffer = gl
            .create_buffer()
            .map_err(|e| EngineError::GlCreate(format!("create_buffer(index) failed: {e:?}")))?;
        gl.bind_buffer(glow::ELEMENT_ARRAY_BUFFER, Some(buffer));
        gl.buffer_data(glow::ELEMENT_ARRAY_BUFFER, bytemuck::cast_slice(&indices));
        gl.bind_buffer(glow::ELEMENT_ARRAY_BUFFER, None);
        Ok(Self {
            buffer: Some(buffer),
            count: indices.len() as i32,
        })
    }

    /// Total number of indices.
    pub fn count(&self) -> i32 {
        self.count
    }

    pub fn buffer(&self) -> Option<G::Buffer> {
        self.buffer
    }

    pub fn destroy(&mut self, gl: &G) {
        if let Some(b) = self.buffer.take() {
            gl.delete_buffer(b);
        }
    }
}

/// Uploaded vertex data (positions + uvs) and the VAO describing it.
#[derive(Debug)]
pub struct GeometryBuffers<G: RenderContext> {
    vao: G::VertexArray,
    positions: G::Buffer,
    uvs: G::Buffer,
    vertex_count: usize,
}

impl<G: RenderContext> GeometryBuffers<G> {
    /// Upload `mesh` and wire it to the program's `position` / `texCoord` attributes.
    ///
    /// An attribute the program does not use is left disabled.
    pub fn upload(gl: &G, program: &ShaderProgram<G>, mesh: &Mesh) -> Result<Self, EngineError> {
        let vao = gl
            .create_vertex_array()
            .map_err(|e| EngineError::GlCreate(format!("create_vertex_array: {e}")))?;
        let positions = match gl.create_buffer() {
            Ok(b) => b,
            Err(e) => {
                gl.delete_vertex_array(vao);
                return Err(EngineError::GlCreate(format!("create_buffer: {e}")));
            }
        };
        let uvs = match gl.create_buffer() {
            Ok(b) => b,
            Err(e) => {
                gl.delete_buffer(positions);
                gl.delete_vertex_array(vao);
                return Err(EngineError::GlCreate(format!("create_buffer: {e}")));
            }
        };

        gl.bind_vertex_array(Some(vao));
        for (buffer, data, attr, components) in [
            (positions, &mesh.positions, ATTR_POSITION, POSITION_COMPONENTS),
            (uvs, &mesh.uvs, ATTR_TEXCOORD, UV_COMPONENTS),
        ] {
            gl.bind_buffer(glow::ARRAY_BUFFER, Some(buffer));
            gl.buffer_data(glow::ARRAY_BUFFER, bytemuck::cast_slice(data.as_slice()));
            match program.attrib_location(gl, attr) {
                Some(loc) => {
                    gl.enable_vertex_attrib_array(loc);
                    gl.vertex_attrib_pointer_f32(loc, components as i32);
                }
                None => tracing::debug!(attribute = attr, "attribute not active in program"),
            }
        }
        gl.bind_buffer(glow::ARRAY_BUFFER, None);
        gl.bind_vertex_array(None);

        Ok(Self {
            vao,
            positions,
            uvs,
            vertex_count: mesh.vertex_count(),
        })
    }

    pub fn vertex_count(&self) -> usize {
        self.vertex_count
    }

    /// Draw `count` indices of `indices` with this geometry.
    pub fn draw(&self, gl: &G, indices: &IndexBuffer<G>, count: i32) {
        gl.bind_vertex_array(Some(self.vao));
        gl.bind_buffer(glow::ELEMENT_ARRAY_BUFFER, indices.buffer());
        gl.draw_elements_u16(count.min(indices.count()));
        gl.bind_vertex_array(None);
    }

    pub fn destroy(&mut self, gl: &G) {
        gl.delete_vertex_array(self.vao);
        gl.delete_buffer(self.positions);
        gl.delete_buffer(self.uvs);
    }
}
