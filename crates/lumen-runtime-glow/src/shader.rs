use std::collections::HashMap;
use std::fs;
use std::path::Path;

use lumen_core::{EngineError, Pending};
use lumen_runtime::{effective_values, UniformEntry, UniformValue};

use crate::context::RenderContext;

#[derive(Debug, Clone, PartialEq)]
pub struct ShaderSource {
    pub vert: String,
    pub frag: String,
    /// Optional human-friendly origin (path/label) for logs.
    pub origin: Option<String>,
}

impl ShaderSource {
    pub fn new(vert: impl Into<String>, frag: impl Into<String>) -> Self {
        Self {
            vert: vert.into(),
            frag: frag.into(),
            origin: None,
        }
    }

    /// The built-in pair that understands every name in the runtime contract.
    pub fn builtin() -> Self {
        Self {
            vert: DEFAULT_VERT.to_string(),
            frag: DEFAULT_FRAG.to_string(),
            origin: Some("builtin".to_string()),
        }
    }

    /// Read a vertex/fragment pair from disk. Empty files are rejected.
    pub fn load(vert_path: &Path, frag_path: &Path) -> Result<Self, EngineError> {
        let read = |p: &Path| -> Result<String, EngineError> {
            let text = fs::read_to_string(p).map_err(|source| EngineError::Io {
                path: p.to_path_buf(),
                source,
            })?;
            if text.trim().is_empty() {
                return Err(EngineError::InvalidConfig {
                    path: p.to_path_buf(),
                    msg: "shader source is empty".into(),
                });
            }
            Ok(text)
        };

        Ok(Self {
            vert: read(vert_path)?,
            frag: read(frag_path)?,
            origin: Some(format!("{} + {}", vert_path.display(), frag_path.display())),
        })
    }

    /// [`ShaderSource::load`] on a background thread.
    pub fn load_async(vert_path: &Path, frag_path: &Path) -> Pending<ShaderSource> {
        let vp = vert_path.to_path_buf();
        let fp = frag_path.to_path_buf();
        Pending::spawn(format!("shader {}", vp.display()), move || {
            ShaderSource::load(&vp, &fp)
        })
    }
}

pub fn compile_program<G: RenderContext>(
    gl: &G,
    vert_src: &str,
    frag_src: &str,
) -> Result<G::Program, EngineError> {
    let vs = gl
        .create_shader(glow::VERTEX_SHADER)
        .map_err(|e| EngineError::GlCreate(format!("create_shader(VS) failed: {e:?}")))?;
    gl.shader_source(vs, vert_src);
    gl.compile_shader(vs);
    if !gl.shader_compile_status(vs) {
        let log = gl.shader_info_log(vs);
        gl.delete_shader(vs);
        return Err(EngineError::VertexCompile(log));
    }

    let fs = match gl.create_shader(glow::FRAGMENT_SHADER) {
        Ok(fs) => fs,
        Err(e) => {
            gl.delete_shader(vs);
            return Err(EngineError::GlCreate(format!("create_shader(FS) failed: {e:?}")));
        }
    };
    gl.shader_source(fs, frag_src);
    gl.compile_shader(fs);
    if !gl.shader_compile_status(fs) {
        let log = gl.shader_info_log(fs);
        gl.delete_shader(vs);
        gl.delete_shader(fs);
        return Err(EngineError::FragmentCompile(log));
    }

    let program = match gl.create_program() {
        Ok(p) => p,
        Err(e) => {
            gl.delete_shader(vs);
            gl.delete_shader(fs);
            return Err(EngineError::GlCreate(format!("create_program failed: {e:?}")));
        }
    };
    gl.attach_shader(program, vs);
    gl.attach_shader(program, fs);
    gl.link_program(program);

    gl.detach_shader(program, vs);
    gl.detach_shader(program, fs);
    gl.delete_shader(vs);
    gl.delete_shader(fs);

    if !gl.program_link_status(program) {
        let log = gl.program_info_log(program);
        gl.delete_program(program);
        return Err(EngineError::Link(log));
    }

    Ok(program)
}

/// A linked program plus a cache of uniform locations looked up by name.
#[derive(Debug)]
pub struct ShaderProgram<G: RenderContext> {
    program: G::Program,
    locations: HashMap<String, Option<G::UniformLocation>>,
}

impl<G: RenderContext> ShaderProgram<G> {
    pub fn new(gl: &G, source: &ShaderSource) -> Result<Self, EngineError> {
        let program = compile_program(gl, &source.vert, &source.frag)?;
        Ok(Self {
            program,
            locations: HashMap::new(),
        })
    }

    pub fn program(&self) -> G::Program {
        self.program
    }

    pub fn use_program(&self, gl: &G) {
        gl.use_program(Some(self.program));
    }

    pub fn attrib_location(&self, gl: &G, name: &str) -> Option<u32> {
        gl.attrib_location(self.program, name)
    }

    pub fn uniform_location(&mut self, gl: &G, name: &str) -> Option<G::UniformLocation> {
        if let Some(loc) = self.locations.get(name) {
            return loc.clone();
        }
        let loc = gl.uniform_location(self.program, name);
        self.locations.insert(name.to_string(), loc.clone());
        loc
    }

    /// Upload one entry. Unknown names and unsupported vector lengths are skipped.
    pub fn apply(&mut self, gl: &G, entry: &UniformEntry) {
        self.apply_value(gl, &entry.name, &entry.value);
    }

    fn apply_value(&mut self, gl: &G, name: &str, value: &UniformValue) {
        let Some(loc) = self.uniform_location(gl, name) else {
            tracing::trace!(name, "uniform not active in program");
            return;
        };
        match value {
            UniformValue::Int(v) => gl.uniform_1_i32(&loc, *v),
            UniformValue::Float(v) => gl.uniform_1_f32(&loc, *v),
            UniformValue::FloatVec(v) => match v.len() {
                1 => gl.uniform_1_f32(&loc, v[0]),
                2 => gl.uniform_2_f32(&loc, v),
                3 => gl.uniform_3_f32(&loc, v),
                4 => gl.uniform_4_f32(&loc, v),
                n => tracing::warn!(name, len = n, "unsupported uniform vector length"),
            },
        }
    }

    /// Upload an ordered list. A name given more than once is written once, with its last
    /// value, at the position of its first entry.
    pub fn apply_all(&mut self, gl: &G, entries: &[UniformEntry]) {
        for (name, value) in effective_values(entries) {
            self.apply_value(gl, name, value);
        }
    }

    pub fn destroy(&mut self, gl: &G) {
        gl.delete_program(self.program);
        self.locations.clear();
    }
}

/// Rotates the layout pass by `rotation` (radians, x then y then z, about the canvas
/// centre). `scale` is already baked into the 9-slice positions, so it is not declared here.
pub const DEFAULT_VERT: &str = r#"#version 330 core
in vec3 position;
in vec2 texCoord;
out vec2 vTexCoord;

uniform int nthPass;
uniform vec3 rotation;

mat3 rotationMatrix(vec3 r) {
    vec3 c = cos(r);
    vec3 s = sin(r);
    mat3 rx = mat3(1.0, 0.0, 0.0,  0.0, c.x, s.x,  0.0, -s.x, c.x);
    mat3 ry = mat3(c.y, 0.0, -s.y,  0.0, 1.0, 0.0,  s.y, 0.0, c.y);
    mat3 rz = mat3(c.z, s.z, 0.0,  -s.z, c.z, 0.0,  0.0, 0.0, 1.0);
    return rz * ry * rx;
}

void main() {
    vTexCoord = texCoord;
    vec3 p = position;
    if (nthPass == 0) {
        p.xy = (rotationMatrix(rotation) * vec3(position.xy, 0.0)).xy;
    }
    gl_Position = vec4(p, 1.0);
}
"#;

pub const DEFAULT_FRAG: &str = r#"#version 330 core
in vec2 vTexCoord;
out vec4 fragColor;

uniform sampler2D uSampler;
uniform int nthPass;
uniform int effectType;
uniform vec4 editColor;
uniform vec2 vividParams;
uniform float binarizeThreshold;

vec3 vivid(vec3 c) {
    vec3 s = c * c * (3.0 - 2.0 * c);
    return mix(c, s, clamp(vividParams.x, 0.0, 4.0)) * vividParams.y;
}

void main() {
    vec4 src = texture(uSampler, vTexCoord);
    if (nthPass != 1 || effectType == 0) {
        fragColor = src;
        return;
    }
    if (effectType == 1) {
        fragColor = src * editColor;
    } else if (effectType == 2) {
        fragColor = vec4(vivid(src.rgb), src.a);
    } else if (effectType == 3) {
        float l = dot(src.rgb, vec3(0.299, 0.587, 0.114));
        fragColor = vec4(vec3(step(binarizeThreshold, l)), src.a);
    } else {
        fragColor = src;
    }
}
"#;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{ObjectKind, RecordingGl};
    use std::io::Write;

    #[test]
    fn compile_releases_shaders_on_success() {
        let gl = RecordingGl::new();
        let mut p = ShaderProgram::new(&gl, &ShaderSource::builtin()).unwrap();
        assert_eq!(gl.live_count(ObjectKind::Shader), 0);
        assert_eq!(gl.live_count(ObjectKind::Program), 1);
        p.destroy(&gl);
        assert_eq!(gl.live_total(), 0);
    }

    #[test]
    fn compile_failures_are_typed_and_leak_nothing() {
        let gl = RecordingGl::new();
        gl.fail_vertex_compile.set(true);
        let err = ShaderProgram::new(&gl, &ShaderSource::builtin()).unwrap_err();
        assert!(matches!(err, EngineError::VertexCompile(_)));

        gl.fail_vertex_compile.set(false);
        gl.fail_fragment_compile.set(true);
        let err = ShaderProgram::new(&gl, &ShaderSource::builtin()).unwrap_err();
        assert!(matches!(err, EngineError::FragmentCompile(_)));

        gl.fail_fragment_compile.set(false);
        gl.fail_link.set(true);
        let err = ShaderProgram::new(&gl, &ShaderSource::builtin()).unwrap_err();
        assert!(matches!(err, EngineError::Link(_)));

        assert_eq!(gl.live_total(), 0);
    }

    #[test]
    fn apply_dispatches_on_value_kind() {
        let gl = RecordingGl::new();
        let mut p = ShaderProgram::new(&gl, &ShaderSource::builtin()).unwrap();
        p.apply(&gl, &UniformEntry::int("effectType", 2));
        p.apply(&gl, &UniformEntry::float("binarizeThreshold", 0.3));
        p.apply(&gl, &UniformEntry::vec("editColor", &[1.0, 0.5, 0.25, 1.0]));
        p.apply(&gl, &UniformEntry::vec("bogus", &[1.0; 5]));

        assert_eq!(gl.last_uniform("effectType"), Some(UniformValue::Int(2)));
        assert_eq!(gl.last_uniform("binarizeThreshold"), Some(UniformValue::Float(0.3)));
        assert_eq!(
            gl.last_uniform("editColor"),
            Some(UniformValue::FloatVec(vec![1.0, 0.5, 0.25, 1.0]))
        );
        assert_eq!(gl.last_uniform("bogus"), None);
    }

    #[test]
    fn later_entries_override_earlier_ones() {
        let gl = RecordingGl::new();
        let mut p = ShaderProgram::new(&gl, &ShaderSource::builtin()).unwrap();
        let entries = [
            UniformEntry::int("effectType", 1),
            UniformEntry::float("binarizeThreshold", 0.5),
            UniformEntry::int("effectType", 4),
        ];
        p.apply_all(&gl, &entries);
        assert_eq!(gl.uniform_writes("effectType"), vec![UniformValue::Int(4)]);
        assert_eq!(gl.uniform_writes("binarizeThreshold"), vec![UniformValue::Float(0.5)]);
    }

    #[test]
    fn builtin_pair_declares_the_contract_names() {
        use lumen_runtime::runtime_contract as names;
        for name in [names::ATTR_POSITION, names::ATTR_TEXCOORD, names::U_ROTATION, names::U_NTH_PASS] {
            assert!(DEFAULT_VERT.contains(name), "vertex stage is missing `{name}`");
        }
        for name in [
            names::U_SAMPLER,
            names::U_NTH_PASS,
            names::U_EFFECT_TYPE,
            names::U_EDIT_COLOR,
            names::U_VIVID_PARAMS,
            names::U_BINARIZE_THRESHOLD,
        ] {
            assert!(DEFAULT_FRAG.contains(name), "fragment stage is missing `{name}`");
        }
    }

    #[test]
    fn inactive_uniform_is_skipped() {
        let gl = RecordingGl::new();
        gl.hide_uniform("polygonCount");
        let mut p = ShaderProgram::new(&gl, &ShaderSource::builtin()).unwrap();
        p.apply(&gl, &UniformEntry::int("polygonCount", 3));
        assert!(gl.uniform_writes("polygonCount").is_empty());
    }

    #[test]
    fn load_reads_both_files_and_rejects_empty() {
        let mut vs = tempfile::NamedTempFile::new().unwrap();
        let mut fs_ok = tempfile::NamedTempFile::new().unwrap();
        let fs_empty = tempfile::NamedTempFile::new().unwrap();
        vs.write_all(DEFAULT_VERT.as_bytes()).unwrap();
        fs_ok.write_all(DEFAULT_FRAG.as_bytes()).unwrap();

        let src = ShaderSource::load(vs.path(), fs_ok.path()).unwrap();
        assert_eq!(src.vert, DEFAULT_VERT);
        assert!(src.origin.is_some());

        let err = ShaderSource::load(vs.path(), fs_empty.path()).unwrap_err();
        assert!(matches!(err, EngineError::InvalidConfig { .. }));
    }
}
