//! Names and pass numbering shared between the compositor and shader authors.
//!
//! Adding names is additive; renaming or renumbering breaks existing shaders.

/// Vertex attribute carrying clip-space xyz.
pub const ATTR_POSITION: &str = "position";
/// Vertex attribute carrying uv.
pub const ATTR_TEXCOORD: &str = "texCoord";

pub const U_SAMPLER: &str = "uSampler";
pub const U_SCALE: &str = "scale";
pub const U_ROTATION: &str = "rotation";
pub const U_TEXTURE_SIZE: &str = "textureSize";
pub const U_NTH_PASS: &str = "nthPass";

pub const U_EDIT_COLOR: &str = "editColor";
pub const U_EFFECT_TYPE: &str = "effectType";
pub const U_BINARIZE_THRESHOLD: &str = "binarizeThreshold";
pub const U_VIVID_PARAMS: &str = "vividParams";
pub const U_POLYGON_COUNT: &str = "polygonCount";
pub const U_SHOW_BORDER: &str = "uShowBorder";

/// Texture unit every pass samples from.
pub const SAMPLER_UNIT: i32 = 0;

pub fn uniform_name_is_known(name: &str) -> bool {
    matches!(
        name,
        U_SAMPLER
            | U_SCALE
            | U_ROTATION
            | U_TEXTURE_SIZE
            | U_NTH_PASS
            | U_EDIT_COLOR
            | U_EFFECT_TYPE
            | U_BINARIZE_THRESHOLD
            | U_VIVID_PARAMS
            | U_POLYGON_COUNT
            | U_SHOW_BORDER
    )
}

/// One step of a sprite's per-frame render.
///
/// Two offscreen passes, each into its own target, then a present draw into the default
/// framebuffer. The shader branches on `nthPass`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Pass {
    /// 9-slice layout of the source texture into target A.
    Layout,
    /// Full-canvas effect sampling target A, into target B.
    Effect,
    /// Full-canvas copy of target B into the default framebuffer.
    Present,
}

/// Number of offscreen targets a sprite allocates (and binds) per frame.
pub const OFFSCREEN_PASSES: usize = 2;

impl Pass {
    pub const ALL: [Pass; 3] = [Pass::Layout, Pass::Effect, Pass::Present];

    /// Value written to `nthPass`.
    pub fn index(self) -> i32 {
        match self {
            Pass::Layout => 0,
            Pass::Effect => 1,
            Pass::Present => 2,
        }
    }

    /// Offscreen target this pass renders into; `None` means the default framebuffer.
    pub fn target_slot(self) -> Option<usize> {
        match self {
            Pass::Layout => Some(0),
            Pass::Effect => Some(1),
            Pass::Present => None,
        }
    }

    /// Whether this pass rasterizes the 9-slice mesh (otherwise the full-canvas quad).
    pub fn uses_slice_geometry(self) -> bool {
        matches!(self, Pass::Layout)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn offscreen_slots_match_target_count() {
        let slots: Vec<usize> = Pass::ALL.iter().filter_map(|p| p.target_slot()).collect();
        assert_eq!(slots, vec![0, 1]);
        assert_eq!(slots.len(), OFFSCREEN_PASSES);
    }

    #[test]
    fn pass_indices_are_sequential() {
        let idx: Vec<i32> = Pass::ALL.iter().map(|p| p.index()).collect();
        assert_eq!(idx, vec![0, 1, 2]);
    }

    #[test]
    fn known_uniforms() {
        assert!(uniform_name_is_known("effectType"));
        assert!(uniform_name_is_known(U_NTH_PASS));
        assert!(!uniform_name_is_known("uTime"));
    }
}
