#![forbid(unsafe_code)]

//! Backend-agnostic runtime vocabulary.
//!
//! Parameter blocks and uniform descriptions that the GL backend consumes. Nothing here
//! touches a graphics API.
#![deny(rustdoc::broken_intra_doc_links)]
#![deny(missing_debug_implementations)]

pub mod runtime_contract;
pub mod uniforms;

pub use runtime_contract::Pass;
pub use uniforms::{effective_values, UniformEntry, UniformValue};

use runtime_contract as names;

// -------------------------------------------------------------------------------------------------
// Per-frame parameter block
// -------------------------------------------------------------------------------------------------

/// `effectType` value that leaves the source untouched.
pub const EFFECT_NORMAL: i32 = 0;

#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Vec3 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Vec3 {
    pub const fn splat(v: f32) -> Self {
        Self { x: v, y: v, z: v }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Rgba {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

/// Tone-curve coefficients of the "vivid" effect.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Vivid {
    pub k1: f32,
    pub k2: f32,
}

/// Read-only snapshot of the UI controls, taken once per tick.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default, rename_all = "camelCase"))]
pub struct EffectParams {
    pub rotation: Vec3,
    pub scale: Vec3,
    pub color: Rgba,
    pub vivid: Vivid,
    pub effect_type: i32,
    pub binarize_threshold: f32,
    pub polygon_count: i32,
}

impl Default for EffectParams {
    fn default() -> Self {
        Self {
            rotation: Vec3::splat(0.0),
            scale: Vec3::splat(1.0),
            color: Rgba {
                r: 1.0,
                g: 1.0,
                b: 1.0,
                a: 1.0,
            },
            vivid: Vivid { k1: 1.0, k2: 1.0 },
            effect_type: EFFECT_NORMAL,
            binarize_threshold: 0.5,
            polygon_count: 1,
        }
    }
}

impl EffectParams {
    /// Dynamic uniform list for one frame, in upload order.
    ///
    /// Rotation and scale are not included: the sprite forwards them itself.
    pub fn to_uniforms(&self) -> Vec<UniformEntry> {
        let c = self.color;
        vec![
            UniformEntry::vec(names::U_EDIT_COLOR, &[c.r, c.g, c.b, c.a]),
            UniformEntry::int(names::U_EFFECT_TYPE, self.effect_type),
            UniformEntry::float(names::U_BINARIZE_THRESHOLD, self.binarize_threshold),
            UniformEntry::vec(names::U_VIVID_PARAMS, &[self.vivid.k1, self.vivid.k2]),
            UniformEntry::int(names::U_POLYGON_COUNT, self.polygon_count),
            UniformEntry::int(names::U_SHOW_BORDER, 1),
        ]
    }
}

/// Source of per-tick parameter snapshots (the UI layer implements this).
pub trait ParamSource {
    fn snapshot(&self) -> EffectParams;
}

/// Fixed parameters.
#[derive(Debug, Clone, Copy, Default)]
pub struct StaticParams(pub EffectParams);

impl ParamSource for StaticParams {
    fn snapshot(&self) -> EffectParams {
        self.0
    }
}
