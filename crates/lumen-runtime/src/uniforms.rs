//! Dynamic shader parameters.

/// Value of one uniform write.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum UniformValue {
    Int(i32),
    Float(f32),
    /// vec2 / vec3 / vec4 depending on length.
    FloatVec(Vec<f32>),
}

/// A named uniform write. Entries are applied in order; a later entry with the same name
/// overwrites an earlier one.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct UniformEntry {
    pub name: String,
    pub value: UniformValue,
}

impl UniformEntry {
    pub fn int(name: impl Into<String>, v: i32) -> Self {
        Self {
            name: name.into(),
            value: UniformValue::Int(v),
        }
    }

    pub fn float(name: impl Into<String>, v: f32) -> Self {
        Self {
            name: name.into(),
            value: UniformValue::Float(v),
        }
    }

    pub fn vec(name: impl Into<String>, v: &[f32]) -> Self {
        Self {
            name: name.into(),
            value: UniformValue::FloatVec(v.to_vec()),
        }
    }
}

/// Resolve an ordered list to the value each name ends up with (last write wins).
pub fn effective_values(entries: &[UniformEntry]) -> Vec<(&str, &UniformValue)> {
    let mut out: Vec<(&str, &UniformValue)> = Vec::new();
    for e in entries {
        match out.iter_mut().find(|(n, _)| *n == e.name) {
            Some(slot) => slot.1 = &e.value,
            None => out.push((e.name.as_str(), &e.value)),
        }
    }
    out
}
