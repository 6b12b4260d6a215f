use serde::{Deserialize, Serialize};

use crate::GeometryError;

/// Destination rectangle in canvas pixels.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Size {
    pub left: f32,
    pub top: f32,
    pub width: f32,
    pub height: f32,
}

impl Size {
    pub const fn new(left: f32, top: f32, width: f32, height: f32) -> Self {
        Self {
            left,
            top,
            width,
            height,
        }
    }
}

/// Source rectangle in texels of the bound texture.
///
/// A zero width/height means "not resolved yet"; the sprite fills it from its `Size`
/// on first draw.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Crop {
    pub left: f32,
    pub top: f32,
    pub width: f32,
    pub height: f32,
}

impl Crop {
    pub const fn new(left: f32, top: f32, width: f32, height: f32) -> Self {
        Self {
            left,
            top,
            width,
            height,
        }
    }

    pub fn is_resolved(&self) -> bool {
        self.width > 0.0 && self.height > 0.0
    }

    /// Fill any zero extent from `size`.
    pub fn resolve_from(&mut self, size: &Size) {
        if self.width == 0.0 {
            self.width = size.width;
        }
        if self.height == 0.0 {
            self.height = size.height;
        }
    }
}

/// Inset widths of the 9-slice grid.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Border {
    pub left: f32,
    pub top: f32,
    pub right: f32,
    pub bottom: f32,
}

impl Border {
    pub const NONE: Border = Border::new(0.0, 0.0, 0.0, 0.0);

    pub const fn new(left: f32, top: f32, right: f32, bottom: f32) -> Self {
        Self {
            left,
            top,
            right,
            bottom,
        }
    }

    pub const fn uniform(v: f32) -> Self {
        Self::new(v, v, v, v)
    }

    /// Build from `[left, top, right, bottom]`.
    pub fn from_slice(values: &[f32]) -> Result<Self, GeometryError> {
        match *values {
            [left, top, right, bottom] => {
                let b = Self::new(left, top, right, bottom);
                b.validate()?;
                Ok(b)
            }
            _ => Err(GeometryError::BorderArity(values.len())),
        }
    }

    pub fn validate(&self) -> Result<(), GeometryError> {
        for (side, v) in [
            ("left", self.left),
            ("top", self.top),
            ("right", self.right),
            ("bottom", self.bottom),
        ] {
            if !v.is_finite() || v < 0.0 {
                return Err(GeometryError::InvalidInset { side, value: v });
            }
        }
        Ok(())
    }

    pub fn horizontal(&self) -> f32 {
        self.left + self.right
    }

    pub fn vertical(&self) -> f32 {
        self.top + self.bottom
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Scale {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Default for Scale {
    fn default() -> Self {
        Self {
            x: 1.0,
            y: 1.0,
            z: 1.0,
        }
    }
}

impl Scale {
    pub fn to_array(self) -> [f32; 3] {
        [self.x, self.y, self.z]
    }
}

/// Rotation is forwarded to the shader only; CPU geometry ignores it.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Rotate {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Rotate {
    pub fn to_array(self) -> [f32; 3] {
        [self.x, self.y, self.z]
    }
}

/// Axis-aligned rectangle in pixel or texel space (y grows downwards).
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Rect {
    pub left: f32,
    pub top: f32,
    pub width: f32,
    pub height: f32,
}

impl Rect {
    pub const fn new(left: f32, top: f32, width: f32, height: f32) -> Self {
        Self {
            left,
            top,
            width,
            height,
        }
    }

    pub fn right(&self) -> f32 {
        self.left + self.width
    }

    pub fn bottom(&self) -> f32 {
        self.top + self.height
    }

    pub fn area(&self) -> f32 {
        self.width * self.height
    }

    pub fn is_degenerate(&self) -> bool {
        self.width == 0.0 || self.height == 0.0
    }

    /// Area shared with `other` (0 when they only touch).
    pub fn overlap_area(&self, other: &Rect) -> f32 {
        let w = self.right().min(other.right()) - self.left.max(other.left);
        let h = self.bottom().min(other.bottom()) - self.top.max(other.top);
        if w <= 0.0 || h <= 0.0 {
            0.0
        } else {
            w * h
        }
    }
}

impl From<Size> for Rect {
    fn from(s: Size) -> Self {
        Rect::new(s.left, s.top, s.width, s.height)
    }
}

impl From<Crop> for Rect {
    fn from(c: Crop) -> Self {
        Rect::new(c.left, c.top, c.width, c.height)
    }
}

/// Edges in a normalized space: clip space (`top` > `bottom`) or UV space.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Edges {
    pub left: f32,
    pub top: f32,
    pub right: f32,
    pub bottom: f32,
}
