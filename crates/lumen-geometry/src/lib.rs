#![forbid(unsafe_code)]

//! 9-slice geometry.
//!
//! Pure functions only: no GL, no allocation beyond the returned buffers. The renderer
//! depends on the fixed cell order and the index pattern defined here.
#![deny(rustdoc::broken_intra_doc_links)]
#![deny(missing_debug_implementations)]

mod types;

pub use types::{Border, Crop, Edges, Rect, Rotate, Scale, Size};

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum GeometryError {
    #[error("border needs exactly 4 values (left, top, right, bottom), got {0}")]
    BorderArity(usize),

    #[error("border inset `{side}` must be finite and >= 0, got {value}")]
    InvalidInset { side: &'static str, value: f32 },

    #[error("{0} sprites exceed the 16-bit index range")]
    TooManySprites(usize),
}

// -------------------------------------------------------------------------------------------------
// Cell layout
// -------------------------------------------------------------------------------------------------

/// Cells per sprite, row-major: TL, TC, TR, ML, MC, MR, BL, BC, BR.
pub const CELL_COUNT: usize = 9;
pub const VERTICES_PER_CELL: usize = 4;
pub const VERTICES_PER_SPRITE: usize = CELL_COUNT * VERTICES_PER_CELL;
/// Two triangles per cell over the vertex order (left,bottom) (right,bottom) (left,top) (right,top).
pub const QUAD_INDICES: [u16; 6] = [0, 1, 2, 1, 3, 2];
pub const INDICES_PER_SPRITE: usize = CELL_COUNT * QUAD_INDICES.len();

pub const POSITION_COMPONENTS: usize = 3;
pub const UV_COMPONENTS: usize = 2;

/// Split one axis into (start, length) for the three bands.
fn bands(origin: f32, extent: f32, lead: f32, trail: f32) -> [(f32, f32); 3] {
    let middle = (extent - (lead + trail)).max(0.0);
    [
        (origin, lead),
        (origin + lead, middle),
        (origin + extent - trail, trail),
    ]
}

fn grid(cols: [(f32, f32); 3], rows: [(f32, f32); 3]) -> [Rect; CELL_COUNT] {
    let mut out = [Rect::default(); CELL_COUNT];
    for (r, (top, height)) in rows.iter().enumerate() {
        for (c, (left, width)) in cols.iter().enumerate() {
            out[r * 3 + c] = Rect::new(*left, *top, *width, *height);
        }
    }
    out
}

/// Screen-space cells for `size` split by `border`.
pub fn positions(size: &Size, border: &Border) -> [Rect; CELL_COUNT] {
    scaled_positions(size, &Scale::default(), border)
}

/// Screen-space cells with the block dimensions multiplied by `scale.x/y`.
///
/// Corners keep their inset size; only the stretchable bands absorb the scale.
pub fn scaled_positions(size: &Size, scale: &Scale, border: &Border) -> [Rect; CELL_COUNT] {
    let w = size.width * scale.x;
    let h = size.height * scale.y;
    grid(
        bands(size.left, w, border.left, border.right),
        bands(size.top, h, border.top, border.bottom),
    )
}

/// Texel-space cells inside `crop`.
pub fn texcoords(crop: &Crop, border: &Border) -> [Rect; CELL_COUNT] {
    grid(
        bands(crop.left, crop.width, border.left, border.right),
        bands(crop.top, crop.height, border.top, border.bottom),
    )
}

// -------------------------------------------------------------------------------------------------
// Coordinate spaces
// -------------------------------------------------------------------------------------------------

/// Pixel rect -> clip space. `clip = 2 * (px / dim) - 1`, y flipped so pixel top is +1.
pub fn to_clip_space(rect: &Rect, canvas_w: f32, canvas_h: f32) -> Edges {
    Edges {
        left: (rect.left / canvas_w) * 2.0 - 1.0,
        top: -((rect.top / canvas_h) * 2.0 - 1.0),
        right: (rect.right() / canvas_w) * 2.0 - 1.0,
        bottom: -((rect.bottom() / canvas_h) * 2.0 - 1.0),
    }
}

/// Inverse of [`to_clip_space`].
pub fn from_clip_space(clip: &Edges, canvas_w: f32, canvas_h: f32) -> Rect {
    let left = (clip.left + 1.0) * 0.5 * canvas_w;
    let top = (1.0 - clip.top) * 0.5 * canvas_h;
    let right = (clip.right + 1.0) * 0.5 * canvas_w;
    let bottom = (1.0 - clip.bottom) * 0.5 * canvas_h;
    Rect::new(left, top, right - left, bottom - top)
}

/// Texel rect -> normalized UV edges (v = 0 is the first uploaded row).
pub fn to_uv(rect: &Rect, tex_w: f32, tex_h: f32) -> Edges {
    Edges {
        left: rect.left / tex_w,
        top: rect.top / tex_h,
        right: rect.right() / tex_w,
        bottom: rect.bottom() / tex_h,
    }
}

// -------------------------------------------------------------------------------------------------
// Vertex / index buffers
// -------------------------------------------------------------------------------------------------

/// CPU-side vertex data for one sprite: `positions` (xyz) and `uvs` (uv), 4 vertices per cell.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Mesh {
    pub positions: Vec<f32>,
    pub uvs: Vec<f32>,
}

impl Mesh {
    pub fn vertex_count(&self) -> usize {
        self.positions.len() / POSITION_COMPONENTS
    }

    fn push_quad(&mut self, clip: &Edges, uv: &Edges, depth: f32) {
        #[rustfmt::skip]
        self.positions.extend_from_slice(&[
            clip.left,  clip.bottom, depth,
            clip.right, clip.bottom, depth,
            clip.left,  clip.top,    depth,
            clip.right, clip.top,    depth,
        ]);
        #[rustfmt::skip]
        self.uvs.extend_from_slice(&[
            uv.left,  uv.bottom,
            uv.right, uv.bottom,
            uv.left,  uv.top,
            uv.right, uv.top,
        ]);
    }
}

/// Everything needed to lay out one 9-slice sprite.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SliceLayout {
    pub canvas: (f32, f32),
    pub size: Size,
    pub scale: Scale,
    pub depth: f32,
    pub crop: Crop,
    pub border: Border,
}

/// Build the 36-vertex mesh for a sprite. Degenerate cells stay in place as zero-area quads.
///
/// Texel cells are normalized by the sprite's own size, so a crop equal to the size maps
/// the whole texture onto the sprite whatever the texture's pixel dimensions are.
pub fn build_mesh(layout: &SliceLayout) -> Mesh {
    let (cw, ch) = layout.canvas;
    let (tw, th) = (layout.size.width, layout.size.height);
    let cells = scaled_positions(&layout.size, &layout.scale, &layout.border);
    let texels = texcoords(&layout.crop, &layout.border);

    let mut mesh = Mesh {
        positions: Vec::with_capacity(VERTICES_PER_SPRITE * POSITION_COMPONENTS),
        uvs: Vec::with_capacity(VERTICES_PER_SPRITE * UV_COMPONENTS),
    };
    for (cell, texel) in cells.iter().zip(texels.iter()) {
        mesh.push_quad(
            &to_clip_space(cell, cw, ch),
            &to_uv(texel, tw, th),
            layout.depth,
        );
    }
    mesh
}

/// One quad covering clip space, sampling a framebuffer texture (origin bottom-left).
pub fn full_canvas_mesh() -> Mesh {
    let mut mesh = Mesh::default();
    mesh.push_quad(
        &Edges {
            left: -1.0,
            top: 1.0,
            right: 1.0,
            bottom: -1.0,
        },
        &Edges {
            left: 0.0,
            top: 1.0,
            right: 1.0,
            bottom: 0.0,
        },
        0.0,
    );
    mesh
}

/// Indices for `sprites` 9-slice sprites packed back to back.
///
/// Cell `i` of sprite `s` uses `36 * s + 4 * i + {0,1,2,1,3,2}`.
pub fn nine_slice_indices(sprites: usize) -> Result<Vec<u16>, GeometryError> {
    if sprites * VERTICES_PER_SPRITE > usize::from(u16::MAX) + 1 {
        return Err(GeometryError::TooManySprites(sprites));
    }
    let mut out = Vec::with_capacity(sprites * INDICES_PER_SPRITE);
    for s in 0..sprites {
        let base = s * VERTICES_PER_SPRITE;
        for cell in 0..CELL_COUNT {
            let offset = (base + cell * VERTICES_PER_CELL) as u16;
            out.extend(QUAD_INDICES.iter().map(|i| i + offset));
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f32 = 1e-4;

    fn approx(a: f32, b: f32) -> bool {
        (a - b).abs() < EPS
    }

    fn approx_rect(a: &Rect, b: &Rect) -> bool {
        approx(a.left, b.left)
            && approx(a.top, b.top)
            && approx(a.width, b.width)
            && approx(a.height, b.height)
    }

    #[test]
    fn center_cell_matches_insets() {
        let cells = positions(&Size::new(0.0, 0.0, 100.0, 100.0), &Border::uniform(10.0));
        assert_eq!(cells[4], Rect::new(10.0, 10.0, 80.0, 80.0));
        assert_eq!(cells[0], Rect::new(0.0, 0.0, 10.0, 10.0));
        assert_eq!(cells[8], Rect::new(90.0, 90.0, 10.0, 10.0));
    }

    #[test]
    fn cells_partition_the_destination() {
        let cases = [
            (Size::new(0.0, 0.0, 100.0, 100.0), Border::uniform(10.0)),
            (Size::new(32.0, 16.0, 300.0, 120.0), Border::new(4.0, 20.0, 50.0, 0.0)),
            (Size::new(5.0, 5.0, 64.0, 64.0), Border::new(32.0, 32.0, 32.0, 32.0)),
            (Size::new(0.0, 0.0, 512.0, 512.0), Border::NONE),
        ];

        for (size, border) in cases {
            let cells = positions(&size, &border);
            let total: f32 = cells.iter().map(Rect::area).sum();
            assert!(approx(total, size.width * size.height), "{size:?} {border:?}");

            for (i, a) in cells.iter().enumerate() {
                for b in cells.iter().skip(i + 1) {
                    assert!(a.overlap_area(b) < EPS, "{a:?} overlaps {b:?}");
                }
            }

            // column / row boundaries follow the insets exactly
            assert!(approx(cells[1].left, size.left + border.left));
            assert!(approx(cells[2].left, size.left + size.width - border.right));
            assert!(approx(cells[3].top, size.top + border.top));
            assert!(approx(cells[6].top, size.top + size.height - border.bottom));
        }
    }

    #[test]
    fn oversized_border_yields_zero_area_center() {
        let cells = positions(&Size::new(0.0, 0.0, 10.0, 10.0), &Border::uniform(8.0));
        assert!(cells[4].is_degenerate());
        assert_eq!(cells[4].width, 0.0);
    }

    #[test]
    fn scale_stretches_center_only() {
        let scale = Scale {
            x: 2.0,
            y: 0.5,
            z: 1.0,
        };
        let cells = scaled_positions(&Size::new(0.0, 0.0, 100.0, 100.0), &scale, &Border::uniform(10.0));
        assert_eq!(cells[4], Rect::new(10.0, 10.0, 180.0, 30.0));
        assert_eq!(cells[8], Rect::new(190.0, 40.0, 10.0, 10.0));
    }

    #[test]
    fn texcoords_are_offset_by_crop_origin() {
        let cells = texcoords(&Crop::new(16.0, 8.0, 64.0, 32.0), &Border::new(4.0, 2.0, 4.0, 2.0));
        assert_eq!(cells[0], Rect::new(16.0, 8.0, 4.0, 2.0));
        assert_eq!(cells[4], Rect::new(20.0, 10.0, 56.0, 28.0));
        assert_eq!(cells[8], Rect::new(76.0, 38.0, 4.0, 2.0));
    }

    #[test]
    fn clip_space_maps_top_left_to_plus_one() {
        let c = to_clip_space(&Rect::new(0.0, 0.0, 512.0, 512.0), 512.0, 512.0);
        assert_eq!(
            c,
            Edges {
                left: -1.0,
                top: 1.0,
                right: 1.0,
                bottom: -1.0
            }
        );
    }

    #[test]
    fn clip_space_round_trip_is_stable() {
        let canvases = [(512.0, 512.0), (640.0, 480.0), (1920.0, 1080.0)];
        let rects = [
            Rect::new(0.0, 0.0, 10.0, 10.0),
            Rect::new(128.0, 64.0, 256.0, 200.0),
            Rect::new(3.5, 7.25, 0.0, 19.0),
        ];
        for (cw, ch) in canvases {
            for r in &rects {
                let back = from_clip_space(&to_clip_space(r, cw, ch), cw, ch);
                assert!(approx_rect(&back, r), "{r:?} -> {back:?} on {cw}x{ch}");
            }
        }
    }

    #[test]
    fn index_pattern_is_offset_per_cell_and_sprite() {
        let idx = nine_slice_indices(3).unwrap();
        assert_eq!(idx.len(), 3 * INDICES_PER_SPRITE);
        for s in 0..3usize {
            for cell in 0..CELL_COUNT {
                let start = s * INDICES_PER_SPRITE + cell * 6;
                let base = (s * VERTICES_PER_SPRITE + cell * 4) as u16;
                let expect: Vec<u16> = QUAD_INDICES.iter().map(|i| i + base).collect();
                assert_eq!(&idx[start..start + 6], expect.as_slice());
            }
        }
    }

    #[test]
    fn index_build_is_deterministic() {
        assert_eq!(nine_slice_indices(4).unwrap(), nine_slice_indices(4).unwrap());
    }

    #[test]
    fn index_range_is_bounded() {
        assert!(nine_slice_indices(1820).is_ok());
        assert_eq!(
            nine_slice_indices(1821),
            Err(GeometryError::TooManySprites(1821))
        );
    }

    #[test]
    fn mesh_without_border_covers_canvas() {
        let mesh = build_mesh(&SliceLayout {
            canvas: (512.0, 512.0),
            size: Size::new(0.0, 0.0, 512.0, 512.0),
            scale: Scale::default(),
            depth: 0.0,
            crop: Crop::new(0.0, 0.0, 512.0, 512.0),
            border: Border::NONE,
        });
        assert_eq!(mesh.vertex_count(), VERTICES_PER_SPRITE);
        // center cell (index 4) spans the whole canvas and the whole texture
        let p = &mesh.positions[4 * 12..5 * 12];
        assert_eq!(p, &[-1.0, -1.0, 0.0, 1.0, -1.0, 0.0, -1.0, 1.0, 0.0, 1.0, 1.0, 0.0]);
        let uv = &mesh.uvs[4 * 8..5 * 8];
        assert_eq!(uv, &[0.0, 1.0, 1.0, 1.0, 0.0, 0.0, 1.0, 0.0]);
    }

    #[test]
    fn uvs_follow_the_sprite_size_not_the_canvas() {
        let mesh = build_mesh(&SliceLayout {
            canvas: (512.0, 512.0),
            size: Size::new(128.0, 128.0, 256.0, 256.0),
            scale: Scale::default(),
            depth: 0.0,
            crop: Crop::new(0.0, 0.0, 256.0, 256.0),
            border: Border::uniform(16.0),
        });
        let max = mesh.uvs.iter().copied().fold(f32::NEG_INFINITY, f32::max);
        let min = mesh.uvs.iter().copied().fold(f32::INFINITY, f32::min);
        assert_eq!((min, max), (0.0, 1.0));
        // the top-left corner cell spans border / size
        let uv = &mesh.uvs[0..8];
        assert!(approx(uv[2], 16.0 / 256.0));
    }

    #[test]
    fn mesh_writes_depth_into_z() {
        let mesh = build_mesh(&SliceLayout {
            canvas: (100.0, 100.0),
            size: Size::new(0.0, 0.0, 100.0, 100.0),
            scale: Scale::default(),
            depth: 0.25,
            crop: Crop::new(0.0, 0.0, 100.0, 100.0),
            border: Border::uniform(10.0),
        });
        assert!(mesh.positions.chunks(3).all(|v| v[2] == 0.25));
    }

    #[test]
    fn border_from_slice_checks_arity_and_sign() {
        assert_eq!(
            Border::from_slice(&[1.0, 2.0, 3.0, 4.0]),
            Ok(Border::new(1.0, 2.0, 3.0, 4.0))
        );
        assert_eq!(Border::from_slice(&[1.0, 2.0]), Err(GeometryError::BorderArity(2)));
        assert!(matches!(
            Border::from_slice(&[1.0, -2.0, 3.0, 4.0]),
            Err(GeometryError::InvalidInset { side: "top", .. })
        ));
    }
}
