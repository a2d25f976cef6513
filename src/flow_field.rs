//! Procedural 3D flow field.
//!
//! The field is a cube of `size³` cells, each holding a raw force vector
//! produced by [`NoiseField`]. Raw components are in `[0, max_force · 0.9375]`
//! and are mapped to steering vectors with [`remap`]. The simulation sampler
//! and the debug overlay both go through [`FlowField::vector`], and the GPU
//! side shares a single WGSL snippet, so the drawn arrows always match the
//! dynamics.
//!
//! # Layout
//!
//! Cell `(x, y, z)` lives at flat index `(x * size + y) * size + z`: `x` is
//! the outer loop, `z` the inner one. [`FlowField::to_gpu_data`] writes three
//! floats per cell in that order.

use glam::{UVec3, Vec3};

use crate::noise::{NoiseField, NoiseMode};

/// Length of an overlay arrow, in world units, for a unit remapped vector.
pub const OVERLAY_TIP_SCALE: f32 = 2.0;

/// Map a raw field sample from `[0, 1]` to `[-1, 1]`.
#[inline]
pub fn remap(raw: Vec3) -> Vec3 {
    (raw - Vec3::splat(0.5)) * 2.0
}

/// Parameters for [`FlowFieldGenerator`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FlowFieldGenerator {
    /// Cells per axis.
    pub size: u32,
    /// Multiplier for every generated component.
    pub max_force: f32,
    /// Noise table behaviour.
    pub mode: NoiseMode,
}

impl FlowFieldGenerator {
    /// Create a generator for a `size³` field with unit force.
    pub fn new(size: u32) -> Self {
        Self {
            size,
            max_force: 1.0,
            mode: NoiseMode::Coherent,
        }
    }

    /// Set the force multiplier.
    pub fn with_max_force(mut self, max_force: f32) -> Self {
        self.max_force = max_force;
        self
    }

    /// Set the noise table mode.
    pub fn with_mode(mut self, mode: NoiseMode) -> Self {
        self.mode = mode;
        self
    }

    /// Build a full field from `seed`, shifted along the noise axis by
    /// `iteration_offset`.
    ///
    /// Components use cumulative coordinates (`i`, `i+j`, `i+j+k`) so the
    /// axes are correlated and the field swirls instead of looking like
    /// three unrelated noise volumes.
    ///
    /// A size of zero generates a single cell.
    pub fn generate(&self, seed: u64, iteration_offset: f32) -> FlowField {
        let mut noise = NoiseField::with_mode(seed, self.mode);
        let size = self.size.max(1);
        let n = size as usize;
        let mut cells = Vec::with_capacity(n * n * n);

        for i in 0..size {
            for j in 0..size {
                for k in 0..size {
                    let (fi, fj, fk) = (i as f32, j as f32, k as f32);
                    let force = Vec3::new(
                        noise.next_sample(fi + iteration_offset, 0.0, 0.0),
                        noise.next_sample(fi + fj + iteration_offset, 0.0, 0.0),
                        noise.next_sample(fi + fj + fk + iteration_offset, 0.0, 0.0),
                    ) * self.max_force;
                    cells.push(force);
                }
            }
        }

        FlowField { size, cells }
    }
}

/// A generated `size³` grid of raw force vectors.
#[derive(Clone, Debug, PartialEq)]
pub struct FlowField {
    size: u32,
    cells: Vec<Vec3>,
}

impl FlowField {
    /// A field where every remapped vector is zero (raw value 0.5).
    /// Zero is treated as one.
    pub fn neutral(size: u32) -> Self {
        let size = size.max(1);
        let n = size as usize;
        Self {
            size,
            cells: vec![Vec3::splat(0.5); n * n * n],
        }
    }

    /// Build a field from raw cells laid out `x`-outer, `z`-inner.
    ///
    /// Returns `None` if `size` is zero or `cells.len() != size³`.
    pub fn from_raw(size: u32, cells: Vec<Vec3>) -> Option<Self> {
        let n = size as usize;
        (size > 0 && cells.len() == n * n * n).then_some(Self { size, cells })
    }

    /// Cells per axis.
    pub fn size(&self) -> u32 {
        self.size
    }

    /// Total number of cells.
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    /// Whether the field has no cells.
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Flat index of a cell.
    #[inline]
    pub fn index(&self, cell: UVec3) -> usize {
        let n = self.size as usize;
        (cell.x as usize * n + cell.y as usize) * n + cell.z as usize
    }

    /// Cell coordinates of a flat index.
    #[inline]
    pub fn cell_of(&self, index: usize) -> UVec3 {
        let n = self.size as usize;
        UVec3::new((index / (n * n)) as u32, ((index / n) % n) as u32, (index % n) as u32)
    }

    /// Raw generator output for a cell.
    pub fn raw(&self, cell: UVec3) -> Vec3 {
        self.cells[self.index(cell)]
    }

    /// Remapped steering vector for a cell.
    pub fn vector(&self, cell: UVec3) -> Vec3 {
        remap(self.raw(cell))
    }

    /// Nearest cell for a normalized coordinate, clamped to the grid edge.
    pub fn cell_at(&self, normalized: Vec3) -> UVec3 {
        let max = (self.size - 1) as f32;
        let scaled = (normalized * self.size as f32).floor().clamp(Vec3::ZERO, Vec3::splat(max));
        scaled.as_uvec3()
    }

    /// Steering vector at a world position inside `[0, world_size)³`.
    pub fn vector_at(&self, position: Vec3, world_size: f32) -> Vec3 {
        self.vector(self.cell_at(position / world_size))
    }

    /// Overlay line for a cell: from the cell centre to the arrow tip, in
    /// world units.
    pub fn overlay_segment(&self, cell: UVec3, world_size: f32) -> (Vec3, Vec3) {
        let base = (cell.as_vec3() + Vec3::splat(0.5)) / self.size as f32 * world_size;
        let tip = base + self.vector(cell) * OVERLAY_TIP_SCALE;
        (base, tip)
    }

    /// Flat `f32` buffer for GPU upload, three floats per cell.
    pub fn to_gpu_data(&self) -> Vec<f32> {
        self.cells.iter().flat_map(|c| c.to_array()).collect()
    }
}

/// WGSL shared by the simulation and overlay shaders.
///
/// Expects the including module to declare
/// `var<storage, read> flow_field: array<f32>`.
pub const FIELD_SAMPLING_WGSL: &str = r#"
// Offset of a cell in the packed field buffer (x outer, z inner, 3 floats per cell).
fn field_offset(cell: vec3<u32>, size: u32) -> u32 {
    return ((cell.x * size + cell.y) * size + cell.z) * 3u;
}

// Raw generator output [0, 1] -> steering vector [-1, 1].
fn field_remap(raw: vec3<f32>) -> vec3<f32> {
    return (raw - vec3<f32>(0.5)) * 2.0;
}

// Nearest cell for a normalized coordinate, clamped to the grid edge.
fn field_cell_at(normalized: vec3<f32>, size: u32) -> vec3<u32> {
    let max_cell = f32(size - 1u);
    let scaled = clamp(floor(normalized * f32(size)), vec3<f32>(0.0), vec3<f32>(max_cell));
    return vec3<u32>(scaled);
}

fn field_vector(cell: vec3<u32>, size: u32) -> vec3<f32> {
    let o = field_offset(cell, size);
    return field_remap(vec3<f32>(flow_field[o], flow_field[o + 1u], flow_field[o + 2u]));
}
"#;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_size() {
        let field = FlowFieldGenerator::new(10).generate(1, 0.0);
        assert_eq!(field.size(), 10);
        assert_eq!(field.len(), 1000);
        assert_eq!(field.to_gpu_data().len(), 3000);
    }

    #[test]
    fn test_remapped_vectors_in_unit_range() {
        let field = FlowFieldGenerator::new(10).generate(99, 0.0);
        for index in 0..field.len() {
            let v = field.vector(field.cell_of(index));
            assert!(v.cmpge(Vec3::splat(-1.0)).all() && v.cmple(Vec3::ONE).all(), "{:?}", v);
        }
    }

    #[test]
    fn test_cumulative_coordinates() {
        // Component 0 depends only on i, so it is constant across j and k.
        let field = FlowFieldGenerator::new(6).generate(4, 0.0);
        let reference = field.raw(UVec3::new(2, 0, 0)).x;
        for j in 0..6 {
            for k in 0..6 {
                assert_eq!(field.raw(UVec3::new(2, j, k)).x, reference);
            }
        }
        // Component 1 depends on i + j only.
        assert_eq!(field.raw(UVec3::new(1, 2, 0)).y, field.raw(UVec3::new(2, 1, 5)).y);
        // Component 2 depends on i + j + k only.
        assert_eq!(field.raw(UVec3::new(1, 1, 1)).z, field.raw(UVec3::new(3, 0, 0)).z);
    }

    #[test]
    fn test_max_force_scales_output() {
        let unit = FlowFieldGenerator::new(4).generate(8, 0.0);
        let doubled = FlowFieldGenerator::new(4).with_max_force(2.0).generate(8, 0.0);
        let cell = UVec3::new(1, 2, 3);
        assert!((doubled.raw(cell) - unit.raw(cell) * 2.0).length() < 1e-6);
    }

    #[test]
    fn test_serialization_order_x_outer_z_inner() {
        let field = FlowFieldGenerator::new(3).generate(2, 0.0);
        let data = field.to_gpu_data();
        let cell = UVec3::new(1, 2, 0);
        let offset = ((1 * 3 + 2) * 3 + 0) * 3;
        assert_eq!(&data[offset..offset + 3], &field.raw(cell).to_array());
        assert_eq!(field.cell_of(field.index(cell)), cell);
    }

    #[test]
    fn test_cell_at_clamps() {
        let field = FlowField::neutral(10);
        assert_eq!(field.cell_at(Vec3::new(-0.2, 0.0, 1.5)), UVec3::new(0, 0, 9));
        assert_eq!(field.cell_at(Vec3::splat(0.999)), UVec3::splat(9));
        assert_eq!(field.cell_at(Vec3::new(0.05, 0.15, 0.55)), UVec3::new(0, 1, 5));
    }

    #[test]
    fn test_overlay_matches_simulation_sampling() {
        let world = 100.0;
        let field = FlowFieldGenerator::new(10).generate(1234, 0.0);
        for index in 0..field.len() {
            let cell = field.cell_of(index);
            let (base, tip) = field.overlay_segment(cell, world);
            // The cell centre samples its own cell.
            let sampled = field.vector_at(base, world);
            let drawn = (tip - base) / OVERLAY_TIP_SCALE;
            assert!((sampled - drawn).length() < 1e-5, "cell {:?}", cell);
        }
    }

    #[test]
    fn test_neutral_field_is_zero_force() {
        let field = FlowField::neutral(4);
        assert_eq!(field.vector_at(Vec3::splat(12.0), 100.0), Vec3::ZERO);
    }

    #[test]
    fn test_from_raw_checks_length() {
        assert!(FlowField::from_raw(2, vec![Vec3::ZERO; 7]).is_none());
        assert!(FlowField::from_raw(2, vec![Vec3::ZERO; 8]).is_some());
    }

    #[test]
    fn test_empty_field_never_built() {
        assert!(FlowField::from_raw(0, vec![]).is_none());

        let neutral = FlowField::neutral(0);
        assert_eq!(neutral.size(), 1);
        assert_eq!(neutral.cell_at(Vec3::splat(0.5)), UVec3::ZERO);

        let generated = FlowFieldGenerator::new(0).generate(3, 0.0);
        assert_eq!((generated.size(), generated.len()), (1, 1));
        assert!(generated.vector_at(Vec3::ZERO, 100.0).is_finite());
    }

    #[test]
    fn test_iteration_offset_shifts_field() {
        let generator = FlowFieldGenerator::new(4);
        let a = generator.generate(5, 0.0);
        let b = generator.generate(5, 1.0);
        // Offsetting by one along the noise axis equals moving one cell in i.
        assert_eq!(a.raw(UVec3::new(1, 0, 0)), b.raw(UVec3::new(0, 0, 0)));
    }
}
