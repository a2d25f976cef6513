//! Particle storage layout and double-buffer bookkeeping.
//!
//! Particles have no identity beyond their slot in a `width x height` grid.
//! Each quantity (position, velocity) has two slots: one holds the latest
//! complete state ("updated"), the other receives the step in progress
//! ("being written"). [`PingPong`] tracks which is which.

use glam::Vec3;
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

/// Bytes per particle per storage buffer (`vec4<f32>`).
pub const PARTICLE_STRIDE: u64 = 16;

/// Half-width of the initial random velocity per axis.
pub const INITIAL_SPEED: f32 = 0.005;

/// Rectangular particle grid.
///
/// A requested count `n` becomes `ceil(√n) x floor(√n)`. The effective count
/// may be lower than requested (99 becomes 10 x 9 = 90); this is accepted
/// silently.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ParticleGrid {
    pub width: u32,
    pub height: u32,
}

impl ParticleGrid {
    /// Round a requested particle count to a grid. Zero is treated as one.
    pub fn for_count(requested: u32) -> Self {
        Self::from_virtual(requested as f64)
    }

    fn from_virtual(count: f64) -> Self {
        let root = count.max(1.0).sqrt();
        Self {
            width: root.ceil() as u32,
            height: root.floor() as u32,
        }
    }

    /// Number of particles the grid holds.
    pub fn count(&self) -> u32 {
        self.width * self.height
    }

    /// Like [`for_count`](Self::for_count), but never holding more than
    /// `max` particles. Rounding up past the cap drops rows instead.
    pub fn for_count_capped(requested: u32, max: u32) -> Self {
        Self::from_virtual(requested.min(max) as f64).capped(max)
    }

    /// This grid, or a narrower one holding at most `max` particles.
    pub fn capped(self, max: u32) -> Self {
        if self.count() <= max {
            return self;
        }
        let width = Self::for_count(max).width;
        Self {
            width,
            height: (max / width).max(1),
        }
    }

    /// Grid for the current count scaled by `factor`, capped at `max`.
    pub fn scaled(&self, factor: f64, max: u32) -> Self {
        Self::from_virtual((self.count() as f64 * factor).min(max as f64)).capped(max)
    }

    /// Flat slot index of grid cell `(x, y)`.
    #[inline]
    pub fn index(&self, x: u32, y: u32) -> usize {
        (y * self.width + x) as usize
    }
}

/// Which of two slots holds the latest complete state.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub struct PingPong {
    updated: usize,
}

impl PingPong {
    /// Slot 0 starts as the updated one.
    pub fn new() -> Self {
        Self::default()
    }

    /// Slot holding the latest complete state. Render and read from here.
    #[inline]
    pub fn updated(&self) -> usize {
        self.updated
    }

    /// Slot the current step writes into.
    #[inline]
    pub fn written(&self) -> usize {
        1 - self.updated
    }

    /// Flip roles. Call once, after the whole pass has completed.
    #[inline]
    pub fn swap(&mut self) {
        self.updated = 1 - self.updated;
    }
}

/// Position and velocity roles, flipped together once per step.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub struct StepRoles {
    pub position: PingPong,
    pub velocity: PingPong,
}

/// Slots bound during one frame, as `[position, velocity]`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FrameSlots {
    /// Read by the step; it writes the opposite slots.
    pub step_reads: [usize; 2],
    /// Read by everything drawn after the step: the slots it just wrote.
    pub render_reads: [usize; 2],
}

impl StepRoles {
    pub fn new() -> Self {
        Self::default()
    }

    /// Currently updated `[position, velocity]` slots.
    pub fn updated(&self) -> [usize; 2] {
        [self.position.updated(), self.velocity.updated()]
    }

    /// Commit to one step: flip both pairs and report which slots the step
    /// and the following draw must bind.
    pub fn advance(&mut self) -> FrameSlots {
        let step_reads = self.updated();
        self.position.swap();
        self.velocity.swap();
        FrameSlots {
            step_reads,
            render_reads: self.updated(),
        }
    }
}

/// Random initial state: positions uniform in `[0, world_size)³`, velocities
/// uniform in `[-INITIAL_SPEED, INITIAL_SPEED)³`.
pub fn spawn(grid: ParticleGrid, world_size: f32, seed: u64) -> (Vec<Vec3>, Vec<Vec3>) {
    let mut rng = SmallRng::seed_from_u64(seed);
    let count = grid.count() as usize;
    let mut positions = Vec::with_capacity(count);
    let mut velocities = Vec::with_capacity(count);

    for _ in 0..count {
        positions.push(Vec3::new(
            rng.gen_range(0.0..world_size),
            rng.gen_range(0.0..world_size),
            rng.gen_range(0.0..world_size),
        ));
        velocities.push(Vec3::new(
            rng.gen_range(-INITIAL_SPEED..INITIAL_SPEED),
            rng.gen_range(-INITIAL_SPEED..INITIAL_SPEED),
            rng.gen_range(-INITIAL_SPEED..INITIAL_SPEED),
        ));
    }

    (positions, velocities)
}

/// Pack vectors as `vec4<f32>` for 16-byte aligned storage buffers.
pub fn pack_vec4(values: &[Vec3], w: f32) -> Vec<[f32; 4]> {
    values.iter().map(|v| v.extend(w).to_array()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_perfect_square() {
        let grid = ParticleGrid::for_count(100);
        assert_eq!((grid.width, grid.height), (10, 10));
        assert_eq!(grid.count(), 100);
    }

    #[test]
    fn test_rounding_loss() {
        let grid = ParticleGrid::for_count(99);
        assert_eq!((grid.width, grid.height), (10, 9));
        assert_eq!(grid.count(), 90);
    }

    #[test]
    fn test_zero_becomes_one() {
        assert_eq!(ParticleGrid::for_count(0).count(), 1);
    }

    #[test]
    fn test_scaled() {
        let grid = ParticleGrid::for_count(100);
        let doubled = grid.scaled(2.0, u32::MAX);
        // √200 = 14.14 -> 15 x 14
        assert_eq!((doubled.width, doubled.height), (15, 14));

        let halved = ParticleGrid::for_count(1).scaled(0.5, u32::MAX);
        assert_eq!(halved.count(), 1);

        let capped = grid.scaled(1000.0, 400);
        assert_eq!(capped.count(), 400);
    }

    #[test]
    fn test_cap_never_exceeded() {
        // 150 rounds to 13 x 12 = 156, which is over the cap.
        let grid = ParticleGrid::for_count_capped(150, 150);
        assert_eq!((grid.width, grid.height), (13, 11));
        assert!(ParticleGrid::for_count(100).scaled(2.0, 150).count() <= 150);
        assert_eq!(ParticleGrid::for_count_capped(1 << 30, 1 << 22).count(), 1 << 22);
    }

    #[test]
    fn test_grid_index() {
        let grid = ParticleGrid { width: 10, height: 9 };
        assert_eq!(grid.index(0, 0), 0);
        assert_eq!(grid.index(3, 2), 23);
        assert_eq!(grid.index(9, 8), 89);
    }

    #[test]
    fn test_ping_pong_alternates() {
        let mut roles = PingPong::new();
        let mut seen = Vec::new();
        for _ in 0..8 {
            assert_ne!(roles.updated(), roles.written());
            seen.push(roles.updated());
            roles.swap();
        }
        assert_eq!(seen, vec![0, 1, 0, 1, 0, 1, 0, 1]);
    }

    #[test]
    fn test_draw_follows_completed_step() {
        let mut roles = StepRoles::new();
        for _ in 0..6 {
            let before = roles.updated();
            let slots = roles.advance();
            assert_eq!(slots.step_reads, before);
            // The draw reads what the step wrote, never the step's input.
            assert_eq!(slots.render_reads, [1 - before[0], 1 - before[1]]);
            assert_eq!(roles.updated(), slots.render_reads);
        }
    }

    #[test]
    fn test_spawn_ranges() {
        let grid = ParticleGrid::for_count(400);
        let (positions, velocities) = spawn(grid, 100.0, 9);
        assert_eq!(positions.len(), 400);
        assert!(positions
            .iter()
            .all(|p| p.cmpge(Vec3::ZERO).all() && p.cmplt(Vec3::splat(100.0)).all()));
        assert!(velocities.iter().all(|v| v.abs().max_element() <= INITIAL_SPEED));
    }

    #[test]
    fn test_pack_vec4() {
        let packed = pack_vec4(&[Vec3::new(1.0, 2.0, 3.0)], 0.0);
        assert_eq!(packed, vec![[1.0, 2.0, 3.0, 0.0]]);
    }
}
