//! Per-frame particle update.
//!
//! A frame runs two phases over the whole population, in order:
//!
//! 1. **Position phase**: `p' = (p + v · dt · max_speed) mod world_size`.
//! 2. **Velocity phase**: with gravity on, steer toward the field vector at
//!    `p'` and add the gravity bias; with gravity off, only damp.
//!
//! Both phases write into the "being written" slots, then both double
//! buffers swap. The GPU compute shader in [`crate::gpu`] implements the
//! same math; [`CpuSimulation`] is the reference used by tests, benches and
//! the headless mode.

use glam::Vec3;

use crate::config::SimConfig;
use crate::flow_field::FlowField;
use crate::particles::{self, ParticleGrid, PingPong};

/// Tuning values read by both phases.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct StepParams {
    pub world_size: f32,
    pub max_speed: f32,
    pub gravity: Vec3,
    pub steering: f32,
    pub damping: f32,
    pub gravity_enabled: bool,
}

impl StepParams {
    /// Extract the step tuning from a configuration.
    pub fn from_config(config: &SimConfig) -> Self {
        Self {
            world_size: config.world_size,
            max_speed: config.max_speed,
            gravity: config.gravity,
            steering: config.steering,
            damping: config.damping,
            gravity_enabled: config.gravity_enabled,
        }
    }
}

/// Floored modulo per axis; the result is always in `[0, size)`.
#[inline]
pub fn wrap(v: Vec3, size: f32) -> Vec3 {
    let w = v - size * (v / size).floor();
    // Rounding can land exactly on `size` for tiny negative inputs.
    Vec3::select(w.cmpge(Vec3::splat(size)) | w.cmplt(Vec3::ZERO), Vec3::ZERO, w)
}

/// Position phase for one particle.
#[inline]
pub fn next_position(position: Vec3, velocity: Vec3, dt: f32, params: &StepParams) -> Vec3 {
    wrap(position + velocity * dt * params.max_speed, params.world_size)
}

/// Velocity phase for one particle, given its freshly integrated position.
#[inline]
pub fn next_velocity(position: Vec3, velocity: Vec3, field: &FlowField, params: &StepParams) -> Vec3 {
    if params.gravity_enabled {
        let target = field.vector_at(position, params.world_size);
        velocity + (target - velocity) / params.steering + params.gravity
    } else {
        velocity * params.damping
    }
}

/// CPU implementation of the double-buffered simulation.
pub struct CpuSimulation {
    grid: ParticleGrid,
    positions: [Vec<Vec3>; 2],
    velocities: [Vec<Vec3>; 2],
    position_roles: PingPong,
    velocity_roles: PingPong,
    field: FlowField,
    params: StepParams,
    frames: u64,
}

impl CpuSimulation {
    /// Spawn a random population for `config` in `field`.
    pub fn new(config: &SimConfig, field: FlowField) -> Self {
        let grid = config.particle_grid();
        let (positions, velocities) = particles::spawn(grid, config.world_size, config.seed);
        Self::from_state(grid, positions, velocities, field, StepParams::from_config(config))
    }

    /// Start from explicit state. Both vectors must hold `grid.count()` entries.
    pub fn from_state(
        grid: ParticleGrid,
        positions: Vec<Vec3>,
        velocities: Vec<Vec3>,
        field: FlowField,
        params: StepParams,
    ) -> Self {
        assert_eq!(positions.len(), grid.count() as usize, "position count must match grid");
        assert_eq!(velocities.len(), grid.count() as usize, "velocity count must match grid");
        let count = positions.len();
        Self {
            grid,
            positions: [positions, vec![Vec3::ZERO; count]],
            velocities: [velocities, vec![Vec3::ZERO; count]],
            position_roles: PingPong::new(),
            velocity_roles: PingPong::new(),
            field,
            params,
            frames: 0,
        }
    }

    /// Run one full frame: position phase, velocity phase, swap.
    pub fn step(&mut self, dt: f32) {
        let pr = self.position_roles;
        let vr = self.velocity_roles;

        {
            let [p0, p1] = &mut self.positions;
            let (src, dst) = if pr.updated() == 0 { (&*p0, p1) } else { (&*p1, p0) };
            let velocities = &self.velocities[vr.updated()];
            for ((out, p), v) in dst.iter_mut().zip(src).zip(velocities) {
                *out = next_position(*p, *v, dt, &self.params);
            }
        }

        {
            let [v0, v1] = &mut self.velocities;
            let (src, dst) = if vr.updated() == 0 { (&*v0, v1) } else { (&*v1, v0) };
            let positions = &self.positions[pr.written()];
            for ((out, v), p) in dst.iter_mut().zip(src).zip(positions) {
                *out = next_velocity(*p, *v, &self.field, &self.params);
            }
        }

        self.position_roles.swap();
        self.velocity_roles.swap();
        self.frames += 1;
    }

    /// Latest complete positions.
    pub fn positions(&self) -> &[Vec3] {
        &self.positions[self.position_roles.updated()]
    }

    /// Latest complete velocities.
    pub fn velocities(&self) -> &[Vec3] {
        &self.velocities[self.velocity_roles.updated()]
    }

    /// Current role bookkeeping for the position pair.
    pub fn position_roles(&self) -> PingPong {
        self.position_roles
    }

    /// Current role bookkeeping for the velocity pair.
    pub fn velocity_roles(&self) -> PingPong {
        self.velocity_roles
    }

    pub fn grid(&self) -> ParticleGrid {
        self.grid
    }

    pub fn frames(&self) -> u64 {
        self.frames
    }

    pub fn params_mut(&mut self) -> &mut StepParams {
        &mut self.params
    }

    /// Swap in a regenerated field. Only valid between frames.
    pub fn replace_field(&mut self, field: FlowField) {
        self.field = field;
    }

    /// Mean particle speed.
    pub fn mean_speed(&self) -> f32 {
        let v = self.velocities();
        if v.is_empty() {
            return 0.0;
        }
        v.iter().map(|v| v.length()).sum::<f32>() / v.len() as f32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(gravity_enabled: bool) -> StepParams {
        StepParams {
            gravity_enabled,
            ..StepParams::from_config(&SimConfig::new())
        }
    }

    #[test]
    fn test_wrap_large_values() {
        for v in [-1e6_f32, -100.0, -1e-9, 0.0, 99.9999, 100.0, 250.5, 1e7] {
            let w = wrap(Vec3::splat(v), 100.0);
            assert!(w.cmpge(Vec3::ZERO).all() && w.cmplt(Vec3::splat(100.0)).all(), "{} -> {:?}", v, w);
        }
        assert_eq!(wrap(Vec3::new(105.0, -5.0, 50.0), 100.0), Vec3::new(5.0, 95.0, 50.0));
    }

    #[test]
    fn test_position_phase_scales_by_max_speed() {
        let p = next_position(Vec3::splat(10.0), Vec3::new(1.0, 0.0, 0.0), 0.1, &params(false));
        assert!((p - Vec3::new(16.0, 10.0, 10.0)).length() < 1e-4);
    }

    #[test]
    fn test_velocity_branches_are_exclusive() {
        let field = FlowField::neutral(10);
        let v = Vec3::new(1.0, 0.0, 0.0);

        let damped = next_velocity(Vec3::splat(5.0), v, &field, &params(false));
        assert!((damped - Vec3::new(0.98, 0.0, 0.0)).length() < 1e-6);

        // Neutral field: target is zero, so 1/20 of the gap closes, plus gravity.
        let steered = next_velocity(Vec3::splat(5.0), v, &field, &params(true));
        assert!((steered - Vec3::new(0.95, -0.02, 0.0)).length() < 1e-6);
    }

    #[test]
    fn test_swap_once_per_frame() {
        let config = SimConfig::new().with_particle_count(16);
        let mut sim = CpuSimulation::new(&config, FlowField::neutral(10));
        let mut sequence = Vec::new();
        for _ in 0..6 {
            sequence.push(sim.position_roles().updated());
            assert_eq!(sim.position_roles(), sim.velocity_roles());
            sim.step(1.0 / 60.0);
        }
        assert_eq!(sequence, vec![0, 1, 0, 1, 0, 1]);
        assert_eq!(sim.frames(), 6);
    }

    #[test]
    fn test_velocity_phase_reads_new_positions() {
        // Two-cell field: left half pushes +x, right half pushes -x.
        let mut cells = Vec::new();
        for x in 0..2 {
            for _ in 0..4 {
                cells.push(if x == 0 { Vec3::new(1.0, 0.5, 0.5) } else { Vec3::new(0.0, 0.5, 0.5) });
            }
        }
        let field = FlowField::from_raw(2, cells).unwrap();
        let grid = ParticleGrid::for_count(1);
        let mut p = params(true);
        p.gravity = Vec3::ZERO;
        p.max_speed = 1.0;
        // Starts in the left half, moves into the right half during the position phase.
        let mut sim = CpuSimulation::from_state(grid, vec![Vec3::new(45.0, 10.0, 10.0)], vec![Vec3::new(10.0, 0.0, 0.0)], field, p);
        sim.step(1.0);
        assert!(sim.positions()[0].x > 50.0);
        // Target is -1 on x: 10 + (-1 - 10) / 20
        assert!((sim.velocities()[0].x - (10.0 - 11.0 / 20.0)).abs() < 1e-5);
    }

    #[test]
    fn test_replace_field() {
        let config = SimConfig::new().with_particle_count(4).with_gravity_enabled(true);
        let mut sim = CpuSimulation::new(&config, FlowField::neutral(10));
        let field = crate::flow_field::FlowFieldGenerator::new(10).generate(3, 0.0);
        sim.replace_field(field.clone());
        assert_eq!(sim.field, field);
    }
}
