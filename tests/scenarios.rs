//! End-to-end checks of the simulation rules through the public API.

use flowfield3d::flow_field::{remap, OVERLAY_TIP_SCALE};
use flowfield3d::input::{Input, KeyCode};
use flowfield3d::step::StepParams;
use flowfield3d::{
    Action, Camera, CpuSimulation, FlowField, FlowFieldGenerator, MoveIntent, ParticleGrid, Scene,
    SceneChange, SimConfig, UVec3, Vec2, Vec3,
};

// ============================================================================
// Particle grid
// ============================================================================

#[test]
fn test_grid_rounding() {
    let grid = SimConfig::new().with_particle_count(100).particle_grid();
    assert_eq!((grid.width, grid.height, grid.count()), (10, 10, 100));

    let grid = SimConfig::new().with_particle_count(99).particle_grid();
    assert_eq!((grid.width, grid.height, grid.count()), (10, 9, 90));
}

// ============================================================================
// Simulation step
// ============================================================================

fn single_particle(velocity: Vec3, gravity_enabled: bool) -> CpuSimulation {
    let config = SimConfig::new().with_gravity_enabled(gravity_enabled);
    CpuSimulation::from_state(
        ParticleGrid::for_count(1),
        vec![Vec3::splat(50.0)],
        vec![velocity],
        FlowField::neutral(config.field_size),
        StepParams::from_config(&config),
    )
}

#[test]
fn test_damping_decay_over_fifty_frames() {
    let mut sim = single_particle(Vec3::X, false);
    for _ in 0..50 {
        sim.step(1.0 / 60.0);
    }
    let speed = sim.velocities()[0].length();
    assert!((speed - 0.98f32.powi(50)).abs() < 1e-4, "speed {}", speed);
    assert!((speed - 0.364).abs() < 1e-3);
}

#[test]
fn test_wrap_invariant_holds_for_fast_particles() {
    let config = SimConfig::new().with_particle_count(400).with_gravity_enabled(true);
    let field = FlowFieldGenerator::new(config.field_size).generate(21, 0.0);
    let grid = config.particle_grid();
    let velocities: Vec<Vec3> = (0..grid.count())
        .map(|i| Vec3::new(i as f32 - 200.0, 1e4, -(i as f32) * 37.0))
        .collect();
    let positions = vec![Vec3::splat(99.99); grid.count() as usize];
    let mut sim = CpuSimulation::from_state(grid, positions, velocities, field, StepParams::from_config(&config));

    for _ in 0..20 {
        sim.step(0.1);
        for p in sim.positions() {
            assert!(p.cmpge(Vec3::ZERO).all() && p.cmplt(Vec3::splat(config.world_size)).all(), "{:?}", p);
        }
    }
}

#[test]
fn test_roles_alternate_with_period_two() {
    let config = SimConfig::new().with_particle_count(25);
    let mut sim = CpuSimulation::new(&config, FlowField::neutral(config.field_size));
    let roles: Vec<usize> = (0..10)
        .map(|_| {
            let updated = sim.position_roles().updated();
            sim.step(1.0 / 60.0);
            updated
        })
        .collect();
    for pair in roles.windows(2) {
        assert_ne!(pair[0], pair[1]);
    }
}

#[test]
fn test_steering_converges_on_field_vector() {
    let field = FlowFieldGenerator::new(10).generate(77, 0.0);
    let config = SimConfig::new().with_gravity_enabled(true).with_gravity(Vec3::ZERO).with_max_speed(0.0);
    let position = Vec3::new(33.0, 71.0, 5.0);
    let target = field.vector_at(position, config.world_size);
    let mut sim = CpuSimulation::from_state(
        ParticleGrid::for_count(1),
        vec![position],
        vec![Vec3::ZERO],
        field,
        StepParams::from_config(&config),
    );
    // max_speed 0 pins the particle in its cell.
    for _ in 0..400 {
        sim.step(1.0 / 60.0);
    }
    assert!((sim.velocities()[0] - target).length() < 1e-3);
}

// ============================================================================
// Field and overlay agreement
// ============================================================================

#[test]
fn test_overlay_arrow_matches_sampled_vector() {
    let field = FlowFieldGenerator::new(10).generate(5, 0.0);
    for index in [0usize, 1, 10, 100, 555, 999] {
        let cell = field.cell_of(index);
        let (base, tip) = field.overlay_segment(cell, 100.0);
        let expected = remap(field.raw(cell));
        assert_eq!(field.vector_at(base, 100.0), expected);
        assert!(((tip - base) - expected * OVERLAY_TIP_SCALE).length() < 1e-5);
        assert!(expected.abs().max_element() <= 1.0);
    }
    assert_eq!(field.cell_of(field.index(UVec3::new(3, 4, 5))), UVec3::new(3, 4, 5));
}

// ============================================================================
// Input and camera
// ============================================================================

#[test]
fn test_one_shot_hold_and_repress() {
    let mut input = Input::new();
    let mut scene = Scene::new(&SimConfig::new());
    assert!(!scene.show_field);

    let run_frame = |input: &mut Input, scene: &mut Scene| {
        for action in Action::drain(input) {
            assert_eq!(scene.apply(action), SceneChange::None);
        }
        input.end_frame();
    };

    // Held for many frames with OS key repeat: one toggle.
    input.press(KeyCode::F);
    for _ in 0..20 {
        run_frame(&mut input, &mut scene);
        input.press(KeyCode::F);
    }
    assert!(scene.show_field);

    // Release and press again: exactly one more.
    input.release(KeyCode::F);
    input.press(KeyCode::F);
    run_frame(&mut input, &mut scene);
    run_frame(&mut input, &mut scene);
    assert!(!scene.show_field);
}

#[test]
fn test_camera_pitch_stays_clamped() {
    let mut camera = Camera::new();
    for i in 0..200 {
        let sign = if i % 3 == 0 { -1.0 } else { 1.0 };
        let mut delta = Vec2::new(1e5 * sign, 1e9 * sign);
        camera.update(0.016, &mut delta, MoveIntent::default());
        assert!(camera.pitch.abs() <= flowfield3d::camera::PITCH_LIMIT);
        assert!(camera.front().is_finite());
    }
}
