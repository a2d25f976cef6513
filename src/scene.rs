//! Viewer state that the user can change at runtime.
//!
//! One-shot key presses become [`Action`]s; [`Scene::apply`] folds an action
//! into the state and reports what the frame loop must rebuild. Everything
//! here is plain data so it can be exercised without a window or a GPU.

use crate::camera::MoveIntent;
use crate::config::SimConfig;
use crate::input::{Input, KeyCode};
use crate::particles::ParticleGrid;

/// A discrete user command.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Action {
    DoubleParticles,
    HalveParticles,
    ToggleGravity,
    ToggleFieldOverlay,
    RegenerateField,
    /// Set the sprite size to 1..=6.
    SetParticleSize(u8),
    Quit,
}

/// Key bindings, in the order actions are applied within one frame.
const BINDINGS: &[(KeyCode, Action)] = &[
    (KeyCode::Escape, Action::Quit),
    (KeyCode::Plus, Action::DoubleParticles),
    (KeyCode::Minus, Action::HalveParticles),
    (KeyCode::G, Action::ToggleGravity),
    (KeyCode::F, Action::ToggleFieldOverlay),
    (KeyCode::R, Action::RegenerateField),
    (KeyCode::Key1, Action::SetParticleSize(1)),
    (KeyCode::Key2, Action::SetParticleSize(2)),
    (KeyCode::Key3, Action::SetParticleSize(3)),
    (KeyCode::Key4, Action::SetParticleSize(4)),
    (KeyCode::Key5, Action::SetParticleSize(5)),
    (KeyCode::Key6, Action::SetParticleSize(6)),
];

impl Action {
    /// The action bound to a key, if any.
    pub fn for_key(key: KeyCode) -> Option<Action> {
        BINDINGS.iter().find(|(k, _)| *k == key).map(|(_, a)| *a)
    }

    /// Consume every pending one-shot press that maps to an action.
    pub fn drain(input: &mut Input) -> Vec<Action> {
        BINDINGS
            .iter()
            .filter(|(key, _)| input.consume_press(*key))
            .map(|(_, action)| *action)
            .collect()
    }
}

/// Movement intent from the keys currently held.
pub fn move_intent(input: &Input) -> MoveIntent {
    MoveIntent {
        forward: input.key_held(KeyCode::W),
        backward: input.key_held(KeyCode::S),
        left: input.key_held(KeyCode::A),
        right: input.key_held(KeyCode::D),
        up: input.key_held(KeyCode::Space),
        down: input.key_held(KeyCode::Shift),
    }
}

/// What the frame loop must do after an action.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SceneChange {
    /// State changed in place; uniforms pick it up next frame.
    None,
    /// Reallocate particle buffers for a new grid with fresh random state.
    ResizeParticles(ParticleGrid),
    /// Generate and upload a new flow field from this seed.
    RegenerateField(u64),
    Quit,
}

/// Runtime-adjustable viewer state.
#[derive(Clone, Debug, PartialEq)]
pub struct Scene {
    pub grid: ParticleGrid,
    pub gravity_enabled: bool,
    pub show_field: bool,
    pub particle_size: f32,
    max_particles: u32,
    field_seed: u64,
}

impl Scene {
    pub fn new(config: &SimConfig) -> Self {
        Self {
            grid: config.particle_grid(),
            gravity_enabled: config.gravity_enabled,
            show_field: false,
            particle_size: config.particle_size,
            max_particles: config.max_particles,
            field_seed: config.seed,
        }
    }

    /// Seed of the field currently shown.
    pub fn field_seed(&self) -> u64 {
        self.field_seed
    }

    /// Fold one action into the state.
    pub fn apply(&mut self, action: Action) -> SceneChange {
        match action {
            Action::DoubleParticles => self.resize(2.0),
            Action::HalveParticles => self.resize(0.5),
            Action::ToggleGravity => {
                self.gravity_enabled = !self.gravity_enabled;
                log::info!("gravity {}", if self.gravity_enabled { "on" } else { "off" });
                SceneChange::None
            }
            Action::ToggleFieldOverlay => {
                self.show_field = !self.show_field;
                SceneChange::None
            }
            Action::RegenerateField => {
                self.field_seed = next_seed(self.field_seed);
                SceneChange::RegenerateField(self.field_seed)
            }
            Action::SetParticleSize(size) => {
                self.particle_size = f32::from(size.clamp(1, 6));
                SceneChange::None
            }
            Action::Quit => SceneChange::Quit,
        }
    }

    /// Lower the particle cap, shrinking the current grid if needed.
    pub fn limit_particles(&mut self, max: u32) {
        self.max_particles = self.max_particles.min(max);
        self.grid = self.grid.capped(self.max_particles);
    }

    fn resize(&mut self, factor: f64) -> SceneChange {
        let grid = self.grid.scaled(factor, self.max_particles);
        if grid == self.grid {
            return SceneChange::None;
        }
        log::info!(
            "particles: {} -> {} ({}x{})",
            self.grid.count(),
            grid.count(),
            grid.width,
            grid.height
        );
        self.grid = grid;
        SceneChange::ResizeParticles(grid)
    }
}

/// SplitMix64 step; every regeneration gets a distinct, reproducible seed.
fn next_seed(seed: u64) -> u64 {
    let mut z = seed.wrapping_add(0x9e37_79b9_7f4a_7c15);
    z = (z ^ (z >> 30)).wrapping_mul(0xbf58_476d_1ce4_e5b9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94d0_49bb_1331_11eb);
    z ^ (z >> 31)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scene(count: u32) -> Scene {
        Scene::new(&SimConfig::new().with_particle_count(count))
    }

    #[test]
    fn test_held_key_yields_one_action() {
        let mut input = Input::new();
        let mut scene = scene(100);

        input.press(KeyCode::G);
        for _ in 0..30 {
            for action in Action::drain(&mut input) {
                scene.apply(action);
            }
            input.end_frame();
            // OS auto-repeat
            input.press(KeyCode::G);
        }
        assert!(scene.gravity_enabled);

        input.release(KeyCode::G);
        input.press(KeyCode::G);
        for action in Action::drain(&mut input) {
            scene.apply(action);
        }
        assert!(!scene.gravity_enabled);
    }

    #[test]
    fn test_double_and_halve() {
        let mut scene = scene(100);
        assert_eq!(
            scene.apply(Action::DoubleParticles),
            SceneChange::ResizeParticles(ParticleGrid { width: 15, height: 14 })
        );
        assert_eq!(scene.grid.count(), 210);

        let mut tiny = self::scene(1);
        assert_eq!(tiny.apply(Action::HalveParticles), SceneChange::None);
        assert_eq!(tiny.grid.count(), 1);
    }

    #[test]
    fn test_double_respects_cap() {
        let config = SimConfig::new().with_particle_count(100).with_max_particles(150);
        let mut scene = Scene::new(&config);
        scene.apply(Action::DoubleParticles);
        assert!(scene.grid.count() <= 150);
    }

    #[test]
    fn test_device_limit_bounds_resizes() {
        let mut scene = Scene::new(&SimConfig::new().with_particle_count(100));
        scene.limit_particles(120);
        assert_eq!(scene.grid.count(), 100);
        for _ in 0..10 {
            scene.apply(Action::DoubleParticles);
            assert!(scene.grid.count() <= 120);
        }

        scene.limit_particles(50);
        // 8 wide, rows dropped to fit: 8 x 6
        assert_eq!((scene.grid.width, scene.grid.height), (8, 6));
    }

    #[test]
    fn test_particle_size_keys() {
        let mut input = Input::new();
        let mut scene = scene(100);
        input.press(KeyCode::Key4);
        for action in Action::drain(&mut input) {
            scene.apply(action);
        }
        assert_eq!(scene.particle_size, 4.0);
    }

    #[test]
    fn test_regenerate_changes_seed() {
        let mut scene = scene(100);
        let mut seeds = vec![scene.field_seed()];
        for _ in 0..5 {
            match scene.apply(Action::RegenerateField) {
                SceneChange::RegenerateField(seed) => seeds.push(seed),
                other => panic!("unexpected {:?}", other),
            }
        }
        seeds.sort_unstable();
        seeds.dedup();
        assert_eq!(seeds.len(), 6);
    }

    #[test]
    fn test_overlay_toggle_and_quit() {
        let mut scene = scene(100);
        assert!(!scene.show_field);
        scene.apply(Action::ToggleFieldOverlay);
        assert!(scene.show_field);
        assert_eq!(scene.apply(Action::Quit), SceneChange::Quit);
    }

    #[test]
    fn test_move_intent_from_held_keys() {
        let mut input = Input::new();
        input.press(KeyCode::W);
        input.press(KeyCode::Shift);
        let intent = move_intent(&input);
        assert!(intent.forward && intent.down);
        assert!(!intent.backward && !intent.up);
    }

    #[test]
    fn test_key_lookup() {
        assert_eq!(Action::for_key(KeyCode::R), Some(Action::RegenerateField));
        assert_eq!(Action::for_key(KeyCode::W), None);
    }
}
