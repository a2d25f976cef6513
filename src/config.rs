//! Simulation configuration.
//!
//! Every tunable lives in [`SimConfig`]. Build it with the `with_*` methods,
//! then call [`SimConfig::validate`] before generating anything: malformed
//! values are rejected here, never discovered mid-frame.
//!
//! ```ignore
//! let config = SimConfig::new()
//!     .with_particle_count(250_000)
//!     .with_field_size(10)
//!     .with_gravity_enabled(true);
//! config.validate()?;
//! ```

use glam::Vec3;

use crate::error::ConfigError;
use crate::gpu::particle_limit;
use crate::noise::NoiseMode;
use crate::particles::ParticleGrid;

/// Default requested particle count. Rounds to a 438 x 437 grid exactly.
pub const DEFAULT_PARTICLE_COUNT: u32 = 191_406;

/// Default flow field resolution per axis.
pub const DEFAULT_FIELD_SIZE: u32 = 10;

/// Default world extent per axis; particles live in `[0, WORLD_SIZE)³`.
pub const DEFAULT_WORLD_SIZE: f32 = 100.0;

/// Default cap on the particle count (16 bytes per particle per buffer).
///
/// Caps are validated against wgpu's default storage binding limit; the
/// device's own limits may lower them further at startup.
pub const DEFAULT_MAX_PARTICLES: u32 = 1 << 22;

/// Configuration for a flow-field particle simulation.
#[derive(Clone, Debug, PartialEq)]
pub struct SimConfig {
    /// Requested particle count. Rounded to a `ceil(√n) x floor(√n)` grid.
    pub particle_count: u32,
    /// Upper bound for the particle count after resizing.
    pub max_particles: u32,
    /// Base sprite size in pixels (visual only).
    pub particle_size: f32,
    /// Flow field cells per axis.
    pub field_size: u32,
    /// World extent per axis. Positions wrap into `[0, world_size)`.
    pub world_size: f32,
    /// Multiplier applied to every generated field component.
    pub max_force: f32,
    /// Scales velocity into world units per second.
    pub max_speed: f32,
    /// Constant bias added each frame while gravity is enabled.
    pub gravity: Vec3,
    /// Fraction divisor for closing the gap to the field velocity (1/20 per frame).
    pub steering: f32,
    /// Multiplicative damping applied each frame while gravity is disabled.
    pub damping: f32,
    /// Whether the velocity phase steers through the field with gravity.
    pub gravity_enabled: bool,
    /// Seed for the initial field and particle spawn.
    pub seed: u64,
    /// How the noise table is refreshed during field generation.
    pub noise_mode: NoiseMode,
}

impl SimConfig {
    /// Create a configuration with the stock tuning.
    pub fn new() -> Self {
        Self {
            particle_count: DEFAULT_PARTICLE_COUNT,
            max_particles: DEFAULT_MAX_PARTICLES,
            particle_size: 1.0,
            field_size: DEFAULT_FIELD_SIZE,
            world_size: DEFAULT_WORLD_SIZE,
            max_force: 1.0,
            max_speed: 60.0,
            gravity: Vec3::new(0.0, -0.02, 0.0),
            steering: 20.0,
            damping: 0.98,
            gravity_enabled: false,
            seed: 0x5eed_f10e,
            noise_mode: NoiseMode::Coherent,
        }
    }

    /// Set the requested particle count.
    pub fn with_particle_count(mut self, count: u32) -> Self {
        self.particle_count = count;
        self
    }

    /// Set the particle cap used when resizing.
    pub fn with_max_particles(mut self, max: u32) -> Self {
        self.max_particles = max;
        self
    }

    /// Set the base sprite size in pixels.
    pub fn with_particle_size(mut self, size: f32) -> Self {
        self.particle_size = size;
        self
    }

    /// Set the flow field resolution per axis.
    pub fn with_field_size(mut self, size: u32) -> Self {
        self.field_size = size;
        self
    }

    /// Set the world extent per axis.
    pub fn with_world_size(mut self, size: f32) -> Self {
        self.world_size = size;
        self
    }

    /// Set the field force multiplier.
    pub fn with_max_force(mut self, force: f32) -> Self {
        self.max_force = force;
        self
    }

    /// Set the velocity-to-world scale.
    pub fn with_max_speed(mut self, speed: f32) -> Self {
        self.max_speed = speed;
        self
    }

    /// Set the gravity bias vector.
    pub fn with_gravity(mut self, gravity: Vec3) -> Self {
        self.gravity = gravity;
        self
    }

    /// Set the steering divisor.
    pub fn with_steering(mut self, steering: f32) -> Self {
        self.steering = steering;
        self
    }

    /// Set the damping factor used when gravity is off.
    pub fn with_damping(mut self, damping: f32) -> Self {
        self.damping = damping;
        self
    }

    /// Start with gravity (and field steering) on or off.
    pub fn with_gravity_enabled(mut self, enabled: bool) -> Self {
        self.gravity_enabled = enabled;
        self
    }

    /// Set the RNG seed.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Choose how the noise table behaves during generation.
    pub fn with_noise_mode(mut self, mode: NoiseMode) -> Self {
        self.noise_mode = mode;
        self
    }

    /// Check every parameter. Call before generating the field or buffers.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.field_size == 0 {
            return Err(ConfigError::ZeroFieldSize);
        }
        if !self.world_size.is_finite() || self.world_size <= 0.0 {
            return Err(ConfigError::InvalidWorldSize(self.world_size));
        }
        if !self.steering.is_finite() || self.steering == 0.0 {
            return Err(ConfigError::InvalidSteering(self.steering));
        }
        if !self.particle_size.is_finite() || self.particle_size <= 0.0 {
            return Err(ConfigError::InvalidParticleSize(self.particle_size));
        }
        if self.max_particles == 0 {
            return Err(ConfigError::ZeroParticleCap);
        }
        let limit = particle_limit(&wgpu::Limits::default());
        if self.max_particles > limit {
            return Err(ConfigError::ParticleCapTooLarge {
                max_particles: self.max_particles,
                limit,
            });
        }
        let scalars = [
            ("max_force", self.max_force),
            ("max_speed", self.max_speed),
            ("damping", self.damping),
        ];
        for (name, value) in scalars {
            if !value.is_finite() {
                return Err(ConfigError::NonFinite(name));
            }
        }
        if !self.gravity.is_finite() {
            return Err(ConfigError::NonFinite("gravity"));
        }
        Ok(())
    }

    /// The particle grid this configuration resolves to.
    pub fn particle_grid(&self) -> ParticleGrid {
        ParticleGrid::for_count_capped(self.particle_count, self.max_particles)
    }

    /// Number of cells in the flow field.
    pub fn field_cells(&self) -> usize {
        let n = self.field_size as usize;
        n * n * n
    }
}

impl Default for SimConfig {
    fn default() -> Self {
        Self::new()
    }
}
