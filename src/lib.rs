//! # flowfield3d
//!
//! GPU particle simulation steered by a procedural 3D flow field, viewed
//! through a free-fly camera.
//!
//! ## Quick Start
//!
//! ```ignore
//! use flowfield3d::prelude::*;
//!
//! fn main() -> Result<(), SimulationError> {
//!     flowfield3d::run(
//!         SimConfig::new()
//!             .with_particle_count(250_000)
//!             .with_gravity_enabled(true),
//!     )
//! }
//! ```
//!
//! ## Core Concepts
//!
//! ### Flow field
//!
//! A cube of `field_size³` cells, each holding a force vector built from
//! coherent value noise ([`NoiseField`]). Raw values are in `[0, 0.9375]`;
//! consumers remap them to `[-1, 1]` with [`flow_field::remap`]. The
//! simulation and the debug overlay sample through the same code, so what
//! you see is what steers the particles.
//!
//! ### Particles
//!
//! Particles are slots in a `width × height` grid with a position and a
//! velocity, each double-buffered. Per frame:
//!
//! 1. positions advance by velocity and wrap around the world cube
//! 2. velocities steer toward the field vector at the new position and
//!    pick up a small gravity bias, or, with gravity off, just decay
//!
//! then both buffers swap roles and the frame is drawn from the slots just
//! written. [`CpuSimulation`] runs the same math on the
//! CPU for tests and headless runs.
//!
//! ### Controls
//!
//! | Input | Effect |
//! |-------|--------|
//! | W/A/S/D, Space, Shift | fly |
//! | left mouse drag | look |
//! | `+` / `-` | double / halve particle count |
//! | G | toggle field steering |
//! | F | toggle field overlay |
//! | R | regenerate field |
//! | 1..6 | particle size |
//! | Escape | quit |

pub mod app;
pub mod camera;
pub mod config;
pub mod error;
pub mod flow_field;
pub mod gpu;
pub mod input;
pub mod noise;
pub mod particles;
pub mod scene;
pub mod step;
pub mod time;

pub use app::{run, run_headless, HeadlessReport};
pub use camera::{Camera, MoveIntent};
pub use config::SimConfig;
pub use error::{ConfigError, GpuError, SimulationError};
pub use flow_field::{FlowField, FlowFieldGenerator};
pub use glam::{UVec3, Vec2, Vec3};
pub use noise::{NoiseField, NoiseMode};
pub use particles::{ParticleGrid, PingPong, StepRoles};
pub use scene::{Action, Scene, SceneChange};
pub use step::{CpuSimulation, StepParams};

/// Convenient re-exports for common usage.
///
/// ```ignore
/// use flowfield3d::prelude::*;
/// ```
pub mod prelude {
    pub use crate::camera::{Camera, MoveIntent};
    pub use crate::config::SimConfig;
    pub use crate::error::{ConfigError, GpuError, SimulationError};
    pub use crate::flow_field::{FlowField, FlowFieldGenerator};
    pub use crate::input::{Input, KeyCode, MouseButton};
    pub use crate::noise::{NoiseField, NoiseMode};
    pub use crate::particles::ParticleGrid;
    pub use crate::scene::{Action, Scene};
    pub use crate::step::CpuSimulation;
    pub use glam::{Vec2, Vec3};
}
