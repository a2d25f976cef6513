//! Error types for flowfield3d.
//!
//! Configuration problems are reported before anything is generated, GPU
//! acquisition failures are fatal at startup, and [`SimulationError`] wraps
//! everything that can stop a run.

use std::fmt;

/// Errors that can occur during GPU initialization.
#[derive(Debug)]
pub enum GpuError {
    /// Failed to create a surface for rendering.
    SurfaceCreation(wgpu::CreateSurfaceError),
    /// No compatible GPU adapter found.
    NoAdapter,
    /// Failed to create GPU device.
    DeviceCreation(wgpu::RequestDeviceError),
    /// The surface reports no usable texture format for this adapter.
    UnsupportedSurface,
}

impl fmt::Display for GpuError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GpuError::SurfaceCreation(e) => write!(f, "Failed to create GPU surface: {}", e),
            GpuError::NoAdapter => write!(f, "No compatible GPU adapter found. Ensure your system has a GPU with WebGPU/Vulkan/Metal/DX12 support."),
            GpuError::DeviceCreation(e) => write!(f, "Failed to create GPU device: {}", e),
            GpuError::UnsupportedSurface => write!(f, "The window surface is not supported by the selected adapter"),
        }
    }
}

impl std::error::Error for GpuError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            GpuError::SurfaceCreation(e) => Some(e),
            GpuError::DeviceCreation(e) => Some(e),
            _ => None,
        }
    }
}

impl From<wgpu::CreateSurfaceError> for GpuError {
    fn from(e: wgpu::CreateSurfaceError) -> Self {
        GpuError::SurfaceCreation(e)
    }
}

impl From<wgpu::RequestDeviceError> for GpuError {
    fn from(e: wgpu::RequestDeviceError) -> Self {
        GpuError::DeviceCreation(e)
    }
}

/// Malformed simulation parameters, rejected by [`crate::SimConfig::validate`].
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigError {
    /// The flow field must have at least one cell per axis.
    ZeroFieldSize,
    /// World extent must be finite and strictly positive.
    InvalidWorldSize(f32),
    /// Steering divisor must be finite and non-zero.
    InvalidSteering(f32),
    /// A tuning value is NaN or infinite.
    NonFinite(&'static str),
    /// Particle size must be positive.
    InvalidParticleSize(f32),
    /// The particle cap must allow at least one particle.
    ZeroParticleCap,
    /// The particle cap needs storage buffers larger than a GPU binding allows.
    ParticleCapTooLarge { max_particles: u32, limit: u32 },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::ZeroFieldSize => write!(f, "Flow field size must be at least 1"),
            ConfigError::InvalidWorldSize(v) => write!(f, "World size must be finite and > 0, got {}", v),
            ConfigError::InvalidSteering(v) => write!(f, "Steering divisor must be finite and non-zero, got {}", v),
            ConfigError::NonFinite(name) => write!(f, "Parameter '{}' must be a finite number", name),
            ConfigError::InvalidParticleSize(v) => write!(f, "Particle size must be > 0, got {}", v),
            ConfigError::ZeroParticleCap => write!(f, "max_particles must be at least 1"),
            ConfigError::ParticleCapTooLarge { max_particles, limit } => write!(
                f,
                "max_particles {} exceeds the storage buffer limit of {} particles",
                max_particles, limit
            ),
        }
    }
}

impl std::error::Error for ConfigError {}

/// Errors that can occur when running a simulation.
#[derive(Debug)]
pub enum SimulationError {
    /// Failed to create event loop.
    EventLoop(winit::error::EventLoopError),
    /// Failed to create window.
    Window(winit::error::OsError),
    /// GPU initialization failed.
    Gpu(GpuError),
    /// Configuration was rejected.
    Config(ConfigError),
}

impl fmt::Display for SimulationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SimulationError::EventLoop(e) => write!(f, "Failed to create event loop: {}", e),
            SimulationError::Window(e) => write!(f, "Failed to create window: {}", e),
            SimulationError::Gpu(e) => write!(f, "GPU error: {}", e),
            SimulationError::Config(e) => write!(f, "Invalid configuration: {}", e),
        }
    }
}

impl std::error::Error for SimulationError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SimulationError::EventLoop(e) => Some(e),
            SimulationError::Window(e) => Some(e),
            SimulationError::Gpu(e) => Some(e),
            SimulationError::Config(e) => Some(e),
        }
    }
}

impl From<winit::error::EventLoopError> for SimulationError {
    fn from(e: winit::error::EventLoopError) -> Self {
        SimulationError::EventLoop(e)
    }
}

impl From<winit::error::OsError> for SimulationError {
    fn from(e: winit::error::OsError) -> Self {
        SimulationError::Window(e)
    }
}

impl From<GpuError> for SimulationError {
    fn from(e: GpuError) -> Self {
        SimulationError::Gpu(e)
    }
}

impl From<ConfigError> for SimulationError {
    fn from(e: ConfigError) -> Self {
        SimulationError::Config(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_error_wraps_into_simulation_error() {
        let err: SimulationError = ConfigError::ZeroFieldSize.into();
        assert!(matches!(err, SimulationError::Config(ConfigError::ZeroFieldSize)));
        assert!(err.to_string().contains("Flow field size"));
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn test_gpu_error_messages() {
        assert!(GpuError::NoAdapter.to_string().contains("adapter"));
        let err: SimulationError = GpuError::NoAdapter.into();
        assert!(err.to_string().starts_with("GPU error"));
    }
}
