//! Double-buffered particle storage on the GPU.
//!
//! Four storage buffers: two for positions and two for velocities. Bind
//! groups are built up front for every combination of "updated" slots, so a
//! frame only has to pick the right one. The compute bind group for a
//! combination reads the updated slots and writes the other two; the render
//! bind group reads the updated slots only. [`StepRoles::advance`] decides
//! which combination each pass binds.

use wgpu::util::DeviceExt;

use crate::particles::{pack_vec4, FrameSlots, ParticleGrid, StepRoles, PARTICLE_STRIDE};
use glam::Vec3;

/// Most particles one storage buffer can hold under `limits`.
pub fn particle_limit(limits: &wgpu::Limits) -> u32 {
    let bytes = (limits.max_storage_buffer_binding_size as u64).min(limits.max_buffer_size);
    (bytes / PARTICLE_STRIDE).min(u32::MAX as u64) as u32
}

/// Bind groups indexed by `[position updated slot][velocity updated slot]`.
type RoleTable = [[wgpu::BindGroup; 2]; 2];

pub struct ParticleBuffersGpu {
    grid: ParticleGrid,
    // Kept alive for the bind groups.
    #[allow(dead_code)]
    positions: [wgpu::Buffer; 2],
    #[allow(dead_code)]
    velocities: [wgpu::Buffer; 2],
    compute_bind_groups: RoleTable,
    render_bind_groups: RoleTable,
    roles: StepRoles,
}

impl ParticleBuffersGpu {
    /// Upload initial state into slot 0 of each pair.
    pub fn new(
        device: &wgpu::Device,
        compute_layout: &wgpu::BindGroupLayout,
        render_layout: &wgpu::BindGroupLayout,
        grid: ParticleGrid,
        positions: &[Vec3],
        velocities: &[Vec3],
    ) -> Self {
        let count = grid.count() as u64;
        debug_assert_eq!(positions.len() as u64, count);
        debug_assert_eq!(velocities.len() as u64, count);

        let create_pair = |name: &str, initial: &[[f32; 4]]| -> [wgpu::Buffer; 2] {
            let usage = wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_DST;
            let first = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some(&format!("{} Buffer 0", name)),
                contents: bytemuck::cast_slice(initial),
                usage,
            });
            let second = device.create_buffer(&wgpu::BufferDescriptor {
                label: Some(&format!("{} Buffer 1", name)),
                size: count * PARTICLE_STRIDE,
                usage,
                mapped_at_creation: false,
            });
            [first, second]
        };

        let positions = create_pair("Position", &pack_vec4(positions, 1.0));
        let velocities = create_pair("Velocity", &pack_vec4(velocities, 0.0));

        let compute_bind_groups: RoleTable = std::array::from_fn(|p| {
            std::array::from_fn(|v| {
                device.create_bind_group(&wgpu::BindGroupDescriptor {
                    label: Some(&format!("Particle Compute Bind Group p{} v{}", p, v)),
                    layout: compute_layout,
                    entries: &[
                        wgpu::BindGroupEntry {
                            binding: 0,
                            resource: positions[p].as_entire_binding(),
                        },
                        wgpu::BindGroupEntry {
                            binding: 1,
                            resource: velocities[v].as_entire_binding(),
                        },
                        wgpu::BindGroupEntry {
                            binding: 2,
                            resource: positions[1 - p].as_entire_binding(),
                        },
                        wgpu::BindGroupEntry {
                            binding: 3,
                            resource: velocities[1 - v].as_entire_binding(),
                        },
                    ],
                })
            })
        });

        let render_bind_groups: RoleTable = std::array::from_fn(|p| {
            std::array::from_fn(|v| {
                device.create_bind_group(&wgpu::BindGroupDescriptor {
                    label: Some(&format!("Particle Render Bind Group p{} v{}", p, v)),
                    layout: render_layout,
                    entries: &[
                        wgpu::BindGroupEntry {
                            binding: 0,
                            resource: positions[p].as_entire_binding(),
                        },
                        wgpu::BindGroupEntry {
                            binding: 1,
                            resource: velocities[v].as_entire_binding(),
                        },
                    ],
                })
            })
        });

        Self {
            grid,
            positions,
            velocities,
            compute_bind_groups,
            render_bind_groups,
            roles: StepRoles::new(),
        }
    }

    pub fn grid(&self) -> ParticleGrid {
        self.grid
    }

    pub fn count(&self) -> u32 {
        self.grid.count()
    }

    /// Flip both pairs for the step about to be encoded.
    pub fn advance(&mut self) -> FrameSlots {
        self.roles.advance()
    }

    /// Reads the step's input slots, writes the others.
    pub fn compute_bind_group(&self, slots: &FrameSlots) -> &wgpu::BindGroup {
        let [p, v] = slots.step_reads;
        &self.compute_bind_groups[p][v]
    }

    /// Reads the slots the step wrote.
    pub fn render_bind_group(&self, slots: &FrameSlots) -> &wgpu::BindGroup {
        let [p, v] = slots.render_reads;
        &self.render_bind_groups[p][v]
    }
}
