//! GPU state: surface, pipelines, and per-frame encoding.
//!
//! A frame is one command buffer with, in order:
//!
//! 1. the position compute pass
//! 2. the velocity compute pass
//! 3. the render pass (particle sprites, then the field overlay if shown)
//!
//! The roles flip between 2 and 3, so rendering binds the slots this frame's
//! step just wrote.

mod field;
mod overlay;
mod particles;
pub mod shaders;

use std::sync::Arc;

use glam::Mat4;
use wgpu::util::DeviceExt;
use winit::window::Window;

use crate::config::SimConfig;
use crate::error::GpuError;
use crate::flow_field::FlowField;
use crate::particles::{spawn, ParticleGrid};
use crate::step::StepParams;

pub use field::FlowFieldGpu;
pub use overlay::FieldOverlay;
pub use particles::{particle_limit, ParticleBuffersGpu};
pub use shaders::{RenderUniforms, SimParams};

const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;

/// Per-frame inputs to [`GpuState::render`].
#[derive(Clone, Copy, Debug)]
pub struct FrameParams<'a> {
    pub delta_time: f32,
    pub view_proj: Mat4,
    pub step: &'a StepParams,
    pub particle_size: f32,
    pub show_field: bool,
}

pub struct GpuState {
    surface: wgpu::Surface<'static>,
    device: wgpu::Device,
    queue: wgpu::Queue,
    pub config: wgpu::SurfaceConfiguration,
    depth_texture: wgpu::TextureView,

    sim_params_buffer: wgpu::Buffer,
    render_uniform_buffer: wgpu::Buffer,

    compute_globals_layout: wgpu::BindGroupLayout,
    compute_globals: wgpu::BindGroup,
    particle_compute_layout: wgpu::BindGroupLayout,
    particle_render_layout: wgpu::BindGroupLayout,
    render_globals: wgpu::BindGroup,

    position_pipeline: wgpu::ComputePipeline,
    velocity_pipeline: wgpu::ComputePipeline,
    render_pipeline: wgpu::RenderPipeline,

    field: FlowFieldGpu,
    particles: ParticleBuffersGpu,
    overlay: FieldOverlay,
    world_size: f32,
    max_particles: u32,
}

impl GpuState {
    pub async fn new(window: Arc<Window>, sim: &SimConfig, flow_field: &FlowField) -> Result<Self, GpuError> {
        let size = window.inner_size();

        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::PRIMARY,
            ..Default::default()
        });

        let surface = instance.create_surface(window)?;

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .ok_or(GpuError::NoAdapter)?;

        let info = adapter.get_info();
        log::info!("Using adapter: {} ({:?})", info.name, info.backend);

        let (device, queue) = adapter
            .request_device(
                &wgpu::DeviceDescriptor {
                    label: Some("Device"),
                    required_features: wgpu::Features::empty(),
                    required_limits: wgpu::Limits::default(),
                    memory_hints: Default::default(),
                },
                None,
            )
            .await?;

        let surface_caps = surface.get_capabilities(&adapter);
        let surface_format = surface_caps
            .formats
            .iter()
            .find(|f| f.is_srgb())
            .or_else(|| surface_caps.formats.first())
            .copied()
            .ok_or(GpuError::UnsupportedSurface)?;

        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width: size.width.max(1),
            height: size.height.max(1),
            present_mode: wgpu::PresentMode::AutoVsync,
            alpha_mode: surface_caps
                .alpha_modes
                .first()
                .copied()
                .unwrap_or(wgpu::CompositeAlphaMode::Auto),
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&device, &config);

        let depth_texture = create_depth_texture(&device, &config);

        let sim_params_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Sim Params Buffer"),
            contents: bytemuck::bytes_of(&SimParams::default()),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });

        let render_uniforms = RenderUniforms::new(
            Mat4::IDENTITY,
            [config.width as f32, config.height as f32],
            sim.particle_size,
            sim.world_size,
            sim.field_size,
        );
        let render_uniform_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Render Uniform Buffer"),
            contents: bytemuck::bytes_of(&render_uniforms),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });

        let field = FlowFieldGpu::new(&device, flow_field);

        // Compute group 0: params + flow field
        let compute_globals_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Compute Globals Bind Group Layout"),
            entries: &[
                uniform_entry(0, wgpu::ShaderStages::COMPUTE),
                storage_entry(1, true, wgpu::ShaderStages::COMPUTE),
            ],
        });
        let compute_globals = create_compute_globals(&device, &compute_globals_layout, &sim_params_buffer, &field);

        // Compute group 1: updated slots in, written slots out
        let particle_compute_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Particle Compute Bind Group Layout"),
            entries: &[
                storage_entry(0, true, wgpu::ShaderStages::COMPUTE),
                storage_entry(1, true, wgpu::ShaderStages::COMPUTE),
                storage_entry(2, false, wgpu::ShaderStages::COMPUTE),
                storage_entry(3, false, wgpu::ShaderStages::COMPUTE),
            ],
        });

        // Render group 0: uniforms
        let render_globals_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Render Globals Bind Group Layout"),
            entries: &[uniform_entry(0, wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT)],
        });
        let render_globals = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Render Globals Bind Group"),
            layout: &render_globals_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: render_uniform_buffer.as_entire_binding(),
            }],
        });

        // Render group 1: updated position and velocity slots
        let particle_render_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Particle Render Bind Group Layout"),
            entries: &[
                storage_entry(0, true, wgpu::ShaderStages::VERTEX),
                storage_entry(1, true, wgpu::ShaderStages::VERTEX),
            ],
        });

        // Compute pipelines
        let compute_shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Compute Shader"),
            source: wgpu::ShaderSource::Wgsl(shaders::compute_shader().into()),
        });

        let compute_pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Compute Pipeline Layout"),
            bind_group_layouts: &[&compute_globals_layout, &particle_compute_layout],
            push_constant_ranges: &[],
        });

        let create_compute_pipeline = |label: &str, entry_point: &str| {
            device.create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
                label: Some(label),
                layout: Some(&compute_pipeline_layout),
                module: &compute_shader,
                entry_point: Some(entry_point),
                compilation_options: Default::default(),
                cache: None,
            })
        };
        let position_pipeline = create_compute_pipeline("Position Pipeline", "update_positions");
        let velocity_pipeline = create_compute_pipeline("Velocity Pipeline", "update_velocities");

        // Render pipeline
        let render_shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Particle Shader"),
            source: wgpu::ShaderSource::Wgsl(shaders::particle_shader().into()),
        });

        let render_pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Render Pipeline Layout"),
            bind_group_layouts: &[&render_globals_layout, &particle_render_layout],
            push_constant_ranges: &[],
        });

        let additive = wgpu::BlendComponent {
            src_factor: wgpu::BlendFactor::One,
            dst_factor: wgpu::BlendFactor::One,
            operation: wgpu::BlendOperation::Add,
        };

        let render_pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("Render Pipeline"),
            layout: Some(&render_pipeline_layout),
            vertex: wgpu::VertexState {
                module: &render_shader,
                entry_point: Some("vs_main"),
                buffers: &[],
                compilation_options: Default::default(),
            },
            fragment: Some(wgpu::FragmentState {
                module: &render_shader,
                entry_point: Some("fs_main"),
                targets: &[Some(wgpu::ColorTargetState {
                    format: config.format,
                    blend: Some(wgpu::BlendState {
                        color: additive,
                        alpha: additive,
                    }),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: Default::default(),
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                strip_index_format: None,
                front_face: wgpu::FrontFace::Ccw,
                cull_mode: None,
                polygon_mode: wgpu::PolygonMode::Fill,
                unclipped_depth: false,
                conservative: false,
            },
            // Additive sprites are order independent; test but never write depth.
            depth_stencil: Some(wgpu::DepthStencilState {
                format: DEPTH_FORMAT,
                depth_write_enabled: false,
                depth_compare: wgpu::CompareFunction::Less,
                stencil: wgpu::StencilState::default(),
                bias: wgpu::DepthBiasState::default(),
            }),
            multisample: wgpu::MultisampleState::default(),
            multiview: None,
            cache: None,
        });

        let max_particles = sim.max_particles.min(particle_limit(&device.limits()));
        let grid = ParticleGrid::for_count_capped(sim.particle_count, max_particles);
        if grid != sim.particle_grid() {
            log::warn!("particle count clamped to {} by device limits", grid.count());
        }
        let (positions, velocities) = spawn(grid, sim.world_size, sim.seed);
        let particles = ParticleBuffersGpu::new(
            &device,
            &particle_compute_layout,
            &particle_render_layout,
            grid,
            &positions,
            &velocities,
        );

        let overlay = FieldOverlay::new(&device, &render_uniform_buffer, &field, config.format);

        Ok(Self {
            surface,
            device,
            queue,
            config,
            depth_texture,
            sim_params_buffer,
            render_uniform_buffer,
            compute_globals_layout,
            compute_globals,
            particle_compute_layout,
            particle_render_layout,
            render_globals,
            position_pipeline,
            velocity_pipeline,
            render_pipeline,
            field,
            particles,
            overlay,
            world_size: sim.world_size,
            max_particles,
        })
    }

    pub fn resize(&mut self, new_size: winit::dpi::PhysicalSize<u32>) {
        if new_size.width > 0 && new_size.height > 0 {
            self.config.width = new_size.width;
            self.config.height = new_size.height;
            self.reconfigure();
        }
    }

    /// Reapply the surface configuration, e.g. after the surface was lost.
    pub fn reconfigure(&mut self) {
        self.surface.configure(&self.device, &self.config);
        self.depth_texture = create_depth_texture(&self.device, &self.config);
    }

    pub fn aspect(&self) -> f32 {
        self.config.width as f32 / self.config.height as f32
    }

    pub fn particle_grid(&self) -> ParticleGrid {
        self.particles.grid()
    }

    /// Largest particle count the device can hold.
    pub fn max_particles(&self) -> u32 {
        self.max_particles
    }

    /// Replace the particle buffers with a fresh random population.
    ///
    /// Grids over the device limit are shrunk to fit.
    pub fn rebuild_particles(&mut self, grid: ParticleGrid, seed: u64) {
        let grid = grid.capped(self.max_particles);
        let (positions, velocities) = spawn(grid, self.world_size, seed);
        self.particles = ParticleBuffersGpu::new(
            &self.device,
            &self.particle_compute_layout,
            &self.particle_render_layout,
            grid,
            &positions,
            &velocities,
        );
    }

    /// Upload a regenerated flow field.
    pub fn replace_field(&mut self, flow_field: &FlowField) {
        if self.field.write(&self.queue, flow_field) {
            return;
        }
        log::debug!("field size changed {} -> {}, reallocating", self.field.size(), flow_field.size());
        self.field = FlowFieldGpu::new(&self.device, flow_field);
        self.compute_globals = create_compute_globals(
            &self.device,
            &self.compute_globals_layout,
            &self.sim_params_buffer,
            &self.field,
        );
        self.overlay.rebind(&self.device, &self.render_uniform_buffer, &self.field);
    }

    fn update_uniforms(&self, frame: &FrameParams) {
        let sim = SimParams::new(frame.step, self.particles.grid(), self.field.size(), frame.delta_time);
        self.queue.write_buffer(&self.sim_params_buffer, 0, bytemuck::bytes_of(&sim));

        let render = RenderUniforms::new(
            frame.view_proj,
            [self.config.width as f32, self.config.height as f32],
            frame.particle_size,
            frame.step.world_size,
            self.field.size(),
        );
        self.queue.write_buffer(&self.render_uniform_buffer, 0, bytemuck::bytes_of(&render));
    }

    /// Step the simulation and draw one frame.
    pub fn render(&mut self, frame: &FrameParams) -> Result<(), wgpu::SurfaceError> {
        let output = self.surface.get_current_texture()?;
        let view = output
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        self.update_uniforms(frame);

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Frame Encoder"),
            });

        let (groups_x, groups_y) = shaders::workgroups(self.particles.grid());
        let slots = self.particles.advance();

        // Separate passes: every position is written before any velocity reads one.
        for (label, pipeline) in [
            ("Position Pass", &self.position_pipeline),
            ("Velocity Pass", &self.velocity_pipeline),
        ] {
            let mut compute_pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
                label: Some(label),
                timestamp_writes: None,
            });
            compute_pass.set_pipeline(pipeline);
            compute_pass.set_bind_group(0, &self.compute_globals, &[]);
            compute_pass.set_bind_group(1, self.particles.compute_bind_group(&slots), &[]);
            compute_pass.dispatch_workgroups(groups_x, groups_y, 1);
        }

        {
            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Render Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color {
                            r: 0.02,
                            g: 0.02,
                            b: 0.05,
                            a: 1.0,
                        }),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &self.depth_texture,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                timestamp_writes: None,
                occlusion_query_set: None,
            });

            render_pass.set_pipeline(&self.render_pipeline);
            render_pass.set_bind_group(0, &self.render_globals, &[]);
            render_pass.set_bind_group(1, self.particles.render_bind_group(&slots), &[]);
            render_pass.draw(0..6, 0..self.particles.count());

            if frame.show_field {
                self.overlay.draw(&mut render_pass);
            }
        }

        self.queue.submit(std::iter::once(encoder.finish()));
        output.present();
        Ok(())
    }
}

fn uniform_entry(binding: u32, visibility: wgpu::ShaderStages) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility,
        ty: wgpu::BindingType::Buffer {
            ty: wgpu::BufferBindingType::Uniform,
            has_dynamic_offset: false,
            min_binding_size: None,
        },
        count: None,
    }
}

fn storage_entry(binding: u32, read_only: bool, visibility: wgpu::ShaderStages) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility,
        ty: wgpu::BindingType::Buffer {
            ty: wgpu::BufferBindingType::Storage { read_only },
            has_dynamic_offset: false,
            min_binding_size: None,
        },
        count: None,
    }
}

fn create_compute_globals(
    device: &wgpu::Device,
    layout: &wgpu::BindGroupLayout,
    params: &wgpu::Buffer,
    field: &FlowFieldGpu,
) -> wgpu::BindGroup {
    device.create_bind_group(&wgpu::BindGroupDescriptor {
        label: Some("Compute Globals Bind Group"),
        layout,
        entries: &[
            wgpu::BindGroupEntry {
                binding: 0,
                resource: params.as_entire_binding(),
            },
            wgpu::BindGroupEntry {
                binding: 1,
                resource: field.buffer().as_entire_binding(),
            },
        ],
    })
}

fn create_depth_texture(
    device: &wgpu::Device,
    config: &wgpu::SurfaceConfiguration,
) -> wgpu::TextureView {
    let texture = device.create_texture(&wgpu::TextureDescriptor {
        label: Some("Depth Texture"),
        size: wgpu::Extent3d {
            width: config.width,
            height: config.height,
            depth_or_array_layers: 1,
        },
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: DEPTH_FORMAT,
        usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
        view_formats: &[],
    });
    texture.create_view(&wgpu::TextureViewDescriptor::default())
}
