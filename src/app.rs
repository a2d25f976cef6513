//! Window, event loop, and the per-frame driver.

use std::sync::Arc;

use winit::{
    application::ApplicationHandler,
    event::WindowEvent,
    event_loop::{ActiveEventLoop, ControlFlow, EventLoop},
    window::{Window, WindowId},
};

use crate::camera::Camera;
use crate::config::SimConfig;
use crate::error::{ConfigError, SimulationError};
use crate::flow_field::FlowFieldGenerator;
use crate::gpu::{FrameParams, GpuState};
use crate::input::Input;
use crate::scene::{move_intent, Action, Scene, SceneChange};
use crate::step::{CpuSimulation, StepParams};
use crate::time::FrameTimer;

/// Fixed step used by [`run_headless`].
pub const HEADLESS_DT: f32 = 1.0 / 60.0;

/// Open a window and run until it is closed.
///
/// Configuration is validated before anything is created. Errors during
/// window or GPU setup end the event loop and are returned here.
pub fn run(config: SimConfig) -> Result<(), SimulationError> {
    config.validate()?;

    let event_loop = EventLoop::new()?;
    event_loop.set_control_flow(ControlFlow::Poll);

    let mut app = App::new(config);
    event_loop.run_app(&mut app)?;

    match app.error.take() {
        Some(e) => Err(e),
        None => Ok(()),
    }
}

/// Summary of a headless run.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct HeadlessReport {
    pub frames: u64,
    pub particles: u32,
    pub mean_speed: f32,
}

/// Step the CPU simulation for `frames` frames without opening a window.
pub fn run_headless(config: &SimConfig, frames: u64) -> Result<HeadlessReport, ConfigError> {
    config.validate()?;

    let field = generator_for(config).generate(config.seed, 0.0);
    let mut sim = CpuSimulation::new(config, field);
    for _ in 0..frames {
        sim.step(HEADLESS_DT);
    }

    Ok(HeadlessReport {
        frames: sim.frames(),
        particles: sim.grid().count(),
        mean_speed: sim.mean_speed(),
    })
}

fn generator_for(config: &SimConfig) -> FlowFieldGenerator {
    FlowFieldGenerator::new(config.field_size)
        .with_max_force(config.max_force)
        .with_mode(config.noise_mode)
}

struct App {
    config: SimConfig,
    generator: FlowFieldGenerator,
    window: Option<Arc<Window>>,
    gpu_state: Option<GpuState>,
    camera: Camera,
    input: Input,
    scene: Scene,
    step: StepParams,
    timer: FrameTimer,
    respawns: u64,
    error: Option<SimulationError>,
}

impl App {
    fn new(config: SimConfig) -> Self {
        let grid = config.particle_grid();
        if grid.count() != config.particle_count {
            log::debug!(
                "requested {} particles, using {}x{} = {}",
                config.particle_count,
                grid.width,
                grid.height,
                grid.count()
            );
        }

        Self {
            generator: generator_for(&config),
            window: None,
            gpu_state: None,
            camera: Camera::new(),
            input: Input::new(),
            scene: Scene::new(&config),
            step: StepParams::from_config(&config),
            timer: FrameTimer::new(),
            respawns: 0,
            error: None,
            config,
        }
    }

    fn fail(&mut self, event_loop: &ActiveEventLoop, error: SimulationError) {
        log::error!("{}", error);
        self.error = Some(error);
        event_loop.exit();
    }

    fn init(&mut self, event_loop: &ActiveEventLoop) -> Result<(), SimulationError> {
        let window_attrs = Window::default_attributes()
            .with_title("flowfield3d")
            .with_inner_size(winit::dpi::LogicalSize::new(1280, 720));

        let window = Arc::new(event_loop.create_window(window_attrs)?);

        let field = self.generator.generate(self.scene.field_seed(), 0.0);
        let gpu_state = pollster::block_on(GpuState::new(window.clone(), &self.config, &field))?;
        log::info!(
            "{} particles, {}^3 field cells",
            gpu_state.particle_grid().count(),
            field.size()
        );

        self.scene.limit_particles(gpu_state.max_particles());

        self.window = Some(window.clone());
        self.gpu_state = Some(gpu_state);
        self.timer = FrameTimer::new();
        window.request_redraw();
        Ok(())
    }

    fn redraw(&mut self, event_loop: &ActiveEventLoop) {
        let Some(gpu_state) = &mut self.gpu_state else {
            return;
        };

        let (dt, fps_refreshed) = self.timer.tick();

        // Actions run between frames: nothing is in flight on our side.
        for action in Action::drain(&mut self.input) {
            match self.scene.apply(action) {
                SceneChange::None => {}
                SceneChange::ResizeParticles(grid) => {
                    self.respawns += 1;
                    gpu_state.rebuild_particles(grid, self.config.seed.wrapping_add(self.respawns));
                }
                SceneChange::RegenerateField(seed) => {
                    let field = self.generator.generate(seed, 0.0);
                    gpu_state.replace_field(&field);
                    log::info!("regenerated flow field (seed {:#x})", seed);
                }
                SceneChange::Quit => {
                    event_loop.exit();
                    return;
                }
            }
        }

        let mut look = self.input.take_look_delta();
        self.camera.update(dt, &mut look, move_intent(&self.input));
        self.step.gravity_enabled = self.scene.gravity_enabled;

        let frame = FrameParams {
            delta_time: dt,
            view_proj: self.camera.view_proj(gpu_state.aspect()),
            step: &self.step,
            particle_size: self.scene.particle_size,
            show_field: self.scene.show_field,
        };

        match gpu_state.render(&frame) {
            Ok(()) => {}
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => gpu_state.reconfigure(),
            Err(wgpu::SurfaceError::OutOfMemory) => {
                log::error!("GPU out of memory");
                event_loop.exit();
            }
            Err(e) => log::warn!("Render error: {:?}", e),
        }

        self.input.end_frame();

        if let Some(window) = &self.window {
            if fps_refreshed {
                window.set_title(&format!(
                    "flowfield3d | {:.0} fps | {} particles",
                    self.timer.fps(),
                    gpu_state.particle_grid().count()
                ));
            }
            window.request_redraw();
        }
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_none() {
            if let Err(e) = self.init(event_loop) {
                self.fail(event_loop, e);
            }
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _id: WindowId, event: WindowEvent) {
        self.input.handle_event(&event);

        match event {
            WindowEvent::CloseRequested => {
                event_loop.exit();
            }
            WindowEvent::Resized(physical_size) => {
                if let Some(gpu_state) = &mut self.gpu_state {
                    gpu_state.resize(physical_size);
                    log::debug!("resized to {}x{}", physical_size.width, physical_size.height);
                }
            }
            WindowEvent::RedrawRequested => self.redraw(event_loop),
            _ => {}
        }
    }
}
