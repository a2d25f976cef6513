//! WGSL sources and the uniform blocks they read.
//!
//! Every shader that looks at the flow field is assembled from
//! [`FIELD_SAMPLING_WGSL`], so the compute step and the debug overlay index
//! and remap cells the same way.

use bytemuck::{Pod, Zeroable};
use glam::Mat4;

use crate::flow_field::{FIELD_SAMPLING_WGSL, OVERLAY_TIP_SCALE};
use crate::particles::ParticleGrid;
use crate::step::StepParams;

/// Threads per compute workgroup along each grid axis.
pub const WORKGROUP_DIM: u32 = 8;

/// Per-frame parameters for the two compute phases.
///
/// Layout matches `SimParams` in the compute shader (48 bytes).
#[repr(C)]
#[derive(Copy, Clone, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct SimParams {
    pub gravity: [f32; 3],
    pub delta_time: f32,
    pub grid_width: u32,
    pub grid_height: u32,
    pub field_size: u32,
    pub gravity_enabled: u32,
    pub world_size: f32,
    pub max_speed: f32,
    pub steering: f32,
    pub damping: f32,
}

impl SimParams {
    pub fn new(step: &StepParams, grid: ParticleGrid, field_size: u32, delta_time: f32) -> Self {
        Self {
            gravity: step.gravity.to_array(),
            delta_time,
            grid_width: grid.width,
            grid_height: grid.height,
            field_size,
            gravity_enabled: u32::from(step.gravity_enabled),
            world_size: step.world_size,
            max_speed: step.max_speed,
            steering: step.steering,
            damping: step.damping,
        }
    }
}

/// Camera and sprite parameters shared by the particle and overlay shaders.
///
/// Layout matches `RenderUniforms` in WGSL (96 bytes).
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, Pod, Zeroable)]
pub struct RenderUniforms {
    pub view_proj: [[f32; 4]; 4],
    pub viewport: [f32; 2],
    pub particle_size: f32,
    pub world_size: f32,
    pub field_size: u32,
    pub _pad0: u32,
    pub _pad1: u32,
    pub _pad2: u32,
}

impl RenderUniforms {
    pub fn new(view_proj: Mat4, viewport: [f32; 2], particle_size: f32, world_size: f32, field_size: u32) -> Self {
        Self {
            view_proj: view_proj.to_cols_array_2d(),
            viewport,
            particle_size,
            world_size,
            field_size,
            _pad0: 0,
            _pad1: 0,
            _pad2: 0,
        }
    }
}

const RENDER_UNIFORMS_WGSL: &str = r#"
struct RenderUniforms {
    view_proj: mat4x4<f32>,
    viewport: vec2<f32>,
    particle_size: f32,
    world_size: f32,
    field_size: u32,
    _pad0: u32,
    _pad1: u32,
    _pad2: u32,
};
"#;

const COMPUTE_HEADER: &str = r#"
struct SimParams {
    gravity: vec3<f32>,
    delta_time: f32,
    grid_width: u32,
    grid_height: u32,
    field_size: u32,
    gravity_enabled: u32,
    world_size: f32,
    max_speed: f32,
    steering: f32,
    damping: f32,
};

@group(0) @binding(0) var<uniform> params: SimParams;
@group(0) @binding(1) var<storage, read> flow_field: array<f32>;

@group(1) @binding(0) var<storage, read> positions_src: array<vec4<f32>>;
@group(1) @binding(1) var<storage, read> velocities_src: array<vec4<f32>>;
@group(1) @binding(2) var<storage, read_write> positions_dst: array<vec4<f32>>;
@group(1) @binding(3) var<storage, read_write> velocities_dst: array<vec4<f32>>;
"#;

const COMPUTE_BODY: &str = r#"
// Floored modulo into [0, size).
fn wrap_world(v: vec3<f32>, size: f32) -> vec3<f32> {
    let w = v - size * floor(v / size);
    let upper = select(w, vec3<f32>(0.0), w >= vec3<f32>(size));
    return select(upper, vec3<f32>(0.0), upper < vec3<f32>(0.0));
}

fn in_grid(id: vec3<u32>) -> bool {
    return id.x < params.grid_width && id.y < params.grid_height;
}

@compute @workgroup_size(8, 8)
fn update_positions(@builtin(global_invocation_id) id: vec3<u32>) {
    if !in_grid(id) {
        return;
    }
    let i = id.y * params.grid_width + id.x;
    let p = positions_src[i].xyz;
    let v = velocities_src[i].xyz;
    let next = wrap_world(p + v * params.delta_time * params.max_speed, params.world_size);
    positions_dst[i] = vec4<f32>(next, 1.0);
}

// Runs after update_positions has finished for every particle.
@compute @workgroup_size(8, 8)
fn update_velocities(@builtin(global_invocation_id) id: vec3<u32>) {
    if !in_grid(id) {
        return;
    }
    let i = id.y * params.grid_width + id.x;
    let p = positions_dst[i].xyz;
    let v = velocities_src[i].xyz;

    var next: vec3<f32>;
    if params.gravity_enabled != 0u {
        let cell = field_cell_at(p / params.world_size, params.field_size);
        let steer = field_vector(cell, params.field_size);
        next = v + (steer - v) / params.steering + params.gravity;
    } else {
        next = v * params.damping;
    }
    velocities_dst[i] = vec4<f32>(next, 0.0);
}
"#;

const PARTICLE_BODY: &str = r#"
@group(0) @binding(0) var<uniform> uniforms: RenderUniforms;

@group(1) @binding(0) var<storage, read> positions: array<vec4<f32>>;
@group(1) @binding(1) var<storage, read> velocities: array<vec4<f32>>;

struct VertexOutput {
    @builtin(position) clip_position: vec4<f32>,
    @location(0) color: vec3<f32>,
    @location(1) uv: vec2<f32>,
};

@vertex
fn vs_main(
    @builtin(vertex_index) vertex_index: u32,
    @builtin(instance_index) instance_index: u32,
) -> VertexOutput {
    var quad = array<vec2<f32>, 6>(
        vec2<f32>(-1.0, -1.0),
        vec2<f32>(1.0, -1.0),
        vec2<f32>(1.0, 1.0),
        vec2<f32>(-1.0, -1.0),
        vec2<f32>(1.0, 1.0),
        vec2<f32>(-1.0, 1.0),
    );
    let corner = quad[vertex_index];

    let position = positions[instance_index].xyz;
    let speed = length(velocities[instance_index].xyz);

    var clip = uniforms.view_proj * vec4<f32>(position, 1.0);

    // Sprites shrink with distance; never below one pixel.
    let size_px = max(uniforms.particle_size * 0.5 + (uniforms.world_size - clip.w) * 0.05, 1.0);
    let half_extent = vec2<f32>(size_px) / uniforms.viewport;
    clip.x += corner.x * half_extent.x * clip.w;
    clip.y += corner.y * half_extent.y * clip.w;

    var out: VertexOutput;
    out.clip_position = clip;
    out.color = mix(vec3<f32>(0.0, 0.0, 1.0), vec3<f32>(1.0, 0.0, 0.0), clamp(speed, 0.0, 1.0));
    out.uv = corner;
    return out;
}

@fragment
fn fs_main(in: VertexOutput) -> @location(0) vec4<f32> {
    if dot(in.uv, in.uv) > 1.0 {
        discard;
    }
    return vec4<f32>(in.color, 1.0);
}
"#;

const OVERLAY_HEADER: &str = r#"
@group(0) @binding(0) var<uniform> uniforms: RenderUniforms;
@group(0) @binding(1) var<storage, read> flow_field: array<f32>;
"#;

const OVERLAY_BODY: &str = r#"
struct OverlayOutput {
    @builtin(position) clip_position: vec4<f32>,
    @location(0) color: vec3<f32>,
};

// Two vertices per cell: even = cell centre, odd = arrow tip.
@vertex
fn vs_main(@builtin(vertex_index) vertex_index: u32) -> OverlayOutput {
    let s = uniforms.field_size;
    let id = vertex_index / 2u;
    let cell = vec3<u32>(id / (s * s), (id / s) % s, id % s);

    var coords = (vec3<f32>(cell) + vec3<f32>(0.5)) / f32(s);
    var color = vec3<f32>(0.0, 1.0, 0.0);
    if (vertex_index & 1u) == 1u {
        coords += field_vector(cell, s) * OVERLAY_TIP_SCALE / uniforms.world_size;
        color = vec3<f32>(0.0);
    }

    var out: OverlayOutput;
    out.clip_position = uniforms.view_proj * vec4<f32>(coords * uniforms.world_size, 1.0);
    out.color = color;
    return out;
}

@fragment
fn fs_main(in: OverlayOutput) -> @location(0) vec4<f32> {
    return vec4<f32>(in.color, 1.0);
}
"#;

/// Compute module with `update_positions` and `update_velocities`.
pub fn compute_shader() -> String {
    [COMPUTE_HEADER, FIELD_SAMPLING_WGSL, COMPUTE_BODY].concat()
}

/// Particle sprite module with `vs_main` and `fs_main`.
pub fn particle_shader() -> String {
    [RENDER_UNIFORMS_WGSL, PARTICLE_BODY].concat()
}

/// Field overlay module with `vs_main` and `fs_main`.
pub fn overlay_shader() -> String {
    let tip = format!("const OVERLAY_TIP_SCALE: f32 = {:?};\n", OVERLAY_TIP_SCALE);
    [RENDER_UNIFORMS_WGSL, OVERLAY_HEADER, &tip, FIELD_SAMPLING_WGSL, OVERLAY_BODY].concat()
}

/// Workgroup counts covering a particle grid.
pub fn workgroups(grid: ParticleGrid) -> (u32, u32) {
    (grid.width.div_ceil(WORKGROUP_DIM), grid.height.div_ceil(WORKGROUP_DIM))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SimConfig;

    fn validate(src: &str) -> naga::Module {
        let module = match naga::front::wgsl::parse_str(src) {
            Ok(m) => m,
            Err(e) => panic!("WGSL parse error:\n{}", e.emit_to_string(src)),
        };
        let mut validator = naga::valid::Validator::new(
            naga::valid::ValidationFlags::all(),
            naga::valid::Capabilities::all(),
        );
        if let Err(e) = validator.validate(&module) {
            panic!("WGSL validation error: {:?}", e);
        }
        module
    }

    fn entry_points(module: &naga::Module) -> Vec<&str> {
        module.entry_points.iter().map(|e| e.name.as_str()).collect()
    }

    #[test]
    fn test_compute_shader_validates() {
        let module = validate(&compute_shader());
        let names = entry_points(&module);
        assert!(names.contains(&"update_positions"));
        assert!(names.contains(&"update_velocities"));
    }

    #[test]
    fn test_particle_shader_validates() {
        let module = validate(&particle_shader());
        assert_eq!(entry_points(&module).len(), 2);
    }

    #[test]
    fn test_overlay_shader_validates() {
        let module = validate(&overlay_shader());
        assert_eq!(entry_points(&module).len(), 2);
    }

    #[test]
    fn test_uniform_sizes_match_wgsl() {
        assert_eq!(std::mem::size_of::<SimParams>(), 48);
        assert_eq!(std::mem::size_of::<RenderUniforms>(), 96);

        let module = validate(&compute_shader());
        let mut layouter = naga::proc::Layouter::default();
        layouter.update(module.to_ctx()).unwrap();
        let sim = module
            .types
            .iter()
            .find(|(_, ty)| ty.name.as_deref() == Some("SimParams"))
            .map(|(handle, _)| handle)
            .unwrap();
        assert_eq!(layouter[sim].size, 48);

        let module = validate(&particle_shader());
        let mut layouter = naga::proc::Layouter::default();
        layouter.update(module.to_ctx()).unwrap();
        let render = module
            .types
            .iter()
            .find(|(_, ty)| ty.name.as_deref() == Some("RenderUniforms"))
            .map(|(handle, _)| handle)
            .unwrap();
        assert_eq!(layouter[render].size, 96);
    }

    #[test]
    fn test_sim_params_from_step() {
        let config = SimConfig::new().with_gravity_enabled(true);
        let step = StepParams::from_config(&config);
        let params = SimParams::new(&step, ParticleGrid::for_count(99), 10, 0.016);
        assert_eq!((params.grid_width, params.grid_height), (10, 9));
        assert_eq!(params.gravity_enabled, 1);
        assert_eq!(params.gravity, [0.0, -0.02, 0.0]);
    }

    #[test]
    fn test_workgroups_cover_grid() {
        assert_eq!(workgroups(ParticleGrid { width: 438, height: 437 }), (55, 55));
        assert_eq!(workgroups(ParticleGrid { width: 8, height: 1 }), (1, 1));
    }
}
