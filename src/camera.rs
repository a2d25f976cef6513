//! Free-fly camera.
//!
//! The camera has a single state, "flying", and is recomputed every frame
//! from the accumulated mouse delta and the movement keys currently held.
//! There is no queued motion: releasing a key stops the camera on the next
//! frame.

use glam::{Mat4, Vec2, Vec3};

/// Pitch limit in radians, just inside ±π/2 so the basis never flips.
pub const PITCH_LIMIT: f32 = 1.55;

/// Vertical field of view in radians.
pub const FOV_Y: f32 = std::f32::consts::FRAC_PI_4;
const Z_NEAR: f32 = 0.1;
const Z_FAR: f32 = 10_000.0;

/// Movement keys held this frame.
///
/// Holding both keys of a pair cancels that axis.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct MoveIntent {
    pub forward: bool,
    pub backward: bool,
    pub left: bool,
    pub right: bool,
    pub up: bool,
    pub down: bool,
}

/// Free-fly camera with yaw/pitch orientation.
#[derive(Clone, Debug, PartialEq)]
pub struct Camera {
    /// World-space eye position.
    pub position: Vec3,
    /// Horizontal angle in radians.
    pub yaw: f32,
    /// Vertical angle in radians, kept within `±PITCH_LIMIT`.
    pub pitch: f32,
    /// Base movement speed in world units per second.
    pub speed: f32,
    /// Multiplier on top of `speed`.
    pub speed_multiplier: f32,
    /// Radians per unit of mouse delta.
    pub sensitivity: f32,
    front: Vec3,
    target: Vec3,
}

impl Camera {
    /// World up axis.
    pub const UP: Vec3 = Vec3::Y;

    /// Create a camera just outside the corner of the world, looking in.
    pub fn new() -> Self {
        let mut camera = Self {
            position: Vec3::splat(-5.0),
            yaw: std::f32::consts::FRAC_PI_4,
            pitch: std::f32::consts::FRAC_PI_4,
            speed: 5.0,
            speed_multiplier: 10.0,
            sensitivity: 0.0015,
            front: Vec3::X,
            target: Vec3::ZERO,
        };
        camera.refresh_basis();
        camera
    }

    /// Unit view direction.
    pub fn front(&self) -> Vec3 {
        self.front
    }

    /// Unit vector to the camera's right.
    pub fn right(&self) -> Vec3 {
        self.front.cross(Self::UP).normalize()
    }

    /// Unit vector completing the orthonormal basis.
    pub fn up(&self) -> Vec3 {
        self.right().cross(self.front).normalize()
    }

    /// Point one unit in front of the camera.
    pub fn target(&self) -> Vec3 {
        self.target
    }

    /// Advance one frame.
    ///
    /// `mouse_delta` is consumed here: it is added to yaw/pitch and then
    /// cleared, so the same motion is never applied twice. Its y component is
    /// positive upward.
    pub fn update(&mut self, dt: f32, mouse_delta: &mut Vec2, intent: MoveIntent) {
        self.yaw += mouse_delta.x * self.sensitivity;
        self.pitch += mouse_delta.y * self.sensitivity;
        *mouse_delta = Vec2::ZERO;

        self.pitch = self.pitch.clamp(-PITCH_LIMIT, PITCH_LIMIT);
        self.refresh_basis();

        let step = self.speed * dt * self.speed_multiplier;

        let mut forward = self.front * axis(intent.forward, intent.backward) * step;
        let lateral = self.right() * axis(intent.right, intent.left) * step;
        self.position.y += axis(intent.up, intent.down) * step;

        // Looking up or down while moving forward partly climbs or descends
        // through the horizontal plane instead of along the view ray.
        forward.x += forward.y * self.pitch.sin() * self.yaw.cos();
        forward.z += forward.y * self.pitch.sin() * self.yaw.sin();
        forward.y = 0.0;

        self.position += lateral + forward;
        self.target = self.position + self.front;
    }

    fn refresh_basis(&mut self) {
        self.front = Vec3::new(
            self.yaw.cos() * self.pitch.cos(),
            self.pitch.sin(),
            self.yaw.sin() * self.pitch.cos(),
        )
        .normalize();
        self.target = self.position + self.front;
    }

    /// Calculate the view matrix for rendering.
    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_at_rh(self.position, self.target, Self::UP)
    }

    /// Perspective projection for a viewport aspect ratio.
    pub fn projection_matrix(aspect: f32) -> Mat4 {
        Mat4::perspective_rh(FOV_Y, aspect, Z_NEAR, Z_FAR)
    }

    /// Combined view-projection matrix.
    pub fn view_proj(&self, aspect: f32) -> Mat4 {
        Self::projection_matrix(aspect) * self.view_matrix()
    }
}

/// `1` for positive only, `-1` for negative only, `0` for neither or both.
fn axis(positive: bool, negative: bool) -> f32 {
    match (positive, negative) {
        (true, false) => 1.0,
        (false, true) => -1.0,
        _ => 0.0,
    }
}

impl Default for Camera {
    fn default() -> Self {
        Self::new()
    }
}
