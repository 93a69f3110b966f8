//! # Cameras
//!
//! A [`Camera`] owns the projection parameters and produces view and
//! projection matrices. Controllers move it around:
//!
//! - [`ChaseCamera`] trails a tracked rigid body with a lagging direction
//! - [`FirstPersonCamera`] is a free-fly yaw/pitch camera for inspecting a level
//!
//! The world is Z-up for the chase camera (the vehicle drives on the XY
//! plane) and Y-up for the free-fly camera, matching how each was tuned.

use crate::foundation::math::{utils, Mat4, Mat4Ext, Vec3};

/// Perspective camera
#[derive(Debug, Clone, PartialEq)]
pub struct Camera {
    /// Camera position in world space
    pub position: Vec3,

    /// Point the camera is looking at in world space
    pub target: Vec3,

    /// Up vector for camera orientation
    pub up: Vec3,

    /// Vertical field of view in degrees
    pub fov_degrees: f32,

    /// Width over height
    pub aspect: f32,

    /// Distance to near clipping plane
    pub near: f32,

    /// Distance to far clipping plane
    pub far: f32,
}

impl Camera {
    /// Create a perspective camera looking at the origin with +Y up
    pub fn perspective(position: Vec3, fov_degrees: f32, aspect: f32, near: f32, far: f32) -> Self {
        Self {
            position,
            target: Vec3::zeros(),
            up: Vec3::y(),
            fov_degrees,
            aspect,
            near,
            far,
        }
    }

    /// Configure camera to look at a specific point with custom up vector
    pub fn look_at(&mut self, target: Vec3, up: Vec3) {
        self.target = target;
        self.up = up;
    }

    /// Update camera aspect ratio for viewport changes
    pub fn set_aspect_ratio(&mut self, aspect: f32) {
        if (self.aspect - aspect).abs() > 0.01 {
            log::info!("Camera aspect ratio changed: {:.3} -> {:.3}", self.aspect, aspect);
        }
        self.aspect = aspect;
    }

    /// World-to-camera transformation
    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_at(self.position, self.target, self.up)
    }

    /// Perspective projection
    pub fn projection_matrix(&self) -> Mat4 {
        Mat4::perspective_gl(self.fov_degrees, self.aspect, self.near, self.far)
    }

    /// Combined projection * view
    pub fn view_projection_matrix(&self) -> Mat4 {
        self.projection_matrix() * self.view_matrix()
    }
}

/// Camera that trails a moving body
///
/// Each update the trailing direction eases towards the body's forward
/// vector by `delta_ms * 0.001`, so sharp turns swing the camera round
/// gradually instead of snapping.
#[derive(Debug, Clone, PartialEq)]
pub struct ChaseCamera {
    direction: Vec3,
    distance: f32,
    height: f32,
    look_height: f32,
}

impl ChaseCamera {
    /// Ease rate per millisecond
    pub const EASE_PER_MS: f32 = 0.001;

    /// Chase camera initially looking along `forward`
    pub fn new(forward: Vec3) -> Self {
        Self {
            direction: forward,
            distance: 4.0,
            height: 2.5,
            look_height: 0.5,
        }
    }

    /// Current trailing direction
    pub fn direction(&self) -> Vec3 {
        self.direction
    }

    /// Follow a body whose model matrix is `body`, writing into `camera`
    pub fn update(&mut self, camera: &mut Camera, body: &Mat4, delta_ms: f32) {
        let origin = body.fixed_view::<3, 1>(0, 3).into_owned();
        let forward = body.fixed_view::<3, 1>(0, 0).into_owned();

        let t = (delta_ms * Self::EASE_PER_MS).clamp(0.0, 1.0);
        self.direction = Vec3::new(
            utils::lerp(self.direction.x, forward.x, t),
            utils::lerp(self.direction.y, forward.y, t),
            utils::lerp(self.direction.z, forward.z, t),
        );

        camera.position = origin - self.direction * self.distance + Vec3::new(0.0, 0.0, self.height);
        camera.look_at(origin + Vec3::new(0.0, 0.0, self.look_height), Vec3::z());
    }
}

/// Free-fly camera driven by mouse deltas and movement keys
#[derive(Debug, Clone, PartialEq)]
pub struct FirstPersonCamera {
    position: Vec3,
    yaw: f32,
    pitch: f32,
    speed: f32,
}

impl Default for FirstPersonCamera {
    fn default() -> Self {
        Self {
            position: Vec3::new(0.0, 0.0, 10.0),
            yaw: 0.0,
            pitch: 0.0,
            speed: 1.0,
        }
    }
}

impl FirstPersonCamera {
    /// Pixels of mouse travel per radian
    const MOUSE_SCALE: f32 = 100.0;

    /// Free-fly camera at `position`
    pub fn new(position: Vec3) -> Self {
        Self {
            position,
            ..Self::default()
        }
    }

    /// Set movement speed in units per call
    pub fn with_speed(mut self, speed: f32) -> Self {
        self.speed = speed;
        self
    }

    /// Current position
    pub fn position(&self) -> Vec3 {
        self.position
    }

    /// Apply a mouse delta in pixels
    pub fn turn(&mut self, dx: f32, dy: f32) {
        self.yaw += dx / Self::MOUSE_SCALE;
        self.pitch = (self.pitch - dy / Self::MOUSE_SCALE)
            .clamp(-std::f32::consts::FRAC_PI_2, std::f32::consts::FRAC_PI_2);
    }

    /// Look direction
    pub fn direction(&self) -> Vec3 {
        Vec3::new(self.yaw.cos(), self.pitch.sin(), self.yaw.sin()).normalize()
    }

    /// Move along the look direction (negative moves back)
    pub fn advance(&mut self, amount: f32) {
        self.position += self.direction() * amount * self.speed;
    }

    /// Move sideways (positive is right)
    pub fn strafe(&mut self, amount: f32) {
        let right = self.direction().cross(&Vec3::y());
        if let Some(right) = right.try_normalize(f32::EPSILON) {
            self.position += right * amount * self.speed;
        }
    }

    /// Write position and orientation into `camera`
    pub fn apply(&self, camera: &mut Camera) {
        camera.position = self.position;
        camera.look_at(self.position + self.direction(), Vec3::y());
    }
}
