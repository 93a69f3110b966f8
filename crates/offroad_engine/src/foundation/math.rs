//! Math utilities and types
//!
//! Thin aliases over nalgebra plus the handful of matrix builders the frame
//! pipeline needs. All matrices follow the OpenGL convention: column vectors,
//! right-handed view space, clip-space depth in `[-1, 1]`.

pub use nalgebra::{Matrix3, Matrix4, Quaternion, Unit, Vector3, Vector4};

/// 3D vector type
pub type Vec3 = Vector3<f32>;

/// 4D vector type
pub type Vec4 = Vector4<f32>;

/// 4x4 matrix type
pub type Mat4 = Matrix4<f32>;

/// 3D point type
pub type Point3 = nalgebra::Point3<f32>;

/// Quaternion type for rotations
pub type Quat = Unit<Quaternion<f32>>;

/// Rigid transform: position plus orientation.
///
/// Scene objects and physics bodies never carry scale, so unlike a general
/// TRS transform this only composes a translation and a rotation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    /// Position in world space
    pub position: Vec3,

    /// Orientation
    pub rotation: Quat,
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            position: Vec3::zeros(),
            rotation: Quat::identity(),
        }
    }
}

impl Transform {
    /// Create a new identity transform
    pub fn identity() -> Self {
        Self::default()
    }

    /// Create a transform with position and rotation
    pub fn from_position_rotation(position: Vec3, rotation: Quat) -> Self {
        Self { position, rotation }
    }

    /// Build from a raw `(x, y, z, w)` quaternion, normalising it.
    ///
    /// A zero quaternion collapses to identity rather than producing NaNs.
    pub fn from_parts(position: [f32; 3], rotation_xyzw: [f32; 4]) -> Self {
        let [x, y, z, w] = rotation_xyzw;
        let raw = Quaternion::new(w, x, y, z);
        let rotation = if raw.norm_squared() > f32::EPSILON {
            Quat::from_quaternion(raw)
        } else {
            Quat::identity()
        };
        Self {
            position: Vec3::new(position[0], position[1], position[2]),
            rotation,
        }
    }

    /// Convert to a transformation matrix
    pub fn to_matrix(&self) -> Mat4 {
        Mat4::new_translation(&self.position) * self.rotation.to_homogeneous()
    }
}

/// Build a matrix from 16 column-major floats (the layout physics engines
/// hand out and GL uniforms expect).
pub fn from_column_major(values: &[f32; 16]) -> Mat4 {
    Mat4::from_column_slice(values)
}

/// Flatten a matrix into 16 column-major floats.
pub fn to_column_major(matrix: &Mat4) -> [f32; 16] {
    let mut out = [0.0; 16];
    out.copy_from_slice(matrix.as_slice());
    out
}

/// Math utility functions
pub mod utils {
    /// Convert degrees to radians
    pub fn deg_to_rad(degrees: f32) -> f32 {
        degrees.to_radians()
    }

    /// Linear interpolation
    pub fn lerp(a: f32, b: f32, t: f32) -> f32 {
        a + (b - a) * t
    }
}

/// Extension trait for Mat4 with the projection and view builders used by
/// the passes.
pub trait Mat4Ext {
    /// OpenGL perspective projection. `fov_y_degrees` is the vertical field
    /// of view.
    fn perspective_gl(fov_y_degrees: f32, aspect: f32, near: f32, far: f32) -> Mat4;

    /// OpenGL orthographic projection.
    fn orthographic_gl(left: f32, right: f32, bottom: f32, top: f32, near: f32, far: f32) -> Mat4;

    /// Right-handed look-at view matrix.
    fn look_at(eye: Vec3, target: Vec3, up: Vec3) -> Mat4;

    /// Maps clip space `[-1, 1]` onto texture space `[0, 1]` on every axis.
    fn shadow_bias() -> Mat4;
}

impl Mat4Ext for Mat4 {
    fn perspective_gl(fov_y_degrees: f32, aspect: f32, near: f32, far: f32) -> Mat4 {
        Mat4::new_perspective(aspect, utils::deg_to_rad(fov_y_degrees), near, far)
    }

    fn orthographic_gl(left: f32, right: f32, bottom: f32, top: f32, near: f32, far: f32) -> Mat4 {
        Mat4::new_orthographic(left, right, bottom, top, near, far)
    }

    fn look_at(eye: Vec3, target: Vec3, up: Vec3) -> Mat4 {
        Mat4::look_at_rh(&Point3::from(eye), &Point3::from(target), &up)
    }

    fn shadow_bias() -> Mat4 {
        Mat4::new(
            0.5, 0.0, 0.0, 0.5,
            0.0, 0.5, 0.0, 0.5,
            0.0, 0.0, 0.5, 0.5,
            0.0, 0.0, 0.0, 1.0,
        )
    }
}
