//! Directional sun light with a tracked shadow volume

use crate::core::LightRigSettings;
use crate::foundation::math::{Mat4, Mat4Ext, Vec3};

/// Sun used for shading and the shadow pass
///
/// The shadow camera is orthographic and re-centred on the focus point each
/// frame, so the small shadow volume always covers the vehicle.
#[derive(Debug, Clone, PartialEq)]
pub struct LightRig {
    offset: Vec3,
    projection: Mat4,
    direction: Vec3,
}

impl LightRig {
    /// Build the rig from settings
    pub fn new(settings: &LightRigSettings) -> Self {
        let e = settings.ortho_half_extent;
        Self {
            offset: Vec3::from(settings.offset),
            projection: Mat4::orthographic_gl(-e, e, -e, e, settings.ortho_near, settings.ortho_far),
            direction: Vec3::from(settings.direction)
                .try_normalize(f32::EPSILON)
                .unwrap_or_else(Vec3::y),
        }
    }

    /// Light view looking at `focus` from the rig offset, +Y up
    pub fn view(&self, focus: Vec3) -> Mat4 {
        Mat4::look_at(focus + self.offset, focus, Vec3::y())
    }

    /// Orthographic light projection
    pub fn projection(&self) -> &Mat4 {
        &self.projection
    }

    /// Normalised direction towards the sun
    pub fn direction(&self) -> Vec3 {
        self.direction
    }

    /// Clip-space to texture-space bias
    pub fn bias(&self) -> Mat4 {
        Mat4::shadow_bias()
    }
}

impl Default for LightRig {
    fn default() -> Self {
        Self::new(&LightRigSettings::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use crate::foundation::math::{Point3, Vec4};

    #[test]
    fn test_focus_projects_to_shadow_map_centre() {
        let rig = LightRig::default();
        let focus = Vec3::new(3.0, -2.0, 0.5);
        let clip = rig.bias() * rig.projection() * rig.view(focus) * Vec4::new(focus.x, focus.y, focus.z, 1.0);
        assert_relative_eq!(clip.x, 0.5, epsilon = 1e-5);
        assert_relative_eq!(clip.y, 0.5, epsilon = 1e-5);
    }

    #[test]
    fn test_direction_is_normalised() {
        let rig = LightRig::default();
        assert_relative_eq!(rig.direction().norm(), 1.0, epsilon = 1e-6);
        assert_relative_eq!(rig.direction(), Vec3::new(0.0, 1.0, 3.0).normalize());
    }

    #[test]
    fn test_view_follows_focus() {
        let rig = LightRig::default();
        let a = rig.view(Vec3::zeros()).transform_point(&Point3::origin());
        let b = rig
            .view(Vec3::new(5.0, 0.0, 0.0))
            .transform_point(&Point3::new(5.0, 0.0, 0.0));
        assert_relative_eq!(a, b, epsilon = 1e-4);
    }
}
