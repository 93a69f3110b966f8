//! Bounding volumes for visibility culling
//!
//! Axis-aligned boxes in mesh or world space, and a six-plane view frustum
//! extracted from a projection-view matrix (Gribb-Hartmann).

use super::math::{Mat4, Vec3, Vec4};

/// Axis-Aligned Bounding Box
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb {
    /// Minimum corner of the bounding box
    pub min: Vec3,
    /// Maximum corner of the bounding box
    pub max: Vec3,
}

impl Aabb {
    /// Create a new AABB from min and max points
    pub fn new(min: Vec3, max: Vec3) -> Self {
        Self { min, max }
    }

    /// Smallest box enclosing every point, or `None` for an empty iterator
    pub fn from_points<I>(points: I) -> Option<Self>
    where
        I: IntoIterator<Item = Vec3>,
    {
        let mut iter = points.into_iter();
        let first = iter.next()?;
        let mut bounds = Self::new(first, first);
        for p in iter {
            bounds.min = bounds.min.inf(&p);
            bounds.max = bounds.max.sup(&p);
        }
        Some(bounds)
    }

    /// The eight corners of the box
    pub fn corners(&self) -> [Vec3; 8] {
        let (lo, hi) = (self.min, self.max);
        [
            Vec3::new(lo.x, lo.y, lo.z),
            Vec3::new(hi.x, lo.y, lo.z),
            Vec3::new(lo.x, hi.y, lo.z),
            Vec3::new(hi.x, hi.y, lo.z),
            Vec3::new(lo.x, lo.y, hi.z),
            Vec3::new(hi.x, lo.y, hi.z),
            Vec3::new(lo.x, hi.y, hi.z),
            Vec3::new(hi.x, hi.y, hi.z),
        ]
    }

    /// World-space box enclosing this box after `model` is applied
    pub fn transformed(&self, model: &Mat4) -> Self {
        let corners = self.corners().map(|c| {
            let p = model * Vec4::new(c.x, c.y, c.z, 1.0);
            Vec3::new(p.x, p.y, p.z)
        });
        // eight corners, never empty
        Self::from_points(corners).unwrap_or(*self)
    }
}

/// Plane defined by normal and distance from origin
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Plane {
    /// Normal vector, pointing into the kept half-space
    pub normal: Vec3,
    /// Distance from origin along the normal
    pub distance: f32,
}

impl Plane {
    /// Plane from raw `ax + by + cz + d` coefficients, normalised so that
    /// `distance_to_point` returns true distances.
    pub fn from_coefficients(coefficients: Vec4) -> Self {
        let normal = Vec3::new(coefficients.x, coefficients.y, coefficients.z);
        let length = normal.norm();
        if length <= f32::EPSILON {
            return Self { normal, distance: coefficients.w };
        }
        Self {
            normal: normal / length,
            distance: coefficients.w / length,
        }
    }

    /// Calculate signed distance from plane to point
    pub fn distance_to_point(&self, point: Vec3) -> f32 {
        self.normal.dot(&point) + self.distance
    }
}

/// View frustum for visibility culling
#[derive(Debug, Clone)]
pub struct Frustum {
    /// Left, right, bottom, top, near, far
    pub planes: [Plane; 6],
}

impl Frustum {
    /// Extract the six clip planes from `projection * view`.
    pub fn from_matrix(projection_view: &Mat4) -> Self {
        let row = |i: usize| -> Vec4 {
            let r = projection_view.row(i);
            Vec4::new(r[0], r[1], r[2], r[3])
        };
        let (r0, r1, r2, r3) = (row(0), row(1), row(2), row(3));

        Self {
            planes: [
                Plane::from_coefficients(r3 + r0),
                Plane::from_coefficients(r3 - r0),
                Plane::from_coefficients(r3 + r1),
                Plane::from_coefficients(r3 - r1),
                Plane::from_coefficients(r3 + r2),
                Plane::from_coefficients(r3 - r2),
            ],
        }
    }

    /// True when any part of `aabb` may be visible.
    ///
    /// Conservative: boxes straddling a frustum corner can pass even though
    /// they are outside.
    pub fn intersects_aabb(&self, aabb: &Aabb) -> bool {
        self.planes.iter().all(|plane| {
            // vertex furthest along the plane normal
            let mut p = aabb.min;
            if plane.normal.x >= 0.0 { p.x = aabb.max.x; }
            if plane.normal.y >= 0.0 { p.y = aabb.max.y; }
            if plane.normal.z >= 0.0 { p.z = aabb.max.z; }
            plane.distance_to_point(p) >= 0.0
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::foundation::math::Mat4Ext;
    use approx::assert_relative_eq;

    fn camera_frustum() -> Frustum {
        let proj = Mat4::perspective_gl(75.0, 4.0 / 3.0, 0.5, 700.0);
        let view = Mat4::look_at(Vec3::new(0.0, 0.0, 10.0), Vec3::zeros(), Vec3::y());
        Frustum::from_matrix(&(proj * view))
    }

    #[test]
    fn test_from_points_empty_is_none() {
        assert_eq!(Aabb::from_points(std::iter::empty()), None);
    }

    #[test]
    fn test_transformed_box_follows_translation() {
        let aabb = Aabb::new(Vec3::new(-1.0, -1.0, -1.0), Vec3::new(1.0, 1.0, 1.0));
        let moved = aabb.transformed(&Mat4::new_translation(&Vec3::new(5.0, 0.0, 0.0)));
        assert_relative_eq!(moved.min, Vec3::new(4.0, -1.0, -1.0));
        assert_relative_eq!(moved.max, Vec3::new(6.0, 1.0, 1.0));
    }

    #[test]
    fn test_box_in_front_of_camera_is_visible() {
        let aabb = Aabb::new(Vec3::new(-1.0, -1.0, -1.0), Vec3::new(1.0, 1.0, 1.0));
        assert!(camera_frustum().intersects_aabb(&aabb));
    }

    #[test]
    fn test_box_beyond_far_plane_is_culled() {
        let aabb = Aabb::new(Vec3::new(-1.0, -1.0, -10001.0), Vec3::new(1.0, 1.0, -9999.0));
        assert!(!camera_frustum().intersects_aabb(&aabb));
    }

    #[test]
    fn test_box_behind_camera_is_culled() {
        let aabb = Aabb::new(Vec3::new(-1.0, -1.0, 20.0), Vec3::new(1.0, 1.0, 22.0));
        assert!(!camera_frustum().intersects_aabb(&aabb));
    }

    #[test]
    fn test_extracted_near_plane_faces_forward() {
        let frustum = camera_frustum();
        let near = frustum.planes[4];
        assert_relative_eq!(near.normal, Vec3::new(0.0, 0.0, -1.0), epsilon = 1e-4);
        assert_relative_eq!(near.distance_to_point(Vec3::new(0.0, 0.0, 9.5)), 0.0, epsilon = 1e-3);
    }
}
