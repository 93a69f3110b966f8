//! Per-frame render context

use crate::foundation::bounds::{Aabb, Frustum};
use crate::foundation::math::{to_column_major, Mat4, Vec3};
use crate::gpu::TextureId;

use super::light::LightRig;

/// Shared state for every pass of one frame
///
/// Rebuilt at the start of each frame from the camera and light rig; passes
/// read matrices from it and bump its counters.
#[derive(Debug, Clone)]
pub struct RenderContext {
    /// Direction towards the sun
    pub light_direction: Vec3,
    /// Light view matrix
    pub light_view: Mat4,
    /// Light projection matrix
    pub light_projection: Mat4,
    /// Shadow texture bias
    pub bias: Mat4,
    /// Camera view matrix
    pub view: Mat4,
    /// Camera projection matrix
    pub projection: Mat4,
    /// Shadow map sampled by the main pass, if the shadow pass exists
    pub shadow_map: Option<TextureId>,
    /// Camera frustum for culling
    pub frustum: Frustum,
    /// Whether to test bounds against the frustum
    pub frustum_culling: bool,
    /// Drawables drawn this frame (all passes)
    pub objects_drawn: u32,
    /// Drawables rejected by the frustum this frame
    pub objects_culled: u32,
}

impl RenderContext {
    /// Context for a frame seen through `view`/`projection`, lit by `light`
    /// tracking `focus`
    pub fn new(view: Mat4, projection: Mat4, light: &LightRig, focus: Vec3) -> Self {
        Self {
            light_direction: light.direction(),
            light_view: light.view(focus),
            light_projection: *light.projection(),
            bias: light.bias(),
            frustum: Frustum::from_matrix(&(projection * view)),
            view,
            projection,
            shadow_map: None,
            frustum_culling: true,
            objects_drawn: 0,
            objects_culled: 0,
        }
    }

    /// True when `bounds` (object space) under `model` may be visible.
    ///
    /// Always true with culling disabled or unknown bounds.
    pub fn is_visible(&self, bounds: Option<Aabb>, model: &Mat4) -> bool {
        match bounds {
            Some(bounds) if self.frustum_culling => {
                self.frustum.intersects_aabb(&bounds.transformed(model))
            }
            _ => true,
        }
    }

    /// Camera view times `model`, column-major
    pub fn model_view(&self, model: &Mat4) -> [f32; 16] {
        to_column_major(&(self.view * model))
    }

    /// Light view times `model`, column-major
    pub fn shadow_model_view(&self, model: &Mat4) -> [f32; 16] {
        to_column_major(&(self.light_view * model))
    }
}
