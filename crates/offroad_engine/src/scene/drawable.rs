//! Drawable scene objects
//!
//! A drawable is created once at scene load. Its transform source (rigid
//! body or frozen static transform) is fixed at construction and cannot be
//! swapped afterwards.

use crate::assets::{MeshHandle, ShaderHandle, TextureHandle};
use crate::foundation::math::{from_column_major, Mat4};
use crate::physics::{PhysicsWorld, RigidBodyId};

/// Number of texture slots (`texture0` .. `texture4`)
pub const MAX_TEXTURE_SLOTS: usize = 5;

/// Where a drawable's model matrix comes from
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TransformSource {
    /// Read from the physics engine every frame
    RigidBody(RigidBodyId),
    /// Fixed transform from the scene description ("ghost")
    Static(Mat4),
}

/// One renderable instance in the world
#[derive(Debug, Clone)]
pub struct Drawable {
    /// Object name from the scene description
    pub name: String,

    /// Geometry
    pub mesh: Option<MeshHandle>,

    /// Full shader used by the main pass
    pub shader: Option<ShaderHandle>,

    /// Textures by sampler slot
    pub textures: [Option<TextureHandle>; MAX_TEXTURE_SLOTS],

    /// Drawn after every opaque object
    pub transparent: bool,

    transform_source: TransformSource,
}

impl Drawable {
    /// Create a drawable with no resources attached yet
    pub fn new(name: impl Into<String>, transform_source: TransformSource) -> Self {
        Self {
            name: name.into(),
            mesh: None,
            shader: None,
            textures: [None; MAX_TEXTURE_SLOTS],
            transparent: false,
            transform_source,
        }
    }

    /// Transform source fixed at construction
    pub fn transform_source(&self) -> TransformSource {
        self.transform_source
    }

    /// True for objects without physics data
    pub fn is_ghost(&self) -> bool {
        matches!(self.transform_source, TransformSource::Static(_))
    }

    /// Has both a mesh and a shader
    pub fn is_complete(&self) -> bool {
        self.mesh.is_some() && self.shader.is_some()
    }

    /// World transform for this frame.
    ///
    /// `None` when the body has no motion source or no physics world is
    /// available; such objects are skipped for the frame.
    pub fn model_matrix(&self, physics: Option<&dyn PhysicsWorld>) -> Option<Mat4> {
        match self.transform_source {
            TransformSource::Static(matrix) => Some(matrix),
            TransformSource::RigidBody(body) => physics?
                .world_transform(body)
                .map(|m| from_column_major(&m)),
        }
    }
}
