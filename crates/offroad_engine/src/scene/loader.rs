//! Scene description loader
//!
//! ```xml
//! <scene>
//!   <object name="car" mesh="car.mesh" shader="car.shader" texture0="car.png"/>
//!   <object name="rock" mesh="rock.mesh" shader="diffuse.shader">
//!     <position x="1" y="0" z="4"/>
//!     <rotation x="0" y="0" z="0" w="1"/>
//!   </object>
//! </scene>
//! ```
//!
//! Asset paths are relative to the scene file's directory. Objects are bound
//! to rigid bodies by name; an object without a body needs a `position` and a
//! `rotation` and becomes a static "ghost". Physics data is imported from a
//! companion file next to the scene (same stem, the physics engine's data
//! extension) before objects are resolved.

use std::path::{Path, PathBuf};

use roxmltree::Node;
use thiserror::Error;

use super::draw_list::DrawList;
use super::drawable::{Drawable, TransformSource, MAX_TEXTURE_SLOTS};
use crate::assets::{AssetCache, AssetError};
use crate::foundation::math::Transform;
use crate::gpu::GraphicsDevice;
use crate::physics::{ensure_motion_state, ImportSummary, PhysicsWorld};

/// Scene loading failures
#[derive(Error, Debug)]
pub enum SceneError {
    /// Scene file could not be read
    #[error("Error opening scene {}: {source}", path.display())]
    Io {
        /// Scene path
        path: PathBuf,
        /// Underlying IO error
        #[source]
        source: std::io::Error,
    },

    /// Scene file is not a valid document
    #[error("Error loading scene {} [{message}]", path.display())]
    Parse {
        /// Scene path
        path: PathBuf,
        /// Parser message
        message: String,
    },

    /// A referenced asset failed to load
    #[error(transparent)]
    Asset(#[from] AssetError),
}

/// Result of loading a scene
#[derive(Debug)]
pub struct LoadedScene {
    /// Drawables ready for the frame pipeline
    pub draw_list: DrawList,
    /// Companion physics data, when it was found and imported
    pub physics_data: Option<ImportSummary>,
    /// Objects without a rigid body
    pub ghosts: usize,
    /// Objects dropped for lacking a usable transform
    pub skipped_objects: usize,
}

/// Load a scene description, acquiring every referenced asset through `cache`
pub fn load_scene(
    path: &Path,
    cache: &mut AssetCache,
    device: &mut dyn GraphicsDevice,
    mut physics: Option<&mut dyn PhysicsWorld>,
) -> Result<LoadedScene, SceneError> {
    let physics_data = match physics.as_deref_mut() {
        Some(world) => import_companion(path, world),
        None => None,
    };

    let text = std::fs::read_to_string(path).map_err(|source| SceneError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let doc = roxmltree::Document::parse(&text).map_err(|e| SceneError::Parse {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;
    let base = path.parent().unwrap_or_else(|| Path::new(""));

    let mut draw_list = DrawList::new();
    let mut ghosts = 0;
    let mut skipped_objects = 0;

    for node in doc.descendants().filter(|n| n.has_tag_name("object")) {
        let name = node.attribute("name").unwrap_or_default();

        let body = physics.as_deref().and_then(|world| world.rigid_body_by_name(name));
        let transform_source = match body {
            Some(body) => {
                if let Some(world) = physics.as_deref_mut() {
                    if ensure_motion_state(world, body) {
                        log::debug!("Attached default motion state to {}", name);
                    }
                }
                TransformSource::RigidBody(body)
            }
            None => match static_transform(node) {
                Some(transform) => {
                    log::debug!("Adding a ghost called {}", name);
                    ghosts += 1;
                    TransformSource::Static(transform.to_matrix())
                }
                None => {
                    log::warn!("Incorrectly formatted object {}, skipping", name);
                    skipped_objects += 1;
                    continue;
                }
            },
        };

        let mut drawable = Drawable::new(name, transform_source);
        for slot in 0..MAX_TEXTURE_SLOTS {
            if let Some(file) = node.attribute(format!("texture{}", slot).as_str()) {
                drawable.textures[slot] = Some(cache.acquire_texture(device, base.join(file))?);
            }
        }
        if let Some(file) = node.attribute("mesh") {
            drawable.mesh = Some(cache.acquire_mesh(device, base.join(file))?);
        }
        if let Some(file) = node.attribute("shader") {
            drawable.shader = Some(cache.acquire_shader(device, base.join(file))?);
        }
        drawable.transparent = matches!(node.attribute("transparent"), Some("true") | Some("1"));

        if !drawable.is_complete() {
            log::debug!("Object {} has no mesh or shader and will not be drawn", name);
        }
        draw_list.push(drawable);
    }

    log::info!("Added {} objects to the world", draw_list.len());
    Ok(LoadedScene {
        draw_list,
        physics_data,
        ghosts,
        skipped_objects,
    })
}

fn import_companion(scene: &Path, world: &mut dyn PhysicsWorld) -> Option<ImportSummary> {
    let data_path = scene.with_extension(world.data_extension());
    if !data_path.is_file() {
        log::warn!("No physics data at {}", data_path.display());
        return None;
    }
    match world.import_file(&data_path) {
        Ok(summary) => {
            log::info!("Loaded physics data from {} ({} bodies)", data_path.display(), summary.bodies);
            Some(summary)
        }
        Err(e) => {
            log::warn!("Could not load physics data: {}", e);
            None
        }
    }
}

fn static_transform(node: Node<'_, '_>) -> Option<Transform> {
    let child = |tag: &str| node.children().find(|n| n.has_tag_name(tag));

    let position = child("position")?;
    let rotation = child("rotation")?;
    let xyz = [
        component(position, "x")?,
        component(position, "y")?,
        component(position, "z")?,
    ];
    let xyzw = [
        component(rotation, "x")?,
        component(rotation, "y")?,
        component(rotation, "z")?,
        component(rotation, "w")?,
    ];
    Some(Transform::from_parts(xyz, xyzw))
}

fn component(element: Node<'_, '_>, axis: &str) -> Option<f32> {
    element.attribute(axis)?.trim().parse().ok()
}
