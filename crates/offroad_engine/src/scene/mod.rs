//! Scene management
//!
//! A scene is a flat, ordered list of drawables built once from a scene
//! description. Objects are bound to the physics engine by name at load
//! time; objects without physics data keep a static transform.

mod draw_list;
mod drawable;
mod loader;

pub use draw_list::{DrawList, ShaderBatch};
pub use drawable::{Drawable, TransformSource, MAX_TEXTURE_SLOTS};
pub use loader::{load_scene, LoadedScene, SceneError};
