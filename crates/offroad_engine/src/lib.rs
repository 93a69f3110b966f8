//! # Offroad Engine
//!
//! Graphics core of the Offroad driving simulation: a deduplicating asset
//! cache for meshes, shaders and textures, and a shadow-mapped multi-pass
//! frame pipeline fed by a physics engine.
//!
//! ## Features
//!
//! - **Asset Cache**: one GPU object per canonical path, released in a safe order
//! - **Mesh Codec**: fixed little-endian binary format with stride-driven vertex layouts
//! - **Shader Builder**: XML shader descriptions compiled and linked with first-class diagnostics
//! - **Frame Pipeline**: shadow depth, main forward, blur composite and debug overlay passes
//! - **Device Seam**: every GPU call goes through [`gpu::GraphicsDevice`]; a recording device runs headless
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use offroad_engine::prelude::*;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ApplicationConfig::load_from_file("offroad.toml")?;
//!     let mut device = RecordingDevice::new();
//!     let mut cache = AssetCache::new(config.assets.mesh_version_policy);
//!
//!     let mut pipeline = FramePipeline::new(
//!         &mut device,
//!         &mut cache,
//!         config.renderer.clone(),
//!         config.assets.plain_shader_path(),
//!         config.assets.blur_shader_path(),
//!     )?;
//!     let scene = load_scene(
//!         &config.assets.content_dir.join("level.scene"),
//!         &mut cache,
//!         &mut device,
//!         None,
//!     )?;
//!
//!     let camera = pipeline.camera(Vec3::new(0.0, 0.0, 10.0));
//!     let input = FrameInput::from_camera(&camera, Vec3::zeros());
//!     pipeline.render_frame(&mut device, &cache, &scene.draw_list, None, input)?;
//!
//!     pipeline.release(&mut device);
//!     cache.release_all(&mut device);
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions, clippy::similar_names, clippy::too_many_arguments)]

// Core engine modules
pub mod core;
pub mod config;
pub mod foundation;
pub mod gpu;

// Subsystems
pub mod assets;
pub mod physics;
pub mod scene;
pub mod render;

/// Common imports for engine users
pub mod prelude {
    pub use crate::{
        assets::{AssetCache, AssetError, MeshHandle, MeshVersionPolicy, ShaderHandle, TextureHandle},
        core::config::{ApplicationConfig, AssetConfig, Config, EngineConfig, PassToggles, RendererSettings},
        foundation::{
            math::{Mat4, Transform, Vec3},
            time::Timer,
        },
        gpu::{GraphicsDevice, RecordingDevice},
        physics::{KinematicWorld, PhysicsWorld},
        render::{Camera, ChaseCamera, FirstPersonCamera, FrameInput, FramePipeline, FrameStats, RenderError},
        scene::{load_scene, DrawList, Drawable, LoadedScene, SceneError},
    };
}
