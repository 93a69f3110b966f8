//! # Rendering System
//!
//! Multi-pass forward renderer for the driving scene, built on the
//! [`GraphicsDevice`](crate::gpu::GraphicsDevice) seam.
//!
//! ## Architecture
//!
//! - **Camera / LightRig**: view and projection matrices for the player and the sun
//! - **RenderContext**: per-frame matrices, frustum and counters
//! - **ActivePipelineState**: bound program/target/textures, threaded through each pass
//! - **RenderTargets**: fixed-size shadow and off-screen framebuffers
//! - **FramePipeline**: shadow → main → blur → debug overlay, in that order
//!
//! The pass set is fixed. There is no material system: each drawable brings
//! its own shader and the pipeline feeds every shader the same uniform
//! contract.

pub mod camera;
pub mod context;
pub mod debug_overlay;
pub mod light;
pub mod pipeline;
pub mod state;
pub mod targets;

#[cfg(test)]
mod pipeline_tests;

pub use camera::{Camera, ChaseCamera, FirstPersonCamera};
pub use context::RenderContext;
pub use light::LightRig;
pub use pipeline::{FrameInput, FramePipeline, FrameStats, SHADOW_MAP_UNIT};
pub use state::ActivePipelineState;
pub use targets::{OffscreenTarget, RenderTargets, ShadowTarget};

use thiserror::Error;

use crate::assets::AssetError;
use crate::gpu::GpuError;

/// Result type for rendering operations
pub type RenderResult<T> = Result<T, RenderError>;

/// Frame pipeline failures
#[derive(Error, Debug)]
pub enum RenderError {
    /// Renderer settings are inconsistent
    #[error("Invalid renderer settings: {0}")]
    InvalidSettings(String),

    /// Off-screen target creation or another device call failed
    #[error("Render target creation failed: {0}")]
    Device(#[from] GpuError),

    /// A built-in shader could not be loaded
    #[error(transparent)]
    Asset(#[from] AssetError),

    /// A built-in shader is no longer in the asset cache
    #[error("Built-in {0} shader is not loaded")]
    MissingShader(&'static str),

    /// The pipeline's targets were already released
    #[error("Frame pipeline used after release")]
    Released,
}
