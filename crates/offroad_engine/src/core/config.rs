//! # Unified Configuration System
//!
//! All configuration structures in one place: engine behaviour (logging,
//! debug), renderer settings (projection, target sizes, light rig, pass
//! toggles) and asset locations. Every structure has defaults that match the
//! shipped game, so a config file only needs to name what it changes.
//!
//! ```toml
//! [engine]
//! log_level = "debug"
//!
//! [renderer.toggles]
//! blur = true
//!
//! [assets]
//! content_dir = "content"
//! ```

use serde::{Serialize, Deserialize};
use std::path::PathBuf;

use crate::assets::MeshVersionPolicy;
use crate::foundation::math::Vec3;

// Re-export from the config module for convenience
pub use crate::config::{Config, ConfigError};

/// # Engine Configuration
///
/// Core engine behavior: logging and debug features.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Default log level (`RUST_LOG` overrides it)
    pub log_level: String,
    /// Whether to enable debug features
    pub debug_mode: bool,
}

impl EngineConfig {
    /// Create a new engine configuration
    pub fn new() -> Self {
        Self {
            log_level: "info".to_string(),
            debug_mode: cfg!(debug_assertions),
        }
    }

    /// Set log level
    pub fn with_log_level(mut self, level: impl Into<String>) -> Self {
        self.log_level = level.into();
        self
    }

    /// Enable debug mode
    pub fn with_debug(mut self, enabled: bool) -> Self {
        self.debug_mode = enabled;
        self
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// # Light Rig Settings
///
/// The sun is an orthographic camera placed at a fixed offset from the
/// tracked focus point, looking at it with +Y up.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LightRigSettings {
    /// Light position relative to the focus point
    pub offset: [f32; 3],
    /// Half width and half height of the orthographic volume
    pub ortho_half_extent: f32,
    /// Near plane of the light projection
    pub ortho_near: f32,
    /// Far plane of the light projection
    pub ortho_far: f32,
    /// Direction towards the sun for shading (normalised on use)
    pub direction: [f32; 3],
}

impl Default for LightRigSettings {
    fn default() -> Self {
        Self {
            offset: [10.0, 10.0, 10.0],
            ortho_half_extent: 3.0,
            ortho_near: -10.0,
            ortho_far: 100.0,
            direction: [0.0, 1.0, 3.0],
        }
    }
}

/// # Pass Toggles
///
/// Runtime switches checked at the start of every pass.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct PassToggles {
    /// Render the shadow depth pass
    pub shadows: bool,
    /// Render the main pass off-screen and composite it with the blur shader
    pub blur: bool,
    /// Draw the physics debug overlay
    pub debug_draw: bool,
    /// Draw occluded overlay edges stippled before the visible ones
    pub stipple: bool,
    /// Include bounding boxes in the overlay
    pub draw_aabb: bool,
    /// Skip drawables outside the camera frustum
    pub frustum_culling: bool,
}

impl Default for PassToggles {
    fn default() -> Self {
        Self {
            shadows: true,
            blur: false,
            debug_draw: false,
            stipple: true,
            draw_aabb: false,
            frustum_culling: true,
        }
    }
}

/// # Renderer Settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RendererSettings {
    /// Presentation surface width
    pub window_width: u32,
    /// Presentation surface height
    pub window_height: u32,
    /// Vertical field of view of the main camera
    pub field_of_view_degrees: f32,
    /// Main camera near plane
    pub near_plane: f32,
    /// Main camera far plane
    pub far_plane: f32,
    /// Shadow map resolution (independent of the window)
    pub shadow_map_size: (u32, u32),
    /// Off-screen colour/depth resolution for the blur pass
    pub offscreen_size: (u32, u32),
    /// Sun placement
    pub light: LightRigSettings,
    /// Pass switches
    pub toggles: PassToggles,
}

impl RendererSettings {
    /// Set the window size
    pub fn with_window_size(mut self, width: u32, height: u32) -> Self {
        self.window_width = width;
        self.window_height = height;
        self
    }

    /// Set the pass toggles
    pub fn with_toggles(mut self, toggles: PassToggles) -> Self {
        self.toggles = toggles;
        self
    }

    /// Normalised direction towards the sun
    pub fn light_direction(&self) -> Vec3 {
        Vec3::from(self.light.direction).try_normalize(f32::EPSILON).unwrap_or_else(Vec3::y)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.window_width == 0 || self.window_height == 0 {
            return Err("Window size must be non-zero".to_string());
        }
        if !(self.field_of_view_degrees > 0.0 && self.field_of_view_degrees < 180.0) {
            return Err(format!("Field of view {} is out of range", self.field_of_view_degrees));
        }
        if self.near_plane <= 0.0 || self.far_plane <= self.near_plane {
            return Err(format!(
                "Clip planes must satisfy 0 < near < far (near {}, far {})",
                self.near_plane, self.far_plane
            ));
        }
        for (name, (w, h)) in [("Shadow map", self.shadow_map_size), ("Off-screen target", self.offscreen_size)] {
            if w == 0 || h == 0 {
                return Err(format!("{} size must be non-zero", name));
            }
        }
        if self.light.ortho_half_extent <= 0.0 || self.light.ortho_far <= self.light.ortho_near {
            return Err("Light projection volume is empty".to_string());
        }
        Ok(())
    }
}

impl Default for RendererSettings {
    fn default() -> Self {
        Self {
            window_width: 800,
            window_height: 600,
            field_of_view_degrees: 75.0,
            near_plane: 0.5,
            far_plane: 700.0,
            shadow_map_size: (1024, 1024),
            offscreen_size: (1024, 1024),
            light: LightRigSettings::default(),
            toggles: PassToggles::default(),
        }
    }
}

/// # Asset Configuration
///
/// Where content lives and how strictly meshes are checked.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AssetConfig {
    /// Base directory for content
    pub content_dir: PathBuf,
    /// Depth-only shader for the shadow pass, relative to `content_dir`
    pub plain_shader: PathBuf,
    /// Composite shader for the blur pass, relative to `content_dir`
    pub blur_shader: PathBuf,
    /// Accepted mesh format versions
    pub mesh_version_policy: MeshVersionPolicy,
}

impl AssetConfig {
    /// Create a new asset configuration
    pub fn new() -> Self {
        Self {
            content_dir: PathBuf::from("content"),
            plain_shader: PathBuf::from("plain.shader"),
            blur_shader: PathBuf::from("blur.shader"),
            mesh_version_policy: MeshVersionPolicy::default(),
        }
    }

    /// Set content directory
    pub fn with_content_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.content_dir = dir.into();
        self
    }

    /// Set the mesh version policy
    pub fn with_mesh_version_policy(mut self, policy: MeshVersionPolicy) -> Self {
        self.mesh_version_policy = policy;
        self
    }

    /// Absolute-or-relative path of the plain shader
    pub fn plain_shader_path(&self) -> PathBuf {
        self.content_dir.join(&self.plain_shader)
    }

    /// Absolute-or-relative path of the blur shader
    pub fn blur_shader_path(&self) -> PathBuf {
        self.content_dir.join(&self.blur_shader)
    }
}

impl Default for AssetConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// # Complete Application Configuration
///
/// Top-level configuration that encompasses all engine subsystems.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct ApplicationConfig {
    /// Engine core configuration
    pub engine: EngineConfig,
    /// Rendering configuration
    pub renderer: RendererSettings,
    /// Asset configuration
    pub assets: AssetConfig,
}

impl ApplicationConfig {
    /// Validate the entire configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.renderer.validate().map_err(ConfigError::Invalid)
    }
}

impl Config for ApplicationConfig {}
