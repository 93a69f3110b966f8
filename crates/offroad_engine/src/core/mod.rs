//! # Core Engine Module
//!
//! Shared abstractions used throughout the engine.
//!
//! ## Organization
//!
//! - **Config**: Unified configuration system for all engine subsystems

pub mod config;

// Re-export commonly used config types
pub use config::{
    ApplicationConfig,
    AssetConfig,
    Config,
    ConfigError,
    EngineConfig,
    LightRigSettings,
    PassToggles,
    RendererSettings,
};
