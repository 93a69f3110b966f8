//! Foundation module - Core utilities and types
//!
//! This module provides fundamental utilities used throughout the engine:
//! - Math types and operations
//! - Bounding volumes and frustum culling
//! - Path-indexed resource collections
//! - Time management
//! - Logging utilities

pub mod math;
pub mod bounds;
pub mod collections;
pub mod time;
pub mod logging;
