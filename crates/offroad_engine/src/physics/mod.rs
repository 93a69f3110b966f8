//! Physics engine boundary
//!
//! The renderer treats the physics engine as a black box. It needs exactly
//! five things from it: import a companion data file, look bodies up by
//! name, make sure each body has a motion source, read world transforms once
//! per frame, and step the simulation. [`PhysicsWorld`] is that contract;
//! [`KinematicWorld`] is a small in-process implementation used by the
//! validator and tests.

pub mod kinematic;

pub use kinematic::{BodyRecord, KinematicWorld};

use crate::foundation::math::{Transform, Vec3};
use crate::gpu::DebugLine;
use bitflags::bitflags;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Simulated seconds per real second
pub const PHYSICS_TIME_SCALE: f32 = 1000.0 / 700.0;

/// Upper bound on internal substeps per frame
pub const MAX_SUBSTEPS: u32 = 30;

/// Opaque rigid body reference
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RigidBodyId(pub u32);

/// Result of importing a physics data file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ImportSummary {
    /// Bodies added to the world
    pub bodies: usize,
}

/// Physics boundary failures
#[derive(Error, Debug)]
pub enum PhysicsError {
    /// Data file could not be read
    #[error("Failed to read physics data {}: {source}", path.display())]
    Io {
        /// File path
        path: PathBuf,
        /// Underlying IO error
        #[source]
        source: std::io::Error,
    },

    /// Data file was read but could not be imported
    #[error("Failed to import physics data {}: {reason}", path.display())]
    Import {
        /// File path
        path: PathBuf,
        /// Importer message
        reason: String,
    },
}

bitflags! {
    /// What the physics debug drawer emits
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct DebugDrawMode: u32 {
        /// Collision shape edges
        const WIREFRAME = 1 << 0;
        /// Axis-aligned bounding boxes
        const AABB = 1 << 1;
    }
}

/// Receiver for debug lines emitted by the physics engine
pub trait DebugLineSink {
    /// Accept one world-space segment
    fn line(&mut self, from: Vec3, to: Vec3, color: Vec3);
}

impl DebugLineSink for Vec<DebugLine> {
    fn line(&mut self, from: Vec3, to: Vec3, color: Vec3) {
        self.push(DebugLine {
            from: from.into(),
            to: to.into(),
            color: color.into(),
        });
    }
}

/// Contract between the renderer and a physics engine
pub trait PhysicsWorld {
    /// Extension of the companion data file this engine imports, without dot
    fn data_extension(&self) -> &'static str;

    /// Import bodies from a data file
    fn import_file(&mut self, path: &Path) -> Result<ImportSummary, PhysicsError>;

    /// Look a body up by the name it was exported with
    fn rigid_body_by_name(&self, name: &str) -> Option<RigidBodyId>;

    /// Whether the body has a motion source to report transforms through
    fn has_motion_state(&self, body: RigidBodyId) -> bool;

    /// Current centre-of-mass pose
    fn center_of_mass_pose(&self, body: RigidBodyId) -> Option<Transform>;

    /// Attach a motion source initialised to `pose`
    fn attach_motion_state(&mut self, body: RigidBodyId, pose: Transform);

    /// Column-major world transform from the body's motion source
    fn world_transform(&self, body: RigidBodyId) -> Option<[f32; 16]>;

    /// Advance by `dt_seconds`, taking at most `max_substeps` internal steps.
    /// Returns the number of substeps taken.
    fn step(&mut self, dt_seconds: f32, max_substeps: u32) -> u32;

    /// Emit debug geometry for every body
    fn debug_draw(&self, mode: DebugDrawMode, sink: &mut dyn DebugLineSink);
}

/// Attach a default motion source built from the body's current centre-of-
/// mass pose when it has none. Returns true when one was attached.
pub fn ensure_motion_state(world: &mut dyn PhysicsWorld, body: RigidBodyId) -> bool {
    if world.has_motion_state(body) {
        return false;
    }
    let pose = world.center_of_mass_pose(body).unwrap_or_default();
    world.attach_motion_state(body, pose);
    true
}

/// Simulated time for a real frame delta
pub fn simulation_seconds(delta: Duration) -> f32 {
    delta.as_secs_f32() * PHYSICS_TIME_SCALE
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_simulation_time_scale() {
        assert_relative_eq!(simulation_seconds(Duration::from_millis(700)), 1.0);
    }

    #[test]
    fn test_ensure_motion_state_only_attaches_once() {
        let mut world = KinematicWorld::new();
        let body = world.add_body(BodyRecord {
            name: "crate".into(),
            position: [1.0, 2.0, 3.0],
            motion_state: false,
            ..BodyRecord::default()
        });

        assert!(world.world_transform(body).is_none());
        assert!(ensure_motion_state(&mut world, body));
        assert!(!ensure_motion_state(&mut world, body));

        let m = world.world_transform(body).unwrap();
        assert_eq!(&m[12..15], &[1.0, 2.0, 3.0]);
    }
}
