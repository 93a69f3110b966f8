//! In-process kinematic physics world
//!
//! Bodies move at constant linear velocity with no collision response. Data
//! files are RON lists of [`BodyRecord`]s:
//!
//! ```ron
//! [
//!     (name: "car", position: (0.0, 0.0, 1.0), velocity: (0.0, 2.0, 0.0)),
//!     (name: "ramp", half_extents: (4.0, 2.0, 0.5), motion_state: false),
//! ]
//! ```

use super::*;
use crate::foundation::bounds::Aabb;
use crate::foundation::math::{to_column_major, Mat4, Point3};
use serde::{Deserialize, Serialize};
use std::fs;

/// Fixed internal timestep
const FIXED_STEP: f32 = 1.0 / 60.0;

const WIREFRAME_COLOR: [f32; 3] = [1.0, 1.0, 1.0];
const AABB_COLOR: [f32; 3] = [1.0, 0.0, 0.0];

/// Serialized body description
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BodyRecord {
    /// Name objects refer to
    pub name: String,
    /// Centre of mass
    pub position: [f32; 3],
    /// Orientation as `(x, y, z, w)`
    pub rotation: [f32; 4],
    /// Linear velocity
    pub velocity: [f32; 3],
    /// Box half extents for debug drawing
    pub half_extents: [f32; 3],
    /// Whether the body already has a motion source
    pub motion_state: bool,
}

impl Default for BodyRecord {
    fn default() -> Self {
        Self {
            name: String::new(),
            position: [0.0; 3],
            rotation: [0.0, 0.0, 0.0, 1.0],
            velocity: [0.0; 3],
            half_extents: [0.5; 3],
            motion_state: true,
        }
    }
}

#[derive(Debug)]
struct Body {
    name: String,
    pose: Transform,
    velocity: Vec3,
    half_extents: Vec3,
    motion_state: Option<Transform>,
}

/// Constant-velocity world without collision response
#[derive(Debug, Default)]
pub struct KinematicWorld {
    bodies: Vec<Body>,
    accumulator: f32,
}

impl KinematicWorld {
    /// Create an empty world
    pub fn new() -> Self {
        Self::default()
    }

    /// Add one body
    pub fn add_body(&mut self, record: BodyRecord) -> RigidBodyId {
        let pose = Transform::from_parts(record.position, record.rotation);
        self.bodies.push(Body {
            name: record.name,
            pose,
            velocity: Vec3::from(record.velocity),
            half_extents: Vec3::from(record.half_extents),
            motion_state: record.motion_state.then_some(pose),
        });
        RigidBodyId(self.bodies.len() as u32 - 1)
    }

    /// Number of bodies
    pub fn body_count(&self) -> usize {
        self.bodies.len()
    }

    fn body(&self, id: RigidBodyId) -> Option<&Body> {
        self.bodies.get(id.0 as usize)
    }
}

impl PhysicsWorld for KinematicWorld {
    fn data_extension(&self) -> &'static str {
        "ron"
    }

    fn import_file(&mut self, path: &Path) -> Result<ImportSummary, PhysicsError> {
        let text = fs::read_to_string(path).map_err(|source| PhysicsError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let records: Vec<BodyRecord> = ron::from_str(&text).map_err(|e| PhysicsError::Import {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let bodies = records.len();
        for record in records {
            self.add_body(record);
        }
        log::debug!("Imported {} bodies from {}", bodies, path.display());
        Ok(ImportSummary { bodies })
    }

    fn rigid_body_by_name(&self, name: &str) -> Option<RigidBodyId> {
        self.bodies
            .iter()
            .position(|b| b.name == name)
            .map(|i| RigidBodyId(i as u32))
    }

    fn has_motion_state(&self, body: RigidBodyId) -> bool {
        self.body(body).is_some_and(|b| b.motion_state.is_some())
    }

    fn center_of_mass_pose(&self, body: RigidBodyId) -> Option<Transform> {
        self.body(body).map(|b| b.pose)
    }

    fn attach_motion_state(&mut self, body: RigidBodyId, pose: Transform) {
        if let Some(b) = self.bodies.get_mut(body.0 as usize) {
            b.motion_state = Some(pose);
        }
    }

    fn world_transform(&self, body: RigidBodyId) -> Option<[f32; 16]> {
        let pose = self.body(body)?.motion_state?;
        Some(to_column_major(&pose.to_matrix()))
    }

    fn step(&mut self, dt_seconds: f32, max_substeps: u32) -> u32 {
        self.accumulator += dt_seconds.max(0.0);
        let mut steps = 0;
        while self.accumulator >= FIXED_STEP && steps < max_substeps {
            for body in &mut self.bodies {
                body.pose.position += body.velocity * FIXED_STEP;
                if body.motion_state.is_some() {
                    body.motion_state = Some(body.pose);
                }
            }
            self.accumulator -= FIXED_STEP;
            steps += 1;
        }
        // drop time that could not be simulated within the substep budget
        if steps == max_substeps {
            self.accumulator = self.accumulator.min(FIXED_STEP);
        }
        steps
    }

    fn debug_draw(&self, mode: DebugDrawMode, sink: &mut dyn DebugLineSink) {
        for body in &self.bodies {
            let model = body.pose.to_matrix();
            let local = Aabb::new(-body.half_extents, body.half_extents);
            if mode.contains(DebugDrawMode::WIREFRAME) {
                emit_box(sink, &local.corners(), &model, Vec3::from(WIREFRAME_COLOR));
            }
            if mode.contains(DebugDrawMode::AABB) {
                let world = local.transformed(&model);
                emit_box(sink, &world.corners(), &Mat4::identity(), Vec3::from(AABB_COLOR));
            }
        }
    }
}

// Corner indices follow Aabb::corners: bit 0 = x, bit 1 = y, bit 2 = z
const BOX_EDGES: [(usize, usize); 12] = [
    (0, 1), (2, 3), (4, 5), (6, 7),
    (0, 2), (1, 3), (4, 6), (5, 7),
    (0, 4), (1, 5), (2, 6), (3, 7),
];

fn emit_box(sink: &mut dyn DebugLineSink, corners: &[Vec3; 8], model: &Mat4, color: Vec3) {
    let world = corners.map(|c| model.transform_point(&Point3::from(c)).coords);
    for (a, b) in BOX_EDGES {
        sink.line(world[a], world[b], color);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_step_moves_bodies_and_caps_substeps() {
        let mut world = KinematicWorld::new();
        let car = world.add_body(BodyRecord {
            name: "car".into(),
            velocity: [6.0, 0.0, 0.0],
            ..BodyRecord::default()
        });

        assert_eq!(world.step(0.55, MAX_SUBSTEPS), 30);
        let m = world.world_transform(car).unwrap();
        assert!((m[12] - 3.0).abs() < 1e-3);

        assert_eq!(world.step(10.0, 5), 5);
    }

    #[test]
    fn test_import_ron_manifest() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("level.ron");
        fs::write(
            &path,
            r#"[ (name: "car", position: (0.0, 0.0, 1.0)), (name: "ramp", motion_state: false) ]"#,
        )
        .unwrap();

        let mut world = KinematicWorld::new();
        let summary = world.import_file(&path).unwrap();
        assert_eq!(summary.bodies, 2);
        let ramp = world.rigid_body_by_name("ramp").unwrap();
        assert!(!world.has_motion_state(ramp));
        assert!(world.rigid_body_by_name("tree").is_none());
    }

    #[test]
    fn test_import_garbage_is_import_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("level.ron");
        fs::write(&path, "not ron at all [").unwrap();
        let err = KinematicWorld::new().import_file(&path).unwrap_err();
        assert!(matches!(err, PhysicsError::Import { .. }));
    }

    #[test]
    fn test_debug_draw_emits_twelve_edges_per_mode() {
        let mut world = KinematicWorld::new();
        world.add_body(BodyRecord::default());

        let mut lines: Vec<DebugLine> = Vec::new();
        world.debug_draw(DebugDrawMode::WIREFRAME, &mut lines);
        assert_eq!(lines.len(), 12);

        lines.clear();
        world.debug_draw(DebugDrawMode::WIREFRAME | DebugDrawMode::AABB, &mut lines);
        assert_eq!(lines.len(), 24);
    }
}
