//! Physics debug overlay
//!
//! Re-issues the physics engine's wireframe (and optionally bounding box)
//! lines over the finished frame. With stippling on, lines are drawn twice:
//! first dashed with depth testing off so hidden edges show through, then
//! solid with depth testing on for the visible ones.

use crate::core::PassToggles;
use crate::foundation::math::to_column_major;
use crate::gpu::{DebugLine, GraphicsDevice, LineStipple};
use crate::physics::{DebugDrawMode, PhysicsWorld};

use super::context::RenderContext;
use super::state::ActivePipelineState;

/// Dash pattern for occluded edges
pub const OCCLUDED_STIPPLE: LineStipple = LineStipple { factor: 1, pattern: 0x00FF };

/// Draw the overlay into the bound target; returns the number of lines
pub fn draw_physics_overlay(
    device: &mut dyn GraphicsDevice,
    state: &mut ActivePipelineState,
    world: &dyn PhysicsWorld,
    context: &RenderContext,
    toggles: &PassToggles,
) -> usize {
    let mut mode = DebugDrawMode::WIREFRAME;
    if toggles.draw_aabb {
        mode |= DebugDrawMode::AABB;
    }

    let mut lines: Vec<DebugLine> = Vec::new();
    world.debug_draw(mode, &mut lines);
    if lines.is_empty() {
        return 0;
    }

    let view = to_column_major(&context.view);
    let projection = to_column_major(&context.projection);
    state.use_program(device, None);

    if toggles.stipple {
        state.set_depth_test(device, false);
        device.set_line_stipple(Some(OCCLUDED_STIPPLE));
        device.draw_lines(&lines, &view, &projection);
        device.set_line_stipple(None);
    }
    state.set_depth_test(device, true);
    device.draw_lines(&lines, &view, &projection);

    lines.len()
}
