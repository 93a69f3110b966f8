//! # Frame Pipeline
//!
//! Runs the fixed pass sequence for one frame:
//!
//! 1. **Shadow** (toggle `shadows`): depth-only render of the draw list from
//!    the light into the shadow target with the plain shader
//! 2. **Main**: forward pass into the window, or into the off-screen target
//!    when blur is on; samples the shadow map on unit [`SHADOW_MAP_UNIT`]
//! 3. **Blur** (toggle `blur`): full-screen composite of the off-screen colour
//!    and depth into the window using the previous frame's view
//! 4. **Debug overlay** (toggle `debug_draw`): physics wireframe lines
//!
//! Toggles are read once per pass at pass start. No GPU object is created
//! while rendering; every one a pass needs is created up front by
//! [`FramePipeline::new`] or owned by the [`AssetCache`]. Every sampler unit
//! is unbound again when the frame ends.

use std::path::Path;
use std::time::Duration;

use crate::assets::{AssetCache, ShaderHandle};
use crate::core::{PassToggles, RendererSettings};
use crate::foundation::math::{to_column_major, Mat4, Mat4Ext, Vec3};
use crate::gpu::{ClearFlags, GraphicsDevice, RenderTarget, TextureId, UniformValue, Viewport};
use crate::physics::{simulation_seconds, PhysicsWorld, MAX_SUBSTEPS};
use crate::scene::{DrawList, Drawable, MAX_TEXTURE_SLOTS};

use super::camera::Camera;
use super::context::RenderContext;
use super::debug_overlay::draw_physics_overlay;
use super::light::LightRig;
use super::state::ActivePipelineState;
use super::targets::RenderTargets;
use super::{RenderError, RenderResult};

/// Sampler unit the main pass reads the shadow map from
pub const SHADOW_MAP_UNIT: u32 = 5;

/// Sampler unit names for the drawable texture slots
const TEXTURE_UNIFORMS: [&str; MAX_TEXTURE_SLOTS] = ["texture0", "texture1", "texture2", "texture3", "texture4"];

/// Camera input for one frame
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameInput {
    /// Camera view matrix
    pub view: Mat4,
    /// World point the shadow volume is centred on
    pub focus: Vec3,
}

impl FrameInput {
    /// Input from a camera, with the shadow volume centred on `focus`
    pub fn from_camera(camera: &Camera, focus: Vec3) -> Self {
        Self {
            view: camera.view_matrix(),
            focus,
        }
    }
}

/// What one frame did
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrameStats {
    /// Drawables drawn by the main pass
    pub objects_drawn: u32,
    /// Drawables drawn into the shadow map
    pub shadow_casters: u32,
    /// Drawables rejected by frustum culling
    pub objects_culled: u32,
    /// Drawables missing a mesh, shader or cached resource
    pub incomplete_skipped: u32,
    /// Drawables whose body had no transform this frame
    pub unplaced_skipped: u32,
    /// Passes executed
    pub passes: u32,
    /// Debug overlay lines drawn
    pub debug_lines: u32,
}

/// Per-frame pass orchestration
#[derive(Debug)]
pub struct FramePipeline {
    settings: RendererSettings,
    window: Viewport,
    light: LightRig,
    targets: Option<RenderTargets>,
    plain_shader: ShaderHandle,
    blur_shader: ShaderHandle,
    previous_view: Option<Mat4>,
    shadow_map_cleared: bool,
}

impl FramePipeline {
    /// Create the off-screen targets and load the built-in shaders
    pub fn new(
        device: &mut dyn GraphicsDevice,
        cache: &mut AssetCache,
        settings: RendererSettings,
        plain_shader: impl AsRef<Path>,
        blur_shader: impl AsRef<Path>,
    ) -> RenderResult<Self> {
        settings.validate().map_err(RenderError::InvalidSettings)?;

        let plain_shader = cache.acquire_shader(device, plain_shader)?;
        let blur_shader = cache.acquire_shader(device, blur_shader)?;
        let targets = RenderTargets::create(device, settings.shadow_map_size, settings.offscreen_size)?;

        log::info!(
            "Frame pipeline ready: window {}x{}, shadow map {}x{}",
            settings.window_width,
            settings.window_height,
            settings.shadow_map_size.0,
            settings.shadow_map_size.1
        );

        Ok(Self {
            window: Viewport::sized(settings.window_width, settings.window_height),
            light: LightRig::new(&settings.light),
            settings,
            targets: Some(targets),
            plain_shader,
            blur_shader,
            previous_view: None,
            shadow_map_cleared: false,
        })
    }

    /// Current pass toggles
    pub fn toggles(&self) -> &PassToggles {
        &self.settings.toggles
    }

    /// Pass toggles for runtime switching
    pub fn toggles_mut(&mut self) -> &mut PassToggles {
        &mut self.settings.toggles
    }

    /// Renderer settings in use
    pub fn settings(&self) -> &RendererSettings {
        &self.settings
    }

    /// Light rig in use
    pub fn light(&self) -> &LightRig {
        &self.light
    }

    /// Off-screen targets, until released
    pub fn targets(&self) -> Option<&RenderTargets> {
        self.targets.as_ref()
    }

    /// Camera matching the configured projection and current window
    pub fn camera(&self, position: Vec3) -> Camera {
        Camera::perspective(
            position,
            self.settings.field_of_view_degrees,
            self.window.aspect(),
            self.settings.near_plane,
            self.settings.far_plane,
        )
    }

    /// Follow a window resize. Off-screen targets keep their size.
    pub fn resize(&mut self, width: u32, height: u32) {
        if width == 0 || height == 0 {
            log::debug!("Ignoring resize to {}x{}", width, height);
            return;
        }
        self.settings.window_width = width;
        self.settings.window_height = height;
        self.window = Viewport::sized(width, height);
        log::debug!("Window resized to {}x{}", width, height);
    }

    /// Step the physics world by one frame delta. Returns substeps taken.
    pub fn advance(&mut self, physics: &mut dyn PhysicsWorld, delta: Duration) -> u32 {
        physics.step(simulation_seconds(delta), MAX_SUBSTEPS)
    }

    /// Render one frame
    pub fn render_frame(
        &mut self,
        device: &mut dyn GraphicsDevice,
        cache: &AssetCache,
        draw_list: &DrawList,
        physics: Option<&dyn PhysicsWorld>,
        input: FrameInput,
    ) -> RenderResult<FrameStats> {
        let (shadow, offscreen) = match &self.targets {
            Some(targets) => (targets.shadow, targets.offscreen),
            None => return Err(RenderError::Released),
        };
        let toggles = self.settings.toggles;

        let projection = Mat4::perspective_gl(
            self.settings.field_of_view_degrees,
            self.window.aspect(),
            self.settings.near_plane,
            self.settings.far_plane,
        );
        let mut context = RenderContext::new(input.view, projection, &self.light, input.focus);
        context.frustum_culling = toggles.frustum_culling;
        context.shadow_map = Some(shadow.depth_texture());

        let mut state = ActivePipelineState::new();
        let mut stats = FrameStats {
            incomplete_skipped: draw_list.incomplete_count() as u32,
            ..FrameStats::default()
        };

        // Shadow pass
        if toggles.shadows {
            let program = cache
                .shader(self.plain_shader)
                .ok_or(RenderError::MissingShader("plain"))?
                .program();

            state.bind_target(device, shadow.render_target(), shadow.viewport());
            state.set_color_mask(device, false);
            state.set_depth_test(device, true);
            device.clear(ClearFlags::DEPTH);

            state.use_program(device, Some(program));
            state.set_uniform(device, "proj", UniformValue::Mat4(to_column_major(&context.light_projection)));

            for drawable in draw_list.iter().filter(|d| d.is_complete()) {
                let Some(model) = drawable.model_matrix(physics) else { continue };
                let Some(mesh) = drawable.mesh.and_then(|h| cache.mesh(h)) else { continue };
                state.set_uniform(device, "modelView", UniformValue::Mat4(context.shadow_model_view(&model)));
                device.draw_indexed(mesh.layout(), mesh.index_count(), mesh.index_type());
                stats.shadow_casters += 1;
            }

            state.set_color_mask(device, true);
            self.shadow_map_cleared = false;
            stats.passes += 1;
        } else if !self.shadow_map_cleared {
            // Leave far depth behind so the main pass sees no occluders
            state.bind_target(device, shadow.render_target(), shadow.viewport());
            device.clear(ClearFlags::DEPTH);
            self.shadow_map_cleared = true;
            log::debug!("Shadow pass disabled, shadow map cleared");
        }

        // Main pass
        let (main_target, main_viewport) = if toggles.blur {
            (offscreen.render_target(), offscreen.viewport())
        } else {
            (RenderTarget::Default, self.window)
        };
        state.bind_target(device, main_target, main_viewport);
        state.set_color_mask(device, true);
        state.set_depth_test(device, true);
        device.clear(ClearFlags::COLOR | ClearFlags::DEPTH);

        for batch in draw_list.shader_batches() {
            let Some(shader) = cache.shader(batch.shader) else {
                stats.incomplete_skipped += batch.len() as u32;
                continue;
            };
            state.use_program(device, Some(shader.program()));
            set_frame_uniforms(device, &state, &context);

            for drawable in batch.drawables {
                draw_lit(device, &mut state, cache, &mut context, &mut stats, drawable, physics);
            }
        }
        stats.passes += 1;

        // Blur composite
        if toggles.blur {
            let program = cache
                .shader(self.blur_shader)
                .ok_or(RenderError::MissingShader("blur"))?
                .program();
            let previous = self.previous_view.unwrap_or(context.view);

            state.bind_target(device, RenderTarget::Default, self.window);
            device.clear(ClearFlags::COLOR);
            state.set_depth_test(device, false);

            state.use_program(device, Some(program));
            let uniforms = [
                ("previousModelView", UniformValue::Mat4(to_column_major(&previous))),
                ("proj", UniformValue::Mat4(to_column_major(&context.projection))),
                ("modelViewInverse", UniformValue::Mat4(to_column_major(&inverse_or_identity(&context.view)))),
                ("projInverse", UniformValue::Mat4(to_column_major(&inverse_or_identity(&context.projection)))),
                ("color", UniformValue::Int(0)),
                ("depth", UniformValue::Int(1)),
            ];
            for (name, value) in uniforms {
                state.set_uniform(device, name, value);
            }
            state.bind_texture(device, 0, Some(offscreen.color_texture()));
            state.bind_texture(device, 1, Some(offscreen.depth_texture()));
            device.draw_fullscreen_quad();

            state.set_depth_test(device, true);
            stats.passes += 1;
        }

        // Debug overlay
        if toggles.debug_draw {
            match physics {
                Some(world) => {
                    state.bind_target(device, RenderTarget::Default, self.window);
                    stats.debug_lines =
                        draw_physics_overlay(device, &mut state, world, &context, &toggles) as u32;
                    stats.passes += 1;
                }
                None => log::trace!("Debug overlay requested without a physics world"),
            }
        }

        // Frame-local state starts empty next frame; the device must agree
        state.unbind_textures(device);

        self.previous_view = Some(context.view);
        stats.objects_drawn = context.objects_drawn;
        stats.objects_culled = context.objects_culled;
        log::trace!("Frame stats: {:?}", stats);
        Ok(stats)
    }

    /// Free the off-screen targets. Shaders belong to the asset cache.
    pub fn release(mut self, device: &mut dyn GraphicsDevice) {
        if let Some(targets) = self.targets.take() {
            targets.release(device);
        }
    }
}

impl Drop for FramePipeline {
    fn drop(&mut self) {
        if self.targets.is_some() {
            log::warn!("Frame pipeline dropped without release; render targets leaked");
        }
    }
}

/// Uniforms shared by every drawable using the current program
fn set_frame_uniforms(device: &mut dyn GraphicsDevice, state: &ActivePipelineState, context: &RenderContext) {
    for (unit, name) in TEXTURE_UNIFORMS.iter().enumerate() {
        state.set_uniform(device, name, UniformValue::Int(unit as i32));
    }
    state.set_uniform(device, "depth", UniformValue::Int(SHADOW_MAP_UNIT as i32));
    state.set_uniform(device, "bias", UniformValue::Mat4(to_column_major(&context.bias)));
    state.set_uniform(device, "shadowProj", UniformValue::Mat4(to_column_major(&context.light_projection)));
    state.set_uniform(device, "light_dir", UniformValue::Vec3(context.light_direction.into()));
    state.set_uniform(device, "proj", UniformValue::Mat4(to_column_major(&context.projection)));
}

/// Draw one drawable in the main pass
fn draw_lit(
    device: &mut dyn GraphicsDevice,
    state: &mut ActivePipelineState,
    cache: &AssetCache,
    context: &mut RenderContext,
    stats: &mut FrameStats,
    drawable: &Drawable,
    physics: Option<&dyn PhysicsWorld>,
) {
    let Some(model) = drawable.model_matrix(physics) else {
        log::trace!("No transform for {} this frame", drawable.name);
        stats.unplaced_skipped += 1;
        return;
    };
    let Some(mesh) = drawable.mesh.and_then(|h| cache.mesh(h)) else {
        stats.incomplete_skipped += 1;
        return;
    };
    if !context.is_visible(mesh.bounds(), &model) {
        context.objects_culled += 1;
        return;
    }

    for (unit, slot) in drawable.textures.iter().enumerate() {
        let texture: Option<TextureId> = slot.and_then(|h| cache.texture(h)).map(|t| t.id());
        state.bind_texture(device, unit as u32, texture);
    }
    state.bind_texture(device, SHADOW_MAP_UNIT, context.shadow_map);

    state.set_uniform(device, "model", UniformValue::Mat4(to_column_major(&model)));
    state.set_uniform(device, "modelView", UniformValue::Mat4(context.model_view(&model)));
    state.set_uniform(device, "shadowModelView", UniformValue::Mat4(context.shadow_model_view(&model)));
    device.draw_indexed(mesh.layout(), mesh.index_count(), mesh.index_type());
    context.objects_drawn += 1;
}

fn inverse_or_identity(matrix: &Mat4) -> Mat4 {
    matrix.try_inverse().unwrap_or_else(Mat4::identity)
}
