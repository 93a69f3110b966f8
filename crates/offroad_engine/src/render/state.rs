//! Active pipeline state
//!
//! Shadows what is currently bound on the device. The frame pipeline passes
//! one of these by `&mut` through every pass; redundant binds are skipped and
//! uniform writes are checked against the bound program.

use crate::gpu::{
    GraphicsDevice, ProgramId, RenderTarget, TextureId, UniformValue, Viewport,
};

/// Number of sampler units tracked
pub const TEXTURE_UNITS: usize = 8;

/// Device state as last set through this value
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ActivePipelineState {
    target: Option<(RenderTarget, Viewport)>,
    program: Option<ProgramId>,
    textures: [Option<TextureId>; TEXTURE_UNITS],
    depth_test: Option<bool>,
    color_mask: Option<bool>,
    program_binds: u32,
}

impl ActivePipelineState {
    /// Unknown state; the first call of every kind reaches the device
    pub fn new() -> Self {
        Self::default()
    }

    /// Currently bound program
    pub fn program(&self) -> Option<ProgramId> {
        self.program
    }

    /// Currently bound render target
    pub fn target(&self) -> Option<RenderTarget> {
        self.target.map(|(target, _)| target)
    }

    /// Programs actually bound on the device since creation
    pub fn program_binds(&self) -> u32 {
        self.program_binds
    }

    /// Bind a framebuffer with its viewport
    pub fn bind_target(&mut self, device: &mut dyn GraphicsDevice, target: RenderTarget, viewport: Viewport) {
        if self.target != Some((target, viewport)) {
            device.bind_render_target(target, viewport);
            self.target = Some((target, viewport));
        }
    }

    /// Make `program` current
    pub fn use_program(&mut self, device: &mut dyn GraphicsDevice, program: Option<ProgramId>) {
        if self.program != program {
            device.use_program(program);
            self.program = program;
            if program.is_some() {
                self.program_binds += 1;
            }
        }
    }

    /// Set a uniform on the current program.
    ///
    /// Ignored with a warning when no program is bound.
    pub fn set_uniform(&self, device: &mut dyn GraphicsDevice, name: &str, value: UniformValue) {
        match self.program {
            Some(program) => device.set_uniform(program, name, value),
            None => log::warn!("Uniform {} set with no program bound", name),
        }
    }

    /// Bind a texture to a sampler unit
    pub fn bind_texture(&mut self, device: &mut dyn GraphicsDevice, unit: u32, texture: Option<TextureId>) {
        match self.textures.get_mut(unit as usize) {
            Some(slot) if *slot == texture => {}
            Some(slot) => {
                device.bind_texture(unit, texture);
                *slot = texture;
            }
            None => device.bind_texture(unit, texture),
        }
    }

    /// Unbind every sampler unit still holding a texture.
    ///
    /// Called at the end of a frame so the next frame starts from empty units.
    pub fn unbind_textures(&mut self, device: &mut dyn GraphicsDevice) {
        for (unit, slot) in self.textures.iter_mut().enumerate() {
            if slot.take().is_some() {
                device.bind_texture(unit as u32, None);
            }
        }
    }

    /// Enable or disable depth testing
    pub fn set_depth_test(&mut self, device: &mut dyn GraphicsDevice, enabled: bool) {
        if self.depth_test != Some(enabled) {
            device.set_depth_test(enabled);
            self.depth_test = Some(enabled);
        }
    }

    /// Enable or disable colour writes
    pub fn set_color_mask(&mut self, device: &mut dyn GraphicsDevice, enabled: bool) {
        if self.color_mask != Some(enabled) {
            device.set_color_mask(enabled);
            self.color_mask = Some(enabled);
        }
    }
}
