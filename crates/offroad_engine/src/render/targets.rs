//! Off-screen render targets
//!
//! Both targets are fixed-resolution and never follow window resizes.

use crate::gpu::{
    GpuResult, GraphicsDevice, RenderTarget, RenderTargetDesc, RenderTargetId, TextureDesc,
    TextureId, Viewport,
};

/// Depth-only framebuffer for the shadow pass
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShadowTarget {
    target: RenderTargetId,
    depth: TextureId,
    size: (u32, u32),
}

impl ShadowTarget {
    /// Allocate the depth texture and framebuffer
    pub fn create(device: &mut dyn GraphicsDevice, (width, height): (u32, u32)) -> GpuResult<Self> {
        let depth = device.create_texture(&TextureDesc::depth_target(width, height), None)?;
        let target = match device.create_render_target(&RenderTargetDesc { color: None, depth: Some(depth) }) {
            Ok(target) => target,
            Err(e) => {
                device.delete_texture(depth);
                return Err(e);
            }
        };
        log::debug!("Created {}x{} shadow target", width, height);
        Ok(Self { target, depth, size: (width, height) })
    }

    /// Framebuffer selection for binding
    pub fn render_target(&self) -> RenderTarget {
        RenderTarget::Offscreen(self.target)
    }

    /// Depth texture sampled by the main pass
    pub fn depth_texture(&self) -> TextureId {
        self.depth
    }

    /// Full-target viewport
    pub fn viewport(&self) -> Viewport {
        Viewport::sized(self.size.0, self.size.1)
    }

    /// Free the framebuffer and its texture
    pub fn release(self, device: &mut dyn GraphicsDevice) {
        device.delete_render_target(self.target);
        device.delete_texture(self.depth);
    }
}

/// Colour + depth framebuffer the main pass renders into when blur is on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OffscreenTarget {
    target: RenderTargetId,
    color: TextureId,
    depth: TextureId,
    size: (u32, u32),
}

impl OffscreenTarget {
    /// Allocate both textures and the framebuffer
    pub fn create(device: &mut dyn GraphicsDevice, (width, height): (u32, u32)) -> GpuResult<Self> {
        let color = device.create_texture(&TextureDesc::color_target(width, height), None)?;
        let depth = match device.create_texture(&TextureDesc::depth_target(width, height), None) {
            Ok(depth) => depth,
            Err(e) => {
                device.delete_texture(color);
                return Err(e);
            }
        };
        let desc = RenderTargetDesc { color: Some(color), depth: Some(depth) };
        let target = match device.create_render_target(&desc) {
            Ok(target) => target,
            Err(e) => {
                device.delete_texture(depth);
                device.delete_texture(color);
                return Err(e);
            }
        };
        log::debug!("Created {}x{} off-screen target", width, height);
        Ok(Self { target, color, depth, size: (width, height) })
    }

    /// Framebuffer selection for binding
    pub fn render_target(&self) -> RenderTarget {
        RenderTarget::Offscreen(self.target)
    }

    /// Colour attachment
    pub fn color_texture(&self) -> TextureId {
        self.color
    }

    /// Depth attachment
    pub fn depth_texture(&self) -> TextureId {
        self.depth
    }

    /// Full-target viewport
    pub fn viewport(&self) -> Viewport {
        Viewport::sized(self.size.0, self.size.1)
    }

    /// Free the framebuffer and its textures
    pub fn release(self, device: &mut dyn GraphicsDevice) {
        device.delete_render_target(self.target);
        device.delete_texture(self.depth);
        device.delete_texture(self.color);
    }
}

/// All off-screen targets owned by the frame pipeline
#[derive(Debug)]
pub struct RenderTargets {
    /// Shadow depth target
    pub shadow: ShadowTarget,
    /// Blur source target
    pub offscreen: OffscreenTarget,
}

impl RenderTargets {
    /// Create every target; nothing is leaked on failure
    pub fn create(
        device: &mut dyn GraphicsDevice,
        shadow_size: (u32, u32),
        offscreen_size: (u32, u32),
    ) -> GpuResult<Self> {
        let shadow = ShadowTarget::create(device, shadow_size)?;
        let offscreen = match OffscreenTarget::create(device, offscreen_size) {
            Ok(offscreen) => offscreen,
            Err(e) => {
                shadow.release(device);
                return Err(e);
            }
        };
        Ok(Self { shadow, offscreen })
    }

    /// Free every target
    pub fn release(self, device: &mut dyn GraphicsDevice) {
        self.offscreen.release(device);
        self.shadow.release(device);
    }
}
