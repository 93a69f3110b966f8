//! Headless graphics device that records every call
//!
//! Used by tests to assert call order and resource lifetimes, and by the
//! validator binary to exercise a full frame without a window.

use super::*;
use std::collections::{HashMap, HashSet};

/// One recorded device call
#[derive(Debug, Clone, PartialEq)]
pub enum DeviceCommand {
    /// `create_buffer`
    CreateBuffer(BufferId, BufferKind, usize),
    /// `delete_buffer`
    DeleteBuffer(BufferId),
    /// `create_texture`
    CreateTexture(TextureId, TextureDesc),
    /// `delete_texture`
    DeleteTexture(TextureId),
    /// `create_shader_stage`
    CreateShaderStage(ShaderStageId, ShaderStage),
    /// `compile_shader_stage`
    CompileShaderStage(ShaderStageId),
    /// `delete_shader_stage`
    DeleteShaderStage(ShaderStageId),
    /// `create_program`
    CreateProgram(ProgramId),
    /// `attach_shader_stage`
    AttachShaderStage(ProgramId, ShaderStageId),
    /// `bind_attribute_location`
    BindAttributeLocation(ProgramId, u32, String),
    /// `link_program`
    LinkProgram(ProgramId),
    /// `delete_program`
    DeleteProgram(ProgramId),
    /// `create_vertex_layout`
    CreateVertexLayout(VertexLayoutId, u32, Vec<VertexAttribute>),
    /// `delete_vertex_layout`
    DeleteVertexLayout(VertexLayoutId),
    /// `create_render_target`
    CreateRenderTarget(RenderTargetId, RenderTargetDesc),
    /// `delete_render_target`
    DeleteRenderTarget(RenderTargetId),
    /// `bind_render_target`
    BindRenderTarget(RenderTarget, Viewport),
    /// `clear`
    Clear(ClearFlags),
    /// `set_color_mask`
    SetColorMask(bool),
    /// `set_depth_test`
    SetDepthTest(bool),
    /// `set_line_stipple`
    SetLineStipple(Option<LineStipple>),
    /// `use_program`
    UseProgram(Option<ProgramId>),
    /// `set_uniform`
    SetUniform(ProgramId, String, UniformValue),
    /// `bind_texture`
    BindTexture(u32, Option<TextureId>),
    /// `draw_indexed`
    DrawIndexed(VertexLayoutId, u32, IndexType),
    /// `draw_fullscreen_quad`
    DrawFullscreenQuad,
    /// `draw_lines`
    DrawLines(usize),
}

/// Recording, headless implementation of [`GraphicsDevice`]
#[derive(Debug, Default)]
pub struct RecordingDevice {
    next_id: u32,
    commands: Vec<DeviceCommand>,

    buffers: HashSet<u32>,
    textures: HashSet<u32>,
    stages: HashMap<u32, String>,
    programs: HashMap<u32, Vec<u32>>,
    layouts: HashSet<u32>,
    targets: HashSet<u32>,

    compile_count: usize,
    link_count: usize,
    invalid_deletes: usize,

    fail_compile_marker: Option<String>,
    fail_link_marker: Option<String>,
}

impl RecordingDevice {
    /// Create an empty device
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every stage whose source contains `marker` fail to compile
    pub fn fail_compile_on(&mut self, marker: impl Into<String>) {
        self.fail_compile_marker = Some(marker.into());
    }

    /// Make every program with a stage containing `marker` fail to link
    pub fn fail_link_on(&mut self, marker: impl Into<String>) {
        self.fail_link_marker = Some(marker.into());
    }

    /// All commands recorded so far, oldest first
    pub fn commands(&self) -> &[DeviceCommand] {
        &self.commands
    }

    /// Forget the recorded commands (live-object tracking is kept)
    pub fn clear_commands(&mut self) {
        self.commands.clear();
    }

    /// Number of `compile_shader_stage` calls
    pub fn compile_count(&self) -> usize {
        self.compile_count
    }

    /// Number of `link_program` calls
    pub fn link_count(&self) -> usize {
        self.link_count
    }

    /// Number of deletes of ids that were not live (double free or bogus id)
    pub fn invalid_deletes(&self) -> usize {
        self.invalid_deletes
    }

    /// Objects created and not yet deleted, across all kinds
    pub fn live_object_count(&self) -> usize {
        self.buffers.len()
            + self.textures.len()
            + self.stages.len()
            + self.programs.len()
            + self.layouts.len()
            + self.targets.len()
    }

    /// Number of live textures
    pub fn live_textures(&self) -> usize {
        self.textures.len()
    }

    fn allocate(&mut self) -> u32 {
        self.next_id += 1;
        self.next_id
    }

    fn note_delete(&mut self, removed: bool, kind: &str, id: u32) {
        if !removed {
            self.invalid_deletes += 1;
            log::warn!("Delete of unknown {} {}", kind, id);
        }
    }
}

impl GraphicsDevice for RecordingDevice {
    fn create_buffer(&mut self, kind: BufferKind, bytes: &[u8]) -> GpuResult<BufferId> {
        let id = BufferId(self.allocate());
        self.buffers.insert(id.0);
        self.commands.push(DeviceCommand::CreateBuffer(id, kind, bytes.len()));
        Ok(id)
    }

    fn delete_buffer(&mut self, buffer: BufferId) {
        let removed = self.buffers.remove(&buffer.0);
        self.note_delete(removed, "buffer", buffer.0);
        self.commands.push(DeviceCommand::DeleteBuffer(buffer));
    }

    fn create_texture(&mut self, desc: &TextureDesc, pixels: Option<&[u8]>) -> GpuResult<TextureId> {
        if let Some(pixels) = pixels {
            let texel_size = match desc.format {
                TextureFormat::Rgba8 => 4,
                TextureFormat::Depth24 => 3,
            };
            let expected = desc.width as usize * desc.height as usize * texel_size;
            if pixels.len() != expected {
                return Err(GpuError::Backend(format!(
                    "texture upload of {} bytes, expected {}",
                    pixels.len(),
                    expected
                )));
            }
        }
        let id = TextureId(self.allocate());
        self.textures.insert(id.0);
        self.commands.push(DeviceCommand::CreateTexture(id, *desc));
        Ok(id)
    }

    fn delete_texture(&mut self, texture: TextureId) {
        let removed = self.textures.remove(&texture.0);
        self.note_delete(removed, "texture", texture.0);
        self.commands.push(DeviceCommand::DeleteTexture(texture));
    }

    fn create_shader_stage(&mut self, stage: ShaderStage, source: &str) -> GpuResult<ShaderStageId> {
        let id = ShaderStageId(self.allocate());
        self.stages.insert(id.0, source.to_owned());
        self.commands.push(DeviceCommand::CreateShaderStage(id, stage));
        Ok(id)
    }

    fn compile_shader_stage(&mut self, stage: ShaderStageId) -> Result<(), String> {
        self.compile_count += 1;
        self.commands.push(DeviceCommand::CompileShaderStage(stage));
        let source = self
            .stages
            .get(&stage.0)
            .ok_or_else(|| format!("unknown shader stage {}", stage.0))?;
        match &self.fail_compile_marker {
            Some(marker) if source.contains(marker.as_str()) => {
                Err(format!("0:1(1): error: syntax error near '{}'", marker))
            }
            _ => Ok(()),
        }
    }

    fn delete_shader_stage(&mut self, stage: ShaderStageId) {
        let removed = self.stages.remove(&stage.0).is_some();
        self.note_delete(removed, "shader stage", stage.0);
        self.commands.push(DeviceCommand::DeleteShaderStage(stage));
    }

    fn create_program(&mut self) -> GpuResult<ProgramId> {
        let id = ProgramId(self.allocate());
        self.programs.insert(id.0, Vec::new());
        self.commands.push(DeviceCommand::CreateProgram(id));
        Ok(id)
    }

    fn attach_shader_stage(&mut self, program: ProgramId, stage: ShaderStageId) {
        if let Some(attached) = self.programs.get_mut(&program.0) {
            attached.push(stage.0);
        }
        self.commands.push(DeviceCommand::AttachShaderStage(program, stage));
    }

    fn bind_attribute_location(&mut self, program: ProgramId, unit: u32, name: &str) {
        self.commands
            .push(DeviceCommand::BindAttributeLocation(program, unit, name.to_owned()));
    }

    fn link_program(&mut self, program: ProgramId) -> Result<(), String> {
        self.link_count += 1;
        self.commands.push(DeviceCommand::LinkProgram(program));
        let attached = self
            .programs
            .get(&program.0)
            .ok_or_else(|| format!("unknown program {}", program.0))?;
        if attached.len() < 2 {
            return Err("program needs a vertex and a fragment stage".to_owned());
        }
        if let Some(marker) = &self.fail_link_marker {
            let poisoned = attached
                .iter()
                .filter_map(|id| self.stages.get(id))
                .any(|source| source.contains(marker.as_str()));
            if poisoned {
                return Err(format!("error: unresolved symbol '{}'", marker));
            }
        }
        Ok(())
    }

    fn delete_program(&mut self, program: ProgramId) {
        let removed = self.programs.remove(&program.0).is_some();
        self.note_delete(removed, "program", program.0);
        self.commands.push(DeviceCommand::DeleteProgram(program));
    }

    fn create_vertex_layout(
        &mut self,
        vertex_buffer: BufferId,
        index_buffer: BufferId,
        stride: u32,
        attributes: &[VertexAttribute],
    ) -> GpuResult<VertexLayoutId> {
        for buffer in [vertex_buffer, index_buffer] {
            if !self.buffers.contains(&buffer.0) {
                return Err(GpuError::InvalidHandle { kind: "buffer", id: buffer.0 });
            }
        }
        let id = VertexLayoutId(self.allocate());
        self.layouts.insert(id.0);
        self.commands
            .push(DeviceCommand::CreateVertexLayout(id, stride, attributes.to_vec()));
        Ok(id)
    }

    fn delete_vertex_layout(&mut self, layout: VertexLayoutId) {
        let removed = self.layouts.remove(&layout.0);
        self.note_delete(removed, "vertex layout", layout.0);
        self.commands.push(DeviceCommand::DeleteVertexLayout(layout));
    }

    fn create_render_target(&mut self, desc: &RenderTargetDesc) -> GpuResult<RenderTargetId> {
        if desc.color.is_none() && desc.depth.is_none() {
            return Err(GpuError::IncompleteRenderTarget("no attachments".to_owned()));
        }
        for texture in desc.color.iter().chain(desc.depth.iter()) {
            if !self.textures.contains(&texture.0) {
                return Err(GpuError::IncompleteRenderTarget(format!(
                    "attachment {} is not a live texture",
                    texture.0
                )));
            }
        }
        let id = RenderTargetId(self.allocate());
        self.targets.insert(id.0);
        self.commands.push(DeviceCommand::CreateRenderTarget(id, *desc));
        Ok(id)
    }

    fn delete_render_target(&mut self, target: RenderTargetId) {
        let removed = self.targets.remove(&target.0);
        self.note_delete(removed, "render target", target.0);
        self.commands.push(DeviceCommand::DeleteRenderTarget(target));
    }

    fn bind_render_target(&mut self, target: RenderTarget, viewport: Viewport) {
        self.commands.push(DeviceCommand::BindRenderTarget(target, viewport));
    }

    fn clear(&mut self, flags: ClearFlags) {
        self.commands.push(DeviceCommand::Clear(flags));
    }

    fn set_color_mask(&mut self, enabled: bool) {
        self.commands.push(DeviceCommand::SetColorMask(enabled));
    }

    fn set_depth_test(&mut self, enabled: bool) {
        self.commands.push(DeviceCommand::SetDepthTest(enabled));
    }

    fn set_line_stipple(&mut self, stipple: Option<LineStipple>) {
        self.commands.push(DeviceCommand::SetLineStipple(stipple));
    }

    fn use_program(&mut self, program: Option<ProgramId>) {
        self.commands.push(DeviceCommand::UseProgram(program));
    }

    fn set_uniform(&mut self, program: ProgramId, name: &str, value: UniformValue) {
        self.commands
            .push(DeviceCommand::SetUniform(program, name.to_owned(), value));
    }

    fn bind_texture(&mut self, unit: u32, texture: Option<TextureId>) {
        self.commands.push(DeviceCommand::BindTexture(unit, texture));
    }

    fn draw_indexed(&mut self, layout: VertexLayoutId, index_count: u32, index_type: IndexType) {
        self.commands
            .push(DeviceCommand::DrawIndexed(layout, index_count, index_type));
    }

    fn draw_fullscreen_quad(&mut self) {
        self.commands.push(DeviceCommand::DrawFullscreenQuad);
    }

    fn draw_lines(&mut self, lines: &[DebugLine], _view: &[f32; 16], _projection: &[f32; 16]) {
        self.commands.push(DeviceCommand::DrawLines(lines.len()));
    }
}
