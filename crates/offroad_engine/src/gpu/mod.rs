//! Graphics device abstraction
//!
//! Every GPU call the engine makes goes through [`GraphicsDevice`]. Nothing in
//! the engine holds hidden global GL-style state: the currently bound program
//! and target live in [`crate::render::ActivePipelineState`], which the frame
//! pipeline threads explicitly through each pass.
//!
//! A windowed backend implements this trait over its API of choice; the
//! [`RecordingDevice`] implementation is headless and keeps an ordered log of
//! every call, which is what tests and the validator binary use.

pub mod recording;

pub use recording::{DeviceCommand, RecordingDevice};

use bitflags::bitflags;
use std::fmt;
use thiserror::Error;

/// Result type for device operations
pub type GpuResult<T> = Result<T, GpuError>;

/// Device-level failures
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GpuError {
    /// An id that the device does not know (never created or already deleted)
    #[error("Invalid {kind} handle {id}")]
    InvalidHandle {
        /// Object kind, e.g. "texture"
        kind: &'static str,
        /// Raw id value
        id: u32,
    },

    /// Render target attachments do not form a complete framebuffer
    #[error("Render target is incomplete: {0}")]
    IncompleteRenderTarget(String),

    /// Any other backend failure
    #[error("Backend error: {0}")]
    Backend(String),
}

macro_rules! device_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name(pub u32);
    };
}

device_id!(
    /// GPU buffer holding vertex or index data
    BufferId
);
device_id!(
    /// GPU texture (colour or depth)
    TextureId
);
device_id!(
    /// Single compiled shader stage
    ShaderStageId
);
device_id!(
    /// Linked shader program
    ProgramId
);
device_id!(
    /// Vertex-layout binding object (attribute bindings against buffers)
    VertexLayoutId
);
device_id!(
    /// Off-screen framebuffer
    RenderTargetId
);

/// What a buffer is bound as
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BufferKind {
    /// Vertex attribute data
    Vertex,
    /// Element indices
    Index,
}

/// Shader pipeline stage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShaderStage {
    /// Vertex stage
    Vertex,
    /// Fragment ("pixel") stage
    Fragment,
}

impl fmt::Display for ShaderStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ShaderStage::Vertex => write!(f, "vertex"),
            ShaderStage::Fragment => write!(f, "fragment"),
        }
    }
}

/// Meaning of a vertex attribute slot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AttributeSemantic {
    /// Object-space position
    Position,
    /// Vertex normal
    Normal,
    /// First texture coordinate set
    Uv0,
    /// Second texture coordinate set
    Uv1,
    /// Third texture coordinate set
    Uv2,
}

/// One float attribute inside an interleaved vertex
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VertexAttribute {
    /// Attribute location
    pub location: u32,
    /// What the attribute carries
    pub semantic: AttributeSemantic,
    /// Number of f32 components
    pub components: u32,
    /// Byte offset inside the vertex
    pub offset: u32,
}

/// Element index width
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexType {
    /// 16-bit unsigned indices
    U16,
    /// 32-bit unsigned indices
    U32,
}

impl IndexType {
    /// Size of one index in bytes
    pub fn size(self) -> u32 {
        match self {
            IndexType::U16 => 2,
            IndexType::U32 => 4,
        }
    }
}

/// Texel format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextureFormat {
    /// 8-bit RGBA colour
    Rgba8,
    /// 24-bit depth
    Depth24,
}

/// Sampling filter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextureFilter {
    /// Point sampling, no mipmaps
    Nearest,
    /// Bilinear, no mipmaps
    Linear,
    /// Trilinear across generated mipmaps
    LinearMipmapLinear,
}

/// Texture creation parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextureDesc {
    /// Width in texels
    pub width: u32,
    /// Height in texels
    pub height: u32,
    /// Texel format
    pub format: TextureFormat,
    /// Minification filter
    pub filter: TextureFilter,
    /// Clamp coordinates to the edge instead of repeating
    pub clamp_to_edge: bool,
    /// Generate a full mip chain after upload
    pub generate_mipmaps: bool,
}

impl TextureDesc {
    /// Mipmapped, repeating RGBA8 image texture
    pub fn image(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            format: TextureFormat::Rgba8,
            filter: TextureFilter::LinearMipmapLinear,
            clamp_to_edge: false,
            generate_mipmaps: true,
        }
    }

    /// Render-target colour attachment
    pub fn color_target(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            format: TextureFormat::Rgba8,
            filter: TextureFilter::Linear,
            clamp_to_edge: true,
            generate_mipmaps: false,
        }
    }

    /// Render-target depth attachment
    pub fn depth_target(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            format: TextureFormat::Depth24,
            filter: TextureFilter::Nearest,
            clamp_to_edge: true,
            generate_mipmaps: false,
        }
    }
}

/// Attachments of an off-screen framebuffer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderTargetDesc {
    /// Colour attachment
    pub color: Option<TextureId>,
    /// Depth attachment
    pub depth: Option<TextureId>,
}

/// Framebuffer selection for a pass
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderTarget {
    /// The presentation surface
    Default,
    /// An off-screen framebuffer
    Offscreen(RenderTargetId),
}

/// Viewport rectangle in pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Viewport {
    /// Left edge
    pub x: i32,
    /// Bottom edge
    pub y: i32,
    /// Width
    pub width: u32,
    /// Height
    pub height: u32,
}

impl Viewport {
    /// Viewport covering `width` x `height` from the origin
    pub fn sized(width: u32, height: u32) -> Self {
        Self { x: 0, y: 0, width, height }
    }

    /// Width over height, 1.0 for a degenerate viewport
    pub fn aspect(&self) -> f32 {
        if self.height == 0 {
            1.0
        } else {
            self.width as f32 / self.height as f32
        }
    }
}

bitflags! {
    /// Buffers to clear
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct ClearFlags: u32 {
        /// Colour buffer
        const COLOR = 1 << 0;
        /// Depth buffer
        const DEPTH = 1 << 1;
    }
}

/// Uniform payload
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum UniformValue {
    /// Integer (also used for sampler units)
    Int(i32),
    /// Scalar float
    Float(f32),
    /// Three-component vector
    Vec3([f32; 3]),
    /// 4x4 matrix, column-major
    Mat4([f32; 16]),
}

/// Coloured world-space line segment
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DebugLine {
    /// Start point
    pub from: [f32; 3],
    /// End point
    pub to: [f32; 3],
    /// RGB colour
    pub color: [f32; 3],
}

/// Fixed-function line stipple pattern
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineStipple {
    /// Repeat factor
    pub factor: i32,
    /// 16-bit on/off pattern
    pub pattern: u16,
}

/// Graphics device seam
///
/// All methods take `&mut self`: a device is tied to one thread and one
/// context, and the engine never shares it.
pub trait GraphicsDevice {
    /// Upload `bytes` into a new buffer
    fn create_buffer(&mut self, kind: BufferKind, bytes: &[u8]) -> GpuResult<BufferId>;

    /// Free a buffer
    fn delete_buffer(&mut self, buffer: BufferId);

    /// Create a texture, optionally uploading `pixels`
    fn create_texture(&mut self, desc: &TextureDesc, pixels: Option<&[u8]>) -> GpuResult<TextureId>;

    /// Free a texture
    fn delete_texture(&mut self, texture: TextureId);

    /// Create an uncompiled shader stage holding `source`
    fn create_shader_stage(&mut self, stage: ShaderStage, source: &str) -> GpuResult<ShaderStageId>;

    /// Compile a stage; `Err` carries the compiler log
    fn compile_shader_stage(&mut self, stage: ShaderStageId) -> Result<(), String>;

    /// Free a shader stage
    fn delete_shader_stage(&mut self, stage: ShaderStageId);

    /// Create an empty program
    fn create_program(&mut self) -> GpuResult<ProgramId>;

    /// Attach a compiled stage to a program
    fn attach_shader_stage(&mut self, program: ProgramId, stage: ShaderStageId);

    /// Bind attribute `name` to location `unit` (takes effect at link)
    fn bind_attribute_location(&mut self, program: ProgramId, unit: u32, name: &str);

    /// Link a program; `Err` carries the linker log
    fn link_program(&mut self, program: ProgramId) -> Result<(), String>;

    /// Free a program
    fn delete_program(&mut self, program: ProgramId);

    /// Record attribute bindings against a vertex/index buffer pair
    fn create_vertex_layout(
        &mut self,
        vertex_buffer: BufferId,
        index_buffer: BufferId,
        stride: u32,
        attributes: &[VertexAttribute],
    ) -> GpuResult<VertexLayoutId>;

    /// Free a vertex layout
    fn delete_vertex_layout(&mut self, layout: VertexLayoutId);

    /// Build a framebuffer from texture attachments
    fn create_render_target(&mut self, desc: &RenderTargetDesc) -> GpuResult<RenderTargetId>;

    /// Free a framebuffer (attachments are not freed)
    fn delete_render_target(&mut self, target: RenderTargetId);

    /// Bind a framebuffer and set the viewport
    fn bind_render_target(&mut self, target: RenderTarget, viewport: Viewport);

    /// Clear the selected buffers of the bound target
    fn clear(&mut self, flags: ClearFlags);

    /// Enable or disable colour writes
    fn set_color_mask(&mut self, enabled: bool);

    /// Enable or disable depth testing
    fn set_depth_test(&mut self, enabled: bool);

    /// Enable a stipple pattern for lines, or disable it with `None`
    fn set_line_stipple(&mut self, stipple: Option<LineStipple>);

    /// Make a program current
    fn use_program(&mut self, program: Option<ProgramId>);

    /// Set a uniform by name on `program` (which must be current)
    fn set_uniform(&mut self, program: ProgramId, name: &str, value: UniformValue);

    /// Bind a texture to a sampler unit
    fn bind_texture(&mut self, unit: u32, texture: Option<TextureId>);

    /// Draw `index_count` indices through a vertex layout
    fn draw_indexed(&mut self, layout: VertexLayoutId, index_count: u32, index_type: IndexType);

    /// Draw a quad covering the whole viewport
    fn draw_fullscreen_quad(&mut self);

    /// Draw world-space lines with the given camera matrices (column-major)
    fn draw_lines(&mut self, lines: &[DebugLine], view: &[f32; 16], projection: &[f32; 16]);
}
