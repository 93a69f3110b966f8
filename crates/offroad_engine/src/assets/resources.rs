//! GPU-resident resources owned by the asset cache
//!
//! Only the cache constructs these; everything else sees them through shared
//! references and read-only accessors.

use super::cache::{IndexBufferHandle, VertexBufferHandle};
use super::mesh_codec::MeshHeader;
use super::shader_desc::AttributeBinding;
use crate::foundation::bounds::Aabb;
use crate::gpu::{BufferId, IndexType, ProgramId, ShaderStageId, TextureId, VertexLayoutId};

/// Vertex data resident on the GPU
#[derive(Debug)]
pub struct VertexBuffer {
    pub(crate) id: BufferId,
    pub(crate) size: usize,
}

impl VertexBuffer {
    /// Device buffer
    pub fn id(&self) -> BufferId {
        self.id
    }

    /// Size in bytes
    pub fn size(&self) -> usize {
        self.size
    }
}

/// Index data resident on the GPU
#[derive(Debug)]
pub struct IndexBuffer {
    pub(crate) id: BufferId,
    pub(crate) size: usize,
    pub(crate) index_type: IndexType,
}

impl IndexBuffer {
    /// Device buffer
    pub fn id(&self) -> BufferId {
        self.id
    }

    /// Size in bytes
    pub fn size(&self) -> usize {
        self.size
    }

    /// Index width
    pub fn index_type(&self) -> IndexType {
        self.index_type
    }
}

/// Decoded 2D image resident on the GPU
#[derive(Debug)]
pub struct Texture {
    pub(crate) id: TextureId,
    pub(crate) width: u32,
    pub(crate) height: u32,
}

impl Texture {
    /// Device texture
    pub fn id(&self) -> TextureId {
        self.id
    }

    /// Width in texels
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Height in texels
    pub fn height(&self) -> u32 {
        self.height
    }
}

/// Compiled and linked vertex/fragment pair
#[derive(Debug)]
pub struct ShaderProgram {
    pub(crate) vertex: ShaderStageId,
    pub(crate) fragment: ShaderStageId,
    pub(crate) program: ProgramId,
    pub(crate) attributes: Vec<AttributeBinding>,
}

impl ShaderProgram {
    /// Linked program
    pub fn program(&self) -> ProgramId {
        self.program
    }

    /// Vertex stage
    pub fn vertex_stage(&self) -> ShaderStageId {
        self.vertex
    }

    /// Fragment stage
    pub fn fragment_stage(&self) -> ShaderStageId {
        self.fragment
    }

    /// Attribute locations bound before linking
    pub fn attribute_bindings(&self) -> &[AttributeBinding] {
        &self.attributes
    }
}

/// Drawable geometry: buffers plus the layout binding a draw activates
#[derive(Debug)]
pub struct Mesh {
    pub(crate) vertex_buffer: VertexBufferHandle,
    pub(crate) index_buffer: IndexBufferHandle,
    pub(crate) layout: VertexLayoutId,
    pub(crate) header: MeshHeader,
    pub(crate) index_type: IndexType,
    pub(crate) bounds: Option<Aabb>,
}

impl Mesh {
    /// Vertex buffer owned by the cache
    pub fn vertex_buffer(&self) -> VertexBufferHandle {
        self.vertex_buffer
    }

    /// Index buffer owned by the cache
    pub fn index_buffer(&self) -> IndexBufferHandle {
        self.index_buffer
    }

    /// Vertex-layout binding used for draws
    pub fn layout(&self) -> VertexLayoutId {
        self.layout
    }

    /// Format version the mesh was stored with
    pub fn version(&self) -> u32 {
        self.header.version
    }

    /// Number of vertices
    pub fn vertex_count(&self) -> u32 {
        self.header.vertex_count
    }

    /// Bytes per vertex
    pub fn vertex_stride(&self) -> u32 {
        self.header.vertex_stride
    }

    /// Number of indices
    pub fn index_count(&self) -> u32 {
        self.header.index_count
    }

    /// Bytes per index
    pub fn index_stride(&self) -> u32 {
        self.header.index_stride
    }

    /// Index width for draw calls
    pub fn index_type(&self) -> IndexType {
        self.index_type
    }

    /// Object-space bounds
    pub fn bounds(&self) -> Option<Aabb> {
        self.bounds
    }
}
