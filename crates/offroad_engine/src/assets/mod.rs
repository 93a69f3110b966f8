//! Asset management system
//!
//! The [`AssetCache`] owns every GPU object created from an asset file and
//! hands out slot-map handles. Loading is delegated to the format modules:
//! - [`mesh_codec`] for the binary mesh format
//! - [`shader_desc`] and [`shader_builder`] for XML shader descriptions
//! - [`image_loader`] for texture images

pub mod cache;
pub mod image_loader;
pub mod mesh_codec;
pub mod resources;
pub mod shader_builder;
pub mod shader_desc;

pub use cache::{
    AssetCache, CacheStats, IndexBufferHandle, MeshHandle, ShaderHandle, TextureHandle,
    VertexBufferHandle,
};
pub use image_loader::ImageData;
pub use mesh_codec::{vertex_layout_for_stride, MeshData, MeshHeader, MeshVersionPolicy};
pub use resources::{IndexBuffer, Mesh, ShaderProgram, Texture, VertexBuffer};
pub use shader_desc::{AttributeBinding, ShaderDescription};

use crate::gpu::{GpuError, ShaderStage};
use std::path::PathBuf;
use thiserror::Error;

/// Result type for asset loading
pub type AssetResult<T> = Result<T, AssetError>;

/// Asset loading errors
///
/// Every variant names the offending file so the bootstrap can report it.
#[derive(Error, Debug)]
pub enum AssetError {
    /// File missing or unreadable
    #[error("Asset not found: {}", path.display())]
    NotFound {
        /// Path as requested
        path: PathBuf,
        /// Underlying IO error
        #[source]
        source: std::io::Error,
    },

    /// Content failed structural validation
    #[error("Malformed asset {}: {kind}", path.display())]
    Malformed {
        /// Canonical path
        path: PathBuf,
        /// What was wrong
        kind: MalformedKind,
    },

    /// A shader stage did not compile
    #[error("Failed to compile {stage} shader {}:\n{log}", path.display())]
    CompileFailure {
        /// Shader description path
        path: PathBuf,
        /// Stage that failed
        stage: ShaderStage,
        /// Compiler output
        log: String,
    },

    /// The shader program did not link
    #[error("Failed to link shader {}:\n{log}", path.display())]
    LinkFailure {
        /// Shader description path
        path: PathBuf,
        /// Linker output
        log: String,
    },

    /// Image decode or RGBA conversion failed
    #[error("Failed to decode image {}: {reason}", path.display())]
    DecodeFailure {
        /// Image path
        path: PathBuf,
        /// Decoder message
        reason: String,
    },

    /// The graphics device rejected an upload
    #[error("Graphics device error: {0}")]
    Device(#[from] GpuError),
}

/// Structural problems found while parsing an asset
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MalformedKind {
    /// Document or binary layout could not be parsed
    #[error("{0}")]
    Structure(String),

    /// Mesh format version rejected by the active policy
    #[error("unsupported format version {0}")]
    UnsupportedVersion(u32),

    /// Payload ended before the declared sizes
    #[error("truncated asset: expected {expected} bytes, found {available}")]
    TruncatedAsset {
        /// Bytes the header promises
        expected: usize,
        /// Bytes actually present
        available: usize,
    },

    /// Vertex or index stride outside the supported set
    #[error("invalid stride (vertex {vertex_stride}, index {index_stride})")]
    InvalidStride {
        /// Declared vertex stride
        vertex_stride: u32,
        /// Declared index stride
        index_stride: u32,
    },

    /// Shader description lacks a stage
    #[error("missing {0} shader block")]
    MissingStage(ShaderStage),
}

#[cfg(test)]
pub(crate) mod test_fixtures {
    //! On-disk asset builders shared by tests across the crate

    use super::mesh_codec::MeshData;
    use std::path::{Path, PathBuf};

    pub const PASSTHROUGH_VERTEX: &str = "attribute vec3 position;\nvoid main() { gl_Position = vec4(position, 1.0); }";
    pub const PASSTHROUGH_FRAGMENT: &str = "void main() { gl_FragColor = vec4(1.0); }";

    /// Unit quad in the XY plane with `stride`-byte vertices and 32-bit indices
    pub fn quad_mesh(stride: u32) -> MeshData {
        let corners = [[-1.0f32, -1.0, 0.0], [1.0, -1.0, 0.0], [1.0, 1.0, 0.0], [-1.0, 1.0, 0.0]];
        let mut vertices = Vec::new();
        for corner in corners {
            let mut vertex = vec![0u8; stride as usize];
            for (i, value) in corner.iter().enumerate() {
                vertex[i * 4..i * 4 + 4].copy_from_slice(&value.to_le_bytes());
            }
            vertices.extend_from_slice(&vertex);
        }
        let indices: Vec<u8> = [0u32, 1, 2, 0, 2, 3]
            .iter()
            .flat_map(|i| i.to_le_bytes())
            .collect();
        MeshData::from_parts(1, stride, vertices, 4, indices).unwrap()
    }

    pub fn write_mesh(dir: &Path, name: &str, stride: u32) -> PathBuf {
        let path = dir.join(name);
        std::fs::write(&path, quad_mesh(stride).encode()).unwrap();
        path
    }

    pub fn shader_xml(vertex: &str, fragment: &str) -> String {
        format!(
            "<shaders>\n  <shader type=\"vertex\"><![CDATA[{}]]></shader>\n  <shader type=\"pixel\"><![CDATA[{}]]></shader>\n  <attribute unit=\"0\" name=\"position\"/>\n</shaders>\n",
            vertex, fragment
        )
    }

    pub fn write_shader(dir: &Path, name: &str) -> PathBuf {
        write_shader_with(dir, name, PASSTHROUGH_VERTEX, PASSTHROUGH_FRAGMENT)
    }

    pub fn write_shader_with(dir: &Path, name: &str, vertex: &str, fragment: &str) -> PathBuf {
        let path = dir.join(name);
        std::fs::write(&path, shader_xml(vertex, fragment)).unwrap();
        path
    }

    pub fn write_png(dir: &Path, name: &str) -> PathBuf {
        let path = dir.join(name);
        image::RgbaImage::from_pixel(2, 2, image::Rgba([200, 100, 50, 255]))
            .save(&path)
            .unwrap();
        path
    }
}
