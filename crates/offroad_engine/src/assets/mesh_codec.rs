//! Binary mesh format
//!
//! Layout, all integers 32-bit little-endian:
//!
//! ```text
//! [version][vertexCount][indexCount][vertexStride][indexStride]
//! [vertexCount * vertexStride bytes of interleaved vertices]
//! [indexCount * indexStride bytes of indices]
//! ```
//!
//! Every vertex starts with a position (3 x f32) and a normal (3 x f32). Longer
//! strides add up to three UV sets; which ones are present is a pure function
//! of the stride, see [`vertex_layout_for_stride`].

use serde::{Deserialize, Serialize};

use super::MalformedKind;
use crate::foundation::bounds::Aabb;
use crate::foundation::math::Vec3;
use crate::gpu::{AttributeSemantic, IndexType, VertexAttribute};

/// Size of the fixed header in bytes
pub const HEADER_SIZE: usize = 20;

/// Newest format version this codec understands
pub const SUPPORTED_VERSION: u32 = 1;

/// Position plus normal
pub const MIN_VERTEX_STRIDE: u32 = 24;

/// Which header versions are accepted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MeshVersionPolicy {
    /// Any version greater than or equal to the value
    AtLeast(u32),
    /// Only this exact version
    Exactly(u32),
}

impl Default for MeshVersionPolicy {
    fn default() -> Self {
        MeshVersionPolicy::AtLeast(SUPPORTED_VERSION)
    }
}

impl MeshVersionPolicy {
    /// Whether `version` passes this policy
    pub fn accepts(self, version: u32) -> bool {
        match self {
            MeshVersionPolicy::AtLeast(min) => version >= min.max(1),
            MeshVersionPolicy::Exactly(exact) => version == exact && version >= 1,
        }
    }
}

/// Decoded mesh header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MeshHeader {
    /// Format version
    pub version: u32,
    /// Number of vertices
    pub vertex_count: u32,
    /// Number of indices
    pub index_count: u32,
    /// Bytes per vertex
    pub vertex_stride: u32,
    /// Bytes per index
    pub index_stride: u32,
}

impl MeshHeader {
    fn parse(bytes: &[u8]) -> Result<Self, MalformedKind> {
        if bytes.len() < HEADER_SIZE {
            return Err(MalformedKind::TruncatedAsset {
                expected: HEADER_SIZE,
                available: bytes.len(),
            });
        }
        let field = |i: usize| {
            let mut raw = [0u8; 4];
            raw.copy_from_slice(&bytes[i * 4..i * 4 + 4]);
            u32::from_le_bytes(raw)
        };
        Ok(Self {
            version: field(0),
            vertex_count: field(1),
            index_count: field(2),
            vertex_stride: field(3),
            index_stride: field(4),
        })
    }

    fn write(&self, out: &mut Vec<u8>) {
        for value in [
            self.version,
            self.vertex_count,
            self.index_count,
            self.vertex_stride,
            self.index_stride,
        ] {
            out.extend_from_slice(&value.to_le_bytes());
        }
    }

    /// Index width declared by the header, if supported
    pub fn index_type(&self) -> Option<IndexType> {
        match self.index_stride {
            2 => Some(IndexType::U16),
            4 => Some(IndexType::U32),
            _ => None,
        }
    }

    /// Size of the vertex blob, `None` on overflow
    pub fn vertex_bytes(&self) -> Option<usize> {
        (self.vertex_count as usize).checked_mul(self.vertex_stride as usize)
    }

    /// Size of the index blob, `None` on overflow
    pub fn index_bytes(&self) -> Option<usize> {
        (self.index_count as usize).checked_mul(self.index_stride as usize)
    }

    fn validate(&self, policy: MeshVersionPolicy) -> Result<IndexType, MalformedKind> {
        if !policy.accepts(self.version) {
            return Err(MalformedKind::UnsupportedVersion(self.version));
        }
        let index_type = self
            .index_type()
            .filter(|_| self.vertex_stride >= MIN_VERTEX_STRIDE)
            .ok_or(MalformedKind::InvalidStride {
                vertex_stride: self.vertex_stride,
                index_stride: self.index_stride,
            })?;
        Ok(index_type)
    }
}

/// Vertex attribute bindings implied by a vertex stride
///
/// Position and normal are always present; UV0, UV1 and UV2 appear at strides
/// of at least 32, 40 and 48 bytes.
pub fn vertex_layout_for_stride(stride: u32) -> Vec<VertexAttribute> {
    const OPTIONAL: [(AttributeSemantic, u32); 3] = [
        (AttributeSemantic::Uv0, 24),
        (AttributeSemantic::Uv1, 32),
        (AttributeSemantic::Uv2, 40),
    ];

    let mut attributes = vec![
        VertexAttribute { location: 0, semantic: AttributeSemantic::Position, components: 3, offset: 0 },
        VertexAttribute { location: 1, semantic: AttributeSemantic::Normal, components: 3, offset: 12 },
    ];
    for (semantic, offset) in OPTIONAL {
        if stride >= offset + 8 {
            attributes.push(VertexAttribute {
                location: attributes.len() as u32,
                semantic,
                components: 2,
                offset,
            });
        }
    }
    attributes
}

/// A decoded mesh, still on the CPU
#[derive(Debug, Clone, PartialEq)]
pub struct MeshData {
    /// Header as read
    pub header: MeshHeader,
    /// Interleaved vertex bytes
    pub vertices: Vec<u8>,
    /// Index bytes
    pub indices: Vec<u8>,
    /// Object-space bounds of the positions, `None` for an empty mesh
    pub bounds: Option<Aabb>,
}

impl MeshData {
    /// Decode a complete mesh file
    pub fn from_bytes(bytes: &[u8], policy: MeshVersionPolicy) -> Result<Self, MalformedKind> {
        let header = MeshHeader::parse(bytes)?;
        header.validate(policy)?;

        let overflow = || MalformedKind::Structure("declared mesh size overflows".to_owned());
        let vertex_bytes = header.vertex_bytes().ok_or_else(overflow)?;
        let index_bytes = header.index_bytes().ok_or_else(overflow)?;
        let expected = HEADER_SIZE
            .checked_add(vertex_bytes)
            .and_then(|n| n.checked_add(index_bytes))
            .ok_or_else(overflow)?;

        if bytes.len() < expected {
            return Err(MalformedKind::TruncatedAsset {
                expected,
                available: bytes.len(),
            });
        }
        if bytes.len() > expected {
            log::debug!("Ignoring {} trailing bytes after mesh data", bytes.len() - expected);
        }

        let vertex_end = HEADER_SIZE + vertex_bytes;
        let vertices = bytes[HEADER_SIZE..vertex_end].to_vec();
        let indices = bytes[vertex_end..expected].to_vec();
        let bounds = position_bounds(&vertices, header.vertex_stride);

        Ok(Self { header, vertices, indices, bounds })
    }

    /// Assemble a mesh from raw blobs, validating them like a decoded file
    pub fn from_parts(
        version: u32,
        vertex_stride: u32,
        vertices: Vec<u8>,
        index_stride: u32,
        indices: Vec<u8>,
    ) -> Result<Self, MalformedKind> {
        let invalid = MalformedKind::InvalidStride { vertex_stride, index_stride };
        if vertex_stride == 0 || index_stride == 0 {
            return Err(invalid);
        }
        if vertices.len() % vertex_stride as usize != 0 || indices.len() % index_stride as usize != 0 {
            return Err(invalid);
        }
        let count = |len: usize, stride: u32| {
            u32::try_from(len / stride as usize)
                .map_err(|_| MalformedKind::Structure("too many elements".to_owned()))
        };

        let header = MeshHeader {
            version,
            vertex_count: count(vertices.len(), vertex_stride)?,
            index_count: count(indices.len(), index_stride)?,
            vertex_stride,
            index_stride,
        };
        header.validate(MeshVersionPolicy::AtLeast(1))?;
        let bounds = position_bounds(&vertices, vertex_stride);

        Ok(Self { header, vertices, indices, bounds })
    }

    /// Serialize back into the binary format
    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(HEADER_SIZE + self.vertices.len() + self.indices.len());
        self.header.write(&mut out);
        out.extend_from_slice(&self.vertices);
        out.extend_from_slice(&self.indices);
        out
    }

    /// Index width (validated at decode time)
    pub fn index_type(&self) -> IndexType {
        self.header.index_type().unwrap_or(IndexType::U32)
    }

    /// Attribute bindings for this mesh's stride
    pub fn vertex_layout(&self) -> Vec<VertexAttribute> {
        vertex_layout_for_stride(self.header.vertex_stride)
    }
}

fn position_bounds(vertices: &[u8], stride: u32) -> Option<Aabb> {
    let read = |chunk: &[u8], i: usize| {
        let mut raw = [0u8; 4];
        raw.copy_from_slice(&chunk[i * 4..i * 4 + 4]);
        f32::from_le_bytes(raw)
    };
    Aabb::from_points(
        vertices
            .chunks_exact(stride as usize)
            .map(|v| Vec3::new(read(v, 0), read(v, 1), read(v, 2))),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assets::test_fixtures::quad_mesh;

    fn semantics(stride: u32) -> Vec<AttributeSemantic> {
        vertex_layout_for_stride(stride).iter().map(|a| a.semantic).collect()
    }

    #[test]
    fn test_layout_inference_by_stride() {
        use AttributeSemantic::*;
        assert_eq!(semantics(24), vec![Position, Normal]);
        assert_eq!(semantics(32), vec![Position, Normal, Uv0]);
        assert_eq!(semantics(40), vec![Position, Normal, Uv0, Uv1]);
        assert_eq!(semantics(48), vec![Position, Normal, Uv0, Uv1, Uv2]);
    }

    #[test]
    fn test_layout_offsets_and_locations() {
        let layout = vertex_layout_for_stride(48);
        let offsets: Vec<(u32, u32, u32)> =
            layout.iter().map(|a| (a.location, a.offset, a.components)).collect();
        assert_eq!(offsets, vec![(0, 0, 3), (1, 12, 3), (2, 24, 2), (3, 32, 2), (4, 40, 2)]);
    }

    #[test]
    fn test_intermediate_stride_rounds_down() {
        assert_eq!(vertex_layout_for_stride(36).len(), 3);
    }

    #[test]
    fn test_decode_matches_encoded_quad() {
        let mesh = quad_mesh(32);
        let decoded = MeshData::from_bytes(&mesh.encode(), MeshVersionPolicy::default()).unwrap();

        assert_eq!(decoded.header.vertex_count, 4);
        assert_eq!(decoded.header.index_count, 6);
        assert_eq!(decoded.index_type(), IndexType::U32);
        let bounds = decoded.bounds.unwrap();
        assert_eq!(bounds.min, Vec3::new(-1.0, -1.0, 0.0));
        assert_eq!(bounds.max, Vec3::new(1.0, 1.0, 0.0));
    }

    #[test]
    fn test_truncated_vertex_blob_is_rejected() {
        let bytes = quad_mesh(24).encode();
        let cut = &bytes[..HEADER_SIZE + 50];
        let err = MeshData::from_bytes(cut, MeshVersionPolicy::default()).unwrap_err();
        assert_eq!(
            err,
            MalformedKind::TruncatedAsset { expected: bytes.len(), available: HEADER_SIZE + 50 }
        );
    }

    #[test]
    fn test_truncated_index_blob_is_rejected() {
        let bytes = quad_mesh(24).encode();
        let err = MeshData::from_bytes(&bytes[..bytes.len() - 1], MeshVersionPolicy::default())
            .unwrap_err();
        assert!(matches!(err, MalformedKind::TruncatedAsset { .. }));
    }

    #[test]
    fn test_short_header_is_truncated() {
        let err = MeshData::from_bytes(&[1, 0, 0], MeshVersionPolicy::default()).unwrap_err();
        assert_eq!(err, MalformedKind::TruncatedAsset { expected: HEADER_SIZE, available: 3 });
    }

    #[test]
    fn test_version_gate() {
        let mut bytes = quad_mesh(24).encode();
        bytes[0..4].copy_from_slice(&0u32.to_le_bytes());
        for policy in [MeshVersionPolicy::AtLeast(1), MeshVersionPolicy::Exactly(1), MeshVersionPolicy::AtLeast(0)] {
            assert_eq!(
                MeshData::from_bytes(&bytes, policy).unwrap_err(),
                MalformedKind::UnsupportedVersion(0)
            );
        }

        bytes[0..4].copy_from_slice(&1u32.to_le_bytes());
        assert!(MeshData::from_bytes(&bytes, MeshVersionPolicy::Exactly(1)).is_ok());

        bytes[0..4].copy_from_slice(&2u32.to_le_bytes());
        assert!(MeshData::from_bytes(&bytes, MeshVersionPolicy::AtLeast(1)).is_ok());
        assert!(MeshData::from_bytes(&bytes, MeshVersionPolicy::Exactly(1)).is_err());
    }

    #[test]
    fn test_unsupported_strides() {
        let mut bytes = quad_mesh(24).encode();
        bytes[16..20].copy_from_slice(&3u32.to_le_bytes());
        assert!(matches!(
            MeshData::from_bytes(&bytes, MeshVersionPolicy::default()),
            Err(MalformedKind::InvalidStride { index_stride: 3, .. })
        ));

        let narrow = MeshData::from_parts(1, 12, vec![0; 36], 4, vec![0; 12]);
        assert!(matches!(narrow, Err(MalformedKind::InvalidStride { vertex_stride: 12, .. })));
    }

    #[test]
    fn test_sixteen_bit_indices() {
        let indices: Vec<u8> = [0u16, 1, 2].iter().flat_map(|i| i.to_le_bytes()).collect();
        let mesh = MeshData::from_parts(1, 24, vec![0; 72], 2, indices).unwrap();
        assert_eq!(mesh.index_type(), IndexType::U16);
        assert_eq!(mesh.header.index_count, 3);
    }
}
