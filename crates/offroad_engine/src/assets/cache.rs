//! Path-keyed asset cache
//!
//! One registry per resource kind, keyed by canonical path. A second request
//! for the same file (however the path is spelled) returns the existing
//! handle without touching the decoder or compiler.
//!
//! The cache owns every device object it creates. [`AssetCache::release_all`]
//! is the only place they are deleted, so a double free cannot happen.

use std::fs;
use std::path::{Path, PathBuf};

use slotmap::{new_key_type, SlotMap};

use super::image_loader::ImageData;
use super::mesh_codec::{MeshData, MeshVersionPolicy};
use super::resources::{IndexBuffer, Mesh, ShaderProgram, Texture, VertexBuffer};
use super::shader_builder::build_program;
use super::shader_desc::ShaderDescription;
use super::{AssetError, AssetResult};
use crate::foundation::collections::PathRegistry;
use crate::gpu::{BufferKind, GraphicsDevice, TextureDesc};

new_key_type! {
    /// Handle to a cached mesh
    pub struct MeshHandle;
    /// Handle to a cached shader program
    pub struct ShaderHandle;
    /// Handle to a cached texture
    pub struct TextureHandle;
    /// Handle to a vertex buffer owned by a mesh
    pub struct VertexBufferHandle;
    /// Handle to an index buffer owned by a mesh
    pub struct IndexBufferHandle;
}

/// Load counters
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CacheStats {
    /// Requests answered from the cache
    pub hits: usize,
    /// Meshes decoded
    pub mesh_loads: usize,
    /// Shader programs built
    pub shader_loads: usize,
    /// Textures decoded
    pub texture_loads: usize,
}

/// Owner of all GPU resources loaded from asset files
pub struct AssetCache {
    meshes: PathRegistry<MeshHandle, Mesh>,
    shaders: PathRegistry<ShaderHandle, ShaderProgram>,
    textures: PathRegistry<TextureHandle, Texture>,
    vertex_buffers: SlotMap<VertexBufferHandle, VertexBuffer>,
    index_buffers: SlotMap<IndexBufferHandle, IndexBuffer>,
    mesh_version_policy: MeshVersionPolicy,
    stats: CacheStats,
}

impl AssetCache {
    /// Create an empty cache
    pub fn new(mesh_version_policy: MeshVersionPolicy) -> Self {
        Self {
            meshes: PathRegistry::new(),
            shaders: PathRegistry::new(),
            textures: PathRegistry::new(),
            vertex_buffers: SlotMap::with_key(),
            index_buffers: SlotMap::with_key(),
            mesh_version_policy,
            stats: CacheStats::default(),
        }
    }

    /// Load (or reuse) the mesh at `path`
    pub fn acquire_mesh(
        &mut self,
        device: &mut dyn GraphicsDevice,
        path: impl AsRef<Path>,
    ) -> AssetResult<MeshHandle> {
        let canonical = canonicalize(path.as_ref())?;
        if let Some(handle) = self.meshes.lookup(&canonical) {
            self.stats.hits += 1;
            return Ok(handle);
        }

        let bytes = fs::read(&canonical).map_err(|source| AssetError::NotFound {
            path: canonical.clone(),
            source,
        })?;
        let data = MeshData::from_bytes(&bytes, self.mesh_version_policy).map_err(|kind| {
            AssetError::Malformed {
                path: canonical.clone(),
                kind,
            }
        })?;
        let mesh = self.upload_mesh(device, &data)?;

        log::info!(
            "Loaded mesh {} ({} vertices, stride {})",
            canonical.display(),
            data.header.vertex_count,
            data.header.vertex_stride
        );
        self.stats.mesh_loads += 1;
        match self.meshes.insert(canonical, mesh) {
            Ok(handle) => Ok(handle),
            Err((existing, mesh)) => {
                self.release_mesh(device, mesh);
                Ok(existing)
            }
        }
    }

    /// Load (or reuse) the shader program described at `path`
    pub fn acquire_shader(
        &mut self,
        device: &mut dyn GraphicsDevice,
        path: impl AsRef<Path>,
    ) -> AssetResult<ShaderHandle> {
        let canonical = canonicalize(path.as_ref())?;
        if let Some(handle) = self.shaders.lookup(&canonical) {
            self.stats.hits += 1;
            return Ok(handle);
        }

        let text = fs::read_to_string(&canonical).map_err(|source| AssetError::NotFound {
            path: canonical.clone(),
            source,
        })?;
        let desc = ShaderDescription::parse(&text, &canonical).map_err(|kind| {
            AssetError::Malformed {
                path: canonical.clone(),
                kind,
            }
        })?;
        let program = build_program(device, &desc, &canonical)?;

        log::info!("Loaded shader {}", canonical.display());
        self.stats.shader_loads += 1;
        match self.shaders.insert(canonical, program) {
            Ok(handle) => Ok(handle),
            Err((existing, program)) => {
                release_program(device, program);
                Ok(existing)
            }
        }
    }

    /// Load (or reuse) the texture image at `path`
    pub fn acquire_texture(
        &mut self,
        device: &mut dyn GraphicsDevice,
        path: impl AsRef<Path>,
    ) -> AssetResult<TextureHandle> {
        let canonical = canonicalize(path.as_ref())?;
        if let Some(handle) = self.textures.lookup(&canonical) {
            self.stats.hits += 1;
            return Ok(handle);
        }

        let image = ImageData::from_file(&canonical)?;
        let id = device.create_texture(&TextureDesc::image(image.width, image.height), Some(&image.data))?;
        let texture = Texture {
            id,
            width: image.width,
            height: image.height,
        };

        log::info!(
            "Loaded texture {} ({}x{})",
            canonical.display(),
            image.width,
            image.height
        );
        self.stats.texture_loads += 1;
        match self.textures.insert(canonical, texture) {
            Ok(handle) => Ok(handle),
            Err((existing, texture)) => {
                device.delete_texture(texture.id);
                Ok(existing)
            }
        }
    }

    /// Cached mesh
    pub fn mesh(&self, handle: MeshHandle) -> Option<&Mesh> {
        self.meshes.get(handle)
    }

    /// Cached shader program
    pub fn shader(&self, handle: ShaderHandle) -> Option<&ShaderProgram> {
        self.shaders.get(handle)
    }

    /// Cached texture
    pub fn texture(&self, handle: TextureHandle) -> Option<&Texture> {
        self.textures.get(handle)
    }

    /// Vertex buffer referenced by a mesh
    pub fn vertex_buffer(&self, handle: VertexBufferHandle) -> Option<&VertexBuffer> {
        self.vertex_buffers.get(handle)
    }

    /// Index buffer referenced by a mesh
    pub fn index_buffer(&self, handle: IndexBufferHandle) -> Option<&IndexBuffer> {
        self.index_buffers.get(handle)
    }

    /// Load counters
    pub fn stats(&self) -> CacheStats {
        self.stats
    }

    /// Number of cached meshes, shaders and textures
    pub fn resource_count(&self) -> usize {
        self.meshes.len() + self.shaders.len() + self.textures.len()
    }

    /// Delete every device object the cache owns.
    ///
    /// Order: programs and their stages, textures, index and vertex buffers,
    /// then the mesh layout bindings. Handles issued before this call become
    /// dangling and resolve to `None`.
    pub fn release_all(&mut self, device: &mut dyn GraphicsDevice) {
        let (meshes, shaders, textures) = (self.meshes.len(), self.shaders.len(), self.textures.len());

        for program in self.shaders.drain() {
            release_program(device, program);
        }
        for texture in self.textures.drain() {
            device.delete_texture(texture.id);
        }
        for (_, buffer) in self.index_buffers.drain() {
            device.delete_buffer(buffer.id);
        }
        for (_, buffer) in self.vertex_buffers.drain() {
            device.delete_buffer(buffer.id);
        }
        for mesh in self.meshes.drain() {
            device.delete_vertex_layout(mesh.layout);
        }

        log::debug!(
            "Released {} meshes, {} shaders, {} textures",
            meshes,
            shaders,
            textures
        );
    }

    fn upload_mesh(&mut self, device: &mut dyn GraphicsDevice, data: &MeshData) -> AssetResult<Mesh> {
        let vertex_id = device.create_buffer(BufferKind::Vertex, &data.vertices)?;
        let index_id = match device.create_buffer(BufferKind::Index, &data.indices) {
            Ok(id) => id,
            Err(e) => {
                device.delete_buffer(vertex_id);
                return Err(e.into());
            }
        };
        let layout = match device.create_vertex_layout(
            vertex_id,
            index_id,
            data.header.vertex_stride,
            &data.vertex_layout(),
        ) {
            Ok(layout) => layout,
            Err(e) => {
                device.delete_buffer(index_id);
                device.delete_buffer(vertex_id);
                return Err(e.into());
            }
        };

        let index_type = data.index_type();
        let vertex_buffer = self.vertex_buffers.insert(VertexBuffer {
            id: vertex_id,
            size: data.vertices.len(),
        });
        let index_buffer = self.index_buffers.insert(IndexBuffer {
            id: index_id,
            size: data.indices.len(),
            index_type,
        });

        Ok(Mesh {
            vertex_buffer,
            index_buffer,
            layout,
            header: data.header,
            index_type,
            bounds: data.bounds,
        })
    }

    fn release_mesh(&mut self, device: &mut dyn GraphicsDevice, mesh: Mesh) {
        if let Some(buffer) = self.index_buffers.remove(mesh.index_buffer) {
            device.delete_buffer(buffer.id);
        }
        if let Some(buffer) = self.vertex_buffers.remove(mesh.vertex_buffer) {
            device.delete_buffer(buffer.id);
        }
        device.delete_vertex_layout(mesh.layout);
    }
}

impl Drop for AssetCache {
    fn drop(&mut self) {
        let leaked = self.resource_count() + self.vertex_buffers.len() + self.index_buffers.len();
        if leaked > 0 {
            log::warn!("AssetCache dropped with {} live resources; call release_all first", leaked);
        }
    }
}

fn release_program(device: &mut dyn GraphicsDevice, program: ShaderProgram) {
    device.delete_program(program.program);
    device.delete_shader_stage(program.vertex);
    device.delete_shader_stage(program.fragment);
}

fn canonicalize(path: &Path) -> AssetResult<PathBuf> {
    fs::canonicalize(path).map_err(|source| AssetError::NotFound {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assets::test_fixtures::*;
    use crate::assets::MalformedKind;
    use crate::gpu::{DeviceCommand, RecordingDevice};

    fn cache() -> AssetCache {
        AssetCache::new(MeshVersionPolicy::default())
    }

    #[test]
    fn test_shader_acquire_is_idempotent_across_spellings() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("sub")).unwrap();
        let path = write_shader(dir.path(), "plain.xml");
        let mut device = RecordingDevice::new();
        let mut cache = cache();

        let first = cache.acquire_shader(&mut device, &path).unwrap();
        let second = cache.acquire_shader(&mut device, dir.path().join("sub/../plain.xml")).unwrap();
        let third = cache.acquire_shader(&mut device, dir.path().join("./plain.xml")).unwrap();

        assert_eq!(first, second);
        assert_eq!(first, third);
        assert_eq!(device.compile_count(), 2);
        assert_eq!(cache.stats().shader_loads, 1);
        assert_eq!(cache.stats().hits, 2);
        cache.release_all(&mut device);
    }

    #[test]
    fn test_shader_with_malformed_attribute_still_links() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("lit.xml");
        let xml = format!(
            "<shaders>\n  <shader type=\"vertex\"><![CDATA[{}]]></shader>\n  <shader type=\"fragment\"><![CDATA[{}]]></shader>\n  <attribute unit=\"0\" name=\"position\"/>\n  <attribute unit=\"1\"/>\n</shaders>\n",
            PASSTHROUGH_VERTEX, PASSTHROUGH_FRAGMENT
        );
        std::fs::write(&path, xml).unwrap();
        let mut device = RecordingDevice::new();
        let mut cache = cache();

        let handle = cache.acquire_shader(&mut device, &path).unwrap();

        let program = cache.shader(handle).unwrap();
        assert_eq!(program.attribute_bindings().len(), 1);
        assert_eq!(device.link_count(), 1);
        let binds: Vec<_> = device
            .commands()
            .iter()
            .filter_map(|c| match c {
                DeviceCommand::BindAttributeLocation(p, unit, name) => Some((*p, *unit, name.as_str())),
                _ => None,
            })
            .collect();
        assert_eq!(binds, vec![(program.program(), 0, "position")]);
        cache.release_all(&mut device);
        assert_eq!(device.live_object_count(), 0);
    }

    #[test]
    fn test_mesh_acquire_uploads_once() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_mesh(dir.path(), "quad.mesh", 40);
        let mut device = RecordingDevice::new();
        let mut cache = cache();

        let a = cache.acquire_mesh(&mut device, &path).unwrap();
        let b = cache.acquire_mesh(&mut device, &path).unwrap();
        assert_eq!(a, b);

        let creates = device
            .commands()
            .iter()
            .filter(|c| matches!(c, DeviceCommand::CreateBuffer(..)))
            .count();
        assert_eq!(creates, 2);

        let mesh = cache.mesh(a).unwrap();
        assert_eq!(mesh.index_count(), 6);
        assert_eq!(mesh.vertex_stride(), 40);
        assert_eq!(cache.vertex_buffer(mesh.vertex_buffer()).unwrap().size(), 160);
        assert!(device.commands().iter().any(|c| matches!(
            c,
            DeviceCommand::CreateVertexLayout(_, 40, attrs) if attrs.len() == 4
        )));
        cache.release_all(&mut device);
    }

    #[test]
    fn test_missing_file_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let mut device = RecordingDevice::new();
        let mut cache = cache();
        let err = cache.acquire_texture(&mut device, dir.path().join("nope.png")).unwrap_err();
        assert!(matches!(err, AssetError::NotFound { .. }));
    }

    #[test]
    fn test_truncated_mesh_is_malformed_and_uploads_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cut.mesh");
        let bytes = quad_mesh(32).encode();
        std::fs::write(&path, &bytes[..bytes.len() - 4]).unwrap();

        let mut device = RecordingDevice::new();
        let mut cache = cache();
        let err = cache.acquire_mesh(&mut device, &path).unwrap_err();
        assert!(matches!(
            err,
            AssetError::Malformed { kind: MalformedKind::TruncatedAsset { .. }, .. }
        ));
        assert_eq!(device.live_object_count(), 0);
    }

    #[test]
    fn test_texture_upload_uses_mipmaps() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_png(dir.path(), "dirt.png");
        let mut device = RecordingDevice::new();
        let mut cache = cache();

        let handle = cache.acquire_texture(&mut device, &path).unwrap();
        let texture = cache.texture(handle).unwrap();
        assert_eq!((texture.width(), texture.height()), (2, 2));
        assert!(device.commands().iter().any(|c| matches!(
            c,
            DeviceCommand::CreateTexture(_, desc) if desc.generate_mipmaps
        )));
        cache.release_all(&mut device);
    }

    #[test]
    fn test_release_all_frees_everything_once() {
        let dir = tempfile::tempdir().unwrap();
        let mut device = RecordingDevice::new();
        let mut cache = cache();
        let shader = cache.acquire_shader(&mut device, write_shader(dir.path(), "s.xml")).unwrap();
        cache.acquire_mesh(&mut device, write_mesh(dir.path(), "m.mesh", 24)).unwrap();
        cache.acquire_texture(&mut device, write_png(dir.path(), "t.png")).unwrap();
        assert!(device.live_object_count() > 0);

        device.clear_commands();
        cache.release_all(&mut device);

        assert_eq!(device.live_object_count(), 0);
        assert_eq!(device.invalid_deletes(), 0);
        assert!(cache.shader(shader).is_none());

        // programs go first, layouts last
        let commands = device.commands();
        assert!(matches!(commands.first(), Some(DeviceCommand::DeleteProgram(_))));
        assert!(matches!(commands.last(), Some(DeviceCommand::DeleteVertexLayout(_))));

        cache.release_all(&mut device);
        assert_eq!(device.invalid_deletes(), 0);
    }

    #[test]
    fn test_failed_shader_is_not_cached() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_shader_with(dir.path(), "bad.xml", "BROKEN", PASSTHROUGH_FRAGMENT);
        let mut device = RecordingDevice::new();
        device.fail_compile_on("BROKEN");
        let mut cache = cache();

        assert!(cache.acquire_shader(&mut device, &path).is_err());
        assert!(cache.acquire_shader(&mut device, &path).is_err());
        assert_eq!(cache.resource_count(), 0);
        assert_eq!(device.compile_count(), 2);
    }
}
