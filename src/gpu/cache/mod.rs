//! Owning façade over a [`Device`].
//!
//! The cache is the sanctioned path for acquiring backend resources. Every
//! handle it creates is recorded, composite records store the child handles
//! they own, and dropping the cache tears everything down.

pub mod model;

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

use glam::Mat4;

use crate::gpu::cmd::FilteringCommandList;
use crate::gpu::device::Device;
use crate::gpu::driver::command::DrawIndexed;
use crate::gpu::driver::types::{
    Buffer, Effect, Handle, IndexType, Pipeline, PrimitiveType, Sampler, Texture, VertexLayout,
};
use crate::gpu::error::{GpuError, Result};
use crate::gpu::structs::{
    BufferInfo, BufferUsage, EffectInfo, Format, MaterialColors, PipelineInfo, SamplerInfo,
    TextureInfo, TextureKind, TransformSlot,
};
use crate::utils::HandlePool;

use model::ModelManifest;

/// Vertex and index buffers drawn together.
#[derive(Debug, Clone, Copy)]
pub struct Mesh;

/// Pipeline, sampler and texture with per-draw colors.
#[derive(Debug, Clone, Copy)]
pub struct Material;

/// Submeshes paired with their materials.
#[derive(Debug, Clone, Copy)]
pub struct Model;

/// Ownership edge from a composite record to a resource it must destroy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceRef {
    Buffer(Handle<Buffer>),
    Pipeline(Handle<Pipeline>),
    Sampler(Handle<Sampler>),
    Texture(Handle<Texture>),
    Effect(Handle<Effect>),
    Mesh(Handle<Mesh>),
    Material(Handle<Material>),
}

#[derive(Debug, Clone)]
pub struct MeshData {
    pub vertex_buffer: Handle<Buffer>,
    pub layout: VertexLayout,
    pub first_vertex: u32,
    pub vertex_count: u32,
    pub index_buffer: Option<Handle<Buffer>>,
    pub first_index: u32,
    pub index_count: u32,
    pub primitive: PrimitiveType,
    pub owned: Vec<ResourceRef>,
}

#[derive(Debug, Clone)]
pub struct MaterialData {
    pub pipeline: Handle<Pipeline>,
    pub sampler: Handle<Sampler>,
    /// Referenced, not owned.
    pub texture: Option<Handle<Texture>>,
    pub colors: MaterialColors,
    pub owned: Vec<ResourceRef>,
}

#[derive(Debug, Clone)]
pub struct ModelData {
    pub submeshes: Vec<(Handle<Mesh>, Handle<Material>)>,
    pub owned: Vec<ResourceRef>,
}

#[derive(Debug, Clone, Copy)]
pub enum IndexData<'a> {
    U16(&'a [u16]),
    U32(&'a [u32]),
}

impl IndexData<'_> {
    pub fn index_type(&self) -> IndexType {
        match self {
            IndexData::U16(_) => IndexType::U16,
            IndexData::U32(_) => IndexType::U32,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            IndexData::U16(i) => i.len(),
            IndexData::U32(i) => i.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn as_bytes(&self) -> &[u8] {
        match self {
            IndexData::U16(i) => bytemuck::cast_slice(i),
            IndexData::U32(i) => bytemuck::cast_slice(i),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct MeshInfo<'a> {
    pub debug_name: &'a str,
    pub layout: VertexLayout,
    pub primitive: PrimitiveType,
    /// Interleaved vertices matching `layout`.
    pub vertices: &'a [u8],
    pub indices: Option<IndexData<'a>>,
}

impl Default for MeshInfo<'_> {
    fn default() -> Self {
        Self {
            debug_name: "",
            layout: VertexLayout::POSITION,
            primitive: PrimitiveType::TriangleList,
            vertices: &[],
            indices: None,
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct MaterialInfo<'a> {
    pub debug_name: &'a str,
    pub pipeline: PipelineInfo<'a>,
    pub sampler: SamplerInfo,
    pub texture: Option<Handle<Texture>>,
    pub colors: MaterialColors,
}

/// One object to draw: where, what, and how it looks.
#[derive(Debug, Clone, Copy)]
pub struct Drawable {
    pub world: Mat4,
    pub mesh: Handle<Mesh>,
    pub material: Handle<Material>,
}

/// Live resource counts, primitives and composites.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub buffers: usize,
    pub pipelines: usize,
    pub samplers: usize,
    pub textures: usize,
    pub effects: usize,
    pub meshes: usize,
    pub materials: usize,
    pub models: usize,
}

pub struct ResourceCache<D: Device> {
    device: D,
    buffers: HashSet<Handle<Buffer>>,
    pipelines: HashSet<Handle<Pipeline>>,
    samplers: HashSet<Handle<Sampler>>,
    textures: HashSet<Handle<Texture>>,
    effects: HashSet<Handle<Effect>>,
    meshes: HandlePool<MeshData, Mesh>,
    materials: HandlePool<MaterialData, Material>,
    models: HandlePool<ModelData, Model>,
}

impl<D: Device> ResourceCache<D> {
    pub fn new(device: D) -> Self {
        Self {
            device,
            buffers: HashSet::new(),
            pipelines: HashSet::new(),
            samplers: HashSet::new(),
            textures: HashSet::new(),
            effects: HashSet::new(),
            meshes: HandlePool::new(),
            materials: HandlePool::new(),
            models: HandlePool::new(),
        }
    }

    pub fn device(&self) -> &D {
        &self.device
    }

    pub fn device_mut(&mut self) -> &mut D {
        &mut self.device
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            buffers: self.buffers.len(),
            pipelines: self.pipelines.len(),
            samplers: self.samplers.len(),
            textures: self.textures.len(),
            effects: self.effects.len(),
            meshes: self.meshes.len(),
            materials: self.materials.len(),
            models: self.models.len(),
        }
    }

    pub fn mesh(&self, handle: Handle<Mesh>) -> Option<&MeshData> {
        self.meshes.get_ref(handle)
    }

    pub fn material(&self, handle: Handle<Material>) -> Option<&MaterialData> {
        self.materials.get_ref(handle)
    }

    pub fn model(&self, handle: Handle<Model>) -> Option<&ModelData> {
        self.models.get_ref(handle)
    }

    //===------------------------------------------------------------------===//
    // Primitive resources
    //===------------------------------------------------------------------===//

    pub fn create_pipeline(&mut self, info: &PipelineInfo) -> Result<Handle<Pipeline>> {
        let handle = self.device.create_pipeline(info)?;
        tracing::debug!("created pipeline '{}' {:?}", info.debug_name, handle);
        self.pipelines.insert(handle);
        Ok(handle)
    }

    pub fn destroy_pipeline(&mut self, handle: Handle<Pipeline>) {
        if self.pipelines.remove(&handle) {
            tracing::debug!("destroying {:?}", handle);
            self.device.destroy_pipeline(handle);
        }
    }

    pub fn create_sampler(&mut self, info: &SamplerInfo) -> Result<Handle<Sampler>> {
        let handle = self.device.create_sampler(info)?;
        tracing::debug!("created sampler {:?}", handle);
        self.samplers.insert(handle);
        Ok(handle)
    }

    pub fn destroy_sampler(&mut self, handle: Handle<Sampler>) {
        if self.samplers.remove(&handle) {
            tracing::debug!("destroying {:?}", handle);
            self.device.destroy_sampler(handle);
        }
    }

    fn create_buffer(&mut self, info: &BufferInfo, initial: Option<&[u8]>) -> Result<Handle<Buffer>> {
        let handle = self.device.create_buffer(info)?;
        if let Some(bytes) = initial {
            if let Err(err) = self.seed_buffer(handle, bytes) {
                self.device.destroy_buffer(handle);
                return Err(err);
            }
        }
        tracing::debug!(
            "created buffer '{}' {:?} ({} bytes)",
            info.debug_name,
            handle,
            info.byte_size
        );
        self.buffers.insert(handle);
        Ok(handle)
    }

    /// Copies `bytes` into the buffer, truncated or zero-padded to its size.
    fn seed_buffer(&mut self, handle: Handle<Buffer>, bytes: &[u8]) -> Result<()> {
        let mapped = self.device.map_buffer(handle)?;
        let n = bytes.len().min(mapped.len());
        if bytes.len() > mapped.len() {
            tracing::warn!(
                "truncating {} initial bytes to buffer size {}",
                bytes.len(),
                mapped.len()
            );
        }
        mapped[..n].copy_from_slice(&bytes[..n]);
        mapped[n..].fill(0);
        self.device.unmap_buffer(handle)
    }

    pub fn create_vertex_buffer(
        &mut self,
        debug_name: &str,
        layout: VertexLayout,
        byte_size: u32,
        initial: Option<&[u8]>,
    ) -> Result<Handle<Buffer>> {
        self.create_buffer(
            &BufferInfo {
                debug_name,
                byte_size,
                usage: BufferUsage::Vertex(layout),
            },
            initial,
        )
    }

    pub fn create_index_buffer(
        &mut self,
        debug_name: &str,
        index_type: IndexType,
        byte_size: u32,
        initial: Option<&[u8]>,
    ) -> Result<Handle<Buffer>> {
        if !self.device.caps().supports_index_type(index_type) {
            return Err(GpuError::Unsupported(format!("{:?} indices", index_type)));
        }
        self.create_buffer(
            &BufferInfo {
                debug_name,
                byte_size,
                usage: BufferUsage::Index(index_type),
            },
            initial,
        )
    }

    pub fn destroy_buffer(&mut self, handle: Handle<Buffer>) {
        if self.buffers.remove(&handle) {
            tracing::debug!("destroying {:?}", handle);
            self.device.destroy_buffer(handle);
        }
    }

    fn create_texture(&mut self, info: &TextureInfo, texels: &[u8]) -> Result<Handle<Texture>> {
        let handle = self.device.create_texture(info, Some(texels))?;
        tracing::debug!(
            "created {:?} texture '{}' {:?} {:?}",
            info.kind,
            info.debug_name,
            info.dim,
            handle
        );
        self.textures.insert(handle);
        Ok(handle)
    }

    /// Creates a 2D texture from tightly packed RGBA8 texels.
    pub fn create_texture_2d(
        &mut self,
        debug_name: &str,
        width: u32,
        height: u32,
        rgba: &[u8],
    ) -> Result<Handle<Texture>> {
        self.create_texture(
            &TextureInfo {
                debug_name,
                kind: TextureKind::D2,
                dim: [width, height, 1],
                format: Format::RGBA8,
                mip_levels: 1,
            },
            rgba,
        )
    }

    pub fn load_texture_2d(&mut self, path: impl AsRef<Path>) -> Result<Handle<Texture>> {
        let path = path.as_ref();
        let image = image::open(path)?.to_rgba8();
        let (width, height) = image.dimensions();
        let name = path.to_string_lossy();
        self.create_texture_2d(&name, width, height, image.as_raw())
    }

    /// Loads six square faces in +X, -X, +Y, -Y, +Z, -Z order.
    pub fn load_texture_cube<P: AsRef<Path>>(&mut self, faces: &[P; 6]) -> Result<Handle<Texture>> {
        let (size, texels) = load_layers(faces)?;
        if size.0 != size.1 {
            return Err(GpuError::InvalidInfo(format!(
                "cube faces must be square, got {}x{}",
                size.0, size.1
            )));
        }
        let name = faces[0].as_ref().to_string_lossy();
        self.create_texture(
            &TextureInfo {
                debug_name: &name,
                kind: TextureKind::Cube,
                dim: [size.0, size.1, 6],
                format: Format::RGBA8,
                mip_levels: 1,
            },
            &texels,
        )
    }

    /// Loads a volume texture, one image per depth slice.
    pub fn load_texture_3d<P: AsRef<Path>>(&mut self, slices: &[P]) -> Result<Handle<Texture>> {
        let (size, texels) = load_layers(slices)?;
        let name = slices[0].as_ref().to_string_lossy();
        self.create_texture(
            &TextureInfo {
                debug_name: &name,
                kind: TextureKind::D3,
                dim: [size.0, size.1, slices.len() as u32],
                format: Format::RGBA8,
                mip_levels: 1,
            },
            &texels,
        )
    }

    pub fn destroy_texture(&mut self, handle: Handle<Texture>) {
        if self.textures.remove(&handle) {
            tracing::debug!("destroying {:?}", handle);
            self.device.destroy_texture(handle);
        }
    }

    pub fn compile_effect(&mut self, path: impl AsRef<Path>) -> Result<Handle<Effect>> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path)?;
        let name = path.to_string_lossy();
        let handle = self.device.create_effect(&EffectInfo {
            debug_name: &name,
            source: &source,
        })?;
        tracing::debug!("compiled effect '{}' {:?}", name, handle);
        self.effects.insert(handle);
        Ok(handle)
    }

    pub fn destroy_effect(&mut self, handle: Handle<Effect>) {
        if self.effects.remove(&handle) {
            tracing::debug!("destroying {:?}", handle);
            self.device.destroy_effect(handle);
        }
    }

    //===------------------------------------------------------------------===//
    // Composite resources
    //===------------------------------------------------------------------===//

    pub fn create_mesh(&mut self, info: &MeshInfo) -> Result<Handle<Mesh>> {
        let stride = info.layout.stride() as usize;
        if stride == 0 || info.vertices.is_empty() || info.vertices.len() % stride != 0 {
            return Err(GpuError::InvalidInfo(format!(
                "mesh '{}' has {} vertex bytes for stride {}",
                info.debug_name,
                info.vertices.len(),
                stride
            )));
        }
        let vertex_count = (info.vertices.len() / stride) as u32;
        let indices = info.indices.filter(|i| !i.is_empty());
        if info.primitive == PrimitiveType::PointList && indices.is_some() {
            return Err(GpuError::InvalidInfo(format!(
                "mesh '{}' indexes a point list",
                info.debug_name
            )));
        }

        let vertex_buffer = self.create_vertex_buffer(
            info.debug_name,
            info.layout,
            info.vertices.len() as u32,
            Some(info.vertices),
        )?;
        let mut owned = vec![ResourceRef::Buffer(vertex_buffer)];

        let mut index_buffer = None;
        let mut index_count = 0;
        if let Some(indices) = indices {
            let bytes = indices.as_bytes();
            match self.create_index_buffer(
                info.debug_name,
                indices.index_type(),
                bytes.len() as u32,
                Some(bytes),
            ) {
                Ok(handle) => {
                    owned.push(ResourceRef::Buffer(handle));
                    index_buffer = Some(handle);
                    index_count = indices.len() as u32;
                }
                Err(err) => {
                    self.destroy_buffer(vertex_buffer);
                    return Err(err);
                }
            }
        }

        let handle = self.meshes.allocate(MeshData {
            vertex_buffer,
            layout: info.layout,
            first_vertex: 0,
            vertex_count,
            index_buffer,
            first_index: 0,
            index_count,
            primitive: info.primitive,
            owned,
        });
        tracing::debug!(
            "created mesh '{}' {:?} ({} vertices, {} indices)",
            info.debug_name,
            handle,
            vertex_count,
            index_count
        );
        Ok(handle)
    }

    /// Destroys the mesh and the buffers it owns.
    pub fn destroy_mesh(&mut self, handle: Handle<Mesh>) {
        if let Some(mesh) = self.meshes.deallocate(handle) {
            tracing::debug!("destroying {:?}", handle);
            self.destroy_owned(mesh.owned);
        }
    }

    pub fn create_material(&mut self, info: &MaterialInfo) -> Result<Handle<Material>> {
        if let Some(texture) = info.texture {
            if !self.textures.contains(&texture) {
                return Err(GpuError::InvalidHandle(format!(
                    "material '{}' references {:?}",
                    info.debug_name, texture
                )));
            }
        }

        let pipeline = self.create_pipeline(&PipelineInfo {
            debug_name: info.debug_name,
            ..info.pipeline
        })?;
        let sampler = match self.create_sampler(&info.sampler) {
            Ok(sampler) => sampler,
            Err(err) => {
                self.destroy_pipeline(pipeline);
                return Err(err);
            }
        };

        let handle = self.materials.allocate(MaterialData {
            pipeline,
            sampler,
            texture: info.texture,
            colors: info.colors,
            owned: vec![ResourceRef::Pipeline(pipeline), ResourceRef::Sampler(sampler)],
        });
        tracing::debug!("created material '{}' {:?}", info.debug_name, handle);
        Ok(handle)
    }

    /// Destroys the material's pipeline and sampler. A referenced texture is
    /// left alone so other materials can keep sharing it.
    pub fn destroy_material(&mut self, handle: Handle<Material>) {
        if let Some(material) = self.materials.deallocate(handle) {
            tracing::debug!("destroying {:?}", handle);
            self.destroy_owned(material.owned);
        }
    }

    /// Loads a model manifest.
    ///
    /// `overrides[i]`, when present, is used as the material of submesh `i`
    /// and stays owned by the caller. Every other submesh gets a material
    /// synthesized from its embedded colors and texture file; the model owns
    /// those materials and their textures.
    pub fn load_model(
        &mut self,
        path: impl AsRef<Path>,
        overrides: &[Option<Handle<Material>>],
    ) -> Result<Handle<Model>> {
        let path = path.as_ref();
        if let Some(stale) = overrides
            .iter()
            .flatten()
            .find(|m| !self.materials.is_valid(**m))
        {
            return Err(GpuError::InvalidHandle(format!(
                "model {} overrides with {:?}",
                path.display(),
                stale
            )));
        }
        let manifest = ModelManifest::load(path)?;

        let mut owned = Vec::new();
        match self.build_model(path, &manifest, overrides, &mut owned) {
            Ok(submeshes) => {
                let handle = self.models.allocate(ModelData { submeshes, owned });
                tracing::debug!(
                    "loaded model {} {:?} ({} submeshes)",
                    path.display(),
                    handle,
                    manifest.submeshes.len()
                );
                Ok(handle)
            }
            Err(err) => {
                tracing::warn!("failed to load model {}: {}", path.display(), err);
                self.destroy_owned(owned);
                Err(err)
            }
        }
    }

    fn build_model(
        &mut self,
        path: &Path,
        manifest: &ModelManifest,
        overrides: &[Option<Handle<Material>>],
        owned: &mut Vec<ResourceRef>,
    ) -> Result<Vec<(Handle<Mesh>, Handle<Material>)>> {
        let mut textures: HashMap<PathBuf, Handle<Texture>> = HashMap::new();
        let mut submeshes = Vec::with_capacity(manifest.submeshes.len());

        for (i, sub) in manifest.submeshes.iter().enumerate() {
            let label = sub.label(i);
            let geometry = sub.geometry(path, self.device.caps())?;
            let mesh = self.create_mesh(&MeshInfo {
                debug_name: &label,
                layout: geometry.layout,
                primitive: geometry.primitive,
                vertices: &geometry.vertices,
                indices: geometry.indices.as_ref().map(|i| i.as_index_data()),
            })?;
            owned.push(ResourceRef::Mesh(mesh));

            let material = match overrides.get(i).copied().flatten() {
                Some(material) => material,
                None => {
                    let texture = match sub.material.texture_path(path) {
                        Some(tex_path) => match textures.get(&tex_path) {
                            Some(t) => Some(*t),
                            None => {
                                let t = self.load_texture_2d(&tex_path)?;
                                owned.push(ResourceRef::Texture(t));
                                textures.insert(tex_path, t);
                                Some(t)
                            }
                        },
                        None => None,
                    };
                    let colors = sub.material.colors();
                    let material = self.create_material(&MaterialInfo {
                        debug_name: &label,
                        pipeline: PipelineInfo {
                            primitive: geometry.primitive,
                            vertex_layout: geometry.layout,
                            lighting: geometry.layout.contains(VertexLayout::NORMAL),
                            specular: colors.power > 0.0,
                            ..Default::default()
                        },
                        sampler: SamplerInfo::default(),
                        texture,
                        colors,
                    })?;
                    owned.push(ResourceRef::Material(material));
                    material
                }
            };
            submeshes.push((mesh, material));
        }
        Ok(submeshes)
    }

    /// Destroys the model's meshes, synthesized materials and textures.
    pub fn destroy_model(&mut self, handle: Handle<Model>) {
        if let Some(model) = self.models.deallocate(handle) {
            tracing::debug!("destroying {:?}", handle);
            self.destroy_owned(model.owned);
        }
    }

    /// Composites are released before what they own, so a resource shared
    /// between owners is destroyed once, by whichever edge reaches it first.
    fn destroy_owned(&mut self, owned: Vec<ResourceRef>) {
        let (composites, primitives): (Vec<_>, Vec<_>) = owned
            .into_iter()
            .partition(|r| matches!(r, ResourceRef::Mesh(_) | ResourceRef::Material(_)));
        for r in composites.into_iter().chain(primitives) {
            self.destroy_ref(r);
        }
    }

    fn destroy_ref(&mut self, r: ResourceRef) {
        match r {
            ResourceRef::Buffer(h) => self.destroy_buffer(h),
            ResourceRef::Pipeline(h) => self.destroy_pipeline(h),
            ResourceRef::Sampler(h) => self.destroy_sampler(h),
            ResourceRef::Texture(h) => self.destroy_texture(h),
            ResourceRef::Effect(h) => self.destroy_effect(h),
            ResourceRef::Mesh(h) => self.destroy_mesh(h),
            ResourceRef::Material(h) => self.destroy_material(h),
        }
    }

    /// Tears down every resource this cache created: models, then meshes and
    /// materials, then the primitives nothing owned.
    pub fn destroy_all(&mut self) {
        let before = self.stats();
        let models: Vec<_> = self.models.handles().collect();
        for h in models {
            self.destroy_model(h);
        }
        let meshes: Vec<_> = self.meshes.handles().collect();
        for h in meshes {
            self.destroy_mesh(h);
        }
        let materials: Vec<_> = self.materials.handles().collect();
        for h in materials {
            self.destroy_material(h);
        }

        for h in std::mem::take(&mut self.buffers) {
            self.device.destroy_buffer(h);
        }
        for h in std::mem::take(&mut self.pipelines) {
            self.device.destroy_pipeline(h);
        }
        for h in std::mem::take(&mut self.samplers) {
            self.device.destroy_sampler(h);
        }
        for h in std::mem::take(&mut self.textures) {
            self.device.destroy_texture(h);
        }
        for h in std::mem::take(&mut self.effects) {
            self.device.destroy_effect(h);
        }
        tracing::debug!("destroyed all cached resources: {:?}", before);
    }

    //===------------------------------------------------------------------===//
    // Recording
    //===------------------------------------------------------------------===//

    /// Records state and the draw call for one drawable.
    pub fn record_draw(&self, list: &mut FilteringCommandList, drawable: &Drawable) -> Result<()> {
        let mesh = self
            .meshes
            .get_ref(drawable.mesh)
            .ok_or_else(|| GpuError::InvalidHandle(format!("{:?}", drawable.mesh)))?;
        let material = self
            .materials
            .get_ref(drawable.material)
            .ok_or_else(|| GpuError::InvalidHandle(format!("{:?}", drawable.material)))?;

        list.bind_pipeline(material.pipeline);
        list.set_material(material.colors);
        list.bind_sampler(0, material.sampler);
        list.bind_texture(0, material.texture.unwrap_or_default());
        list.set_transform(TransformSlot::World, drawable.world);
        list.bind_vertex_buffer(mesh.vertex_buffer, 0);

        match mesh.index_buffer {
            Some(indices) => {
                list.bind_index_buffer(indices);
                list.draw_indexed(DrawIndexed {
                    vertex_offset: mesh.first_vertex as i32,
                    min_index: 0,
                    num_vertices: mesh.vertex_count,
                    first_index: mesh.first_index,
                    index_count: mesh.index_count,
                });
            }
            None => list.draw(mesh.first_vertex, mesh.vertex_count),
        }
        Ok(())
    }

    /// Records every submesh of `model` with the same world transform.
    pub fn record_model(
        &self,
        list: &mut FilteringCommandList,
        world: Mat4,
        model: Handle<Model>,
    ) -> Result<()> {
        let data = self
            .models
            .get_ref(model)
            .ok_or_else(|| GpuError::InvalidHandle(format!("{:?}", model)))?;
        for (mesh, material) in &data.submeshes {
            self.record_draw(
                list,
                &Drawable {
                    world,
                    mesh: *mesh,
                    material: *material,
                },
            )?;
        }
        Ok(())
    }
}

impl<D: Device> Drop for ResourceCache<D> {
    fn drop(&mut self) {
        self.destroy_all();
    }
}

/// Decodes equally sized images into one RGBA8 byte run.
fn load_layers<P: AsRef<Path>>(paths: &[P]) -> Result<((u32, u32), Vec<u8>)> {
    let first = paths
        .first()
        .ok_or_else(|| GpuError::InvalidInfo("no texture layers given".into()))?;
    let first = image::open(first.as_ref())?.to_rgba8();
    let size = first.dimensions();
    let mut texels = first.into_raw();

    for path in &paths[1..] {
        let path = path.as_ref();
        let layer = image::open(path)?.to_rgba8();
        if layer.dimensions() != size {
            return Err(GpuError::InvalidInfo(format!(
                "{} is {:?}, expected {:?}",
                path.display(),
                layer.dimensions(),
                size
            )));
        }
        texels.extend_from_slice(layer.as_raw());
    }
    Ok((size, texels))
}
