//! Contract checks between callers and a real device.
//!
//! [`ValidatingDevice`] hands out its own handles, keeps a one-to-one map to
//! the wrapped device's handles and checks every submitted command before
//! translating it. A violated contract is a programming error: it is logged
//! and then panics with the name of the failed check.

use std::collections::HashMap;

use glam::Mat4;

use super::device::{Device, DeviceStatus};
use super::driver::command::{
    BindIndexBuffer, BindPipeline, BindSampler, BindTexture, BindVertexBuffer, ClearAttachments,
    Command, CommandList, CommandSink, Draw, DrawIndexed, ExtensionCommand, SetAmbientLight,
    SetLights, SetTextureStageState, SetTransform,
};
use super::driver::types::{
    Buffer, Effect, Handle, Pipeline, PrimitiveType, Sampler, Texture,
};
use super::error::Result;
use super::structs::{
    BufferInfo, BufferUsage, DeviceCaps, EffectInfo, FogParameters, MaterialColors, PipelineInfo,
    SamplerInfo, TextureInfo, TextureKind, TransformSlot,
};
use crate::utils::HandlePool;

#[track_caller]
fn violation(check: &'static str, detail: String) -> ! {
    tracing::error!(check, "validation failed: {}", detail);
    panic!("validation failed [{}]: {}", check, detail);
}

struct Remapped<K, M> {
    native: Handle<K>,
    meta: M,
}

/// Our handles on one side, the wrapped device's on the other.
struct Remap<K, M> {
    pool: HandlePool<Remapped<K, M>, K>,
    reverse: HashMap<Handle<K>, Handle<K>>,
}

impl<K, M> Default for Remap<K, M> {
    fn default() -> Self {
        Self {
            pool: HandlePool::new(),
            reverse: HashMap::new(),
        }
    }
}

impl<K, M> Remap<K, M> {
    fn insert(&mut self, native: Handle<K>, meta: M) -> Handle<K> {
        if self.reverse.contains_key(&native) {
            violation(
                "native_handle_reused",
                format!("device returned live handle {:?} again", native),
            );
        }
        let ours = self.pool.allocate(Remapped { native, meta });
        self.reverse.insert(native, ours);
        ours
    }

    fn get(&self, handle: Handle<K>) -> Option<&Remapped<K, M>> {
        self.pool.get_ref(handle)
    }

    fn get_mut(&mut self, handle: Handle<K>) -> Option<&mut Remapped<K, M>> {
        self.pool.get_mut_ref(handle)
    }

    fn remove(&mut self, handle: Handle<K>) -> Option<Remapped<K, M>> {
        let entry = self.pool.deallocate(handle)?;
        self.reverse.remove(&entry.native);
        Some(entry)
    }

    #[track_caller]
    fn lookup(&self, handle: Handle<K>, context: &str) -> &Remapped<K, M> {
        match self.get(handle) {
            Some(entry) => entry,
            None => violation(
                "unknown_handle",
                format!("{} uses stale or unknown {:?}", context, handle),
            ),
        }
    }

    fn len(&self) -> usize {
        self.pool.len()
    }

    fn is_bijective(&self) -> bool {
        self.pool.len() == self.reverse.len()
            && self
                .pool
                .iter()
                .all(|(ours, entry)| self.reverse.get(&entry.native) == Some(&ours))
    }
}

#[derive(Debug, Clone, Copy)]
struct BufferMeta {
    usage: BufferUsage,
    size: u32,
    mapped: bool,
}

#[derive(Debug, Clone, Copy)]
struct PipelineMeta {
    primitive: PrimitiveType,
}

#[derive(Debug, Clone, Copy)]
struct TextureMeta {
    kind: TextureKind,
}

/// Device decorator that checks every call before it reaches `D`.
pub struct ValidatingDevice<D: Device> {
    inner: D,
    buffers: Remap<Buffer, BufferMeta>,
    pipelines: Remap<Pipeline, PipelineMeta>,
    samplers: Remap<Sampler, ()>,
    textures: Remap<Texture, TextureMeta>,
    effects: Remap<Effect, ()>,
    /// Primitive type of the last bound pipeline. Native pipeline state
    /// outlives a list or a submit, so this only clears on `reset`.
    bound_primitive: Option<PrimitiveType>,
}

impl<D: Device> ValidatingDevice<D> {
    pub fn new(inner: D) -> Self {
        tracing::debug!("device validation enabled");
        Self {
            inner,
            buffers: Remap::default(),
            pipelines: Remap::default(),
            samplers: Remap::default(),
            textures: Remap::default(),
            effects: Remap::default(),
            bound_primitive: None,
        }
    }

    pub fn inner(&self) -> &D {
        &self.inner
    }

    pub fn inner_mut(&mut self) -> &mut D {
        &mut self.inner
    }

    pub fn into_inner(self) -> D {
        self.inner
    }

    /// The wrapped device's handle for `handle`, if it is live.
    pub fn native_buffer(&self, handle: Handle<Buffer>) -> Option<Handle<Buffer>> {
        self.buffers.get(handle).map(|e| e.native)
    }

    pub fn native_texture(&self, handle: Handle<Texture>) -> Option<Handle<Texture>> {
        self.textures.get(handle).map(|e| e.native)
    }

    pub fn native_pipeline(&self, handle: Handle<Pipeline>) -> Option<Handle<Pipeline>> {
        self.pipelines.get(handle).map(|e| e.native)
    }

    pub fn texture_kind(&self, handle: Handle<Texture>) -> Option<TextureKind> {
        self.textures.get(handle).map(|e| e.meta.kind)
    }

    /// Number of live resources across all kinds.
    pub fn live_resources(&self) -> usize {
        self.buffers.len()
            + self.pipelines.len()
            + self.samplers.len()
            + self.textures.len()
            + self.effects.len()
    }

    /// Whether every live handle maps to a distinct native handle and back.
    pub fn is_bijective(&self) -> bool {
        self.buffers.is_bijective()
            && self.pipelines.is_bijective()
            && self.samplers.is_bijective()
            && self.textures.is_bijective()
            && self.effects.is_bijective()
    }

    fn translate(&mut self, list: &CommandList) -> CommandList {
        let mut translator = Translator {
            device: self,
            caps: self.inner.caps(),
            primitive: self.bound_primitive,
            out: CommandList::with_capacity(list.len()),
        };
        list.replay(&mut translator);
        let Translator { primitive, out, .. } = translator;
        self.bound_primitive = primitive;
        out
    }
}

impl<D: Device> Device for ValidatingDevice<D> {
    fn caps(&self) -> &DeviceCaps {
        self.inner.caps()
    }

    fn status(&self) -> DeviceStatus {
        self.inner.status()
    }

    fn reset(&mut self) -> Result<()> {
        self.inner.reset()?;
        self.bound_primitive = None;
        Ok(())
    }

    fn present(&mut self) -> Result<()> {
        self.inner.present()
    }

    fn create_buffer(&mut self, info: &BufferInfo) -> Result<Handle<Buffer>> {
        if let BufferUsage::Vertex(layout) = info.usage {
            if !layout.is_well_formed() {
                violation(
                    "vertex_layout",
                    format!("buffer '{}' has malformed layout {:?}", info.debug_name, layout),
                );
            }
        }
        let native = self.inner.create_buffer(info)?;
        Ok(self.buffers.insert(
            native,
            BufferMeta {
                usage: info.usage,
                size: info.byte_size,
                mapped: false,
            },
        ))
    }

    fn destroy_buffer(&mut self, handle: Handle<Buffer>) {
        if let Some(entry) = self.buffers.remove(handle) {
            if entry.meta.mapped {
                tracing::warn!("destroying {:?} while mapped", handle);
            }
            self.inner.destroy_buffer(entry.native);
        }
    }

    fn map_buffer(&mut self, handle: Handle<Buffer>) -> Result<&mut [u8]> {
        let native = match self.buffers.get_mut(handle) {
            Some(entry) => {
                entry.meta.mapped = true;
                entry.native
            }
            None => violation(
                "unknown_handle",
                format!("map_buffer uses stale or unknown {:?}", handle),
            ),
        };
        self.inner.map_buffer(native)
    }

    fn unmap_buffer(&mut self, handle: Handle<Buffer>) -> Result<()> {
        let native = match self.buffers.get_mut(handle) {
            Some(entry) => {
                if !entry.meta.mapped {
                    tracing::warn!("unmapping {:?} which is not mapped", handle);
                }
                entry.meta.mapped = false;
                entry.native
            }
            None => violation(
                "unknown_handle",
                format!("unmap_buffer uses stale or unknown {:?}", handle),
            ),
        };
        self.inner.unmap_buffer(native)
    }

    fn create_pipeline(&mut self, info: &PipelineInfo) -> Result<Handle<Pipeline>> {
        if !info.vertex_layout.is_well_formed() {
            violation(
                "vertex_layout",
                format!(
                    "pipeline '{}' has malformed layout {:?}",
                    info.debug_name, info.vertex_layout
                ),
            );
        }
        let native = self.inner.create_pipeline(info)?;
        Ok(self.pipelines.insert(
            native,
            PipelineMeta {
                primitive: info.primitive,
            },
        ))
    }

    fn destroy_pipeline(&mut self, handle: Handle<Pipeline>) {
        if let Some(entry) = self.pipelines.remove(handle) {
            self.inner.destroy_pipeline(entry.native);
        }
    }

    fn create_sampler(&mut self, info: &SamplerInfo) -> Result<Handle<Sampler>> {
        let native = self.inner.create_sampler(info)?;
        Ok(self.samplers.insert(native, ()))
    }

    fn destroy_sampler(&mut self, handle: Handle<Sampler>) {
        if let Some(entry) = self.samplers.remove(handle) {
            self.inner.destroy_sampler(entry.native);
        }
    }

    fn create_texture(
        &mut self,
        info: &TextureInfo,
        data: Option<&[u8]>,
    ) -> Result<Handle<Texture>> {
        let native = self.inner.create_texture(info, data)?;
        Ok(self.textures.insert(native, TextureMeta { kind: info.kind }))
    }

    fn destroy_texture(&mut self, handle: Handle<Texture>) {
        if let Some(entry) = self.textures.remove(handle) {
            self.inner.destroy_texture(entry.native);
        }
    }

    fn create_effect(&mut self, info: &EffectInfo) -> Result<Handle<Effect>> {
        let native = self.inner.create_effect(info)?;
        Ok(self.effects.insert(native, ()))
    }

    fn destroy_effect(&mut self, handle: Handle<Effect>) {
        if let Some(entry) = self.effects.remove(handle) {
            self.inner.destroy_effect(entry.native);
        }
    }

    fn submit(&mut self, lists: &[CommandList]) -> Result<()> {
        let translated: Vec<CommandList> = lists.iter().map(|l| self.translate(l)).collect();
        self.inner.submit(&translated)
    }
}

/// Checks one list and rewrites its handles to native ones.
struct Translator<'a, D: Device> {
    device: &'a ValidatingDevice<D>,
    caps: &'a DeviceCaps,
    /// Primitive type of the currently bound pipeline.
    primitive: Option<PrimitiveType>,
    out: CommandList,
}

impl<D: Device> Translator<'_, D> {
    #[track_caller]
    fn check_stage(&self, stage: u32, context: &str) {
        if stage >= self.caps.max_texture_stages {
            violation(
                "texture_stage",
                format!(
                    "{} stage {} exceeds device limit {}",
                    context, stage, self.caps.max_texture_stages
                ),
            );
        }
    }

    fn check_projection(matrix: &Mat4) {
        let w = matrix.row(3);
        // Negated comparison so NaN entries fail too.
        if !(w.x >= 0.0 && w.y >= 0.0 && w.z >= 0.0 && w.w >= 0.0) {
            violation(
                "projection_w",
                format!("projection has negative w column entry {:?}", w),
            );
        }
    }
}

impl<D: Device> CommandSink for Translator<'_, D> {
    fn clear_attachments(&mut self, cmd: &ClearAttachments) {
        if !(0.0..=1.0).contains(&cmd.depth) {
            violation(
                "clear_depth",
                format!("clear depth {} outside [0, 1]", cmd.depth),
            );
        }
        if cmd.attachments.is_empty() {
            tracing::warn!("clear with no attachments");
        }
        self.out.push(Command::ClearAttachments(*cmd));
    }

    fn draw(&mut self, cmd: &Draw) {
        self.out.push(Command::Draw(*cmd));
    }

    fn draw_indexed(&mut self, cmd: &DrawIndexed) {
        if self.primitive == Some(PrimitiveType::PointList) {
            violation(
                "indexed_point_list",
                "indexed draw with a point-list pipeline bound".to_string(),
            );
        }
        self.out.push(Command::DrawIndexed(*cmd));
    }

    fn bind_pipeline(&mut self, cmd: &BindPipeline) {
        let entry = self.device.pipelines.lookup(cmd.pipeline, "bind_pipeline");
        self.primitive = Some(entry.meta.primitive);
        self.out.push(Command::BindPipeline(BindPipeline {
            pipeline: entry.native,
        }));
    }

    fn bind_vertex_buffer(&mut self, cmd: &BindVertexBuffer) {
        let entry = self.device.buffers.lookup(cmd.buffer, "bind_vertex_buffer");
        let layout = match entry.meta.usage {
            BufferUsage::Vertex(layout) => layout,
            BufferUsage::Index(_) => violation(
                "vertex_buffer_usage",
                format!("{:?} is an index buffer", cmd.buffer),
            ),
        };
        let end = cmd.offset as u64 + layout.stride() as u64;
        if end > entry.meta.size as u64 {
            violation(
                "vertex_buffer_range",
                format!(
                    "offset {} + stride {} exceeds size {} of {:?}",
                    cmd.offset,
                    layout.stride(),
                    entry.meta.size,
                    cmd.buffer
                ),
            );
        }
        self.out.push(Command::BindVertexBuffer(BindVertexBuffer {
            buffer: entry.native,
            offset: cmd.offset,
        }));
    }

    fn bind_index_buffer(&mut self, cmd: &BindIndexBuffer) {
        let entry = self.device.buffers.lookup(cmd.buffer, "bind_index_buffer");
        if !matches!(entry.meta.usage, BufferUsage::Index(_)) {
            violation(
                "index_buffer_usage",
                format!("{:?} is a vertex buffer", cmd.buffer),
            );
        }
        self.out.push(Command::BindIndexBuffer(BindIndexBuffer {
            buffer: entry.native,
        }));
    }

    fn bind_sampler(&mut self, cmd: &BindSampler) {
        self.check_stage(cmd.stage, "bind_sampler");
        let entry = self.device.samplers.lookup(cmd.sampler, "bind_sampler");
        self.out.push(Command::BindSampler(BindSampler {
            stage: cmd.stage,
            sampler: entry.native,
        }));
    }

    fn bind_texture(&mut self, cmd: &BindTexture) {
        self.check_stage(cmd.stage, "bind_texture");
        let texture = if cmd.texture.is_null() {
            Handle::null()
        } else {
            self.device.textures.lookup(cmd.texture, "bind_texture").native
        };
        self.out.push(Command::BindTexture(BindTexture {
            stage: cmd.stage,
            texture,
        }));
    }

    fn set_transform(&mut self, cmd: &SetTransform) {
        match cmd.slot {
            TransformSlot::Projection => Self::check_projection(&cmd.matrix),
            TransformSlot::Texture(stage) => self.check_stage(stage as u32, "set_transform"),
            TransformSlot::World | TransformSlot::View => {}
        }
        self.out.push(Command::SetTransform(*cmd));
    }

    fn set_ambient_light(&mut self, cmd: &SetAmbientLight) {
        self.out.push(Command::SetAmbientLight(*cmd));
    }

    fn set_lights(&mut self, cmd: &SetLights) {
        if cmd.lights.len() > self.caps.max_lights as usize {
            violation(
                "light_count",
                format!(
                    "{} lights exceed device limit {}",
                    cmd.lights.len(),
                    self.caps.max_lights
                ),
            );
        }
        self.out.push(Command::SetLights(cmd.clone()));
    }

    fn set_material(&mut self, cmd: &MaterialColors) {
        self.out.push(Command::SetMaterial(*cmd));
    }

    fn set_fog_parameters(&mut self, cmd: &FogParameters) {
        self.out.push(Command::SetFogParameters(*cmd));
    }

    fn set_texture_stage_state(&mut self, cmd: &SetTextureStageState) {
        self.check_stage(cmd.stage, "set_texture_stage_state");
        self.out.push(Command::SetTextureStageState(*cmd));
    }

    fn extension(&mut self, cmd: &ExtensionCommand) {
        let required = cmd.required();
        if !self.caps.extensions.contains(required) {
            violation(
                "extension_unsupported",
                format!("{:?} needs {:?}", cmd, required),
            );
        }
        let translated = match *cmd {
            ExtensionCommand::BeginEffectPass { effect, pass } => {
                ExtensionCommand::BeginEffectPass {
                    effect: self.device.effects.lookup(effect, "begin_effect_pass").native,
                    pass,
                }
            }
            ExtensionCommand::EndEffectPass { effect } => ExtensionCommand::EndEffectPass {
                effect: self.device.effects.lookup(effect, "end_effect_pass").native,
            },
            other => other,
        };
        self.out.push(Command::Extension(translated));
    }
}
