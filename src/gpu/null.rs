//! Headless backend.
//!
//! `NullDevice` keeps every resource in host memory and translates submitted
//! commands into a log of [`NativeCall`]s instead of driving a GPU. Tests,
//! demos and tooling inspect that log.

use glam::Mat4;

use super::device::{Device, DeviceStatus};
use super::driver::command::{
    BindIndexBuffer, BindPipeline, BindSampler, BindTexture, BindVertexBuffer, ClearAttachments,
    CommandList, CommandSink, Draw, DrawIndexed, ExtensionCommand, SetAmbientLight, SetLights,
    SetTextureStageState, SetTransform,
};
use super::driver::types::{
    Buffer, ClearFlags, Effect, Extensions, Handle, IndexType, Pipeline, PrimitiveType, Sampler,
    Texture,
};
use super::error::{GpuError, Result};
use super::structs::{
    BufferInfo, BufferUsage, DeviceCaps, EffectInfo, FogParameters, Light, MaterialColors,
    PipelineInfo, SamplerInfo, TextureInfo, TextureKind, TextureStageState, TransformSlot,
};
use crate::utils::HandlePool;

/// One call the backend would have issued to the native API.
#[derive(Debug, Clone, PartialEq)]
pub enum NativeCall {
    Clear {
        flags: ClearFlags,
        color: u32,
        depth: f32,
        stencil: u32,
    },
    SetRenderState {
        pipeline: Handle<Pipeline>,
    },
    SetStreamSource {
        buffer: Handle<Buffer>,
        offset: u32,
        stride: u32,
    },
    SetIndices {
        buffer: Handle<Buffer>,
        index_type: IndexType,
    },
    SetSamplerState {
        stage: u32,
        sampler: Handle<Sampler>,
    },
    SetTexture {
        stage: u32,
        texture: Option<Handle<Texture>>,
    },
    SetTransform {
        slot: TransformSlot,
        matrix: Mat4,
    },
    SetAmbient {
        color: u32,
    },
    SetLight {
        index: u32,
        light: Light,
    },
    LightEnable {
        index: u32,
        enable: bool,
    },
    SetMaterial(MaterialColors),
    SetFog(FogParameters),
    SetTextureStageState {
        stage: u32,
        state: TextureStageState,
    },
    DrawPrimitive {
        primitive: PrimitiveType,
        start_vertex: u32,
        primitive_count: u32,
    },
    DrawIndexedPrimitive {
        primitive: PrimitiveType,
        base_vertex: i32,
        min_index: u32,
        num_vertices: u32,
        start_index: u32,
        primitive_count: u32,
    },
    DrawSubset {
        subset: u32,
    },
    RenderUi,
    BeginPass {
        effect: Handle<Effect>,
        pass: u32,
    },
    EndPass {
        effect: Handle<Effect>,
    },
    Present,
}

/// Number of primitives `count` vertices (or indices) form.
pub fn primitive_count(primitive: PrimitiveType, count: u32) -> u32 {
    match primitive {
        PrimitiveType::PointList => count,
        PrimitiveType::LineList => count / 2,
        PrimitiveType::LineStrip => count.saturating_sub(1),
        PrimitiveType::TriangleList => count / 3,
        PrimitiveType::TriangleStrip | PrimitiveType::TriangleFan => count.saturating_sub(2),
    }
}

#[derive(Debug, Clone)]
pub struct NullDeviceInfo {
    pub name: String,
    pub caps: DeviceCaps,
    /// Largest buffer the device agrees to create.
    pub max_buffer_size: u32,
}

impl Default for NullDeviceInfo {
    fn default() -> Self {
        Self {
            name: "null".to_string(),
            caps: DeviceCaps {
                extensions: Extensions::all(),
                ..Default::default()
            },
            max_buffer_size: 64 * 1024 * 1024,
        }
    }
}

/// Live and destroyed counts per resource kind.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ResourceCounts {
    pub buffers: usize,
    pub pipelines: usize,
    pub samplers: usize,
    pub textures: usize,
    pub effects: usize,
}

impl ResourceCounts {
    pub fn total(&self) -> usize {
        self.buffers + self.pipelines + self.samplers + self.textures + self.effects
    }
}

struct BufferData {
    usage: BufferUsage,
    bytes: Vec<u8>,
    mapped: bool,
}

struct PipelineData {
    primitive: PrimitiveType,
}

struct TextureData {
    kind: TextureKind,
    dim: [u32; 3],
    texels: Vec<u8>,
}

struct EffectData {
    name: String,
}

pub struct NullDevice {
    info: NullDeviceInfo,
    status: DeviceStatus,
    buffers: HandlePool<BufferData, Buffer>,
    pipelines: HandlePool<PipelineData, Pipeline>,
    samplers: HandlePool<SamplerInfo, Sampler>,
    textures: HandlePool<TextureData, Texture>,
    effects: HandlePool<EffectData, Effect>,
    destroyed: ResourceCounts,
    calls: Vec<NativeCall>,
    primitive: PrimitiveType,
    enabled_lights: u32,
    frames: u64,
}

impl Default for NullDevice {
    fn default() -> Self {
        Self::new(NullDeviceInfo::default())
    }
}

impl NullDevice {
    pub fn new(info: NullDeviceInfo) -> Self {
        tracing::info!("null device '{}' created", info.name);
        Self {
            info,
            status: DeviceStatus::Ok,
            buffers: HandlePool::new(),
            pipelines: HandlePool::new(),
            samplers: HandlePool::new(),
            textures: HandlePool::new(),
            effects: HandlePool::new(),
            destroyed: ResourceCounts::default(),
            calls: Vec::new(),
            primitive: PrimitiveType::TriangleList,
            enabled_lights: 0,
            frames: 0,
        }
    }

    pub fn with_caps(caps: DeviceCaps) -> Self {
        Self::new(NullDeviceInfo {
            caps,
            ..Default::default()
        })
    }

    pub fn name(&self) -> &str {
        &self.info.name
    }

    pub fn calls(&self) -> &[NativeCall] {
        &self.calls
    }

    pub fn take_calls(&mut self) -> Vec<NativeCall> {
        std::mem::take(&mut self.calls)
    }

    pub fn frames_presented(&self) -> u64 {
        self.frames
    }

    pub fn live(&self) -> ResourceCounts {
        ResourceCounts {
            buffers: self.buffers.len(),
            pipelines: self.pipelines.len(),
            samplers: self.samplers.len(),
            textures: self.textures.len(),
            effects: self.effects.len(),
        }
    }

    pub fn destroyed(&self) -> ResourceCounts {
        self.destroyed
    }

    pub fn is_buffer(&self, handle: Handle<Buffer>) -> bool {
        self.buffers.is_valid(handle)
    }

    pub fn is_texture(&self, handle: Handle<Texture>) -> bool {
        self.textures.is_valid(handle)
    }

    pub fn buffer_contents(&self, handle: Handle<Buffer>) -> Option<&[u8]> {
        self.buffers.get_ref(handle).map(|b| b.bytes.as_slice())
    }

    pub fn texture_texels(&self, handle: Handle<Texture>) -> Option<&[u8]> {
        self.textures.get_ref(handle).map(|t| t.texels.as_slice())
    }

    pub fn texture_dim(&self, handle: Handle<Texture>) -> Option<(TextureKind, [u32; 3])> {
        self.textures.get_ref(handle).map(|t| (t.kind, t.dim))
    }

    pub fn effect_name(&self, handle: Handle<Effect>) -> Option<&str> {
        self.effects.get_ref(handle).map(|e| e.name.as_str())
    }

    /// Puts the device into the lost state, as a display mode switch would.
    pub fn simulate_device_lost(&mut self) {
        tracing::warn!("null device '{}' lost", self.info.name);
        self.status = DeviceStatus::DeviceLost;
    }

    /// The lost device is back and waits for [`Device::reset`].
    pub fn simulate_device_restored(&mut self) {
        if self.status == DeviceStatus::DeviceLost {
            self.status = DeviceStatus::ResetNeeded;
        }
    }

    fn check_ready(&self) -> Result<()> {
        match self.status {
            DeviceStatus::Ok => Ok(()),
            status => Err(GpuError::DeviceNotReady(status)),
        }
    }
}

impl Device for NullDevice {
    fn caps(&self) -> &DeviceCaps {
        &self.info.caps
    }

    fn status(&self) -> DeviceStatus {
        self.status
    }

    fn reset(&mut self) -> Result<()> {
        match self.status {
            DeviceStatus::DeviceLost => Err(GpuError::DeviceNotReady(DeviceStatus::DeviceLost)),
            _ => {
                self.status = DeviceStatus::Ok;
                self.primitive = PrimitiveType::TriangleList;
                self.enabled_lights = 0;
                tracing::info!("null device '{}' reset", self.info.name);
                Ok(())
            }
        }
    }

    fn present(&mut self) -> Result<()> {
        self.check_ready()?;
        self.calls.push(NativeCall::Present);
        self.frames += 1;
        Ok(())
    }

    fn create_buffer(&mut self, info: &BufferInfo) -> Result<Handle<Buffer>> {
        if info.byte_size == 0 {
            return Err(GpuError::InvalidInfo(format!(
                "buffer '{}' has zero size",
                info.debug_name
            )));
        }
        if info.byte_size > self.info.max_buffer_size {
            return Err(GpuError::OutOfMemory);
        }
        if let BufferUsage::Index(ty) = info.usage {
            if !self.info.caps.supports_index_type(ty) {
                return Err(GpuError::Unsupported(format!("{:?} indices", ty)));
            }
        }
        Ok(self.buffers.allocate(BufferData {
            usage: info.usage,
            bytes: vec![0; info.byte_size as usize],
            mapped: false,
        }))
    }

    fn destroy_buffer(&mut self, handle: Handle<Buffer>) {
        if self.buffers.deallocate(handle).is_some() {
            self.destroyed.buffers += 1;
        }
    }

    fn map_buffer(&mut self, handle: Handle<Buffer>) -> Result<&mut [u8]> {
        let buffer = self
            .buffers
            .get_mut_ref(handle)
            .ok_or_else(|| GpuError::InvalidHandle(format!("{:?}", handle)))?;
        buffer.mapped = true;
        Ok(buffer.bytes.as_mut_slice())
    }

    fn unmap_buffer(&mut self, handle: Handle<Buffer>) -> Result<()> {
        let buffer = self
            .buffers
            .get_mut_ref(handle)
            .ok_or_else(|| GpuError::InvalidHandle(format!("{:?}", handle)))?;
        if !buffer.mapped {
            tracing::warn!("unmapping {:?} which is not mapped", handle);
        }
        buffer.mapped = false;
        Ok(())
    }

    fn create_pipeline(&mut self, info: &PipelineInfo) -> Result<Handle<Pipeline>> {
        if info.specular && !info.lighting {
            tracing::warn!("pipeline '{}' enables specular without lighting", info.debug_name);
        }
        Ok(self.pipelines.allocate(PipelineData {
            primitive: info.primitive,
        }))
    }

    fn destroy_pipeline(&mut self, handle: Handle<Pipeline>) {
        if self.pipelines.deallocate(handle).is_some() {
            self.destroyed.pipelines += 1;
        }
    }

    fn create_sampler(&mut self, info: &SamplerInfo) -> Result<Handle<Sampler>> {
        if info.max_anisotropy > self.info.caps.max_anisotropy {
            return Err(GpuError::Unsupported(format!(
                "anisotropy {} (max {})",
                info.max_anisotropy, self.info.caps.max_anisotropy
            )));
        }
        Ok(self.samplers.allocate(*info))
    }

    fn destroy_sampler(&mut self, handle: Handle<Sampler>) {
        if self.samplers.deallocate(handle).is_some() {
            self.destroyed.samplers += 1;
        }
    }

    fn create_texture(
        &mut self,
        info: &TextureInfo,
        data: Option<&[u8]>,
    ) -> Result<Handle<Texture>> {
        let [w, h, d] = info.dim;
        if w == 0 || h == 0 || d == 0 {
            return Err(GpuError::InvalidInfo(format!(
                "texture '{}' has an empty extent",
                info.debug_name
            )));
        }
        match info.kind {
            TextureKind::D2 if d != 1 => {
                return Err(GpuError::InvalidInfo("2D texture with depth".into()))
            }
            TextureKind::Cube if d != 6 || w != h => {
                return Err(GpuError::InvalidInfo(
                    "cube texture needs six square faces".into(),
                ))
            }
            _ => {}
        }

        let size = info.byte_size() as usize;
        let texels = match data {
            Some(bytes) if bytes.len() != size => {
                return Err(GpuError::InvalidInfo(format!(
                    "texture '{}' expects {} bytes, got {}",
                    info.debug_name,
                    size,
                    bytes.len()
                )))
            }
            Some(bytes) => bytes.to_vec(),
            None => vec![0; size],
        };

        Ok(self.textures.allocate(TextureData {
            kind: info.kind,
            dim: info.dim,
            texels,
        }))
    }

    fn destroy_texture(&mut self, handle: Handle<Texture>) {
        if self.textures.deallocate(handle).is_some() {
            self.destroyed.textures += 1;
        }
    }

    fn create_effect(&mut self, info: &EffectInfo) -> Result<Handle<Effect>> {
        if !self.info.caps.extensions.contains(Extensions::EFFECTS) {
            return Err(GpuError::Unsupported("effects".into()));
        }
        if info.source.trim().is_empty() {
            return Err(GpuError::EffectCompile {
                path: info.debug_name.into(),
                reason: "empty effect source".into(),
            });
        }
        Ok(self.effects.allocate(EffectData {
            name: info.debug_name.to_string(),
        }))
    }

    fn destroy_effect(&mut self, handle: Handle<Effect>) {
        if self.effects.deallocate(handle).is_some() {
            self.destroyed.effects += 1;
        }
    }

    fn submit(&mut self, lists: &[CommandList]) -> Result<()> {
        self.check_ready()?;
        for list in lists {
            tracing::trace!("null device executing {} commands", list.len());
            list.replay(&mut Executor { device: self });
        }
        Ok(())
    }
}

/// Translates commands into native calls against the device's resources.
struct Executor<'a> {
    device: &'a mut NullDevice,
}

impl Executor<'_> {
    fn call(&mut self, call: NativeCall) {
        self.device.calls.push(call);
    }
}

impl CommandSink for Executor<'_> {
    fn clear_attachments(&mut self, cmd: &ClearAttachments) {
        self.call(NativeCall::Clear {
            flags: cmd.attachments,
            color: cmd.color.to_argb(),
            depth: cmd.depth,
            stencil: cmd.stencil,
        });
    }

    fn draw(&mut self, cmd: &Draw) {
        let primitive = self.device.primitive;
        self.call(NativeCall::DrawPrimitive {
            primitive,
            start_vertex: cmd.first_vertex,
            primitive_count: primitive_count(primitive, cmd.vertex_count),
        });
    }

    fn draw_indexed(&mut self, cmd: &DrawIndexed) {
        let primitive = self.device.primitive;
        self.call(NativeCall::DrawIndexedPrimitive {
            primitive,
            base_vertex: cmd.vertex_offset,
            min_index: cmd.min_index,
            num_vertices: cmd.num_vertices,
            start_index: cmd.first_index,
            primitive_count: primitive_count(primitive, cmd.index_count),
        });
    }

    fn bind_pipeline(&mut self, cmd: &BindPipeline) {
        match self.device.pipelines.get_ref(cmd.pipeline) {
            Some(p) => {
                self.device.primitive = p.primitive;
                self.call(NativeCall::SetRenderState {
                    pipeline: cmd.pipeline,
                });
            }
            None => tracing::warn!("ignoring bind of unknown {:?}", cmd.pipeline),
        }
    }

    fn bind_vertex_buffer(&mut self, cmd: &BindVertexBuffer) {
        let stride = match self.device.buffers.get_ref(cmd.buffer).map(|b| b.usage) {
            Some(BufferUsage::Vertex(layout)) => layout.stride(),
            Some(BufferUsage::Index(_)) => 0,
            None => {
                tracing::warn!("ignoring bind of unknown {:?}", cmd.buffer);
                return;
            }
        };
        self.call(NativeCall::SetStreamSource {
            buffer: cmd.buffer,
            offset: cmd.offset,
            stride,
        });
    }

    fn bind_index_buffer(&mut self, cmd: &BindIndexBuffer) {
        let index_type = match self.device.buffers.get_ref(cmd.buffer).map(|b| b.usage) {
            Some(BufferUsage::Index(ty)) => ty,
            Some(BufferUsage::Vertex(_)) => IndexType::U16,
            None => {
                tracing::warn!("ignoring bind of unknown {:?}", cmd.buffer);
                return;
            }
        };
        self.call(NativeCall::SetIndices {
            buffer: cmd.buffer,
            index_type,
        });
    }

    fn bind_sampler(&mut self, cmd: &BindSampler) {
        self.call(NativeCall::SetSamplerState {
            stage: cmd.stage,
            sampler: cmd.sampler,
        });
    }

    fn bind_texture(&mut self, cmd: &BindTexture) {
        let texture = (!cmd.texture.is_null()).then_some(cmd.texture);
        self.call(NativeCall::SetTexture {
            stage: cmd.stage,
            texture,
        });
    }

    fn set_transform(&mut self, cmd: &SetTransform) {
        self.call(NativeCall::SetTransform {
            slot: cmd.slot,
            matrix: cmd.matrix,
        });
    }

    fn set_ambient_light(&mut self, cmd: &SetAmbientLight) {
        self.call(NativeCall::SetAmbient {
            color: cmd.color.to_argb(),
        });
    }

    fn set_lights(&mut self, cmd: &SetLights) {
        let count = cmd.lights.len() as u32;
        for (index, light) in cmd.lights.iter().enumerate() {
            let index = index as u32;
            self.call(NativeCall::SetLight {
                index,
                light: *light,
            });
            self.call(NativeCall::LightEnable {
                index,
                enable: true,
            });
        }
        for index in count..self.device.enabled_lights {
            self.call(NativeCall::LightEnable {
                index,
                enable: false,
            });
        }
        self.device.enabled_lights = count;
    }

    fn set_material(&mut self, cmd: &MaterialColors) {
        self.call(NativeCall::SetMaterial(*cmd));
    }

    fn set_fog_parameters(&mut self, cmd: &FogParameters) {
        self.call(NativeCall::SetFog(*cmd));
    }

    fn set_texture_stage_state(&mut self, cmd: &SetTextureStageState) {
        self.call(NativeCall::SetTextureStageState {
            stage: cmd.stage,
            state: cmd.state,
        });
    }

    fn extension(&mut self, cmd: &ExtensionCommand) {
        let call = match *cmd {
            ExtensionCommand::DrawSubmesh { subset } => NativeCall::DrawSubset { subset },
            ExtensionCommand::RenderUi => NativeCall::RenderUi,
            ExtensionCommand::BeginEffectPass { effect, pass } => {
                NativeCall::BeginPass { effect, pass }
            }
            ExtensionCommand::EndEffectPass { effect } => NativeCall::EndPass { effect },
        };
        self.call(call);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gpu::driver::command::Command;

    #[test]
    fn primitive_counts() {
        assert_eq!(primitive_count(PrimitiveType::TriangleList, 6), 2);
        assert_eq!(primitive_count(PrimitiveType::TriangleStrip, 6), 4);
        assert_eq!(primitive_count(PrimitiveType::LineStrip, 0), 0);
        assert_eq!(primitive_count(PrimitiveType::PointList, 5), 5);
    }

    #[test]
    fn draw_uses_bound_pipeline_primitive() {
        let mut dev = NullDevice::default();
        let pipeline = dev
            .create_pipeline(&PipelineInfo {
                primitive: PrimitiveType::LineList,
                ..Default::default()
            })
            .unwrap();

        let mut list = CommandList::new();
        list.push(Command::BindPipeline(BindPipeline { pipeline }));
        list.push(Command::Draw(Draw {
            first_vertex: 0,
            vertex_count: 4,
        }));
        dev.submit(&[list]).unwrap();

        assert_eq!(
            dev.calls()[1],
            NativeCall::DrawPrimitive {
                primitive: PrimitiveType::LineList,
                start_vertex: 0,
                primitive_count: 2,
            }
        );
    }

    #[test]
    fn shorter_light_list_disables_the_rest() {
        let mut dev = NullDevice::default();
        let two = SetLights {
            lights: vec![Light::default(); 2],
        };
        let none = SetLights { lights: vec![] };
        let mut list = CommandList::new();
        list.push(Command::SetLights(two));
        list.push(Command::SetLights(none));
        dev.submit(&[list]).unwrap();

        let disabled: Vec<_> = dev
            .calls()
            .iter()
            .filter(|c| matches!(c, NativeCall::LightEnable { enable: false, .. }))
            .collect();
        assert_eq!(disabled.len(), 2);
    }

    #[test]
    fn mapped_buffer_writes_are_visible() {
        let mut dev = NullDevice::default();
        let buf = dev
            .create_buffer(&BufferInfo {
                byte_size: 4,
                ..Default::default()
            })
            .unwrap();
        dev.map_buffer(buf).unwrap().copy_from_slice(&[1, 2, 3, 4]);
        dev.unmap_buffer(buf).unwrap();
        assert_eq!(dev.buffer_contents(buf), Some(&[1u8, 2, 3, 4][..]));
    }

    #[test]
    fn rejects_unsupported_creation() {
        let mut dev = NullDevice::with_caps(DeviceCaps {
            index_types: crate::gpu::driver::types::IndexTypes::U16,
            max_anisotropy: 4,
            ..Default::default()
        });
        let index32 = dev.create_buffer(&BufferInfo {
            byte_size: 64,
            usage: BufferUsage::Index(IndexType::U32),
            ..Default::default()
        });
        assert!(matches!(index32, Err(GpuError::Unsupported(_))));

        let sampler = dev.create_sampler(&SamplerInfo {
            max_anisotropy: 8,
            ..Default::default()
        });
        assert!(matches!(sampler, Err(GpuError::Unsupported(_))));

        let effect = dev.create_effect(&EffectInfo {
            debug_name: "fx",
            source: "technique t {}",
        });
        assert!(matches!(effect, Err(GpuError::Unsupported(_))));
    }

    #[test]
    fn texture_upload_size_must_match() {
        let mut dev = NullDevice::default();
        let info = TextureInfo {
            dim: [2, 2, 1],
            ..Default::default()
        };
        assert!(dev.create_texture(&info, Some(&[0; 15])).is_err());
        let tex = dev.create_texture(&info, Some(&[7; 16])).unwrap();
        assert_eq!(dev.texture_texels(tex).map(|t| t.len()), Some(16));
    }

    #[test]
    fn lost_device_refuses_work_until_reset() {
        let mut dev = NullDevice::default();
        dev.simulate_device_lost();
        assert!(matches!(
            dev.submit(&[CommandList::new()]),
            Err(GpuError::DeviceNotReady(DeviceStatus::DeviceLost))
        ));
        assert!(dev.reset().is_err());

        dev.simulate_device_restored();
        assert_eq!(dev.status(), DeviceStatus::ResetNeeded);
        crate::gpu::device::ensure_ready(&mut dev).unwrap();
        assert_eq!(dev.status(), DeviceStatus::Ok);
        dev.present().unwrap();
        assert_eq!(dev.frames_presented(), 1);
    }

    #[test]
    fn destroy_is_idempotent_and_counted() {
        let mut dev = NullDevice::default();
        let s = dev.create_sampler(&SamplerInfo::default()).unwrap();
        dev.destroy_sampler(s);
        dev.destroy_sampler(s);
        assert_eq!(dev.destroyed().samplers, 1);
        assert_eq!(dev.live().total(), 0);
    }
}
