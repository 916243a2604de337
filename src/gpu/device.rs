use super::driver::command::CommandList;
use super::driver::types::{Buffer, Effect, Handle, Pipeline, Sampler, Texture};
use super::error::{GpuError, Result};
use super::structs::{BufferInfo, DeviceCaps, EffectInfo, PipelineInfo, SamplerInfo, TextureInfo};

/// Health of a backend session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DeviceStatus {
    #[default]
    Ok,
    /// The device is gone and cannot be reset yet.
    DeviceLost,
    /// The device came back and must be reset before it accepts work.
    ResetNeeded,
    Error,
}

/// Interface every rendering backend implements.
///
/// A device creates and destroys primitive resources and executes command
/// lists. It knows nothing about meshes, materials or models; see
/// [`ResourceCache`](crate::gpu::cache::ResourceCache) for composition.
///
/// Destroy calls are idempotent: invalid or already destroyed handles are
/// ignored.
pub trait Device {
    fn caps(&self) -> &DeviceCaps;
    fn status(&self) -> DeviceStatus;
    /// Recreates the backend session after a loss.
    fn reset(&mut self) -> Result<()>;
    fn present(&mut self) -> Result<()>;

    fn create_buffer(&mut self, info: &BufferInfo) -> Result<Handle<Buffer>>;
    fn destroy_buffer(&mut self, handle: Handle<Buffer>);
    /// Gives CPU access to the whole buffer until [`Device::unmap_buffer`].
    fn map_buffer(&mut self, handle: Handle<Buffer>) -> Result<&mut [u8]>;
    fn unmap_buffer(&mut self, handle: Handle<Buffer>) -> Result<()>;

    fn create_pipeline(&mut self, info: &PipelineInfo) -> Result<Handle<Pipeline>>;
    fn destroy_pipeline(&mut self, handle: Handle<Pipeline>);

    fn create_sampler(&mut self, info: &SamplerInfo) -> Result<Handle<Sampler>>;
    fn destroy_sampler(&mut self, handle: Handle<Sampler>);

    /// Creates a texture, optionally uploading the top mip level of every
    /// layer from `data`.
    fn create_texture(&mut self, info: &TextureInfo, data: Option<&[u8]>)
        -> Result<Handle<Texture>>;
    fn destroy_texture(&mut self, handle: Handle<Texture>);

    fn create_effect(&mut self, info: &EffectInfo) -> Result<Handle<Effect>>;
    fn destroy_effect(&mut self, handle: Handle<Effect>);

    /// Executes `lists` in order. Refuses with [`GpuError::DeviceNotReady`]
    /// unless the status is [`DeviceStatus::Ok`].
    fn submit(&mut self, lists: &[CommandList]) -> Result<()>;
}

impl<D: Device + ?Sized> Device for Box<D> {
    fn caps(&self) -> &DeviceCaps {
        (**self).caps()
    }

    fn status(&self) -> DeviceStatus {
        (**self).status()
    }

    fn reset(&mut self) -> Result<()> {
        (**self).reset()
    }

    fn present(&mut self) -> Result<()> {
        (**self).present()
    }

    fn create_buffer(&mut self, info: &BufferInfo) -> Result<Handle<Buffer>> {
        (**self).create_buffer(info)
    }

    fn destroy_buffer(&mut self, handle: Handle<Buffer>) {
        (**self).destroy_buffer(handle)
    }

    fn map_buffer(&mut self, handle: Handle<Buffer>) -> Result<&mut [u8]> {
        (**self).map_buffer(handle)
    }

    fn unmap_buffer(&mut self, handle: Handle<Buffer>) -> Result<()> {
        (**self).unmap_buffer(handle)
    }

    fn create_pipeline(&mut self, info: &PipelineInfo) -> Result<Handle<Pipeline>> {
        (**self).create_pipeline(info)
    }

    fn destroy_pipeline(&mut self, handle: Handle<Pipeline>) {
        (**self).destroy_pipeline(handle)
    }

    fn create_sampler(&mut self, info: &SamplerInfo) -> Result<Handle<Sampler>> {
        (**self).create_sampler(info)
    }

    fn destroy_sampler(&mut self, handle: Handle<Sampler>) {
        (**self).destroy_sampler(handle)
    }

    fn create_texture(
        &mut self,
        info: &TextureInfo,
        data: Option<&[u8]>,
    ) -> Result<Handle<Texture>> {
        (**self).create_texture(info, data)
    }

    fn destroy_texture(&mut self, handle: Handle<Texture>) {
        (**self).destroy_texture(handle)
    }

    fn create_effect(&mut self, info: &EffectInfo) -> Result<Handle<Effect>> {
        (**self).create_effect(info)
    }

    fn destroy_effect(&mut self, handle: Handle<Effect>) {
        (**self).destroy_effect(handle)
    }

    fn submit(&mut self, lists: &[CommandList]) -> Result<()> {
        (**self).submit(lists)
    }
}

/// Brings the device back to [`DeviceStatus::Ok`] if it can be done now.
///
/// Runs the reset path for [`DeviceStatus::ResetNeeded`]. A lost device is
/// reported and left alone; callers retry on a later frame.
pub fn ensure_ready<D: Device + ?Sized>(device: &mut D) -> Result<()> {
    match device.status() {
        DeviceStatus::Ok => Ok(()),
        DeviceStatus::ResetNeeded => {
            tracing::warn!("device reports reset needed, resetting");
            device.reset()?;
            match device.status() {
                DeviceStatus::Ok => Ok(()),
                status => Err(GpuError::DeviceNotReady(status)),
            }
        }
        status => Err(GpuError::DeviceNotReady(status)),
    }
}
