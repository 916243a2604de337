use std::path::Path;

use serde::{Deserialize, Serialize};

use super::device::{Device, DeviceStatus};
use super::driver::command::CommandList;
use super::driver::types::{Buffer, Effect, Handle, Pipeline, Sampler, Texture};
use super::error::Result;
use super::structs::{BufferInfo, DeviceCaps, EffectInfo, PipelineInfo, SamplerInfo, TextureInfo};
use super::validation::ValidatingDevice;

/// Environment variable overriding [`DeviceConfig::validation`].
pub const VALIDATION_ENV: &str = "SANDGFX_VALIDATION";

/// How the device stack is assembled, loaded from `sandgfx.toml`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceConfig {
    /// Wrap the backend in a [`ValidatingDevice`].
    #[serde(default = "default_validation")]
    pub validation: bool,
    /// Log every submitted command at debug level.
    #[serde(default)]
    pub log_commands: bool,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            validation: default_validation(),
            log_commands: false,
        }
    }
}

fn default_validation() -> bool {
    cfg!(feature = "validation")
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "on" | "yes" => Some(true),
        "0" | "false" | "off" | "no" => Some(false),
        _ => None,
    }
}

impl DeviceConfig {
    pub fn from_toml(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Load configuration from file if it exists, otherwise return defaults.
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        match Self::load(path) {
            Ok(config) => config,
            Err(err) => {
                if path.exists() {
                    tracing::warn!("ignoring {}: {}", path.display(), err);
                }
                Self::default()
            }
        }
    }

    /// Build defaults with the environment applied on top.
    pub fn from_env() -> Self {
        Self::default().with_env()
    }

    pub fn with_env(self) -> Self {
        match std::env::var(VALIDATION_ENV) {
            Ok(value) => self.with_validation_override(&value),
            Err(_) => self,
        }
    }

    fn with_validation_override(mut self, value: &str) -> Self {
        match parse_flag(value) {
            Some(flag) => self.validation = flag,
            None => tracing::warn!("ignoring {}={:?}", VALIDATION_ENV, value),
        }
        self
    }
}

/// Assembles the device stack `config` asks for around `inner`.
pub fn make_device<D: Device + 'static>(inner: D, config: &DeviceConfig) -> Box<dyn Device> {
    let device: Box<dyn Device> = if config.validation {
        Box::new(ValidatingDevice::new(inner))
    } else {
        Box::new(inner)
    };
    if config.log_commands {
        Box::new(CommandLogDevice { inner: device })
    } else {
        device
    }
}

/// Logs submitted lists before forwarding everything to `D`.
pub struct CommandLogDevice<D: Device> {
    inner: D,
}

impl<D: Device> CommandLogDevice<D> {
    pub fn new(inner: D) -> Self {
        Self { inner }
    }
}

impl<D: Device> Device for CommandLogDevice<D> {
    fn caps(&self) -> &DeviceCaps {
        self.inner.caps()
    }

    fn status(&self) -> DeviceStatus {
        self.inner.status()
    }

    fn reset(&mut self) -> Result<()> {
        self.inner.reset()
    }

    fn present(&mut self) -> Result<()> {
        self.inner.present()
    }

    fn create_buffer(&mut self, info: &BufferInfo) -> Result<Handle<Buffer>> {
        self.inner.create_buffer(info)
    }

    fn destroy_buffer(&mut self, handle: Handle<Buffer>) {
        self.inner.destroy_buffer(handle)
    }

    fn map_buffer(&mut self, handle: Handle<Buffer>) -> Result<&mut [u8]> {
        self.inner.map_buffer(handle)
    }

    fn unmap_buffer(&mut self, handle: Handle<Buffer>) -> Result<()> {
        self.inner.unmap_buffer(handle)
    }

    fn create_pipeline(&mut self, info: &PipelineInfo) -> Result<Handle<Pipeline>> {
        self.inner.create_pipeline(info)
    }

    fn destroy_pipeline(&mut self, handle: Handle<Pipeline>) {
        self.inner.destroy_pipeline(handle)
    }

    fn create_sampler(&mut self, info: &SamplerInfo) -> Result<Handle<Sampler>> {
        self.inner.create_sampler(info)
    }

    fn destroy_sampler(&mut self, handle: Handle<Sampler>) {
        self.inner.destroy_sampler(handle)
    }

    fn create_texture(
        &mut self,
        info: &TextureInfo,
        data: Option<&[u8]>,
    ) -> Result<Handle<Texture>> {
        self.inner.create_texture(info, data)
    }

    fn destroy_texture(&mut self, handle: Handle<Texture>) {
        self.inner.destroy_texture(handle)
    }

    fn create_effect(&mut self, info: &EffectInfo) -> Result<Handle<Effect>> {
        self.inner.create_effect(info)
    }

    fn destroy_effect(&mut self, handle: Handle<Effect>) {
        self.inner.destroy_effect(handle)
    }

    fn submit(&mut self, lists: &[CommandList]) -> Result<()> {
        for (i, list) in lists.iter().enumerate() {
            tracing::debug!("submit list {} ({} commands)\n{}", i, list.len(), list);
        }
        self.inner.submit(lists)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gpu::null::NullDevice;

    #[test]
    fn missing_keys_use_defaults() {
        let config = DeviceConfig::from_toml("log_commands = true").unwrap();
        assert_eq!(config.validation, default_validation());
        assert!(config.log_commands);
    }

    #[test]
    fn malformed_toml_is_a_config_error() {
        let err = DeviceConfig::from_toml("validation = \"maybe\"").unwrap_err();
        assert!(matches!(err, crate::gpu::error::GpuError::Config(_)));
    }

    #[test]
    fn env_value_overrides_validation() {
        let base = DeviceConfig {
            validation: true,
            log_commands: false,
        };
        assert!(!base.clone().with_validation_override("0").validation);
        assert!(base.clone().with_validation_override("garbage").validation);
        assert!(DeviceConfig {
            validation: false,
            ..base
        }
        .with_validation_override("on")
        .validation);
    }

    #[test]
    #[should_panic(expected = "clear_depth")]
    fn validating_stack_checks_submissions() {
        use crate::gpu::driver::command::{ClearAttachments, Command};

        let config = DeviceConfig {
            validation: true,
            log_commands: true,
        };
        let mut device = make_device(NullDevice::default(), &config);
        let mut list = CommandList::new();
        list.push(Command::ClearAttachments(ClearAttachments {
            depth: -1.0,
            ..Default::default()
        }));
        let _ = device.submit(&[list]);
    }

    #[test]
    fn bare_stack_forwards_submissions() {
        let config = DeviceConfig {
            validation: false,
            log_commands: false,
        };
        let mut device = make_device(NullDevice::default(), &config);
        device.submit(&[CommandList::new()]).unwrap();
        device.present().unwrap();
    }
}
