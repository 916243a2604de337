use std::path::PathBuf;

use super::device::DeviceStatus;

#[derive(Debug, thiserror::Error)]
pub enum GpuError {
    #[error("unsupported by device: {0}")]
    Unsupported(String),

    #[error("invalid resource description: {0}")]
    InvalidInfo(String),

    #[error("invalid handle: {0}")]
    InvalidHandle(String),

    #[error("device out of memory")]
    OutOfMemory,

    #[error("device not ready: {0:?}")]
    DeviceNotReady(DeviceStatus),

    #[error("failed to decode texture: {0}")]
    TextureDecode(#[from] image::ImageError),

    #[error("failed to compile effect {}: {}", .path.display(), .reason)]
    EffectCompile { path: PathBuf, reason: String },

    #[error("failed to load model {}: {}", .path.display(), .reason)]
    ModelLoad { path: PathBuf, reason: String },

    #[error("malformed model manifest: {0}")]
    ModelManifest(#[from] ron::error::SpannedError),

    #[error("configuration error: {0}")]
    Config(#[from] toml::de::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenient crate-wide result type.
pub type Result<T, E = GpuError> = std::result::Result<T, E>;
