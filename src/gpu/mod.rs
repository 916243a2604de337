//! Resource and command layer between scene code and a graphics backend.
//!
//! Backends implement [`Device`]. Callers acquire resources through a
//! [`ResourceCache`], record frames with a [`FilteringCommandList`] and submit
//! the resulting [`CommandList`]s, optionally through a [`ValidatingDevice`].
//!
//! # Examples
//! ```
//! use sandgfx::gpu::*;
//!
//! let mut cache = ResourceCache::new(NullDevice::default());
//! let pipeline = cache.create_pipeline(&PipelineInfo::default()).unwrap();
//!
//! let mut cmd = FilteringCommandList::new();
//! cmd.bind_pipeline(pipeline);
//! cmd.bind_pipeline(pipeline);
//! assert_eq!(cmd.elided(), 1);
//!
//! cache.device_mut().submit(&[cmd.finish()]).unwrap();
//! ```

pub mod cache;
pub mod cmd;
pub mod config;
pub mod device;
pub mod driver;
pub mod error;
pub mod null;
pub mod structs;
pub mod validation;

pub use cache::{
    CacheStats, Drawable, IndexData, Material, MaterialData, MaterialInfo, Mesh, MeshData, MeshInfo, Model,
    ModelData, ResourceCache, ResourceRef,
};
pub use cmd::FilteringCommandList;
pub use config::{make_device, DeviceConfig};
pub use device::{ensure_ready, Device, DeviceStatus};
pub use driver::command::*;
pub use driver::types::*;
pub use error::{GpuError, Result};
pub use null::{NativeCall, NullDevice, NullDeviceInfo};
pub use structs::*;
pub use validation::ValidatingDevice;
