pub mod gpu;
pub mod logging;
pub mod utils;

pub use gpu::*;
