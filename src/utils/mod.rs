pub mod handle;

pub use handle::{Handle, HandlePool};
