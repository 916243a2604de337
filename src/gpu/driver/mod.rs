//! Backend-agnostic vocabulary: handle tags, recorded commands and the
//! state shadow used to filter them.

pub mod command;
pub mod state;
pub mod types;
