//! 방 레지스트리와 방 상태

pub mod registry;
pub mod room;

pub use registry::*;
pub use room::*;
