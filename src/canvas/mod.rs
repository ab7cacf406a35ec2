//! 픽셀 캔버스 그리드

pub mod color;
pub mod grid;

pub use color::*;
pub use grid::*;
