pub mod designer;
pub mod fir_core;
pub mod mux;
pub mod taps;
pub mod window;

pub use designer::FilterDesigner;
pub use fir_core::FftFilter;
pub use mux::{OutputMuxer, deinterleave, interleave};
pub use taps::TapSet;
