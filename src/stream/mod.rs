pub mod registry;

pub use registry::{FilterHandle, FilterState, StreamRegistry};
