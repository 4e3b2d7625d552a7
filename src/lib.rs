pub mod config;
pub mod constants;
pub mod error;
pub mod processing;
pub mod signal_processing;
pub mod stream;
pub mod transport;
pub mod wav;

pub use config::{ConfigDelta, FilterKind, FilterProps, FilterSpec, GlobalConfig, TapMode};
pub use error::{ErrorKind, FilterError, Result};
pub use processing::{BlockOutcome, FastFilter, StreamPolicy};
pub use wav::{StreamCapture, save_wav};
