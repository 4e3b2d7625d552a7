use thiserror::Error;

/// Broad classes of failure reported by the filtering engine.
///
/// None of these are fatal: configuration problems keep the previous state,
/// state problems pass data through unfiltered, mismatched streams are
/// dropped and overflows reset filter history.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Configuration,
    State,
    StreamMismatch,
    RecoverableOverflow,
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum FilterError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Filter type {0:?} not supported")]
    UnsupportedFilterType(String),

    #[error("Filter design failed: {0}")]
    FilterDesign(String),

    #[error("No filter taps available: {0}")]
    NoTaps(String),

    #[error("Stream {received:?} rejected while {active:?} is active")]
    StreamMismatch { active: String, received: String },

    #[error("Input queue flushed, reset {streams} filter states")]
    QueueFlushed { streams: usize },

    #[error("Transform size {fft_size} too small for {num_taps} taps")]
    TransformTooSmall { fft_size: usize, num_taps: usize },

    #[error("Invalid block: {0}")]
    InvalidBlock(String),
}

impl FilterError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Config(_)
            | Self::UnsupportedFilterType(_)
            | Self::FilterDesign(_)
            | Self::TransformTooSmall { .. } => ErrorKind::Configuration,
            Self::NoTaps(_) | Self::InvalidBlock(_) => ErrorKind::State,
            Self::StreamMismatch { .. } => ErrorKind::StreamMismatch,
            Self::QueueFlushed { .. } => ErrorKind::RecoverableOverflow,
        }
    }
}

pub type Result<T> = std::result::Result<T, FilterError>;
