use chrono::{DateTime, Utc};
use serde::Serialize;

/// Whether a stream carries real samples or interleaved (re, im) pairs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Modality {
    Real,
    Complex,
}

/// Labeled block of samples as delivered by the transport
#[derive(Debug, Clone, PartialEq)]
pub struct InputBlock {
    pub stream_id: String,
    /// Flat samples; interleaved (re, im) when `modality` is complex
    pub samples: Vec<f32>,
    /// Seconds between samples
    pub sample_interval: f64,
    /// Upstream stream description changed with this block
    pub modality_changed: bool,
    pub modality: Modality,
    pub timestamp: DateTime<Utc>,
    pub end_of_stream: bool,
    /// Transport dropped queued data before this block
    pub queue_flushed: bool,
}

impl InputBlock {
    pub fn new(
        stream_id: impl Into<String>,
        samples: Vec<f32>,
        modality: Modality,
        sample_rate: f64,
    ) -> Self {
        Self {
            stream_id: stream_id.into(),
            samples,
            sample_interval: 1.0 / sample_rate,
            modality_changed: false,
            modality,
            timestamp: Utc::now(),
            end_of_stream: false,
            queue_flushed: false,
        }
    }

    pub fn real(stream_id: impl Into<String>, samples: Vec<f32>, sample_rate: f64) -> Self {
        Self::new(stream_id, samples, Modality::Real, sample_rate)
    }

    pub fn complex(stream_id: impl Into<String>, samples: Vec<f32>, sample_rate: f64) -> Self {
        Self::new(stream_id, samples, Modality::Complex, sample_rate)
    }

    /// Sample rate in Hz, or 0.0 when the interval is not usable
    pub fn sample_rate(&self) -> f64 {
        if self.sample_interval.is_finite() && self.sample_interval > 0.0 {
            1.0 / self.sample_interval
        } else {
            0.0
        }
    }
}

/// Stream description pushed before payloads of a new modality
#[derive(Debug, Clone, PartialEq)]
pub struct StreamHeader {
    pub stream_id: String,
    pub sample_interval: f64,
    pub modality: Modality,
}

/// Filtered payload pushed to the transport
#[derive(Debug, Clone, PartialEq)]
pub struct DataBlock {
    pub stream_id: String,
    pub samples: Vec<f32>,
    pub modality: Modality,
    pub timestamp: DateTime<Utc>,
    pub end_of_stream: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub enum OutputPacket {
    Header(StreamHeader),
    Data(DataBlock),
}

impl OutputPacket {
    pub fn stream_id(&self) -> &str {
        match self {
            Self::Header(header) => &header.stream_id,
            Self::Data(data) => &data.stream_id,
        }
    }
}
