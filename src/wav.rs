use std::path::Path;

use hound::{WavSpec, WavWriter};

use crate::transport::{Modality, OutputPacket};

/// Write 32-bit float samples, interleaved when `channels` is 2
pub fn save_wav<P: AsRef<Path>>(
    path: P,
    samples: &[f32],
    channels: u16,
    sample_rate: u32,
) -> Result<(), hound::Error> {
    let spec = WavSpec {
        channels,
        sample_rate,
        bits_per_sample: 32,
        sample_format: hound::SampleFormat::Float,
    };

    let mut writer = WavWriter::create(path, spec)?;

    for &sample in samples {
        writer.write_sample(sample)?;
    }

    writer.finalize()?;
    Ok(())
}

/// Output of one stream, flattened into a single WAV-ready buffer
///
/// If any payload was complex the whole stream is written as I/Q stereo,
/// with real payloads given a zero imaginary part.
#[derive(Debug, Clone, PartialEq)]
pub struct StreamCapture {
    pub modality: Modality,
    pub samples: Vec<f32>,
}

impl StreamCapture {
    pub fn from_packets(packets: &[OutputPacket], stream_id: &str) -> Self {
        let payloads: Vec<_> = packets
            .iter()
            .filter_map(|p| match p {
                OutputPacket::Data(d) if d.stream_id == stream_id => Some(d),
                _ => None,
            })
            .collect();

        let any_complex = payloads.iter().any(|d| d.modality == Modality::Complex);
        if !any_complex {
            return Self {
                modality: Modality::Real,
                samples: payloads.iter().flat_map(|d| d.samples.iter().copied()).collect(),
            };
        }

        let mut samples = Vec::new();
        for d in payloads {
            match d.modality {
                Modality::Complex => samples.extend_from_slice(&d.samples),
                Modality::Real => samples.extend(d.samples.iter().flat_map(|&x| [x, 0.0])),
            }
        }
        Self {
            modality: Modality::Complex,
            samples,
        }
    }

    pub fn channels(&self) -> u16 {
        match self.modality {
            Modality::Real => 1,
            Modality::Complex => 2,
        }
    }

    /// Samples per channel
    pub fn frames(&self) -> usize {
        self.samples.len() / self.channels() as usize
    }

    pub fn save<P: AsRef<Path>>(&self, path: P, sample_rate: u32) -> Result<(), hound::Error> {
        save_wav(path, &self.samples, self.channels(), sample_rate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::DataBlock;
    use chrono::Utc;

    fn data(modality: Modality, samples: Vec<f32>) -> OutputPacket {
        OutputPacket::Data(DataBlock {
            stream_id: "a".to_string(),
            samples,
            modality,
            timestamp: Utc::now(),
            end_of_stream: false,
        })
    }

    #[test]
    fn test_real_capture_is_mono() {
        let packets = vec![
            data(Modality::Real, vec![1.0, 2.0]),
            data(Modality::Real, vec![3.0]),
        ];
        let capture = StreamCapture::from_packets(&packets, "a");
        assert_eq!(capture.channels(), 1);
        assert_eq!(capture.samples, vec![1.0, 2.0, 3.0]);
    }

    #[test]
    fn test_mixed_capture_promotes_real() {
        let packets = vec![
            data(Modality::Real, vec![1.0]),
            data(Modality::Complex, vec![2.0, -2.0]),
        ];
        let capture = StreamCapture::from_packets(&packets, "a");
        assert_eq!(capture.channels(), 2);
        assert_eq!(capture.samples, vec![1.0, 0.0, 2.0, -2.0]);
        assert_eq!(capture.frames(), 2);
    }

    #[test]
    fn test_save_and_read_back() {
        let path = std::env::temp_dir().join("fastfilter_wav_test.wav");
        save_wav(&path, &[0.5, -0.5, 0.25, -0.25], 2, 8000).unwrap();
        let reader = hound::WavReader::open(&path).unwrap();
        assert_eq!(reader.spec().channels, 2);
        assert_eq!(reader.len(), 4);
        std::fs::remove_file(&path).ok();
    }
}
