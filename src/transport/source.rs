use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use crossbeam_channel::{Receiver, Sender};
use hound::WavReader;

use super::block::{InputBlock, Modality, OutputPacket};

/// Pulls input blocks one at a time, blocking until one is available
///
/// `Ok(None)` means the source is exhausted.
pub trait BlockSource: Send {
    fn next_block(&mut self) -> anyhow::Result<Option<InputBlock>>;
}

/// Receives pushed output packets
pub trait BlockSink {
    fn push(&mut self, packet: OutputPacket) -> anyhow::Result<()>;
}

impl BlockSink for Vec<OutputPacket> {
    fn push(&mut self, packet: OutputPacket) -> anyhow::Result<()> {
        Vec::push(self, packet);
        Ok(())
    }
}

impl BlockSink for Sender<OutputPacket> {
    fn push(&mut self, packet: OutputPacket) -> anyhow::Result<()> {
        self.send(packet)
            .map_err(|_| anyhow::anyhow!("output channel closed"))
    }
}

pub struct ChannelSource {
    rx: Receiver<InputBlock>,
}

impl ChannelSource {
    pub fn new(rx: Receiver<InputBlock>) -> Self {
        Self { rx }
    }
}

impl BlockSource for ChannelSource {
    fn next_block(&mut self) -> anyhow::Result<Option<InputBlock>> {
        match self.rx.recv() {
            Ok(block) => Ok(Some(block)),
            Err(_) => Ok(None),
        }
    }
}

/// Reads a WAV file as one stream
///
/// Mono files are real streams; stereo files are treated as I/Q pairs and
/// delivered as a complex stream. The last block carries end-of-stream.
pub struct WavFileSource {
    stream_id: String,
    samples: Vec<f32>,
    position: usize,
    chunk_size: usize,
    modality: Modality,
    sample_rate: u32,
    started: bool,
}

impl WavFileSource {
    /// `chunk_size` is in samples per channel
    pub fn new<P: AsRef<Path>>(
        path: P,
        stream_id: impl Into<String>,
        chunk_size: usize,
    ) -> anyhow::Result<Self> {
        let reader = WavReader::open(path.as_ref())?;
        let spec = reader.spec();

        let modality = match spec.channels {
            1 => Modality::Real,
            2 => Modality::Complex,
            n => anyhow::bail!("Expected mono or stereo WAV file, got {} channels", n),
        };
        if chunk_size == 0 {
            anyhow::bail!("Chunk size must be positive");
        }

        let sample_rate = spec.sample_rate;
        let samples = Self::read_samples(reader, &spec)?;

        Ok(Self {
            stream_id: stream_id.into(),
            samples,
            position: 0,
            chunk_size: chunk_size * spec.channels as usize,
            modality,
            sample_rate,
            started: false,
        })
    }

    fn read_samples(
        mut reader: WavReader<BufReader<File>>,
        spec: &hound::WavSpec,
    ) -> anyhow::Result<Vec<f32>> {
        let samples = match spec.sample_format {
            hound::SampleFormat::Float => reader.samples::<f32>().collect::<Result<Vec<_>, _>>()?,
            hound::SampleFormat::Int => {
                let max_val = 2_i32.pow(spec.bits_per_sample as u32 - 1) as f32;
                reader
                    .samples::<i32>()
                    .map(|s| s.map(|v| v as f32 / max_val))
                    .collect::<Result<Vec<_>, _>>()?
            }
        };
        Ok(samples)
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn modality(&self) -> Modality {
        self.modality
    }
}

impl BlockSource for WavFileSource {
    fn next_block(&mut self) -> anyhow::Result<Option<InputBlock>> {
        if self.position >= self.samples.len() && self.started {
            return Ok(None);
        }

        let end = (self.position + self.chunk_size).min(self.samples.len());
        let chunk = self.samples[self.position..end].to_vec();
        self.position = end;

        let mut block = InputBlock::new(
            self.stream_id.clone(),
            chunk,
            self.modality,
            self.sample_rate as f64,
        );
        block.modality_changed = !self.started;
        block.end_of_stream = self.position >= self.samples.len();
        self.started = true;

        Ok(Some(block))
    }
}
