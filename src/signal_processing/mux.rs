use std::collections::HashMap;

use num_complex::Complex32;

use crate::transport::{DataBlock, InputBlock, Modality, OutputPacket, StreamHeader};

/// Unpack interleaved (re, im) pairs
///
/// A trailing unpaired value is dropped.
pub fn deinterleave(samples: &[f32]) -> Vec<Complex32> {
    samples
        .chunks_exact(2)
        .map(|pair| Complex32::new(pair[0], pair[1]))
        .collect()
}

/// Pack complex samples into interleaved (re, im) pairs
pub fn interleave(samples: &[Complex32]) -> Vec<f32> {
    samples.iter().flat_map(|c| [c.re, c.im]).collect()
}

/// Decides when output payloads need a stream header in front of them
///
/// A header goes out before the first payload of a stream, before the first
/// payload of a block whose input modality changed, and whenever a payload's
/// modality differs from the previous push for that stream.
#[derive(Debug, Default)]
pub struct OutputMuxer {
    last_pushed: HashMap<String, Modality>,
}

impl OutputMuxer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether anything has been pushed for `stream_id` yet
    pub fn knows(&self, stream_id: &str) -> bool {
        self.last_pushed.contains_key(stream_id)
    }

    pub fn last_modality(&self, stream_id: &str) -> Option<Modality> {
        self.last_pushed.get(stream_id).copied()
    }

    /// Turn a block's payloads into output packets
    ///
    /// `payloads` are pushed in order; empty ones are skipped. Every payload
    /// carries the input block's stream id and timestamp. End-of-stream is
    /// flagged on the last packet only, and still sent as an empty payload
    /// when nothing else was produced.
    pub fn emit(
        &mut self,
        block: &InputBlock,
        payloads: Vec<(Modality, Vec<f32>)>,
        out: &mut Vec<OutputPacket>,
    ) {
        let mut force = !self.knows(&block.stream_id) || block.modality_changed;
        let mut pending: Vec<(Modality, Vec<f32>)> =
            payloads.into_iter().filter(|(_, s)| !s.is_empty()).collect();

        if pending.is_empty() && block.end_of_stream {
            let modality = self
                .last_modality(&block.stream_id)
                .unwrap_or(block.modality);
            pending.push((modality, Vec::new()));
        }

        let count = pending.len();
        for (i, (modality, samples)) in pending.into_iter().enumerate() {
            if force || self.last_modality(&block.stream_id) != Some(modality) {
                out.push(OutputPacket::Header(StreamHeader {
                    stream_id: block.stream_id.clone(),
                    sample_interval: block.sample_interval,
                    modality,
                }));
                self.last_pushed.insert(block.stream_id.clone(), modality);
                force = false;
            }
            out.push(OutputPacket::Data(DataBlock {
                stream_id: block.stream_id.clone(),
                samples,
                modality,
                timestamp: block.timestamp,
                end_of_stream: block.end_of_stream && i + 1 == count,
            }));
        }
    }

    /// Drop bookkeeping for a finished stream
    pub fn forget(&mut self, stream_id: &str) {
        self.last_pushed.remove(stream_id);
    }
}
