#![allow(dead_code)]

use fastfilter::transport::{Modality, OutputPacket};
use num_complex::Complex32;
use std::f32::consts::PI;

/// Windowless sinc lowpass with normalized bandwidth `bw` (cycles/sample)
pub fn sinc(bw: f32, num_taps: usize) -> Vec<f32> {
    let center = (num_taps as f32 - 1.0) / 2.0;
    (0..num_taps)
        .map(|n| {
            let t = n as f32 - center;
            if t == 0.0 {
                2.0 * bw
            } else {
                (2.0 * PI * bw * t).sin() / (PI * t)
            }
        })
        .collect()
}

/// Real sine at normalized frequency `fc`
pub fn sine(fc: f32, len: usize, phase: f32) -> Vec<f32> {
    (0..len)
        .map(|n| (2.0 * PI * fc * n as f32 + phase).sin())
        .collect()
}

/// The two-tone test signal used throughout
pub fn two_tone(len: usize) -> Vec<f32> {
    sine(0.05, len, 0.0)
        .iter()
        .zip(sine(0.0123, len, 0.054))
        .map(|(a, b)| a + b)
        .collect()
}

pub fn impulse(len: usize) -> Vec<f32> {
    let mut out = vec![0.0; len];
    out[0] = 1.0;
    out
}

/// Interleave with zero imaginary parts
pub fn mux_zeros(real: &[f32]) -> Vec<f32> {
    real.iter().flat_map(|&x| [x, 0.0]).collect()
}

pub fn to_complex(real: &[f32]) -> Vec<Complex32> {
    real.iter().map(|&x| Complex32::new(x, 0.0)).collect()
}

/// Split interleaved samples into (re, im)
pub fn demux(interleaved: &[f32]) -> (Vec<f32>, Vec<f32>) {
    interleaved
        .chunks_exact(2)
        .map(|pair| (pair[0], pair[1]))
        .unzip()
}

/// Reference time-domain convolution, same length as `input`
pub fn direct_convolution(input: &[Complex32], taps: &[Complex32]) -> Vec<Complex32> {
    (0..input.len())
        .map(|n| {
            taps.iter()
                .enumerate()
                .take(n + 1)
                .map(|(k, h)| h * input[n - k])
                .sum()
        })
        .collect()
}

pub fn headers(packets: &[OutputPacket]) -> Vec<Modality> {
    packets
        .iter()
        .filter_map(|p| match p {
            OutputPacket::Header(h) => Some(h.modality),
            OutputPacket::Data(_) => None,
        })
        .collect()
}

/// Data payloads in push order
pub fn payloads(packets: &[OutputPacket]) -> Vec<(Modality, Vec<f32>)> {
    packets
        .iter()
        .filter_map(|p| match p {
            OutputPacket::Data(d) => Some((d.modality, d.samples.clone())),
            OutputPacket::Header(_) => None,
        })
        .collect()
}

/// All data samples concatenated, regardless of modality
pub fn samples(packets: &[OutputPacket]) -> Vec<f32> {
    payloads(packets)
        .into_iter()
        .flat_map(|(_, s)| s)
        .collect()
}
