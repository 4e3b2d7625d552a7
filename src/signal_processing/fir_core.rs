use std::sync::Arc;

use num_complex::Complex32;
use rustfft::{Fft, FftPlanner};

use crate::error::{FilterError, Result};
use crate::signal_processing::taps::{self, TapSet};

/// FFT overlap-add FIR filter shared by every stream
///
/// Input is cut into blocks of `fft_size - (num_taps - 1)` samples, each
/// convolved in the frequency domain; the `num_taps - 1` sample tail of each
/// block is carried into the next. Output length always equals input length.
///
/// The carried tail is kept complex. `complex_tail` counts how many of its
/// leading samples still hold complex history, which is what decides whether
/// a real input block must first emit a complex residual.
pub struct FftFilter {
    fft_size: usize,
    taps: TapSet,
    taps_fft: Vec<Complex32>,
    forward: Arc<dyn Fft<f32>>,
    inverse: Arc<dyn Fft<f32>>,
    tail: Vec<Complex32>,
    complex_tail: usize,
    scratch: Vec<Complex32>,
}

impl FftFilter {
    /// Create a filter with the given taps and transform size
    ///
    /// # Errors
    /// - `FilterError::NoTaps` if `taps` is empty
    /// - `FilterError::TransformTooSmall` if `2 * (num_taps - 1) > fft_size`
    pub fn new(taps: TapSet, fft_size: usize) -> Result<Self> {
        check_fit(&taps, fft_size)?;
        let (forward, inverse) = plan(fft_size);
        let mut filter = Self {
            fft_size,
            taps_fft: Vec::new(),
            taps,
            forward,
            inverse,
            tail: Vec::new(),
            complex_tail: 0,
            scratch: Vec::with_capacity(fft_size),
        };
        filter.transform_taps();
        Ok(filter)
    }

    /// Replace the active coefficients
    ///
    /// Overlap history is kept: the tail produced by the old taps still adds
    /// into the next block.
    pub fn set_taps(&mut self, taps: TapSet) -> Result<()> {
        check_fit(&taps, self.fft_size)?;
        self.taps = taps;
        self.transform_taps();
        Ok(())
    }

    /// Change the transform size, discarding overlap history
    pub fn set_fft_size(&mut self, fft_size: usize) -> Result<()> {
        check_fit(&self.taps, fft_size)?;
        self.replan(fft_size);
        Ok(())
    }

    /// Install new taps together with a new transform size
    ///
    /// Needed when neither order of `set_taps` / `set_fft_size` would be
    /// valid on its own. History is discarded only if the size changes.
    pub fn reconfigure(&mut self, taps: TapSet, fft_size: usize) -> Result<()> {
        check_fit(&taps, fft_size)?;
        self.taps = taps;
        if fft_size != self.fft_size {
            self.replan(fft_size);
        } else {
            self.transform_taps();
        }
        Ok(())
    }

    /// Filter a block of real samples
    ///
    /// With complex taps everything goes to `complex_out`. With real taps the
    /// output is real, except that leading samples still carrying complex
    /// history from an earlier complex block are emitted to `complex_out`
    /// first; those come before everything in `real_out`.
    pub fn ingest_real(
        &mut self,
        input: &[f32],
        real_out: &mut Vec<f32>,
        complex_out: &mut Vec<Complex32>,
    ) {
        let promoted: Vec<Complex32> = input.iter().map(|&x| Complex32::new(x, 0.0)).collect();
        let pending = self.complex_tail;
        let filtered = self.convolve(&promoted);

        if self.taps.is_complex() {
            self.complex_tail = self.tail.len();
            complex_out.extend(filtered);
            return;
        }

        let residual = pending.min(filtered.len());
        self.complex_tail = pending - residual;
        if self.complex_tail == 0 {
            for v in self.tail.iter_mut() {
                v.im = 0.0;
            }
        }
        complex_out.extend_from_slice(&filtered[..residual]);
        real_out.extend(filtered[residual..].iter().map(|v| v.re));
    }

    /// Filter a block of complex samples
    pub fn ingest_complex(&mut self, input: &[Complex32], out: &mut Vec<Complex32>) {
        let filtered = self.convolve(input);
        self.complex_tail = self.tail.len();
        out.extend(filtered);
    }

    /// Reset overlap history as if the stream just started
    pub fn flush(&mut self) {
        self.tail.clear();
        self.complex_tail = 0;
    }

    /// Get the number of taps (filter length)
    pub fn num_taps(&self) -> usize {
        self.taps.len()
    }

    /// Get access to the tap coefficients
    pub fn taps(&self) -> &TapSet {
        &self.taps
    }

    pub fn fft_size(&self) -> usize {
        self.fft_size
    }

    /// Largest tap count the current transform size accepts
    pub fn max_taps(&self) -> usize {
        taps::max_taps(self.fft_size)
    }

    /// Whether unflushed complex history remains in the overlap tail
    pub fn has_complex_history(&self) -> bool {
        self.complex_tail > 0
    }

    fn block_len(&self) -> usize {
        self.fft_size - (self.taps.len() - 1)
    }

    fn replan(&mut self, fft_size: usize) {
        let (forward, inverse) = plan(fft_size);
        self.forward = forward;
        self.inverse = inverse;
        self.fft_size = fft_size;
        self.scratch = Vec::with_capacity(fft_size);
        self.transform_taps();
        self.flush();
    }

    fn transform_taps(&mut self) {
        let mut spectrum = self.taps.to_complex_padded(self.fft_size);
        self.forward.process(&mut spectrum);
        self.taps_fft = spectrum;
    }

    fn convolve(&mut self, input: &[Complex32]) -> Vec<Complex32> {
        let zero = Complex32::new(0.0, 0.0);
        let extra = self.taps.len() - 1;
        let scale = 1.0 / self.fft_size as f32;
        let mut out = Vec::with_capacity(input.len());

        for chunk in input.chunks(self.block_len()) {
            self.scratch.clear();
            self.scratch.extend_from_slice(chunk);
            self.scratch.resize(self.fft_size, zero);

            self.forward.process(&mut self.scratch);
            for (x, h) in self.scratch.iter_mut().zip(self.taps_fft.iter()) {
                *x *= *h;
            }
            self.inverse.process(&mut self.scratch);

            let mut block: Vec<Complex32> = self.scratch[..chunk.len() + extra]
                .iter()
                .map(|&v| v * scale)
                .collect();

            // A tail left by longer, earlier taps can outlast this block
            if block.len() < self.tail.len() {
                block.resize(self.tail.len(), zero);
            }
            for (y, t) in block.iter_mut().zip(self.tail.iter()) {
                *y += *t;
            }

            self.tail = block.split_off(chunk.len());
            out.extend(block);
        }
        out
    }
}

fn check_fit(taps: &TapSet, fft_size: usize) -> Result<()> {
    if taps.is_empty() {
        return Err(FilterError::NoTaps("empty tap set".to_string()));
    }
    if fft_size == 0 || !taps.fits(fft_size) {
        return Err(FilterError::TransformTooSmall {
            fft_size,
            num_taps: taps.len(),
        });
    }
    Ok(())
}

fn plan(fft_size: usize) -> (Arc<dyn Fft<f32>>, Arc<dyn Fft<f32>>) {
    let mut planner = FftPlanner::<f32>::new();
    (
        planner.plan_fft_forward(fft_size),
        planner.plan_fft_inverse(fft_size),
    )
}
