use num_complex::Complex64;
use rustfft::FftPlanner;

use crate::config::{FilterKind, FilterSpec};
use crate::constants::DESIGN_GRID_OVERSAMPLE;
use crate::error::{FilterError, Result};
use crate::signal_processing::taps::TapSet;
use crate::signal_processing::window::{KaiserParams, kaiser};

/// Windowed frequency-sampling FIR designer
///
/// The ideal brick-wall response is sampled on a dense frequency grid,
/// inverse transformed into a zero-phase impulse response, centred and
/// truncated to the tap count, then shaped by a Kaiser window chosen from the
/// ripple and transition width. Band edges sit at the middle of the
/// transition band.
pub struct FilterDesigner;

impl FilterDesigner {
    /// Design taps for `spec` at `sample_rate`
    ///
    /// # Arguments
    /// * `spec` - Filter specification (frequencies in Hz)
    /// * `sample_rate` - Stream sample rate in Hz
    /// * `min_taps` - Lower bound on the tap count
    /// * `max_taps` - Upper bound on the tap count (wins over `min_taps`)
    ///
    /// Returns real taps unless `spec.complex` is set. Real designs use the
    /// magnitude of the band edges; complex designs keep their sign so a band
    /// may sit entirely at negative frequencies or straddle DC.
    ///
    /// # Errors
    /// Returns `FilterError::FilterDesign` if the sample rate or spec is invalid
    pub fn design(
        spec: &FilterSpec,
        sample_rate: f64,
        min_taps: usize,
        max_taps: usize,
    ) -> Result<TapSet> {
        if !(sample_rate.is_finite() && sample_rate > 0.0) {
            return Err(FilterError::FilterDesign(format!(
                "Invalid sample rate: {}",
                sample_rate
            )));
        }
        spec.validate()?;
        if max_taps == 0 {
            return Err(FilterError::FilterDesign("No room for taps".to_string()));
        }

        let band = Band::from_spec(spec, sample_rate);

        let params = KaiserParams::estimate(spec.ripple, spec.transition_width / sample_rate);
        let num_taps = constrain_length(params.num_taps, min_taps, max_taps);

        log::debug!(
            "Designing {} {} filter: fs={} taps={} (estimate {}) beta={:.3}",
            if spec.complex { "complex" } else { "real" },
            spec.kind,
            sample_rate,
            num_taps,
            params.num_taps,
            params.beta
        );

        let impulse = ideal_impulse_response(&band, num_taps);
        let window = kaiser(num_taps, params.beta);

        let shaped = impulse.iter().zip(window.iter()).map(|(h, w)| *h * *w);
        let taps = if spec.complex {
            TapSet::Complex(
                shaped
                    .map(|h| num_complex::Complex32::new(h.re as f32, h.im as f32))
                    .collect(),
            )
        } else {
            TapSet::Real(shaped.map(|h| h.re as f32).collect())
        };
        Ok(taps)
    }
}

/// Pass region in cycles/sample
struct Band {
    kind: FilterKind,
    complex: bool,
    low: f64,
    high: f64,
}

impl Band {
    /// `spec` must already have passed [`FilterSpec::validate`]
    fn from_spec(spec: &FilterSpec, sample_rate: f64) -> Self {
        let normalize = |hz: f64| hz / sample_rate;
        let (f1, f2) = if spec.complex {
            (normalize(spec.freq1), normalize(spec.freq2))
        } else {
            (normalize(spec.freq1.abs()), normalize(spec.freq2.abs()))
        };
        match spec.kind {
            FilterKind::Lowpass | FilterKind::Highpass => {
                let cutoff = f1.abs();
                Self {
                    kind: spec.kind,
                    complex: spec.complex,
                    low: -cutoff,
                    high: cutoff,
                }
            }
            FilterKind::Bandpass | FilterKind::Bandstop => Self {
                kind: spec.kind,
                complex: spec.complex,
                low: f1.min(f2),
                high: f1.max(f2),
            },
        }
    }

    /// Desired gain at signed normalized frequency `f`
    fn gain(&self, f: f64) -> f64 {
        let inside = match (self.kind, self.complex) {
            (FilterKind::Lowpass | FilterKind::Highpass, _) => f.abs() <= self.high,
            (_, true) => self.low <= f && f <= self.high,
            (_, false) => self.low <= f.abs() && f.abs() <= self.high,
        };
        let pass = match self.kind {
            FilterKind::Lowpass | FilterKind::Bandpass => inside,
            FilterKind::Highpass | FilterKind::Bandstop => !inside,
        };
        if pass { 1.0 } else { 0.0 }
    }
}

fn constrain_length(estimate: usize, min_taps: usize, max_taps: usize) -> usize {
    let len = estimate.max(min_taps).min(max_taps).max(1);
    // Odd length keeps a centre tap so highpass/bandstop can pass Nyquist
    if len % 2 == 0 {
        if len < max_taps { len + 1 } else { len - 1 }
    } else {
        len
    }
}

/// Zero-phase ideal response sampled on a dense grid, centred in `num_taps`
fn ideal_impulse_response(band: &Band, num_taps: usize) -> Vec<Complex64> {
    let grid = (num_taps * DESIGN_GRID_OVERSAMPLE).next_power_of_two();

    let mut response: Vec<Complex64> = (0..grid)
        .map(|k| {
            let f = if k < grid / 2 {
                k as f64 / grid as f64
            } else {
                (k as f64 - grid as f64) / grid as f64
            };
            Complex64::new(band.gain(f), 0.0)
        })
        .collect();

    let mut planner = FftPlanner::<f64>::new();
    planner.plan_fft_inverse(grid).process(&mut response);

    let scale = 1.0 / grid as f64;
    let half = (num_taps / 2) as isize;
    (0..num_taps as isize)
        .map(|i| {
            let idx = (i - half).rem_euclid(grid as isize) as usize;
            response[idx] * scale
        })
        .collect()
}
