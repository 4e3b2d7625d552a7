use crate::constants::{BESSEL_EPSILON, MAX_TAP_ESTIMATE};

/// Kaiser window parameters for a ripple target and normalized transition width
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct KaiserParams {
    /// Stopband attenuation in dB implied by the ripple
    pub attenuation_db: f64,
    pub beta: f64,
    /// Estimated tap count before any length constraints are applied
    pub num_taps: usize,
}

impl KaiserParams {
    /// `transition` is in cycles/sample, `ripple` is linear
    pub fn estimate(ripple: f64, transition: f64) -> Self {
        let attenuation_db = -20.0 * ripple.log10();
        let beta = if attenuation_db > 50.0 {
            0.1102 * (attenuation_db - 8.7)
        } else if attenuation_db >= 21.0 {
            0.5842 * (attenuation_db - 21.0).powf(0.4) + 0.07886 * (attenuation_db - 21.0)
        } else {
            0.0
        };
        let estimate = if attenuation_db >= 21.0 {
            (attenuation_db - 7.95) / (14.36 * transition)
        } else {
            0.9222 / transition
        };
        Self {
            attenuation_db,
            beta,
            num_taps: (estimate.ceil().min(MAX_TAP_ESTIMATE) as usize).saturating_add(1),
        }
    }
}

/// Zeroth-order modified Bessel function of the first kind
pub fn bessel_i0(x: f64) -> f64 {
    let half = x / 2.0;
    let mut sum = 1.0;
    let mut term = 1.0;
    let mut k = 1.0;
    loop {
        term *= (half / k) * (half / k);
        sum += term;
        if term < BESSEL_EPSILON * sum {
            break;
        }
        k += 1.0;
    }
    sum
}

/// Symmetric Kaiser window of `len` points
pub fn kaiser(len: usize, beta: f64) -> Vec<f64> {
    if len <= 1 {
        return vec![1.0; len];
    }
    let denom = bessel_i0(beta);
    let span = (len - 1) as f64;
    (0..len)
        .map(|n| {
            let r = 2.0 * n as f64 / span - 1.0;
            bessel_i0(beta * (1.0 - r * r).max(0.0).sqrt()) / denom
        })
        .collect()
}
