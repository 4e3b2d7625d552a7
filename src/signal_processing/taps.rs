use num_complex::Complex32;

use crate::constants::{MIN_TAPS_DIVISOR, MIN_TAPS_FLOOR};

/// Filter coefficients, either all real or all complex
///
/// Tap sets are replaced wholesale on every redesign, never edited in place.
#[derive(Debug, Clone, PartialEq)]
pub enum TapSet {
    Real(Vec<f32>),
    Complex(Vec<Complex32>),
}

impl TapSet {
    pub fn len(&self) -> usize {
        match self {
            Self::Real(taps) => taps.len(),
            Self::Complex(taps) => taps.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_complex(&self) -> bool {
        matches!(self, Self::Complex(_))
    }

    /// Time-reversed copy, turning convolution into correlation
    pub fn reversed(&self) -> Self {
        match self {
            Self::Real(taps) => Self::Real(taps.iter().rev().copied().collect()),
            Self::Complex(taps) => Self::Complex(taps.iter().rev().copied().collect()),
        }
    }

    /// Coefficients promoted to complex, zero-padded to `len`
    pub fn to_complex_padded(&self, len: usize) -> Vec<Complex32> {
        let mut out: Vec<Complex32> = match self {
            Self::Real(taps) => taps.iter().map(|&t| Complex32::new(t, 0.0)).collect(),
            Self::Complex(taps) => taps.clone(),
        };
        out.resize(len.max(out.len()), Complex32::new(0.0, 0.0));
        out
    }

    /// Whether these taps can run through a transform of `fft_size`
    pub fn fits(&self, fft_size: usize) -> bool {
        required_span(self.len()) <= fft_size
    }
}

/// Transform span needed by `num_taps` coefficients: `2 * (num_taps - 1)`
pub fn required_span(num_taps: usize) -> usize {
    2 * num_taps.saturating_sub(1)
}

/// Double `fft_size` until `num_taps` coefficients fit
pub fn grow_fft_size(fft_size: usize, num_taps: usize) -> usize {
    let required = required_span(num_taps);
    let mut size = fft_size.max(1);
    while required > size {
        size *= 2;
    }
    size
}

/// Smallest tap count the designer produces for a transform size
pub fn min_taps(fft_size: usize) -> usize {
    (fft_size / MIN_TAPS_DIVISOR).max(MIN_TAPS_FLOOR)
}

/// Largest tap count a transform size can hold
pub fn max_taps(fft_size: usize) -> usize {
    fft_size / 2 + 1
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reversed_real() {
        let taps = TapSet::Real(vec![1.0, 2.0, 3.0]);
        assert_eq!(taps.reversed(), TapSet::Real(vec![3.0, 2.0, 1.0]));
    }

    #[test]
    fn test_reversed_complex() {
        let taps = TapSet::Complex(vec![Complex32::new(1.0, -1.0), Complex32::new(2.0, 0.5)]);
        assert_eq!(
            taps.reversed(),
            TapSet::Complex(vec![Complex32::new(2.0, 0.5), Complex32::new(1.0, -1.0)])
        );
    }

    #[test]
    fn test_grow_fft_size() {
        assert_eq!(grow_fft_size(1024, 600), 2048);
        assert_eq!(grow_fft_size(1024, 513), 1024);
        assert_eq!(grow_fft_size(1024, 514), 2048);
        assert_eq!(grow_fft_size(100, 1000), 3200);
        assert_eq!(grow_fft_size(64, 1), 64);
    }

    #[test]
    fn test_tap_bounds() {
        assert_eq!(min_taps(1024), 64);
        assert_eq!(min_taps(64), 10);
        assert_eq!(max_taps(1024), 513);
        assert!(TapSet::Real(vec![0.0; max_taps(1024)]).fits(1024));
        assert!(!TapSet::Real(vec![0.0; max_taps(1024) + 1]).fits(1024));
    }

    #[test]
    fn test_to_complex_padded() {
        let taps = TapSet::Real(vec![1.0, 2.0]);
        let padded = taps.to_complex_padded(4);
        assert_eq!(padded.len(), 4);
        assert_eq!(padded[1], Complex32::new(2.0, 0.0));
        assert_eq!(padded[3], Complex32::new(0.0, 0.0));
    }
}
