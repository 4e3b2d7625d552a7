//! Numeric constants for filter design and block convolution
//!
//! Defaults mirror the values a freshly deployed filter component starts
//! with before any configuration is applied.

/// Transform size used until a configuration change says otherwise.
pub const DEFAULT_FFT_SIZE: usize = 1024;

/// Lower bound on the number of designed taps regardless of transform size.
pub const MIN_TAPS_FLOOR: usize = 10;

/// Designed tap count is at least `fft_size / MIN_TAPS_DIVISOR`.
pub const MIN_TAPS_DIVISOR: usize = 16;

/// Ratio between the design grid and the tap count.
/// A dense grid keeps time-domain aliasing of the ideal response negligible.
pub const DESIGN_GRID_OVERSAMPLE: usize = 16;

/// Cap on the Kaiser tap estimate before it is clamped to the transform.
/// Keeps near-zero transition widths from overflowing the tap count.
pub const MAX_TAP_ESTIMATE: f64 = 4_294_967_296.0;

/// Convergence threshold for the modified Bessel function series.
pub const BESSEL_EPSILON: f64 = 1e-12;

/// Default filter specification values.
pub const DEFAULT_TRANSITION_WIDTH: f64 = 800.0;
pub const DEFAULT_RIPPLE: f64 = 0.01;
pub const DEFAULT_FREQ1: f64 = 1000.0;
pub const DEFAULT_FREQ2: f64 = 2000.0;
