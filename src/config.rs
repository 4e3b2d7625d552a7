//! Configuration for the fast filter engine.
//!
//! ## Tap sources
//!
//! Taps either come from a [`FilterSpec`] designed per stream at that
//! stream's sample rate ([`TapMode::Designed`]), or from coefficients supplied
//! directly ([`TapMode::Manual`]). Only one manual source is active at a time:
//!
//! ```
//! use fastfilter::config::{ConfigDelta, GlobalConfig, TapMode};
//!
//! let config = GlobalConfig::default();
//! let delta = ConfigDelta {
//!     manual_real_taps: Some(vec![1.0, 2.0, 3.0]),
//!     correlation_mode: Some(true),
//!     ..Default::default()
//! };
//! let next = config.transition(&delta, true).unwrap().config;
//! assert_eq!(next.mode, TapMode::Manual);
//! assert_eq!(next.manual_real_taps, vec![1.0, 2.0, 3.0]);
//! ```

use std::fmt;
use std::str::FromStr;

use num_complex::Complex32;
use serde::{Deserialize, Serialize};

use crate::constants::{
    DEFAULT_FFT_SIZE, DEFAULT_FREQ1, DEFAULT_FREQ2, DEFAULT_RIPPLE, DEFAULT_TRANSITION_WIDTH,
};
use crate::error::{FilterError, Result};
use crate::signal_processing::taps::{self, TapSet};

/// Ideal response shape for designed filters
///
/// # Parsing formats
/// - `lowpass`, `highpass`, `bandpass`, `bandstop` (case and surrounding
///   whitespace ignored)
///
/// # Example
/// ```
/// use fastfilter::config::FilterKind;
///
/// let kind: FilterKind = "Bandpass".parse().unwrap();
/// assert_eq!(kind, FilterKind::Bandpass);
/// assert!("notch".parse::<FilterKind>().is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum FilterKind {
    Lowpass,
    Highpass,
    Bandpass,
    Bandstop,
}

impl fmt::Display for FilterKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Lowpass => "lowpass",
            Self::Highpass => "highpass",
            Self::Bandpass => "bandpass",
            Self::Bandstop => "bandstop",
        };
        f.write_str(name)
    }
}

impl FromStr for FilterKind {
    type Err = FilterError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "lowpass" => Ok(Self::Lowpass),
            "highpass" => Ok(Self::Highpass),
            "bandpass" => Ok(Self::Bandpass),
            "bandstop" => Ok(Self::Bandstop),
            _ => Err(FilterError::UnsupportedFilterType(s.to_string())),
        }
    }
}

/// Filter specification as received from configuration
///
/// The type is kept as a string so that an unsupported value can be rejected
/// with a configuration error instead of failing deserialization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterProps {
    #[serde(rename = "type")]
    pub kind: String,
    /// Maximum passband/stopband ripple (linear)
    pub ripple: f64,
    /// Transition band width in Hz
    pub transition_width: f64,
    /// Cutoff in Hz for lowpass/highpass, first band edge otherwise
    pub freq1: f64,
    /// Second band edge in Hz (bandpass/bandstop only)
    pub freq2: f64,
    /// Design complex taps
    pub complex: bool,
}

impl Default for FilterProps {
    fn default() -> Self {
        Self {
            kind: String::new(),
            ripple: DEFAULT_RIPPLE,
            transition_width: DEFAULT_TRANSITION_WIDTH,
            freq1: DEFAULT_FREQ1,
            freq2: DEFAULT_FREQ2,
            complex: false,
        }
    }
}

/// Validated filter specification, immutable once used for a design
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FilterSpec {
    pub kind: FilterKind,
    pub ripple: f64,
    pub transition_width: f64,
    pub freq1: f64,
    pub freq2: f64,
    pub complex: bool,
}

impl TryFrom<&FilterProps> for FilterSpec {
    type Error = FilterError;

    fn try_from(props: &FilterProps) -> Result<Self> {
        let spec = Self {
            kind: props.kind.parse()?,
            ripple: props.ripple,
            transition_width: props.transition_width,
            freq1: props.freq1,
            freq2: props.freq2,
            complex: props.complex,
        };
        spec.validate()?;
        Ok(spec)
    }
}

impl FilterSpec {
    /// Check the parts of the spec that do not depend on a sample rate
    ///
    /// # Errors
    /// Returns `FilterError::FilterDesign` if the ripple is outside (0, 1), the
    /// transition width is not a positive finite value, a frequency is not
    /// finite, a lowpass/highpass cutoff is zero, or two band edges coincide.
    /// Real designs compare band edges by magnitude.
    pub fn validate(&self) -> Result<()> {
        if !(self.ripple > 0.0 && self.ripple < 1.0) {
            return Err(FilterError::FilterDesign(format!(
                "Ripple must be in (0, 1): {}",
                self.ripple
            )));
        }
        if !(self.transition_width.is_finite() && self.transition_width > 0.0) {
            return Err(FilterError::FilterDesign(format!(
                "Transition width must be positive: {}",
                self.transition_width
            )));
        }
        if !(self.freq1.is_finite() && self.freq2.is_finite()) {
            return Err(FilterError::FilterDesign(format!(
                "Invalid filter frequencies: freq1={}, freq2={}",
                self.freq1, self.freq2
            )));
        }
        match self.kind {
            FilterKind::Lowpass | FilterKind::Highpass if self.freq1 == 0.0 => {
                Err(FilterError::FilterDesign(format!(
                    "Cutoff must be non-zero: freq1={}",
                    self.freq1
                )))
            }
            FilterKind::Bandpass | FilterKind::Bandstop if self.band_edges_coincide() => {
                Err(FilterError::FilterDesign(format!(
                    "Band edges must differ: freq1={}, freq2={}",
                    self.freq1, self.freq2
                )))
            }
            _ => Ok(()),
        }
    }

    fn band_edges_coincide(&self) -> bool {
        if self.complex {
            self.freq1 == self.freq2
        } else {
            self.freq1.abs() == self.freq2.abs()
        }
    }
}

/// Where the active taps come from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TapMode {
    /// Designed from the filter spec at each stream's sample rate
    Designed,
    /// Supplied directly as coefficients
    Manual,
}

/// Partial configuration update
///
/// Every field left as `None` keeps its current value. Deserializes from the
/// same keys, so a TOML file can carry a whole delta.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct ConfigDelta {
    pub fft_size: Option<usize>,
    pub correlation_mode: Option<bool>,
    pub manual_real_taps: Option<Vec<f32>>,
    /// Complex coefficients as `[re, im]` pairs
    pub manual_complex_taps: Option<Vec<Complex32>>,
    pub filter_props: Option<FilterProps>,
    /// Explicit mode toggle; `Some(false)` returns to designed taps
    pub manual_mode: Option<bool>,
}

impl ConfigDelta {
    fn tap_sources(&self) -> usize {
        [
            self.manual_real_taps.is_some(),
            self.manual_complex_taps.is_some(),
            self.filter_props.is_some(),
        ]
        .iter()
        .filter(|&&set| set)
        .count()
    }
}

/// What live filters need after a configuration change
#[derive(Debug, Clone, PartialEq)]
pub enum Retap {
    None,
    /// Install these taps on every live filter
    Manual(TapSet),
    /// Redesign every live filter from the filter spec at its own rate
    Redesign,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Transition {
    pub config: GlobalConfig,
    /// Transform size changed and must be propagated
    pub resize: bool,
    pub retap: Retap,
}

/// Process-wide filter configuration, one per engine
#[derive(Debug, Clone, PartialEq)]
pub struct GlobalConfig {
    pub fft_size: usize,
    /// Apply manual taps time-reversed (manual mode only)
    pub correlation_mode: bool,
    pub mode: TapMode,
    /// Last accepted spec, as received
    pub filter_props: FilterProps,
    pub filter_spec: Option<FilterSpec>,
    pub manual_real_taps: Vec<f32>,
    pub manual_complex_taps: Vec<Complex32>,
}

impl Default for GlobalConfig {
    fn default() -> Self {
        Self {
            fft_size: DEFAULT_FFT_SIZE,
            correlation_mode: false,
            mode: TapMode::Manual,
            filter_props: FilterProps::default(),
            filter_spec: None,
            manual_real_taps: Vec::new(),
            manual_complex_taps: Vec::new(),
        }
    }
}

impl GlobalConfig {
    pub fn manual_taps_active(&self) -> bool {
        self.mode == TapMode::Manual
    }

    /// Manual taps as they should be loaded, reversed in correlation mode
    ///
    /// `None` when no manual coefficients of either kind are loaded.
    pub fn active_manual_taps(&self) -> Option<TapSet> {
        let taps = if !self.manual_real_taps.is_empty() {
            TapSet::Real(self.manual_real_taps.clone())
        } else if !self.manual_complex_taps.is_empty() {
            TapSet::Complex(self.manual_complex_taps.clone())
        } else {
            return None;
        };
        if self.correlation_mode {
            Some(taps.reversed())
        } else {
            Some(taps)
        }
    }

    pub fn min_taps(&self) -> usize {
        taps::min_taps(self.fft_size)
    }

    pub fn max_taps(&self) -> usize {
        taps::max_taps(self.fft_size)
    }

    /// Compute the configuration that results from applying `delta`
    ///
    /// Pure: `self` is untouched and nothing outside the returned
    /// [`Transition`] is affected. Fields are applied in a fixed order:
    /// transform size, filter spec, manual real taps, manual complex taps,
    /// mode toggle, then correlation mode.
    ///
    /// # Errors
    /// - `FilterError::Config` when more than one tap source is set while
    ///   `running`, or the transform size is zero
    /// - `FilterError::Config` when leaving manual mode with no filter spec
    /// - `FilterError::UnsupportedFilterType` for an unknown filter type
    /// - `FilterError::FilterDesign` for a filter spec that can never be
    ///   designed, whether or not any stream is live
    pub fn transition(&self, delta: &ConfigDelta, running: bool) -> Result<Transition> {
        if running && delta.tap_sources() > 1 {
            return Err(FilterError::Config(
                "only one of manual_real_taps, manual_complex_taps and filter_props may be set at once"
                    .to_string(),
            ));
        }

        let mut next = self.clone();
        let mut taps_changed = false;
        let mut redesign = false;

        if let Some(fft_size) = delta.fft_size {
            if fft_size == 0 {
                return Err(FilterError::Config("fft_size must be positive".to_string()));
            }
            next.fft_size = fft_size;
        }

        if let Some(ref props) = delta.filter_props {
            let spec = FilterSpec::try_from(props)?;
            next.enter_designed();
            next.filter_props = props.clone();
            next.filter_spec = Some(spec);
            redesign = true;
        }

        if let Some(ref real) = delta.manual_real_taps {
            next.manual_real_taps = real.clone();
            if !real.is_empty() {
                next.mode = TapMode::Manual;
                next.manual_complex_taps.clear();
                taps_changed = true;
            }
        }

        if let Some(ref complex) = delta.manual_complex_taps {
            next.manual_complex_taps = complex.clone();
            if !complex.is_empty() {
                next.mode = TapMode::Manual;
                next.manual_real_taps.clear();
                taps_changed = true;
            }
        }

        match delta.manual_mode {
            Some(false) if next.manual_taps_active() => {
                if next.filter_spec.is_none() {
                    return Err(FilterError::Config(
                        "manual mode cannot be turned off before a filter spec is set".to_string(),
                    ));
                }
                next.enter_designed();
                redesign = true;
            }
            Some(true) if !next.manual_taps_active() => {
                next.mode = TapMode::Manual;
                taps_changed = true;
            }
            _ => {}
        }

        if let Some(correlation) = delta.correlation_mode {
            if correlation != next.correlation_mode && next.manual_taps_active() {
                taps_changed = true;
            }
            next.correlation_mode = correlation;
        }

        if next.manual_taps_active() {
            if let Some(ref active) = next.active_manual_taps() {
                next.fft_size = taps::grow_fft_size(next.fft_size, active.len());
            }
        }

        let resize = next.fft_size != self.fft_size;

        let retap = match next.mode {
            TapMode::Manual if taps_changed => next
                .active_manual_taps()
                .map_or(Retap::None, Retap::Manual),
            TapMode::Designed if redesign || resize => Retap::Redesign,
            _ => Retap::None,
        };

        Ok(Transition {
            config: next,
            resize,
            retap,
        })
    }

    fn enter_designed(&mut self) {
        self.mode = TapMode::Designed;
        self.correlation_mode = false;
        self.manual_real_taps.clear();
        self.manual_complex_taps.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lowpass_props() -> FilterProps {
        FilterProps {
            kind: "lowpass".to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_filter_kind_parse() {
        assert_eq!("lowpass".parse::<FilterKind>().unwrap(), FilterKind::Lowpass);
        assert_eq!(" HighPass ".parse::<FilterKind>().unwrap(), FilterKind::Highpass);
        assert_eq!("bandstop".parse::<FilterKind>().unwrap(), FilterKind::Bandstop);
    }

    #[test]
    fn test_filter_kind_invalid() {
        let err = "notch".parse::<FilterKind>().unwrap_err();
        assert_eq!(err, FilterError::UnsupportedFilterType("notch".to_string()));
        assert!("".parse::<FilterKind>().is_err());
    }

    #[test]
    fn test_default_is_manual_without_taps() {
        let config = GlobalConfig::default();
        assert!(config.manual_taps_active());
        assert!(config.active_manual_taps().is_none());
        assert_eq!(config.fft_size, 1024);
    }

    #[test]
    fn test_manual_real_taps_enter_manual() {
        let config = GlobalConfig {
            mode: TapMode::Designed,
            ..Default::default()
        };
        let delta = ConfigDelta {
            manual_real_taps: Some(vec![0.5, 0.5]),
            ..Default::default()
        };
        let t = config.transition(&delta, true).unwrap();
        assert_eq!(t.config.mode, TapMode::Manual);
        assert_eq!(t.retap, Retap::Manual(TapSet::Real(vec![0.5, 0.5])));
        assert!(!t.resize);
    }

    #[test]
    fn test_complex_taps_clear_real_taps() {
        let config = GlobalConfig {
            manual_real_taps: vec![1.0, 2.0],
            ..Default::default()
        };
        let delta = ConfigDelta {
            manual_complex_taps: Some(vec![Complex32::new(1.0, 1.0)]),
            ..Default::default()
        };
        let next = config.transition(&delta, true).unwrap().config;
        assert!(next.manual_real_taps.is_empty());
        assert_eq!(next.manual_complex_taps.len(), 1);
        assert!(next.active_manual_taps().unwrap().is_complex());
    }

    #[test]
    fn test_filter_props_enter_designed_and_clear() {
        let config = GlobalConfig {
            manual_real_taps: vec![1.0, 2.0],
            correlation_mode: true,
            ..Default::default()
        };
        let delta = ConfigDelta {
            filter_props: Some(lowpass_props()),
            ..Default::default()
        };
        let t = config.transition(&delta, true).unwrap();
        assert_eq!(t.config.mode, TapMode::Designed);
        assert!(t.config.manual_real_taps.is_empty());
        assert!(!t.config.correlation_mode);
        assert_eq!(t.retap, Retap::Redesign);
        assert_eq!(t.config.filter_spec.unwrap().kind, FilterKind::Lowpass);
    }

    #[test]
    fn test_unsupported_type_rejected() {
        let config = GlobalConfig::default();
        let delta = ConfigDelta {
            filter_props: Some(FilterProps {
                kind: "comb".to_string(),
                ..Default::default()
            }),
            ..Default::default()
        };
        assert_eq!(
            config.transition(&delta, true).unwrap_err(),
            FilterError::UnsupportedFilterType("comb".to_string())
        );
    }

    #[test]
    fn test_invalid_spec_rejected_without_streams() {
        let config = GlobalConfig {
            manual_real_taps: vec![1.0],
            ..Default::default()
        };
        let bad = [
            FilterProps {
                ripple: 0.0,
                ..lowpass_props()
            },
            FilterProps {
                transition_width: f64::NAN,
                ..lowpass_props()
            },
            FilterProps {
                freq1: 0.0,
                ..lowpass_props()
            },
            FilterProps {
                kind: "bandpass".to_string(),
                freq1: -1500.0,
                freq2: 1500.0,
                ..Default::default()
            },
        ];
        for props in bad {
            let delta = ConfigDelta {
                filter_props: Some(props),
                ..Default::default()
            };
            assert!(matches!(
                config.transition(&delta, true),
                Err(FilterError::FilterDesign(_))
            ));
        }
    }

    #[test]
    fn test_complex_band_edges_keep_sign() {
        let props = FilterProps {
            kind: "bandpass".to_string(),
            freq1: -1500.0,
            freq2: 1500.0,
            complex: true,
            ..Default::default()
        };
        assert!(FilterSpec::try_from(&props).is_ok());
    }

    #[test]
    fn test_conflicting_sources_rejected_when_running() {
        let config = GlobalConfig::default();
        let delta = ConfigDelta {
            manual_real_taps: Some(vec![1.0]),
            filter_props: Some(lowpass_props()),
            ..Default::default()
        };
        let err = config.transition(&delta, true).unwrap_err();
        assert!(matches!(err, FilterError::Config(_)));

        // Before start the later source wins
        let next = config.transition(&delta, false).unwrap().config;
        assert_eq!(next.mode, TapMode::Manual);
        assert_eq!(next.manual_real_taps, vec![1.0]);
    }

    #[test]
    fn test_correlation_toggle_reverses_without_touching_stored_taps() {
        let config = GlobalConfig {
            manual_real_taps: vec![1.0, 2.0, 3.0],
            ..Default::default()
        };
        let delta = ConfigDelta {
            correlation_mode: Some(true),
            ..Default::default()
        };
        let t = config.transition(&delta, true).unwrap();
        assert_eq!(t.retap, Retap::Manual(TapSet::Real(vec![3.0, 2.0, 1.0])));
        assert_eq!(t.config.manual_real_taps, vec![1.0, 2.0, 3.0]);
    }

    #[test]
    fn test_correlation_in_designed_mode_is_stored_only() {
        let config = GlobalConfig {
            mode: TapMode::Designed,
            filter_spec: FilterSpec::try_from(&lowpass_props()).ok(),
            ..Default::default()
        };
        let delta = ConfigDelta {
            correlation_mode: Some(true),
            ..Default::default()
        };
        let t = config.transition(&delta, true).unwrap();
        assert!(t.config.correlation_mode);
        assert_eq!(t.retap, Retap::None);
    }

    #[test]
    fn test_manual_taps_grow_fft_size() {
        let config = GlobalConfig::default();
        let delta = ConfigDelta {
            manual_real_taps: Some(vec![0.0; 600]),
            ..Default::default()
        };
        let t = config.transition(&delta, true).unwrap();
        assert_eq!(t.config.fft_size, 2048);
        assert!(t.resize);
    }

    #[test]
    fn test_fft_size_change_redesigns_in_designed_mode() {
        let config = GlobalConfig {
            mode: TapMode::Designed,
            filter_spec: FilterSpec::try_from(&lowpass_props()).ok(),
            ..Default::default()
        };
        let delta = ConfigDelta {
            fft_size: Some(4096),
            ..Default::default()
        };
        let t = config.transition(&delta, true).unwrap();
        assert!(t.resize);
        assert_eq!(t.retap, Retap::Redesign);
    }

    #[test]
    fn test_zero_fft_size_rejected() {
        let delta = ConfigDelta {
            fft_size: Some(0),
            ..Default::default()
        };
        assert!(GlobalConfig::default().transition(&delta, true).is_err());
    }

    #[test]
    fn test_manual_mode_off_returns_to_designed() {
        let config = GlobalConfig {
            manual_real_taps: vec![1.0],
            filter_spec: FilterSpec::try_from(&lowpass_props()).ok(),
            ..Default::default()
        };
        let delta = ConfigDelta {
            manual_mode: Some(false),
            ..Default::default()
        };
        let t = config.transition(&delta, true).unwrap();
        assert_eq!(t.config.mode, TapMode::Designed);
        assert!(t.config.manual_real_taps.is_empty());
        assert_eq!(t.retap, Retap::Redesign);
    }

    #[test]
    fn test_manual_mode_off_needs_spec() {
        let config = GlobalConfig {
            manual_real_taps: vec![1.0],
            ..Default::default()
        };
        let delta = ConfigDelta {
            manual_mode: Some(false),
            ..Default::default()
        };
        assert!(matches!(
            config.transition(&delta, true),
            Err(FilterError::Config(_))
        ));
    }

    #[test]
    fn test_delta_from_toml() {
        let delta: ConfigDelta = toml::from_str(
            r#"
            fft_size = 2048
            manual_complex_taps = [[1.0, 0.0], [0.0, -1.0]]
            "#,
        )
        .unwrap();
        assert_eq!(delta.fft_size, Some(2048));
        assert_eq!(
            delta.manual_complex_taps,
            Some(vec![Complex32::new(1.0, 0.0), Complex32::new(0.0, -1.0)])
        );

        let delta: ConfigDelta = toml::from_str(
            r#"
            [filter_props]
            type = "bandpass"
            freq1 = 500.0
            freq2 = 1500.0
            "#,
        )
        .unwrap();
        let props = delta.filter_props.unwrap();
        assert_eq!(props.kind, "bandpass");
        assert_eq!(props.ripple, 0.01);
        assert_eq!(props.freq2, 1500.0);
    }
}
