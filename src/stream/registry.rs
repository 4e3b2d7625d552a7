use std::collections::HashMap;

use crate::config::{GlobalConfig, TapMode};
use crate::error::{FilterError, Result};
use crate::signal_processing::taps::{self, TapSet};
use crate::signal_processing::{FftFilter, FilterDesigner};

/// Stable index of a live filter in the registry arena
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FilterHandle(usize);

/// Filter owned by one stream
pub struct FilterState {
    pub stream_id: String,
    pub filter: FftFilter,
    /// Last valid sample rate seen on the stream
    pub sample_rate: f64,
}

/// Per-stream filters, keyed by stream id
///
/// Filters live in an arena of slots; freed slots are reused by later
/// streams. Handles are only valid until their stream is removed.
#[derive(Default)]
pub struct StreamRegistry {
    slots: Vec<Option<FilterState>>,
    free: Vec<usize>,
    index: HashMap<String, FilterHandle>,
}

fn valid_rate(sample_rate: f64) -> bool {
    sample_rate.is_finite() && sample_rate > 0.0
}

/// Taps a new filter should start with under `config`
///
/// # Errors
/// - `FilterError::NoTaps` in manual mode with no coefficients, in designed
///   mode with no spec, or before a usable sample rate is known
/// - `FilterError::FilterDesign` if the filter spec cannot be realised
pub fn taps_for(config: &GlobalConfig, sample_rate: f64) -> Result<TapSet> {
    match config.mode {
        TapMode::Manual => config.active_manual_taps().ok_or_else(|| {
            FilterError::NoTaps("manual mode active but no coefficients loaded".to_string())
        }),
        TapMode::Designed => {
            let spec = config
                .filter_spec
                .as_ref()
                .ok_or_else(|| FilterError::NoTaps("no filter spec configured".to_string()))?;
            if !valid_rate(sample_rate) {
                return Err(FilterError::NoTaps(format!(
                    "design deferred until a valid sample rate is seen (got {})",
                    sample_rate
                )));
            }
            FilterDesigner::design(spec, sample_rate, config.min_taps(), config.max_taps())
        }
    }
}

impl StreamRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up the filter for `stream_id`, building one if it is new
    ///
    /// Nothing is inserted when no taps can be produced; the caller is
    /// expected to pass the block through unfiltered.
    pub fn get_or_create(
        &mut self,
        stream_id: &str,
        sample_rate: f64,
        config: &GlobalConfig,
    ) -> Result<FilterHandle> {
        if let Some(&handle) = self.index.get(stream_id) {
            return Ok(handle);
        }

        let taps = taps_for(config, sample_rate)?;
        let fft_size = taps::grow_fft_size(config.fft_size, taps.len());
        let filter = FftFilter::new(taps, fft_size)?;
        log::debug!(
            "New filter for stream {:?}: {} taps, fft size {}",
            stream_id,
            filter.num_taps(),
            filter.fft_size()
        );

        let state = FilterState {
            stream_id: stream_id.to_string(),
            filter,
            sample_rate,
        };
        let handle = match self.free.pop() {
            Some(slot) => {
                self.slots[slot] = Some(state);
                FilterHandle(slot)
            }
            None => {
                self.slots.push(Some(state));
                FilterHandle(self.slots.len() - 1)
            }
        };
        self.index.insert(stream_id.to_string(), handle);
        Ok(handle)
    }

    pub fn get(&self, stream_id: &str) -> Option<FilterHandle> {
        self.index.get(stream_id).copied()
    }

    pub fn state(&self, handle: FilterHandle) -> Option<&FilterState> {
        self.slots.get(handle.0).and_then(Option::as_ref)
    }

    pub fn state_mut(&mut self, handle: FilterHandle) -> Option<&mut FilterState> {
        self.slots.get_mut(handle.0).and_then(Option::as_mut)
    }

    /// Redesign a stream's taps if its sample rate moved
    ///
    /// The rate is recorded in every mode, but only designed taps are rebuilt.
    /// An unusable rate is ignored and the current taps stay in place.
    /// Returns whether new taps were installed.
    pub fn maybe_redesign_on_rate_change(
        &mut self,
        handle: FilterHandle,
        sample_rate: f64,
        config: &GlobalConfig,
    ) -> Result<bool> {
        if !valid_rate(sample_rate) {
            return Ok(false);
        }
        let Some(state) = self.state_mut(handle) else {
            return Ok(false);
        };
        if state.sample_rate == sample_rate {
            return Ok(false);
        }
        if config.mode != TapMode::Designed {
            state.sample_rate = sample_rate;
            return Ok(false);
        }

        let taps = taps_for(config, sample_rate)?;
        log::debug!(
            "Stream {:?} rate {} -> {} Hz, redesigned with {} taps",
            state.stream_id,
            state.sample_rate,
            sample_rate,
            taps.len()
        );
        let fft_size = taps::grow_fft_size(config.fft_size, taps.len());
        state.filter.reconfigure(taps, fft_size)?;
        state.sample_rate = sample_rate;
        Ok(true)
    }

    /// Install `taps` on every live filter at transform size `fft_size`
    ///
    /// Filters already at `fft_size` keep their overlap history. Every
    /// filter is visited even if one fails; the first failure is returned.
    pub fn retap_all(&mut self, taps: &TapSet, fft_size: usize) -> Result<()> {
        let mut first_err = None;
        for state in self.slots.iter_mut().flatten() {
            let result = if state.filter.fft_size() == fft_size {
                state.filter.set_taps(taps.clone())
            } else {
                state.filter.reconfigure(taps.clone(), fft_size)
            };
            if let Err(e) = result {
                log::warn!("Could not retap stream {:?}: {}", state.stream_id, e);
                first_err.get_or_insert(e);
            }
        }
        first_err.map_or(Ok(()), Err)
    }

    /// Design new taps for every live filter without installing them
    ///
    /// Streams whose rate is not yet usable are left out.
    pub fn plan_redesign(&self, config: &GlobalConfig) -> Result<Vec<(FilterHandle, TapSet)>> {
        let mut plan = Vec::with_capacity(self.index.len());
        for (slot, state) in self.slots.iter().enumerate() {
            let Some(state) = state else { continue };
            if !valid_rate(state.sample_rate) {
                continue;
            }
            plan.push((FilterHandle(slot), taps_for(config, state.sample_rate)?));
        }
        Ok(plan)
    }

    /// Install a plan from [`plan_redesign`](Self::plan_redesign)
    pub fn install(&mut self, plan: Vec<(FilterHandle, TapSet)>, fft_size: usize) -> Result<()> {
        for (handle, taps) in plan {
            if let Some(state) = self.state_mut(handle) {
                let size = taps::grow_fft_size(fft_size, taps.len());
                state.filter.reconfigure(taps, size)?;
            }
        }
        Ok(())
    }

    /// Redesign every live filter from the filter spec at its own sample rate
    pub fn retap_all_from_spec(&mut self, config: &GlobalConfig) -> Result<()> {
        let plan = self.plan_redesign(config)?;
        log::debug!("Redesigning {} live filters", plan.len());
        self.install(plan, config.fft_size)
    }

    /// Release the filter of a finished stream
    pub fn remove(&mut self, stream_id: &str) -> bool {
        let Some(handle) = self.index.remove(stream_id) else {
            return false;
        };
        self.slots[handle.0] = None;
        self.free.push(handle.0);
        log::debug!("Removed filter for stream {:?}", stream_id);
        true
    }

    /// Longest tap set currently loaded in any filter
    pub fn max_live_taps(&self) -> usize {
        self.slots
            .iter()
            .flatten()
            .map(|s| s.filter.num_taps())
            .max()
            .unwrap_or(0)
    }

    /// Move every filter to a new transform size
    ///
    /// `fft_size` is first doubled until the longest live tap set fits.
    /// Returns the size actually applied. Overlap history is discarded.
    pub fn resize_all(&mut self, fft_size: usize) -> Result<usize> {
        if fft_size == 0 {
            return Err(FilterError::Config("fft_size must be positive".to_string()));
        }
        let fft_size = taps::grow_fft_size(fft_size, self.max_live_taps());
        for state in self.slots.iter_mut().flatten() {
            if state.filter.fft_size() != fft_size {
                state.filter.set_fft_size(fft_size)?;
            }
        }
        log::debug!("Resized {} filters to fft size {}", self.index.len(), fft_size);
        Ok(fft_size)
    }

    /// Reset overlap history of every filter, returning how many were reset
    pub fn flush_all(&mut self) -> usize {
        let mut count = 0;
        for state in self.slots.iter_mut().flatten() {
            state.filter.flush();
            count += 1;
        }
        count
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    pub fn contains(&self, stream_id: &str) -> bool {
        self.index.contains_key(stream_id)
    }

    pub fn stream_ids(&self) -> impl Iterator<Item = &str> {
        self.index.keys().map(String::as_str)
    }
}
