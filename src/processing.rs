use std::sync::{Mutex, MutexGuard};

use num_complex::Complex32;

use crate::config::{ConfigDelta, GlobalConfig, Retap};
use crate::error::{FilterError, Result};
use crate::signal_processing::mux::{OutputMuxer, deinterleave, interleave};
use crate::signal_processing::taps::TapSet;
use crate::stream::{FilterHandle, StreamRegistry};
use crate::transport::{BlockSink, BlockSource, InputBlock, Modality, OutputPacket};

/// How many streams the engine accepts at once
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StreamPolicy {
    /// One stream at a time; blocks from any other id are dropped until it ends
    Single,
    #[default]
    Multi,
}

/// Everything produced while processing one input block
#[derive(Debug, Default)]
pub struct BlockOutcome {
    pub packets: Vec<OutputPacket>,
    /// Non-fatal problems, also logged
    pub errors: Vec<FilterError>,
}

struct EngineState {
    config: GlobalConfig,
    registry: StreamRegistry,
    muxer: OutputMuxer,
    running: bool,
    active_stream: Option<String>,
}

/// Streaming FIR filter engine
///
/// Owns the global configuration and one filter per stream. Blocks and
/// configuration changes may arrive from different threads; both are
/// serialized on one lock, so a change lands either entirely before or
/// entirely after any block.
pub struct FastFilter {
    policy: StreamPolicy,
    state: Mutex<EngineState>,
}

impl Default for FastFilter {
    fn default() -> Self {
        Self::new()
    }
}

impl FastFilter {
    pub fn new() -> Self {
        Self::with_config(GlobalConfig::default(), StreamPolicy::Multi)
    }

    pub fn single_stream() -> Self {
        Self::with_config(GlobalConfig::default(), StreamPolicy::Single)
    }

    pub fn with_config(config: GlobalConfig, policy: StreamPolicy) -> Self {
        Self {
            policy,
            state: Mutex::new(EngineState {
                config,
                registry: StreamRegistry::new(),
                muxer: OutputMuxer::new(),
                running: false,
                active_stream: None,
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, EngineState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn policy(&self) -> StreamPolicy {
        self.policy
    }

    /// Mark the engine active; conflicting tap sources are rejected from now on
    pub fn start(&self) {
        self.lock().running = true;
        log::info!("Filter engine started ({:?} stream policy)", self.policy);
    }

    pub fn stop(&self) {
        self.lock().running = false;
        log::info!("Filter engine stopped");
    }

    pub fn is_running(&self) -> bool {
        self.lock().running
    }

    /// Snapshot of the current configuration
    pub fn config(&self) -> GlobalConfig {
        self.lock().config.clone()
    }

    /// Taps currently loaded for `stream_id`
    pub fn active_taps(&self, stream_id: &str) -> Option<TapSet> {
        let state = self.lock();
        let handle = state.registry.get(stream_id)?;
        state
            .registry
            .state(handle)
            .map(|s| s.filter.taps().clone())
    }

    pub fn fft_size_of(&self, stream_id: &str) -> Option<usize> {
        let state = self.lock();
        let handle = state.registry.get(stream_id)?;
        state.registry.state(handle).map(|s| s.filter.fft_size())
    }

    pub fn stream_count(&self) -> usize {
        self.lock().registry.len()
    }

    /// Apply a configuration update
    ///
    /// Either the whole update takes effect, including retapping every live
    /// filter, or nothing changes and the error is returned.
    pub fn apply_configuration_change(&self, delta: &ConfigDelta) -> Result<()> {
        let mut guard = self.lock();
        let state = &mut *guard;

        let transition = state
            .config
            .transition(delta, state.running)
            .inspect_err(|e| log::error!("Configuration rejected: {}", e))?;
        let mut config = transition.config;

        let applied = match transition.retap {
            Retap::Manual(ref taps) => state.registry.retap_all(taps, config.fft_size),
            Retap::Redesign => state.registry.retap_all_from_spec(&config),
            Retap::None if transition.resize => state
                .registry
                .resize_all(config.fft_size)
                .map(|size| config.fft_size = size),
            Retap::None => Ok(()),
        };
        applied.inspect_err(|e| log::error!("Configuration rejected: {}", e))?;

        log::debug!(
            "Configuration applied: mode {:?}, fft size {}, correlation {}",
            config.mode,
            config.fft_size,
            config.correlation_mode
        );
        state.config = config;
        Ok(())
    }

    /// Filter one input block
    ///
    /// Never fails: problems are reported in [`BlockOutcome::errors`] and the
    /// block is either passed through unfiltered or dropped.
    pub fn process_block(&self, block: InputBlock) -> BlockOutcome {
        let mut outcome = BlockOutcome::default();
        let mut guard = self.lock();
        let state = &mut *guard;

        if block.queue_flushed {
            let streams = state.registry.flush_all();
            let err = FilterError::QueueFlushed { streams };
            log::warn!("{}", err);
            outcome.errors.push(err);
        }

        if self.policy == StreamPolicy::Single {
            match state.active_stream {
                Some(ref active) if *active != block.stream_id => {
                    let err = FilterError::StreamMismatch {
                        active: active.clone(),
                        received: block.stream_id.clone(),
                    };
                    log::error!("{}", err);
                    outcome.errors.push(err);
                    return outcome;
                }
                Some(_) => {}
                None => state.active_stream = Some(block.stream_id.clone()),
            }
        }

        let sample_rate = block.sample_rate();
        let payloads = match lookup(state, &block, sample_rate, &mut outcome.errors) {
            Some(handle) => filter_block(state, handle, &block, &mut outcome.errors),
            None => pass_through(&block, &mut outcome.errors),
        };

        state.muxer.emit(&block, payloads, &mut outcome.packets);

        if block.end_of_stream {
            state.registry.remove(&block.stream_id);
            state.muxer.forget(&block.stream_id);
            if state.active_stream.as_deref() == Some(block.stream_id.as_str()) {
                state.active_stream = None;
            }
            log::debug!("Stream {:?} ended", block.stream_id);
        }

        outcome
    }

    /// Service loop: pull a block, filter it, push its packets, repeat
    ///
    /// Returns when the source is exhausted. Per-block problems are logged and
    /// do not stop the loop; only source or sink failures do.
    pub fn run<S, K>(&self, source: &mut S, sink: &mut K) -> anyhow::Result<()>
    where
        S: BlockSource + ?Sized,
        K: BlockSink + ?Sized,
    {
        self.start();
        let result = self.pump(source, sink);
        self.stop();
        result
    }

    fn pump<S, K>(&self, source: &mut S, sink: &mut K) -> anyhow::Result<()>
    where
        S: BlockSource + ?Sized,
        K: BlockSink + ?Sized,
    {
        while let Some(block) = source.next_block()? {
            for packet in self.process_block(block).packets {
                sink.push(packet)?;
            }
        }
        Ok(())
    }
}

fn lookup(
    state: &mut EngineState,
    block: &InputBlock,
    sample_rate: f64,
    errors: &mut Vec<FilterError>,
) -> Option<FilterHandle> {
    let handle = match state
        .registry
        .get_or_create(&block.stream_id, sample_rate, &state.config)
    {
        Ok(handle) => handle,
        Err(e) => {
            log::warn!("Passing stream {:?} through unfiltered: {}", block.stream_id, e);
            errors.push(e);
            return None;
        }
    };

    if let Err(e) = state
        .registry
        .maybe_redesign_on_rate_change(handle, sample_rate, &state.config)
    {
        log::warn!("Keeping previous taps for stream {:?}: {}", block.stream_id, e);
        errors.push(e);
    }
    Some(handle)
}

fn complex_input(block: &InputBlock, errors: &mut Vec<FilterError>) -> Vec<Complex32> {
    if block.samples.len() % 2 != 0 {
        let err = FilterError::InvalidBlock(format!(
            "complex payload of odd length {} truncated",
            block.samples.len()
        ));
        log::warn!("Stream {:?}: {}", block.stream_id, err);
        errors.push(err);
    }
    deinterleave(&block.samples)
}

fn filter_block(
    state: &mut EngineState,
    handle: FilterHandle,
    block: &InputBlock,
    errors: &mut Vec<FilterError>,
) -> Vec<(Modality, Vec<f32>)> {
    let Some(filter_state) = state.registry.state_mut(handle) else {
        return pass_through(block, errors);
    };
    let filter = &mut filter_state.filter;

    match block.modality {
        Modality::Real => {
            let mut real_out = Vec::with_capacity(block.samples.len());
            let mut complex_out = Vec::new();
            filter.ingest_real(&block.samples, &mut real_out, &mut complex_out);
            // Residual complex history goes out first
            vec![
                (Modality::Complex, interleave(&complex_out)),
                (Modality::Real, real_out),
            ]
        }
        Modality::Complex => {
            let input = complex_input(block, errors);
            let mut out = Vec::with_capacity(input.len());
            filter.ingest_complex(&input, &mut out);
            vec![(Modality::Complex, interleave(&out))]
        }
    }
}

fn pass_through(block: &InputBlock, errors: &mut Vec<FilterError>) -> Vec<(Modality, Vec<f32>)> {
    let samples = match block.modality {
        Modality::Real => block.samples.clone(),
        Modality::Complex => interleave(&complex_input(block, errors)),
    };
    vec![(block.modality, samples)]
}
