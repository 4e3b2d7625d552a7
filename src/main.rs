use anyhow::{Context, Result};
use clap::Parser;
use crossbeam_channel::bounded;
use rolling_stats::Stats;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::thread;

use fastfilter::config::{ConfigDelta, FilterKind, GlobalConfig, TapMode};
use fastfilter::signal_processing::FilterDesigner;
use fastfilter::transport::{BlockSource, ChannelSource, Modality, OutputPacket, WavFileSource};
use fastfilter::{FastFilter, StreamCapture};

#[derive(Parser, Debug)]
#[command(name = "fastfilter")]
#[command(about = "Filter a WAV file through the streaming FFT FIR engine", long_about = None)]
struct Args {
    /// Input WAV file (mono = real, stereo = I/Q)
    input: PathBuf,

    /// Write filtered output to this WAV file
    #[arg(short = 'o', long)]
    output: Option<PathBuf>,

    /// TOML configuration file
    #[arg(short = 'c', long)]
    config: Option<PathBuf>,

    /// Filter type to design
    #[arg(short = 't', long, value_enum)]
    kind: Option<FilterKind>,

    /// Cutoff or lower band edge in Hz
    #[arg(long)]
    freq1: Option<f64>,

    /// Upper band edge in Hz
    #[arg(long)]
    freq2: Option<f64>,

    /// Transition band width in Hz
    #[arg(long)]
    transition_width: Option<f64>,

    /// Maximum passband/stopband ripple (linear)
    #[arg(long)]
    ripple: Option<f64>,

    /// Design complex taps (signed band edges)
    #[arg(long)]
    complex: bool,

    /// Manual real taps, comma separated
    #[arg(long, conflicts_with = "kind")]
    taps: Option<String>,

    /// Apply manual taps time-reversed
    #[arg(long)]
    correlate: bool,

    /// FFT size (grown automatically to fit the taps)
    #[arg(long)]
    fft_size: Option<usize>,

    /// Samples per channel in each input block
    #[arg(short = 'b', long, default_value = "4096")]
    block_size: usize,

    /// Output format: text, json
    #[arg(short = 'f', long, value_enum, default_value = "text")]
    format: OutputFormat,

    /// Increase output verbosity
    #[arg(short = 'v', long, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[derive(Debug, Clone, Copy, clap::ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

#[derive(Debug, Clone, Serialize)]
struct LevelSummary {
    mean: f32,
    std_dev: f32,
    min: f32,
    max: f32,
}

#[derive(Debug, Clone, Serialize)]
struct RunSummary {
    filename: String,
    sample_rate: u32,
    input_modality: Modality,
    output_modality: Modality,
    input_frames: usize,
    output_frames: usize,
    headers: usize,
    data_blocks: usize,
    fft_size: usize,
    num_taps: Option<usize>,
    tap_mode: String,
    level: Option<LevelSummary>,
}

fn load_toml_config(path: &Path) -> Result<ConfigDelta> {
    let content = fs::read_to_string(path).context("Failed to read config file")?;
    toml::from_str(&content).context("Failed to parse config file")
}

fn parse_taps(list: &str) -> Result<Vec<f32>> {
    list.split(',')
        .map(|t| t.trim().parse::<f32>().context("Invalid tap value"))
        .collect()
}

fn build_delta(args: &Args) -> Result<ConfigDelta> {
    let mut delta = match args.config {
        Some(ref path) => load_toml_config(path)?,
        None => ConfigDelta::default(),
    };

    let overrides_props = args.kind.is_some()
        || args.freq1.is_some()
        || args.freq2.is_some()
        || args.transition_width.is_some()
        || args.ripple.is_some()
        || args.complex;
    if overrides_props {
        let mut props = delta.filter_props.take().unwrap_or_default();
        if let Some(kind) = args.kind {
            props.kind = kind.to_string();
        }
        if let Some(f) = args.freq1 {
            props.freq1 = f;
        }
        if let Some(f) = args.freq2 {
            props.freq2 = f;
        }
        if let Some(tw) = args.transition_width {
            props.transition_width = tw;
        }
        if let Some(r) = args.ripple {
            props.ripple = r;
        }
        props.complex |= args.complex;
        delta.filter_props = Some(props);
    }

    if let Some(ref taps) = args.taps {
        delta.manual_real_taps = Some(parse_taps(taps)?);
        delta.filter_props = None;
    }
    if args.correlate {
        delta.correlation_mode = Some(true);
    }
    if args.fft_size.is_some() {
        delta.fft_size = args.fft_size;
    }
    Ok(delta)
}

fn tap_count(config: &GlobalConfig, sample_rate: f64) -> Option<usize> {
    match config.mode {
        TapMode::Manual => config.active_manual_taps().map(|t| t.len()),
        TapMode::Designed => config.filter_spec.as_ref().and_then(|spec| {
            FilterDesigner::design(spec, sample_rate, config.min_taps(), config.max_taps())
                .ok()
                .map(|t| t.len())
        }),
    }
}

fn main() -> Result<()> {
    let args = Args::parse();

    let log_level = match args.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level)).init();

    let delta = build_delta(&args)?;
    let engine = FastFilter::new();
    engine
        .apply_configuration_change(&delta)
        .context("Invalid filter configuration")?;

    let stream_id = args
        .input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "input".to_string());

    let mut source = WavFileSource::new(&args.input, stream_id.clone(), args.block_size)
        .with_context(|| format!("Failed to open {}", args.input.display()))?;
    let sample_rate = source.sample_rate();
    let input_modality = source.modality();

    let (block_tx, block_rx) = bounded(10);
    let reader = thread::spawn(move || -> Result<usize> {
        let mut frames = 0;
        while let Some(block) = source.next_block()? {
            frames += match block.modality {
                Modality::Real => block.samples.len(),
                Modality::Complex => block.samples.len() / 2,
            };
            if block_tx.send(block).is_err() {
                break;
            }
        }
        Ok(frames)
    });

    let mut packets: Vec<OutputPacket> = Vec::new();
    engine.run(&mut ChannelSource::new(block_rx), &mut packets)?;
    let input_frames = reader
        .join()
        .map_err(|_| anyhow::anyhow!("Reader thread panicked"))??;

    let capture = StreamCapture::from_packets(&packets, &stream_id);
    if let Some(ref path) = args.output {
        capture
            .save(path, sample_rate)
            .with_context(|| format!("Failed to write {}", path.display()))?;
        log::info!("Wrote {} frames to {}", capture.frames(), path.display());
    }

    let config = engine.config();
    let summary = summarize(
        &args.input,
        sample_rate,
        input_modality,
        input_frames,
        &capture,
        &packets,
        &config,
    );

    match args.format {
        OutputFormat::Text => print_text(&summary),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&summary)?),
    }
    Ok(())
}

fn summarize(
    input: &Path,
    sample_rate: u32,
    input_modality: Modality,
    input_frames: usize,
    capture: &StreamCapture,
    packets: &[OutputPacket],
    config: &GlobalConfig,
) -> RunSummary {
    let mut level: Stats<f32> = Stats::new();
    match capture.modality {
        Modality::Real => capture.samples.iter().for_each(|&x| level.update(x.abs())),
        Modality::Complex => capture
            .samples
            .chunks_exact(2)
            .for_each(|iq| level.update(iq[0].hypot(iq[1]))),
    }

    let headers = packets
        .iter()
        .filter(|p| matches!(p, OutputPacket::Header(_)))
        .count();

    RunSummary {
        filename: input.display().to_string(),
        sample_rate,
        input_modality,
        output_modality: capture.modality,
        input_frames,
        output_frames: capture.frames(),
        headers,
        data_blocks: packets.len() - headers,
        fft_size: config.fft_size,
        num_taps: tap_count(config, sample_rate as f64),
        tap_mode: format!("{:?}", config.mode),
        level: (level.count > 0).then(|| LevelSummary {
            mean: level.mean,
            std_dev: level.std_dev,
            min: level.min,
            max: level.max,
        }),
    }
}

fn print_text(summary: &RunSummary) {
    println!("=== {} ===", summary.filename);
    println!(
        "Input: {} frames, {:?}, {} Hz",
        summary.input_frames, summary.input_modality, summary.sample_rate
    );
    println!(
        "Output: {} frames, {:?}, {} data blocks, {} stream headers",
        summary.output_frames, summary.output_modality, summary.data_blocks, summary.headers
    );
    match summary.num_taps {
        Some(n) => println!(
            "Filter: {} taps ({}), fft size {}",
            n, summary.tap_mode, summary.fft_size
        ),
        None => println!("Filter: none loaded, data passed through"),
    }
    if let Some(ref level) = summary.level {
        println!(
            "Output level: mean {:.4}, std dev {:.4}, min {:.4}, max {:.4}",
            level.mean, level.std_dev, level.min, level.max
        );
    }
}
