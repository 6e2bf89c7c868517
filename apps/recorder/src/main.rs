//! Playcap Recorder - command-line front end for Playcap captures.
//!
//! Records interleaved 16-bit PCM into a WAV file whose header is written up
//! front and patched once the capture stops. Also repairs and inspects
//! captures left behind by interrupted runs.

mod config;

use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use playcap_capture::{ReaderSource, SilenceSource, ToneSource};
use playcap_core::protocol_constants::WAV_HEADER_LEN;
use playcap_core::{
    finalize_wav_file, CaptureSession, LoggingEventEmitter, PcmSource, WavHeader,
};
use serde::Serialize;
use tokio::signal;

use crate::config::RecorderConfig;

/// Playcap Recorder - capture PCM audio into WAV files.
#[derive(Parser, Debug)]
#[command(name = "playcap-recorder")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the configuration file (YAML).
    #[arg(short, long, value_name = "FILE", global = true)]
    config: Option<PathBuf>,

    /// Log level (error, warn, info, debug, trace).
    #[arg(
        short,
        long,
        default_value = "info",
        env = "PLAYCAP_LOG_LEVEL",
        global = true
    )]
    log_level: log::LevelFilter,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Record a new capture.
    Record(RecordArgs),

    /// Patch the size fields of a capture that was never finalized.
    Finalize {
        /// Capture file to repair.
        file: PathBuf,
    },

    /// Print the header of a WAV file.
    Inspect {
        /// File to inspect.
        file: PathBuf,

        /// Print the report as JSON.
        #[arg(long)]
        json: bool,
    },
}

#[derive(clap::Args, Debug)]
struct RecordArgs {
    /// Where samples come from.
    #[arg(short, long, value_enum, default_value_t = SourceKind::Stdin)]
    source: SourceKind,

    /// Output directory (overrides config file).
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// Stop after this many seconds.
    #[arg(short, long, value_name = "SECS")]
    duration: Option<f64>,

    /// Sample rate in Hz (overrides config file).
    #[arg(long)]
    sample_rate: Option<u32>,

    /// Channel count (overrides config file).
    #[arg(long)]
    channels: Option<u16>,

    /// Tone frequency in Hz for `--source tone` (overrides config file).
    #[arg(long)]
    tone_hz: Option<f64>,

    /// File name instead of a timestamped one.
    #[arg(long)]
    file_name: Option<String>,

    /// Print the result as JSON.
    #[arg(long)]
    json: bool,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum SourceKind {
    /// Raw s16le interleaved PCM on standard input.
    Stdin,
    /// Generated sine tone.
    Tone,
    /// Generated silence.
    Silence,
}

/// Header report printed by `inspect`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct InspectReport {
    path: PathBuf,
    file_len: u64,
    finalized: bool,
    consistent: bool,
    duration_secs: f64,
    header: WavHeader,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    env_logger::Builder::new()
        .filter_level(args.log_level)
        .format_timestamp_millis()
        .init();

    log::debug!("Playcap Recorder v{}", env!("CARGO_PKG_VERSION"));

    match args.command {
        Command::Record(record_args) => {
            let config = RecorderConfig::load(args.config.as_deref())
                .context("Failed to load configuration")?;
            record(config, record_args).await
        }
        Command::Finalize { file } => finalize(&file),
        Command::Inspect { file, json } => inspect(&file, json),
    }
}

async fn record(mut config: RecorderConfig, args: RecordArgs) -> Result<()> {
    // Apply CLI overrides
    if let Some(output_dir) = args.output_dir {
        config.output_dir = output_dir;
    }
    if let Some(rate) = args.sample_rate {
        config.sample_rate = rate;
    }
    if let Some(channels) = args.channels {
        config.channels = channels;
    }
    if let Some(tone_hz) = args.tone_hz {
        config.tone_hz = tone_hz;
    }

    let limit = args.duration.map(parse_duration).transpose()?;

    let mut capture_config = config.to_capture_config();
    capture_config.file_name = args.file_name;
    let format = capture_config.format;

    log::info!(
        "Configuration: source={:?}, output_dir={}, format={}",
        args.source,
        capture_config.output_dir.display(),
        format
    );

    std::fs::create_dir_all(&capture_config.output_dir).with_context(|| {
        format!(
            "Failed to create output directory: {}",
            capture_config.output_dir.display()
        )
    })?;

    // Generated sources with a duration are cut to an exact frame count and
    // run unpaced; without one they run in real time until a signal arrives.
    let frames = limit.map(|d| (d.as_secs_f64() * format.sample_rate as f64).round() as u64);
    let source: Box<dyn PcmSource> = match args.source {
        SourceKind::Stdin => Box::new(ReaderSource::new(std::io::stdin(), format)),
        SourceKind::Tone => {
            let tone = ToneSource::new(format, config.tone_hz, config.tone_amplitude)
                .context("Invalid tone parameters")?;
            match frames {
                Some(frames) => Box::new(tone.with_frames(frames)),
                None => Box::new(tone.paced()),
            }
        }
        SourceKind::Silence => {
            let silence = SilenceSource::new(format);
            match frames {
                Some(frames) => Box::new(silence.with_frames(frames)),
                None => Box::new(silence.paced()),
            }
        }
    };
    let timer = if args.source == SourceKind::Stdin { limit } else { None };

    let session = CaptureSession::start(capture_config, source, Arc::new(LoggingEventEmitter))
        .context("Failed to start capture")?;

    log::info!("Recording to {}", session.path().display());

    let stop_after = async {
        match timer {
            Some(limit) => tokio::time::sleep(limit).await,
            None => std::future::pending::<()>().await,
        }
    };

    tokio::select! {
        _ = shutdown_signal() => log::info!("Shutdown signal received, stopping capture..."),
        _ = stop_after => log::info!("Duration reached, stopping capture..."),
        _ = session.producer_finished() => log::info!("Source exhausted"),
    }

    if args.source == SourceKind::Stdin {
        log::debug!("Waiting for the pending stdin read to return");
    }

    let result = session.stop().await.context("Capture failed")?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        println!("{}", result.path.display());
        println!("length : {:.6}", result.duration_secs);
    }
    Ok(())
}

fn finalize(path: &Path) -> Result<()> {
    // Only patch files laid out as a canonical 44-byte header; anything else
    // (non-WAV data, extra chunks before `data`) is left untouched.
    let (header, _) = read_header(path)?;
    let data_bytes = finalize_wav_file(path)
        .with_context(|| format!("Failed to finalize {}", path.display()))?;

    println!("{}", path.display());
    println!("data bytes : {}", data_bytes);
    println!(
        "length : {:.6}",
        header.format.duration_secs(data_bytes as u64)
    );
    Ok(())
}

fn inspect(path: &Path, json: bool) -> Result<()> {
    let (header, file_len) = read_header(path)?;
    let report = InspectReport {
        path: path.to_path_buf(),
        file_len,
        finalized: header.is_finalized(file_len),
        consistent: header.is_consistent(),
        duration_secs: header.format.duration_secs(header.data_size as u64),
        header,
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    println!("{}", report.path.display());
    println!("format     : {}", header.format);
    println!("riff size  : {}", header.riff_size);
    println!("data size  : {}", header.data_size);
    println!("file size  : {}", report.file_len);
    println!("length     : {:.6}", report.duration_secs);
    println!("finalized  : {}", report.finalized);
    if !report.consistent {
        println!(
            "warning    : byte rate {} / block align {} do not match the format",
            header.byte_rate, header.block_align
        );
    }
    Ok(())
}

/// Reads and parses the header of `path`, returning it with the file length.
fn read_header(path: &Path) -> Result<(WavHeader, u64)> {
    let file = std::fs::File::open(path)
        .with_context(|| format!("Failed to open {}", path.display()))?;
    let file_len = file.metadata()?.len();

    let mut bytes = Vec::with_capacity(WAV_HEADER_LEN);
    file.take(WAV_HEADER_LEN as u64)
        .read_to_end(&mut bytes)
        .with_context(|| format!("Failed to read {}", path.display()))?;

    let header = WavHeader::parse(&bytes)
        .with_context(|| format!("Failed to parse WAV header of {}", path.display()))?;
    Ok((header, file_len))
}

fn parse_duration(secs: f64) -> Result<Duration> {
    if secs.is_nan() || secs <= 0.0 {
        bail!("Duration must be positive, got {secs}");
    }
    Duration::try_from_secs_f64(secs).with_context(|| format!("Invalid duration: {secs}"))
}

/// Waits for a shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
