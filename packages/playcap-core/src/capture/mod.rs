//! Capture sessions.
//!
//! A session owns one output file for its whole lifetime:
//!
//! - [`CaptureSession::start`] writes the placeholder header synchronously and
//!   spawns a single blocking producer that pulls samples from a [`PcmSource`]
//! - the producer checks a cancellation token between reads, so the chunk in
//!   flight is always written before it exits
//! - [`CaptureSession::stop`] / [`CaptureSession::wait`] join the producer and
//!   only then reopen the file to patch the size fields
//!
//! The finalized artifact is returned as a [`CaptureResult`] rather than kept
//! in shared state, so overlapping sessions never race on "the latest file".

mod session;

pub use session::CaptureSession;

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Serialize;

use crate::error::{CaptureError, SessionResult};
use crate::protocol_constants::DEFAULT_SAMPLES_PER_READ;
use crate::wav::AudioFormat;

/// A blocking producer of interleaved 16-bit PCM samples.
///
/// Implemented by capture devices and by the portable sources in
/// `playcap-capture`. A read should return within roughly one buffer period
/// so that cancellation is observed promptly.
pub trait PcmSource: Send {
    /// Format of the samples this source delivers.
    fn format(&self) -> AudioFormat;

    /// Fills `buf` with interleaved samples and returns how many were written.
    ///
    /// Returns `Ok(0)` once the source is exhausted. Implementations must only
    /// return whole frames (a multiple of the channel count).
    fn read(&mut self, buf: &mut [i16]) -> SessionResult<usize>;
}

impl<S: PcmSource + ?Sized> PcmSource for Box<S> {
    fn format(&self) -> AudioFormat {
        (**self).format()
    }

    fn read(&mut self, buf: &mut [i16]) -> SessionResult<usize> {
        (**self).read(buf)
    }
}

/// Configuration for a capture session.
#[derive(Debug, Clone)]
pub struct CaptureConfig {
    /// Directory receiving capture files (created if missing).
    pub output_dir: PathBuf,
    /// Format written to the header; the source must deliver the same.
    pub format: AudioFormat,
    /// Samples (across all channels) requested from the source per read.
    pub samples_per_read: usize,
    /// Explicit file name. When `None`, a timestamped name is generated.
    pub file_name: Option<String>,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("."),
            format: AudioFormat::default(),
            samples_per_read: DEFAULT_SAMPLES_PER_READ,
            file_name: None,
        }
    }
}

impl CaptureConfig {
    /// Creates a configuration writing default-format captures to `output_dir`.
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
            ..Default::default()
        }
    }

    /// Validates the configuration values.
    ///
    /// # Errors
    ///
    /// Returns an error if the format is invalid or the read size is not a
    /// positive whole number of frames.
    pub fn validate(&self) -> SessionResult<()> {
        self.format.validate()?;
        if self.samples_per_read == 0 {
            return Err(CaptureError::Configuration(
                "samples_per_read must be >= 1".to_string(),
            ));
        }
        if self.samples_per_read % self.format.channels as usize != 0 {
            return Err(CaptureError::Configuration(format!(
                "samples_per_read ({}) must be a multiple of the channel count ({})",
                self.samples_per_read, self.format.channels
            )));
        }
        if let Some(name) = &self.file_name {
            let is_bare = Path::new(name)
                .file_name()
                .is_some_and(|n| n == name.as_str());
            if !is_bare {
                return Err(CaptureError::Configuration(format!(
                    "file_name must be a bare file name, got {name:?}"
                )));
            }
        }
        Ok(())
    }
}

/// Real-time statistics of a running session.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CaptureStats {
    /// PCM bytes appended so far.
    pub data_bytes: u64,
    /// Captured audio in seconds.
    pub duration_secs: f64,
    /// Whether the producer is still running.
    pub is_recording: bool,
}

/// Outcome of a finalized session.
///
/// Carries everything an exporter needs: where the file is and how much audio
/// it holds.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CaptureResult {
    /// Unique identifier of the session.
    pub session_id: String,
    /// The finalized WAV file.
    pub path: PathBuf,
    /// Format declared in the header.
    pub format: AudioFormat,
    /// PCM payload size in bytes (the data chunk size).
    pub data_bytes: u32,
    /// Playback duration in seconds.
    pub duration_secs: f64,
}

impl CaptureResult {
    /// Playback duration of the captured audio.
    pub fn duration(&self) -> Duration {
        self.format.duration_of(self.data_bytes as u64)
    }

    /// Total size of the finalized file in bytes.
    pub fn file_len(&self) -> u64 {
        self.data_bytes as u64 + crate::protocol_constants::WAV_HEADER_LEN as u64
    }
}
