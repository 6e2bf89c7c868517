//! Streaming WAV container.
//!
//! A capture file is written in three phases:
//!
//! 1. [`write_wav_header`] emits the 44-byte canonical header with both size
//!    fields set to zero, before any audio length is known.
//! 2. PCM bytes (16-bit signed, little-endian, channel-interleaved) are
//!    appended after the header, usually through a [`WavSink`].
//! 3. [`finalize_wav`] seeks back and overwrites the RIFF and data chunk sizes
//!    once the producer has stopped.
//!
//! [`WavHeader`] parses the header back for inspection and repair.

pub mod finalize;
pub mod header;
pub mod sink;

pub use finalize::{finalize_wav, finalize_wav_file};
pub use header::{create_wav_header, write_wav_header, WavHeader};
pub use sink::{encode_samples_le, WavSink};

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{WavError, WavResult};
use crate::protocol_constants::{DEFAULT_CHANNELS, DEFAULT_SAMPLE_RATE, PCM_BITS_PER_SAMPLE};

/// Audio format of a capture.
///
/// Describes the PCM stream being written, used for:
/// - WAV header generation (sample rate, channels, bit depth)
/// - Chunk sizing for sources
/// - Duration computation from the finalized data size
///
/// A single value is threaded from session start through header write and
/// duration computation so the header always matches the samples.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AudioFormat {
    pub sample_rate: u32,
    pub channels: u16,
    pub bits_per_sample: u16,
}

impl AudioFormat {
    /// Creates a new audio format configuration.
    pub fn new(sample_rate: u32, channels: u16, bits_per_sample: u16) -> Self {
        Self {
            sample_rate,
            channels,
            bits_per_sample,
        }
    }

    /// Creates a 16-bit PCM format, the only bit depth this crate writes.
    pub fn pcm16(sample_rate: u32, channels: u16) -> Self {
        Self::new(sample_rate, channels, PCM_BITS_PER_SAMPLE)
    }

    /// Checks that the format can be encoded in a canonical PCM header.
    ///
    /// # Errors
    ///
    /// Returns [`WavError::InvalidFormat`] for zero channels, a zero sample
    /// rate, a bit depth other than 16, or a byte rate beyond 32 bits.
    pub fn validate(&self) -> WavResult<()> {
        if self.channels == 0 {
            return Err(WavError::InvalidFormat("channels must be >= 1".to_string()));
        }
        if self.sample_rate == 0 {
            return Err(WavError::InvalidFormat(
                "sample_rate must be >= 1".to_string(),
            ));
        }
        if self.bits_per_sample != PCM_BITS_PER_SAMPLE {
            return Err(WavError::InvalidFormat(format!(
                "only {}-bit PCM is supported, got {}-bit",
                PCM_BITS_PER_SAMPLE, self.bits_per_sample
            )));
        }

        let block_align = self.channels as u64 * self.bytes_per_sample() as u64;
        if block_align > u16::MAX as u64 {
            return Err(WavError::InvalidFormat(format!(
                "{} channels exceed the 16-bit block align field",
                self.channels
            )));
        }
        if self.sample_rate as u64 * block_align > u32::MAX as u64 {
            return Err(WavError::InvalidFormat(format!(
                "byte rate of {} Hz x {} bytes exceeds 32 bits",
                self.sample_rate, block_align
            )));
        }
        Ok(())
    }

    /// Returns bytes per sample (2 for 16-bit audio).
    #[inline]
    pub const fn bytes_per_sample(&self) -> u16 {
        self.bits_per_sample / 8
    }

    /// Returns bytes per interleaved frame (one sample for every channel).
    #[inline]
    pub const fn block_align(&self) -> u16 {
        self.channels.wrapping_mul(self.bytes_per_sample())
    }

    /// Returns bytes per second of audio.
    #[inline]
    pub const fn byte_rate(&self) -> u32 {
        self.sample_rate.wrapping_mul(self.block_align() as u32)
    }

    /// Calculates the byte length of `samples_per_channel` frames.
    ///
    /// Uses saturating arithmetic to prevent overflow with extreme values.
    #[inline]
    pub fn frame_bytes(&self, samples_per_channel: usize) -> usize {
        samples_per_channel.saturating_mul(self.block_align() as usize)
    }

    /// Returns the playback duration of `data_bytes` of PCM, in seconds.
    ///
    /// `data_bytes / bytes_per_sample / channels / sample_rate`.
    pub fn duration_secs(&self, data_bytes: u64) -> f64 {
        if self.block_align() == 0 || self.sample_rate == 0 {
            return 0.0;
        }
        data_bytes as f64
            / self.bytes_per_sample() as f64
            / self.channels as f64
            / self.sample_rate as f64
    }

    /// Returns the playback duration of `data_bytes` of PCM.
    ///
    /// Trailing bytes that do not form a whole frame are ignored.
    pub fn duration_of(&self, data_bytes: u64) -> Duration {
        let block_align = self.block_align() as u64;
        if block_align == 0 || self.sample_rate == 0 {
            return Duration::ZERO;
        }
        let frames = data_bytes / block_align;
        let rate = self.sample_rate as u64;
        let secs = frames / rate;
        let nanos = (frames % rate) * 1_000_000_000 / rate;
        Duration::new(secs, nanos as u32)
    }
}

impl Default for AudioFormat {
    fn default() -> Self {
        Self {
            sample_rate: DEFAULT_SAMPLE_RATE,
            channels: DEFAULT_CHANNELS,
            bits_per_sample: PCM_BITS_PER_SAMPLE,
        }
    }
}

impl fmt::Display for AudioFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} Hz, {} ch, {}-bit",
            self.sample_rate, self.channels, self.bits_per_sample
        )
    }
}
