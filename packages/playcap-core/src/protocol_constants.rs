//! Fixed protocol constants that should NOT be changed.
//!
//! These values are defined by the RIFF/WAVE container format or fix the
//! capture format shared by the header writer and every PCM producer.

// ─────────────────────────────────────────────────────────────────────────────
// RIFF/WAVE Layout
// ─────────────────────────────────────────────────────────────────────────────

/// Size of the canonical PCM WAV header (RIFF + fmt + data chunk headers).
pub const WAV_HEADER_LEN: usize = 44;

/// Byte offset of the RIFF chunk size field (total file length - 8).
pub const RIFF_SIZE_OFFSET: u64 = 4;

/// Byte offset of the data chunk size field (total file length - 44).
pub const DATA_SIZE_OFFSET: u64 = 40;

/// Bytes of the RIFF header that are not counted by the RIFF chunk size.
pub const RIFF_PREAMBLE_LEN: u64 = 8;

/// Size of the `fmt ` chunk body for plain PCM (no extension).
pub const FMT_CHUNK_SIZE: u32 = 16;

/// WAVE format tag for integer PCM.
pub const WAVE_FORMAT_PCM: u16 = 1;

/// Largest data payload whose RIFF chunk size (`data + 36`) still fits in 32 bits.
pub const MAX_WAV_DATA_BYTES: u64 = u32::MAX as u64 - (WAV_HEADER_LEN as u64 - RIFF_PREAMBLE_LEN);

// ─────────────────────────────────────────────────────────────────────────────
// Capture Format
// ─────────────────────────────────────────────────────────────────────────────

/// Default capture sample rate (Hz).
///
/// 16kHz keeps playback captures small while covering speech and most media.
pub const DEFAULT_SAMPLE_RATE: u32 = 16000;

/// Default number of audio channels (stereo).
pub const DEFAULT_CHANNELS: u16 = 2;

/// Bit depth of every PCM stream written by this crate.
pub const PCM_BITS_PER_SAMPLE: u16 = 16;

/// Samples requested from a source per read.
pub const DEFAULT_SAMPLES_PER_READ: usize = 1024;

/// File extension of finalized captures.
pub const WAV_EXTENSION: &str = "wav";
