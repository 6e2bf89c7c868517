//! Playcap Core - shared library for Playcap.
//!
//! This crate provides the core functionality for Playcap, a recorder that
//! captures playback audio as 16-bit PCM and stores it in a WAV file whose
//! header is written before the audio length is known.
//!
//! # Architecture
//!
//! The crate is organized into several modules:
//!
//! - [`wav`]: Streaming WAV container (header, append, finalize, parse)
//! - [`capture`]: Capture sessions driving a [`PcmSource`] into a file
//! - [`events`]: Event system for session lifecycle reporting
//! - [`protocol_constants`]: RIFF layout and default capture format
//! - [`error`]: Centralized error types
//!
//! # Abstraction Traits
//!
//! - [`PcmSource`](capture::PcmSource): Anything that yields interleaved samples
//! - [`EventEmitter`](events::EventEmitter): Emitting session events
//!
//! Platform capture devices implement [`PcmSource`]; portable sources live in
//! the `playcap-capture` crate.

#![warn(clippy::all)]

pub mod capture;
pub mod error;
pub mod events;
pub mod protocol_constants;
pub mod utils;
pub mod wav;

// Re-export commonly used types at the crate root
pub use capture::{CaptureConfig, CaptureResult, CaptureSession, CaptureStats, PcmSource};
pub use error::{CaptureError, ErrorCode, SessionResult, WavError, WavResult};
pub use events::{CaptureEvent, EventEmitter, LoggingEventEmitter, NoopEventEmitter};
pub use utils::now_millis;

// Re-export container types
pub use wav::{
    create_wav_header, encode_samples_le, finalize_wav, finalize_wav_file, write_wav_header,
    AudioFormat, WavHeader, WavSink,
};
