//! Centralized error types for the Playcap core library.
//!
//! This module provides a unified error handling system that:
//! - Defines structured error types using `thiserror`
//! - Separates container-level failures ([`WavError`]) from session-level
//!   failures ([`CaptureError`])
//! - Exposes machine-readable codes through [`ErrorCode`]

use std::io;

use thiserror::Error;

use crate::protocol_constants::WAV_HEADER_LEN;

/// Trait for error types that provide machine-readable error codes.
///
/// Implement this trait to provide consistent error codes across different
/// error conversion paths (CLI JSON output, events).
pub trait ErrorCode {
    /// Returns a machine-readable error code.
    fn code(&self) -> &'static str;
}

/// Errors produced while writing, finalizing or parsing a WAV container.
#[derive(Debug, Error)]
pub enum WavError {
    /// The underlying sink or target rejected a read, write or seek.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Finalize was called on a target shorter than the 44-byte header.
    ///
    /// The capture was aborted before the header was fully written. The size
    /// fields are left untouched and the file must not be treated as playable.
    #[error("incomplete header: target is {len} bytes, expected at least {min}", min = WAV_HEADER_LEN)]
    IncompleteHeader {
        /// Total length of the target in bytes.
        len: u64,
    },

    /// The total length does not fit the 32-bit RIFF size fields.
    #[error("capture of {len} bytes exceeds the 32-bit WAV size fields")]
    SizeOverflow {
        /// Total length of the target in bytes.
        len: u64,
    },

    /// Format parameters cannot describe a 16-bit PCM stream.
    #[error("invalid format: {0}")]
    InvalidFormat(String),

    /// Header bytes are not a canonical PCM WAV header.
    #[error("invalid header: {0}")]
    InvalidHeader(String),

    /// A sample chunk ended in the middle of a frame.
    #[error("chunk of {len} bytes is not a multiple of the {block_align}-byte frame")]
    PartialFrame {
        /// Chunk length in bytes.
        len: usize,
        /// Bytes per interleaved frame.
        block_align: u16,
    },
}

impl ErrorCode for WavError {
    fn code(&self) -> &'static str {
        match self {
            Self::Io(_) => "sink_write_failed",
            Self::IncompleteHeader { .. } => "incomplete_header",
            Self::SizeOverflow { .. } => "size_overflow",
            Self::InvalidFormat(_) => "invalid_format",
            Self::InvalidHeader(_) => "invalid_header",
            Self::PartialFrame { .. } => "partial_frame",
        }
    }
}

/// Errors produced by a capture session.
#[derive(Debug, Error)]
pub enum CaptureError {
    /// Writing or finalizing the container failed.
    #[error(transparent)]
    Wav(#[from] WavError),

    /// Creating the output directory or file failed.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The PCM source failed to deliver samples.
    #[error("source error: {0}")]
    Source(String),

    /// The source delivers a different format than the session was configured for.
    #[error("format mismatch: session expects {expected}, source delivers {found}")]
    FormatMismatch {
        /// Format the session header was written with.
        expected: String,
        /// Format reported by the source.
        found: String,
    },

    /// Session configuration is unusable.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// The producer task panicked or was aborted before it could close the file.
    #[error("capture producer terminated abnormally: {0}")]
    ProducerPanicked(String),
}

impl CaptureError {
    /// Creates a source error from any displayable value.
    pub fn source_failed(message: impl Into<String>) -> Self {
        Self::Source(message.into())
    }
}

impl ErrorCode for CaptureError {
    fn code(&self) -> &'static str {
        match self {
            Self::Wav(err) => err.code(),
            Self::Io(_) => "io_error",
            Self::Source(_) => "source_failed",
            Self::FormatMismatch { .. } => "format_mismatch",
            Self::Configuration(_) => "configuration_error",
            Self::ProducerPanicked(_) => "producer_panicked",
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Result Type Aliases
// ─────────────────────────────────────────────────────────────────────────────

/// Result alias for container operations.
pub type WavResult<T> = Result<T, WavError>;

/// Result alias for capture session operations.
pub type SessionResult<T> = Result<T, CaptureError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn incomplete_header_returns_correct_code() {
        let err = WavError::IncompleteHeader { len: 43 };
        assert_eq!(err.code(), "incomplete_header");
        assert!(err.to_string().contains("43 bytes"));
    }

    #[test]
    fn capture_error_forwards_wav_code() {
        let err = CaptureError::from(WavError::SizeOverflow { len: u64::MAX });
        assert_eq!(err.code(), "size_overflow");
    }

    #[test]
    fn io_errors_map_to_sink_write_code() {
        let err = WavError::from(io::Error::other("disk full"));
        assert_eq!(err.code(), "sink_write_failed");
    }
}
