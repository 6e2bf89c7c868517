//! Event system for capture session lifecycle.
//!
//! This module provides:
//! - [`EventEmitter`] trait for the capture session to report progress
//! - [`CaptureEvent`] describing session start, finalization and failure
//!
//! Front-ends decide how events are delivered (log lines, JSON, UI).

mod emitter;

pub use emitter::{EventEmitter, LoggingEventEmitter, NoopEventEmitter};

use std::path::PathBuf;

use serde::Serialize;

use crate::wav::AudioFormat;

/// Events related to capture session state changes.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum CaptureEvent {
    /// The header was written and the producer is running.
    Started {
        /// The unique identifier for the session.
        #[serde(rename = "sessionId")]
        session_id: String,
        /// File receiving the capture.
        path: PathBuf,
        /// Format declared in the header.
        format: AudioFormat,
        /// Unix timestamp in milliseconds.
        timestamp: u64,
    },
    /// The producer stopped and the size fields were patched.
    Finalized {
        /// The unique identifier for the session.
        #[serde(rename = "sessionId")]
        session_id: String,
        /// The finalized file.
        path: PathBuf,
        /// PCM payload size in bytes.
        #[serde(rename = "dataBytes")]
        data_bytes: u32,
        /// Playback duration in seconds.
        #[serde(rename = "durationSecs")]
        duration_secs: f64,
        /// Unix timestamp in milliseconds.
        timestamp: u64,
    },
    /// The session ended with an error.
    Failed {
        /// The unique identifier for the session.
        #[serde(rename = "sessionId")]
        session_id: String,
        /// File the capture was written to.
        path: PathBuf,
        /// Machine-readable error code.
        code: &'static str,
        /// Error message describing the failure.
        error: String,
        /// Unix timestamp in milliseconds.
        timestamp: u64,
    },
}

impl CaptureEvent {
    /// Returns the session the event belongs to.
    pub fn session_id(&self) -> &str {
        match self {
            Self::Started { session_id, .. }
            | Self::Finalized { session_id, .. }
            | Self::Failed { session_id, .. } => session_id,
        }
    }
}
