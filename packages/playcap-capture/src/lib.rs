//! Portable PCM sources for Playcap capture sessions.
//!
//! Platform capture devices are external to this workspace; these sources let
//! a session run anywhere:
//!
//! - [`ReaderSource`]: raw s16le interleaved PCM from any reader (stdin, pipes, files)
//! - [`ToneSource`]: a deterministic sine tone
//! - [`SilenceSource`]: digital silence
//!
//! Generated sources can be paced to wall-clock time with [`Pacer`] so that
//! a session stopped by a signal holds roughly the elapsed duration.

mod pacing;
mod reader;
mod tone;

pub use pacing::Pacer;
pub use reader::ReaderSource;
pub use tone::{SilenceSource, ToneError, ToneSource};
