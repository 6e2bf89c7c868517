use std::f64::consts::TAU;

use playcap_core::{AudioFormat, PcmSource, SessionResult};
use thiserror::Error;

use crate::Pacer;

/// Invalid tone parameters.
#[derive(Debug, Error, PartialEq)]
pub enum ToneError {
    /// Frequency is not positive or at/above the Nyquist limit.
    #[error("tone frequency {freq} Hz must be in (0, {nyquist}) for this sample rate")]
    InvalidFrequency {
        /// Requested frequency.
        freq: f64,
        /// Half the sample rate.
        nyquist: f64,
    },

    /// Amplitude outside `[0, 1]`.
    #[error("tone amplitude {0} must be within [0, 1]")]
    InvalidAmplitude(f64),
}

/// Deterministic sine tone, identical on every channel.
pub struct ToneSource {
    format: AudioFormat,
    step: f64,
    amplitude: f64,
    phase: f64,
    remaining_frames: Option<u64>,
    pacer: Option<Pacer>,
}

impl ToneSource {
    /// Creates an endless tone of `freq` Hz at `amplitude` (0..=1) full scale.
    ///
    /// # Errors
    ///
    /// Returns [`ToneError`] when the frequency or amplitude is out of range.
    pub fn new(format: AudioFormat, freq: f64, amplitude: f64) -> Result<Self, ToneError> {
        let nyquist = format.sample_rate as f64 / 2.0;
        if !(freq > 0.0 && freq < nyquist) {
            return Err(ToneError::InvalidFrequency { freq, nyquist });
        }
        if !(0.0..=1.0).contains(&amplitude) {
            return Err(ToneError::InvalidAmplitude(amplitude));
        }

        Ok(Self {
            format,
            step: TAU * freq / format.sample_rate as f64,
            amplitude,
            phase: 0.0,
            remaining_frames: None,
            pacer: None,
        })
    }

    /// Limits the tone to `frames` frames per channel.
    pub fn with_frames(mut self, frames: u64) -> Self {
        self.remaining_frames = Some(frames);
        self
    }

    /// Delivers frames no faster than real time.
    pub fn paced(mut self) -> Self {
        self.pacer = Some(Pacer::new(self.format.sample_rate));
        self
    }
}

impl PcmSource for ToneSource {
    fn format(&self) -> AudioFormat {
        self.format
    }

    fn read(&mut self, buf: &mut [i16]) -> SessionResult<usize> {
        let channels = self.format.channels.max(1) as usize;
        let frames = frames_to_emit(buf.len() / channels, &mut self.remaining_frames);

        for frame in buf[..frames * channels].chunks_exact_mut(channels) {
            let value = (self.phase.sin() * self.amplitude * i16::MAX as f64).round() as i16;
            frame.fill(value);
            self.phase = (self.phase + self.step) % TAU;
        }

        if let Some(pacer) = &mut self.pacer {
            pacer.pace(frames as u64);
        }
        Ok(frames * channels)
    }
}

/// Digital silence.
pub struct SilenceSource {
    format: AudioFormat,
    remaining_frames: Option<u64>,
    pacer: Option<Pacer>,
}

impl SilenceSource {
    /// Creates endless silence in `format`.
    pub fn new(format: AudioFormat) -> Self {
        Self {
            format,
            remaining_frames: None,
            pacer: None,
        }
    }

    /// Limits the silence to `frames` frames per channel.
    pub fn with_frames(mut self, frames: u64) -> Self {
        self.remaining_frames = Some(frames);
        self
    }

    /// Delivers frames no faster than real time.
    pub fn paced(mut self) -> Self {
        self.pacer = Some(Pacer::new(self.format.sample_rate));
        self
    }
}

impl PcmSource for SilenceSource {
    fn format(&self) -> AudioFormat {
        self.format
    }

    fn read(&mut self, buf: &mut [i16]) -> SessionResult<usize> {
        let channels = self.format.channels.max(1) as usize;
        let frames = frames_to_emit(buf.len() / channels, &mut self.remaining_frames);
        buf[..frames * channels].fill(0);

        if let Some(pacer) = &mut self.pacer {
            pacer.pace(frames as u64);
        }
        Ok(frames * channels)
    }
}

/// Caps a read at the remaining frame budget and charges it.
fn frames_to_emit(capacity: usize, remaining: &mut Option<u64>) -> usize {
    match remaining {
        Some(left) => {
            let frames = (*left).min(capacity as u64) as usize;
            *left -= frames as u64;
            frames
        }
        None => capacity,
    }
}
