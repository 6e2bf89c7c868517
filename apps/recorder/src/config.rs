//! Recorder configuration.
//!
//! Supports loading from YAML files with environment variable overrides.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use playcap_core::protocol_constants::{
    DEFAULT_CHANNELS, DEFAULT_SAMPLES_PER_READ, DEFAULT_SAMPLE_RATE,
};
use playcap_core::{AudioFormat, CaptureConfig};
use serde::Deserialize;

/// Recorder configuration loaded from YAML with environment overrides.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct RecorderConfig {
    /// Directory receiving capture files.
    /// Override: `PLAYCAP_OUTPUT_DIR`
    pub output_dir: PathBuf,

    /// Capture sample rate in Hz.
    /// Override: `PLAYCAP_SAMPLE_RATE`
    pub sample_rate: u32,

    /// Interleaved channel count.
    /// Override: `PLAYCAP_CHANNELS`
    pub channels: u16,

    /// Samples (across all channels) pulled from the source per read.
    pub samples_per_read: usize,

    /// Frequency of the test tone source.
    pub tone_hz: f64,

    /// Amplitude of the test tone source, 0..=1 of full scale.
    pub tone_amplitude: f64,
}

impl Default for RecorderConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("."),
            sample_rate: DEFAULT_SAMPLE_RATE,
            channels: DEFAULT_CHANNELS,
            samples_per_read: DEFAULT_SAMPLES_PER_READ,
            tone_hz: 440.0,
            tone_amplitude: 0.25,
        }
    }
}

impl RecorderConfig {
    /// Loads configuration from a YAML file, then applies environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = if let Some(path) = path {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file: {}", path.display()))?;
            serde_yaml::from_str(&content)
                .with_context(|| format!("Failed to parse config file: {}", path.display()))?
        } else {
            Self::default()
        };

        config.apply_overrides(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Applies overrides looked up by environment variable name.
    ///
    /// Values that fail to parse are ignored.
    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(val) = lookup("PLAYCAP_OUTPUT_DIR") {
            if !val.is_empty() {
                self.output_dir = PathBuf::from(val);
            }
        }

        if let Some(val) = lookup("PLAYCAP_SAMPLE_RATE") {
            if let Ok(rate) = val.parse() {
                self.sample_rate = rate;
            }
        }

        if let Some(val) = lookup("PLAYCAP_CHANNELS") {
            if let Ok(channels) = val.parse() {
                self.channels = channels;
            }
        }
    }

    /// Format declared for new captures.
    pub fn format(&self) -> AudioFormat {
        AudioFormat::pcm16(self.sample_rate, self.channels)
    }

    /// Converts to playcap-core's CaptureConfig type.
    pub fn to_capture_config(&self) -> CaptureConfig {
        CaptureConfig {
            output_dir: self.output_dir.clone(),
            format: self.format(),
            samples_per_read: self.samples_per_read,
            file_name: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::TempDir;

    fn lookup_from(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn defaults_match_capture_format() {
        let config = RecorderConfig::default();
        assert_eq!(config.format(), AudioFormat::default());
        assert!(config.to_capture_config().validate().is_ok());
    }

    #[test]
    fn partial_yaml_keeps_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("recorder.yaml");
        std::fs::write(&path, "sample_rate: 48000\noutput_dir: /tmp/captures\n").unwrap();

        let config = RecorderConfig::load(Some(&path)).unwrap();

        assert_eq!(config.sample_rate, 48000);
        assert_eq!(config.output_dir, PathBuf::from("/tmp/captures"));
        assert_eq!(config.channels, DEFAULT_CHANNELS);
        assert_eq!(config.samples_per_read, DEFAULT_SAMPLES_PER_READ);
    }

    #[test]
    fn unreadable_file_is_an_error() {
        let temp_dir = TempDir::new().unwrap();
        let err = RecorderConfig::load(Some(&temp_dir.path().join("missing.yaml"))).unwrap_err();
        assert!(err.to_string().contains("Failed to read config file"));
    }

    #[test]
    fn malformed_yaml_is_an_error() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("bad.yaml");
        std::fs::write(&path, "sample_rate: [not, a, number]\n").unwrap();

        let err = RecorderConfig::load(Some(&path)).unwrap_err();
        assert!(err.to_string().contains("Failed to parse config file"));
    }

    #[test]
    fn overrides_replace_values() {
        let mut config = RecorderConfig::default();
        config.apply_overrides(lookup_from(&[
            ("PLAYCAP_OUTPUT_DIR", "/data/captures"),
            ("PLAYCAP_SAMPLE_RATE", "44100"),
            ("PLAYCAP_CHANNELS", "1"),
        ]));

        assert_eq!(config.output_dir, PathBuf::from("/data/captures"));
        assert_eq!(config.format(), AudioFormat::pcm16(44100, 1));
    }

    #[test]
    fn unparsable_overrides_are_ignored() {
        let mut config = RecorderConfig::default();
        config.apply_overrides(lookup_from(&[
            ("PLAYCAP_SAMPLE_RATE", "fast"),
            ("PLAYCAP_CHANNELS", "-2"),
        ]));

        assert_eq!(config.sample_rate, DEFAULT_SAMPLE_RATE);
        assert_eq!(config.channels, DEFAULT_CHANNELS);
    }
}
