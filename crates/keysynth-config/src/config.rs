//! The engine configuration file.

use crate::error::ConfigError;
use crate::validation::{ValidationError, ValidationResult, validate_config};
use keysynth_core::SampleFormat;
use keysynth_io::{DeviceRequest, SchedulerConfig};
use keysynth_synth::{AdsrEnvelope, KeyboardLayout, Waveform};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Complete keysynth configuration, one TOML table per section.
///
/// Every field has a default, so an empty file (or a missing section) is a
/// valid configuration.
///
/// ```toml
/// [audio]
/// sample_rate = 44100
/// sample_format = "i16"
///
/// [voice]
/// waveform = "triangle"
/// release = 0.5
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Output stream and block ring.
    pub audio: AudioConfig,
    /// Oscillator, envelope and level.
    pub voice: VoiceConfig,
    /// Keyboard note mapping.
    pub keyboard: KeyboardConfig,
}

/// The `[audio]` section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioConfig {
    /// Sample rate in Hz.
    pub sample_rate: u32,
    /// Interleaved output channels.
    pub channels: u16,
    /// Blocks in the ring.
    pub block_count: usize,
    /// Frames per block.
    pub block_samples: usize,
    /// PCM encoding: `i8`, `i16`, `i32` or `f32`.
    pub sample_format: String,
    /// Output device index or name; the default output when absent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub device: Option<String>,
}

impl Default for AudioConfig {
    fn default() -> Self {
        let scheduler = SchedulerConfig::default();
        Self {
            sample_rate: scheduler.sample_rate,
            channels: scheduler.channels,
            block_count: scheduler.block_count,
            block_samples: scheduler.block_samples,
            sample_format: SampleFormat::default().name().to_string(),
            device: None,
        }
    }
}

impl AudioConfig {
    /// Scheduler geometry for this section.
    pub fn scheduler_config(&self) -> SchedulerConfig {
        SchedulerConfig {
            sample_rate: self.sample_rate,
            channels: self.channels,
            block_count: self.block_count,
            block_samples: self.block_samples,
        }
    }

    /// Device request for this section.
    pub fn device_request(&self) -> DeviceRequest {
        self.scheduler_config().device_request(self.device.clone())
    }

    /// Parsed sample format.
    pub fn sample_format(&self) -> ValidationResult<SampleFormat> {
        SampleFormat::from_name(&self.sample_format)
            .ok_or_else(|| ValidationError::UnknownSampleFormat(self.sample_format.clone()))
    }
}

/// The `[voice]` section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VoiceConfig {
    /// Waveform name (see [`Waveform`]).
    pub waveform: String,
    /// Tone frequency in Hz for fixed-tone playback.
    pub frequency: f64,
    /// Attack time in seconds.
    pub attack: f64,
    /// Decay time in seconds.
    pub decay: f64,
    /// Sustain level.
    pub sustain: f64,
    /// Release time in seconds.
    pub release: f64,
    /// Peak level reached at the end of attack.
    pub start_amplitude: f64,
    /// Master volume applied after the envelope.
    pub volume: f64,
    /// Seed for the noise waveform; entropy-seeded when absent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub noise_seed: Option<u64>,
}

impl Default for VoiceConfig {
    fn default() -> Self {
        let envelope = AdsrEnvelope::default();
        Self {
            waveform: Waveform::Sine.name().to_string(),
            frequency: 220.0,
            attack: envelope.attack(),
            decay: envelope.decay(),
            sustain: envelope.sustain(),
            release: envelope.release(),
            start_amplitude: envelope.start_amplitude(),
            volume: 0.2,
            noise_seed: None,
        }
    }
}

impl VoiceConfig {
    /// Parsed waveform.
    pub fn waveform(&self) -> ValidationResult<Waveform> {
        self.waveform
            .parse()
            .map_err(|_| ValidationError::UnknownWaveform(self.waveform.clone()))
    }

    /// Envelope shape for this section.
    pub fn envelope(&self) -> AdsrEnvelope {
        AdsrEnvelope::new(
            self.attack,
            self.decay,
            self.sustain,
            self.release,
            self.start_amplitude,
        )
    }
}

/// The `[keyboard]` section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KeyboardConfig {
    /// Frequency of the first key in Hz.
    pub base_frequency: f64,
}

impl Default for KeyboardConfig {
    fn default() -> Self {
        Self {
            base_frequency: KeyboardLayout::default().base_frequency(),
        }
    }
}

impl KeyboardConfig {
    /// Key layout starting at `base_frequency`.
    pub fn layout(&self) -> KeyboardLayout {
        KeyboardLayout::default().with_base_frequency(self.base_frequency)
    }
}

impl EngineConfig {
    /// Load and validate a configuration file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content =
            std::fs::read_to_string(path).map_err(|e| ConfigError::read_file(path, e))?;
        Self::from_toml_str(&content)
    }

    /// Load from `path` if it exists, otherwise return the defaults.
    pub fn load_or_default(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        if path.exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    /// Parse and validate a TOML document.
    pub fn from_toml_str(toml_str: &str) -> Result<Self, ConfigError> {
        let config: EngineConfig = toml::from_str(toml_str)?;
        config.validate()?;
        Ok(config)
    }

    /// Save to a TOML file, creating parent directories as needed.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let path = path.as_ref();

        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
            && !parent.exists()
        {
            std::fs::create_dir_all(parent).map_err(|e| ConfigError::create_dir(parent, e))?;
        }

        let content = self.to_toml()?;
        std::fs::write(path, content).map_err(|e| ConfigError::write_file(path, e))?;
        Ok(())
    }

    /// Convert the configuration to a TOML string.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Check every field, collecting all problems.
    pub fn validate(&self) -> ValidationResult<()> {
        validate_config(self)
    }
}
