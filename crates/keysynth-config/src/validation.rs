//! Configuration validation.
//!
//! Every section is checked field by field and all problems are reported at
//! once: a single problem comes back as itself, several as
//! [`ValidationError::Multiple`].
//!
//! # Example
//!
//! ```rust
//! use keysynth_config::{EngineConfig, ValidationError};
//!
//! let mut config = EngineConfig::default();
//! config.audio.channels = 0;
//! config.voice.sustain = 1.5;
//!
//! match config.validate() {
//!     Err(ValidationError::Multiple(errors)) => assert_eq!(errors.len(), 2),
//!     other => panic!("expected two errors, got {other:?}"),
//! }
//! ```

use crate::config::{AudioConfig, EngineConfig, KeyboardConfig, VoiceConfig};
use keysynth_core::SampleFormat;
use keysynth_synth::Waveform;
use thiserror::Error;

/// Validation error types.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ValidationError {
    /// Numeric field out of range.
    #[error("'{field}' value {value} out of range [{min}, {max}]")]
    OutOfRange {
        /// Dotted field path, e.g. `audio.sample_rate`.
        field: String,
        /// The value that was out of range.
        value: f64,
        /// Minimum allowed value.
        min: f64,
        /// Maximum allowed value.
        max: f64,
    },

    /// Unrecognized waveform name.
    #[error("unknown waveform: {0}")]
    UnknownWaveform(String),

    /// Unrecognized sample format name.
    #[error("unknown sample format: {0} (expected i8, i16, i32 or f32)")]
    UnknownSampleFormat(String),

    /// Multiple validation errors.
    #[error("multiple validation errors: {}", .0.iter().map(|e| e.to_string()).collect::<Vec<_>>().join("; "))]
    Multiple(Vec<ValidationError>),
}

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Allowed sample rates in Hz.
pub const SAMPLE_RATE_RANGE: (f64, f64) = (8000.0, 192_000.0);
/// Allowed interleaved channel counts.
pub const CHANNELS_RANGE: (f64, f64) = (1.0, 8.0);
/// Allowed ring sizes.
pub const BLOCK_COUNT_RANGE: (f64, f64) = (2.0, 256.0);
/// Allowed frames per block.
pub const BLOCK_SAMPLES_RANGE: (f64, f64) = (16.0, 16384.0);
/// Allowed oscillator and keyboard frequencies in Hz.
pub const FREQUENCY_RANGE: (f64, f64) = (1.0, 20_000.0);
/// Allowed attack, decay and release times in seconds.
pub const STAGE_TIME_RANGE: (f64, f64) = (0.0, 60.0);
/// Allowed levels (sustain, start amplitude, volume).
pub const LEVEL_RANGE: (f64, f64) = (0.0, 1.0);

fn check(errors: &mut Vec<ValidationError>, field: &str, value: f64, (min, max): (f64, f64)) {
    // NaN fails both comparisons, so test for containment.
    if !(min..=max).contains(&value) {
        errors.push(ValidationError::OutOfRange {
            field: field.to_string(),
            value,
            min,
            max,
        });
    }
}

/// Collapses collected errors into a result.
pub fn collect(mut errors: Vec<ValidationError>) -> ValidationResult<()> {
    match errors.len() {
        0 => Ok(()),
        1 => Err(errors.remove(0)),
        _ => Err(ValidationError::Multiple(errors)),
    }
}

/// Problems in the `[audio]` section.
pub fn audio_errors(audio: &AudioConfig) -> Vec<ValidationError> {
    let mut errors = Vec::new();
    check(&mut errors, "audio.sample_rate", f64::from(audio.sample_rate), SAMPLE_RATE_RANGE);
    check(&mut errors, "audio.channels", f64::from(audio.channels), CHANNELS_RANGE);
    check(&mut errors, "audio.block_count", audio.block_count as f64, BLOCK_COUNT_RANGE);
    check(&mut errors, "audio.block_samples", audio.block_samples as f64, BLOCK_SAMPLES_RANGE);
    if SampleFormat::from_name(&audio.sample_format).is_none() {
        errors.push(ValidationError::UnknownSampleFormat(audio.sample_format.clone()));
    }
    errors
}

/// Problems in the `[voice]` section.
pub fn voice_errors(voice: &VoiceConfig) -> Vec<ValidationError> {
    let mut errors = Vec::new();
    if voice.waveform.parse::<Waveform>().is_err() {
        errors.push(ValidationError::UnknownWaveform(voice.waveform.clone()));
    }
    check(&mut errors, "voice.frequency", voice.frequency, FREQUENCY_RANGE);
    check(&mut errors, "voice.attack", voice.attack, STAGE_TIME_RANGE);
    check(&mut errors, "voice.decay", voice.decay, STAGE_TIME_RANGE);
    check(&mut errors, "voice.sustain", voice.sustain, LEVEL_RANGE);
    check(&mut errors, "voice.release", voice.release, STAGE_TIME_RANGE);
    check(&mut errors, "voice.start_amplitude", voice.start_amplitude, LEVEL_RANGE);
    check(&mut errors, "voice.volume", voice.volume, LEVEL_RANGE);
    errors
}

/// Problems in the `[keyboard]` section.
pub fn keyboard_errors(keyboard: &KeyboardConfig) -> Vec<ValidationError> {
    let mut errors = Vec::new();
    check(&mut errors, "keyboard.base_frequency", keyboard.base_frequency, FREQUENCY_RANGE);
    errors
}

/// Validates a whole configuration.
pub fn validate_config(config: &EngineConfig) -> ValidationResult<()> {
    let mut errors = audio_errors(&config.audio);
    errors.extend(voice_errors(&config.voice));
    errors.extend(keyboard_errors(&config.keyboard));
    collect(errors)
}
