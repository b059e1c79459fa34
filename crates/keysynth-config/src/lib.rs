//! Configuration for the keysynth engine.
//!
//! A single TOML file describes the output stream, the voice, and the
//! keyboard mapping. Missing fields take the defaults of the underlying
//! crates: 44.1 kHz mono 16-bit output through 8 blocks of 512 frames, a
//! sine voice with a 0.1 / 0.01 / 0.8 / 0.2 envelope, and a keyboard rooted
//! at 110 Hz.
//!
//! # Features
//!
//! - **Loading and saving**: [`EngineConfig::load`], [`EngineConfig::save`],
//!   [`EngineConfig::load_or_default`]
//! - **Validation**: every field checked, all problems reported together
//! - **Conversion**: sections convert into `keysynth-io` and `keysynth-synth`
//!   types
//! - **Paths**: platform-specific config directory
//!
//! # Example
//!
//! ```rust
//! use keysynth_config::EngineConfig;
//!
//! let config = EngineConfig::from_toml_str(
//!     r#"
//!     [audio]
//!     block_samples = 256
//!
//!     [voice]
//!     waveform = "square"
//!     "#,
//! )?;
//!
//! let scheduler = config.audio.scheduler_config();
//! assert_eq!(scheduler.block_samples, 256);
//! assert_eq!(scheduler.block_count, 8);
//! # Ok::<(), keysynth_config::ConfigError>(())
//! ```

mod config;
mod error;

/// Platform-specific configuration paths.
pub mod paths;

/// Configuration validation.
pub mod validation;

pub use config::{AudioConfig, EngineConfig, KeyboardConfig, VoiceConfig};
pub use error::ConfigError;
pub use paths::{default_config_path, user_config_dir};
pub use validation::{ValidationError, ValidationResult};
