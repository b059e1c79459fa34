//! Platform-specific configuration paths.
//!
//! - **User config**: `~/.config/keysynth/` (Linux), `~/Library/Application Support/keysynth/` (macOS), `%APPDATA%\keysynth\` (Windows)
//!
//! # Example
//!
//! ```rust,no_run
//! use keysynth_config::{EngineConfig, paths};
//!
//! let config = EngineConfig::load_or_default(paths::default_config_path())?;
//! println!("sample rate: {}", config.audio.sample_rate);
//! # Ok::<(), keysynth_config::ConfigError>(())
//! ```

use std::path::PathBuf;

/// Application name used for directory paths.
const APP_NAME: &str = "keysynth";

/// File name of the default configuration.
pub const CONFIG_FILE_NAME: &str = "keysynth.toml";

/// Returns the user-specific configuration directory.
///
/// # Platform Paths
///
/// - Linux: `~/.config/keysynth/`
/// - macOS: `~/Library/Application Support/keysynth/`
/// - Windows: `%APPDATA%\keysynth\`
///
/// Returns a fallback path if the config directory cannot be determined.
pub fn user_config_dir() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_NAME)
}

/// Path of the configuration file read when none is given.
pub fn default_config_path() -> PathBuf {
    user_config_dir().join(CONFIG_FILE_NAME)
}
