//! Shared CLI helpers used across multiple commands.

use clap::ValueEnum;
use keysynth_config::{EngineConfig, default_config_path};
use keysynth_core::PcmSample;
use keysynth_io::{
    AudioBackend, BlockScheduler, CpalBackend, CpalSample, DeviceRequest, NullBackend,
    OutputDevice,
};
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

/// Which audio backend drives the output.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum BackendKind {
    /// System audio through cpal
    #[default]
    Cpal,
    /// Timer-paced device that discards its output
    Null,
}

/// Load the configuration named on the command line, or the user default.
///
/// An explicit path must exist; the default path falls back to built-in
/// defaults when absent.
pub fn load_config(path: Option<&Path>) -> anyhow::Result<EngineConfig> {
    let config = match path {
        Some(path) => {
            tracing::info!(path = %path.display(), "loading configuration");
            EngineConfig::load(path)?
        }
        None => EngineConfig::load_or_default(default_config_path())?,
    };
    Ok(config)
}

/// Open an output device on the chosen backend.
pub fn open_output<T: CpalSample>(
    backend: BackendKind,
    request: &DeviceRequest,
) -> anyhow::Result<Box<dyn OutputDevice<T>>> {
    let device = match backend {
        BackendKind::Cpal => AudioBackend::<T>::open_output(&CpalBackend::new(), request)?,
        BackendKind::Null => AudioBackend::<T>::open_output(&NullBackend::new(), request)?,
    };
    Ok(device)
}

/// Install the Ctrl+C handler and return the flag it clears.
pub fn running_flag() -> anyhow::Result<Arc<AtomicBool>> {
    let running = Arc::new(AtomicBool::new(true));
    let r = Arc::clone(&running);
    ctrlc::set_handler(move || {
        println!("\nStopping...");
        r.store(false, Ordering::SeqCst);
    })?;
    Ok(running)
}

/// Sleep until `running` is cleared or `seconds` have passed.
pub fn wait_while_running(running: &AtomicBool, seconds: Option<f64>) {
    let deadline = seconds.map(|s| Instant::now() + Duration::from_secs_f64(s.max(0.0)));
    while running.load(Ordering::SeqCst) && deadline.is_none_or(|d| Instant::now() < d) {
        std::thread::sleep(Duration::from_millis(10));
    }
}

/// Stop the scheduler and print its counters.
pub fn stop_and_report<T: PcmSample>(scheduler: &mut BlockScheduler<T>) -> anyhow::Result<()> {
    scheduler.stop()?;
    let stats = scheduler.stats();
    println!(
        "Stopped after {:.2}s: {} blocks submitted, {} underruns",
        scheduler.time(),
        stats.blocks_submitted,
        stats.underruns
    );
    Ok(())
}
