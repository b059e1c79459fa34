//! Real-time block scheduling and audio output for keysynth.
//!
//! This crate provides:
//!
//! - **Block scheduling**: [`BlockScheduler`] owns a fixed ring of sample
//!   blocks and runs the render thread that keeps an output device fed
//! - **Completion signalling**: [`CompletionHandle`] is how a device hands a
//!   played block back and wakes the render thread
//! - **Device abstraction**: [`OutputDevice`] and [`AudioBackend`] decouple the
//!   scheduler from any platform audio API
//! - **Backends**: [`CpalBackend`] for real hardware, [`NullBackend`] /
//!   [`ClockedDevice`] for headless playback and tests
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use keysynth_io::{AudioBackend, BlockScheduler, CpalBackend, SchedulerConfig};
//! use keysynth_synth::FixedTone;
//!
//! let config = SchedulerConfig::default(); // 44.1 kHz, mono, 8 x 512
//! let backend = CpalBackend::new();
//! let device = AudioBackend::<i16>::open_output(&backend, &config.device_request(None))?;
//!
//! let mut scheduler = BlockScheduler::start(config, device, FixedTone::default())?;
//! std::thread::sleep(std::time::Duration::from_secs(1));
//! scheduler.stop()?;
//! # Ok::<(), keysynth_io::Error>(())
//! ```

mod block;
mod clocked;
mod completion;
mod cpal_backend;
mod device;
mod scheduler;

pub use block::Block;
pub use clocked::{ClockedDevice, NullBackend, PlaybackLog};
pub use completion::CompletionHandle;
pub use cpal_backend::{CpalBackend, CpalOutput, CpalSample};
pub use device::{
    AudioBackend, DeviceDescriptor, DeviceFormat, DeviceRequest, OutputDevice, select_device,
};
pub use scheduler::{BlockScheduler, SchedulerConfig, SchedulerStats};

/// Error types for block scheduling and audio output.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// No output device is available, or opening it failed.
    #[error("Audio device unavailable: {0}")]
    DeviceUnavailable(String),

    /// The requested output device was not found.
    #[error("Device not found: {0}")]
    DeviceNotFound(String),

    /// The device rejected the requested stream format.
    #[error(
        "Unsupported format: {sample_rate} Hz, {channels} channel(s), {bit_depth}-bit"
    )]
    FormatUnsupported {
        /// Requested sample rate in Hz.
        sample_rate: u32,
        /// Requested channel count.
        channels: u16,
        /// Requested bits per sample.
        bit_depth: u16,
    },

    /// The block pool could not be allocated.
    #[error("Failed to allocate {blocks} blocks of {samples} samples")]
    Allocation {
        /// Number of blocks requested.
        blocks: usize,
        /// Samples per block requested.
        samples: usize,
    },

    /// The scheduler configuration is invalid.
    #[error("Invalid scheduler configuration: {0}")]
    InvalidConfig(String),

    /// The device failed while streaming or accepting a block.
    #[error("Audio device error: {0}")]
    Device(String),

    /// A device returned blocks in a different order than they were submitted.
    #[error("Block {expected} was not returned before it was due for rendering")]
    OutOfOrderCompletion {
        /// Index the render loop needed next.
        expected: usize,
    },

    /// A device returned a block that was not in flight.
    #[error("Block {index} was completed twice")]
    DuplicateCompletion {
        /// Index of the duplicated block.
        index: usize,
    },

    /// Standard I/O error (thread spawn).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience result type for scheduling and audio output operations.
pub type Result<T> = std::result::Result<T, Error>;
