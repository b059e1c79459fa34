//! Output device abstraction.
//!
//! The scheduler never talks to a platform audio API directly. It drives an
//! [`OutputDevice`], which accepts filled [`Block`]s in submission order and
//! hands each one back through a [`CompletionHandle`] once it has been played.
//! An [`AudioBackend`] enumerates devices and opens them for a given format.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────┐   submit(block)    ┌──────────────────────┐
//! │    BlockScheduler    │ ─────────────────▶ │     OutputDevice     │
//! │   (render thread)    │                    │ (cpal / clocked / ..)│
//! └──────────▲───────────┘                    └──────────┬───────────┘
//!            │        CompletionHandle::complete(block)  │
//!            └───────────────────────────────────────────┘
//! ```
//!
//! ## Device contract
//!
//! - Blocks are played in the order they were submitted.
//! - Every submitted block is eventually completed exactly once, unless the
//!   device is closed first.
//! - `submit` must not wait for playback; it only queues the block.
//! - When the device runs dry it plays silence and calls
//!   [`CompletionHandle::report_underrun`].

use crate::{Block, CompletionHandle, Error, Result};
use keysynth_core::{PcmSample, SampleFormat};

/// Stream format shared by a device and the scheduler driving it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceFormat {
    /// Sample rate in Hz.
    pub sample_rate: u32,
    /// Interleaved channel count.
    pub channels: u16,
    /// PCM sample encoding.
    pub sample_format: SampleFormat,
}

impl DeviceFormat {
    /// The error reported when a device cannot play this format.
    pub fn unsupported(&self) -> Error {
        Error::FormatUnsupported {
            sample_rate: self.sample_rate,
            channels: self.channels,
            bit_depth: self.sample_format.bits(),
        }
    }
}

/// Information about an enumerated output device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceDescriptor {
    /// Position in the backend's enumeration order.
    pub index: usize,
    /// Human-readable device name.
    pub name: String,
    /// Default sample rate in Hz.
    pub default_sample_rate: u32,
    /// Maximum channel count the device reports.
    pub max_channels: u16,
    /// Whether this is the backend's default output.
    pub is_default: bool,
}

/// What to open: which device, at what rate and channel count.
///
/// The sample encoding comes from the block type the device is opened for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceRequest {
    /// Device index or name (exact, then case-insensitive substring).
    /// `None` selects the default output.
    pub device: Option<String>,
    /// Sample rate in Hz.
    pub sample_rate: u32,
    /// Interleaved channel count.
    pub channels: u16,
    /// Frames per block; devices that pace themselves use it as their period.
    pub block_samples: usize,
}

impl DeviceRequest {
    /// Full format for sample type `T`.
    pub fn format<T: PcmSample>(&self) -> DeviceFormat {
        DeviceFormat {
            sample_rate: self.sample_rate,
            channels: self.channels,
            sample_format: T::FORMAT,
        }
    }
}

/// A sink for PCM blocks that signals completion per block.
///
/// Implementations must be `Send`: the scheduler moves the device onto its
/// render thread.
pub trait OutputDevice<T: PcmSample>: Send {
    /// Descriptor of the opened device.
    fn descriptor(&self) -> &DeviceDescriptor;

    /// The format the device was opened with.
    fn format(&self) -> DeviceFormat;

    /// Installs the handle used to return played blocks.
    ///
    /// Called once by the scheduler before the first [`submit`](Self::submit).
    /// Devices that stream from a platform thread typically start it here.
    fn register_completion_handler(&mut self, handle: CompletionHandle<T>) -> Result<()>;

    /// Queues a filled block for playback. Must not block on playback.
    fn submit(&mut self, block: Block<T>) -> Result<()>;

    /// Stops playback and releases the device. Queued blocks are discarded.
    fn close(&mut self) -> Result<()>;
}

/// A source of output devices.
///
/// Generic over the sample type so a backend can restrict which encodings it
/// supports; `Box<dyn AudioBackend<i16>>` allows runtime backend selection.
pub trait AudioBackend<T: PcmSample> {
    /// Human-readable backend name (e.g., "cpal", "null").
    fn name(&self) -> &str;

    /// Enumerates output devices.
    fn list_devices(&self) -> Result<Vec<DeviceDescriptor>>;

    /// Opens an output device for the requested format.
    ///
    /// Fails with [`Error::DeviceNotFound`] when the named device does not
    /// exist, [`Error::DeviceUnavailable`] when there is no output at all, and
    /// [`Error::FormatUnsupported`] when the device rejects the format.
    fn open_output(&self, request: &DeviceRequest) -> Result<Box<dyn OutputDevice<T>>>;
}

/// Picks a device by index, exact name, or case-insensitive substring.
pub fn select_device<'a>(
    devices: &'a [DeviceDescriptor],
    name_or_index: &str,
) -> Result<&'a DeviceDescriptor> {
    if let Ok(index) = name_or_index.parse::<usize>() {
        return devices.iter().find(|d| d.index == index).ok_or_else(|| {
            Error::DeviceNotFound(format!(
                "output device index {} (only {} devices available)",
                index,
                devices.len()
            ))
        });
    }

    if let Some(device) = devices.iter().find(|d| d.name == name_or_index) {
        return Ok(device);
    }

    let search_lower = name_or_index.to_lowercase();
    let matches: Vec<&DeviceDescriptor> = devices
        .iter()
        .filter(|d| d.name.to_lowercase().contains(&search_lower))
        .collect();

    match matches.as_slice() {
        [] => Err(Error::DeviceNotFound(format!(
            "no output device matching '{}'",
            name_or_index
        ))),
        [only] => Ok(only),
        [first, ..] => {
            let names: Vec<&str> = matches.iter().map(|d| d.name.as_str()).collect();
            tracing::warn!(
                query = name_or_index,
                candidates = ?names,
                chosen = %first.name,
                "device query is ambiguous, using first match"
            );
            Ok(first)
        }
    }
}
