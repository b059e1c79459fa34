//! cpal-based audio backend implementation.
//!
//! This module provides [`CpalBackend`], the hardware [`AudioBackend`] that
//! wraps [cpal](https://crates.io/crates/cpal) for cross-platform audio output.
//! It supports ALSA (Linux), CoreAudio (macOS), and WASAPI (Windows).
//!
//! A [`CpalOutput`] owns a queue of submitted blocks. The cpal data callback
//! copies from the front of the queue into whatever buffer size the host asks
//! for, and returns each block through the [`CompletionHandle`] as soon as its
//! last sample has been copied. When the queue is empty the callback writes
//! silence and reports an underrun.
//!
//! cpal streams are not `Send`, so each stream is built, played, and dropped
//! on its own thread; [`CpalOutput`] only holds the channel that ends it.

use crate::device::{
    AudioBackend, DeviceDescriptor, DeviceFormat, DeviceRequest, OutputDevice, select_device,
};
use crate::{Block, CompletionHandle, Error, Result};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{Host, SizedSample};
use crossbeam_channel::{Receiver, Sender};
use keysynth_core::{PcmSample, SampleFormat};
use std::thread::{self, JoinHandle};

/// Extract device name via `description()` (cpal 0.17+).
fn device_name(device: &cpal::Device) -> std::result::Result<String, cpal::DeviceNameError> {
    device.description().map(|d| d.name().to_string())
}

/// Sample types that both the scheduler and cpal can stream.
pub trait CpalSample: PcmSample + SizedSample {}

impl<T: PcmSample + SizedSample> CpalSample for T {}

fn cpal_format(format: SampleFormat) -> cpal::SampleFormat {
    match format {
        SampleFormat::I8 => cpal::SampleFormat::I8,
        SampleFormat::I16 => cpal::SampleFormat::I16,
        SampleFormat::I32 => cpal::SampleFormat::I32,
        SampleFormat::F32 => cpal::SampleFormat::F32,
    }
}

/// cpal-based audio backend.
///
/// The backend holds a cpal [`Host`] instance, which represents the connection
/// to the platform's audio system.
pub struct CpalBackend {
    host: Host,
}

impl CpalBackend {
    /// Create a new cpal backend using the platform's default audio host.
    ///
    /// On Linux this is ALSA, on macOS CoreAudio, on Windows WASAPI.
    pub fn new() -> Self {
        let host = cpal::default_host();
        tracing::info!(host = host.id().name(), "cpal backend initialized");
        Self { host }
    }

    /// Output devices paired with their descriptors, in host order.
    fn output_devices(&self) -> Result<Vec<(cpal::Device, DeviceDescriptor)>> {
        let default_name = self
            .host
            .default_output_device()
            .and_then(|d| device_name(&d).ok());

        let devices = self
            .host
            .output_devices()
            .map_err(|e| Error::DeviceUnavailable(e.to_string()))?;

        let mut found = Vec::new();
        for device in devices {
            let Ok(name) = device_name(&device) else {
                continue;
            };
            let (default_sample_rate, max_channels) = device
                .default_output_config()
                .map(|c| (c.sample_rate(), c.channels()))
                .unwrap_or((44100, 2));
            let descriptor = DeviceDescriptor {
                index: found.len(),
                is_default: default_name.as_deref() == Some(name.as_str()),
                name,
                default_sample_rate,
                max_channels,
            };
            found.push((device, descriptor));
        }
        Ok(found)
    }

    /// Resolves a request to a cpal device and its descriptor.
    fn find_output_device(&self, query: Option<&str>) -> Result<(cpal::Device, DeviceDescriptor)> {
        let mut devices = self.output_devices()?;
        if devices.is_empty() {
            return Err(Error::DeviceUnavailable("no output devices".into()));
        }

        let position = match query {
            Some(query) => {
                let descriptors: Vec<DeviceDescriptor> =
                    devices.iter().map(|(_, d)| d.clone()).collect();
                select_device(&descriptors, query)?.index
            }
            None => devices
                .iter()
                .position(|(_, d)| d.is_default)
                .unwrap_or(0),
        };
        Ok(devices.swap_remove(position))
    }
}

impl Default for CpalBackend {
    fn default() -> Self {
        Self::new()
    }
}

/// Checks that `device` advertises a config range containing `format`.
fn supports(device: &cpal::Device, format: DeviceFormat) -> bool {
    let wanted = cpal_format(format.sample_format);
    device.supported_output_configs().is_ok_and(|mut ranges| {
        ranges.any(|range| {
            range.channels() == format.channels
                && range.sample_format() == wanted
                && range.min_sample_rate() <= format.sample_rate
                && format.sample_rate <= range.max_sample_rate()
        })
    })
}

impl<T: CpalSample> AudioBackend<T> for CpalBackend {
    fn name(&self) -> &str {
        "cpal"
    }

    fn list_devices(&self) -> Result<Vec<DeviceDescriptor>> {
        Ok(self.output_devices()?.into_iter().map(|(_, d)| d).collect())
    }

    fn open_output(&self, request: &DeviceRequest) -> Result<Box<dyn OutputDevice<T>>> {
        let (device, descriptor) = self.find_output_device(request.device.as_deref())?;
        let format = request.format::<T>();

        if !supports(&device, format) {
            tracing::warn!(
                device = %descriptor.name,
                sample_rate = format.sample_rate,
                channels = format.channels,
                sample_format = %format.sample_format,
                "device rejected output format"
            );
            return Err(format.unsupported());
        }

        tracing::info!(
            device = %descriptor.name,
            sample_rate = format.sample_rate,
            channels = format.channels,
            sample_format = %format.sample_format,
            "output device opened"
        );
        Ok(Box::new(CpalOutput::new(device, descriptor, format)))
    }
}

/// An open cpal output device.
pub struct CpalOutput<T: PcmSample> {
    device: Option<cpal::Device>,
    descriptor: DeviceDescriptor,
    format: DeviceFormat,
    queue: Sender<Block<T>>,
    pending: Receiver<Block<T>>,
    stop: Option<Sender<()>>,
    stream_thread: Option<JoinHandle<()>>,
}

impl<T: CpalSample> CpalOutput<T> {
    fn new(device: cpal::Device, descriptor: DeviceDescriptor, format: DeviceFormat) -> Self {
        let (queue, pending) = crossbeam_channel::unbounded();
        Self {
            device: Some(device),
            descriptor,
            format,
            queue,
            pending,
            stop: None,
            stream_thread: None,
        }
    }
}

/// The data callback's state: the block being played and how far into it.
struct Playhead<T: PcmSample> {
    pending: Receiver<Block<T>>,
    handle: CompletionHandle<T>,
    current: Option<(Block<T>, usize)>,
    started: bool,
}

impl<T: PcmSample> Playhead<T> {
    fn fill(&mut self, out: &mut [T]) {
        let mut written = 0;
        while written < out.len() {
            if self.current.is_none() {
                match self.pending.try_recv() {
                    Ok(block) => {
                        self.started = true;
                        self.current = Some((block, 0));
                    }
                    Err(_) => {
                        out[written..].fill(T::SILENCE);
                        if self.started {
                            self.handle.report_underrun();
                        }
                        return;
                    }
                }
            }

            let Some((block, position)) = self.current.as_mut() else {
                return;
            };
            let remaining = &block.samples()[*position..];
            let n = remaining.len().min(out.len() - written);
            out[written..written + n].copy_from_slice(&remaining[..n]);
            written += n;
            *position += n;

            if *position >= block.len()
                && let Some((block, _)) = self.current.take()
            {
                self.handle.complete(block);
            }
        }
    }
}

fn run_stream<T: CpalSample>(
    device: cpal::Device,
    format: DeviceFormat,
    mut playhead: Playhead<T>,
    ready: Sender<Result<()>>,
    stop: Receiver<()>,
) {
    let config = cpal::StreamConfig {
        channels: format.channels,
        sample_rate: format.sample_rate,
        buffer_size: cpal::BufferSize::Default,
    };

    let stream = match device.build_output_stream(
        &config,
        move |data: &mut [T], _: &cpal::OutputCallbackInfo| playhead.fill(data),
        |err| tracing::error!(error = %err, "output stream error"),
        None,
    ) {
        Ok(stream) => stream,
        Err(e) => {
            let _ = ready.send(Err(Error::Device(e.to_string())));
            return;
        }
    };

    if let Err(e) = stream.play() {
        let _ = ready.send(Err(Error::Device(e.to_string())));
        return;
    }
    let _ = ready.send(Ok(()));

    // Park until close() drops the stop sender.
    let _ = stop.recv();
    drop(stream);
    tracing::debug!("output stream stopped");
}

impl<T: CpalSample> OutputDevice<T> for CpalOutput<T> {
    fn descriptor(&self) -> &DeviceDescriptor {
        &self.descriptor
    }

    fn format(&self) -> DeviceFormat {
        self.format
    }

    fn register_completion_handler(&mut self, handle: CompletionHandle<T>) -> Result<()> {
        let device = self
            .device
            .take()
            .ok_or_else(|| Error::Device("output stream already started".into()))?;

        let playhead = Playhead {
            pending: self.pending.clone(),
            handle,
            current: None,
            started: false,
        };
        let (ready_tx, ready_rx) = crossbeam_channel::bounded(1);
        let (stop_tx, stop_rx) = crossbeam_channel::bounded(1);
        let format = self.format;

        let stream_thread = thread::Builder::new()
            .name("keysynth-cpal-output".into())
            .spawn(move || run_stream(device, format, playhead, ready_tx, stop_rx))?;

        self.stop = Some(stop_tx);
        self.stream_thread = Some(stream_thread);

        ready_rx
            .recv()
            .map_err(|_| Error::Device("output stream thread exited".into()))??;

        tracing::info!(
            device = %self.descriptor.name,
            sample_rate = format.sample_rate,
            channels = format.channels,
            "output stream started"
        );
        Ok(())
    }

    fn submit(&mut self, block: Block<T>) -> Result<()> {
        self.queue
            .send(block)
            .map_err(|_| Error::Device("output queue closed".into()))
    }

    fn close(&mut self) -> Result<()> {
        drop(self.stop.take());
        if let Some(thread) = self.stream_thread.take() {
            thread
                .join()
                .map_err(|_| Error::Device("output stream thread panicked".into()))?;
        }
        while self.pending.try_recv().is_ok() {}
        Ok(())
    }
}

impl<T: PcmSample> Drop for CpalOutput<T> {
    fn drop(&mut self) {
        drop(self.stop.take());
        if let Some(thread) = self.stream_thread.take()
            && thread.join().is_err()
        {
            tracing::warn!("output stream thread panicked");
        }
    }
}
