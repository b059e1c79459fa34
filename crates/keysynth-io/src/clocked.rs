//! Headless output: a device paced by a timer instead of hardware.
//!
//! [`ClockedDevice`] "plays" one queued block per block period on its own
//! thread, recording which block it played and returning it through the
//! completion handle. It behaves like a sound card that discards its output,
//! which makes it the backend for `--backend null` and for scheduler tests.

use crate::device::{AudioBackend, DeviceDescriptor, DeviceFormat, DeviceRequest, OutputDevice};
use crate::{Block, CompletionHandle, Error, Result};
use crossbeam_channel::{Receiver, Sender, select};
use keysynth_core::PcmSample;
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// Record of block indices in the order a [`ClockedDevice`] played them.
#[derive(Debug, Clone, Default)]
pub struct PlaybackLog {
    played: Arc<Mutex<Vec<usize>>>,
}

impl PlaybackLog {
    /// Indices played so far.
    pub fn played(&self) -> Vec<usize> {
        self.played
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Number of blocks played so far.
    pub fn len(&self) -> usize {
        self.played
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Returns `true` if nothing has been played.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn record(&self, index: usize) {
        self.played
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(index);
    }
}

/// A timer-paced output device.
///
/// At every tick the oldest queued block is completed. A tick with nothing
/// queued, after the first block has arrived, counts as an underrun.
pub struct ClockedDevice<T: PcmSample> {
    descriptor: DeviceDescriptor,
    format: DeviceFormat,
    period: Duration,
    queue: Sender<Block<T>>,
    pending: Receiver<Block<T>>,
    log: PlaybackLog,
    stop: Option<Sender<()>>,
    player: Option<JoinHandle<()>>,
}

impl<T: PcmSample> ClockedDevice<T> {
    /// Opens a device that plays in real time at the request's rate.
    pub fn open(request: &DeviceRequest) -> Self {
        let format = request.format::<T>();
        let period = Duration::from_secs_f64(
            request.block_samples as f64 / f64::from(request.sample_rate.max(1)),
        );
        let (queue, pending) = crossbeam_channel::unbounded();

        Self {
            descriptor: DeviceDescriptor {
                index: 0,
                name: "null".into(),
                default_sample_rate: request.sample_rate,
                max_channels: request.channels,
                is_default: true,
            },
            format,
            period,
            queue,
            pending,
            log: PlaybackLog::default(),
            stop: None,
            player: None,
        }
    }

    /// Plays `factor` times faster than real time. Non-positive factors are ignored.
    pub fn with_speed(mut self, factor: f64) -> Self {
        if factor > 0.0 {
            self.period = self.period.div_f64(factor);
        }
        self
    }

    /// Time between completions.
    pub fn period(&self) -> Duration {
        self.period
    }

    /// Shared record of played block indices; stays readable after the
    /// device moves into a scheduler.
    pub fn log(&self) -> PlaybackLog {
        self.log.clone()
    }
}

fn play<T: PcmSample>(
    period: Duration,
    pending: Receiver<Block<T>>,
    handle: CompletionHandle<T>,
    log: PlaybackLog,
    stop: Receiver<()>,
) {
    let ticker = crossbeam_channel::tick(period);
    let mut started = false;
    loop {
        select! {
            recv(ticker) -> _ => match pending.try_recv() {
                Ok(block) => {
                    started = true;
                    log.record(block.index());
                    handle.complete(block);
                }
                Err(_) if started => handle.report_underrun(),
                Err(_) => {}
            },
            recv(stop) -> _ => break,
        }
    }
}

impl<T: PcmSample> OutputDevice<T> for ClockedDevice<T> {
    fn descriptor(&self) -> &DeviceDescriptor {
        &self.descriptor
    }

    fn format(&self) -> DeviceFormat {
        self.format
    }

    fn register_completion_handler(&mut self, handle: CompletionHandle<T>) -> Result<()> {
        if self.player.is_some() {
            return Err(Error::Device("completion handler already registered".into()));
        }

        let (stop_tx, stop_rx) = crossbeam_channel::bounded(1);
        let period = self.period;
        let pending = self.pending.clone();
        let log = self.log.clone();
        let player = thread::Builder::new()
            .name("keysynth-null-output".into())
            .spawn(move || play(period, pending, handle, log, stop_rx))?;

        tracing::debug!(period_us = period.as_micros() as u64, "null output started");
        self.stop = Some(stop_tx);
        self.player = Some(player);
        Ok(())
    }

    fn submit(&mut self, block: Block<T>) -> Result<()> {
        self.queue
            .send(block)
            .map_err(|_| Error::Device("null output queue closed".into()))
    }

    fn close(&mut self) -> Result<()> {
        // Dropping the sender disconnects the stop channel.
        drop(self.stop.take());
        if let Some(player) = self.player.take() {
            player
                .join()
                .map_err(|_| Error::Device("null output thread panicked".into()))?;
            tracing::debug!(played = self.log.len(), "null output closed");
        }
        while self.pending.try_recv().is_ok() {}
        Ok(())
    }
}

impl<T: PcmSample> Drop for ClockedDevice<T> {
    fn drop(&mut self) {
        if let Err(e) = self.close() {
            tracing::warn!(error = %e, "null output did not close cleanly");
        }
    }
}

/// Backend whose only device is a [`ClockedDevice`].
#[derive(Debug, Clone, Copy, Default)]
pub struct NullBackend {
    speed: Option<f64>,
}

impl NullBackend {
    /// Real-time null backend.
    pub fn new() -> Self {
        Self::default()
    }

    /// Null backend whose devices run `factor` times faster than real time.
    pub fn with_speed(factor: f64) -> Self {
        Self {
            speed: Some(factor),
        }
    }
}

impl<T: PcmSample> AudioBackend<T> for NullBackend {
    fn name(&self) -> &str {
        "null"
    }

    fn list_devices(&self) -> Result<Vec<DeviceDescriptor>> {
        Ok(vec![DeviceDescriptor {
            index: 0,
            name: "null".into(),
            default_sample_rate: 44100,
            max_channels: u16::MAX,
            is_default: true,
        }])
    }

    fn open_output(&self, request: &DeviceRequest) -> Result<Box<dyn OutputDevice<T>>> {
        if let Some(query) = &request.device {
            let devices = <Self as AudioBackend<T>>::list_devices(self)?;
            crate::device::select_device(&devices, query)?;
        }
        if request.sample_rate == 0 || request.channels == 0 || request.block_samples == 0 {
            return Err(request.format::<T>().unsupported());
        }

        let device = ClockedDevice::<T>::open(request);
        let device = match self.speed {
            Some(factor) => device.with_speed(factor),
            None => device,
        };
        Ok(Box::new(device))
    }
}
