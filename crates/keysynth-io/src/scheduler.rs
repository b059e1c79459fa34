//! The block scheduler and its render thread.
//!
//! [`BlockScheduler::start`] allocates a ring of `block_count` zeroed blocks,
//! hands a [`CompletionHandle`] to the device, and spawns a render thread that
//! loops:
//!
//! 1. wait until a block is free (or stop is requested)
//! 2. reclaim blocks the device has returned
//! 3. fill the current block frame by frame from the [`SampleSource`],
//!    clipping to `[-1, 1]` and advancing the shared [`SampleClock`]
//! 4. submit the block and move to the next ring position
//!
//! Because blocks are rendered and played strictly in ring order, the device
//! always has up to `block_count` blocks queued ahead of the playhead, and
//! the time a source sees is exactly the playback position of the frame it
//! renders.

use crate::block::BlockRing;
use crate::completion::Shared;
use crate::device::{DeviceFormat, DeviceRequest, OutputDevice};
use crate::{Block, CompletionHandle, Error, Result};
use crossbeam_channel::Receiver;
use keysynth_core::{PcmSample, SampleClock, clip};
use keysynth_synth::{SampleSource, Silence};
use std::panic;
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::Duration;

type PendingSource = Arc<Mutex<Option<Box<dyn SampleSource>>>>;

/// Block pool geometry and stream rate.
///
/// Latency is `block_count * block_samples / sample_rate`; the default
/// 8 x 512 at 44.1 kHz is about 93 ms.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SchedulerConfig {
    /// Sample rate in Hz.
    pub sample_rate: u32,
    /// Interleaved channels per frame. Every channel carries the same sample.
    pub channels: u16,
    /// Number of blocks in the ring.
    pub block_count: usize,
    /// Frames per block.
    pub block_samples: usize,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            sample_rate: 44100,
            channels: 1,
            block_count: 8,
            block_samples: 512,
        }
    }
}

impl SchedulerConfig {
    /// Checks that every dimension is non-zero and the ring holds at least
    /// two blocks, so one can play while the next renders.
    pub fn validate(&self) -> Result<()> {
        if self.sample_rate == 0 {
            return Err(Error::InvalidConfig("sample_rate must be positive".into()));
        }
        if self.channels == 0 {
            return Err(Error::InvalidConfig("channels must be positive".into()));
        }
        if self.block_count < 2 {
            return Err(Error::InvalidConfig("block_count must be at least 2".into()));
        }
        if self.block_samples == 0 {
            return Err(Error::InvalidConfig(
                "block_samples must be positive".into(),
            ));
        }
        Ok(())
    }

    /// Samples per block across all channels.
    pub fn block_len(&self) -> usize {
        self.block_samples.saturating_mul(usize::from(self.channels))
    }

    /// Playback time of one block.
    pub fn block_duration(&self) -> Duration {
        Duration::from_secs_f64(self.block_samples as f64 / f64::from(self.sample_rate.max(1)))
    }

    /// Worst-case delay between rendering a frame and hearing it.
    pub fn latency(&self) -> Duration {
        self.block_duration() * self.block_count as u32
    }

    /// Device request matching this geometry.
    pub fn device_request(&self, device: Option<String>) -> DeviceRequest {
        DeviceRequest {
            device,
            sample_rate: self.sample_rate,
            channels: self.channels,
            block_samples: self.block_samples,
        }
    }

    fn device_format<T: PcmSample>(&self) -> DeviceFormat {
        DeviceFormat {
            sample_rate: self.sample_rate,
            channels: self.channels,
            sample_format: T::FORMAT,
        }
    }
}

/// Point-in-time scheduler counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SchedulerStats {
    /// Blocks handed to the device since start.
    pub blocks_submitted: u64,
    /// Blocks the device has returned since start.
    pub blocks_completed: u64,
    /// Times the device ran dry and played silence.
    pub underruns: u64,
    /// Blocks available to the render loop right now.
    pub free_blocks: usize,
    /// Size of the ring.
    pub block_count: usize,
}

impl SchedulerStats {
    /// Blocks currently owned by the device or being rendered.
    pub fn in_flight(&self) -> usize {
        self.block_count - self.free_blocks.min(self.block_count)
    }
}

/// Keeps an output device fed with blocks rendered from a [`SampleSource`].
///
/// # Example
///
/// ```rust
/// use keysynth_io::{BlockScheduler, ClockedDevice, SchedulerConfig};
/// use keysynth_synth::FixedTone;
///
/// let config = SchedulerConfig::default();
/// let device = ClockedDevice::<i16>::open(&config.device_request(None)).with_speed(8.0);
///
/// let mut scheduler = BlockScheduler::start(config, Box::new(device), FixedTone::default())?;
/// std::thread::sleep(std::time::Duration::from_millis(50));
/// assert!(scheduler.time() > 0.0);
/// scheduler.stop()?;
/// # Ok::<(), keysynth_io::Error>(())
/// ```
pub struct BlockScheduler<T: PcmSample> {
    config: SchedulerConfig,
    shared: Arc<Shared>,
    clock: Arc<SampleClock>,
    pending: PendingSource,
    completion: CompletionHandle<T>,
    thread: Option<JoinHandle<Result<()>>>,
}

impl<T: PcmSample> BlockScheduler<T> {
    /// Allocates the block ring, attaches `device`, and starts rendering `source`.
    ///
    /// The device must have been opened with the same rate, channel count and
    /// sample type as `config`; a mismatch is reported as
    /// [`Error::FormatUnsupported`].
    pub fn start(
        config: SchedulerConfig,
        mut device: Box<dyn OutputDevice<T>>,
        source: impl SampleSource + 'static,
    ) -> Result<Self> {
        config.validate()?;

        let wanted = config.device_format::<T>();
        if device.format() != wanted {
            tracing::error!(
                wanted = ?wanted,
                actual = ?device.format(),
                "device format does not match scheduler configuration"
            );
            return Err(wanted.unsupported());
        }

        let ring = BlockRing::<T>::allocate(config.block_count, config.block_len())?;
        let shared = Arc::new(Shared::new(config.block_count));
        let (completion, returned) = CompletionHandle::channel(Arc::clone(&shared));
        device.register_completion_handler(completion.clone())?;

        let clock = Arc::new(SampleClock::new(config.sample_rate));
        let pending: PendingSource = Arc::new(Mutex::new(None));

        let render = RenderLoop {
            channels: usize::from(config.channels),
            ring,
            returned,
            device,
            source: Box::new(source),
            pending: Arc::clone(&pending),
            shared: Arc::clone(&shared),
            clock: Arc::clone(&clock),
            underruns_seen: 0,
        };

        let thread = thread::Builder::new()
            .name("keysynth-render".into())
            .spawn(move || render.run())?;

        tracing::info!(
            sample_rate = config.sample_rate,
            channels = config.channels,
            block_count = config.block_count,
            block_samples = config.block_samples,
            format = %T::FORMAT,
            latency_ms = config.latency().as_secs_f64() * 1000.0,
            "block scheduler started"
        );

        Ok(Self {
            config,
            shared,
            clock,
            pending,
            completion,
            thread: Some(thread),
        })
    }

    /// Starts with [`Silence`] as the source.
    pub fn start_silent(config: SchedulerConfig, device: Box<dyn OutputDevice<T>>) -> Result<Self> {
        Self::start(config, device, Silence)
    }

    /// Replaces the source. Takes effect at the next block boundary.
    pub fn set_source(&self, source: impl SampleSource + 'static) {
        let mut pending = self.pending.lock().unwrap_or_else(PoisonError::into_inner);
        *pending = Some(Box::new(source));
    }

    /// Render time in seconds: frames rendered so far divided by the sample rate.
    pub fn time(&self) -> f64 {
        self.clock.now()
    }

    /// The shared render clock, for stamping note events.
    pub fn clock(&self) -> Arc<SampleClock> {
        Arc::clone(&self.clock)
    }

    /// The configuration this scheduler was started with.
    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    /// A handle for returning blocks, for devices attached out of band.
    pub fn completion_handle(&self) -> CompletionHandle<T> {
        self.completion.clone()
    }

    /// Current counters.
    pub fn stats(&self) -> SchedulerStats {
        SchedulerStats {
            blocks_submitted: self.shared.submitted(),
            blocks_completed: self.shared.completed(),
            underruns: self.shared.underruns(),
            free_blocks: self.shared.free(),
            block_count: self.shared.block_count(),
        }
    }

    /// Returns `true` while the render thread is alive.
    pub fn is_running(&self) -> bool {
        self.thread.as_ref().is_some_and(|t| !t.is_finished())
    }

    /// Stops the render thread and closes the device.
    ///
    /// Returns the error that ended the render loop, if any. Calling `stop`
    /// again is a no-op. A panic on the render thread is re-raised here.
    pub fn stop(&mut self) -> Result<()> {
        let Some(thread) = self.thread.take() else {
            return Ok(());
        };

        self.shared.request_stop();
        let result = match thread.join() {
            Ok(result) => result,
            Err(payload) => panic::resume_unwind(payload),
        };

        let stats = self.stats();
        tracing::info!(
            blocks_submitted = stats.blocks_submitted,
            underruns = stats.underruns,
            seconds = self.time(),
            "block scheduler stopped"
        );
        result
    }
}

impl<T: PcmSample> Drop for BlockScheduler<T> {
    fn drop(&mut self) {
        let Some(thread) = self.thread.take() else {
            return;
        };
        self.shared.request_stop();
        match thread.join() {
            Ok(Ok(())) => {}
            Ok(Err(e)) => tracing::error!(error = %e, "render loop ended with error"),
            Err(_) => tracing::error!("render thread panicked"),
        }
    }
}

impl<T: PcmSample> std::fmt::Debug for BlockScheduler<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BlockScheduler")
            .field("config", &self.config)
            .field("stats", &self.stats())
            .field("time", &self.time())
            .finish_non_exhaustive()
    }
}

/// Everything the render thread owns.
struct RenderLoop<T: PcmSample> {
    channels: usize,
    ring: BlockRing<T>,
    returned: Receiver<Block<T>>,
    device: Box<dyn OutputDevice<T>>,
    source: Box<dyn SampleSource>,
    pending: PendingSource,
    shared: Arc<Shared>,
    clock: Arc<SampleClock>,
    underruns_seen: u64,
}

impl<T: PcmSample> RenderLoop<T> {
    fn run(mut self) -> Result<()> {
        let result = self.render_until_stopped();
        if let Err(e) = &result {
            tracing::error!(error = %e, "render loop failed");
        }

        let closed = self.device.close();
        if let Err(e) = &closed {
            tracing::warn!(error = %e, "failed to close output device");
        }
        result.and(closed)
    }

    fn render_until_stopped(&mut self) -> Result<()> {
        while self.shared.wait_for_free_block() {
            self.shared.claim_block();
            self.reclaim_returned()?;
            self.swap_pending_source();
            self.report_new_underruns();

            let mut block = self.ring.take_current()?;
            self.fill(&mut block);

            let index = block.index();
            self.device.submit(block)?;
            let submitted = self.shared.record_submitted();
            tracing::trace!(index, submitted, "block submitted");

            self.ring.advance();
        }
        Ok(())
    }

    /// Moves every block the device has handed back into its slot.
    fn reclaim_returned(&mut self) -> Result<()> {
        while let Ok(block) = self.returned.try_recv() {
            self.ring.restore(block)?;
        }
        Ok(())
    }

    fn swap_pending_source(&mut self) {
        if let Ok(mut pending) = self.pending.try_lock()
            && let Some(source) = pending.take()
        {
            self.source = source;
            tracing::debug!(time = self.clock.now(), "sample source replaced");
        }
    }

    fn report_new_underruns(&mut self) {
        let underruns = self.shared.underruns();
        if underruns > self.underruns_seen {
            tracing::warn!(
                new = underruns - self.underruns_seen,
                total = underruns,
                "output underrun, device played silence"
            );
            self.underruns_seen = underruns;
        }
    }

    fn fill(&mut self, block: &mut Block<T>) {
        for frame in block.samples_mut().chunks_exact_mut(self.channels) {
            let sample = clip(self.source.render(self.clock.now()), 1.0);
            frame.fill(T::from_normalized(sample));
            self.clock.advance();
        }
    }

    #[cfg(test)]
    fn in_flight(&self, index: usize) -> bool {
        self.ring.is_in_flight(index)
    }
}
