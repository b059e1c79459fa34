//! Integration tests for keysynth-io block scheduling.

use keysynth_core::{PcmSample, SampleFormat};
use keysynth_io::{
    AudioBackend, Block, BlockScheduler, ClockedDevice, CompletionHandle, DeviceDescriptor,
    DeviceFormat, Error, NullBackend, OutputDevice, Result, SchedulerConfig,
};
use keysynth_synth::{FixedTone, Silence, Waveform};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

// ---------------------------------------------------------------------------
// Manually completed test device
// ---------------------------------------------------------------------------

struct Recorder<T> {
    queued: VecDeque<Block<T>>,
    submitted: Vec<usize>,
    contents: Vec<Vec<T>>,
    handle: Option<CompletionHandle<T>>,
    reused_in_flight: bool,
    closed: bool,
}

/// Queues every submitted block until the test completes it.
struct ManualDevice<T: PcmSample> {
    descriptor: DeviceDescriptor,
    format: DeviceFormat,
    state: Arc<Mutex<Recorder<T>>>,
}

/// Test-side view of a [`ManualDevice`].
#[derive(Clone)]
struct Control<T> {
    state: Arc<Mutex<Recorder<T>>>,
}

fn manual_device<T: PcmSample>(config: &SchedulerConfig) -> (ManualDevice<T>, Control<T>) {
    let state = Arc::new(Mutex::new(Recorder {
        queued: VecDeque::new(),
        submitted: Vec::new(),
        contents: Vec::new(),
        handle: None,
        reused_in_flight: false,
        closed: false,
    }));
    let device = ManualDevice {
        descriptor: DeviceDescriptor {
            index: 0,
            name: "manual".into(),
            default_sample_rate: config.sample_rate,
            max_channels: config.channels,
            is_default: true,
        },
        format: DeviceFormat {
            sample_rate: config.sample_rate,
            channels: config.channels,
            sample_format: T::FORMAT,
        },
        state: Arc::clone(&state),
    };
    (device, Control { state })
}

impl<T: PcmSample> OutputDevice<T> for ManualDevice<T> {
    fn descriptor(&self) -> &DeviceDescriptor {
        &self.descriptor
    }

    fn format(&self) -> DeviceFormat {
        self.format
    }

    fn register_completion_handler(&mut self, handle: CompletionHandle<T>) -> Result<()> {
        self.state.lock().unwrap().handle = Some(handle);
        Ok(())
    }

    fn submit(&mut self, block: Block<T>) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        if state.queued.iter().any(|b| b.index() == block.index()) {
            state.reused_in_flight = true;
        }
        state.submitted.push(block.index());
        state.contents.push(block.samples().to_vec());
        state.queued.push_back(block);
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state.queued.clear();
        state.closed = true;
        Ok(())
    }
}

impl<T: PcmSample> Control<T> {
    fn submitted(&self) -> Vec<usize> {
        self.state.lock().unwrap().submitted.clone()
    }

    fn contents(&self, submission: usize) -> Vec<T> {
        self.state.lock().unwrap().contents[submission].clone()
    }

    fn queued(&self) -> usize {
        self.state.lock().unwrap().queued.len()
    }

    fn reused_in_flight(&self) -> bool {
        self.state.lock().unwrap().reused_in_flight
    }

    fn closed(&self) -> bool {
        self.state.lock().unwrap().closed
    }

    fn wait_submitted(&self, n: usize) {
        let deadline = Instant::now() + Duration::from_secs(2);
        while self.state.lock().unwrap().submitted.len() < n {
            assert!(Instant::now() < deadline, "timed out waiting for {n} submissions");
            thread::sleep(Duration::from_millis(1));
        }
    }

    fn complete_oldest(&self) {
        let (block, handle) = {
            let mut state = self.state.lock().unwrap();
            let block = state.queued.pop_front().expect("nothing queued");
            (block, state.handle.clone().expect("no handler"))
        };
        handle.complete(block);
    }

    fn complete_newest(&self) {
        let (block, handle) = {
            let mut state = self.state.lock().unwrap();
            let block = state.queued.pop_back().expect("nothing queued");
            (block, state.handle.clone().expect("no handler"))
        };
        handle.complete(block);
    }
}

fn config(block_count: usize, block_samples: usize) -> SchedulerConfig {
    SchedulerConfig {
        sample_rate: 44100,
        channels: 1,
        block_count,
        block_samples,
    }
}

// ---------------------------------------------------------------------------
// Ring ordering
// ---------------------------------------------------------------------------

#[test]
fn submits_every_block_in_order_then_wraps() {
    let config = config(8, 512);
    let (device, control) = manual_device::<i16>(&config);
    let mut scheduler = BlockScheduler::start_silent(config, Box::new(device)).unwrap();

    control.wait_submitted(8);
    thread::sleep(Duration::from_millis(20));
    assert_eq!(control.submitted(), (0..8).collect::<Vec<_>>());
    assert_eq!(scheduler.stats().free_blocks, 0);

    for completed in 1..=8 {
        control.complete_oldest();
        control.wait_submitted(8 + completed);

        let stats = scheduler.stats();
        assert_eq!(stats.free_blocks + control.queued(), 8);
    }

    let submitted = control.submitted();
    assert_eq!(&submitted[8..], &(0..8).collect::<Vec<_>>()[..]);
    assert!(!control.reused_in_flight());

    scheduler.stop().unwrap();
    assert!(control.closed());
}

#[test]
fn free_plus_queued_equals_block_count_when_idle() {
    let config = config(4, 64);
    let (device, control) = manual_device::<i16>(&config);
    let mut scheduler = BlockScheduler::start_silent(config, Box::new(device)).unwrap();

    control.wait_submitted(4);
    thread::sleep(Duration::from_millis(10));
    let stats = scheduler.stats();
    assert_eq!(stats.free_blocks + control.queued(), 4);
    assert_eq!(stats.in_flight(), 4);

    scheduler.stop().unwrap();
}

// ---------------------------------------------------------------------------
// Rendered content
// ---------------------------------------------------------------------------

#[test]
fn zero_source_renders_exact_silence() {
    let config = config(4, 128);
    let (device, control) = manual_device::<i16>(&config);
    let mut scheduler = BlockScheduler::start(config, Box::new(device), |_t: f64| 0.0).unwrap();

    control.wait_submitted(4);
    scheduler.stop().unwrap();

    let total: usize = (0..4)
        .map(|i| {
            let samples = control.contents(i);
            assert!(samples.iter().all(|&s| s == 0));
            samples.len()
        })
        .sum();
    assert_eq!(total, 4 * 128);
}

#[test]
fn samples_are_clipped_and_quantized() {
    let config = config(2, 32);
    let (device, control) = manual_device::<i16>(&config);
    let mut scheduler = BlockScheduler::start(config, Box::new(device), |t: f64| {
        if t < 32.0 / 44100.0 { 0.5 } else { -4.0 }
    })
    .unwrap();

    control.wait_submitted(2);
    scheduler.stop().unwrap();

    assert!(control.contents(0).iter().all(|&s| s == 16383));
    assert!(control.contents(1).iter().all(|&s| s == -32767));
}

#[test]
fn f32_blocks_carry_unquantized_samples() {
    let config = config(2, 16);
    let (device, control) = manual_device::<f32>(&config);
    let mut scheduler = BlockScheduler::start(config, Box::new(device), |_t: f64| 0.25).unwrap();

    control.wait_submitted(2);
    scheduler.stop().unwrap();
    assert!(control.contents(0).iter().all(|&s| s == 0.25));
}

#[test]
fn stereo_frames_repeat_the_sample_on_both_channels() {
    let config = SchedulerConfig {
        channels: 2,
        ..config(2, 64)
    };
    let (device, control) = manual_device::<i16>(&config);
    let tone = FixedTone::new(Waveform::Sine, 440.0, 0.5);
    let mut scheduler = BlockScheduler::start(config, Box::new(device), tone).unwrap();

    control.wait_submitted(2);
    scheduler.stop().unwrap();

    let samples = control.contents(0);
    assert_eq!(samples.len(), 128);
    for frame in samples.chunks_exact(2) {
        assert_eq!(frame[0], frame[1]);
    }
    assert!(samples.iter().any(|&s| s != 0));
}

#[test]
fn source_time_is_frames_over_sample_rate() {
    let config = config(4, 100);
    let (device, control) = manual_device::<i32>(&config);
    let seen = Arc::new(Mutex::new(Vec::new()));
    let source = {
        let seen = Arc::clone(&seen);
        move |t: f64| {
            seen.lock().unwrap().push(t);
            0.0
        }
    };
    let mut scheduler = BlockScheduler::start(config, Box::new(device), source).unwrap();

    control.wait_submitted(4);
    thread::sleep(Duration::from_millis(10));
    assert!((scheduler.time() - 400.0 / 44100.0).abs() < 1e-12);
    scheduler.stop().unwrap();

    let seen = seen.lock().unwrap();
    assert_eq!(seen.len(), 400);
    for (frame, &t) in seen.iter().enumerate() {
        assert!((t - frame as f64 / 44100.0).abs() < 1e-12);
    }
}

#[test]
fn replaced_source_applies_from_next_block() {
    let config = config(2, 32);
    let (device, control) = manual_device::<i16>(&config);
    let mut scheduler = BlockScheduler::start_silent(config, Box::new(device)).unwrap();

    control.wait_submitted(2);
    scheduler.set_source(|_t: f64| 1.0);
    control.complete_oldest();
    control.wait_submitted(3);
    scheduler.stop().unwrap();

    assert!(control.contents(1).iter().all(|&s| s == 0));
    assert!(control.contents(2).iter().all(|&s| s == i16::MAX));
}

// ---------------------------------------------------------------------------
// Stop and failure handling
// ---------------------------------------------------------------------------

#[test]
fn stop_while_all_blocks_in_flight_returns_within_one_block() {
    let config = config(8, 4410);
    let (device, control) = manual_device::<i16>(&config);
    let mut scheduler = BlockScheduler::start_silent(config, Box::new(device)).unwrap();

    control.wait_submitted(8);
    thread::sleep(Duration::from_millis(10));
    assert!(scheduler.is_running());

    let begin = Instant::now();
    scheduler.stop().unwrap();
    assert!(begin.elapsed() < config.block_duration());
    assert!(!scheduler.is_running());
}

#[test]
fn stop_while_streaming_returns_within_one_block() {
    let config = config(8, 4410);
    let device = ClockedDevice::<i16>::open(&config.device_request(None)).with_speed(20.0);
    let mut scheduler =
        BlockScheduler::start(config, Box::new(device), FixedTone::default()).unwrap();

    thread::sleep(Duration::from_millis(60));
    let begin = Instant::now();
    scheduler.stop().unwrap();
    assert!(begin.elapsed() < config.block_duration());
}

#[test]
fn out_of_order_completion_stops_the_render_loop() {
    let config = config(4, 64);
    let (device, control) = manual_device::<i16>(&config);
    let mut scheduler = BlockScheduler::start_silent(config, Box::new(device)).unwrap();

    control.wait_submitted(4);
    control.complete_newest();

    let deadline = Instant::now() + Duration::from_secs(2);
    while scheduler.is_running() {
        assert!(Instant::now() < deadline, "render loop kept running");
        thread::sleep(Duration::from_millis(1));
    }

    assert!(matches!(
        scheduler.stop(),
        Err(Error::OutOfOrderCompletion { expected: 0 })
    ));
    assert!(control.closed());
}

#[test]
fn invalid_config_is_rejected_before_start() {
    for config in [config(0, 512), config(1, 512), config(8, 0)] {
        let (device, _control) = manual_device::<i16>(&SchedulerConfig::default());
        assert!(matches!(
            BlockScheduler::start(config, Box::new(device), Silence),
            Err(Error::InvalidConfig(_))
        ));
    }
}

#[test]
fn single_block_ring_is_rejected_with_clocked_device() {
    let config = config(1, 64);
    let device = ClockedDevice::<i16>::open(&config.device_request(None));
    assert!(matches!(
        BlockScheduler::start(config, Box::new(device), Silence),
        Err(Error::InvalidConfig(_))
    ));
}

#[test]
fn device_opened_at_other_rate_is_rejected() {
    let config = config(8, 512);
    let request = SchedulerConfig {
        sample_rate: 48000,
        ..config
    }
    .device_request(None);
    let device = AudioBackend::<i16>::open_output(&NullBackend::new(), &request).unwrap();

    let err = BlockScheduler::start(config, device, Silence).unwrap_err();
    assert!(matches!(
        err,
        Error::FormatUnsupported {
            sample_rate: 44100,
            channels: 1,
            bit_depth: 16,
        }
    ));
}

#[test]
fn device_opened_for_other_sample_type_is_rejected() {
    let config = config(8, 512);
    let (device, _control) = manual_device::<i16>(&config);
    let wrapped = FormatOverride {
        inner: device,
        format: SampleFormat::I8,
    };
    assert!(matches!(
        BlockScheduler::start(config, Box::new(wrapped), Silence),
        Err(Error::FormatUnsupported { bit_depth: 16, .. })
    ));
}

/// Reports a different sample format than it accepts.
struct FormatOverride<T: PcmSample> {
    inner: ManualDevice<T>,
    format: SampleFormat,
}

impl<T: PcmSample> OutputDevice<T> for FormatOverride<T> {
    fn descriptor(&self) -> &DeviceDescriptor {
        self.inner.descriptor()
    }
    fn format(&self) -> DeviceFormat {
        DeviceFormat {
            sample_format: self.format,
            ..self.inner.format()
        }
    }
    fn register_completion_handler(&mut self, handle: CompletionHandle<T>) -> Result<()> {
        self.inner.register_completion_handler(handle)
    }
    fn submit(&mut self, block: Block<T>) -> Result<()> {
        self.inner.submit(block)
    }
    fn close(&mut self) -> Result<()> {
        self.inner.close()
    }
}

// ---------------------------------------------------------------------------
// Real-time pacing
// ---------------------------------------------------------------------------

#[test]
fn clocked_device_at_real_rate_never_underruns() {
    let config = SchedulerConfig::default();
    let device = ClockedDevice::<i16>::open(&config.device_request(None));
    let log = device.log();
    let mut scheduler =
        BlockScheduler::start(config, Box::new(device), FixedTone::default()).unwrap();

    thread::sleep(Duration::from_millis(300));
    let stats = scheduler.stats();
    scheduler.stop().unwrap();

    assert_eq!(stats.underruns, 0);
    assert!(stats.blocks_completed >= 10, "only {} blocks played", stats.blocks_completed);

    let played = log.played();
    for (position, &index) in played.iter().enumerate() {
        assert_eq!(index, position % 8);
    }
}

#[test]
fn null_backend_streams_every_sample_format() {
    fn run<T: PcmSample>() {
        let config = config(4, 256);
        let backend = NullBackend::with_speed(10.0);
        let device = AudioBackend::<T>::open_output(&backend, &config.device_request(None)).unwrap();
        let mut scheduler =
            BlockScheduler::<T>::start(config, device, FixedTone::default()).unwrap();
        thread::sleep(Duration::from_millis(30));
        let stats = scheduler.stats();
        scheduler.stop().unwrap();
        assert!(stats.blocks_submitted >= 4);
    }

    run::<i8>();
    run::<i16>();
    run::<i32>();
    run::<f32>();
}
