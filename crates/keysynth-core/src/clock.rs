//! Monotonic render-time clock.

use core::sync::atomic::{AtomicU64, Ordering};

/// Render time shared between the render thread and event producers.
///
/// The clock counts rendered frames and derives seconds as
/// `frames / sample_rate`, so each [`advance`](Self::advance) moves time
/// forward by exactly `1 / sample_rate` without accumulating rounding drift.
///
/// Only the render thread advances the clock. Any thread may call
/// [`now`](Self::now) to timestamp note events; a reader may see a value up to
/// one block old, which is a control latency and not a correctness issue.
/// There is no reset and no rollback.
///
/// # Example
///
/// ```rust
/// use keysynth_core::SampleClock;
///
/// let clock = SampleClock::new(48000);
/// assert_eq!(clock.now(), 0.0);
///
/// for _ in 0..48000 {
///     clock.advance();
/// }
/// assert!((clock.now() - 1.0).abs() < 1e-12);
/// ```
#[derive(Debug)]
pub struct SampleClock {
    frames: AtomicU64,
    sample_rate: f64,
}

impl SampleClock {
    /// Create a clock at time zero.
    pub fn new(sample_rate: u32) -> Self {
        Self {
            frames: AtomicU64::new(0),
            sample_rate: f64::from(sample_rate.max(1)),
        }
    }

    /// Current render time in seconds.
    #[inline]
    pub fn now(&self) -> f64 {
        self.frames.load(Ordering::Acquire) as f64 / self.sample_rate
    }

    /// Number of frames rendered so far.
    #[inline]
    pub fn frames(&self) -> u64 {
        self.frames.load(Ordering::Acquire)
    }

    /// Sample rate in Hz.
    pub fn sample_rate(&self) -> f64 {
        self.sample_rate
    }

    /// Duration of one frame in seconds.
    pub fn step(&self) -> f64 {
        1.0 / self.sample_rate
    }

    /// Advance by one frame. Render thread only.
    #[inline]
    pub fn advance(&self) {
        self.frames.fetch_add(1, Ordering::Release);
    }
}
