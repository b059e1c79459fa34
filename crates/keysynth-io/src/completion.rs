//! Completion signalling between an output device and the render thread.
//!
//! The device side never blocks for longer than a short critical section: a
//! completed block is pushed onto a bounded channel, the free-block counter is
//! incremented, and the render thread is woken under the shared lock so a
//! wake-up cannot be lost between the render thread's check and its wait.
//!
//! That lock is the one blocking step allowed on the device side, including
//! inside a cpal output callback. It guards no data and the render thread only
//! holds it to test the predicate or inside `Condvar::wait`, which releases
//! it, so a completion waits at most for a counter check, never for rendering.

use crate::Block;
use crossbeam_channel::{Receiver, Sender, TrySendError};
use keysynth_core::PcmSample;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Condvar, Mutex, PoisonError};

/// State shared between the scheduler, its render thread, and the device.
#[derive(Debug)]
pub(crate) struct Shared {
    block_count: usize,
    free: AtomicUsize,
    stop: AtomicBool,
    lock: Mutex<()>,
    available: Condvar,
    submitted: AtomicU64,
    completed: AtomicU64,
    underruns: AtomicU64,
}

impl Shared {
    /// All blocks start free.
    pub(crate) fn new(block_count: usize) -> Self {
        Self {
            block_count,
            free: AtomicUsize::new(block_count),
            stop: AtomicBool::new(false),
            lock: Mutex::new(()),
            available: Condvar::new(),
            submitted: AtomicU64::new(0),
            completed: AtomicU64::new(0),
            underruns: AtomicU64::new(0),
        }
    }

    pub(crate) fn block_count(&self) -> usize {
        self.block_count
    }

    pub(crate) fn free(&self) -> usize {
        self.free.load(Ordering::Acquire)
    }

    /// Blocks until a block is free or stop is requested.
    ///
    /// Returns `false` on stop. Spurious wake-ups re-check the predicate.
    pub(crate) fn wait_for_free_block(&self) -> bool {
        let guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);
        let _guard = self
            .available
            .wait_while(guard, |_| {
                self.free.load(Ordering::Acquire) == 0 && !self.stop.load(Ordering::Acquire)
            })
            .unwrap_or_else(PoisonError::into_inner);
        !self.stop.load(Ordering::Acquire)
    }

    /// Claims one free block. Only the render thread calls this, after
    /// [`wait_for_free_block`](Self::wait_for_free_block) returned `true`.
    pub(crate) fn claim_block(&self) {
        self.free.fetch_sub(1, Ordering::AcqRel);
    }

    pub(crate) fn record_submitted(&self) -> u64 {
        self.submitted.fetch_add(1, Ordering::Relaxed) + 1
    }

    pub(crate) fn submitted(&self) -> u64 {
        self.submitted.load(Ordering::Relaxed)
    }

    pub(crate) fn completed(&self) -> u64 {
        self.completed.load(Ordering::Relaxed)
    }

    pub(crate) fn underruns(&self) -> u64 {
        self.underruns.load(Ordering::Relaxed)
    }

    /// Sets the stop flag and wakes the render thread.
    pub(crate) fn request_stop(&self) {
        let _guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);
        self.stop.store(true, Ordering::Release);
        self.available.notify_all();
    }

    fn release_block(&self) {
        let _guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);
        self.free.fetch_add(1, Ordering::AcqRel);
        self.completed.fetch_add(1, Ordering::Relaxed);
        self.available.notify_one();
    }
}

/// Device-side handle for returning played blocks to the scheduler.
///
/// Cloneable and `Send`; a device keeps one and calls
/// [`complete`](Self::complete) from whatever thread its playback runs on.
#[derive(Debug)]
pub struct CompletionHandle<T> {
    shared: Arc<Shared>,
    returned: Sender<Block<T>>,
}

impl<T> Clone for CompletionHandle<T> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
            returned: self.returned.clone(),
        }
    }
}

impl<T: PcmSample> CompletionHandle<T> {
    /// Creates a handle and the receiving end the render thread drains.
    pub(crate) fn channel(shared: Arc<Shared>) -> (Self, Receiver<Block<T>>) {
        let (returned, receiver) = crossbeam_channel::bounded(shared.block_count());
        (Self { shared, returned }, receiver)
    }

    /// Hands a fully played block back and wakes the render thread.
    ///
    /// A block that cannot be accepted (scheduler gone, or more returns than
    /// blocks exist) is dropped without touching the free counter.
    pub fn complete(&self, block: Block<T>) {
        let index = block.index();
        match self.returned.try_send(block) {
            Ok(()) => self.shared.release_block(),
            Err(TrySendError::Full(_)) => {
                tracing::error!(index, "completion queue full, block returned twice");
            }
            Err(TrySendError::Disconnected(_)) => {
                tracing::trace!(index, "completion after scheduler shutdown");
            }
        }
    }

    /// Records that the device ran out of queued audio and played silence.
    pub fn report_underrun(&self) {
        self.shared.underruns.fetch_add(1, Ordering::Relaxed);
    }

    /// Blocks currently available to the render loop.
    pub fn free_blocks(&self) -> usize {
        self.shared.free()
    }
}
