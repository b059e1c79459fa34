//! Sample blocks and the fixed ring that owns them.

use crate::{Error, Result};
use keysynth_core::PcmSample;

/// One fixed-size block of interleaved PCM samples.
///
/// A block is created once when the scheduler starts and is recycled for the
/// scheduler's whole lifetime. Ownership tracks where it is: while the render
/// thread holds it the block is being filled; once passed to
/// [`OutputDevice::submit`](crate::OutputDevice::submit) it is in flight until
/// the device hands it back through a [`CompletionHandle`](crate::CompletionHandle).
///
/// Samples are interleaved: `[c0, c1, .., c0, c1, ..]`, one group per frame.
#[derive(Debug, Clone, PartialEq)]
pub struct Block<T> {
    index: usize,
    samples: Vec<T>,
}

impl<T: PcmSample> Block<T> {
    /// Ring position of this block (0-based).
    pub fn index(&self) -> usize {
        self.index
    }

    /// Interleaved samples.
    pub fn samples(&self) -> &[T] {
        &self.samples
    }

    /// Mutable interleaved samples.
    pub fn samples_mut(&mut self) -> &mut [T] {
        &mut self.samples
    }

    /// Total sample count (frames x channels).
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// Returns `true` if the block holds no samples.
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Builds a block outside a scheduler, for device tests.
    pub fn silent(index: usize, len: usize) -> Self {
        Self {
            index,
            samples: vec![T::SILENCE; len],
        }
    }
}

/// The render thread's view of the block pool.
///
/// Slot `i` holds block `i` while it is available to the render loop and is
/// empty while the block is in flight.
#[derive(Debug)]
pub(crate) struct BlockRing<T> {
    slots: Vec<Option<Block<T>>>,
    current: usize,
}

impl<T: PcmSample> BlockRing<T> {
    /// Allocates `block_count` zeroed blocks of `block_len` samples each.
    ///
    /// Uses fallible reservation so an oversized request surfaces as
    /// [`Error::Allocation`] rather than an abort.
    pub(crate) fn allocate(block_count: usize, block_len: usize) -> Result<Self> {
        let failed = || Error::Allocation {
            blocks: block_count,
            samples: block_len,
        };

        let mut slots = Vec::new();
        slots.try_reserve_exact(block_count).map_err(|_| failed())?;
        for index in 0..block_count {
            let mut samples = Vec::new();
            samples.try_reserve_exact(block_len).map_err(|_| failed())?;
            samples.resize(block_len, T::SILENCE);
            slots.push(Some(Block { index, samples }));
        }

        Ok(Self { slots, current: 0 })
    }

    /// Number of blocks in the ring.
    pub(crate) fn block_count(&self) -> usize {
        self.slots.len()
    }

    /// Index of the next block to render.
    pub(crate) fn current(&self) -> usize {
        self.current
    }

    /// Returns `true` if block `index` is currently owned by the device.
    pub(crate) fn is_in_flight(&self, index: usize) -> bool {
        self.slots.get(index).is_some_and(Option::is_none)
    }

    /// Takes the current block for rendering.
    ///
    /// Fails with [`Error::OutOfOrderCompletion`] when the device has freed a
    /// block but not the one that is due.
    pub(crate) fn take_current(&mut self) -> Result<Block<T>> {
        self.slots[self.current]
            .take()
            .ok_or(Error::OutOfOrderCompletion {
                expected: self.current,
            })
    }

    /// Moves on to the next ring position.
    pub(crate) fn advance(&mut self) {
        self.current = (self.current + 1) % self.slots.len();
    }

    /// Puts a returned block back into its slot.
    pub(crate) fn restore(&mut self, block: Block<T>) -> Result<()> {
        let index = block.index;
        match self.slots.get_mut(index) {
            Some(slot) if slot.is_none() => {
                *slot = Some(block);
                Ok(())
            }
            _ => Err(Error::DuplicateCompletion { index }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allocate_zeroes_every_block() {
        let ring = BlockRing::<i16>::allocate(8, 512).unwrap();
        assert_eq!(ring.block_count(), 8);
        assert_eq!(ring.current(), 0);
        for slot in &ring.slots {
            let block = slot.as_ref().unwrap();
            assert_eq!(block.len(), 512);
            assert!(block.samples().iter().all(|&s| s == 0));
        }
    }

    #[test]
    fn blocks_are_numbered_in_ring_order() {
        let ring = BlockRing::<f32>::allocate(4, 16).unwrap();
        let indices: Vec<usize> = ring
            .slots
            .iter()
            .map(|slot| slot.as_ref().unwrap().index())
            .collect();
        assert_eq!(indices, vec![0, 1, 2, 3]);
    }

    #[test]
    fn oversized_allocation_fails_cleanly() {
        let result = BlockRing::<i32>::allocate(2, usize::MAX / 2);
        assert!(matches!(
            result,
            Err(Error::Allocation { blocks: 2, .. })
        ));
    }

    #[test]
    fn take_marks_in_flight_and_restore_clears() {
        let mut ring = BlockRing::<i16>::allocate(3, 4).unwrap();
        let block = ring.take_current().unwrap();
        assert_eq!(block.index(), 0);
        assert!(ring.is_in_flight(0));
        assert!(!ring.is_in_flight(1));

        ring.restore(block).unwrap();
        assert!(!ring.is_in_flight(0));
    }

    #[test]
    fn advance_wraps_around() {
        let mut ring = BlockRing::<i16>::allocate(3, 4).unwrap();
        for expected in [1, 2, 0, 1] {
            ring.advance();
            assert_eq!(ring.current(), expected);
        }
    }

    #[test]
    fn taking_an_in_flight_block_is_out_of_order() {
        let mut ring = BlockRing::<i16>::allocate(2, 4).unwrap();
        let _held = ring.take_current().unwrap();
        assert!(matches!(
            ring.take_current(),
            Err(Error::OutOfOrderCompletion { expected: 0 })
        ));
    }

    #[test]
    fn restoring_an_idle_block_is_a_duplicate() {
        let mut ring = BlockRing::<i16>::allocate(2, 4).unwrap();
        let stray = Block::silent(1, 4);
        assert!(matches!(
            ring.restore(stray),
            Err(Error::DuplicateCompletion { index: 1 })
        ));
    }

    #[test]
    fn restoring_an_unknown_index_is_rejected() {
        let mut ring = BlockRing::<i16>::allocate(2, 4).unwrap();
        assert!(ring.restore(Block::silent(7, 4)).is_err());
    }
}
