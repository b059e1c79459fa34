//! Lock-free `f64` cell.

use core::sync::atomic::{AtomicU64, Ordering};

/// An `f64` stored as its bit pattern in an [`AtomicU64`].
///
/// Loads and stores are single atomic operations, so a reader never observes
/// a torn value. There is no read-modify-write: cells shared this way are
/// expected to have a single writer.
#[derive(Debug, Default)]
pub struct AtomicF64(AtomicU64);

impl AtomicF64 {
    /// Create a cell holding `value`.
    pub fn new(value: f64) -> Self {
        Self(AtomicU64::new(value.to_bits()))
    }

    /// Load the current value.
    #[inline]
    pub fn load(&self, order: Ordering) -> f64 {
        f64::from_bits(self.0.load(order))
    }

    /// Store a new value.
    #[inline]
    pub fn store(&self, value: f64, order: Ordering) {
        self.0.store(value.to_bits(), order);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_load() {
        let cell = AtomicF64::new(1.5);
        assert_eq!(cell.load(Ordering::Relaxed), 1.5);
        cell.store(-0.25, Ordering::Relaxed);
        assert_eq!(cell.load(Ordering::Relaxed), -0.25);
    }

    #[test]
    fn test_default_is_zero() {
        assert_eq!(AtomicF64::default().load(Ordering::Relaxed), 0.0);
    }
}
