//! Keysynth Core - sample-level primitives shared by the synthesis and I/O layers
//!
//! Everything in this crate is allocation-free and safe to call from the
//! real-time render thread.
//!
//! # Components
//!
//! - [`clip`] - Symmetric clamp applied once per sample before quantization
//! - [`PcmSample`] / [`SampleFormat`] - Conversion from normalized `f64` samples
//!   to the integer (or float) width the output device consumes
//! - [`SampleClock`] - Monotonic render-time accumulator, written by the render
//!   thread and readable from any thread for event timestamping
//! - [`AtomicF64`] - Lock-free `f64` cell used for cross-thread scalars
//!
//! # Example
//!
//! ```rust
//! use keysynth_core::{PcmSample, SampleClock, clip};
//!
//! let clock = SampleClock::new(44100);
//! let sample = clip(1.7, 1.0);
//! assert_eq!(i16::from_normalized(sample), i16::MAX);
//!
//! clock.advance();
//! assert!((clock.now() - 1.0 / 44100.0).abs() < 1e-12);
//! ```
//!
//! # no_std Support
//!
//! Disable the default `std` feature to use the crate on embedded targets
//! with 64-bit atomics.

#![cfg_attr(not(feature = "std"), no_std)]

pub mod atomic;
pub mod clock;
pub mod math;
pub mod pcm;

pub use atomic::AtomicF64;
pub use clock::SampleClock;
pub use math::{clip, hz_to_omega, lerp, note_frequency, semitone_ratio};
pub use pcm::{PcmSample, SampleFormat};
