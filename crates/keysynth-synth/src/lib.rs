//! Keysynth Synth - the synthesis layer of the keysynth engine
//!
//! This crate computes each output sample as a function of render time. It
//! has no knowledge of blocks or devices: the scheduler in `keysynth-io`
//! calls a [`SampleSource`] once per frame and handles clipping and
//! quantization.
//!
//! # Core Components
//!
//! ## Oscillators
//!
//! Stateless waveform functions of frequency and absolute time:
//!
//! - [`oscillate`] / [`oscillate_with`] - Evaluate a [`Waveform`] at time `t`
//! - [`Waveform`] - Sine, Square, Triangle, AnalogSaw, DigitalSaw, Noise
//!
//! ```rust
//! use keysynth_synth::{Waveform, oscillate};
//!
//! let sample = oscillate(440.0, 0.001, Waveform::Sine);
//! assert!((-1.0..=1.0).contains(&sample));
//! ```
//!
//! ## Envelopes
//!
//! Linear ADSR envelope evaluated from trigger timestamps:
//!
//! - [`AdsrEnvelope`] - Attack/decay/release times, sustain and start levels
//! - [`EnvelopeGenerator`] - Envelope shape plus lock-free note triggers
//! - [`EnvelopeState`] - Phase reported for a given time
//!
//! ```rust
//! use keysynth_synth::{AdsrEnvelope, EnvelopeGenerator};
//!
//! let env = EnvelopeGenerator::new(AdsrEnvelope::default());
//! env.note_on(0.0);
//! assert!((env.amplitude(0.05) - 0.5).abs() < 1e-9);
//! ```
//!
//! ## Sources and control
//!
//! - [`SampleSource`] - The pluggable "sample at time t" capability
//! - [`Silence`], [`FixedTone`], [`VoiceSource`], [`Mixer`] - Source implementations
//! - [`SynthesisContext`] - Frequency and envelope state shared between the
//!   note-input thread and the render thread
//! - [`NoteController`] / [`KeyboardLayout`] - Monophonic key-to-note control
//!
//! # Example: Envelope-driven voice
//!
//! ```rust
//! use std::sync::Arc;
//! use keysynth_synth::{AdsrEnvelope, SampleSource, SynthesisContext, VoiceSource, Waveform};
//!
//! let context = Arc::new(SynthesisContext::new(AdsrEnvelope::default()));
//! let mut voice = VoiceSource::new(Arc::clone(&context), Waveform::Square, 0.2);
//!
//! assert_eq!(voice.render(0.0), 0.0); // no note yet
//!
//! context.note_on(0.0, 220.0);
//! let sample = voice.render(0.5);
//! assert!(sample.abs() <= 0.2);
//! ```

pub mod context;
pub mod envelope;
pub mod note;
pub mod oscillator;
pub mod source;

// Re-export main types at crate root
pub use context::SynthesisContext;
pub use envelope::{AMPLITUDE_FLOOR, AdsrEnvelope, EnvelopeGenerator, EnvelopeState};
pub use note::{KeyboardLayout, NoteController, NoteEvent};
pub use oscillator::{
    ANALOG_SAW_HARMONICS, ParseWaveformError, Waveform, analog_saw, oscillate, oscillate_with,
};
pub use source::{FixedTone, Mixer, SampleSource, Silence, VoiceSource};
