//! Monophonic note control.
//!
//! [`NoteController`] turns key or note events into the three mutations a
//! [`SynthesisContext`] accepts, stamping each with the current render time.
//! Only one note sounds at a time: pressing a new key retriggers the envelope
//! at the new pitch, and only releasing the sounding key starts the release.

use crate::context::SynthesisContext;
use keysynth_core::{SampleClock, note_frequency};
use std::sync::Arc;

/// A discrete note event pushed by an input source.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum NoteEvent {
    /// Start a note at the given frequency.
    On {
        /// Frequency in Hz.
        frequency: f64,
    },
    /// Release the sounding note.
    Off,
    /// Change pitch without retriggering.
    SetFrequency {
        /// Frequency in Hz.
        frequency: f64,
    },
}

/// Mapping of computer-keyboard keys to equal-tempered notes.
///
/// The default layout uses the bottom two rows of a QWERTY keyboard as a
/// piano: `z x c v b n m , . /` are white keys and `s f g j k l` the black
/// keys between them. Sixteen keys span A2 (110 Hz) to C4.
///
/// # Example
///
/// ```rust
/// use keysynth_synth::KeyboardLayout;
///
/// let layout = KeyboardLayout::default();
/// assert_eq!(layout.frequency_of('z'), Some(110.0));
/// assert!((layout.frequency_of(',').unwrap() - 220.0).abs() < 1e-9);
/// assert_eq!(layout.frequency_of('q'), None);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct KeyboardLayout {
    keys: Vec<char>,
    base_frequency: f64,
}

impl Default for KeyboardLayout {
    fn default() -> Self {
        Self::new(Self::DEFAULT_KEYS, 110.0)
    }
}

impl KeyboardLayout {
    /// Default key order, one semitone apart.
    pub const DEFAULT_KEYS: &'static str = "zsxcfvgbnjmk,l./";

    /// Create a layout where the `n`th character of `keys` plays `n`
    /// semitones above `base_frequency`.
    pub fn new(keys: &str, base_frequency: f64) -> Self {
        Self {
            keys: keys.chars().map(|c| c.to_ascii_lowercase()).collect(),
            base_frequency,
        }
    }

    /// Same keys with a different base frequency.
    pub fn with_base_frequency(mut self, base_frequency: f64) -> Self {
        self.base_frequency = base_frequency;
        self
    }

    /// Frequency of the first key.
    pub fn base_frequency(&self) -> f64 {
        self.base_frequency
    }

    /// Number of mapped keys.
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    /// Whether no keys are mapped.
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Semitone index of `key`, case-insensitive.
    pub fn index_of(&self, key: char) -> Option<usize> {
        let key = key.to_ascii_lowercase();
        self.keys.iter().position(|&k| k == key)
    }

    /// Frequency played by `key`.
    pub fn frequency_of(&self, key: char) -> Option<f64> {
        self.index_of(key).map(|i| self.frequency_at(i))
    }

    /// Frequency of the key at semitone index `index`.
    pub fn frequency_at(&self, index: usize) -> f64 {
        note_frequency(self.base_frequency, index as i32)
    }

    /// The mapped keys in semitone order.
    pub fn keys(&self) -> &[char] {
        &self.keys
    }
}

/// Translates input events into note-on, note-off and pitch changes on a
/// shared [`SynthesisContext`], timestamped from the render [`SampleClock`].
///
/// The controller runs on the input thread. It holds the only write access
/// to the context's triggers by convention; the render thread only reads.
///
/// # Example
///
/// ```rust
/// use std::sync::Arc;
/// use keysynth_core::SampleClock;
/// use keysynth_synth::{AdsrEnvelope, EnvelopeState, NoteController, SynthesisContext};
///
/// let context = Arc::new(SynthesisContext::new(AdsrEnvelope::default()));
/// let clock = Arc::new(SampleClock::new(44100));
/// let mut controller = NoteController::new(Arc::clone(&context), clock);
///
/// assert!(controller.key_down('z'));
/// assert_eq!(context.frequency(), 110.0);
/// controller.key_up('z');
/// assert!(!context.envelope().is_note_on());
/// ```
#[derive(Debug)]
pub struct NoteController {
    context: Arc<SynthesisContext>,
    clock: Arc<SampleClock>,
    layout: KeyboardLayout,
    current_key: Option<usize>,
}

impl NoteController {
    /// Create a controller with the default keyboard layout.
    pub fn new(context: Arc<SynthesisContext>, clock: Arc<SampleClock>) -> Self {
        Self::with_layout(context, clock, KeyboardLayout::default())
    }

    /// Create a controller with a custom keyboard layout.
    pub fn with_layout(
        context: Arc<SynthesisContext>,
        clock: Arc<SampleClock>,
        layout: KeyboardLayout,
    ) -> Self {
        Self {
            context,
            clock,
            layout,
            current_key: None,
        }
    }

    /// The keyboard layout.
    pub fn layout(&self) -> &KeyboardLayout {
        &self.layout
    }

    /// Semitone index of the sounding key, if any.
    pub fn current_key(&self) -> Option<usize> {
        self.current_key
    }

    /// Start a note at `frequency_hz`, stamped with the current render time.
    pub fn note_on(&self, frequency_hz: f64) {
        let now = self.clock.now();
        tracing::debug!(time = now, frequency = frequency_hz, "note on");
        self.context.note_on(now, frequency_hz);
    }

    /// Release the sounding note, stamped with the current render time.
    pub fn note_off(&self) {
        let now = self.clock.now();
        tracing::debug!(time = now, "note off");
        self.context.note_off(now);
    }

    /// Apply an event.
    pub fn handle(&mut self, event: NoteEvent) {
        match event {
            NoteEvent::On { frequency } => {
                self.current_key = None;
                self.note_on(frequency);
            }
            NoteEvent::Off => {
                self.current_key = None;
                self.note_off();
            }
            NoteEvent::SetFrequency { frequency } => self.context.set_frequency(frequency),
        }
    }

    /// Press `key`. Returns `false` if the key is not mapped.
    ///
    /// Pressing the key that is already sounding does nothing; any other
    /// mapped key retriggers at its pitch.
    pub fn key_down(&mut self, key: char) -> bool {
        let Some(index) = self.layout.index_of(key) else {
            return false;
        };
        if self.current_key != Some(index) {
            self.note_on(self.layout.frequency_at(index));
            self.current_key = Some(index);
        }
        true
    }

    /// Release `key`. Only releasing the sounding key starts the release.
    pub fn key_up(&mut self, key: char) {
        if let Some(index) = self.layout.index_of(key)
            && self.current_key == Some(index)
        {
            self.release_all();
        }
    }

    /// Release whatever is sounding.
    pub fn release_all(&mut self) {
        if self.current_key.take().is_some() {
            self.note_off();
        }
    }
}
