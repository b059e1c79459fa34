//! Property-based tests for keysynth-synth.
//!
//! Checks oscillator output ranges and envelope bounds over randomized
//! frequencies, times and envelope shapes.

use keysynth_synth::{AMPLITUDE_FLOOR, AdsrEnvelope, EnvelopeGenerator, Waveform, oscillate_with};
use proptest::prelude::*;
use rand::SeedableRng;
use rand::rngs::StdRng;

fn waveform_strategy() -> impl Strategy<Value = Waveform> {
    (0usize..Waveform::ALL.len()).prop_map(|i| Waveform::ALL[i])
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(2000))]

    /// Every waveform stays within [-1, 1] for any positive frequency and time.
    #[test]
    fn oscillator_in_range(
        waveform in waveform_strategy(),
        frequency in 0.01f64..20_000.0,
        time in -1000.0f64..1000.0,
        seed in any::<u64>(),
    ) {
        let mut rng = StdRng::seed_from_u64(seed);
        let out = oscillate_with(frequency, time, waveform, &mut rng);
        prop_assert!(
            (-1.0..=1.0).contains(&out),
            "{} at f={}, t={} produced {}", waveform, frequency, time, out
        );
    }

    /// Square output is exactly +1 or -1.
    #[test]
    fn square_is_binary(frequency in 0.01f64..20_000.0, time in 0.0f64..100.0) {
        let mut rng = StdRng::seed_from_u64(0);
        let out = oscillate_with(frequency, time, Waveform::Square, &mut rng);
        prop_assert!(out == 1.0 || out == -1.0);
    }

    /// Envelope amplitude stays within [0, max(start, sustain)] and is never
    /// in the open interval (0, floor].
    #[test]
    fn envelope_bounded(
        attack in 0.0f64..2.0,
        decay in 0.0f64..2.0,
        sustain in 0.0f64..=1.0,
        release in 0.0f64..2.0,
        start in 0.0f64..=1.0,
        on_time in 0.0f64..10.0,
        held in 0.0f64..10.0,
        probe in 0.0f64..30.0,
    ) {
        let shape = AdsrEnvelope::new(attack, decay, sustain, release, start);
        let env = EnvelopeGenerator::new(shape);
        env.note_on(on_time);
        let during = env.amplitude(on_time + probe.min(held));
        env.note_off(on_time + held);
        let after = env.amplitude(on_time + held + probe);

        let peak = start.max(sustain);
        for amp in [during, after] {
            prop_assert!(amp >= 0.0 && amp <= peak + 1e-12, "amplitude {} above {}", amp, peak);
            prop_assert!(amp == 0.0 || amp > AMPLITUDE_FLOOR);
        }
    }

    /// After a full release time the envelope is silent.
    #[test]
    fn envelope_silent_after_release(
        release in 0.001f64..2.0,
        sustain in 0.0f64..=1.0,
        off_time in 0.0f64..10.0,
        extra in 0.0f64..5.0,
    ) {
        let env = EnvelopeGenerator::new(AdsrEnvelope::new(0.01, 0.01, sustain, release, 1.0));
        env.note_on(0.0);
        env.note_off(off_time);
        prop_assert_eq!(env.amplitude(off_time + release + extra), 0.0);
    }
}
