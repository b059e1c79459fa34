//! Criterion benchmarks for keysynth-synth components
//!
//! A 512-frame block at 44.1 kHz has an 11.6 ms deadline; these numbers show
//! how much of it each waveform uses.
//!
//! Run with: cargo bench -p keysynth-synth

use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use keysynth_synth::{
    AdsrEnvelope, EnvelopeGenerator, SampleSource, SynthesisContext, VoiceSource, Waveform,
    oscillate,
};
use std::sync::Arc;

const SAMPLE_RATE: f64 = 44100.0;
const BLOCK_SIZES: &[usize] = &[64, 256, 512, 1024];

// ============================================================================
// Oscillator benchmarks
// ============================================================================

fn bench_oscillator_waveforms(c: &mut Criterion) {
    let mut group = c.benchmark_group("Oscillator");

    for waveform in Waveform::ALL {
        for &block_size in BLOCK_SIZES {
            group.bench_with_input(
                BenchmarkId::new(waveform.name(), block_size),
                &block_size,
                |b, &size| {
                    b.iter(|| {
                        let mut sum = 0.0f64;
                        for i in 0..size {
                            sum += oscillate(440.0, i as f64 / SAMPLE_RATE, waveform);
                        }
                        black_box(sum)
                    })
                },
            );
        }
    }

    group.finish();
}

// ============================================================================
// Envelope benchmarks
// ============================================================================

fn bench_envelope(c: &mut Criterion) {
    let mut group = c.benchmark_group("Envelope");

    let env = EnvelopeGenerator::new(AdsrEnvelope::default());
    env.note_on(0.0);

    group.bench_function("amplitude_512", |b| {
        b.iter(|| {
            let mut sum = 0.0f64;
            for i in 0..512 {
                sum += env.amplitude(i as f64 / SAMPLE_RATE);
            }
            black_box(sum)
        })
    });

    group.finish();
}

// ============================================================================
// Voice benchmarks
// ============================================================================

fn bench_voice_block(c: &mut Criterion) {
    let mut group = c.benchmark_group("Voice");

    for waveform in [Waveform::Sine, Waveform::AnalogSaw] {
        let context = Arc::new(SynthesisContext::new(AdsrEnvelope::default()));
        context.note_on(0.0, 220.0);
        let mut voice = VoiceSource::new(context, waveform, 0.5);

        group.bench_function(BenchmarkId::new(waveform.name(), 512), |b| {
            b.iter(|| {
                let mut sum = 0.0f64;
                for i in 0..512 {
                    sum += voice.render(i as f64 / SAMPLE_RATE);
                }
                black_box(sum)
            })
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_oscillator_waveforms,
    bench_envelope,
    bench_voice_block
);
criterion_main!(benches);
