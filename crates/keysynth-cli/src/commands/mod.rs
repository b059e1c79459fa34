//! CLI subcommands.

/// Runs `$run::<T>(args..)` with `T` the Rust type of a [`SampleFormat`](keysynth_core::SampleFormat).
macro_rules! with_sample_type {
    ($format:expr, $run:ident($($arg:expr),* $(,)?)) => {
        match $format {
            keysynth_core::SampleFormat::I8 => $run::<i8>($($arg),*),
            keysynth_core::SampleFormat::I16 => $run::<i16>($($arg),*),
            keysynth_core::SampleFormat::I32 => $run::<i32>($($arg),*),
            keysynth_core::SampleFormat::F32 => $run::<f32>($($arg),*),
        }
    };
}

pub mod common;
pub mod devices;
pub mod play;
pub mod tone;
