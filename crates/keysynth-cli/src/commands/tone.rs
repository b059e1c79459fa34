//! Fixed tone playback command.

use super::common::{BackendKind, open_output, running_flag, stop_and_report, wait_while_running};
use clap::Args;
use keysynth_config::{AudioConfig, EngineConfig};
use keysynth_io::{BlockScheduler, CpalSample};
use keysynth_synth::{FixedTone, Waveform};

#[derive(Args)]
pub struct ToneArgs {
    /// Waveform: sine, square, triangle, analog_saw, digital_saw, noise
    #[arg(short, long, default_value = "square")]
    waveform: Waveform,

    /// Frequency in Hz
    #[arg(short, long, default_value_t = 220.0)]
    frequency: f64,

    /// Peak amplitude (0.0 - 1.0)
    #[arg(short, long, default_value_t = 0.2)]
    amplitude: f64,

    /// Stop after this many seconds (default: run until Ctrl+C)
    #[arg(short, long)]
    seconds: Option<f64>,

    /// Audio backend
    #[arg(short, long, value_enum, default_value_t = BackendKind::Cpal)]
    backend: BackendKind,

    /// Output device (index, exact name, or partial name)
    #[arg(short, long)]
    output: Option<String>,
}

pub fn run(args: ToneArgs, config: &EngineConfig) -> anyhow::Result<()> {
    if !(0.0..=1.0).contains(&args.amplitude) {
        anyhow::bail!("amplitude must be between 0.0 and 1.0, got {}", args.amplitude);
    }
    if args.frequency.is_nan() || args.frequency <= 0.0 {
        anyhow::bail!("frequency must be positive, got {}", args.frequency);
    }

    let mut audio = config.audio.clone();
    if let Some(output) = &args.output {
        audio.device = Some(output.clone());
    }
    let format = audio.sample_format()?;

    let mut tone = FixedTone::new(args.waveform, args.frequency, args.amplitude);
    if let Some(seed) = config.voice.noise_seed {
        tone = tone.with_seed(seed);
    }

    with_sample_type!(format, play_tone(&args, &audio, tone))
}

fn play_tone<T: CpalSample>(
    args: &ToneArgs,
    audio: &AudioConfig,
    tone: FixedTone,
) -> anyhow::Result<()> {
    let device = open_output::<T>(args.backend, &audio.device_request())?;
    let device_name = device.descriptor().name.clone();
    let mut scheduler = BlockScheduler::<T>::start(audio.scheduler_config(), device, tone)?;

    println!(
        "Playing {} Hz {} at {:.2} on {} ({} Hz, {} ch, {})",
        args.frequency,
        args.waveform,
        args.amplitude,
        device_name,
        audio.sample_rate,
        audio.channels,
        audio.sample_format
    );
    if args.seconds.is_none() {
        println!("Press Ctrl+C to stop.");
    }

    let running = running_flag()?;
    wait_while_running(&running, args.seconds);
    stop_and_report(&mut scheduler)
}
