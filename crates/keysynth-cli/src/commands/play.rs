//! Interactive keyboard command.
//!
//! The terminal delivers whole lines, so a line holding one mapped key
//! presses it, an empty line releases the sounding note, and `q` quits.

use super::common::{BackendKind, open_output, running_flag, stop_and_report};
use clap::Args;
use crossbeam_channel::{Receiver, RecvTimeoutError};
use keysynth_config::{AudioConfig, EngineConfig};
use keysynth_io::{BlockScheduler, CpalSample};
use keysynth_synth::{NoteController, SynthesisContext, VoiceSource};
use std::io::BufRead;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Duration;

/// Longest tail played after quitting.
const MAX_RELEASE_TAIL: Duration = Duration::from_secs(2);

#[derive(Args)]
pub struct PlayArgs {
    /// Audio backend
    #[arg(short, long, value_enum, default_value_t = BackendKind::Cpal)]
    backend: BackendKind,

    /// Output device (index, exact name, or partial name)
    #[arg(short, long)]
    output: Option<String>,
}

/// What a line of input asks for.
#[derive(Debug, PartialEq, Eq)]
enum Input {
    Key(char),
    Release,
    Quit,
    Invalid,
}

fn parse_line(line: &str) -> Input {
    let line = line.trim();
    let mut chars = line.chars();
    match (chars.next(), chars.next()) {
        (None, _) => Input::Release,
        (Some('q'), None) => Input::Quit,
        _ if line.eq_ignore_ascii_case("quit") => Input::Quit,
        (Some(key), None) => Input::Key(key),
        _ => Input::Invalid,
    }
}

/// Forwards stdin lines until EOF. Dropping the sender signals EOF.
fn spawn_stdin_reader() -> anyhow::Result<Receiver<String>> {
    let (tx, rx) = crossbeam_channel::unbounded();
    thread::Builder::new()
        .name("keysynth-stdin".into())
        .spawn(move || {
            for line in std::io::stdin().lock().lines() {
                let Ok(line) = line else { break };
                if tx.send(line).is_err() {
                    break;
                }
            }
        })?;
    Ok(rx)
}

pub fn run(args: PlayArgs, config: &EngineConfig) -> anyhow::Result<()> {
    let mut audio = config.audio.clone();
    if let Some(output) = &args.output {
        audio.device = Some(output.clone());
    }
    let format = audio.sample_format()?;
    with_sample_type!(format, play_keyboard(&args, &audio, config))
}

fn play_keyboard<T: CpalSample>(
    args: &PlayArgs,
    audio: &AudioConfig,
    config: &EngineConfig,
) -> anyhow::Result<()> {
    let waveform = config.voice.waveform()?;
    let context = Arc::new(SynthesisContext::new(config.voice.envelope()));
    let voice = VoiceSource::new(Arc::clone(&context), waveform, config.voice.volume)
        .with_seed(config.voice.noise_seed);

    let device = open_output::<T>(args.backend, &audio.device_request())?;
    let mut scheduler = BlockScheduler::<T>::start(audio.scheduler_config(), device, voice)?;
    let mut controller =
        NoteController::with_layout(context, scheduler.clock(), config.keyboard.layout());

    let keys: String = controller.layout().keys().iter().collect();
    println!("keysynth: {} voice, keys {}", waveform, keys);
    println!("Type a key and press Enter to play it. Empty line releases, q quits.");

    let running = running_flag()?;
    let lines = spawn_stdin_reader()?;
    read_keys(&lines, &running, &mut controller);

    controller.release_all();
    let tail = Duration::from_secs_f64(config.voice.release.max(0.0)).min(MAX_RELEASE_TAIL);
    thread::sleep(tail);

    stop_and_report(&mut scheduler)
}

fn read_keys(lines: &Receiver<String>, running: &AtomicBool, controller: &mut NoteController) {
    while running.load(Ordering::SeqCst) {
        let line = match lines.recv_timeout(Duration::from_millis(50)) {
            Ok(line) => line,
            Err(RecvTimeoutError::Timeout) => continue,
            Err(RecvTimeoutError::Disconnected) => break,
        };

        match parse_line(&line) {
            Input::Quit => break,
            Input::Release => controller.release_all(),
            Input::Key(key) => {
                // Each line is a fresh strike, even of the sounding key.
                if controller.current_key().is_some()
                    && controller.current_key() == controller.layout().index_of(key)
                {
                    controller.release_all();
                }
                if controller.key_down(key) {
                    let index = controller.layout().index_of(key).unwrap_or_default();
                    println!("{} {:.2} Hz", key, controller.layout().frequency_at(index));
                } else {
                    println!("'{}' is not a key", key);
                }
            }
            Input::Invalid => println!("Enter one key per line"),
        }
    }
}
