//! keysynth CLI - play tones and a monophonic keyboard through the block scheduler.

mod commands;

use clap::{ArgAction, Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "keysynth")]
#[command(author, version, about = "Real-time keyboard synthesizer", long_about = None)]
struct Cli {
    /// Configuration file (default: keysynth.toml in the user config directory)
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List audio output devices
    Devices(commands::devices::DevicesArgs),

    /// Play a fixed tone
    Tone(commands::tone::ToneArgs),

    /// Play notes from the keyboard (one key per line on stdin)
    Play(commands::play::PlayArgs),
}

/// Logs go to stderr; `RUST_LOG` overrides the verbosity flag.
fn init_tracing(verbose: u8) {
    let default_level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| default_level.into()),
        )
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config = commands::common::load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Devices(args) => commands::devices::run(args),
        Commands::Tone(args) => commands::tone::run(args, &config),
        Commands::Play(args) => commands::play::run(args, &config),
    }
}
