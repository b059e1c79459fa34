//! Audio device listing command.

use super::common::BackendKind;
use clap::Args;
use keysynth_io::{AudioBackend, CpalBackend, NullBackend};

#[derive(Args)]
pub struct DevicesArgs {
    /// Backend to enumerate
    #[arg(short, long, value_enum, default_value_t = BackendKind::Cpal)]
    backend: BackendKind,
}

pub fn run(args: DevicesArgs) -> anyhow::Result<()> {
    let devices = match args.backend {
        BackendKind::Cpal => AudioBackend::<i16>::list_devices(&CpalBackend::new())?,
        BackendKind::Null => AudioBackend::<i16>::list_devices(&NullBackend::new())?,
    };

    if devices.is_empty() {
        println!("No output devices found.");
        return Ok(());
    }

    println!("Output Devices:");
    for device in &devices {
        let default = if device.is_default { " (default)" } else { "" };
        println!(
            "  [{}] {} ({} Hz, up to {} ch){}",
            device.index, device.name, device.default_sample_rate, device.max_channels, default
        );
    }
    println!();
    println!("Tip: Use device index or partial name with --output:");
    println!("  keysynth tone --output 0");

    Ok(())
}
