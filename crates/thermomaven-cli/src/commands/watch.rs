//! Live telemetry stream.

use chrono::Local;
use owo_colors::OwoColorize;

use thermomaven_core::model::DeviceRecord;
use thermomaven_core::Coordinator;

use crate::cli::{GlobalOpts, WatchArgs};
use crate::error::CliError;
use crate::output;

/// Print roster updates as they arrive, until Ctrl-C.
pub async fn handle(
    coordinator: &Coordinator,
    args: WatchArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let mut updates = coordinator.subscribe_devices();

    if !global.quiet {
        eprintln!("Watching for updates (Ctrl-C to stop)...");
    }

    // Show the current state before waiting for changes.
    print_update(&coordinator.devices_snapshot(), &args, global)?;

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            changed = updates.changed() => {
                if changed.is_err() {
                    break;
                }
                let devices = updates.borrow_and_update().clone();
                print_update(&devices, &args, global)?;
            }
        }
    }
    Ok(())
}

fn print_update(
    devices: &[DeviceRecord],
    args: &WatchArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let filtered: Vec<DeviceRecord> = devices
        .iter()
        .filter(|d| match &args.device {
            Some(id) => d.id_key() == id,
            None => true,
        })
        .cloned()
        .collect();

    if global.json {
        return output::print_json(&filtered);
    }

    let stamp = Local::now().format("%H:%M:%S");
    println!("{}", format!("── {stamp} ──").dimmed());
    output::print_devices(&filtered, false)
}
