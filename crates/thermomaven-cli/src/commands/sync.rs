//! Forced roster resync.

use thermomaven_core::Coordinator;

use crate::cli::GlobalOpts;
use crate::error::CliError;
use crate::output;

pub async fn handle(coordinator: &Coordinator, global: &GlobalOpts) -> Result<(), CliError> {
    coordinator.request_refresh().await;

    let devices = coordinator.devices_snapshot();
    if !global.quiet {
        eprintln!("Resynced {} device(s).", devices.len());
    }
    output::print_devices(&devices, global.json)
}
