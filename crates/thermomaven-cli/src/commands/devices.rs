//! Device listing.

use thermomaven_core::Coordinator;

use crate::cli::GlobalOpts;
use crate::error::CliError;
use crate::output;

pub async fn handle(coordinator: &Coordinator, global: &GlobalOpts) -> Result<(), CliError> {
    let devices = coordinator.devices_snapshot();
    output::print_devices(&devices, global.json)
}
