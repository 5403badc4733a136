//! Command dispatch: bridges CLI args -> coordinator calls -> output.

pub mod account;
pub mod devices;
pub mod probe;
pub mod sync;
pub mod watch;

use thermomaven_core::Coordinator;

use crate::cli::{Command, GlobalOpts};
use crate::error::CliError;

/// Dispatch a cloud-bound command to the appropriate handler.
pub async fn dispatch(
    cmd: Command,
    coordinator: &Coordinator,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    match cmd {
        Command::Devices => devices::handle(coordinator, global).await,
        Command::Account => account::handle(coordinator, global).await,
        Command::Watch(args) => watch::handle(coordinator, args, global).await,
        Command::Start(args) => probe::start(coordinator, args, global).await,
        Command::Stop(args) => probe::stop(coordinator, args, global).await,
        Command::SetTemp(args) => probe::set_temp(coordinator, args, global).await,
        Command::Sync => sync::handle(coordinator, global).await,
    }
}
