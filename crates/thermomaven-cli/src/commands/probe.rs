//! Probe control commands.

use thermomaven_core::model::Temperature;
use thermomaven_core::{Coordinator, CookingAction, ProbeCommand};

use crate::cli::{GlobalOpts, ProbeArgs, ProbeTargetArgs};
use crate::error::CliError;

pub async fn start(
    coordinator: &Coordinator,
    args: ProbeTargetArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let target = validate_temp(args.temp)?;
    send(
        coordinator,
        &args.probe,
        CookingAction::Start,
        Some(target),
        global,
    )
    .await
}

pub async fn stop(
    coordinator: &Coordinator,
    args: ProbeArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    send(coordinator, &args, CookingAction::Stop, None, global).await
}

pub async fn set_temp(
    coordinator: &Coordinator,
    args: ProbeTargetArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let target = validate_temp(args.temp)?;
    send(
        coordinator,
        &args.probe,
        CookingAction::Modify,
        Some(target),
        global,
    )
    .await
}

async fn send(
    coordinator: &Coordinator,
    args: &ProbeArgs,
    action: CookingAction,
    target: Option<Temperature>,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    coordinator
        .send_probe_command(ProbeCommand {
            device_id: args.device.clone(),
            probe_index: args.probe,
            action,
            target_temperature: target,
        })
        .await?;

    if !global.quiet {
        eprintln!(
            "Command acknowledged. Confirmation arrives with the next telemetry report."
        );
    }
    Ok(())
}

/// Probe hardware range; the firmware clamps anyway, but a typo like
/// 1650 instead of 165 should fail loudly.
fn validate_temp(temp_f: f64) -> Result<Temperature, CliError> {
    if !(0.0..=572.0).contains(&temp_f) {
        return Err(CliError::Validation {
            message: format!("target temperature {temp_f}°F out of range (0-572°F)"),
        });
    }
    Ok(Temperature::from_fahrenheit(temp_f))
}
