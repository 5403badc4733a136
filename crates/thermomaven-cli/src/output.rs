//! Output formatting: tables for humans, JSON for pipes.

use owo_colors::OwoColorize;
use tabled::settings::Style;
use tabled::{Table, Tabled};

use thermomaven_core::model::{CookingState, DeviceRecord};

use crate::error::CliError;

#[derive(Tabled)]
struct DeviceRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "NAME")]
    name: String,
    #[tabled(rename = "MODEL")]
    model: String,
    #[tabled(rename = "STATUS")]
    status: String,
    #[tabled(rename = "PROBE 1")]
    probe1: String,
    #[tabled(rename = "BATTERY")]
    battery: String,
    #[tabled(rename = "SHARED BY")]
    shared_by: String,
}

pub fn print_devices(devices: &[DeviceRecord], json: bool) -> Result<(), CliError> {
    if json {
        return print_json(devices);
    }

    if devices.is_empty() {
        eprintln!("No devices on this account.");
        return Ok(());
    }

    let rows: Vec<DeviceRow> = devices.iter().map(device_row).collect();
    let mut table = Table::new(rows);
    table.with(Style::sharp());
    println!("{table}");
    Ok(())
}

pub fn print_json<T: serde::Serialize + ?Sized>(value: &T) -> Result<(), CliError> {
    let text = serde_json::to_string_pretty(value).map_err(|e| CliError::Validation {
        message: format!("JSON encode failed: {e}"),
    })?;
    println!("{text}");
    Ok(())
}

fn device_row(device: &DeviceRecord) -> DeviceRow {
    let status = device.last_status.as_ref();
    let data = status.map(|s| &s.cmd_data);

    let global = data
        .and_then(|d| d.global_status.as_deref())
        .unwrap_or("unknown");
    let status_cell = match global {
        "online" => format!("{}", "online".green()),
        "offline" => format!("{}", "offline".red()),
        other => other.to_owned(),
    };

    let probe1 = data
        .and_then(|d| d.probes.first())
        .map(probe_summary)
        .unwrap_or_else(|| "-".to_owned());

    let battery = data
        .and_then(|d| d.battery_value)
        .map(|b| format!("{b}%"))
        .unwrap_or_else(|| "-".to_owned());

    DeviceRow {
        id: device.id_key().to_owned(),
        name: device.display_name(),
        model: device
            .device_model
            .as_ref()
            .map(ToString::to_string)
            .unwrap_or_else(|| "-".to_owned()),
        status: status_cell,
        probe1,
        battery,
        shared_by: device.from_user_name.clone().unwrap_or_default(),
    }
}

fn probe_summary(probe: &thermomaven_core::model::ProbeStatus) -> String {
    let current = probe
        .cur_temperature
        .map(|t| format!("{:.1}°F", t.as_fahrenheit()))
        .unwrap_or_else(|| "-".to_owned());
    let target = probe
        .target_temperature()
        .map(|t| format!(" → {:.1}°F", t.as_fahrenheit()))
        .unwrap_or_default();
    let state = match probe.cooking_state {
        Some(CookingState::Cooking) => format!(" [{}]", "cooking".yellow()),
        Some(CookingState::Ready) => format!(" [{}]", "ready".green()),
        Some(CookingState::Resting) => " [resting]".to_owned(),
        Some(CookingState::Remove) => format!(" [{}]", "remove".red()),
        Some(CookingState::Unknown) | None => String::new(),
    };
    format!("{current}{target}{state}")
}
