// ── Command dispatch ──
//
// Builds outbound `probe:control` envelopes and publishes them on the
// device's control topic. Fire-and-forget at this layer: success means
// the broker acknowledged the publish, and the next telemetry report
// is the confirmation. Callers own any retry policy.

use serde_json::json;
use tracing::info;

use crate::coordinator::Coordinator;
use crate::error::CoreError;
use crate::model::{DeviceRecord, Temperature};

/// Probe cook lifecycle actions, with their wire codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CookingAction {
    Start = 1,
    Stop = 2,
    Modify = 3,
}

impl CookingAction {
    pub fn code(self) -> u8 {
        self as u8
    }
}

/// One outbound probe command.
#[derive(Debug, Clone)]
pub struct ProbeCommand {
    pub device_id: String,
    /// 1-based probe number, as printed on the hardware.
    pub probe_index: u8,
    pub action: CookingAction,
    /// Required for `Start` and `Modify`; ignored for `Stop`.
    pub target_temperature: Option<Temperature>,
}

/// The device firmware addresses probes by color, not index: odd
/// probe numbers are the bright-banded probe, even the dark one.
pub fn probe_color(probe_index: u8) -> &'static str {
    if probe_index % 2 == 1 { "bright" } else { "dark" }
}

/// Build the control envelope for a command against a known device.
pub fn control_payload(device: &DeviceRecord, command: &ProbeCommand) -> serde_json::Value {
    let set_params = match command.target_temperature {
        Some(temp) => json!([{ "setTemperature": temp.0 }]),
        None => json!([]),
    };

    json!({
        "cmdType": "probe:control",
        "deviceId": command.device_id,
        "deviceModel": device.device_model.as_ref().map(|m| m.code()),
        "cmdData": {
            "probeColor": probe_color(command.probe_index),
            "cookingAction": command.action.code(),
            "setParams": set_params,
        }
    })
}

/// The topic to publish control envelopes on: the device's announced
/// publish topic when the roster has one, else the deterministic
/// fallback every device listens on.
pub fn resolve_topic(device: &DeviceRecord, device_id: &str) -> String {
    device
        .pub_topics
        .first()
        .cloned()
        .unwrap_or_else(|| format!("app/device/{device_id}/pub"))
}

impl Coordinator {
    /// Send a probe command to a device in the current roster.
    ///
    /// Validates the probe index against the device model before
    /// anything leaves the process.
    pub async fn send_probe_command(&self, command: ProbeCommand) -> Result<(), CoreError> {
        let device =
            self.device_by_id(&command.device_id)
                .ok_or_else(|| CoreError::DeviceNotFound {
                    identifier: command.device_id.clone(),
                })?;

        if !device.has_usable_id() {
            return Err(CoreError::DeviceUnaddressable {
                identifier: device.display_name(),
            });
        }

        let probes = device
            .device_model
            .as_ref()
            .map(|m| m.probe_count())
            .unwrap_or(1);
        if command.probe_index == 0 || command.probe_index > probes {
            return Err(CoreError::InvalidProbe {
                probe_index: command.probe_index,
                model: device
                    .device_model
                    .as_ref()
                    .map(|m| m.to_string())
                    .unwrap_or_else(|| "unknown".into()),
                probes,
            });
        }

        let transport = self.push_transport().await.ok_or(CoreError::PushChannelDown)?;

        let payload = control_payload(&device, &command);
        let topic = resolve_topic(&device, &command.device_id);
        let bytes = serde_json::to_vec(&payload)
            .map_err(|e| CoreError::Internal(format!("payload encode failed: {e}")))?;

        info!(
            device_id = %command.device_id,
            probe = command.probe_index,
            action = ?command.action,
            topic = %topic,
            "sending probe command"
        );
        transport.publish(&topic, bytes).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use thermomaven_api::wire::RawDevice;

    fn device(id: &str, model: &str, pub_topics: Vec<String>) -> DeviceRecord {
        DeviceRecord::from(RawDevice {
            device_id: Some(id.into()),
            device_model: Some(model.into()),
            pub_topics,
            ..Default::default()
        })
    }

    #[test]
    fn action_wire_codes() {
        assert_eq!(CookingAction::Start.code(), 1);
        assert_eq!(CookingAction::Stop.code(), 2);
        assert_eq!(CookingAction::Modify.code(), 3);
    }

    #[test]
    fn odd_probes_are_bright() {
        assert_eq!(probe_color(1), "bright");
        assert_eq!(probe_color(2), "dark");
        assert_eq!(probe_color(3), "bright");
        assert_eq!(probe_color(4), "dark");
    }

    #[test]
    fn start_payload_carries_target_in_tenths() {
        let device = device("42", "WT06", vec![]);
        let command = ProbeCommand {
            device_id: "42".into(),
            probe_index: 2,
            action: CookingAction::Start,
            target_temperature: Some(Temperature::from_fahrenheit(165.0)),
        };

        let payload = control_payload(&device, &command);
        assert_eq!(payload["cmdType"], "probe:control");
        assert_eq!(payload["deviceId"], "42");
        assert_eq!(payload["deviceModel"], "WT06");
        assert_eq!(payload["cmdData"]["probeColor"], "dark");
        assert_eq!(payload["cmdData"]["cookingAction"], 1);
        assert_eq!(payload["cmdData"]["setParams"][0]["setTemperature"], 1650);
    }

    #[test]
    fn stop_payload_has_empty_set_params() {
        let device = device("42", "WT10", vec![]);
        let command = ProbeCommand {
            device_id: "42".into(),
            probe_index: 1,
            action: CookingAction::Stop,
            target_temperature: None,
        };

        let payload = control_payload(&device, &command);
        assert_eq!(payload["cmdData"]["cookingAction"], 2);
        assert_eq!(payload["cmdData"]["setParams"].as_array().map(Vec::len), Some(0));
    }

    #[test]
    fn topic_prefers_announced_pub_topic() {
        let with_topic = device("7", "WT10", vec!["custom/7/control".into()]);
        assert_eq!(resolve_topic(&with_topic, "7"), "custom/7/control");

        let without = device("7", "WT10", vec![]);
        assert_eq!(resolve_topic(&without, "7"), "app/device/7/pub");
    }
}
