// Push envelope decoding.
//
// Every MQTT publish from the cloud is a JSON envelope with a `cmdType`
// discriminator. Decoding happens here, at the transport boundary, so
// the rest of the system only ever sees typed messages.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::wire::{RawDevice, string_or_number};

/// A decoded push envelope: the topic it arrived on, the raw
/// discriminator, and the typed payload.
#[derive(Debug, Clone)]
pub struct PushEnvelope {
    pub topic: String,
    pub cmd_type: String,
    pub message: PushMessage,
}

/// Typed payload of a push envelope.
#[derive(Debug, Clone)]
pub enum PushMessage {
    /// `user:device:list` -- a full replacement device roster.
    DeviceList(DeviceListPush),
    /// Any `*status:report*` envelope -- live telemetry for one device.
    StatusReport(StatusReport),
    /// Everything else, kept raw for logging.
    Other(Value),
}

/// Payload of a `user:device:list` envelope.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DeviceListPush {
    pub devices: Vec<RawDevice>,
}

/// One telemetry report for a single device.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusReport {
    #[serde(default, deserialize_with = "string_or_number")]
    pub device_id: Option<String>,

    #[serde(default)]
    pub device_model: Option<String>,

    #[serde(default)]
    pub device_sn: Option<String>,

    #[serde(default)]
    pub cmd_data: StatusData,

    #[serde(flatten)]
    pub extra: serde_json::Map<String, Value>,
}

/// The `cmdData` block inside a status report.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusData {
    #[serde(default)]
    pub global_status: Option<String>,

    /// Base-unit battery percentage.
    #[serde(default)]
    pub battery_value: Option<i64>,

    #[serde(default)]
    pub probes: Vec<ProbeStatus>,

    #[serde(flatten)]
    pub extra: serde_json::Map<String, Value>,
}

/// Live state of a single probe.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProbeStatus {
    /// Internal (tip) temperature.
    #[serde(default)]
    pub cur_temperature: Option<Temperature>,

    /// Cook target parameters; the first entry carries the active
    /// target temperature when a cook is running.
    #[serde(default)]
    pub set_params: Vec<SetParams>,

    #[serde(default)]
    pub cooking_state: Option<CookingState>,

    /// Per-probe battery percentage.
    #[serde(default)]
    pub battery_value: Option<i64>,

    /// Multi-point surface readings along the probe shaft.
    #[serde(default)]
    pub area_temperature: Vec<Temperature>,

    /// Ambient temperature from the probe handle sensor.
    #[serde(default)]
    pub cur_ambient_temperature: Option<Temperature>,

    /// Elapsed cook time, seconds.
    #[serde(default)]
    pub cook_time: Option<i64>,

    /// Estimated remaining time, seconds.
    #[serde(default)]
    pub remain_time: Option<i64>,

    #[serde(flatten)]
    pub extra: serde_json::Map<String, Value>,
}

/// One cook target parameter entry attached to a probe.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetParams {
    #[serde(default)]
    pub set_temperature: Option<Temperature>,

    #[serde(flatten)]
    pub extra: serde_json::Map<String, Value>,
}

impl ProbeStatus {
    /// The active target temperature, if any.
    pub fn target_temperature(&self) -> Option<Temperature> {
        self.set_params.first().and_then(|p| p.set_temperature)
    }
}

/// A temperature as the device reports it: integer tenths of a degree
/// Fahrenheit (`748` is 74.8 °F).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Temperature(pub i64);

impl Temperature {
    /// Build from whole degrees Fahrenheit.
    pub fn from_fahrenheit(deg: f64) -> Self {
        Self((deg * 10.0).round() as i64)
    }

    pub fn as_fahrenheit(self) -> f64 {
        self.0 as f64 / 10.0
    }

    pub fn as_celsius(self) -> f64 {
        (self.as_fahrenheit() - 32.0) * 5.0 / 9.0
    }
}

/// Probe cook lifecycle, as the `cookingState` string on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CookingState {
    Cooking,
    Ready,
    Resting,
    Remove,
    #[serde(other)]
    Unknown,
}

/// Decode one raw MQTT publish into a typed envelope.
///
/// Returns `None` when the payload is not JSON or carries no `cmdType`;
/// such frames are logged and dropped by the transport. Device-list
/// envelopes match `cmdType` exactly; status reports match any
/// `cmdType` containing `status:report`, since the vendor prefixes it
/// per device family.
pub fn decode(topic: &str, payload: &[u8]) -> Option<PushEnvelope> {
    let value: Value = serde_json::from_slice(payload).ok()?;
    let cmd_type = value.get("cmdType")?.as_str()?.to_owned();

    let message = if cmd_type == "user:device:list" {
        // The roster rides under `cmdData` normally, `data` on some
        // firmware, and the payload is an object wrapping a `devices`
        // array. A bare array is tolerated too.
        let devices = value
            .get("cmdData")
            .or_else(|| value.get("data"))
            .cloned()
            .and_then(|v| match v {
                Value::Array(_) => serde_json::from_value::<Vec<RawDevice>>(v).ok(),
                _ => serde_json::from_value::<DeviceListPush>(v)
                    .ok()
                    .map(|p| p.devices),
            })
            .unwrap_or_default();
        PushMessage::DeviceList(DeviceListPush { devices })
    } else if cmd_type.contains("status:report") {
        match serde_json::from_value::<StatusReport>(value.clone()) {
            Ok(report) => PushMessage::StatusReport(report),
            Err(_) => PushMessage::Other(value),
        }
    } else {
        PushMessage::Other(value)
    };

    Some(PushEnvelope {
        topic: topic.to_owned(),
        cmd_type,
        message,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn bytes(v: Value) -> Vec<u8> {
        serde_json::to_vec(&v).unwrap()
    }

    #[test]
    fn decodes_device_list() {
        let payload = bytes(json!({
            "cmdType": "user:device:list",
            "cmdData": {
                "devices": [
                    { "deviceId": 10, "deviceName": "Smoker" },
                    { "deviceId": "11", "deviceName": "Oven" }
                ]
            }
        }));
        let env = decode("app/user/1/sub", &payload).unwrap();
        assert_eq!(env.cmd_type, "user:device:list");
        match env.message {
            PushMessage::DeviceList(list) => {
                assert_eq!(list.devices.len(), 2);
                assert_eq!(list.devices[0].device_id.as_deref(), Some("10"));
            }
            other => panic!("expected device list, got {other:?}"),
        }
    }

    #[test]
    fn device_list_accepts_bare_array() {
        let payload = bytes(json!({
            "cmdType": "user:device:list",
            "cmdData": [{ "deviceId": 9 }]
        }));
        let env = decode("t", &payload).unwrap();
        match env.message {
            PushMessage::DeviceList(list) => {
                assert_eq!(list.devices.len(), 1);
                assert_eq!(list.devices[0].device_id.as_deref(), Some("9"));
            }
            other => panic!("expected device list, got {other:?}"),
        }
    }

    #[test]
    fn device_list_accepts_data_key() {
        let payload = bytes(json!({
            "cmdType": "user:device:list",
            "data": { "devices": [{ "deviceId": 7 }] }
        }));
        let env = decode("t", &payload).unwrap();
        match env.message {
            PushMessage::DeviceList(list) => assert_eq!(list.devices.len(), 1),
            other => panic!("expected device list, got {other:?}"),
        }
    }

    #[test]
    fn decodes_status_report_with_prefix() {
        let payload = bytes(json!({
            "cmdType": "wt10:status:report",
            "deviceId": 10,
            "deviceModel": "WT10",
            "cmdData": {
                "globalStatus": "online",
                "batteryValue": 80,
                "probes": [{
                    "curTemperature": 748,
                    "cookingState": "cooking",
                    "setParams": [{ "setTemperature": 1650 }]
                }]
            }
        }));
        let env = decode("t", &payload).unwrap();
        match env.message {
            PushMessage::StatusReport(report) => {
                assert_eq!(report.device_id.as_deref(), Some("10"));
                let probe = &report.cmd_data.probes[0];
                assert_eq!(probe.cur_temperature, Some(Temperature(748)));
                assert_eq!(probe.cooking_state, Some(CookingState::Cooking));
                assert_eq!(probe.target_temperature(), Some(Temperature(1650)));
            }
            other => panic!("expected status report, got {other:?}"),
        }
    }

    #[test]
    fn unknown_cmd_type_is_other() {
        let payload = bytes(json!({ "cmdType": "device:ota:progress", "cmdData": {} }));
        let env = decode("t", &payload).unwrap();
        assert!(matches!(env.message, PushMessage::Other(_)));
    }

    #[test]
    fn non_json_payload_is_dropped() {
        assert!(decode("t", b"not json").is_none());
        assert!(decode("t", &bytes(json!({ "noCmdType": 1 }))).is_none());
    }

    #[test]
    fn temperature_conversions() {
        let t = Temperature(748);
        assert!((t.as_fahrenheit() - 74.8).abs() < 1e-9);
        assert!((t.as_celsius() - 23.777).abs() < 0.01);
        assert_eq!(Temperature::from_fahrenheit(165.0), Temperature(1650));
    }

    #[test]
    fn unknown_cooking_state_maps_to_unknown() {
        let probe: ProbeStatus =
            serde_json::from_value(json!({ "cookingState": "defrosting" })).unwrap();
        assert_eq!(probe.cooking_state, Some(CookingState::Unknown));
    }
}
