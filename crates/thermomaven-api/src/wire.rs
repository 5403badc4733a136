// Wire types shared by the REST surface and the push channel.
//
// The vendor is loose with JSON types -- `deviceId` arrives as a number
// on some endpoints and a string on others, and the ownership endpoints
// intermittently omit it entirely. Everything identity-like is
// normalized to `Option<String>` at this boundary so downstream code
// never branches on JSON type.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// The `{code, msg, data}` envelope wrapping every REST response.
/// `code == "0"` is success; anything else carries a vendor error in `msg`.
#[derive(Debug, Deserialize)]
pub struct ApiEnvelope<T> {
    #[serde(deserialize_with = "string_or_number")]
    pub code: Option<String>,
    #[serde(default)]
    pub msg: Option<String>,
    // No `default` attribute here: it would demand `T: Default`, and
    // serde already treats a missing `Option` field as `None`.
    pub data: Option<T>,
}

/// One device entry as the vendor sends it, from either the REST
/// ownership lists or a `user:device:list` push envelope.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawDevice {
    #[serde(default, deserialize_with = "string_or_number")]
    pub device_id: Option<String>,

    #[serde(default)]
    pub device_name: Option<String>,

    #[serde(default)]
    pub device_sn: Option<String>,

    #[serde(default)]
    pub device_model: Option<String>,

    // Ownership/sharing metadata -- REST-only; push envelopes omit these.
    #[serde(default, deserialize_with = "string_or_number")]
    pub device_share_id: Option<String>,

    #[serde(default)]
    pub from_user_name: Option<String>,

    #[serde(default, deserialize_with = "string_or_number")]
    pub share_status: Option<String>,

    /// Per-device topics to subscribe for live telemetry.
    #[serde(default)]
    pub sub_topics: Vec<String>,

    /// Per-device topics for outbound control envelopes.
    #[serde(default)]
    pub pub_topics: Vec<String>,

    /// All remaining fields the vendor sends.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, Value>,
}

/// Login response payload.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginData {
    pub token: String,
    #[serde(default, deserialize_with = "string_or_number")]
    pub user_id: Option<String>,
}

/// MQTT bootstrap config from `/app/mqtt/cert/apply`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MqttBootstrap {
    pub client_id: String,
    pub p12_url: String,
    pub p12_password: String,
    #[serde(default)]
    pub sub_topics: Vec<String>,
}

/// Accept a JSON string, number, or null and normalize to `Option<String>`.
pub(crate) fn string_or_number<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        None | Some(Value::Null) => None,
        Some(Value::String(s)) => Some(s),
        Some(Value::Number(n)) => Some(n.to_string()),
        Some(other) => Some(other.to_string()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn device_id_accepts_number_and_string() {
        let a: RawDevice = serde_json::from_value(json!({ "deviceId": 42 })).unwrap();
        let b: RawDevice = serde_json::from_value(json!({ "deviceId": "42" })).unwrap();
        assert_eq!(a.device_id.as_deref(), Some("42"));
        assert_eq!(b.device_id.as_deref(), Some("42"));
    }

    #[test]
    fn missing_device_id_is_none() {
        let d: RawDevice = serde_json::from_value(json!({ "deviceName": "Grill" })).unwrap();
        assert!(d.device_id.is_none());
        assert_eq!(d.device_name.as_deref(), Some("Grill"));
    }

    #[test]
    fn unknown_fields_land_in_extra() {
        let d: RawDevice = serde_json::from_value(json!({
            "deviceId": "1",
            "wifiRssi": -61,
        }))
        .unwrap();
        assert_eq!(d.extra["wifiRssi"], -61);
    }

    #[test]
    fn envelope_code_accepts_number() {
        let env: ApiEnvelope<Value> = serde_json::from_value(json!({ "code": 0 })).unwrap();
        assert_eq!(env.code.as_deref(), Some("0"));
    }

    #[test]
    fn envelope_without_data_decodes_for_non_default_payloads() {
        // LoginData has no Default impl; a data-less error envelope
        // must still deserialize.
        let env: ApiEnvelope<LoginData> =
            serde_json::from_value(json!({ "code": "10003", "msg": "denied" })).unwrap();
        assert_eq!(env.code.as_deref(), Some("10003"));
        assert!(env.data.is_none());
    }

    #[test]
    fn bootstrap_deserializes() {
        let b: MqttBootstrap = serde_json::from_value(json!({
            "clientId": "android-123-US-abcdef0123456789",
            "p12Url": "https://certs.example/bundle.p12",
            "p12Password": "pw",
            "subTopics": ["app/user/123/sub"]
        }))
        .unwrap();
        assert_eq!(b.client_id, "android-123-US-abcdef0123456789");
        assert_eq!(b.sub_topics.len(), 1);
    }
}
