use std::fmt;

use serde::{Deserialize, Serialize};
use thermomaven_api::push::StatusReport;
use thermomaven_api::wire::RawDevice;

// ── DeviceId ─────────────────────────────────────────────────────────

/// A device identifier as issued by the cloud.
///
/// The cloud intermittently sends the literal string `"None"` or an
/// empty string where an id should be; [`is_usable`](Self::is_usable)
/// is the single place that judgement lives.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DeviceId(String);

impl DeviceId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether this id can address a real device.
    pub fn is_usable(&self) -> bool {
        !self.0.is_empty() && self.0 != "None"
    }
}

impl fmt::Display for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for DeviceId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for DeviceId {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

// ── DeviceModel ──────────────────────────────────────────────────────

/// Known thermometer models and their probe counts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum DeviceModel {
    /// P2, two probes.
    Wt02,
    /// P4, four probes.
    Wt06,
    /// G2, two probes.
    Wt07,
    /// G4, four probes.
    Wt09,
    /// G1, single probe.
    Wt10,
    /// P1, single probe.
    Wt11,
    /// Anything newer than this list; the raw code is preserved.
    Unknown(String),
}

impl DeviceModel {
    /// Parse a wire model code (`"WT10"`). Unknown codes are kept, not
    /// rejected, so new hardware still shows up.
    pub fn from_code(code: &str) -> Self {
        match code.to_ascii_uppercase().as_str() {
            "WT02" => Self::Wt02,
            "WT06" => Self::Wt06,
            "WT07" => Self::Wt07,
            "WT09" => Self::Wt09,
            "WT10" => Self::Wt10,
            "WT11" => Self::Wt11,
            _ => Self::Unknown(code.to_owned()),
        }
    }

    /// Number of probes this model carries. Unknown models are assumed
    /// single-probe, the safest floor.
    pub fn probe_count(&self) -> u8 {
        match self {
            Self::Wt06 | Self::Wt09 => 4,
            Self::Wt02 | Self::Wt07 => 2,
            Self::Wt10 | Self::Wt11 | Self::Unknown(_) => 1,
        }
    }

    /// Marketing name, used in display strings.
    pub fn marketing_name(&self) -> &str {
        match self {
            Self::Wt02 => "P2",
            Self::Wt06 => "P4",
            Self::Wt07 => "G2",
            Self::Wt09 => "G4",
            Self::Wt10 => "G1",
            Self::Wt11 => "P1",
            Self::Unknown(code) => code,
        }
    }

    /// The wire code, for outbound payloads.
    pub fn code(&self) -> &str {
        match self {
            Self::Wt02 => "WT02",
            Self::Wt06 => "WT06",
            Self::Wt07 => "WT07",
            Self::Wt09 => "WT09",
            Self::Wt10 => "WT10",
            Self::Wt11 => "WT11",
            Self::Unknown(code) => code,
        }
    }
}

impl fmt::Display for DeviceModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.marketing_name(), self.code())
    }
}

// ── DeviceRecord ─────────────────────────────────────────────────────

/// One device as the engine sees it: roster identity plus the latest
/// attached telemetry, if any has arrived.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DeviceRecord {
    pub device_id: Option<DeviceId>,
    pub device_name: Option<String>,
    pub device_sn: Option<String>,
    pub device_model: Option<DeviceModel>,

    // Sharing metadata, present only for devices shared with this account.
    pub device_share_id: Option<String>,
    pub from_user_name: Option<String>,
    pub share_status: Option<String>,

    pub sub_topics: Vec<String>,
    pub pub_topics: Vec<String>,

    /// Latest telemetry attached in place by the reconcile engine.
    pub last_status: Option<StatusReport>,

    /// Roster fields we do not model, kept for JSON output.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl DeviceRecord {
    /// Dedup key: the stringified id, with missing or unusable ids all
    /// collapsing to `"None"` so at most one id-less record survives
    /// deduplication.
    pub fn id_key(&self) -> &str {
        match &self.device_id {
            Some(id) if id.is_usable() => id.as_str(),
            _ => "None",
        }
    }

    /// Display name with the documented placeholder fallback.
    pub fn display_name(&self) -> String {
        match (&self.device_name, &self.device_id) {
            (Some(name), _) if !name.is_empty() => name.clone(),
            (_, Some(id)) => format!("ThermoMaven Device {id}"),
            _ => "ThermoMaven Device".to_owned(),
        }
    }

    /// Whether this record can be addressed for commands.
    pub fn has_usable_id(&self) -> bool {
        self.device_id.as_ref().is_some_and(DeviceId::is_usable)
    }
}

impl From<RawDevice> for DeviceRecord {
    fn from(raw: RawDevice) -> Self {
        // Unusable ids are normalized away here so every downstream
        // check is a plain Option test.
        let device_id = raw
            .device_id
            .map(DeviceId::new)
            .filter(DeviceId::is_usable);

        Self {
            device_id,
            device_name: raw.device_name,
            device_sn: raw.device_sn,
            device_model: raw.device_model.as_deref().map(DeviceModel::from_code),
            device_share_id: raw.device_share_id,
            from_user_name: raw.from_user_name,
            share_status: raw.share_status,
            sub_topics: raw.sub_topics,
            pub_topics: raw.pub_topics,
            last_status: None,
            extra: raw.extra,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn none_literal_id_is_unusable() {
        assert!(!DeviceId::new("None").is_usable());
        assert!(!DeviceId::new("").is_usable());
        assert!(DeviceId::new("12345").is_usable());
    }

    #[test]
    fn model_probe_counts() {
        assert_eq!(DeviceModel::from_code("WT06").probe_count(), 4);
        assert_eq!(DeviceModel::from_code("wt09").probe_count(), 4);
        assert_eq!(DeviceModel::from_code("WT02").probe_count(), 2);
        assert_eq!(DeviceModel::from_code("WT07").probe_count(), 2);
        assert_eq!(DeviceModel::from_code("WT10").probe_count(), 1);
        assert_eq!(DeviceModel::from_code("WT11").probe_count(), 1);
    }

    #[test]
    fn unknown_model_preserves_code_and_defaults_to_one_probe() {
        let model = DeviceModel::from_code("WT99");
        assert_eq!(model, DeviceModel::Unknown("WT99".into()));
        assert_eq!(model.probe_count(), 1);
        assert_eq!(model.code(), "WT99");
    }

    #[test]
    fn conversion_drops_unusable_ids() {
        let raw = RawDevice {
            device_id: Some("None".into()),
            device_name: Some("Grill".into()),
            ..Default::default()
        };
        let record = DeviceRecord::from(raw);
        assert!(record.device_id.is_none());
        assert_eq!(record.id_key(), "None");
    }

    #[test]
    fn display_name_placeholder() {
        let record = DeviceRecord::from(RawDevice {
            device_id: Some("42".into()),
            ..Default::default()
        });
        assert_eq!(record.display_name(), "ThermoMaven Device 42");
    }
}
