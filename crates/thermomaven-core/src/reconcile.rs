// ── Roster reconciliation ──
//
// Merges the two views the cloud gives us of one account's devices:
// REST ownership lists (authoritative for sharing metadata, often
// stale or briefly empty) and MQTT push envelopes (authoritative for
// the live roster and telemetry, but missing ownership fields and
// occasionally carrying broken ids). One `run_cycle` call produces the
// next published roster from the previous one plus whatever arrived.

use tracing::{debug, info, warn};

use thermomaven_api::push::{PushEnvelope, PushMessage, StatusReport};

use crate::model::{DeviceId, DeviceRecord};
use crate::store::IdentityCache;

// ── SyncState ────────────────────────────────────────────────────────

/// Whether the engine has seen its first push envelope.
///
/// Until then the roster is REST-only and sharing-complete but
/// telemetry-free; consumers can use this to distinguish "no devices"
/// from "not synced yet".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncState {
    AwaitingInitialPush,
    Ready,
}

// ── CycleOutput ──────────────────────────────────────────────────────

/// Result of one reconcile cycle.
#[derive(Debug)]
pub struct CycleOutput {
    /// The next roster to publish.
    pub devices: Vec<DeviceRecord>,
    /// The engine wants a server-side roster sync pushed; the
    /// coordinator translates this into a fresh REST fetch.
    pub sync_requested: bool,
}

// ── ReconcileEngine ──────────────────────────────────────────────────

/// Stateful merge engine. Single-owner; the coordinator drives it from
/// one task, so no interior locking.
#[derive(Debug)]
pub struct ReconcileEngine {
    cache: IdentityCache,
    sync_state: SyncState,
    auto_sync_attempts: u32,
    max_auto_sync_attempts: u32,
}

impl ReconcileEngine {
    pub fn new(cache: IdentityCache, max_auto_sync_attempts: u32) -> Self {
        Self {
            cache,
            sync_state: SyncState::AwaitingInitialPush,
            auto_sync_attempts: 0,
            max_auto_sync_attempts,
        }
    }

    pub fn sync_state(&self) -> SyncState {
        self.sync_state
    }

    /// Run one merge cycle.
    ///
    /// `rest` is the most recent REST roster (possibly cached),
    /// `envelope` the push envelope that triggered this cycle (absent
    /// for pure REST refreshes), `previous` the roster published by
    /// the last cycle, and `push_connected` whether the MQTT channel
    /// is up (gates the auto-sync escalation, since the sync response
    /// arrives over push).
    pub fn run_cycle(
        &mut self,
        rest: Vec<DeviceRecord>,
        envelope: Option<&PushEnvelope>,
        previous: &[DeviceRecord],
        push_connected: bool,
    ) -> CycleOutput {
        // Repair broken REST identities before anything consults them.
        let rest = self.repair_identities(rest);
        let rest_empty = rest.is_empty();

        let mut devices = match envelope.map(|e| &e.message) {
            Some(PushMessage::DeviceList(list)) => {
                self.sync_state = SyncState::Ready;
                let pushed: Vec<DeviceRecord> =
                    list.devices.iter().cloned().map(DeviceRecord::from).collect();
                let pushed = self.repair_identities(pushed);
                self.rebuild_from_push(pushed, &rest, previous)
            }
            Some(PushMessage::StatusReport(report)) => {
                self.sync_state = SyncState::Ready;
                let working = if rest.is_empty() {
                    previous.to_vec()
                } else {
                    rest.clone()
                };
                self.attach_status(working, report, &rest)
            }
            Some(PushMessage::Other(_)) | None => {
                if rest.is_empty() {
                    previous.to_vec()
                } else {
                    rest
                }
            }
        };

        // A transiently empty merge never wipes a populated roster.
        if devices.is_empty() && !previous.is_empty() {
            debug!("merge produced empty roster, keeping previous");
            devices = previous.to_vec();
        }

        let devices = dedup_by_id(devices);

        for device in &devices {
            self.cache.remember(device);
        }

        let sync_requested = self.evaluate_auto_sync(rest_empty, push_connected);

        CycleOutput {
            devices,
            sync_requested,
        }
    }

    /// Operator hook: re-arm the auto-sync escalation.
    pub fn reset_auto_sync(&mut self) {
        self.auto_sync_attempts = 0;
    }

    /// Full roster replacement from a `user:device:list` envelope.
    ///
    /// The push roster is authoritative for membership and naming; REST
    /// overlays sharing metadata, and previously attached telemetry
    /// carries over by id.
    fn rebuild_from_push(
        &mut self,
        pushed: Vec<DeviceRecord>,
        rest: &[DeviceRecord],
        previous: &[DeviceRecord],
    ) -> Vec<DeviceRecord> {
        info!(count = pushed.len(), "device roster replaced from push");

        pushed
            .into_iter()
            .map(|mut device| {
                // Sharing metadata lives only in REST; push envelopes
                // never carry it. Matched by name because shared-device
                // rows sometimes arrive with a different id encoding.
                if let Some(owned) = find_by_name(rest, device.device_name.as_deref()) {
                    device.device_share_id = owned.device_share_id.clone();
                    device.from_user_name = owned.from_user_name.clone();
                    device.share_status = owned.share_status.clone();
                }
                if device.last_status.is_none() {
                    if let Some(prior) = find_matching(previous, &device) {
                        device.last_status = prior.last_status.clone();
                    }
                }
                device
            })
            .collect()
    }

    /// Attach one telemetry report to the matching roster entry, in
    /// place. Unknown devices are appended from cache, from a
    /// REST-derived identity, or as a named placeholder, so telemetry
    /// is never dropped on the floor.
    fn attach_status(
        &mut self,
        mut devices: Vec<DeviceRecord>,
        report: &StatusReport,
        rest: &[DeviceRecord],
    ) -> Vec<DeviceRecord> {
        let Some(report_id) = report.device_id.as_deref().filter(|id| !id.is_empty()) else {
            warn!("status report without device id dropped");
            return devices;
        };

        if let Some(device) = devices.iter_mut().find(|d| d.id_key() == report_id) {
            device.last_status = Some(report.clone());
            return devices;
        }

        // Telemetry for a device the roster does not know about yet.
        let mut synthesized = match self.cache.by_id(report_id) {
            Some(cached) => {
                debug!(device_id = report_id, "synthesizing roster entry from cache");
                cached.clone()
            }
            None => {
                let named = rest
                    .iter()
                    .find(|d| d.device_name.as_deref().is_some_and(|n| !n.is_empty()));
                let mut record = match named {
                    Some(rest_device) => {
                        debug!(
                            device_id = report_id,
                            name = rest_device.device_name.as_deref().unwrap_or(""),
                            "synthesizing roster entry from REST identity"
                        );
                        rest_device.clone()
                    }
                    None => {
                        warn!(
                            device_id = report_id,
                            "telemetry for unknown device, synthesizing placeholder"
                        );
                        DeviceRecord {
                            device_name: Some(format!("ThermoMaven Device {report_id}")),
                            ..DeviceRecord::default()
                        }
                    }
                };
                record.device_id = Some(DeviceId::new(report_id));
                record.device_sn = report.device_sn.clone();
                record.device_model = report
                    .device_model
                    .as_deref()
                    .map(crate::model::DeviceModel::from_code);
                record
            }
        };
        synthesized.last_status = Some(report.clone());
        self.cache.remember(&synthesized);
        devices.push(synthesized);
        devices
    }

    /// Restore missing identity fields from the identity cache, by
    /// name. Recovers both the id and the serial number.
    fn repair_identities(&self, devices: Vec<DeviceRecord>) -> Vec<DeviceRecord> {
        devices
            .into_iter()
            .map(|mut device| {
                if !device.has_usable_id() {
                    if let Some(cached) = device
                        .device_name
                        .as_deref()
                        .and_then(|name| self.cache.by_name(name))
                    {
                        if cached.has_usable_id() {
                            debug!(
                                name = device.device_name.as_deref().unwrap_or(""),
                                id = cached.id_key(),
                                "repaired device identity from cache"
                            );
                            device.device_id = cached.device_id.clone();
                            if device.device_sn.is_none() {
                                device.device_sn = cached.device_sn.clone();
                            }
                        }
                    }
                }
                device
            })
            .collect()
    }

    /// Empty-snapshot escalation: when the REST snapshot comes back
    /// empty, ask for a server-side sync, but never more than
    /// `max_auto_sync_attempts` times in a row, and only while the push
    /// channel that would deliver the response is up. Gated on the raw
    /// REST snapshot, not the merged roster: the previous-roster
    /// fallback can keep devices visible while the cloud still needs
    /// the nudge. The counter resets once REST shows devices again,
    /// which also keeps the coordinator's forced-refetch loop bounded.
    fn evaluate_auto_sync(&mut self, rest_empty: bool, push_connected: bool) -> bool {
        if !rest_empty {
            self.auto_sync_attempts = 0;
            return false;
        }
        if !push_connected || self.auto_sync_attempts >= self.max_auto_sync_attempts {
            return false;
        }
        self.auto_sync_attempts += 1;
        info!(
            attempt = self.auto_sync_attempts,
            max = self.max_auto_sync_attempts,
            "empty device snapshot, requesting sync"
        );
        true
    }
}

// ── Helpers ──────────────────────────────────────────────────────────

/// Find a roster entry by exact name.
fn find_by_name<'a>(haystack: &'a [DeviceRecord], name: Option<&str>) -> Option<&'a DeviceRecord> {
    let name = name.filter(|n| !n.is_empty())?;
    haystack
        .iter()
        .find(|d| d.device_name.as_deref() == Some(name))
}

/// Match a roster entry against a list: by usable id first, then by
/// name for id-less records.
fn find_matching<'a>(haystack: &'a [DeviceRecord], needle: &DeviceRecord) -> Option<&'a DeviceRecord> {
    if needle.has_usable_id() {
        if let Some(found) = haystack.iter().find(|d| d.id_key() == needle.id_key()) {
            return Some(found);
        }
    }
    let name = needle.device_name.as_deref()?;
    haystack
        .iter()
        .find(|d| d.device_name.as_deref() == Some(name))
}

/// Keep-first dedup on the stringified id. All id-less records share
/// the key `"None"`, so at most one survives.
fn dedup_by_id(devices: Vec<DeviceRecord>) -> Vec<DeviceRecord> {
    let mut seen = std::collections::HashSet::new();
    devices
        .into_iter()
        .filter(|device| seen.insert(device.id_key().to_owned()))
        .collect()
}

// ── Tests ────────────────────────────────────────────────────────────
