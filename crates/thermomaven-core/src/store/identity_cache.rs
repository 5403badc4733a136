// ── Device identity cache ──
//
// The cloud intermittently sends roster entries with a missing or
// `"None"` device id, and telemetry for devices absent from the
// current roster. This cache remembers the last good identity seen for
// every device, keyed by both display name and stringified id, so the
// reconcile engine can repair and synthesize records.
//
// Bounded with insertion-order eviction. An account has a handful of
// thermometers; the bound only matters to keep a long-running process
// from accumulating identities for devices that were renamed away.

use std::collections::{HashMap, VecDeque};

use tracing::debug;

use crate::model::DeviceRecord;

pub const DEFAULT_CAPACITY: usize = 64;

/// Bounded map from name and id keys to the last known device record.
#[derive(Debug)]
pub struct IdentityCache {
    capacity: usize,
    entries: HashMap<String, DeviceRecord>,
    // Key insertion order, oldest first. Re-inserting an existing key
    // refreshes the value without changing its eviction position.
    order: VecDeque<String>,
}

impl Default for IdentityCache {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }
}

impl IdentityCache {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            entries: HashMap::new(),
            order: VecDeque::new(),
        }
    }

    /// Remember a record under its name and (usable) id.
    pub fn remember(&mut self, record: &DeviceRecord) {
        if let Some(name) = record.device_name.as_deref() {
            if !name.is_empty() {
                self.insert(name.to_owned(), record.clone());
            }
        }
        if record.has_usable_id() {
            self.insert(record.id_key().to_owned(), record.clone());
        }
    }

    /// Look up the last known record for a display name.
    pub fn by_name(&self, name: &str) -> Option<&DeviceRecord> {
        self.entries.get(name)
    }

    /// Look up the last known record for a stringified device id.
    pub fn by_id(&self, id: &str) -> Option<&DeviceRecord> {
        self.entries.get(id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn insert(&mut self, key: String, record: DeviceRecord) {
        if self.entries.insert(key.clone(), record).is_none() {
            self.order.push_back(key);
            while self.entries.len() > self.capacity {
                if let Some(oldest) = self.order.pop_front() {
                    debug!(key = %oldest, "evicting cached device identity");
                    self.entries.remove(&oldest);
                } else {
                    break;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{DeviceId, DeviceRecord};
    use thermomaven_api::wire::RawDevice;

    fn record(id: Option<&str>, name: Option<&str>) -> DeviceRecord {
        let mut r = DeviceRecord::from(RawDevice::default());
        r.device_id = id.map(DeviceId::new);
        r.device_name = name.map(str::to_owned);
        r
    }

    #[test]
    fn caches_under_both_keys() {
        let mut cache = IdentityCache::default();
        cache.remember(&record(Some("42"), Some("Smoker")));

        assert_eq!(
            cache.by_name("Smoker").and_then(|r| r.device_id.clone()),
            Some(DeviceId::new("42"))
        );
        assert!(cache.by_id("42").is_some());
    }

    #[test]
    fn unusable_id_is_not_a_key() {
        let mut cache = IdentityCache::default();
        cache.remember(&record(Some("None"), Some("Smoker")));

        assert!(cache.by_id("None").is_none());
        assert!(cache.by_name("Smoker").is_some());
    }

    #[test]
    fn evicts_oldest_key_at_capacity() {
        let mut cache = IdentityCache::with_capacity(2);
        cache.remember(&record(Some("1"), None));
        cache.remember(&record(Some("2"), None));
        cache.remember(&record(Some("3"), None));

        assert!(cache.by_id("1").is_none());
        assert!(cache.by_id("2").is_some());
        assert!(cache.by_id("3").is_some());
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn reinsert_updates_without_growing() {
        let mut cache = IdentityCache::with_capacity(4);
        cache.remember(&record(Some("1"), Some("A")));
        let mut updated = record(Some("1"), Some("A"));
        updated.device_sn = Some("sn-1".into());
        cache.remember(&updated);

        assert_eq!(cache.len(), 2); // "1" and "A"
        assert_eq!(
            cache.by_id("1").and_then(|r| r.device_sn.clone()),
            Some("sn-1".to_owned())
        );
    }
}
