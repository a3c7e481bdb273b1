//! Live device state and the live/ledger merge.
//!
//! The in-memory map holds the most recently observed record per address
//! for the current session only; ledgers outlive the process, this map does
//! not. `LiveState` is the single mutator of `DeviceRecord`s during a
//! process's lifetime.

use std::collections::HashMap;

use bluefence_core::{
    classify_device_type, estimate_distance, score_device, threat_level, DeviceRecord,
    DiscoveryEvent, RegistryEntry, ThreatLevel,
};
use bluefence_ledger::LedgerKind;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;

/// In-memory map of current-session device sightings.
#[derive(Default)]
pub struct LiveState {
    devices: RwLock<HashMap<String, DeviceRecord>>,
}

impl LiveState {
    /// Empty session state.
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one discovery event into the map and return the updated record.
    ///
    /// Updates signal strength, distance, type, and last-seen; increments
    /// times-seen; preserves first-seen and the flagged bit. Threat level is
    /// recomputed from current fields unless the device is flagged, which
    /// pins it at High until unflagged.
    pub fn observe(&self, event: &DiscoveryEvent) -> DeviceRecord {
        let mut devices = self.devices.write();

        let record = devices
            .entry(event.address.clone())
            .and_modify(|existing| {
                if event.name.is_some() {
                    existing.name = event.name.clone();
                }
                existing.rssi = event.rssi;
                existing.distance = estimate_distance(event.rssi);
                existing.device_type =
                    classify_device_type(existing.name.as_deref(), &event.service_ids);
                existing.service_ids = event.service_ids.clone();
                existing.connectable = event.connectable;
                // Clock anomalies aside, last-seen never moves backwards.
                if event.seen_at > existing.last_seen {
                    existing.last_seen = event.seen_at;
                }
                existing.times_seen += 1;
                if !existing.flagged {
                    existing.threat = threat_level(score_device(existing));
                }
            })
            .or_insert_with(|| {
                let mut record = DeviceRecord {
                    address: event.address.clone(),
                    name: event.name.clone(),
                    rssi: event.rssi,
                    distance: estimate_distance(event.rssi),
                    device_type: classify_device_type(event.name.as_deref(), &event.service_ids),
                    threat: ThreatLevel::Low,
                    flagged: false,
                    service_ids: event.service_ids.clone(),
                    connectable: event.connectable,
                    first_seen: event.seen_at,
                    last_seen: event.seen_at,
                    times_seen: 1,
                };
                record.threat = threat_level(score_device(&record));
                record
            });

        record.clone()
    }

    /// Current record for an address, if seen this session.
    pub fn get(&self, address: &str) -> Option<DeviceRecord> {
        self.devices.read().get(address).cloned()
    }

    /// Mark a device flagged, forcing its threat level to High.
    ///
    /// Returns the updated record, or `None` if the address has not been
    /// seen this session (the ledger flag entry is still valid history).
    pub fn flag(&self, address: &str) -> Option<DeviceRecord> {
        let mut devices = self.devices.write();
        let record = devices.get_mut(address)?;
        record.flagged = true;
        record.threat = ThreatLevel::High;
        Some(record.clone())
    }

    /// Clear a device's flag and recompute its threat level from current
    /// fields. The ledger flag entry is append-only history and stays.
    pub fn unflag(&self, address: &str) -> Option<DeviceRecord> {
        let mut devices = self.devices.write();
        let record = devices.get_mut(address)?;
        record.flagged = false;
        record.threat = threat_level(score_device(record));
        Some(record.clone())
    }

    /// Union of live records and ledger-derived history, live data winning
    /// for any address present in both, sorted by signal strength
    /// descending (strongest first).
    ///
    /// `history` must be in ledger append order within each kind; the last
    /// entry per address wins, so a clear record supersedes the flag record
    /// it follows.
    pub fn merged(&self, history: &[(LedgerKind, RegistryEntry)]) -> Vec<DeviceRecord> {
        let mut merged: HashMap<String, DeviceRecord> = HashMap::new();
        for (kind, entry) in history {
            merged.insert(entry.address.clone(), history_record(*kind, entry));
        }

        for (address, record) in self.devices.read().iter() {
            merged.insert(address.clone(), record.clone());
        }

        let mut devices: Vec<DeviceRecord> = merged.into_values().collect();
        devices.sort_by(|a, b| b.rssi.cmp(&a.rssi).then_with(|| a.address.cmp(&b.address)));
        devices
    }
}

/// Minimal record for a device known only from ledger history: no live
/// signal, so it sorts after every live sighting. Confirmed-rogue
/// membership pins the threat level high regardless of flag state.
fn history_record(kind: LedgerKind, entry: &RegistryEntry) -> DeviceRecord {
    let service_ids: Vec<String> = entry
        .fingerprint
        .split(", ")
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect();
    let name = (!entry.name.is_empty()).then(|| entry.name.clone());
    let flagged = entry.is_flag_record();
    let seen = entry
        .flagged_at
        .or(entry.cleared_at)
        .unwrap_or(DateTime::<Utc>::UNIX_EPOCH);
    let threat = if flagged || kind == LedgerKind::ConfirmedRogue {
        ThreatLevel::High
    } else {
        ThreatLevel::Low
    };

    DeviceRecord {
        address: entry.address.clone(),
        device_type: classify_device_type(name.as_deref(), &service_ids),
        name,
        rssi: i32::MIN,
        distance: -1.0,
        threat,
        flagged,
        service_ids,
        connectable: false,
        first_seen: seen,
        last_seen: seen,
        times_seen: 0,
    }
}
