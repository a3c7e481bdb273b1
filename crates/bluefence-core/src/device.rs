//! Domain model: discovery events, device records, and trust classifications.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::device_type::DeviceType;

/// One observed wireless advertisement from a device.
///
/// Ephemeral — the discovery source may emit the same address arbitrarily
/// many times, and there is no ordering guarantee across distinct addresses.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiscoveryEvent {
    /// Stable device identifier (Bluetooth address).
    pub address: String,
    /// Advertised local name, if any.
    pub name: Option<String>,
    /// Signal strength in dBm.
    pub rssi: i32,
    /// Advertised service identifiers (16-bit UUIDs as lowercase hex).
    #[serde(default)]
    pub service_ids: Vec<String>,
    /// Raw manufacturer data, if advertised.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub manufacturer_data: Option<Vec<u8>>,
    /// Whether the device accepts connections.
    #[serde(default)]
    pub connectable: bool,
    /// Observation timestamp.
    pub seen_at: DateTime<Utc>,
}

impl DiscoveryEvent {
    /// Derived secondary lookup key: advertised service identifiers joined
    /// in advertisement order.
    pub fn fingerprint(&self) -> String {
        self.service_ids.join(", ")
    }
}

/// Trust classification produced by the pipeline for one discovery event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Classification {
    /// Address found in the known-safe ledger.
    Safe,
    /// Address found in the confirmed-rogue ledger.
    KnownRogue,
    /// Vulnerability lookup returned findings; newly confirmed rogue.
    Rogue,
    /// No findings, lookup failure, or already recorded as potential.
    Potential,
    /// Classification still pending (duplicate event coalesced while the
    /// first lookup for the address is in flight).
    Unknown,
}

/// Threat level derived from a device record's fields.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, Default,
)]
#[serde(rename_all = "UPPERCASE")]
pub enum ThreatLevel {
    /// Score below 30.
    #[default]
    Low,
    /// Score 30..=59.
    Medium,
    /// Score 60 and above, or manually flagged.
    High,
}

/// One line of an append-only device ledger.
///
/// Entries are never rewritten or deleted; manual-flag entries additionally
/// carry the reason, operator, and flag time, and clearing a flag appends a
/// clear record rather than removing the flag entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistryEntry {
    /// Device address.
    pub address: String,
    /// Display name at the time the entry was written.
    pub name: String,
    /// Service-identifier fingerprint.
    pub fingerprint: String,
    /// Reason for a manual flag, if this is a flag record.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    /// Operator who flagged the device, if this is a flag record.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operator: Option<String>,
    /// When the device was flagged, if this is a flag record.
    #[serde(default, skip_serializing_if = "Option::is_none", rename = "flaggedAt")]
    pub flagged_at: Option<DateTime<Utc>>,
    /// When a manual flag was cleared, if this is a clear record.
    #[serde(default, skip_serializing_if = "Option::is_none", rename = "clearedAt")]
    pub cleared_at: Option<DateTime<Utc>>,
}

impl RegistryEntry {
    /// Plain entry carrying only the identity fields.
    pub fn new(
        address: impl Into<String>,
        name: impl Into<String>,
        fingerprint: impl Into<String>,
    ) -> Self {
        Self {
            address: address.into(),
            name: name.into(),
            fingerprint: fingerprint.into(),
            reason: None,
            operator: None,
            flagged_at: None,
            cleared_at: None,
        }
    }

    /// True if this entry was written by a manual flag action.
    pub fn is_flag_record(&self) -> bool {
        self.reason.is_some() || self.operator.is_some()
    }

    /// True if this entry was written to clear an earlier manual flag.
    pub fn is_clear_record(&self) -> bool {
        self.cleared_at.is_some()
    }
}

/// Current knowledge about one device, merged from live sightings and
/// persisted history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceRecord {
    /// Device address (map key).
    pub address: String,
    /// Advertised name, if ever seen.
    pub name: Option<String>,
    /// Last observed signal strength in dBm.
    pub rssi: i32,
    /// Estimated distance in meters, `-1.0` when undeterminable.
    pub distance: f64,
    /// Heuristic device type label.
    pub device_type: DeviceType,
    /// Current threat level.
    pub threat: ThreatLevel,
    /// Set by a manual operator flag.
    pub flagged: bool,
    /// Advertised service identifiers from the most recent sighting.
    #[serde(default)]
    pub service_ids: Vec<String>,
    /// Whether the device was connectable at the most recent sighting.
    #[serde(default)]
    pub connectable: bool,
    /// First sighting in this session, or ledger history time.
    pub first_seen: DateTime<Utc>,
    /// Most recent sighting. Non-decreasing barring clock anomalies.
    pub last_seen: DateTime<Utc>,
    /// Sighting counter. Non-decreasing.
    pub times_seen: u64,
}

/// One known vulnerability finding, passed through from the lookup service.
///
/// Opaque to the pipeline — only presence and count matter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Finding {
    /// Feed-assigned identifier (e.g. a CVE id).
    pub id: String,
    /// Human-readable summary.
    #[serde(default)]
    pub summary: String,
    /// Feed-assigned severity label.
    #[serde(default)]
    pub severity: String,
}
