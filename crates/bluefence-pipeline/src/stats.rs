//! Derived statistics over merged device state.
//!
//! No independent source of truth: counts are computed on demand from
//! whatever the live-state merge currently reports.

use bluefence_core::{DeviceRecord, ThreatLevel};
use chrono::{Duration, Utc};
use serde::{Deserialize, Serialize};

/// Derived counts for the query surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Statistics {
    /// Total devices in merged state.
    pub total: usize,
    /// Manually flagged devices.
    pub flagged: usize,
    /// Devices at High threat.
    pub critical: usize,
    /// Devices last seen within the trailing hour, wall-clock at query time.
    pub recently_seen: usize,
}

impl Statistics {
    /// Compute counts from a merged device list.
    pub fn from_devices(devices: &[DeviceRecord]) -> Self {
        let cutoff = Utc::now() - Duration::hours(1);
        Self {
            total: devices.len(),
            flagged: devices.iter().filter(|d| d.flagged).count(),
            critical: devices.iter().filter(|d| d.threat == ThreatLevel::High).count(),
            recently_seen: devices.iter().filter(|d| d.last_seen > cutoff).count(),
        }
    }
}
