//! Rule-based threat scoring.
//!
//! A device's score is the sum of independent weighted contributions; the
//! score maps onto [`ThreatLevel`] at fixed inclusive thresholds. Scoring is
//! a pure function of the record and is recomputed whenever its inputs
//! change — except while a device is manually flagged, which pins the level
//! at [`ThreatLevel::High`] until unflagged.

use crate::device::{DeviceRecord, ThreatLevel};

/// Name tokens that contribute the suspicious-name weight.
///
/// Superset of the device-type token list: bare radio module names
/// (`hc-` serial bridges, `esp` dev boards) score here without changing
/// the type label.
pub const SUSPICIOUS_SCORE_TOKENS: &[&str] = &[
    "spy", "cam", "hidden", "covert", "mini", "micro", "hc-", "esp",
];

/// Signal strength above which an unknown device is considered close enough
/// to score, in dBm.
pub const STRONG_SIGNAL_DBM: i32 = -50;

const WEIGHT_SUSPICIOUS_NAME: u32 = 40;
const WEIGHT_NO_NAME: u32 = 20;
const WEIGHT_STRONG_UNKNOWN: u32 = 30;
const WEIGHT_SILENT_CONNECTABLE: u32 = 15;

const HIGH_THRESHOLD: u32 = 60;
const MEDIUM_THRESHOLD: u32 = 30;

/// Compute the raw threat score for a device.
pub fn score_device(record: &DeviceRecord) -> u32 {
    let mut score = 0;

    let lowered = record.name.as_deref().map(str::to_lowercase);
    if lowered
        .as_deref()
        .is_some_and(|n| SUSPICIOUS_SCORE_TOKENS.iter().any(|t| n.contains(t)))
    {
        score += WEIGHT_SUSPICIOUS_NAME;
    }

    if record.name.as_deref().map_or(true, str::is_empty) {
        score += WEIGHT_NO_NAME;
    }

    if record.rssi > STRONG_SIGNAL_DBM && record.device_type == crate::DeviceType::Unknown {
        score += WEIGHT_STRONG_UNKNOWN;
    }

    if record.service_ids.is_empty() && record.connectable {
        score += WEIGHT_SILENT_CONNECTABLE;
    }

    score
}

/// Map a raw score onto a threat level. Thresholds are inclusive.
pub fn threat_level(score: u32) -> ThreatLevel {
    if score >= HIGH_THRESHOLD {
        ThreatLevel::High
    } else if score >= MEDIUM_THRESHOLD {
        ThreatLevel::Medium
    } else {
        ThreatLevel::Low
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device_type::DeviceType;
    use chrono::Utc;

    fn record(name: Option<&str>, rssi: i32, device_type: DeviceType) -> DeviceRecord {
        let now = Utc::now();
        DeviceRecord {
            address: "AA:BB:CC:DD:EE:FF".into(),
            name: name.map(Into::into),
            rssi,
            distance: 1.0,
            device_type,
            threat: ThreatLevel::Low,
            flagged: false,
            service_ids: vec!["180f".into()],
            connectable: false,
            first_seen: now,
            last_seen: now,
            times_seen: 1,
        }
    }

    #[test]
    fn threshold_boundaries_are_inclusive() {
        assert_eq!(threat_level(29), ThreatLevel::Low);
        assert_eq!(threat_level(30), ThreatLevel::Medium);
        assert_eq!(threat_level(59), ThreatLevel::Medium);
        assert_eq!(threat_level(60), ThreatLevel::High);
    }

    #[test]
    fn suspicious_name_scores_forty() {
        let r = record(Some("SpyCam Pro"), -80, DeviceType::Suspicious);
        assert_eq!(score_device(&r), 40);
    }

    #[test]
    fn radio_module_names_score_without_type_change() {
        let r = record(Some("HC-05"), -80, DeviceType::Unknown);
        assert_eq!(score_device(&r), 40);
        let r = record(Some("ESP32-WROOM"), -80, DeviceType::Unknown);
        assert_eq!(score_device(&r), 40);
    }

    #[test]
    fn nameless_device_scores_twenty() {
        let r = record(None, -80, DeviceType::Battery);
        assert_eq!(score_device(&r), 20);
    }

    #[test]
    fn strong_unknown_scores_thirty() {
        let r = record(Some("Gizmo"), -45, DeviceType::Unknown);
        assert_eq!(score_device(&r), 30);
        // Boundary: exactly -50 does not score.
        let r = record(Some("Gizmo"), -50, DeviceType::Unknown);
        assert_eq!(score_device(&r), 0);
        // A known type at the same strength does not score.
        let r = record(Some("Gizmo TV"), -45, DeviceType::Media);
        assert_eq!(score_device(&r), 0);
    }

    #[test]
    fn silent_connectable_scores_fifteen() {
        let mut r = record(Some("Gizmo"), -80, DeviceType::Battery);
        r.service_ids.clear();
        r.connectable = true;
        assert_eq!(score_device(&r), 15);
    }

    #[test]
    fn contributions_sum_to_high() {
        // Nameless, strong, unknown, silent, connectable: 20 + 30 + 15 = 65.
        let mut r = record(None, -40, DeviceType::Unknown);
        r.service_ids.clear();
        r.connectable = true;
        let score = score_device(&r);
        assert_eq!(score, 65);
        assert_eq!(threat_level(score), ThreatLevel::High);
    }
}
