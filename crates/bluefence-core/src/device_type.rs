//! Heuristic device-type labeling from advertisement data.
//!
//! Implemented as an explicit ordered rule table evaluated first-match-wins.
//! Ordering is load-bearing: a suspicious name short-circuits every later
//! rule, name vocabulary outranks service codes, and the catch-all for
//! generic-access/generic-attribute-only advertisements comes last before
//! `Unknown`.

use serde::{Deserialize, Serialize};

/// Name tokens that mark a device as suspicious regardless of anything else
/// it advertises.
pub const SUSPICIOUS_NAME_TOKENS: &[&str] = &["spy", "cam", "hidden", "covert", "mini", "micro"];

/// Service-identifier codes that mark a device as suspicious even without a
/// suspicious name.
pub const SUSPICIOUS_SERVICE_IDS: &[&str] = &["1800", "1801"];

/// Heuristic device category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum DeviceType {
    /// Matched a suspicious name token or service code.
    Suspicious,
    /// Headphones, earbuds, audio source/sink services.
    Audio,
    /// Phones.
    Phone,
    /// Watches and fitness bands.
    Wearable,
    /// TVs and speakers.
    Media,
    /// Laptops.
    Computer,
    /// Cars.
    Vehicle,
    /// Heart-rate service.
    HeartRateMonitor,
    /// Battery service.
    Battery,
    /// Human-interface-device service.
    Hid,
    /// No rule matched.
    #[default]
    Unknown,
}

impl std::fmt::Display for DeviceType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            Self::Suspicious => "Suspicious",
            Self::Audio => "Audio",
            Self::Phone => "Phone",
            Self::Wearable => "Wearable",
            Self::Media => "Media",
            Self::Computer => "Computer",
            Self::Vehicle => "Vehicle",
            Self::HeartRateMonitor => "Heart Rate Monitor",
            Self::Battery => "Battery",
            Self::Hid => "HID",
            Self::Unknown => "Unknown",
        };
        f.write_str(label)
    }
}

/// What a single rule inspects.
enum Matcher {
    /// Lowercased name contains any of these tokens.
    NameAny(&'static [&'static str]),
    /// Service-identifier set contains any of these codes.
    ServiceAny(&'static [&'static str]),
}

struct TypeRule {
    matcher: Matcher,
    label: DeviceType,
}

/// The rule table, in evaluation order.
const RULES: &[TypeRule] = &[
    TypeRule {
        matcher: Matcher::NameAny(SUSPICIOUS_NAME_TOKENS),
        label: DeviceType::Suspicious,
    },
    TypeRule {
        matcher: Matcher::NameAny(&["airpods", "beats"]),
        label: DeviceType::Audio,
    },
    TypeRule {
        matcher: Matcher::NameAny(&["iphone", "android", "phone"]),
        label: DeviceType::Phone,
    },
    TypeRule {
        matcher: Matcher::NameAny(&["watch", "band"]),
        label: DeviceType::Wearable,
    },
    TypeRule {
        matcher: Matcher::NameAny(&["tv", "speaker"]),
        label: DeviceType::Media,
    },
    TypeRule {
        matcher: Matcher::NameAny(&["laptop", "macbook"]),
        label: DeviceType::Computer,
    },
    TypeRule {
        matcher: Matcher::NameAny(&["car", "tesla"]),
        label: DeviceType::Vehicle,
    },
    TypeRule {
        matcher: Matcher::ServiceAny(&["180d"]),
        label: DeviceType::HeartRateMonitor,
    },
    TypeRule {
        matcher: Matcher::ServiceAny(&["180f"]),
        label: DeviceType::Battery,
    },
    TypeRule {
        matcher: Matcher::ServiceAny(&["1812"]),
        label: DeviceType::Hid,
    },
    TypeRule {
        matcher: Matcher::ServiceAny(&["110a", "110b"]),
        label: DeviceType::Audio,
    },
    TypeRule {
        matcher: Matcher::ServiceAny(SUSPICIOUS_SERVICE_IDS),
        label: DeviceType::Suspicious,
    },
];

/// Classify a device from its advertised name and service identifiers.
///
/// Name matching is case-insensitive substring; service matching is exact
/// set membership. The first matching rule wins; no match yields
/// [`DeviceType::Unknown`].
pub fn classify_device_type(name: Option<&str>, service_ids: &[String]) -> DeviceType {
    let lowered = name.map(str::to_lowercase).unwrap_or_default();

    for rule in RULES {
        let hit = match rule.matcher {
            Matcher::NameAny(tokens) => tokens.iter().any(|t| lowered.contains(t)),
            Matcher::ServiceAny(codes) => service_ids
                .iter()
                .any(|s| codes.iter().any(|c| s.eq_ignore_ascii_case(c))),
        };
        if hit {
            return rule.label;
        }
    }

    DeviceType::Unknown
}
