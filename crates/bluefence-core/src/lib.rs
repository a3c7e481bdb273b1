//! Core shared types for the Bluefence rogue-device detection core
//!
//! This crate is the single source of truth for the domain model — discovery
//! events, device records, trust classifications — and for the pure signal
//! heuristics that feed the classification pipeline:
//!
//! - `device`: discovery events, device records, registry entries
//! - `distance`: RSSI to approximate-distance conversion
//! - `device_type`: ordered rule table labeling a device from its advertisement
//! - `threat`: rule-based threat scoring
//!
//! Everything here is deterministic and side-effect free; persistence and
//! orchestration live in `bluefence-ledger` and `bluefence-pipeline`.

pub mod config;
pub mod device;
pub mod device_type;
pub mod distance;
pub mod threat;

pub use config::Config;
pub use device::{
    Classification, DeviceRecord, DiscoveryEvent, Finding, RegistryEntry, ThreatLevel,
};
pub use device_type::{classify_device_type, DeviceType};
pub use distance::{estimate_distance, UNDETERMINABLE_DISTANCE};
pub use threat::{score_device, threat_level};
