//! The per-event classification state machine.
//!
//! Ledger membership short-circuits in a fixed order (safe, confirmed-rogue,
//! potential-rogue) before any external lookup, which makes classification
//! idempotent: once an address is in any ledger no further lookups run for
//! it. Genuinely new addresses pass through the per-address in-flight guard
//! so a burst of duplicate advertisements triggers exactly one lookup and
//! one ledger append.

use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;

use bluefence_core::{Classification, Config, DeviceRecord, DiscoveryEvent, RegistryEntry};
use bluefence_ledger::{LedgerError, LedgerKind, Registry};
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::live::LiveState;
use crate::lookup::VulnerabilityLookup;
use crate::stats::Statistics;
use crate::Result;

/// Decision for one discovery event.
#[derive(Debug)]
pub struct Outcome {
    /// Trust classification emitted for the event.
    pub classification: Classification,
    /// Live record after folding the sighting in.
    pub record: DeviceRecord,
    /// Ledger append failure, if the side effect was lost. The decision
    /// stands; persistent storage failures need operator attention.
    pub ledger_failure: Option<LedgerError>,
}

/// Point-in-time export of merged state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Snapshot {
    /// When the snapshot was taken.
    pub exported_at: DateTime<Utc>,
    /// Operator identity from configuration.
    pub operator: String,
    /// Merged device list, sorted by signal strength descending.
    pub devices: Vec<DeviceRecord>,
    /// Statistics consistent with `devices`.
    pub statistics: Statistics,
}

/// Classification pipeline context: registry, lookup, live state, and the
/// in-flight guard, owned together and passed to every operation.
pub struct Pipeline<R, V> {
    registry: Arc<R>,
    lookup: Arc<V>,
    live: LiveState,
    in_flight: Mutex<HashSet<String>>,
    config: Config,
}

impl<R: Registry, V: VulnerabilityLookup> Pipeline<R, V> {
    /// Build a pipeline over a registry backend and a lookup service.
    pub fn new(registry: Arc<R>, lookup: Arc<V>, config: Config) -> Self {
        Self {
            registry,
            lookup,
            live: LiveState::new(),
            in_flight: Mutex::new(HashSet::new()),
            config,
        }
    }

    /// Classify one discovery event.
    ///
    /// Live state is updated on every path, including coalesced duplicates;
    /// ledger write failures are surfaced in the outcome but never abort
    /// the decision.
    pub async fn process(&self, event: DiscoveryEvent) -> Outcome {
        let record = self.live.observe(&event);
        debug!(
            address = %event.address,
            name = event.name.as_deref().unwrap_or("Unknown"),
            rssi = event.rssi,
            distance = record.distance,
            "discovery event"
        );

        let (classification, ledger_failure) = self.classify(&event).await;
        self.log_classification(&event, classification);
        self.log_discovery(&event, classification).await;

        Outcome {
            classification,
            // Flag state may have changed while we awaited the lookup.
            record: self.live.get(&event.address).unwrap_or(record),
            ledger_failure,
        }
    }

    async fn classify(
        &self,
        event: &DiscoveryEvent,
    ) -> (Classification, Option<LedgerError>) {
        let address = event.address.as_str();

        // Ledger membership decides without any external call. Order is
        // fixed and short-circuits on first match.
        if let Some(known) = self.ledger_classification(address).await {
            return (known, None);
        }

        // New address: at most one concurrent lookup per address. A
        // duplicate arriving while the first is in flight is coalesced.
        if !self.in_flight.lock().insert(address.to_string()) {
            debug!(%address, "classification already in flight, coalescing");
            return (Classification::Unknown, None);
        }

        // Re-check after winning the guard: a concurrent classification may
        // have persisted this address between our scan and the insert.
        if let Some(known) = self.ledger_classification(address).await {
            self.in_flight.lock().remove(address);
            return (known, None);
        }

        let entry = RegistryEntry::new(
            address,
            event.name.as_deref().unwrap_or("Unknown"),
            event.fingerprint(),
        );

        let (classification, target) = match self.lookup.lookup(address).await {
            Ok(findings) if !findings.is_empty() => {
                info!(%address, findings = findings.len(), "vulnerabilities found, confirming rogue");
                (Classification::Rogue, LedgerKind::ConfirmedRogue)
            }
            Ok(_) => (Classification::Potential, LedgerKind::PotentialRogue),
            Err(err) => {
                // Fail safe: uncertainty is recorded as potential, never safe.
                warn!(%address, %err, "vulnerability lookup failed");
                (Classification::Potential, LedgerKind::PotentialRogue)
            }
        };

        let ledger_failure = match self.registry.append(target, &entry).await {
            Ok(()) => None,
            Err(err) => {
                warn!(%address, ledger = ?target, %err, "ledger append failed, decision not persisted");
                Some(err)
            }
        };

        self.in_flight.lock().remove(address);
        (classification, ledger_failure)
    }

    /// Classification implied by existing ledger membership, if any.
    async fn ledger_classification(&self, address: &str) -> Option<Classification> {
        for kind in LedgerKind::ALL {
            if self.ledger_has(kind, address).await {
                return Some(match kind {
                    LedgerKind::Safe => Classification::Safe,
                    LedgerKind::ConfirmedRogue => Classification::KnownRogue,
                    LedgerKind::PotentialRogue => Classification::Potential,
                });
            }
        }
        None
    }

    async fn ledger_has(&self, kind: LedgerKind, address: &str) -> bool {
        match self.registry.find_by_address(kind, address).await {
            Ok(hit) => hit.is_some(),
            Err(err) => {
                // An unreadable ledger must not promote a device to safe;
                // treat as no match and keep classifying conservatively.
                warn!(ledger = ?kind, %address, %err, "ledger scan failed");
                false
            }
        }
    }

    fn log_classification(&self, event: &DiscoveryEvent, classification: Classification) {
        let address = event.address.as_str();
        let name = event.name.as_deref().unwrap_or("Unknown");
        match classification {
            Classification::Safe => info!(%address, name, "safe device detected"),
            Classification::KnownRogue => warn!(%address, name, "known rogue device detected"),
            Classification::Rogue => warn!(%address, name, "confirmed rogue device added"),
            Classification::Potential => {
                info!(%address, name, "unknown device flagged as potential rogue");
            }
            Classification::Unknown => {}
        }
    }

    /// Optional per-event audit line, mirroring the discovery log of the
    /// original scanner. Never fatal.
    async fn log_discovery(&self, event: &DiscoveryEvent, classification: Classification) {
        if !self.config.log_discoveries {
            return;
        }
        let line = serde_json::json!({
            "timestamp": Utc::now(),
            "address": event.address,
            "name": event.name,
            "rssi": event.rssi,
            "serviceIds": event.service_ids,
            "classification": classification,
        });
        let path = self.config.data_dir.join("discovery.log");
        let mut text = line.to_string();
        text.push('\n');
        let result = async {
            tokio::fs::create_dir_all(&self.config.data_dir).await?;
            let mut file = tokio::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(&path)
                .await?;
            tokio::io::AsyncWriteExt::write_all(&mut file, text.as_bytes()).await
        }
        .await;
        if let Err(err) = result {
            warn!(path = %path.display(), %err, "failed to write discovery log");
        }
    }

    /// Runtime configuration this pipeline was built with.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Merged device list: ledger history plus live sightings, live data
    /// winning, sorted by signal strength descending.
    pub async fn list_devices(&self) -> Result<Vec<DeviceRecord>> {
        // Confirmed-rogue last so its flag and clear records decide the
        // merge for addresses that also sit in another ledger.
        let mut history = Vec::new();
        for kind in [LedgerKind::Safe, LedgerKind::PotentialRogue, LedgerKind::ConfirmedRogue] {
            for entry in self.registry.load(kind).await? {
                history.push((kind, entry));
            }
        }
        Ok(self.live.merged(&history))
    }

    /// Statistics over exactly what [`Self::list_devices`] currently reports.
    pub async fn statistics(&self) -> Result<Statistics> {
        Ok(Statistics::from_devices(&self.list_devices().await?))
    }

    /// Manually flag a device: forces High threat, records the action in
    /// the confirmed-rogue ledger with reason and operator identity.
    pub async fn flag(&self, address: &str, reason: &str, operator: &str) -> Result<()> {
        let record = self.live.flag(address);

        let mut entry = RegistryEntry::new(
            address,
            record
                .as_ref()
                .and_then(|r| r.name.as_deref())
                .unwrap_or("Unknown"),
            record
                .as_ref()
                .map(|r| r.service_ids.join(", "))
                .unwrap_or_default(),
        );
        entry.reason = Some(reason.to_string());
        entry.operator = Some(operator.to_string());
        entry.flagged_at = Some(Utc::now());

        self.registry.append(LedgerKind::ConfirmedRogue, &entry).await?;
        info!(%address, reason, operator, "device flagged");
        Ok(())
    }

    /// Clear a manual flag: recompute the live threat level and, when the
    /// address has confirmed-rogue history, append a clear record so the
    /// unflag survives a restart. Flag entries are append-only history and
    /// remain, as does confirmed-rogue membership.
    pub async fn unflag(&self, address: &str) -> Result<()> {
        let record = self.live.unflag(address);

        if let Some(previous) = self
            .registry
            .find_by_address(LedgerKind::ConfirmedRogue, address)
            .await?
        {
            let name = record
                .as_ref()
                .and_then(|r| r.name.clone())
                .unwrap_or_else(|| previous.name.clone());
            let fingerprint = record
                .as_ref()
                .map(|r| r.service_ids.join(", "))
                .unwrap_or_else(|| previous.fingerprint.clone());
            let mut entry = RegistryEntry::new(address, name, fingerprint);
            entry.cleared_at = Some(Utc::now());
            self.registry.append(LedgerKind::ConfirmedRogue, &entry).await?;
        }

        info!(%address, "device unflagged");
        Ok(())
    }

    /// Point-in-time snapshot of merged state plus statistics.
    pub async fn export(&self) -> Result<Snapshot> {
        let devices = self.list_devices().await?;
        let statistics = Statistics::from_devices(&devices);
        Ok(Snapshot {
            exported_at: Utc::now(),
            operator: self.config.operator.clone(),
            devices,
            statistics,
        })
    }

    /// Write a snapshot to `scan-<millis>.json` in the data directory and
    /// return its path.
    pub async fn export_to_file(&self) -> Result<PathBuf> {
        let snapshot = self.export().await?;
        tokio::fs::create_dir_all(&self.config.data_dir).await?;
        let path = self
            .config
            .data_dir
            .join(format!("scan-{}.json", snapshot.exported_at.timestamp_millis()));
        let json = serde_json::to_vec_pretty(&snapshot)?;
        tokio::fs::write(&path, json).await?;
        info!(path = %path.display(), "snapshot exported");
        Ok(path)
    }
}
