//! Classification pipeline conformance tests.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use assert_matches::assert_matches;
use async_trait::async_trait;
use bluefence_core::{Classification, Config, DiscoveryEvent, Finding, RegistryEntry, ThreatLevel};
use bluefence_ledger::{LedgerKind, MemoryRegistry, Registry};
use bluefence_pipeline::{LookupError, Pipeline, ScanSession, VulnerabilityLookup};
use chrono::Utc;

/// What a mock lookup should answer with.
enum Answer {
    Findings(usize),
    Fail,
}

/// Counts invocations and optionally holds every call until released.
struct MockLookup {
    answer: Answer,
    calls: AtomicUsize,
    hold: Option<tokio::sync::Semaphore>,
}

impl MockLookup {
    fn clean() -> Self {
        Self { answer: Answer::Findings(0), calls: AtomicUsize::new(0), hold: None }
    }

    fn with_findings(n: usize) -> Self {
        Self { answer: Answer::Findings(n), calls: AtomicUsize::new(0), hold: None }
    }

    fn failing() -> Self {
        Self { answer: Answer::Fail, calls: AtomicUsize::new(0), hold: None }
    }

    fn held(mut self) -> Self {
        self.hold = Some(tokio::sync::Semaphore::new(0));
        self
    }

    fn release(&self, permits: usize) {
        if let Some(hold) = &self.hold {
            hold.add_permits(permits);
        }
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl VulnerabilityLookup for MockLookup {
    async fn lookup(&self, address: &str) -> Result<Vec<Finding>, LookupError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(hold) = &self.hold {
            // Permit is intentionally not returned; each release frees one call.
            hold.acquire().await.map_err(|_| LookupError::Unavailable("closed".into()))?.forget();
        }
        match self.answer {
            Answer::Findings(n) => Ok((0..n)
                .map(|i| Finding {
                    id: format!("CVE-2025-{i:04}"),
                    summary: String::new(),
                    severity: "HIGH".into(),
                })
                .collect()),
            Answer::Fail => Err(LookupError::Unavailable(format!("feed down for {address}"))),
        }
    }
}

fn event(address: &str) -> DiscoveryEvent {
    DiscoveryEvent {
        address: address.into(),
        name: Some("Gizmo".into()),
        rssi: -64,
        service_ids: vec!["180f".into()],
        manufacturer_data: None,
        connectable: false,
        seen_at: Utc::now(),
    }
}

fn pipeline(
    registry: Arc<MemoryRegistry>,
    lookup: Arc<MockLookup>,
) -> Pipeline<MemoryRegistry, MockLookup> {
    Pipeline::new(registry, lookup, Config::default())
}

#[tokio::test]
async fn safe_ledger_short_circuits_the_lookup() {
    let registry = Arc::new(MemoryRegistry::new());
    registry
        .append(LedgerKind::Safe, &RegistryEntry::new("AA:11", "Gizmo", ""))
        .await
        .unwrap();
    let lookup = Arc::new(MockLookup::with_findings(3));
    let pipeline = pipeline(Arc::clone(&registry), Arc::clone(&lookup));

    let outcome = pipeline.process(event("AA:11")).await;

    assert_eq!(outcome.classification, Classification::Safe);
    assert_eq!(lookup.calls(), 0);
    assert!(outcome.ledger_failure.is_none());
}

#[tokio::test]
async fn confirmed_rogue_ledger_short_circuits_the_lookup() {
    let registry = Arc::new(MemoryRegistry::new());
    registry
        .append(LedgerKind::ConfirmedRogue, &RegistryEntry::new("AA:11", "Gizmo", ""))
        .await
        .unwrap();
    let lookup = Arc::new(MockLookup::clean());
    let pipeline = pipeline(Arc::clone(&registry), Arc::clone(&lookup));

    let outcome = pipeline.process(event("AA:11")).await;

    assert_eq!(outcome.classification, Classification::KnownRogue);
    assert_eq!(lookup.calls(), 0);
}

#[tokio::test]
async fn findings_confirm_a_rogue_with_one_ledger_entry() {
    let registry = Arc::new(MemoryRegistry::new());
    let lookup = Arc::new(MockLookup::with_findings(1));
    let pipeline = pipeline(Arc::clone(&registry), Arc::clone(&lookup));

    let outcome = pipeline.process(event("AA:11")).await;

    assert_eq!(outcome.classification, Classification::Rogue);
    let entries = registry.load(LedgerKind::ConfirmedRogue).await.unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].address, "AA:11");
    assert!(registry.load(LedgerKind::PotentialRogue).await.unwrap().is_empty());
}

#[tokio::test]
async fn no_findings_records_a_potential_rogue_once() {
    let registry = Arc::new(MemoryRegistry::new());
    let lookup = Arc::new(MockLookup::clean());
    let pipeline = pipeline(Arc::clone(&registry), Arc::clone(&lookup));

    let outcome = pipeline.process(event("BB:22")).await;
    assert_eq!(outcome.classification, Classification::Potential);

    let entries = registry.load(LedgerKind::PotentialRogue).await.unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].address, "BB:22");
}

#[tokio::test]
async fn lookup_failure_fails_safe_to_potential() {
    let registry = Arc::new(MemoryRegistry::new());
    let lookup = Arc::new(MockLookup::failing());
    let pipeline = pipeline(Arc::clone(&registry), Arc::clone(&lookup));

    let outcome = pipeline.process(event("CC:33")).await;

    assert_eq!(outcome.classification, Classification::Potential);
    let entries = registry.load(LedgerKind::PotentialRogue).await.unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].address, "CC:33");
}

#[tokio::test]
async fn repeat_events_never_repeat_the_lookup() {
    let registry = Arc::new(MemoryRegistry::new());
    let lookup = Arc::new(MockLookup::clean());
    let pipeline = pipeline(Arc::clone(&registry), Arc::clone(&lookup));

    let first = pipeline.process(event("DD:44")).await;
    assert_eq!(first.classification, Classification::Potential);

    // Address is now in the potential ledger; the scan short-circuits.
    let second = pipeline.process(event("DD:44")).await;
    assert_eq!(second.classification, Classification::Potential);

    assert_eq!(lookup.calls(), 1);
    assert_eq!(registry.load(LedgerKind::PotentialRogue).await.unwrap().len(), 1);
    assert_eq!(second.record.times_seen, 2);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn rapid_duplicates_coalesce_to_one_lookup_and_one_append() {
    let registry = Arc::new(MemoryRegistry::new());
    let lookup = Arc::new(MockLookup::clean().held());
    let pipeline = Arc::new(pipeline(Arc::clone(&registry), Arc::clone(&lookup)));

    let mut tasks = Vec::new();
    for _ in 0..10 {
        let pipeline = Arc::clone(&pipeline);
        tasks.push(tokio::spawn(async move { pipeline.process(event("EE:55")).await }));
    }

    // Wait until the winning task is parked inside the lookup, then let it go.
    while lookup.calls() == 0 {
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
    }
    lookup.release(10);

    let mut outcomes = Vec::new();
    for task in tasks {
        outcomes.push(task.await.unwrap());
    }

    assert_eq!(lookup.calls(), 1);
    assert_eq!(registry.load(LedgerKind::PotentialRogue).await.unwrap().len(), 1);

    // Exactly one event saw the decision through; the rest were coalesced
    // or short-circuited off the freshly appended ledger entry.
    assert!(outcomes
        .iter()
        .all(|o| matches!(o.classification, Classification::Potential | Classification::Unknown)));
    assert!(outcomes.iter().any(|o| o.classification == Classification::Potential));

    // Every duplicate still landed in live state.
    let record = pipeline.list_devices().await.unwrap();
    let seen = record.iter().find(|d| d.address == "EE:55").unwrap();
    assert_eq!(seen.times_seen, 10);
}

#[tokio::test]
async fn session_processes_distinct_addresses_concurrently() {
    let registry = Arc::new(MemoryRegistry::new());
    // Two permits released up front: both lookups can be in flight at once.
    let lookup = Arc::new(MockLookup::clean().held());
    let pipeline = Arc::new(pipeline(Arc::clone(&registry), Arc::clone(&lookup)));
    let session = ScanSession::start(Arc::clone(&pipeline));

    assert!(session.submit(event("AA:11")));
    assert!(session.submit(event("BB:22")));

    // Both distinct addresses reach the lookup without either completing —
    // a slow lookup for one address does not block the other.
    while lookup.calls() < 2 {
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
    }
    lookup.release(2);

    let accepted = session.stop().await;
    assert_eq!(accepted, 2);
}

#[tokio::test]
async fn stop_waits_for_in_flight_ledger_appends() {
    let registry = Arc::new(MemoryRegistry::new());
    let lookup = Arc::new(MockLookup::clean().held());
    let pipeline = Arc::new(pipeline(Arc::clone(&registry), Arc::clone(&lookup)));
    let session = ScanSession::start(Arc::clone(&pipeline));

    assert!(session.submit(event("AA:11")));
    while lookup.calls() == 0 {
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
    }

    // The lookup is still parked when stop begins; the release lands well
    // after, so stop returning early would observe an empty ledger.
    let release = {
        let lookup = Arc::clone(&lookup);
        tokio::spawn(async move {
            tokio::time::sleep(std::time::Duration::from_millis(100)).await;
            lookup.release(1);
        })
    };

    let accepted = session.stop().await;
    release.await.unwrap();

    assert_eq!(accepted, 1);
    assert_eq!(registry.load(LedgerKind::PotentialRogue).await.unwrap().len(), 1);
}

#[tokio::test]
async fn flag_forces_high_and_unflag_recomputes() {
    let registry = Arc::new(MemoryRegistry::new());
    let lookup = Arc::new(MockLookup::clean());
    let pipeline = pipeline(Arc::clone(&registry), Arc::clone(&lookup));

    pipeline.process(event("AA:11")).await;
    pipeline.flag("AA:11", "Loitering near SCIF", "ALPHA-7").await.unwrap();

    let devices = pipeline.list_devices().await.unwrap();
    let record = devices.iter().find(|d| d.address == "AA:11").unwrap();
    assert!(record.flagged);
    assert_eq!(record.threat, ThreatLevel::High);

    let flags = registry.load(LedgerKind::ConfirmedRogue).await.unwrap();
    assert_matches!(&flags[..], [entry] => {
        assert_eq!(entry.address, "AA:11");
        assert_eq!(entry.reason.as_deref(), Some("Loitering near SCIF"));
        assert_eq!(entry.operator.as_deref(), Some("ALPHA-7"));
        assert!(entry.flagged_at.is_some());
    });

    pipeline.unflag("AA:11").await.unwrap();
    let devices = pipeline.list_devices().await.unwrap();
    let record = devices.iter().find(|d| d.address == "AA:11").unwrap();
    assert!(!record.flagged);
    // Named, weak signal, known type: recomputed score is Low.
    assert_eq!(record.threat, ThreatLevel::Low);

    // Append-only: the flag entry remains, followed by a clear record.
    let flags = registry.load(LedgerKind::ConfirmedRogue).await.unwrap();
    assert_matches!(&flags[..], [flag, clear] => {
        assert!(flag.is_flag_record());
        assert!(clear.is_clear_record());
        assert_eq!(clear.address, "AA:11");
    });
}

#[tokio::test]
async fn flag_and_unflag_survive_a_restart() {
    let registry = Arc::new(MemoryRegistry::new());
    let lookup = Arc::new(MockLookup::clean());

    let first = pipeline(Arc::clone(&registry), Arc::clone(&lookup));
    first.process(event("AA:11")).await;
    first.flag("AA:11", "Manual flag", "ALPHA-7").await.unwrap();

    // A fresh pipeline over the same ledgers sees the persisted flag.
    let second = pipeline(Arc::clone(&registry), Arc::clone(&lookup));
    let devices = second.list_devices().await.unwrap();
    let record = devices.iter().find(|d| d.address == "AA:11").unwrap();
    assert!(record.flagged);
    assert_eq!(record.threat, ThreatLevel::High);

    // Unflag without any live sighting appends a clear record.
    second.unflag("AA:11").await.unwrap();

    let third = pipeline(Arc::clone(&registry), Arc::clone(&lookup));
    let devices = third.list_devices().await.unwrap();
    let record = devices.iter().find(|d| d.address == "AA:11").unwrap();
    assert!(!record.flagged);
    // Confirmed-rogue membership still pins the threat level.
    assert_eq!(record.threat, ThreatLevel::High);
}

#[tokio::test]
async fn unflag_of_an_unflagged_address_writes_nothing() {
    let registry = Arc::new(MemoryRegistry::new());
    let lookup = Arc::new(MockLookup::clean());
    let pipeline = pipeline(Arc::clone(&registry), Arc::clone(&lookup));

    pipeline.process(event("AA:11")).await;
    pipeline.unflag("AA:11").await.unwrap();

    // No confirmed-rogue history: a clear record here would invent one.
    assert!(registry.load(LedgerKind::ConfirmedRogue).await.unwrap().is_empty());
}

#[tokio::test]
async fn ledger_history_carries_source_trust() {
    let registry = Arc::new(MemoryRegistry::new());
    registry
        .append(LedgerKind::Safe, &RegistryEntry::new("AA:11", "Printer", ""))
        .await
        .unwrap();
    registry
        .append(LedgerKind::ConfirmedRogue, &RegistryEntry::new("BB:22", "Unknown", ""))
        .await
        .unwrap();
    let pipeline = pipeline(Arc::clone(&registry), Arc::new(MockLookup::clean()));

    let devices = pipeline.list_devices().await.unwrap();
    let safe = devices.iter().find(|d| d.address == "AA:11").unwrap();
    let rogue = devices.iter().find(|d| d.address == "BB:22").unwrap();

    assert_eq!(safe.threat, ThreatLevel::Low);
    assert!(!safe.flagged);
    // Confirmed by lookup, never manually flagged: high threat, no flag.
    assert_eq!(rogue.threat, ThreatLevel::High);
    assert!(!rogue.flagged);
}

#[tokio::test]
async fn statistics_match_the_merged_list() {
    let registry = Arc::new(MemoryRegistry::new());
    registry
        .append(LedgerKind::Safe, &RegistryEntry::new("99:99", "Historic", ""))
        .await
        .unwrap();
    let lookup = Arc::new(MockLookup::clean());
    let pipeline = pipeline(Arc::clone(&registry), Arc::clone(&lookup));

    pipeline.process(event("AA:11")).await;
    pipeline.flag("AA:11", "Manual flag", "ALPHA-7").await.unwrap();

    let devices = pipeline.list_devices().await.unwrap();
    let stats = pipeline.statistics().await.unwrap();

    assert_eq!(stats.total, devices.len());
    assert_eq!(stats.flagged, 1);
    assert_eq!(stats.critical, 1);
    // Only the live sighting is recent; the ledger-only device has no
    // current-session timestamp.
    assert_eq!(stats.recently_seen, 1);
}

#[tokio::test]
async fn export_snapshot_is_consistent() {
    let registry = Arc::new(MemoryRegistry::new());
    let lookup = Arc::new(MockLookup::clean());
    let pipeline = pipeline(Arc::clone(&registry), Arc::clone(&lookup));

    pipeline.process(event("AA:11")).await;
    pipeline.process(event("BB:22")).await;

    let snapshot = pipeline.export().await.unwrap();
    assert_eq!(snapshot.devices.len(), 2);
    assert_eq!(snapshot.statistics.total, 2);
    assert_eq!(snapshot.operator, "ALPHA-7");

    // Round-trips through JSON for collaborators.
    let json = serde_json::to_string(&snapshot).unwrap();
    let parsed: bluefence_pipeline::Snapshot = serde_json::from_str(&json).unwrap();
    assert_eq!(parsed.devices.len(), 2);
}
