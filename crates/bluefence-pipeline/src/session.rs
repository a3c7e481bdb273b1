//! Channel intake from the discovery source.
//!
//! The discovery source (the BLE stack, or a capture replay) pushes events
//! into an unbounded channel; the drive loop pulls them off and spawns one
//! classification task per event, so a slow vulnerability lookup for one
//! address never blocks intake or classification of other addresses.
//! Suspension happens only at the per-address lookup.

use std::collections::HashSet;
use std::sync::Arc;

use bluefence_core::DiscoveryEvent;
use bluefence_ledger::Registry;
use tokio::sync::mpsc;
use tokio::task::{JoinHandle, JoinSet};
use tracing::{debug, info};

use crate::lookup::VulnerabilityLookup;
use crate::pipeline::Pipeline;

/// A running scan session feeding a shared pipeline.
pub struct ScanSession {
    sender: mpsc::UnboundedSender<DiscoveryEvent>,
    driver: JoinHandle<u64>,
}

impl ScanSession {
    /// Start the drive loop over a shared pipeline.
    pub fn start<R, V>(pipeline: Arc<Pipeline<R, V>>) -> Self
    where
        R: Registry + 'static,
        V: VulnerabilityLookup + 'static,
    {
        let (sender, mut receiver) = mpsc::unbounded_channel::<DiscoveryEvent>();
        let allow_duplicates = pipeline.config().allow_duplicates;

        let driver = tokio::spawn(async move {
            let mut seen: HashSet<String> = HashSet::new();
            let mut tasks = JoinSet::new();
            let mut accepted: u64 = 0;

            while let Some(event) = receiver.recv().await {
                // Reap finished tasks so the set stays bounded over a long scan.
                while tasks.try_join_next().is_some() {}

                if !allow_duplicates && !seen.insert(event.address.clone()) {
                    debug!(address = %event.address, "duplicate suppressed by session");
                    continue;
                }
                accepted += 1;
                let pipeline = Arc::clone(&pipeline);
                tasks.spawn(async move {
                    pipeline.process(event).await;
                });
            }

            // Intake is closed. Wait for every in-flight classification so
            // its ledger append has landed before the session reports done.
            while tasks.join_next().await.is_some() {}
            accepted
        });

        info!("scan session started");
        Self { sender, driver }
    }

    /// Feed one discovery event into the session. Returns `false` once the
    /// session has been stopped.
    pub fn submit(&self, event: DiscoveryEvent) -> bool {
        self.sender.send(event).is_ok()
    }

    /// Stop intake and drain the session: waits for the drive loop and for
    /// every classification task it spawned, so ledger appends for all
    /// accepted events have landed when this returns. Returns the number of
    /// accepted events.
    pub async fn stop(self) -> u64 {
        drop(self.sender);
        let accepted = self.driver.await.unwrap_or(0);
        info!(accepted, "scan session stopped");
        accepted
    }
}
