//! In-memory Registry Store backend.
//!
//! Same capability surface as [`crate::FileRegistry`] without persistence.
//! Used by tests and by ephemeral sessions that should leave no state
//! behind; entries vanish with the process.

use std::collections::HashMap;

use async_trait::async_trait;
use bluefence_core::RegistryEntry;
use parking_lot::RwLock;

use crate::registry::{LedgerKind, Registry};
use crate::Result;

/// Ephemeral Registry Store backend.
#[derive(Default)]
pub struct MemoryRegistry {
    ledgers: RwLock<HashMap<LedgerKind, Vec<RegistryEntry>>>,
}

impl MemoryRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Registry for MemoryRegistry {
    async fn append(&self, kind: LedgerKind, entry: &RegistryEntry) -> Result<()> {
        self.ledgers
            .write()
            .entry(kind)
            .or_default()
            .push(entry.clone());
        Ok(())
    }

    async fn find_by_address(
        &self,
        kind: LedgerKind,
        address: &str,
    ) -> Result<Option<RegistryEntry>> {
        Ok(self
            .ledgers
            .read()
            .get(&kind)
            .and_then(|entries| entries.iter().find(|e| e.address == address).cloned()))
    }

    async fn find_by_fingerprint(
        &self,
        kind: LedgerKind,
        fingerprint: &str,
    ) -> Result<Option<RegistryEntry>> {
        Ok(self
            .ledgers
            .read()
            .get(&kind)
            .and_then(|entries| entries.iter().find(|e| e.fingerprint == fingerprint).cloned()))
    }

    async fn load(&self, kind: LedgerKind) -> Result<Vec<RegistryEntry>> {
        Ok(self.ledgers.read().get(&kind).cloned().unwrap_or_default())
    }
}
