//! File-backed ledgers: one JSON object per line, append-only, UTF-8.
//!
//! Append atomicity is this store's responsibility: each entry is written
//! with a single `write_all` of the full line under the per-ledger lock, so
//! a concurrent reader never observes an interleaved record. A truncated
//! last line from a crashed process is the only tolerated corruption and is
//! skipped on read like any other malformed line.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use bluefence_core::RegistryEntry;
use tokio::fs::OpenOptions;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::debug;

use crate::registry::{LedgerKind, Registry};
use crate::Result;

/// Reference Registry Store backend over three newline-delimited JSON files.
pub struct FileRegistry {
    data_dir: PathBuf,
    // One append lock per ledger; writes to different ledgers never contend.
    locks: [Mutex<()>; 3],
}

impl FileRegistry {
    /// Open (creating the directory if needed) a registry rooted at `data_dir`.
    pub async fn open(data_dir: impl Into<PathBuf>) -> Result<Self> {
        let data_dir = data_dir.into();
        tokio::fs::create_dir_all(&data_dir).await?;
        Ok(Self {
            data_dir,
            locks: [Mutex::new(()), Mutex::new(()), Mutex::new(())],
        })
    }

    fn path(&self, kind: LedgerKind) -> PathBuf {
        self.data_dir.join(kind.file_name())
    }

    fn lock(&self, kind: LedgerKind) -> &Mutex<()> {
        match kind {
            LedgerKind::Safe => &self.locks[0],
            LedgerKind::PotentialRogue => &self.locks[1],
            LedgerKind::ConfirmedRogue => &self.locks[2],
        }
    }

    async fn read_entries(path: &Path) -> Result<Vec<RegistryEntry>> {
        let text = match tokio::fs::read_to_string(path).await {
            Ok(text) => text,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => return Err(err.into()),
        };

        let mut entries = Vec::new();
        for line in text.lines() {
            if line.is_empty() {
                continue;
            }
            match serde_json::from_str::<RegistryEntry>(line) {
                Ok(entry) => entries.push(entry),
                Err(err) => {
                    // Partial writes from prior crashes accumulate here; skip.
                    debug!(path = %path.display(), %err, "skipping malformed ledger line");
                }
            }
        }
        Ok(entries)
    }
}

#[async_trait]
impl Registry for FileRegistry {
    async fn append(&self, kind: LedgerKind, entry: &RegistryEntry) -> Result<()> {
        let mut line = serde_json::to_string(entry)?;
        line.push('\n');

        let _guard = self.lock(kind).lock().await;
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(self.path(kind))
            .await?;
        file.write_all(line.as_bytes()).await?;
        file.flush().await?;

        debug!(ledger = ?kind, address = %entry.address, "ledger append");
        Ok(())
    }

    async fn find_by_address(
        &self,
        kind: LedgerKind,
        address: &str,
    ) -> Result<Option<RegistryEntry>> {
        let entries = Self::read_entries(&self.path(kind)).await?;
        Ok(entries.into_iter().find(|e| e.address == address))
    }

    async fn find_by_fingerprint(
        &self,
        kind: LedgerKind,
        fingerprint: &str,
    ) -> Result<Option<RegistryEntry>> {
        let entries = Self::read_entries(&self.path(kind)).await?;
        Ok(entries.into_iter().find(|e| e.fingerprint == fingerprint))
    }

    async fn load(&self, kind: LedgerKind) -> Result<Vec<RegistryEntry>> {
        Self::read_entries(&self.path(kind)).await
    }
}
