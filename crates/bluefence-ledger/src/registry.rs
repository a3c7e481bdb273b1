//! The Registry Store capability trait.

use async_trait::async_trait;
use bluefence_core::RegistryEntry;

use crate::Result;

/// Which trust ledger an operation targets.
///
/// Ledgers are independent: appends to different ledgers never contend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LedgerKind {
    /// Devices vetted as safe.
    Safe,
    /// Devices awaiting confirmation, recorded fail-safe.
    PotentialRogue,
    /// Devices with confirmed findings or manual flags.
    ConfirmedRogue,
}

impl LedgerKind {
    /// All ledgers, in classification lookup order.
    pub const ALL: [LedgerKind; 3] = [
        LedgerKind::Safe,
        LedgerKind::ConfirmedRogue,
        LedgerKind::PotentialRogue,
    ];

    /// On-disk file name, kept compatible with the original flat-file store.
    pub fn file_name(self) -> &'static str {
        match self {
            LedgerKind::Safe => "known.safe.devices.db",
            LedgerKind::PotentialRogue => "potential.rogue_devices.db",
            LedgerKind::ConfirmedRogue => "known.rogue.devices.db",
        }
    }
}

/// Capability surface of the Registry Store.
///
/// Append-only by construction: there is no update or delete. Correcting a
/// misclassification is an out-of-band process.
#[async_trait]
pub trait Registry: Send + Sync {
    /// Append one entry to a ledger. Atomic with respect to other appends
    /// to the same ledger.
    async fn append(&self, kind: LedgerKind, entry: &RegistryEntry) -> Result<()>;

    /// First entry with this address, scanning in append order.
    async fn find_by_address(&self, kind: LedgerKind, address: &str)
        -> Result<Option<RegistryEntry>>;

    /// First entry with this fingerprint, scanning in append order.
    async fn find_by_fingerprint(
        &self,
        kind: LedgerKind,
        fingerprint: &str,
    ) -> Result<Option<RegistryEntry>>;

    /// Every parseable entry in a ledger, in append order.
    async fn load(&self, kind: LedgerKind) -> Result<Vec<RegistryEntry>>;
}
