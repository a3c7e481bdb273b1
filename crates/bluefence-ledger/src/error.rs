//! Ledger errors.

use thiserror::Error;

/// Errors from ledger operations.
///
/// Read-side corruption is deliberately absent: malformed lines in an
/// append-only log are skipped during scans, never surfaced as errors.
#[derive(Debug, Error)]
pub enum LedgerError {
    /// Disk or permission failure while appending or opening a ledger.
    #[error("ledger I/O failed: {0}")]
    Io(#[from] std::io::Error),

    /// Entry could not be serialized to a JSON line.
    #[error("ledger entry serialization failed: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Result alias for ledger operations.
pub type Result<T> = std::result::Result<T, LedgerError>;
