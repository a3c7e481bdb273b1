//! Pipeline errors.

use thiserror::Error;

/// Errors surfaced by pipeline operations.
///
/// Classification itself never fails — lookup and ledger failures degrade
/// to conservative outcomes inside the pipeline. These errors cover the
/// query/export surface.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Ledger read or write failed.
    #[error(transparent)]
    Ledger(#[from] bluefence_ledger::LedgerError),

    /// Snapshot serialization failed.
    #[error("snapshot serialization failed: {0}")]
    Serialize(#[from] serde_json::Error),

    /// Export file could not be written.
    #[error("export write failed: {0}")]
    Io(#[from] std::io::Error),
}

/// Result alias for pipeline operations.
pub type Result<T> = std::result::Result<T, PipelineError>;
