//! Append-only device trust ledgers for Bluefence
//!
//! Three disjoint ledgers — known-safe, potential-rogue, confirmed-rogue —
//! each an append-only, newline-delimited JSON log. The classification
//! pipeline is the only writer; a given address is expected to appear in at
//! most one ledger.
//!
//! The [`Registry`] trait is the capability surface `{append, find_by_address,
//! find_by_fingerprint, load}`; [`FileRegistry`] is the reference backend and
//! [`MemoryRegistry`] the ephemeral alternate used by tests and simulations.

mod error;
mod file;
mod memory;
mod registry;

pub use error::{LedgerError, Result};
pub use file::FileRegistry;
pub use memory::MemoryRegistry;
pub use registry::{LedgerKind, Registry};
