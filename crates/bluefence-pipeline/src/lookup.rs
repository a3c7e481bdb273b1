//! Vulnerability lookup seam.
//!
//! The feed service itself is an external collaborator; the pipeline only
//! depends on this trait. An empty finding list is a valid outcome distinct
//! from an error — the pipeline treats both as non-safe, but only findings
//! confirm a rogue.

use std::collections::HashMap;

use async_trait::async_trait;
use bluefence_core::Finding;
use thiserror::Error;

/// Lookup failures. Any of these degrade classification to `Potential`.
#[derive(Debug, Error)]
pub enum LookupError {
    /// The service did not answer in time.
    #[error("vulnerability lookup timed out for {address}")]
    Timeout {
        /// Address being looked up.
        address: String,
    },

    /// The service answered with an error or was unreachable.
    #[error("vulnerability lookup failed: {0}")]
    Unavailable(String),
}

/// `lookup(address) -> findings | error`.
#[async_trait]
pub trait VulnerabilityLookup: Send + Sync {
    /// Known findings for a device address. May be slow; the pipeline
    /// guards against concurrent lookups for the same address.
    async fn lookup(&self, address: &str) -> std::result::Result<Vec<Finding>, LookupError>;
}

/// Table-backed lookup over a pre-loaded finding set.
///
/// Serves replay sessions and tests; addresses absent from the table
/// resolve to no findings.
#[derive(Default)]
pub struct StaticLookup {
    findings: HashMap<String, Vec<Finding>>,
}

impl StaticLookup {
    /// Empty table: every address resolves clean.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add findings for an address.
    pub fn with_findings(mut self, address: impl Into<String>, findings: Vec<Finding>) -> Self {
        self.findings.insert(address.into(), findings);
        self
    }
}

#[async_trait]
impl VulnerabilityLookup for StaticLookup {
    async fn lookup(&self, address: &str) -> std::result::Result<Vec<Finding>, LookupError> {
        Ok(self.findings.get(address).cloned().unwrap_or_default())
    }
}
