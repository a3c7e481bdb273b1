//! Discovery-event classification pipeline for Bluefence
//!
//! Orchestrates one decision per discovery event: build a candidate record
//! from the signal heuristics, short-circuit on ledger membership, consult
//! the vulnerability lookup for genuinely new addresses, persist the
//! decision, and fold the sighting into live state. Queries (device list,
//! statistics, export) are served from the live-state merge.
//!
//! - `pipeline`: the per-event state machine and its in-flight guard
//! - `live`: in-memory sightings and the live/ledger merge
//! - `stats`: derived counts over merged state
//! - `lookup`: the vulnerability lookup seam
//! - `session`: channel intake from the discovery source

mod error;
mod live;
mod lookup;
mod pipeline;
mod session;
mod stats;

pub use error::{PipelineError, Result};
pub use live::LiveState;
pub use lookup::{LookupError, StaticLookup, VulnerabilityLookup};
pub use pipeline::{Outcome, Pipeline, Snapshot};
pub use session::ScanSession;
pub use stats::Statistics;
