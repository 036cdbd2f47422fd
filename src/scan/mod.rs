//! Scan passes over a source collector
//!
//! A pass pulls every group and unit from the collector once, detects and
//! scores each unit, persists the unit records, then aggregates and
//! persists one record per non-empty group. At most one pass runs at a
//! time; a collector failure aborts the pass before anything is written.

mod collector;
mod pass;
mod readiness;
mod scheduler;

pub use collector::{FlowFileCollector, GroupInfo, SourceCollector, UnitSource};
pub use pass::{analyze_unit, PassReport, Scanner, UnitOutcome};
pub use readiness::{Readiness, ReadinessGate};
pub use scheduler::{ScanGuard, ScanScheduler, ScanState};

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ScanError {
    #[error("failed to read flow file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid JSON in flow file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("{path} is not a flow export: {reason}")]
    Format { path: PathBuf, reason: String },

    #[error("collector failed: {0}")]
    Collector(String),

    #[error("a scan is already running")]
    AlreadyRunning,

    #[error("collector not ready after {attempts} attempts")]
    NotReady { attempts: u32 },
}
