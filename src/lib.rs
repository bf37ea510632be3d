pub mod coarsening;
pub mod config;
pub mod hypergraph;
pub mod initial;
pub mod io;
pub mod metrics;
pub mod partitioner;
pub mod priority_queue;
pub mod refinement;

use std::path::PathBuf;
use std::process::ExitStatus;

use thiserror::Error;

/// Errors surfaced by the partitioning pipeline.
///
/// Invariant violations inside the multilevel engine are programming errors
/// and are checked with `debug_assert!` instead of being reported here.
#[derive(Debug, Error)]
pub enum PartitionerError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// The input hypergraph file is not a well-formed hMetis .hgr file.
    #[error("malformed hypergraph file (line {line}): {reason}")]
    InvalidFormat { line: usize, reason: String },

    /// A command-line or configuration value is out of its valid range.
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    /// The external initial partitioner could not be spawned or exited nonzero.
    #[error("initial partitioner {path:?} failed with status {status}")]
    InitialPartitionerFailed { path: PathBuf, status: ExitStatus },
}
