//! Cache rebuild pipeline.
//!
//! This module provides functionality for:
//! - Grouping a subject-ordered statement stream into batches
//! - Pacing progress updates per scope
//! - Orchestrating a full update or clear run

pub mod aggregator;
pub mod orchestrator;
pub mod progress_step;

pub use aggregator::{Batch, BatchAggregator, BufferedAggregator, Grouper, Grouping};
pub use orchestrator::{Orchestrator, RunSummary, ScopeSummary, CACHED_STATE};
pub use progress_step::{ProgressStep, PROGRESS_STEPS};

use crate::cache::CacheError;
use crate::store::StoreError;

/// Errors that abort a run.
#[derive(thiserror::Error, Debug)]
pub enum PipelineError {
    /// Reading from the statement store failed.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Encoding or writing a cache entry failed.
    #[error(transparent)]
    Cache(#[from] CacheError),

    /// Every scope was written but the snapshot could not be committed.
    #[error("Failed to commit snapshot: {0}")]
    Commit(#[source] StoreError),

    /// The run failed and the snapshot could not be rolled back either.
    #[error("{source} (rollback also failed: {rollback})")]
    Rollback {
        /// The error that aborted the run
        #[source]
        source: Box<PipelineError>,
        /// The error raised by the rollback
        rollback: StoreError,
    },
}
