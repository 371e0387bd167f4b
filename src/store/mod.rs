//! Authoritative statement store.
//!
//! This module defines the read side the cache rebuild consumes:
//!
//! * [`model`]: statements, approval states and dataset scopes.
//! * [`sqlite`]: the SQLite-backed store used in production.
//! * [`memory`]: an in-memory store with call accounting, used in tests.
//!
//! # Snapshots
//!
//! All reads of one run go through a single [`Snapshot`] obtained from a
//! [`SnapshotSource`]. The snapshot must be ended explicitly with
//! [`Snapshot::commit`] or [`Snapshot::rollback`]; callers never rely on
//! drop to close it.

pub mod memory;
pub mod model;
pub mod sqlite;

use std::path::PathBuf;

pub use memory::{CallCounts, MemorySnapshot, MemoryStore};
pub use model::{ApprovalState, Scope, Statement};
pub use sqlite::{SqliteSnapshot, SqliteStore};

/// Errors raised by the statement store.
#[derive(thiserror::Error, Debug)]
pub enum StoreError {
    /// The database file could not be opened.
    #[error("Failed to open database {path}: {source}")]
    Open {
        /// Path of the database file
        path: PathBuf,
        /// The underlying SQLite error
        #[source]
        source: rusqlite::Error,
    },

    /// A query or transaction statement failed.
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// A row carried a state code outside [`ApprovalState`].
    #[error("Unknown approval state code: {0}")]
    UnknownApprovalState(i32),
}

/// Result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Pull-based statement stream handed to a [`PersistenceReader::stream`] consumer.
pub type StatementStream<'a> = dyn Iterator<Item = StoreResult<Statement>> + 'a;

/// Read access to statements inside an open snapshot.
pub trait PersistenceReader {
    /// Names of all concrete datasets, ascending. Never contains `""`.
    fn list_scopes(&self) -> StoreResult<Vec<String>>;

    /// Number of statements with `state` inside `scope`.
    ///
    /// Must equal the number of items a full [`stream`](Self::stream) call
    /// yields for the same filter within the same snapshot.
    fn count(&self, state: ApprovalState, scope: &Scope) -> StoreResult<u64>;

    /// Stream statements with `state` inside `scope` into `consume`.
    ///
    /// The stream is finite and can be consumed once. Statements arrive in
    /// non-decreasing subject order; grouping by adjacency relies on this.
    /// The consumer may stop early by dropping the iterator.
    fn stream<R>(
        &self,
        state: ApprovalState,
        scope: &Scope,
        consume: impl FnOnce(&mut StatementStream<'_>) -> R,
    ) -> StoreResult<R>;
}

/// A consistent read view held open for a whole run.
pub trait Snapshot: PersistenceReader + Sized {
    /// End the snapshot after a successful run.
    fn commit(self) -> StoreResult<()>;

    /// End the snapshot after a failed run.
    fn rollback(self) -> StoreResult<()>;
}

/// Something that can open a [`Snapshot`].
pub trait SnapshotSource {
    /// Snapshot type borrowing from the source.
    type Snapshot<'a>: Snapshot
    where
        Self: 'a;

    /// Open a read snapshot covering every subsequent read.
    fn begin_snapshot(&mut self) -> StoreResult<Self::Snapshot<'_>>;
}
