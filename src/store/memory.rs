//! In-memory statement store.
//!
//! Mirrors the SQLite store's filtering and ordering and records how often
//! each operation was called, so pipeline tests can assert on store traffic.

use std::cell::Cell;

use super::{
    ApprovalState, PersistenceReader, Scope, Snapshot, SnapshotSource, Statement,
    StatementStream, StoreError, StoreResult,
};

/// Number of calls made against a [`MemoryStore`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CallCounts {
    /// Snapshots opened
    pub snapshots: usize,
    /// `list_scopes` calls
    pub list_scopes: usize,
    /// `count` calls
    pub count: usize,
    /// `stream` calls
    pub stream: usize,
    /// Snapshots committed
    pub commits: usize,
    /// Snapshots rolled back
    pub rollbacks: usize,
}

/// Statement store held entirely in memory.
#[derive(Debug, Default)]
pub struct MemoryStore {
    statements: Vec<Statement>,
    preserve_order: bool,
    fail_commit: bool,
    calls: Cell<CallCounts>,
}

impl MemoryStore {
    /// Create a store holding `statements`.
    #[must_use]
    pub fn new(statements: Vec<Statement>) -> Self {
        Self {
            statements,
            preserve_order: false,
            fail_commit: false,
            calls: Cell::new(CallCounts::default()),
        }
    }

    /// Stream statements in insertion order instead of by subject.
    ///
    /// Models a store that cannot guarantee subject ordering.
    #[must_use]
    pub fn with_insertion_order(mut self) -> Self {
        self.preserve_order = true;
        self
    }

    /// Make every snapshot commit fail as if the database were locked.
    #[must_use]
    pub fn fail_commit(mut self) -> Self {
        self.fail_commit = true;
        self
    }

    /// Calls recorded so far.
    #[must_use]
    pub fn calls(&self) -> CallCounts {
        self.calls.get()
    }

    fn record(&self, f: impl FnOnce(&mut CallCounts)) {
        let mut calls = self.calls.get();
        f(&mut calls);
        self.calls.set(calls);
    }

    fn matching(&self, state: ApprovalState, scope: &Scope) -> Vec<Statement> {
        let mut selected: Vec<Statement> = self
            .statements
            .iter()
            .filter(|s| s.state == state && scope.contains(s))
            .cloned()
            .collect();
        if !self.preserve_order {
            selected.sort_by(|a, b| a.subject.cmp(&b.subject).then(a.id.cmp(&b.id)));
        }
        selected
    }
}

impl PersistenceReader for MemoryStore {
    fn list_scopes(&self) -> StoreResult<Vec<String>> {
        self.record(|c| c.list_scopes += 1);
        let mut datasets: Vec<String> = self
            .statements
            .iter()
            .filter(|s| !s.dataset.is_empty())
            .map(|s| s.dataset.clone())
            .collect();
        datasets.sort();
        datasets.dedup();
        Ok(datasets)
    }

    fn count(&self, state: ApprovalState, scope: &Scope) -> StoreResult<u64> {
        self.record(|c| c.count += 1);
        Ok(self.matching(state, scope).len() as u64)
    }

    fn stream<R>(
        &self,
        state: ApprovalState,
        scope: &Scope,
        consume: impl FnOnce(&mut StatementStream<'_>) -> R,
    ) -> StoreResult<R> {
        self.record(|c| c.stream += 1);
        let mut statements = self.matching(state, scope).into_iter().map(Ok::<_, StoreError>);
        Ok(consume(&mut statements))
    }
}

impl SnapshotSource for MemoryStore {
    type Snapshot<'a> = MemorySnapshot<'a>;

    fn begin_snapshot(&mut self) -> StoreResult<MemorySnapshot<'_>> {
        self.record(|c| c.snapshots += 1);
        Ok(MemorySnapshot { store: self })
    }
}

/// Snapshot over a [`MemoryStore`]. Reads delegate to the store.
#[derive(Debug)]
pub struct MemorySnapshot<'a> {
    store: &'a MemoryStore,
}

impl PersistenceReader for MemorySnapshot<'_> {
    fn list_scopes(&self) -> StoreResult<Vec<String>> {
        self.store.list_scopes()
    }

    fn count(&self, state: ApprovalState, scope: &Scope) -> StoreResult<u64> {
        self.store.count(state, scope)
    }

    fn stream<R>(
        &self,
        state: ApprovalState,
        scope: &Scope,
        consume: impl FnOnce(&mut StatementStream<'_>) -> R,
    ) -> StoreResult<R> {
        self.store.stream(state, scope, consume)
    }
}

impl Snapshot for MemorySnapshot<'_> {
    fn commit(self) -> StoreResult<()> {
        if self.store.fail_commit {
            return Err(StoreError::Database(rusqlite::Error::SqliteFailure(
                rusqlite::ffi::Error::new(rusqlite::ffi::SQLITE_BUSY),
                Some("database is locked".to_string()),
            )));
        }
        self.store.record(|c| c.commits += 1);
        Ok(())
    }

    fn rollback(self) -> StoreResult<()> {
        self.store.record(|c| c.rollbacks += 1);
        Ok(())
    }
}
