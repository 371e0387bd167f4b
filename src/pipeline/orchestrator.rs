//! Cache rebuild orchestration.
//!
//! # Update
//!
//! 1. Open one read snapshot for the whole run.
//! 2. Build the scope list: the aggregate scope, then every dataset.
//! 3. For each scope, count the unapproved statements, stream them in
//!    subject order through the grouper and upsert every closed batch.
//! 4. Commit the snapshot once every scope is written; on any error, roll
//!    it back before returning.
//!
//! # Clear
//!
//! Empties the cache namespace with a single call. The store is never
//! touched.

use std::time::{Duration, Instant};

use super::aggregator::{Batch, Grouper, Grouping};
use super::progress_step::ProgressStep;
use super::PipelineError;
use crate::cache::{CacheEntry, CacheWriter};
use crate::progress::ProgressReporter;
use crate::store::{ApprovalState, PersistenceReader, Scope, Snapshot, SnapshotSource};

/// Approval state rebuilt into the cache.
pub const CACHED_STATE: ApprovalState = ApprovalState::Unapproved;

/// Outcome of refreshing one scope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScopeSummary {
    /// The scope
    pub scope: Scope,
    /// Statements the store counted for the scope
    pub total: u64,
    /// Statements actually streamed
    pub statements: u64,
    /// Cache entries written
    pub batches: u64,
    /// Encoded bytes written
    pub bytes: u64,
    /// Wall time spent on the scope
    pub elapsed: Duration,
}

impl ScopeSummary {
    fn new(scope: Scope, total: u64) -> Self {
        Self {
            scope,
            total,
            statements: 0,
            batches: 0,
            bytes: 0,
            elapsed: Duration::ZERO,
        }
    }
}

/// Outcome of a full update run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    /// Per-scope results, in processing order
    pub scopes: Vec<ScopeSummary>,
    /// Wall time of the whole run
    pub elapsed: Duration,
}

impl RunSummary {
    /// Statements streamed across all scopes.
    #[must_use]
    pub fn statements(&self) -> u64 {
        self.scopes.iter().map(|s| s.statements).sum()
    }

    /// Cache entries written across all scopes.
    #[must_use]
    pub fn batches(&self) -> u64 {
        self.scopes.iter().map(|s| s.batches).sum()
    }

    /// Encoded bytes written across all scopes.
    #[must_use]
    pub fn bytes(&self) -> u64 {
        self.scopes.iter().map(|s| s.bytes).sum()
    }
}

/// Drives a cache rebuild or clear against one cache.
pub struct Orchestrator<'p, W> {
    cache: W,
    progress: &'p dyn ProgressReporter,
    grouping: Grouping,
}

impl<'p, W: CacheWriter> Orchestrator<'p, W> {
    /// Create an orchestrator writing to `cache`.
    pub fn new(cache: W, progress: &'p dyn ProgressReporter) -> Self {
        Self {
            cache,
            progress,
            grouping: Grouping::default(),
        }
    }

    /// Set how statements are grouped into batches.
    #[must_use]
    pub fn with_grouping(mut self, grouping: Grouping) -> Self {
        self.grouping = grouping;
        self
    }

    /// The cache being written.
    pub fn cache(&self) -> &W {
        &self.cache
    }

    /// Consume the orchestrator, returning the cache.
    pub fn into_cache(self) -> W {
        self.cache
    }

    /// Rebuild every cache entry from `store` inside one snapshot.
    ///
    /// # Errors
    ///
    /// Returns the first store or cache error. The snapshot is rolled back
    /// before returning; if the rollback fails too, both errors are kept in
    /// [`PipelineError::Rollback`].
    pub fn update<S: SnapshotSource>(&mut self, store: &mut S) -> Result<RunSummary, PipelineError> {
        let started = Instant::now();
        let snapshot = store.begin_snapshot()?;
        log::info!("Start refreshing all cached entries ...");

        match self.refresh_all(&snapshot) {
            Ok(mut summary) => {
                snapshot.commit().map_err(|err| {
                    log::warn!("Failed to commit snapshot: {err}");
                    PipelineError::Commit(err)
                })?;
                summary.elapsed = started.elapsed();
                log::info!(
                    "Finished refreshing all cached entries: {} statements in {} entries ({:.2?})",
                    summary.statements(),
                    summary.batches(),
                    summary.elapsed
                );
                Ok(summary)
            }
            Err(err) => {
                log::warn!("Rolling back snapshot after error: {err}");
                match snapshot.rollback() {
                    Ok(()) => Err(err),
                    Err(rollback) => Err(PipelineError::Rollback {
                        source: Box::new(err),
                        rollback,
                    }),
                }
            }
        }
    }

    /// Remove every entry from the cache. Exactly one `clear` call is made.
    pub fn clear(&mut self) -> Result<(), PipelineError> {
        let started = Instant::now();
        log::info!("Clearing cached entries ...");
        self.cache.clear()?;
        log::info!("Cleared cached entries ({:.2?})", started.elapsed());
        Ok(())
    }

    fn refresh_all<R: PersistenceReader>(&mut self, reader: &R) -> Result<RunSummary, PipelineError> {
        let scopes = std::iter::once(Scope::all())
            .chain(reader.list_scopes()?.into_iter().map(Scope::dataset))
            .collect::<Vec<_>>();
        log::debug!("Refreshing {} scopes", scopes.len());

        let mut summary = RunSummary::default();
        for scope in scopes {
            summary.scopes.push(self.refresh_scope(reader, scope)?);
        }
        Ok(summary)
    }

    fn refresh_scope<R: PersistenceReader>(
        &mut self,
        reader: &R,
        scope: Scope,
    ) -> Result<ScopeSummary, PipelineError> {
        let started = Instant::now();
        let total = reader.count(CACHED_STATE, &scope)?;
        let step = ProgressStep::for_total(total);
        log::info!("Updating cached entries for {scope} ({total} statements)");

        self.progress.on_scope_start(&scope, total);
        self.progress.update(0);

        let mut summary = ScopeSummary::new(scope.clone(), total);
        let mut grouper = Grouper::new(self.grouping, CACHED_STATE, &scope);

        let streamed = reader.stream(CACHED_STATE, &scope, |statements| -> Result<(), PipelineError> {
            for statement in statements {
                let statement = statement?;
                summary.statements += 1;
                if let Some(batch) = grouper.push(statement) {
                    self.write_batch(batch, &mut summary)?;
                }
                if step.is_due(summary.statements) {
                    self.progress.update(summary.statements);
                }
            }
            for batch in grouper.finish() {
                self.write_batch(batch, &mut summary)?;
            }
            Ok(())
        });
        if let Err(err) = streamed.map_err(PipelineError::from).and_then(|result| result) {
            self.progress.on_scope_abort(&scope, summary.statements);
            return Err(err);
        }

        self.progress.update(summary.statements);
        self.progress.on_scope_end(&scope, summary.statements);

        if summary.statements != total {
            log::warn!(
                "Store counted {total} statements for {scope} but streamed {}",
                summary.statements
            );
        }
        summary.elapsed = started.elapsed();
        log::info!(
            "Refreshed {} entries for {scope} ({:.2?})",
            summary.batches,
            summary.elapsed
        );
        Ok(summary)
    }

    fn write_batch(&mut self, batch: Batch, summary: &mut ScopeSummary) -> Result<(), PipelineError> {
        let entry = CacheEntry::encode(&batch.statements)?;
        self.cache.upsert(&batch.key, &entry)?;
        log::trace!(
            "Wrote {} statements to {}",
            batch.statements.len(),
            batch.key
        );
        summary.batches += 1;
        summary.bytes += entry.len() as u64;
        Ok(())
    }
}
