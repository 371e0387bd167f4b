//! End-to-end update runs against a SQLite database file.

use std::path::{Path, PathBuf};
use std::time::Duration;

use super::common::{config_for, create_database, fake_redis, sample_statements};
use rusqlite::Connection;
use tempfile::tempdir;
use updatecache::cache::{CacheEntry, CacheKey, CacheResult, CacheWriter, MemoryCache, RedisCache};
use updatecache::cli::Mode;
use updatecache::pipeline::{Grouping, PipelineError};
use updatecache::progress::{ProgressEvent, RecordingProgress};
use updatecache::store::{ApprovalState, SqliteStore, Statement};

#[test]
fn test_update_writes_every_scope() {
    let dir = tempdir().unwrap();
    let db = create_database(dir.path(), &sample_statements());
    let progress = RecordingProgress::new();
    let mut cache = MemoryCache::new();

    let summary = updatecache::execute(Mode::Update, &config_for(&db), &mut cache, &progress)
        .unwrap()
        .unwrap();

    assert_eq!(
        cache.writes(),
        [
            "Q1-0",
            "Q2-0",
            "Q3-0",
            "Q1-freebase-0",
            "Q2-freebase-0",
            "Q1-wikidata-0",
        ]
    );

    let q1: Vec<i64> = cache
        .get("Q1-0")
        .unwrap()
        .decode()
        .unwrap()
        .iter()
        .map(|s| s.id)
        .collect();
    assert_eq!(q1, vec![1, 2]);

    // The approved statement 4 is not part of any entry.
    let q2 = cache.get("Q2-freebase-0").unwrap().decode().unwrap();
    assert_eq!(q2.len(), 1);
    assert_eq!(q2[0].id, 3);

    // Fields survive the store and the encoding.
    let q3 = cache.get("Q3-0").unwrap().decode().unwrap();
    assert_eq!(q3, vec![Statement::new(5, "Q3", "P21", "Q6581097").with_upload(7)]);

    assert_eq!(summary.scopes.len(), 3);
    assert_eq!(summary.statements(), 7);
    assert_eq!(summary.batches(), 6);
    for scope in &summary.scopes {
        assert_eq!(scope.total, scope.statements);
    }
}

#[test]
fn test_update_is_idempotent() {
    let dir = tempdir().unwrap();
    let db = create_database(dir.path(), &sample_statements());
    let config = config_for(&db);
    let progress = RecordingProgress::new();

    let mut first = MemoryCache::new();
    updatecache::execute(Mode::Update, &config, &mut first, &progress).unwrap();

    let mut second = MemoryCache::new();
    updatecache::execute(Mode::Update, &config, &mut second, &progress).unwrap();
    assert_eq!(first.entries(), second.entries());

    // Rebuilding over existing entries converges to the same contents.
    let before = first.entries().clone();
    updatecache::execute(Mode::Update, &config, &mut first, &progress).unwrap();
    assert_eq!(first.entries(), &before);
}

#[test]
fn test_update_reflects_review_changes() {
    let dir = tempdir().unwrap();
    let db = create_database(dir.path(), &sample_statements());
    let config = config_for(&db);
    let progress = RecordingProgress::new();

    SqliteStore::create(&db)
        .unwrap()
        .set_state(1, ApprovalState::Approved)
        .unwrap();

    let mut cache = MemoryCache::new();
    updatecache::execute(Mode::Update, &config, &mut cache, &progress).unwrap();

    assert!(cache.get("Q1-freebase-0").is_none());
    let q1 = cache.get("Q1-0").unwrap().decode().unwrap();
    assert_eq!(q1.iter().map(|s| s.id).collect::<Vec<_>>(), vec![2]);
}

#[test]
fn test_update_empty_database() {
    let dir = tempdir().unwrap();
    let db = create_database(dir.path(), &[]);
    let progress = RecordingProgress::new();
    let mut cache = MemoryCache::new();

    let summary = updatecache::execute(Mode::Update, &config_for(&db), &mut cache, &progress)
        .unwrap()
        .unwrap();

    assert!(cache.is_empty());
    assert_eq!(summary.scopes.len(), 1);
    assert!(summary.scopes[0].scope.is_all());
    assert_eq!(
        progress.events(),
        vec![
            ProgressEvent::Start {
                scope: String::new(),
                total: 0
            },
            ProgressEvent::Update(0),
            ProgressEvent::Update(0),
            ProgressEvent::End {
                scope: String::new(),
                count: 0
            },
        ]
    );
}

#[test]
fn test_update_progress_totals_match_counts() {
    let dir = tempdir().unwrap();
    let db = create_database(dir.path(), &sample_statements());
    let progress = RecordingProgress::new();
    let mut cache = MemoryCache::new();

    updatecache::execute(Mode::Update, &config_for(&db), &mut cache, &progress).unwrap();

    let starts: Vec<_> = progress
        .events()
        .into_iter()
        .filter_map(|event| match event {
            ProgressEvent::Start { scope, total } => Some((scope, total)),
            _ => None,
        })
        .collect();
    assert_eq!(
        starts,
        vec![
            (String::new(), 4),
            ("freebase".to_string(), 2),
            ("wikidata".to_string(), 1),
        ]
    );
    assert_eq!(progress.updates_for("freebase").last(), Some(&2));
}

#[test]
fn test_update_missing_database_writes_nothing() {
    let dir = tempdir().unwrap();
    let progress = RecordingProgress::new();
    let mut cache = MemoryCache::new();

    let err = updatecache::execute(
        Mode::Update,
        &config_for(&dir.path().join("missing.db")),
        &mut cache,
        &progress,
    )
    .unwrap_err();

    assert!(format!("{err:#}").contains("Failed to open statement database"));
    assert!(cache.writes().is_empty());
    assert!(progress.events().is_empty());
}

#[test]
fn test_update_cache_failure_releases_snapshot() {
    let dir = tempdir().unwrap();
    let db = create_database(dir.path(), &sample_statements());
    let config = config_for(&db);
    let progress = RecordingProgress::new();

    let mut failing = MemoryCache::new().fail_after_upserts(2);
    let err = updatecache::execute(Mode::Update, &config, &mut failing, &progress).unwrap_err();

    assert!(matches!(
        err.downcast_ref::<PipelineError>(),
        Some(PipelineError::Cache(_))
    ));
    assert_eq!(failing.writes(), ["Q1-0", "Q2-0"]);

    // The read snapshot was rolled back, so the database stays writable.
    SqliteStore::create(&db)
        .unwrap()
        .set_state(3, ApprovalState::Duplicate)
        .unwrap();

    let mut cache = MemoryCache::new();
    updatecache::execute(Mode::Update, &config, &mut cache, &progress).unwrap();
    assert!(cache.get("Q2-0").is_none());
}

#[test]
fn test_update_buffered_grouping_matches_adjacent() {
    let dir = tempdir().unwrap();
    let db = create_database(dir.path(), &sample_statements());
    let progress = RecordingProgress::new();

    let mut adjacent = MemoryCache::new();
    updatecache::execute(Mode::Update, &config_for(&db), &mut adjacent, &progress).unwrap();

    let mut config = config_for(&db);
    config.grouping = Grouping::Buffered;
    let mut buffered = MemoryCache::new();
    updatecache::execute(Mode::Update, &config, &mut buffered, &progress).unwrap();

    // The store streams in subject order, so both strategies agree.
    assert_eq!(adjacent.entries(), buffered.entries());
    assert_eq!(adjacent.writes(), buffered.writes());
}

#[test]
fn test_update_through_redis_protocol() {
    let dir = tempdir().unwrap();
    let db = create_database(
        dir.path(),
        &[
            Statement::new(1, "Q1", "P31", "Q5").with_dataset("freebase"),
            Statement::new(2, "Q2", "P31", "Q5").with_dataset("freebase"),
        ],
    );
    let (redis, commands) = fake_redis(None);
    let mut config = config_for(&db);
    config.redis = redis;
    let progress = RecordingProgress::new();

    let cache = RedisCache::connect(&config.redis).unwrap();
    updatecache::execute(Mode::Update, &config, cache, &progress).unwrap();

    let sent: Vec<Vec<String>> = commands.iter().collect();
    let keys: Vec<String> = sent
        .iter()
        .map(|args| args[..2.min(args.len())].join(" "))
        .collect();
    assert_eq!(
        keys,
        vec![
            "PING",
            "SET Q1-0",
            "SET Q2-0",
            "SET Q1-freebase-0",
            "SET Q2-freebase-0",
        ]
    );

    let q1 = CacheEntry::encode(&[Statement::new(1, "Q1", "P31", "Q5").with_dataset("freebase")])
        .unwrap();
    assert_eq!(sent[1][2].as_bytes(), q1.as_bytes());
}

/// Approves statement 2 through its own connection while the first entry is
/// being written, as a reviewer working during a run would.
struct ConcurrentReview {
    cache: MemoryCache,
    writer: Option<Connection>,
    outcome: Option<rusqlite::Result<usize>>,
}

impl ConcurrentReview {
    fn new(writer: Connection) -> Self {
        Self {
            cache: MemoryCache::new(),
            writer: Some(writer),
            outcome: None,
        }
    }
}

impl CacheWriter for ConcurrentReview {
    fn upsert(&mut self, key: &CacheKey, entry: &CacheEntry) -> CacheResult<()> {
        if let Some(writer) = self.writer.take() {
            self.outcome = Some(writer.execute(
                "UPDATE statement SET state = ?1 WHERE id = 2",
                [ApprovalState::Approved.code()],
            ));
        }
        self.cache.upsert(key, entry)
    }

    fn clear(&mut self) -> CacheResult<()> {
        self.cache.clear()
    }
}

fn two_subjects(dir: &Path) -> PathBuf {
    create_database(
        dir,
        &[
            Statement::new(1, "Q1", "P31", "Q5").with_dataset("freebase"),
            Statement::new(2, "Q2", "P31", "Q5").with_dataset("freebase"),
        ],
    )
}

#[test]
fn test_update_reads_one_snapshot_under_wal() {
    let dir = tempdir().unwrap();
    let db = two_subjects(dir.path());
    let writer = Connection::open(&db).unwrap();
    let mode: String = writer
        .query_row("PRAGMA journal_mode=WAL", [], |row| row.get(0))
        .unwrap();
    assert_eq!(mode, "wal");

    let config = config_for(&db);
    let progress = RecordingProgress::new();
    let mut review = ConcurrentReview::new(writer);
    updatecache::execute(Mode::Update, &config, &mut review, &progress).unwrap();

    // The write went through, but the run kept reading its own snapshot.
    assert!(matches!(review.outcome, Some(Ok(1))));
    assert_eq!(
        review.cache.writes(),
        ["Q1-0", "Q2-0", "Q1-freebase-0", "Q2-freebase-0"]
    );
    let q2 = review.cache.get("Q2-freebase-0").unwrap().decode().unwrap();
    assert_eq!(q2.iter().map(|s| s.id).collect::<Vec<_>>(), vec![2]);

    // The next run sees the approval.
    let mut cache = MemoryCache::new();
    updatecache::execute(Mode::Update, &config, &mut cache, &progress).unwrap();
    assert_eq!(cache.writes(), ["Q1-0", "Q1-freebase-0"]);
}

#[test]
fn test_update_snapshot_blocks_writers_in_rollback_journal() {
    let dir = tempdir().unwrap();
    let db = two_subjects(dir.path());
    let writer = Connection::open(&db).unwrap();
    writer.busy_timeout(Duration::ZERO).unwrap();

    let config = config_for(&db);
    let progress = RecordingProgress::new();
    let mut review = ConcurrentReview::new(writer);
    updatecache::execute(Mode::Update, &config, &mut review, &progress).unwrap();

    // The shared lock is held for the whole run.
    assert!(matches!(
        review.outcome,
        Some(Err(rusqlite::Error::SqliteFailure(ref e, _)))
            if e.code == rusqlite::ErrorCode::DatabaseBusy
    ));
    assert_eq!(
        review.cache.writes(),
        ["Q1-0", "Q2-0", "Q1-freebase-0", "Q2-freebase-0"]
    );
}
