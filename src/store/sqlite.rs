//! SQLite-backed statement store.

use std::path::Path;
use std::time::Duration;

use rusqlite::{params, Connection, OpenFlags, Row, Transaction, TransactionBehavior};

use super::{
    ApprovalState, PersistenceReader, Scope, Snapshot, SnapshotSource, Statement,
    StatementStream, StoreError, StoreResult,
};
use crate::config::DatabaseConfig;

const SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS statement (
        id       INTEGER PRIMARY KEY,
        subject  TEXT NOT NULL,
        property TEXT NOT NULL,
        value    TEXT NOT NULL,
        dataset  TEXT NOT NULL DEFAULT '',
        upload   INTEGER NOT NULL DEFAULT 0,
        state    INTEGER NOT NULL DEFAULT 0
    );
    CREATE INDEX IF NOT EXISTS idx_statement_state_dataset_subject
        ON statement (state, dataset, subject);
";

const SELECT_STATEMENTS: &str = "
    SELECT id, subject, property, value, dataset, upload, state
    FROM statement
    WHERE state = ?1 AND (?2 = '' OR dataset = ?2)
    ORDER BY subject ASC, id ASC
";

const COUNT_STATEMENTS: &str = "
    SELECT COUNT(*) FROM statement
    WHERE state = ?1 AND (?2 = '' OR dataset = ?2)
";

const SELECT_DATASETS: &str = "
    SELECT DISTINCT dataset FROM statement
    WHERE dataset <> ''
    ORDER BY dataset ASC
";

/// Statement store backed by a SQLite database file.
pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    /// Open an existing database read-only.
    pub fn open(config: &DatabaseConfig) -> StoreResult<Self> {
        let flags = OpenFlags::SQLITE_OPEN_READ_ONLY
            | OpenFlags::SQLITE_OPEN_URI
            | OpenFlags::SQLITE_OPEN_NO_MUTEX;
        let conn =
            Connection::open_with_flags(&config.path, flags).map_err(|source| StoreError::Open {
                path: config.path.clone(),
                source,
            })?;
        conn.busy_timeout(Duration::from_millis(config.busy_timeout_ms))?;
        log::debug!("Opened statement store {}", config.path.display());
        Ok(Self { conn })
    }

    /// Open or create a writable database and make sure the schema exists.
    pub fn create(path: &Path) -> StoreResult<Self> {
        let conn = Connection::open(path).map_err(|source| StoreError::Open {
            path: path.to_path_buf(),
            source,
        })?;
        let store = Self { conn };
        store.init_schema()?;
        Ok(store)
    }

    /// Create a private in-memory database with the schema applied.
    pub fn in_memory() -> StoreResult<Self> {
        let store = Self {
            conn: Connection::open_in_memory()?,
        };
        store.init_schema()?;
        Ok(store)
    }

    /// Create the `statement` table and its lookup index if missing.
    pub fn init_schema(&self) -> StoreResult<()> {
        self.conn.execute_batch(SCHEMA)?;
        Ok(())
    }

    /// Insert a statement, replacing any row with the same id.
    pub fn insert_statement(&self, statement: &Statement) -> StoreResult<()> {
        self.conn.execute(
            "INSERT OR REPLACE INTO statement (id, subject, property, value, dataset, upload, state)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                statement.id,
                statement.subject,
                statement.property,
                statement.value,
                statement.dataset,
                statement.upload,
                statement.state.code(),
            ],
        )?;
        Ok(())
    }

    /// Insert many statements in one write transaction.
    pub fn insert_statements(&mut self, statements: &[Statement]) -> StoreResult<()> {
        let tx = self.conn.transaction()?;
        {
            let mut stmt = tx.prepare(
                "INSERT OR REPLACE INTO statement (id, subject, property, value, dataset, upload, state)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            )?;
            for s in statements {
                stmt.execute(params![
                    s.id,
                    s.subject,
                    s.property,
                    s.value,
                    s.dataset,
                    s.upload,
                    s.state.code(),
                ])?;
            }
        }
        tx.commit()?;
        Ok(())
    }

    /// Update the review state of one statement.
    pub fn set_state(&self, id: i64, state: ApprovalState) -> StoreResult<()> {
        self.conn.execute(
            "UPDATE statement SET state = ?1 WHERE id = ?2",
            params![state.code(), id],
        )?;
        Ok(())
    }
}

impl SnapshotSource for SqliteStore {
    type Snapshot<'a> = SqliteSnapshot<'a>;

    fn begin_snapshot(&mut self) -> StoreResult<SqliteSnapshot<'_>> {
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Deferred)?;
        // A deferred transaction only takes its shared lock on first read.
        tx.query_row("SELECT COUNT(*) FROM sqlite_master", [], |row| {
            row.get::<_, i64>(0)
        })?;
        Ok(SqliteSnapshot { tx })
    }
}

/// A read transaction over a [`SqliteStore`].
pub struct SqliteSnapshot<'conn> {
    tx: Transaction<'conn>,
}

impl PersistenceReader for SqliteSnapshot<'_> {
    fn list_scopes(&self) -> StoreResult<Vec<String>> {
        let mut stmt = self.tx.prepare(SELECT_DATASETS)?;
        let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;
        let datasets = rows.collect::<Result<Vec<_>, _>>()?;
        Ok(datasets)
    }

    fn count(&self, state: ApprovalState, scope: &Scope) -> StoreResult<u64> {
        let count: i64 = self.tx.query_row(
            COUNT_STATEMENTS,
            params![state.code(), scope.name()],
            |row| row.get(0),
        )?;
        Ok(u64::try_from(count).unwrap_or(0))
    }

    fn stream<R>(
        &self,
        state: ApprovalState,
        scope: &Scope,
        consume: impl FnOnce(&mut StatementStream<'_>) -> R,
    ) -> StoreResult<R> {
        let mut stmt = self.tx.prepare(SELECT_STATEMENTS)?;
        let rows = stmt.query_map(params![state.code(), scope.name()], StatementRow::from_row)?;
        let mut statements =
            rows.map(|row| row.map_err(StoreError::from).and_then(StatementRow::into_statement));
        Ok(consume(&mut statements))
    }
}

impl Snapshot for SqliteSnapshot<'_> {
    fn commit(self) -> StoreResult<()> {
        self.tx.commit()?;
        Ok(())
    }

    fn rollback(self) -> StoreResult<()> {
        self.tx.rollback()?;
        Ok(())
    }
}

/// Raw row before the state code is validated.
struct StatementRow {
    id: i64,
    subject: String,
    property: String,
    value: String,
    dataset: String,
    upload: i64,
    state: i32,
}

impl StatementRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            subject: row.get(1)?,
            property: row.get(2)?,
            value: row.get(3)?,
            dataset: row.get(4)?,
            upload: row.get(5)?,
            state: row.get(6)?,
        })
    }

    fn into_statement(self) -> StoreResult<Statement> {
        Ok(Statement {
            id: self.id,
            subject: self.subject,
            property: self.property,
            value: self.value,
            dataset: self.dataset,
            upload: self.upload,
            state: ApprovalState::from_code(self.state)?,
        })
    }
}
