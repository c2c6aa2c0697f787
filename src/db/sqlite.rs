use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use rusqlite::Connection;

use super::DatabaseError;

/// Virtual machine instructions between two deadline checks.
const DEADLINE_CHECK_INTERVAL: i32 = 1_000;

/// Point in time after which a storage operation is abandoned.
///
/// Every connection handed out by [`Store::connect`] is bound to one.
/// Statements still running when it passes are interrupted and their
/// enclosing transaction rolls back, so a timed-out request never leaves
/// a partial write behind.
#[derive(Debug, Clone, Copy)]
pub struct Deadline {
    at: Instant,
}

impl Deadline {
    pub fn after(timeout: Duration) -> Self {
        Self {
            at: Instant::now() + timeout,
        }
    }

    pub fn remaining(&self) -> Duration {
        self.at.saturating_duration_since(Instant::now())
    }

    pub fn is_expired(&self) -> bool {
        Instant::now() >= self.at
    }
}

/// Handle to the on-disk database shared by all request workers.
///
/// Holds no connection itself: each worker opens its own through
/// [`Store::connect`], so several service instances can point at the
/// same file and rely on SQLite locking alone.
#[derive(Debug, Clone)]
pub struct Store {
    path: PathBuf,
    timeout: Duration,
}

impl Store {
    /// Open (or create) the database at `path`, run migrations, and remember
    /// the default per-operation timeout.
    pub fn open(path: impl Into<PathBuf>, timeout: Duration) -> Result<Self, DatabaseError> {
        let path = path.into();
        open_database(&path)?;
        tracing::info!(path = %path.display(), "Database ready");
        Ok(Self { path, timeout })
    }

    /// Deadline using the configured default timeout.
    pub fn deadline(&self) -> Deadline {
        Deadline::after(self.timeout)
    }

    /// Open a connection bound to `deadline`.
    pub fn connect(&self, deadline: Deadline) -> Result<Connection, DatabaseError> {
        let conn = Connection::open(&self.path)?;
        bind_deadline(&conn, deadline)?;
        configure_pragmas(&conn)?;
        Ok(conn)
    }
}

/// Open a SQLite connection to the given path and run migrations
pub fn open_database(path: &Path) -> Result<Connection, DatabaseError> {
    let conn = Connection::open(path)?;
    conn.execute_batch("PRAGMA journal_mode=WAL;")?;
    configure_pragmas(&conn)?;
    run_migrations(&conn)?;
    Ok(conn)
}

/// Open an in-memory database (for testing)
pub fn open_memory_database() -> Result<Connection, DatabaseError> {
    let conn = Connection::open_in_memory()?;
    configure_pragmas(&conn)?;
    run_migrations(&conn)?;
    Ok(conn)
}

fn configure_pragmas(conn: &Connection) -> Result<(), DatabaseError> {
    conn.execute_batch("PRAGMA foreign_keys=ON;")?;
    Ok(())
}

/// Make lock waits and running statements give up once `deadline` passes.
pub fn bind_deadline(conn: &Connection, deadline: Deadline) -> Result<(), DatabaseError> {
    if deadline.is_expired() {
        return Err(DatabaseError::Timeout);
    }
    conn.busy_timeout(deadline.remaining())?;
    conn.progress_handler(DEADLINE_CHECK_INTERVAL, Some(move || deadline.is_expired()));
    Ok(())
}

/// Run all pending migrations
pub fn run_migrations(conn: &Connection) -> Result<(), DatabaseError> {
    let current_version = get_current_version(conn);

    let migrations: Vec<(i64, &str)> = vec![
        (1, include_str!("../../resources/migrations/001_patients_accounts.sql")),
        (2, include_str!("../../resources/migrations/002_screening.sql")),
        (3, include_str!("../../resources/migrations/003_medical_records.sql")),
    ];

    for (version, sql) in migrations {
        if version > current_version {
            tracing::info!("Running migration v{version}");
            conn.execute_batch(sql).map_err(|e| DatabaseError::MigrationFailed {
                version,
                reason: e.to_string(),
            })?;
        }
    }

    Ok(())
}

/// Get the current schema version (0 if no schema exists yet)
fn get_current_version(conn: &Connection) -> i64 {
    conn.query_row(
        "SELECT MAX(version) FROM schema_version",
        [],
        |row| row.get::<_, i64>(0),
    )
    .unwrap_or(0)
}

/// Count tables in the database (for verification)
pub fn count_tables(conn: &Connection) -> Result<i64, DatabaseError> {
    let count = conn.query_row(
        "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name NOT LIKE 'sqlite_%'",
        [],
        |row| row.get::<_, i64>(0),
    )?;
    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn database_initializes_all_tables() {
        let conn = open_memory_database().unwrap();
        // schema_version + patients + accounts + counters + 3 screening + medical_records
        let count = count_tables(&conn).unwrap();
        assert_eq!(count, 8, "Expected 8 tables, got {count}");
    }

    #[test]
    fn schema_version_is_current() {
        let conn = open_memory_database().unwrap();
        let version: i64 = conn
            .query_row("SELECT MAX(version) FROM schema_version", [], |row| row.get(0))
            .unwrap();
        assert_eq!(version, 3);
    }

    #[test]
    fn migration_idempotent() {
        let conn = open_memory_database().unwrap();
        let result = run_migrations(&conn);
        assert!(result.is_ok());
    }

    #[test]
    fn foreign_keys_enabled() {
        let conn = open_memory_database().unwrap();
        let fk: i64 = conn
            .query_row("PRAGMA foreign_keys", [], |row| row.get(0))
            .unwrap();
        assert_eq!(fk, 1);
    }

    #[test]
    fn store_reopens_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("clinic.db");
        Store::open(&path, Duration::from_secs(5)).unwrap();
        let store = Store::open(&path, Duration::from_secs(5)).unwrap();

        let conn = store.connect(store.deadline()).unwrap();
        assert_eq!(count_tables(&conn).unwrap(), 8);
    }

    #[test]
    fn store_connections_use_wal() {
        let dir = tempfile::tempdir().unwrap();
        let store = Store::open(dir.path().join("clinic.db"), Duration::from_secs(5)).unwrap();
        let conn = store.connect(store.deadline()).unwrap();
        let mode: String = conn
            .query_row("PRAGMA journal_mode", [], |row| row.get(0))
            .unwrap();
        assert_eq!(mode, "wal");
    }

    #[test]
    fn expired_deadline_refuses_connection() {
        let dir = tempfile::tempdir().unwrap();
        let store = Store::open(dir.path().join("clinic.db"), Duration::from_secs(5)).unwrap();
        let result = store.connect(Deadline::after(Duration::ZERO));
        assert!(matches!(result, Err(DatabaseError::Timeout)));
    }

    #[test]
    fn deadline_interrupts_long_running_statement() {
        let conn = open_memory_database().unwrap();
        bind_deadline(&conn, Deadline::after(Duration::from_millis(50))).unwrap();

        let result = conn.query_row(
            "WITH RECURSIVE n(x) AS (SELECT 1 UNION ALL SELECT x + 1 FROM n)
             SELECT COUNT(*) FROM n",
            [],
            |row| row.get::<_, i64>(0),
        );

        let err = DatabaseError::from(result.unwrap_err());
        assert!(err.is_timeout(), "expected interrupt, got {err}");
    }

    #[test]
    fn interrupted_transaction_leaves_no_rows() {
        let conn = open_memory_database().unwrap();
        bind_deadline(&conn, Deadline::after(Duration::from_millis(50))).unwrap();

        let result: Result<(), DatabaseError> = (|| {
            let tx = rusqlite::Transaction::new_unchecked(
                &conn,
                rusqlite::TransactionBehavior::Immediate,
            )?;
            tx.execute("INSERT INTO counters (name, seq) VALUES ('scratch', 1)", [])?;
            tx.query_row(
                "WITH RECURSIVE n(x) AS (SELECT 1 UNION ALL SELECT x + 1 FROM n)
                 SELECT COUNT(*) FROM n",
                [],
                |row| row.get::<_, i64>(0),
            )?;
            tx.commit()?;
            Ok(())
        })();
        assert!(result.unwrap_err().is_timeout());

        conn.progress_handler(DEADLINE_CHECK_INTERVAL, None::<fn() -> bool>);
        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM counters", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, 0);
    }
}
