pub mod repository;
pub mod sqlite;

pub use repository::*;
pub use sqlite::*;

use std::path::Path;
use std::sync::Mutex;

use rusqlite::Connection;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DatabaseError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Entity not found: {entity_type} with id {id}")]
    NotFound { entity_type: String, id: String },

    #[error("Invalid enum value for {field}: {value}")]
    InvalidEnum { field: String, value: String },

    #[error("Migration failed at version {version}: {reason}")]
    MigrationFailed { version: i64, reason: String },

    #[error("Constraint violated: {0}")]
    ConstraintViolation(String),

    #[error("Stored value could not be decoded: {0}")]
    Corrupt(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Database connection lock poisoned")]
    LockPoisoned,

    #[error("Database handle is closed")]
    Closed,
}

/// Owned database handle.
///
/// Opened once at process start, shared through `CoreState`, and closed
/// explicitly at shutdown. Calls are serialized on the inner connection.
/// Handlers make short single-statement calls inline; the analysis run,
/// which holds the connection only for its final insert, runs on a
/// blocking thread.
pub struct Database {
    conn: Mutex<Option<Connection>>,
}

impl Database {
    /// Open (or create) the database file and run migrations.
    pub fn open(path: &Path) -> Result<Self, DatabaseError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        Ok(Self::from_connection(open_database(path)?))
    }

    /// In-memory database with the full schema (for testing).
    pub fn open_in_memory() -> Result<Self, DatabaseError> {
        Ok(Self::from_connection(open_memory_database()?))
    }

    pub fn from_connection(conn: Connection) -> Self {
        Self {
            conn: Mutex::new(Some(conn)),
        }
    }

    /// Run `f` with exclusive access to the connection.
    pub fn with_conn<T>(
        &self,
        f: impl FnOnce(&Connection) -> Result<T, DatabaseError>,
    ) -> Result<T, DatabaseError> {
        let guard = self.conn.lock().map_err(|_| DatabaseError::LockPoisoned)?;
        let conn = guard.as_ref().ok_or(DatabaseError::Closed)?;
        f(conn)
    }

    /// Cheap liveness probe for diagnostics.
    pub fn ping(&self) -> bool {
        self.with_conn(|conn| Ok(conn.query_row("SELECT 1", [], |row| row.get::<_, i64>(0))?))
            .is_ok()
    }

    /// Close the connection. Later calls fail with `DatabaseError::Closed`.
    /// Closing twice is a no-op.
    pub fn close(&self) -> Result<(), DatabaseError> {
        let mut guard = self.conn.lock().map_err(|_| DatabaseError::LockPoisoned)?;
        if let Some(conn) = guard.take() {
            conn.close().map_err(|(_, e)| DatabaseError::Sqlite(e))?;
            tracing::info!("Database connection closed");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn handle_pings_while_open() {
        let db = Database::open_in_memory().unwrap();
        assert!(db.ping());
    }

    #[test]
    fn closed_handle_rejects_calls() {
        let db = Database::open_in_memory().unwrap();
        db.close().unwrap();
        assert!(!db.ping());
        let err = db.with_conn(|_| Ok(())).unwrap_err();
        assert!(matches!(err, DatabaseError::Closed));
    }

    #[test]
    fn close_is_idempotent() {
        let db = Database::open_in_memory().unwrap();
        db.close().unwrap();
        db.close().unwrap();
    }

    #[test]
    fn open_creates_parent_directory() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("nested").join("medscan.db");
        let db = Database::open(&path).unwrap();
        assert!(db.ping());
        assert!(path.exists());
    }
}
