//! SQLite connection shared by the repositories.

use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

use rusqlite::Connection;

use super::error::StoreError;

const SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS users (
        id            INTEGER PRIMARY KEY AUTOINCREMENT,
        login         TEXT NOT NULL UNIQUE,
        password_hash TEXT NOT NULL
    );

    CREATE TABLE IF NOT EXISTS secrets (
        id          INTEGER PRIMARY KEY AUTOINCREMENT,
        user_id     INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
        data_type   TEXT NOT NULL,
        name        TEXT NOT NULL,
        payload     BLOB NOT NULL,
        metadata    BLOB NOT NULL,
        created_at  TEXT NOT NULL,
        UNIQUE (user_id, data_type, name)
    );
";

/// Handle to the store. Cheap to clone; all clones share one connection.
#[derive(Clone)]
pub struct Database {
    conn: Arc<Mutex<Connection>>,
}

impl Database {
    /// Open (or create) the database at `location` and apply the schema.
    ///
    /// `:memory:` opens a private in-memory store.
    pub fn open(location: &str) -> Result<Self, StoreError> {
        let conn = if location == ":memory:" {
            Connection::open_in_memory()?
        } else {
            Connection::open(Path::new(location))?
        };
        Self::with_connection(conn)
    }

    pub fn open_in_memory() -> Result<Self, StoreError> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> Result<Self, StoreError> {
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub(crate) fn lock(&self) -> Result<MutexGuard<'_, Connection>, StoreError> {
        self.conn.lock().map_err(|_| StoreError::Poisoned)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn open_creates_schema_on_disk() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("keeper.db");
        let db = Database::open(path.to_str().unwrap()).unwrap();

        let conn = db.lock().unwrap();
        let tables: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name IN ('users', 'secrets')",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(tables, 2);
    }

    #[test]
    fn reopening_keeps_existing_schema() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("keeper.db");
        drop(Database::open(path.to_str().unwrap()).unwrap());
        assert!(Database::open(path.to_str().unwrap()).is_ok());
    }
}
