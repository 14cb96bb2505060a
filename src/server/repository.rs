//! Repositories over the SQLite store.
//!
//! Secret queries are always scoped by the owning user id; there is no
//! query that reaches another user's rows.

use chrono::{DateTime, Utc};
use rusqlite::types::Type;
use rusqlite::{params, OptionalExtension};

use super::db::Database;
use super::error::StoreError;
use crate::secret::{Secret, SecretKind};

/// A secret about to be inserted.
#[derive(Debug, Clone)]
pub struct NewSecret {
    pub owner: i64,
    pub kind: SecretKind,
    pub name: String,
    pub payload: Vec<u8>,
    pub metadata: Vec<u8>,
}

/// A registered principal.
#[derive(Debug, Clone)]
pub struct UserRecord {
    pub id: i64,
    pub login: String,
    pub password_hash: String,
}

// ---------------------------------------------------------------------------
// Secrets
// ---------------------------------------------------------------------------

#[derive(Clone)]
pub struct SecretRepository {
    db: Database,
}

impl SecretRepository {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Insert a secret, failing with `AlreadyExists` if the
    /// (owner, type, name) key is taken.
    ///
    /// The lookup inside the transaction short-circuits the common case;
    /// the unique index decides races.
    pub fn create(&self, secret: &NewSecret) -> Result<DateTime<Utc>, StoreError> {
        let mut conn = self.db.lock()?;
        let tx = conn.transaction()?;

        let exists: bool = tx.query_row(
            "SELECT EXISTS(
                SELECT 1 FROM secrets WHERE user_id = ?1 AND data_type = ?2 AND name = ?3
             )",
            params![secret.owner, secret.kind.as_str(), secret.name],
            |row| row.get(0),
        )?;
        if exists {
            return Err(StoreError::AlreadyExists);
        }

        let created_at = Utc::now();
        tx.execute(
            "INSERT INTO secrets (user_id, data_type, name, payload, metadata, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                secret.owner,
                secret.kind.as_str(),
                secret.name,
                secret.payload,
                secret.metadata,
                created_at.to_rfc3339()
            ],
        )
        .map_err(|e| {
            if is_unique_violation(&e) {
                StoreError::AlreadyExists
            } else {
                StoreError::Database(e)
            }
        })?;

        tx.commit()?;
        Ok(created_at)
    }

    pub fn get(
        &self,
        owner: i64,
        kind: SecretKind,
        name: &str,
    ) -> Result<Option<Secret>, StoreError> {
        let conn = self.db.lock()?;
        let row = conn
            .query_row(
                "SELECT payload, metadata, created_at FROM secrets
                 WHERE user_id = ?1 AND data_type = ?2 AND name = ?3",
                params![owner, kind.as_str(), name],
                |row| {
                    Ok((
                        row.get::<_, Vec<u8>>(0)?,
                        row.get::<_, Vec<u8>>(1)?,
                        parse_timestamp(2, &row.get::<_, String>(2)?)?,
                    ))
                },
            )
            .optional()?;

        Ok(row.map(|(payload, metadata, created_at)| Secret {
            owner,
            kind,
            name: name.to_string(),
            payload,
            metadata,
            created_at,
        }))
    }

    /// Replace payload and metadata. Returns the number of rows changed.
    pub fn update(
        &self,
        owner: i64,
        kind: SecretKind,
        name: &str,
        payload: &[u8],
        metadata: &[u8],
    ) -> Result<usize, StoreError> {
        let conn = self.db.lock()?;
        let changed = conn.execute(
            "UPDATE secrets SET payload = ?4, metadata = ?5
             WHERE user_id = ?1 AND data_type = ?2 AND name = ?3",
            params![owner, kind.as_str(), name, payload, metadata],
        )?;
        Ok(changed)
    }

    /// Returns the number of rows removed.
    pub fn delete(&self, owner: i64, kind: SecretKind, name: &str) -> Result<usize, StoreError> {
        let conn = self.db.lock()?;
        let removed = conn.execute(
            "DELETE FROM secrets WHERE user_id = ?1 AND data_type = ?2 AND name = ?3",
            params![owner, kind.as_str(), name],
        )?;
        Ok(removed)
    }
}

// ---------------------------------------------------------------------------
// Users
// ---------------------------------------------------------------------------

#[derive(Clone)]
pub struct UserRepository {
    db: Database,
}

impl UserRepository {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Insert a user and return its id. A taken login is `LoginTaken`.
    pub fn create(&self, login: &str, password_hash: &str) -> Result<i64, StoreError> {
        let conn = self.db.lock()?;
        conn.execute(
            "INSERT INTO users (login, password_hash) VALUES (?1, ?2)",
            params![login, password_hash],
        )
        .map_err(|e| {
            if is_unique_violation(&e) {
                StoreError::LoginTaken(login.to_string())
            } else {
                StoreError::Database(e)
            }
        })?;
        Ok(conn.last_insert_rowid())
    }

    pub fn find_by_login(&self, login: &str) -> Result<Option<UserRecord>, StoreError> {
        let conn = self.db.lock()?;
        let user = conn
            .query_row(
                "SELECT id, login, password_hash FROM users WHERE login = ?1",
                params![login],
                |row| {
                    Ok(UserRecord {
                        id: row.get(0)?,
                        login: row.get(1)?,
                        password_hash: row.get(2)?,
                    })
                },
            )
            .optional()?;
        Ok(user)
    }
}

/// Parse a stored RFC 3339 timestamp; a bad value fails the row.
fn parse_timestamp(column: usize, value: &str) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(column, Type::Text, Box::new(e)))
}

/// True for a UNIQUE or PRIMARY KEY constraint failure.
pub(crate) fn is_unique_violation(err: &rusqlite::Error) -> bool {
    match err {
        rusqlite::Error::SqliteFailure(e, _) => {
            e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
                || e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_PRIMARYKEY
        }
        _ => false,
    }
}
