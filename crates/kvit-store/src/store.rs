//! SQLite-backed entity store.
//!
//! One table holds every entity: the path-like key, the kind
//! discriminant, the encoded value and an optional expiry. Reads verify
//! the kind against the requested entity type and treat expired rows as
//! absent. The connection sits behind a mutex; each call is one
//! transaction, so concurrent workers can share a cloned handle.

use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};
use tracing::debug;

use crate::entities::{Entity, EntityKind};
use crate::error::{Result, StoreError};
use crate::keys::Key;

const SCHEMA: &str = r"
CREATE TABLE IF NOT EXISTS entities (
    key        BLOB PRIMARY KEY,
    kind       INTEGER NOT NULL,
    value      BLOB NOT NULL,
    expires_at INTEGER
);
";

/// A prepared write: key, kind and value already encoded.
///
/// Prepared entries let several entities go into one transaction, which
/// is how a receipt and its image stay consistent.
pub struct Entry {
    key: Vec<u8>,
    kind: EntityKind,
    value: Vec<u8>,
    expires_at: Option<i64>,
}

impl Entry {
    pub fn new<E: Entity, K: Key>(key: &K, entity: &E) -> Result<Self> {
        Ok(Self {
            key: key.encode()?,
            kind: E::KIND,
            value: entity.to_bytes()?,
            expires_at: entity.ttl().map(expiry_from_now),
        })
    }
}

fn expiry_from_now(ttl: Duration) -> i64 {
    Utc::now().timestamp() + ttl.as_secs() as i64
}

/// Shared handle to the entity database.
#[derive(Clone)]
pub struct Store {
    conn: Arc<Mutex<Connection>>,
}

impl Store {
    /// Open (or create) the database at `path`.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Self::from_connection(Connection::open(path)?)
    }

    /// Open a private in-memory database. Intended for tests.
    pub fn in_memory() -> Result<Self> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> Result<Self> {
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.pragma_update(None, "synchronous", "NORMAL")?;
        conn.pragma_update(None, "busy_timeout", 5000)?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| StoreError::Lock)
    }

    /// Write one entity under `key`.
    pub fn set<E: Entity, K: Key>(&self, key: &K, entity: &E) -> Result<()> {
        self.set_all(vec![Entry::new(key, entity)?])
    }

    /// Write several entities in one transaction: either all land or
    /// none do.
    pub fn set_all(&self, entries: Vec<Entry>) -> Result<()> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        for entry in &entries {
            tx.execute(
                "INSERT OR REPLACE INTO entities (key, kind, value, expires_at)
                 VALUES (?1, ?2, ?3, ?4)",
                params![entry.key, entry.kind as u8, entry.value, entry.expires_at],
            )?;
        }
        tx.commit()?;
        debug!(entries = entries.len(), "entities written");
        Ok(())
    }

    /// Read the entity at `key`, verifying its kind.
    ///
    /// Expired rows behave exactly like missing ones.
    pub fn get<E: Entity, K: Key>(&self, key: &K) -> Result<E> {
        let raw_key = key.encode()?;
        let conn = self.lock()?;
        let row: Option<(u8, Vec<u8>, Option<i64>)> = conn
            .query_row(
                "SELECT kind, value, expires_at FROM entities WHERE key = ?1",
                params![raw_key],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
            )
            .optional()?;

        let (kind, value, expires_at) = row.ok_or(StoreError::NotFound)?;
        if is_expired(expires_at) {
            return Err(StoreError::NotFound);
        }
        if kind != E::KIND as u8 {
            return Err(StoreError::TypeMismatch {
                expected: E::KIND.name(),
                found: kind,
            });
        }
        E::from_bytes(&value)
    }

    /// Delete the entity at `key`. Deleting an absent key is not an
    /// error.
    pub fn delete<K: Key>(&self, key: &K) -> Result<()> {
        let raw_key = key.encode()?;
        self.lock()?
            .execute("DELETE FROM entities WHERE key = ?1", params![raw_key])?;
        Ok(())
    }

    /// Delete every entity whose key starts with `prefix`.
    pub fn delete_prefix(&self, prefix: &[u8]) -> Result<usize> {
        let end = crate::keys::prefix_end(prefix);
        let n = self.lock()?.execute(
            "DELETE FROM entities WHERE key >= ?1 AND key < ?2",
            params![prefix, end],
        )?;
        debug!(deleted = n, "prefix purged");
        Ok(n)
    }

    /// Ordered scan over every live entity under `prefix`, optionally in
    /// reverse key order.
    pub fn scan_prefix(
        &self,
        prefix: &[u8],
        reverse: bool,
    ) -> Result<Vec<(Vec<u8>, EntityKind, Vec<u8>)>> {
        let end = crate::keys::prefix_end(prefix);
        let sql = if reverse {
            "SELECT key, kind, value, expires_at FROM entities
             WHERE key >= ?1 AND key < ?2 ORDER BY key DESC"
        } else {
            "SELECT key, kind, value, expires_at FROM entities
             WHERE key >= ?1 AND key < ?2 ORDER BY key ASC"
        };

        let conn = self.lock()?;
        let mut stmt = conn.prepare(sql)?;
        let rows = stmt.query_map(params![prefix, end], |row| {
            Ok((
                row.get::<_, Vec<u8>>(0)?,
                row.get::<_, u8>(1)?,
                row.get::<_, Vec<u8>>(2)?,
                row.get::<_, Option<i64>>(3)?,
            ))
        })?;

        let mut out = Vec::new();
        for row in rows {
            let (key, kind, value, expires_at) = row?;
            if is_expired(expires_at) {
                continue;
            }
            let kind = EntityKind::from_u8(kind).unwrap_or(EntityKind::Unknown);
            out.push((key, kind, value));
        }
        Ok(out)
    }
}

fn is_expired(expires_at: Option<i64>) -> bool {
    matches!(expires_at, Some(t) if t <= Utc::now().timestamp())
}
