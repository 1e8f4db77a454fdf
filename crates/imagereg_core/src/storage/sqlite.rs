//! SQLite-backed object store.
//!
//! # Invariants
//! - All statements run under one connection lock, so the existence check
//!   that follows a failed conditional update observes the same state.
//! - Keys are compared byte-wise; prefix listing never uses `LIKE`, so `%`
//!   and `_` in keys carry no special meaning.

use super::{
    CreateOutcome, DeleteOutcome, ObjectStore, StoreError, StoreResult, UpdateOutcome,
    VersionedObject,
};
use crate::db::migrations::apply_migrations;
use crate::db::{open_db, open_db_in_memory};
use log::debug;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

/// `ObjectStore` persisted in the `objects` table.
pub struct SqliteObjectStore {
    conn: Mutex<Connection>,
}

impl SqliteObjectStore {
    /// Opens (or creates) a database file and applies migrations.
    pub fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        Ok(Self::wrap(open_db(path)?))
    }

    /// Opens a private in-memory database.
    pub fn open_in_memory() -> StoreResult<Self> {
        Ok(Self::wrap(open_db_in_memory()?))
    }

    /// Adopts an existing connection, applying any pending migrations.
    pub fn from_connection(mut conn: Connection) -> StoreResult<Self> {
        apply_migrations(&mut conn)?;
        Ok(Self::wrap(conn))
    }

    fn wrap(conn: Connection) -> Self {
        Self {
            conn: Mutex::new(conn),
        }
    }

    fn lock(&self) -> StoreResult<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| StoreError::Poisoned)
    }
}

impl ObjectStore for SqliteObjectStore {
    fn create(&self, key: &str, value: &str) -> StoreResult<CreateOutcome> {
        let conn = self.lock()?;
        let changed = conn.execute(
            "INSERT INTO objects (key, value, version)
             VALUES (?1, ?2, 1)
             ON CONFLICT(key) DO NOTHING;",
            params![key, value],
        )?;

        if changed == 0 {
            return Ok(CreateOutcome::AlreadyExists);
        }
        Ok(CreateOutcome::Created { version: 1 })
    }

    fn get(&self, key: &str) -> StoreResult<Option<VersionedObject>> {
        let conn = self.lock()?;
        let object = conn
            .query_row(
                "SELECT value, version FROM objects WHERE key = ?1;",
                [key],
                |row| {
                    Ok(VersionedObject {
                        value: row.get(0)?,
                        version: row.get::<_, i64>(1)? as u64,
                    })
                },
            )
            .optional()?;
        Ok(object)
    }

    fn update(&self, key: &str, expected_version: u64, value: &str) -> StoreResult<UpdateOutcome> {
        let conn = self.lock()?;
        let changed = conn.execute(
            "UPDATE objects
             SET
                value = ?3,
                version = version + 1,
                updated_at = (strftime('%s', 'now') * 1000)
             WHERE key = ?1
               AND version = ?2;",
            params![key, expected_version as i64, value],
        )?;

        if changed == 1 {
            return Ok(UpdateOutcome::Updated {
                version: expected_version + 1,
            });
        }

        let current: Option<i64> = conn
            .query_row("SELECT version FROM objects WHERE key = ?1;", [key], |row| {
                row.get(0)
            })
            .optional()?;
        match current {
            Some(current_version) => {
                debug!(
                    "event=object_update module=storage status=conflict key={} expected_version={} current_version={}",
                    key, expected_version, current_version
                );
                Ok(UpdateOutcome::VersionConflict {
                    current_version: current_version as u64,
                })
            }
            None => Ok(UpdateOutcome::NotFound),
        }
    }

    fn delete(&self, key: &str) -> StoreResult<DeleteOutcome> {
        let conn = self.lock()?;
        let changed = conn.execute("DELETE FROM objects WHERE key = ?1;", [key])?;
        if changed == 0 {
            return Ok(DeleteOutcome::NotFound);
        }
        Ok(DeleteOutcome::Deleted)
    }

    fn list(&self, prefix: &str) -> StoreResult<Vec<(String, VersionedObject)>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT key, value, version
             FROM objects
             WHERE substr(key, 1, length(?1)) = ?1
             ORDER BY key ASC;",
        )?;
        let mut rows = stmt.query([prefix])?;
        let mut objects = Vec::new();
        while let Some(row) = rows.next()? {
            let key: String = row.get(0)?;
            objects.push((
                key,
                VersionedObject {
                    value: row.get(1)?,
                    version: row.get::<_, i64>(2)? as u64,
                },
            ));
        }
        Ok(objects)
    }
}
