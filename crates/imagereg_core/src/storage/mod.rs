//! Versioned key-value object store seam.
//!
//! # Responsibility
//! - Define the conditional primitives the registry builds on.
//! - Classify infrastructure failures separately from business outcomes.
//!
//! # Invariants
//! - `create` never overwrites: at most one caller wins per key.
//! - `update` only succeeds when `expected_version` still matches.
//! - Versions start at 1 and increase by exactly 1 per successful update.
//! - Expected outcomes (`AlreadyExists`, `VersionConflict`, `NotFound`) are
//!   returned as values; `StoreError` is reserved for infrastructure faults.

use crate::db::DbError;
use std::error::Error;
use std::fmt::{Display, Formatter};

mod memory;
mod sqlite;

pub use memory::MemoryObjectStore;
pub use sqlite::SqliteObjectStore;

pub type StoreResult<T> = Result<T, StoreError>;

/// Stored document together with its current version.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionedObject {
    pub value: String,
    pub version: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CreateOutcome {
    Created { version: u64 },
    AlreadyExists,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateOutcome {
    Updated { version: u64 },
    VersionConflict { current_version: u64 },
    NotFound,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteOutcome {
    Deleted,
    NotFound,
}

/// Infrastructure failure raised by an object store backend.
#[derive(Debug)]
pub enum StoreError {
    /// SQLite backend failure.
    Db(DbError),
    /// A writer panicked while holding the store lock.
    Poisoned,
    /// Backend is temporarily unreachable.
    Unavailable(String),
}

impl StoreError {
    /// Whether retrying can never succeed without operator action.
    pub fn is_fatal(&self) -> bool {
        match self {
            Self::Db(err) => err.is_fatal(),
            Self::Poisoned => true,
            Self::Unavailable(_) => false,
        }
    }
}

impl Display for StoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::Poisoned => write!(f, "object store lock poisoned"),
            Self::Unavailable(message) => write!(f, "object store unavailable: {message}"),
        }
    }
}

impl Error for StoreError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            Self::Poisoned => None,
            Self::Unavailable(_) => None,
        }
    }
}

impl From<DbError> for StoreError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for StoreError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Backing store of record for images and repositories.
///
/// Implementations must be safe to share across request threads; the
/// registry holds them as `Arc<dyn ObjectStore>`.
pub trait ObjectStore: Send + Sync {
    /// Stores `value` under `key` only when the key is absent.
    fn create(&self, key: &str, value: &str) -> StoreResult<CreateOutcome>;
    /// Reads the current value and version.
    fn get(&self, key: &str) -> StoreResult<Option<VersionedObject>>;
    /// Replaces `value` only when the stored version equals `expected_version`.
    fn update(&self, key: &str, expected_version: u64, value: &str) -> StoreResult<UpdateOutcome>;
    fn delete(&self, key: &str) -> StoreResult<DeleteOutcome>;
    /// Lists every object whose key starts with `prefix`, ordered by key.
    fn list(&self, prefix: &str) -> StoreResult<Vec<(String, VersionedObject)>>;
}
