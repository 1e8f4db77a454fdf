#![allow(dead_code)]

use imagereg_core::{
    CreateOutcome, DeleteOutcome, MemoryObjectStore, ObjectStore, StoreError, StoreResult,
    UpdateOutcome, VersionedObject,
};
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};

/// Store whose next `conflicts` updates lose a race against a phantom writer.
pub struct ContendedStore {
    inner: MemoryObjectStore,
    remaining_conflicts: AtomicU32,
    updates_attempted: AtomicU32,
}

impl ContendedStore {
    pub fn new(conflicts: u32) -> Self {
        Self {
            inner: MemoryObjectStore::new(),
            remaining_conflicts: AtomicU32::new(conflicts),
            updates_attempted: AtomicU32::new(0),
        }
    }

    pub fn updates_attempted(&self) -> u32 {
        self.updates_attempted.load(Ordering::SeqCst)
    }
}

impl ObjectStore for ContendedStore {
    fn create(&self, key: &str, value: &str) -> StoreResult<CreateOutcome> {
        self.inner.create(key, value)
    }

    fn get(&self, key: &str) -> StoreResult<Option<VersionedObject>> {
        self.inner.get(key)
    }

    fn update(&self, key: &str, expected_version: u64, value: &str) -> StoreResult<UpdateOutcome> {
        self.updates_attempted.fetch_add(1, Ordering::SeqCst);
        let should_conflict = self
            .remaining_conflicts
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |left| left.checked_sub(1))
            .is_ok();
        if should_conflict {
            if let Some(current) = self.inner.get(key)? {
                self.inner.update(key, current.version, &current.value)?;
            }
        }
        self.inner.update(key, expected_version, value)
    }

    fn delete(&self, key: &str) -> StoreResult<DeleteOutcome> {
        self.inner.delete(key)
    }

    fn list(&self, prefix: &str) -> StoreResult<Vec<(String, VersionedObject)>> {
        self.inner.list(prefix)
    }
}

/// Store that reports itself unavailable for creates under one key prefix.
pub struct UnavailableCreates {
    pub inner: MemoryObjectStore,
    pub prefix: &'static str,
}

impl ObjectStore for UnavailableCreates {
    fn create(&self, key: &str, value: &str) -> StoreResult<CreateOutcome> {
        if key.starts_with(self.prefix) {
            return Err(StoreError::Unavailable("injected outage".to_string()));
        }
        self.inner.create(key, value)
    }

    fn get(&self, key: &str) -> StoreResult<Option<VersionedObject>> {
        self.inner.get(key)
    }

    fn update(&self, key: &str, expected_version: u64, value: &str) -> StoreResult<UpdateOutcome> {
        self.inner.update(key, expected_version, value)
    }

    fn delete(&self, key: &str) -> StoreResult<DeleteOutcome> {
        self.inner.delete(key)
    }

    fn list(&self, prefix: &str) -> StoreResult<Vec<(String, VersionedObject)>> {
        self.inner.list(prefix)
    }
}

/// Store where a rival writer stores `rival_value` just ahead of the first
/// create, so that create reports `AlreadyExists`.
pub struct RacingCreate {
    inner: MemoryObjectStore,
    rival_value: String,
    raced: AtomicBool,
}

impl RacingCreate {
    pub fn new(rival_value: impl Into<String>) -> Self {
        Self {
            inner: MemoryObjectStore::new(),
            rival_value: rival_value.into(),
            raced: AtomicBool::new(false),
        }
    }
}

impl ObjectStore for RacingCreate {
    fn create(&self, key: &str, value: &str) -> StoreResult<CreateOutcome> {
        if !self.raced.swap(true, Ordering::SeqCst) {
            self.inner.create(key, &self.rival_value)?;
        }
        self.inner.create(key, value)
    }

    fn get(&self, key: &str) -> StoreResult<Option<VersionedObject>> {
        self.inner.get(key)
    }

    fn update(&self, key: &str, expected_version: u64, value: &str) -> StoreResult<UpdateOutcome> {
        self.inner.update(key, expected_version, value)
    }

    fn delete(&self, key: &str) -> StoreResult<DeleteOutcome> {
        self.inner.delete(key)
    }

    fn list(&self, prefix: &str) -> StoreResult<Vec<(String, VersionedObject)>> {
        self.inner.list(prefix)
    }
}
