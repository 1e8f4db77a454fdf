//! In-process object store.

use super::{
    CreateOutcome, DeleteOutcome, ObjectStore, StoreError, StoreResult, UpdateOutcome,
    VersionedObject,
};
use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};

/// `ObjectStore` kept in a locked ordered map.
///
/// Provides the same conditional semantics as the SQLite backend, without
/// durability.
#[derive(Debug, Default)]
pub struct MemoryObjectStore {
    objects: Mutex<BTreeMap<String, VersionedObject>>,
}

impl MemoryObjectStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.lock().map(|objects| objects.len()).unwrap_or_default()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> StoreResult<MutexGuard<'_, BTreeMap<String, VersionedObject>>> {
        self.objects.lock().map_err(|_| StoreError::Poisoned)
    }
}

impl ObjectStore for MemoryObjectStore {
    fn create(&self, key: &str, value: &str) -> StoreResult<CreateOutcome> {
        let mut objects = self.lock()?;
        if objects.contains_key(key) {
            return Ok(CreateOutcome::AlreadyExists);
        }
        objects.insert(
            key.to_string(),
            VersionedObject {
                value: value.to_string(),
                version: 1,
            },
        );
        Ok(CreateOutcome::Created { version: 1 })
    }

    fn get(&self, key: &str) -> StoreResult<Option<VersionedObject>> {
        Ok(self.lock()?.get(key).cloned())
    }

    fn update(&self, key: &str, expected_version: u64, value: &str) -> StoreResult<UpdateOutcome> {
        let mut objects = self.lock()?;
        let Some(current) = objects.get_mut(key) else {
            return Ok(UpdateOutcome::NotFound);
        };
        if current.version != expected_version {
            return Ok(UpdateOutcome::VersionConflict {
                current_version: current.version,
            });
        }
        current.version += 1;
        current.value = value.to_string();
        Ok(UpdateOutcome::Updated {
            version: current.version,
        })
    }

    fn delete(&self, key: &str) -> StoreResult<DeleteOutcome> {
        match self.lock()?.remove(key) {
            Some(_) => Ok(DeleteOutcome::Deleted),
            None => Ok(DeleteOutcome::NotFound),
        }
    }

    fn list(&self, prefix: &str) -> StoreResult<Vec<(String, VersionedObject)>> {
        let objects = self.lock()?;
        Ok(objects
            .range(prefix.to_string()..)
            .take_while(|(key, _)| key.starts_with(prefix))
            .map(|(key, object)| (key.clone(), object.clone()))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::MemoryObjectStore;
    use crate::storage::{CreateOutcome, DeleteOutcome, ObjectStore, UpdateOutcome};

    #[test]
    fn create_never_overwrites() {
        let store = MemoryObjectStore::new();
        assert_eq!(
            store.create("k", "a").unwrap(),
            CreateOutcome::Created { version: 1 }
        );
        assert_eq!(store.create("k", "b").unwrap(), CreateOutcome::AlreadyExists);
        assert_eq!(store.get("k").unwrap().unwrap().value, "a");
    }

    #[test]
    fn update_checks_version() {
        let store = MemoryObjectStore::new();
        store.create("k", "a").unwrap();

        assert_eq!(
            store.update("k", 1, "b").unwrap(),
            UpdateOutcome::Updated { version: 2 }
        );
        assert_eq!(
            store.update("k", 1, "c").unwrap(),
            UpdateOutcome::VersionConflict { current_version: 2 }
        );
        assert_eq!(store.update("missing", 1, "c").unwrap(), UpdateOutcome::NotFound);
        assert_eq!(store.get("k").unwrap().unwrap().value, "b");
    }

    #[test]
    fn list_is_prefix_bounded() {
        let store = MemoryObjectStore::new();
        store.create("images/a/1", "x").unwrap();
        store.create("images/b/1", "y").unwrap();
        store.create("imagesx/a/1", "z").unwrap();

        let listed = store.list("images/a/").unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].0, "images/a/1");
        assert_eq!(store.delete("images/a/1").unwrap(), DeleteOutcome::Deleted);
        assert_eq!(store.delete("images/a/1").unwrap(), DeleteOutcome::NotFound);
        assert_eq!(store.len(), 2);
    }
}
