// ── In-memory storage adapter ──

use dashmap::{DashMap, DashSet};

use super::{Storage, StorageError, StorageKey};

/// Storage kept in process memory. Used by tests and dry runs.
///
/// Individual keys can be made to fail on save to exercise the engine's
/// persistence-failure path.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    values: DashMap<StorageKey, String>,
    failing: DashSet<StorageKey>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a raw value, e.g. a legacy payload.
    pub fn with_value(self, key: StorageKey, value: impl Into<String>) -> Self {
        self.values.insert(key, value.into());
        self
    }

    /// Make every subsequent save of `key` fail until [`recover`](Self::recover).
    pub fn fail_saves(&self, key: StorageKey) {
        self.failing.insert(key);
    }

    pub fn recover(&self, key: StorageKey) {
        self.failing.remove(&key);
    }

    /// Current raw value for `key`.
    pub fn raw(&self, key: StorageKey) -> Option<String> {
        self.values.get(&key).map(|v| v.value().clone())
    }
}

impl Storage for MemoryStorage {
    fn load(&self, key: StorageKey) -> Result<Option<String>, StorageError> {
        Ok(self.raw(key))
    }

    fn save(&self, key: StorageKey, value: &str) -> Result<(), StorageError> {
        if self.failing.contains(&key) {
            return Err(StorageError::Rejected(format!("{key} is read-only")));
        }
        self.values.insert(key, value.to_owned());
        Ok(())
    }
}
