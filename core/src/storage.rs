//! Synchronous key-value persistence for client-side convenience state.
//!
//! Everything stored here is non-critical: unreadable values load as the
//! type's default and failed writes are logged and dropped.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;
use tracing::warn;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("storage is not available")]
    Unavailable,

    #[error("storage rejected the write: {0}")]
    WriteRejected(String),

    #[error("value could not be serialized: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// String-keyed storage with string values, like the browser's `localStorage`.
pub trait KeyValueStorage {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;
    fn remove(&self, key: &str);
}

/// Reads `key` as JSON, falling back to `T::default()` when the key is
/// missing or its content does not parse.
pub fn load_json<T, S>(storage: &S, key: &str) -> T
where
    T: DeserializeOwned + Default,
    S: KeyValueStorage + ?Sized,
{
    let Some(raw) = storage.get(key) else {
        return T::default();
    };
    serde_json::from_str(&raw).unwrap_or_else(|err| {
        warn!("discarding unreadable value under '{key}': {err}");
        T::default()
    })
}

/// Writes `value` as JSON under `key`. Errors are logged, never returned.
pub fn save_json<T, S>(storage: &S, key: &str, value: &T)
where
    T: Serialize + ?Sized,
    S: KeyValueStorage + ?Sized,
{
    let result = serde_json::to_string(value)
        .map_err(StorageError::from)
        .and_then(|json| storage.set(key, &json));
    if let Err(err) = result {
        warn!("failed to persist '{key}': {err}");
    }
}

/// In-process storage. Clones share the same underlying map, which lets a
/// test "reload" a store from what a previous instance wrote.
#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    entries: Arc<Mutex<HashMap<String, String>>>,
    reject_writes: Arc<AtomicBool>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every subsequent `set` fail, as a full quota would.
    pub fn reject_writes(&self, reject: bool) {
        self.reject_writes.store(reject, Ordering::SeqCst);
    }

    pub fn len(&self) -> usize {
        self.entries.lock().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl KeyValueStorage for MemoryStorage {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.lock().ok()?.get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        if self.reject_writes.load(Ordering::SeqCst) {
            return Err(StorageError::WriteRejected("quota exceeded".to_string()));
        }
        let mut entries = self.entries.lock().map_err(|_| StorageError::Unavailable)?;
        entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.remove(key);
        }
    }
}
