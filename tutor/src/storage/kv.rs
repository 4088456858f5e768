//! Key-value store trait, typed helpers and an in-memory store for tests.

#[cfg(test)]
use std::collections::HashMap;

use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;

/// Error type for key-value store operations.
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[allow(dead_code)]
    #[error("Write rejected: {0}")]
    WriteRejected(String),
}

/// A synchronous string-keyed store that survives restarts.
pub trait KeyValueStore {
    /// Read the raw value stored under `key`.
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// Store `value` under `key`, replacing any previous value.
    fn set(&mut self, key: &str, value: &str) -> Result<(), StorageError>;
}

/// Read and decode the value under `key`, falling back to `default`.
///
/// Missing keys, read failures and undecodable values all yield the default;
/// failures are logged, not surfaced.
pub fn load_or<T, S>(store: &S, key: &str, default: T) -> T
where
    T: DeserializeOwned,
    S: KeyValueStore + ?Sized,
{
    match store.get(key) {
        Ok(Some(raw)) => match serde_json::from_str(&raw) {
            Ok(value) => value,
            Err(e) => {
                tracing::warn!(key, error = %e, "Stored value is corrupt, using default");
                default
            }
        },
        Ok(None) => default,
        Err(e) => {
            tracing::warn!(key, error = %e, "Failed to read from storage, using default");
            default
        }
    }
}

/// Encode and write `value` under `key`. Returns whether the write succeeded.
///
/// Failed writes are logged and dropped.
pub fn save<T, S>(store: &mut S, key: &str, value: &T) -> bool
where
    T: Serialize + ?Sized,
    S: KeyValueStore + ?Sized,
{
    let result = serde_json::to_string(value)
        .map_err(StorageError::from)
        .and_then(|raw| store.set(key, &raw));

    match result {
        Ok(()) => true,
        Err(e) => {
            tracing::warn!(key, error = %e, "Failed to write to storage");
            false
        }
    }
}

/// In-memory store for tests.
#[cfg(test)]
#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    values: HashMap<String, String>,
    reject_writes: bool,
}

#[cfg(test)]
impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store whose writes always fail (quota exceeded, read-only media...).
    pub fn failing_writes() -> Self {
        Self {
            values: HashMap::new(),
            reject_writes: true,
        }
    }

    /// Seed a raw value, bypassing `reject_writes`.
    #[must_use]
    pub fn with_raw(mut self, key: &str, value: &str) -> Self {
        self.values.insert(key.to_string(), value.to_string());
        self
    }

    pub fn raw(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }
}

#[cfg(test)]
impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.values.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StorageError> {
        if self.reject_writes {
            return Err(StorageError::WriteRejected(key.to_string()));
        }
        self.values.insert(key.to_string(), value.to_string());
        Ok(())
    }
}
