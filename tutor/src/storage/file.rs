//! File-backed key-value store.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use super::kv::{KeyValueStore, StorageError};

/// Environment variable overriding the data directory.
pub const HOME_ENV: &str = "TUTOR_HOME";

const DATA_DIR: &str = ".tutor";
const STORAGE_FILE: &str = "storage.json";
const CORRUPT_SUFFIX: &str = "json.corrupt";

/// Key-value store persisted as a single JSON object file.
///
/// Every write rewrites the whole file; the last writer wins.
pub struct FileStore {
    path: PathBuf,
    values: BTreeMap<String, String>,
}

impl FileStore {
    /// Open or create the store at the default location (`~/.tutor/storage.json`).
    pub fn open() -> Result<Self> {
        let path = Self::default_path()?;
        Ok(Self::open_at(&path))
    }

    /// Get the default data directory, honoring `TUTOR_HOME`.
    pub fn data_dir() -> Result<PathBuf> {
        if let Ok(dir) = std::env::var(HOME_ENV) {
            if !dir.trim().is_empty() {
                return Ok(PathBuf::from(dir));
            }
        }
        Ok(dirs::home_dir()
            .context("Could not find home directory")?
            .join(DATA_DIR))
    }

    /// Get the default storage file path, creating its directory.
    pub fn default_path() -> Result<PathBuf> {
        let dir = Self::data_dir()?;
        std::fs::create_dir_all(&dir)
            .with_context(|| format!("Failed to create directory: {}", dir.display()))?;
        Ok(dir.join(STORAGE_FILE))
    }

    /// Open the store at a specific path.
    ///
    /// A missing file is an empty store. An unreadable or corrupt file is
    /// moved aside to `storage.json.corrupt` and the store starts empty.
    pub fn open_at(path: &Path) -> Self {
        let values = match read_values(path) {
            Ok(values) => values,
            Err(e) => {
                let aside = path.with_extension(CORRUPT_SUFFIX);
                tracing::warn!(
                    path = %path.display(),
                    moved_to = %aside.display(),
                    error = %e,
                    "Storage file is unusable, starting empty"
                );
                if let Err(e) = std::fs::rename(path, &aside) {
                    tracing::warn!(error = %e, "Failed to move corrupt storage file aside");
                }
                BTreeMap::new()
            }
        };

        tracing::debug!(path = %path.display(), keys = values.len(), "Opened storage");
        Self {
            path: path.to_path_buf(),
            values,
        }
    }

    /// Path of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn flush(&self) -> Result<(), StorageError> {
        let content = serde_json::to_string_pretty(&self.values)?;
        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, content)?;
        std::fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

fn read_values(path: &Path) -> Result<BTreeMap<String, String>, StorageError> {
    if !path.exists() {
        return Ok(BTreeMap::new());
    }
    let content = std::fs::read_to_string(path)?;
    if content.trim().is_empty() {
        return Ok(BTreeMap::new());
    }
    Ok(serde_json::from_str(&content)?)
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.values.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StorageError> {
        let previous = self.values.insert(key.to_string(), value.to_string());
        if let Err(e) = self.flush() {
            // Keep memory consistent with disk.
            match previous {
                Some(old) => self.values.insert(key.to_string(), old),
                None => self.values.remove(key),
            };
            return Err(e);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sessions::SessionStore;
    use tempfile::tempdir;

    #[test]
    fn values_survive_reopen() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("storage.json");

        let mut store = FileStore::open_at(&path);
        assert_eq!(store.get("model").unwrap(), None);
        store.set("model", "\"googleai/gemini-1.0-pro\"").unwrap();

        let reopened = FileStore::open_at(&path);
        assert_eq!(
            reopened.get("model").unwrap().as_deref(),
            Some("\"googleai/gemini-1.0-pro\"")
        );
    }

    #[test]
    fn corrupt_file_opens_empty_and_is_kept_aside() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("storage.json");
        std::fs::write(&path, r#"{"chatSessions": "["#).unwrap();

        let store = FileStore::open_at(&path);
        assert_eq!(store.get("chatSessions").unwrap(), None);
        assert!(!path.exists());
        assert_eq!(
            std::fs::read_to_string(dir.path().join("storage.json.corrupt")).unwrap(),
            r#"{"chatSessions": "["#
        );

        let sessions = SessionStore::open(store);
        assert_eq!(sessions.list_sessions().len(), 1);
        assert!(sessions.active_session().messages.is_empty());

        // The repaired state was written to a fresh file.
        let reopened = SessionStore::open(FileStore::open_at(&path));
        assert_eq!(reopened.active_id(), sessions.active_id());
    }

    #[test]
    fn failed_write_keeps_previous_value() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("missing-dir").join("storage.json");
        let mut store = FileStore::open_at(&path);
        assert!(store.set("k", "1").is_err());
        assert_eq!(store.get("k").unwrap(), None);
    }
}
