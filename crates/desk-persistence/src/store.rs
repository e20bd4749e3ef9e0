//! Key-value storage backends.

use crate::error::{PersistenceError, PersistenceResult};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// String key-value store.
///
/// Keys are short identifiers (`[A-Za-z0-9_.-]`); values are opaque text.
pub trait KeyValueStore: Send + Sync {
    /// Read a value; `None` if the key was never written.
    fn get(&self, key: &str) -> PersistenceResult<Option<String>>;

    /// Write a value, replacing any previous one.
    fn put(&self, key: &str, value: &str) -> PersistenceResult<()>;
}

fn validate_key(key: &str) -> PersistenceResult<()> {
    let valid = !key.is_empty()
        && !key.starts_with('.')
        && key
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.'));
    if valid {
        Ok(())
    } else {
        Err(PersistenceError::InvalidKey(key.to_string()))
    }
}

/// One file per key inside a state directory.
///
/// Writes go to a temporary sibling first and are renamed into place, so a
/// crash mid-write leaves the previous value intact.
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    /// Open a store rooted at `dir`, creating the directory if needed.
    pub fn open(dir: impl AsRef<Path>) -> PersistenceResult<Self> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir)?;
        debug!(dir = %dir.display(), "Opened state directory");
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> PersistenceResult<PathBuf> {
        validate_key(key)?;
        Ok(self.dir.join(key))
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> PersistenceResult<Option<String>> {
        let path = self.path_for(key)?;
        match fs::read_to_string(&path) {
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Failed to read state file");
                Err(e.into())
            }
        }
    }

    fn put(&self, key: &str, value: &str) -> PersistenceResult<()> {
        let path = self.path_for(key)?;
        let tmp = self.dir.join(format!(".{key}.tmp"));
        fs::write(&tmp, value)?;
        fs::rename(&tmp, &path)?;
        debug!(path = %path.display(), bytes = value.len(), "Wrote state file");
        Ok(())
    }
}

/// In-memory store.
#[derive(Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> PersistenceResult<Option<String>> {
        validate_key(key)?;
        Ok(self.entries.lock().get(key).cloned())
    }

    fn put(&self, key: &str, value: &str) -> PersistenceResult<()> {
        validate_key(key)?;
        self.entries
            .lock()
            .insert(key.to_string(), value.to_string());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_file_store_roundtrip_and_overwrite() {
        let temp_dir = TempDir::new().unwrap();
        let store = FileStore::open(temp_dir.path().join("state")).unwrap();

        assert_eq!(store.get("alert_last_sent").unwrap(), None);
        store.put("alert_last_sent", "100").unwrap();
        store.put("alert_last_sent", "200").unwrap();
        assert_eq!(store.get("alert_last_sent").unwrap().as_deref(), Some("200"));

        // No temporary files left behind.
        let names: Vec<_> = fs::read_dir(store.dir())
            .unwrap()
            .map(|e| e.unwrap().file_name().into_string().unwrap())
            .collect();
        assert_eq!(names, vec!["alert_last_sent".to_string()]);
    }

    #[test]
    fn test_file_store_survives_reopen() {
        let temp_dir = TempDir::new().unwrap();
        {
            let store = FileStore::open(temp_dir.path()).unwrap();
            store.put("baseline_42.json", "{}").unwrap();
        }
        let store = FileStore::open(temp_dir.path()).unwrap();
        assert_eq!(store.get("baseline_42.json").unwrap().as_deref(), Some("{}"));
    }

    #[test]
    fn test_rejects_path_like_keys() {
        let store = MemoryStore::new();
        assert!(matches!(
            store.put("../escape", "x"),
            Err(PersistenceError::InvalidKey(_))
        ));
        assert!(store.get("").is_err());
        assert!(store.get(".hidden").is_err());
        assert!(store.is_empty());
    }
}
