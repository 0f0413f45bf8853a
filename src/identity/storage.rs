//! Durable client-side key-value storage holding the persisted session.
//! Two backends: a process-local map and a JSON file that survives restarts.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::RwLock;

use crate::error::StorageError;

/// File name of the session store inside the state directory.
pub const SESSION_FILE: &str = "session.json";

/// String key-value storage in the spirit of browser `localStorage`.
pub trait DurableStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;
    fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;
    fn remove(&self, key: &str) -> Result<(), StorageError>;
}

/// Process-local storage. Cloning shares the underlying map.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    map: Arc<RwLock<BTreeMap<String, String>>>,
}

impl MemoryStore {
    pub fn new() -> Self { Self::default() }

    pub fn len(&self) -> usize { self.map.read().len() }

    pub fn is_empty(&self) -> bool { self.map.read().is_empty() }
}

impl DurableStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.map.read().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.map.write().insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        self.map.write().remove(key);
        Ok(())
    }
}

/// JSON object on disk, rewritten whole on every change through a temp file
/// and rename so a crash never leaves a half-written file behind.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    // Serializes read-modify-write cycles within this process.
    lock: parking_lot::Mutex<()>,
}

impl FileStore {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self { path: path.as_ref().to_path_buf(), lock: parking_lot::Mutex::new(()) }
    }

    /// Store file [`SESSION_FILE`] inside `dir`, creating the directory.
    pub fn in_dir<P: AsRef<Path>>(dir: P) -> Result<Self, StorageError> {
        let dir = dir.as_ref();
        std::fs::create_dir_all(dir).map_err(|e| io_err(dir, e))?;
        Ok(Self::new(dir.join(SESSION_FILE)))
    }

    pub fn path(&self) -> &Path { &self.path }

    fn load(&self) -> Result<BTreeMap<String, String>, StorageError> {
        let bytes = match std::fs::read(&self.path) {
            Ok(b) => b,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(BTreeMap::new()),
            Err(e) => return Err(io_err(&self.path, e)),
        };
        if bytes.iter().all(|b| b.is_ascii_whitespace()) {
            return Ok(BTreeMap::new());
        }
        serde_json::from_slice(&bytes).map_err(|source| StorageError::Corrupt {
            path: self.path.display().to_string(),
            source,
        })
    }

    fn save(&self, map: &BTreeMap<String, String>) -> Result<(), StorageError> {
        let bytes = serde_json::to_vec_pretty(map).map_err(|source| StorageError::Corrupt {
            path: self.path.display().to_string(),
            source,
        })?;
        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, bytes).map_err(|e| io_err(&tmp, e))?;
        std::fs::rename(&tmp, &self.path).map_err(|e| io_err(&self.path, e))?;
        Ok(())
    }

    fn modify<F: FnOnce(&mut BTreeMap<String, String>)>(&self, f: F) -> Result<(), StorageError> {
        let _guard = self.lock.lock();
        // A corrupt file is replaced rather than blocking every future write.
        let mut map = match self.load() {
            Ok(m) => m,
            Err(StorageError::Corrupt { path, source }) => {
                tracing::warn!(path = %path, error = %source, "discarding corrupt storage file");
                BTreeMap::new()
            }
            Err(e) => return Err(e),
        };
        f(&mut map);
        self.save(&map)
    }
}

impl DurableStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let _guard = self.lock.lock();
        Ok(self.load()?.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.modify(|m| {
            m.insert(key.to_string(), value.to_string());
        })
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        self.modify(|m| {
            m.remove(key);
        })
    }
}

fn io_err(path: &Path, source: std::io::Error) -> StorageError {
    StorageError::Io { path: path.display().to_string(), source }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_store_set_get_remove() {
        let s = MemoryStore::new();
        assert!(s.is_empty());
        s.set("auth_token", "t1").unwrap();
        assert_eq!(s.get("auth_token").unwrap().as_deref(), Some("t1"));
        let shared = s.clone();
        shared.set("auth_user", "{}").unwrap();
        assert_eq!(s.len(), 2);
        s.remove("auth_token").unwrap();
        assert!(s.get("auth_token").unwrap().is_none());
        // removing a missing key is not an error
        s.remove("auth_token").unwrap();
    }

    #[test]
    fn file_store_persists_across_instances() {
        let tmp = tempfile::tempdir().unwrap();
        let a = FileStore::in_dir(tmp.path().join("state")).unwrap();
        assert!(a.get("auth_token").unwrap().is_none());
        a.set("auth_token", "t1").unwrap();
        a.set("auth_user", "{\"id\":\"u1\"}").unwrap();

        let b = FileStore::new(a.path());
        assert_eq!(b.get("auth_token").unwrap().as_deref(), Some("t1"));
        b.remove("auth_token").unwrap();
        assert!(a.get("auth_token").unwrap().is_none());
        assert!(a.get("auth_user").unwrap().is_some());
        assert!(!a.path().with_extension("json.tmp").exists());
    }

    #[test]
    fn file_store_reports_corrupt_file_then_recovers_on_write() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("session.json");
        std::fs::write(&path, "not json").unwrap();
        let s = FileStore::new(&path);
        assert!(matches!(s.get("auth_token"), Err(StorageError::Corrupt { .. })));
        s.set("auth_token", "t2").unwrap();
        assert_eq!(s.get("auth_token").unwrap().as_deref(), Some("t2"));
    }

    #[test]
    fn file_store_treats_blank_file_as_empty() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("session.json");
        std::fs::write(&path, "\n").unwrap();
        assert!(FileStore::new(&path).get("auth_user").unwrap().is_none());
    }
}
