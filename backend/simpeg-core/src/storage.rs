// src/storage.rs
use std::collections::HashMap;
use std::fs::{self, File};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("I/O error: {context}: {source}")]
    Io {
        #[source]
        source: std::io::Error,
        context: String,
    },

    #[error("Invalid storage key: {0}")]
    InvalidKey(String),

    #[error("Storage is read-only")]
    ReadOnly,
}

// Helper to create context-aware IO errors
pub fn io_context<E: Into<std::io::Error>, S: Into<String>>(source: E, context: S) -> StorageError {
    StorageError::Io {
        source: source.into(),
        context: context.into(),
    }
}

/// String key/value persistence, shaped like browser local storage.
pub trait KeyValueStorage: Send + Sync {
    fn get_item(&self, key: &str) -> Result<Option<String>, StorageError>;
    fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError>;
    fn remove_item(&self, key: &str) -> Result<(), StorageError>;
    fn describe(&self) -> String;
}

fn validate_key(key: &str) -> Result<(), StorageError> {
    let valid = !key.is_empty()
        && key
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
    if valid {
        Ok(())
    } else {
        Err(StorageError::InvalidKey(key.to_string()))
    }
}

// --- File backend ---

/// One `<key>.json` file per key under a data directory.
#[derive(Debug, Clone)]
pub struct FileStorage {
    root: PathBuf,
}

impl FileStorage {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn path_for(&self, key: &str) -> PathBuf {
        self.root.join(format!("{}.json", key))
    }
}

fn write_then_rename(tmp_path: &Path, path: &Path, value: &str) -> Result<(), StorageError> {
    let mut file = File::create(tmp_path)
        .map_err(|e| io_context(e, format!("Failed to create {:?}", tmp_path)))?;
    file.write_all(value.as_bytes())
        .map_err(|e| io_context(e, format!("Failed to write {:?}", tmp_path)))?;
    file.sync_all()
        .map_err(|e| io_context(e, format!("Failed to flush {:?}", tmp_path)))?;
    drop(file);
    fs::rename(tmp_path, path)
        .map_err(|e| io_context(e, format!("Failed to move {:?} into place", tmp_path)))
}

impl KeyValueStorage for FileStorage {
    fn get_item(&self, key: &str) -> Result<Option<String>, StorageError> {
        validate_key(key)?;
        let path = self.path_for(key);
        match fs::read_to_string(&path) {
            Ok(contents) => Ok(Some(contents)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(io_context(e, format!("Failed to read {:?}", path))),
        }
    }

    fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError> {
        validate_key(key)?;
        fs::create_dir_all(&self.root).map_err(|e| {
            io_context(e, format!("Failed to create data directory: {:?}", self.root))
        })?;

        // Write next to the target and rename so a crash never leaves half a file
        let path = self.path_for(key);
        let tmp_path = self.root.join(format!("{}.json.tmp", key));
        if let Err(e) = write_then_rename(&tmp_path, &path, value) {
            if let Err(cleanup_err) = fs::remove_file(&tmp_path) {
                if cleanup_err.kind() != ErrorKind::NotFound {
                    warn!("Failed to remove {:?}: {}", tmp_path, cleanup_err);
                }
            }
            return Err(e);
        }

        debug!("Wrote {} bytes to {:?}", value.len(), path);
        Ok(())
    }

    fn remove_item(&self, key: &str) -> Result<(), StorageError> {
        validate_key(key)?;
        let path = self.path_for(key);
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(io_context(e, format!("Failed to remove {:?}", path))),
        }
    }

    fn describe(&self) -> String {
        format!("file storage at {:?}", self.root)
    }
}

// --- In-memory backend ---

/// Shared map; clones see the same contents.
#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    items: Arc<Mutex<HashMap<String, String>>>,
    read_only: Arc<Mutex<bool>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every subsequent `set_item` fail.
    pub fn set_read_only(&self, read_only: bool) {
        *self.read_only.lock().unwrap_or_else(|e| e.into_inner()) = read_only;
    }

    fn is_read_only(&self) -> bool {
        *self.read_only.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl KeyValueStorage for MemoryStorage {
    fn get_item(&self, key: &str) -> Result<Option<String>, StorageError> {
        validate_key(key)?;
        let items = self.items.lock().unwrap_or_else(|e| e.into_inner());
        Ok(items.get(key).cloned())
    }

    fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError> {
        validate_key(key)?;
        if self.is_read_only() {
            return Err(StorageError::ReadOnly);
        }
        self.items
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove_item(&self, key: &str) -> Result<(), StorageError> {
        validate_key(key)?;
        self.items
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .remove(key);
        Ok(())
    }

    fn describe(&self) -> String {
        "in-memory storage".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_dir(test_name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("simpeg_storage_{}", test_name))
    }

    fn setup(test_name: &str) -> FileStorage {
        teardown(test_name);
        FileStorage::new(test_dir(test_name))
    }

    fn teardown(test_name: &str) {
        let _ = fs::remove_dir_all(test_dir(test_name));
    }

    #[test]
    fn file_storage_round_trips_and_removes() {
        let test_name = "round_trip";
        let storage = setup(test_name);

        assert_eq!(storage.get_item("simpegdam_db").unwrap(), None);
        storage.set_item("simpegdam_db", "{\"a\":1}").unwrap();
        assert_eq!(
            storage.get_item("simpegdam_db").unwrap().as_deref(),
            Some("{\"a\":1}")
        );
        assert!(!test_dir(test_name).join("simpegdam_db.json.tmp").exists());

        storage.remove_item("simpegdam_db").unwrap();
        assert_eq!(storage.get_item("simpegdam_db").unwrap(), None);
        // Removing twice is fine
        storage.remove_item("simpegdam_db").unwrap();

        teardown(test_name);
    }

    #[test]
    fn failed_rename_leaves_no_temp_file() {
        let test_name = "failed_rename";
        let storage = setup(test_name);
        // A directory in the target's place makes the rename fail
        fs::create_dir_all(storage.path_for("simpegdam_db").join("blocker")).unwrap();

        assert!(matches!(
            storage.set_item("simpegdam_db", "{}"),
            Err(StorageError::Io { .. })
        ));
        assert!(!test_dir(test_name).join("simpegdam_db.json.tmp").exists());

        teardown(test_name);
    }

    #[test]
    fn keys_cannot_escape_the_data_directory() {
        let storage = FileStorage::new(test_dir("invalid_key"));
        assert!(matches!(
            storage.set_item("../etc/passwd", "x"),
            Err(StorageError::InvalidKey(_))
        ));
        assert!(matches!(
            MemoryStorage::new().get_item(""),
            Err(StorageError::InvalidKey(_))
        ));
    }

    #[test]
    fn read_only_memory_storage_rejects_writes() {
        let storage = MemoryStorage::new();
        storage.set_item("k", "v1").unwrap();
        storage.set_read_only(true);

        assert!(matches!(storage.set_item("k", "v2"), Err(StorageError::ReadOnly)));
        assert_eq!(storage.get_item("k").unwrap().as_deref(), Some("v1"));
    }
}
