//! Persistent key-value storage for the wallet key record.
//!
//! The wallet keeps a single record, [`PRIVATE_KEY_RECORD`], holding the
//! encoded private key. Writes replace the whole record in one put.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use parking_lot::Mutex;
use rocksdb::{DB, Options, WriteOptions};

use crate::error::WalletError;

/// Record name under which the encoded private key is stored.
pub const PRIVATE_KEY_RECORD: &str = "pkey";

/// Minimal string key-value store.
pub trait KeyValueStore: Send + Sync {
    /// Fetch a record. Fails with [`WalletError::NotFound`] if absent.
    fn get(&self, key: &str) -> Result<String, WalletError>;

    /// Write a record, replacing any previous value.
    fn put(&self, key: &str, value: &str) -> Result<(), WalletError>;

    fn contains(&self, key: &str) -> Result<bool, WalletError>;

    /// Human-readable location, used in messages.
    fn location(&self) -> String;
}

/// RocksDB-backed store in the wallet data directory.
pub struct RocksStore {
    db: DB,
    path: PathBuf,
}

impl RocksStore {
    /// Open or create the database at `path`.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, WalletError> {
        let path = path.as_ref().to_path_buf();
        let mut opts = Options::default();
        opts.create_if_missing(true);

        let db = DB::open(&opts, &path).map_err(|e| WalletError::Io(e.to_string()))?;
        Ok(Self { db, path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl KeyValueStore for RocksStore {
    fn get(&self, key: &str) -> Result<String, WalletError> {
        let raw = self
            .db
            .get(key.as_bytes())
            .map_err(|e| WalletError::Io(e.to_string()))?
            .ok_or_else(|| WalletError::NotFound(format!("record '{key}'")))?;
        String::from_utf8(raw)
            .map_err(|_| WalletError::Serialization(format!("record '{key}' is not UTF-8")))
    }

    fn put(&self, key: &str, value: &str) -> Result<(), WalletError> {
        let mut write_opts = WriteOptions::default();
        write_opts.set_sync(true);
        self.db
            .put_opt(key.as_bytes(), value.as_bytes(), &write_opts)
            .map_err(|e| WalletError::Io(e.to_string()))
    }

    fn contains(&self, key: &str) -> Result<bool, WalletError> {
        self.db
            .get_pinned(key.as_bytes())
            .map(|v| v.is_some())
            .map_err(|e| WalletError::Io(e.to_string()))
    }

    fn location(&self) -> String {
        self.path.display().to_string()
    }
}

/// In-process store. Contents are lost when dropped.
#[derive(Default)]
pub struct MemoryStore {
    records: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<String, WalletError> {
        self.records
            .lock()
            .get(key)
            .cloned()
            .ok_or_else(|| WalletError::NotFound(format!("record '{key}'")))
    }

    fn put(&self, key: &str, value: &str) -> Result<(), WalletError> {
        self.records.lock().insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn contains(&self, key: &str) -> Result<bool, WalletError> {
        Ok(self.records.lock().contains_key(key))
    }

    fn location(&self) -> String {
        "memory".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn exercise(store: &dyn KeyValueStore) {
        assert!(!store.contains(PRIVATE_KEY_RECORD).unwrap());
        assert!(matches!(
            store.get(PRIVATE_KEY_RECORD).unwrap_err(),
            WalletError::NotFound(_)
        ));

        store.put(PRIVATE_KEY_RECORD, "first").unwrap();
        assert!(store.contains(PRIVATE_KEY_RECORD).unwrap());
        assert_eq!(store.get(PRIVATE_KEY_RECORD).unwrap(), "first");

        store.put(PRIVATE_KEY_RECORD, "second").unwrap();
        assert_eq!(store.get(PRIVATE_KEY_RECORD).unwrap(), "second");
    }

    #[test]
    fn memory_store_get_put() {
        exercise(&MemoryStore::new());
    }

    #[test]
    fn rocks_store_get_put() {
        let dir = tempfile::tempdir().unwrap();
        let store = RocksStore::open(dir.path().join("db")).unwrap();
        exercise(&store);
        assert!(store.location().ends_with("db"));
    }

    #[test]
    fn rocks_store_persists_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("db");
        {
            let store = RocksStore::open(&path).unwrap();
            store.put(PRIVATE_KEY_RECORD, "persisted").unwrap();
        }
        let store = RocksStore::open(&path).unwrap();
        assert_eq!(store.get(PRIVATE_KEY_RECORD).unwrap(), "persisted");
        assert_eq!(store.path(), path.as_path());
    }

    #[test]
    fn rocks_store_open_failure_is_io() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("not-a-dir");
        std::fs::write(&file, b"x").unwrap();
        assert!(matches!(
            RocksStore::open(file.join("db")).err(),
            Some(WalletError::Io(_))
        ));
    }
}
