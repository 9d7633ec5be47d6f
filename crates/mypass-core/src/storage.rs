//! Key-value device storage.
//!
//! The core only ever talks to storage through [`KeyValueStorage`]. Two
//! backends ship with the crate: an in-memory map for tests and embedding,
//! and a directory of files, one per key, written atomically.

use crate::error::{Result, VaultError};
use async_trait::async_trait;
use std::collections::HashMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::RwLock;

/// Get/set string values by key. Each `set` is atomic for its key.
#[async_trait]
pub trait KeyValueStorage: Send + Sync {
    /// Read the value stored under `key`, `None` if nothing was ever written.
    async fn get(&self, key: &str) -> Result<Option<String>>;

    /// Overwrite the value stored under `key`.
    async fn set(&self, key: &str, value: &str) -> Result<()>;
}

/// Volatile storage backed by a map.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    values: RwLock<HashMap<String, String>>,
    unavailable: AtomicBool,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a storage already holding `values`.
    pub fn with_values<I, K, V>(values: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            values: RwLock::new(
                values
                    .into_iter()
                    .map(|(k, v)| (k.into(), v.into()))
                    .collect(),
            ),
            unavailable: AtomicBool::new(false),
        }
    }

    /// Make every subsequent call fail, as a dead backend would.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Raw value under `key`, bypassing the availability switch.
    pub async fn raw(&self, key: &str) -> Option<String> {
        self.values.read().await.get(key).cloned()
    }

    fn check_available(&self) -> Result<()> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(VaultError::StorageUnavailable(
                "storage backend is offline".to_string(),
            ));
        }
        Ok(())
    }
}

#[async_trait]
impl KeyValueStorage for MemoryStorage {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        self.check_available()?;
        Ok(self.values.read().await.get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> Result<()> {
        self.check_available()?;
        self.values
            .write()
            .await
            .insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// Storage keeping one file per key inside a directory.
#[derive(Debug, Clone)]
pub struct FileStorage {
    dir: PathBuf,
}

impl FileStorage {
    /// Use `dir` as the storage root. It is created on first write.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the file backing `key`.
    pub fn path_for(&self, key: &str) -> PathBuf {
        let name: String = key
            .trim_start_matches('@')
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                    c
                } else {
                    '_'
                }
            })
            .collect();
        self.dir.join(format!("{}.value", name))
    }
}

#[async_trait]
impl KeyValueStorage for FileStorage {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        let path = self.path_for(key);
        match tokio::fs::read_to_string(&path).await {
            Ok(value) => Ok(Some(value)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(VaultError::storage(
                &format!("Failed to read {}", path.display()),
                e,
            )),
        }
    }

    async fn set(&self, key: &str, value: &str) -> Result<()> {
        tokio::fs::create_dir_all(&self.dir).await.map_err(|e| {
            VaultError::storage(
                &format!("Failed to create storage directory {}", self.dir.display()),
                e,
            )
        })?;

        let dir = self.dir.clone();
        let path = self.path_for(key);
        let bytes = value.as_bytes().to_vec();
        tokio::task::spawn_blocking(move || atomic_write(&dir, &path, &bytes))
            .await
            .map_err(|e| VaultError::storage("Storage write task failed", e))?
    }
}

fn atomic_write(dir: &Path, path: &Path, bytes: &[u8]) -> Result<()> {
    let write_err = |e: std::io::Error| {
        VaultError::storage(&format!("Failed to write {}", path.display()), e)
    };

    let mut temp = tempfile::NamedTempFile::new_in(dir).map_err(write_err)?;
    temp.write_all(bytes).map_err(write_err)?;
    temp.flush().map_err(write_err)?;
    temp.as_file().sync_all().map_err(write_err)?;
    temp.persist(path).map_err(|e| write_err(e.error))?;

    tracing::debug!("Wrote {} bytes to {}", bytes.len(), path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_memory_storage_roundtrip_and_outage() {
        let storage = MemoryStorage::new();
        assert_eq!(storage.get("k").await.unwrap(), None);

        storage.set("k", "v").await.unwrap();
        assert_eq!(storage.get("k").await.unwrap().as_deref(), Some("v"));

        storage.set_unavailable(true);
        assert!(matches!(
            storage.get("k").await,
            Err(VaultError::StorageUnavailable(_))
        ));
        assert!(storage.set("k", "w").await.is_err());
        assert_eq!(storage.raw("k").await.as_deref(), Some("v"));
    }

    #[tokio::test]
    async fn test_file_storage_creates_dir_and_overwrites() {
        let tmp = tempfile::TempDir::new().unwrap();
        let storage = FileStorage::new(tmp.path().join("nested"));

        assert_eq!(storage.get("@my_pass_passwords").await.unwrap(), None);

        storage.set("@my_pass_passwords", "[]").await.unwrap();
        storage.set("@my_pass_passwords", "[1]").await.unwrap();

        assert_eq!(
            storage.get("@my_pass_passwords").await.unwrap().as_deref(),
            Some("[1]")
        );
        assert!(storage.path_for("@my_pass_passwords").ends_with("my_pass_passwords.value"));
    }

    #[test]
    fn test_file_storage_key_names_are_sanitized() {
        let storage = FileStorage::new("/data");
        assert_eq!(
            storage.path_for("@a/../b c"),
            PathBuf::from("/data/a____b_c.value")
        );
    }
}
