//! The persisted credential collection.
//!
//! [`RecordStore`] is the only code that reads or writes the collection key.
//! Every change is a whole-collection load, transform and replace; the
//! store serializes those sequences behind a single async mutex so two
//! callers can never interleave and lose each other's update.

use crate::error::{Result, VaultError};
use crate::models::CredentialRecord;
use crate::ordering::sort_by_title;
use crate::storage::KeyValueStorage;
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Storage key holding the JSON array of records.
pub const PASSWORDS_KEY: &str = "@my_pass_passwords";

pub const IDS_EXHAUSTED: &str = "No more ids are available for new passwords.";

/// Id for a new record: one past the highest id present, `1` when empty.
///
/// Fails when the highest id is already `i64::MAX`.
pub fn next_id(records: &[CredentialRecord]) -> Result<i64> {
    records
        .iter()
        .filter(|r| !r.is_spacer())
        .map(|r| r.id)
        .max()
        .unwrap_or(0)
        .checked_add(1)
        .ok_or_else(|| VaultError::ValidationFailed(IDS_EXHAUSTED.to_string()))
}

/// Owner of the persisted record collection.
pub struct RecordStore {
    storage: Arc<dyn KeyValueStorage>,
    key: String,
    write_lock: Mutex<()>,
}

impl RecordStore {
    pub fn new(storage: Arc<dyn KeyValueStorage>) -> Self {
        Self::with_key(storage, PASSWORDS_KEY)
    }

    /// Keep the collection under a different key.
    pub fn with_key(storage: Arc<dyn KeyValueStorage>, key: impl Into<String>) -> Self {
        Self {
            storage,
            key: key.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    /// Load the collection in stored order.
    ///
    /// An absent key is initialized to an empty collection first.
    pub async fn load(&self) -> Result<Vec<CredentialRecord>> {
        let _guard = self.write_lock.lock().await;
        self.load_locked().await
    }

    /// Overwrite the whole collection.
    pub async fn replace(&self, records: &[CredentialRecord]) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        self.write(records).await
    }

    /// Run one load, transform, sort and replace sequence.
    ///
    /// Nothing is written when `f` fails.
    pub async fn mutate<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut Vec<CredentialRecord>) -> Result<T> + Send,
        T: Send,
    {
        let _guard = self.write_lock.lock().await;
        let mut records = self.load_locked().await?;
        let out = f(&mut records)?;
        let records = sort_by_title(records);
        self.write(&records).await?;
        Ok(out)
    }

    async fn load_locked(&self) -> Result<Vec<CredentialRecord>> {
        let Some(raw) = self.storage.get(&self.key).await? else {
            tracing::info!("No stored credentials under {}, initializing", self.key);
            self.write(&[]).await?;
            return Ok(Vec::new());
        };

        let records: Vec<CredentialRecord> = serde_json::from_str(&raw)
            .map_err(|e| VaultError::storage("Stored credential list is unreadable", e))?;
        let mut records: Vec<_> = records.into_iter().filter(|r| !r.is_spacer()).collect();

        if repair_duplicate_ids(&mut records)? {
            tracing::warn!("Stored credentials contained duplicate ids, reassigning");
            self.write(&records).await?;
        }

        tracing::debug!("Loaded {} credentials", records.len());
        Ok(records)
    }

    async fn write(&self, records: &[CredentialRecord]) -> Result<()> {
        let persisted: Vec<&CredentialRecord> =
            records.iter().filter(|r| !r.is_spacer()).collect();
        let raw = serde_json::to_string(&persisted)
            .map_err(|e| VaultError::storage("Failed to serialize credentials", e))?;
        self.storage.set(&self.key, &raw).await?;
        tracing::info!("Persisted {} credentials", persisted.len());
        Ok(())
    }
}

/// Give every record after the first holder of an id a fresh one.
fn repair_duplicate_ids(records: &mut [CredentialRecord]) -> Result<bool> {
    let mut seen = HashSet::new();
    let mut next = None;
    for i in 0..records.len() {
        if seen.insert(records[i].id) {
            continue;
        }
        let id = match next {
            Some(id) => id,
            None => next_id(records)?,
        };
        records[i].id = id;
        seen.insert(id);
        next = Some(
            id.checked_add(1)
                .ok_or_else(|| VaultError::storage("Cannot repair duplicate ids", IDS_EXHAUSTED))?,
        );
    }
    Ok(next.is_some())
}
