//! The presented record list and the operations that change it.
//!
//! [`Vault`] keeps the in-memory view (records as shown, active search,
//! selection mode) next to the [`RecordStore`]. Persisted mutations run
//! through [`RecordStore::mutate`] and then reload, so the view is only
//! replaced after the write has completed. Visibility and selection flags
//! live in the view only. A reload hides every record; while selection mode
//! is on, records that are still presented stay selected.

use crate::error::{Result, VaultError};
use crate::models::{CredentialRecord, NewCredential};
use crate::ordering;
use crate::store::{next_id, RecordStore};
use crate::validation::Validator;
use std::collections::HashSet;
use std::sync::Arc;

pub const SELECTION_MODE_ACTIVE: &str = "Leave selection mode to show a password.";

pub struct Vault {
    store: Arc<RecordStore>,
    validator: Arc<dyn Validator>,
    records: Vec<CredentialRecord>,
    query: Option<String>,
    selection_mode: bool,
}

impl Vault {
    pub fn new(store: Arc<RecordStore>, validator: Arc<dyn Validator>) -> Self {
        Self {
            store,
            validator,
            records: Vec::new(),
            query: None,
            selection_mode: false,
        }
    }

    /// Records as currently presented.
    pub fn presented(&self) -> &[CredentialRecord] {
        &self.records
    }

    pub fn get(&self, id: i64) -> Option<&CredentialRecord> {
        self.records.iter().find(|r| r.id == id)
    }

    /// The active search, if any.
    pub fn query(&self) -> Option<&str> {
        self.query.as_deref()
    }

    pub fn selection_mode(&self) -> bool {
        self.selection_mode
    }

    /// Records in the view with `selected` set.
    pub fn selected_ids(&self) -> Vec<i64> {
        self.records
            .iter()
            .filter(|r| r.selected)
            .map(|r| r.id)
            .collect()
    }

    /// Number of records in storage, regardless of the active search.
    pub async fn stored_count(&self) -> Result<usize> {
        Ok(self.store.load().await?.len())
    }

    /// Publish the full collection, sorted, dropping any active search.
    pub async fn load_all(&mut self) -> Result<&[CredentialRecord]> {
        self.query = None;
        self.reload().await?;
        Ok(&self.records)
    }

    /// Publish the records whose title contains `query`, case-insensitively.
    pub async fn search(&mut self, query: &str) -> Result<&[CredentialRecord]> {
        self.query = Some(query.to_string());
        self.reload().await?;
        Ok(&self.records)
    }

    /// Drop the search and reload the full list from storage.
    pub async fn clear_search(&mut self) -> Result<&[CredentialRecord]> {
        self.load_all().await
    }

    async fn reload(&mut self) -> Result<()> {
        let stored = self.store.load().await?;
        let kept: HashSet<i64> = if self.selection_mode {
            self.selected_ids().into_iter().collect()
        } else {
            HashSet::new()
        };

        self.records = match self.query.as_deref() {
            Some(query) => ordering::search(&stored, query),
            None => ordering::sort_by_title(stored),
        };
        for record in &mut self.records {
            record.selected = kept.contains(&record.id);
        }
        tracing::debug!(
            "Presenting {} credentials (search: {})",
            self.records.len(),
            self.query.is_some()
        );
        Ok(())
    }

    /// Validate and store a new record under the next free id.
    pub async fn add(&mut self, input: NewCredential) -> Result<CredentialRecord> {
        let validator = self.validator.clone();
        let record = self
            .store
            .mutate(move |records| {
                let record = input.into_record(next_id(records)?);
                validator
                    .validate(&record)
                    .map_err(VaultError::ValidationFailed)?;
                records.push(record.clone());
                Ok(record)
            })
            .await?;

        tracing::info!("Added credential {} ({})", record.id, record.kind);
        self.reload().await?;
        Ok(record)
    }

    /// Overwrite the stored record with the same id.
    pub async fn update(&mut self, mut record: CredentialRecord) -> Result<()> {
        record.normalize();
        record.visible = false;
        record.selected = false;
        let id = record.id;

        let validator = self.validator.clone();
        self.store
            .mutate(move |records| {
                let slot = records
                    .iter_mut()
                    .find(|r| r.id == id)
                    .ok_or(VaultError::NotFound(id))?;
                validator
                    .validate(&record)
                    .map_err(VaultError::ValidationFailed)?;
                *slot = record;
                Ok(())
            })
            .await?;

        tracing::info!("Updated credential {}", id);
        self.reload().await
    }

    /// Remove one record. Returns whether anything was removed.
    pub async fn delete_one(&mut self, id: i64) -> Result<bool> {
        let removed = self
            .store
            .mutate(move |records| {
                let before = records.len();
                records.retain(|r| r.id != id);
                Ok(records.len() != before)
            })
            .await?;

        if removed {
            tracing::info!("Deleted credential {}", id);
        } else {
            tracing::debug!("Delete of unknown credential {} ignored", id);
        }
        self.reload().await?;
        Ok(removed)
    }

    /// Remove every record selected in the view and leave selection mode.
    pub async fn delete_selected(&mut self) -> Result<usize> {
        let ids: HashSet<i64> = self.selected_ids().into_iter().collect();
        if ids.is_empty() {
            return Ok(0);
        }

        let removed = self
            .store
            .mutate(move |records| {
                let before = records.len();
                records.retain(|r| !ids.contains(&r.id));
                Ok(before - records.len())
            })
            .await?;

        tracing::info!("Deleted {} selected credentials", removed);
        self.selection_mode = false;
        self.reload().await?;
        Ok(removed)
    }

    /// Empty the collection. Returns how many records were removed.
    pub async fn clear_all(&mut self) -> Result<usize> {
        let removed = self
            .store
            .mutate(|records| {
                let count = records.len();
                records.clear();
                Ok(count)
            })
            .await?;

        tracing::info!("Cleared {} credentials", removed);
        self.selection_mode = false;
        self.query = None;
        self.reload().await?;
        Ok(removed)
    }

    /// Append records under fresh ids. All of them are validated before
    /// anything is written.
    pub async fn import(&mut self, incoming: Vec<CredentialRecord>) -> Result<usize> {
        let validator = self.validator.clone();
        let imported = self
            .store
            .mutate(move |records| {
                let mut count = 0;
                for mut record in incoming.into_iter().filter(|r| !r.is_spacer()) {
                    record.id = next_id(records)?;
                    record.visible = false;
                    record.selected = false;
                    record.normalize();
                    validator
                        .validate(&record)
                        .map_err(|message| {
                            VaultError::ValidationFailed(format!("{}: {}", record.title, message))
                        })?;
                    records.push(record);
                    count += 1;
                }
                Ok(count)
            })
            .await?;

        tracing::info!("Imported {} credentials", imported);
        self.reload().await?;
        Ok(imported)
    }

    /// Flip one record's `visible` flag. Returns the new value.
    ///
    /// Refused in selection mode, where every record stays hidden.
    pub fn toggle_visibility(&mut self, id: i64) -> Result<bool> {
        if self.selection_mode {
            return Err(VaultError::ValidationFailed(SELECTION_MODE_ACTIVE.to_string()));
        }
        let record = self.record_mut(id)?;
        record.visible = !record.visible;
        Ok(record.visible)
    }

    /// Hide every record. The active search is kept.
    pub fn hide_all(&mut self) {
        for record in &mut self.records {
            record.visible = false;
        }
    }

    /// Flip one record's `selected` flag. Returns the new value.
    pub fn toggle_selection(&mut self, id: i64) -> Result<bool> {
        let record = self.record_mut(id)?;
        record.selected = !record.selected;
        Ok(record.selected)
    }

    /// Set one record's `selected` flag.
    pub fn set_selected(&mut self, id: i64, selected: bool) -> Result<()> {
        self.record_mut(id)?.selected = selected;
        Ok(())
    }

    pub fn set_all_selected(&mut self, selected: bool) {
        for record in &mut self.records {
            record.selected = selected;
        }
    }

    /// Entering selection mode hides every record; leaving it clears the
    /// selection.
    pub fn set_selection_mode(&mut self, enabled: bool) {
        if enabled {
            self.hide_all();
        } else {
            self.set_all_selected(false);
        }
        self.selection_mode = enabled;
    }

    fn record_mut(&mut self, id: i64) -> Result<&mut CredentialRecord> {
        self.records
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or(VaultError::NotFound(id))
    }
}
