//! Session controller.
//!
//! [`PasswordManager`] owns the [`Vault`] and the [`AuthGate`] for one
//! session. It puts the gate in front of the sensitive operations and turns
//! results into user notifications; a presentation layer talks only to it.

use crate::auth::{AuthGate, BiometricPrompt, GateConfig, GateMode, PasscodePrompt};
use crate::error::{Result, VaultError};
use crate::models::{AuthMethod, CredentialRecord, NewCredential};
use crate::notify::Notifier;
use crate::settings::AuthSettings;
use crate::storage::KeyValueStorage;
use crate::store::RecordStore;
use crate::validation::{SchemaValidator, Validator};
use crate::vault::{Vault, SELECTION_MODE_ACTIVE};
use std::sync::Arc;

pub const STORED_MESSAGE: &str = "Your password was stored securely.";
pub const REMOVED_MESSAGE: &str = "The password was removed securely.";
pub const CLEARED_MESSAGE: &str = "All your passwords were deleted!";
pub const NOTHING_TO_CLEAR_MESSAGE: &str = "You don't have any saved passwords.";

/// Platform services a session depends on.
pub struct Platform {
    pub storage: Arc<dyn KeyValueStorage>,
    pub biometric: Arc<dyn BiometricPrompt>,
    pub passcode: Arc<dyn PasscodePrompt>,
    pub notifier: Arc<dyn Notifier>,
}

pub struct PasswordManager {
    vault: Vault,
    gate: AuthGate,
    notifier: Arc<dyn Notifier>,
}

impl PasswordManager {
    /// Create a session with the default field schema.
    pub fn new(platform: Platform, config: GateConfig) -> Self {
        Self::with_validator(platform, config, Arc::new(SchemaValidator))
    }

    pub fn with_validator(
        platform: Platform,
        config: GateConfig,
        validator: Arc<dyn Validator>,
    ) -> Self {
        let store = Arc::new(RecordStore::new(platform.storage.clone()));
        let gate = AuthGate::new(
            AuthSettings::new(platform.storage),
            platform.biometric,
            platform.passcode,
            platform.notifier.clone(),
            config,
        );
        Self {
            vault: Vault::new(store, validator),
            gate,
            notifier: platform.notifier,
        }
    }

    pub fn vault(&self) -> &Vault {
        &self.vault
    }

    pub fn gate(&self) -> &AuthGate {
        &self.gate
    }

    /// Records as currently presented.
    pub fn presented(&self) -> &[CredentialRecord] {
        self.vault.presented()
    }

    /// Session start: the login challenge, then the first load.
    ///
    /// A declined challenge is `AuthenticationFatal`; the caller must end
    /// the session.
    pub async fn login(&mut self) -> Result<()> {
        self.gate
            .run_gated("Unlock your passwords", GateMode::Login)
            .await?
            .into_result()?;
        let result = self.vault.load_all().await.map(|_| ());
        self.report(result)
    }

    pub async fn load_all(&mut self) -> Result<&[CredentialRecord]> {
        let result = self.vault.load_all().await.map(|_| ());
        self.report(result)?;
        Ok(self.vault.presented())
    }

    pub async fn search(&mut self, query: &str) -> Result<&[CredentialRecord]> {
        let result = self.vault.search(query).await.map(|_| ());
        self.report(result)?;
        Ok(self.vault.presented())
    }

    pub async fn clear_search(&mut self) -> Result<&[CredentialRecord]> {
        self.load_all().await
    }

    pub async fn add(&mut self, input: NewCredential) -> Result<CredentialRecord> {
        let result = self.vault.add(input).await;
        if result.is_ok() {
            self.notifier.notify(STORED_MESSAGE);
        }
        self.report(result)
    }

    pub async fn update(&mut self, record: CredentialRecord) -> Result<()> {
        let result = self.vault.update(record).await;
        if result.is_ok() {
            self.notifier.notify(STORED_MESSAGE);
        }
        self.report(result)
    }

    /// Gated single delete. Deleting an unknown id is a silent no-op.
    pub async fn delete_one(&mut self, id: i64) -> Result<bool> {
        self.authorize("Confirm to delete this password").await?;
        let result = self.vault.delete_one(id).await;
        if let Ok(true) = result {
            self.notifier.notify(REMOVED_MESSAGE);
        }
        self.report(result)
    }

    /// Gated delete of every selected record. Nothing selected means no
    /// challenge and nothing removed.
    pub async fn delete_selected(&mut self) -> Result<usize> {
        if self.vault.selected_ids().is_empty() {
            return Ok(0);
        }
        self.authorize("Confirm to delete the selected passwords").await?;
        let result = self.vault.delete_selected().await;
        if let Ok(removed) = result {
            if removed > 0 {
                self.notifier.notify(REMOVED_MESSAGE);
            }
        }
        self.report(result)
    }

    /// Gated removal of every stored record.
    pub async fn clear_all(&mut self) -> Result<usize> {
        let count = self.vault.stored_count().await;
        if self.report(count)? == 0 {
            self.notifier.notify(NOTHING_TO_CLEAR_MESSAGE);
            return Ok(0);
        }
        self.authorize("Confirm to delete all your passwords").await?;
        let result = self.vault.clear_all().await;
        if result.is_ok() {
            self.notifier.notify(CLEARED_MESSAGE);
        }
        self.report(result)
    }

    /// Show or hide a secret. Showing needs a challenge while protection is
    /// enabled; hiding never does. Returns the new visibility.
    ///
    /// Refused without a challenge while selection mode is on.
    pub async fn reveal(&mut self, id: i64) -> Result<bool> {
        if self.vault.selection_mode() {
            let err = VaultError::ValidationFailed(SELECTION_MODE_ACTIVE.to_string());
            return Err(self.report_err(err));
        }
        let Some(record) = self.vault.get(id) else {
            return Err(self.report_err(VaultError::NotFound(id)));
        };

        let hidden = !record.visible;
        if hidden {
            let protected = self.gate.protection_enabled().await;
            if self.report(protected)? {
                self.authorize("Confirm to show this password").await?;
            }
        }
        self.vault.toggle_visibility(id)
    }

    pub fn toggle_visibility(&mut self, id: i64) -> Result<bool> {
        self.vault.toggle_visibility(id)
    }

    pub fn hide_all(&mut self) {
        self.vault.hide_all();
    }

    pub fn toggle_selection(&mut self, id: i64) -> Result<bool> {
        self.vault.toggle_selection(id)
    }

    pub fn set_selected(&mut self, id: i64, selected: bool) -> Result<()> {
        self.vault.set_selected(id, selected)
    }

    pub fn set_all_selected(&mut self, selected: bool) {
        self.vault.set_all_selected(selected);
    }

    pub fn set_selection_mode(&mut self, enabled: bool) {
        self.vault.set_selection_mode(enabled);
    }

    pub fn selection_mode(&self) -> bool {
        self.vault.selection_mode()
    }

    /// Append records from a JSON array. Ids are reassigned.
    pub async fn import(&mut self, json: &str) -> Result<usize> {
        let parsed: std::result::Result<Vec<CredentialRecord>, _> = serde_json::from_str(json);
        let records = match parsed {
            Ok(records) => records,
            Err(e) => {
                let err = VaultError::ValidationFailed(format!("Import file is not valid: {}", e));
                return Err(self.report_err(err));
            }
        };
        let result = self.vault.import(records).await;
        self.report(result)
    }

    pub async fn auth_method(&self) -> Result<AuthMethod> {
        self.report(self.gate.auth_method().await)
    }

    pub async fn set_auth_method(&self, method: AuthMethod) -> Result<()> {
        self.report(self.gate.set_auth_method(method).await)
    }

    pub async fn protection_enabled(&self) -> Result<bool> {
        self.report(self.gate.protection_enabled().await)
    }

    pub async fn set_protection_enabled(&self, enabled: bool) -> Result<()> {
        self.report(self.gate.set_protection_enabled(enabled).await)
    }

    pub async fn set_passcode(&self, code: &str) -> Result<()> {
        self.report(self.gate.set_passcode(code).await)
    }

    async fn authorize(&self, reason: &str) -> Result<()> {
        let outcome = self.gate.run_gated(reason, GateMode::Action).await;
        self.report(outcome)?.into_result()
    }

    /// Notify the user of a failed operation. The gate has already told the
    /// user about declined challenges.
    fn report<T>(&self, result: Result<T>) -> Result<T> {
        result.map_err(|e| self.report_err(e))
    }

    fn report_err(&self, err: VaultError) -> VaultError {
        match &err {
            VaultError::AuthenticationCancelled(_) | VaultError::AuthenticationFatal(_) => {}
            other => {
                tracing::warn!("{}", other);
                self.notifier.notify(&other.to_string());
            }
        }
        err
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::tests::{RecordingNotifier, ScriptedPasscode};
    use crate::auth::{NoBiometrics, CANCELLED_MESSAGE};
    use crate::models::CredentialKind;
    use crate::settings::{PASSCODE_KEY, PROTECTION_KEY};
    use crate::storage::MemoryStorage;
    use crate::store::PASSWORDS_KEY;
    use crate::validation::TITLE_REQUIRED;

    struct Session {
        storage: Arc<MemoryStorage>,
        notifier: Arc<RecordingNotifier>,
        passcode: Arc<ScriptedPasscode>,
        manager: PasswordManager,
    }

    fn session(values: &[(&str, &str)], answers: &[Option<&str>]) -> Session {
        let storage = Arc::new(MemoryStorage::with_values(values.iter().copied()));
        let notifier = Arc::new(RecordingNotifier::default());
        let passcode = Arc::new(ScriptedPasscode::answering(answers));
        let manager = PasswordManager::new(
            Platform {
                storage: storage.clone(),
                biometric: Arc::new(NoBiometrics),
                passcode: passcode.clone(),
                notifier: notifier.clone(),
            },
            GateConfig::default(),
        );
        Session {
            storage,
            notifier,
            passcode,
            manager,
        }
    }

    fn mail() -> NewCredential {
        NewCredential {
            title: "Mail".into(),
            password: "x".into(),
            ..NewCredential::new(CredentialKind::PasswordOnly)
        }
    }

    #[tokio::test]
    async fn test_login_cancel_is_fatal_and_loads_nothing() {
        let mut s = session(&[(PASSCODE_KEY, "1234")], &[None]);

        let result = s.manager.login().await;
        assert_eq!(
            result,
            Err(VaultError::AuthenticationFatal(CANCELLED_MESSAGE.to_string()))
        );
        assert_eq!(s.storage.raw(PASSWORDS_KEY).await, None);
    }

    #[tokio::test]
    async fn test_add_notifies_success_and_validation_failures() {
        let mut s = session(&[], &[]);

        s.manager.add(mail()).await.unwrap();
        let mut bad = mail();
        bad.title.clear();
        assert!(s.manager.add(bad).await.is_err());

        assert_eq!(
            s.notifier.messages(),
            vec![STORED_MESSAGE.to_string(), TITLE_REQUIRED.to_string()]
        );
    }

    #[tokio::test]
    async fn test_cancelled_delete_leaves_collection_untouched() {
        let mut s = session(&[(PASSCODE_KEY, "1234")], &[None]);
        let record = s.manager.add(mail()).await.unwrap();
        let before = s.storage.raw(PASSWORDS_KEY).await;

        let result = s.manager.delete_one(record.id).await;

        assert!(matches!(result, Err(VaultError::AuthenticationCancelled(_))));
        assert_eq!(s.storage.raw(PASSWORDS_KEY).await, before);
        assert_eq!(s.manager.presented().len(), 1);
    }

    #[tokio::test]
    async fn test_authorized_delete_notifies_removal() {
        let mut s = session(&[(PASSCODE_KEY, "1234")], &[Some("1234")]);
        let record = s.manager.add(mail()).await.unwrap();

        assert!(s.manager.delete_one(record.id).await.unwrap());
        assert!(s.manager.presented().is_empty());
        assert!(s.notifier.messages().contains(&REMOVED_MESSAGE.to_string()));
    }

    #[tokio::test]
    async fn test_reveal_is_gated_only_when_protected_and_hidden() {
        let mut s = session(&[(PASSCODE_KEY, "1234")], &[Some("1234")]);
        let id = s.manager.add(mail()).await.unwrap().id;

        assert!(s.manager.reveal(id).await.unwrap());
        assert!(!s.manager.reveal(id).await.unwrap());
        assert_eq!(s.passcode.asked(), 0);

        s.manager.set_protection_enabled(true).await.unwrap();
        assert!(s.manager.reveal(id).await.unwrap());
        assert_eq!(s.passcode.asked(), 1);
        assert!(!s.manager.reveal(id).await.unwrap());
        assert_eq!(s.passcode.asked(), 1);
    }

    #[tokio::test]
    async fn test_reveal_in_selection_mode_is_refused_without_challenge() {
        let mut s = session(&[(PASSCODE_KEY, "1234"), (PROTECTION_KEY, "Y")], &[Some("1234")]);
        let id = s.manager.add(mail()).await.unwrap().id;
        s.manager.set_selection_mode(true);
        s.manager.toggle_selection(id).unwrap();

        assert_eq!(
            s.manager.reveal(id).await,
            Err(VaultError::ValidationFailed(SELECTION_MODE_ACTIVE.to_string()))
        );
        assert_eq!(s.passcode.asked(), 0);
        let record = s.manager.vault().get(id).unwrap();
        assert!(!record.visible);
        assert!(record.selected);
    }

    #[tokio::test]
    async fn test_repeated_id_in_bulk_delete_still_deletes_it() {
        let mut s = session(&[(PASSCODE_KEY, "1234")], &[Some("1234")]);
        let a = s.manager.add(mail()).await.unwrap().id;
        let mut other = mail();
        other.title = "Bank".into();
        s.manager.add(other).await.unwrap();

        s.manager.set_selection_mode(true);
        for id in [a, a] {
            s.manager.set_selected(id, true).unwrap();
        }

        assert_eq!(s.manager.delete_selected().await.unwrap(), 1);
        assert_eq!(s.passcode.asked(), 1);
        let titles: Vec<_> = s.manager.presented().iter().map(|r| r.title.clone()).collect();
        assert_eq!(titles, vec!["Bank"]);
    }

    #[tokio::test]
    async fn test_clear_all_on_empty_list_only_notifies() {
        let mut s = session(&[(PROTECTION_KEY, "Y")], &[]);

        assert_eq!(s.manager.clear_all().await.unwrap(), 0);
        assert_eq!(s.passcode.asked(), 0);
        assert_eq!(
            s.notifier.messages(),
            vec![NOTHING_TO_CLEAR_MESSAGE.to_string()]
        );
    }

    #[tokio::test]
    async fn test_clear_all_is_gated() {
        let mut s = session(&[(PASSCODE_KEY, "1234")], &[Some("1234")]);
        s.manager.add(mail()).await.unwrap();

        assert_eq!(s.manager.clear_all().await.unwrap(), 1);
        assert_eq!(s.storage.raw(PASSWORDS_KEY).await.as_deref(), Some("[]"));
        assert!(s.notifier.messages().contains(&CLEARED_MESSAGE.to_string()));
    }

    #[tokio::test]
    async fn test_delete_selected_without_selection_skips_challenge() {
        let mut s = session(&[(PASSCODE_KEY, "1234")], &[]);
        s.manager.add(mail()).await.unwrap();

        assert_eq!(s.manager.delete_selected().await.unwrap(), 0);
        assert_eq!(s.passcode.asked(), 0);
    }

    #[tokio::test]
    async fn test_import_rejects_malformed_json() {
        let mut s = session(&[], &[]);

        assert!(matches!(
            s.manager.import("{\"not\": \"a list\"}").await,
            Err(VaultError::ValidationFailed(_))
        ));

        let json = r#"[{"type":"Password only","id":7,"title":"Wifi","password":"pw"}]"#;
        assert_eq!(s.manager.import(json).await.unwrap(), 1);
        assert_eq!(s.manager.presented()[0].id, 1);
    }

    #[tokio::test]
    async fn test_storage_failure_is_reported() {
        let mut s = session(&[], &[]);
        s.storage.set_unavailable(true);

        assert!(matches!(
            s.manager.load_all().await,
            Err(VaultError::StorageUnavailable(_))
        ));
        assert_eq!(s.notifier.messages().len(), 1);
    }
}
