//! Persisted protection settings.

use crate::error::{Result, VaultError};
use crate::models::AuthMethod;
use crate::storage::KeyValueStorage;
use std::sync::Arc;

pub const AUTH_METHOD_KEY: &str = "@my_pass_authentication_method";
pub const PROTECTION_KEY: &str = "@my_pass_password_open_protection";
pub const PASSCODE_KEY: &str = "@my_pass_login_password";

/// Number of digits in a passcode.
pub const PASSCODE_LEN: usize = 4;

pub const PASSCODE_FORMAT: &str = "The passcode must be exactly 4 digits.";

/// Whether `code` is a well-formed passcode.
pub fn is_valid_passcode(code: &str) -> bool {
    code.len() == PASSCODE_LEN && code.bytes().all(|b| b.is_ascii_digit())
}

/// Typed access to the protection settings in key-value storage.
#[derive(Clone)]
pub struct AuthSettings {
    storage: Arc<dyn KeyValueStorage>,
}

impl AuthSettings {
    pub fn new(storage: Arc<dyn KeyValueStorage>) -> Self {
        Self { storage }
    }

    /// The configured method, passcode when unset.
    pub async fn auth_method(&self) -> Result<AuthMethod> {
        match self.storage.get(AUTH_METHOD_KEY).await? {
            Some(raw) => Ok(raw.parse().unwrap_or_else(|e| {
                tracing::warn!("{}; falling back to passcode", e);
                AuthMethod::Passcode
            })),
            None => Ok(AuthMethod::default()),
        }
    }

    pub async fn set_auth_method(&self, method: AuthMethod) -> Result<()> {
        self.storage.set(AUTH_METHOD_KEY, method.as_str()).await
    }

    /// Whether revealing a secret requires authentication.
    pub async fn protection_enabled(&self) -> Result<bool> {
        Ok(self.storage.get(PROTECTION_KEY).await?.as_deref() == Some("Y"))
    }

    pub async fn set_protection_enabled(&self, enabled: bool) -> Result<()> {
        self.storage
            .set(PROTECTION_KEY, if enabled { "Y" } else { "N" })
            .await
    }

    /// The stored passcode, if one was ever set.
    pub async fn passcode(&self) -> Result<Option<String>> {
        Ok(self
            .storage
            .get(PASSCODE_KEY)
            .await?
            .filter(|code| !code.is_empty()))
    }

    pub async fn set_passcode(&self, code: &str) -> Result<()> {
        if !is_valid_passcode(code) {
            return Err(VaultError::ValidationFailed(PASSCODE_FORMAT.to_string()));
        }
        self.storage.set(PASSCODE_KEY, code).await
    }
}
