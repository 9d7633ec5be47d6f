//! Error types surfaced by every public operation of the core.

use thiserror::Error;

/// Result type for mypass operations.
pub type Result<T> = std::result::Result<T, VaultError>;

/// The failure kinds the presentation layer has to handle.
///
/// Backend errors (I/O, malformed JSON) are translated into one of these at
/// the storage boundary; nothing lower-level escapes the crate.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum VaultError {
    /// The key-value backend could not be read or written.
    #[error("Storage unavailable: {0}")]
    StorageUnavailable(String),

    /// A required field is missing for the record's kind.
    #[error("{0}")]
    ValidationFailed(String),

    /// No record with this id exists.
    #[error("Credential not found: {0}")]
    NotFound(i64),

    /// The user declined or failed an action challenge.
    #[error("Authentication cancelled: {0}")]
    AuthenticationCancelled(String),

    /// The user declined the login challenge; the session cannot continue.
    #[error("Authentication required to open mypass: {0}")]
    AuthenticationFatal(String),
}

impl VaultError {
    pub(crate) fn storage(context: &str, err: impl std::fmt::Display) -> Self {
        Self::StorageUnavailable(format!("{}: {}", context, err))
    }

    /// Whether the session has to terminate after this error.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::AuthenticationFatal(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_message_is_shown_verbatim() {
        let err = VaultError::ValidationFailed("Enter the password.".to_string());
        assert_eq!(err.to_string(), "Enter the password.");
    }

    #[test]
    fn test_only_login_failure_is_fatal() {
        assert!(VaultError::AuthenticationFatal("cancelled".into()).is_fatal());
        assert!(!VaultError::AuthenticationCancelled("cancelled".into()).is_fatal());
        assert!(!VaultError::NotFound(3).is_fatal());
    }
}
