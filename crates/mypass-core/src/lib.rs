//! Core of the mypass secrets manager.
//!
//! This crate holds the credential records, their persistence in a
//! key-value store, the ordering and search of the presented list, and the
//! authentication gate in front of sensitive actions. Frontends drive a
//! [`PasswordManager`] and supply the platform pieces (storage, prompts,
//! notifications) through the traits re-exported here.

pub mod auth;
pub mod error;
pub mod manager;
pub mod models;
pub mod notify;
pub mod ordering;
pub mod settings;
pub mod storage;
pub mod store;
pub mod validation;
pub mod vault;

pub use auth::{
    AuthGate, BiometricPrompt, BiometricResult, GateConfig, GateMode, GateOutcome, GateState,
    NoBiometrics, PasscodePrompt,
};
pub use error::{Result, VaultError};
pub use manager::{PasswordManager, Platform};
pub use models::{AuthMethod, CredentialKind, CredentialRecord, NewCredential};
pub use notify::{Notifier, TracingNotifier};
pub use settings::AuthSettings;
pub use storage::{FileStorage, KeyValueStorage, MemoryStorage};
pub use store::RecordStore;
pub use validation::{SchemaValidator, Validator};
pub use vault::Vault;
