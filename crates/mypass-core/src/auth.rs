//! Authentication gate.
//!
//! Sensitive operations ask the gate first. [`AuthGate::run_gated`] shows
//! the challenge for the configured method and reports a [`GateOutcome`];
//! callers only proceed on `Authorized`, so a declined challenge can never
//! leave a half-applied mutation behind.
//!
//! When the configured method is biometric but the device has no usable
//! biometric hardware, the challenge is skipped and the action proceeds.

use crate::error::{Result, VaultError};
use crate::models::AuthMethod;
use crate::notify::Notifier;
use crate::settings::{is_valid_passcode, AuthSettings, PASSCODE_FORMAT};
use async_trait::async_trait;
use std::sync::{Arc, Mutex};

pub const CANCELLED_MESSAGE: &str = "Authentication cancelled.";
pub const WRONG_PASSCODE_MESSAGE: &str = "Wrong passcode. Try again.";
pub const TOO_MANY_ATTEMPTS_MESSAGE: &str = "Too many failed attempts.";
pub const BUSY_MESSAGE: &str = "Another authentication is already in progress.";
pub const CREATE_PASSCODE_PROMPT: &str = "Create a 4-digit passcode";

/// Default number of passcode entries allowed per action challenge.
pub const DEFAULT_MAX_PASSCODE_ATTEMPTS: u32 = 3;

/// Result of a biometric prompt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BiometricResult {
    /// User successfully authenticated
    Success,
    /// User cancelled the prompt
    Cancelled,
    /// Hardware disappeared between the availability check and the prompt
    NotAvailable,
    /// Nothing enrolled
    NotEnrolled,
    /// The prompt ran and rejected the user
    Failed(String),
}

/// Platform biometric prompt.
#[async_trait]
pub trait BiometricPrompt: Send + Sync {
    async fn has_hardware(&self) -> bool;

    async fn is_enrolled(&self) -> bool;

    async fn authenticate(&self, prompt: &str) -> BiometricResult;
}

/// A device without biometric hardware.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoBiometrics;

#[async_trait]
impl BiometricPrompt for NoBiometrics {
    async fn has_hardware(&self) -> bool {
        false
    }

    async fn is_enrolled(&self) -> bool {
        false
    }

    async fn authenticate(&self, _prompt: &str) -> BiometricResult {
        BiometricResult::NotAvailable
    }
}

/// Passcode entry UI. `None` means the user dismissed it.
#[async_trait]
pub trait PasscodePrompt: Send + Sync {
    /// Ask for the existing passcode.
    async fn request_passcode(&self, prompt: &str) -> Option<String>;

    /// Ask the user to choose a passcode.
    async fn request_new_passcode(&self, prompt: &str) -> Option<String>;
}

/// Whether the challenge gates the whole session or a single action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateMode {
    /// Session start. There is no unauthenticated screen to fall back to.
    Login,
    /// One sensitive action.
    Action,
}

/// What the caller may do after a challenge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateOutcome {
    /// Proceed with the action.
    Authorized,
    /// Abort the action; the session continues.
    Cancelled(String),
    /// Abort the session.
    Fatal(String),
}

impl GateOutcome {
    pub fn is_authorized(&self) -> bool {
        matches!(self, Self::Authorized)
    }

    /// Map a refusal onto the matching error kind.
    pub fn into_result(self) -> Result<()> {
        match self {
            Self::Authorized => Ok(()),
            Self::Cancelled(reason) => Err(VaultError::AuthenticationCancelled(reason)),
            Self::Fatal(reason) => Err(VaultError::AuthenticationFatal(reason)),
        }
    }
}

/// Gate state, observable by a presentation layer that shows a modal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GateState {
    #[default]
    Idle,
    /// A challenge for the given method is on screen.
    Challenging(AuthMethod),
}

/// Gate configuration.
#[derive(Debug, Clone)]
pub struct GateConfig {
    /// Passcode entries allowed before an action challenge counts as
    /// cancelled. The login challenge is not limited.
    pub max_passcode_attempts: u32,
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            max_passcode_attempts: DEFAULT_MAX_PASSCODE_ATTEMPTS,
        }
    }
}

enum Verdict {
    Passed,
    Declined(String),
}

/// Resets the gate to idle however the challenge ends, including when the
/// awaiting future is dropped.
struct ChallengeGuard<'a> {
    state: &'a Mutex<GateState>,
}

impl Drop for ChallengeGuard<'_> {
    fn drop(&mut self) {
        *self.state.lock().unwrap_or_else(|e| e.into_inner()) = GateState::Idle;
    }
}

/// Mediates access to secrets and to the protection settings.
pub struct AuthGate {
    settings: AuthSettings,
    biometric: Arc<dyn BiometricPrompt>,
    passcode: Arc<dyn PasscodePrompt>,
    notifier: Arc<dyn Notifier>,
    config: GateConfig,
    state: Mutex<GateState>,
}

impl AuthGate {
    pub fn new(
        settings: AuthSettings,
        biometric: Arc<dyn BiometricPrompt>,
        passcode: Arc<dyn PasscodePrompt>,
        notifier: Arc<dyn Notifier>,
        config: GateConfig,
    ) -> Self {
        Self {
            settings,
            biometric,
            passcode,
            notifier,
            config,
            state: Mutex::new(GateState::Idle),
        }
    }

    pub fn state(&self) -> GateState {
        *self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn settings(&self) -> &AuthSettings {
        &self.settings
    }

    /// Challenge the user with the configured method.
    ///
    /// Storage failures while reading the settings are errors; everything the
    /// user does (success, cancel, wrong passcode) is an outcome.
    pub async fn run_gated(&self, reason: &str, mode: GateMode) -> Result<GateOutcome> {
        let method = self.settings.auth_method().await?;

        let _guard = {
            let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
            if let GateState::Challenging(_) = *state {
                tracing::warn!("Rejected challenge while another is in progress");
                self.notifier.notify(BUSY_MESSAGE);
                return Ok(GateOutcome::Cancelled(BUSY_MESSAGE.to_string()));
            }
            *state = GateState::Challenging(method);
            ChallengeGuard { state: &self.state }
        };

        tracing::info!("Authentication challenge ({:?}, {})", mode, method);
        let verdict = match method {
            AuthMethod::Biometric => self.challenge_biometric(reason).await,
            AuthMethod::Passcode => self.challenge_passcode(reason, mode).await?,
        };

        let outcome = match verdict {
            Verdict::Passed => {
                tracing::info!("Authentication succeeded");
                GateOutcome::Authorized
            }
            Verdict::Declined(message) => {
                tracing::warn!("Authentication declined: {}", message);
                self.notifier.notify(&message);
                match mode {
                    GateMode::Login => GateOutcome::Fatal(message),
                    GateMode::Action => GateOutcome::Cancelled(message),
                }
            }
        };
        Ok(outcome)
    }

    async fn challenge_biometric(&self, reason: &str) -> Verdict {
        if !self.biometric.has_hardware().await || !self.biometric.is_enrolled().await {
            tracing::warn!("Biometric hardware unavailable, continuing without a challenge");
            return Verdict::Passed;
        }

        match self.biometric.authenticate(reason).await {
            BiometricResult::Success => Verdict::Passed,
            BiometricResult::NotAvailable | BiometricResult::NotEnrolled => {
                tracing::warn!("Biometric prompt reported no usable hardware, continuing");
                Verdict::Passed
            }
            BiometricResult::Cancelled => Verdict::Declined(CANCELLED_MESSAGE.to_string()),
            BiometricResult::Failed(message) => Verdict::Declined(message),
        }
    }

    /// The login challenge re-prompts until the user gets it right or
    /// cancels; action challenges stop after `max_passcode_attempts`.
    fn has_attempts_left(&self, used: u32, mode: GateMode) -> bool {
        mode == GateMode::Login || used < self.config.max_passcode_attempts
    }

    async fn challenge_passcode(&self, reason: &str, mode: GateMode) -> Result<Verdict> {
        let Some(stored) = self.settings.passcode().await? else {
            return self.enroll_passcode(mode).await;
        };

        let mut used = 0;
        while self.has_attempts_left(used, mode) {
            used += 1;
            match self.passcode.request_passcode(reason).await {
                None => return Ok(Verdict::Declined(CANCELLED_MESSAGE.to_string())),
                Some(entered) if entered == stored => return Ok(Verdict::Passed),
                Some(_) => self.notifier.notify(WRONG_PASSCODE_MESSAGE),
            }
        }
        Ok(Verdict::Declined(TOO_MANY_ATTEMPTS_MESSAGE.to_string()))
    }

    /// First use of the passcode method: the chosen code is stored and counts
    /// as a successful challenge.
    async fn enroll_passcode(&self, mode: GateMode) -> Result<Verdict> {
        tracing::info!("No passcode stored, asking the user to create one");
        let mut used = 0;
        while self.has_attempts_left(used, mode) {
            used += 1;
            match self.passcode.request_new_passcode(CREATE_PASSCODE_PROMPT).await {
                None => return Ok(Verdict::Declined(CANCELLED_MESSAGE.to_string())),
                Some(code) if is_valid_passcode(&code) => {
                    self.settings.set_passcode(&code).await?;
                    return Ok(Verdict::Passed);
                }
                Some(_) => self.notifier.notify(PASSCODE_FORMAT),
            }
        }
        Ok(Verdict::Declined(TOO_MANY_ATTEMPTS_MESSAGE.to_string()))
    }

    pub async fn auth_method(&self) -> Result<AuthMethod> {
        self.settings.auth_method().await
    }

    /// Switch methods. Requires a challenge under the current method while
    /// protection is enabled.
    pub async fn set_auth_method(&self, method: AuthMethod) -> Result<()> {
        let current = self.settings.auth_method().await?;
        if current == method {
            return Ok(());
        }

        if self.settings.protection_enabled().await? {
            self.run_gated("Confirm to change the authentication method", GateMode::Action)
                .await?
                .into_result()?;
        }

        self.settings.set_auth_method(method).await?;
        tracing::info!("Authentication method changed from {} to {}", current, method);
        Ok(())
    }

    pub async fn protection_enabled(&self) -> Result<bool> {
        self.settings.protection_enabled().await
    }

    /// Turning protection off needs a challenge; turning it on does not.
    pub async fn set_protection_enabled(&self, enabled: bool) -> Result<()> {
        let current = self.settings.protection_enabled().await?;
        if current == enabled {
            return Ok(());
        }

        if !enabled {
            self.run_gated("Confirm to stop protecting your passwords", GateMode::Action)
                .await?
                .into_result()?;
        }

        self.settings.set_protection_enabled(enabled).await?;
        tracing::info!("Reveal protection {}", if enabled { "enabled" } else { "disabled" });
        Ok(())
    }

    /// Replace the passcode. Changing an existing one needs a challenge.
    pub async fn set_passcode(&self, code: &str) -> Result<()> {
        if !is_valid_passcode(code) {
            return Err(VaultError::ValidationFailed(PASSCODE_FORMAT.to_string()));
        }

        if self.settings.passcode().await?.is_some() {
            self.run_gated("Confirm to change your passcode", GateMode::Action)
                .await?
                .into_result()?;
        }

        self.settings.set_passcode(code).await?;
        tracing::info!("Passcode updated");
        Ok(())
    }
}
