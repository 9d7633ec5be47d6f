//! Terminal input and output for the gate and notifications.

use async_trait::async_trait;
use mypass_core::{Notifier, PasscodePrompt};

/// Reads passcodes from the terminal without echo. An empty entry or a
/// closed terminal cancels.
#[derive(Debug, Clone, Copy, Default)]
pub struct TerminalPasscode;

impl TerminalPasscode {
    async fn ask(label: String) -> Option<String> {
        let entered = tokio::task::spawn_blocking(move || rpassword::prompt_password(label))
            .await
            .ok()?;
        match entered {
            Ok(code) => non_empty(code),
            Err(e) => {
                tracing::warn!("Could not read from terminal: {}", e);
                None
            }
        }
    }
}

#[async_trait]
impl PasscodePrompt for TerminalPasscode {
    async fn request_passcode(&self, prompt: &str) -> Option<String> {
        Self::ask(format!("{} (passcode, empty to cancel): ", prompt)).await
    }

    async fn request_new_passcode(&self, prompt: &str) -> Option<String> {
        Self::ask(format!("{}: ", prompt)).await
    }
}

/// Prints notifications to stderr so stdout only carries command output.
#[derive(Debug, Clone, Copy, Default)]
pub struct TerminalNotifier;

impl Notifier for TerminalNotifier {
    fn notify(&self, message: &str) {
        eprintln!("{}", message);
    }
}

/// Read a secret that is not a passcode, e.g. a record's password.
pub fn prompt_secret(label: &str) -> std::io::Result<Option<String>> {
    rpassword::prompt_password(format!("{}: ", label)).map(non_empty)
}

fn non_empty(value: String) -> Option<String> {
    let trimmed = value.trim_end_matches(['\r', '\n']);
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}
