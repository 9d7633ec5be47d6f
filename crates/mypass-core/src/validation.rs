//! Required-field checks per record kind.

use crate::models::{CredentialKind, CredentialRecord};

/// Checks a record before it is stored.
pub trait Validator: Send + Sync {
    /// `Err` carries the message for the first failing field.
    fn validate(&self, record: &CredentialRecord) -> Result<(), String>;
}

pub const TITLE_REQUIRED: &str = "Enter the service name.";
pub const USERNAME_REQUIRED: &str = "Enter the username or e-mail.";
pub const PASSWORD_REQUIRED: &str = "Enter the password.";
pub const PORT_REQUIRED: &str = "Enter the port.";
pub const LINK_REQUIRED: &str = "Enter the domain or IP.";
pub const SPACER_REJECTED: &str = "Placeholder entries cannot be stored.";

#[derive(Debug, Clone, Copy)]
enum Field {
    Title,
    Username,
    Password,
    Port,
    Link,
}

/// The default schema: fields are checked in form order.
#[derive(Debug, Clone, Copy, Default)]
pub struct SchemaValidator;

impl SchemaValidator {
    fn required_fields(kind: CredentialKind) -> &'static [Field] {
        use Field::*;
        match kind {
            CredentialKind::LoginPassword => &[Title, Username, Password],
            CredentialKind::PasswordOnly | CredentialKind::Database => &[Title, Password],
            CredentialKind::Ssh | CredentialKind::Ftp => &[Title, Username, Password, Port, Link],
            CredentialKind::Spacer => &[],
        }
    }
}

impl Validator for SchemaValidator {
    fn validate(&self, record: &CredentialRecord) -> Result<(), String> {
        if record.is_spacer() {
            return Err(SPACER_REJECTED.to_string());
        }

        for field in Self::required_fields(record.kind) {
            let (value, message) = match field {
                Field::Title => (Some(record.title.as_str()), TITLE_REQUIRED),
                Field::Username => (record.username.as_deref(), USERNAME_REQUIRED),
                Field::Password => (Some(record.password.as_str()), PASSWORD_REQUIRED),
                Field::Port => (record.port.as_deref(), PORT_REQUIRED),
                Field::Link => (record.link.as_deref(), LINK_REQUIRED),
            };
            if value.map_or(true, |v| v.trim().is_empty()) {
                return Err(message.to_string());
            }
        }
        Ok(())
    }
}
