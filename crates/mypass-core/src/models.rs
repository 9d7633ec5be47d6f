//! Shared data types for the application.

use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::str::FromStr;

/// The kind of secret a record holds.
///
/// Serialized under the `type` key with the labels the stored format has
/// always used.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum CredentialKind {
    #[default]
    #[serde(rename = "Login/Password")]
    LoginPassword,
    #[serde(rename = "Password only")]
    PasswordOnly,
    #[serde(rename = "SSH")]
    Ssh,
    #[serde(rename = "FTP")]
    Ftp,
    #[serde(rename = "Database")]
    Database,
    /// Placeholder a list view may append to reserve trailing space.
    #[serde(rename = "Spacer")]
    Spacer,
}

impl CredentialKind {
    /// Kinds a user can create, in picker order.
    pub const SELECTABLE: [CredentialKind; 5] = [
        CredentialKind::LoginPassword,
        CredentialKind::PasswordOnly,
        CredentialKind::Ssh,
        CredentialKind::Ftp,
        CredentialKind::Database,
    ];

    /// Display label, identical to the serialized form.
    pub fn label(&self) -> &'static str {
        match self {
            Self::LoginPassword => "Login/Password",
            Self::PasswordOnly => "Password only",
            Self::Ssh => "SSH",
            Self::Ftp => "FTP",
            Self::Database => "Database",
            Self::Spacer => "Spacer",
        }
    }

    pub fn has_username(&self) -> bool {
        !matches!(self, Self::PasswordOnly | Self::Spacer)
    }

    pub fn has_link(&self) -> bool {
        !matches!(self, Self::PasswordOnly | Self::Spacer)
    }

    pub fn has_port(&self) -> bool {
        matches!(self, Self::Ssh | Self::Ftp)
    }

    pub fn has_database_name(&self) -> bool {
        matches!(self, Self::Database)
    }

    pub fn has_two_factor(&self) -> bool {
        matches!(self, Self::LoginPassword)
    }
}

impl fmt::Display for CredentialKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for CredentialKind {
    type Err = String;

    /// Accepts the display label or a short lowercase alias (`login`, `ssh`, ...).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let kind = match s.trim().to_ascii_lowercase().as_str() {
            "login/password" | "login" | "login-password" => Self::LoginPassword,
            "password only" | "password" | "password-only" => Self::PasswordOnly,
            "ssh" => Self::Ssh,
            "ftp" => Self::Ftp,
            "database" | "db" => Self::Database,
            other => return Err(format!("Unknown credential kind: {}", other)),
        };
        Ok(kind)
    }
}

/// Represents one stored secret.
///
/// `visible` and `selected` belong to the current view session and are never
/// written to storage.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CredentialRecord {
    pub id: i64,
    #[serde(rename = "type", default)]
    pub kind: CredentialKind,
    pub title: String,
    #[serde(default, deserialize_with = "empty_as_none", skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub password: String,
    #[serde(default, deserialize_with = "empty_as_none", skip_serializing_if = "Option::is_none")]
    pub link: Option<String>,
    #[serde(
        rename = "database",
        default,
        deserialize_with = "empty_as_none",
        skip_serializing_if = "Option::is_none"
    )]
    pub database_name: Option<String>,
    #[serde(default, deserialize_with = "empty_as_none", skip_serializing_if = "Option::is_none")]
    pub port: Option<String>,
    #[serde(rename = "2fa", default)]
    pub two_factor_enabled: bool,
    #[serde(skip)]
    pub visible: bool,
    #[serde(skip)]
    pub selected: bool,
}

impl CredentialRecord {
    /// Create the placeholder record a list view can append.
    pub fn spacer(id: i64) -> Self {
        Self {
            id,
            kind: CredentialKind::Spacer,
            ..Self::default()
        }
    }

    pub fn is_spacer(&self) -> bool {
        self.kind == CredentialKind::Spacer
    }

    /// Drop the fields that carry no meaning for this record's kind.
    pub fn normalize(&mut self) {
        if !self.kind.has_username() {
            self.username = None;
        }
        if !self.kind.has_link() {
            self.link = None;
        }
        if !self.kind.has_port() {
            self.port = None;
        }
        if !self.kind.has_database_name() {
            self.database_name = None;
        }
        if !self.kind.has_two_factor() {
            self.two_factor_enabled = false;
        }
    }

    /// The link as something an external opener accepts, defaulting to https.
    pub fn launch_url(&self) -> Option<String> {
        let link = self.link.as_deref()?.trim();
        if link.is_empty() {
            return None;
        }
        let lowered = link.to_ascii_lowercase();
        if lowered.starts_with("http://") || lowered.starts_with("https://") {
            Some(link.to_string())
        } else {
            Some(format!("https://{}", link))
        }
    }
}

/// Input for creating a new record. The store assigns the id.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct NewCredential {
    pub kind: CredentialKind,
    pub title: String,
    pub username: Option<String>,
    pub password: String,
    pub link: Option<String>,
    pub database_name: Option<String>,
    pub port: Option<String>,
    pub two_factor_enabled: bool,
}

impl NewCredential {
    /// Create an empty input of the given kind.
    pub fn new(kind: CredentialKind) -> Self {
        Self {
            kind,
            ..Self::default()
        }
    }

    /// Build the record this input describes, hidden and unselected.
    pub fn into_record(self, id: i64) -> CredentialRecord {
        let mut record = CredentialRecord {
            id,
            kind: self.kind,
            title: self.title,
            username: non_empty(self.username),
            password: self.password,
            link: non_empty(self.link),
            database_name: non_empty(self.database_name),
            port: non_empty(self.port),
            two_factor_enabled: self.two_factor_enabled,
            visible: false,
            selected: false,
        };
        record.normalize();
        record
    }
}

/// How the user proves their identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AuthMethod {
    Biometric,
    #[default]
    Passcode,
}

impl AuthMethod {
    /// Stored representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Biometric => "biometric",
            Self::Passcode => "passcode",
        }
    }
}

impl fmt::Display for AuthMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AuthMethod {
    type Err = String;

    // "fingerprint" and "password" are the names older installs stored.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "biometric" | "fingerprint" => Ok(Self::Biometric),
            "passcode" | "password" => Ok(Self::Passcode),
            other => Err(format!("Unknown authentication method: {}", other)),
        }
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

fn empty_as_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<String>::deserialize(deserializer)?;
    Ok(non_empty(value))
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_legacy_record_with_view_flags() {
        let raw = r#"{
            "type": "FTP",
            "id": 110,
            "title": "FTP 1",
            "username": "uer",
            "password": "123456",
            "link": "12.240.11.55",
            "database": "",
            "port": "21",
            "2fa": false,
            "visible": true,
            "selected": true
        }"#;

        let record: CredentialRecord = serde_json::from_str(raw).unwrap();
        assert_eq!(record.id, 110);
        assert_eq!(record.kind, CredentialKind::Ftp);
        assert_eq!(record.database_name, None);
        assert_eq!(record.port.as_deref(), Some("21"));
        assert!(!record.visible);
        assert!(!record.selected);
    }

    #[test]
    fn test_null_password_reads_as_empty() {
        let raw = r#"{"type": "Password only", "id": 3, "title": "Wifi", "password": null}"#;

        let record: CredentialRecord = serde_json::from_str(raw).unwrap();
        assert_eq!(record.password, "");
        assert_eq!(record.title, "Wifi");
    }

    #[test]
    fn test_serialize_keeps_two_factor_key_and_skips_view_flags() {
        let mut record = NewCredential {
            title: "Mail".into(),
            username: Some("me@example.com".into()),
            password: "x".into(),
            two_factor_enabled: true,
            ..NewCredential::new(CredentialKind::LoginPassword)
        }
        .into_record(4);
        record.visible = true;

        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(value["2fa"], serde_json::Value::Bool(true));
        assert_eq!(value["type"], "Login/Password");
        assert!(value.get("visible").is_none());
        assert!(value.get("selected").is_none());
        assert!(value.get("port").is_none());
    }

    #[test]
    fn test_into_record_drops_fields_foreign_to_kind() {
        let record = NewCredential {
            title: "Wifi".into(),
            username: Some("ignored".into()),
            password: "pw".into(),
            link: Some("router.local".into()),
            port: Some("22".into()),
            two_factor_enabled: true,
            ..NewCredential::new(CredentialKind::PasswordOnly)
        }
        .into_record(1);

        assert_eq!(record.username, None);
        assert_eq!(record.link, None);
        assert_eq!(record.port, None);
        assert!(!record.two_factor_enabled);
    }

    #[test]
    fn test_launch_url_adds_scheme_only_when_missing() {
        let mut record = CredentialRecord {
            link: Some("mail.example.com".into()),
            ..CredentialRecord::default()
        };
        assert_eq!(record.launch_url().as_deref(), Some("https://mail.example.com"));

        record.link = Some("http://intranet".into());
        assert_eq!(record.launch_url().as_deref(), Some("http://intranet"));

        record.link = None;
        assert_eq!(record.launch_url(), None);
    }

    #[test]
    fn test_auth_method_accepts_legacy_names() {
        assert_eq!("fingerprint".parse::<AuthMethod>(), Ok(AuthMethod::Biometric));
        assert_eq!("password".parse::<AuthMethod>(), Ok(AuthMethod::Passcode));
        assert!("face".parse::<AuthMethod>().is_err());
        assert_eq!(AuthMethod::default(), AuthMethod::Passcode);
    }

    #[test]
    fn test_kind_parses_aliases() {
        assert_eq!("ssh".parse::<CredentialKind>(), Ok(CredentialKind::Ssh));
        assert_eq!("Password only".parse::<CredentialKind>(), Ok(CredentialKind::PasswordOnly));
        assert!("spacer".parse::<CredentialKind>().is_err());
    }
}
