//! Command dispatch.

use crate::config::Config;
use crate::handlers::{prompt_secret, TerminalNotifier, TerminalPasscode};
use anyhow::{Context, Result};
use clap::{Args, Subcommand, ValueEnum};
use mypass_core::{
    AuthMethod, CredentialKind, CredentialRecord, FileStorage, NewCredential, NoBiometrics,
    PasswordManager, Platform,
};
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum Command {
    /// List stored passwords
    List,
    /// List passwords whose title contains QUERY
    Search { query: String },
    /// Show one password in full
    Show { id: i64 },
    /// Store a new password
    Add(AddArgs),
    /// Change a stored password
    Edit(EditArgs),
    /// Delete one or more passwords
    Delete {
        #[arg(required = true)]
        ids: Vec<i64>,
    },
    /// Delete every stored password
    Clear,
    /// Append passwords from a JSON file
    Import { file: PathBuf },
    /// Show or change the authentication method
    AuthMethod { method: Option<AuthMethod> },
    /// Show or change whether showing a password needs authentication
    Protection { state: Option<Switch> },
    /// Set a new 4-digit passcode
    SetPasscode,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Switch {
    On,
    Off,
}

/// Fields shared by `add` and `edit`.
#[derive(Args, Debug, Clone, PartialEq, Default)]
pub struct FieldArgs {
    #[arg(long)]
    pub username: Option<String>,
    /// Prompted for when omitted
    #[arg(long)]
    pub password: Option<String>,
    /// Website, domain or IP
    #[arg(long)]
    pub link: Option<String>,
    #[arg(long = "database")]
    pub database_name: Option<String>,
    #[arg(long)]
    pub port: Option<String>,
    /// Two-factor authentication is enabled for this login
    #[arg(long = "two-factor")]
    pub two_factor: bool,
}

#[derive(Args, Debug, Clone, PartialEq)]
pub struct AddArgs {
    /// login, password, ssh, ftp or database
    #[arg(long, default_value = "login")]
    pub kind: CredentialKind,
    #[arg(long)]
    pub title: String,
    #[command(flatten)]
    pub fields: FieldArgs,
}

#[derive(Args, Debug, Clone, PartialEq)]
pub struct EditArgs {
    pub id: i64,
    #[arg(long)]
    pub kind: Option<CredentialKind>,
    #[arg(long)]
    pub title: Option<String>,
    #[command(flatten)]
    pub fields: FieldArgs,
}

pub struct App {
    manager: PasswordManager,
}

impl App {
    pub fn new(config: &Config) -> Self {
        let platform = Platform {
            storage: Arc::new(FileStorage::new(&config.data_dir)),
            biometric: Arc::new(NoBiometrics),
            passcode: Arc::new(TerminalPasscode),
            notifier: Arc::new(TerminalNotifier),
        };
        Self {
            manager: PasswordManager::new(platform, config.gate_config()),
        }
    }

    /// Session start. Fails with a fatal error when the user declines.
    pub async fn login(&mut self) -> mypass_core::Result<()> {
        self.manager.login().await
    }

    pub async fn run(&mut self, command: Command) -> Result<()> {
        match command {
            Command::List => {
                let records = self.manager.load_all().await?;
                print_list(records);
            }
            Command::Search { query } => {
                let records = self.manager.search(&query).await?;
                print_list(records);
            }
            Command::Show { id } => {
                self.manager.reveal(id).await?;
                if let Some(record) = self.manager.vault().get(id) {
                    println!("{}", describe(record));
                }
            }
            Command::Add(args) => self.add(args).await?,
            Command::Edit(args) => self.edit(args).await?,
            Command::Delete { ids } => self.delete(&ids).await?,
            Command::Clear => {
                self.manager.clear_all().await?;
            }
            Command::Import { file } => {
                let json = std::fs::read_to_string(&file)
                    .with_context(|| format!("Failed to read {}", file.display()))?;
                let count = self.manager.import(&json).await?;
                println!("Imported {} passwords", count);
            }
            Command::AuthMethod { method } => {
                if let Some(method) = method {
                    self.manager.set_auth_method(method).await?;
                }
                println!("{}", self.manager.auth_method().await?);
            }
            Command::Protection { state } => {
                if let Some(state) = state {
                    self.manager
                        .set_protection_enabled(state == Switch::On)
                        .await?;
                }
                let enabled = self.manager.protection_enabled().await?;
                println!("{}", if enabled { "on" } else { "off" });
            }
            Command::SetPasscode => {
                let code = prompt_secret("New passcode")?.context("No passcode entered")?;
                let again = prompt_secret("Repeat passcode")?.context("No passcode entered")?;
                if code != again {
                    anyhow::bail!("Passcodes do not match");
                }
                self.manager.set_passcode(&code).await?;
                println!("Passcode updated");
            }
        }
        Ok(())
    }

    async fn add(&mut self, args: AddArgs) -> Result<()> {
        let password = match args.fields.password {
            Some(password) => password,
            None => prompt_secret("Password")?.unwrap_or_default(),
        };
        let input = NewCredential {
            kind: args.kind,
            title: args.title,
            username: args.fields.username,
            password,
            link: args.fields.link,
            database_name: args.fields.database_name,
            port: args.fields.port,
            two_factor_enabled: args.fields.two_factor,
        };
        let record = self.manager.add(input).await?;
        println!("{}", record.id);
        Ok(())
    }

    async fn edit(&mut self, args: EditArgs) -> Result<()> {
        self.manager.load_all().await?;
        let current = self
            .manager
            .vault()
            .get(args.id)
            .cloned()
            .ok_or(mypass_core::VaultError::NotFound(args.id))?;
        let record = apply_edit(current, args);
        self.manager.update(record).await?;
        Ok(())
    }

    async fn delete(&mut self, ids: &[i64]) -> Result<()> {
        self.manager.load_all().await?;
        if let [id] = ids {
            if !self.manager.delete_one(*id).await? {
                tracing::info!("No password with id {}", id);
            }
            return Ok(());
        }

        self.manager.set_selection_mode(true);
        for id in ids {
            self.manager.set_selected(*id, true)?;
        }
        self.manager.delete_selected().await?;
        Ok(())
    }
}

/// Overlay the given flags on an existing record.
fn apply_edit(mut record: CredentialRecord, args: EditArgs) -> CredentialRecord {
    if let Some(kind) = args.kind {
        record.kind = kind;
    }
    if let Some(title) = args.title {
        record.title = title;
    }
    let fields = args.fields;
    if let Some(username) = fields.username {
        record.username = Some(username);
    }
    if let Some(password) = fields.password {
        record.password = password;
    }
    if let Some(link) = fields.link {
        record.link = Some(link);
    }
    if let Some(database_name) = fields.database_name {
        record.database_name = Some(database_name);
    }
    if let Some(port) = fields.port {
        record.port = Some(port);
    }
    if fields.two_factor {
        record.two_factor_enabled = true;
    }
    record
}

fn print_list(records: &[CredentialRecord]) {
    if records.is_empty() {
        println!("No passwords");
        return;
    }
    for record in records {
        println!("{}", summary(record));
    }
}

/// One line per record. The secret is never part of it.
fn summary(record: &CredentialRecord) -> String {
    let mut line = format!("{:>4}  {:<15} {}", record.id, record.kind, record.title);
    if let Some(username) = &record.username {
        line.push_str(&format!("  ({})", username));
    }
    line
}

fn describe(record: &CredentialRecord) -> String {
    let mut lines = vec![
        format!("Title:    {}", record.title),
        format!("Type:     {}", record.kind),
    ];
    if let Some(username) = &record.username {
        lines.push(format!("Username: {}", username));
    }
    let password = if record.visible {
        record.password.clone()
    } else {
        "*".repeat(8)
    };
    lines.push(format!("Password: {}", password));
    if let Some(url) = record.launch_url() {
        lines.push(format!("Link:     {}", url));
    }
    if let Some(port) = &record.port {
        lines.push(format!("Port:     {}", port));
    }
    if let Some(database) = &record.database_name {
        lines.push(format!("Database: {}", database));
    }
    if record.kind.has_two_factor() {
        let state = if record.two_factor_enabled { "on" } else { "off" };
        lines.push(format!("2FA:      {}", state));
    }
    lines.join("\n")
}
