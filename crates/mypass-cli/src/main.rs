//! mypass - terminal frontend for the mypass secrets manager
//!
//! Every invocation unlocks with the configured method before running one
//! command.

mod app;
mod config;
mod handlers;

use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use app::{App, Command};
use config::Config;

/// mypass - keep your passwords on this device
#[derive(Parser, Debug)]
#[command(name = "mypass")]
#[command(about = "A small on-device password keeper")]
struct Args {
    /// Path to the config file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Directory holding the stored data (overrides the config file)
    #[arg(short, long)]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    // Logs go to stderr so command output stays clean
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("mypass_cli=info".parse()?))
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let mut config = Config::load(args.config)?;
    if let Some(data_dir) = args.data_dir {
        config.data_dir = data_dir;
    }
    tracing::info!("Using data directory {}", config.data_dir.display());

    let mut app = App::new(&config);
    if let Err(e) = app.login().await {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }

    app.run(args.command).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_delete_takes_several_ids() {
        let args = Args::try_parse_from(["mypass", "delete", "3", "7"]).unwrap();
        assert_eq!(args.command, Command::Delete { ids: vec![3, 7] });
    }

    #[test]
    fn test_delete_needs_an_id() {
        assert!(Args::try_parse_from(["mypass", "delete"]).is_err());
    }

    #[test]
    fn test_add_parses_kind_alias() {
        let args = Args::try_parse_from([
            "mypass", "add", "--kind", "ssh", "--title", "Box", "--port", "22",
        ])
        .unwrap();
        let Command::Add(add) = args.command else {
            panic!("expected add");
        };
        assert_eq!(add.kind, mypass_core::CredentialKind::Ssh);
        assert_eq!(add.fields.port.as_deref(), Some("22"));
        assert_eq!(add.fields.password, None);
    }

    #[test]
    fn test_data_dir_flag() {
        let args = Args::try_parse_from(["mypass", "--data-dir", "/tmp/x", "list"]).unwrap();
        assert_eq!(args.data_dir, Some(PathBuf::from("/tmp/x")));
        assert_eq!(args.command, Command::List);
    }
}
