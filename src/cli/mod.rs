//! CLI module: Clap argument parser, output helpers, and the resolve command.

pub mod output;
pub mod resolve;

use std::io::{self, IsTerminal};
use std::path::PathBuf;

use clap::Parser;
use tracing_subscriber::EnvFilter;
use zeroize::Zeroizing;

use crate::account::{LinePrompter, Prompter, Schema, SessionOptions, TerminalPrompter};
use crate::config::{Settings, UnreadablePolicy};
use crate::errors::Result;
use crate::vault::VaultStore;

/// supass: a simple id/password vault.
#[derive(Parser)]
#[command(
    name = "supass",
    about = "A simple id/password vault with encrypted passwords",
    version
)]
pub struct Cli {
    /// Account to resolve (default: `default_account` from settings, else "default")
    #[arg(short = 'i', long = "account_id", visible_alias = "account-id")]
    pub account_id: Option<String>,

    /// Vault directory (default: ~/.supass)
    #[arg(
        short = 'f',
        long = "account_file_path",
        visible_alias = "account-file-path",
        env = "SUPASS_DIR"
    )]
    pub account_file_path: Option<PathBuf>,

    /// Encryption key to use instead of the vault's key file
    #[arg(
        short = 'k',
        long = "encrypt_key",
        visible_alias = "encrypt-key",
        env = "SUPASS_ENCRYPT_KEY",
        hide_env_values = true
    )]
    pub encrypt_key: Option<String>,

    /// Ignore stored values and prompt for the account again
    #[arg(short = 'n', long = "is_new_account", visible_alias = "is-new-account")]
    pub is_new_account: bool,

    /// TOML file describing the account fields (default: id + pw)
    #[arg(short = 's', long)]
    pub schema: Option<PathBuf>,

    /// Fail instead of re-prompting when stored values cannot be read
    #[arg(long)]
    pub strict: bool,

    /// Print password values instead of masking them
    #[arg(long)]
    pub reveal: bool,

    /// Log level used when RUST_LOG is not set
    #[arg(long, default_value = "info")]
    pub log_level: String,
}

// ---------------------------------------------------------------------------
// Shared helpers
// ---------------------------------------------------------------------------

/// Initialize the tracing subscriber; `RUST_LOG` overrides `default_level`.
///
/// Logs go to stderr so stdout only carries the account table.
pub fn init_tracing(default_level: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(io::stderr)
        .compact()
        .init();
}

/// The vault directory from `--account_file_path`, or `~/.supass`.
pub fn vault_dir(cli: &Cli) -> Result<PathBuf> {
    match &cli.account_file_path {
        Some(dir) => Ok(dir.clone()),
        None => VaultStore::default_dir(),
    }
}

/// The schema from `--schema`, or the built-in id/pw schema.
pub fn load_schema(cli: &Cli) -> Result<Schema> {
    match &cli.schema {
        Some(path) => Schema::load(path),
        None => Ok(Schema::login()),
    }
}

/// Merge command-line flags over vault settings.
pub fn session_options(cli: &Cli, settings: &Settings, vault_dir: PathBuf) -> SessionOptions {
    let on_unreadable = if cli.strict {
        UnreadablePolicy::Fail
    } else {
        settings.on_unreadable
    };

    SessionOptions {
        account_id: cli
            .account_id
            .clone()
            .unwrap_or_else(|| settings.default_account.clone()),
        vault_dir: Some(vault_dir),
        explicit_key: cli.encrypt_key.clone().map(Zeroizing::new),
        is_new_account: cli.is_new_account,
        on_unreadable,
    }
}

/// Prompt on the terminal when there is one, otherwise read lines from stdin.
pub fn prompter() -> Box<dyn Prompter> {
    if io::stdin().is_terminal() {
        Box::new(TerminalPrompter)
    } else {
        Box::new(LinePrompter::stdio())
    }
}
