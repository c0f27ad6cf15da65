use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::errors::{Result, SupassError};

/// What a session does when stored data cannot be loaded.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnreadablePolicy {
    /// Discard the unreadable data and prompt for fresh values.
    #[default]
    Reprompt,
    /// Return the load error to the caller.
    Fail,
}

/// Vault-level configuration, loaded from `settings.toml`.
///
/// Every field has a sensible default so supass works out-of-the-box
/// without any config file at all.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Account used when none is given on the command line.
    #[serde(default = "default_account")]
    pub default_account: String,

    /// Behaviour when a stored account cannot be read back.
    #[serde(default)]
    pub on_unreadable: UnreadablePolicy,
}

// ── Serde default helpers ────────────────────────────────────────────

fn default_account() -> String {
    "default".to_string()
}

// ── Implementation ───────────────────────────────────────────────────

impl Default for Settings {
    fn default() -> Self {
        Self {
            default_account: default_account(),
            on_unreadable: UnreadablePolicy::default(),
        }
    }
}

impl Settings {
    /// Name of the settings file inside the vault directory.
    pub const FILE_NAME: &'static str = "settings.toml";

    /// Load settings from `<vault_dir>/settings.toml`.
    ///
    /// If the file does not exist, defaults are returned.
    /// If the file exists but cannot be parsed, an error is returned.
    pub fn load(vault_dir: &Path) -> Result<Self> {
        let config_path = vault_dir.join(Self::FILE_NAME);

        if !config_path.exists() {
            return Ok(Self::default());
        }

        let contents = std::fs::read_to_string(&config_path)?;

        toml::from_str(&contents).map_err(|e| {
            SupassError::ConfigError(format!("Failed to parse {}: {e}", config_path.display()))
        })
    }
}

// ── Tests ────────────────────────────────────────────────────────────
