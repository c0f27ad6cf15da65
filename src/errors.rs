use thiserror::Error;

/// All errors that can occur in supass.
#[derive(Debug, Error)]
pub enum SupassError {
    // --- Storage errors ---
    #[error("Storage error: {0}")]
    StorageError(String),

    #[error("Account '{0}' has no section in the vault")]
    SectionNotFound(String),

    #[error("Account '{account}' has no stored value for '{field}'")]
    FieldMissing { account: String, field: String },

    // --- Crypto errors ---
    #[error("Stored value for '{field}' is not a valid ciphertext encoding")]
    FormatViolation { field: String },

    #[error("Decryption failed — wrong key or corrupted data")]
    DecryptionFailed,

    #[error("Encryption failed: {0}")]
    EncryptionFailed(String),

    #[error("Key derivation failed: {0}")]
    KeyDerivationFailed(String),

    // --- Input errors ---
    #[error("Prompt interrupted: {0}")]
    PromptInterrupted(String),

    #[error("Invalid schema: {0}")]
    SchemaError(String),

    #[error("Invalid account id: {0}")]
    InvalidAccountId(String),

    // --- Config errors ---
    #[error("Config file error: {0}")]
    ConfigError(String),

    // --- IO errors ---
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl SupassError {
    /// `true` when the error means the data was never stored, as opposed
    /// to stored but unreadable.
    pub fn is_missing_data(&self) -> bool {
        matches!(self, Self::SectionNotFound(_) | Self::FieldMissing { .. })
    }

    /// Build a `StorageError` that names the path involved.
    pub(crate) fn storage(path: &std::path::Path, err: impl std::fmt::Display) -> Self {
        Self::StorageError(format!("{}: {err}", path.display()))
    }
}

/// Convenience type alias for supass results.
pub type Result<T> = std::result::Result<T, SupassError>;
