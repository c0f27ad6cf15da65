//! The vault's shared encryption key and the per-field keys derived from it.
//!
//! One `EncryptionKey` exists per vault directory.  It is never used to
//! encrypt directly: each password field gets its own AES-256 key from
//! HKDF-SHA256 with the account id and field name as context, so a
//! ciphertext only decrypts in the slot it was written to.

use std::fmt;

use hkdf::Hkdf;
use rand::RngCore;
use sha2::Sha256;
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::errors::{Result, SupassError};

/// Length of derived sub-keys (256 bits).
const KEY_LEN: usize = 32;

/// Random bytes behind a freshly generated key.
const GENERATED_KEY_BYTES: usize = 32;

/// Where an `EncryptionKey` came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeySource {
    /// Supplied by the caller; never written to disk.
    Explicit,
    /// Read from the vault's key file.
    Stored,
    /// Generated during this run and written to the key file.
    Generated,
}

/// The shared secret of a vault.
///
/// Holds the key material exactly as it appears in the key file (or as
/// the caller passed it).  Wiped from memory on drop.
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct EncryptionKey {
    material: String,
    #[zeroize(skip)]
    source: KeySource,
}

impl EncryptionKey {
    pub fn new(material: impl Into<String>, source: KeySource) -> Self {
        Self {
            material: material.into(),
            source,
        }
    }

    /// Generate a new key from the thread CSPRNG.
    ///
    /// The material is 32 random bytes rendered as lowercase hex, which
    /// keeps the key file a single printable line.
    pub fn generate() -> Self {
        let mut bytes = [0u8; GENERATED_KEY_BYTES];
        rand::rng().fill_bytes(&mut bytes);
        let material = hex::encode(bytes);
        bytes.zeroize();
        Self::new(material, KeySource::Generated)
    }

    /// The raw key material.
    pub fn material(&self) -> &str {
        &self.material
    }

    pub fn source(&self) -> KeySource {
        self.source
    }

    /// Derive the AES key for one field of one account.
    pub fn derive_field_key(&self, context: &str) -> Result<[u8; KEY_LEN]> {
        derive_field_key(self.material.as_bytes(), context)
    }
}

impl fmt::Debug for EncryptionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EncryptionKey")
            .field("material", &"<redacted>")
            .field("source", &self.source)
            .finish()
    }
}

/// Build the HKDF context string for a field.
pub fn field_context(account_id: &str, field_key: &str) -> String {
    format!("supass-field:{account_id}:{field_key}")
}

/// Derive a per-field key from raw key material.
///
/// `info` is the context string produced by `field_context`.  Explicit
/// keys may be short human-chosen strings, so the extract step is kept.
pub fn derive_field_key(material: &[u8], context: &str) -> Result<[u8; KEY_LEN]> {
    let hk = Hkdf::<Sha256>::new(None, material);

    let mut okm = [0u8; KEY_LEN];
    hk.expand(context.as_bytes(), &mut okm)
        .map_err(|e| SupassError::KeyDerivationFailed(format!("HKDF expand failed: {e}")))?;

    Ok(okm)
}
