//! Field-level encryption as used by account sessions.
//!
//! Password fields are stored as `hex(nonce || ciphertext || tag)`: a
//! fresh 12-byte nonce, then the AES-256-GCM output with its 16-byte tag.
//! Hex keeps the stored value inside the word-character alphabet, so
//! anything outside `^\w+$` in a password slot is known to be corrupt
//! before any decryption is attempted.

use std::sync::OnceLock;

use aes_gcm::aead::{Aead, KeyInit, OsRng};
use aes_gcm::{AeadCore, Aes256Gcm, Nonce};
use regex::Regex;
use zeroize::{Zeroize, Zeroizing};

use super::keys::EncryptionKey;
use crate::errors::{Result, SupassError};

/// AES-GCM nonce length in bytes.
pub const NONCE_LEN: usize = 12;

/// AES-GCM authentication tag length in bytes.
pub const TAG_LEN: usize = 16;

/// Encrypts and decrypts single field values.
///
/// `context` binds a ciphertext to its slot (see `keys::field_context`).
/// Implementations must return only word characters from `encrypt` and
/// fail with `DecryptionFailed` on anything they did not produce.
pub trait FieldCipher {
    fn encrypt(&self, context: &str, plaintext: &str) -> Result<String>;
    fn decrypt(&self, context: &str, ciphertext: &str) -> Result<String>;
}

/// AES-256-GCM cipher keyed by the vault's `EncryptionKey`.
pub struct AesFieldCipher<'a> {
    key: &'a EncryptionKey,
}

impl<'a> AesFieldCipher<'a> {
    pub fn new(key: &'a EncryptionKey) -> Self {
        Self { key }
    }

    /// Build the AEAD for one slot.  The derived key bytes are wiped
    /// as soon as the cipher has been keyed.
    fn slot_cipher(&self, context: &str) -> Result<Aes256Gcm> {
        let field_key = Zeroizing::new(self.key.derive_field_key(context)?);
        Aes256Gcm::new_from_slice(field_key.as_slice())
            .map_err(|e| SupassError::KeyDerivationFailed(format!("bad field key length: {e}")))
    }
}

impl FieldCipher for AesFieldCipher<'_> {
    fn encrypt(&self, context: &str, plaintext: &str) -> Result<String> {
        let aead = self.slot_cipher(context)?;
        let nonce = Aes256Gcm::generate_nonce(&mut OsRng);
        let sealed = aead
            .encrypt(&nonce, plaintext.as_bytes())
            .map_err(|e| SupassError::EncryptionFailed(e.to_string()))?;

        let mut stored = String::with_capacity((NONCE_LEN + sealed.len()) * 2);
        stored.push_str(&hex::encode(nonce.as_slice()));
        stored.push_str(&hex::encode(&sealed));
        Ok(stored)
    }

    fn decrypt(&self, context: &str, ciphertext: &str) -> Result<String> {
        let raw = hex::decode(ciphertext).map_err(|_| SupassError::DecryptionFailed)?;
        if raw.len() < NONCE_LEN + TAG_LEN {
            return Err(SupassError::DecryptionFailed);
        }
        let (nonce, sealed) = raw.split_at(NONCE_LEN);

        let plaintext = self
            .slot_cipher(context)?
            .decrypt(Nonce::from_slice(nonce), sealed)
            .map_err(|_| SupassError::DecryptionFailed)?;

        String::from_utf8(plaintext).map_err(|e| {
            let mut bad_bytes = e.into_bytes();
            bad_bytes.zeroize();
            SupassError::DecryptionFailed
        })
    }
}

/// Returns `true` if `raw` has the shape of a stored ciphertext.
pub fn is_ciphertext_encoding(raw: &str) -> bool {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN
        .get_or_init(|| Regex::new(r"^\w+$").expect("static pattern is valid"))
        .is_match(raw)
}
