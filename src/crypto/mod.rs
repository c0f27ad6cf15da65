//! Cryptographic primitives for supass.
//!
//! This module provides:
//! - The vault `EncryptionKey` and HKDF per-field key derivation (`keys`)
//! - The `FieldCipher` seam and its AES-256-GCM implementation (`cipher`)

pub mod cipher;
pub mod keys;

pub use cipher::{is_ciphertext_encoding, AesFieldCipher, FieldCipher};
pub use keys::{field_context, EncryptionKey, KeySource};
