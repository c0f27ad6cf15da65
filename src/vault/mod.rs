//! Vault module: on-disk account storage.
//!
//! This module provides:
//! - INI parsing and rendering of the account file (`ini`)
//! - The directory lock guarding key generation and write-back (`lock`)
//! - `VaultStore`, the directory handle, and the `SectionStore` seam (`store`)

pub mod ini;
pub mod lock;
pub mod store;

pub use ini::{IniDocument, Section};
pub use store::{SectionStore, VaultStore};
