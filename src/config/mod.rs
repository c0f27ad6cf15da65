//! Vault configuration (`settings.toml`).

pub mod settings;

pub use settings::{Settings, UnreadablePolicy};
