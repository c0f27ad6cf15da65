//! Field schemas describing what an account holds.
//!
//! A schema file is TOML with one `[[field]]` table per field:
//!
//! ```toml
//! [[field]]
//! key = "id"
//! kind = "text"
//! prompt = "ID: "
//!
//! [[field]]
//! key = "pw"
//! kind = "password"
//! ```
//!
//! `prompt` may be omitted and defaults to `"<key>: "`.

use std::collections::HashSet;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::errors::{Result, SupassError};
use crate::vault::ini;

/// How a field is collected and stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldKind {
    /// Echoed when typed, stored as-is.
    Text,
    /// Hidden when typed, stored encrypted.
    Password,
}

/// One field of an account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldDescriptor {
    pub key: String,
    pub kind: FieldKind,
    #[serde(default)]
    pub prompt: String,
}

impl FieldDescriptor {
    pub fn text(key: impl Into<String>, prompt: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            kind: FieldKind::Text,
            prompt: prompt.into(),
        }
    }

    pub fn password(key: impl Into<String>, prompt: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            kind: FieldKind::Password,
            prompt: prompt.into(),
        }
    }

    pub fn is_password(&self) -> bool {
        self.kind == FieldKind::Password
    }
}

/// An ordered, validated list of fields with unique keys.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Schema {
    fields: Vec<FieldDescriptor>,
}

#[derive(Deserialize)]
struct SchemaFile {
    #[serde(rename = "field", default)]
    fields: Vec<FieldDescriptor>,
}

impl Schema {
    /// Validate and build a schema.
    ///
    /// Keys must be unique and storable as account-file keys.  Empty
    /// prompts are replaced with `"<key>: "`.
    pub fn new(fields: Vec<FieldDescriptor>) -> Result<Self> {
        if fields.is_empty() {
            return Err(SupassError::SchemaError(
                "schema must have at least one field".into(),
            ));
        }

        let mut seen = HashSet::with_capacity(fields.len());
        let mut fields = fields;
        for field in &mut fields {
            ini::validate_key(&field.key).map_err(SupassError::SchemaError)?;
            if !seen.insert(field.key.clone()) {
                return Err(SupassError::SchemaError(format!(
                    "duplicate field key '{}'",
                    field.key
                )));
            }
            if field.prompt.is_empty() {
                field.prompt = format!("{}: ", field.key);
            }
        }

        Ok(Self { fields })
    }

    /// The built-in login schema: a text `id` and a password `pw`.
    pub fn login() -> Self {
        Self {
            fields: vec![
                FieldDescriptor::text("id", "ID: "),
                FieldDescriptor::password("pw", "PW: "),
            ],
        }
    }

    /// Parse a schema from TOML text.
    pub fn from_toml_str(contents: &str) -> Result<Self> {
        let file: SchemaFile = toml::from_str(contents)
            .map_err(|e| SupassError::SchemaError(format!("invalid schema file: {e}")))?;
        Self::new(file.fields)
    }

    /// Load a schema from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path).map_err(|e| {
            SupassError::SchemaError(format!("cannot read {}: {e}", path.display()))
        })?;
        Self::from_toml_str(&contents)
    }

    /// Fields in prompting order.
    pub fn fields(&self) -> &[FieldDescriptor] {
        &self.fields
    }

    /// Look a field up by key.
    pub fn field(&self, key: &str) -> Option<&FieldDescriptor> {
        self.fields.iter().find(|f| f.key == key)
    }
}
