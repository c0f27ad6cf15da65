//! INI-style account file parsing and serialization.
//!
//! ```text
//! [default]
//! id = alice
//! pw = 9f3c...e1
//! ```
//!
//! Entries use `=` or `:` as the delimiter (whichever comes first), keys
//! and values are trimmed, `#` and `;` start comment lines, and an
//! indented line directly after an entry continues that entry's value.
//! Keys are case-sensitive, except that a lookup for a mixed-case key
//! falls back to its all-lowercase spelling, which is how older tools
//! wrote them.  Section and entry order is preserved so a rewrite
//! produces a minimal diff.

use std::fmt::Write as _;

use crate::errors::{Result, SupassError};

/// The key/value entries of one account section, in file order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Section {
    entries: Vec<(String, String)>,
}

impl Section {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.position(key).map(|idx| self.entries[idx].1.as_str())
    }

    /// Set `key`, overwriting in place if it already exists.  A legacy
    /// lowercase entry for the same key is renamed to `key`.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        match self.position(&key) {
            Some(idx) => self.entries[idx] = (key, value),
            None => self.entries.push((key, value)),
        }
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    fn position(&self, key: &str) -> Option<usize> {
        if let Some(idx) = self.exact_position(key) {
            return Some(idx);
        }
        if key.chars().any(char::is_uppercase) {
            return self.exact_position(&key.to_lowercase());
        }
        None
    }

    fn exact_position(&self, key: &str) -> Option<usize> {
        self.entries.iter().position(|(k, _)| k == key)
    }
}

/// A whole account file: named sections in file order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IniDocument {
    sections: Vec<(String, Section)>,
}

impl IniDocument {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn section(&self, name: &str) -> Option<&Section> {
        self.sections
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, s)| s)
    }

    /// Return the named section, appending an empty one if absent.
    pub fn section_mut(&mut self, name: &str) -> &mut Section {
        let idx = match self.sections.iter().position(|(n, _)| n == name) {
            Some(idx) => idx,
            None => {
                self.sections.push((name.to_string(), Section::new()));
                self.sections.len() - 1
            }
        };
        &mut self.sections[idx].1
    }

    pub fn section_names(&self) -> impl Iterator<Item = &str> {
        self.sections.iter().map(|(n, _)| n.as_str())
    }

    /// Parse file contents.  Errors name the 1-based line number.
    pub fn parse(content: &str) -> Result<Self> {
        let mut doc = Self::new();
        let mut current: Option<usize> = None;
        let mut last_key: Option<String> = None;

        for (idx, line) in content.lines().enumerate() {
            let lineno = idx + 1;
            let trimmed = line.trim();

            if trimmed.is_empty() {
                last_key = None;
                continue;
            }
            if trimmed.starts_with('#') || trimmed.starts_with(';') {
                continue;
            }

            // Continuation of the previous entry's value.
            if line.starts_with(char::is_whitespace) {
                if let (Some(sec), Some(key)) = (current, last_key.as_ref()) {
                    let section = &mut doc.sections[sec].1;
                    if let Some(entry) = section.entries.iter_mut().find(|(k, _)| k == key) {
                        entry.1.push('\n');
                        entry.1.push_str(trimmed);
                        continue;
                    }
                }
            }

            if let Some(rest) = trimmed.strip_prefix('[') {
                let name = rest
                    .strip_suffix(']')
                    .ok_or_else(|| parse_error(lineno, "unterminated section header"))?
                    .trim();
                if name.is_empty() {
                    return Err(parse_error(lineno, "empty section name"));
                }
                if doc.section(name).is_some() {
                    return Err(parse_error(lineno, &format!("duplicate section '{name}'")));
                }
                doc.sections.push((name.to_string(), Section::new()));
                current = Some(doc.sections.len() - 1);
                last_key = None;
                continue;
            }

            let (key, value) =
                split_entry(trimmed).ok_or_else(|| parse_error(lineno, "expected `key = value`"))?;
            let sec = current.ok_or_else(|| parse_error(lineno, "entry outside of any section"))?;
            if key.is_empty() {
                return Err(parse_error(lineno, "empty key"));
            }

            let section = &mut doc.sections[sec].1;
            if section.exact_position(key).is_some() {
                return Err(parse_error(lineno, &format!("duplicate key '{key}'")));
            }
            section.entries.push((key.to_string(), value.to_string()));
            last_key = Some(key.to_string());
        }

        Ok(doc)
    }

    /// Serialize back to file contents.
    pub fn render(&self) -> String {
        let mut out = String::new();
        for (name, section) in &self.sections {
            let _ = writeln!(out, "[{name}]");
            for (key, value) in &section.entries {
                let value = value.replace('\n', "\n\t");
                let _ = writeln!(out, "{key} = {value}");
            }
            out.push('\n');
        }
        out
    }
}

/// Split an entry line on the first `=` or `:`.
fn split_entry(line: &str) -> Option<(&str, &str)> {
    let pos = line.find(['=', ':'])?;
    let (key, value) = line.split_at(pos);
    Some((key.trim(), value[1..].trim()))
}

fn parse_error(lineno: usize, msg: &str) -> SupassError {
    SupassError::StorageError(format!("malformed account file, line {lineno}: {msg}"))
}

/// Check that `key` can be written as an entry key and read back unchanged.
pub fn validate_key(key: &str) -> std::result::Result<(), String> {
    if key.is_empty() {
        return Err("key cannot be empty".into());
    }
    if key.trim() != key {
        return Err(format!("key '{key}' has leading or trailing whitespace"));
    }
    if key.starts_with(['#', ';']) {
        return Err(format!("key '{key}' cannot start with a comment marker"));
    }
    if key.contains(['=', ':', '[', ']', '\n', '\r']) {
        return Err(format!(
            "key '{key}' contains a reserved character (`=`, `:`, `[`, `]` or a line break)"
        ));
    }
    Ok(())
}

/// Check that `value` renders to lines that parse back to exactly `value`.
///
/// Values are trimmed on read and continuation lines are trimmed too, so
/// no line may carry surrounding whitespace.  A continuation line can be
/// neither blank (it would end the entry) nor start with `#` or `;` (it
/// would be read as a comment).
pub fn validate_value(key: &str, value: &str) -> std::result::Result<(), String> {
    if value.contains('\r') {
        return Err(format!("value of '{key}' contains a carriage return"));
    }
    for (idx, line) in value.split('\n').enumerate() {
        if line.trim() != line {
            return Err(format!(
                "value of '{key}' has a line with leading or trailing whitespace"
            ));
        }
        if idx > 0 && line.is_empty() {
            return Err(format!("value of '{key}' contains an empty line"));
        }
        if idx > 0 && line.starts_with(['#', ';']) {
            return Err(format!(
                "value of '{key}' has a line starting with a comment marker"
            ));
        }
    }
    Ok(())
}

/// Check that `name` can be written as a section header and read back unchanged.
pub fn validate_section_name(name: &str) -> std::result::Result<(), String> {
    if name.is_empty() {
        return Err("account id cannot be empty".into());
    }
    if name.trim() != name {
        return Err(format!("account id '{name}' has leading or trailing whitespace"));
    }
    if name.contains([']', '\n', '\r']) {
        return Err(format!(
            "account id '{name}' contains a reserved character (`]` or a line break)"
        ));
    }
    Ok(())
}
