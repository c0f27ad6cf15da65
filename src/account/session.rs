//! Resolving one account against a schema.
//!
//! A session either loads every field from the vault or collects every
//! field from the user; it never mixes the two.  The transitions are:
//!
//! ```text
//!   start ──is_new_account──────────────┐
//!     │                                 ▼
//!     └──▶ Loading ──Err──(policy)──▶ Initializing ──▶ Ready
//!             │                                         ▲
//!             └──Ok─────────────────────────────────────┘
//! ```
//!
//! Data that was never stored (no section, no key) always falls through
//! to Initializing.  Data that is stored but unreadable does so only
//! under `UnreadablePolicy::Reprompt`, the default.

use std::fmt;
use std::path::PathBuf;

use tracing::{debug, info, warn};
use zeroize::Zeroizing;

use super::prompt::Prompter;
use super::schema::{FieldDescriptor, FieldKind, Schema};
use crate::config::UnreadablePolicy;
use crate::crypto::cipher::{is_ciphertext_encoding, AesFieldCipher, FieldCipher};
use crate::crypto::keys::field_context;
use crate::errors::{Result, SupassError};
use crate::vault::{ini, Section, SectionStore, VaultStore};

/// How an `AccountSession` should be set up.
#[derive(Clone)]
pub struct SessionOptions {
    /// Section name of the account in the vault.
    pub account_id: String,
    /// Vault directory; `None` means `~/.supass`.
    pub vault_dir: Option<PathBuf>,
    /// Key to use instead of the vault's key file.
    pub explicit_key: Option<Zeroizing<String>>,
    /// Skip loading and prompt straight away.
    pub is_new_account: bool,
    /// What to do with stored data that cannot be read back.
    pub on_unreadable: UnreadablePolicy,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            account_id: "default".to_string(),
            vault_dir: None,
            explicit_key: None,
            is_new_account: false,
            on_unreadable: UnreadablePolicy::default(),
        }
    }
}

impl SessionOptions {
    pub fn for_account(account_id: impl Into<String>) -> Self {
        Self {
            account_id: account_id.into(),
            ..Self::default()
        }
    }
}

impl fmt::Debug for SessionOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionOptions")
            .field("account_id", &self.account_id)
            .field("vault_dir", &self.vault_dir)
            .field("explicit_key", &self.explicit_key.as_ref().map(|_| "<redacted>"))
            .field("is_new_account", &self.is_new_account)
            .field("on_unreadable", &self.on_unreadable)
            .finish()
    }
}

/// Where a ready session's values came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Origin {
    /// Read and decrypted from the vault.
    Loaded,
    /// Typed in during this session.
    Collected,
}

/// A fully resolved account.
pub struct AccountSession {
    account_id: String,
    schema: Schema,
    /// One value per schema field, same order.
    values: Vec<Zeroizing<String>>,
    origin: Origin,
    persisted: bool,
}

impl AccountSession {
    // ------------------------------------------------------------------
    // Construction
    // ------------------------------------------------------------------

    /// Open the vault named by `options` and resolve the account.
    ///
    /// Vault bootstrap and key resolution failures are returned as-is;
    /// everything after that follows the session state machine.
    pub fn open(
        schema: &Schema,
        options: &SessionOptions,
        prompter: &mut dyn Prompter,
    ) -> Result<Self> {
        let store = VaultStore::open(options.vault_dir.as_deref())?;
        let key = store.load_or_create_key(options.explicit_key.as_deref().map(String::as_str))?;
        let cipher = AesFieldCipher::new(&key);
        Self::start(&store, schema, options, &cipher, prompter)
    }

    /// Resolve the account against an already opened store and cipher.
    pub fn start(
        store: &dyn SectionStore,
        schema: &Schema,
        options: &SessionOptions,
        cipher: &dyn FieldCipher,
        prompter: &mut dyn Prompter,
    ) -> Result<Self> {
        let account_id = options.account_id.as_str();
        ini::validate_section_name(account_id).map_err(SupassError::InvalidAccountId)?;

        let loaded = if options.is_new_account {
            None
        } else {
            match load_values(store, schema, account_id, cipher) {
                Ok(values) => {
                    debug!(account = account_id, "account loaded from vault");
                    Some(values)
                }
                Err(err) if err.is_missing_data() => {
                    info!(account = account_id, reason = %err, "account not stored yet, collecting values");
                    None
                }
                Err(err) => match options.on_unreadable {
                    UnreadablePolicy::Reprompt => {
                        info!(account = account_id, reason = %err, "resetting unreadable account");
                        None
                    }
                    UnreadablePolicy::Fail => return Err(err),
                },
            }
        };

        let (values, origin, persisted) = match loaded {
            Some(values) => (values, Origin::Loaded, true),
            None => {
                let values = collect_values(schema, prompter)?;
                let persisted = persist_values(store, schema, account_id, &values, cipher);
                (values, Origin::Collected, persisted)
            }
        };

        Ok(Self {
            account_id: account_id.to_string(),
            schema: schema.clone(),
            values,
            origin,
            persisted,
        })
    }

    // ------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------

    /// The resolved value of field `key`, or `None` if the schema has no such field.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.schema
            .fields()
            .iter()
            .position(|f| f.key == key)
            .map(|idx| self.values[idx].as_str())
    }

    /// Fields with their resolved values, in schema order.
    pub fn fields(&self) -> impl Iterator<Item = (&FieldDescriptor, &str)> {
        self.schema
            .fields()
            .iter()
            .zip(self.values.iter().map(|v| v.as_str()))
    }

    pub fn account_id(&self) -> &str {
        &self.account_id
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn origin(&self) -> Origin {
        self.origin
    }

    /// `false` if freshly collected values could not be written back.
    ///
    /// Always `true` for loaded sessions.
    pub fn persisted(&self) -> bool {
        self.persisted
    }
}

impl fmt::Debug for AccountSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccountSession")
            .field("account_id", &self.account_id)
            .field("fields", &self.schema.fields().len())
            .field("origin", &self.origin)
            .field("persisted", &self.persisted)
            .finish_non_exhaustive()
    }
}

// ---------------------------------------------------------------------------
// Loading
// ---------------------------------------------------------------------------

/// Read and decode every schema field, or fail as a whole.
fn load_values(
    store: &dyn SectionStore,
    schema: &Schema,
    account_id: &str,
    cipher: &dyn FieldCipher,
) -> Result<Vec<Zeroizing<String>>> {
    let section = store
        .read_section(account_id)?
        .ok_or_else(|| SupassError::SectionNotFound(account_id.to_string()))?;

    schema
        .fields()
        .iter()
        .map(|field| -> Result<Zeroizing<String>> {
            let raw = section
                .get(&field.key)
                .ok_or_else(|| SupassError::FieldMissing {
                    account: account_id.to_string(),
                    field: field.key.clone(),
                })?;

            match field.kind {
                FieldKind::Text => Ok(Zeroizing::new(raw.to_string())),
                FieldKind::Password => {
                    if !is_ciphertext_encoding(raw) {
                        return Err(SupassError::FormatViolation {
                            field: field.key.clone(),
                        });
                    }
                    cipher
                        .decrypt(&field_context(account_id, &field.key), raw)
                        .map(Zeroizing::new)
                }
            }
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Initialising
// ---------------------------------------------------------------------------

/// Prompt for every schema field in order.
fn collect_values(schema: &Schema, prompter: &mut dyn Prompter) -> Result<Vec<Zeroizing<String>>> {
    schema
        .fields()
        .iter()
        .map(|field| -> Result<Zeroizing<String>> {
            let value = match field.kind {
                FieldKind::Text => prompter.prompt_text(&field.prompt)?,
                FieldKind::Password => prompter.prompt_secret(&field.prompt)?,
            };
            Ok(Zeroizing::new(value))
        })
        .collect()
}

/// Build the stored form of the collected values.
fn seal_values(
    schema: &Schema,
    account_id: &str,
    values: &[Zeroizing<String>],
    cipher: &dyn FieldCipher,
) -> Result<Section> {
    let mut section = Section::new();
    for (field, value) in schema.fields().iter().zip(values) {
        let stored = match field.kind {
            FieldKind::Text => value.as_str().to_string(),
            FieldKind::Password => {
                cipher.encrypt(&field_context(account_id, &field.key), value.as_str())?
            }
        };
        section.set(field.key.as_str(), stored);
    }
    Ok(section)
}

/// Write collected values back.  Failures are logged, not returned.
fn persist_values(
    store: &dyn SectionStore,
    schema: &Schema,
    account_id: &str,
    values: &[Zeroizing<String>],
    cipher: &dyn FieldCipher,
) -> bool {
    let section = match seal_values(schema, account_id, values, cipher) {
        Ok(section) => section,
        Err(err) => {
            warn!(account = account_id, error = %err, "error during encryption, account not saved");
            return false;
        }
    };

    match store.write_section(account_id, &section) {
        Ok(()) => true,
        Err(err) => {
            warn!(account = account_id, error = %err, "cannot write account file");
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::account::prompt::ScriptedPrompter;
    use std::cell::{Cell, RefCell};
    use std::collections::HashMap;

    /// In-memory store that counts writes and can be told to fail them.
    #[derive(Default)]
    struct MemoryStore {
        sections: RefCell<HashMap<String, Section>>,
        writes: Cell<usize>,
        fail_writes: bool,
    }

    impl SectionStore for MemoryStore {
        fn read_section(&self, account_id: &str) -> Result<Option<Section>> {
            Ok(self.sections.borrow().get(account_id).cloned())
        }

        fn write_section(&self, account_id: &str, values: &Section) -> Result<()> {
            self.writes.set(self.writes.get() + 1);
            if self.fail_writes {
                return Err(SupassError::StorageError("disk full".into()));
            }
            let mut sections = self.sections.borrow_mut();
            let section = sections.entry(account_id.to_string()).or_default();
            for (k, v) in values.iter() {
                section.set(k, v);
            }
            Ok(())
        }
    }

    /// Hex "cipher" that counts calls and ignores the context.
    #[derive(Default)]
    struct HexCipher {
        encrypts: Cell<usize>,
        decrypts: Cell<usize>,
        fail_encrypt: bool,
    }

    impl FieldCipher for HexCipher {
        fn encrypt(&self, _context: &str, plaintext: &str) -> Result<String> {
            self.encrypts.set(self.encrypts.get() + 1);
            if self.fail_encrypt {
                return Err(SupassError::EncryptionFailed("broken".into()));
            }
            Ok(hex::encode(plaintext))
        }

        fn decrypt(&self, _context: &str, ciphertext: &str) -> Result<String> {
            self.decrypts.set(self.decrypts.get() + 1);
            let bytes = hex::decode(ciphertext).map_err(|_| SupassError::DecryptionFailed)?;
            String::from_utf8(bytes).map_err(|_| SupassError::DecryptionFailed)
        }
    }

    fn stored(store: &MemoryStore, account: &str, entries: &[(&str, &str)]) {
        let mut section = Section::new();
        for (k, v) in entries {
            section.set(*k, *v);
        }
        store
            .sections
            .borrow_mut()
            .insert(account.to_string(), section);
    }

    #[test]
    fn missing_account_is_collected_and_written_once() {
        let store = MemoryStore::default();
        let cipher = HexCipher::default();
        let mut prompter = ScriptedPrompter::new(["alice", "s3cret"]);

        let session = AccountSession::start(
            &store,
            &Schema::login(),
            &SessionOptions::default(),
            &cipher,
            &mut prompter,
        )
        .unwrap();

        assert_eq!(session.origin(), Origin::Collected);
        assert!(session.persisted());
        assert_eq!(session.get("id"), Some("alice"));
        assert_eq!(session.get("pw"), Some("s3cret"));
        assert_eq!(store.writes.get(), 1);

        let section = store.read_section("default").unwrap().unwrap();
        assert_eq!(section.get("id"), Some("alice"));
        assert_eq!(section.get("pw"), Some(hex::encode("s3cret").as_str()));
        assert_eq!(
            prompter.asked(),
            [("ID: ".to_string(), false), ("PW: ".to_string(), true)]
        );
    }

    #[test]
    fn stored_account_loads_without_prompting() {
        let store = MemoryStore::default();
        stored(&store, "default", &[("id", "alice"), ("pw", hex::encode("s3cret").as_str())]);
        let cipher = HexCipher::default();
        let mut prompter = ScriptedPrompter::default();

        let session = AccountSession::start(
            &store,
            &Schema::login(),
            &SessionOptions::default(),
            &cipher,
            &mut prompter,
        )
        .unwrap();

        assert_eq!(session.origin(), Origin::Loaded);
        assert_eq!(session.get("pw"), Some("s3cret"));
        assert!(prompter.asked().is_empty());
        assert_eq!(store.writes.get(), 0);
        // Only the password field goes through the cipher.
        assert_eq!(cipher.decrypts.get(), 1);
    }

    #[test]
    fn new_account_skips_loading() {
        let store = MemoryStore::default();
        stored(&store, "default", &[("id", "old"), ("pw", hex::encode("old").as_str())]);
        let cipher = HexCipher::default();
        let mut prompter = ScriptedPrompter::new(["new", "pass"]);
        let options = SessionOptions {
            is_new_account: true,
            ..SessionOptions::default()
        };

        let session =
            AccountSession::start(&store, &Schema::login(), &options, &cipher, &mut prompter)
                .unwrap();

        assert_eq!(session.get("id"), Some("new"));
        assert_eq!(cipher.decrypts.get(), 0);
        assert_eq!(store.writes.get(), 1);
    }

    #[test]
    fn malformed_ciphertext_is_never_decrypted() {
        let store = MemoryStore::default();
        stored(&store, "default", &[("id", "alice"), ("pw", "abc!def")]);
        let cipher = HexCipher::default();
        let mut prompter = ScriptedPrompter::new(["bob", "fresh"]);

        let session = AccountSession::start(
            &store,
            &Schema::login(),
            &SessionOptions::default(),
            &cipher,
            &mut prompter,
        )
        .unwrap();

        assert_eq!(cipher.decrypts.get(), 0);
        assert_eq!(session.origin(), Origin::Collected);
        // Nothing from the failed load survives, not even the readable text field.
        assert_eq!(session.get("id"), Some("bob"));
    }

    #[test]
    fn fail_policy_surfaces_corruption() {
        let store = MemoryStore::default();
        stored(&store, "default", &[("id", "alice"), ("pw", "zz")]);
        let cipher = HexCipher::default();
        let mut prompter = ScriptedPrompter::new(["x", "y"]);
        let options = SessionOptions {
            on_unreadable: UnreadablePolicy::Fail,
            ..SessionOptions::default()
        };

        let result =
            AccountSession::start(&store, &Schema::login(), &options, &cipher, &mut prompter);
        assert!(matches!(result, Err(SupassError::DecryptionFailed)));
        assert_eq!(prompter.remaining(), 2);
    }

    #[test]
    fn fail_policy_still_collects_missing_accounts() {
        let store = MemoryStore::default();
        let cipher = HexCipher::default();
        let mut prompter = ScriptedPrompter::new(["x", "y"]);
        let options = SessionOptions {
            on_unreadable: UnreadablePolicy::Fail,
            ..SessionOptions::default()
        };

        let session =
            AccountSession::start(&store, &Schema::login(), &options, &cipher, &mut prompter)
                .unwrap();
        assert_eq!(session.origin(), Origin::Collected);
    }

    #[test]
    fn missing_field_triggers_full_reprompt() {
        let store = MemoryStore::default();
        stored(&store, "default", &[("id", "alice")]);
        let cipher = HexCipher::default();
        let mut prompter = ScriptedPrompter::new(["carol", "pw"]);

        let session = AccountSession::start(
            &store,
            &Schema::login(),
            &SessionOptions::default(),
            &cipher,
            &mut prompter,
        )
        .unwrap();
        assert_eq!(session.get("id"), Some("carol"));
        assert_eq!(session.get("pw"), Some("pw"));
    }

    #[test]
    fn write_failure_keeps_values() {
        let store = MemoryStore {
            fail_writes: true,
            ..MemoryStore::default()
        };
        let cipher = HexCipher::default();
        let mut prompter = ScriptedPrompter::new(["alice", "s3cret"]);

        let session = AccountSession::start(
            &store,
            &Schema::login(),
            &SessionOptions::default(),
            &cipher,
            &mut prompter,
        )
        .unwrap();

        assert!(!session.persisted());
        assert_eq!(session.get("pw"), Some("s3cret"));
    }

    #[test]
    fn encryption_failure_skips_write_but_keeps_values() {
        let store = MemoryStore::default();
        let cipher = HexCipher {
            fail_encrypt: true,
            ..HexCipher::default()
        };
        let mut prompter = ScriptedPrompter::new(["alice", "s3cret"]);

        let session = AccountSession::start(
            &store,
            &Schema::login(),
            &SessionOptions::default(),
            &cipher,
            &mut prompter,
        )
        .unwrap();

        assert!(!session.persisted());
        assert_eq!(store.writes.get(), 0);
        assert_eq!(session.get("id"), Some("alice"));
    }

    #[test]
    fn prompt_interruption_propagates() {
        let store = MemoryStore::default();
        let cipher = HexCipher::default();
        let mut prompter = ScriptedPrompter::new(["only-one"]);

        let result = AccountSession::start(
            &store,
            &Schema::login(),
            &SessionOptions::default(),
            &cipher,
            &mut prompter,
        );
        assert!(matches!(result, Err(SupassError::PromptInterrupted(_))));
        assert_eq!(store.writes.get(), 0);
    }

    #[test]
    fn invalid_account_id_is_rejected() {
        let store = MemoryStore::default();
        let cipher = HexCipher::default();
        let mut prompter = ScriptedPrompter::default();

        let result = AccountSession::start(
            &store,
            &Schema::login(),
            &SessionOptions::for_account("bad]id"),
            &cipher,
            &mut prompter,
        );
        assert!(matches!(result, Err(SupassError::InvalidAccountId(_))));
    }

    #[test]
    fn get_unknown_key_is_none() {
        let store = MemoryStore::default();
        stored(&store, "default", &[("id", "a"), ("pw", hex::encode("b").as_str())]);
        let cipher = HexCipher::default();
        let mut prompter = ScriptedPrompter::default();

        let session = AccountSession::start(
            &store,
            &Schema::login(),
            &SessionOptions::default(),
            &cipher,
            &mut prompter,
        )
        .unwrap();
        assert_eq!(session.get("missing"), None);
        let keys: Vec<_> = session.fields().map(|(f, _)| f.key.as_str()).collect();
        assert_eq!(keys, ["id", "pw"]);
    }
}
