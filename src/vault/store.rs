//! On-disk vault: directory bootstrap, key file and account sections.
//!
//! `VaultStore` owns the vault directory layout:
//!
//! ```text
//! <vault_dir>/            0700
//!   accounts.cfg          0600  INI sections, one per account
//!   .encrypt_key          0600  shared key material, one line
//!   .lock                 0600  advisory lock target
//! ```
//!
//! Values handed to and returned from the store are raw: password
//! fields are already ciphertext.  Encryption is the session's job.

use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};
use zeroize::Zeroizing;

use super::ini::{self, IniDocument, Section};
use super::lock::DirLock;
use crate::crypto::keys::{EncryptionKey, KeySource};
use crate::errors::{Result, SupassError};

/// Directory name used under the home directory when none is given.
pub const DEFAULT_DIR_NAME: &str = ".supass";

/// Account file inside the vault directory.
pub const ACCOUNTS_FILE_NAME: &str = "accounts.cfg";

/// Key file inside the vault directory.
pub const KEY_FILE_NAME: &str = ".encrypt_key";

/// Raw section access, the seam between sessions and storage.
pub trait SectionStore {
    /// Return the raw values of `account_id`, or `None` if it has no section.
    fn read_section(&self, account_id: &str) -> Result<Option<Section>>;

    /// Create or update the section of `account_id` with `values`.
    fn write_section(&self, account_id: &str, values: &Section) -> Result<()>;
}

/// Handle on an opened vault directory.
#[derive(Debug, Clone)]
pub struct VaultStore {
    dir: PathBuf,
}

impl VaultStore {
    // ------------------------------------------------------------------
    // Construction
    // ------------------------------------------------------------------

    /// The default vault directory, `~/.supass`.
    pub fn default_dir() -> Result<PathBuf> {
        dirs::home_dir()
            .map(|home| home.join(DEFAULT_DIR_NAME))
            .ok_or_else(|| SupassError::StorageError("cannot determine home directory".into()))
    }

    /// Open the vault at `dir` (or the default), creating it if needed.
    ///
    /// Safe to call on every run: an existing directory and account file
    /// are left untouched.
    pub fn open(dir: Option<&Path>) -> Result<Self> {
        let dir = match dir {
            Some(d) => d.to_path_buf(),
            None => Self::default_dir()?,
        };

        if !dir.exists() {
            create_private_dir(&dir)?;
            debug!(path = %dir.display(), "created vault directory");
        }

        let meta = fs::metadata(&dir).map_err(|e| SupassError::storage(&dir, e))?;
        if !meta.is_dir() {
            return Err(SupassError::storage(&dir, "not a directory"));
        }
        if meta.permissions().readonly() {
            return Err(SupassError::storage(&dir, "directory is not writable"));
        }

        let store = Self { dir };
        store.ensure_accounts_file()?;
        Ok(store)
    }

    /// Create an empty account file if there is none yet.
    fn ensure_accounts_file(&self) -> Result<()> {
        let path = self.accounts_path();

        let mut options = OpenOptions::new();
        options.write(true).create_new(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            options.mode(0o600);
        }

        match options.open(&path) {
            Ok(_) => {
                restrict_file(&path)?;
                debug!(path = %path.display(), "created empty account file");
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::AlreadyExists => Ok(()),
            Err(e) => Err(SupassError::storage(&path, e)),
        }
    }

    // ------------------------------------------------------------------
    // Key management
    // ------------------------------------------------------------------

    /// Resolve the vault's encryption key.
    ///
    /// A non-empty `explicit_key` wins and is never written anywhere.
    /// Otherwise the key file is read; when it is missing or blank a new
    /// key is generated and stored with owner-only permissions.  The
    /// directory lock is held throughout so concurrent first runs agree.
    pub fn load_or_create_key(&self, explicit_key: Option<&str>) -> Result<EncryptionKey> {
        if let Some(key) = explicit_key.filter(|k| !k.is_empty()) {
            return Ok(EncryptionKey::new(key, KeySource::Explicit));
        }

        let _lock = DirLock::acquire(&self.dir)?;
        let path = self.key_path();

        match fs::read_to_string(&path) {
            Ok(contents) => {
                let contents = Zeroizing::new(contents);
                let material = contents.trim();
                if !material.is_empty() {
                    return Ok(EncryptionKey::new(material, KeySource::Stored));
                }
            }
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => return Err(SupassError::storage(&path, e)),
        }

        let key = EncryptionKey::generate();
        write_atomic(&path, key.material().as_bytes())?;
        info!(path = %path.display(), "generated new vault encryption key");
        Ok(key)
    }

    // ------------------------------------------------------------------
    // Sections
    // ------------------------------------------------------------------

    /// Parse the whole account file.  A missing file reads as empty.
    pub fn read_document(&self) -> Result<IniDocument> {
        let path = self.accounts_path();
        match fs::read_to_string(&path) {
            Ok(contents) => IniDocument::parse(&contents),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(IniDocument::new()),
            Err(e) => Err(SupassError::storage(&path, e)),
        }
    }

    // ------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------

    /// Returns the vault directory.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Returns the path to `accounts.cfg`.
    pub fn accounts_path(&self) -> PathBuf {
        self.dir.join(ACCOUNTS_FILE_NAME)
    }

    /// Returns the path to `.encrypt_key`.
    pub fn key_path(&self) -> PathBuf {
        self.dir.join(KEY_FILE_NAME)
    }
}

impl SectionStore for VaultStore {
    fn read_section(&self, account_id: &str) -> Result<Option<Section>> {
        Ok(self.read_document()?.section(account_id).cloned())
    }

    /// Merges `values` into the section; keys not in `values` and all
    /// other sections are kept.  The file is replaced atomically.
    ///
    /// An existing file that does not parse is moved aside to
    /// `accounts.cfg.corrupt-<n>` and replaced by a fresh one.
    fn write_section(&self, account_id: &str, values: &Section) -> Result<()> {
        ini::validate_section_name(account_id).map_err(SupassError::StorageError)?;
        for (key, value) in values.iter() {
            ini::validate_key(key).map_err(SupassError::StorageError)?;
            ini::validate_value(key, value).map_err(SupassError::StorageError)?;
        }

        let _lock = DirLock::acquire(&self.dir)?;

        let path = self.accounts_path();
        let mut doc = match fs::read_to_string(&path) {
            Ok(contents) => match IniDocument::parse(&contents) {
                Ok(doc) => doc,
                Err(err) => {
                    let moved_to = set_aside(&path)?;
                    warn!(
                        path = %path.display(),
                        moved_to = %moved_to.display(),
                        error = %err,
                        "account file is unreadable, starting a new one"
                    );
                    IniDocument::new()
                }
            },
            Err(e) if e.kind() == ErrorKind::NotFound => IniDocument::new(),
            Err(e) => return Err(SupassError::storage(&path, e)),
        };
        let section = doc.section_mut(account_id);
        for (key, value) in values.iter() {
            section.set(key, value);
        }

        write_atomic(&path, doc.render().as_bytes())
    }
}

// ---------------------------------------------------------------------------
// Filesystem helpers
// ---------------------------------------------------------------------------

/// Create `dir` (and any missing parents) with owner-only access.
fn create_private_dir(dir: &Path) -> Result<()> {
    let mut builder = fs::DirBuilder::new();
    builder.recursive(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::DirBuilderExt;
        builder.mode(0o700);
    }
    builder
        .create(dir)
        .map_err(|e| SupassError::storage(dir, format!("cannot create directory: {e}")))?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(dir, fs::Permissions::from_mode(0o700))
            .map_err(|e| SupassError::storage(dir, e))?;
    }
    Ok(())
}

/// Force owner-only read/write on `path`, regardless of umask.
fn restrict_file(path: &Path) -> Result<()> {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(path, fs::Permissions::from_mode(0o600))
            .map_err(|e| SupassError::storage(path, e))?;
    }
    #[cfg(not(unix))]
    let _ = path;
    Ok(())
}

/// Rename `path` to the first free `<name>.corrupt-<n>` beside it.
fn set_aside(path: &Path) -> Result<PathBuf> {
    let name = path.file_name().unwrap_or_default().to_string_lossy();
    let target = (1..)
        .map(|n| path.with_file_name(format!("{name}.corrupt-{n}")))
        .find(|candidate| !candidate.exists())
        .ok_or_else(|| SupassError::storage(path, "no free name to set the file aside"))?;

    fs::rename(path, &target).map_err(|e| SupassError::storage(path, e))?;
    Ok(target)
}

/// Write `data` to `path` atomically with owner-only permissions.
///
/// The temp file lives in the same directory so the rename stays on one
/// filesystem and readers never observe a half-written file.
fn write_atomic(path: &Path, data: &[u8]) -> Result<()> {
    let parent = path.parent().unwrap_or(Path::new("."));
    let tmp_path = parent.join(format!(
        ".{}.tmp",
        path.file_name().unwrap_or_default().to_string_lossy()
    ));

    let mut options = OpenOptions::new();
    options.write(true).create(true).truncate(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }

    let write = || -> std::io::Result<()> {
        let mut file = options.open(&tmp_path)?;
        file.write_all(data)?;
        file.sync_all()
    };
    if let Err(e) = write() {
        let _ = fs::remove_file(&tmp_path);
        return Err(SupassError::storage(&tmp_path, e));
    }

    restrict_file(&tmp_path)?;
    fs::rename(&tmp_path, path).map_err(|e| SupassError::storage(path, e))
}
