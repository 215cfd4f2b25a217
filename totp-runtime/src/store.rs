//! Single-slot seed storage.
//!
//! The slot holds at most one [`Secret`]; every successful provisioning
//! replaces it wholesale. Readers see either the previous or the new seed,
//! never a mix of the two.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::RwLock;

use crate::error::{Result, TotpError};
use crate::secret::Secret;

/// Atomic-replace, single-slot storage for the provisioned seed.
pub trait SecretStore: Send + Sync {
    /// Replace the stored seed.
    fn put(&self, secret: Secret) -> Result<()>;

    /// The stored seed, if one has been provisioned.
    fn get(&self) -> Result<Option<Secret>>;
}

/// Process-memory slot. Lost on restart.
#[derive(Default)]
pub struct MemorySecretStore {
    slot: RwLock<Option<Secret>>,
}

impl MemorySecretStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SecretStore for MemorySecretStore {
    fn put(&self, secret: Secret) -> Result<()> {
        *self.slot.write().unwrap_or_else(|e| e.into_inner()) = Some(secret);
        Ok(())
    }

    fn get(&self) -> Result<Option<Secret>> {
        Ok(self.slot.read().unwrap_or_else(|e| e.into_inner()).clone())
    }
}

/// File-backed slot (`/data/seed.txt` in a container deployment).
///
/// Writes go to a uniquely named sibling temp file that is synced and renamed
/// over the target, so a reader in this or another process never observes a partial
/// seed. The lock serialises writers against readers within this process.
pub struct FileSecretStore {
    path: PathBuf,
    lock: RwLock<()>,
}

impl FileSecretStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: RwLock::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Create `dir` if missing, readable only by the owner.
fn ensure_private_dir(dir: &Path) -> Result<()> {
    if dir.as_os_str().is_empty() || dir.exists() {
        return Ok(());
    }
    fs::create_dir_all(dir)
        .map_err(|e| TotpError::Storage(format!("creating {}: {e}", dir.display())))?;
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(dir, fs::Permissions::from_mode(0o700)).ok();
    }
    Ok(())
}

impl SecretStore for FileSecretStore {
    fn put(&self, secret: Secret) -> Result<()> {
        let _guard = self.lock.write().unwrap_or_else(|e| e.into_inner());

        let parent = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        ensure_private_dir(parent)?;
        let write = || -> std::io::Result<()> {
            // Unique name per writer, created 0600; another process writing
            // the same slot gets its own temp file.
            let mut tmp = tempfile::NamedTempFile::new_in(parent)?;
            tmp.write_all(secret.expose_hex().as_bytes())?;
            tmp.as_file().sync_all()?;
            tmp.persist(&self.path).map_err(|e| e.error)?;
            Ok(())
        };

        write().map_err(|e| TotpError::Storage(format!("writing {}: {e}", self.path.display())))?;

        tracing::debug!(path = %self.path.display(), "Seed written");
        Ok(())
    }

    fn get(&self) -> Result<Option<Secret>> {
        let _guard = self.lock.read().unwrap_or_else(|e| e.into_inner());

        let contents = match fs::read_to_string(&self.path) {
            Ok(contents) => zeroize::Zeroizing::new(contents),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(TotpError::Storage(format!(
                    "reading {}: {e}",
                    self.path.display()
                )));
            }
        };

        let hex = contents.trim();
        if hex.is_empty() {
            return Ok(None);
        }
        Secret::from_hex(hex).map(Some).map_err(|_| {
            TotpError::Storage(format!("{} does not hold a valid seed", self.path.display()))
        })
    }
}
