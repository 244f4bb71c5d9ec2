//! Vault persistence.

use std::fs;
use std::path::{Path, PathBuf};

use secrecy::SecretString;

use crate::error::{VaultError, VaultResult};
use crate::import::Credential;

use super::crypto::{KdfParams, MasterKey, PasswordSlot, Slot};
use super::file::{Vault, VaultFile};

/// Unlocked key material of an encrypted store
#[derive(Debug)]
struct StoreEncryption {
    key: MasterKey,
    slots: Vec<Slot>,
}

/// Reads and writes the vault file at a fixed path.
///
/// An encrypted store keeps the unlocked master key for its lifetime so that
/// every save re-encrypts the database with fresh nonces.
#[derive(Debug)]
pub struct VaultStore {
    path: PathBuf,
    encryption: Option<StoreEncryption>,
}

impl VaultStore {
    /// Creates a new plaintext vault file at `path`
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written.
    pub fn create_plain(path: impl Into<PathBuf>) -> VaultResult<(Self, Vault)> {
        let store = Self {
            path: path.into(),
            encryption: None,
        };
        let vault = Vault::new();
        store.save(&vault)?;
        Ok((store, vault))
    }

    /// Creates a new vault file at `path` protected by `password`
    ///
    /// # Errors
    ///
    /// Returns an error if key generation, encryption or writing fails.
    pub fn create_encrypted(
        path: impl Into<PathBuf>,
        password: &SecretString,
        kdf: KdfParams,
    ) -> VaultResult<(Self, Vault)> {
        let key = MasterKey::generate()?;
        let slot = PasswordSlot::create(&key, password, kdf)?;
        let store = Self {
            path: path.into(),
            encryption: Some(StoreEncryption {
                key,
                slots: vec![Slot::Password(slot)],
            }),
        };
        let vault = Vault::new();
        store.save(&vault)?;
        Ok((store, vault))
    }

    /// Opens an existing vault file.
    ///
    /// Encrypted vaults need a credential; plaintext vaults ignore it.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed, or if the
    /// credential is missing or wrong.
    pub fn open(
        path: impl Into<PathBuf>,
        credential: Option<&Credential>,
    ) -> VaultResult<(Self, Vault)> {
        let path = path.into();
        let bytes = fs::read(&path).map_err(|e| VaultError::Io {
            path: path.clone(),
            reason: e.to_string(),
        })?;
        let file = VaultFile::from_slice(&bytes)?;

        if !file.is_encrypted() {
            let vault = file.open(None)?;
            return Ok((
                Self {
                    path,
                    encryption: None,
                },
                vault,
            ));
        }

        let key = match credential.ok_or(VaultError::CredentialRequired)? {
            Credential::Password(password) => file.unlock(password)?,
            Credential::MasterKey(key) => key.duplicate(),
        };
        let vault = file.open(Some(&key))?;

        tracing::debug!(path = %path.display(), entries = vault.len(), "Opened encrypted vault");
        Ok((
            Self {
                path,
                encryption: Some(StoreEncryption {
                    key,
                    slots: file.slots().to_vec(),
                }),
            },
            vault,
        ))
    }

    /// Writes `vault` to disk.
    ///
    /// The file is written next to the target and renamed into place, so a
    /// failed save leaves the previous file intact.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization, encryption or any I/O step fails.
    pub fn save(&self, vault: &Vault) -> VaultResult<()> {
        let _span = tracing::debug_span!(
            crate::tracing::span_names::VAULT_SAVE,
            path = %self.path.display()
        )
        .entered();

        let file = match &self.encryption {
            Some(enc) => VaultFile::seal(vault, &enc.key, enc.slots.clone())?,
            None => VaultFile::plain(vault.clone()),
        };
        let bytes = file.to_bytes()?;

        let io_err = |e: std::io::Error| VaultError::Io {
            path: self.path.clone(),
            reason: e.to_string(),
        };

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(io_err)?;
        }

        let tmp_path = self.temp_path();
        fs::write(&tmp_path, &bytes).map_err(io_err)?;
        if let Err(e) = fs::rename(&tmp_path, &self.path) {
            let _ = fs::remove_file(&tmp_path);
            return Err(io_err(e));
        }

        tracing::debug!(
            path = %self.path.display(),
            entries = vault.len(),
            encrypted = self.is_encrypted(),
            "Vault saved"
        );
        Ok(())
    }

    /// Returns the vault file path
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns true if the vault is encrypted
    #[must_use]
    pub const fn is_encrypted(&self) -> bool {
        self.encryption.is_some()
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(std::ffi::OsStr::to_os_string)
            .unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}
