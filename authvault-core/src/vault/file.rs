//! On-disk vault file format.
//!
//! ```json
//! {
//!   "version": 1,
//!   "header": { "slots": [..] | null, "params": { "nonce": "..", "tag": ".." } | null },
//!   "db": { "version": 1, "entries": [..] }  |  "<hex ciphertext>"
//! }
//! ```
//!
//! The header is always plaintext. When the vault is encrypted `db` holds the
//! hex-encoded AES-256-GCM ciphertext of the serialized database.

use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use zeroize::Zeroizing;

use crate::error::{VaultError, VaultResult};
use crate::models::VaultEntry;

use super::crypto::{CryptParams, MasterKey, Slot};

/// Current version of the vault file envelope
pub const VAULT_FORMAT_VERSION: u32 = 1;

/// Current version of the vault database
pub const VAULT_DB_VERSION: u32 = 1;

/// The vault database: every stored credential
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vault {
    /// Database version
    pub version: u32,
    /// Stored entries in insertion order
    #[serde(default)]
    pub entries: Vec<VaultEntry>,
}

impl Vault {
    /// Creates an empty vault
    #[must_use]
    pub fn new() -> Self {
        Self {
            version: VAULT_DB_VERSION,
            entries: Vec::new(),
        }
    }

    /// Appends an entry
    pub fn add_entry(&mut self, entry: VaultEntry) {
        self.entries.push(entry);
    }

    /// Returns the number of entries
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if the vault has no entries
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Parses a serialized database
    ///
    /// # Errors
    ///
    /// Returns an error if the JSON is invalid or the version is too new.
    pub fn from_slice(bytes: &[u8]) -> VaultResult<Self> {
        let vault: Self =
            serde_json::from_slice(bytes).map_err(|e| VaultError::Parse(e.to_string()))?;
        if vault.version > VAULT_DB_VERSION {
            return Err(VaultError::UnsupportedVersion(vault.version));
        }
        Ok(vault)
    }

    fn to_bytes(&self) -> VaultResult<Zeroizing<Vec<u8>>> {
        serde_json::to_vec(self)
            .map(Zeroizing::new)
            .map_err(|e| VaultError::Serialize(e.to_string()))
    }
}

impl Default for Vault {
    fn default() -> Self {
        Self::new()
    }
}

/// Plaintext header of a vault file
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct VaultHeader {
    /// Key slots, present only for encrypted vaults
    pub slots: Option<Vec<Slot>>,
    /// Payload encryption parameters, present only for encrypted vaults
    pub params: Option<CryptParams>,
}

impl VaultHeader {
    /// Returns true if the header describes an encrypted payload
    #[must_use]
    pub fn is_encrypted(&self) -> bool {
        self.slots.is_some() && self.params.is_some()
    }
}

/// Database section of a vault file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum VaultPayload {
    /// Hex-encoded ciphertext
    Encrypted(String),
    /// Plaintext database
    Plain(Vault),
}

/// A complete vault file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VaultFile {
    /// Envelope version
    pub version: u32,
    /// Plaintext header
    pub header: VaultHeader,
    /// Database, possibly encrypted
    pub db: VaultPayload,
}

impl VaultFile {
    /// Wraps a plaintext vault
    #[must_use]
    pub fn plain(vault: Vault) -> Self {
        Self {
            version: VAULT_FORMAT_VERSION,
            header: VaultHeader::default(),
            db: VaultPayload::Plain(vault),
        }
    }

    /// Encrypts `vault` under `key` and records `slots` in the header
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or encryption fails.
    pub fn seal(vault: &Vault, key: &MasterKey, slots: Vec<Slot>) -> VaultResult<Self> {
        let plaintext = vault.to_bytes()?;
        let (ciphertext, params) = key.encrypt(&plaintext)?;
        Ok(Self {
            version: VAULT_FORMAT_VERSION,
            header: VaultHeader {
                slots: Some(slots),
                params: Some(params),
            },
            db: VaultPayload::Encrypted(hex::encode(ciphertext)),
        })
    }

    /// Parses a vault file
    ///
    /// # Errors
    ///
    /// Returns an error if the JSON is invalid, the version is too new, or
    /// an encrypted payload lacks its header fields.
    pub fn from_slice(bytes: &[u8]) -> VaultResult<Self> {
        let file: Self =
            serde_json::from_slice(bytes).map_err(|e| VaultError::Parse(e.to_string()))?;
        file.validate()?;
        Ok(file)
    }

    /// Checks the envelope version and header consistency
    ///
    /// # Errors
    ///
    /// Returns an error describing the first inconsistency found.
    pub fn validate(&self) -> VaultResult<()> {
        if self.version > VAULT_FORMAT_VERSION {
            return Err(VaultError::UnsupportedVersion(self.version));
        }
        match &self.db {
            VaultPayload::Encrypted(_) if !self.header.is_encrypted() => Err(VaultError::Parse(
                "encrypted payload without slots or params".to_string(),
            )),
            VaultPayload::Encrypted(_)
                if self.header.slots.as_ref().is_some_and(Vec::is_empty) =>
            {
                Err(VaultError::Parse("encrypted vault has no key slots".to_string()))
            }
            VaultPayload::Plain(vault) if vault.version > VAULT_DB_VERSION => {
                Err(VaultError::UnsupportedVersion(vault.version))
            }
            _ => Ok(()),
        }
    }

    /// Serializes the file
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_bytes(&self) -> VaultResult<Vec<u8>> {
        serde_json::to_vec_pretty(self).map_err(|e| VaultError::Serialize(e.to_string()))
    }

    /// Returns true if the payload is encrypted
    #[must_use]
    pub const fn is_encrypted(&self) -> bool {
        matches!(self.db, VaultPayload::Encrypted(_))
    }

    /// Returns the key slots (empty for plaintext vaults)
    #[must_use]
    pub fn slots(&self) -> &[Slot] {
        self.header.slots.as_deref().unwrap_or_default()
    }

    /// Tries every password slot and returns the first master key it unlocks
    ///
    /// # Errors
    ///
    /// Returns [`VaultError::InvalidCredential`] if no slot accepts the password.
    pub fn unlock(&self, password: &SecretString) -> VaultResult<MasterKey> {
        for slot in self.slots() {
            let Slot::Password(slot) = slot;
            match slot.unlock(password) {
                Ok(key) => return Ok(key),
                Err(VaultError::InvalidCredential) => {}
                Err(e) => return Err(e),
            }
        }
        Err(VaultError::InvalidCredential)
    }

    /// Decrypts the payload bytes without parsing them
    ///
    /// # Errors
    ///
    /// Returns [`VaultError::InvalidCredential`] if `key` is wrong.
    pub fn decrypt_payload(&self, key: &MasterKey) -> VaultResult<Zeroizing<Vec<u8>>> {
        match (&self.db, &self.header.params) {
            (VaultPayload::Encrypted(encoded), Some(params)) => {
                let ciphertext = hex::decode(encoded)
                    .map_err(|e| VaultError::Parse(format!("invalid ciphertext encoding: {e}")))?;
                key.decrypt(&ciphertext, params)
            }
            (VaultPayload::Encrypted(_), None) => {
                Err(VaultError::Parse("missing encryption params".to_string()))
            }
            (VaultPayload::Plain(_), _) => Err(VaultError::Encryption(
                "vault payload is not encrypted".to_string(),
            )),
        }
    }

    /// Returns the database, decrypting it with `key` when needed
    ///
    /// # Errors
    ///
    /// Returns an error if a key is required but missing or wrong, or if the
    /// decrypted payload is not a valid database.
    pub fn open(&self, key: Option<&MasterKey>) -> VaultResult<Vault> {
        match &self.db {
            VaultPayload::Plain(vault) => Ok(vault.clone()),
            VaultPayload::Encrypted(_) => {
                let key = key.ok_or(VaultError::CredentialRequired)?;
                let plaintext = self.decrypt_payload(key)?;
                Vault::from_slice(&plaintext)
            }
        }
    }
}
