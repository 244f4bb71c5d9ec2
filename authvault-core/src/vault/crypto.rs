//! Vault encryption primitives.
//!
//! The vault payload is sealed with AES-256-GCM under a random master key.
//! Password slots wrap that master key with a key derived from the password
//! using Argon2id, so several passwords can unlock the same vault.

use std::fmt;

use ring::aead::{AES_256_GCM, Aad, LessSafeKey, Nonce, UnboundKey};
use ring::rand::{SecureRandom, SystemRandom};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use zeroize::Zeroizing;

use crate::error::{VaultError, VaultResult};

/// Master key length in bytes
pub const KEY_LEN: usize = 32;

/// AES-GCM nonce length in bytes
pub const NONCE_LEN: usize = 12;

/// AES-GCM tag length in bytes
pub const TAG_LEN: usize = 16;

/// Salt length for password slots
const SALT_LEN: usize = 32;

/// Hex (de)serialization for byte fields
mod hex_bytes {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&hex::encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        hex::decode(encoded).map_err(serde::de::Error::custom)
    }
}

/// The key that seals the vault payload
pub struct MasterKey(Zeroizing<[u8; KEY_LEN]>);

impl MasterKey {
    /// Generates a new random master key
    ///
    /// # Errors
    ///
    /// Returns an error if the system RNG fails.
    pub fn generate() -> VaultResult<Self> {
        let mut key = Zeroizing::new([0u8; KEY_LEN]);
        SystemRandom::new()
            .fill(&mut key[..])
            .map_err(|_| VaultError::Encryption("Failed to generate master key".to_string()))?;
        Ok(Self(key))
    }

    /// Wraps existing key bytes
    #[must_use]
    pub fn from_bytes(bytes: [u8; KEY_LEN]) -> Self {
        Self(Zeroizing::new(bytes))
    }

    /// Parses a key from a slice
    ///
    /// # Errors
    ///
    /// Returns an error if the slice is not exactly [`KEY_LEN`] bytes.
    pub fn from_slice(bytes: &[u8]) -> VaultResult<Self> {
        let array: [u8; KEY_LEN] = bytes
            .try_into()
            .map_err(|_| VaultError::Encryption(format!("Master key must be {KEY_LEN} bytes")))?;
        Ok(Self::from_bytes(array))
    }

    /// Returns the raw key bytes
    #[must_use]
    pub fn as_bytes(&self) -> &[u8; KEY_LEN] {
        &self.0
    }

    /// Encrypts `plaintext`, returning the ciphertext and its parameters
    ///
    /// # Errors
    ///
    /// Returns an error if nonce generation or sealing fails.
    pub fn encrypt(&self, plaintext: &[u8]) -> VaultResult<(Vec<u8>, CryptParams)> {
        seal(self.as_bytes(), plaintext)
    }

    /// Decrypts `ciphertext` sealed by [`MasterKey::encrypt`].
    ///
    /// # Errors
    ///
    /// Returns [`VaultError::InvalidCredential`] if authentication fails,
    /// which means the key does not belong to this payload.
    pub fn decrypt(
        &self,
        ciphertext: &[u8],
        params: &CryptParams,
    ) -> VaultResult<Zeroizing<Vec<u8>>> {
        open(self.as_bytes(), ciphertext, params)
    }

    /// Duplicates the key
    #[must_use]
    pub fn duplicate(&self) -> Self {
        Self::from_bytes(*self.0)
    }
}

impl fmt::Debug for MasterKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("MasterKey([REDACTED])")
    }
}

/// Nonce and authentication tag of a sealed blob
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CryptParams {
    /// AES-GCM nonce
    #[serde(with = "hex_bytes")]
    pub nonce: Vec<u8>,
    /// AES-GCM authentication tag
    #[serde(with = "hex_bytes")]
    pub tag: Vec<u8>,
}

/// Argon2id cost parameters stored with each password slot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct KdfParams {
    /// Memory cost in KiB
    pub m_cost: u32,
    /// Iterations
    pub t_cost: u32,
    /// Parallelism
    pub p_cost: u32,
}

impl KdfParams {
    /// Creates custom parameters
    #[must_use]
    pub const fn new(m_cost: u32, t_cost: u32, p_cost: u32) -> Self {
        Self {
            m_cost,
            t_cost,
            p_cost,
        }
    }

    /// Cheap parameters for tests and throwaway vaults
    #[must_use]
    pub const fn light() -> Self {
        Self::new(1024, 1, 1)
    }

    fn derive(&self, password: &SecretString, salt: &[u8]) -> VaultResult<Zeroizing<[u8; KEY_LEN]>> {
        use argon2::{Algorithm, Argon2, Params, Version};

        let params = Params::new(self.m_cost, self.t_cost, self.p_cost, Some(KEY_LEN))
            .map_err(|e| VaultError::Encryption(format!("Invalid Argon2 params: {e}")))?;
        let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, params);

        let mut key = Zeroizing::new([0u8; KEY_LEN]);
        argon2
            .hash_password_into(password.expose_secret().as_bytes(), salt, &mut key[..])
            .map_err(|e| VaultError::Encryption(format!("Key derivation failed: {e}")))?;
        Ok(key)
    }
}

impl Default for KdfParams {
    fn default() -> Self {
        Self::new(65536, 3, 4)
    }
}

/// A slot holding the master key wrapped under a password-derived key
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PasswordSlot {
    /// Slot identifier
    pub uuid: Uuid,
    /// Argon2id salt
    #[serde(with = "hex_bytes")]
    pub salt: Vec<u8>,
    /// Argon2id costs
    #[serde(flatten)]
    pub kdf: KdfParams,
    /// Wrapped master key
    #[serde(with = "hex_bytes")]
    pub key: Vec<u8>,
    /// Parameters of the wrapped master key
    pub key_params: CryptParams,
}

impl PasswordSlot {
    /// Wraps `master` under `password`
    ///
    /// # Errors
    ///
    /// Returns an error if salt generation, key derivation or sealing fails.
    pub fn create(master: &MasterKey, password: &SecretString, kdf: KdfParams) -> VaultResult<Self> {
        let mut salt = vec![0u8; SALT_LEN];
        SystemRandom::new()
            .fill(&mut salt)
            .map_err(|_| VaultError::Encryption("Failed to generate salt".to_string()))?;

        let derived = kdf.derive(password, &salt)?;
        let (key, key_params) = seal(&derived, master.as_bytes())?;

        Ok(Self {
            uuid: Uuid::new_v4(),
            salt,
            kdf,
            key,
            key_params,
        })
    }

    /// Recovers the master key with `password`
    ///
    /// # Errors
    ///
    /// Returns [`VaultError::InvalidCredential`] if the password is wrong.
    pub fn unlock(&self, password: &SecretString) -> VaultResult<MasterKey> {
        let derived = self.kdf.derive(password, &self.salt)?;
        let raw = open(&derived, &self.key, &self.key_params)?;
        MasterKey::from_slice(&raw)
    }
}

/// Key slot stored in the vault header
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Slot {
    /// Password-protected slot
    Password(PasswordSlot),
}

impl Slot {
    /// Returns the slot identifier
    #[must_use]
    pub const fn uuid(&self) -> Uuid {
        match self {
            Self::Password(slot) => slot.uuid,
        }
    }
}

fn seal(key: &[u8; KEY_LEN], plaintext: &[u8]) -> VaultResult<(Vec<u8>, CryptParams)> {
    let mut nonce_bytes = [0u8; NONCE_LEN];
    SystemRandom::new()
        .fill(&mut nonce_bytes)
        .map_err(|_| VaultError::Encryption("Failed to generate nonce".to_string()))?;

    let unbound = UnboundKey::new(&AES_256_GCM, key)
        .map_err(|_| VaultError::Encryption("Failed to create key".to_string()))?;
    let sealing_key = LessSafeKey::new(unbound);

    let mut ciphertext = plaintext.to_vec();
    let tag = sealing_key
        .seal_in_place_separate_tag(
            Nonce::assume_unique_for_key(nonce_bytes),
            Aad::empty(),
            &mut ciphertext,
        )
        .map_err(|_| VaultError::Encryption("Encryption failed".to_string()))?;

    Ok((
        ciphertext,
        CryptParams {
            nonce: nonce_bytes.to_vec(),
            tag: tag.as_ref().to_vec(),
        },
    ))
}

fn open(
    key: &[u8; KEY_LEN],
    ciphertext: &[u8],
    params: &CryptParams,
) -> VaultResult<Zeroizing<Vec<u8>>> {
    let nonce_bytes: [u8; NONCE_LEN] = params
        .nonce
        .as_slice()
        .try_into()
        .map_err(|_| VaultError::Encryption(format!("Nonce must be {NONCE_LEN} bytes")))?;
    if params.tag.len() != TAG_LEN {
        return Err(VaultError::Encryption(format!("Tag must be {TAG_LEN} bytes")));
    }

    let unbound = UnboundKey::new(&AES_256_GCM, key)
        .map_err(|_| VaultError::Encryption("Failed to create key".to_string()))?;
    let opening_key = LessSafeKey::new(unbound);

    let mut buffer = Zeroizing::new(Vec::with_capacity(ciphertext.len() + TAG_LEN));
    buffer.extend_from_slice(ciphertext);
    buffer.extend_from_slice(&params.tag);

    let plaintext_len = opening_key
        .open_in_place(
            Nonce::assume_unique_for_key(nonce_bytes),
            Aad::empty(),
            buffer.as_mut_slice(),
        )
        .map_err(|_| VaultError::InvalidCredential)?
        .len();
    buffer.truncate(plaintext_len);

    Ok(buffer)
}
