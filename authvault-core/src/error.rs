//! Error types for `AuthVault`.
//!
//! Each subsystem has its own error enum; [`AuthVaultError`] wraps them for
//! callers that do not care which layer failed.

use std::path::PathBuf;

use thiserror::Error;
use uuid::Uuid;

/// Top-level error type for the core library
#[derive(Debug, Error)]
pub enum AuthVaultError {
    /// Configuration error
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Import error
    #[error(transparent)]
    Import(#[from] ImportError),

    /// Vault storage error
    #[error(transparent)]
    Vault(#[from] VaultError),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors raised by the import engine outside of the per-attempt outcome.
///
/// Format mismatches, wrong passwords and merge failures are reported through
/// [`crate::import::ImportOutcome`]; this type covers file acquisition and
/// misuse of the coordinator.
#[derive(Debug, Error)]
pub enum ImportError {
    /// The file to import does not exist
    #[error("File not found: {0}")]
    FileNotFound(PathBuf),

    /// The file exists but could not be read
    #[error("Failed to read {path}: {reason}")]
    ReadError {
        /// Path of the file
        path: PathBuf,
        /// Underlying reason
        reason: String,
    },

    /// The file exceeds the configured import size limit
    #[error("File is too large to import ({size} bytes, limit {limit})")]
    FileTooLarge {
        /// Size of the file in bytes
        size: u64,
        /// Configured limit in bytes
        limit: u64,
    },

    /// Another import is suspended waiting for credentials
    #[error("An import is already waiting for credentials ({0})")]
    ImportPending(Uuid),

    /// The handle does not refer to the pending import
    #[error("Import handle {0} is no longer valid")]
    InvalidHandle(Uuid),

    /// No registered format has the given identifier
    #[error("Unknown import format: {0}")]
    UnknownFormat(String),

    /// A deferred import could not be restored
    #[error("Deferred import {id} is corrupt: {reason}")]
    CorruptPending {
        /// Identifier of the deferred import
        id: Uuid,
        /// Why it could not be restored
        reason: String,
    },
}

/// Errors raised while reading or writing the vault file
#[derive(Debug, Error)]
pub enum VaultError {
    /// Failed to parse the vault file
    #[error("Failed to parse vault: {0}")]
    Parse(String),

    /// Failed to serialize the vault
    #[error("Failed to serialize vault: {0}")]
    Serialize(String),

    /// I/O error while accessing the vault file
    #[error("Vault I/O error at {path}: {reason}")]
    Io {
        /// Path of the vault file
        path: PathBuf,
        /// Underlying reason
        reason: String,
    },

    /// Encryption or decryption failure
    #[error("Encryption error: {0}")]
    Encryption(String),

    /// The supplied credential does not unlock the vault
    #[error("Invalid password or key")]
    InvalidCredential,

    /// The vault is encrypted but no credential was supplied
    #[error("Vault is encrypted, credential required")]
    CredentialRequired,

    /// The vault was written by a newer version
    #[error("Unsupported vault version: {0}")]
    UnsupportedVersion(u32),
}

/// Errors raised while loading or saving settings
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to parse a configuration file
    #[error("Failed to parse {path}: {reason}")]
    Parse {
        /// Path of the file
        path: PathBuf,
        /// Underlying reason
        reason: String,
    },

    /// Failed to serialize configuration
    #[error("Failed to serialize configuration: {0}")]
    Serialize(String),

    /// Failed to write a configuration file
    #[error("Failed to write {path}: {reason}")]
    Write {
        /// Path of the file
        path: PathBuf,
        /// Underlying reason
        reason: String,
    },

    /// No configuration directory could be determined
    #[error("Could not determine configuration directory")]
    NoConfigDir,

    /// A deferred import record was not found
    #[error("Deferred import not found: {0}")]
    PendingNotFound(String),
}

/// Result type for vault operations
pub type VaultResult<T> = std::result::Result<T, VaultError>;

/// Result type for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;
