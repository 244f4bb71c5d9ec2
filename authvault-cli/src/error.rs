//! CLI error types and exit codes.

use authvault_core::error::{AuthVaultError, ConfigError, ImportError, VaultError};

/// Exit codes for CLI operations
pub mod exit_codes {
    /// General error - configuration, vault access, or any other failure
    pub const GENERAL_ERROR: i32 = 1;
    /// The import produced no entries: no format matched, the file could not
    /// be parsed, or the credentials were refused
    pub const IMPORT_FAILURE: i32 = 2;
}

/// CLI error type
#[derive(Debug, thiserror::Error)]
pub enum CliError {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Vault access error
    #[error("Vault error: {0}")]
    Vault(String),

    /// Import could not run (file missing, unknown deferred import, ...)
    #[error("Import error: {0}")]
    Import(String),

    /// Import ran but nothing was imported
    #[error("Import failed: {0}")]
    NothingImported(String),

    /// Deferred import not found
    #[error("Deferred import not found: {0}")]
    PendingNotFound(uuid::Uuid),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<AuthVaultError> for CliError {
    fn from(err: AuthVaultError) -> Self {
        match err {
            AuthVaultError::Config(e) => e.into(),
            AuthVaultError::Import(e) => e.into(),
            AuthVaultError::Vault(e) => e.into(),
            AuthVaultError::Io(e) => Self::Io(e),
        }
    }
}

impl From<ConfigError> for CliError {
    fn from(err: ConfigError) -> Self {
        Self::Config(err.to_string())
    }
}

impl From<VaultError> for CliError {
    fn from(err: VaultError) -> Self {
        Self::Vault(err.to_string())
    }
}

impl From<ImportError> for CliError {
    fn from(err: ImportError) -> Self {
        Self::Import(err.to_string())
    }
}

impl CliError {
    /// Returns the appropriate exit code for this error type.
    ///
    /// Exit codes:
    /// - 0: Success (not an error)
    /// - 1: General error
    /// - 2: Import produced no entries
    #[must_use]
    pub const fn exit_code(&self) -> i32 {
        match self {
            Self::NothingImported(_) => exit_codes::IMPORT_FAILURE,
            Self::Config(_)
            | Self::Vault(_)
            | Self::Import(_)
            | Self::PendingNotFound(_)
            | Self::Io(_) => exit_codes::GENERAL_ERROR,
        }
    }
}
