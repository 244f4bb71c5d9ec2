//! `AuthVault` Core Library
//!
//! This crate provides the core functionality for the `AuthVault` OTP
//! credential store: the vault file format, settings persistence and the
//! backup import engine.
//!
//! # Crate Structure
//!
//! - [`models`] - Credential records and OTP parameters
//! - [`vault`] - Vault file format, encryption and storage
//! - [`import`] - Format detection, suspended imports and merging
//! - [`config`] - Application settings and deferred-import persistence
//! - [`tracing`] - Structured logging setup

// Enable missing_docs warning for public API documentation
#![warn(missing_docs)]

pub mod config;
pub mod error;
pub mod import;
pub mod models;
pub mod tracing;
pub mod vault;

// =============================================================================
// Convenience re-exports
// =============================================================================

pub use config::{AppSettings, ConfigManager, ImportSettings, LoggingSettings, VaultSettings};
pub use error::{AuthVaultError, ConfigError, ConfigResult, ImportError, VaultError, VaultResult};
pub use import::{
    ByteSource, CandidateRegistry, Credential, CredentialPrompt, CredentialResponse,
    CredentialSlot, FormatCandidate, FrozenImport, ImportCoordinator, ImportOutcome,
    ImportProgress, MergeSink, SuspendedHandle, VaultMergeSink, resolve_with_prompt,
};
pub use models::{HashAlgorithm, ImportableEntry, OtpKind, OtpParams, OtpSecret, VaultEntry};
pub use self::tracing::{
    TracingConfig, TracingError, TracingLevel, TracingOutput, TracingResult, init_tracing,
    is_tracing_initialized, span_names,
};
pub use vault::{KdfParams, MasterKey, Vault, VaultFile, VaultStore};
