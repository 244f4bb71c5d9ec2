//! Import engine for OTP credential backups.
//!
//! A backup file is read once into a [`ByteSource`] and offered to every
//! registered [`FormatCandidate`] in order until one parses it:
//! - `AuthVault` vault files, plaintext or encrypted
//! - FreeOTP shared-preferences XML
//! - andOTP plaintext JSON
//! - lists of `otpauth://` URIs
//!
//! Plain backups are converted and merged right away. Encrypted ones
//! suspend the import and hand back a [`SuspendedHandle`]; the caller
//! supplies a [`Credential`] through [`ImportCoordinator::resume`] or lets
//! [`resolve_with_prompt`] drive a [`CredentialPrompt`] until the import
//! finishes.
//!
//! ```ignore
//! let mut coordinator = ImportCoordinator::new(VaultMergeSink::new(store, vault));
//! let source = ByteSource::from_path(&path, DEFAULT_MAX_IMPORT_SIZE)?;
//!
//! match coordinator.begin_import(source)? {
//!     ImportProgress::Finished(outcome) => println!("{outcome}"),
//!     ImportProgress::Suspended(handle) => {
//!         let outcome = resolve_with_prompt(&mut coordinator, &handle, &prompt).await?;
//!         if outcome == ImportOutcome::Cancelled {
//!             coordinator.abandon(&handle);
//!         }
//!         println!("{outcome}");
//!     }
//! }
//! ```
//!
//! A suspended import can also be frozen into a [`FrozenImport`], persisted,
//! and thawed later by a different coordinator.

mod andotp;
mod coordinator;
mod credential;
mod freeotp;
mod merge;
mod native;
mod otpauth;
mod outcome;
mod pending;
mod registry;
mod source;
mod traits;

pub use andotp::AndOtpCandidate;
pub use coordinator::ImportCoordinator;
pub use credential::{
    Credential, CredentialKind, CredentialPrompt, CredentialResponse, CredentialSlot,
    resolve_with_prompt,
};
pub use freeotp::FreeOtpCandidate;
pub use merge::{MemorySink, MergeError, MergeSink, VaultMergeSink};
pub use native::VaultCandidate;
pub use otpauth::OtpAuthCandidate;
pub use outcome::{ImportOutcome, ImportProgress};
pub use pending::{FrozenImport, SuspendedHandle};
pub use registry::CandidateRegistry;
pub use source::{ByteSource, DEFAULT_MAX_IMPORT_SIZE};
pub use traits::{
    CandidateFailure, ConversionError, CredentialRejected, FormatCandidate, FormatParseError,
    ParseErrorKind, Parsed,
};
