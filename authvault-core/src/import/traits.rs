//! Format candidate trait and per-candidate result types.
//!
//! Every supported backup format implements [`FormatCandidate`]. A candidate
//! is built fresh for each import attempt and moves through
//! `unparsed -> parsed -> converted`, or `unparsed -> failed`. Failures are
//! plain values so the coordinator can move on to the next format.

use std::fmt;

use thiserror::Error;

use crate::models::ImportableEntry;

use super::credential::{Credential, CredentialSlot};
use super::source::ByteSource;

/// Why a candidate did not accept the input
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParseErrorKind {
    /// The bytes do not carry this format's signature
    NotRecognized,
    /// The signature matched but the content is invalid
    Malformed,
}

impl fmt::Display for ParseErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotRecognized => write!(f, "not recognized"),
            Self::Malformed => write!(f, "malformed"),
        }
    }
}

/// Non-fatal parse failure of a single candidate
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind}: {reason}")]
pub struct FormatParseError {
    /// Failure category
    pub kind: ParseErrorKind,
    /// Human-readable detail
    pub reason: String,
}

impl FormatParseError {
    /// The input does not look like this format at all
    #[must_use]
    pub fn not_recognized(reason: impl Into<String>) -> Self {
        Self {
            kind: ParseErrorKind::NotRecognized,
            reason: reason.into(),
        }
    }

    /// The input looks like this format but cannot be read
    #[must_use]
    pub fn malformed(reason: impl Into<String>) -> Self {
        Self {
            kind: ParseErrorKind::Malformed,
            reason: reason.into(),
        }
    }

    /// Returns true for [`ParseErrorKind::Malformed`]
    #[must_use]
    pub fn is_malformed(&self) -> bool {
        self.kind == ParseErrorKind::Malformed
    }
}

/// Successful parse result
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Parsed {
    /// Whether the payload needs a credential before conversion
    pub encrypted: bool,
}

impl Parsed {
    /// A plaintext match
    pub const PLAIN: Self = Self { encrypted: false };
    /// An encrypted match
    pub const ENCRYPTED: Self = Self { encrypted: true };
}

/// The supplied credential did not unlock the payload
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Credential rejected: {reason}")]
pub struct CredentialRejected {
    /// Why the credential was rejected
    pub reason: String,
}

impl CredentialRejected {
    /// Creates a rejection with the given reason
    #[must_use]
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

/// A parsed candidate could not produce entries
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConversionError {
    /// `convert` was called before a successful `parse`
    #[error("Candidate has not been parsed")]
    NotParsed,

    /// The payload is encrypted and has not been unlocked
    #[error("Encrypted payload has not been unlocked")]
    Locked,

    /// A single record could not be normalized
    #[error("Entry {index}: {reason}")]
    InvalidEntry {
        /// Zero-based position of the record in the file
        index: usize,
        /// What is wrong with it
        reason: String,
    },

    /// The decoded payload is not in the expected shape
    #[error("Invalid payload: {0}")]
    InvalidPayload(String),
}

/// One backup format, tried against an import source.
///
/// Implementations own whatever they decode during `parse` until `discard`
/// is called or the candidate is dropped.
pub trait FormatCandidate: Send {
    /// Stable identifier (used to persist deferred imports)
    fn format_id(&self) -> &str;

    /// Human-readable name of the format
    fn display_name(&self) -> &str;

    /// Attempts to read the source as this format.
    ///
    /// May consume any amount of the source. Must not assume the read
    /// position is at the start; the coordinator resets it before each trial.
    ///
    /// # Errors
    ///
    /// Returns [`ParseErrorKind::NotRecognized`] when the signature does not
    /// match and [`ParseErrorKind::Malformed`] when it does but the content
    /// is unusable.
    fn parse(&mut self, source: &mut ByteSource) -> Result<Parsed, FormatParseError>;

    /// Whether the parsed payload is encrypted. Only meaningful after `parse`.
    fn is_encrypted(&self) -> bool;

    /// Produces normalized entries.
    ///
    /// Repeated calls yield the same sequence.
    ///
    /// # Errors
    ///
    /// Fails if called before `parse`, before an encrypted payload has been
    /// unlocked, or if a record cannot be normalized.
    fn convert(&self) -> Result<Vec<ImportableEntry>, ConversionError>;

    /// Attempts to unlock an encrypted payload.
    ///
    /// After a success further calls are no-ops. After a rejection the
    /// caller may try again with another credential.
    ///
    /// # Errors
    ///
    /// Returns [`CredentialRejected`] if the credential does not unlock the
    /// payload or the format is not encrypted.
    fn supply_credential(&mut self, credential: &Credential) -> Result<(), CredentialRejected> {
        let _ = credential;
        Err(CredentialRejected::new(format!(
            "{} backups are not encrypted",
            self.display_name()
        )))
    }

    /// Describes the credentials that can unlock this payload
    fn credential_slots(&self) -> Vec<CredentialSlot> {
        Vec::new()
    }

    /// Drops decoded and decrypted material
    fn discard(&mut self);
}

/// A candidate that did not accept the input, kept for the final report
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidateFailure {
    /// Identifier of the candidate
    pub format_id: String,
    /// Display name of the candidate
    pub display_name: String,
    /// What went wrong
    pub error: FormatParseError,
}

impl CandidateFailure {
    /// Records the failure of `candidate`
    #[must_use]
    pub fn new(candidate: &dyn FormatCandidate, error: FormatParseError) -> Self {
        Self {
            format_id: candidate.format_id().to_string(),
            display_name: candidate.display_name().to_string(),
            error,
        }
    }
}

impl fmt::Display for CandidateFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.display_name, self.error)
    }
}
