//! Results reported by the import coordinator.

use std::fmt;

use super::pending::SuspendedHandle;
use super::traits::CandidateFailure;

/// Terminal result of one import attempt.
///
/// Exactly one outcome is reported per `begin_import`/`resume` call, except
/// when `begin_import` suspends (see [`ImportProgress::Suspended`]).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImportOutcome {
    /// Entries were converted and merged
    Success {
        /// Identifier of the matched format
        format: String,
        /// Number of entries merged
        count: usize,
    },

    /// No candidate recognized the input
    NoFormatMatched {
        /// One failure per candidate tried, in registry order
        failures: Vec<CandidateFailure>,
    },

    /// At least one candidate recognized the input but could not read it
    ParseFailed {
        /// One failure per candidate tried, in registry order
        failures: Vec<CandidateFailure>,
    },

    /// The credential did not unlock the payload; the import stays suspended
    CredentialRejected {
        /// Failed attempts so far
        attempts: u32,
        /// Attempts left before the import is discarded, if bounded
        remaining: Option<u32>,
    },

    /// Too many rejected credentials; the import was discarded
    AttemptsExhausted {
        /// Failed attempts made
        attempts: u32,
    },

    /// The matched candidate could not produce entries
    ConversionFailed {
        /// Identifier of the matched format
        format: String,
        /// Why conversion failed
        reason: String,
    },

    /// Entries could not be persisted; nothing was merged
    MergeFailed {
        /// Why the merge failed
        reason: String,
    },

    /// The credential prompt was cancelled; the import is still suspended
    Cancelled,
}

impl ImportOutcome {
    /// Builds the exhaustion outcome from the collected trial failures
    #[must_use]
    pub fn from_failures(failures: Vec<CandidateFailure>) -> Self {
        if failures.iter().any(|f| f.error.is_malformed()) {
            Self::ParseFailed { failures }
        } else {
            Self::NoFormatMatched { failures }
        }
    }

    /// Returns true for [`ImportOutcome::Success`]
    #[must_use]
    pub const fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }

    /// Returns true if the pending import is still usable after this outcome
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::CredentialRejected { .. })
    }

    /// Number of merged entries (zero for anything but success)
    #[must_use]
    pub const fn merged_count(&self) -> usize {
        match self {
            Self::Success { count, .. } => *count,
            _ => 0,
        }
    }

    /// Per-candidate failures for exhaustion outcomes
    #[must_use]
    pub fn failures(&self) -> &[CandidateFailure] {
        match self {
            Self::NoFormatMatched { failures } | Self::ParseFailed { failures } => failures,
            _ => &[],
        }
    }
}

impl fmt::Display for ImportOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Success { format, count } => {
                write!(f, "Imported {count} entries ({format})")
            }
            Self::NoFormatMatched { failures } => {
                write!(f, "Unrecognized file format ({} formats tried)", failures.len())
            }
            Self::ParseFailed { failures } => {
                let detail = failures
                    .iter()
                    .filter(|f| f.error.is_malformed())
                    .map(ToString::to_string)
                    .collect::<Vec<_>>()
                    .join("; ");
                write!(f, "Failed to parse file: {detail}")
            }
            Self::CredentialRejected { attempts, remaining } => match remaining {
                Some(left) => write!(
                    f,
                    "Wrong password or key (attempt {attempts}, {left} remaining)"
                ),
                None => write!(f, "Wrong password or key (attempt {attempts})"),
            },
            Self::AttemptsExhausted { attempts } => {
                write!(f, "Import discarded after {attempts} failed attempts")
            }
            Self::ConversionFailed { format, reason } => {
                write!(f, "Failed to convert {format} backup: {reason}")
            }
            Self::MergeFailed { reason } => write!(f, "Failed to save imported entries: {reason}"),
            Self::Cancelled => write!(f, "Import cancelled"),
        }
    }
}

/// Result of starting an import
#[derive(Debug)]
pub enum ImportProgress {
    /// The attempt reached a terminal outcome
    Finished(ImportOutcome),
    /// The input is encrypted; resume with a credential or abandon
    Suspended(SuspendedHandle),
}

impl ImportProgress {
    /// Returns the outcome if the attempt finished
    #[must_use]
    pub fn outcome(&self) -> Option<&ImportOutcome> {
        match self {
            Self::Finished(outcome) => Some(outcome),
            Self::Suspended(_) => None,
        }
    }

    /// Consumes self, returning the handle if the attempt suspended
    #[must_use]
    pub fn into_handle(self) -> Option<SuspendedHandle> {
        match self {
            Self::Suspended(handle) => Some(handle),
            Self::Finished(_) => None,
        }
    }
}
