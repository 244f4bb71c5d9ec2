//! The import coordinator: detection, suspension and resumption.
//!
//! ```text
//! begin_import ─ for each candidate: reset, parse
//!     ├─ NotRecognized / Malformed ─> next candidate
//!     ├─ plaintext match ───────────> convert ─> merge ─> Finished
//!     └─ encrypted match ───────────> Suspended(handle)
//!
//! resume(handle, credential)
//!     ├─ rejected ─> CredentialRejected (handle stays valid)
//!     └─ accepted ─> convert ─> merge ─> outcome
//! ```

use chrono::Utc;

use crate::config::ImportSettings;
use crate::error::ImportError;
use crate::tracing::span_names;

use super::credential::{Credential, CredentialSlot};
use super::merge::MergeSink;
use super::outcome::{ImportOutcome, ImportProgress};
use super::pending::{FrozenImport, PendingImport, SuspendedHandle};
use super::registry::CandidateRegistry;
use super::source::ByteSource;
use super::traits::{CandidateFailure, FormatCandidate};

/// Runs imports against a merge sink.
///
/// Holds at most one suspended import at a time.
#[derive(Debug)]
pub struct ImportCoordinator<S: MergeSink> {
    registry: CandidateRegistry,
    sink: S,
    max_credential_attempts: Option<u32>,
    pending: Option<PendingImport>,
}

impl<S: MergeSink> ImportCoordinator<S> {
    /// Creates a coordinator with the built-in formats
    #[must_use]
    pub fn new(sink: S) -> Self {
        Self::with_registry(CandidateRegistry::with_defaults(), sink)
    }

    /// Creates a coordinator with a custom format registry
    #[must_use]
    pub const fn with_registry(registry: CandidateRegistry, sink: S) -> Self {
        Self {
            registry,
            sink,
            max_credential_attempts: None,
            pending: None,
        }
    }

    /// Applies import settings
    #[must_use]
    pub const fn with_settings(mut self, settings: &ImportSettings) -> Self {
        self.max_credential_attempts = settings.max_credential_attempts;
        self
    }

    /// Sets the number of rejected credentials after which a suspended
    /// import is discarded (`None` for no limit)
    #[must_use]
    pub const fn with_max_credential_attempts(mut self, limit: Option<u32>) -> Self {
        self.max_credential_attempts = limit;
        self
    }

    /// Detects the format of `source` and imports it.
    ///
    /// Candidates are tried in registry order with the source rewound before
    /// each one. An encrypted match suspends the import; the returned handle
    /// must then be passed to [`resume`](Self::resume) or
    /// [`abandon`](Self::abandon).
    ///
    /// # Errors
    ///
    /// Returns [`ImportError::ImportPending`] while another import is suspended.
    pub fn begin_import(&mut self, mut source: ByteSource) -> Result<ImportProgress, ImportError> {
        if let Some(pending) = &self.pending {
            return Err(ImportError::ImportPending(pending.id));
        }

        let _span = crate::trace_operation!(span_names::IMPORT_DETECT, size = source.len()).entered();
        let candidates = self.registry.candidates_for(&source);
        let mut failures = Vec::with_capacity(candidates.len());

        for mut candidate in candidates {
            source.reset();
            let _trial = crate::trace_operation_debug!(
                span_names::IMPORT_TRIAL,
                format = candidate.format_id()
            )
            .entered();

            match candidate.parse(&mut source) {
                Ok(parsed) if parsed.encrypted => {
                    let pending = PendingImport::new(candidate, source, 0, Utc::now());
                    let handle = pending.handle();
                    tracing::info!(
                        import_id = %handle.id(),
                        format = handle.format_id(),
                        slots = handle.slots().len(),
                        "Encrypted backup detected, waiting for credentials"
                    );
                    self.pending = Some(pending);
                    return Ok(ImportProgress::Suspended(handle));
                }
                Ok(_) => {
                    tracing::debug!("Format matched");
                    return Ok(ImportProgress::Finished(self.complete(candidate)));
                }
                Err(error) => {
                    tracing::debug!(error = %error, "Candidate rejected input");
                    candidate.discard();
                    failures.push(CandidateFailure::new(candidate.as_ref(), error));
                }
            }
        }

        let outcome = ImportOutcome::from_failures(failures);
        tracing::warn!(outcome = %outcome, "No format accepted the input");
        Ok(ImportProgress::Finished(outcome))
    }

    /// Resumes a suspended import with `credential`.
    ///
    /// A rejected credential keeps the import suspended unless the attempt
    /// limit is reached. The credential is dropped before this returns.
    ///
    /// # Errors
    ///
    /// Returns [`ImportError::InvalidHandle`] if `handle` is not the pending
    /// import (already finished, abandoned, frozen or from elsewhere).
    pub fn resume(
        &mut self,
        handle: &SuspendedHandle,
        credential: Credential,
    ) -> Result<ImportOutcome, ImportError> {
        let _span = crate::trace_operation!(span_names::IMPORT_RESUME, import_id = %handle.id()).entered();

        let Some(pending) = self.pending.as_mut().filter(|p| p.id == handle.id()) else {
            return Err(ImportError::InvalidHandle(handle.id()));
        };

        let result = pending.candidate.supply_credential(&credential);
        drop(credential);

        if let Err(rejected) = result {
            pending.attempts += 1;
            let attempts = pending.attempts;
            let remaining = self
                .max_credential_attempts
                .map(|limit| limit.saturating_sub(attempts));
            tracing::warn!(attempts, reason = %rejected.reason, "Credential rejected");

            if remaining == Some(0) {
                if let Some(pending) = self.pending.take() {
                    pending.discard();
                }
                tracing::warn!(attempts, "Credential attempts exhausted, import discarded");
                return Ok(ImportOutcome::AttemptsExhausted { attempts });
            }
            return Ok(ImportOutcome::CredentialRejected {
                attempts,
                remaining,
            });
        }

        let Some(pending) = self.pending.take() else {
            return Err(ImportError::InvalidHandle(handle.id()));
        };
        let PendingImport { candidate, .. } = pending;
        Ok(self.complete(candidate))
    }

    /// Discards the suspended import without merging anything.
    ///
    /// Idempotent: stale handles are ignored.
    pub fn abandon(&mut self, handle: &SuspendedHandle) {
        if self.pending.as_ref().is_some_and(|p| p.id == handle.id()) {
            if let Some(pending) = self.pending.take() {
                tracing::info!(import_id = %pending.id, "Import abandoned");
                pending.discard();
            }
        }
    }

    /// Removes the suspended import and returns a persistable snapshot.
    ///
    /// The handle becomes invalid; use [`thaw`](Self::thaw) to restore it.
    ///
    /// # Errors
    ///
    /// Returns [`ImportError::InvalidHandle`] if `handle` is not the pending import.
    pub fn freeze(&mut self, handle: &SuspendedHandle) -> Result<FrozenImport, ImportError> {
        if !self.pending.as_ref().is_some_and(|p| p.id == handle.id()) {
            return Err(ImportError::InvalidHandle(handle.id()));
        }
        let pending = self
            .pending
            .take()
            .ok_or(ImportError::InvalidHandle(handle.id()))?;
        tracing::info!(import_id = %pending.id, "Import frozen");
        Ok(pending.freeze())
    }

    /// Restores a frozen import as the pending import.
    ///
    /// Only the candidate named in the snapshot is tried; detection is not
    /// repeated.
    ///
    /// # Errors
    ///
    /// Returns [`ImportError::ImportPending`] if another import is suspended,
    /// [`ImportError::UnknownFormat`] if the format is not registered, and
    /// [`ImportError::CorruptPending`] if the payload no longer parses as an
    /// encrypted backup of that format.
    pub fn thaw(&mut self, frozen: FrozenImport) -> Result<SuspendedHandle, ImportError> {
        if let Some(pending) = &self.pending {
            return Err(ImportError::ImportPending(pending.id));
        }
        let _span = crate::trace_operation!(
            span_names::IMPORT_THAW,
            import_id = %frozen.id,
            format = %frozen.format
        )
        .entered();

        let mut candidate = self
            .registry
            .create(&frozen.format)
            .ok_or_else(|| ImportError::UnknownFormat(frozen.format.clone()))?;
        let corrupt = |reason: String| ImportError::CorruptPending {
            id: frozen.id,
            reason,
        };

        let bytes = frozen
            .decode_payload()
            .map_err(|e| corrupt(format!("invalid payload encoding: {e}")))?;
        let mut source = ByteSource::from_bytes(bytes);

        match candidate.parse(&mut source) {
            Ok(parsed) if parsed.encrypted => {}
            Ok(_) => {
                candidate.discard();
                return Err(corrupt("payload is not encrypted".to_string()));
            }
            Err(e) => return Err(corrupt(e.to_string())),
        }

        let mut pending =
            PendingImport::new(candidate, source, frozen.attempts, frozen.created_at);
        pending.id = frozen.id;
        let handle = pending.handle();
        self.pending = Some(pending);
        tracing::info!("Deferred import restored");
        Ok(handle)
    }

    /// Credential slots of the suspended import
    ///
    /// # Errors
    ///
    /// Returns [`ImportError::InvalidHandle`] if `handle` is not the pending import.
    pub fn pending_slots(&self, handle: &SuspendedHandle) -> Result<&[CredentialSlot], ImportError> {
        self.pending
            .as_ref()
            .filter(|p| p.id == handle.id())
            .map(|p| p.slots.as_slice())
            .ok_or(ImportError::InvalidHandle(handle.id()))
    }

    /// Rejected credentials so far, including those made before a freeze
    ///
    /// # Errors
    ///
    /// Returns [`ImportError::InvalidHandle`] if `handle` is not the pending import.
    pub fn pending_attempts(&self, handle: &SuspendedHandle) -> Result<u32, ImportError> {
        self.pending
            .as_ref()
            .filter(|p| p.id == handle.id())
            .map(|p| p.attempts)
            .ok_or(ImportError::InvalidHandle(handle.id()))
    }

    /// Returns true while an import is suspended
    #[must_use]
    pub const fn has_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// The format registry
    #[must_use]
    pub const fn registry(&self) -> &CandidateRegistry {
        &self.registry
    }

    /// The merge sink
    #[must_use]
    pub const fn sink(&self) -> &S {
        &self.sink
    }

    /// Consumes the coordinator, discarding any pending import
    pub fn into_sink(mut self) -> S {
        if let Some(pending) = self.pending.take() {
            pending.discard();
        }
        self.sink
    }

    /// Converts a matched candidate and merges its entries
    fn complete(&mut self, mut candidate: Box<dyn FormatCandidate>) -> ImportOutcome {
        let format = candidate.format_id().to_string();
        let converted = candidate.convert();
        candidate.discard();

        let entries = match converted {
            Ok(entries) => entries,
            Err(e) => {
                tracing::warn!(format = %format, error = %e, "Conversion failed");
                return ImportOutcome::ConversionFailed {
                    format,
                    reason: e.to_string(),
                };
            }
        };

        match self.sink.merge(&entries) {
            Ok(()) => {
                tracing::info!(format = %format, count = entries.len(), "Import complete");
                ImportOutcome::Success {
                    format,
                    count: entries.len(),
                }
            }
            Err(e) => {
                tracing::warn!(format = %format, error = %e, "Merge failed");
                ImportOutcome::MergeFailed {
                    reason: e.to_string(),
                }
            }
        }
    }
}
