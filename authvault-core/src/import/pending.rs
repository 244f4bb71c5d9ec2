//! Suspended imports.
//!
//! When the matched format is encrypted the coordinator parks the candidate
//! and the file bytes in a [`PendingImport`] and hands the caller a
//! [`SuspendedHandle`]. A pending import can also be frozen into a
//! [`FrozenImport`], which is everything needed to resume it in another
//! process.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::credential::CredentialSlot;
use super::source::ByteSource;
use super::traits::FormatCandidate;

/// Continuation state of a suspended import
pub(crate) struct PendingImport {
    pub(crate) id: Uuid,
    pub(crate) candidate: Box<dyn FormatCandidate>,
    pub(crate) source: ByteSource,
    pub(crate) slots: Vec<CredentialSlot>,
    pub(crate) attempts: u32,
    pub(crate) created_at: DateTime<Utc>,
}

impl PendingImport {
    pub(crate) fn new(
        candidate: Box<dyn FormatCandidate>,
        source: ByteSource,
        attempts: u32,
        created_at: DateTime<Utc>,
    ) -> Self {
        let slots = candidate.credential_slots();
        Self {
            id: Uuid::new_v4(),
            candidate,
            source,
            slots,
            attempts,
            created_at,
        }
    }

    pub(crate) fn handle(&self) -> SuspendedHandle {
        SuspendedHandle {
            id: self.id,
            format_id: self.candidate.format_id().to_string(),
            slots: self.slots.clone(),
        }
    }

    /// Releases decoded material; the source bytes are zeroized on drop
    pub(crate) fn discard(mut self) {
        self.candidate.discard();
    }

    pub(crate) fn freeze(self) -> FrozenImport {
        let frozen = FrozenImport {
            id: self.id,
            format: self.candidate.format_id().to_string(),
            payload: hex::encode(self.source.as_bytes()),
            attempts: self.attempts,
            created_at: self.created_at,
        };
        self.discard();
        frozen
    }
}

impl std::fmt::Debug for PendingImport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PendingImport")
            .field("id", &self.id)
            .field("format", &self.candidate.format_id())
            .field("source", &self.source)
            .field("slots", &self.slots)
            .field("attempts", &self.attempts)
            .field("created_at", &self.created_at)
            .finish()
    }
}

/// Opaque token for a suspended import.
///
/// Not `Clone`: whoever holds it is the only party that can resume or
/// abandon the import.
#[derive(Debug, PartialEq, Eq)]
pub struct SuspendedHandle {
    id: Uuid,
    format_id: String,
    slots: Vec<CredentialSlot>,
}

impl SuspendedHandle {
    /// Identifier of the pending import
    #[must_use]
    pub const fn id(&self) -> Uuid {
        self.id
    }

    /// Format that matched the input
    #[must_use]
    pub fn format_id(&self) -> &str {
        &self.format_id
    }

    /// Credentials that can unlock the payload
    #[must_use]
    pub fn slots(&self) -> &[CredentialSlot] {
        &self.slots
    }
}

/// Persistable snapshot of a suspended import.
///
/// Only holds the still-encrypted file bytes, never a credential or any
/// decrypted material.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrozenImport {
    /// Identifier of the pending import
    pub id: Uuid,
    /// Identifier of the matched format
    pub format: String,
    /// Hex-encoded file contents
    pub payload: String,
    /// Failed credential attempts so far
    #[serde(default)]
    pub attempts: u32,
    /// When the import was first suspended
    pub created_at: DateTime<Utc>,
}

impl FrozenImport {
    /// Decodes the retained file contents
    ///
    /// # Errors
    ///
    /// Returns the hex decoding error if the payload is corrupt.
    pub fn decode_payload(&self) -> Result<Vec<u8>, hex::FromHexError> {
        hex::decode(&self.payload)
    }
}
