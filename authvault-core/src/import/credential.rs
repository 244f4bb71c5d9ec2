//! Credentials for encrypted backups and the async collector boundary.

use std::fmt;

use async_trait::async_trait;
use secrecy::SecretString;
use uuid::Uuid;

use crate::error::ImportError;
use crate::vault::MasterKey;

use super::coordinator::ImportCoordinator;
use super::merge::MergeSink;
use super::outcome::ImportOutcome;
use super::pending::SuspendedHandle;

/// Secret material that may unlock an encrypted backup.
///
/// Both variants zeroize on drop.
#[derive(Debug)]
pub enum Credential {
    /// A user-entered password
    Password(SecretString),
    /// A raw master key, e.g. from a previously unlocked vault
    MasterKey(MasterKey),
}

impl Credential {
    /// Shorthand for a password credential
    #[must_use]
    pub fn password(password: impl Into<String>) -> Self {
        Self::Password(SecretString::from(password.into()))
    }

    /// Returns the kind of this credential
    #[must_use]
    pub const fn kind(&self) -> CredentialKind {
        match self {
            Self::Password(_) => CredentialKind::Password,
            Self::MasterKey(_) => CredentialKind::MasterKey,
        }
    }
}

impl From<&MasterKey> for Credential {
    fn from(key: &MasterKey) -> Self {
        Self::MasterKey(key.duplicate())
    }
}

/// Kind of credential a slot accepts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CredentialKind {
    /// Password
    Password,
    /// Raw master key
    MasterKey,
}

impl fmt::Display for CredentialKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Password => write!(f, "password"),
            Self::MasterKey => write!(f, "master key"),
        }
    }
}

/// One way of unlocking an encrypted payload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CredentialSlot {
    /// Slot identifier as stored in the backup
    pub id: Uuid,
    /// Credential kind accepted by the slot
    pub kind: CredentialKind,
}

impl CredentialSlot {
    /// Creates a password slot
    #[must_use]
    pub const fn password(id: Uuid) -> Self {
        Self {
            id,
            kind: CredentialKind::Password,
        }
    }
}

/// Answer from a credential collector
#[derive(Debug)]
pub enum CredentialResponse {
    /// The user supplied a credential
    Provided(Credential),
    /// The user declined
    Cancelled,
}

/// Asks the user (or any other source) for a credential.
///
/// Implementations may block on user interaction for an arbitrary time.
#[async_trait]
pub trait CredentialPrompt: Send + Sync {
    /// Collects a credential for a backup of `format` protected by `slots`.
    ///
    /// `attempt` starts at 1 and increases after each rejection.
    async fn collect(
        &self,
        format: &str,
        slots: &[CredentialSlot],
        attempt: u32,
    ) -> CredentialResponse;
}

/// Drives a suspended import to a terminal outcome with `prompt`.
///
/// Rejected credentials are retried until the prompt cancels or the
/// coordinator's attempt limit is hit. Attempt numbers continue from the
/// rejections already recorded on the import, so a thawed import keeps
/// counting where it stopped.
///
/// On [`ImportOutcome::Cancelled`] the import stays suspended; the caller
/// either abandons it or freezes it for later.
///
/// # Errors
///
/// Returns [`ImportError::InvalidHandle`] if `handle` is not the pending import.
pub async fn resolve_with_prompt<S, P>(
    coordinator: &mut ImportCoordinator<S>,
    handle: &SuspendedHandle,
    prompt: &P,
) -> Result<ImportOutcome, ImportError>
where
    S: MergeSink,
    P: CredentialPrompt + ?Sized,
{
    loop {
        let attempt = coordinator.pending_attempts(handle)? + 1;
        match prompt
            .collect(handle.format_id(), handle.slots(), attempt)
            .await
        {
            CredentialResponse::Cancelled => return Ok(ImportOutcome::Cancelled),
            CredentialResponse::Provided(credential) => {
                match coordinator.resume(handle, credential)? {
                    ImportOutcome::CredentialRejected { .. } => {}
                    outcome => return Ok(outcome),
                }
            }
        }
    }
}
