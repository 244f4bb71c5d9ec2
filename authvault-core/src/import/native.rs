//! Importer for `AuthVault`'s own vault files (plaintext or encrypted).

use zeroize::Zeroizing;

use crate::error::VaultError;
use crate::models::ImportableEntry;
use crate::vault::{Slot, Vault, VaultFile};

use super::credential::{Credential, CredentialSlot};
use super::source::ByteSource;
use super::traits::{
    ConversionError, CredentialRejected, FormatCandidate, FormatParseError, Parsed,
};

#[derive(Default)]
enum State {
    #[default]
    Unparsed,
    Plain(Vault),
    Locked(VaultFile),
    Unlocked(Zeroizing<Vec<u8>>),
}

/// Reads vault files produced by [`crate::vault::VaultStore`]
#[derive(Default)]
pub struct VaultCandidate {
    state: State,
    slots: Vec<CredentialSlot>,
}

impl VaultCandidate {
    /// Format identifier
    pub const FORMAT_ID: &'static str = "vault";

    /// Creates an unparsed candidate
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn unlock(file: &VaultFile, credential: &Credential) -> Result<Zeroizing<Vec<u8>>, VaultError> {
        match credential {
            Credential::Password(password) => {
                let key = file.unlock(password)?;
                file.decrypt_payload(&key)
            }
            Credential::MasterKey(key) => file.decrypt_payload(key),
        }
    }

    fn entries_of(vault: &Vault) -> Result<Vec<ImportableEntry>, ConversionError> {
        vault
            .entries
            .iter()
            .enumerate()
            .map(|(index, entry)| {
                entry
                    .info
                    .validate()
                    .map_err(|reason| ConversionError::InvalidEntry { index, reason })?;
                Ok(entry.to_importable())
            })
            .collect()
    }
}

impl FormatCandidate for VaultCandidate {
    fn format_id(&self) -> &str {
        Self::FORMAT_ID
    }

    fn display_name(&self) -> &str {
        "AuthVault"
    }

    fn parse(&mut self, source: &mut ByteSource) -> Result<Parsed, FormatParseError> {
        let value: serde_json::Value = serde_json::from_slice(source.read_remaining())
            .map_err(|e| FormatParseError::not_recognized(format!("not JSON: {e}")))?;
        let looks_like_vault = value
            .as_object()
            .is_some_and(|obj| obj.contains_key("header") && obj.contains_key("db"));
        if !looks_like_vault {
            return Err(FormatParseError::not_recognized(
                "missing vault header or db",
            ));
        }

        let file: VaultFile = serde_json::from_value(value)
            .map_err(|e| FormatParseError::malformed(e.to_string()))?;
        file.validate()
            .map_err(|e| FormatParseError::malformed(e.to_string()))?;

        if file.is_encrypted() {
            self.slots = file
                .slots()
                .iter()
                .map(|slot| match slot {
                    Slot::Password(p) => CredentialSlot::password(p.uuid),
                })
                .collect();
            self.state = State::Locked(file);
            Ok(Parsed::ENCRYPTED)
        } else {
            let vault = file
                .open(None)
                .map_err(|e| FormatParseError::malformed(e.to_string()))?;
            self.state = State::Plain(vault);
            Ok(Parsed::PLAIN)
        }
    }

    fn is_encrypted(&self) -> bool {
        matches!(self.state, State::Locked(_) | State::Unlocked(_))
    }

    fn convert(&self) -> Result<Vec<ImportableEntry>, ConversionError> {
        match &self.state {
            State::Unparsed => Err(ConversionError::NotParsed),
            State::Locked(_) => Err(ConversionError::Locked),
            State::Plain(vault) => Self::entries_of(vault),
            State::Unlocked(plaintext) => {
                let vault = Vault::from_slice(plaintext)
                    .map_err(|e| ConversionError::InvalidPayload(e.to_string()))?;
                Self::entries_of(&vault)
            }
        }
    }

    fn supply_credential(&mut self, credential: &Credential) -> Result<(), CredentialRejected> {
        let file = match &self.state {
            State::Unlocked(_) => return Ok(()),
            State::Locked(file) => file,
            State::Unparsed | State::Plain(_) => {
                return Err(CredentialRejected::new("vault is not encrypted"));
            }
        };

        match Self::unlock(file, credential) {
            Ok(plaintext) => {
                tracing::debug!("Vault payload decrypted");
                self.state = State::Unlocked(plaintext);
                Ok(())
            }
            Err(VaultError::InvalidCredential) => Err(CredentialRejected::new(
                "no key slot accepts this credential",
            )),
            Err(e) => Err(CredentialRejected::new(e.to_string())),
        }
    }

    fn credential_slots(&self) -> Vec<CredentialSlot> {
        self.slots.clone()
    }

    fn discard(&mut self) {
        self.state = State::Unparsed;
    }
}
