//! Credential records: the normalized import unit and the stored vault entry.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{OtpParams, OtpSecret};

/// A normalized credential produced by a backup format.
///
/// This is the only unit the merge step accepts; every importer converts its
/// own representation into a list of these.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportableEntry {
    /// Service that issued the credential (may be empty)
    pub issuer: String,
    /// Account label, usually a user name or e-mail address
    pub label: String,
    /// Shared secret key
    pub secret: OtpSecret,
    /// Code generation parameters
    pub otp: OtpParams,
}

impl ImportableEntry {
    /// Creates a new entry
    #[must_use]
    pub fn new(
        issuer: impl Into<String>,
        label: impl Into<String>,
        secret: OtpSecret,
        otp: OtpParams,
    ) -> Self {
        Self {
            issuer: issuer.into(),
            label: label.into(),
            secret,
            otp,
        }
    }

    /// Returns `issuer (label)` or just the label when there is no issuer
    #[must_use]
    pub fn display_name(&self) -> String {
        if self.issuer.is_empty() {
            self.label.clone()
        } else {
            format!("{} ({})", self.issuer, self.label)
        }
    }
}

/// An entry as stored in the vault database
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VaultEntry {
    /// Unique identifier
    pub uuid: Uuid,
    /// Account label
    pub name: String,
    /// Issuer name
    #[serde(default)]
    pub issuer: String,
    /// Code generation parameters
    pub info: OtpParams,
    /// Shared secret key
    pub secret: OtpSecret,
}

impl VaultEntry {
    /// Creates a stored entry with a fresh identifier
    #[must_use]
    pub fn from_import(entry: &ImportableEntry) -> Self {
        Self {
            uuid: Uuid::new_v4(),
            name: entry.label.clone(),
            issuer: entry.issuer.clone(),
            info: entry.otp,
            secret: entry.secret.clone(),
        }
    }

    /// Converts back into the normalized import form
    #[must_use]
    pub fn to_importable(&self) -> ImportableEntry {
        ImportableEntry {
            issuer: self.issuer.clone(),
            label: self.name.clone(),
            secret: self.secret.clone(),
            otp: self.info,
        }
    }
}
