//! Merge step: persisting converted entries.

use thiserror::Error;

use crate::error::VaultError;
use crate::models::{ImportableEntry, VaultEntry};
use crate::vault::{Vault, VaultStore};

/// Entries could not be recorded; nothing from the batch was kept
#[derive(Debug, Error)]
pub enum MergeError {
    /// Persisting the updated vault failed
    #[error(transparent)]
    Vault(#[from] VaultError),

    /// The sink refused the batch
    #[error("{0}")]
    Rejected(String),
}

/// Destination for imported entries.
///
/// `merge` is all-or-nothing: on error none of `entries` may be visible
/// afterwards. No deduplication is done; duplicate issuer/label pairs are
/// kept as distinct records.
pub trait MergeSink {
    /// Records every entry in `entries` durably
    ///
    /// # Errors
    ///
    /// Returns an error if the batch could not be recorded in full.
    fn merge(&mut self, entries: &[ImportableEntry]) -> Result<(), MergeError>;
}

/// Collects merged entries in memory
#[derive(Debug, Default)]
pub struct MemorySink {
    entries: Vec<ImportableEntry>,
    batches: usize,
}

impl MemorySink {
    /// Creates an empty sink
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Entries merged so far
    #[must_use]
    pub fn entries(&self) -> &[ImportableEntry] {
        &self.entries
    }

    /// Number of successful `merge` calls
    #[must_use]
    pub const fn batches(&self) -> usize {
        self.batches
    }
}

impl MergeSink for MemorySink {
    fn merge(&mut self, entries: &[ImportableEntry]) -> Result<(), MergeError> {
        self.entries.extend_from_slice(entries);
        self.batches += 1;
        Ok(())
    }
}

/// Appends imported entries to a vault and saves it
#[derive(Debug)]
pub struct VaultMergeSink {
    store: VaultStore,
    vault: Vault,
}

impl VaultMergeSink {
    /// Wraps an opened store and its current contents
    #[must_use]
    pub const fn new(store: VaultStore, vault: Vault) -> Self {
        Self { store, vault }
    }

    /// Current vault contents
    #[must_use]
    pub const fn vault(&self) -> &Vault {
        &self.vault
    }

    /// Underlying store
    #[must_use]
    pub const fn store(&self) -> &VaultStore {
        &self.store
    }

    /// Splits the sink back into its parts
    #[must_use]
    pub fn into_parts(self) -> (VaultStore, Vault) {
        (self.store, self.vault)
    }
}

impl MergeSink for VaultMergeSink {
    fn merge(&mut self, entries: &[ImportableEntry]) -> Result<(), MergeError> {
        let _span = tracing::info_span!(
            crate::tracing::span_names::IMPORT_MERGE,
            count = entries.len()
        )
        .entered();

        let mut staged = self.vault.clone();
        for entry in entries {
            staged.add_entry(VaultEntry::from_import(entry));
        }
        self.store.save(&staged)?;
        self.vault = staged;

        tracing::info!(
            added = entries.len(),
            total = self.vault.len(),
            "Merged imported entries into vault"
        );
        Ok(())
    }
}
