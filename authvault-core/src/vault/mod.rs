//! The vault: `AuthVault`'s own storage and backup format.
//!
//! A vault file is a JSON envelope with a plaintext header and a database
//! that is either stored in the clear or sealed with AES-256-GCM. The same
//! format doubles as the export/backup format, which is why the import
//! engine can read it back.

pub mod crypto;
mod file;
mod store;

pub use crypto::{CryptParams, KdfParams, MasterKey, PasswordSlot, Slot};
pub use file::{
    VAULT_DB_VERSION, VAULT_FORMAT_VERSION, Vault, VaultFile, VaultHeader, VaultPayload,
};
pub use store::VaultStore;
