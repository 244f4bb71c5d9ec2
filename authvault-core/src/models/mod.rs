//! Core data structures for credential records.

mod entry;
mod otp;
mod secret;

pub use entry::{ImportableEntry, VaultEntry};
pub use otp::{DEFAULT_DIGITS, DEFAULT_PERIOD, HashAlgorithm, OtpKind, OtpParams, STEAM_DIGITS};
pub use secret::{OtpSecret, SecretDecodeError};
