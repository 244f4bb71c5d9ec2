//! Configuration management for `AuthVault`
//!
//! Settings live in `settings.toml` in the configuration directory, next
//! to a `pending/` directory holding deferred imports.

mod manager;
pub mod settings;

pub use manager::ConfigManager;
pub use settings::{AppSettings, ImportSettings, LoggingSettings, VaultSettings};
