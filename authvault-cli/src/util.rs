//! Shared utility functions used across command modules.

use std::path::Path;

use authvault_core::config::{AppSettings, ConfigManager};
use authvault_core::error::VaultError;
use authvault_core::import::Credential;
use authvault_core::vault::{Vault, VaultStore};
use secrecy::SecretString;

use crate::error::CliError;

/// Environment variable holding the password of the target vault
pub const VAULT_PASSWORD_ENV: &str = "AUTHVAULT_PASSWORD";

/// Creates a `ConfigManager` using the optional custom config directory
/// from CLI args.
pub fn create_config_manager(config_path: Option<&Path>) -> Result<ConfigManager, CliError> {
    match config_path {
        Some(path) => Ok(ConfigManager::with_config_dir(path.to_path_buf())),
        None => ConfigManager::new()
            .map_err(|e| CliError::Config(format!("Failed to initialize config: {e}"))),
    }
}

/// Loads settings, falling back to defaults if the file is unreadable.
///
/// Used before logging is set up, so the failure is reported on stderr.
pub fn load_settings_or_default(config_path: Option<&Path>) -> AppSettings {
    create_config_manager(config_path)
        .and_then(|manager| manager.load_settings().map_err(CliError::from))
        .unwrap_or_else(|e| {
            eprintln!("Warning: {e}; using default settings");
            AppSettings::default()
        })
}

/// Reads a password from `env_var` if given, otherwise from the terminal
pub fn read_password(prompt: &str, env_var: Option<&str>) -> Result<SecretString, CliError> {
    if let Some(var) = env_var {
        return std::env::var(var)
            .map(SecretString::from)
            .map_err(|_| CliError::Config(format!("Environment variable {var} is not set")));
    }
    eprint!("{prompt}: ");
    rpassword::read_password()
        .map(SecretString::from)
        .map_err(|e| CliError::Config(format!("Failed to read password: {e}")))
}

/// Opens the configured vault, asking for its password if it is encrypted.
///
/// The password comes from `AUTHVAULT_PASSWORD` when set.
pub fn open_vault(settings: &AppSettings) -> Result<(VaultStore, Vault), CliError> {
    let path = settings.vault.expanded_path();
    if !path.exists() {
        return Err(CliError::Vault(format!(
            "No vault at {}; run `authvault-cli init` first",
            path.display()
        )));
    }

    match VaultStore::open(&path, None) {
        Err(VaultError::CredentialRequired) => {
            let env = std::env::var_os(VAULT_PASSWORD_ENV).map(|_| VAULT_PASSWORD_ENV);
            let password = read_password("Vault password", env)?;
            Ok(VaultStore::open(&path, Some(&Credential::Password(password)))?)
        }
        other => Ok(other?),
    }
}

/// Escapes a CSV field (quotes fields containing separators or quotes)
pub fn escape_csv_field(field: &str) -> String {
    if field.contains(',') || field.contains('"') || field.contains('\n') {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}
