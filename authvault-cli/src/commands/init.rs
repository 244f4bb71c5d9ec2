//! Vault creation command.

use authvault_core::config::AppSettings;
use authvault_core::vault::{KdfParams, VaultStore};
use secrecy::ExposeSecret;

use crate::error::CliError;
use crate::util::read_password;

/// Init command handler
pub fn cmd_init(
    settings: &AppSettings,
    encrypt: bool,
    password_env: Option<&str>,
) -> Result<(), CliError> {
    let path = settings.vault.expanded_path();
    if path.exists() {
        return Err(CliError::Vault(format!(
            "A vault already exists at {}",
            path.display()
        )));
    }

    if encrypt {
        let password = read_password("New vault password", password_env)?;
        if password.expose_secret().is_empty() {
            return Err(CliError::Config("Password must not be empty".to_string()));
        }
        if password_env.is_none() {
            let confirm = read_password("Repeat password", None)?;
            if confirm.expose_secret() != password.expose_secret() {
                return Err(CliError::Config("Passwords do not match".to_string()));
            }
        }
        VaultStore::create_encrypted(&path, &password, KdfParams::default())?;
    } else {
        VaultStore::create_plain(&path)?;
    }

    tracing::info!(path = %path.display(), encrypted = encrypt, "Vault created");
    println!(
        "Created {} vault at {}",
        if encrypt { "encrypted" } else { "plaintext" },
        path.display()
    );
    Ok(())
}
