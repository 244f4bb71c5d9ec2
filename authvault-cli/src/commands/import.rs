//! Backup import commands: `import`, `resume`, `abandon` and `pending`.

use std::fmt::Write as _;
use std::path::Path;
use std::sync::atomic::{AtomicU32, Ordering};

use async_trait::async_trait;
use authvault_core::config::AppSettings;
use authvault_core::import::{
    ByteSource, Credential, CredentialPrompt, CredentialResponse, CredentialSlot,
    ImportCoordinator, ImportOutcome, ImportProgress, VaultMergeSink, resolve_with_prompt,
};
use secrecy::SecretString;
use uuid::Uuid;

use crate::cli::OutputFormat;
use crate::error::CliError;
use crate::util::{create_config_manager, open_vault};

/// Asks for backup passwords on the terminal or reads one from the environment
struct TerminalPrompt {
    password_env: Option<String>,
    asked: AtomicU32,
}

impl TerminalPrompt {
    fn new(password_env: Option<&str>) -> Self {
        Self {
            password_env: password_env.map(String::from),
            asked: AtomicU32::new(0),
        }
    }

    fn env_password(&self) -> Option<SecretString> {
        self.password_env
            .as_deref()
            .and_then(|var| std::env::var(var).ok())
            .map(SecretString::from)
    }
}

#[async_trait]
impl CredentialPrompt for TerminalPrompt {
    async fn collect(
        &self,
        format: &str,
        slots: &[CredentialSlot],
        attempt: u32,
    ) -> CredentialResponse {
        let asked = self.asked.fetch_add(1, Ordering::Relaxed);
        if self.password_env.is_some() {
            // a non-interactive password is only tried once per run
            return match self.env_password() {
                Some(password) if asked == 0 => {
                    CredentialResponse::Provided(Credential::Password(password))
                }
                _ => CredentialResponse::Cancelled,
            };
        }

        if asked > 0 {
            eprintln!("Wrong password, try again (empty input cancels).");
        }
        tracing::debug!(format, slots = slots.len(), attempt, "Prompting for backup password");

        let prompt = format!("Password for {format} backup: ");
        let answer = tokio::task::spawn_blocking(move || {
            eprint!("{prompt}");
            rpassword::read_password()
        })
        .await;

        match answer {
            Ok(Ok(password)) if !password.is_empty() => {
                CredentialResponse::Provided(Credential::password(password))
            }
            Ok(Ok(_)) => CredentialResponse::Cancelled,
            Ok(Err(e)) => {
                tracing::warn!(error = %e, "Failed to read password");
                CredentialResponse::Cancelled
            }
            Err(e) => {
                tracing::warn!(error = %e, "Password prompt task failed");
                CredentialResponse::Cancelled
            }
        }
    }
}

fn runtime() -> Result<tokio::runtime::Runtime, CliError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| CliError::Import(format!("Failed to create async runtime: {e}")))
}

fn coordinator(settings: &AppSettings) -> Result<ImportCoordinator<VaultMergeSink>, CliError> {
    let (store, vault) = open_vault(settings)?;
    Ok(ImportCoordinator::new(VaultMergeSink::new(store, vault)).with_settings(&settings.import))
}

/// Maps a terminal outcome to the command result
fn report(outcome: &ImportOutcome) -> Result<(), CliError> {
    match outcome {
        ImportOutcome::Success { format, count } => {
            println!("Imported {count} entries ({format})");
            Ok(())
        }
        ImportOutcome::NoFormatMatched { failures } | ImportOutcome::ParseFailed { failures } => {
            let mut message = outcome.to_string();
            for failure in failures {
                let _ = write!(message, "\n  {failure}");
            }
            Err(CliError::NothingImported(message))
        }
        ImportOutcome::CredentialRejected { .. }
        | ImportOutcome::AttemptsExhausted { .. }
        | ImportOutcome::Cancelled => Err(CliError::NothingImported(outcome.to_string())),
        ImportOutcome::ConversionFailed { .. } | ImportOutcome::MergeFailed { .. } => {
            Err(CliError::Import(outcome.to_string()))
        }
    }
}

/// Import command handler
pub fn cmd_import(
    config_path: Option<&Path>,
    settings: &AppSettings,
    file: &Path,
    defer: bool,
    password_env: Option<&str>,
) -> Result<(), CliError> {
    let runtime = runtime()?;
    let mut coordinator = coordinator(settings)?;

    let source =
        runtime.block_on(ByteSource::from_path_async(file, settings.import.max_file_size))?;

    let handle = match coordinator.begin_import(source)? {
        ImportProgress::Finished(outcome) => return report(&outcome),
        ImportProgress::Suspended(handle) => handle,
    };

    if defer {
        let config_manager = create_config_manager(config_path)?;
        let frozen = coordinator.freeze(&handle)?;
        config_manager.save_pending(&frozen)?;
        println!("Encrypted {} backup saved for later.", handle.format_id());
        println!("Resume with: authvault-cli resume {}", handle.id());
        return Ok(());
    }

    let prompt = TerminalPrompt::new(password_env);
    let outcome = runtime.block_on(resolve_with_prompt(&mut coordinator, &handle, &prompt))?;
    if outcome == ImportOutcome::Cancelled {
        coordinator.abandon(&handle);
    }
    report(&outcome)
}

/// Resume command handler
pub fn cmd_resume(
    config_path: Option<&Path>,
    settings: &AppSettings,
    id: Uuid,
    password_env: Option<&str>,
) -> Result<(), CliError> {
    let config_manager = create_config_manager(config_path)?;
    let frozen = config_manager.load_pending(id).map_err(|e| match e {
        authvault_core::error::ConfigError::PendingNotFound(_) => CliError::PendingNotFound(id),
        other => other.into(),
    })?;

    let runtime = runtime()?;
    let mut coordinator = coordinator(settings)?;
    let handle = coordinator.thaw(frozen)?;

    let prompt = TerminalPrompt::new(password_env);
    let outcome = runtime.block_on(resolve_with_prompt(&mut coordinator, &handle, &prompt))?;

    if outcome == ImportOutcome::Cancelled {
        // store the updated attempt count so the limit spans runs
        let frozen = coordinator.freeze(&handle)?;
        tracing::debug!(import_id = %id, attempts = frozen.attempts, "Deferred import saved again");
        config_manager.save_pending(&frozen)?;
    } else {
        config_manager.remove_pending(id)?;
    }
    report(&outcome)
}

/// Abandon command handler
pub fn cmd_abandon(config_path: Option<&Path>, id: Uuid) -> Result<(), CliError> {
    let config_manager = create_config_manager(config_path)?;
    if !config_manager.remove_pending(id)? {
        return Err(CliError::PendingNotFound(id));
    }
    println!("Deferred import {id} discarded");
    Ok(())
}

/// Pending command handler
pub fn cmd_pending(config_path: Option<&Path>, format: OutputFormat) -> Result<(), CliError> {
    let config_manager = create_config_manager(config_path)?;
    let pending = config_manager.list_pending()?;

    match format {
        OutputFormat::Table => {
            if pending.is_empty() {
                println!("No deferred imports.");
                return Ok(());
            }
            println!("{:<36}  {:<8}  {:<8}  CREATED", "ID", "FORMAT", "ATTEMPTS");
            for item in &pending {
                println!(
                    "{:<36}  {:<8}  {:<8}  {}",
                    item.id,
                    item.format,
                    item.attempts,
                    item.created_at.format("%Y-%m-%d %H:%M:%S")
                );
            }
        }
        OutputFormat::Json => {
            let rows: Vec<serde_json::Value> = pending
                .iter()
                .map(|item| {
                    serde_json::json!({
                        "id": item.id,
                        "format": item.format,
                        "attempts": item.attempts,
                        "created_at": item.created_at,
                    })
                })
                .collect();
            let json = serde_json::to_string_pretty(&rows)
                .map_err(|e| CliError::Config(format!("Failed to serialize to JSON: {e}")))?;
            println!("{json}");
        }
        OutputFormat::Csv => {
            println!("id,format,attempts,created_at");
            for item in &pending {
                println!(
                    "{},{},{},{}",
                    item.id,
                    item.format,
                    item.attempts,
                    item.created_at.to_rfc3339()
                );
            }
        }
    }
    Ok(())
}
