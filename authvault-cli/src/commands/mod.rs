//! Command handler modules for the CLI.

mod generate;
mod import;
mod init;
mod list;

use std::path::Path;

use authvault_core::config::AppSettings;

use crate::cli::Commands;
use crate::error::CliError;

/// Dispatch a CLI command to the appropriate handler.
pub fn dispatch(
    config_path: Option<&Path>,
    settings: &AppSettings,
    command: Commands,
) -> Result<(), CliError> {
    match command {
        Commands::Init {
            encrypt,
            password_env,
        } => init::cmd_init(settings, encrypt, password_env.as_deref()),
        Commands::List { format } => list::cmd_list(settings, format),
        Commands::Import {
            file,
            defer,
            password_env,
        } => import::cmd_import(
            config_path,
            settings,
            &file,
            defer,
            password_env.as_deref(),
        ),
        Commands::Resume { id, password_env } => {
            import::cmd_resume(config_path, settings, id, password_env.as_deref())
        }
        Commands::Abandon { id } => import::cmd_abandon(config_path, id),
        Commands::Pending { format } => import::cmd_pending(config_path, format),
        Commands::Completions { shell } => generate::cmd_completions(shell),
        Commands::ManPage => generate::cmd_manpage(),
    }
}
