//! `AuthVault` CLI - Command-line interface for the `AuthVault` OTP store
//!
//! Provides commands for creating and listing the vault, importing backups
//! from other authenticator apps, and managing imports that are waiting for
//! a password.

mod cli;
mod commands;
mod error;
mod util;

use clap::Parser;
use cli::Cli;

fn main() {
    let cli = Cli::parse();
    let config_path = cli.config.as_deref();
    let settings = util::load_settings_or_default(config_path);

    let steps = if cli.quiet {
        -1
    } else {
        i8::try_from(cli.verbose).unwrap_or(i8::MAX)
    };
    let mut tracing_config = settings.logging.tracing_config();
    tracing_config.level = tracing_config.level.adjusted(steps);
    if let Err(e) = authvault_core::tracing::init_tracing(&tracing_config) {
        eprintln!("Warning: logging disabled: {e}");
    }

    let result = commands::dispatch(config_path, &settings, cli.command);

    if let Err(e) = result {
        if !cli.quiet {
            eprintln!("Error: {e}");
        }
        tracing::debug!(exit_code = e.exit_code(), "Command failed");
        std::process::exit(e.exit_code());
    }
}
