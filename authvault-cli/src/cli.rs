//! CLI argument parsing types using `clap`.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use clap_complete::Shell;
use uuid::Uuid;

/// `AuthVault` command-line interface for the OTP credential store
#[derive(Parser)]
#[command(name = "authvault-cli")]
#[command(author, version, about = "AuthVault command-line interface")]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to the configuration directory
    #[arg(short, long, global = true, env = "AUTHVAULT_CONFIG_DIR")]
    pub config: Option<PathBuf>,

    /// Increase log verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands
#[derive(Subcommand)]
pub enum Commands {
    /// Create the vault file
    #[command(about = "Create an empty vault at the configured path")]
    Init {
        /// Protect the vault with a password
        #[arg(long)]
        encrypt: bool,

        /// Read the new vault password from this environment variable
        #[arg(long, value_name = "VAR")]
        password_env: Option<String>,
    },

    /// List vault entries
    #[command(about = "List the entries stored in the vault")]
    List {
        /// Output format for the entry list
        #[arg(short, long, default_value = "table", value_enum)]
        format: OutputFormat,
    },

    /// Import a backup file
    #[command(about = "Import credentials from a backup file (format is detected)")]
    Import {
        /// Backup file to import
        file: PathBuf,

        /// Save an encrypted import for later instead of asking for the password now
        #[arg(long)]
        defer: bool,

        /// Read the backup password from this environment variable
        #[arg(long, value_name = "VAR")]
        password_env: Option<String>,
    },

    /// Continue a deferred import
    #[command(about = "Resume a deferred import by supplying its password")]
    Resume {
        /// Deferred import ID (see `pending`)
        id: Uuid,

        /// Read the backup password from this environment variable
        #[arg(long, value_name = "VAR")]
        password_env: Option<String>,
    },

    /// Drop a deferred import
    #[command(about = "Discard a deferred import without importing anything")]
    Abandon {
        /// Deferred import ID (see `pending`)
        id: Uuid,
    },

    /// List deferred imports
    #[command(about = "List imports waiting for a password")]
    Pending {
        /// Output format
        #[arg(short, long, default_value = "table", value_enum)]
        format: OutputFormat,
    },

    /// Generate shell completions
    #[command(about = "Generate shell completions for bash, zsh, fish, etc.")]
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },

    /// Generate a man page
    #[command(about = "Print the man page to stdout")]
    ManPage,
}

/// Output format for listing commands
#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum OutputFormat {
    /// Display as formatted table
    Table,
    /// Output as JSON
    Json,
    /// Output as CSV
    Csv,
}
