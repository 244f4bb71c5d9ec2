//! Application settings stored in `settings.toml`.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::import::DEFAULT_MAX_IMPORT_SIZE;
use crate::tracing::{TracingConfig, TracingLevel, TracingOutput};

/// Root of the settings file
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppSettings {
    /// Vault location
    #[serde(default)]
    pub vault: VaultSettings,
    /// Import engine limits
    #[serde(default)]
    pub import: ImportSettings,
    /// Log output
    #[serde(default)]
    pub logging: LoggingSettings,
}

/// Where the vault lives
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VaultSettings {
    /// Vault file path; `~` and environment variables are expanded
    pub path: String,
}

impl Default for VaultSettings {
    fn default() -> Self {
        let path = dirs::data_dir().map_or_else(
            || "~/.local/share/authvault/vault.json".to_string(),
            |dir| dir.join("authvault").join("vault.json").display().to_string(),
        );
        Self { path }
    }
}

impl VaultSettings {
    /// Returns the vault path with `~` and `$VARS` expanded.
    ///
    /// Falls back to tilde-only expansion if a variable is undefined.
    #[must_use]
    pub fn expanded_path(&self) -> PathBuf {
        expand_path(&self.path)
    }
}

fn expand_path(path: &str) -> PathBuf {
    shellexpand::full(path).map_or_else(
        |_| PathBuf::from(shellexpand::tilde(path).into_owned()),
        |p| PathBuf::from(p.into_owned()),
    )
}

/// Import engine limits
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportSettings {
    /// Failed credential attempts before a suspended import is discarded.
    /// `None` allows unlimited retries.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_credential_attempts: Option<u32>,
    /// Largest file accepted for import, in bytes
    #[serde(default = "default_max_file_size")]
    pub max_file_size: u64,
}

const fn default_max_file_size() -> u64 {
    DEFAULT_MAX_IMPORT_SIZE
}

impl Default for ImportSettings {
    fn default() -> Self {
        Self {
            max_credential_attempts: None,
            max_file_size: DEFAULT_MAX_IMPORT_SIZE,
        }
    }
}

/// Log output settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingSettings {
    /// Default level (`error`, `warn`, `info`, `debug`, `trace`)
    #[serde(default = "default_level")]
    pub level: String,
    /// Optional `EnvFilter` directive string overriding `level`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filter: Option<String>,
    /// Append logs to this file instead of stderr; `~` and `$VARS` are expanded
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
}

fn default_level() -> String {
    "warn".to_string()
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: default_level(),
            filter: None,
            file: None,
        }
    }
}

impl LoggingSettings {
    /// Builds a tracing configuration; unknown levels fall back to `warn`
    #[must_use]
    pub fn tracing_config(&self) -> TracingConfig {
        let level = self.level.parse().unwrap_or(TracingLevel::Warn);
        let mut config = TracingConfig::new().with_level(level);
        if let Some(file) = &self.file {
            config = config.with_output(TracingOutput::File(expand_path(file)));
        }
        match &self.filter {
            Some(filter) => config.with_filter(filter.clone()),
            None => config,
        }
    }
}
