//! Loading and saving settings and deferred imports.

use std::fs;
use std::path::{Path, PathBuf};

use uuid::Uuid;

use crate::error::{ConfigError, ConfigResult};
use crate::import::FrozenImport;

use super::settings::AppSettings;

const SETTINGS_FILE: &str = "settings.toml";
const PENDING_DIR: &str = "pending";

/// Owns the configuration directory.
///
/// Layout:
///
/// ```text
/// <config_dir>/settings.toml
/// <config_dir>/pending/<uuid>.json   deferred imports
/// ```
#[derive(Debug, Clone)]
pub struct ConfigManager {
    config_dir: PathBuf,
}

impl ConfigManager {
    /// Uses the platform configuration directory (`~/.config/authvault` on Linux)
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::NoConfigDir`] if the platform has none.
    pub fn new() -> ConfigResult<Self> {
        let base = dirs::config_dir().ok_or(ConfigError::NoConfigDir)?;
        Ok(Self::with_config_dir(base.join("authvault")))
    }

    /// Uses an explicit configuration directory
    #[must_use]
    pub fn with_config_dir(config_dir: impl Into<PathBuf>) -> Self {
        Self {
            config_dir: config_dir.into(),
        }
    }

    /// Returns the configuration directory
    #[must_use]
    pub fn config_dir(&self) -> &Path {
        &self.config_dir
    }

    /// Path of `settings.toml`
    #[must_use]
    pub fn settings_path(&self) -> PathBuf {
        self.config_dir.join(SETTINGS_FILE)
    }

    fn pending_dir(&self) -> PathBuf {
        self.config_dir.join(PENDING_DIR)
    }

    fn pending_path(&self, id: Uuid) -> PathBuf {
        self.pending_dir().join(format!("{id}.json"))
    }

    /// Loads settings, returning defaults when the file does not exist
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load_settings(&self) -> ConfigResult<AppSettings> {
        let _span = tracing::debug_span!(crate::tracing::span_names::CONFIG_LOAD).entered();
        let path = self.settings_path();
        if !path.exists() {
            tracing::debug!(path = %path.display(), "No settings file, using defaults");
            return Ok(AppSettings::default());
        }
        let content = fs::read_to_string(&path).map_err(|e| ConfigError::Parse {
            path: path.clone(),
            reason: e.to_string(),
        })?;
        toml::from_str(&content).map_err(|e| ConfigError::Parse {
            path,
            reason: e.to_string(),
        })
    }

    /// Writes settings to `settings.toml`
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or writing fails.
    pub fn save_settings(&self, settings: &AppSettings) -> ConfigResult<()> {
        let content =
            toml::to_string_pretty(settings).map_err(|e| ConfigError::Serialize(e.to_string()))?;
        Self::write_file(&self.settings_path(), &content)
    }

    /// Persists a deferred import
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or writing fails.
    pub fn save_pending(&self, frozen: &FrozenImport) -> ConfigResult<PathBuf> {
        let content = serde_json::to_string_pretty(frozen)
            .map_err(|e| ConfigError::Serialize(e.to_string()))?;
        let path = self.pending_path(frozen.id);
        Self::write_file(&path, &content)?;
        tracing::info!(import_id = %frozen.id, format = %frozen.format, "Deferred import saved");
        Ok(path)
    }

    /// Loads the deferred import `id`
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::PendingNotFound`] if there is no such import
    /// and [`ConfigError::Parse`] if the record is unreadable.
    pub fn load_pending(&self, id: Uuid) -> ConfigResult<FrozenImport> {
        let path = self.pending_path(id);
        if !path.exists() {
            return Err(ConfigError::PendingNotFound(id.to_string()));
        }
        Self::read_pending(&path)
    }

    /// Deletes the deferred import `id`; missing records are not an error
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be removed.
    pub fn remove_pending(&self, id: Uuid) -> ConfigResult<bool> {
        let path = self.pending_path(id);
        match fs::remove_file(&path) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(ConfigError::Write {
                path,
                reason: e.to_string(),
            }),
        }
    }

    /// Lists deferred imports, oldest first.
    ///
    /// Unreadable records are skipped with a warning.
    ///
    /// # Errors
    ///
    /// Returns an error if the pending directory exists but cannot be read.
    pub fn list_pending(&self) -> ConfigResult<Vec<FrozenImport>> {
        let dir = self.pending_dir();
        if !dir.exists() {
            return Ok(Vec::new());
        }
        let entries = fs::read_dir(&dir).map_err(|e| ConfigError::Parse {
            path: dir.clone(),
            reason: e.to_string(),
        })?;

        let mut pending: Vec<FrozenImport> = entries
            .flatten()
            .map(|entry| entry.path())
            .filter(|path| path.extension().is_some_and(|ext| ext == "json"))
            .filter_map(|path| match Self::read_pending(&path) {
                Ok(frozen) => Some(frozen),
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "Skipping unreadable deferred import");
                    None
                }
            })
            .collect();
        pending.sort_by_key(|p| p.created_at);
        Ok(pending)
    }

    fn read_pending(path: &Path) -> ConfigResult<FrozenImport> {
        let content = fs::read_to_string(path).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        serde_json::from_str(&content).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })
    }

    fn write_file(path: &Path, content: &str) -> ConfigResult<()> {
        let write_err = |e: std::io::Error| ConfigError::Write {
            path: path.to_path_buf(),
            reason: e.to_string(),
        };
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(write_err)?;
        }
        fs::write(path, content).map_err(write_err)
    }
}
