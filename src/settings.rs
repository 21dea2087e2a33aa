use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{LoaderError, Result};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SecretBackend {
    #[default]
    Env,
    Keyring,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default = "default_data_dir_string")]
    pub data_dir: String,
    #[serde(default)]
    pub source_dir: Option<String>,
    #[serde(default)]
    pub archive_dir: Option<String>,
    #[serde(default)]
    pub log_dir: Option<String>,
    #[serde(default)]
    pub downloads_dir: Option<String>,
    #[serde(default = "default_file_extension")]
    pub file_extension: String,
    #[serde(default = "default_large_file_threshold")]
    pub large_file_threshold: u64,
    #[serde(default = "default_csv_chunk_size")]
    pub csv_chunk_size: usize,
    /// Size of the file-processing pool; 0 means one thread per CPU.
    #[serde(default)]
    pub worker_threads: usize,
    #[serde(default = "default_log_retention_days")]
    pub log_retention_days: u64,
    #[serde(default)]
    pub secret_backend: SecretBackend,
    #[serde(default = "default_keyring_service")]
    pub keyring_service: String,
    #[serde(default = "default_database_secret")]
    pub database_secret: String,
    #[serde(default = "default_password_secret")]
    pub password_secret: String,
}

fn default_file_extension() -> String {
    "csv".to_string()
}

fn default_large_file_threshold() -> u64 {
    10 * 1024 * 1024
}

fn default_csv_chunk_size() -> usize {
    100_000
}

fn default_log_retention_days() -> u64 {
    15
}

fn default_keyring_service() -> String {
    "budget-loader".to_string()
}

fn default_database_secret() -> String {
    "sql-database".to_string()
}

fn default_password_secret() -> String {
    "sql-password".to_string()
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir_string(),
            source_dir: None,
            archive_dir: None,
            log_dir: None,
            downloads_dir: None,
            file_extension: default_file_extension(),
            large_file_threshold: default_large_file_threshold(),
            csv_chunk_size: default_csv_chunk_size(),
            worker_threads: 0,
            log_retention_days: default_log_retention_days(),
            secret_backend: SecretBackend::default(),
            keyring_service: default_keyring_service(),
            database_secret: default_database_secret(),
            password_secret: default_password_secret(),
        }
    }
}

impl Settings {
    pub fn data_dir(&self) -> PathBuf {
        PathBuf::from(shellexpand_path(&self.data_dir))
    }

    pub fn source_dir(&self) -> PathBuf {
        match &self.source_dir {
            Some(p) => PathBuf::from(shellexpand_path(p)),
            None => self.data_dir().join("DataStorage"),
        }
    }

    pub fn archive_dir(&self) -> PathBuf {
        match &self.archive_dir {
            Some(p) => PathBuf::from(shellexpand_path(p)),
            None => self.source_dir().join("Archive"),
        }
    }

    pub fn log_dir(&self) -> PathBuf {
        match &self.log_dir {
            Some(p) => PathBuf::from(shellexpand_path(p)),
            None => self.data_dir().join("Logs"),
        }
    }

    pub fn downloads_dir(&self) -> PathBuf {
        match &self.downloads_dir {
            Some(p) => PathBuf::from(shellexpand_path(p)),
            None => home_dir().join("Downloads"),
        }
    }
}

fn home_dir() -> PathBuf {
    dirs::home_dir().unwrap_or_else(|| PathBuf::from("."))
}

fn config_dir() -> PathBuf {
    home_dir().join(".config").join("budget-loader")
}

pub fn settings_path() -> PathBuf {
    config_dir().join("settings.json")
}

fn default_data_dir_string() -> String {
    home_dir()
        .join("Documents")
        .join("budget-loader")
        .to_string_lossy()
        .to_string()
}

pub fn load_settings() -> Result<Settings> {
    load_settings_from(&settings_path())
}

/// A missing file yields defaults; a malformed one is an error.
pub fn load_settings_from(path: &Path) -> Result<Settings> {
    if !path.exists() {
        return Ok(Settings::default());
    }
    let content = std::fs::read_to_string(path)?;
    serde_json::from_str(&content)
        .map_err(|e| LoaderError::Settings(format!("{}: {e}", path.display())))
}

pub fn shellexpand_path(path: &str) -> String {
    if let Some(rest) = path.strip_prefix('~') {
        if let Some(home) = dirs::home_dir() {
            return format!("{}{rest}", home.to_string_lossy());
        }
    }
    path.to_string()
}
