use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use muncher_core::SessionOptions;
use serde::Deserialize;
use thiserror::Error;

use crate::fetch::FetchSettings;
use crate::persist::KeyedJsonStore;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config: {0}")]
    Parse(#[from] ron::error::SpannedError),
}

/// Settings for one adventure conversion, usually loaded from a RON file.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct MuncherConfig {
    pub book_code: String,
    /// Root that downloaded assets are written under.
    pub source_dir: PathBuf,
    /// Directory of the keyed JSON ledgers.
    pub config_dir: PathBuf,
    /// Directory of table and scene hint files.
    pub hints_dir: PathBuf,
    pub download_timeout_ms: u64,
    pub max_download_bytes: u64,
    pub disable_large_downloads: bool,
    pub table_find: bool,
    pub table_debug: bool,
    pub image_find: bool,
}

impl Default for MuncherConfig {
    fn default() -> Self {
        Self {
            book_code: String::new(),
            source_dir: PathBuf::from("source"),
            config_dir: PathBuf::from("config"),
            hints_dir: PathBuf::from("hints"),
            download_timeout_ms: 60_000,
            max_download_bytes: 100 * 1024 * 1024,
            disable_large_downloads: false,
            table_find: false,
            table_debug: false,
            image_find: false,
        }
    }
}

impl MuncherConfig {
    pub fn from_ron_str(content: &str) -> Result<Self, ConfigError> {
        Ok(ron::from_str(content)?)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_ron_str(&content)
    }

    pub fn download_timeout(&self) -> Duration {
        Duration::from_millis(self.download_timeout_ms)
    }

    pub fn fetch_settings(&self) -> FetchSettings {
        FetchSettings {
            request_timeout: self.download_timeout(),
            max_bytes: self.max_download_bytes,
            ..FetchSettings::default()
        }
    }

    pub fn session_options(&self) -> SessionOptions {
        SessionOptions {
            image_find: self.image_find,
        }
    }

    /// Keyed ledger file inside `config_dir`.
    pub fn ledger(&self, filename: &str) -> KeyedJsonStore {
        KeyedJsonStore::new(self.config_dir.join(filename))
    }
}
