use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use engine_logging::{engine_debug, engine_warn};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};
use tempfile::NamedTempFile;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PersistError {
    #[error("output directory missing or not writable: {0}")]
    OutputDir(String),
    #[error("io error: {0}")]
    Io(#[from] io::Error),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Ensure output directory exists; create if missing.
pub fn ensure_output_dir(dir: &Path) -> Result<(), PersistError> {
    if dir.exists() {
        let meta = fs::metadata(dir).map_err(|e| PersistError::OutputDir(e.to_string()))?;
        if !meta.is_dir() {
            return Err(PersistError::OutputDir(format!(
                "{} is not a directory",
                dir.display()
            )));
        }
    } else {
        fs::create_dir_all(dir).map_err(|e| PersistError::OutputDir(e.to_string()))?;
    }
    Ok(())
}

/// Atomically write content to `{dir}/{filename}` by writing a temp file then renaming.
pub struct AtomicFileWriter {
    dir: PathBuf,
}

impl AtomicFileWriter {
    pub fn new(dir: PathBuf) -> Self {
        Self { dir }
    }

    pub fn write(&self, filename: &str, content: &str) -> Result<PathBuf, PersistError> {
        self.write_bytes(filename, content.as_bytes())
    }

    /// The data is flushed and synced before the rename, so a returned path is durable.
    pub fn write_bytes(&self, filename: &str, content: &[u8]) -> Result<PathBuf, PersistError> {
        ensure_output_dir(&self.dir)?;

        let target = self.dir.join(filename);
        let mut tmp = NamedTempFile::new_in(&self.dir)?;
        tmp.write_all(content)?;
        tmp.flush()?;
        tmp.as_file_mut().sync_all()?;

        if target.exists() {
            fs::remove_file(&target)?;
        }
        tmp.persist(&target).map_err(|e| PersistError::Io(e.error))?;
        Ok(target)
    }
}

/// JSON object file shared by several adventures, one top-level key per adventure code.
#[derive(Debug, Clone)]
pub struct KeyedJsonStore {
    path: PathBuf,
}

impl KeyedJsonStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whole file as an object; missing or malformed files read as empty.
    fn load_all(&self) -> Map<String, Value> {
        let content = match fs::read_to_string(&self.path) {
            Ok(text) => text,
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                engine_debug!("No ledger at {:?}, starting empty", self.path);
                return Map::new();
            }
            Err(err) => {
                engine_warn!("Failed to read ledger {:?}: {}", self.path, err);
                return Map::new();
            }
        };

        match serde_json::from_str::<Value>(&content) {
            Ok(Value::Object(map)) => map,
            Ok(_) => {
                engine_warn!("Ledger {:?} is not a JSON object, ignoring it", self.path);
                Map::new()
            }
            Err(err) => {
                engine_warn!("Failed to parse ledger {:?}: {}", self.path, err);
                Map::new()
            }
        }
    }

    /// Section stored under `key`, or the default when absent or of the wrong shape.
    pub fn load_section<T>(&self, key: &str) -> T
    where
        T: DeserializeOwned + Default,
    {
        let Some(value) = self.load_all().remove(key) else {
            return T::default();
        };
        match serde_json::from_value(value) {
            Ok(section) => section,
            Err(err) => {
                engine_warn!("Ledger {:?} section {} is malformed: {}", self.path, key, err);
                T::default()
            }
        }
    }

    /// Replace the section under `key`, keeping every other adventure's data.
    pub fn save_section<T>(&self, key: &str, section: &T) -> Result<(), PersistError>
    where
        T: Serialize + ?Sized,
    {
        let mut all = self.load_all();
        all.insert(key.to_string(), serde_json::to_value(section)?);
        let content = serde_json::to_string_pretty(&Value::Object(all))?;

        let dir = self
            .path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));
        let filename = self
            .path
            .file_name()
            .and_then(|name| name.to_str())
            .ok_or_else(|| PersistError::OutputDir(format!("invalid ledger path {:?}", self.path)))?;
        AtomicFileWriter::new(dir).write(filename, &content)?;
        Ok(())
    }
}
