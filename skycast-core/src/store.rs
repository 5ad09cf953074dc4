//! Durable key-value preferences (last city, search history).
//!
//! Reads never fail: missing or corrupt data reads as absent, so the app keeps
//! working without persistence. Writes report errors and leave it to the caller
//! whether they matter.

use std::{
    collections::HashMap,
    fs, io,
    path::{Path, PathBuf},
    sync::Mutex,
};

use anyhow::anyhow;
use directories::ProjectDirs;
use tracing::{debug, warn};

pub const LAST_CITY_KEY: &str = "lastCity";
pub const SEARCH_HISTORY_KEY: &str = "searchHistory";

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub trait PreferenceStore: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError>;
}

/// Preferences kept as one JSON object on disk.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    // Serializes read-modify-write cycles from this process.
    lock: Mutex<()>,
}

impl FileStore {
    pub const FILE_NAME: &'static str = "preferences.json";

    pub fn at_path(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into(), lock: Mutex::new(()) }
    }

    /// Store inside `dir`, as `dir/preferences.json`.
    pub fn in_dir(dir: impl AsRef<Path>) -> Self {
        Self::at_path(dir.as_ref().join(Self::FILE_NAME))
    }

    /// Store in the platform data directory.
    pub fn open_default() -> anyhow::Result<Self> {
        let dirs = ProjectDirs::from("dev", "skycast", "skycast")
            .ok_or_else(|| anyhow!("Could not determine platform data directory"))?;

        Ok(Self::in_dir(dirs.data_dir()))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_map(&self) -> Option<HashMap<String, String>> {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return None,
            Err(err) => {
                warn!(path = %self.path.display(), error = %err, "Preferences unreadable");
                return None;
            }
        };

        match serde_json::from_str(&raw) {
            Ok(map) => Some(map),
            Err(err) => {
                warn!(path = %self.path.display(), error = %err, "Preferences corrupt, ignoring");
                None
            }
        }
    }
}

impl PreferenceStore for FileStore {
    fn get(&self, key: &str) -> Option<String> {
        let _guard = self.lock.lock().unwrap_or_else(|p| p.into_inner());
        self.read_map()?.remove(key)
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let _guard = self.lock.lock().unwrap_or_else(|p| p.into_inner());

        let mut map = self.read_map().unwrap_or_default();
        map.insert(key.to_string(), value.to_string());

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&self.path, serde_json::to_string_pretty(&map)?)?;

        debug!(key, path = %self.path.display(), "Preference saved");
        Ok(())
    }
}

/// In-process store; nothing survives the process.
#[derive(Debug, Default)]
pub struct MemoryStore {
    values: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_entries<'a>(entries: impl IntoIterator<Item = (&'a str, &'a str)>) -> Self {
        let values = entries.into_iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        Self { values: Mutex::new(values) }
    }
}

impl PreferenceStore for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        self.values.lock().unwrap_or_else(|p| p.into_inner()).get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        self.values
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .insert(key.to_string(), value.to_string());
        Ok(())
    }
}
