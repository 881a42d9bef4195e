use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use parking_lot::Mutex;
use serde_json::{Map, Value};
use tracing::warn;

use crate::filter::FilterMode;

pub const SELECTED_FILTER_KEY: &str = "selectedFilter";

/// Durable storage for the single "selected filter" entry.
pub trait FilterModeStore: Send + Sync {
    fn get(&self) -> Result<Option<String>>;
    /// `None` removes the entry.
    fn set(&self, value: Option<&str>) -> Result<()>;
}

#[derive(Debug, Default)]
pub struct MemoryFilterModeStore {
    value: Mutex<Option<String>>,
}

impl MemoryFilterModeStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_value(value: impl Into<String>) -> Self {
        Self {
            value: Mutex::new(Some(value.into())),
        }
    }
}

impl FilterModeStore for MemoryFilterModeStore {
    fn get(&self) -> Result<Option<String>> {
        Ok(self.value.lock().clone())
    }

    fn set(&self, value: Option<&str>) -> Result<()> {
        *self.value.lock() = value.map(str::to_string);
        Ok(())
    }
}

/// Keeps the entry in a flat JSON object on disk, next to any other keys the
/// host application stores there.
#[derive(Debug, Clone)]
pub struct JsonFileFilterModeStore {
    path: PathBuf,
}

impl JsonFileFilterModeStore {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Where an unreadable settings file is copied before it is replaced.
    pub fn backup_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(OsString::from)
            .unwrap_or_default();
        name.push(".bak");
        self.path.with_file_name(name)
    }

    fn read_entries(&self) -> Result<Map<String, Value>> {
        if !self.path.exists() {
            return Ok(Map::new());
        }
        let raw = fs::read_to_string(&self.path)
            .with_context(|| format!("reading settings file `{}`", self.path.display()))?;
        if raw.trim().is_empty() {
            return Ok(Map::new());
        }
        serde_json::from_str(&raw)
            .with_context(|| format!("parsing settings file `{}`", self.path.display()))
    }
}

impl FilterModeStore for JsonFileFilterModeStore {
    fn get(&self) -> Result<Option<String>> {
        match self.read_entries()?.remove(SELECTED_FILTER_KEY) {
            None => Ok(None),
            Some(Value::String(value)) => Ok(Some(value)),
            Some(other) => Err(anyhow!(
                "`{SELECTED_FILTER_KEY}` in `{}` is not a string: {other}",
                self.path.display()
            )),
        }
    }

    fn set(&self, value: Option<&str>) -> Result<()> {
        let mut entries = match self.read_entries() {
            Ok(entries) => entries,
            Err(err) => {
                let backup = self.backup_path();
                warn!(%err, backup = %backup.display(), "replacing unreadable settings file");
                fs::copy(&self.path, &backup).with_context(|| {
                    format!("backing up settings file to `{}`", backup.display())
                })?;
                Map::new()
            }
        };
        match value {
            Some(value) => {
                entries.insert(SELECTED_FILTER_KEY.to_string(), Value::from(value));
            }
            None => {
                entries.remove(SELECTED_FILTER_KEY);
            }
        }
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let payload = serde_json::to_string_pretty(&entries)?;
        fs::write(&self.path, payload)
            .with_context(|| format!("writing settings file `{}`", self.path.display()))?;
        Ok(())
    }
}

/// Typed view over a [`FilterModeStore`]. Missing, unreadable or unknown
/// values read as [`FilterMode::All`]; `All` is stored as an absent entry.
pub struct FilterPreference {
    store: Box<dyn FilterModeStore>,
}

impl FilterPreference {
    pub fn new(store: Box<dyn FilterModeStore>) -> Self {
        Self { store }
    }

    pub fn load(&self) -> FilterMode {
        match self.store.get() {
            Ok(None) => FilterMode::All,
            Ok(Some(raw)) => raw.parse::<FilterMode>().unwrap_or_else(|err| {
                warn!(%err, "ignoring persisted filter mode");
                FilterMode::All
            }),
            Err(err) => {
                warn!(%err, "unable to read persisted filter mode");
                FilterMode::All
            }
        }
    }

    pub fn save(&self, mode: FilterMode) -> Result<()> {
        match mode {
            FilterMode::All => self.store.set(None),
            other => self.store.set(Some(other.as_str())),
        }
    }
}

impl Default for FilterPreference {
    fn default() -> Self {
        Self::new(Box::new(MemoryFilterModeStore::new()))
    }
}
