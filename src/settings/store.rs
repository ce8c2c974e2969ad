//! Key-value preference storage.

use crate::error::Result;
use serde_json::{Map, Value};
use std::cell::RefCell;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

/// A per-user key-value store for string preferences.
///
/// Methods take `&self`; implementations handle their own interior state so a
/// single store can be shared through `Rc` by every component that needs it.
pub trait PreferenceStore {
    fn get_string(&self, key: &str) -> Result<Option<String>>;
    fn set_string(&self, key: &str, value: &str) -> Result<()>;
    fn remove(&self, key: &str) -> Result<()>;
}

/// Preferences kept as a JSON object in a single file.
///
/// The file is read on every lookup and rewritten on every change, so several
/// processes sharing it see each other's last write.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read(&self) -> Result<Map<String, Value>> {
        if !self.path.exists() {
            return Ok(Map::new());
        }
        let json = fs::read_to_string(&self.path)?;
        if json.trim().is_empty() {
            return Ok(Map::new());
        }
        Ok(serde_json::from_str(&json)?)
    }

    fn write(&self, map: &Map<String, Value>) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(map)?;
        fs::write(&self.path, json)?;
        Ok(())
    }
}

impl PreferenceStore for JsonFileStore {
    fn get_string(&self, key: &str) -> Result<Option<String>> {
        Ok(self
            .read()?
            .get(key)
            .and_then(Value::as_str)
            .map(str::to_string))
    }

    fn set_string(&self, key: &str, value: &str) -> Result<()> {
        let mut map = self.read()?;
        map.insert(key.to_string(), Value::String(value.to_string()));
        self.write(&map)
    }

    fn remove(&self, key: &str) -> Result<()> {
        let mut map = self.read()?;
        if map.remove(key).is_some() {
            self.write(&map)?;
        }
        Ok(())
    }
}

/// In-process store, for tests and one-off runs.
#[derive(Debug, Default)]
pub struct MemoryStore {
    values: RefCell<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl PreferenceStore for MemoryStore {
    fn get_string(&self, key: &str) -> Result<Option<String>> {
        Ok(self.values.borrow().get(key).cloned())
    }

    fn set_string(&self, key: &str, value: &str) -> Result<()> {
        self.values
            .borrow_mut()
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        self.values.borrow_mut().remove(key);
        Ok(())
    }
}
