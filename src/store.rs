//! JSON file store backing the built-in resources
//!
//! Each resource owns one file in the store directory: a JSON object mapping
//! unit keys to their stored properties. The file is the backend's only
//! state; nothing persists in the process between invocations.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde_json::{Map, Value};

#[derive(Debug)]
pub struct Store {
    path: PathBuf,
}

impl Store {
    pub fn open(dir: &Path, name: &str) -> Self {
        Self {
            path: dir.join(format!("{name}.json")),
        }
    }

    /// Default store directory under the user data dir
    pub fn default_dir() -> Result<PathBuf> {
        let data = dirs::data_dir().context("could not determine data directory")?;
        Ok(data.join("verge"))
    }

    /// Load the unit map; a missing file is an empty store
    pub fn load(&self) -> Result<Map<String, Value>> {
        if !self.path.exists() {
            return Ok(Map::new());
        }
        let content = std::fs::read_to_string(&self.path)
            .with_context(|| format!("could not read store file: {}", self.path.display()))?;
        serde_json::from_str(&content)
            .with_context(|| format!("invalid store file: {}", self.path.display()))
    }

    /// Persist the unit map, creating the store directory if needed
    pub fn save(&self, units: &Map<String, Value>) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("could not create store dir: {}", parent.display()))?;
        }
        let content =
            serde_json::to_string_pretty(units).context("could not serialize store")?;
        std::fs::write(&self.path, content)
            .with_context(|| format!("could not write store file: {}", self.path.display()))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn missing_file_is_empty_store() {
        let dir = tempfile::tempdir().unwrap();
        let store = Store::open(dir.path(), "units");
        assert!(store.load().unwrap().is_empty());
    }

    #[test]
    fn save_then_load_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let store = Store::open(dir.path(), "units");

        let mut units = Map::new();
        units.insert("web".to_string(), json!({"members": ["a"]}));
        store.save(&units).unwrap();

        assert_eq!(store.load().unwrap(), units);
    }

    #[test]
    fn corrupt_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("units.json"), "{broken").unwrap();
        let store = Store::open(dir.path(), "units");
        assert!(store.load().is_err());
    }
}
