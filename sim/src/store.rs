//! JSON file backend for offline administration
//!
//! The whole key/value map lives in one JSON object on disk. Every write
//! rewrites the file through a temporary sibling and a rename, so a crash
//! leaves either the old or the new contents.

use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use epe_gacha_core::error::StoreError;
use epe_gacha_core::store::KeyValueStore;

pub struct FileStore {
    path: PathBuf,
    values: BTreeMap<String, String>,
}

impl FileStore {
    /// Open a data file, starting empty when it does not exist yet
    pub fn open(path: impl AsRef<Path>) -> io::Result<Self> {
        let path = path.as_ref().to_path_buf();
        let values = match fs::read_to_string(&path) {
            Ok(raw) => serde_json::from_str(&raw)
                .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?,
            Err(e) if e.kind() == io::ErrorKind::NotFound => BTreeMap::new(),
            Err(e) => return Err(e),
        };
        Ok(Self { path, values })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn flush(&self) -> io::Result<()> {
        let raw = serde_json::to_string_pretty(&self.values)?;
        let tmp = self.path.with_extension("tmp");
        fs::write(&tmp, raw)?;
        fs::rename(&tmp, &self.path)
    }

    /// Apply a change in memory, persist it, and undo it if the file
    /// could not be written
    fn update(&mut self, key: &str, value: Option<&str>) -> Result<(), StoreError> {
        let previous = match value {
            Some(value) => self.values.insert(key.to_string(), value.to_string()),
            None => self.values.remove(key),
        };

        if let Err(e) = self.flush() {
            match previous {
                Some(old) => self.values.insert(key.to_string(), old),
                None => self.values.remove(key),
            };
            return Err(StoreError::WriteFailed {
                key: key.to_string(),
                reason: e.to_string(),
            });
        }
        Ok(())
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Option<String> {
        self.values.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StoreError> {
        self.update(key, Some(value))
    }

    fn remove(&mut self, key: &str) -> Result<(), StoreError> {
        if !self.values.contains_key(key) {
            return Ok(());
        }
        self.update(key, None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use epe_gacha_core::store::KEY_POINTS_DB;

    fn scratch(name: &str) -> PathBuf {
        let path = std::env::temp_dir().join(format!(
            "epe-gacha-{}-{}.json",
            name,
            std::process::id()
        ));
        let _ = fs::remove_file(&path);
        path
    }

    #[test]
    fn test_values_survive_reopen() {
        let path = scratch("reopen");
        let mut store = FileStore::open(&path).unwrap();
        store.set(KEY_POINTS_DB, r#"{"Tom":70}"#).unwrap();

        let reopened = FileStore::open(&path).unwrap();
        assert_eq!(reopened.get(KEY_POINTS_DB).as_deref(), Some(r#"{"Tom":70}"#));

        let _ = fs::remove_file(&path);
    }

    #[test]
    fn test_missing_file_starts_empty() {
        let store = FileStore::open(scratch("missing")).unwrap();
        assert_eq!(store.get(KEY_POINTS_DB), None);
    }

    #[test]
    fn test_unwritable_location_rolls_back() {
        let mut store = FileStore {
            path: PathBuf::from("/nonexistent-dir/epe-gacha/data.json"),
            values: BTreeMap::new(),
        };

        assert!(store.set(KEY_POINTS_DB, "{}").is_err());
        assert_eq!(store.get(KEY_POINTS_DB), None);
    }

    #[test]
    fn test_garbage_file_is_an_error() {
        let path = scratch("garbage");
        fs::write(&path, "not json").unwrap();

        assert!(FileStore::open(&path).is_err());

        let _ = fs::remove_file(&path);
    }
}
