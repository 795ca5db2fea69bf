//! Native file backend
//!
//! All keys live in one JSON document:
//! `{ "version": 1, "entries": { "<key>": "<json value>", ... } }`
//!
//! Writes go to `<file>.tmp` and are renamed over the original so a crash
//! mid-write never leaves a truncated document. A document that fails to
//! parse (or carries an unknown version) is moved aside to `<file>.bak` and
//! the store starts empty.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

use super::{KeyValueStore, StoreError};

/// Current envelope version
const ENVELOPE_VERSION: u32 = 1;

#[derive(Debug, Serialize, Deserialize)]
struct Envelope {
    version: u32,
    entries: BTreeMap<String, String>,
}

/// JSON file store
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    entries: BTreeMap<String, String>,
}

impl FileStore {
    /// Open the store in the platform data directory
    pub fn open_default() -> Result<Self, StoreError> {
        let dirs = ProjectDirs::from("", "", "fluttor")
            .ok_or_else(|| StoreError::Unavailable("no home directory".to_string()))?;
        Self::open(dirs.data_dir().join("scores.json"))
    }

    /// Open (or create) a store at `path`
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let entries = match fs::read_to_string(&path) {
            Ok(text) => match serde_json::from_str::<Envelope>(&text) {
                Ok(envelope) if envelope.version == ENVELOPE_VERSION => {
                    log::info!("Loaded {} stored keys from {}", envelope.entries.len(), path.display());
                    envelope.entries
                }
                Ok(envelope) => {
                    log::warn!(
                        "Unsupported store version {} in {}, starting fresh",
                        envelope.version,
                        path.display()
                    );
                    quarantine(&path);
                    BTreeMap::new()
                }
                Err(e) => {
                    log::warn!("Corrupt store {} ({e}), starting fresh", path.display());
                    quarantine(&path);
                    BTreeMap::new()
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                log::info!("No store at {}, starting fresh", path.display());
                BTreeMap::new()
            }
            Err(e) => return Err(e.into()),
        };

        Ok(Self { path, entries })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn flush(&self) -> Result<(), StoreError> {
        let envelope = Envelope {
            version: ENVELOPE_VERSION,
            entries: self.entries.clone(),
        };
        let json = serde_json::to_string_pretty(&envelope)?;
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, json)?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

/// Move an unreadable document out of the way, keeping it for inspection
fn quarantine(path: &Path) {
    let backup = path.with_extension("json.bak");
    if let Err(e) = fs::rename(path, &backup) {
        log::warn!("Could not move {} aside: {e}", path.display());
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.entries.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: String) -> Result<(), StoreError> {
        self.entries.insert(key.to_string(), value);
        self.flush()
    }

    fn remove(&mut self, key: &str) -> Result<(), StoreError> {
        if self.entries.remove(key).is_some() {
            self.flush()?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_path(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("fluttor-test-{}-{name}", std::process::id()));
        let _ = fs::remove_dir_all(&dir);
        dir.join("scores.json")
    }

    #[test]
    fn test_file_store_survives_reopen() {
        let path = temp_path("reopen");
        {
            let mut store = FileStore::open(&path).unwrap();
            store.set("highScore", "30".to_string()).unwrap();
        }
        let store = FileStore::open(&path).unwrap();
        assert_eq!(store.get("highScore").unwrap().as_deref(), Some("30"));
        let _ = fs::remove_dir_all(path.parent().unwrap());
    }

    #[test]
    fn test_corrupt_file_starts_empty() {
        let path = temp_path("corrupt");
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, "{{{ definitely not json").unwrap();

        let store = FileStore::open(&path).unwrap();
        assert_eq!(store.get("highScore").unwrap(), None);
        assert!(path.with_extension("json.bak").exists());
        let _ = fs::remove_dir_all(path.parent().unwrap());
    }
}
