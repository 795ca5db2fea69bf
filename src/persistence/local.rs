//! Browser LocalStorage backend (wasm32 only)

use super::{KeyValueStore, StoreError};

/// Prefix applied to every key so the game shares the origin politely
const KEY_PREFIX: &str = "fluttor.";

/// LocalStorage-backed store
#[derive(Debug, Default)]
pub struct LocalStore;

impl LocalStore {
    pub fn new() -> Self {
        Self
    }

    fn storage() -> Result<web_sys::Storage, StoreError> {
        web_sys::window()
            .and_then(|w| w.local_storage().ok())
            .flatten()
            .ok_or_else(|| StoreError::Unavailable("LocalStorage not accessible".to_string()))
    }
}

fn prefixed(key: &str) -> String {
    format!("{KEY_PREFIX}{key}")
}

impl KeyValueStore for LocalStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        Self::storage()?
            .get_item(&prefixed(key))
            .map_err(|_| StoreError::Unavailable(format!("read of {key} rejected")))
    }

    fn set(&mut self, key: &str, value: String) -> Result<(), StoreError> {
        Self::storage()?
            .set_item(&prefixed(key), &value)
            .map_err(|_| StoreError::Unavailable(format!("write of {key} rejected")))
    }

    fn remove(&mut self, key: &str) -> Result<(), StoreError> {
        Self::storage()?
            .remove_item(&prefixed(key))
            .map_err(|_| StoreError::Unavailable(format!("removal of {key} rejected")))
    }
}
