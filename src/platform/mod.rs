//! Platform abstraction layer
//!
//! Handles browser/native differences for:
//! - Wall-clock time (score record timestamps)
//! - Default storage backend (LocalStorage on web, a JSON file natively)
//! - The JS-facing game handle (wasm32 only)

use crate::persistence::KeyValueStore;

#[cfg(target_arch = "wasm32")]
mod web;

#[cfg(target_arch = "wasm32")]
pub use web::WebGame;

/// Milliseconds since the Unix epoch
#[cfg(target_arch = "wasm32")]
pub fn now_millis() -> f64 {
    js_sys::Date::now()
}

/// Milliseconds since the Unix epoch
#[cfg(not(target_arch = "wasm32"))]
pub fn now_millis() -> f64 {
    use std::time::{SystemTime, UNIX_EPOCH};

    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs_f64() * 1000.0)
        .unwrap_or(0.0)
}

/// Browser LocalStorage
#[cfg(target_arch = "wasm32")]
pub fn default_store() -> Box<dyn KeyValueStore> {
    Box::new(crate::persistence::LocalStore::new())
}

/// Score file in the platform data directory, or memory if that can't be opened
#[cfg(not(target_arch = "wasm32"))]
pub fn default_store() -> Box<dyn KeyValueStore> {
    match crate::persistence::FileStore::open_default() {
        Ok(store) => {
            log::info!("Using score file {}", store.path().display());
            Box::new(store)
        }
        Err(e) => {
            log::warn!("Score file unavailable ({e}), scores will not persist");
            Box::new(crate::persistence::MemoryStore::new())
        }
    }
}

/// Seed derived from the wall clock, for sessions that don't need replay
pub fn time_seed() -> u64 {
    now_millis() as u64
}

#[cfg(all(test, not(target_arch = "wasm32")))]
mod tests {
    use super::*;

    #[test]
    fn test_now_millis_is_recent() {
        // 2020-01-01T00:00:00Z
        assert!(now_millis() > 1_577_836_800_000.0);
    }
}
