//! `localStorage` backend
//!
//! Quota errors and private browsing windows surface as `StoreError`s so the
//! engine can refuse a draw instead of half-writing it.

use epe_gacha_core::error::StoreError;
use epe_gacha_core::store::KeyValueStore;
use wasm_bindgen::JsValue;

pub struct BrowserStorage {
    storage: web_sys::Storage,
}

impl BrowserStorage {
    /// The window's `localStorage`, if the browser exposes one
    pub fn local() -> Result<Self, StoreError> {
        let storage = web_sys::window()
            .and_then(|window| window.local_storage().ok().flatten())
            .ok_or(StoreError::Unavailable)?;
        Ok(Self { storage })
    }
}

fn write_failed(key: &str, error: JsValue) -> StoreError {
    StoreError::WriteFailed {
        key: key.into(),
        reason: format!("{:?}", error),
    }
}

impl KeyValueStore for BrowserStorage {
    fn get(&self, key: &str) -> Option<String> {
        self.storage.get_item(key).ok().flatten()
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StoreError> {
        self.storage
            .set_item(key, value)
            .map_err(|e| write_failed(key, e))
    }

    fn remove(&mut self, key: &str) -> Result<(), StoreError> {
        self.storage
            .remove_item(key)
            .map_err(|e| write_failed(key, e))
    }
}
