//! Local persistence
//!
//! Everything lives in a small string key/value store (browser localStorage,
//! a JSON file, or memory in tests) with JSON values under fixed keys. The
//! engine never touches keys directly: it goes through the typed
//! repositories below, which `JsonStore` implements for any backend.
//!
//! Reads never fail. A missing or unparsable value reads as the default, so
//! a corrupted entry costs that entry and nothing else.

use alloc::collections::BTreeMap;
use alloc::string::String;
use alloc::vec::Vec;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::StoreError;
use crate::ledger::PointsLedger;
use crate::records::DrawRecords;
use crate::types::Session;

/// Active session
pub const KEY_SESSION: &str = "epe_user";
/// Draw log
pub const KEY_LOGS: &str = "epe_logs";
/// Points ledger
pub const KEY_POINTS_DB: &str = "epe_points_db";
/// Custom branding asset
pub const KEY_CUSTOM_LOGO: &str = "epe_custom_logo";
/// Remote document id
pub const KEY_CLOUD_ID: &str = "epe_cloud_sync_id";

/// Every key this crate writes
pub const ALL_KEYS: [&str; 5] = [
    KEY_SESSION,
    KEY_LOGS,
    KEY_POINTS_DB,
    KEY_CUSTOM_LOGO,
    KEY_CLOUD_ID,
];

/// String key/value backend. Writes are durable when they return.
pub trait KeyValueStore {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&mut self, key: &str, value: &str) -> Result<(), StoreError>;
    fn remove(&mut self, key: &str) -> Result<(), StoreError>;

    /// Write several keys as one unit. On failure the keys already written
    /// are put back to what they held before.
    fn set_many(&mut self, entries: &[(&str, String)]) -> Result<(), StoreError> {
        let previous: Vec<(&str, Option<String>)> =
            entries.iter().map(|(key, _)| (*key, self.get(key))).collect();

        for (written, (key, value)) in entries.iter().enumerate() {
            if let Err(e) = self.set(key, value) {
                for (key, old) in previous.iter().take(written) {
                    let restored = match old {
                        Some(old) => self.set(key, old),
                        None => self.remove(key),
                    };
                    if restored.is_err() {
                        log::error!("could not roll back {} after a failed write", key);
                    }
                }
                return Err(e);
            }
        }
        Ok(())
    }
}

/// In-memory backend
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MemoryStore {
    values: BTreeMap<String, String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        self.values.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StoreError> {
        self.values.insert(String::from(key), String::from(value));
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<(), StoreError> {
        self.values.remove(key);
        Ok(())
    }
}

pub trait LedgerStore {
    fn load_ledger(&self) -> PointsLedger;
    fn save_ledger(&mut self, ledger: &PointsLedger) -> Result<(), StoreError>;
}

pub trait LogStore {
    fn load_logs(&self) -> DrawRecords;
    fn save_logs(&mut self, logs: &DrawRecords) -> Result<(), StoreError>;
}

pub trait SessionStore {
    fn load_session(&self) -> Option<Session>;
    fn save_session(&mut self, session: &Session) -> Result<(), StoreError>;
    fn clear_session(&mut self) -> Result<(), StoreError>;
}

/// Admin settings: remote document id and branding
pub trait SettingsStore {
    fn remote_id(&self) -> Option<String>;
    fn set_remote_id(&mut self, id: Option<&str>) -> Result<(), StoreError>;
    fn branding(&self) -> Option<String>;
    fn set_branding(&mut self, asset: Option<&str>) -> Result<(), StoreError>;
}

/// Everything the engine persists
pub trait LocalStore: LedgerStore + LogStore + SessionStore + SettingsStore {
    /// Persist the three results of a draw together
    fn commit_draw(
        &mut self,
        session: &Session,
        ledger: &PointsLedger,
        logs: &DrawRecords,
    ) -> Result<(), StoreError>;

    /// Replace ledger and log together, as a pull or restore does
    fn replace_shared(
        &mut self,
        ledger: Option<&PointsLedger>,
        logs: Option<&DrawRecords>,
    ) -> Result<(), StoreError>;

    /// Drop every key
    fn reset(&mut self) -> Result<(), StoreError>;
}

/// Typed JSON repositories over a key/value backend
#[derive(Debug, Clone, Default)]
pub struct JsonStore<K> {
    kv: K,
}

impl<K: KeyValueStore> JsonStore<K> {
    pub fn new(kv: K) -> Self {
        Self { kv }
    }

    pub fn backend(&self) -> &K {
        &self.kv
    }

    pub fn backend_mut(&mut self) -> &mut K {
        &mut self.kv
    }

    pub fn into_inner(self) -> K {
        self.kv
    }

    fn read<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let raw = self.kv.get(key)?;
        match serde_json::from_str(&raw) {
            Ok(value) => Some(value),
            Err(e) => {
                log::warn!("ignoring unreadable value under {}: {}", key, e);
                None
            }
        }
    }

    fn write<T: Serialize>(&mut self, key: &str, value: &T) -> Result<(), StoreError> {
        let raw = encode(key, value)?;
        self.kv.set(key, &raw)
    }

    fn write_optional_string(&mut self, key: &str, value: Option<&str>) -> Result<(), StoreError> {
        match value {
            Some(value) => self.kv.set(key, value),
            None => self.kv.remove(key),
        }
    }
}

fn encode<T: Serialize>(key: &str, value: &T) -> Result<String, StoreError> {
    serde_json::to_string(value).map_err(|e| StoreError::WriteFailed {
        key: String::from(key),
        reason: alloc::format!("{}", e),
    })
}

impl<K: KeyValueStore> LedgerStore for JsonStore<K> {
    fn load_ledger(&self) -> PointsLedger {
        self.read(KEY_POINTS_DB).unwrap_or_default()
    }

    fn save_ledger(&mut self, ledger: &PointsLedger) -> Result<(), StoreError> {
        self.write(KEY_POINTS_DB, ledger)
    }
}

impl<K: KeyValueStore> LogStore for JsonStore<K> {
    fn load_logs(&self) -> DrawRecords {
        self.read(KEY_LOGS).unwrap_or_default()
    }

    fn save_logs(&mut self, logs: &DrawRecords) -> Result<(), StoreError> {
        self.write(KEY_LOGS, logs)
    }
}

impl<K: KeyValueStore> SessionStore for JsonStore<K> {
    fn load_session(&self) -> Option<Session> {
        self.read(KEY_SESSION)
    }

    fn save_session(&mut self, session: &Session) -> Result<(), StoreError> {
        self.write(KEY_SESSION, session)
    }

    fn clear_session(&mut self) -> Result<(), StoreError> {
        self.kv.remove(KEY_SESSION)
    }
}

impl<K: KeyValueStore> SettingsStore for JsonStore<K> {
    // Both settings are stored raw, not JSON-quoted, matching what the
    // admin pastes in.
    fn remote_id(&self) -> Option<String> {
        self.kv
            .get(KEY_CLOUD_ID)
            .map(|id| String::from(id.trim()))
            .filter(|id| !id.is_empty())
    }

    fn set_remote_id(&mut self, id: Option<&str>) -> Result<(), StoreError> {
        let id = id.map(str::trim).filter(|id| !id.is_empty());
        self.write_optional_string(KEY_CLOUD_ID, id)
    }

    fn branding(&self) -> Option<String> {
        self.kv.get(KEY_CUSTOM_LOGO)
    }

    fn set_branding(&mut self, asset: Option<&str>) -> Result<(), StoreError> {
        self.write_optional_string(KEY_CUSTOM_LOGO, asset)
    }
}

impl<K: KeyValueStore> LocalStore for JsonStore<K> {
    fn commit_draw(
        &mut self,
        session: &Session,
        ledger: &PointsLedger,
        logs: &DrawRecords,
    ) -> Result<(), StoreError> {
        let entries = [
            (KEY_SESSION, encode(KEY_SESSION, session)?),
            (KEY_POINTS_DB, encode(KEY_POINTS_DB, ledger)?),
            (KEY_LOGS, encode(KEY_LOGS, logs)?),
        ];
        self.kv.set_many(&entries)
    }

    fn replace_shared(
        &mut self,
        ledger: Option<&PointsLedger>,
        logs: Option<&DrawRecords>,
    ) -> Result<(), StoreError> {
        let mut entries = Vec::new();
        if let Some(ledger) = ledger {
            entries.push((KEY_POINTS_DB, encode(KEY_POINTS_DB, ledger)?));
        }
        if let Some(logs) = logs {
            entries.push((KEY_LOGS, encode(KEY_LOGS, logs)?));
        }
        self.kv.set_many(&entries)
    }

    fn reset(&mut self) -> Result<(), StoreError> {
        for key in ALL_KEYS {
            self.kv.remove(key)?;
        }
        Ok(())
    }
}
