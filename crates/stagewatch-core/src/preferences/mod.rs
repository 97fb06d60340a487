//! Durable key -> boolean preference storage.
//!
//! Viewer preferences (currently the autoscroll toggle) are keyed by the
//! caller-supplied stream key. Two backends are provided:
//! - [`MemoryPreferenceStore`] for tests and embedding
//! - [`fs::FsPreferenceStore`] backed by a single JSON file

pub mod fs;

use std::collections::HashMap;
use std::sync::Mutex;

use thiserror::Error;

/// Errors from preference storage.
#[derive(Debug, Error)]
pub enum PreferenceError {
    #[error("preference file is corrupt: {0}")]
    Corrupt(#[from] serde_json::Error),

    #[error("preference store lock poisoned")]
    Poisoned,

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, PreferenceError>;

/// Key -> boolean durable store.
pub trait PreferenceStore: Send + Sync {
    /// Read the value for `key`, `None` if never written.
    fn get_bool(&self, key: &str) -> Result<Option<bool>>;

    /// Write `value` for `key`.
    fn set_bool(&self, key: &str, value: bool) -> Result<()>;
}

/// In-memory preference store backed by a `HashMap<key, bool>`.
#[derive(Debug, Default)]
pub struct MemoryPreferenceStore {
    values: Mutex<HashMap<String, bool>>,
}

impl MemoryPreferenceStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a store with one value.
    pub fn with_value(key: impl Into<String>, value: bool) -> Self {
        let store = Self::new();
        if let Ok(mut values) = store.values.lock() {
            values.insert(key.into(), value);
        }
        store
    }
}

impl PreferenceStore for MemoryPreferenceStore {
    fn get_bool(&self, key: &str) -> Result<Option<bool>> {
        let values = self.values.lock().map_err(|_| PreferenceError::Poisoned)?;
        Ok(values.get(key).copied())
    }

    fn set_bool(&self, key: &str, value: bool) -> Result<()> {
        let mut values = self.values.lock().map_err(|_| PreferenceError::Poisoned)?;
        values.insert(key.to_string(), value);
        Ok(())
    }
}
