use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use tempfile::NamedTempFile;

use super::{PreferenceError, PreferenceStore, Result};

/// Preference store persisted as one JSON object file.
///
/// Layout: `{ "<stream key>": true | false, ... }`. Writes go through a
/// temp file in the same directory and are renamed into place.
pub struct FsPreferenceStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl FsPreferenceStore {
    /// Open a store at `path`. The file is created lazily on first write;
    /// its parent directory is created now.
    pub fn new(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        Ok(Self {
            path,
            write_lock: Mutex::new(()),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load(&self) -> Result<BTreeMap<String, bool>> {
        match fs::read(&self.path) {
            Ok(bytes) if bytes.iter().all(u8::is_ascii_whitespace) => Ok(BTreeMap::new()),
            Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(BTreeMap::new()),
            Err(e) => Err(PreferenceError::Io(e)),
        }
    }

    fn save(&self, values: &BTreeMap<String, bool>) -> Result<()> {
        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };

        let mut tmp = NamedTempFile::new_in(dir)?;
        tmp.write_all(&serde_json::to_vec_pretty(values)?)?;
        tmp.persist(&self.path).map_err(|e| e.error)?;
        Ok(())
    }
}

impl PreferenceStore for FsPreferenceStore {
    fn get_bool(&self, key: &str) -> Result<Option<bool>> {
        Ok(self.load()?.get(key).copied())
    }

    fn set_bool(&self, key: &str, value: bool) -> Result<()> {
        let _guard = self.write_lock.lock().map_err(|_| PreferenceError::Poisoned)?;
        let mut values = self.load()?;
        values.insert(key.to_string(), value);
        self.save(&values)
    }
}
