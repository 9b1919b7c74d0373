use crate::error::{DynRestError, DynRestResult};
use log::debug;
use serde_json::{Map, Value};
use std::{
    collections::HashMap,
    path::{Path, PathBuf},
    sync::Mutex,
};

/// Default key holding the access token
pub const DEFAULT_STORAGE_KEY: &str = "access_token";

/// Secondary key cleared whenever the session is forcibly dropped
pub const REFRESH_TOKEN_KEY: &str = "refresh_token";

/// Stale key removed by `cleanup`
pub const LEGACY_TOKEN_KEY: &str = "__b44_token__";

/// Persistent string key/value store local to the client
pub trait TokenStorage: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&self, key: &str, value: &str) -> DynRestResult<()>;
    fn remove(&self, key: &str) -> DynRestResult<()>;
}

/// Process-local storage
#[derive(Debug, Default)]
pub struct MemoryStorage {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> DynRestResult<std::sync::MutexGuard<'_, HashMap<String, String>>> {
        self.entries
            .lock()
            .map_err(|_| DynRestError::storage_error("memory storage lock poisoned"))
    }
}

impl TokenStorage for MemoryStorage {
    fn get(&self, key: &str) -> Option<String> {
        self.lock().ok()?.get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) -> DynRestResult<()> {
        self.lock()?.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> DynRestResult<()> {
        self.lock()?.remove(key);
        Ok(())
    }
}

/// Storage persisted as a flat JSON object in a file.
///
/// Every write rewrites the whole file.
#[derive(Debug)]
pub struct FileStorage {
    path: PathBuf,
    entries: Mutex<Map<String, Value>>,
}

impl FileStorage {
    /// Open (or lazily create) the store at `path`
    pub fn open(path: impl AsRef<Path>) -> DynRestResult<Self> {
        let path = path.as_ref().to_path_buf();
        let entries = if path.exists() {
            let raw = std::fs::read_to_string(&path)?;
            if raw.trim().is_empty() {
                Map::new()
            } else {
                match serde_json::from_str::<Value>(&raw)? {
                    Value::Object(map) => map,
                    _ => {
                        return Err(DynRestError::storage_error(format!(
                            "{} does not hold a JSON object",
                            path.display()
                        )))
                    }
                }
            }
        } else {
            Map::new()
        };
        debug!("Opened token storage at {}", path.display());

        Ok(Self {
            path,
            entries: Mutex::new(entries),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn update(&self, f: impl FnOnce(&mut Map<String, Value>)) -> DynRestResult<()> {
        let mut entries = self
            .entries
            .lock()
            .map_err(|_| DynRestError::storage_error("file storage lock poisoned"))?;
        // memory only moves once the file has the new state
        let mut next = entries.clone();
        f(&mut next);
        let raw = serde_json::to_string_pretty(&next)?;
        std::fs::write(&self.path, raw)?;
        *entries = next;
        Ok(())
    }
}

impl TokenStorage for FileStorage {
    fn get(&self, key: &str) -> Option<String> {
        let entries = self.entries.lock().ok()?;
        entries.get(key).and_then(Value::as_str).map(str::to_string)
    }

    fn set(&self, key: &str, value: &str) -> DynRestResult<()> {
        self.update(|entries| {
            entries.insert(key.to_string(), Value::String(value.to_string()));
        })
    }

    fn remove(&self, key: &str) -> DynRestResult<()> {
        self.update(|entries| {
            entries.remove(key);
        })
    }
}
