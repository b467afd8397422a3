use crate::client::ClientError;
use serde_json::Value;
use std::collections::HashMap;
use std::fs;
use std::io::ErrorKind;
use std::path::PathBuf;
use std::sync::Mutex;

/// Key of the mirrored activity feed.
pub const ACTIVITY_LOGS_KEY: &str = "activityLogs";

/// Keyed JSON blobs that survive restarts. Each resource kind is mirrored
/// under its collection key (products, teamMembers, ...).
pub trait LocalStore: Send + Sync {
    fn read(&self, key: &str) -> Result<Option<Value>, ClientError>;

    fn write(&self, key: &str, value: &Value) -> Result<(), ClientError>;
}

fn valid_key(key: &str) -> Result<(), ClientError> {
    if !key.is_empty() && key.chars().all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-') {
        Ok(())
    } else {
        Err(ClientError::LocalStore(format!("invalid key '{}'", key)))
    }
}

/// One `<key>.json` file per key inside `dir`.
pub struct FileLocalStore {
    dir: PathBuf,
}

impl FileLocalStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        FileLocalStore { dir: dir.into() }
    }

    fn path_for(&self, key: &str) -> Result<PathBuf, ClientError> {
        valid_key(key)?;
        Ok(self.dir.join(format!("{}.json", key)))
    }
}

impl LocalStore for FileLocalStore {
    fn read(&self, key: &str) -> Result<Option<Value>, ClientError> {
        let path = self.path_for(key)?;
        let text = match fs::read_to_string(&path) {
            Ok(text) => text,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(ClientError::LocalStore(format!("{}: {}", path.display(), e))),
        };
        serde_json::from_str(&text)
            .map(Some)
            .map_err(|e| ClientError::LocalStore(format!("{} is not valid JSON: {}", path.display(), e)))
    }

    fn write(&self, key: &str, value: &Value) -> Result<(), ClientError> {
        let path = self.path_for(key)?;
        fs::create_dir_all(&self.dir).map_err(|e| ClientError::LocalStore(e.to_string()))?;
        let text = serde_json::to_string_pretty(value).map_err(|e| ClientError::LocalStore(e.to_string()))?;
        // Write then rename so readers never see half a file.
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, text).map_err(|e| ClientError::LocalStore(e.to_string()))?;
        fs::rename(&tmp, &path).map_err(|e| ClientError::LocalStore(e.to_string()))
    }
}

/// In-process store, used in tests and when nothing should touch disk.
#[derive(Default)]
pub struct MemoryLocalStore {
    entries: Mutex<HashMap<String, Value>>,
}

impl MemoryLocalStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl LocalStore for MemoryLocalStore {
    fn read(&self, key: &str) -> Result<Option<Value>, ClientError> {
        valid_key(key)?;
        let entries = self.entries.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        Ok(entries.get(key).cloned())
    }

    fn write(&self, key: &str, value: &Value) -> Result<(), ClientError> {
        valid_key(key)?;
        let mut entries = self.entries.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        entries.insert(key.to_string(), value.clone());
        Ok(())
    }
}
