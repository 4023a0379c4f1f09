use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use log::debug;
use thiserror::Error;

use docforge_tree::write_atomic;

/// 鍵值儲存錯誤 / Errors raised by key-value stores.
#[derive(Debug, Error)]
pub enum KeyValueError {
    #[error("key-value store IO error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("malformed key-value file {path}: {source}")]
    Malformed {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// 介面狀態用的字串鍵值儲存埠 / String key-value port for UI state.
pub trait KeyValueStore {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&mut self, key: &str, value: String) -> Result<(), KeyValueError>;
    /// 回傳鍵是否存在 / Returns whether the key was present.
    fn remove(&mut self, key: &str) -> Result<bool, KeyValueError>;
}

/// 記憶體內的鍵值儲存 / In-memory store, handy for tests and ephemeral sessions.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MemoryKeyValueStore {
    entries: BTreeMap<String, String>,
}

impl MemoryKeyValueStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl KeyValueStore for MemoryKeyValueStore {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: String) -> Result<(), KeyValueError> {
        self.entries.insert(key.to_string(), value);
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<bool, KeyValueError> {
        Ok(self.entries.remove(key).is_some())
    }
}

/// 以 JSON 物件保存的鍵值儲存，每次變更即寫回 / JSON-object file, rewritten on every change.
#[derive(Debug)]
pub struct JsonKeyValueStore {
    path: PathBuf,
    entries: BTreeMap<String, String>,
}

impl JsonKeyValueStore {
    /// 載入檔案；檔案不存在時回傳空集合 / Loads the file, starting empty when it is missing.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, KeyValueError> {
        let path = path.as_ref().to_path_buf();
        if !path.exists() {
            debug!("no UI state at {}, starting empty", path.display());
            return Ok(Self {
                path,
                entries: BTreeMap::new(),
            });
        }
        let raw = fs::read_to_string(&path).map_err(|source| KeyValueError::Io {
            path: path.clone(),
            source,
        })?;
        let entries = serde_json::from_str(&raw).map_err(|source| KeyValueError::Malformed {
            path: path.clone(),
            source,
        })?;
        Ok(Self { path, entries })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn persist(&self) -> Result<(), KeyValueError> {
        let payload =
            serde_json::to_vec_pretty(&self.entries).map_err(|source| KeyValueError::Malformed {
                path: self.path.clone(),
                source,
            })?;
        write_atomic(&self.path, &payload).map_err(|source| KeyValueError::Io {
            path: self.path.clone(),
            source,
        })
    }
}

impl KeyValueStore for JsonKeyValueStore {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: String) -> Result<(), KeyValueError> {
        if self.entries.get(key) == Some(&value) {
            return Ok(());
        }
        self.entries.insert(key.to_string(), value);
        self.persist()
    }

    fn remove(&mut self, key: &str) -> Result<bool, KeyValueError> {
        if self.entries.remove(key).is_none() {
            return Ok(false);
        }
        self.persist()?;
        Ok(true)
    }
}
