//! Durable per-user snapshot storage.
//!
//! The store only ever reads and writes whole serialized snapshots through the
//! narrow [`Storage`] trait. Failures are returned as [`Error::Storage`]; the
//! store decides what to do with them.

use crate::{Error, Result, UserKey};
use std::collections::BTreeMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

/// Namespace prefix used when none is configured.
pub const DEFAULT_STORAGE_PREFIX: &str = "inventory.view";

/// User key used when none is given or the given one normalizes to nothing.
pub const DEFAULT_USER_KEY: &str = "public";

/// Key/value persistence for serialized snapshots.
pub trait Storage {
    /// Read a value. A missing key is `Ok(None)`, not an error.
    fn get(&self, key: &str) -> Result<Option<String>>;

    /// Write a value, replacing any previous one.
    fn set(&self, key: &str, value: &str) -> Result<()>;
}

/// Normalize a user key: trimmed, lowercased, every run of characters outside
/// `[a-z0-9_.@-]` replaced by a single `_`. Empty input yields `fallback`.
pub fn normalize_user_key(value: Option<&str>, fallback: &str) -> UserKey {
    let text = value.unwrap_or_default().trim().to_lowercase();
    if text.is_empty() {
        let fallback = fallback.trim();
        if fallback.is_empty() {
            return DEFAULT_USER_KEY.to_string();
        }
        return normalize_user_key(Some(fallback), DEFAULT_USER_KEY);
    }
    let mut out = String::with_capacity(text.len());
    let mut in_run = false;
    for c in text.chars() {
        if c.is_ascii_lowercase() || c.is_ascii_digit() || matches!(c, '_' | '.' | '@' | '-') {
            out.push(c);
            in_run = false;
        } else if !in_run {
            out.push('_');
            in_run = true;
        }
    }
    out
}

/// Storage key of a user's snapshot: `prefix:user`.
pub fn storage_key(prefix: &str, user_key: &str) -> String {
    format!("{}:{}", prefix, user_key)
}

/// In-process storage. Clones share the same map, so a test can keep a handle
/// and inspect what a store wrote.
#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    entries: Arc<Mutex<BTreeMap<String, String>>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored keys.
    pub fn len(&self) -> usize {
        self.entries.lock().map(|m| m.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Stored keys, sorted.
    pub fn keys(&self) -> Vec<String> {
        self.entries
            .lock()
            .map(|m| m.keys().cloned().collect())
            .unwrap_or_default()
    }
}

impl Storage for MemoryStorage {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let entries = self
            .entries
            .lock()
            .map_err(|e| Error::Storage(e.to_string()))?;
        Ok(entries.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        let mut entries = self
            .entries
            .lock()
            .map_err(|e| Error::Storage(e.to_string()))?;
        entries.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// Storage that keeps nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullStorage;

impl Storage for NullStorage {
    fn get(&self, _key: &str) -> Result<Option<String>> {
        Ok(None)
    }

    fn set(&self, _key: &str, _value: &str) -> Result<()> {
        Ok(())
    }
}

/// One JSON file per key inside a directory.
#[derive(Debug, Clone)]
pub struct FileStorage {
    dir: PathBuf,
}

impl FileStorage {
    /// Store files under `dir`. The directory is created on first write.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// File backing a key. Characters that are unsafe in file names map to
    /// `_`.
    pub fn path_for(&self, key: &str) -> PathBuf {
        let name: String = key
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_' | '@') {
                    c
                } else {
                    '_'
                }
            })
            .collect();
        self.dir.join(format!("{}.json", name))
    }
}

impl Storage for FileStorage {
    fn get(&self, key: &str) -> Result<Option<String>> {
        match fs::read_to_string(self.path_for(key)) {
            Ok(contents) => Ok(Some(contents)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        fs::create_dir_all(&self.dir)?;
        fs::write(self.path_for(key), value)?;
        Ok(())
    }
}
