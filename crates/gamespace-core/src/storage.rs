//! Persistent key-value storage for session tokens.
//!
//! `LocalStorage` is a small string-to-string store persisted as a single
//! JSON object on disk. Handles are cheap to clone and share one underlying
//! map, so the API client and the auth context always observe the same
//! tokens.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, PoisonError, RwLock};

use anyhow::{Context, Result};
use tracing::debug;

/// Key holding the bearer token attached to outgoing requests
pub const ACCESS_TOKEN_KEY: &str = "access_token";

/// Key holding the refresh token returned at login
pub const REFRESH_TOKEN_KEY: &str = "refresh_token";

/// Key holding the JSON-serialized user snapshot
pub const USER_DATA_KEY: &str = "user_data";

/// Storage file name in the data directory
pub const STORAGE_FILE: &str = "local_storage.json";

#[derive(Debug, Default)]
struct Inner {
    path: Option<PathBuf>,
    items: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Default)]
pub struct LocalStorage {
    inner: Arc<RwLock<Inner>>,
}

impl LocalStorage {
    /// Open the store backed by `path`. A missing file yields an empty store.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let items = if path.exists() {
            let contents = std::fs::read_to_string(&path)
                .with_context(|| format!("Failed to read storage file: {}", path.display()))?;
            serde_json::from_str(&contents)
                .with_context(|| format!("Failed to parse storage file: {}", path.display()))?
        } else {
            BTreeMap::new()
        };
        debug!(path = %path.display(), keys = items.len(), "Local storage opened");

        Ok(Self {
            inner: Arc::new(RwLock::new(Inner {
                path: Some(path),
                items,
            })),
        })
    }

    /// A store that is never written to disk
    pub fn in_memory() -> Self {
        Self::default()
    }

    pub fn get_item(&self, key: &str) -> Option<String> {
        let inner = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        inner.items.get(key).cloned()
    }

    /// Store a value. Memory is only updated once the file write succeeds.
    pub fn set_item(&self, key: &str, value: &str) -> Result<()> {
        let mut inner = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        let mut items = inner.items.clone();
        items.insert(key.to_string(), value.to_string());
        inner.commit(items)
    }

    /// Remove a key. Removing an absent key is not an error.
    /// On a failed write the key stays in memory, so the removal can be retried.
    pub fn remove_item(&self, key: &str) -> Result<()> {
        let mut inner = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        if !inner.items.contains_key(key) {
            return Ok(());
        }
        let mut items = inner.items.clone();
        items.remove(key);
        inner.commit(items)
    }

    pub fn clear(&self) -> Result<()> {
        let mut inner = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        inner.commit(BTreeMap::new())
    }

    pub fn contains_key(&self, key: &str) -> bool {
        let inner = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        inner.items.contains_key(key)
    }
}

impl Inner {
    /// Write `items` to disk, then make them the in-memory state
    fn commit(&mut self, items: BTreeMap<String, String>) -> Result<()> {
        if let Some(ref path) = self.path {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            let contents = serde_json::to_string_pretty(&items)?;
            std::fs::write(path, contents)
                .with_context(|| format!("Failed to write storage file: {}", path.display()))?;
        }
        self.items = items;
        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================
