//! Credential store abstraction.
//!
//! A flat key-value map of strings. Absence of a key is a valid "logged out"
//! state, never an error. Batch operations are applied as one unit so that a
//! logout can never be observed half done.

use std::{
    collections::BTreeMap,
    path::PathBuf,
    sync::{Mutex, PoisonError},
};

use async_trait::async_trait;

use crate::{config, error::StoreError};

pub const KEY_ACCESS_TOKEN: &str = "access_token";
pub const KEY_REFRESH_TOKEN: &str = "refresh_token";
pub const KEY_EXPIRES_AT: &str = "expires_at";
pub const KEY_DISPLAY_NAME: &str = "display_name";
pub const KEY_AVATAR_URL: &str = "avatar_url";

/// Every key the session manager ever writes.
pub const SESSION_KEYS: [&str; 5] = [
    KEY_ACCESS_TOKEN,
    KEY_REFRESH_TOKEN,
    KEY_EXPIRES_AT,
    KEY_DISPLAY_NAME,
    KEY_AVATAR_URL,
];

#[async_trait]
pub trait CredentialStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    /// Applies all writes together. `None` removes the key.
    async fn apply(&self, changes: Vec<(String, Option<String>)>) -> Result<(), StoreError>;

    async fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        self.apply(vec![(key.to_string(), Some(value.to_string()))])
            .await
    }

    async fn remove_all(&self, keys: &[&str]) -> Result<(), StoreError> {
        self.apply(keys.iter().map(|k| (k.to_string(), None)).collect())
            .await
    }
}

fn apply_changes(map: &mut BTreeMap<String, String>, changes: Vec<(String, Option<String>)>) {
    for (key, value) in changes {
        match value {
            Some(value) => map.insert(key, value),
            None => map.remove(&key),
        };
    }
}

/// In-memory store, used for ephemeral sessions and tests.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<BTreeMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl CredentialStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self
            .entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned())
    }

    async fn apply(&self, changes: Vec<(String, Option<String>)>) -> Result<(), StoreError> {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        apply_changes(&mut entries, changes);
        Ok(())
    }
}

/// JSON file store in the local data directory.
///
/// Every batch rewrites the whole file once, so a batch lands on disk
/// entirely or not at all from the reader's point of view.
pub struct FileStore {
    path: PathBuf,
    lock: tokio::sync::Mutex<()>,
}

impl FileStore {
    pub fn new(path: PathBuf) -> Self {
        FileStore {
            path,
            lock: tokio::sync::Mutex::new(()),
        }
    }

    /// Store at `liquidglass/cache/credentials.json` in the local data directory.
    pub fn default_location() -> Self {
        let mut path = config::data_dir();
        path.push("cache/credentials.json");
        Self::new(path)
    }

    pub fn path(&self) -> &PathBuf {
        &self.path
    }

    async fn read(&self) -> Result<BTreeMap<String, String>, StoreError> {
        match async_fs::read_to_string(&self.path).await {
            Ok(content) => Ok(serde_json::from_str(&content)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(BTreeMap::new()),
            Err(e) => Err(e.into()),
        }
    }

    async fn write(&self, entries: &BTreeMap<String, String>) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent() {
            async_fs::create_dir_all(parent).await?;
        }

        // Write beside the target and rename over it.
        let json = serde_json::to_string_pretty(entries)?;
        let tmp = self.path.with_extension("json.tmp");
        async_fs::write(&tmp, json).await?;
        async_fs::rename(&tmp, &self.path).await?;
        Ok(())
    }
}

#[async_trait]
impl CredentialStore for FileStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let _guard = self.lock.lock().await;
        Ok(self.read().await?.remove(key))
    }

    async fn apply(&self, changes: Vec<(String, Option<String>)>) -> Result<(), StoreError> {
        let _guard = self.lock.lock().await;
        let mut entries = self.read().await?;
        apply_changes(&mut entries, changes);
        self.write(&entries).await
    }
}
