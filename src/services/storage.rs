//! Persistent key-value storage
//!
//! The dwell timer and the profile store only ever talk to storage through
//! [`KeyValueStore`]. Values are plain strings; callers own their encoding.
//! Every method is fallible and asynchronous so that a durable backend can
//! sit behind the same seam as the in-memory one used in tests.

use std::{
    collections::HashMap,
    io::ErrorKind,
    path::PathBuf,
    sync::{Mutex, MutexGuard},
};

use futures::future::{self, BoxFuture};
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};

/// Errors raised by a storage backend
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("storage I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("stored data is malformed: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("storage unavailable: {0}")]
    Unavailable(String),
}

/// Durable string-to-string storage that survives process restarts
pub trait KeyValueStore: Send + Sync {
    /// Read a single key; `Ok(None)` when the key is absent
    fn get<'a>(&'a self, key: &'a str) -> BoxFuture<'a, Result<Option<String>, StoreError>>;

    /// Write several keys as one unit: either every entry lands or none does
    fn set_many<'a>(
        &'a self,
        entries: &'a [(&'a str, String)],
    ) -> BoxFuture<'a, Result<(), StoreError>>;

    /// Remove several keys as one unit; absent keys are ignored
    fn remove_many<'a>(&'a self, keys: &'a [&'a str]) -> BoxFuture<'a, Result<(), StoreError>>;

    fn set<'a>(&'a self, key: &'a str, value: String) -> BoxFuture<'a, Result<(), StoreError>> {
        Box::pin(async move {
            let entries = [(key, value)];
            self.set_many(&entries).await
        })
    }

    fn remove<'a>(&'a self, key: &'a str) -> BoxFuture<'a, Result<(), StoreError>> {
        Box::pin(async move {
            let keys = [key];
            self.remove_many(&keys).await
        })
    }
}

/// Volatile store backed by a map; used by tests and ephemeral hosts
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, HashMap<String, String>>, StoreError> {
        self.entries
            .lock()
            .map_err(|e| StoreError::Unavailable(format!("memory store lock poisoned: {}", e)))
    }

    fn get_now(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.lock()?.get(key).cloned())
    }

    fn set_many_now(&self, entries: &[(&str, String)]) -> Result<(), StoreError> {
        let mut map = self.lock()?;
        for (key, value) in entries {
            map.insert((*key).to_string(), value.clone());
        }
        Ok(())
    }

    fn remove_many_now(&self, keys: &[&str]) -> Result<(), StoreError> {
        let mut map = self.lock()?;
        for key in keys {
            map.remove(*key);
        }
        Ok(())
    }
}

impl KeyValueStore for MemoryStore {
    fn get<'a>(&'a self, key: &'a str) -> BoxFuture<'a, Result<Option<String>, StoreError>> {
        Box::pin(future::ready(self.get_now(key)))
    }

    fn set_many<'a>(
        &'a self,
        entries: &'a [(&'a str, String)],
    ) -> BoxFuture<'a, Result<(), StoreError>> {
        Box::pin(future::ready(self.set_many_now(entries)))
    }

    fn remove_many<'a>(&'a self, keys: &'a [&'a str]) -> BoxFuture<'a, Result<(), StoreError>> {
        Box::pin(future::ready(self.remove_many_now(keys)))
    }
}

/// Store persisted as a single JSON object on disk
///
/// The whole map is rewritten on every mutation through a temporary file and
/// a rename, so a crash leaves either the old or the new contents behind.
/// The in-memory copy is only updated after the rename succeeds.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    entries: tokio::sync::Mutex<HashMap<String, String>>,
}

impl FileStore {
    /// Open (or lazily create) the store at `path`
    ///
    /// A missing file is an empty store. A file that does not parse is also
    /// treated as empty; it is overwritten on the next write.
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        let entries = match tokio::fs::read_to_string(&path).await {
            Ok(contents) => match serde_json::from_str::<HashMap<String, String>>(&contents) {
                Ok(entries) => entries,
                Err(e) => {
                    warn!("Store file {} is malformed, starting empty: {}", path.display(), e);
                    HashMap::new()
                }
            },
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!("Store file {} does not exist yet", path.display());
                HashMap::new()
            }
            Err(e) => return Err(e.into()),
        };

        debug!("Opened store {} with {} keys", path.display(), entries.len());
        Ok(Self {
            path,
            entries: tokio::sync::Mutex::new(entries),
        })
    }

    async fn persist(&self, entries: &HashMap<String, String>) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }
        let contents = serde_json::to_string_pretty(entries)?;
        let staging = self.path.with_extension("tmp");
        let mut file = tokio::fs::File::create(&staging).await?;
        file.write_all(contents.as_bytes()).await?;
        // the data must be on disk before the rename makes it visible
        file.sync_all().await?;
        drop(file);
        tokio::fs::rename(&staging, &self.path).await?;
        Ok(())
    }
}

impl KeyValueStore for FileStore {
    fn get<'a>(&'a self, key: &'a str) -> BoxFuture<'a, Result<Option<String>, StoreError>> {
        Box::pin(async move { Ok(self.entries.lock().await.get(key).cloned()) })
    }

    fn set_many<'a>(
        &'a self,
        entries: &'a [(&'a str, String)],
    ) -> BoxFuture<'a, Result<(), StoreError>> {
        Box::pin(async move {
            let mut current = self.entries.lock().await;
            let mut next = current.clone();
            for (key, value) in entries {
                next.insert((*key).to_string(), value.clone());
            }
            self.persist(&next).await?;
            *current = next;
            Ok(())
        })
    }

    fn remove_many<'a>(&'a self, keys: &'a [&'a str]) -> BoxFuture<'a, Result<(), StoreError>> {
        Box::pin(async move {
            let mut current = self.entries.lock().await;
            if !keys.iter().any(|key| current.contains_key(*key)) {
                return Ok(());
            }
            let mut next = current.clone();
            for key in keys {
                next.remove(*key);
            }
            self.persist(&next).await?;
            *current = next;
            Ok(())
        })
    }
}
