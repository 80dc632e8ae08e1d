//! Persistence for the bible and scenes.
//!
//! Two JSON documents under fixed keys, written back in full after every
//! change. There is no schema version and no migration; an entry that does
//! not parse is treated as absent.

use crate::bible::Bible;
use crate::scene::Scene;
use async_trait::async_trait;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use thiserror::Error;
use tokio::fs;

/// Key of the bible document.
pub const BIBLE_KEY: &str = "vwr_bible";

/// Key of the scenes document.
pub const SCENES_KEY: &str = "vwr_scenes";

/// Errors from persistence operations.
#[derive(Debug, Error)]
pub enum PersistError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid key: {0}")]
    InvalidKey(String),
}

/// Durable string storage keyed by name.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, PersistError>;
    async fn set(&self, key: &str, value: &str) -> Result<(), PersistError>;
    async fn remove(&self, key: &str) -> Result<(), PersistError>;
}

/// One JSON file per key inside a directory.
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> Result<PathBuf, PersistError> {
        let valid = !key.is_empty()
            && key
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
        if !valid {
            return Err(PersistError::InvalidKey(key.to_string()));
        }
        Ok(self.dir.join(format!("{key}.json")))
    }
}

#[async_trait]
impl KeyValueStore for FileStore {
    async fn get(&self, key: &str) -> Result<Option<String>, PersistError> {
        let path = self.path_for(key)?;
        match fs::read_to_string(&path).await {
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), PersistError> {
        let path = self.path_for(key)?;
        fs::create_dir_all(&self.dir).await?;
        fs::write(path, value).await?;
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), PersistError> {
        let path = self.path_for(key)?;
        match fs::remove_file(path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// In-memory storage. Clones share the same map.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    entries: Arc<Mutex<HashMap<String, String>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored entries.
    pub fn len(&self) -> usize {
        self.entries.lock().map(|m| m.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Raw value of an entry, for inspection in tests.
    pub fn raw(&self, key: &str) -> Option<String> {
        self.entries.lock().ok()?.get(key).cloned()
    }

    fn with_entries<T>(&self, f: impl FnOnce(&mut HashMap<String, String>) -> T) -> T {
        match self.entries.lock() {
            Ok(mut guard) => f(&mut guard),
            Err(poisoned) => f(&mut poisoned.into_inner()),
        }
    }
}

#[async_trait]
impl KeyValueStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<String>, PersistError> {
        Ok(self.with_entries(|m| m.get(key).cloned()))
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), PersistError> {
        self.with_entries(|m| m.insert(key.to_string(), value.to_string()));
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), PersistError> {
        self.with_entries(|m| m.remove(key));
        Ok(())
    }
}

/// What `StoryStore::load` found.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Snapshot {
    pub bible: Option<Bible>,
    pub scenes: Option<Vec<Scene>>,
}

/// Typed access to the two documents.
pub struct StoryStore {
    backend: Box<dyn KeyValueStore>,
}

impl StoryStore {
    pub fn new(backend: impl KeyValueStore + 'static) -> Self {
        Self {
            backend: Box::new(backend),
        }
    }

    /// A store backed by files in `dir`.
    pub fn in_dir(dir: impl Into<PathBuf>) -> Self {
        Self::new(FileStore::new(dir))
    }

    /// A throwaway in-memory store.
    pub fn in_memory() -> Self {
        Self::new(MemoryStore::new())
    }

    /// Read both documents. Missing or malformed entries come back as `None`,
    /// and so does an empty scene list.
    pub async fn load(&self) -> Result<Snapshot, PersistError> {
        let bible = self
            .backend
            .get(BIBLE_KEY)
            .await?
            .and_then(|raw| parse_entry::<Bible>(BIBLE_KEY, &raw));

        let scenes = self
            .backend
            .get(SCENES_KEY)
            .await?
            .and_then(|raw| parse_entry::<Vec<Scene>>(SCENES_KEY, &raw))
            .filter(|scenes| !scenes.is_empty());

        Ok(Snapshot { bible, scenes })
    }

    /// Write both documents.
    pub async fn save(&self, bible: &Bible, scenes: &[Scene]) -> Result<(), PersistError> {
        let bible_json = serde_json::to_string(bible)?;
        let scenes_json = serde_json::to_string(scenes)?;
        self.backend.set(BIBLE_KEY, &bible_json).await?;
        self.backend.set(SCENES_KEY, &scenes_json).await?;
        Ok(())
    }

    /// Remove both documents.
    pub async fn clear(&self) -> Result<(), PersistError> {
        self.backend.remove(BIBLE_KEY).await?;
        self.backend.remove(SCENES_KEY).await?;
        Ok(())
    }
}

fn parse_entry<T: serde::de::DeserializeOwned>(key: &str, raw: &str) -> Option<T> {
    match serde_json::from_str(raw) {
        Ok(value) => Some(value),
        Err(e) => {
            tracing::warn!(key, error = %e, "ignoring malformed stored entry");
            None
        }
    }
}
