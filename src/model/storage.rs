//! Key-value persistence for the library stores
//!
//! Each key maps to one JSON document holding a full collection. Writes replace
//! the whole document; there is no partial update.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Mutex, PoisonError};

use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;

pub const DOWNLOADED_TRACKS_KEY: &str = "downloadedTracks";
pub const LIKED_SONGS_KEY: &str = "likedSongs";
pub const SAVED_ALBUMS_KEY: &str = "savedAlbums";
pub const PLAY_HISTORY_KEY: &str = "playHistory";
pub const PLAYLISTS_KEY: &str = "playlists";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to write store '{key}': {source}")]
    Io {
        key: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to encode store '{key}': {source}")]
    Encode {
        key: String,
        #[source]
        source: serde_json::Error,
    },
}

enum Backend {
    Directory(PathBuf),
    Memory(Mutex<HashMap<String, String>>),
}

pub struct Storage {
    backend: Backend,
}

impl Storage {
    /// Directory-backed storage, one `<key>.json` file per key. The directory is
    /// created on first write.
    pub fn open(dir: impl Into<PathBuf>) -> Self {
        Self {
            backend: Backend::Directory(dir.into()),
        }
    }

    pub fn in_memory() -> Self {
        Self {
            backend: Backend::Memory(Mutex::new(HashMap::new())),
        }
    }

    async fn read_raw(&self, key: &str) -> std::io::Result<Option<String>> {
        match &self.backend {
            Backend::Directory(dir) => {
                match tokio::fs::read_to_string(dir.join(format!("{key}.json"))).await {
                    Ok(content) => Ok(Some(content)),
                    Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
                    Err(e) => Err(e),
                }
            }
            Backend::Memory(map) => Ok(map
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .get(key)
                .cloned()),
        }
    }

    async fn write_raw(&self, key: &str, content: String) -> std::io::Result<()> {
        match &self.backend {
            Backend::Directory(dir) => {
                tokio::fs::create_dir_all(dir).await?;
                let target = dir.join(format!("{key}.json"));
                let staging = dir.join(format!("{key}.json.tmp"));
                tokio::fs::write(&staging, content).await?;
                tokio::fs::rename(&staging, &target).await
            }
            Backend::Memory(map) => {
                map.lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .insert(key.to_string(), content);
                Ok(())
            }
        }
    }

    /// Writes raw text under a key. Used to simulate external corruption in tests
    /// and by tooling that migrates stores.
    pub async fn write_text(&self, key: &str, content: &str) -> Result<(), StoreError> {
        self.write_raw(key, content.to_string())
            .await
            .map_err(|source| StoreError::Io {
                key: key.to_string(),
                source,
            })
    }

    /// Loads the collection stored under `key`. Missing or corrupt data yields an
    /// empty collection.
    pub async fn load<T: DeserializeOwned>(&self, key: &str) -> Vec<T> {
        let content = match self.read_raw(key).await {
            Ok(Some(content)) => content,
            Ok(None) => return Vec::new(),
            Err(e) => {
                tracing::warn!(key, error = %e, "Failed to read store, treating as empty");
                return Vec::new();
            }
        };

        match serde_json::from_str(&content) {
            Ok(items) => items,
            Err(e) => {
                tracing::warn!(key, error = %e, "Corrupt store data, treating as empty");
                Vec::new()
            }
        }
    }

    pub async fn save<T: Serialize>(&self, key: &str, items: &[T]) -> Result<(), StoreError> {
        let content = serde_json::to_string(items).map_err(|source| StoreError::Encode {
            key: key.to_string(),
            source,
        })?;
        self.write_raw(key, content)
            .await
            .map_err(|source| StoreError::Io {
                key: key.to_string(),
                source,
            })
    }
}
