//! User playlists

use std::sync::Arc;

use thiserror::Error;

use super::library::{DuplicatePolicy, LibraryStore};
use super::storage::{Storage, StoreError, PLAYLISTS_KEY};
use super::types::{Playlist, TrackId};

#[derive(Debug, Error)]
pub enum PlaylistError {
    #[error("playlist name cannot be empty")]
    EmptyName,
    #[error(transparent)]
    Store(#[from] StoreError),
}

pub struct PlaylistStore {
    store: LibraryStore<Playlist>,
}

impl PlaylistStore {
    pub fn new(storage: Arc<Storage>) -> Self {
        Self {
            store: LibraryStore::new(storage, PLAYLISTS_KEY, DuplicatePolicy::Ignore),
        }
    }

    pub async fn all(&self) -> Vec<Playlist> {
        self.store.get_all().await
    }

    pub async fn get(&self, playlist_id: &str) -> Option<Playlist> {
        self.all().await.into_iter().find(|p| p.id == playlist_id)
    }

    pub async fn create(&self, name: &str) -> Result<Playlist, PlaylistError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(PlaylistError::EmptyName);
        }
        let playlist = Playlist {
            id: uuid::Uuid::new_v4().to_string(),
            name: name.to_string(),
            track_ids: Vec::new(),
        };
        self.store.add(playlist.clone()).await?;
        tracing::info!(playlist_id = %playlist.id, name, "Created playlist");
        Ok(playlist)
    }

    pub async fn delete(&self, playlist_id: &str) -> Result<bool, PlaylistError> {
        Ok(self.store.remove(&playlist_id.to_string()).await?)
    }

    pub async fn rename(&self, playlist_id: &str, name: &str) -> Result<Option<Playlist>, PlaylistError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(PlaylistError::EmptyName);
        }
        Ok(self
            .store
            .update(&playlist_id.to_string(), |p| {
                let changed = p.name != name;
                p.name = name.to_string();
                changed
            })
            .await?)
    }

    /// Appends a track. A track already in the playlist is not added twice.
    /// Returns `None` when the playlist does not exist.
    pub async fn add_track(&self, playlist_id: &str, track_id: TrackId) -> Result<Option<Playlist>, PlaylistError> {
        Ok(self
            .store
            .update(&playlist_id.to_string(), |p| {
                if p.track_ids.contains(&track_id) {
                    return false;
                }
                p.track_ids.push(track_id);
                true
            })
            .await?)
    }

    pub async fn remove_track(&self, playlist_id: &str, track_id: TrackId) -> Result<Option<Playlist>, PlaylistError> {
        Ok(self
            .store
            .update(&playlist_id.to_string(), |p| {
                let before = p.track_ids.len();
                p.track_ids.retain(|id| *id != track_id);
                p.track_ids.len() != before
            })
            .await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn playlists() -> PlaylistStore {
        PlaylistStore::new(Arc::new(Storage::in_memory()))
    }

    #[tokio::test]
    async fn create_rejects_blank_names() {
        let store = playlists();
        assert!(matches!(store.create("   ").await, Err(PlaylistError::EmptyName)));
        assert!(store.all().await.is_empty());
    }

    #[tokio::test]
    async fn tracks_keep_insertion_order_without_duplicates() {
        let store = playlists();
        let playlist = store.create("Road trip").await.unwrap();

        store.add_track(&playlist.id, 3).await.unwrap();
        store.add_track(&playlist.id, 1).await.unwrap();
        store.add_track(&playlist.id, 3).await.unwrap();

        let stored = store.get(&playlist.id).await.unwrap();
        assert_eq!(stored.track_ids, vec![3, 1]);

        store.remove_track(&playlist.id, 3).await.unwrap();
        assert_eq!(store.get(&playlist.id).await.unwrap().track_ids, vec![1]);
    }

    #[tokio::test]
    async fn missing_playlist_yields_none() {
        let store = playlists();
        assert!(store.add_track("nope", 1).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn rename_and_delete() {
        let store = playlists();
        let playlist = store.create("Old").await.unwrap();
        let renamed = store.rename(&playlist.id, "New").await.unwrap().unwrap();
        assert_eq!(renamed.name, "New");
        assert!(store.delete(&playlist.id).await.unwrap());
        assert!(store.get(&playlist.id).await.is_none());
    }
}
