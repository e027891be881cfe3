//! Play history, most recent first and capped

use std::sync::Arc;

use super::entry::{LibraryEntry, PlayHistoryEntry};
use super::library::{DuplicatePolicy, LibraryStore};
use super::storage::{Storage, StoreError, PLAY_HISTORY_KEY};
use super::types::{Track, TrackId};
use crate::config::HISTORY_LIMIT;

pub struct PlayHistory {
    store: LibraryStore<PlayHistoryEntry>,
}

impl PlayHistory {
    pub fn new(storage: Arc<Storage>) -> Self {
        Self {
            store: LibraryStore::new(storage, PLAY_HISTORY_KEY, DuplicatePolicy::MoveToFront)
                .with_capacity(HISTORY_LIMIT),
        }
    }

    /// Records a play. A track already in the history moves to the front with a
    /// fresh timestamp.
    pub async fn record(&self, track: Track) -> Result<(), StoreError> {
        tracing::debug!(track_id = track.id, "Recording play");
        self.store.add(LibraryEntry::new(track)).await?;
        Ok(())
    }

    pub async fn entries(&self) -> Vec<PlayHistoryEntry> {
        self.store.get_all().await
    }

    pub async fn recently_played(&self, limit: usize) -> Vec<Track> {
        self.entries()
            .await
            .into_iter()
            .take(limit)
            .map(|entry| entry.item)
            .collect()
    }

    pub async fn remove(&self, track_id: TrackId) -> Result<bool, StoreError> {
        self.store.remove(&track_id).await
    }

    pub async fn clear(&self) -> Result<(), StoreError> {
        self.store.clear().await
    }
}
