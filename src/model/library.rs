//! Generic persisted collection and the liked-songs / saved-albums stores built on it

use std::fmt::Debug;
use std::marker::PhantomData;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::sync::RwLock;

use super::entry::LibraryEntry;
use super::storage::{Storage, StoreError, LIKED_SONGS_KEY, SAVED_ALBUMS_KEY};
use super::types::{Album, AlbumId, Playlist, Track, TrackId};

/// Anything stored in a [`LibraryStore`] is deduplicated by this id.
pub trait Identified {
    type Id: PartialEq + Clone + Debug + Send + Sync;

    fn id(&self) -> Self::Id;
}

impl Identified for Track {
    type Id = TrackId;

    fn id(&self) -> TrackId {
        self.id
    }
}

impl Identified for Album {
    type Id = AlbumId;

    fn id(&self) -> AlbumId {
        self.id
    }
}

impl Identified for Playlist {
    type Id = String;

    fn id(&self) -> String {
        self.id.clone()
    }
}

impl<T: Identified> Identified for LibraryEntry<T> {
    type Id = T::Id;

    fn id(&self) -> T::Id {
        self.item.id()
    }
}

/// What `add` does when the id is already present
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DuplicatePolicy {
    /// Leave the collection untouched.
    Ignore,
    /// Drop the old entry and insert the new one at the front.
    MoveToFront,
}

/// A persisted, ordered, id-deduplicated collection.
///
/// Every mutation is a read-modify-write of the whole collection under the
/// store's write lock, so concurrent writers never interleave and readers always
/// observe a complete snapshot. New items are inserted at the front.
pub struct LibraryStore<T> {
    key: &'static str,
    storage: Arc<Storage>,
    policy: DuplicatePolicy,
    capacity: Option<usize>,
    gate: RwLock<()>,
    _marker: PhantomData<fn() -> T>,
}

impl<T> LibraryStore<T>
where
    T: Identified + Serialize + DeserializeOwned + Clone,
{
    pub fn new(storage: Arc<Storage>, key: &'static str, policy: DuplicatePolicy) -> Self {
        Self {
            key,
            storage,
            policy,
            capacity: None,
            gate: RwLock::new(()),
            _marker: PhantomData,
        }
    }

    /// Keep at most `capacity` items; the oldest (back) items are evicted.
    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = Some(capacity);
        self
    }

    pub fn key(&self) -> &'static str {
        self.key
    }

    pub async fn get_all(&self) -> Vec<T> {
        let _read = self.gate.read().await;
        self.storage.load(self.key).await
    }

    pub async fn contains(&self, id: &T::Id) -> bool {
        self.get_all().await.iter().any(|item| item.id() == *id)
    }

    /// Returns `true` when the collection changed.
    pub async fn add(&self, item: T) -> Result<bool, StoreError> {
        let policy = self.policy;
        let capacity = self.capacity;
        self.mutate(move |items| {
            let id = item.id();
            let existing = items.iter().position(|i| i.id() == id);
            match (existing, policy) {
                (Some(_), DuplicatePolicy::Ignore) => return false,
                (Some(index), DuplicatePolicy::MoveToFront) => {
                    items.remove(index);
                }
                (None, _) => {}
            }
            items.insert(0, item);
            if let Some(capacity) = capacity {
                items.truncate(capacity);
            }
            true
        })
        .await
    }

    /// Returns `true` when an item was removed.
    pub async fn remove(&self, id: &T::Id) -> Result<bool, StoreError> {
        self.mutate(|items| {
            let before = items.len();
            items.retain(|item| item.id() != *id);
            items.len() != before
        })
        .await
    }

    /// Adds the item if absent, removes it if present. Returns the new
    /// membership state.
    pub async fn toggle(&self, item: T) -> Result<bool, StoreError> {
        let mut member = false;
        self.mutate(|items| {
            let id = item.id();
            match items.iter().position(|i| i.id() == id) {
                Some(index) => {
                    items.remove(index);
                }
                None => {
                    items.insert(0, item);
                    member = true;
                }
            }
            true
        })
        .await?;
        Ok(member)
    }

    /// Applies `f` to the item with `id`. `f` returns whether it changed
    /// anything; the collection is only written back when it did.
    pub async fn update<F>(&self, id: &T::Id, f: F) -> Result<Option<T>, StoreError>
    where
        F: FnOnce(&mut T) -> bool,
    {
        let mut updated = None;
        self.mutate(|items| {
            let Some(item) = items.iter_mut().find(|i| i.id() == *id) else {
                return false;
            };
            let changed = f(item);
            updated = Some(item.clone());
            changed
        })
        .await?;
        Ok(updated)
    }

    pub async fn clear(&self) -> Result<(), StoreError> {
        self.mutate(|items| {
            let changed = !items.is_empty();
            items.clear();
            changed
        })
        .await?;
        Ok(())
    }

    async fn mutate<F>(&self, f: F) -> Result<bool, StoreError>
    where
        F: FnOnce(&mut Vec<T>) -> bool,
    {
        let _write = self.gate.write().await;
        let mut items: Vec<T> = self.storage.load(self.key).await;
        let changed = f(&mut items);
        if changed {
            self.storage.save(self.key, &items).await?;
            tracing::trace!(key = self.key, count = items.len(), "Store written");
        }
        Ok(changed)
    }
}

/// Case-insensitive substring filter over title and artist. An empty query
/// matches everything.
pub fn filter_tracks(tracks: &[Track], query: &str) -> Vec<Track> {
    let query = query.trim().to_lowercase();
    if query.is_empty() {
        return tracks.to_vec();
    }
    tracks
        .iter()
        .filter(|t| {
            t.title.to_lowercase().contains(&query) || t.artist.to_lowercase().contains(&query)
        })
        .cloned()
        .collect()
}

/// The user's liked songs, most recently liked first
pub struct LikedSongs {
    store: LibraryStore<Track>,
}

impl LikedSongs {
    pub fn new(storage: Arc<Storage>) -> Self {
        Self {
            store: LibraryStore::new(storage, LIKED_SONGS_KEY, DuplicatePolicy::Ignore),
        }
    }

    pub async fn all(&self) -> Vec<Track> {
        self.store.get_all().await
    }

    pub async fn search(&self, query: &str) -> Vec<Track> {
        filter_tracks(&self.all().await, query)
    }

    pub async fn like(&self, track: Track) -> Result<bool, StoreError> {
        self.store.add(track).await
    }

    pub async fn unlike(&self, track_id: TrackId) -> Result<bool, StoreError> {
        self.store.remove(&track_id).await
    }

    pub async fn is_liked(&self, track_id: TrackId) -> bool {
        self.store.contains(&track_id).await
    }

    pub async fn toggle(&self, track: Track) -> Result<bool, StoreError> {
        let track_id = track.id;
        let liked = self.store.toggle(track).await?;
        tracing::info!(track_id, liked, "Toggled liked song");
        Ok(liked)
    }
}

/// Albums saved to the library, most recently saved first
pub struct SavedAlbums {
    store: LibraryStore<Album>,
}

impl SavedAlbums {
    pub fn new(storage: Arc<Storage>) -> Self {
        Self {
            store: LibraryStore::new(storage, SAVED_ALBUMS_KEY, DuplicatePolicy::Ignore),
        }
    }

    pub async fn all(&self) -> Vec<Album> {
        self.store.get_all().await
    }

    pub async fn save(&self, album: Album) -> Result<bool, StoreError> {
        self.store.add(album).await
    }

    pub async fn remove(&self, album_id: AlbumId) -> Result<bool, StoreError> {
        self.store.remove(&album_id).await
    }

    pub async fn is_saved(&self, album_id: AlbumId) -> bool {
        self.store.contains(&album_id).await
    }

    pub async fn toggle(&self, album: Album) -> Result<bool, StoreError> {
        let album_id = album.id;
        let saved = self.store.toggle(album).await?;
        tracing::info!(album_id, saved, "Toggled saved album");
        Ok(saved)
    }
}
