//! Model module - library state, offline cache, search and playback
//!
//! Organized into submodules by responsibility:
//!
//! - `types`: Core value types (tracks, albums, playlists, repeat mode)
//! - `entry`: Timestamped library entries
//! - `storage`: Key-value JSON persistence
//! - `library`: Generic persisted collection, liked songs and saved albums
//! - `history`: Capped play history
//! - `playlists`: User playlists
//! - `catalog`: Remote catalog contract and the iTunes client
//! - `downloads`: Offline audio cache
//! - `search`: Concurrent track + album search
//! - `debounce`: Search-as-you-type debouncing
//! - `events`: Typed playback event bus
//! - `session`: The playback session state machine

mod types;
mod entry;
mod storage;
mod library;
mod history;
mod playlists;
mod catalog;
mod downloads;
mod search;
mod debounce;
mod events;
mod session;

#[cfg(test)]
pub(crate) mod testing;

#[cfg(test)]
pub(crate) use types::sample_track;

pub use types::{Album, AlbumId, Playlist, RepeatMode, SearchResultItem, Track, TrackId};

pub use entry::{DownloadedTrack, LibraryEntry, PlayHistoryEntry};

pub use storage::{
    Storage, StoreError, DOWNLOADED_TRACKS_KEY, LIKED_SONGS_KEY, PLAYLISTS_KEY,
    PLAY_HISTORY_KEY, SAVED_ALBUMS_KEY,
};

pub use library::{filter_tracks, DuplicatePolicy, Identified, LibraryStore, LikedSongs, SavedAlbums};

pub use history::PlayHistory;

pub use playlists::{PlaylistError, PlaylistStore};

pub use catalog::{
    decode_album_tracks, decode_results, ApiError, AudioFetcher, CatalogResponse, ItunesClient,
    MusicCatalog,
};

pub use downloads::{CacheError, DownloadCache};

pub use search::{SearchAggregator, SearchError, SearchResults};

pub use debounce::SearchDebouncer;

pub use events::{EventBus, EventKind, PlaybackEvent, SubscriptionId};

pub use session::{
    FinishOutcome, PlaybackError, PlaybackQueueState, PlaybackSession, Progress, ProgressObserver,
};
