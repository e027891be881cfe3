//! Timestamped wrapper used for download and play-history records

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::types::Track;

/// An item plus the time it was inserted, used for recency ordering.
///
/// Older data stored the item under `track` and the time under
/// `downloadedAt`/`playedAt`; both spellings are still accepted on read.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LibraryEntry<T> {
    #[serde(alias = "track")]
    pub item: T,
    #[serde(alias = "downloadedAt", alias = "playedAt")]
    pub timestamp: DateTime<Utc>,
}

impl<T> LibraryEntry<T> {
    pub fn new(item: T) -> Self {
        Self {
            item,
            timestamp: Utc::now(),
        }
    }

    pub fn at(item: T, timestamp: DateTime<Utc>) -> Self {
        Self { item, timestamp }
    }
}

pub type DownloadedTrack = LibraryEntry<Track>;
pub type PlayHistoryEntry = LibraryEntry<Track>;
