//! Combined track + album search

use std::sync::Arc;

use thiserror::Error;

use super::catalog::{ApiError, MusicCatalog};
use super::types::{Album, SearchResultItem, Track};
use crate::config::SEARCH_ALBUM_DISPLAY_LIMIT;

/// Both legs of a search failed
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Network Error: {}", .tracks.message())]
pub struct SearchError {
    pub tracks: ApiError,
    pub albums: ApiError,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct SearchResults {
    pub tracks: Vec<Track>,
    pub albums: Vec<Album>,
}

impl SearchResults {
    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty() && self.albums.is_empty()
    }

    /// Rows in display order: at most five albums, then every track.
    pub fn display_items(&self) -> Vec<SearchResultItem> {
        self.albums
            .iter()
            .take(SEARCH_ALBUM_DISPLAY_LIMIT)
            .cloned()
            .map(SearchResultItem::Album)
            .chain(self.tracks.iter().cloned().map(SearchResultItem::Track))
            .collect()
    }
}

pub struct SearchAggregator {
    catalog: Arc<dyn MusicCatalog>,
}

impl SearchAggregator {
    pub fn new(catalog: Arc<dyn MusicCatalog>) -> Self {
        Self { catalog }
    }

    /// Runs the track and album searches concurrently and waits for both.
    /// A failed leg contributes nothing; only when both fail is an error
    /// returned.
    pub async fn search(&self, query: &str) -> Result<SearchResults, SearchError> {
        tracing::debug!(query, "Searching tracks and albums");

        let (tracks, albums) = futures::join!(
            self.catalog.search_tracks(query),
            self.catalog.search_albums(query)
        );

        match (tracks, albums) {
            (Err(tracks), Err(albums)) => {
                tracing::error!(tracks = %tracks, albums = %albums, "Search failed on both legs");
                Err(SearchError { tracks, albums })
            }
            (tracks, albums) => {
                let results = SearchResults {
                    tracks: tracks.unwrap_or_else(|e| {
                        tracing::warn!(error = %e, "Track search failed, keeping album results");
                        Vec::new()
                    }),
                    albums: albums.unwrap_or_else(|e| {
                        tracing::warn!(error = %e, "Album search failed, keeping track results");
                        Vec::new()
                    }),
                };
                tracing::info!(
                    query,
                    tracks = results.tracks.len(),
                    albums = results.albums.len(),
                    "Search completed"
                );
                Ok(results)
            }
        }
    }
}
