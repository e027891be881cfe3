//! Service wiring
//!
//! Every service is constructed once here and handed to whoever needs it;
//! nothing is a global.

use std::sync::Arc;

use anyhow::{Context, Result};

use crate::audio::AudioOutput;
use crate::config::AppConfig;
use crate::model::{
    AudioFetcher, DownloadCache, EventBus, ItunesClient, LikedSongs, MusicCatalog, PlayHistory,
    PlaybackSession, PlaylistStore, SavedAlbums, SearchAggregator, SearchDebouncer, Storage,
};

pub struct AppServices {
    pub config: AppConfig,
    pub catalog: Arc<dyn MusicCatalog>,
    pub search: SearchAggregator,
    pub debouncer: SearchDebouncer,
    pub downloads: Arc<DownloadCache>,
    pub liked_songs: LikedSongs,
    pub saved_albums: SavedAlbums,
    pub history: Arc<PlayHistory>,
    pub playlists: PlaylistStore,
    pub events: EventBus,
    pub session: Arc<PlaybackSession>,
}

impl AppServices {
    /// Production wiring against the iTunes catalog.
    pub fn bootstrap(config: AppConfig, output: Box<dyn AudioOutput>) -> Result<Self> {
        let client = Arc::new(
            ItunesClient::new(config.api_base_url.clone(), config.http_timeout)
                .context("failed to build HTTP client")?,
        );
        tracing::info!(base_url = %config.api_base_url, data_dir = %config.data_dir.display(), "Bootstrapping services");
        Ok(Self::with_collaborators(config, client.clone(), client, output))
    }

    /// Wiring with explicit remote collaborators, used for substitution.
    pub fn with_collaborators(
        config: AppConfig,
        catalog: Arc<dyn MusicCatalog>,
        fetcher: Arc<dyn AudioFetcher>,
        output: Box<dyn AudioOutput>,
    ) -> Self {
        let storage = Arc::new(Storage::open(config.stores_dir()));
        let downloads = Arc::new(DownloadCache::new(config.downloads_dir(), storage.clone(), fetcher));
        let history = Arc::new(PlayHistory::new(storage.clone()));
        let events = EventBus::new();
        let session = Arc::new(PlaybackSession::new(
            downloads.clone(),
            history.clone(),
            events.clone(),
            output,
        ));

        Self {
            search: SearchAggregator::new(catalog.clone()),
            debouncer: SearchDebouncer::new(config.search_debounce),
            liked_songs: LikedSongs::new(storage.clone()),
            saved_albums: SavedAlbums::new(storage.clone()),
            playlists: PlaylistStore::new(storage),
            catalog,
            downloads,
            history,
            events,
            session,
            config,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::HeadlessOutput;
    use crate::model::testing::FakeCatalog;
    use crate::model::{EventKind, PlaybackEvent};
    use std::sync::Mutex;

    #[tokio::test]
    async fn services_share_one_session_and_store_directory() {
        let tmp = tempfile::tempdir().unwrap();
        let catalog = Arc::new(FakeCatalog::new());
        let services = AppServices::with_collaborators(
            AppConfig::with_data_dir(tmp.path()),
            catalog.clone(),
            catalog,
            Box::new(HeadlessOutput::new()),
        );

        let seen = Arc::new(Mutex::new(Vec::new()));
        for surface in ["player", "mini-player", "tabs"] {
            let seen = seen.clone();
            services.events.subscribe(EventKind::TrackChanged, move |e| {
                if let PlaybackEvent::TrackChanged(track) = e {
                    seen.lock().unwrap().push((surface, track.id));
                }
            });
        }

        let track = crate::model::sample_track(5);
        services.downloads.download(&track).await.unwrap();
        services.session.play(track.clone(), vec![track], 0).await.unwrap();

        assert_eq!(seen.lock().unwrap().len(), 3);
        assert_eq!(services.history.recently_played(5).await.len(), 1);
        assert!(tmp.path().join("stores").join("playHistory.json").exists());
        assert!(tmp.path().join("Downloads").join("5.m4a").exists());
    }
}
