//! In-memory stand-ins for the remote catalog used by unit tests

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use futures::future::{BoxFuture, FutureExt};

use super::catalog::{ApiError, AudioFetcher, MusicCatalog};
use super::types::{Album, AlbumId, Track};

pub struct FakeCatalog {
    pub tracks: Mutex<Result<Vec<Track>, ApiError>>,
    pub albums: Mutex<Result<Vec<Album>, ApiError>>,
    pub audio: Mutex<Result<Vec<u8>, ApiError>>,
    pub delay: Duration,
    pub fetch_calls: AtomicUsize,
}

impl FakeCatalog {
    pub fn new() -> Self {
        Self {
            tracks: Mutex::new(Ok(Vec::new())),
            albums: Mutex::new(Ok(Vec::new())),
            audio: Mutex::new(Ok(b"fake-audio-body".to_vec())),
            delay: Duration::ZERO,
            fetch_calls: AtomicUsize::new(0),
        }
    }

    pub fn with_tracks(self, tracks: Result<Vec<Track>, ApiError>) -> Self {
        *self.tracks.lock().unwrap() = tracks;
        self
    }

    pub fn with_albums(self, albums: Result<Vec<Album>, ApiError>) -> Self {
        *self.albums.lock().unwrap() = albums;
        self
    }

    pub fn with_audio(self, audio: Result<Vec<u8>, ApiError>) -> Self {
        *self.audio.lock().unwrap() = audio;
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn fetch_count(&self) -> usize {
        self.fetch_calls.load(Ordering::SeqCst)
    }
}

impl MusicCatalog for FakeCatalog {
    fn search_tracks<'a>(&'a self, _query: &'a str) -> BoxFuture<'a, Result<Vec<Track>, ApiError>> {
        async move {
            tokio::time::sleep(self.delay).await;
            self.tracks.lock().unwrap().clone()
        }
        .boxed()
    }

    fn search_albums<'a>(&'a self, _query: &'a str) -> BoxFuture<'a, Result<Vec<Album>, ApiError>> {
        async move {
            tokio::time::sleep(self.delay).await;
            self.albums.lock().unwrap().clone()
        }
        .boxed()
    }

    fn album_tracks(&self, _album_id: AlbumId) -> BoxFuture<'_, Result<Vec<Track>, ApiError>> {
        async move { self.tracks.lock().unwrap().clone() }.boxed()
    }

    fn artist_tracks<'a>(&'a self, _artist_name: &'a str) -> BoxFuture<'a, Result<Vec<Track>, ApiError>> {
        async move { self.tracks.lock().unwrap().clone() }.boxed()
    }
}

impl AudioFetcher for FakeCatalog {
    fn fetch_audio<'a>(&'a self, _url: &'a str) -> BoxFuture<'a, Result<Vec<u8>, ApiError>> {
        async move {
            self.fetch_calls.fetch_add(1, Ordering::SeqCst);
            self.audio.lock().unwrap().clone()
        }
        .boxed()
    }
}
