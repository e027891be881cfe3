//! Offline cache of preview audio
//!
//! One file per track (`<track id>.m4a`) lives in the downloads directory, and a
//! metadata index records when each track was downloaded. The index is only
//! trusted together with the filesystem: an entry whose file has gone missing is
//! treated as not downloaded and skipped when listing.

use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use thiserror::Error;
use tokio::sync::Mutex;

use super::catalog::{ApiError, AudioFetcher};
use super::entry::{DownloadedTrack, LibraryEntry};
use super::library::{DuplicatePolicy, LibraryStore};
use super::storage::{Storage, StoreError, DOWNLOADED_TRACKS_KEY};
use super::types::{Track, TrackId};
use crate::config::AUDIO_FILE_EXTENSION;

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("track {0} has no preview URL")]
    NoPreviewUrl(TrackId),
    #[error("transfer failed: {0}")]
    Transfer(#[from] ApiError),
    #[error("failed to {op} {}: {source}", .path.display())]
    Io {
        op: &'static str,
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error(transparent)]
    Store(#[from] StoreError),
}

fn io_error(op: &'static str, path: &Path) -> impl FnOnce(io::Error) -> CacheError {
    let path = path.to_path_buf();
    move |source| CacheError::Io { op, path, source }
}

pub struct DownloadCache {
    dir: PathBuf,
    fetcher: Arc<dyn AudioFetcher>,
    index: LibraryStore<DownloadedTrack>,
    /// Serializes every change that touches both files and the index.
    file_ops: Mutex<()>,
}

impl DownloadCache {
    pub fn new(dir: impl Into<PathBuf>, storage: Arc<Storage>, fetcher: Arc<dyn AudioFetcher>) -> Self {
        Self {
            dir: dir.into(),
            fetcher,
            index: LibraryStore::new(storage, DOWNLOADED_TRACKS_KEY, DuplicatePolicy::MoveToFront),
            file_ops: Mutex::new(()),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn local_path(&self, track_id: TrackId) -> PathBuf {
        self.dir.join(format!("{}.{}", track_id, AUDIO_FILE_EXTENSION))
    }

    /// Path of the cached file if it currently exists on disk.
    pub async fn local_file(&self, track_id: TrackId) -> Option<PathBuf> {
        let path = self.local_path(track_id);
        file_exists(&path).await.then_some(path)
    }

    /// True only when the track is indexed and its file is still on disk.
    pub async fn is_downloaded(&self, track_id: TrackId) -> bool {
        self.index.contains(&track_id).await && self.local_file(track_id).await.is_some()
    }

    /// Downloaded tracks, most recent first, skipping entries whose file is gone.
    pub async fn list(&self) -> Vec<DownloadedTrack> {
        let mut valid = Vec::new();
        for entry in self.index.get_all().await {
            if file_exists(&self.local_path(entry.item.id)).await {
                valid.push(entry);
            } else {
                tracing::debug!(track_id = entry.item.id, "Skipping download entry with missing file");
            }
        }
        valid.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        valid
    }

    /// Downloads the track's preview. Succeeds immediately without fetching when
    /// the file is already present.
    pub async fn download(&self, track: &Track) -> Result<(), CacheError> {
        let track_id = track.id;
        let url = track
            .preview_url
            .as_deref()
            .ok_or(CacheError::NoPreviewUrl(track_id))?;
        let destination = self.local_path(track_id);

        if file_exists(&destination).await {
            let _guard = self.file_ops.lock().await;
            if !self.index.contains(&track_id).await {
                self.index.add(LibraryEntry::new(track.clone())).await?;
            }
            tracing::debug!(track_id, "Track already downloaded");
            return Ok(());
        }

        tracing::info!(track_id, title = %track.title, "Downloading track");
        let body = self.fetcher.fetch_audio(url).await?;

        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(io_error("create", &self.dir))?;
        let staging = self
            .dir
            .join(format!(".{}.{}.part", track_id, uuid::Uuid::new_v4()));
        if let Err(e) = tokio::fs::write(&staging, &body).await {
            let _ = tokio::fs::remove_file(&staging).await;
            return Err(io_error("write", &staging)(e));
        }

        let _guard = self.file_ops.lock().await;
        if let Err(e) = replace_file(&staging, &destination).await {
            let _ = tokio::fs::remove_file(&staging).await;
            return Err(e);
        }
        self.index.add(LibraryEntry::new(track.clone())).await?;

        tracing::info!(track_id, bytes = body.len(), "Track downloaded");
        Ok(())
    }

    /// Deletes the cached file, then its index entry. A file that is already
    /// gone is not an error.
    pub async fn remove(&self, track_id: TrackId) -> Result<(), CacheError> {
        let _guard = self.file_ops.lock().await;
        let path = self.local_path(track_id);
        match tokio::fs::remove_file(&path).await {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => return Err(io_error("delete", &path)(e)),
        }
        self.index.remove(&track_id).await?;
        tracing::info!(track_id, "Removed download");
        Ok(())
    }

    /// Returns the resulting state: `true` when the track is now downloaded.
    pub async fn toggle_download(&self, track: &Track) -> Result<bool, CacheError> {
        if self.is_downloaded(track.id).await {
            self.remove(track.id).await?;
            Ok(false)
        } else {
            self.download(track).await?;
            Ok(true)
        }
    }
}

async fn file_exists(path: &Path) -> bool {
    tokio::fs::try_exists(path).await.unwrap_or(false)
}

/// Delete-then-move so a partially written file never sits at `destination`.
async fn replace_file(staging: &Path, destination: &Path) -> Result<(), CacheError> {
    match tokio::fs::remove_file(destination).await {
        Ok(()) => {}
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => return Err(io_error("delete", destination)(e)),
    }
    tokio::fs::rename(staging, destination)
        .await
        .map_err(io_error("move", destination))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::testing::FakeCatalog;
    use crate::model::types::sample_track;

    struct Fixture {
        _tmp: tempfile::TempDir,
        catalog: Arc<FakeCatalog>,
        storage: Arc<Storage>,
        cache: DownloadCache,
    }

    fn fixture_with(catalog: FakeCatalog) -> Fixture {
        let tmp = tempfile::tempdir().unwrap();
        let catalog = Arc::new(catalog);
        let storage = Arc::new(Storage::in_memory());
        let cache = DownloadCache::new(tmp.path().join("Downloads"), storage.clone(), catalog.clone());
        Fixture {
            _tmp: tmp,
            catalog,
            storage,
            cache,
        }
    }

    fn fixture() -> Fixture {
        fixture_with(FakeCatalog::new())
    }

    #[tokio::test]
    async fn toggle_twice_downloads_then_removes() {
        let f = fixture();
        let track = sample_track(7);

        assert!(f.cache.toggle_download(&track).await.unwrap());
        assert!(f.cache.local_path(7).exists());
        assert!(!f.cache.toggle_download(&track).await.unwrap());

        assert!(!f.cache.local_path(7).exists());
        assert!(f.cache.list().await.is_empty());
    }

    #[tokio::test]
    async fn downloaded_file_holds_fetched_body() {
        let f = fixture_with(FakeCatalog::new().with_audio(Ok(b"m4a-bytes".to_vec())));
        f.cache.download(&sample_track(1)).await.unwrap();
        let content = std::fs::read(f.cache.local_path(1)).unwrap();
        assert_eq!(content, b"m4a-bytes");
    }

    #[tokio::test]
    async fn download_is_idempotent_without_refetch() {
        let f = fixture();
        let track = sample_track(3);
        f.cache.download(&track).await.unwrap();
        f.cache.download(&track).await.unwrap();

        assert_eq!(f.catalog.fetch_count(), 1);
        assert_eq!(f.cache.list().await.len(), 1);
    }

    #[tokio::test]
    async fn failed_transfer_leaves_no_file_and_no_entry() {
        let f = fixture_with(
            FakeCatalog::new().with_audio(Err(ApiError::Transport("connection reset".into()))),
        );
        let result = f.cache.download(&sample_track(5)).await;

        assert!(matches!(result, Err(CacheError::Transfer(_))));
        assert!(!f.cache.local_path(5).exists());
        assert!(!f.cache.is_downloaded(5).await);
        let raw: Vec<DownloadedTrack> = f.storage.load(DOWNLOADED_TRACKS_KEY).await;
        assert!(raw.is_empty());
    }

    #[tokio::test]
    async fn io_failure_aborts_without_metadata() {
        let tmp = tempfile::tempdir().unwrap();
        let blocker = tmp.path().join("Downloads");
        std::fs::write(&blocker, b"not a directory").unwrap();
        let storage = Arc::new(Storage::in_memory());
        let cache = DownloadCache::new(&blocker, storage.clone(), Arc::new(FakeCatalog::new()));

        let result = cache.download(&sample_track(8)).await;
        assert!(matches!(result, Err(CacheError::Io { .. })));
        let raw: Vec<DownloadedTrack> = storage.load(DOWNLOADED_TRACKS_KEY).await;
        assert!(raw.is_empty());
    }

    #[tokio::test]
    async fn track_without_preview_cannot_be_downloaded() {
        let f = fixture();
        let mut track = sample_track(9);
        track.preview_url = None;
        assert!(matches!(
            f.cache.download(&track).await,
            Err(CacheError::NoPreviewUrl(9))
        ));
        assert_eq!(f.catalog.fetch_count(), 0);
    }

    #[tokio::test]
    async fn externally_deleted_file_is_reconciled_on_read() {
        let f = fixture();
        f.cache.download(&sample_track(42)).await.unwrap();
        f.cache.download(&sample_track(43)).await.unwrap();

        std::fs::remove_file(f.cache.local_path(42)).unwrap();

        assert!(!f.cache.is_downloaded(42).await);
        let ids: Vec<_> = f.cache.list().await.iter().map(|e| e.item.id).collect();
        assert_eq!(ids, vec![43]);
    }

    #[tokio::test]
    async fn list_is_most_recent_first() {
        let f = fixture();
        for id in [1, 2, 3] {
            f.cache.download(&sample_track(id)).await.unwrap();
        }
        let ids: Vec<_> = f.cache.list().await.iter().map(|e| e.item.id).collect();
        assert_eq!(ids, vec![3, 2, 1]);
    }

    #[tokio::test]
    async fn remove_tolerates_missing_file() {
        let f = fixture();
        f.cache.download(&sample_track(11)).await.unwrap();
        std::fs::remove_file(f.cache.local_path(11)).unwrap();

        f.cache.remove(11).await.unwrap();
        let raw: Vec<DownloadedTrack> = f.storage.load(DOWNLOADED_TRACKS_KEY).await;
        assert!(raw.is_empty());
    }

    #[tokio::test]
    async fn existing_file_is_indexed_without_fetching() {
        let f = fixture();
        std::fs::create_dir_all(f.cache.dir()).unwrap();
        std::fs::write(f.cache.local_path(12), b"already here").unwrap();

        f.cache.download(&sample_track(12)).await.unwrap();
        assert_eq!(f.catalog.fetch_count(), 0);
        assert!(f.cache.is_downloaded(12).await);
    }

    #[tokio::test]
    async fn no_staging_files_left_behind() {
        let f = fixture();
        f.cache.download(&sample_track(20)).await.unwrap();
        let leftovers: Vec<_> = std::fs::read_dir(f.cache.dir())
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name().to_string_lossy().ends_with(".part"))
            .collect();
        assert!(leftovers.is_empty());
    }
}
