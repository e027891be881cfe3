//! The process-wide playback session
//!
//! Owns "what is playing now": the current track, the queue being traversed,
//! shuffle and repeat settings, and the audio output. Every mutation goes through
//! the session's lock, so UI-driven calls and end-of-track handling never
//! interleave. Observers learn about changes only through the [`EventBus`].

use std::sync::Arc;
use std::time::Duration;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use thiserror::Error;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

use super::downloads::DownloadCache;
use super::events::{EventBus, PlaybackEvent};
use super::history::PlayHistory;
use super::types::{RepeatMode, Track, TrackId};
use crate::audio::{AudioOutput, PlaybackSource};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PlaybackError {
    #[error("the queue is empty")]
    EmptyQueue,
    #[error("index {index} is outside a queue of {len} tracks")]
    IndexOutOfRange { index: usize, len: usize },
    #[error("track {0} has neither a downloaded file nor a preview URL")]
    NoPlayableSource(TrackId),
}

/// Snapshot of the session state
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PlaybackQueueState {
    pub current_track: Option<Track>,
    pub queue: Vec<Track>,
    /// Valid whenever `queue` is non-empty; 0 otherwise.
    pub current_index: usize,
    pub is_playing: bool,
    pub shuffle: bool,
    pub repeat_mode: RepeatMode,
}

/// What the session did when the current track reached its end
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FinishOutcome {
    /// Nothing was playing.
    Idle,
    Restarted,
    Advanced(PlaybackSource),
    Stopped,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Progress {
    pub track_id: TrackId,
    pub position_ms: u64,
    pub duration_ms: Option<u64>,
    pub is_playing: bool,
}

struct SessionInner {
    state: PlaybackQueueState,
    output: Box<dyn AudioOutput>,
    rng: StdRng,
}

pub struct PlaybackSession {
    inner: Mutex<SessionInner>,
    downloads: Arc<DownloadCache>,
    history: Arc<PlayHistory>,
    events: EventBus,
}

impl PlaybackSession {
    pub fn new(
        downloads: Arc<DownloadCache>,
        history: Arc<PlayHistory>,
        events: EventBus,
        output: Box<dyn AudioOutput>,
    ) -> Self {
        Self {
            inner: Mutex::new(SessionInner {
                state: PlaybackQueueState::default(),
                output,
                rng: StdRng::from_entropy(),
            }),
            downloads,
            history,
            events,
        }
    }

    /// Deterministic shuffle, for reproducible runs.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.inner.get_mut().rng = StdRng::seed_from_u64(seed);
        self
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    pub async fn snapshot(&self) -> PlaybackQueueState {
        self.inner.lock().await.state.clone()
    }

    /// Starts `track` as entry `index` of `queue`, replacing whatever was playing.
    ///
    /// A downloaded file is preferred over the remote preview. When neither
    /// exists nothing changes and `NoPlayableSource` is returned. An empty
    /// queue is treated as a queue holding only `track`.
    pub async fn play(&self, track: Track, queue: Vec<Track>, index: usize) -> Result<PlaybackSource, PlaybackError> {
        let mut inner = self.inner.lock().await;
        self.play_locked(&mut inner, track, queue, index).await
    }

    async fn play_locked(
        &self,
        inner: &mut SessionInner,
        track: Track,
        queue: Vec<Track>,
        index: usize,
    ) -> Result<PlaybackSource, PlaybackError> {
        let (queue, index) = if queue.is_empty() {
            (vec![track.clone()], 0)
        } else {
            (queue, index)
        };
        if index >= queue.len() {
            return Err(PlaybackError::IndexOutOfRange {
                index,
                len: queue.len(),
            });
        }

        let source = self.resolve_source(&track).await?;

        inner.output.stop();
        inner.output.load(&source, track.duration_ms);
        inner.output.play();

        let state = &mut inner.state;
        state.current_track = Some(track.clone());
        state.queue = queue;
        state.current_index = index;
        state.is_playing = true;

        tracing::info!(
            track_id = track.id,
            title = %track.title,
            index,
            local = source.is_local(),
            "Playing track"
        );

        if let Err(e) = self.history.record(track.clone()).await {
            tracing::warn!(track_id = track.id, error = %e, "Failed to record play history");
        }

        self.events.publish(PlaybackEvent::TrackChanged(track));
        self.events.publish(PlaybackEvent::PlayStateChanged(true));
        Ok(source)
    }

    /// Checked on every play since downloads come and go between calls.
    async fn resolve_source(&self, track: &Track) -> Result<PlaybackSource, PlaybackError> {
        if let Some(path) = self.downloads.local_file(track.id).await {
            return Ok(PlaybackSource::LocalFile(path));
        }
        match &track.preview_url {
            Some(url) if !url.is_empty() => Ok(PlaybackSource::Remote(url.clone())),
            _ => {
                tracing::warn!(track_id = track.id, "No playable source for track");
                Err(PlaybackError::NoPlayableSource(track.id))
            }
        }
    }

    /// Returns the new playing state, or `None` when there is no current track.
    pub async fn toggle_play_pause(&self) -> Option<bool> {
        let mut inner = self.inner.lock().await;
        inner.state.current_track.as_ref()?;

        let playing = !inner.state.is_playing;
        if playing {
            inner.output.play();
        } else {
            inner.output.pause();
        }
        inner.state.is_playing = playing;
        tracing::debug!(playing, "Toggled playback");

        self.events.publish(PlaybackEvent::PlayStateChanged(playing));
        Some(playing)
    }

    pub async fn next(&self) -> Result<PlaybackSource, PlaybackError> {
        let mut inner = self.inner.lock().await;
        self.step_locked(&mut inner, Direction::Forward, true).await
    }

    pub async fn previous(&self) -> Result<PlaybackSource, PlaybackError> {
        let mut inner = self.inner.lock().await;
        self.step_locked(&mut inner, Direction::Backward, true).await
    }

    /// Moves to the next playable entry in `direction`, skipping tracks that
    /// have no source. Without `wrap` the walk stops at the edge of the queue.
    async fn step_locked(
        &self,
        inner: &mut SessionInner,
        direction: Direction,
        wrap: bool,
    ) -> Result<PlaybackSource, PlaybackError> {
        let len = inner.state.queue.len();
        if len == 0 {
            return Err(PlaybackError::EmptyQueue);
        }

        let current = inner.state.current_index.min(len - 1);
        let candidates: Vec<usize> = if inner.state.shuffle {
            // Uniform pick; may land on the current track again.
            let start = inner.rng.gen_range(0..len);
            (0..len).map(|k| (start + k) % len).collect()
        } else {
            match (direction, wrap) {
                (Direction::Forward, true) => (1..=len).map(|k| (current + k) % len).collect(),
                (Direction::Forward, false) => (current + 1..len).collect(),
                (Direction::Backward, true) => (1..=len).map(|k| (current + len - k) % len).collect(),
                (Direction::Backward, false) => (0..current).rev().collect(),
            }
        };

        let queue = inner.state.queue.clone();
        let mut skipped = None;
        for index in candidates {
            let track = queue[index].clone();
            match self.play_locked(inner, track, queue.clone(), index).await {
                Err(PlaybackError::NoPlayableSource(track_id)) => {
                    tracing::debug!(track_id, index, "Skipping unplayable queue entry");
                    skipped = Some(PlaybackError::NoPlayableSource(track_id));
                }
                result => return result,
            }
        }
        Err(skipped.unwrap_or(PlaybackError::EmptyQueue))
    }

    /// Applies the repeat policy once the playing track has reached its end.
    pub async fn handle_track_finished(&self) -> Result<FinishOutcome, PlaybackError> {
        let mut inner = self.inner.lock().await;
        self.finish_locked(&mut inner).await
    }

    /// Runs the end-of-track policy only if the output reports it has ended.
    /// The check and the policy happen under one lock, so a concurrent `play`
    /// cannot be mistaken for the finished track.
    pub async fn poll_end_of_track(&self) -> Option<Result<FinishOutcome, PlaybackError>> {
        let mut inner = self.inner.lock().await;
        if !inner.state.is_playing || !inner.output.has_ended() {
            return None;
        }
        Some(self.finish_locked(&mut inner).await)
    }

    async fn finish_locked(&self, inner: &mut SessionInner) -> Result<FinishOutcome, PlaybackError> {
        if inner.state.current_track.is_none() {
            return Ok(FinishOutcome::Idle);
        }

        let repeat_mode = inner.state.repeat_mode;
        let index = inner.state.current_index;
        let has_next = index + 1 < inner.state.queue.len();
        tracing::debug!(repeat = ?repeat_mode, index, "Track finished");

        let advanced = match repeat_mode {
            RepeatMode::One => {
                inner.output.restart();
                inner.state.is_playing = true;
                return Ok(FinishOutcome::Restarted);
            }
            RepeatMode::All => self.step_locked(inner, Direction::Forward, true).await,
            RepeatMode::Off if has_next => self.step_locked(inner, Direction::Forward, false).await,
            RepeatMode::Off => return Ok(self.stop_locked(inner)),
        };

        match advanced {
            Ok(source) => Ok(FinishOutcome::Advanced(source)),
            // Nothing left that can play.
            Err(PlaybackError::NoPlayableSource(_)) => Ok(self.stop_locked(inner)),
            Err(e) => Err(e),
        }
    }

    fn stop_locked(&self, inner: &mut SessionInner) -> FinishOutcome {
        inner.output.pause();
        inner.state.is_playing = false;
        self.events.publish(PlaybackEvent::PlayStateChanged(false));
        FinishOutcome::Stopped
    }

    pub async fn set_shuffle(&self, shuffle: bool) {
        self.inner.lock().await.state.shuffle = shuffle;
        tracing::debug!(shuffle, "Shuffle set");
    }

    pub async fn toggle_shuffle(&self) -> bool {
        let mut inner = self.inner.lock().await;
        inner.state.shuffle = !inner.state.shuffle;
        inner.state.shuffle
    }

    pub async fn set_repeat_mode(&self, mode: RepeatMode) {
        self.inner.lock().await.state.repeat_mode = mode;
        tracing::debug!(?mode, "Repeat mode set");
    }

    /// Off → All → One → Off. Returns the new mode.
    pub async fn cycle_repeat_mode(&self) -> RepeatMode {
        let mut inner = self.inner.lock().await;
        inner.state.repeat_mode = inner.state.repeat_mode.next();
        inner.state.repeat_mode
    }

    pub async fn progress(&self) -> Option<Progress> {
        let inner = self.inner.lock().await;
        let track = inner.state.current_track.as_ref()?;
        Some(Progress {
            track_id: track.id,
            position_ms: inner.output.position_ms(),
            duration_ms: track.duration_ms,
            is_playing: inner.state.is_playing,
        })
    }

    /// Reports progress every `interval` until the returned observer is
    /// detached or dropped.
    pub fn observe_progress<F>(self: &Arc<Self>, interval: Duration, handler: F) -> ProgressObserver
    where
        F: Fn(Progress) + Send + Sync + 'static,
    {
        let session = Arc::clone(self);
        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            loop {
                ticker.tick().await;
                if let Some(progress) = session.progress().await {
                    handler(progress);
                }
            }
        });
        ProgressObserver { handle }
    }

    /// Background task that applies the end-of-track policy whenever the
    /// output reaches the end of a track.
    pub fn spawn_end_of_track_watcher(self: &Arc<Self>, interval: Duration) -> JoinHandle<()> {
        let session = Arc::clone(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            loop {
                ticker.tick().await;
                match session.poll_end_of_track().await {
                    Some(Err(e)) => tracing::warn!(error = %e, "End-of-track handling failed"),
                    Some(Ok(outcome)) => tracing::debug!(?outcome, "End of track handled"),
                    None => {}
                }
            }
        })
    }
}

#[derive(Clone, Copy)]
enum Direction {
    Forward,
    Backward,
}

/// Handle for a periodic progress callback. Dropping it detaches the callback.
pub struct ProgressObserver {
    handle: JoinHandle<()>,
}

impl ProgressObserver {
    pub fn detach(self) {
        self.handle.abort();
    }

    pub fn is_attached(&self) -> bool {
        !self.handle.is_finished()
    }
}

impl Drop for ProgressObserver {
    fn drop(&mut self) {
        self.handle.abort();
    }
}
