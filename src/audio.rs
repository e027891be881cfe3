//! Audio output abstraction
//!
//! The playback session drives an [`AudioOutput`]; decoding and rendering live
//! behind it. [`HeadlessOutput`] keeps a simulated clock and is what the CLI and
//! the tests run against.

use std::path::PathBuf;
use std::sync::{Arc, Mutex, PoisonError};

use tokio::time::Instant;

/// Where the audio for a track comes from
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PlaybackSource {
    LocalFile(PathBuf),
    Remote(String),
}

impl PlaybackSource {
    pub fn is_local(&self) -> bool {
        matches!(self, PlaybackSource::LocalFile(_))
    }
}

impl std::fmt::Display for PlaybackSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PlaybackSource::LocalFile(path) => write!(f, "file://{}", path.display()),
            PlaybackSource::Remote(url) => f.write_str(url),
        }
    }
}

pub trait AudioOutput: Send {
    /// Replaces whatever was loaded. Playback does not start until `play`.
    fn load(&mut self, source: &PlaybackSource, duration_ms: Option<u64>);
    fn play(&mut self);
    fn pause(&mut self);
    /// Seek to zero and play.
    fn restart(&mut self);
    fn stop(&mut self);
    fn position_ms(&self) -> u64;
    /// True once a loaded source has played to its end.
    fn has_ended(&self) -> bool;
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum OutputCommand {
    Load(PlaybackSource),
    Play,
    Pause,
    Restart,
    Stop,
}

/// Shared view of every command an output received
#[derive(Clone, Default)]
pub struct OutputLog(Arc<Mutex<Vec<OutputCommand>>>);

impl OutputLog {
    fn push(&self, command: OutputCommand) {
        self.0.lock().unwrap_or_else(PoisonError::into_inner).push(command);
    }

    pub fn commands(&self) -> Vec<OutputCommand> {
        self.0.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    pub fn loaded_sources(&self) -> Vec<PlaybackSource> {
        self.commands()
            .into_iter()
            .filter_map(|c| match c {
                OutputCommand::Load(source) => Some(source),
                _ => None,
            })
            .collect()
    }
}

/// An output with no audio device. Position advances with the tokio clock while
/// playing and stops at the track duration.
#[derive(Default)]
pub struct HeadlessOutput {
    loaded: Option<PlaybackSource>,
    duration_ms: Option<u64>,
    position_ms: u64,
    playing_since: Option<Instant>,
    log: OutputLog,
}

impl HeadlessOutput {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn log(&self) -> OutputLog {
        self.log.clone()
    }

    fn elapsed_ms(&self) -> u64 {
        self.playing_since
            .map(|since| since.elapsed().as_millis() as u64)
            .unwrap_or(0)
    }
}

impl AudioOutput for HeadlessOutput {
    fn load(&mut self, source: &PlaybackSource, duration_ms: Option<u64>) {
        tracing::debug!(%source, ?duration_ms, "Loading source");
        self.loaded = Some(source.clone());
        self.duration_ms = duration_ms;
        self.position_ms = 0;
        self.playing_since = None;
        self.log.push(OutputCommand::Load(source.clone()));
    }

    fn play(&mut self) {
        // Resuming a finished source starts it over.
        if self.playing_since.is_none() && self.has_ended() {
            self.position_ms = 0;
        }
        if self.loaded.is_some() && self.playing_since.is_none() {
            self.playing_since = Some(Instant::now());
        }
        self.log.push(OutputCommand::Play);
    }

    fn pause(&mut self) {
        self.position_ms = self.position_ms();
        self.playing_since = None;
        self.log.push(OutputCommand::Pause);
    }

    fn restart(&mut self) {
        self.position_ms = 0;
        self.playing_since = self.loaded.as_ref().map(|_| Instant::now());
        self.log.push(OutputCommand::Restart);
    }

    fn stop(&mut self) {
        self.loaded = None;
        self.duration_ms = None;
        self.position_ms = 0;
        self.playing_since = None;
        self.log.push(OutputCommand::Stop);
    }

    fn position_ms(&self) -> u64 {
        let position = self.position_ms.saturating_add(self.elapsed_ms());
        match self.duration_ms {
            Some(duration) => position.min(duration),
            None => position,
        }
    }

    fn has_ended(&self) -> bool {
        match (&self.loaded, self.duration_ms) {
            (Some(_), Some(duration)) => self.position_ms() >= duration,
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn remote() -> PlaybackSource {
        PlaybackSource::Remote("https://example.com/a.m4a".into())
    }

    #[tokio::test(start_paused = true)]
    async fn position_advances_only_while_playing() {
        let mut output = HeadlessOutput::new();
        output.load(&remote(), Some(30_000));
        output.play();
        tokio::time::advance(Duration::from_millis(1_500)).await;
        assert_eq!(output.position_ms(), 1_500);

        output.pause();
        tokio::time::advance(Duration::from_millis(5_000)).await;
        assert_eq!(output.position_ms(), 1_500);
        assert!(!output.has_ended());
    }

    #[tokio::test(start_paused = true)]
    async fn ends_at_duration_and_restart_rewinds() {
        let mut output = HeadlessOutput::new();
        output.load(&remote(), Some(1_000));
        output.play();
        tokio::time::advance(Duration::from_millis(2_000)).await;
        assert!(output.has_ended());
        assert_eq!(output.position_ms(), 1_000);

        output.restart();
        assert_eq!(output.position_ms(), 0);
        assert!(!output.has_ended());
    }

    #[tokio::test(start_paused = true)]
    async fn resuming_a_finished_source_starts_over() {
        let mut output = HeadlessOutput::new();
        output.load(&remote(), Some(1_000));
        output.play();
        tokio::time::advance(Duration::from_millis(1_500)).await;
        output.pause();
        assert!(output.has_ended());

        output.play();
        assert_eq!(output.position_ms(), 0);
        assert!(!output.has_ended());
        tokio::time::advance(Duration::from_millis(400)).await;
        assert_eq!(output.position_ms(), 400);
    }

    #[test]
    fn log_records_commands() {
        let mut output = HeadlessOutput::new();
        let log = output.log();
        output.load(&remote(), None);
        output.play();
        output.stop();
        assert_eq!(
            log.commands(),
            vec![OutputCommand::Load(remote()), OutputCommand::Play, OutputCommand::Stop]
        );
        assert_eq!(log.loaded_sources(), vec![remote()]);
    }
}
