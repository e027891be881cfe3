use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use tokio::sync::Notify;

use hearo::app::AppServices;
use hearo::audio::HeadlessOutput;
use hearo::config::{AppConfig, RECENTLY_PLAYED_LIMIT};
use hearo::logging;
use hearo::model::{EventKind, PlaybackEvent, SearchResultItem, Track};

const USAGE: &str = "\
usage: hearo <command> [args]

commands:
  search <query>      search tracks and albums
  album <id>          list the tracks of an album
  artist <name>       list tracks by an artist
  download <query>    download the first matching track
  downloads           list downloaded tracks
  history             show recently played tracks
  play <query>        play the matching tracks headlessly";

const WATCH_INTERVAL: Duration = Duration::from_millis(250);
const PROGRESS_INTERVAL: Duration = Duration::from_secs(5);

#[tokio::main]
async fn main() -> Result<()> {
    let config = AppConfig::from_env();

    if let Err(e) = logging::init_logging(&config) {
        eprintln!("Warning: Failed to initialize logging: {}", e);
    }

    tracing::info!("=== Hearo Starting ===");

    let mut args = std::env::args().skip(1);
    let Some(command) = args.next() else {
        println!("{USAGE}");
        return Ok(());
    };
    let rest = args.collect::<Vec<_>>().join(" ");

    let services = AppServices::bootstrap(config, Box::new(HeadlessOutput::new()))?;

    let result = match command.as_str() {
        "search" => search(&services, &rest).await,
        "album" => album(&services, &rest).await,
        "artist" => artist(&services, &rest).await,
        "download" => download(&services, &rest).await,
        "downloads" => list_downloads(&services).await,
        "history" => history(&services).await,
        "play" => play(&services, &rest).await,
        "help" | "-h" | "--help" => {
            println!("{USAGE}");
            Ok(())
        }
        other => bail!("unknown command '{other}'\n\n{USAGE}"),
    };

    if let Err(e) = &result {
        tracing::error!(command = %command, error = %e, "Command failed");
    }
    tracing::info!("=== Hearo Exiting ===");
    result
}

fn require(arg: &str, what: &str) -> Result<()> {
    if arg.trim().is_empty() {
        bail!("missing {what}\n\n{USAGE}");
    }
    Ok(())
}

fn print_track(track: &Track) {
    println!(
        "{:>12}  {} - {}  [{}]",
        track.id,
        track.artist,
        track.title,
        track.formatted_duration()
    );
}

async fn search(services: &AppServices, query: &str) -> Result<()> {
    require(query, "search query")?;
    let results = services.search.search(query).await?;
    if results.is_empty() {
        println!("No results for '{query}'");
        return Ok(());
    }

    for item in results.display_items() {
        match item {
            SearchResultItem::Album(album) => println!(
                "{:>12}  [album] {} - {} ({})",
                album.id,
                album.artist,
                album.title,
                album.release_year().unwrap_or("?")
            ),
            SearchResultItem::Track(track) => print_track(&track),
        }
    }
    Ok(())
}

async fn album(services: &AppServices, id: &str) -> Result<()> {
    require(id, "album id")?;
    let album_id = id.trim().parse().context("album id must be a number")?;
    let tracks = services
        .catalog
        .album_tracks(album_id)
        .await
        .map_err(|e| anyhow::anyhow!(e.message()))?;
    tracks.iter().for_each(print_track);
    Ok(())
}

async fn artist(services: &AppServices, name: &str) -> Result<()> {
    require(name, "artist name")?;
    let tracks = services
        .catalog
        .artist_tracks(name)
        .await
        .map_err(|e| anyhow::anyhow!(e.message()))?;
    tracks.iter().for_each(print_track);
    Ok(())
}

async fn first_tracks(services: &AppServices, query: &str) -> Result<Vec<Track>> {
    require(query, "search query")?;
    let tracks = services.search.search(query).await?.tracks;
    if tracks.is_empty() {
        bail!("no tracks match '{query}'");
    }
    Ok(tracks)
}

async fn download(services: &AppServices, query: &str) -> Result<()> {
    let tracks = first_tracks(services, query).await?;
    let track = &tracks[0];
    services.downloads.download(track).await?;
    println!(
        "Downloaded {} - {} to {}",
        track.artist,
        track.title,
        services.downloads.local_path(track.id).display()
    );
    Ok(())
}

async fn list_downloads(services: &AppServices) -> Result<()> {
    let downloads = services.downloads.list().await;
    if downloads.is_empty() {
        println!("No downloads");
    }
    for entry in downloads {
        print!("{}  ", entry.timestamp.format("%Y-%m-%d %H:%M"));
        print_track(&entry.item);
    }
    Ok(())
}

async fn history(services: &AppServices) -> Result<()> {
    let recent = services.history.recently_played(RECENTLY_PLAYED_LIMIT).await;
    if recent.is_empty() {
        println!("Nothing played yet");
    }
    recent.iter().for_each(print_track);
    Ok(())
}

async fn play(services: &AppServices, query: &str) -> Result<()> {
    let queue = first_tracks(services, query).await?;
    let session = Arc::clone(&services.session);

    let stopped = Arc::new(Notify::new());
    let notify = stopped.clone();
    services.events.subscribe(EventKind::PlayStateChanged, move |event| {
        if matches!(event, PlaybackEvent::PlayStateChanged(false)) {
            notify.notify_one();
        }
    });
    services.events.subscribe(EventKind::TrackChanged, |event| {
        if let PlaybackEvent::TrackChanged(track) = event {
            println!("Now playing: {} - {}", track.artist, track.title);
        }
    });

    let watcher = session.spawn_end_of_track_watcher(WATCH_INTERVAL);
    let _progress = session.observe_progress(PROGRESS_INTERVAL, |progress| {
        let total = progress
            .duration_ms
            .map(|ms| format!("{}s", ms / 1000))
            .unwrap_or_else(|| "?".to_string());
        println!("  {}s / {}", progress.position_ms / 1000, total);
    });

    let source = session.play(queue[0].clone(), queue, 0).await?;
    tracing::info!(%source, "Playback started");

    tokio::select! {
        _ = stopped.notified() => println!("Queue finished"),
        _ = tokio::signal::ctrl_c() => println!("Stopped"),
    }

    watcher.abort();
    Ok(())
}
