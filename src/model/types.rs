//! Core value types shared by the stores, the catalog and the playback session

use serde::{Deserialize, Serialize};

const SMALL_ARTWORK_SIZE: &str = "100x100";
const LARGE_ARTWORK_SIZE: &str = "600x600";

pub type TrackId = u64;
pub type AlbumId = u64;

/// A playable track as returned by the catalog. Identity is `id`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Track {
    #[serde(rename = "trackId")]
    pub id: TrackId,
    #[serde(rename = "trackName", default)]
    pub title: String,
    #[serde(rename = "artistName", default)]
    pub artist: String,
    #[serde(rename = "collectionName", default, skip_serializing_if = "Option::is_none")]
    pub album: Option<String>,
    #[serde(rename = "artworkUrl100", default, skip_serializing_if = "Option::is_none")]
    pub artwork_url: Option<String>,
    #[serde(rename = "previewUrl", default, skip_serializing_if = "Option::is_none")]
    pub preview_url: Option<String>,
    #[serde(rename = "trackTimeMillis", default, skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<u64>,
}

impl Track {
    pub fn artwork_url_large(&self) -> Option<String> {
        self.artwork_url.as_deref().map(large_artwork)
    }

    /// Duration as `m:ss`, or `0:00` when unknown.
    pub fn formatted_duration(&self) -> String {
        let total_secs = self.duration_ms.unwrap_or(0) / 1000;
        format!("{}:{:02}", total_secs / 60, total_secs % 60)
    }
}

/// An album summary from the catalog. Identity is `id`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Album {
    #[serde(rename = "collectionId")]
    pub id: AlbumId,
    #[serde(rename = "collectionName", default)]
    pub title: String,
    #[serde(rename = "artistName", default)]
    pub artist: String,
    #[serde(rename = "artworkUrl100", default, skip_serializing_if = "Option::is_none")]
    pub artwork_url: Option<String>,
    #[serde(rename = "trackCount", default, skip_serializing_if = "Option::is_none")]
    pub track_count: Option<u32>,
    #[serde(rename = "releaseDate", default, skip_serializing_if = "Option::is_none")]
    pub release_date: Option<String>,
    #[serde(rename = "primaryGenreName", default, skip_serializing_if = "Option::is_none")]
    pub genre: Option<String>,
}

impl Album {
    pub fn artwork_url_large(&self) -> Option<String> {
        self.artwork_url.as_deref().map(large_artwork)
    }

    pub fn release_year(&self) -> Option<&str> {
        self.release_date.as_deref().and_then(|d| d.get(..4))
    }
}

fn large_artwork(url: &str) -> String {
    url.replace(SMALL_ARTWORK_SIZE, LARGE_ARTWORK_SIZE)
}

/// A user-created playlist holding an ordered list of track ids
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Playlist {
    pub id: String,
    pub name: String,
    #[serde(rename = "trackIds", default)]
    pub track_ids: Vec<TrackId>,
}

/// Repeat mode state
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RepeatMode {
    #[default]
    Off,
    All,
    One,
}

impl RepeatMode {
    /// Off → All → One → Off
    pub fn next(self) -> Self {
        match self {
            RepeatMode::Off => RepeatMode::All,
            RepeatMode::All => RepeatMode::One,
            RepeatMode::One => RepeatMode::Off,
        }
    }
}

/// A single row of combined search output
#[derive(Clone, Debug, PartialEq)]
pub enum SearchResultItem {
    Track(Track),
    Album(Album),
}

impl SearchResultItem {
    pub fn title(&self) -> &str {
        match self {
            SearchResultItem::Track(track) => &track.title,
            SearchResultItem::Album(album) => &album.title,
        }
    }
}

#[cfg(test)]
pub(crate) fn sample_track(id: TrackId) -> Track {
    Track {
        id,
        title: format!("Track {id}"),
        artist: "Artist".to_string(),
        album: Some("Album".to_string()),
        artwork_url: Some(format!("https://example.com/{id}/100x100bb.jpg")),
        preview_url: Some(format!("https://example.com/preview/{id}.m4a")),
        duration_ms: Some(30_000),
    }
}

#[cfg(test)]
pub(crate) fn sample_album(id: AlbumId) -> Album {
    Album {
        id,
        title: format!("Album {id}"),
        artist: "Artist".to_string(),
        artwork_url: Some(format!("https://example.com/{id}/100x100bb.jpg")),
        track_count: Some(10),
        release_date: Some("2020-05-01T07:00:00Z".to_string()),
        genre: Some("Pop".to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_catalog_track_json() {
        let json = r#"{
            "wrapperType": "track",
            "trackId": 1440857781,
            "trackName": "Yesterday",
            "artistName": "The Beatles",
            "collectionName": "Help!",
            "artworkUrl100": "https://is1.mzstatic.com/x/100x100bb.jpg",
            "previewUrl": "https://audio.example.com/p.m4a",
            "trackTimeMillis": 125666
        }"#;
        let track: Track = serde_json::from_str(json).unwrap();
        assert_eq!(track.id, 1440857781);
        assert_eq!(track.title, "Yesterday");
        assert_eq!(track.album.as_deref(), Some("Help!"));
        assert_eq!(track.formatted_duration(), "2:05");
        assert_eq!(
            track.artwork_url_large().as_deref(),
            Some("https://is1.mzstatic.com/x/600x600bb.jpg")
        );
    }

    #[test]
    fn track_without_optional_fields_decodes() {
        let track: Track = serde_json::from_str(r#"{"trackId": 5}"#).unwrap();
        assert_eq!(track.id, 5);
        assert!(track.preview_url.is_none());
        assert_eq!(track.formatted_duration(), "0:00");
    }

    #[test]
    fn album_exposes_release_year() {
        let album = sample_album(3);
        assert_eq!(album.release_year(), Some("2020"));
        assert!(album.artwork_url_large().unwrap().contains("600x600"));
    }

    #[test]
    fn repeat_mode_cycles_off_all_one() {
        assert_eq!(RepeatMode::Off.next(), RepeatMode::All);
        assert_eq!(RepeatMode::All.next(), RepeatMode::One);
        assert_eq!(RepeatMode::One.next(), RepeatMode::Off);
    }
}
