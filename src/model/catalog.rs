//! Remote catalog contract and the iTunes Search API client

use std::time::Duration;

use futures::future::{BoxFuture, FutureExt};
use reqwest::{Client, Url};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use thiserror::Error;

use super::types::{Album, AlbumId, Track};
use crate::config::{ALBUM_SEARCH_LIMIT, TRACK_SEARCH_LIMIT};
use crate::{log_api_request, log_api_result};

/// Failure of a single remote call
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum ApiError {
    #[error("invalid request")]
    InvalidRequest,
    #[error("no data received")]
    NoData,
    #[error("failed to decode response: {0}")]
    Decode(String),
    #[error("transport failure: {0}")]
    Transport(String),
}

impl ApiError {
    /// Short text suitable for showing to a user.
    pub fn message(&self) -> String {
        match self {
            ApiError::InvalidRequest => "Invalid URL".to_string(),
            ApiError::NoData => "No data received".to_string(),
            ApiError::Decode(_) => "Failed to parse data".to_string(),
            ApiError::Transport(msg) => msg.clone(),
        }
    }
}

/// Envelope shared by every catalog endpoint
#[derive(Debug, Deserialize)]
pub struct CatalogResponse<T> {
    #[serde(rename = "resultCount")]
    pub result_count: usize,
    pub results: Vec<T>,
}

/// Read side of the remote music service
pub trait MusicCatalog: Send + Sync {
    fn search_tracks<'a>(&'a self, query: &'a str) -> BoxFuture<'a, Result<Vec<Track>, ApiError>>;

    fn search_albums<'a>(&'a self, query: &'a str) -> BoxFuture<'a, Result<Vec<Album>, ApiError>>;

    /// Tracks of an album, without the album summary the service returns first.
    fn album_tracks(&self, album_id: AlbumId) -> BoxFuture<'_, Result<Vec<Track>, ApiError>>;

    fn artist_tracks<'a>(&'a self, artist_name: &'a str) -> BoxFuture<'a, Result<Vec<Track>, ApiError>>;
}

/// Fetches a remote audio body
pub trait AudioFetcher: Send + Sync {
    fn fetch_audio<'a>(&'a self, url: &'a str) -> BoxFuture<'a, Result<Vec<u8>, ApiError>>;
}

pub fn decode_results<T: DeserializeOwned>(body: &[u8]) -> Result<Vec<T>, ApiError> {
    if body.is_empty() {
        return Err(ApiError::NoData);
    }
    let response: CatalogResponse<T> =
        serde_json::from_slice(body).map_err(|e| ApiError::Decode(e.to_string()))?;
    tracing::trace!(result_count = response.result_count, "Decoded catalog response");
    Ok(response.results)
}

/// Decodes an album lookup. The first result is the album itself and is dropped.
pub fn decode_album_tracks(body: &[u8]) -> Result<Vec<Track>, ApiError> {
    decode_results::<serde_json::Value>(body)?
        .into_iter()
        .skip(1)
        .map(|value| serde_json::from_value(value).map_err(|e| ApiError::Decode(e.to_string())))
        .collect()
}

/// HTTP client for the iTunes Search API
#[derive(Clone)]
pub struct ItunesClient {
    http: Client,
    base_url: String,
}

impl ItunesClient {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, ApiError> {
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ApiError::Transport(e.to_string()))?;
        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    pub fn search_url(&self, term: &str, entity: &str, limit: u32) -> Result<Url, ApiError> {
        let term = term.trim();
        if term.is_empty() {
            return Err(ApiError::InvalidRequest);
        }
        let raw = format!(
            "{}/search?term={}&entity={}&limit={}",
            self.base_url,
            urlencoding::encode(term),
            entity,
            limit
        );
        Url::parse(&raw).map_err(|_| ApiError::InvalidRequest)
    }

    pub fn lookup_url(&self, album_id: AlbumId) -> Result<Url, ApiError> {
        Url::parse(&format!("{}/lookup?id={}&entity=song", self.base_url, album_id))
            .map_err(|_| ApiError::InvalidRequest)
    }

    async fn get_bytes(&self, url: Url) -> Result<Vec<u8>, ApiError> {
        let response = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|e| ApiError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ApiError::Transport(format!("HTTP {}", status)));
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| ApiError::Transport(e.to_string()))?;
        Ok(body.to_vec())
    }

    async fn fetch_results<T: DeserializeOwned>(&self, url: Url) -> Result<Vec<T>, ApiError> {
        let body = self.get_bytes(url).await?;
        decode_results(&body)
    }
}

impl MusicCatalog for ItunesClient {
    fn search_tracks<'a>(&'a self, query: &'a str) -> BoxFuture<'a, Result<Vec<Track>, ApiError>> {
        async move {
            log_api_request!("search_tracks", query);
            let url = self.search_url(query, "song", TRACK_SEARCH_LIMIT)?;
            let result = self.fetch_results(url).await;
            log_api_result!("search_tracks", result);
            result
        }
        .boxed()
    }

    fn search_albums<'a>(&'a self, query: &'a str) -> BoxFuture<'a, Result<Vec<Album>, ApiError>> {
        async move {
            log_api_request!("search_albums", query);
            let url = self.search_url(query, "album", ALBUM_SEARCH_LIMIT)?;
            let result = self.fetch_results(url).await;
            log_api_result!("search_albums", result);
            result
        }
        .boxed()
    }

    fn album_tracks(&self, album_id: AlbumId) -> BoxFuture<'_, Result<Vec<Track>, ApiError>> {
        async move {
            log_api_request!("album_tracks", album_id);
            let url = self.lookup_url(album_id)?;
            let result = match self.get_bytes(url).await {
                Ok(body) => decode_album_tracks(&body),
                Err(e) => Err(e),
            };
            log_api_result!("album_tracks", result);
            result
        }
        .boxed()
    }

    fn artist_tracks<'a>(&'a self, artist_name: &'a str) -> BoxFuture<'a, Result<Vec<Track>, ApiError>> {
        async move {
            log_api_request!("artist_tracks", artist_name);
            let url = self.search_url(artist_name, "song", TRACK_SEARCH_LIMIT)?;
            let result = self.fetch_results(url).await;
            log_api_result!("artist_tracks", result);
            result
        }
        .boxed()
    }
}

impl AudioFetcher for ItunesClient {
    fn fetch_audio<'a>(&'a self, url: &'a str) -> BoxFuture<'a, Result<Vec<u8>, ApiError>> {
        async move {
            let url = Url::parse(url).map_err(|_| ApiError::InvalidRequest)?;
            let result = self.get_bytes(url).await;
            log_api_result!("fetch_audio", result);
            let body = result?;
            if body.is_empty() {
                return Err(ApiError::NoData);
            }
            Ok(body)
        }
        .boxed()
    }
}
