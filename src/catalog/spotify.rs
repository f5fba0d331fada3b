//! Spotify Web API adapter.
//!
//! Catalog reads use an app token (client credentials); playlist writes act on behalf of the
//! playlist owner through a long-lived refresh token.

use std::{
    sync::Arc,
    time::{Duration, Instant},
};

use futures::future::BoxFuture;
use reqwest::{Client, RequestBuilder, Response};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use tokio::sync::Mutex;
use tracing::{debug, info};

use super::{
    CatalogError, CatalogResult, CatalogService, PlaylistService, TrackMetadata, TrackSummary,
};

const ACCOUNTS_URL: &str = "https://accounts.spotify.com/api/token";
const API_URL: &str = "https://api.spotify.com/v1";
/// Maximum ids accepted by `GET /tracks`.
pub const TRACKS_BATCH_LIMIT: usize = 50;
/// Maximum URIs accepted by one `POST /playlists/{id}/tracks`.
pub const PLAYLIST_ADD_LIMIT: usize = 100;
/// Upper bound on any single Spotify request, token exchange included.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);
/// Refresh tokens slightly before Spotify says they expire.
const EXPIRY_MARGIN: Duration = Duration::from_secs(30);

/// Credentials and playlist settings read from the environment.
#[derive(Clone)]
pub struct SpotifyConfig {
    pub client_id: String,
    pub client_secret: String,
    pub refresh_token: String,
    pub user_id: String,
    pub public_playlists: bool,
}

impl SpotifyConfig {
    /// Read `SPOTIFY_CLIENT_ID`, `SPOTIFY_CLIENT_SECRET`, `SPOTIFY_REFRESH_TOKEN` and
    /// `SPOTIFY_USER_ID`.
    pub fn from_env(public_playlists: bool) -> CatalogResult<Self> {
        fn var(var: &'static str) -> CatalogResult<String> {
            std::env::var(var)
                .ok()
                .filter(|value| !value.is_empty())
                .ok_or(CatalogError::MissingEnvVar { var })
        }

        Ok(Self {
            client_id: var("SPOTIFY_CLIENT_ID")?,
            client_secret: var("SPOTIFY_CLIENT_SECRET")?,
            refresh_token: var("SPOTIFY_REFRESH_TOKEN")?,
            user_id: var("SPOTIFY_USER_ID")?,
            public_playlists,
        })
    }
}

#[derive(Clone)]
struct CachedToken {
    value: String,
    expires_at: Instant,
}

#[derive(Clone, Copy)]
enum Grant {
    ClientCredentials,
    RefreshToken,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default = "default_expires_in")]
    expires_in: u64,
}

fn default_expires_in() -> u64 {
    3600
}

#[derive(Deserialize)]
struct SearchResponse {
    tracks: SearchTracks,
}

#[derive(Deserialize)]
struct SearchTracks {
    items: Vec<SpotifyTrack>,
}

#[derive(Deserialize)]
struct TracksResponse {
    tracks: Vec<Option<SpotifyTrack>>,
}

#[derive(Deserialize)]
struct SpotifyTrack {
    id: String,
    name: String,
    #[serde(default)]
    artists: Vec<SpotifyArtist>,
    album: SpotifyAlbum,
}

#[derive(Deserialize)]
struct SpotifyArtist {
    name: String,
}

#[derive(Deserialize)]
struct SpotifyAlbum {
    name: String,
    #[serde(default)]
    images: Vec<SpotifyImage>,
}

#[derive(Deserialize)]
struct SpotifyImage {
    url: String,
}

impl SpotifyTrack {
    fn cover(&self) -> Option<String> {
        self.album.images.first().map(|image| image.url.clone())
    }
}

#[derive(Serialize)]
struct CreatePlaylistRequest<'a> {
    name: &'a str,
    description: &'a str,
    public: bool,
}

#[derive(Deserialize)]
struct CreatePlaylistResponse {
    id: String,
}

#[derive(Serialize)]
struct AddTracksRequest {
    uris: Vec<String>,
}

/// Shared Spotify client; clones share the HTTP pool and cached tokens.
#[derive(Clone)]
pub struct SpotifyClient {
    inner: Arc<SpotifyInner>,
}

struct SpotifyInner {
    http: Client,
    config: SpotifyConfig,
    app_token: Mutex<Option<CachedToken>>,
    user_token: Mutex<Option<CachedToken>>,
}

impl SpotifyClient {
    pub fn new(config: SpotifyConfig) -> CatalogResult<Self> {
        let http = Client::builder()
            .user_agent(concat!(
                env!("CARGO_PKG_NAME"),
                "/",
                env!("CARGO_PKG_VERSION")
            ))
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|source| CatalogError::ClientBuilder { source })?;

        Ok(Self {
            inner: Arc::new(SpotifyInner {
                http,
                config,
                app_token: Mutex::new(None),
                user_token: Mutex::new(None),
            }),
        })
    }

    async fn token(&self, grant: Grant) -> CatalogResult<String> {
        let slot = match grant {
            Grant::ClientCredentials => &self.inner.app_token,
            Grant::RefreshToken => &self.inner.user_token,
        };
        let mut cached = slot.lock().await;
        if let Some(token) = cached.as_ref().filter(|t| t.expires_at > Instant::now()) {
            return Ok(token.value.clone());
        }

        let config = &self.inner.config;
        let form: Vec<(&str, &str)> = match grant {
            Grant::ClientCredentials => vec![("grant_type", "client_credentials")],
            Grant::RefreshToken => vec![
                ("grant_type", "refresh_token"),
                ("refresh_token", config.refresh_token.as_str()),
            ],
        };
        let request = self
            .inner
            .http
            .post(ACCOUNTS_URL)
            .basic_auth(&config.client_id, Some(&config.client_secret))
            .form(&form);
        let response: TokenResponse = decode(ACCOUNTS_URL, send(ACCOUNTS_URL, request).await?).await?;

        let lifetime = Duration::from_secs(response.expires_in).saturating_sub(EXPIRY_MARGIN);
        debug!(expires_in = response.expires_in, "obtained Spotify access token");
        *cached = Some(CachedToken {
            value: response.access_token.clone(),
            expires_at: Instant::now() + lifetime,
        });
        Ok(response.access_token)
    }

    async fn search(&self, query: String, limit: u32) -> CatalogResult<Vec<TrackSummary>> {
        let token = self.token(Grant::ClientCredentials).await?;
        let endpoint = format!("{API_URL}/search");
        let limit = limit.to_string();
        let request = self
            .inner
            .http
            .get(&endpoint)
            .bearer_auth(token)
            .query(&[
                ("q", query.as_str()),
                ("type", "track"),
                ("limit", limit.as_str()),
            ]);
        let response: SearchResponse = decode(&endpoint, send(&endpoint, request).await?).await?;

        Ok(response
            .tracks
            .items
            .into_iter()
            .map(|track| TrackSummary {
                image: track.cover(),
                artists: track.artists.into_iter().map(|artist| artist.name).collect(),
                album: track.album.name,
                id: track.id,
                name: track.name,
            })
            .collect())
    }

    async fn fetch_metadata(&self, ids: Vec<String>) -> CatalogResult<Vec<TrackMetadata>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let token = self.token(Grant::ClientCredentials).await?;
        let endpoint = format!("{API_URL}/tracks");

        let mut metadata = Vec::with_capacity(ids.len());
        for batch in ids.chunks(TRACKS_BATCH_LIMIT) {
            let request = self
                .inner
                .http
                .get(&endpoint)
                .bearer_auth(&token)
                .query(&[("ids", batch.join(","))]);
            let response: TracksResponse = decode(&endpoint, send(&endpoint, request).await?).await?;
            // Unknown ids come back as `null` entries.
            metadata.extend(response.tracks.into_iter().flatten().map(|track| TrackMetadata {
                image: track.cover(),
                id: track.id,
                name: Some(track.name),
            }));
        }
        Ok(metadata)
    }

    async fn create_playlist(&self, name: String, description: String) -> CatalogResult<String> {
        let token = self.token(Grant::RefreshToken).await?;
        let config = &self.inner.config;
        let endpoint = format!("{API_URL}/users/{}/playlists", config.user_id);
        let request = self
            .inner
            .http
            .post(&endpoint)
            .bearer_auth(token)
            .json(&CreatePlaylistRequest {
                name: &name,
                description: &description,
                public: config.public_playlists,
            });
        let created: CreatePlaylistResponse =
            decode(&endpoint, send(&endpoint, request).await?).await?;

        info!(playlist_id = %created.id, "created Spotify playlist");
        Ok(created.id)
    }

    async fn add_tracks(&self, playlist_id: String, track_ids: Vec<String>) -> CatalogResult<()> {
        if track_ids.is_empty() {
            return Ok(());
        }
        let token = self.token(Grant::RefreshToken).await?;
        let endpoint = format!("{API_URL}/playlists/{playlist_id}/tracks");

        for chunk in track_ids.chunks(PLAYLIST_ADD_LIMIT) {
            let uris = chunk.iter().map(|id| format!("spotify:track:{id}")).collect();
            let request = self
                .inner
                .http
                .post(&endpoint)
                .bearer_auth(&token)
                .json(&AddTracksRequest { uris });
            send(&endpoint, request).await?;
        }

        info!(%playlist_id, count = track_ids.len(), "added tracks to Spotify playlist");
        Ok(())
    }
}

async fn send(endpoint: &str, request: RequestBuilder) -> CatalogResult<Response> {
    let response = request
        .send()
        .await
        .map_err(|source| CatalogError::RequestSend {
            endpoint: endpoint.to_owned(),
            source,
        })?;

    let status = response.status();
    if !status.is_success() {
        return Err(CatalogError::RequestStatus {
            endpoint: endpoint.to_owned(),
            status,
        });
    }
    Ok(response)
}

async fn decode<T: DeserializeOwned>(endpoint: &str, response: Response) -> CatalogResult<T> {
    response
        .json::<T>()
        .await
        .map_err(|source| CatalogError::DecodeResponse {
            endpoint: endpoint.to_owned(),
            source,
        })
}

impl CatalogService for SpotifyClient {
    fn search(
        &self,
        query: String,
        limit: u32,
    ) -> BoxFuture<'static, CatalogResult<Vec<TrackSummary>>> {
        let client = self.clone();
        Box::pin(async move { client.search(query, limit).await })
    }

    fn fetch_metadata(
        &self,
        ids: Vec<String>,
    ) -> BoxFuture<'static, CatalogResult<Vec<TrackMetadata>>> {
        let client = self.clone();
        Box::pin(async move { client.fetch_metadata(ids).await })
    }
}

impl PlaylistService for SpotifyClient {
    fn create_playlist(
        &self,
        name: String,
        description: String,
    ) -> BoxFuture<'static, CatalogResult<String>> {
        let client = self.clone();
        Box::pin(async move { client.create_playlist(name, description).await })
    }

    fn add_tracks(
        &self,
        playlist_id: String,
        track_ids: Vec<String>,
    ) -> BoxFuture<'static, CatalogResult<()>> {
        let client = self.clone();
        Box::pin(async move { client.add_tracks(playlist_id, track_ids).await })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tracks_payload_skips_unknown_ids() {
        let payload = r#"{
            "tracks": [
                {"id": "aaaaaaaaaaaaaaaaaaaaaa", "name": "Song", "artists": [{"name": "Band"}],
                 "album": {"name": "Album", "images": [{"url": "https://img/1"}, {"url": "https://img/2"}]}},
                null
            ]
        }"#;
        let parsed: TracksResponse = serde_json::from_str(payload).unwrap();
        let tracks: Vec<_> = parsed.tracks.into_iter().flatten().collect();
        assert_eq!(tracks.len(), 1);
        assert_eq!(tracks[0].cover().as_deref(), Some("https://img/1"));
    }

    #[test]
    fn search_payload_tolerates_missing_images() {
        let payload = r#"{"tracks": {"items": [
            {"id": "bbbbbbbbbbbbbbbbbbbbbb", "name": "Other", "artists": [], "album": {"name": "LP"}}
        ]}}"#;
        let parsed: SearchResponse = serde_json::from_str(payload).unwrap();
        assert_eq!(parsed.tracks.items[0].cover(), None);
    }
}
