//! Music catalog and playlist collaborators.

pub mod offline;
pub mod spotify;

use futures::future::BoxFuture;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use offline::OfflineCatalog;
pub use spotify::{SpotifyClient, SpotifyConfig};

/// Convenient result alias returning [`CatalogError`] failures.
pub type CatalogResult<T> = Result<T, CatalogError>;

/// Failures talking to the external catalog.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// Required credential is not set.
    #[error("missing catalog environment variable `{var}`")]
    MissingEnvVar { var: &'static str },
    /// The HTTP client could not be configured.
    #[error("failed to build catalog HTTP client")]
    ClientBuilder {
        #[source]
        source: reqwest::Error,
    },
    /// Transport failure or timeout.
    #[error("failed to send catalog request to `{endpoint}`")]
    RequestSend {
        endpoint: String,
        #[source]
        source: reqwest::Error,
    },
    /// Non-success HTTP status.
    #[error("unexpected catalog response status {status} for `{endpoint}`")]
    RequestStatus { endpoint: String, status: StatusCode },
    /// Body did not match the expected JSON.
    #[error("failed to decode catalog response for `{endpoint}`")]
    DecodeResponse {
        endpoint: String,
        #[source]
        source: reqwest::Error,
    },
    /// Any other rejection, mostly produced by stand-in implementations.
    #[error("catalog rejected the request: {0}")]
    Rejected(String),
}

/// Search hit shown to players picking songs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackSummary {
    /// Catalog identifier, 22 base-62 characters.
    pub id: String,
    /// Track title.
    pub name: String,
    /// Album title.
    pub album: String,
    /// Artist names in credit order.
    pub artists: Vec<String>,
    /// Album cover URL, when the catalog has one.
    pub image: Option<String>,
}

/// Display metadata attached to songs on reveal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackMetadata {
    /// Catalog identifier the metadata belongs to.
    pub id: String,
    /// Track title, if the catalog still knows the track.
    pub name: Option<String>,
    /// Cover art URL.
    pub image: Option<String>,
}

/// Read-only catalog lookups. Both calls are idempotent.
pub trait CatalogService: Send + Sync {
    /// Free-text track search returning at most `limit` hits.
    fn search(&self, query: String, limit: u32)
    -> BoxFuture<'static, CatalogResult<Vec<TrackSummary>>>;

    /// Look up display metadata for `ids`. Callers keep each batch within the service limit.
    fn fetch_metadata(
        &self,
        ids: Vec<String>,
    ) -> BoxFuture<'static, CatalogResult<Vec<TrackMetadata>>>;
}

/// Side-effecting playlist operations.
pub trait PlaylistService: Send + Sync {
    /// Create a playlist and return its external id.
    fn create_playlist(
        &self,
        name: String,
        description: String,
    ) -> BoxFuture<'static, CatalogResult<String>>;

    /// Append `track_ids` to a playlist, chunking as the service requires.
    fn add_tracks(
        &self,
        playlist_id: String,
        track_ids: Vec<String>,
    ) -> BoxFuture<'static, CatalogResult<()>>;
}
