//! Stand-in used when no Spotify credentials are configured.

use futures::future::BoxFuture;
use tracing::debug;
use uuid::Uuid;

use super::{CatalogResult, CatalogService, PlaylistService, TrackMetadata, TrackSummary};

/// Catalog that knows no tracks and keeps playlists nowhere. Games still run end to end, just
/// without search results, song metadata or a real playlist.
#[derive(Debug, Default, Clone, Copy)]
pub struct OfflineCatalog;

impl CatalogService for OfflineCatalog {
    fn search(
        &self,
        _query: String,
        _limit: u32,
    ) -> BoxFuture<'static, CatalogResult<Vec<TrackSummary>>> {
        Box::pin(async { Ok(Vec::new()) })
    }

    fn fetch_metadata(
        &self,
        ids: Vec<String>,
    ) -> BoxFuture<'static, CatalogResult<Vec<TrackMetadata>>> {
        Box::pin(async move {
            Ok(ids
                .into_iter()
                .map(|id| TrackMetadata {
                    id,
                    name: None,
                    image: None,
                })
                .collect())
        })
    }
}

impl PlaylistService for OfflineCatalog {
    fn create_playlist(
        &self,
        name: String,
        _description: String,
    ) -> BoxFuture<'static, CatalogResult<String>> {
        Box::pin(async move {
            let id = format!("offline-{}", Uuid::new_v4().simple());
            debug!(%name, playlist_id = %id, "offline playlist created");
            Ok(id)
        })
    }

    fn add_tracks(
        &self,
        playlist_id: String,
        track_ids: Vec<String>,
    ) -> BoxFuture<'static, CatalogResult<()>> {
        Box::pin(async move {
            debug!(%playlist_id, count = track_ids.len(), "offline playlist add ignored");
            Ok(())
        })
    }
}
