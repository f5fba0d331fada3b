use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use crate::catalog::TrackSummary;

/// Query string of the catalog search.
#[derive(Debug, Deserialize, IntoParams, Validate)]
#[into_params(parameter_in = Query)]
pub struct SearchQuery {
    /// Free text matched against track, album and artist names.
    #[validate(length(min = 1, max = 200))]
    pub q: String,
}

/// Search hit returned to players picking songs.
#[derive(Debug, Serialize, ToSchema)]
pub struct TrackView {
    pub id: String,
    pub name: String,
    pub album: String,
    pub artists: Vec<String>,
    pub image: Option<String>,
}

impl From<TrackSummary> for TrackView {
    fn from(track: TrackSummary) -> Self {
        Self {
            id: track.id,
            name: track.name,
            album: track.album,
            artists: track.artists,
            image: track.image,
        }
    }
}
