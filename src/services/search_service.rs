use tracing::debug;

use crate::{dto::search::TrackView, error::ServiceError, state::SharedState};

/// Search the catalog for tracks matching `query`.
pub async fn search_tracks(
    state: &SharedState,
    query: String,
) -> Result<Vec<TrackView>, ServiceError> {
    let query = query.trim().to_owned();
    if query.is_empty() {
        return Err(ServiceError::InvalidInput("search query is empty".into()));
    }

    let limit = state.config().search_limit;
    let tracks = state.catalog().search(query.clone(), limit).await?;
    debug!(%query, hits = tracks.len(), "catalog search");

    Ok(tracks.into_iter().map(Into::into).collect())
}
