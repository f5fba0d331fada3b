use axum::{
    Json, Router,
    extract::{Query, State},
    routing::get,
};
use axum_valid::Valid;

use crate::{
    auth::AuthenticatedPlayer,
    dto::search::{SearchQuery, TrackView},
    error::AppError,
    services::search_service,
    state::SharedState,
};

pub fn router() -> Router<SharedState> {
    Router::new().route("/search", get(search))
}

/// Search the music catalog.
#[utoipa::path(
    get,
    path = "/search",
    tag = "catalog",
    params(SearchQuery),
    security(("bearer" = [])),
    responses(
        (status = 200, description = "Matching tracks", body = [TrackView]),
        (status = 502, description = "Catalog unavailable")
    )
)]
pub async fn search(
    State(state): State<SharedState>,
    AuthenticatedPlayer(_player): AuthenticatedPlayer,
    Valid(Query(query)): Valid<Query<SearchQuery>>,
) -> Result<Json<Vec<TrackView>>, AppError> {
    let tracks = search_service::search_tracks(&state, query.q).await?;
    Ok(Json(tracks))
}
