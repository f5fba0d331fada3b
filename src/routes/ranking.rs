use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
};
use axum_valid::Valid;

use crate::{
    auth::AuthenticatedPlayer,
    dto::ranking::{RankingRequest, RankingResultView, RankingView},
    error::AppError,
    services::ranking_service,
    state::SharedState,
};

pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/games/{id}/rankings", post(submit_ranking))
        .route("/games/{id}/rankings/result", get(ranking_result))
}

/// Record the caller's tier assignment for one tierlist.
#[utoipa::path(
    post,
    path = "/games/{id}/rankings",
    tag = "ranking",
    params(("id" = String, Path, description = "Identifier of the game")),
    request_body = RankingRequest,
    security(("bearer" = [])),
    responses(
        (status = 201, description = "Ranking recorded", body = RankingView),
        (status = 400, description = "Unknown tier or song, or song placed twice"),
        (status = 403, description = "Caller never joined the game"),
        (status = 409, description = "Already ranked, or game not revealed"),
        (status = 412, description = "Guess tierlist must be submitted first")
    )
)]
pub async fn submit_ranking(
    State(state): State<SharedState>,
    AuthenticatedPlayer(player): AuthenticatedPlayer,
    Path(id): Path<String>,
    Valid(Json(payload)): Valid<Json<RankingRequest>>,
) -> Result<(StatusCode, Json<RankingView>), AppError> {
    let view = ranking_service::submit_ranking(&state, player, id, payload).await?;
    Ok((StatusCode::CREATED, Json(view)))
}

/// Score of the caller's guesses.
#[utoipa::path(
    get,
    path = "/games/{id}/rankings/result",
    tag = "ranking",
    params(("id" = String, Path, description = "Identifier of the game")),
    security(("bearer" = [])),
    responses(
        (status = 200, description = "Guess score", body = RankingResultView),
        (status = 412, description = "Guess tierlist not submitted yet")
    )
)]
pub async fn ranking_result(
    State(state): State<SharedState>,
    AuthenticatedPlayer(player): AuthenticatedPlayer,
    Path(id): Path<String>,
) -> Result<Json<RankingResultView>, AppError> {
    let view = ranking_service::ranking_result(&state, player, id).await?;
    Ok(Json(view))
}
