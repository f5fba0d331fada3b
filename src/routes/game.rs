use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
};
use axum_valid::Valid;

use crate::{
    auth::AuthenticatedPlayer,
    dto::game::{CreateGameRequest, GameSummary, GameView},
    error::AppError,
    services::game_service,
    state::SharedState,
};

/// Routes handling game creation, viewing and deletion.
pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/games", post(create_game))
        .route("/games/{id}", get(get_game).delete(delete_game))
}

/// Create a game and its external playlist.
#[utoipa::path(
    post,
    path = "/games",
    tag = "game",
    request_body = CreateGameRequest,
    security(("bearer" = [])),
    responses(
        (status = 201, description = "Game created", body = GameSummary),
        (status = 400, description = "Invalid name, quota or deadline"),
        (status = 502, description = "Playlist could not be created")
    )
)]
pub async fn create_game(
    State(state): State<SharedState>,
    AuthenticatedPlayer(player): AuthenticatedPlayer,
    Valid(Json(payload)): Valid<Json<CreateGameRequest>>,
) -> Result<(StatusCode, Json<GameSummary>), AppError> {
    let summary = game_service::create_game(&state, player, payload).await?;
    Ok((StatusCode::CREATED, Json(summary)))
}

/// View a game. The first read after the deadline reveals it.
#[utoipa::path(
    get,
    path = "/games/{id}",
    tag = "game",
    params(("id" = String, Path, description = "Identifier of the game")),
    security(("bearer" = [])),
    responses(
        (status = 200, description = "Game view for its current phase", body = GameView),
        (status = 404, description = "Game not found"),
        (status = 502, description = "Reveal failed upstream; retry"),
        (status = 503, description = "Reveal in progress; retry")
    )
)]
pub async fn get_game(
    State(state): State<SharedState>,
    AuthenticatedPlayer(player): AuthenticatedPlayer,
    Path(id): Path<String>,
) -> Result<Json<GameView>, AppError> {
    let view = game_service::get_game(&state, player, id).await?;
    Ok(Json(view))
}

/// Delete a game and everything it owns.
#[utoipa::path(
    delete,
    path = "/games/{id}",
    tag = "game",
    params(("id" = String, Path, description = "Identifier of the game")),
    security(("bearer" = [])),
    responses(
        (status = 204, description = "Game deleted"),
        (status = 403, description = "Caller does not own the game"),
        (status = 404, description = "Game not found")
    )
)]
pub async fn delete_game(
    State(state): State<SharedState>,
    AuthenticatedPlayer(player): AuthenticatedPlayer,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    game_service::delete_game(&state, player, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
