use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    routing::put,
};
use axum_valid::Valid;

use crate::{
    auth::AuthenticatedPlayer,
    dto::submission::{SubmissionRequest, SubmissionView},
    error::AppError,
    services::submission_service,
    state::SharedState,
};

pub fn router() -> Router<SharedState> {
    Router::new().route(
        "/games/{id}/submission",
        put(upsert_submission).delete(withdraw_submission),
    )
}

/// Create or replace the caller's submission while the game is open.
#[utoipa::path(
    put,
    path = "/games/{id}/submission",
    tag = "submission",
    params(("id" = String, Path, description = "Identifier of the game")),
    request_body = SubmissionRequest,
    security(("bearer" = [])),
    responses(
        (status = 200, description = "Submission saved", body = SubmissionView),
        (status = 400, description = "Invalid songs, nickname or drawing"),
        (status = 409, description = "Song or nickname taken, or deadline passed")
    )
)]
pub async fn upsert_submission(
    State(state): State<SharedState>,
    AuthenticatedPlayer(player): AuthenticatedPlayer,
    Path(id): Path<String>,
    Valid(Json(payload)): Valid<Json<SubmissionRequest>>,
) -> Result<Json<SubmissionView>, AppError> {
    let view = submission_service::upsert_submission(&state, player, id, payload).await?;
    Ok(Json(view))
}

/// Withdraw the caller's submission while the game is open.
#[utoipa::path(
    delete,
    path = "/games/{id}/submission",
    tag = "submission",
    params(("id" = String, Path, description = "Identifier of the game")),
    security(("bearer" = [])),
    responses(
        (status = 204, description = "Submission withdrawn"),
        (status = 404, description = "No submission to withdraw"),
        (status = 409, description = "Deadline passed")
    )
)]
pub async fn withdraw_submission(
    State(state): State<SharedState>,
    AuthenticatedPlayer(player): AuthenticatedPlayer,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    submission_service::withdraw_submission(&state, player, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
