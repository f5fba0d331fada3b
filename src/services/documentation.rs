use utoipa::{
    Modify, OpenApi,
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
};

#[derive(OpenApi)]
/// Aggregated OpenAPI specification for Song Sleuths Back.
#[openapi(
    paths(
        crate::routes::health::healthcheck,
        crate::routes::game::create_game,
        crate::routes::game::get_game,
        crate::routes::game::delete_game,
        crate::routes::submission::upsert_submission,
        crate::routes::submission::withdraw_submission,
        crate::routes::ranking::submit_ranking,
        crate::routes::ranking::ranking_result,
        crate::routes::search::search,
    ),
    components(
        schemas(
            crate::dto::health::HealthResponse,
            crate::dto::game::CreateGameRequest,
            crate::dto::game::GameSummary,
            crate::dto::game::GameView,
            crate::dto::game::SongView,
            crate::dto::game::TierlistView,
            crate::dto::game::TierView,
            crate::dto::submission::SubmissionRequest,
            crate::dto::submission::SubmissionView,
            crate::dto::ranking::RankingRequest,
            crate::dto::ranking::TierPlacementInput,
            crate::dto::ranking::RankingView,
            crate::dto::ranking::RankingResultView,
            crate::dto::search::TrackView,
            crate::state::session::SessionPhase,
        )
    ),
    modifiers(&BearerAuth),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "game", description = "Game creation, viewing and deletion"),
        (name = "submission", description = "Player submissions before the deadline"),
        (name = "ranking", description = "Tierlist rankings after the reveal"),
        (name = "catalog", description = "Song search"),
    )
)]
pub struct ApiDoc;

/// Registers the `bearer` security scheme referenced by authenticated routes.
struct BearerAuth;

impl Modify for BearerAuth {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}
