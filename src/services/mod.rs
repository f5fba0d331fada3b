/// OpenAPI documentation generation.
pub mod documentation;
/// Game creation, views and deletion.
pub mod game_service;
/// Health check service.
pub mod health_service;
/// Tierlist rankings and guess results.
pub mod ranking_service;
/// One-time reveal of locked games.
pub mod reveal_service;
/// Catalog search.
pub mod search_service;
/// Storage connection supervisor toggling degraded mode.
pub mod storage_supervisor;
/// Player submissions.
pub mod submission_service;
