use serde::Serialize;
use utoipa::ToSchema;

/// Payload returned by the `/healthcheck` route.
#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    /// "ok" or "degraded".
    pub status: String,
    /// Storage engine in use, absent while no store is installed.
    pub storage: Option<String>,
}

impl HealthResponse {
    pub fn ok(storage: &str) -> Self {
        Self {
            status: "ok".to_string(),
            storage: Some(storage.to_string()),
        }
    }

    pub fn degraded(storage: Option<&str>) -> Self {
        Self {
            status: "degraded".to_string(),
            storage: storage.map(str::to_string),
        }
    }
}
