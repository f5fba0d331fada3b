use tracing::warn;

use crate::{dto::health::HealthResponse, state::SharedState};

/// Ping the installed store and report whether the service runs degraded.
pub async fn health_status(state: &SharedState) -> HealthResponse {
    let Some(store) = state.game_store().await else {
        warn!("no storage backend installed (degraded mode)");
        return HealthResponse::degraded(None);
    };

    if let Err(err) = store.health_check().await {
        warn!(backend = store.backend(), error = %err, "storage health check failed");
        return HealthResponse::degraded(Some(store.backend()));
    }

    if state.is_degraded().await {
        HealthResponse::degraded(Some(store.backend()))
    } else {
        HealthResponse::ok(store.backend())
    }
}
