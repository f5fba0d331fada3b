use axum::Router;

use crate::state::SharedState;

pub mod docs;
pub mod game;
pub mod health;
pub mod ranking;
pub mod search;
pub mod submission;

/// Compose all route trees, wiring in shared state and documentation routes.
pub fn router(state: SharedState) -> Router<()> {
    health::router()
        .merge(game::router())
        .merge(submission::router())
        .merge(ranking::router())
        .merge(search::router())
        .merge(docs::router())
        .with_state(state)
}
