use axum::Router;

use crate::state::SharedState;

pub mod calendar;
pub mod docs;
pub mod health;
pub mod reports;
pub mod rounds;
pub mod scores;

/// Compose all route trees, wiring in shared state and documentation routes.
pub fn router(state: SharedState) -> Router<()> {
    let api_router = health::router()
        .merge(calendar::router())
        .merge(rounds::router())
        .merge(scores::router())
        .merge(reports::router());

    api_router.merge(docs::router()).with_state(state)
}
