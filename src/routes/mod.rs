use axum::Router;

use crate::state::SharedState;

/// Session-guarded completion administration.
pub mod admin;
/// Game catalog listing.
pub mod catalog;
/// Player-facing completion endpoints.
pub mod completions;
/// Swagger UI and OpenAPI document.
pub mod docs;
/// Liveness and store health.
pub mod health;
/// Session management.
pub mod session;
/// Settings endpoints.
pub mod settings;
/// Completion correction stream.
pub mod sse;

/// Compose all route trees, wiring in shared state and the documentation UI.
pub fn router(state: SharedState) -> Router<()> {
    let api_router = health::router()
        .merge(catalog::router())
        .merge(settings::router())
        .merge(session::router())
        .merge(completions::router())
        .merge(admin::router(state.clone()))
        .merge(sse::router())
        .merge(docs::router());

    api_router.with_state(state)
}
