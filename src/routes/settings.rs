use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    routing::get,
};
use axum_valid::Valid;
use tracing::warn;

use crate::{
    dao::models::Settings,
    dto::settings::{SettingsUpdateResponse, SettingsView},
    error::AppError,
    services::settings_service::SettingsService,
    state::SharedState,
};

/// Settings subtree.
pub fn router() -> Router<SharedState> {
    Router::<SharedState>::new()
        .route("/settings", get(get_settings).put(update_settings))
        .route("/settings/defaults", get(get_default_settings))
}

/// Settings in effect: remote document, else the local mirror, else the defaults.
#[utoipa::path(
    get,
    path = "/settings",
    tag = "settings",
    responses((status = 200, description = "Current settings", body = SettingsView))
)]
pub async fn get_settings(State(state): State<SharedState>) -> Json<SettingsView> {
    Json(state.settings().resolve().await.into())
}

/// Replace the global settings document. Requires a signed-in session.
#[utoipa::path(
    put,
    path = "/settings",
    tag = "settings",
    request_body = Settings,
    responses(
        (status = 200, description = "Settings saved", body = SettingsUpdateResponse),
        (status = 400, description = "Values out of range"),
        (status = 401, description = "No session", body = SettingsUpdateResponse),
        (status = 503, description = "Remote store unavailable", body = SettingsUpdateResponse)
    )
)]
pub async fn update_settings(
    State(state): State<SharedState>,
    Valid(Json(settings)): Valid<Json<Settings>>,
) -> (StatusCode, Json<SettingsUpdateResponse>) {
    match state.settings().update_settings(settings).await {
        Ok(saved) => (StatusCode::OK, Json(SettingsUpdateResponse::saved(saved))),
        Err(err) => {
            warn!(error = %err, "settings update failed");
            let message = err.to_string();
            let status = AppError::from(err).status();
            (status, Json(SettingsUpdateResponse::failed(message)))
        }
    }
}

/// Built-in defaults, without consulting any provider.
#[utoipa::path(
    get,
    path = "/settings/defaults",
    tag = "settings",
    responses((status = 200, description = "Built-in defaults", body = SettingsView))
)]
pub async fn get_default_settings() -> Json<SettingsView> {
    Json(SettingsView::defaults(SettingsService::get_default_settings()))
}
