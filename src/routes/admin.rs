use axum::{
    Json, Router,
    body::Body,
    extract::{Path, State},
    http::Request,
    middleware::{self, Next},
    response::Response,
    routing::{delete, get},
};

use crate::{
    dao::models::GameId,
    dto::completion::{ActionResponse, AllCompletionsResponse},
    error::AppError,
    services::auth::SessionProvider,
    state::SharedState,
};

const SESSION_TOKEN_HEADER: &str = "x-session-token";

/// Completion administration, restricted to the signed-in session.
pub fn router(state: SharedState) -> Router<SharedState> {
    Router::new()
        .route("/admin/completions", get(list_completions))
        .route("/admin/completions/{username}", delete(reset_all_completions))
        .route(
            "/admin/completions/{username}/{game_id}",
            delete(reset_game_completion),
        )
        .route_layer(middleware::from_fn_with_state(state, require_session_token))
}

/// Every user's completions as stored remotely.
#[utoipa::path(
    get,
    path = "/admin/completions",
    tag = "admin",
    params(("X-Session-Token" = String, Header, description = "Token of the current session")),
    responses(
        (status = 200, description = "Completions of every user", body = AllCompletionsResponse),
        (status = 503, description = "Remote store unavailable")
    )
)]
pub async fn list_completions(
    State(state): State<SharedState>,
) -> Result<Json<AllCompletionsResponse>, AppError> {
    let users = state.completions().try_get_all_completions().await?;
    Ok(Json(AllCompletionsResponse { users }))
}

/// Remove one completion of a user.
#[utoipa::path(
    delete,
    path = "/admin/completions/{username}/{game_id}",
    tag = "admin",
    params(
        ("X-Session-Token" = String, Header, description = "Token of the current session"),
        ("username" = String, Path, description = "Owner of the completion"),
        ("game_id" = u32, Path, description = "Game to reset")
    ),
    responses(
        (status = 200, description = "Completion removed", body = ActionResponse),
        (status = 503, description = "Remote store unavailable")
    )
)]
pub async fn reset_game_completion(
    State(state): State<SharedState>,
    Path((username, game_id)): Path<(String, GameId)>,
) -> Result<Json<ActionResponse>, AppError> {
    state
        .tracker()
        .reset_game_completion(&username, game_id)
        .await?;
    Ok(Json(ActionResponse::ok(format!(
        "Completion of game {game_id} reset for {username}"
    ))))
}

/// Remove every completion of a user. The record itself is kept.
#[utoipa::path(
    delete,
    path = "/admin/completions/{username}",
    tag = "admin",
    params(
        ("X-Session-Token" = String, Header, description = "Token of the current session"),
        ("username" = String, Path, description = "Owner of the completions")
    ),
    responses(
        (status = 200, description = "Completions removed", body = ActionResponse),
        (status = 503, description = "Remote store unavailable")
    )
)]
pub async fn reset_all_completions(
    State(state): State<SharedState>,
    Path(username): Path<String>,
) -> Result<Json<ActionResponse>, AppError> {
    state.tracker().reset_all_completions(&username).await?;
    Ok(Json(ActionResponse::ok(format!(
        "All completions reset for {username}"
    ))))
}

async fn require_session_token(
    State(state): State<SharedState>,
    req: Request<Body>,
    next: Next,
) -> Result<Response, AppError> {
    let provided = req
        .headers()
        .get(SESSION_TOKEN_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(|value| value.to_owned())
        .ok_or_else(|| {
            AppError::Unauthorized("missing session token header `X-Session-Token`".into())
        })?;

    match state.session().current_session_credential() {
        Some(token) if token == provided => Ok(next.run(req).await),
        Some(_) => Err(AppError::Unauthorized("invalid session token".into())),
        None => Err(AppError::Unauthorized("no active session".into())),
    }
}
