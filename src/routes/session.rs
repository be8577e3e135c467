use axum::{
    Json, Router,
    extract::State,
    routing::post,
};
use axum_valid::Valid;

use crate::{
    dto::session::{SessionResponse, SignInRequest},
    error::AppError,
    services::auth::SessionProvider,
    state::SharedState,
};

/// Session subtree.
pub fn router() -> Router<SharedState> {
    Router::<SharedState>::new().route(
        "/session",
        post(sign_in).get(current_session).delete(sign_out),
    )
}

/// Store the session of the user signed in on this device.
#[utoipa::path(
    post,
    path = "/session",
    tag = "session",
    request_body = SignInRequest,
    responses(
        (status = 200, description = "Session opened", body = SessionResponse),
        (status = 400, description = "Invalid username or token")
    )
)]
pub async fn sign_in(
    State(state): State<SharedState>,
    Valid(Json(request)): Valid<Json<SignInRequest>>,
) -> Result<Json<SessionResponse>, AppError> {
    if !state.session().sign_in(&request.username, &request.token) {
        return Err(AppError::Internal("failed to persist session".into()));
    }
    Ok(Json(SessionResponse::signed_in(request.username)))
}

/// Who is signed in on this device.
#[utoipa::path(
    get,
    path = "/session",
    tag = "session",
    responses((status = 200, description = "Current session", body = SessionResponse))
)]
pub async fn current_session(State(state): State<SharedState>) -> Json<SessionResponse> {
    Json(match state.session().current_username() {
        Some(username) => SessionResponse::signed_in(username),
        None => SessionResponse::signed_out(),
    })
}

/// Close the session of this device.
#[utoipa::path(
    delete,
    path = "/session",
    tag = "session",
    responses((status = 200, description = "Session closed", body = SessionResponse))
)]
pub async fn sign_out(State(state): State<SharedState>) -> Json<SessionResponse> {
    state.session().sign_out();
    Json(SessionResponse::signed_out())
}
