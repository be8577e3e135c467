use std::collections::BTreeSet;

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    routing::{get, post},
};
use axum_valid::Valid;

use crate::{
    dao::models::GameId,
    dto::{
        completion::{
            AllCompletedQuery, AllCompletedResponse, CompletionStatusResponse, GameResultRequest,
            GameResultResponse, MarkCompletedResponse, SyncResponse, UserCompletionsResponse,
        },
        validation::validate_username,
    },
    error::{AppError, ServiceError},
    policy::GameResult,
    state::SharedState,
};

/// Player-facing completion endpoints.
pub fn router() -> Router<SharedState> {
    Router::<SharedState>::new()
        .route("/completions/{username}", get(user_completions))
        .route("/completions/{username}/all", get(all_completed))
        .route("/completions/{username}/results", post(record_result))
        .route("/completions/{username}/sync", post(sync_user))
        .route(
            "/completions/{username}/{game_id}",
            get(completion_status).post(mark_completed),
        )
}

fn ensure_username(username: &str) -> Result<(), AppError> {
    validate_username(username).map_err(|err| {
        AppError::BadRequest(
            err.message
                .map(|message| message.into_owned())
                .unwrap_or_else(|| "invalid username".into()),
        )
    })
}

fn ensure_in_catalog(state: &SharedState, game_id: GameId) -> Result<(), ServiceError> {
    if state.catalog().contains(game_id) {
        Ok(())
    } else {
        Err(ServiceError::NotFound(format!("game {game_id} is not in the catalog")))
    }
}

/// Locally known completions; the remote store is checked in the background.
#[utoipa::path(
    get,
    path = "/completions/{username}",
    tag = "completions",
    params(("username" = String, Path, description = "Owner of the completions")),
    responses((status = 200, description = "Completed games", body = UserCompletionsResponse))
)]
pub async fn user_completions(
    State(state): State<SharedState>,
    Path(username): Path<String>,
) -> Result<Json<UserCompletionsResponse>, AppError> {
    ensure_username(&username)?;
    let tracker = state.tracker();
    let completions = tracker.completed_games(&username);

    let ids: BTreeSet<GameId> = completions
        .keys()
        .copied()
        .chain(state.catalog().iter().map(|game| game.id))
        .collect();
    tracker.reconcile_in_background(&username, ids.into_iter().collect());

    Ok(Json(UserCompletionsResponse {
        username,
        completions,
    }))
}

/// Local flag of one game; the remote store is checked in the background.
#[utoipa::path(
    get,
    path = "/completions/{username}/{game_id}",
    tag = "completions",
    params(
        ("username" = String, Path, description = "Owner of the completions"),
        ("game_id" = u32, Path, description = "Game identifier")
    ),
    responses((status = 200, description = "Local completion flag", body = CompletionStatusResponse))
)]
pub async fn completion_status(
    State(state): State<SharedState>,
    Path((username, game_id)): Path<(String, GameId)>,
) -> Result<Json<CompletionStatusResponse>, AppError> {
    ensure_username(&username)?;
    let completed = state.tracker().is_completed(&username, game_id);
    Ok(Json(CompletionStatusResponse {
        username,
        game_id,
        completed,
    }))
}

/// Whether every listed game (default: every playable game) is completed.
#[utoipa::path(
    get,
    path = "/completions/{username}/all",
    tag = "completions",
    params(
        ("username" = String, Path, description = "Owner of the completions"),
        AllCompletedQuery
    ),
    responses(
        (status = 200, description = "Aggregate completion flag", body = AllCompletedResponse),
        (status = 400, description = "Malformed id list")
    )
)]
pub async fn all_completed(
    State(state): State<SharedState>,
    Path(username): Path<String>,
    Query(query): Query<AllCompletedQuery>,
) -> Result<Json<AllCompletedResponse>, AppError> {
    ensure_username(&username)?;
    let ids = query
        .parse_ids()
        .map_err(|err| AppError::BadRequest(err.to_string()))?
        .unwrap_or_else(|| state.catalog().playable_ids());
    let all_completed = state.tracker().are_all_completed(&username, &ids);

    Ok(Json(AllCompletedResponse {
        username,
        ids,
        all_completed,
    }))
}

/// Report a finished game; it is marked completed when the score reaches the threshold.
#[utoipa::path(
    post,
    path = "/completions/{username}/results",
    tag = "completions",
    params(("username" = String, Path, description = "Player")),
    request_body = GameResultRequest,
    responses(
        (status = 200, description = "Policy decision", body = GameResultResponse),
        (status = 400, description = "Score exceeds the number of questions"),
        (status = 404, description = "Unknown game")
    )
)]
pub async fn record_result(
    State(state): State<SharedState>,
    Path(username): Path<String>,
    Valid(Json(request)): Valid<Json<GameResultRequest>>,
) -> Result<Json<GameResultResponse>, AppError> {
    ensure_username(&username)?;
    ensure_in_catalog(&state, request.game_id)?;
    let result =
        GameResult::new(request.score, request.total_questions).map_err(ServiceError::from)?;
    let settings = state.settings().get_settings().await;

    let outcome = state
        .tracker()
        .record_game_result(&username, request.game_id, result, &settings);
    let persisted = match outcome.pending {
        Some(pending) => Some(pending.settled().await),
        None => None,
    };

    Ok(Json(GameResultResponse {
        game_id: request.game_id,
        qualified: outcome.qualified,
        percentage: outcome.result.percentage(),
        tier: outcome.tier,
        threshold: settings.completion_threshold,
        persisted,
    }))
}

/// Mark a game completed locally and remotely.
#[utoipa::path(
    post,
    path = "/completions/{username}/{game_id}",
    tag = "completions",
    params(
        ("username" = String, Path, description = "Player"),
        ("game_id" = u32, Path, description = "Game identifier")
    ),
    responses(
        (status = 200, description = "Completion recorded", body = MarkCompletedResponse),
        (status = 404, description = "Unknown game")
    )
)]
pub async fn mark_completed(
    State(state): State<SharedState>,
    Path((username, game_id)): Path<(String, GameId)>,
) -> Result<Json<MarkCompletedResponse>, AppError> {
    ensure_username(&username)?;
    ensure_in_catalog(&state, game_id)?;
    let outcome = state.tracker().mark_completed(&username, game_id).outcome().await;

    Ok(Json(MarkCompletedResponse {
        username,
        game_id,
        persisted: outcome.is_ok(),
        message: outcome.err().map(|err| err.to_string()),
    }))
}

/// Overwrite the local completions of `username` with the remote ones.
#[utoipa::path(
    post,
    path = "/completions/{username}/sync",
    tag = "completions",
    params(("username" = String, Path, description = "Player")),
    responses(
        (status = 200, description = "Applied corrections", body = SyncResponse),
        (status = 503, description = "Remote store unavailable")
    )
)]
pub async fn sync_user(
    State(state): State<SharedState>,
    Path(username): Path<String>,
) -> Result<Json<SyncResponse>, AppError> {
    let corrections = state.tracker().sync_user(&username).await?;
    Ok(Json(SyncResponse {
        username,
        corrections,
    }))
}
