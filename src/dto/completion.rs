//! Bodies of the completion and admin endpoints.

use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use crate::{
    dao::models::{CompletionMap, GameId, InvalidGameId},
    policy::ScoreTier,
    services::completion_service::AllCompletions,
    state::CompletionCorrected,
};

/// Locally known completions of one user.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UserCompletionsResponse {
    /// Owner of the completions.
    pub username: String,
    /// Completed games keyed by id; absent games are not completed.
    #[schema(value_type = Object)]
    pub completions: CompletionMap,
}

/// Completion flag of one game.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CompletionStatusResponse {
    /// Owner of the completions.
    pub username: String,
    /// Game identifier.
    pub game_id: GameId,
    /// Local flag at the time of the request.
    pub completed: bool,
}

/// Query of the "all completed" check.
#[derive(Debug, Deserialize, IntoParams)]
pub struct AllCompletedQuery {
    /// Comma separated game ids. Defaults to every playable game of the catalog.
    pub ids: Option<String>,
}

impl AllCompletedQuery {
    /// Parsed ids, `None` when the parameter was omitted.
    pub fn parse_ids(&self) -> Result<Option<Vec<GameId>>, InvalidGameId> {
        let Some(raw) = self.ids.as_deref() else {
            return Ok(None);
        };
        raw.split(',')
            .map(str::trim)
            .filter(|part| !part.is_empty())
            .map(str::parse)
            .collect::<Result<Vec<_>, _>>()
            .map(Some)
    }
}

/// Aggregate answer of the "all completed" check.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AllCompletedResponse {
    /// Owner of the completions.
    pub username: String,
    /// Games that were checked.
    #[schema(value_type = Vec<u32>)]
    pub ids: Vec<GameId>,
    /// `true` when every checked game is completed, or none was asked.
    pub all_completed: bool,
}

/// Score reported by a game at the end of a session.
#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct GameResultRequest {
    /// Game identifier.
    pub game_id: GameId,
    /// Correct answers.
    pub score: u32,
    /// Questions asked, at least one.
    #[validate(range(min = 1))]
    pub total_questions: u32,
}

/// Policy decision for a reported game result.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct GameResultResponse {
    /// Game identifier.
    pub game_id: GameId,
    /// Whether the score reached the threshold.
    pub qualified: bool,
    /// Score in percent.
    pub percentage: f64,
    /// Grade of the score.
    pub tier: ScoreTier,
    /// Threshold in effect when the result was judged.
    pub threshold: u8,
    /// Whether the completion reached the remote store. Absent when not qualified.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub persisted: Option<bool>,
}

/// Outcome of marking a game completed.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct MarkCompletedResponse {
    /// Owner of the completions.
    pub username: String,
    /// Game identifier.
    pub game_id: GameId,
    /// The flag is always set locally; this tells whether the remote write succeeded.
    pub persisted: bool,
    /// Why the remote write failed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Local flags flipped to match the remote store.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SyncResponse {
    /// Owner of the completions.
    pub username: String,
    /// Corrections applied, in no particular order.
    pub corrections: Vec<CompletionCorrected>,
}

/// Every completion record, keyed by username.
#[derive(Debug, Serialize, ToSchema)]
pub struct AllCompletionsResponse {
    /// Completion maps keyed by username.
    #[schema(value_type = Object)]
    pub users: AllCompletions,
}

/// Generic admin action result.
#[derive(Debug, Serialize, ToSchema)]
pub struct ActionResponse {
    /// Always `true`; failures use the error body.
    pub success: bool,
    /// Human readable summary.
    pub message: String,
}

impl ActionResponse {
    /// Successful action described by `message`.
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
        }
    }
}
