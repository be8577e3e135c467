use std::{collections::BTreeMap, fmt, num::ParseIntError, str::FromStr, time::SystemTime};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;
use validator::Validate;

/// Completion flags of a single user keyed by game identifier.
///
/// Only `true` entries are meaningful: a game that is not completed has no key.
pub type CompletionMap = BTreeMap<GameId, bool>;

/// Positive identifier of a game in the catalog.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, ToSchema,
)]
#[serde(try_from = "u32", into = "u32")]
#[schema(value_type = u32)]
pub struct GameId(u32);

/// Failure raised when a game identifier is zero or not a number.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum InvalidGameId {
    /// Zero is reserved.
    #[error("game id must be a positive integer")]
    Zero,
    /// The text was not an unsigned integer.
    #[error("game id is not a number: {0}")]
    NotANumber(#[from] ParseIntError),
}

impl GameId {
    /// Wrap a raw identifier, rejecting zero.
    pub const fn new(raw: u32) -> Option<Self> {
        if raw == 0 { None } else { Some(Self(raw)) }
    }

    /// Raw numeric value.
    pub const fn get(self) -> u32 {
        self.0
    }
}

impl TryFrom<u32> for GameId {
    type Error = InvalidGameId;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        Self::new(value).ok_or(InvalidGameId::Zero)
    }
}

impl From<GameId> for u32 {
    fn from(value: GameId) -> Self {
        value.0
    }
}

impl fmt::Display for GameId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl FromStr for GameId {
    type Err = InvalidGameId;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let raw = s.trim().parse::<u32>()?;
        Self::try_from(raw)
    }
}

/// Completion record of one user as stored by the remote backends.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletionEntity {
    /// Owner of the record; lookups filter on this field.
    pub username: String,
    /// Completed games. Never contains `false` values.
    pub completions: CompletionMap,
    /// Last modification, assigned by the backend when it supports it.
    pub updated_at: Option<SystemTime>,
}

impl CompletionEntity {
    /// Build an entity, discarding legacy `false` entries so they read as absent.
    pub fn new(
        username: String,
        completions: impl IntoIterator<Item = (GameId, bool)>,
        updated_at: Option<SystemTime>,
    ) -> Self {
        Self {
            username,
            completions: completions.into_iter().filter(|(_, done)| *done).collect(),
            updated_at,
        }
    }
}

/// Global game settings singleton.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    /// Number of questions drawn for a trivia round.
    #[validate(range(min = 1, max = 500))]
    pub questions_to_use: u32,
    /// Seconds allowed per question.
    #[validate(range(min = 1, max = 3600))]
    pub time_limit: u32,
    /// Minimum score percentage that marks a game as completed.
    #[validate(range(max = 100))]
    pub completion_threshold: u8,
    /// Whether celebratory effects are enabled.
    pub enable_confetti: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            questions_to_use: 20,
            time_limit: 15,
            completion_threshold: 90,
            enable_confetti: true,
        }
    }
}
