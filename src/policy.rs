//! Rules deciding whether a finished game session counts as a completion.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;

use crate::dao::models::Settings;

/// Whether `score` out of `total_questions` reaches `threshold_percent`.
///
/// Computed as `score * 100 >= threshold * total` so that exact thresholds (18/20 at
/// 90%) are not lost to floating point rounding. A game without questions never
/// qualifies; [`GameResult::new`] rejects such results before they get here.
pub fn is_qualifying_score(score: u32, total_questions: u32, threshold_percent: u8) -> bool {
    if total_questions == 0 {
        return false;
    }
    u64::from(score) * 100 >= u64::from(threshold_percent) * u64::from(total_questions)
}

/// Reasons a reported game result is refused.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum PolicyError {
    /// The game reported zero questions.
    #[error("a finished game must have at least one question")]
    NoQuestions,
    /// More correct answers than questions.
    #[error("score {score} exceeds the {total} questions of the game")]
    ScoreExceedsTotal {
        /// Reported correct answers.
        score: u32,
        /// Reported question count.
        total: u32,
    },
}

/// Outcome of one finished game session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct GameResult {
    score: u32,
    total_questions: u32,
}

impl GameResult {
    /// Validate a reported result.
    pub fn new(score: u32, total_questions: u32) -> Result<Self, PolicyError> {
        if total_questions == 0 {
            return Err(PolicyError::NoQuestions);
        }
        if score > total_questions {
            return Err(PolicyError::ScoreExceedsTotal {
                score,
                total: total_questions,
            });
        }
        Ok(Self {
            score,
            total_questions,
        })
    }

    /// Correct answers.
    pub fn score(&self) -> u32 {
        self.score
    }

    /// Questions asked.
    pub fn total_questions(&self) -> u32 {
        self.total_questions
    }

    /// Score as a percentage in `[0, 100]`.
    pub fn percentage(&self) -> f64 {
        f64::from(self.score) / f64::from(self.total_questions) * 100.0
    }

    /// Whether the result reaches the configured completion threshold.
    pub fn qualifies(&self, settings: &Settings) -> bool {
        is_qualifying_score(
            self.score,
            self.total_questions,
            settings.completion_threshold,
        )
    }

    /// Grade shown next to the score.
    pub fn tier(&self) -> ScoreTier {
        ScoreTier::from_result(self)
    }
}

/// Coarse grading shown to the player next to the score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ScoreTier {
    /// Every answer right.
    Perfect,
    /// 80% and above.
    Great,
    /// 60% and above.
    Good,
    /// 40% and above.
    Fair,
    /// Below 40%.
    Poor,
}

impl ScoreTier {
    fn from_result(result: &GameResult) -> Self {
        let reaches =
            |percent: u8| is_qualifying_score(result.score, result.total_questions, percent);
        if result.score == result.total_questions {
            ScoreTier::Perfect
        } else if reaches(80) {
            ScoreTier::Great
        } else if reaches(60) {
            ScoreTier::Good
        } else if reaches(40) {
            ScoreTier::Fair
        } else {
            ScoreTier::Poor
        }
    }
}
