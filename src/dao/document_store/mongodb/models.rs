use std::collections::BTreeMap;

use mongodb::bson::{DateTime, Document, oid::ObjectId};
use serde::{Deserialize, Serialize};
use serde_with::{DisplayFromStr, serde_as};

use crate::dao::models::{CompletionEntity, GameId, Settings};

pub const SETTINGS_DOCUMENT_ID: &str = "global";

/// One document per user in the `gameCompletions` collection.
///
/// BSON documents only allow string keys, so game ids are stored as their decimal text.
#[serde_as]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MongoCompletionDocument {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub username: String,
    #[serde_as(as = "BTreeMap<DisplayFromStr, _>")]
    #[serde(default)]
    pub completions: BTreeMap<GameId, bool>,
    #[serde(rename = "updatedAt", default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime>,
}

impl From<MongoCompletionDocument> for CompletionEntity {
    fn from(value: MongoCompletionDocument) -> Self {
        CompletionEntity::new(
            value.username,
            value.completions,
            value.updated_at.map(|at| at.to_system_time()),
        )
    }
}

/// The `global` document of the `settings` collection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MongoSettingsDocument {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(flatten)]
    pub settings: Settings,
}

impl From<Settings> for MongoSettingsDocument {
    fn from(settings: Settings) -> Self {
        Self {
            id: SETTINGS_DOCUMENT_ID.to_owned(),
            settings,
        }
    }
}

/// Filter matching the completion record of `username`.
pub fn by_username(username: &str) -> Document {
    mongodb::bson::doc! { "username": username }
}

/// Dotted path addressing one entry of the completions map.
pub fn completion_path(game_id: GameId) -> String {
    format!("completions.{game_id}")
}
