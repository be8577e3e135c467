use std::{collections::BTreeMap, time::SystemTime};

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use serde_with::{DisplayFromStr, serde_as};
use uuid::Uuid;

use crate::dao::models::{CompletionEntity, GameId, Settings};

pub const COMPLETION_TYPE: &str = "completion";
pub const COMPLETION_PREFIX: &str = "completion::";
pub const SETTINGS_DOC_ID: &str = "settings::global";
/// Upper bound for `_find` queries that list every record.
pub const LIST_LIMIT: usize = 10_000;

#[derive(Debug, Serialize)]
pub struct FindRequest {
    pub selector: Value,
    pub limit: usize,
}

#[derive(Debug, Deserialize)]
pub struct FindResponse {
    pub docs: Vec<Value>,
}

/// Mango selector matching every completion record.
pub fn all_completions() -> Value {
    json!({ "type": COMPLETION_TYPE })
}

/// Mango selector matching the completion record of `username`.
pub fn completions_of(username: &str) -> Value {
    json!({ "type": COMPLETION_TYPE, "username": username })
}

/// Mango index backing the username lookups.
pub fn username_index() -> Value {
    json!({
        "index": { "fields": ["type", "username"] },
        "name": "completion-username",
        "type": "json",
    })
}

#[serde_as]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CouchCompletionDocument {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(rename = "_rev", skip_serializing_if = "Option::is_none")]
    pub rev: Option<String>,
    #[serde(rename = "type")]
    pub kind: String,
    pub username: String,
    #[serde_as(as = "BTreeMap<DisplayFromStr, _>")]
    #[serde(default)]
    pub completions: BTreeMap<GameId, bool>,
    pub updated_at: SystemTime,
}

impl CouchCompletionDocument {
    /// Fresh record with a random document id; lookups never rely on the id.
    pub fn new(username: String) -> Self {
        Self {
            id: format!("{COMPLETION_PREFIX}{}", Uuid::new_v4().simple()),
            rev: None,
            kind: COMPLETION_TYPE.to_owned(),
            username,
            completions: BTreeMap::new(),
            updated_at: SystemTime::now(),
        }
    }

    pub fn touch(&mut self) {
        self.updated_at = SystemTime::now();
    }
}

impl From<CouchCompletionDocument> for CompletionEntity {
    fn from(value: CouchCompletionDocument) -> Self {
        CompletionEntity::new(value.username, value.completions, Some(value.updated_at))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CouchSettingsDocument {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(rename = "_rev", skip_serializing_if = "Option::is_none")]
    pub rev: Option<String>,
    #[serde(flatten)]
    pub settings: Settings,
}

impl CouchSettingsDocument {
    pub fn new(settings: Settings, rev: Option<String>) -> Self {
        Self {
            id: SETTINGS_DOC_ID.to_owned(),
            rev,
            settings,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn completion_document_round_trips_couch_shape() {
        let raw = json!({
            "_id": "completion::abc",
            "_rev": "1-xyz",
            "type": "completion",
            "username": "alice",
            "completions": { "4": true, "10": false },
            "updated_at": { "secs_since_epoch": 1, "nanos_since_epoch": 0 },
        });

        let doc: CouchCompletionDocument = serde_json::from_value(raw).unwrap();
        assert_eq!(doc.rev.as_deref(), Some("1-xyz"));

        let entity: CompletionEntity = doc.into();
        assert_eq!(entity.username, "alice");
        assert_eq!(entity.completions.len(), 1);
        assert!(entity.completions.contains_key(&GameId::new(4).unwrap()));
    }

    #[test]
    fn settings_document_is_flat() {
        let doc = CouchSettingsDocument::new(Settings::default(), None);
        let value = serde_json::to_value(&doc).unwrap();
        assert_eq!(value["_id"], SETTINGS_DOC_ID);
        assert_eq!(value["completionThreshold"], 90);
        assert!(value.get("_rev").is_none());
    }
}
