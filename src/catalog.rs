//! Static, ordered list of the games offered on the site.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::dao::models::GameId;

/// One game of the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct GameEntry {
    /// Stable identifier, also used by completion maps.
    pub id: GameId,
    /// Display title.
    pub title: String,
    /// Whether a playable implementation exists; only those count towards "all completed".
    #[serde(default)]
    pub has_implementation: bool,
}

/// Games keyed by id, in display order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GameCatalog {
    games: IndexMap<GameId, GameEntry>,
}

impl GameCatalog {
    /// Build a catalog; a duplicated id keeps its first position and last definition.
    pub fn new(entries: impl IntoIterator<Item = GameEntry>) -> Self {
        let mut games = IndexMap::new();
        for entry in entries {
            games.insert(entry.id, entry);
        }
        Self { games }
    }

    /// Entry of `id`, if listed.
    pub fn get(&self, id: GameId) -> Option<&GameEntry> {
        self.games.get(&id)
    }

    /// Whether `id` is listed.
    pub fn contains(&self, id: GameId) -> bool {
        self.games.contains_key(&id)
    }

    /// Entries in display order.
    pub fn iter(&self) -> impl Iterator<Item = &GameEntry> {
        self.games.values()
    }

    /// Number of listed games.
    pub fn len(&self) -> usize {
        self.games.len()
    }

    /// Whether no game is listed.
    pub fn is_empty(&self) -> bool {
        self.games.is_empty()
    }

    /// Ids of the games that can actually be played, in catalog order.
    pub fn playable_ids(&self) -> Vec<GameId> {
        self.iter()
            .filter(|game| game.has_implementation)
            .map(|game| game.id)
            .collect()
    }
}

impl Default for GameCatalog {
    fn default() -> Self {
        Self::new(default_games())
    }
}

fn entry(id: u32, title: &str, has_implementation: bool) -> Option<GameEntry> {
    GameId::new(id).map(|id| GameEntry {
        id,
        title: title.to_owned(),
        has_implementation,
    })
}

/// Built-in catalog shipped with the binary.
fn default_games() -> Vec<GameEntry> {
    [
        entry(1, "Birthday Quiz", false),
        entry(2, "Memory Match", false),
        entry(3, "Photo Puzzle", false),
        entry(4, "World of Warcraft Trivia", true),
        entry(5, "Word Scramble", false),
        entry(6, "Party Clicker", false),
        entry(7, "Birthday Racer", false),
        entry(8, "Gift Hunt", false),
        entry(9, "Balloon Pop", false),
        entry(10, "Diablo Trivia", true),
        entry(11, "Cake Builder", false),
        entry(12, "Overwatch Trivia", true),
    ]
    .into_iter()
    .flatten()
    .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(raw: u32) -> GameId {
        GameId::new(raw).unwrap()
    }

    #[test]
    fn default_catalog_lists_trivia_games_as_playable() {
        let catalog = GameCatalog::default();
        assert_eq!(catalog.len(), 12);
        assert_eq!(catalog.playable_ids(), vec![id(4), id(10), id(12)]);
        assert_eq!(catalog.get(id(10)).unwrap().title, "Diablo Trivia");
    }

    #[test]
    fn catalog_keeps_insertion_order() {
        let catalog = GameCatalog::new(vec![
            entry(9, "Last", true).unwrap(),
            entry(2, "First", true).unwrap(),
        ]);
        let ids: Vec<_> = catalog.iter().map(|game| game.id.get()).collect();
        assert_eq!(ids, vec![9, 2]);
        assert!(catalog.contains(id(2)));
        assert!(!catalog.contains(id(3)));
    }

    #[test]
    fn entries_parse_from_camel_case_json() {
        let parsed: GameEntry =
            serde_json::from_str(r#"{"id":12,"title":"Overwatch Trivia","hasImplementation":true}"#)
                .unwrap();
        assert_eq!(parsed, entry(12, "Overwatch Trivia", true).unwrap());

        let invalid = serde_json::from_str::<GameEntry>(r#"{"id":0,"title":"Nope"}"#);
        assert!(invalid.is_err());
    }
}
