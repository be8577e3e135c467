//! Catalog listing body.

use serde::Serialize;
use utoipa::ToSchema;

use crate::{
    catalog::{GameCatalog, GameEntry},
    dao::models::GameId,
};

/// Games offered on the site, in display order.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CatalogResponse {
    /// Every listed game.
    pub games: Vec<GameEntry>,
    /// Games counted by "all completed" checks.
    #[schema(value_type = Vec<u32>)]
    pub playable_ids: Vec<GameId>,
}

impl From<&GameCatalog> for CatalogResponse {
    fn from(catalog: &GameCatalog) -> Self {
        Self {
            games: catalog.iter().cloned().collect(),
            playable_ids: catalog.playable_ids(),
        }
    }
}
