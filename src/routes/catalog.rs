use axum::{Json, Router, extract::State, routing::get};

use crate::{dto::catalog::CatalogResponse, state::SharedState};

#[utoipa::path(
    get,
    path = "/catalog",
    tag = "catalog",
    responses((status = 200, description = "Game catalog", body = CatalogResponse))
)]
/// List the games of the site in display order.
pub async fn get_catalog(State(state): State<SharedState>) -> Json<CatalogResponse> {
    Json(CatalogResponse::from(state.catalog()))
}

/// Catalog subtree.
pub fn router() -> Router<SharedState> {
    Router::<SharedState>::new().route("/catalog", get(get_catalog))
}
