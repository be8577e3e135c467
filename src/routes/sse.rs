use std::convert::Infallible;

use axum::{Router, extract::State, response::sse::Sse, routing::get};
use futures::Stream;
use tracing::info;

use crate::{services::sse_service, state::SharedState};

#[utoipa::path(
    get,
    path = "/sse/completions",
    tag = "sse",
    responses((status = 200, description = "Completion refresh stream", content_type = "text/event-stream", body = String))
)]
/// Stream `completion_corrected` events so open pages refresh their completion badges.
pub async fn completions_stream(
    State(state): State<SharedState>,
) -> Sse<impl Stream<Item = Result<axum::response::sse::Event, Infallible>>> {
    let subscription = sse_service::subscribe_completions(&state);
    info!("New completions SSE connection");
    sse_service::to_sse_stream(subscription)
}

/// Configure the SSE endpoints.
pub fn router() -> Router<SharedState> {
    Router::<SharedState>::new().route("/sse/completions", get(completions_stream))
}
