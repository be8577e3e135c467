use utoipa::OpenApi;

/// Aggregated OpenAPI specification for the party trivia backend.
#[derive(OpenApi)]
#[openapi(
    paths(
        crate::routes::health::healthcheck,
        crate::routes::catalog::get_catalog,
        crate::routes::settings::get_settings,
        crate::routes::settings::update_settings,
        crate::routes::settings::get_default_settings,
        crate::routes::session::sign_in,
        crate::routes::session::current_session,
        crate::routes::session::sign_out,
        crate::routes::completions::user_completions,
        crate::routes::completions::completion_status,
        crate::routes::completions::all_completed,
        crate::routes::completions::record_result,
        crate::routes::completions::mark_completed,
        crate::routes::completions::sync_user,
        crate::routes::admin::list_completions,
        crate::routes::admin::reset_game_completion,
        crate::routes::admin::reset_all_completions,
        crate::routes::sse::completions_stream,
    ),
    components(
        schemas(
            crate::dto::health::HealthResponse,
            crate::dto::catalog::CatalogResponse,
            crate::catalog::GameEntry,
            crate::dao::models::Settings,
            crate::dto::settings::SettingsView,
            crate::dto::settings::SettingsUpdateResponse,
            crate::dto::session::SignInRequest,
            crate::dto::session::SessionResponse,
            crate::dto::completion::UserCompletionsResponse,
            crate::dto::completion::CompletionStatusResponse,
            crate::dto::completion::AllCompletedResponse,
            crate::dto::completion::GameResultRequest,
            crate::dto::completion::GameResultResponse,
            crate::dto::completion::MarkCompletedResponse,
            crate::dto::completion::SyncResponse,
            crate::dto::completion::AllCompletionsResponse,
            crate::dto::completion::ActionResponse,
            crate::dto::sse::StreamHello,
            crate::dto::sse::StoreStatus,
            crate::policy::ScoreTier,
            crate::state::CompletionCorrected,
        )
    ),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "catalog", description = "Games offered on the site"),
        (name = "settings", description = "Global game settings"),
        (name = "session", description = "Session of the user signed in on this device"),
        (name = "completions", description = "Per-user game completion tracking"),
        (name = "admin", description = "Completion administration"),
        (name = "sse", description = "Server-sent events streams"),
    )
)]
pub struct ApiDoc;
