use std::sync::Arc;

use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Method, Request, StatusCode},
    response::Response,
};
use party_trivia_back::{
    cache::LocalCache,
    config::AppConfig,
    dao::{
        document_store::{CompletionStore, DocumentStore, memory::InMemoryDocumentStore},
        models::GameId,
    },
    routes,
    state::{AppState, StoreSlot},
};
use serde_json::{Value, json};
use tower::ServiceExt;

struct App {
    router: Router,
    remote: InMemoryDocumentStore,
}

fn app() -> App {
    let remote = InMemoryDocumentStore::new();
    let slot = StoreSlot::with_store(Arc::new(remote.clone()) as Arc<dyn DocumentStore>);
    let state = AppState::with_store(AppConfig::default(), LocalCache::in_memory(), slot);
    assert!(state.session().sign_in("host", "secret"));
    App {
        router: routes::router(state),
        remote,
    }
}

fn game(raw: u32) -> GameId {
    GameId::new(raw).unwrap()
}

fn request(method: Method, uri: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

fn json_request(method: Method, uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn send(app: &App, request: Request<Body>) -> Response {
    app.router.clone().oneshot(request).await.unwrap()
}

async fn body_json(response: Response) -> Value {
    let bytes = to_bytes(response.into_body(), 1024 * 1024).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn admin_routes_require_the_session_token() {
    let app = app();

    let missing = send(&app, request(Method::GET, "/admin/completions")).await;
    assert_eq!(missing.status(), StatusCode::UNAUTHORIZED);

    let wrong = Request::builder()
        .uri("/admin/completions")
        .header("x-session-token", "guess")
        .body(Body::empty())
        .unwrap();
    assert_eq!(send(&app, wrong).await.status(), StatusCode::UNAUTHORIZED);

    let valid = Request::builder()
        .uri("/admin/completions")
        .header("X-Session-Token", "secret")
        .body(Body::empty())
        .unwrap();
    let response = send(&app, valid).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(body_json(response).await["users"].is_object());
}

#[tokio::test]
async fn admin_reset_removes_the_remote_flag() {
    let app = app();
    app.remote
        .mark_completed("alice".into(), game(4))
        .await
        .unwrap();

    let reset = Request::builder()
        .method(Method::DELETE)
        .uri("/admin/completions/alice/4")
        .header("x-session-token", "secret")
        .body(Body::empty())
        .unwrap();
    let response = send(&app, reset).await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["success"], json!(true));
    let record = app
        .remote
        .find_completions("alice".into())
        .await
        .unwrap()
        .unwrap();
    assert!(record.completions.is_empty());
}

#[tokio::test]
async fn named_subroutes_win_over_the_game_id_segment() {
    let app = app();

    let all = send(&app, request(Method::GET, "/completions/alice/all?ids=4,10")).await;
    assert_eq!(all.status(), StatusCode::OK);
    let body = body_json(all).await;
    assert_eq!(body["allCompleted"], json!(false));
    assert_eq!(body["ids"], json!([4, 10]));

    let sync = send(&app, request(Method::POST, "/completions/alice/sync")).await;
    assert_eq!(sync.status(), StatusCode::OK);
    assert_eq!(body_json(sync).await["corrections"], json!([]));

    let results = send(
        &app,
        json_request(
            Method::POST,
            "/completions/alice/results",
            json!({ "gameId": 4, "score": 18, "totalQuestions": 20 }),
        ),
    )
    .await;
    assert_eq!(results.status(), StatusCode::OK);
    let body = body_json(results).await;
    assert_eq!(body["qualified"], json!(true));
    assert_eq!(body["persisted"], json!(true));
}

#[tokio::test]
async fn game_id_segment_reads_the_local_flag() {
    let app = app();

    let marked = send(&app, request(Method::POST, "/completions/alice/4")).await;
    assert_eq!(marked.status(), StatusCode::OK);
    assert_eq!(body_json(marked).await["persisted"], json!(true));

    let status = send(&app, request(Method::GET, "/completions/alice/4")).await;
    assert_eq!(status.status(), StatusCode::OK);
    assert_eq!(body_json(status).await["completed"], json!(true));
}

#[tokio::test]
async fn marking_a_game_outside_the_catalog_is_not_found() {
    let app = app();

    let response = send(&app, request(Method::POST, "/completions/alice/99")).await;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert!(
        app.remote
            .find_completions("alice".into())
            .await
            .unwrap()
            .is_none()
    );
}

#[tokio::test]
async fn score_above_total_is_a_bad_request() {
    let app = app();

    let response = send(
        &app,
        json_request(
            Method::POST,
            "/completions/alice/results",
            json!({ "gameId": 4, "score": 21, "totalQuestions": 20 }),
        ),
    )
    .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(
        app.remote
            .find_completions("alice".into())
            .await
            .unwrap()
            .is_none()
    );
}
