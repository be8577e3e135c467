//! Party trivia backend entrypoint wiring the local cache, the remote store supervisor
//! and the REST/SSE layers.

use std::{env, net::SocketAddr, sync::Arc};

use anyhow::Context;
use axum::Router;
use futures::future::BoxFuture;
use tokio::net::TcpListener;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use party_trivia_back::{
    cache::{FileCacheBackend, LocalCache},
    config::AppConfig,
    dao::{
        document_store::{DocumentStore, memory::InMemoryDocumentStore},
        storage::{StorageError, StorageResult},
    },
    routes,
    services::storage_supervisor,
    state::{AppState, SharedState},
};

type Connector =
    Box<dyn FnMut() -> BoxFuture<'static, StorageResult<Arc<dyn DocumentStore>>> + Send>;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let config = AppConfig::load();
    let cache = open_cache(&config);
    let app_state = AppState::new(config, cache);

    tokio::spawn(storage_supervisor::run(
        app_state.store().clone(),
        select_backend(),
    ));
    // Build the HTTP router once the shared state is ready.
    let app = build_router(app_state);

    let port = env::var("PORT")
        .or_else(|_| env::var("SERVER_PORT"))
        .ok()
        .and_then(|value| value.parse::<u16>().ok())
        .unwrap_or(8080);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    info!(%addr, "starting server");

    let listener = TcpListener::bind(addr).await.context("binding server")?;
    let service = app.into_make_service();
    axum::serve(listener, service)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("serving axum")?;

    Ok(())
}

/// Durable cache in the configured directory, or a process-local one when it cannot be opened.
fn open_cache(config: &AppConfig) -> LocalCache {
    match FileCacheBackend::open(config.cache_dir()) {
        Ok(backend) => {
            info!(dir = %config.cache_dir().display(), "using file cache");
            LocalCache::new(Arc::new(backend))
        }
        Err(err) => {
            warn!(
                dir = %config.cache_dir().display(),
                error = %err,
                "failed to open cache directory; falling back to in-memory cache"
            );
            LocalCache::in_memory()
        }
    }
}

/// Pick the remote backend from the environment: MongoDB, then CouchDB, else in-memory.
fn select_backend() -> Connector {
    if let Some(connector) = mongo_backend().or_else(couch_backend) {
        return connector;
    }

    warn!("no remote store configured; completions and settings live in memory only");
    let store = InMemoryDocumentStore::new();
    Box::new(move || {
        let store = store.clone();
        Box::pin(async move { Ok(Arc::new(store) as Arc<dyn DocumentStore>) })
    })
}

#[cfg(feature = "mongo-store")]
fn mongo_backend() -> Option<Connector> {
    use party_trivia_back::dao::document_store::mongodb::{MongoConfig, MongoDocumentStore};

    env::var_os("MONGO_URI")?;
    info!("using MongoDB document store");
    Some(Box::new(|| {
        Box::pin(async {
            let config = MongoConfig::from_env().await?;
            let store = MongoDocumentStore::connect(config).await?;
            Ok::<_, StorageError>(Arc::new(store) as Arc<dyn DocumentStore>)
        })
    }))
}

#[cfg(not(feature = "mongo-store"))]
fn mongo_backend() -> Option<Connector> {
    None
}

#[cfg(feature = "couch-store")]
fn couch_backend() -> Option<Connector> {
    use party_trivia_back::dao::document_store::couchdb::{CouchConfig, CouchDocumentStore};

    env::var_os("COUCH_BASE_URL")?;
    info!("using CouchDB document store");
    Some(Box::new(|| {
        Box::pin(async {
            let config = CouchConfig::from_env()?;
            let store = CouchDocumentStore::connect(config).await?;
            Ok::<_, StorageError>(Arc::new(store) as Arc<dyn DocumentStore>)
        })
    }))
}

#[cfg(not(feature = "couch-store"))]
fn couch_backend() -> Option<Connector> {
    None
}

/// Build the top-level router and attach cross-cutting middleware layers.
fn build_router(state: SharedState) -> Router<()> {
    routes::router(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

/// Configure tracing subscribers so logs include spans by default.
fn init_tracing() {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info,tower_http=debug".into());
    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Wait for Ctrl+C or SIGTERM and shut the server down gracefully.
async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};

        match signal(SignalKind::terminate()) {
            Ok(mut term) => {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => {},
                    _ = term.recv() => {},
                }
            }
            Err(err) => {
                warn!(error = %err, "failed to install SIGTERM handler; waiting for Ctrl+C");
                let _ = tokio::signal::ctrl_c().await;
            }
        }
    }

    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}
