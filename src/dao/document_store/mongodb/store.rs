use std::sync::Arc;

use futures::{TryStreamExt, future::BoxFuture};
use mongodb::{
    Collection, Database, IndexModel,
    bson::{Document, doc},
    error::Error as MongoError,
    options::IndexOptions,
};
use tokio::sync::RwLock;

use super::{
    config::{MongoConfig, ping},
    error::{MongoDaoError, MongoResult},
    models::{
        MongoCompletionDocument, MongoSettingsDocument, SETTINGS_DOCUMENT_ID, by_username,
        completion_path,
    },
};
use crate::dao::{
    document_store::{CompletionStore, DocumentStore, SettingsStore},
    models::{CompletionEntity, GameId, Settings},
    storage::StorageResult,
};

const COMPLETION_COLLECTION_NAME: &str = "gameCompletions";
const SETTINGS_COLLECTION_NAME: &str = "settings";

/// MongoDB backend. The database handle is swapped in place on reconnect.
#[derive(Clone)]
pub struct MongoDocumentStore {
    inner: Arc<MongoInner>,
}

struct MongoInner {
    database: RwLock<Database>,
    config: MongoConfig,
}

impl MongoDocumentStore {
    /// Connect and make sure the username index exists.
    pub async fn connect(config: MongoConfig) -> MongoResult<Self> {
        let database = config.open().await?;
        let store = Self {
            inner: Arc::new(MongoInner {
                database: RwLock::new(database),
                config,
            }),
        };
        store.ensure_indexes().await?;
        Ok(store)
    }

    async fn database(&self) -> Database {
        self.inner.database.read().await.clone()
    }

    async fn ping(&self) -> MongoResult<()> {
        ping(&self.database().await)
            .await
            .map_err(MongoDaoError::HealthPing)
    }

    async fn reconnect(&self) -> MongoResult<()> {
        let database = self.inner.config.open().await?;
        *self.inner.database.write().await = database;
        Ok(())
    }

    /// Usernames are unique so upserts cannot create duplicate records.
    async fn ensure_indexes(&self) -> MongoResult<()> {
        let index = IndexModel::builder()
            .keys(doc! { "username": 1 })
            .options(
                IndexOptions::builder()
                    .name(Some("completion_username_idx".to_owned()))
                    .unique(Some(true))
                    .build(),
            )
            .build();

        self.completions()
            .await
            .create_index(index)
            .await
            .map_err(|source| MongoDaoError::Index {
                collection: COMPLETION_COLLECTION_NAME,
                index: "username",
                source,
            })?;
        Ok(())
    }

    async fn completions(&self) -> Collection<MongoCompletionDocument> {
        self.database()
            .await
            .collection::<MongoCompletionDocument>(COMPLETION_COLLECTION_NAME)
    }

    async fn settings(&self) -> Collection<MongoSettingsDocument> {
        self.database()
            .await
            .collection::<MongoSettingsDocument>(SETTINGS_COLLECTION_NAME)
    }

    async fn list_completions(&self) -> MongoResult<Vec<CompletionEntity>> {
        let documents: Vec<MongoCompletionDocument> = self
            .completions()
            .await
            .find(doc! {})
            .await
            .map_err(completion_error("find"))?
            .try_collect()
            .await
            .map_err(completion_error("find"))?;

        Ok(documents.into_iter().map(Into::into).collect())
    }

    async fn find_completions(&self, username: String) -> MongoResult<Option<CompletionEntity>> {
        let document = self
            .completions()
            .await
            .find_one(by_username(&username))
            .await
            .map_err(completion_error("find_one"))?;

        Ok(document.map(Into::into))
    }

    async fn mark_completed(&self, username: String, game_id: GameId) -> MongoResult<()> {
        let mut set = Document::new();
        set.insert(completion_path(game_id), true);
        let update = doc! {
            "$set": set,
            "$currentDate": { "updatedAt": true },
        };

        self.completions()
            .await
            .update_one(by_username(&username), update)
            .upsert(true)
            .await
            .map_err(completion_error("upsert"))?;

        Ok(())
    }

    /// Apply `change` to an existing record only; absent records are not created.
    async fn update_existing(&self, username: String, change: Document) -> MongoResult<()> {
        let mut update = change;
        update.insert("$currentDate", doc! { "updatedAt": true });

        self.completions()
            .await
            .update_one(by_username(&username), update)
            .await
            .map_err(completion_error("update_one"))?;

        Ok(())
    }

    async fn load_settings(&self) -> MongoResult<Option<Settings>> {
        let document = self
            .settings()
            .await
            .find_one(doc! { "_id": SETTINGS_DOCUMENT_ID })
            .await
            .map_err(settings_error("find_one"))?;

        Ok(document.map(|doc| doc.settings))
    }

    async fn save_settings(&self, settings: Settings) -> MongoResult<()> {
        let document: MongoSettingsDocument = settings.into();
        self.settings()
            .await
            .replace_one(doc! { "_id": SETTINGS_DOCUMENT_ID }, &document)
            .upsert(true)
            .await
            .map_err(settings_error("replace_one"))?;

        Ok(())
    }
}

impl CompletionStore for MongoDocumentStore {
    fn list_completions(&self) -> BoxFuture<'static, StorageResult<Vec<CompletionEntity>>> {
        let store = self.clone();
        Box::pin(async move { store.list_completions().await.map_err(Into::into) })
    }

    fn find_completions(
        &self,
        username: String,
    ) -> BoxFuture<'static, StorageResult<Option<CompletionEntity>>> {
        let store = self.clone();
        Box::pin(async move { store.find_completions(username).await.map_err(Into::into) })
    }

    fn mark_completed(
        &self,
        username: String,
        game_id: GameId,
    ) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move {
            store
                .mark_completed(username, game_id)
                .await
                .map_err(Into::into)
        })
    }

    fn reset_completion(
        &self,
        username: String,
        game_id: GameId,
    ) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move {
            let mut unset = Document::new();
            unset.insert(completion_path(game_id), "");
            store
                .update_existing(username, doc! { "$unset": unset })
                .await
                .map_err(Into::into)
        })
    }

    fn reset_all(&self, username: String) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move {
            store
                .update_existing(username, doc! { "$set": { "completions": {} } })
                .await
                .map_err(Into::into)
        })
    }
}

impl SettingsStore for MongoDocumentStore {
    fn load_settings(&self) -> BoxFuture<'static, StorageResult<Option<Settings>>> {
        let store = self.clone();
        Box::pin(async move { store.load_settings().await.map_err(Into::into) })
    }

    fn save_settings(&self, settings: Settings) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.save_settings(settings).await.map_err(Into::into) })
    }
}

impl DocumentStore for MongoDocumentStore {
    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.ping().await.map_err(Into::into) })
    }

    fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.reconnect().await.map_err(Into::into) })
    }
}

fn completion_error(operation: &'static str) -> impl FnOnce(MongoError) -> MongoDaoError {
    move |source| MongoDaoError::Command {
        collection: COMPLETION_COLLECTION_NAME,
        operation,
        source,
    }
}

fn settings_error(operation: &'static str) -> impl FnOnce(MongoError) -> MongoDaoError {
    move |source| MongoDaoError::Command {
        collection: SETTINGS_COLLECTION_NAME,
        operation,
        source,
    }
}
