use std::sync::Arc;

use futures::future::BoxFuture;
use reqwest::{Client, Method, Response, StatusCode};
use serde::{Serialize, de::DeserializeOwned};
use serde_json::{Value, from_value};
use tracing::{info, warn};

use crate::dao::{
    document_store::{CompletionStore, DocumentStore, SettingsStore},
    models::{CompletionEntity, GameId, Settings},
    storage::StorageResult,
};

use super::{
    config::CouchConfig,
    error::{CouchDaoError, CouchResult},
    models::{
        CouchCompletionDocument, CouchSettingsDocument, FindRequest, FindResponse, LIST_LIMIT,
        SETTINGS_DOC_ID, all_completions, completions_of, username_index,
    },
};

/// CouchDB backend. Completion records are found through Mango `_find` on `username`.
#[derive(Clone)]
pub struct CouchDocumentStore {
    client: Client,
    config: Arc<CouchConfig>,
}

impl CouchDocumentStore {
    /// Create the database when missing and declare the username index.
    pub async fn connect(config: CouchConfig) -> CouchResult<Self> {
        let client = Client::builder().build().map_err(CouchDaoError::Client)?;
        let store = Self {
            client,
            config: Arc::new(config),
        };

        store.ensure_database().await?;
        store.ensure_index().await;
        Ok(store)
    }

    async fn call<B>(&self, method: Method, path: &str, body: Option<&B>) -> CouchResult<Response>
    where
        B: ?Sized + Serialize,
    {
        let mut request = self.client.request(method.clone(), self.config.url(path));
        if let Some(credentials) = &self.config.credentials {
            request = request.basic_auth(&credentials.username, Some(&credentials.password));
        }
        if let Some(body) = body {
            request = request.json(body);
        }

        request
            .send()
            .await
            .map_err(|source| CouchDaoError::Transport {
                method,
                path: path.to_owned(),
                source,
            })
    }

    async fn decode<T>(method: Method, path: &str, response: Response) -> CouchResult<T>
    where
        T: DeserializeOwned,
    {
        let body = response
            .bytes()
            .await
            .map_err(|source| CouchDaoError::Transport {
                method,
                path: path.to_owned(),
                source,
            })?;
        serde_json::from_slice(&body).map_err(|source| CouchDaoError::Decode {
            path: path.to_owned(),
            source,
        })
    }

    async fn ensure_database(&self) -> CouchResult<()> {
        let response = self.call(Method::GET, "", None::<&()>).await?;
        match response.status() {
            status if status.is_success() => Ok(()),
            StatusCode::NOT_FOUND => {
                info!(database = %self.config.database, "creating CouchDB database");
                let created = self.call(Method::PUT, "", None::<&()>).await?;
                // 412: created concurrently by another instance
                match created.status() {
                    status if status.is_success() => Ok(()),
                    StatusCode::PRECONDITION_FAILED => Ok(()),
                    status => Err(unexpected(Method::PUT, "", status)),
                }
            }
            status => Err(unexpected(Method::GET, "", status)),
        }
    }

    /// Lookups still work without the index, only slower, so failures are logged.
    async fn ensure_index(&self) {
        match self.call(Method::POST, "_index", Some(&username_index())).await {
            Ok(response) if response.status().is_success() => {}
            Ok(response) => {
                warn!(status = %response.status(), "CouchDB refused the username index")
            }
            Err(err) => warn!(error = %err, "failed to create CouchDB username index"),
        }
    }

    async fn get_document<T>(&self, doc_id: &str) -> CouchResult<Option<T>>
    where
        T: DeserializeOwned,
    {
        let response = self.call(Method::GET, doc_id, None::<&()>).await?;
        match response.status() {
            StatusCode::NOT_FOUND => Ok(None),
            status if status.is_success() => {
                Self::decode(Method::GET, doc_id, response).await.map(Some)
            }
            status => Err(unexpected(Method::GET, doc_id, status)),
        }
    }

    async fn put_document<T>(&self, doc_id: &str, document: &T) -> CouchResult<()>
    where
        T: ?Sized + Serialize,
    {
        let response = self.call(Method::PUT, doc_id, Some(document)).await?;
        match response.status() {
            status if status.is_success() => Ok(()),
            StatusCode::CONFLICT => Err(CouchDaoError::Conflict {
                path: doc_id.to_owned(),
            }),
            status => Err(unexpected(Method::PUT, doc_id, status)),
        }
    }

    async fn find_documents<T>(&self, selector: Value, limit: usize) -> CouchResult<Vec<T>>
    where
        T: DeserializeOwned,
    {
        const FIND: &str = "_find";

        let request = FindRequest { selector, limit };
        let response = self.call(Method::POST, FIND, Some(&request)).await?;
        if !response.status().is_success() {
            return Err(unexpected(Method::POST, FIND, response.status()));
        }

        let payload: FindResponse = Self::decode(Method::POST, FIND, response).await?;
        payload
            .docs
            .into_iter()
            .map(|doc| {
                from_value(doc).map_err(|source| CouchDaoError::Decode {
                    path: FIND.to_owned(),
                    source,
                })
            })
            .collect()
    }

    async fn find_user_document(
        &self,
        username: &str,
    ) -> CouchResult<Option<CouchCompletionDocument>> {
        let mut docs = self
            .find_documents::<CouchCompletionDocument>(completions_of(username), 1)
            .await?;
        Ok(docs.pop())
    }

    /// Apply `change` to the user's record. Missing records are only created when `create`.
    async fn modify_user_document<F>(
        &self,
        username: String,
        create: bool,
        change: F,
    ) -> CouchResult<()>
    where
        F: FnOnce(&mut CouchCompletionDocument),
    {
        let mut doc = match self.find_user_document(&username).await? {
            Some(doc) => doc,
            None if create => CouchCompletionDocument::new(username),
            None => return Ok(()),
        };
        change(&mut doc);
        doc.touch();
        let doc_id = doc.id.clone();
        self.put_document(&doc_id, &doc).await
    }
}

impl CompletionStore for CouchDocumentStore {
    fn list_completions(&self) -> BoxFuture<'static, StorageResult<Vec<CompletionEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            let docs = store
                .find_documents::<CouchCompletionDocument>(all_completions(), LIST_LIMIT)
                .await?;
            Ok(docs.into_iter().map(Into::into).collect())
        })
    }

    fn find_completions(
        &self,
        username: String,
    ) -> BoxFuture<'static, StorageResult<Option<CompletionEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            let doc = store.find_user_document(&username).await?;
            Ok(doc.map(Into::into))
        })
    }

    fn mark_completed(
        &self,
        username: String,
        game_id: GameId,
    ) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move {
            store
                .modify_user_document(username, true, |doc| {
                    doc.completions.insert(game_id, true);
                })
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
            store
                .modify_user_document(username, false, |doc| {
                    doc.completions.remove(&game_id);
                })
                .await
                .map_err(Into::into)
        })
    }

    fn reset_all(&self, username: String) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move {
            store
                .modify_user_document(username, false, |doc| doc.completions.clear())
                .await
                .map_err(Into::into)
        })
    }
}

impl SettingsStore for CouchDocumentStore {
    fn load_settings(&self) -> BoxFuture<'static, StorageResult<Option<Settings>>> {
        let store = self.clone();
        Box::pin(async move {
            let doc = store
                .get_document::<CouchSettingsDocument>(SETTINGS_DOC_ID)
                .await?;
            Ok(doc.map(|doc| doc.settings))
        })
    }

    fn save_settings(&self, settings: Settings) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move {
            let rev = store
                .get_document::<CouchSettingsDocument>(SETTINGS_DOC_ID)
                .await?
                .and_then(|existing| existing.rev);
            let doc = CouchSettingsDocument::new(settings, rev);
            store
                .put_document(SETTINGS_DOC_ID, &doc)
                .await
                .map_err(Into::into)
        })
    }
}

impl DocumentStore for CouchDocumentStore {
    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move {
            let response = store.call(Method::HEAD, "", None::<&()>).await?;
            if response.status().is_success() {
                Ok(())
            } else {
                Err(unexpected(Method::HEAD, "", response.status()).into())
            }
        })
    }

    fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.ensure_database().await.map_err(Into::into) })
    }
}

fn unexpected(method: Method, path: &str, status: StatusCode) -> CouchDaoError {
    CouchDaoError::Status {
        method,
        path: path.to_owned(),
        status,
    }
}
