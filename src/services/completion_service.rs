//! Facade over the remote [`CompletionStore`](crate::dao::document_store::CompletionStore).
//!
//! Reads degrade to empty maps and writes to `false`; the `try_*` variants keep the
//! error for callers that must tell a failure apart from "nothing completed".

use std::{collections::BTreeMap, sync::Arc, time::Duration};

use tracing::{debug, warn};

use crate::{
    dao::models::{CompletionMap, GameId},
    dto::validation::validate_username,
    error::ServiceError,
    services::auth::{SessionProvider, require_credential},
    state::StoreSlot,
};

/// Completion maps of every user, keyed by username.
pub type AllCompletions = BTreeMap<String, CompletionMap>;

/// Per-user completion records in the remote store, guarded by the session credential
/// for writes.
#[derive(Clone)]
pub struct CompletionService {
    store: StoreSlot,
    session: Arc<dyn SessionProvider>,
    credential_wait: Duration,
}

impl CompletionService {
    /// Facade over `store`; writes wait up to `credential_wait` for a session.
    pub fn new(
        store: StoreSlot,
        session: Arc<dyn SessionProvider>,
        credential_wait: Duration,
    ) -> Self {
        Self {
            store,
            session,
            credential_wait,
        }
    }

    /// Every record, or the store error.
    pub async fn try_get_all_completions(&self) -> Result<AllCompletions, ServiceError> {
        let store = self.store.require().await?;
        let records = store.list_completions().await?;
        Ok(records
            .into_iter()
            .map(|record| (record.username, record.completions))
            .collect())
    }

    /// Admin overview of every record; empty when the store cannot be read.
    pub async fn get_all_completions(&self) -> AllCompletions {
        self.try_get_all_completions()
            .await
            .unwrap_or_else(|err| {
                warn!(error = %err, "failed to list completions");
                AllCompletions::new()
            })
    }

    /// Completions of `username`, or the store error. A missing record is empty.
    pub async fn try_get_user_completions(
        &self,
        username: &str,
    ) -> Result<CompletionMap, ServiceError> {
        check_username(username)?;
        let store = self.store.require().await?;
        let record = store.find_completions(username.to_owned()).await?;
        Ok(record.map(|record| record.completions).unwrap_or_default())
    }

    /// Completions of `username`; empty when none are recorded or the store fails.
    pub async fn get_user_completions(&self, username: &str) -> CompletionMap {
        self.try_get_user_completions(username)
            .await
            .unwrap_or_else(|err| {
                warn!(username, error = %err, "failed to load user completions");
                CompletionMap::new()
            })
    }

    /// Set the flag remotely once a credential is available.
    pub async fn try_mark_game_completed(
        &self,
        username: &str,
        game_id: GameId,
    ) -> Result<(), ServiceError> {
        check_username(username)?;
        require_credential(self.session.as_ref(), self.credential_wait).await?;
        let store = self.store.require().await?;
        store.mark_completed(username.to_owned(), game_id).await?;
        debug!(username, %game_id, "game marked completed remotely");
        Ok(())
    }

    /// Record the completion remotely. Idempotent.
    pub async fn mark_game_completed(&self, username: &str, game_id: GameId) -> bool {
        log_write(
            "mark game completed",
            username,
            Some(game_id),
            self.try_mark_game_completed(username, game_id).await,
        )
    }

    /// Delete one flag remotely once a credential is available.
    pub async fn try_reset_game_completion(
        &self,
        username: &str,
        game_id: GameId,
    ) -> Result<(), ServiceError> {
        check_username(username)?;
        require_credential(self.session.as_ref(), self.credential_wait).await?;
        let store = self.store.require().await?;
        store.reset_completion(username.to_owned(), game_id).await?;
        debug!(username, %game_id, "game completion reset remotely");
        Ok(())
    }

    /// Delete one completion flag. Succeeds when the user has no record.
    pub async fn reset_game_completion(&self, username: &str, game_id: GameId) -> bool {
        log_write(
            "reset game completion",
            username,
            Some(game_id),
            self.try_reset_game_completion(username, game_id).await,
        )
    }

    /// Empty the remote map once a credential is available.
    pub async fn try_reset_all_completions(&self, username: &str) -> Result<(), ServiceError> {
        check_username(username)?;
        require_credential(self.session.as_ref(), self.credential_wait).await?;
        let store = self.store.require().await?;
        store.reset_all(username.to_owned()).await?;
        debug!(username, "all completions reset remotely");
        Ok(())
    }

    /// Empty the user's completion map. Succeeds when the user has no record.
    pub async fn reset_all_completions(&self, username: &str) -> bool {
        log_write(
            "reset all completions",
            username,
            None,
            self.try_reset_all_completions(username).await,
        )
    }
}

fn check_username(username: &str) -> Result<(), ServiceError> {
    validate_username(username).map_err(|err| {
        ServiceError::InvalidInput(
            err.message
                .map(|message| message.into_owned())
                .unwrap_or_else(|| "invalid username".into()),
        )
    })
}

fn log_write(
    operation: &str,
    username: &str,
    game_id: Option<GameId>,
    result: Result<(), ServiceError>,
) -> bool {
    match result {
        Ok(()) => true,
        Err(err) => {
            warn!(
                operation,
                username,
                game_id = ?game_id.map(GameId::get),
                error = %err,
                "completion write failed"
            );
            false
        }
    }
}
