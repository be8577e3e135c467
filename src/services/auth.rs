//! Session collaborator: who is signed in on this device and with which token.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::time::{sleep, timeout};
use tracing::{debug, info};

use crate::{
    cache::{LocalCache, SESSION_KEY},
    error::ServiceError,
};

const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Source of the current session.
pub trait SessionProvider: Send + Sync {
    /// Opaque token proving the session, if signed in.
    fn current_session_credential(&self) -> Option<String>;
    /// Name of the signed-in user.
    fn current_username(&self) -> Option<String>;
}

/// Session blob persisted under [`SESSION_KEY`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credential {
    /// Signed-in user.
    pub username: String,
    /// Opaque credential checked against `X-Session-Token`.
    pub token: String,
}

/// [`SessionProvider`] backed by the local cache.
#[derive(Clone)]
pub struct CachedSession {
    cache: LocalCache,
}

impl CachedSession {
    /// Session stored in `cache`.
    pub fn new(cache: LocalCache) -> Self {
        Self { cache }
    }

    /// Current session blob, ignoring entries with an empty token.
    pub fn current(&self) -> Option<Credential> {
        self.cache
            .get::<Option<Credential>>(SESSION_KEY, None)
            .filter(|credential| !credential.token.is_empty())
    }

    /// Persist a new session, replacing any previous one.
    pub fn sign_in(&self, username: &str, token: &str) -> bool {
        let saved = self.cache.save(
            SESSION_KEY,
            &Credential {
                username: username.to_owned(),
                token: token.to_owned(),
            },
        );
        if saved {
            info!(username, "session opened");
        }
        saved
    }

    /// Forget the current session.
    pub fn sign_out(&self) {
        self.cache.remove(SESSION_KEY);
        info!("session closed");
    }
}

impl SessionProvider for CachedSession {
    fn current_session_credential(&self) -> Option<String> {
        self.current().map(|credential| credential.token)
    }

    fn current_username(&self) -> Option<String> {
        self.current().map(|credential| credential.username)
    }
}

/// Wait up to `wait` for a session credential to become available.
///
/// Returns immediately when one is already present; the store is never touched here.
pub async fn require_credential(
    provider: &dyn SessionProvider,
    wait: Duration,
) -> Result<String, ServiceError> {
    if let Some(credential) = provider.current_session_credential() {
        return Ok(credential);
    }

    let polled = timeout(wait, async {
        loop {
            sleep(POLL_INTERVAL).await;
            if let Some(credential) = provider.current_session_credential() {
                return credential;
            }
        }
    })
    .await;

    polled.map_err(|_| {
        debug!(wait_ms = wait.as_millis() as u64, "no session credential appeared");
        ServiceError::Unauthorized("authentication required".into())
    })
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;

    #[test]
    fn sign_in_then_out() {
        let session = CachedSession::new(LocalCache::in_memory());
        assert_eq!(session.current_username(), None);

        assert!(session.sign_in("alice", "secret"));
        assert_eq!(session.current_username().as_deref(), Some("alice"));
        assert_eq!(session.current_session_credential().as_deref(), Some("secret"));

        session.sign_out();
        assert_eq!(session.current_session_credential(), None);
    }

    #[test]
    fn empty_token_is_not_a_session() {
        let session = CachedSession::new(LocalCache::in_memory());
        session.sign_in("alice", "");
        assert_eq!(session.current_username(), None);
    }

    #[tokio::test(start_paused = true)]
    async fn missing_credential_fails_after_wait() {
        let session = CachedSession::new(LocalCache::in_memory());
        let result = require_credential(&session, Duration::from_secs(3)).await;
        assert!(matches!(result, Err(ServiceError::Unauthorized(_))));
    }

    #[tokio::test(start_paused = true)]
    async fn credential_arriving_during_wait_is_used() {
        let session = Arc::new(CachedSession::new(LocalCache::in_memory()));
        let late = session.clone();
        tokio::spawn(async move {
            sleep(Duration::from_millis(200)).await;
            late.sign_in("bob", "token");
        });

        let credential = require_credential(session.as_ref(), Duration::from_secs(3)).await;
        assert_eq!(credential.unwrap(), "token");
    }
}
