use super::error::{CouchDaoError, CouchResult};

const DEFAULT_DATABASE: &str = "party_trivia";

/// Basic-auth pair attached to every request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CouchCredentials {
    /// Account name.
    pub username: String,
    /// Account password.
    pub password: String,
}

/// Where the completion and settings documents live.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CouchConfig {
    /// Server root without trailing slash.
    pub base_url: String,
    /// Database name.
    pub database: String,
    /// Basic-auth credentials, if the server needs them.
    pub credentials: Option<CouchCredentials>,
}

impl CouchConfig {
    /// Anonymous access to `database` on `base_url`.
    pub fn new(base_url: impl Into<String>, database: impl Into<String>) -> Self {
        let base_url: String = base_url.into();
        Self {
            base_url: base_url.trim_end_matches('/').to_owned(),
            database: database.into(),
            credentials: None,
        }
    }

    /// Authenticate every request with basic auth.
    pub fn with_credentials(
        mut self,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        self.credentials = Some(CouchCredentials {
            username: username.into(),
            password: password.into(),
        });
        self
    }

    /// `COUCH_BASE_URL` (required), `COUCH_DB`, and the `COUCH_USERNAME` / `COUCH_PASSWORD` pair.
    pub fn from_env() -> CouchResult<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> CouchResult<Self> {
        let base_url =
            lookup("COUCH_BASE_URL").ok_or(CouchDaoError::MissingEnvVar("COUCH_BASE_URL"))?;
        let database = lookup("COUCH_DB").unwrap_or_else(|| DEFAULT_DATABASE.to_owned());
        let config = Self::new(base_url, database);

        Ok(
            match (lookup("COUCH_USERNAME"), lookup("COUCH_PASSWORD")) {
                (Some(username), Some(password)) => config.with_credentials(username, password),
                _ => config,
            },
        )
    }

    /// URL of `path` inside the database; an empty path is the database itself.
    pub fn url(&self, path: &str) -> String {
        if path.is_empty() {
            format!("{}/{}", self.base_url, self.database)
        } else {
            format!("{}/{}/{}", self.base_url, self.database, path)
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| vars.get(name).cloned()
    }

    #[test]
    fn base_url_is_required() {
        let err = CouchConfig::from_lookup(lookup(&[])).unwrap_err();
        assert!(matches!(err, CouchDaoError::MissingEnvVar("COUCH_BASE_URL")));
    }

    #[test]
    fn credentials_need_both_halves() {
        let config = CouchConfig::from_lookup(lookup(&[
            ("COUCH_BASE_URL", "http://couch:5984/"),
            ("COUCH_USERNAME", "admin"),
        ]))
        .unwrap();

        assert_eq!(config.database, DEFAULT_DATABASE);
        assert_eq!(config.credentials, None);
        assert_eq!(config.url(""), "http://couch:5984/party_trivia");
        assert_eq!(config.url("_find"), "http://couch:5984/party_trivia/_find");
    }
}
