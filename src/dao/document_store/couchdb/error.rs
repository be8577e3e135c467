use reqwest::{Method, StatusCode};
use thiserror::Error;

/// Result alias for CouchDB requests.
pub type CouchResult<T> = Result<T, CouchDaoError>;

/// Failures of a CouchDB request, tagged with the method and database-relative path.
#[derive(Debug, Error)]
pub enum CouchDaoError {
    /// A required `COUCH_*` variable is not set.
    #[error("missing CouchDB environment variable `{0}`")]
    MissingEnvVar(&'static str),
    /// The HTTP client could not be built.
    #[error("failed to build CouchDB HTTP client")]
    Client(#[source] reqwest::Error),
    /// No usable response came back.
    #[error("CouchDB {method} `{path}` failed in transit")]
    Transport {
        /// HTTP method.
        method: Method,
        /// Path relative to the database.
        path: String,
        /// Client error.
        #[source]
        source: reqwest::Error,
    },
    /// Unexpected status code.
    #[error("CouchDB {method} `{path}` answered {status}")]
    Status {
        /// HTTP method.
        method: Method,
        /// Path relative to the database.
        path: String,
        /// Status received.
        status: StatusCode,
    },
    /// Another writer saved the document first.
    #[error("revision conflict on `{path}`")]
    Conflict {
        /// Path of the contested document.
        path: String,
    },
    /// The body did not match the expected document shape.
    #[error("malformed CouchDB payload from `{path}`")]
    Decode {
        /// Path relative to the database.
        path: String,
        /// Decoding error.
        #[source]
        source: serde_json::Error,
    },
}
