use mongodb::error::Error as MongoError;
use thiserror::Error;

/// Result alias for MongoDB operations.
pub type MongoResult<T> = std::result::Result<T, MongoDaoError>;

/// Failures of the MongoDB backend.
#[derive(Debug, Error)]
pub enum MongoDaoError {
    /// A required `MONGO_*` variable is not set.
    #[error("missing MongoDB environment variable `{0}`")]
    MissingEnvVar(&'static str),
    /// The URI itself is left out of the message: it may carry a password.
    #[error("invalid MongoDB connection URI")]
    InvalidUri(#[source] MongoError),
    /// The driver rejected the client options.
    #[error("failed to build MongoDB client")]
    Client(#[source] MongoError),
    /// Every connection ping failed.
    #[error("MongoDB database `{database}` unreachable after {attempts} ping(s)")]
    Unreachable {
        /// Database name.
        database: String,
        /// Pings attempted.
        attempts: u32,
        /// Last ping error.
        #[source]
        source: MongoError,
    },
    /// Periodic health ping failed.
    #[error("MongoDB health ping failed")]
    HealthPing(#[source] MongoError),
    /// Index creation failed at startup.
    #[error("failed to create index `{index}` on `{collection}`")]
    Index {
        /// Collection name.
        collection: &'static str,
        /// Index name.
        index: &'static str,
        /// Driver error.
        #[source]
        source: MongoError,
    },
    /// A read or write against one of the collections failed.
    #[error("MongoDB {operation} on `{collection}` failed")]
    Command {
        /// Collection name.
        collection: &'static str,
        /// Operation attempted.
        operation: &'static str,
        /// Driver error.
        #[source]
        source: MongoError,
    },
}
