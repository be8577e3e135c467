use std::{env, time::Duration};

use mongodb::{Client, Database, bson::doc, options::ClientOptions};
use tokio::time::sleep;
use tracing::debug;

use super::error::{MongoDaoError, MongoResult};

const DEFAULT_DATABASE: &str = "party_trivia";
const PING_ATTEMPTS: u32 = 5;
const FIRST_PING_DELAY: Duration = Duration::from_millis(250);
const MAX_PING_DELAY: Duration = Duration::from_secs(4);

/// Connection settings of the MongoDB backend.
#[derive(Clone)]
pub struct MongoConfig {
    /// Parsed driver options.
    pub options: ClientOptions,
    /// Database holding the completion and settings collections.
    pub database_name: String,
}

impl MongoConfig {
    /// Parse a connection URI.
    pub async fn parse(uri: &str, database_name: impl Into<String>) -> MongoResult<Self> {
        let options = ClientOptions::parse(uri)
            .await
            .map_err(MongoDaoError::InvalidUri)?;
        Ok(Self {
            options,
            database_name: database_name.into(),
        })
    }

    /// Read `MONGO_URI` (required) and `MONGO_DB` (optional).
    pub async fn from_env() -> MongoResult<Self> {
        let uri = env::var("MONGO_URI").map_err(|_| MongoDaoError::MissingEnvVar("MONGO_URI"))?;
        let database = env::var("MONGO_DB").unwrap_or_else(|_| DEFAULT_DATABASE.to_owned());
        Self::parse(&uri, database).await
    }

    /// Build a client and wait until the database answers a ping.
    pub async fn open(&self) -> MongoResult<Database> {
        let client = Client::with_options(self.options.clone()).map_err(MongoDaoError::Client)?;
        let database = client.database(&self.database_name);

        let mut attempts = 0;
        let mut delay = FIRST_PING_DELAY;
        loop {
            attempts += 1;
            match ping(&database).await {
                Ok(()) => return Ok(database),
                Err(source) if attempts >= PING_ATTEMPTS => {
                    return Err(MongoDaoError::Unreachable {
                        database: self.database_name.clone(),
                        attempts,
                        source,
                    });
                }
                Err(err) => {
                    debug!(
                        attempts,
                        database = %self.database_name,
                        error = %err,
                        "MongoDB ping failed; retrying"
                    );
                    sleep(delay).await;
                    delay = (delay * 2).min(MAX_PING_DELAY);
                }
            }
        }
    }
}

pub(super) async fn ping(database: &Database) -> Result<(), mongodb::error::Error> {
    database.run_command(doc! { "ping": 1 }).await.map(|_| ())
}
