use std::env;

use mongodb::options::ClientOptions;

use super::{
    connection::ConnectRetry,
    error::{MongoDaoError, MongoResult},
};
use crate::config::StorageSettings;

const URI_VAR: &str = "MONGO_URI";
const APP_NAME: &str = "wordle-golf-back";

/// Client options, database and startup ping schedule of the score store.
#[derive(Clone)]
pub struct MongoConfig {
    pub options: ClientOptions,
    pub database_name: String,
    pub retry: ConnectRetry,
}

impl MongoConfig {
    /// Parse `uri`; the database name and retry schedule come from `settings`.
    pub async fn new(uri: &str, settings: &StorageSettings) -> MongoResult<Self> {
        let mut options =
            ClientOptions::parse(uri)
                .await
                .map_err(|source| MongoDaoError::InvalidUri {
                    uri: uri.to_owned(),
                    source,
                })?;
        options.app_name.get_or_insert_with(|| APP_NAME.to_owned());

        Ok(Self {
            options,
            database_name: settings.database.clone(),
            retry: ConnectRetry::from(settings),
        })
    }

    /// Same as [`MongoConfig::new`] with the URI read from `MONGO_URI`.
    pub async fn from_env(settings: &StorageSettings) -> MongoResult<Self> {
        let uri = env::var(URI_VAR).map_err(|_| MongoDaoError::MissingEnvVar { var: URI_VAR })?;
        Self::new(&uri, settings).await
    }
}
