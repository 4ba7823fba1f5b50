mod config;
mod connection;
mod error;
mod models;
pub mod store;

pub use config::MongoConfig;
pub use connection::ConnectRetry;
pub use error::MongoDaoError;
pub use store::MongoScoreStore;

use crate::dao::storage::StorageError;

impl From<MongoDaoError> for StorageError {
    fn from(err: MongoDaoError) -> Self {
        match err {
            MongoDaoError::Duplicate { what, .. } => StorageError::Conflict(what),
            MongoDaoError::MissingScore { .. } => StorageError::Conflict(err.to_string()),
            other => StorageError::unavailable(other.to_string(), other),
        }
    }
}
