use mongodb::error::{Error as MongoError, ErrorKind, WriteFailure};
use thiserror::Error;

pub type MongoResult<T> = std::result::Result<T, MongoDaoError>;

const DUPLICATE_KEY_CODE: i32 = 11000;

#[derive(Debug, Error)]
pub enum MongoDaoError {
    #[error("missing environment variable `{var}`")]
    MissingEnvVar { var: &'static str },
    #[error("failed to parse MongoDB connection URI `{uri}`")]
    InvalidUri {
        uri: String,
        #[source]
        source: MongoError,
    },
    #[error("failed to build MongoDB client from options")]
    ClientConstruction {
        #[source]
        source: MongoError,
    },
    #[error("MongoDB ping failed during initial connection after {attempts} attempt(s)")]
    InitialPing {
        attempts: u32,
        #[source]
        source: MongoError,
    },
    #[error("MongoDB ping health check failed")]
    HealthPing {
        #[source]
        source: MongoError,
    },
    #[error("failed to ensure index `{index}` on collection `{collection}`")]
    EnsureIndex {
        collection: &'static str,
        index: &'static str,
        #[source]
        source: MongoError,
    },
    #[error("failed to read collection `{collection}`")]
    Read {
        collection: &'static str,
        #[source]
        source: MongoError,
    },
    #[error("failed to write to collection `{collection}`")]
    Write {
        collection: &'static str,
        #[source]
        source: MongoError,
    },
    #[error("{what} already exists")]
    Duplicate {
        what: String,
        #[source]
        source: MongoError,
    },
    #[error("no score for user {user_id} on hole {hole_id} to update")]
    MissingScore { user_id: String, hole_id: String },
    #[error("score transaction failed")]
    Transaction {
        #[source]
        source: MongoError,
    },
    #[error("corrupt document in `{collection}`: {reason}")]
    CorruptDocument {
        collection: &'static str,
        reason: String,
    },
}

impl MongoDaoError {
    /// Classify a write failure, turning unique index violations into [`MongoDaoError::Duplicate`].
    pub fn from_write(collection: &'static str, what: String, source: MongoError) -> Self {
        if is_duplicate_key(&source) {
            MongoDaoError::Duplicate { what, source }
        } else {
            MongoDaoError::Write { collection, source }
        }
    }
}

fn is_duplicate_key(err: &MongoError) -> bool {
    matches!(
        err.kind.as_ref(),
        ErrorKind::Write(WriteFailure::WriteError(write_error)) if write_error.code == DUPLICATE_KEY_CODE
    )
}
