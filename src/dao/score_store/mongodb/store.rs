use std::sync::Arc;

use futures::{TryStreamExt, future::BoxFuture};
use mongodb::{
    Client, ClientSession, Collection, Database, IndexModel,
    bson::{Document, doc},
    options::IndexOptions,
};
use serde::{Serialize, de::DeserializeOwned};
use tokio::sync::RwLock;
use tracing::warn;
use uuid::Uuid;

use super::{
    config::MongoConfig,
    connection::establish_connection,
    error::{MongoDaoError, MongoResult},
    models::{
        ENROLLMENT_COLLECTION, HOLE_COLLECTION, MongoEnrollmentDocument, MongoHoleDocument,
        MongoRoundDocument, MongoScoreDocument, MongoUserDocument, ROUND_COLLECTION,
        SCORE_COLLECTION, USER_COLLECTION, doc_id, enrollment_key, score_key,
    },
};
use crate::dao::{
    models::{EnrollmentEntity, HoleEntity, RoundEntity, ScoreEntity, UserEntity},
    score_store::ScoreStore,
    storage::{StorageError, StorageResult},
};

/// MongoDB-backed [`ScoreStore`] implementation.
#[derive(Clone)]
pub struct MongoScoreStore {
    inner: Arc<MongoInner>,
}

struct MongoInner {
    state: RwLock<MongoState>,
    config: MongoConfig,
}

struct MongoState {
    client: Client,
    database: Database,
}

impl MongoInner {
    async fn ping(&self) -> MongoResult<()> {
        let database = {
            let guard = self.state.read().await;
            guard.database.clone()
        };

        database
            .run_command(doc! { "ping": 1 })
            .await
            .map_err(|source| MongoDaoError::HealthPing { source })?;
        Ok(())
    }

    async fn reconnect(&self) -> MongoResult<()> {
        let (client, database) = establish_connection(&self.config).await?;
        let mut guard = self.state.write().await;
        guard.client = client;
        guard.database = database;
        Ok(())
    }
}

impl MongoScoreStore {
    /// Establish a connection to MongoDB and ensure indexes are present.
    pub async fn connect(config: MongoConfig) -> MongoResult<Self> {
        let (client, database) = establish_connection(&config).await?;

        let inner = Arc::new(MongoInner {
            state: RwLock::new(MongoState { client, database }),
            config,
        });

        let store = Self { inner };
        store.ensure_indexes().await?;
        Ok(store)
    }

    async fn ensure_indexes(&self) -> MongoResult<()> {
        let unique_indexes: [(&'static str, &'static str, Document); 5] = [
            (ROUND_COLLECTION, "number", doc! {"number": 1}),
            (USER_COLLECTION, "username", doc! {"username": 1}),
            (
                HOLE_COLLECTION,
                "round_id,hole_number",
                doc! {"round_id": 1, "hole_number": 1},
            ),
            (
                ENROLLMENT_COLLECTION,
                "round_id,user_id",
                doc! {"round_id": 1, "user_id": 1},
            ),
            (
                SCORE_COLLECTION,
                "user_id,round_id,hole_id",
                doc! {"user_id": 1, "round_id": 1, "hole_id": 1},
            ),
        ];

        let database = self.database().await;
        for (collection, index, keys) in unique_indexes {
            let model = IndexModel::builder()
                .keys(keys)
                .options(
                    IndexOptions::builder()
                        .name(Some(format!("{collection}_{}_idx", index.replace(',', "_"))))
                        .unique(Some(true))
                        .build(),
                )
                .build();
            database
                .collection::<Document>(collection)
                .create_index(model)
                .await
                .map_err(|source| MongoDaoError::EnsureIndex {
                    collection,
                    index,
                    source,
                })?;
        }
        Ok(())
    }

    async fn database(&self) -> Database {
        let guard = self.inner.state.read().await;
        guard.database.clone()
    }

    async fn client(&self) -> Client {
        let guard = self.inner.state.read().await;
        guard.client.clone()
    }

    async fn collection<T: Send + Sync>(&self, name: &str) -> Collection<T> {
        self.database().await.collection::<T>(name)
    }

    async fn find_all<T, E>(&self, name: &'static str, filter: Document) -> MongoResult<Vec<E>>
    where
        T: DeserializeOwned + Send + Sync + Unpin,
        E: TryFrom<T, Error = MongoDaoError>,
    {
        let documents: Vec<T> = self
            .collection::<T>(name)
            .await
            .find(filter)
            .await
            .map_err(|source| MongoDaoError::Read {
                collection: name,
                source,
            })?
            .try_collect()
            .await
            .map_err(|source| MongoDaoError::Read {
                collection: name,
                source,
            })?;

        documents.into_iter().map(E::try_from).collect()
    }

    async fn find_first<T, E>(&self, name: &'static str, filter: Document) -> MongoResult<Option<E>>
    where
        T: DeserializeOwned + Send + Sync,
        E: TryFrom<T, Error = MongoDaoError>,
    {
        self.collection::<T>(name)
            .await
            .find_one(filter)
            .await
            .map_err(|source| MongoDaoError::Read {
                collection: name,
                source,
            })?
            .map(E::try_from)
            .transpose()
    }

    async fn replace<T: Serialize + Send + Sync>(
        &self,
        name: &'static str,
        id: Uuid,
        document: T,
        what: String,
    ) -> MongoResult<()> {
        self.collection::<T>(name)
            .await
            .replace_one(doc_id(id), &document)
            .upsert(true)
            .await
            .map_err(|source| MongoDaoError::from_write(name, what, source))?;
        Ok(())
    }

    async fn save_holes(&self, holes: Vec<HoleEntity>) -> MongoResult<()> {
        let collection = self.collection::<Document>(HOLE_COLLECTION).await;
        for hole in holes {
            let document = MongoHoleDocument::from(hole);
            let fields = mongodb::bson::serialize_to_document(&document).map_err(|err| {
                MongoDaoError::CorruptDocument {
                    collection: HOLE_COLLECTION,
                    reason: err.to_string(),
                }
            })?;
            // An existing hole keeps its identity.
            collection
                .update_one(
                    doc! {
                        "round_id": hole.round_id.to_string(),
                        "hole_number": i32::from(hole.hole_number),
                    },
                    doc! {"$setOnInsert": fields},
                )
                .upsert(true)
                .await
                .map_err(|source| MongoDaoError::Write {
                    collection: HOLE_COLLECTION,
                    source,
                })?;
        }
        Ok(())
    }

    async fn enroll(&self, enrollment: EnrollmentEntity) -> MongoResult<()> {
        let key = enrollment_key(&enrollment);
        self.collection::<MongoEnrollmentDocument>(ENROLLMENT_COLLECTION)
            .await
            .update_one(key.clone(), doc! {"$setOnInsert": key})
            .upsert(true)
            .await
            .map_err(|source| MongoDaoError::Write {
                collection: ENROLLMENT_COLLECTION,
                source,
            })?;
        Ok(())
    }

    async fn unenroll(&self, enrollment: EnrollmentEntity) -> MongoResult<bool> {
        let result = self
            .collection::<MongoEnrollmentDocument>(ENROLLMENT_COLLECTION)
            .await
            .delete_one(enrollment_key(&enrollment))
            .await
            .map_err(|source| MongoDaoError::Write {
                collection: ENROLLMENT_COLLECTION,
                source,
            })?;
        Ok(result.deleted_count > 0)
    }

    async fn apply_score_changes(
        &self,
        inserts: Vec<ScoreEntity>,
        updates: Vec<ScoreEntity>,
    ) -> MongoResult<()> {
        if inserts.is_empty() && updates.is_empty() {
            return Ok(());
        }

        let client = self.client().await;
        let collection = self
            .collection::<MongoScoreDocument>(SCORE_COLLECTION)
            .await;
        let mut session = client
            .start_session()
            .await
            .map_err(|source| MongoDaoError::Transaction { source })?;
        session
            .start_transaction()
            .await
            .map_err(|source| MongoDaoError::Transaction { source })?;

        match write_scores(&collection, &mut session, inserts, updates).await {
            Ok(()) => session
                .commit_transaction()
                .await
                .map_err(|source| MongoDaoError::Transaction { source }),
            Err(err) => {
                if let Err(abort) = session.abort_transaction().await {
                    warn!(error = %abort, "failed to abort score transaction");
                }
                Err(err)
            }
        }
    }
}

async fn write_scores(
    collection: &Collection<MongoScoreDocument>,
    session: &mut ClientSession,
    inserts: Vec<ScoreEntity>,
    updates: Vec<ScoreEntity>,
) -> MongoResult<()> {
    for score in inserts {
        let what = format!(
            "score for user {} on hole {}",
            score.user_id, score.hole_id
        );
        collection
            .insert_one(MongoScoreDocument::from(score))
            .session(&mut *session)
            .await
            .map_err(|source| MongoDaoError::from_write(SCORE_COLLECTION, what, source))?;
    }

    for score in updates {
        let result = collection
            .update_one(
                score_key(&score),
                doc! {"$set": {
                    "score": i32::from(score.score),
                    "social_reference": score.social_reference.clone(),
                }},
            )
            .session(&mut *session)
            .await
            .map_err(|source| MongoDaoError::Write {
                collection: SCORE_COLLECTION,
                source,
            })?;
        if result.matched_count == 0 {
            return Err(MongoDaoError::MissingScore {
                user_id: score.user_id.to_string(),
                hole_id: score.hole_id.to_string(),
            });
        }
    }
    Ok(())
}

impl ScoreStore for MongoScoreStore {
    fn list_rounds(&self) -> BoxFuture<'static, StorageResult<Vec<RoundEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            store
                .find_all::<MongoRoundDocument, RoundEntity>(ROUND_COLLECTION, doc! {})
                .await
                .map_err(StorageError::from)
        })
    }

    fn find_round(&self, number: u32) -> BoxFuture<'static, StorageResult<Option<RoundEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            store
                .find_first::<MongoRoundDocument, RoundEntity>(
                    ROUND_COLLECTION,
                    doc! {"number": i64::from(number)},
                )
                .await
                .map_err(StorageError::from)
        })
    }

    fn save_round(&self, round: RoundEntity) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move {
            store
                .replace(
                    ROUND_COLLECTION,
                    round.id,
                    MongoRoundDocument::from(round),
                    format!("round {}", round.number),
                )
                .await
                .map_err(StorageError::from)
        })
    }

    fn list_holes(&self, round_id: Uuid) -> BoxFuture<'static, StorageResult<Vec<HoleEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            store
                .find_all::<MongoHoleDocument, HoleEntity>(
                    HOLE_COLLECTION,
                    doc! {"round_id": round_id.to_string()},
                )
                .await
                .map_err(StorageError::from)
        })
    }

    fn save_holes(&self, holes: Vec<HoleEntity>) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.save_holes(holes).await.map_err(StorageError::from) })
    }

    fn list_users(&self) -> BoxFuture<'static, StorageResult<Vec<UserEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            store
                .find_all::<MongoUserDocument, UserEntity>(USER_COLLECTION, doc! {})
                .await
                .map_err(StorageError::from)
        })
    }

    fn find_user(
        &self,
        username: String,
    ) -> BoxFuture<'static, StorageResult<Option<UserEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            store
                .find_first::<MongoUserDocument, UserEntity>(USER_COLLECTION, doc! {"username": username})
                .await
                .map_err(StorageError::from)
        })
    }

    fn save_user(&self, user: UserEntity) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move {
            let what = format!("user `{}`", user.username);
            store
                .replace(USER_COLLECTION, user.id, MongoUserDocument::from(user), what)
                .await
                .map_err(StorageError::from)
        })
    }

    fn list_enrollments(
        &self,
        round_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Vec<EnrollmentEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            store
                .find_all::<MongoEnrollmentDocument, EnrollmentEntity>(
                    ENROLLMENT_COLLECTION,
                    doc! {"round_id": round_id.to_string()},
                )
                .await
                .map_err(StorageError::from)
        })
    }

    fn enroll(&self, enrollment: EnrollmentEntity) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.enroll(enrollment).await.map_err(StorageError::from) })
    }

    fn unenroll(&self, enrollment: EnrollmentEntity) -> BoxFuture<'static, StorageResult<bool>> {
        let store = self.clone();
        Box::pin(async move { store.unenroll(enrollment).await.map_err(StorageError::from) })
    }

    fn list_scores(&self, round_id: Uuid) -> BoxFuture<'static, StorageResult<Vec<ScoreEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            store
                .find_all::<MongoScoreDocument, ScoreEntity>(
                    SCORE_COLLECTION,
                    doc! {"round_id": round_id.to_string()},
                )
                .await
                .map_err(StorageError::from)
        })
    }

    fn apply_score_changes(
        &self,
        inserts: Vec<ScoreEntity>,
        updates: Vec<ScoreEntity>,
    ) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move {
            store
                .apply_score_changes(inserts, updates)
                .await
                .map_err(StorageError::from)
        })
    }

    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.inner.ping().await.map_err(StorageError::from) })
    }

    fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.inner.reconnect().await.map_err(StorageError::from) })
    }
}
