use std::sync::Arc;

use futures::future::BoxFuture;
use indexmap::IndexMap;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::dao::{
    models::{EnrollmentEntity, HoleEntity, RoundEntity, ScoreEntity, UserEntity},
    score_store::ScoreStore,
    storage::{StorageError, StorageResult},
};

/// Process-local store used by tests and by `STORAGE_BACKEND=memory`.
#[derive(Clone, Default)]
pub struct InMemoryScoreStore {
    tables: Arc<RwLock<Tables>>,
}

#[derive(Default)]
struct Tables {
    rounds: Vec<RoundEntity>,
    holes: Vec<HoleEntity>,
    users: Vec<UserEntity>,
    enrollments: Vec<EnrollmentEntity>,
    scores: IndexMap<(Uuid, Uuid, Uuid), ScoreEntity>,
}

impl InMemoryScoreStore {
    pub fn new() -> Self {
        Self::default()
    }

    async fn save_round(&self, round: RoundEntity) -> StorageResult<()> {
        let mut tables = self.tables.write().await;
        if tables
            .rounds
            .iter()
            .any(|existing| existing.number == round.number && existing.id != round.id)
        {
            return Err(StorageError::Conflict(format!(
                "round {} already exists",
                round.number
            )));
        }
        match tables.rounds.iter().position(|existing| existing.id == round.id) {
            Some(index) => tables.rounds[index] = round,
            None => tables.rounds.push(round),
        }
        Ok(())
    }

    async fn save_holes(&self, holes: Vec<HoleEntity>) -> StorageResult<()> {
        let mut tables = self.tables.write().await;
        for hole in holes {
            let duplicate = tables.holes.iter().any(|existing| {
                existing.round_id == hole.round_id && existing.hole_number == hole.hole_number
            });
            if !duplicate {
                tables.holes.push(hole);
            }
        }
        Ok(())
    }

    async fn save_user(&self, user: UserEntity) -> StorageResult<()> {
        let mut tables = self.tables.write().await;
        if tables
            .users
            .iter()
            .any(|existing| existing.username == user.username && existing.id != user.id)
        {
            return Err(StorageError::Conflict(format!(
                "user `{}` already exists",
                user.username
            )));
        }
        match tables.users.iter().position(|existing| existing.id == user.id) {
            Some(index) => tables.users[index] = user,
            None => tables.users.push(user),
        }
        Ok(())
    }

    async fn apply_score_changes(
        &self,
        inserts: Vec<ScoreEntity>,
        updates: Vec<ScoreEntity>,
    ) -> StorageResult<()> {
        let mut tables = self.tables.write().await;

        // Validate everything first so a rejected batch leaves the ledger untouched.
        for insert in &inserts {
            if tables.scores.contains_key(&insert.key()) {
                return Err(StorageError::Conflict(format!(
                    "score for user {} on hole {} already exists",
                    insert.user_id, insert.hole_id
                )));
            }
        }
        for update in &updates {
            if !tables.scores.contains_key(&update.key()) {
                return Err(StorageError::Conflict(format!(
                    "no score for user {} on hole {} to update",
                    update.user_id, update.hole_id
                )));
            }
        }

        for insert in inserts {
            tables.scores.insert(insert.key(), insert);
        }
        for update in updates {
            if let Some(saved) = tables.scores.get_mut(&update.key()) {
                saved.score = update.score;
                saved.social_reference = update.social_reference;
            }
        }
        Ok(())
    }
}

impl ScoreStore for InMemoryScoreStore {
    fn list_rounds(&self) -> BoxFuture<'static, StorageResult<Vec<RoundEntity>>> {
        let store = self.clone();
        Box::pin(async move { Ok(store.tables.read().await.rounds.clone()) })
    }

    fn find_round(&self, number: u32) -> BoxFuture<'static, StorageResult<Option<RoundEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            let tables = store.tables.read().await;
            Ok(tables
                .rounds
                .iter()
                .find(|round| round.number == number)
                .copied())
        })
    }

    fn save_round(&self, round: RoundEntity) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.save_round(round).await })
    }

    fn list_holes(&self, round_id: Uuid) -> BoxFuture<'static, StorageResult<Vec<HoleEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            let tables = store.tables.read().await;
            Ok(tables
                .holes
                .iter()
                .filter(|hole| hole.round_id == round_id)
                .copied()
                .collect())
        })
    }

    fn save_holes(&self, holes: Vec<HoleEntity>) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.save_holes(holes).await })
    }

    fn list_users(&self) -> BoxFuture<'static, StorageResult<Vec<UserEntity>>> {
        let store = self.clone();
        Box::pin(async move { Ok(store.tables.read().await.users.clone()) })
    }

    fn find_user(
        &self,
        username: String,
    ) -> BoxFuture<'static, StorageResult<Option<UserEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            let tables = store.tables.read().await;
            Ok(tables
                .users
                .iter()
                .find(|user| user.username == username)
                .cloned())
        })
    }

    fn save_user(&self, user: UserEntity) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.save_user(user).await })
    }

    fn list_enrollments(
        &self,
        round_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Vec<EnrollmentEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            let tables = store.tables.read().await;
            Ok(tables
                .enrollments
                .iter()
                .filter(|enrollment| enrollment.round_id == round_id)
                .copied()
                .collect())
        })
    }

    fn enroll(&self, enrollment: EnrollmentEntity) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move {
            let mut tables = store.tables.write().await;
            if !tables.enrollments.contains(&enrollment) {
                tables.enrollments.push(enrollment);
            }
            Ok(())
        })
    }

    fn unenroll(&self, enrollment: EnrollmentEntity) -> BoxFuture<'static, StorageResult<bool>> {
        let store = self.clone();
        Box::pin(async move {
            let mut tables = store.tables.write().await;
            let before = tables.enrollments.len();
            tables.enrollments.retain(|existing| *existing != enrollment);
            Ok(tables.enrollments.len() != before)
        })
    }

    fn list_scores(&self, round_id: Uuid) -> BoxFuture<'static, StorageResult<Vec<ScoreEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            let tables = store.tables.read().await;
            Ok(tables
                .scores
                .values()
                .filter(|score| score.round_id == round_id)
                .cloned()
                .collect())
        })
    }

    fn apply_score_changes(
        &self,
        inserts: Vec<ScoreEntity>,
        updates: Vec<ScoreEntity>,
    ) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.apply_score_changes(inserts, updates).await })
    }

    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>> {
        Box::pin(async { Ok(()) })
    }

    fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>> {
        Box::pin(async { Ok(()) })
    }
}

#[cfg(test)]
mod tests {
    use time::macros::date;

    use super::*;

    fn score(user_id: Uuid, round_id: Uuid, hole_id: Uuid, value: u8) -> ScoreEntity {
        ScoreEntity {
            user_id,
            round_id,
            hole_id,
            score: value,
            social_reference: None,
        }
    }

    #[tokio::test]
    async fn rejected_batches_leave_the_ledger_untouched() {
        let store = InMemoryScoreStore::new();
        let (user, round, hole_a, hole_b) = (
            Uuid::new_v4(),
            Uuid::new_v4(),
            Uuid::new_v4(),
            Uuid::new_v4(),
        );

        store
            .apply_score_changes(vec![score(user, round, hole_a, 4)], Vec::new())
            .await
            .unwrap();

        let result = store
            .apply_score_changes(
                vec![score(user, round, hole_b, 3)],
                vec![score(user, round, Uuid::new_v4(), 2)],
            )
            .await;
        assert!(matches!(result, Err(StorageError::Conflict(_))));

        let scores = store.list_scores(round).await.unwrap();
        assert_eq!(scores, vec![score(user, round, hole_a, 4)]);
    }

    #[tokio::test]
    async fn updates_overwrite_score_and_reference() {
        let store = InMemoryScoreStore::new();
        let (user, round, hole) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());
        store
            .apply_score_changes(vec![score(user, round, hole, 7)], Vec::new())
            .await
            .unwrap();

        let mut corrected = score(user, round, hole, 3);
        corrected.social_reference = Some("post".into());
        store
            .apply_score_changes(Vec::new(), vec![corrected.clone()])
            .await
            .unwrap();

        assert_eq!(store.list_scores(round).await.unwrap(), vec![corrected]);
    }

    #[tokio::test]
    async fn round_numbers_are_unique() {
        let store = InMemoryScoreStore::new();
        let first = RoundEntity {
            id: Uuid::new_v4(),
            number: 1,
            start_date: date!(2022 - 05 - 09),
        };
        store.save_round(first).await.unwrap();

        let clash = RoundEntity {
            id: Uuid::new_v4(),
            ..first
        };
        assert!(ScoreStore::save_round(&store, clash).await.is_err());
        assert_eq!(
            ScoreStore::find_round(&store, 1).await.unwrap(),
            Some(first)
        );
    }

    #[tokio::test]
    async fn enrollment_is_idempotent() {
        let store = InMemoryScoreStore::new();
        let enrollment = EnrollmentEntity {
            user_id: Uuid::new_v4(),
            round_id: Uuid::new_v4(),
        };
        store.enroll(enrollment).await.unwrap();
        store.enroll(enrollment).await.unwrap();
        assert_eq!(
            store.list_enrollments(enrollment.round_id).await.unwrap(),
            vec![enrollment]
        );
        assert!(store.unenroll(enrollment).await.unwrap());
        assert!(!store.unenroll(enrollment).await.unwrap());
    }
}
