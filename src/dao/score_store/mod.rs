pub mod memory;
#[cfg(feature = "mongo-store")]
pub mod mongodb;

use futures::future::BoxFuture;
use uuid::Uuid;

use crate::dao::models::{EnrollmentEntity, HoleEntity, RoundEntity, ScoreEntity, UserEntity};
use crate::dao::storage::StorageResult;

pub use memory::InMemoryScoreStore;

/// Abstraction over the persistence layer for rounds, players and the score ledger.
pub trait ScoreStore: Send + Sync {
    fn list_rounds(&self) -> BoxFuture<'static, StorageResult<Vec<RoundEntity>>>;
    fn find_round(&self, number: u32) -> BoxFuture<'static, StorageResult<Option<RoundEntity>>>;
    fn save_round(&self, round: RoundEntity) -> BoxFuture<'static, StorageResult<()>>;
    fn list_holes(&self, round_id: Uuid) -> BoxFuture<'static, StorageResult<Vec<HoleEntity>>>;
    fn save_holes(&self, holes: Vec<HoleEntity>) -> BoxFuture<'static, StorageResult<()>>;
    fn list_users(&self) -> BoxFuture<'static, StorageResult<Vec<UserEntity>>>;
    fn find_user(&self, username: String)
    -> BoxFuture<'static, StorageResult<Option<UserEntity>>>;
    fn save_user(&self, user: UserEntity) -> BoxFuture<'static, StorageResult<()>>;
    fn list_enrollments(
        &self,
        round_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Vec<EnrollmentEntity>>>;
    /// Enroll a user; enrolling twice is a no-op.
    fn enroll(&self, enrollment: EnrollmentEntity) -> BoxFuture<'static, StorageResult<()>>;
    /// Remove an enrollment, returning whether one existed.
    fn unenroll(&self, enrollment: EnrollmentEntity) -> BoxFuture<'static, StorageResult<bool>>;
    fn list_scores(&self, round_id: Uuid) -> BoxFuture<'static, StorageResult<Vec<ScoreEntity>>>;
    /// Insert new scores and overwrite the score/reference of existing ones as a single
    /// logical transaction: either every write lands or none does.
    fn apply_score_changes(
        &self,
        inserts: Vec<ScoreEntity>,
        updates: Vec<ScoreEntity>,
    ) -> BoxFuture<'static, StorageResult<()>>;
    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>>;
    fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>>;
}
