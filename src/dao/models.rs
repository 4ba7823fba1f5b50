use serde::{Deserialize, Serialize};
use time::Date;
use uuid::Uuid;

use crate::scoring::calendar::Round;

/// Player known to the competition.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct UserEntity {
    /// Stable identifier for the user.
    pub id: Uuid,
    /// Handle used on the sheet and on the social platform.
    pub username: String,
    /// Identifier on the social platform, or `"{username}-NA"` when unknown.
    pub social_id: String,
    /// Whether the social platform is searched for this user's posts.
    pub check_social: bool,
}

/// Round definition persisted by the storage layer.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct RoundEntity {
    pub id: Uuid,
    /// Round number as shown to players ("Round 3").
    pub number: u32,
    /// Date of hole 1.
    pub start_date: Date,
}

impl From<&RoundEntity> for Round {
    fn from(value: &RoundEntity) -> Self {
        Round::new(value.number, value.start_date)
    }
}

/// Identity of one hole of a round.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct HoleEntity {
    pub id: Uuid,
    pub round_id: Uuid,
    pub hole_number: u8,
}

/// Membership of a user in a round.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct EnrollmentEntity {
    pub user_id: Uuid,
    pub round_id: Uuid,
}

/// Persisted score, unique per (user, round, hole).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ScoreEntity {
    pub user_id: Uuid,
    pub round_id: Uuid,
    pub hole_id: Uuid,
    /// Raw puzzle score, 1..=7.
    pub score: u8,
    /// Identifier of the social post the score came from.
    pub social_reference: Option<String>,
}

impl ScoreEntity {
    /// Composite key of the record.
    pub fn key(&self) -> (Uuid, Uuid, Uuid) {
        (self.user_id, self.round_id, self.hole_id)
    }
}
