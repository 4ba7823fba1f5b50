use mongodb::bson::{Document, doc};
use serde::{Deserialize, Serialize};
use time::{Date, macros::format_description};
use uuid::Uuid;

use crate::dao::models::{EnrollmentEntity, HoleEntity, RoundEntity, ScoreEntity, UserEntity};

use super::error::{MongoDaoError, MongoResult};

pub const USER_COLLECTION: &str = "users";
pub const ROUND_COLLECTION: &str = "rounds";
pub const HOLE_COLLECTION: &str = "holes";
pub const ENROLLMENT_COLLECTION: &str = "enrollments";
pub const SCORE_COLLECTION: &str = "scores";

// Identifiers are stored as hyphenated strings and dates as ISO `YYYY-MM-DD`.

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MongoUserDocument {
    #[serde(rename = "_id")]
    id: String,
    username: String,
    social_id: String,
    check_social: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MongoRoundDocument {
    #[serde(rename = "_id")]
    id: String,
    number: i64,
    start_date: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MongoHoleDocument {
    #[serde(rename = "_id")]
    id: String,
    round_id: String,
    hole_number: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MongoEnrollmentDocument {
    user_id: String,
    round_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MongoScoreDocument {
    user_id: String,
    round_id: String,
    hole_id: String,
    score: i32,
    social_reference: Option<String>,
}

impl From<UserEntity> for MongoUserDocument {
    fn from(value: UserEntity) -> Self {
        Self {
            id: value.id.to_string(),
            username: value.username,
            social_id: value.social_id,
            check_social: value.check_social,
        }
    }
}

impl TryFrom<MongoUserDocument> for UserEntity {
    type Error = MongoDaoError;

    fn try_from(value: MongoUserDocument) -> MongoResult<Self> {
        Ok(Self {
            id: parse_id(USER_COLLECTION, &value.id)?,
            username: value.username,
            social_id: value.social_id,
            check_social: value.check_social,
        })
    }
}

impl From<RoundEntity> for MongoRoundDocument {
    fn from(value: RoundEntity) -> Self {
        Self {
            id: value.id.to_string(),
            number: i64::from(value.number),
            start_date: value.start_date.to_string(),
        }
    }
}

impl TryFrom<MongoRoundDocument> for RoundEntity {
    type Error = MongoDaoError;

    fn try_from(value: MongoRoundDocument) -> MongoResult<Self> {
        let number = u32::try_from(value.number).map_err(|_| MongoDaoError::CorruptDocument {
            collection: ROUND_COLLECTION,
            reason: format!("round number {} out of range", value.number),
        })?;
        let start_date = Date::parse(&value.start_date, format_description!("[year]-[month]-[day]"))
            .map_err(|err| MongoDaoError::CorruptDocument {
                collection: ROUND_COLLECTION,
                reason: format!("invalid start date `{}`: {err}", value.start_date),
            })?;
        Ok(Self {
            id: parse_id(ROUND_COLLECTION, &value.id)?,
            number,
            start_date,
        })
    }
}

impl From<HoleEntity> for MongoHoleDocument {
    fn from(value: HoleEntity) -> Self {
        Self {
            id: value.id.to_string(),
            round_id: value.round_id.to_string(),
            hole_number: i32::from(value.hole_number),
        }
    }
}

impl TryFrom<MongoHoleDocument> for HoleEntity {
    type Error = MongoDaoError;

    fn try_from(value: MongoHoleDocument) -> MongoResult<Self> {
        Ok(Self {
            id: parse_id(HOLE_COLLECTION, &value.id)?,
            round_id: parse_id(HOLE_COLLECTION, &value.round_id)?,
            hole_number: small_number(HOLE_COLLECTION, value.hole_number)?,
        })
    }
}

impl From<EnrollmentEntity> for MongoEnrollmentDocument {
    fn from(value: EnrollmentEntity) -> Self {
        Self {
            user_id: value.user_id.to_string(),
            round_id: value.round_id.to_string(),
        }
    }
}

impl TryFrom<MongoEnrollmentDocument> for EnrollmentEntity {
    type Error = MongoDaoError;

    fn try_from(value: MongoEnrollmentDocument) -> MongoResult<Self> {
        Ok(Self {
            user_id: parse_id(ENROLLMENT_COLLECTION, &value.user_id)?,
            round_id: parse_id(ENROLLMENT_COLLECTION, &value.round_id)?,
        })
    }
}

impl From<ScoreEntity> for MongoScoreDocument {
    fn from(value: ScoreEntity) -> Self {
        Self {
            user_id: value.user_id.to_string(),
            round_id: value.round_id.to_string(),
            hole_id: value.hole_id.to_string(),
            score: i32::from(value.score),
            social_reference: value.social_reference,
        }
    }
}

impl TryFrom<MongoScoreDocument> for ScoreEntity {
    type Error = MongoDaoError;

    fn try_from(value: MongoScoreDocument) -> MongoResult<Self> {
        Ok(Self {
            user_id: parse_id(SCORE_COLLECTION, &value.user_id)?,
            round_id: parse_id(SCORE_COLLECTION, &value.round_id)?,
            hole_id: parse_id(SCORE_COLLECTION, &value.hole_id)?,
            score: small_number(SCORE_COLLECTION, value.score)?,
            social_reference: value.social_reference,
        })
    }
}

pub fn doc_id(id: Uuid) -> Document {
    doc! {"_id": id.to_string()}
}

/// Filter matching the ledger row of one (user, round, hole).
pub fn score_key(score: &ScoreEntity) -> Document {
    doc! {
        "user_id": score.user_id.to_string(),
        "round_id": score.round_id.to_string(),
        "hole_id": score.hole_id.to_string(),
    }
}

pub fn enrollment_key(enrollment: &EnrollmentEntity) -> Document {
    doc! {
        "user_id": enrollment.user_id.to_string(),
        "round_id": enrollment.round_id.to_string(),
    }
}

fn parse_id(collection: &'static str, raw: &str) -> MongoResult<Uuid> {
    Uuid::parse_str(raw).map_err(|err| MongoDaoError::CorruptDocument {
        collection,
        reason: format!("invalid id `{raw}`: {err}"),
    })
}

fn small_number(collection: &'static str, raw: i32) -> MongoResult<u8> {
    u8::try_from(raw).map_err(|_| MongoDaoError::CorruptDocument {
        collection,
        reason: format!("value {raw} out of range"),
    })
}

#[cfg(test)]
mod tests {
    use time::macros::date;

    use super::*;

    #[test]
    fn round_documents_keep_iso_dates() {
        let round = RoundEntity {
            id: Uuid::new_v4(),
            number: 12,
            start_date: date!(2022 - 05 - 09),
        };
        let document = MongoRoundDocument::from(round);
        assert_eq!(document.start_date, "2022-05-09");
        assert_eq!(RoundEntity::try_from(document).unwrap(), round);
    }

    #[test]
    fn corrupt_ids_are_reported() {
        let document = MongoHoleDocument {
            id: "not-a-uuid".into(),
            round_id: Uuid::new_v4().to_string(),
            hole_number: 3,
        };
        assert!(matches!(
            HoleEntity::try_from(document),
            Err(MongoDaoError::CorruptDocument { collection: HOLE_COLLECTION, .. })
        ));
    }
}
