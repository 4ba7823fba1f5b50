//! DTO definitions used by the round and roster endpoints.

use serde::{Deserialize, Serialize};
use time::Date;
use utoipa::ToSchema;
use validator::{Validate, ValidationErrors};

use crate::{
    dao::models::{RoundEntity, UserEntity},
    dto::validation::validate_username,
    scoring::calendar::Round,
};

/// Payload creating a round and its eighteen holes.
#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct CreateRoundRequest {
    #[validate(range(min = 1))]
    pub number: u32,
    /// Date of hole 1 (`YYYY-MM-DD`).
    pub start_date: Date,
}

/// Round as listed to clients.
#[derive(Debug, Serialize, ToSchema, PartialEq, Eq)]
pub struct RoundSummary {
    pub number: u32,
    pub start_date: Date,
    pub end_date: Date,
}

impl From<&RoundEntity> for RoundSummary {
    fn from(value: &RoundEntity) -> Self {
        let round = Round::from(value);
        Self {
            number: round.number,
            start_date: round.start_date,
            end_date: round.end_date(),
        }
    }
}

/// Payload adding a player to a round, creating the user when unknown.
#[derive(Debug, Deserialize, ToSchema)]
pub struct AddPlayerRequest {
    pub username: String,
    /// Known platform id; looked up on the social platform when omitted.
    #[serde(default)]
    pub social_id: Option<String>,
    /// Whether social posts are searched for this player. Defaults to true.
    #[serde(default)]
    pub check_social: Option<bool>,
}

impl Validate for AddPlayerRequest {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        if let Err(e) = validate_username(&self.username) {
            errors.add("username", e);
        }
        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

/// Payload copying the roster of another round.
#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct CopyPlayersRequest {
    #[validate(range(min = 1))]
    pub from_round: u32,
}

/// Player enrolled in a round.
#[derive(Debug, Serialize, ToSchema, PartialEq, Eq)]
pub struct PlayerSummary {
    pub username: String,
    pub social_id: String,
    pub check_social: bool,
}

impl From<UserEntity> for PlayerSummary {
    fn from(value: UserEntity) -> Self {
        Self {
            username: value.username,
            social_id: value.social_id,
            check_social: value.check_social,
        }
    }
}

/// Roster of a round after a change.
#[derive(Debug, Serialize, ToSchema)]
pub struct RosterResponse {
    pub round_number: u32,
    pub players: Vec<String>,
    /// Players enrolled by this call.
    pub added: Vec<String>,
}

#[cfg(test)]
mod tests {
    use time::macros::date;
    use uuid::Uuid;

    use super::*;

    #[test]
    fn create_round_parses_iso_dates() {
        let request: CreateRoundRequest =
            serde_json::from_str(r#"{"number": 3, "start_date": "2022-06-20"}"#).unwrap();
        assert_eq!(request.start_date, date!(2022 - 06 - 20));
        assert!(request.validate().is_ok());

        let zero: CreateRoundRequest =
            serde_json::from_str(r#"{"number": 0, "start_date": "2022-06-20"}"#).unwrap();
        assert!(zero.validate().is_err());
    }

    #[test]
    fn summaries_expose_the_last_hole_date() {
        let entity = RoundEntity {
            id: Uuid::new_v4(),
            number: 1,
            start_date: date!(2022 - 05 - 09),
        };
        assert_eq!(RoundSummary::from(&entity).end_date, date!(2022 - 05 - 26));
    }

    #[test]
    fn player_names_are_validated() {
        let request = AddPlayerRequest {
            username: "two words".into(),
            social_id: None,
            check_social: None,
        };
        assert!(request.validate().is_err());
    }
}
