use std::collections::HashMap;

use time::Date;
use tracing::{info, warn};
use uuid::Uuid;

use crate::{
    clients::ClientError,
    dao::{
        models::{EnrollmentEntity, HoleEntity, RoundEntity, UserEntity},
        score_store::ScoreStore,
    },
    dto::{
        calendar::PuzzleDayResponse,
        round::{AddPlayerRequest, PlayerSummary, RosterResponse, RoundSummary},
    },
    error::ServiceError,
    scoring::{
        HOLES_PER_ROUND,
        calendar::{Calendar, Round},
    },
    state::SharedState,
};

/// Calendar built from every stored round.
pub async fn calendar(state: &SharedState, store: &dyn ScoreStore) -> Result<Calendar, ServiceError> {
    let rounds = store.list_rounds().await?;
    Ok(Calendar::new(
        state.config().puzzle_epoch(),
        rounds.iter().map(Round::from).collect(),
    ))
}

pub async fn puzzle_day_for_date(
    state: &SharedState,
    date: Option<Date>,
) -> Result<PuzzleDayResponse, ServiceError> {
    let store = state.require_score_store().await?;
    let calendar = calendar(state, store.as_ref()).await?;
    let day = match date {
        Some(date) => calendar.puzzle_day_for(date),
        None => calendar.today(state.config().utc_offset()),
    };
    Ok(day.into())
}

pub async fn puzzle_day_for_number(
    state: &SharedState,
    number: i64,
) -> Result<PuzzleDayResponse, ServiceError> {
    let store = state.require_score_store().await?;
    let calendar = calendar(state, store.as_ref()).await?;
    Ok(calendar.puzzle_day(number)?.into())
}

/// Stored round or [`ServiceError::NotFound`].
pub async fn get_round(store: &dyn ScoreStore, number: u32) -> Result<RoundEntity, ServiceError> {
    store
        .find_round(number)
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("round {number}")))
}

pub async fn list_rounds(state: &SharedState) -> Result<Vec<RoundSummary>, ServiceError> {
    let store = state.require_score_store().await?;
    let mut rounds = store.list_rounds().await?;
    rounds.sort_by_key(|round| round.number);
    Ok(rounds.iter().map(RoundSummary::from).collect())
}

/// Create a round and its holes.
///
/// Creating an existing round again with the same start date only ensures its holes.
pub async fn create_round(
    state: &SharedState,
    number: u32,
    start_date: Date,
) -> Result<RoundSummary, ServiceError> {
    let store = state.require_score_store().await?;

    let round = match store.find_round(number).await? {
        Some(existing) if existing.start_date == start_date => existing,
        Some(existing) => {
            return Err(ServiceError::InvalidState(format!(
                "round {number} already starts on {}",
                existing.start_date
            )));
        }
        None => {
            let candidate = Round::new(number, start_date);
            let rounds = store.list_rounds().await?;
            if let Some(clash) = rounds
                .iter()
                .map(Round::from)
                .find(|other| other.overlaps(&candidate))
            {
                return Err(ServiceError::InvalidState(format!(
                    "round {number} would overlap round {}",
                    clash.number
                )));
            }

            let entity = RoundEntity {
                id: Uuid::new_v4(),
                number,
                start_date,
            };
            store.save_round(entity).await?;
            info!(round = number, start = %start_date, "round created");
            entity
        }
    };

    ensure_holes(store.as_ref(), &round).await?;
    Ok(RoundSummary::from(&round))
}

/// Make sure all eighteen holes exist, returning them ordered by number.
pub async fn ensure_holes(
    store: &dyn ScoreStore,
    round: &RoundEntity,
) -> Result<Vec<HoleEntity>, ServiceError> {
    let existing = store.list_holes(round.id).await?;
    let missing: Vec<HoleEntity> = (1..=HOLES_PER_ROUND)
        .filter(|number| existing.iter().all(|hole| hole.hole_number != *number))
        .map(|hole_number| HoleEntity {
            id: Uuid::new_v4(),
            round_id: round.id,
            hole_number,
        })
        .collect();

    let mut holes = if missing.is_empty() {
        existing
    } else {
        store.save_holes(missing).await?;
        store.list_holes(round.id).await?
    };
    holes.sort_by_key(|hole| hole.hole_number);
    Ok(holes)
}

/// Users enrolled in `round`, ordered by username.
pub async fn roster(
    store: &dyn ScoreStore,
    round: &RoundEntity,
) -> Result<Vec<UserEntity>, ServiceError> {
    let enrollments = store.list_enrollments(round.id).await?;
    let mut users: Vec<UserEntity> = store
        .list_users()
        .await?
        .into_iter()
        .filter(|user| {
            enrollments
                .iter()
                .any(|enrollment| enrollment.user_id == user.id)
        })
        .collect();
    users.sort_by(|a, b| a.username.cmp(&b.username));
    Ok(users)
}

pub async fn list_players(
    state: &SharedState,
    number: u32,
) -> Result<Vec<PlayerSummary>, ServiceError> {
    let store = state.require_score_store().await?;
    let round = get_round(store.as_ref(), number).await?;
    Ok(roster(store.as_ref(), &round)
        .await?
        .into_iter()
        .map(PlayerSummary::from)
        .collect())
}

/// Stored user, created on first sight.
///
/// A new user without a known platform id is looked up on the social platform; when that
/// fails the id becomes `"{username}-NA"` and social checks are disabled.
async fn ensure_user(
    state: &SharedState,
    store: &dyn ScoreStore,
    username: &str,
    social_id: Option<String>,
    check_social: bool,
) -> Result<UserEntity, ServiceError> {
    if let Some(user) = store.find_user(username.to_owned()).await? {
        return Ok(user);
    }

    let social_id = match social_id {
        Some(id) => Some(id),
        None if check_social => lookup_social_id(state, username).await,
        None => None,
    };
    let user = UserEntity {
        id: Uuid::new_v4(),
        username: username.to_owned(),
        check_social: check_social && social_id.is_some(),
        social_id: social_id.unwrap_or_else(|| format!("{username}-NA")),
    };
    store.save_user(user.clone()).await?;
    info!(user = %username, check_social = user.check_social, "user created");
    Ok(user)
}

async fn lookup_social_id(state: &SharedState, username: &str) -> Option<String> {
    let client = state.social().ok()?;
    match client.lookup_user_id(username).await {
        Ok(Some(id)) => Some(id),
        Ok(None) => {
            warn!(user = %username, "no social id found; disabling social check");
            None
        }
        Err(ClientError::MissingSetting { .. }) => None,
        Err(err) => {
            warn!(user = %username, error = %err, "social id lookup failed");
            None
        }
    }
}

async fn enroll(
    state: &SharedState,
    store: &dyn ScoreStore,
    round: &RoundEntity,
    user: &UserEntity,
) -> Result<(), ServiceError> {
    store
        .enroll(EnrollmentEntity {
            user_id: user.id,
            round_id: round.id,
        })
        .await?;
    state.reports().invalidate(round.number);
    Ok(())
}

/// Add a player to a round, creating the user when needed.
pub async fn add_player(
    state: &SharedState,
    number: u32,
    request: AddPlayerRequest,
) -> Result<PlayerSummary, ServiceError> {
    let store = state.require_score_store().await?;
    let round = get_round(store.as_ref(), number).await?;
    let user = ensure_user(
        state,
        store.as_ref(),
        &request.username,
        request.social_id,
        request.check_social.unwrap_or(true),
    )
    .await?;
    enroll(state, store.as_ref(), &round, &user).await?;
    info!(round = number, user = %user.username, "player enrolled");
    Ok(user.into())
}

/// Withdraw a player from a round. Their scores stay in the ledger.
pub async fn remove_player(
    state: &SharedState,
    number: u32,
    username: &str,
) -> Result<(), ServiceError> {
    let store = state.require_score_store().await?;
    let round = get_round(store.as_ref(), number).await?;
    let user = store
        .find_user(username.to_owned())
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("user `{username}`")))?;

    let removed = store
        .unenroll(EnrollmentEntity {
            user_id: user.id,
            round_id: round.id,
        })
        .await?;
    if !removed {
        return Err(ServiceError::NotFound(format!(
            "user `{username}` is not enrolled in round {number}"
        )));
    }
    state.reports().invalidate(number);
    info!(round = number, user = %username, "player withdrawn");
    Ok(())
}

/// Enroll every player of `from_round` into `to_round`.
pub async fn copy_players(
    state: &SharedState,
    to_round: u32,
    from_round: u32,
) -> Result<RosterResponse, ServiceError> {
    if to_round == from_round {
        return Err(ServiceError::InvalidInput(
            "cannot copy a round's players onto itself".into(),
        ));
    }
    let store = state.require_score_store().await?;
    let source = get_round(store.as_ref(), from_round).await?;
    let target = get_round(store.as_ref(), to_round).await?;

    let already: Vec<Uuid> = roster(store.as_ref(), &target)
        .await?
        .iter()
        .map(|user| user.id)
        .collect();
    let mut added = Vec::new();
    for user in roster(store.as_ref(), &source).await? {
        if already.contains(&user.id) {
            continue;
        }
        enroll(state, store.as_ref(), &target, &user).await?;
        added.push(user.username);
    }
    info!(from = from_round, to = to_round, added = added.len(), "players copied");

    roster_response(store.as_ref(), &target, added).await
}

/// Enroll every player listed on the round's spreadsheet.
pub async fn sync_players(state: &SharedState, number: u32) -> Result<RosterResponse, ServiceError> {
    let store = state.require_score_store().await?;
    let round = get_round(store.as_ref(), number).await?;
    let snapshot = state.sheets()?.fetch_round(number).await?;

    let enrolled: HashMap<String, Uuid> = roster(store.as_ref(), &round)
        .await?
        .into_iter()
        .map(|user| (user.username, user.id))
        .collect();
    let mut added = Vec::new();
    for username in snapshot.players() {
        if enrolled.contains_key(&username) {
            continue;
        }
        let user = ensure_user(state, store.as_ref(), &username, None, true).await?;
        enroll(state, store.as_ref(), &round, &user).await?;
        added.push(username);
    }
    info!(round = number, added = added.len(), "roster synced from sheet");

    roster_response(store.as_ref(), &round, added).await
}

async fn roster_response(
    store: &dyn ScoreStore,
    round: &RoundEntity,
    added: Vec<String>,
) -> Result<RosterResponse, ServiceError> {
    Ok(RosterResponse {
        round_number: round.number,
        players: roster(store, round)
            .await?
            .into_iter()
            .map(|user| user.username)
            .collect(),
        added,
    })
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use time::macros::date;

    use crate::{config::AppConfig, dao::score_store::InMemoryScoreStore, state::AppState};

    use super::*;

    async fn state() -> SharedState {
        let state = AppState::new(AppConfig::default());
        state
            .set_score_store(Arc::new(InMemoryScoreStore::new()))
            .await;
        state
    }

    fn player(username: &str) -> AddPlayerRequest {
        AddPlayerRequest {
            username: username.into(),
            social_id: Some(format!("{username}-id")),
            check_social: None,
        }
    }

    #[tokio::test]
    async fn creating_a_round_creates_its_holes_once() {
        let state = state().await;
        create_round(&state, 1, date!(2022 - 05 - 09)).await.unwrap();
        create_round(&state, 1, date!(2022 - 05 - 09)).await.unwrap();

        let store = state.require_score_store().await.unwrap();
        let round = get_round(store.as_ref(), 1).await.unwrap();
        let holes = store.list_holes(round.id).await.unwrap();
        assert_eq!(holes.len(), 18);
    }

    #[tokio::test]
    async fn conflicting_rounds_are_rejected() {
        let state = state().await;
        create_round(&state, 1, date!(2022 - 05 - 09)).await.unwrap();

        assert!(matches!(
            create_round(&state, 1, date!(2022 - 05 - 10)).await,
            Err(ServiceError::InvalidState(_))
        ));
        assert!(matches!(
            create_round(&state, 2, date!(2022 - 05 - 20)).await,
            Err(ServiceError::InvalidState(_))
        ));
        assert!(create_round(&state, 2, date!(2022 - 05 - 27)).await.is_ok());
    }

    #[tokio::test]
    async fn players_are_enrolled_copied_and_withdrawn() {
        let state = state().await;
        create_round(&state, 1, date!(2022 - 05 - 09)).await.unwrap();
        create_round(&state, 2, date!(2022 - 05 - 27)).await.unwrap();

        add_player(&state, 1, player("bob")).await.unwrap();
        add_player(&state, 1, player("alice")).await.unwrap();
        add_player(&state, 2, player("alice")).await.unwrap();

        let copied = copy_players(&state, 2, 1).await.unwrap();
        assert_eq!(copied.added, vec!["bob"]);
        assert_eq!(copied.players, vec!["alice", "bob"]);

        remove_player(&state, 2, "bob").await.unwrap();
        assert!(matches!(
            remove_player(&state, 2, "bob").await,
            Err(ServiceError::NotFound(_))
        ));
        let names: Vec<String> = list_players(&state, 2)
            .await
            .unwrap()
            .into_iter()
            .map(|player| player.username)
            .collect();
        assert_eq!(names, vec!["alice"]);
    }

    #[tokio::test]
    async fn unknown_social_ids_disable_the_social_check() {
        let state = state().await;
        create_round(&state, 1, date!(2022 - 05 - 09)).await.unwrap();
        let summary = add_player(
            &state,
            1,
            AddPlayerRequest {
                username: "carol".into(),
                social_id: None,
                check_social: None,
            },
        )
        .await
        .unwrap();
        assert_eq!(summary.social_id, "carol-NA");
        assert!(!summary.check_social);
    }

    #[tokio::test]
    async fn calendar_lookups_use_stored_rounds() {
        let state = state().await;
        create_round(&state, 1, date!(2022 - 05 - 09)).await.unwrap();
        let day = puzzle_day_for_date(&state, Some(date!(2022 - 05 - 10)))
            .await
            .unwrap();
        assert_eq!(day.number, 325);
        assert_eq!(day.round_number, Some(1));
        assert_eq!(day.hole_number, Some(2));

        let by_number = puzzle_day_for_number(&state, 324).await.unwrap();
        assert_eq!(by_number.hole_number, Some(1));
    }
}
