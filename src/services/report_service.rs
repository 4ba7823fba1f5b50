use std::{collections::HashMap, sync::Arc};

use tracing::debug;

use crate::{
    dto::report::{
        BreakdownEntry, BreakdownResponse, HoleStats, LeaderboardEntry, LeaderboardResponse,
        MissingResponse, RaceDay, RaceResponse, StatsResponse,
    },
    error::ServiceError,
    scoring::{
        HOLES_PER_ROUND, ScoreName, ScoreRecord,
        calendar::{self, Round},
    },
    services::round_service,
    state::{RoundReport, SharedState},
};

/// Joined view of `round_number`, served from the cache while fresh.
pub async fn round_report(
    state: &SharedState,
    round_number: u32,
) -> Result<Arc<RoundReport>, ServiceError> {
    if let Some(report) = state.reports().get(round_number) {
        return Ok(report);
    }

    let generation = state.reports().generation(round_number);
    let store = state.require_score_store().await?;
    let round = round_service::get_round(store.as_ref(), round_number).await?;
    let holes = store.list_holes(round.id).await?;
    let players = round_service::roster(store.as_ref(), &round).await?;

    let hole_numbers: HashMap<_, _> = holes
        .iter()
        .map(|hole| (hole.id, hole.hole_number))
        .collect();
    let roster_position: HashMap<_, _> = players
        .iter()
        .enumerate()
        .map(|(index, user)| (user.id, (index, user.username.as_str())))
        .collect();

    let mut keyed: Vec<((u8, usize), ScoreRecord)> = store
        .list_scores(round.id)
        .await?
        .into_iter()
        .filter_map(|score| {
            let hole_number = *hole_numbers.get(&score.hole_id)?;
            let (position, user) = *roster_position.get(&score.user_id)?;
            Some((
                (hole_number, position),
                ScoreRecord {
                    user: user.to_owned(),
                    round_number,
                    hole_number,
                    raw_score: score.score,
                    social_reference: score.social_reference,
                },
            ))
        })
        .collect();
    keyed.sort_by_key(|(key, _)| *key);

    debug!(round = round_number, records = keyed.len(), "round report built");
    Ok(state.reports().insert(
        RoundReport {
            round: Round::from(&round),
            roster: players.into_iter().map(|user| user.username).collect(),
            records: keyed.into_iter().map(|(_, record)| record).collect(),
        },
        generation,
    ))
}

/// Players with at least one score, best golf score first.
pub async fn leaderboard(
    state: &SharedState,
    round_number: u32,
) -> Result<LeaderboardResponse, ServiceError> {
    let report = round_report(state, round_number).await?;
    let mut rows: Vec<_> = report.matrix().by_user().into_values().collect();
    rows.sort_by_key(|row| row.golf_score());

    Ok(LeaderboardResponse {
        round_number,
        entries: rows
            .iter()
            .enumerate()
            .map(|(index, row)| LeaderboardEntry::new(index + 1, row, HOLES_PER_ROUND))
            .collect(),
    })
}

pub async fn hole_stats(
    state: &SharedState,
    round_number: u32,
) -> Result<StatsResponse, ServiceError> {
    let report = round_report(state, round_number).await?;
    Ok(StatsResponse {
        round_number,
        holes: report
            .matrix()
            .by_hole()
            .iter()
            .filter_map(|(hole_number, stats)| HoleStats::new(*hole_number, stats))
            .collect(),
    })
}

pub async fn breakdown(
    state: &SharedState,
    round_number: u32,
) -> Result<BreakdownResponse, ServiceError> {
    let report = round_report(state, round_number).await?;
    let entries = report
        .matrix()
        .score_breakdown()
        .into_iter()
        .filter_map(|(label, counts)| {
            let name = ScoreName::ALL.into_iter().find(|name| name.label() == label)?;
            Some(BreakdownEntry {
                label: label.to_owned(),
                raw_score: name.raw_score(),
                counts,
            })
        })
        .collect();
    Ok(BreakdownResponse {
        round_number,
        entries,
    })
}

/// Cumulative standings after each played hole.
pub async fn race(
    state: &SharedState,
    round_number: u32,
    limit: Option<usize>,
) -> Result<RaceResponse, ServiceError> {
    let report = round_report(state, round_number).await?;
    Ok(RaceResponse {
        round_number,
        days: report
            .matrix()
            .top_by_day(limit)
            .into_iter()
            .map(RaceDay::from)
            .collect(),
    })
}

/// Enrolled players without a score on `hole`, which defaults to the hole played today.
pub async fn missing(
    state: &SharedState,
    round_number: u32,
    hole: Option<u8>,
) -> Result<MissingResponse, ServiceError> {
    let report = round_report(state, round_number).await?;
    let hole_number = match hole {
        Some(hole) => hole,
        None => {
            let today = calendar::today(state.config().utc_offset());
            match report.round.hole_for(today) {
                Some(hole) => hole,
                None if today > report.round.end_date() => HOLES_PER_ROUND,
                None => {
                    return Err(ServiceError::InvalidState(format!(
                        "round {round_number} has not started"
                    )));
                }
            }
        }
    };

    Ok(MissingResponse {
        round_number,
        hole_number,
        players: report
            .matrix()
            .players_missing(&report.roster, hole_number),
    })
}

#[cfg(test)]
mod tests {
    use indexmap::IndexMap;
    use time::macros::date;

    use crate::{
        config::AppConfig,
        dao::score_store::{InMemoryScoreStore, ScoreStore},
        dto::{round::AddPlayerRequest, sync::SubmitScoresRequest},
        services::reconcile_service,
        state::AppState,
    };

    use super::*;

    async fn played_round() -> SharedState {
        let state = AppState::new(AppConfig::default());
        state
            .set_score_store(Arc::new(InMemoryScoreStore::new()))
            .await;
        round_service::create_round(&state, 1, date!(2022 - 05 - 09))
            .await
            .unwrap();
        for player in ["alice", "bob", "carol"] {
            round_service::add_player(
                &state,
                1,
                AddPlayerRequest {
                    username: player.into(),
                    social_id: None,
                    check_social: Some(false),
                },
            )
            .await
            .unwrap();
        }

        let rows: IndexMap<String, Vec<String>> = [
            ("bob", vec!["6", "7"]),
            ("alice", vec!["3", "4", "2"]),
        ]
        .into_iter()
        .map(|(name, cells)| (name.to_owned(), cells.into_iter().map(str::to_owned).collect()))
        .collect();
        reconcile_service::submit_scores(
            &state,
            1,
            SubmitScoresRequest {
                rows,
                date: Some(date!(2022 - 05 - 11)),
                include_today: true,
            },
        )
        .await
        .unwrap();
        state
    }

    #[tokio::test]
    async fn leaderboard_orders_by_golf_score() {
        let state = played_round().await;
        let board = leaderboard(&state, 1).await.unwrap();

        let users: Vec<_> = board.entries.iter().map(|entry| entry.user.as_str()).collect();
        assert_eq!(users, vec!["alice", "bob"]);
        assert_eq!(board.entries[0].golf_score, -3);
        assert_eq!(board.entries[0].position, 1);
        // bob's blank third hole was padded with the fail score.
        assert_eq!(board.entries[1].total, 20);
        assert_eq!(board.entries[1].holes.len(), 18);
    }

    #[tokio::test]
    async fn reports_are_cached_until_scores_change() {
        let state = played_round().await;
        let first = round_report(&state, 1).await.unwrap();
        let second = round_report(&state, 1).await.unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(first.roster, vec!["alice", "bob", "carol"]);
        assert_eq!(first.records[0].user, "alice");
        assert_eq!(first.records[1].user, "bob");
    }

    #[tokio::test]
    async fn new_scores_replace_the_cached_report() {
        let state = played_round().await;
        let before = round_report(&state, 1).await.unwrap();
        assert_eq!(before.records.len(), 6);

        let rows: IndexMap<String, Vec<String>> =
            [("carol".to_owned(), vec!["2".to_owned()])].into_iter().collect();
        reconcile_service::submit_scores(
            &state,
            1,
            SubmitScoresRequest {
                rows,
                date: Some(date!(2022 - 05 - 10)),
                include_today: false,
            },
        )
        .await
        .unwrap();

        let after = round_report(&state, 1).await.unwrap();
        assert!(!Arc::ptr_eq(&before, &after));
        assert_eq!(after.records.len(), 7);
        assert_eq!(missing(&state, 1, Some(1)).await.unwrap().players, Vec::<String>::new());
    }

    #[tokio::test]
    async fn building_a_report_writes_nothing() {
        let state = AppState::new(AppConfig::default());
        let store = Arc::new(InMemoryScoreStore::new());
        state.set_score_store(store.clone()).await;
        let round = crate::dao::models::RoundEntity {
            id: uuid::Uuid::new_v4(),
            number: 4,
            start_date: date!(2022 - 08 - 01),
        };
        store.save_round(round).await.unwrap();

        let report = round_report(&state, 4).await.unwrap();
        assert!(report.records.is_empty());
        assert!(store.list_holes(round.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn stats_and_breakdown_cover_played_holes() {
        let state = played_round().await;

        let stats = hole_stats(&state, 1).await.unwrap();
        assert_eq!(stats.holes.len(), 3);
        assert_eq!(stats.holes[0].count, 2);
        assert_eq!(stats.holes[0].total, 9);

        let breakdown = breakdown(&state, 1).await.unwrap();
        let fails = breakdown
            .entries
            .iter()
            .find(|entry| entry.raw_score == 7)
            .unwrap();
        assert_eq!(fails.counts.get(&2), Some(&1));
        assert_eq!(fails.counts.get(&3), Some(&1));
    }

    #[tokio::test]
    async fn race_tracks_cumulative_leaders() {
        let state = played_round().await;
        let race = race(&state, 1, Some(1)).await.unwrap();
        assert_eq!(race.days.len(), 3);
        assert!(race.days.iter().all(|day| day.standings.len() == 1));
        assert_eq!(race.days[2].standings[0].user, "alice");
    }

    #[tokio::test]
    async fn missing_lists_enrolled_players_without_a_score() {
        let state = played_round().await;
        let missing = missing(&state, 1, Some(2)).await.unwrap();
        assert_eq!(missing.players, vec!["carol"]);
    }

    #[tokio::test]
    async fn unknown_rounds_are_not_found() {
        let state = played_round().await;
        assert!(matches!(
            leaderboard(&state, 9).await,
            Err(ServiceError::NotFound(_))
        ));
    }
}
