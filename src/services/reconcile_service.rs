use std::collections::HashMap;

use indexmap::IndexMap;
use time::Date;
use tokio::time::sleep;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::{
    clients::{ClientError, SocialPost},
    dao::{
        models::{RoundEntity, ScoreEntity, UserEntity},
        score_store::ScoreStore,
    },
    dto::sync::{SubmitScoresRequest, SyncReport, SyncRequest},
    error::ServiceError,
    scoring::{
        HOLES_PER_ROUND, ScoreRecord,
        calendar::{self, Calendar, Round},
        normalizer::{ScoreNormalizer, fill_today},
        reconcile::{HoleRef, RoundReconciliation, SocialScore, parse_cell, reconcile_round},
    },
    services::round_service,
    state::SharedState,
};

/// Hole the sheet is normalized against on `date`, and whether that hole already counts
/// as played. Past rounds are padded to all eighteen holes; a round that has not started
/// yet cannot be reconciled.
fn sheet_window(round: &Round, date: Date) -> Result<(u8, bool), ServiceError> {
    match round.hole_for(date) {
        Some(hole) => Ok((hole, false)),
        None if date > round.end_date() => Ok((HOLES_PER_ROUND, true)),
        None => Err(ServiceError::InvalidState(format!(
            "round {} starts on {}; nothing to reconcile on {date}",
            round.number, round.start_date
        ))),
    }
}

fn puzzle_number(state: &SharedState, date: Date) -> i64 {
    Calendar::new(state.config().puzzle_epoch(), Vec::new())
        .puzzle_day_for(date)
        .number
}

fn today(state: &SharedState) -> Date {
    calendar::today(state.config().utc_offset())
}

/// Diff normalized rows against the ledger of `round` and persist the result.
///
/// Runs of the same round are serialized; the whole change set is written in one
/// storage call, so a structural error leaves the ledger untouched.
pub async fn reconcile_rows(
    state: &SharedState,
    store: &dyn ScoreStore,
    round: &RoundEntity,
    rows: &IndexMap<String, Vec<String>>,
    social: &HashMap<String, SocialScore>,
) -> Result<RoundReconciliation, ServiceError> {
    let gate = state.sync_gate(round.number);
    let _guard = gate.lock().await;

    let holes = round_service::ensure_holes(store, round).await?;
    let hole_refs: Vec<HoleRef> = holes
        .iter()
        .map(|hole| HoleRef {
            id: hole.id,
            hole_number: hole.hole_number,
        })
        .collect();
    let hole_numbers: HashMap<Uuid, u8> = holes
        .iter()
        .map(|hole| (hole.id, hole.hole_number))
        .collect();

    let players = round_service::roster(store, round).await?;
    let user_ids: HashMap<&str, Uuid> = players
        .iter()
        .map(|user| (user.username.as_str(), user.id))
        .collect();
    let usernames: HashMap<Uuid, &str> = players
        .iter()
        .map(|user| (user.id, user.username.as_str()))
        .collect();

    let mut ledgers: HashMap<String, Vec<ScoreRecord>> = players
        .iter()
        .map(|user| (user.username.clone(), Vec::new()))
        .collect();
    for score in store.list_scores(round.id).await? {
        let (Some(user), Some(hole_number)) = (
            usernames.get(&score.user_id),
            hole_numbers.get(&score.hole_id),
        ) else {
            continue;
        };
        if let Some(ledger) = ledgers.get_mut(*user) {
            ledger.push(ScoreRecord {
                user: (*user).to_owned(),
                round_number: round.number,
                hole_number: *hole_number,
                raw_score: score.score,
                social_reference: score.social_reference,
            });
        }
    }

    let outcome = reconcile_round(round.number, rows, &ledgers, social, &hole_refs)?;
    for user in &outcome.skipped_players {
        info!(round = round.number, user = %user, "player not enrolled; row skipped");
    }
    if outcome.changes.is_empty() {
        debug!(round = round.number, "ledger already up to date");
        return Ok(outcome);
    }

    let user_id = |user: &str| {
        user_ids.get(user).copied().ok_or_else(|| {
            ServiceError::InvalidState(format!("user `{user}` vanished during reconciliation"))
        })
    };

    let inserts = outcome
        .changes
        .to_create
        .iter()
        .map(|new| {
            Ok(ScoreEntity {
                user_id: user_id(&new.user)?,
                round_id: round.id,
                hole_id: new.hole_id,
                score: new.raw_score,
                social_reference: new.social_reference.clone(),
            })
        })
        .collect::<Result<Vec<_>, ServiceError>>()?;

    let updates = outcome
        .changes
        .to_update
        .iter()
        .map(|update| {
            let current = ledgers
                .get(&update.user)
                .and_then(|records| {
                    records
                        .iter()
                        .find(|record| record.hole_number == update.hole_number)
                })
                .ok_or_else(|| {
                    ServiceError::InvalidState(format!(
                        "no stored score for `{}` on hole {}",
                        update.user, update.hole_number
                    ))
                })?;
            Ok(ScoreEntity {
                user_id: user_id(&update.user)?,
                round_id: round.id,
                hole_id: update.hole_id,
                score: update.resulting_score(current.raw_score),
                social_reference: update.resulting_reference(current.social_reference.clone()),
            })
        })
        .collect::<Result<Vec<_>, ServiceError>>()?;

    store.apply_score_changes(inserts, updates).await?;
    state.reports().invalidate(round.number);
    info!(
        round = round.number,
        created = outcome.changes.to_create.len(),
        updated = outcome.changes.to_update.len(),
        "scores reconciled"
    );
    Ok(outcome)
}

/// Reconcile rows posted by a client for `round_number`.
pub async fn submit_scores(
    state: &SharedState,
    round_number: u32,
    request: SubmitScoresRequest,
) -> Result<SyncReport, ServiceError> {
    let store = state.require_score_store().await?;
    let round = round_service::get_round(store.as_ref(), round_number).await?;
    let date = request.date.unwrap_or_else(|| today(state));
    let view = Round::from(&round);
    let (current_hole, past_round) = sheet_window(&view, date)?;

    let normalizer = ScoreNormalizer::new(state.config().filler_value(), Some(current_hole));
    let include_today = request.include_today || past_round;
    let rows: IndexMap<String, Vec<String>> = request
        .rows
        .iter()
        .filter(|(name, _)| !name.trim().is_empty())
        .map(|(name, cells)| {
            (
                name.trim().to_owned(),
                normalizer.normalize(cells, include_today),
            )
        })
        .collect();

    let outcome = reconcile_rows(state, store.as_ref(), &round, &rows, &HashMap::new()).await?;
    let mut report = SyncReport::new(round_number, view.hole_for(date), puzzle_number(state, date))
        .with_changes(&outcome.changes);
    report.skipped_players = outcome.skipped_players;
    Ok(report)
}

/// Reconcile `round_number` from its spreadsheet.
pub async fn sync_round(
    state: &SharedState,
    round_number: u32,
    request: SyncRequest,
) -> Result<SyncReport, ServiceError> {
    let store = state.require_score_store().await?;
    let round = round_service::get_round(store.as_ref(), round_number).await?;
    let date = request.date.unwrap_or_else(|| today(state));
    sync_from_sheet(state, store.as_ref(), &round, date, request.check_social).await
}

/// Reconcile the round playing on `date` from its spreadsheet.
pub async fn sync_day(
    state: &SharedState,
    date: Date,
    check_social: bool,
) -> Result<SyncReport, ServiceError> {
    let store = state.require_score_store().await?;
    let calendar = round_service::calendar(state, store.as_ref()).await?;
    let day = calendar.puzzle_day_for(date);
    let Some(round_hole) = day.round_hole else {
        return Err(ServiceError::InvalidState(format!(
            "{date} (puzzle {}) is not a competition day",
            day.number
        )));
    };
    let round = round_service::get_round(store.as_ref(), round_hole.round_number).await?;
    sync_from_sheet(state, store.as_ref(), &round, date, check_social).await
}

async fn sync_from_sheet(
    state: &SharedState,
    store: &dyn ScoreStore,
    round: &RoundEntity,
    date: Date,
    check_social: bool,
) -> Result<SyncReport, ServiceError> {
    let view = Round::from(round);
    let (current_hole, past_round) = sheet_window(&view, date)?;
    let sheets = state.sheets()?;
    let playing_hole = view.hole_for(date);
    let puzzle_number = puzzle_number(state, date);

    let snapshot = sheets.fetch_round(round.number).await?;
    let normalizer = ScoreNormalizer::new(state.config().filler_value(), Some(current_hole));
    let mut rows = normalizer.normalize_sheet(&snapshot.names, &snapshot.rows, past_round);
    let mut report = SyncReport::new(round.number, playing_hole, puzzle_number);
    let mut social = HashMap::new();

    match (check_social, playing_hole) {
        (true, Some(hole)) => {
            let players = round_service::roster(store, round).await?;
            let candidates: Vec<&UserEntity> = players
                .iter()
                .filter(|user| user.check_social)
                .filter(|user| {
                    rows.get(&user.username).is_some_and(|row| {
                        row.get(usize::from(hole) - 1)
                            .and_then(|cell| parse_cell(cell))
                            .is_none()
                    })
                })
                .collect();

            let mut sheet_changed = false;
            for (user, post) in find_social_results(state, &candidates, puzzle_number).await? {
                if let Some(row) = rows.get_mut(&user) {
                    sheet_changed |= fill_today(row, hole, &post.raw_score.to_string());
                }
                social.insert(
                    user.clone(),
                    SocialScore {
                        hole_number: hole,
                        social_reference: post.post_id,
                    },
                );
                report.social_matches.push(user);
            }

            if sheet_changed {
                if sheets.can_write() {
                    sheets.write_round(&snapshot, &rows).await?;
                    report.sheet_written = true;
                } else {
                    info!(round = round.number, "sheet is read-only; social results not written back");
                }
            }
        }
        (true, None) => {
            info!(round = round.number, %date, "date outside the round; social check skipped");
        }
        (false, _) => {}
    }

    let outcome = reconcile_rows(state, store, round, &rows, &social).await?;
    let mut report = report.with_changes(&outcome.changes);
    report.skipped_players = outcome.skipped_players;
    Ok(report)
}

/// Search the social platform for each candidate's result of `puzzle_number`.
///
/// Searches run one after the other with the configured delay in between; a failed
/// search only skips that player.
async fn find_social_results(
    state: &SharedState,
    candidates: &[&UserEntity],
    puzzle_number: i64,
) -> Result<Vec<(String, SocialPost)>, ServiceError> {
    let client = state.social()?;
    let mut found = Vec::new();

    for (index, user) in candidates.iter().enumerate() {
        if index > 0 {
            sleep(client.request_delay()).await;
        }
        match client.user_posts(&user.username).await {
            Ok(posts) => {
                if let Some(post) = posts
                    .into_iter()
                    .find(|post| post.puzzle_number == puzzle_number)
                {
                    debug!(user = %user.username, score = post.raw_score, "social result found");
                    found.push((user.username.clone(), post));
                }
            }
            Err(err @ ClientError::MissingSetting { .. }) => return Err(err.into()),
            Err(err) => {
                warn!(user = %user.username, error = %err, "social search failed; skipping player");
            }
        }
    }

    Ok(found)
}
