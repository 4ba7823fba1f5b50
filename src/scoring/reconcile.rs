//! Diffing of incoming sheet rows against the persisted score ledger.
//!
//! The output is a [`ChangeSet`] describing exactly which records must be inserted and
//! which fields of existing records changed. Running the diff again after the change set
//! has been applied yields an empty change set.

use std::collections::HashMap;

use indexmap::IndexMap;
use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

use super::{FAIL_SCORE, ScoreRecord};

/// Structural failures that abort a reconciliation run.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ReconcileError {
    /// A row reaches past the holes stored for the round.
    #[error("round {round_number} has no hole {hole_number}")]
    UnknownHole {
        /// Round being reconciled.
        round_number: u32,
        /// Hole the offending cell maps to.
        hole_number: u8,
    },
}

/// Storage identity of a hole within the round being reconciled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HoleRef {
    /// Storage id of the hole.
    pub id: Uuid,
    /// 1 to 18.
    pub hole_number: u8,
}

/// Score observed on the social platform for the day being reconciled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SocialScore {
    /// Hole the post was published for.
    pub hole_number: u8,
    /// Post identifier.
    pub social_reference: String,
}

/// Persisted records of one enrolled player for one round.
#[derive(Debug, Clone, Copy)]
pub struct PlayerLedger<'a> {
    /// Enrolled username.
    pub user: &'a str,
    /// Round the ledger covers.
    pub round_number: u32,
    /// Every stored score of `user` in the round.
    pub records: &'a [ScoreRecord],
}

/// Record to insert.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewScore {
    /// Player the score belongs to.
    pub user: String,
    /// Round being reconciled.
    pub round_number: u32,
    /// Hole the cell maps to.
    pub hole_number: u8,
    /// Storage id of `hole_number`.
    #[serde(skip)]
    pub hole_id: Uuid,
    /// Parsed cell value.
    pub raw_score: u8,
    /// Set when the score was taken from a social post.
    pub social_reference: Option<String>,
}

/// Old and new value of a changed field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldChange<T> {
    /// Stored value.
    pub from: T,
    /// Incoming value.
    pub to: T,
}

/// Delta against an existing record; fields left `None` did not change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScoreUpdate {
    /// Player owning the record.
    pub user: String,
    /// Round being reconciled.
    pub round_number: u32,
    /// Hole of the stored record.
    pub hole_number: u8,
    /// Storage id of `hole_number`.
    #[serde(skip)]
    pub hole_id: Uuid,
    /// Raw score change.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub score: Option<FieldChange<u8>>,
    /// Social reference change.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub social_reference: Option<FieldChange<Option<String>>>,
}

impl ScoreUpdate {
    /// Score the record holds once the update is applied.
    pub fn resulting_score(&self, current: u8) -> u8 {
        self.score.as_ref().map_or(current, |change| change.to)
    }

    /// Social reference the record holds once the update is applied.
    pub fn resulting_reference(&self, current: Option<String>) -> Option<String> {
        match &self.social_reference {
            Some(change) => change.to.clone(),
            None => current,
        }
    }
}

/// Mutations computed by a reconciliation run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ChangeSet {
    /// Scores with no stored record yet.
    pub to_create: Vec<NewScore>,
    /// Stored records that differ from the incoming value.
    pub to_update: Vec<ScoreUpdate>,
}

impl ChangeSet {
    /// Whether nothing needs to be written.
    pub fn is_empty(&self) -> bool {
        self.to_create.is_empty() && self.to_update.is_empty()
    }

    /// Append `other`, keeping creations and updates in arrival order.
    pub fn merge(&mut self, other: ChangeSet) {
        self.to_create.extend(other.to_create);
        self.to_update.extend(other.to_update);
    }
}

/// Parse a cell into a raw score; anything that is not an integer in 1..=7 is `None`.
pub fn parse_cell(cell: &str) -> Option<u8> {
    cell.trim()
        .parse::<u8>()
        .ok()
        .filter(|score| (1..=FAIL_SCORE).contains(score))
}

/// Compute the change set for one player.
///
/// `incoming[0]` is hole 1. Cells that do not parse are skipped; a player without a
/// ledger (not enrolled in the round) yields an empty change set. A parsed cell whose
/// hole has no entry in `known_holes` aborts with [`ReconcileError::UnknownHole`].
pub fn diff(
    incoming: &[String],
    ledger: Option<PlayerLedger<'_>>,
    social: Option<&SocialScore>,
    known_holes: &[HoleRef],
) -> Result<ChangeSet, ReconcileError> {
    let mut changes = ChangeSet::default();
    let Some(ledger) = ledger else {
        return Ok(changes);
    };

    for (index, cell) in incoming.iter().enumerate() {
        let Ok(hole_number) = u8::try_from(index + 1) else {
            break;
        };
        let Some(raw_score) = parse_cell(cell) else {
            continue;
        };

        let hole = known_holes
            .iter()
            .find(|hole| hole.hole_number == hole_number)
            .ok_or(ReconcileError::UnknownHole {
                round_number: ledger.round_number,
                hole_number,
            })?;

        let social_reference = social
            .filter(|social| social.hole_number == hole_number)
            .map(|social| social.social_reference.clone());

        let existing = ledger
            .records
            .iter()
            .find(|record| record.hole_number == hole_number);

        match existing {
            None => changes.to_create.push(NewScore {
                user: ledger.user.to_owned(),
                round_number: ledger.round_number,
                hole_number,
                hole_id: hole.id,
                raw_score,
                social_reference,
            }),
            Some(saved) => {
                let score = (saved.raw_score != raw_score).then_some(FieldChange {
                    from: saved.raw_score,
                    to: raw_score,
                });
                let social_reference = (saved.social_reference != social_reference).then(|| {
                    FieldChange {
                        from: saved.social_reference.clone(),
                        to: social_reference,
                    }
                });
                if score.is_some() || social_reference.is_some() {
                    changes.to_update.push(ScoreUpdate {
                        user: ledger.user.to_owned(),
                        round_number: ledger.round_number,
                        hole_number,
                        hole_id: hole.id,
                        score,
                        social_reference,
                    });
                }
            }
        }
    }

    Ok(changes)
}

/// Outcome of reconciling every sheet row of a round.
#[derive(Debug, Clone, Default)]
pub struct RoundReconciliation {
    /// Merged changes of every enrolled player.
    pub changes: ChangeSet,
    /// Sheet players skipped because they are not enrolled in the round.
    pub skipped_players: Vec<String>,
}

/// Run [`diff`] for every sheet row and merge the results.
///
/// `ledgers` holds one entry per enrolled player (possibly with no records yet).
/// The first structural error aborts the whole round.
pub fn reconcile_round(
    round_number: u32,
    incoming: &IndexMap<String, Vec<String>>,
    ledgers: &HashMap<String, Vec<ScoreRecord>>,
    social: &HashMap<String, SocialScore>,
    known_holes: &[HoleRef],
) -> Result<RoundReconciliation, ReconcileError> {
    let mut outcome = RoundReconciliation::default();

    for (user, row) in incoming {
        let Some(records) = ledgers.get(user) else {
            outcome.skipped_players.push(user.clone());
            continue;
        };
        let ledger = PlayerLedger {
            user,
            round_number,
            records,
        };
        let changes = diff(row, Some(ledger), social.get(user), known_holes)?;
        outcome.changes.merge(changes);
    }

    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn holes(count: u8) -> Vec<HoleRef> {
        (1..=count)
            .map(|hole_number| HoleRef {
                id: Uuid::new_v4(),
                hole_number,
            })
            .collect()
    }

    fn cells(values: &[&str]) -> Vec<String> {
        values.iter().map(|value| value.to_string()).collect()
    }

    fn record(hole_number: u8, raw_score: u8, social_reference: Option<&str>) -> ScoreRecord {
        ScoreRecord {
            user: "alice".into(),
            round_number: 2,
            hole_number,
            raw_score,
            social_reference: social_reference.map(str::to_owned),
        }
    }

    fn ledger(records: &[ScoreRecord]) -> Option<PlayerLedger<'_>> {
        Some(PlayerLedger {
            user: "alice",
            round_number: 2,
            records,
        })
    }

    /// Apply a change set to an in-memory ledger the way storage would.
    fn apply(records: &mut Vec<ScoreRecord>, changes: &ChangeSet) {
        for update in &changes.to_update {
            let saved = records
                .iter_mut()
                .find(|record| record.hole_number == update.hole_number)
                .unwrap();
            saved.raw_score = update.resulting_score(saved.raw_score);
            saved.social_reference = update.resulting_reference(saved.social_reference.take());
        }
        for create in &changes.to_create {
            records.push(ScoreRecord {
                user: create.user.clone(),
                round_number: create.round_number,
                hole_number: create.hole_number,
                raw_score: create.raw_score,
                social_reference: create.social_reference.clone(),
            });
        }
    }

    #[test]
    fn unchanged_holes_are_excluded_and_new_holes_created() {
        let known = holes(18);
        let persisted = vec![record(1, 3, None)];

        let changes = diff(&cells(&["3", "4", "6"]), ledger(&persisted), None, &known).unwrap();

        assert!(changes.to_update.is_empty());
        let created: Vec<(u8, u8)> = changes
            .to_create
            .iter()
            .map(|create| (create.hole_number, create.raw_score))
            .collect();
        assert_eq!(created, vec![(2, 4), (3, 6)]);
        assert_eq!(changes.to_create[0].hole_id, known[1].id);
        assert!(changes.to_create.iter().all(|c| c.social_reference.is_none()));
    }

    #[test]
    fn matching_social_score_annotates_the_created_record() {
        let social = SocialScore {
            hole_number: 1,
            social_reference: "abc".into(),
        };
        let changes = diff(&cells(&["5"]), ledger(&[]), Some(&social), &holes(18)).unwrap();

        assert_eq!(changes.to_create.len(), 1);
        let created = &changes.to_create[0];
        assert_eq!(created.hole_number, 1);
        assert_eq!(created.raw_score, 5);
        assert_eq!(created.social_reference.as_deref(), Some("abc"));
    }

    #[test]
    fn social_score_for_another_hole_is_not_attached() {
        let social = SocialScore {
            hole_number: 2,
            social_reference: "abc".into(),
        };
        let changes = diff(&cells(&["5"]), ledger(&[]), Some(&social), &holes(18)).unwrap();
        assert_eq!(changes.to_create[0].social_reference, None);
    }

    #[test]
    fn sheet_corrections_win_over_persisted_scores() {
        let persisted = vec![record(1, 7, None), record(2, 4, None)];
        let changes = diff(&cells(&["3", "4"]), ledger(&persisted), None, &holes(18)).unwrap();

        assert!(changes.to_create.is_empty());
        assert_eq!(changes.to_update.len(), 1);
        let update = &changes.to_update[0];
        assert_eq!(update.hole_number, 1);
        assert_eq!(update.score, Some(FieldChange { from: 7, to: 3 }));
        assert_eq!(update.social_reference, None);
    }

    #[test]
    fn reference_only_changes_keep_the_score() {
        let persisted = vec![record(1, 4, None)];
        let social = SocialScore {
            hole_number: 1,
            social_reference: "post-1".into(),
        };
        let changes =
            diff(&cells(&["4"]), ledger(&persisted), Some(&social), &holes(18)).unwrap();

        let update = &changes.to_update[0];
        assert_eq!(update.score, None);
        assert_eq!(
            update.social_reference,
            Some(FieldChange {
                from: None,
                to: Some("post-1".into())
            })
        );
        assert_eq!(update.resulting_score(4), 4);
    }

    #[test]
    fn unparseable_cells_are_skipped() {
        let changes = diff(
            &cells(&["X", "", "four", "0", "9", "2"]),
            ledger(&[]),
            None,
            &holes(18),
        )
        .unwrap();
        assert_eq!(changes.to_create.len(), 1);
        assert_eq!(changes.to_create[0].hole_number, 6);
    }

    #[test]
    fn unknown_hole_is_a_configuration_error() {
        let err = diff(&cells(&["3", "4", "5"]), ledger(&[]), None, &holes(2)).unwrap_err();
        assert_eq!(
            err,
            ReconcileError::UnknownHole {
                round_number: 2,
                hole_number: 3
            }
        );
    }

    #[test]
    fn player_without_ledger_is_skipped() {
        let changes = diff(&cells(&["3", "4"]), None, None, &[]).unwrap();
        assert!(changes.is_empty());
    }

    #[test]
    fn rerunning_after_apply_yields_no_changes() {
        let known = holes(18);
        let social = SocialScore {
            hole_number: 3,
            social_reference: "post-9".into(),
        };
        let incoming = cells(&["3", "7", "4", "", "5"]);
        let mut persisted = vec![record(1, 5, None), record(2, 7, Some("old"))];

        let first = diff(&incoming, ledger(&persisted), Some(&social), &known).unwrap();
        assert!(!first.is_empty());
        apply(&mut persisted, &first);

        let second = diff(&incoming, ledger(&persisted), Some(&social), &known).unwrap();
        assert!(second.is_empty(), "unexpected changes: {second:?}");
    }

    #[test]
    fn round_reconciliation_skips_players_without_enrollment() {
        let known = holes(18);
        let mut incoming = IndexMap::new();
        incoming.insert("alice".to_string(), cells(&["3", "4"]));
        incoming.insert("mallory".to_string(), cells(&["1", "1"]));

        let mut ledgers = HashMap::new();
        ledgers.insert("alice".to_string(), vec![record(1, 3, None)]);

        let outcome = reconcile_round(2, &incoming, &ledgers, &HashMap::new(), &known).unwrap();
        assert_eq!(outcome.skipped_players, vec!["mallory".to_string()]);
        assert_eq!(outcome.changes.to_create.len(), 1);
        assert_eq!(outcome.changes.to_create[0].user, "alice");
        assert_eq!(outcome.changes.to_create[0].hole_number, 2);
    }

    #[test]
    fn round_reconciliation_aborts_on_structural_errors() {
        let mut incoming = IndexMap::new();
        incoming.insert("alice".to_string(), cells(&["3"]));
        let mut ledgers = HashMap::new();
        ledgers.insert("alice".to_string(), Vec::new());

        let result = reconcile_round(2, &incoming, &ledgers, &HashMap::new(), &[]);
        assert!(matches!(result, Err(ReconcileError::UnknownHole { .. })));
    }
}
