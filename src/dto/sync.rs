//! DTO definitions for score reconciliation runs.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use time::Date;
use utoipa::ToSchema;
use validator::{Validate, ValidationErrors};

use crate::{
    dto::validation::validate_score_row,
    scoring::reconcile::{ChangeSet, NewScore, ScoreUpdate},
};

/// Sheet rows posted directly instead of being read from the spreadsheet.
#[derive(Debug, Deserialize, ToSchema)]
pub struct SubmitScoresRequest {
    /// Player name to cells, hole 1 first. Blank cells count as missed holes once the
    /// hole has been played.
    #[schema(value_type = Object)]
    pub rows: IndexMap<String, Vec<String>>,
    /// Day the rows describe; defaults to today.
    #[serde(default)]
    pub date: Option<Date>,
    /// Whether the day itself is complete and padded like past holes.
    #[serde(default)]
    pub include_today: bool,
}

impl Validate for SubmitScoresRequest {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        if self.rows.is_empty() {
            let mut err = validator::ValidationError::new("rows_empty");
            err.message = Some("At least one row is required".into());
            errors.add("rows", err);
        }
        for row in self.rows.values() {
            if let Err(e) = validate_score_row(row) {
                errors.add("rows", e);
                break;
            }
        }
        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

/// Options of a spreadsheet-driven reconciliation.
#[derive(Debug, Default, Deserialize, ToSchema, Validate)]
pub struct SyncRequest {
    /// Day to reconcile; defaults to today.
    #[serde(default)]
    pub date: Option<Date>,
    /// Search the social platform for today's results of players missing a score.
    #[serde(default)]
    pub check_social: bool,
}

/// Kind of ledger mutation.
#[derive(Debug, Clone, Copy, Serialize, ToSchema, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ChangeKind {
    Create,
    Update,
}

/// One mutation applied by a reconciliation run.
#[derive(Debug, Clone, Serialize, ToSchema, PartialEq, Eq)]
pub struct ScoreChange {
    pub kind: ChangeKind,
    pub user: String,
    pub hole_number: u8,
    /// Score after the change.
    pub score: Option<u8>,
    /// Score before the change, when it changed.
    pub previous_score: Option<u8>,
    pub social_reference: Option<String>,
}

impl From<&NewScore> for ScoreChange {
    fn from(value: &NewScore) -> Self {
        Self {
            kind: ChangeKind::Create,
            user: value.user.clone(),
            hole_number: value.hole_number,
            score: Some(value.raw_score),
            previous_score: None,
            social_reference: value.social_reference.clone(),
        }
    }
}

impl From<&ScoreUpdate> for ScoreChange {
    fn from(value: &ScoreUpdate) -> Self {
        Self {
            kind: ChangeKind::Update,
            user: value.user.clone(),
            hole_number: value.hole_number,
            score: value.score.as_ref().map(|change| change.to),
            previous_score: value.score.as_ref().map(|change| change.from),
            social_reference: value
                .social_reference
                .as_ref()
                .and_then(|change| change.to.clone()),
        }
    }
}

/// Outcome of a reconciliation run.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct SyncReport {
    pub round_number: u32,
    /// Hole of the reconciled day; absent when the day is outside the round.
    pub hole_number: Option<u8>,
    pub puzzle_number: i64,
    pub created: usize,
    pub updated: usize,
    /// Sheet players ignored because they are not enrolled.
    pub skipped_players: Vec<String>,
    /// Players whose result was found on the social platform.
    pub social_matches: Vec<String>,
    /// Whether the spreadsheet was updated with social results.
    pub sheet_written: bool,
    pub changes: Vec<ScoreChange>,
}

impl SyncReport {
    pub fn new(round_number: u32, hole_number: Option<u8>, puzzle_number: i64) -> Self {
        Self {
            round_number,
            hole_number,
            puzzle_number,
            created: 0,
            updated: 0,
            skipped_players: Vec::new(),
            social_matches: Vec::new(),
            sheet_written: false,
            changes: Vec::new(),
        }
    }

    /// Record the change set that was applied.
    pub fn with_changes(mut self, changes: &ChangeSet) -> Self {
        self.created = changes.to_create.len();
        self.updated = changes.to_update.len();
        self.changes = changes
            .to_create
            .iter()
            .map(ScoreChange::from)
            .chain(changes.to_update.iter().map(ScoreChange::from))
            .collect();
        self
    }
}
