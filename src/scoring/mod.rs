//! Score reconciliation and aggregation engine.
//!
//! Everything in here is synchronous and works on in-memory collections: the services
//! fetch rounds, sheet rows and persisted records, hand them to these helpers and apply
//! whatever comes back.

/// Grouped views over persisted score records.
pub mod aggregate;
/// Calendar date to puzzle day / round / hole mapping.
pub mod calendar;
/// Spreadsheet row normalization.
pub mod normalizer;
/// Incoming-versus-persisted score diffing.
pub mod reconcile;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Reference raw score of a hole.
pub const PAR: i32 = 4;
/// Number of holes (days) in a round.
pub const HOLES_PER_ROUND: u8 = 18;
/// Raw score recorded for a failed puzzle ("X").
pub const FAIL_SCORE: u8 = 7;

/// A persisted score as seen by the engine: one row per (user, round, hole).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ScoreRecord {
    /// Username of the player.
    pub user: String,
    /// Round the hole belongs to.
    pub round_number: u32,
    /// 1 to 18.
    pub hole_number: u8,
    /// Raw puzzle score, 1..=7 where 7 is a fail.
    pub raw_score: u8,
    /// Identifier of the social post the score was observed in, if any.
    pub social_reference: Option<String>,
}

/// Golf naming of a raw score relative to par.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ScoreName {
    /// Solved on the first guess.
    HoleInOne,
    /// Two guesses.
    Eagle,
    /// Three guesses.
    Birdie,
    /// Four guesses.
    Par,
    /// Five guesses.
    Bogey,
    /// Six guesses.
    DoubleBogey,
    /// Not solved.
    Fail,
}

impl ScoreName {
    /// Every name, ordered by raw score.
    pub const ALL: [ScoreName; 7] = [
        ScoreName::HoleInOne,
        ScoreName::Eagle,
        ScoreName::Birdie,
        ScoreName::Par,
        ScoreName::Bogey,
        ScoreName::DoubleBogey,
        ScoreName::Fail,
    ];

    /// Name of `raw_score`, or `None` outside 1 to 7.
    pub fn from_raw(raw_score: u8) -> Option<Self> {
        match raw_score {
            1..=FAIL_SCORE => Some(Self::ALL[usize::from(raw_score) - 1]),
            _ => None,
        }
    }

    /// Number of guesses this name stands for.
    pub fn raw_score(self) -> u8 {
        self as u8 + 1
    }

    /// Display label used by the breakdown reports.
    pub fn label(self) -> &'static str {
        match self {
            ScoreName::HoleInOne => "Hole-in-1",
            ScoreName::Eagle => "Eagle",
            ScoreName::Birdie => "Birdie",
            ScoreName::Par => "Par",
            ScoreName::Bogey => "Bogey",
            ScoreName::DoubleBogey => "Double Bogey",
            ScoreName::Fail => "Fail",
        }
    }
}

/// Golf score of a single raw score (strokes relative to par).
pub fn relative_to_par(raw_score: u8) -> i32 {
    i32::from(raw_score) - PAR
}
