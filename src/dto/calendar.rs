use serde::Serialize;
use time::Date;
use utoipa::ToSchema;

use crate::scoring::calendar::PuzzleDay;

/// Puzzle day and its position in the competition.
#[derive(Debug, Serialize, ToSchema, PartialEq, Eq)]
pub struct PuzzleDayResponse {
    /// Puzzle number counted from the epoch.
    pub number: i64,
    pub date: Date,
    /// Round playing on that day; absent off-season.
    pub round_number: Option<u32>,
    pub hole_number: Option<u8>,
}

impl From<PuzzleDay> for PuzzleDayResponse {
    fn from(value: PuzzleDay) -> Self {
        Self {
            number: value.number,
            date: value.date,
            round_number: value.round_hole.map(|hole| hole.round_number),
            hole_number: value.round_hole.map(|hole| hole.hole_number),
        }
    }
}
