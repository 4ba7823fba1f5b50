use serde::{Deserialize, Serialize};
use thiserror::Error;
use time::{Date, Duration, OffsetDateTime, UtcOffset, macros::date};
use utoipa::ToSchema;

use super::HOLES_PER_ROUND;

/// Date of puzzle day zero.
pub const DEFAULT_PUZZLE_EPOCH: Date = date!(2021 - 06 - 19);

/// Widest day offset accepted before date arithmetic is attempted (about 10 000 years).
const MAX_DAY_SPAN: i64 = 3_660_000;

/// Errors raised by calendar conversions.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CalendarError {
    /// The puzzle number maps to no representable date.
    #[error("puzzle day {0} is outside the supported date range")]
    OutOfRange(i64),
}

/// One 18-hole competition cycle anchored to its first day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Round {
    /// Sequential round number, starting at 1.
    pub number: u32,
    /// Day hole 1 is played.
    pub start_date: Date,
}

impl Round {
    /// Round `number` starting on `start_date`.
    pub fn new(number: u32, start_date: Date) -> Self {
        Self { number, start_date }
    }

    /// Last day of the round (hole 18).
    pub fn end_date(&self) -> Date {
        self.start_date
            .saturating_add(Duration::days(i64::from(HOLES_PER_ROUND) - 1))
    }

    /// Hole played on `date`, if the date falls inside this round.
    pub fn hole_for(&self, date: Date) -> Option<u8> {
        let offset = (date - self.start_date).whole_days();
        if (0..i64::from(HOLES_PER_ROUND)).contains(&offset) {
            u8::try_from(offset + 1).ok()
        } else {
            None
        }
    }

    /// Calendar date of the given hole, if the hole exists.
    pub fn date_for_hole(&self, hole_number: u8) -> Option<Date> {
        if !(1..=HOLES_PER_ROUND).contains(&hole_number) {
            return None;
        }
        self.start_date
            .checked_add(Duration::days(i64::from(hole_number) - 1))
    }

    /// Whether both rounds claim at least one common day.
    pub fn overlaps(&self, other: &Round) -> bool {
        self.start_date <= other.end_date() && other.start_date <= self.end_date()
    }
}

/// Position of a single day inside a round.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct RoundHole {
    /// Round containing the day.
    pub round_number: u32,
    /// Hole within that round, 1 to 18.
    pub hole_number: u8,
}

/// A puzzle day, its calendar date and (when in season) its round and hole.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
pub struct PuzzleDay {
    /// Days since the epoch; negative before it.
    pub number: i64,
    /// Calendar date of the puzzle.
    pub date: Date,
    /// `None` off season.
    pub round_hole: Option<RoundHole>,
}

/// Map `date` onto the first round (chronologically) whose window contains it.
///
/// Overlapping rounds are not rejected here; the earliest one simply wins.
pub fn hole_for(date: Date, rounds: &[Round]) -> Option<RoundHole> {
    let mut ordered: Vec<&Round> = rounds.iter().collect();
    ordered.sort_by_key(|round| round.start_date);
    ordered.into_iter().find_map(|round| {
        round.hole_for(date).map(|hole_number| RoundHole {
            round_number: round.number,
            hole_number,
        })
    })
}

/// Current date at the competition's fixed UTC offset.
pub fn today(offset: UtcOffset) -> Date {
    OffsetDateTime::now_utc().to_offset(offset).date()
}

/// Known rounds plus the puzzle-day epoch.
#[derive(Debug, Clone)]
pub struct Calendar {
    epoch: Date,
    rounds: Vec<Round>,
}

impl Calendar {
    /// Calendar counting puzzle days from `epoch`.
    pub fn new(epoch: Date, mut rounds: Vec<Round>) -> Self {
        rounds.sort_by_key(|round| round.start_date);
        Self { epoch, rounds }
    }

    /// Date of puzzle 0.
    pub fn epoch(&self) -> Date {
        self.epoch
    }

    /// Rounds ordered by start date.
    pub fn rounds(&self) -> &[Round] {
        &self.rounds
    }

    /// Round by number.
    pub fn round(&self, number: u32) -> Option<&Round> {
        self.rounds.iter().find(|round| round.number == number)
    }

    /// Round and hole played on `date`.
    pub fn hole_for(&self, date: Date) -> Option<RoundHole> {
        hole_for(date, &self.rounds)
    }

    /// Puzzle day published on `date`.
    pub fn puzzle_day_for(&self, date: Date) -> PuzzleDay {
        PuzzleDay {
            number: (date - self.epoch).whole_days(),
            date,
            round_hole: self.hole_for(date),
        }
    }

    /// Date on which puzzle `number` is published.
    pub fn date_for(&self, number: i64) -> Result<Date, CalendarError> {
        if number.abs() > MAX_DAY_SPAN {
            return Err(CalendarError::OutOfRange(number));
        }
        self.epoch
            .checked_add(Duration::days(number))
            .ok_or(CalendarError::OutOfRange(number))
    }

    /// Puzzle day for puzzle `number`.
    pub fn puzzle_day(&self, number: i64) -> Result<PuzzleDay, CalendarError> {
        let date = self.date_for(number)?;
        Ok(self.puzzle_day_for(date))
    }

    /// The puzzle day `days_back` days before `day`.
    pub fn shift(&self, day: &PuzzleDay, days_back: i64) -> Result<PuzzleDay, CalendarError> {
        let number = day
            .number
            .checked_sub(days_back)
            .ok_or(CalendarError::OutOfRange(day.number))?;
        self.puzzle_day(number)
    }

    /// Today's puzzle at `offset`.
    pub fn today(&self, offset: UtcOffset) -> PuzzleDay {
        self.puzzle_day_for(today(offset))
    }
}
