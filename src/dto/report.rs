//! DTO definitions returned by the round report endpoints.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use crate::scoring::aggregate::{AggregateRow, DayStandings, ScoreStats, Standing};

/// One player's line on the leaderboard.
#[derive(Debug, Serialize, ToSchema, PartialEq)]
pub struct LeaderboardEntry {
    pub position: usize,
    pub user: String,
    /// Strokes relative to par; lower is better.
    pub golf_score: i32,
    pub total: u32,
    pub holes_played: usize,
    pub average: Option<f64>,
    /// Raw score per hole, hole 1 first; `null` for holes without a score.
    pub holes: Vec<Option<u8>>,
}

impl LeaderboardEntry {
    pub fn new(position: usize, row: &AggregateRow, hole_count: u8) -> Self {
        Self {
            position,
            user: row.user.clone(),
            golf_score: row.golf_score(),
            total: row.total(),
            holes_played: row.count(),
            average: row.average().ok(),
            holes: (1..=hole_count)
                .map(|hole| row.holes.get(&hole).map(|score| score.raw_score))
                .collect(),
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct LeaderboardResponse {
    pub round_number: u32,
    pub entries: Vec<LeaderboardEntry>,
}

/// Aggregates of one hole across players.
#[derive(Debug, Serialize, ToSchema, PartialEq)]
pub struct HoleStats {
    pub hole_number: u8,
    pub count: usize,
    pub total: u32,
    pub average: f64,
    pub golf_score: i32,
}

impl HoleStats {
    /// `None` for a hole nobody played.
    pub fn new(hole_number: u8, stats: &ScoreStats) -> Option<Self> {
        let average = stats.average().ok()?;
        Some(Self {
            hole_number,
            count: stats.count,
            total: stats.total,
            average,
            golf_score: stats.golf_score(),
        })
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct StatsResponse {
    pub round_number: u32,
    pub holes: Vec<HoleStats>,
}

/// How often a score name occurred on each hole.
#[derive(Debug, Serialize, ToSchema, PartialEq, Eq)]
pub struct BreakdownEntry {
    pub label: String,
    pub raw_score: u8,
    /// Hole number to number of players.
    pub counts: BTreeMap<u8, usize>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct BreakdownResponse {
    pub round_number: u32,
    pub entries: Vec<BreakdownEntry>,
}

#[derive(Debug, Serialize, ToSchema, PartialEq, Eq)]
pub struct RaceStanding {
    pub position: usize,
    pub user: String,
    pub golf_score: i32,
    pub holes_played: usize,
}

impl From<Standing> for RaceStanding {
    fn from(value: Standing) -> Self {
        Self {
            position: value.position,
            user: value.user,
            golf_score: value.golf_score,
            holes_played: value.holes_played,
        }
    }
}

/// Cumulative standings after one hole.
#[derive(Debug, Serialize, ToSchema)]
pub struct RaceDay {
    pub hole_number: u8,
    pub standings: Vec<RaceStanding>,
}

impl From<DayStandings> for RaceDay {
    fn from(value: DayStandings) -> Self {
        Self {
            hole_number: value.hole_number,
            standings: value.standings.into_iter().map(Into::into).collect(),
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct RaceResponse {
    pub round_number: u32,
    pub days: Vec<RaceDay>,
}

/// Query string of the race endpoint.
#[derive(Debug, Default, Deserialize, IntoParams, Validate)]
pub struct RaceQuery {
    /// Keep only the first N players of each day.
    #[validate(range(min = 1, max = 500))]
    pub limit: Option<usize>,
}

/// Query string of the missing-players endpoint.
#[derive(Debug, Default, Deserialize, IntoParams, Validate)]
pub struct MissingQuery {
    /// Hole to inspect; defaults to today's hole.
    #[validate(range(min = 1, max = 18))]
    pub hole: Option<u8>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct MissingResponse {
    pub round_number: u32,
    pub hole_number: u8,
    pub players: Vec<String>,
}
