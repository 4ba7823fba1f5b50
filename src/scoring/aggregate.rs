use std::collections::{BTreeMap, BTreeSet, HashMap};

use indexmap::IndexMap;
use thiserror::Error;

use super::{PAR, ScoreName, ScoreRecord};

/// Errors raised while deriving aggregate metrics.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum AggregateError {
    /// No scores to average.
    #[error("cannot average an empty group of scores")]
    EmptyGroup,
}

/// Running total and count of a group of raw scores.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScoreStats {
    /// Sum of raw scores.
    pub total: u32,
    /// Number of scores summed.
    pub count: usize,
}

impl ScoreStats {
    fn push(&mut self, raw_score: u8) {
        self.total += u32::from(raw_score);
        self.count += 1;
    }

    /// Mean raw score rounded to two decimals.
    pub fn average(&self) -> Result<f64, AggregateError> {
        if self.count == 0 {
            return Err(AggregateError::EmptyGroup);
        }
        let mean = f64::from(self.total) / self.count as f64;
        Ok((mean * 100.0).round() / 100.0)
    }

    /// Strokes relative to par over the group; lower is better.
    pub fn golf_score(&self) -> i32 {
        self.total as i32 - PAR * self.count as i32
    }
}

/// Score of one hole inside an [`AggregateRow`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HoleScore {
    /// Guesses taken, 7 for a fail.
    pub raw_score: u8,
    /// Social post the score came from.
    pub social_reference: Option<String>,
}

/// Per-user view used by the leaderboard.
#[derive(Debug, Clone, PartialEq)]
pub struct AggregateRow {
    /// Player the row belongs to.
    pub user: String,
    /// Totals over every hole in `holes`.
    pub stats: ScoreStats,
    /// Scores keyed by hole number.
    pub holes: BTreeMap<u8, HoleScore>,
}

impl AggregateRow {
    fn new(user: &str) -> Self {
        Self {
            user: user.to_owned(),
            stats: ScoreStats::default(),
            holes: BTreeMap::new(),
        }
    }

    fn push(&mut self, record: &ScoreRecord) {
        self.stats.push(record.raw_score);
        self.holes.insert(
            record.hole_number,
            HoleScore {
                raw_score: record.raw_score,
                social_reference: record.social_reference.clone(),
            },
        );
    }

    /// Sum of the user's raw scores.
    pub fn total(&self) -> u32 {
        self.stats.total
    }

    /// Holes with a score.
    pub fn count(&self) -> usize {
        self.stats.count
    }

    /// See [`ScoreStats::average`].
    pub fn average(&self) -> Result<f64, AggregateError> {
        self.stats.average()
    }

    /// See [`ScoreStats::golf_score`].
    pub fn golf_score(&self) -> i32 {
        self.stats.golf_score()
    }

    /// Raw scores ordered by hole.
    pub fn raw_values(&self) -> impl Iterator<Item = u8> + '_ {
        self.holes.values().map(|hole| hole.raw_score)
    }
}

/// One entry of a day's cumulative standings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Standing {
    /// 1-based position in the day's ordering.
    pub position: usize,
    /// Player username.
    pub user: String,
    /// Cumulative golf score up to this hole.
    pub golf_score: i32,
    /// Holes with a score so far.
    pub holes_played: usize,
}

/// Cumulative standings after a given hole.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DayStandings {
    /// Last hole counted.
    pub hole_number: u8,
    /// Best golf score first.
    pub standings: Vec<Standing>,
}

/// Read-only grouping helpers over a flat collection of score records.
#[derive(Debug, Clone, Copy)]
pub struct ScoreMatrix<'a> {
    records: &'a [ScoreRecord],
}

impl<'a> ScoreMatrix<'a> {
    /// Wrap `records` without copying them.
    pub fn new(records: &'a [ScoreRecord]) -> Self {
        Self { records }
    }

    /// Underlying records.
    pub fn records(&self) -> &'a [ScoreRecord] {
        self.records
    }

    /// Rows keyed by user, in order of first appearance.
    pub fn by_user(&self) -> IndexMap<String, AggregateRow> {
        let mut rows: IndexMap<String, AggregateRow> = IndexMap::new();
        for record in self.records {
            rows.entry(record.user.clone())
                .or_insert_with(|| AggregateRow::new(&record.user))
                .push(record);
        }
        rows
    }

    /// Row of a single user; empty when the user has no records.
    pub fn for_user(&self, user: &str) -> AggregateRow {
        let mut row = AggregateRow::new(user);
        self.records
            .iter()
            .filter(|record| record.user == user)
            .for_each(|record| row.push(record));
        row
    }

    /// Stats of every hole with at least one score.
    pub fn by_hole(&self) -> BTreeMap<u8, ScoreStats> {
        let mut holes: BTreeMap<u8, ScoreStats> = BTreeMap::new();
        for record in self.records {
            holes
                .entry(record.hole_number)
                .or_default()
                .push(record.raw_score);
        }
        holes
    }

    /// Stats of a single hole; zeroed when nobody scored it.
    pub fn for_hole(&self, hole_number: u8) -> ScoreStats {
        let mut stats = ScoreStats::default();
        self.records
            .iter()
            .filter(|record| record.hole_number == hole_number)
            .for_each(|record| stats.push(record.raw_score));
        stats
    }

    /// Per-hole counts of each score name, ordered by raw score.
    ///
    /// Only names that occur at least once are listed; records with a raw score outside
    /// 1..=7 are ignored.
    pub fn score_breakdown(&self) -> IndexMap<&'static str, BTreeMap<u8, usize>> {
        let mut by_name: BTreeMap<ScoreName, BTreeMap<u8, usize>> = BTreeMap::new();
        for record in self.records {
            let Some(name) = ScoreName::from_raw(record.raw_score) else {
                continue;
            };
            *by_name
                .entry(name)
                .or_default()
                .entry(record.hole_number)
                .or_default() += 1;
        }
        by_name
            .into_iter()
            .map(|(name, counts)| (name.label(), counts))
            .collect()
    }

    /// Cumulative golf-score standings after each hole, in hole order.
    ///
    /// Ties keep the previous day's order; players entering the race do so in order of
    /// first appearance. `limit` keeps only the first N standings of each day.
    pub fn top_by_day(&self, limit: Option<usize>) -> Vec<DayStandings> {
        let hole_numbers: BTreeSet<u8> = self
            .records
            .iter()
            .map(|record| record.hole_number)
            .collect();

        let mut order: Vec<&str> = Vec::new();
        let mut totals: HashMap<&str, ScoreStats> = HashMap::new();
        let mut days = Vec::with_capacity(hole_numbers.len());

        for hole_number in hole_numbers {
            for record in self
                .records
                .iter()
                .filter(|record| record.hole_number == hole_number)
            {
                let user = record.user.as_str();
                let stats = totals.entry(user).or_insert_with(|| {
                    order.push(user);
                    ScoreStats::default()
                });
                stats.push(record.raw_score);
            }

            order.sort_by_key(|user| totals.get(user).map(ScoreStats::golf_score));

            let standings = order
                .iter()
                .take(limit.unwrap_or(usize::MAX))
                .enumerate()
                .map(|(index, user)| {
                    let stats = totals.get(user).copied().unwrap_or_default();
                    Standing {
                        position: index + 1,
                        user: (*user).to_owned(),
                        golf_score: stats.golf_score(),
                        holes_played: stats.count,
                    }
                })
                .collect();

            days.push(DayStandings {
                hole_number,
                standings,
            });
        }

        days
    }

    /// Player leading the cumulative standings after each hole.
    pub fn leaders_by_day(&self) -> Vec<(u8, Standing)> {
        self.top_by_day(Some(1))
            .into_iter()
            .filter_map(|day| {
                let hole_number = day.hole_number;
                day.standings
                    .into_iter()
                    .next()
                    .map(|leader| (hole_number, leader))
            })
            .collect()
    }

    /// Players of `roster` with no score on `hole_number`, in roster order.
    pub fn players_missing(&self, roster: &[String], hole_number: u8) -> Vec<String> {
        let played: BTreeSet<&str> = self
            .records
            .iter()
            .filter(|record| record.hole_number == hole_number)
            .map(|record| record.user.as_str())
            .collect();
        roster
            .iter()
            .filter(|user| !played.contains(user.as_str()))
            .cloned()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(user: &str, hole_number: u8, raw_score: u8) -> ScoreRecord {
        ScoreRecord {
            user: user.into(),
            round_number: 1,
            hole_number,
            raw_score,
            social_reference: None,
        }
    }

    fn sample() -> Vec<ScoreRecord> {
        vec![
            record("A", 1, 3),
            record("A", 2, 5),
            record("A", 3, 4),
            record("B", 1, 6),
            record("B", 2, 7),
        ]
    }

    #[test]
    fn golf_scores_are_relative_to_par() {
        let records = sample();
        let rows = ScoreMatrix::new(&records).by_user();

        assert_eq!(rows["A"].golf_score(), 0);
        assert_eq!(rows["A"].total(), 12);
        assert_eq!(rows["A"].count(), 3);
        assert_eq!(rows["B"].golf_score(), 5);
        assert_eq!(rows["B"].raw_values().collect::<Vec<_>>(), vec![6, 7]);
    }

    #[test]
    fn users_keep_first_appearance_order() {
        let records = vec![record("zed", 1, 4), record("amy", 1, 4), record("zed", 2, 4)];
        let rows = ScoreMatrix::new(&records).by_user();
        let users: Vec<&str> = rows.keys().map(String::as_str).collect();
        assert_eq!(users, vec!["zed", "amy"]);
    }

    #[test]
    fn averages_are_rounded_to_two_decimals() {
        let records = vec![record("A", 1, 3), record("A", 2, 4), record("A", 3, 4)];
        let matrix = ScoreMatrix::new(&records);
        assert_eq!(matrix.for_user("A").average(), Ok(3.67));
    }

    #[test]
    fn empty_groups_have_no_average() {
        let records = sample();
        let matrix = ScoreMatrix::new(&records);
        assert_eq!(
            matrix.for_user("nobody").average(),
            Err(AggregateError::EmptyGroup)
        );
        assert_eq!(matrix.for_hole(9).average(), Err(AggregateError::EmptyGroup));
        assert_eq!(matrix.for_user("nobody").golf_score(), 0);
    }

    #[test]
    fn hole_statistics_span_all_users() {
        let records = sample();
        let holes = ScoreMatrix::new(&records).by_hole();

        assert_eq!(holes.keys().copied().collect::<Vec<_>>(), vec![1, 2, 3]);
        assert_eq!(holes[&1], ScoreStats { total: 9, count: 2 });
        assert_eq!(holes[&1].average(), Ok(4.5));
        assert_eq!(holes[&2].average(), Ok(6.0));
        assert_eq!(holes[&3].count, 1);
    }

    #[test]
    fn breakdown_is_labelled_and_ordered_by_raw_score() {
        let records = vec![
            record("A", 1, 7),
            record("B", 1, 1),
            record("C", 2, 4),
            record("D", 1, 4),
            record("E", 3, 4),
        ];
        let breakdown = ScoreMatrix::new(&records).score_breakdown();

        let labels: Vec<&str> = breakdown.keys().copied().collect();
        assert_eq!(labels, vec!["Hole-in-1", "Par", "Fail"]);

        let par = &breakdown["Par"];
        assert_eq!(par.iter().collect::<Vec<_>>(), vec![(&1, &1), (&2, &1), (&3, &1)]);
        assert_eq!(par.values().sum::<usize>(), 3);
        assert_eq!(breakdown["Fail"][&1], 1);
    }

    #[test]
    fn breakdown_counts_add_up_to_record_count() {
        let records = sample();
        let breakdown = ScoreMatrix::new(&records).score_breakdown();
        let counted: usize = breakdown.values().flat_map(|holes| holes.values()).sum();
        assert_eq!(counted, records.len());
    }

    #[test]
    fn race_standings_accumulate_by_day() {
        let records = sample();
        let days = ScoreMatrix::new(&records).top_by_day(None);

        assert_eq!(days.len(), 3);
        let first: Vec<(&str, i32)> = days[0]
            .standings
            .iter()
            .map(|s| (s.user.as_str(), s.golf_score))
            .collect();
        assert_eq!(first, vec![("A", -1), ("B", 2)]);

        let last = &days[2];
        assert_eq!(last.hole_number, 3);
        assert_eq!(last.standings[0].user, "A");
        assert_eq!(last.standings[0].golf_score, 0);
        assert_eq!(last.standings[0].holes_played, 3);
        assert_eq!(last.standings[1].golf_score, 5);
        assert_eq!(last.standings[1].position, 2);
    }

    #[test]
    fn race_ties_keep_previous_order() {
        let records = vec![
            record("B", 1, 3),
            record("A", 1, 4),
            record("A", 2, 3),
            record("B", 2, 4),
        ];
        let days = ScoreMatrix::new(&records).top_by_day(None);
        let users: Vec<&str> = days[1].standings.iter().map(|s| s.user.as_str()).collect();
        assert_eq!(users, vec!["B", "A"]);
        assert_eq!(days[1].standings[0].golf_score, days[1].standings[1].golf_score);
    }

    #[test]
    fn race_can_be_limited_to_the_top_players() {
        let records = sample();
        let matrix = ScoreMatrix::new(&records);
        let days = matrix.top_by_day(Some(1));
        assert!(days.iter().all(|day| day.standings.len() == 1));

        let leaders = matrix.leaders_by_day();
        assert_eq!(leaders.len(), 3);
        assert!(leaders.iter().all(|(_, leader)| leader.user == "A"));
    }

    #[test]
    fn missing_players_are_listed_in_roster_order() {
        let records = sample();
        let roster = vec!["C".to_string(), "B".to_string(), "A".to_string()];
        let missing = ScoreMatrix::new(&records).players_missing(&roster, 3);
        assert_eq!(missing, vec!["C".to_string(), "B".to_string()]);
    }

    #[test]
    fn aggregation_does_not_touch_its_input() {
        let records = sample();
        let before = records.clone();
        let matrix = ScoreMatrix::new(&records);
        let _ = matrix.by_user();
        let _ = matrix.top_by_day(None);
        let _ = matrix.score_breakdown();
        assert_eq!(records, before);
    }
}
