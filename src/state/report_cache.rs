use std::{sync::Arc, time::Duration};

use dashmap::DashMap;
use tokio::time::Instant;

use crate::scoring::{ScoreRecord, aggregate::ScoreMatrix, calendar::Round};

/// Joined view of one round: roster and score records with user names resolved.
#[derive(Debug, Clone, PartialEq)]
pub struct RoundReport {
    pub round: Round,
    /// Enrolled usernames, sorted.
    pub roster: Vec<String>,
    /// Records ordered by hole, then by roster order.
    pub records: Vec<ScoreRecord>,
}

impl RoundReport {
    pub fn matrix(&self) -> ScoreMatrix<'_> {
        ScoreMatrix::new(&self.records)
    }
}

struct CachedReport {
    built_at: Instant,
    generation: u64,
    report: Arc<RoundReport>,
}

/// Round reports keyed by round number, rebuilt once older than the TTL.
///
/// Every round carries a generation bumped by [`ReportCache::invalidate`]. A report is
/// stamped with the generation read before its data was loaded and only served while
/// that generation is current.
pub struct ReportCache {
    ttl: Duration,
    entries: DashMap<u32, CachedReport>,
    generations: DashMap<u32, u64>,
}

impl ReportCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: DashMap::new(),
            generations: DashMap::new(),
        }
    }

    /// Current generation of `round_number`; capture it before loading report data.
    pub fn generation(&self, round_number: u32) -> u64 {
        self.generations
            .get(&round_number)
            .map(|generation| *generation)
            .unwrap_or_default()
    }

    /// Fresh report of `round_number`, if any.
    pub fn get(&self, round_number: u32) -> Option<Arc<RoundReport>> {
        let current = self.generation(round_number);
        let fresh = self
            .entries
            .get(&round_number)
            .filter(|entry| entry.generation == current && entry.built_at.elapsed() < self.ttl)
            .map(|entry| entry.report.clone());
        if fresh.is_none() {
            self.entries.remove(&round_number);
        }
        fresh
    }

    /// Cache `report`, built from data read at `generation`.
    ///
    /// A report whose round was invalidated meanwhile is returned but never served from
    /// the cache.
    pub fn insert(&self, report: RoundReport, generation: u64) -> Arc<RoundReport> {
        let report = Arc::new(report);
        let round_number = report.round.number;
        if generation != self.generation(round_number) {
            return report;
        }
        self.entries.insert(
            round_number,
            CachedReport {
                built_at: Instant::now(),
                generation,
                report: report.clone(),
            },
        );
        report
    }

    /// Drop the cached report of a round after its scores changed.
    pub fn invalidate(&self, round_number: u32) {
        *self.generations.entry(round_number).or_default() += 1;
        self.entries.remove(&round_number);
    }
}

#[cfg(test)]
mod tests {
    use time::macros::date;

    use super::*;

    fn report(number: u32) -> RoundReport {
        RoundReport {
            round: Round::new(number, date!(2022 - 05 - 09)),
            roster: vec!["alice".into()],
            records: Vec::new(),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn entries_expire_after_the_ttl() {
        let cache = ReportCache::new(Duration::from_secs(30));
        cache.insert(report(1), cache.generation(1));
        assert!(cache.get(1).is_some());

        tokio::time::advance(Duration::from_secs(31)).await;
        assert!(cache.get(1).is_none());
    }

    #[test]
    fn invalidation_only_touches_one_round() {
        let cache = ReportCache::new(Duration::from_secs(30));
        cache.insert(report(1), cache.generation(1));
        cache.insert(report(2), cache.generation(2));
        cache.invalidate(1);
        assert!(cache.get(1).is_none());
        assert_eq!(cache.get(2).unwrap().round.number, 2);
    }

    #[test]
    fn reports_built_before_an_invalidation_are_not_served() {
        let cache = ReportCache::new(Duration::from_secs(30));
        let generation = cache.generation(1);

        // Scores change while the report is being built.
        cache.invalidate(1);
        let stale = cache.insert(report(1), generation);
        assert_eq!(stale.round.number, 1);
        assert!(cache.get(1).is_none());

        cache.insert(report(1), cache.generation(1));
        assert!(cache.get(1).is_some());
    }

    #[test]
    fn entries_stamped_with_an_old_generation_are_dropped() {
        let cache = ReportCache::new(Duration::from_secs(30));
        let generation = cache.generation(1);
        cache.insert(report(1), generation);
        *cache.generations.entry(1).or_default() += 1;
        assert!(cache.get(1).is_none());
    }
}
