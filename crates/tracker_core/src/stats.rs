use serde::{Deserialize, Serialize};

use crate::filter::is_eligible_for_all;
use crate::ledger::CompletionLedger;
use crate::tracker::TrackerCategory;

/// Aggregates shown on the statistics screen.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct CompletionStats {
    /// Longest run of consecutive days with at least one completion.
    pub best_period: usize,
    /// Days on which every tracker shown that day was completed.
    pub perfect_days: usize,
    pub completed_total: usize,
    /// Completions per day that has any, rounded down.
    pub average: usize,
}

impl CompletionStats {
    pub fn compute(categories: &[TrackerCategory], ledger: &CompletionLedger) -> Self {
        let by_day = ledger.completions_by_day();
        let completed_total = ledger.total_completions();

        let mut best_period = 0;
        let mut current = 0;
        let mut previous = None;
        for day in by_day.keys() {
            current = match previous {
                Some(prev) if day.pred_opt() == Some(prev) => current + 1,
                _ => 1,
            };
            best_period = best_period.max(current);
            previous = Some(*day);
        }

        let perfect_days = by_day
            .iter()
            .filter(|(day, completed)| {
                let mut eligible = categories
                    .iter()
                    .flat_map(|category| category.trackers.iter())
                    .filter(|tracker| is_eligible_for_all(tracker, ledger, **day))
                    .peekable();
                eligible.peek().is_some() && eligible.all(|tracker| completed.contains(&tracker.id))
            })
            .count();

        let average = if by_day.is_empty() {
            0
        } else {
            completed_total / by_day.len()
        };

        Self {
            best_period,
            perfect_days,
            completed_total,
            average,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.completed_total == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::TrackerRecord;
    use crate::schedule::{Schedule, Weekday};
    use crate::tracker::TrackerDraft;
    use chrono::NaiveDate;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, d).unwrap()
    }

    #[test]
    fn empty_ledger_has_no_stats() {
        let stats = CompletionStats::compute(&[], &CompletionLedger::new());
        assert!(stats.is_empty());
        assert_eq!(stats, CompletionStats::default());
    }

    #[test]
    fn computes_streak_perfect_days_and_average() {
        let daily = TrackerDraft::new("Read", Schedule::every_day()).build().unwrap();
        let mondays = TrackerDraft::new("Gym", Schedule::new([Weekday::Monday]))
            .build()
            .unwrap();
        let categories = vec![TrackerCategory::new("Me", vec![daily.clone(), mondays.clone()])];
        // 2024-01-01 is a Monday.
        let ledger = CompletionLedger::from_records([
            TrackerRecord::on_day(daily.id, day(1)),
            TrackerRecord::on_day(mondays.id, day(1)),
            TrackerRecord::on_day(daily.id, day(2)),
            TrackerRecord::on_day(daily.id, day(3)),
            TrackerRecord::on_day(daily.id, day(8)),
        ]);
        let stats = CompletionStats::compute(&categories, &ledger);
        assert_eq!(stats.completed_total, 5);
        assert_eq!(stats.best_period, 3);
        // Jan 8 is a Monday without the gym session.
        assert_eq!(stats.perfect_days, 3);
        assert_eq!(stats.average, 1);
    }
}
