use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::hash::{Hash, Hasher};

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};

use crate::tracker::TrackerId;

/// "Tracker was marked done on this calendar day." Equality and hashing
/// ignore the time of day.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct TrackerRecord {
    pub tracker_id: TrackerId,
    pub date: NaiveDateTime,
}

impl TrackerRecord {
    pub fn new(tracker_id: TrackerId, date: NaiveDateTime) -> Self {
        Self { tracker_id, date }
    }

    pub fn on_day(tracker_id: TrackerId, day: NaiveDate) -> Self {
        Self::new(tracker_id, day.and_time(NaiveTime::default()))
    }

    pub fn day(&self) -> NaiveDate {
        self.date.date()
    }
}

impl PartialEq for TrackerRecord {
    fn eq(&self, other: &Self) -> bool {
        self.tracker_id == other.tracker_id && self.day() == other.day()
    }
}

impl Eq for TrackerRecord {}

impl Hash for TrackerRecord {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.tracker_id.hash(state);
        self.day().hash(state);
    }
}

/// Day-granular set of completion records keyed by tracker.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CompletionLedger {
    days_by_tracker: HashMap<TrackerId, BTreeSet<NaiveDate>>,
}

impl CompletionLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_records(records: impl IntoIterator<Item = TrackerRecord>) -> Self {
        let mut ledger = Self::new();
        for record in records {
            ledger.insert(record);
        }
        ledger
    }

    /// Returns false when the tracker already has a record on that day.
    pub fn insert(&mut self, record: TrackerRecord) -> bool {
        self.days_by_tracker
            .entry(record.tracker_id)
            .or_default()
            .insert(record.day())
    }

    pub fn remove(&mut self, tracker_id: TrackerId, day: NaiveDate) -> bool {
        let Some(days) = self.days_by_tracker.get_mut(&tracker_id) else {
            return false;
        };
        let removed = days.remove(&day);
        if days.is_empty() {
            self.days_by_tracker.remove(&tracker_id);
        }
        removed
    }

    pub fn is_completed(&self, tracker_id: TrackerId, day: NaiveDate) -> bool {
        self.days_by_tracker
            .get(&tracker_id)
            .is_some_and(|days| days.contains(&day))
    }

    /// Total number of days the tracker was completed, across all time.
    pub fn completion_count(&self, tracker_id: TrackerId) -> usize {
        self.days_by_tracker
            .get(&tracker_id)
            .map_or(0, BTreeSet::len)
    }

    pub fn has_ever_been_completed(&self, tracker_id: TrackerId) -> bool {
        self.completion_count(tracker_id) > 0
    }

    pub fn total_completions(&self) -> usize {
        self.days_by_tracker.values().map(BTreeSet::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.days_by_tracker.is_empty()
    }

    /// Trackers completed per calendar day, in date order.
    pub fn completions_by_day(&self) -> BTreeMap<NaiveDate, BTreeSet<TrackerId>> {
        let mut by_day: BTreeMap<NaiveDate, BTreeSet<TrackerId>> = BTreeMap::new();
        for (tracker_id, days) in &self.days_by_tracker {
            for day in days {
                by_day.entry(*day).or_default().insert(*tracker_id);
            }
        }
        by_day
    }

    pub fn records(&self) -> Vec<TrackerRecord> {
        let mut records: Vec<TrackerRecord> = self
            .days_by_tracker
            .iter()
            .flat_map(|(tracker_id, days)| {
                days.iter()
                    .map(move |day| TrackerRecord::on_day(*tracker_id, *day))
            })
            .collect();
        records.sort_by(|a, b| a.date.cmp(&b.date).then_with(|| a.tracker_id.cmp(&b.tracker_id)));
        records
    }
}

impl FromIterator<TrackerRecord> for CompletionLedger {
    fn from_iter<I: IntoIterator<Item = TrackerRecord>>(iter: I) -> Self {
        Self::from_records(iter)
    }
}
