use std::collections::HashSet;
use std::sync::Arc;

use anyhow::Result;
use chrono::NaiveDate;
use parking_lot::RwLock;
use tracing::debug;

use crate::error::TrackerError;
use crate::filter::Position;
use crate::ledger::TrackerRecord;
use crate::reconcile::StorageChange;
use crate::tracker::{Tracker, TrackerCategory, TrackerId};

/// Snapshot reads and completion writes offered by the persistence layer.
pub trait TrackerStorage: Send + Sync {
    /// Every category with its trackers, in backing order.
    fn fetch_categories(&self) -> Result<Vec<TrackerCategory>>;
    fn fetch_completion_records(&self) -> Result<Vec<TrackerRecord>>;
    fn add_completion_record(&self, record: TrackerRecord) -> Result<()>;
    /// Removes the tracker's record for that calendar day, if any.
    fn remove_completion_record(&self, tracker_id: TrackerId, day: NaiveDate) -> Result<()>;
}

/// In-process storage. Writes report positions in backing order, the same
/// addressing a fetched-results controller uses.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    categories: RwLock<Vec<TrackerCategory>>,
    records: RwLock<HashSet<TrackerRecord>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_categories(categories: Vec<TrackerCategory>) -> Self {
        Self {
            categories: RwLock::new(categories),
            records: RwLock::new(HashSet::new()),
        }
    }

    pub fn tracker(&self, tracker_id: TrackerId) -> Option<Tracker> {
        let categories = self.categories.read();
        let position = Self::locate(&categories, tracker_id)?;
        Some(categories[position.section].trackers[position.row].clone())
    }

    pub fn category_titles(&self) -> Vec<String> {
        self.categories
            .read()
            .iter()
            .map(|category| category.title.clone())
            .collect()
    }

    pub fn create_tracker(&self, tracker: Tracker, category_title: &str) -> Result<StorageChange> {
        let mut categories = self.categories.write();
        let section = Self::fetch_or_create_category(&mut categories, category_title);
        let trackers = &mut categories[section].trackers;
        trackers.push(tracker);
        let position = Position::new(section, trackers.len() - 1);
        debug!(?position, category = category_title, "tracker created");
        Ok(StorageChange::inserted(position))
    }

    /// Replaces the stored tracker with the same id, moving it when the
    /// category changes.
    pub fn update_tracker(&self, tracker: Tracker, category_title: &str) -> Result<StorageChange> {
        let mut categories = self.categories.write();
        let from = Self::locate(&categories, tracker.id)
            .ok_or(TrackerError::UnknownTracker(tracker.id))?;
        if categories[from.section].title == category_title {
            categories[from.section].trackers[from.row] = tracker;
            return Ok(StorageChange::updated(from));
        }
        categories[from.section].trackers.remove(from.row);
        let section = Self::fetch_or_create_category(&mut categories, category_title);
        let trackers = &mut categories[section].trackers;
        trackers.push(tracker);
        let to = Position::new(section, trackers.len() - 1);
        debug!(?from, ?to, "tracker moved between categories");
        Ok(StorageChange::moved(from, to))
    }

    pub fn delete_tracker(&self, tracker_id: TrackerId) -> Result<StorageChange> {
        let mut categories = self.categories.write();
        let position =
            Self::locate(&categories, tracker_id).ok_or(TrackerError::UnknownTracker(tracker_id))?;
        categories[position.section].trackers.remove(position.row);
        self.records
            .write()
            .retain(|record| record.tracker_id != tracker_id);
        Ok(StorageChange::deleted(position))
    }

    fn locate(categories: &[TrackerCategory], tracker_id: TrackerId) -> Option<Position> {
        categories
            .iter()
            .enumerate()
            .find_map(|(section, category)| {
                category
                    .trackers
                    .iter()
                    .position(|tracker| tracker.id == tracker_id)
                    .map(|row| Position::new(section, row))
            })
    }

    fn fetch_or_create_category(categories: &mut Vec<TrackerCategory>, title: &str) -> usize {
        if let Some(idx) = categories.iter().position(|category| category.title == title) {
            return idx;
        }
        categories.push(TrackerCategory::new(title, Vec::new()));
        categories.len() - 1
    }
}

impl TrackerStorage for MemoryStorage {
    fn fetch_categories(&self) -> Result<Vec<TrackerCategory>> {
        Ok(self.categories.read().clone())
    }

    fn fetch_completion_records(&self) -> Result<Vec<TrackerRecord>> {
        Ok(self.records.read().iter().copied().collect())
    }

    fn add_completion_record(&self, record: TrackerRecord) -> Result<()> {
        self.records.write().insert(record);
        Ok(())
    }

    fn remove_completion_record(&self, tracker_id: TrackerId, day: NaiveDate) -> Result<()> {
        self.records
            .write()
            .remove(&TrackerRecord::on_day(tracker_id, day));
        Ok(())
    }
}

impl<T: TrackerStorage + ?Sized> TrackerStorage for Arc<T> {
    fn fetch_categories(&self) -> Result<Vec<TrackerCategory>> {
        (**self).fetch_categories()
    }

    fn fetch_completion_records(&self) -> Result<Vec<TrackerRecord>> {
        (**self).fetch_completion_records()
    }

    fn add_completion_record(&self, record: TrackerRecord) -> Result<()> {
        (**self).add_completion_record(record)
    }

    fn remove_completion_record(&self, tracker_id: TrackerId, day: NaiveDate) -> Result<()> {
        (**self).remove_completion_record(tracker_id, day)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schedule::Schedule;
    use crate::tracker::TrackerDraft;

    fn tracker(name: &str) -> Tracker {
        TrackerDraft::new(name, Schedule::every_day()).build().unwrap()
    }

    #[test]
    fn create_reports_backing_position_and_creates_category() {
        let storage = MemoryStorage::new();
        let first = storage.create_tracker(tracker("a"), "Home").unwrap();
        let second = storage.create_tracker(tracker("b"), "Work").unwrap();
        let third = storage.create_tracker(tracker("c"), "Home").unwrap();
        assert_eq!(first.inserted, vec![Position::new(0, 0)]);
        assert_eq!(second.inserted, vec![Position::new(1, 0)]);
        assert_eq!(third.inserted, vec![Position::new(0, 1)]);
        assert_eq!(storage.category_titles(), vec!["Home", "Work"]);
    }

    #[test]
    fn update_in_place_or_across_categories() {
        let storage = MemoryStorage::new();
        let original = tracker("a");
        storage.create_tracker(original.clone(), "Home").unwrap();

        let edited = TrackerDraft::new("a2", Schedule::one_off()).apply_to(&original).unwrap();
        let change = storage.update_tracker(edited.clone(), "Home").unwrap();
        assert_eq!(change.updated, vec![Position::new(0, 0)]);
        assert_eq!(storage.tracker(original.id), Some(edited.clone()));

        let change = storage.update_tracker(edited, "Work").unwrap();
        assert_eq!(change.moved, vec![(Position::new(0, 0), Position::new(1, 0))]);
    }

    #[test]
    fn unknown_tracker_is_an_error() {
        let storage = MemoryStorage::new();
        let missing = tracker("ghost");
        let err = storage.delete_tracker(missing.id).unwrap_err();
        assert_eq!(
            err.downcast_ref::<TrackerError>(),
            Some(&TrackerError::UnknownTracker(missing.id))
        );
        assert!(storage.update_tracker(missing, "Home").is_err());
    }

    #[test]
    fn deleting_a_tracker_drops_its_records() {
        let storage = MemoryStorage::new();
        let doomed = tracker("a");
        storage.create_tracker(doomed.clone(), "Home").unwrap();
        let day = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        storage
            .add_completion_record(TrackerRecord::on_day(doomed.id, day))
            .unwrap();
        storage
            .add_completion_record(TrackerRecord::new(doomed.id, day.and_hms_opt(9, 0, 0).unwrap()))
            .unwrap();
        assert_eq!(storage.fetch_completion_records().unwrap().len(), 1);

        let change = storage.delete_tracker(doomed.id).unwrap();
        assert_eq!(change.deleted, vec![Position::new(0, 0)]);
        assert!(storage.fetch_completion_records().unwrap().is_empty());
    }
}
