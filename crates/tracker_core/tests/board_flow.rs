use std::fs;
use std::sync::Arc;

use anyhow::{anyhow, Result};
use chrono::NaiveDate;
use tempfile::tempdir;
use tracker_core::{
    filter::{FilterMode, Position},
    ledger::TrackerRecord,
    reconcile::{Patch, PatchDecision},
    schedule::{Schedule, Weekday},
    service::{Clock, EmptyState, TrackerService, Trigger},
    settings::JsonFileFilterModeStore,
    storage::{MemoryStorage, TrackerStorage},
    tracker::{TrackerCategory, TrackerDraft, TrackerId},
};

struct FixedClock(NaiveDate);

impl Clock for FixedClock {
    fn today(&self) -> NaiveDate {
        self.0
    }
}

struct OfflineStorage;

impl TrackerStorage for OfflineStorage {
    fn fetch_categories(&self) -> Result<Vec<TrackerCategory>> {
        Err(anyhow!("store offline"))
    }

    fn fetch_completion_records(&self) -> Result<Vec<TrackerRecord>> {
        Err(anyhow!("store offline"))
    }

    fn add_completion_record(&self, _record: TrackerRecord) -> Result<()> {
        Err(anyhow!("store offline"))
    }

    fn remove_completion_record(&self, _tracker_id: TrackerId, _day: NaiveDate) -> Result<()> {
        Err(anyhow!("store offline"))
    }
}

fn date(d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 1, d).expect("valid date")
}

#[test]
fn board_follows_dates_filters_search_and_storage_events() {
    let temp = tempdir().expect("tempdir");
    let settings_path = temp.path().join("settings.json");
    // 2024-01-10 is a Wednesday.
    let today = date(10);

    let storage = Arc::new(MemoryStorage::new());
    let stretch = TrackerDraft::new("Stretch", Schedule::new([Weekday::Monday, Weekday::Wednesday]))
        .with_emoji("🙂")
        .build()
        .expect("stretch");
    let passport = TrackerDraft::new("Renew passport", Schedule::one_off())
        .build()
        .expect("passport");
    storage.create_tracker(stretch.clone(), "Health").expect("create");
    storage.create_tracker(passport.clone(), "Errands").expect("create");

    let mut service = TrackerService::builder()
        .with_storage(Box::new(storage.clone()))
        .with_filter_store(Box::new(JsonFileFilterModeStore::new(&settings_path)))
        .with_clock(Box::new(FixedClock(today)))
        .build()
        .expect("build tracker service");

    assert_eq!(service.selected_date(), today);
    assert_eq!(
        service.current_projection().titles().collect::<Vec<_>>(),
        vec!["Health", "Errands"]
    );

    service.toggle_completion(passport.id).expect("complete passport");
    assert!(service.cell_state(passport.id).completed);

    // Thursday: the habit is off schedule and the finished event is gone.
    let decision = service.apply(Trigger::DateChanged(date(11)));
    assert!(decision.is_full_reload());
    assert!(service.current_projection().is_empty());
    assert_eq!(service.empty_state(), EmptyState::NoTrackers);

    service.apply(Trigger::DateChanged(today));
    service.apply(Trigger::ModeChanged(FilterMode::Finished));
    assert!(service.filter_highlighted());
    let finished: Vec<_> = service
        .current_projection()
        .entries()
        .map(|(_, tracker)| tracker.id)
        .collect();
    assert_eq!(finished, vec![passport.id]);
    assert!(fs::read_to_string(&settings_path)
        .expect("settings written")
        .contains("finished"));

    let mut reopened = TrackerService::builder()
        .with_storage(Box::new(storage.clone()))
        .with_filter_store(Box::new(JsonFileFilterModeStore::new(&settings_path)))
        .with_clock(Box::new(FixedClock(today)))
        .starting_on(date(1))
        .build()
        .expect("reopen tracker service");
    assert_eq!(reopened.mode(), FilterMode::Finished);

    reopened.apply(Trigger::ModeChanged(FilterMode::Today));
    assert_eq!(reopened.mode(), FilterMode::All);
    assert_eq!(reopened.selected_date(), today);
    assert!(!fs::read_to_string(&settings_path)
        .expect("settings written")
        .contains("selectedFilter"));

    let yoga = TrackerDraft::new("Yoga", Schedule::every_day())
        .build()
        .expect("yoga");
    let change = storage.create_tracker(yoga.clone(), "Health").expect("create");
    assert_eq!(
        reopened.apply(Trigger::StorageChanged(change)),
        PatchDecision::Patch(Patch {
            inserted: vec![Position::new(0, 1)],
            ..Patch::default()
        })
    );

    let renamed = TrackerDraft::new("Evening yoga", Schedule::every_day())
        .apply_to(&yoga)
        .expect("rename");
    let change = storage.update_tracker(renamed, "Health").expect("update");
    assert_eq!(
        reopened.apply(Trigger::StorageChanged(change)),
        PatchDecision::Patch(Patch {
            updated: vec![Position::new(0, 1)],
            ..Patch::default()
        })
    );

    let decision = reopened.apply(Trigger::SearchChanged("YOGA".into()));
    assert!(decision.is_full_reload());
    let projection = reopened.current_projection();
    assert_eq!(projection.tracker_count(), 1);
    assert_eq!(projection.sections()[0].trackers[0].name, "Evening yoga");

    let stats = reopened.stats();
    assert_eq!(stats.completed_total, 1);
    assert_eq!(stats.best_period, 1);
}

#[test]
fn unavailable_storage_yields_an_empty_board() {
    let mut service = TrackerService::builder()
        .with_storage(Box::new(OfflineStorage))
        .with_clock(Box::new(FixedClock(date(10))))
        .build()
        .expect("build tracker service");

    assert!(service.current_projection().is_empty());
    assert_eq!(service.empty_state(), EmptyState::NoTrackers);
    let decision = service.apply(Trigger::DateChanged(date(11)));
    assert_eq!(decision, PatchDecision::Patch(Patch::default()));
    assert!(service.stats().is_empty());
}
