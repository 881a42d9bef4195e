use anyhow::{anyhow, Result};
use chrono::{Local, NaiveDate};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};

use crate::error::TrackerError;
use crate::filter::{compute_visible, FilterMode, VisibleProjection};
use crate::ledger::{CompletionLedger, TrackerRecord};
use crate::reconcile::{reconcile, PatchDecision, ReconcileConfig, StorageChange};
use crate::settings::{FilterModeStore, FilterPreference};
use crate::stats::CompletionStats;
use crate::storage::TrackerStorage;
use crate::tracker::{TrackerCategory, TrackerId};

/// Source of "today" for the Today filter and future-date checks.
pub trait Clock: Send + Sync {
    fn today(&self) -> NaiveDate;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn today(&self) -> NaiveDate {
        Local::now().date_naive()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Trigger {
    DateChanged(NaiveDate),
    ModeChanged(FilterMode),
    SearchChanged(String),
    StorageChanged(StorageChange),
}

/// Which placeholder the screen shows instead of the collection.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum EmptyState {
    Hidden,
    NoTrackers,
    NothingFound,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct CellState {
    pub completed: bool,
    pub days_completed: usize,
    pub can_toggle: bool,
}

/// Owns the selected date, filter mode, search term and the last projection
/// handed to the UI. Every trigger is handled to completion before the next.
pub struct TrackerService {
    storage: Box<dyn TrackerStorage>,
    preference: FilterPreference,
    clock: Box<dyn Clock>,
    config: ReconcileConfig,
    selected_date: NaiveDate,
    mode: FilterMode,
    search_term: String,
    projection: VisibleProjection,
    // Snapshot the projection was computed from.
    categories: Vec<TrackerCategory>,
    ledger: CompletionLedger,
}

pub struct TrackerServiceBuilder {
    storage: Option<Box<dyn TrackerStorage>>,
    filter_store: Option<Box<dyn FilterModeStore>>,
    clock: Box<dyn Clock>,
    config: ReconcileConfig,
    selected_date: Option<NaiveDate>,
}

impl Default for TrackerServiceBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl TrackerServiceBuilder {
    pub fn new() -> Self {
        Self {
            storage: None,
            filter_store: None,
            clock: Box::new(SystemClock),
            config: ReconcileConfig::from_env().unwrap_or_default(),
            selected_date: None,
        }
    }

    pub fn with_storage(mut self, storage: Box<dyn TrackerStorage>) -> Self {
        self.storage = Some(storage);
        self
    }

    pub fn with_filter_store(mut self, store: Box<dyn FilterModeStore>) -> Self {
        self.filter_store = Some(store);
        self
    }

    pub fn with_clock(mut self, clock: Box<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_config(mut self, config: ReconcileConfig) -> Self {
        self.config = config;
        self
    }

    /// Defaults to the clock's today.
    pub fn starting_on(mut self, date: NaiveDate) -> Self {
        self.selected_date = Some(date);
        self
    }

    pub fn build(self) -> Result<TrackerService> {
        let storage = self
            .storage
            .ok_or_else(|| anyhow!("tracker storage not configured"))?;
        let preference = self
            .filter_store
            .map(FilterPreference::new)
            .unwrap_or_default();
        let selected_date = self.selected_date.unwrap_or_else(|| self.clock.today());
        let mode = preference.load();

        let mut service = TrackerService {
            storage,
            preference,
            clock: self.clock,
            config: self.config,
            selected_date,
            mode,
            search_term: String::new(),
            projection: VisibleProjection::default(),
            categories: Vec::new(),
            ledger: CompletionLedger::new(),
        };
        if mode == FilterMode::Today {
            service.apply_today();
        }
        service.projection = service.recompute();
        info!(
            mode = %service.mode,
            date = %service.selected_date,
            trackers = service.projection.tracker_count(),
            "tracker service ready"
        );
        Ok(service)
    }
}

impl TrackerService {
    pub fn builder() -> TrackerServiceBuilder {
        TrackerServiceBuilder::new()
    }

    pub fn current_projection(&self) -> &VisibleProjection {
        &self.projection
    }

    pub fn selected_date(&self) -> NaiveDate {
        self.selected_date
    }

    pub fn mode(&self) -> FilterMode {
        self.mode
    }

    pub fn search_term(&self) -> &str {
        &self.search_term
    }

    pub fn config(&self) -> &ReconcileConfig {
        &self.config
    }

    pub fn filter_highlighted(&self) -> bool {
        self.mode.highlights_filter_button()
    }

    /// Updates state for `trigger`, refetches storage, recomputes the
    /// projection and returns how the UI should move to it.
    #[instrument(skip(self))]
    pub fn apply(&mut self, trigger: Trigger) -> PatchDecision {
        let change = match trigger {
            Trigger::DateChanged(date) => {
                self.selected_date = date;
                StorageChange::default()
            }
            Trigger::ModeChanged(FilterMode::Today) => {
                self.apply_today();
                StorageChange::default()
            }
            Trigger::ModeChanged(mode) => {
                self.mode = mode;
                self.persist_mode();
                StorageChange::default()
            }
            Trigger::SearchChanged(text) => {
                self.search_term = text;
                StorageChange::default()
            }
            Trigger::StorageChanged(change) => change,
        };

        let next = self.recompute();
        let decision = reconcile(&self.projection, &next, &change, &self.config);
        debug!(
            sections = next.section_count(),
            trackers = next.tracker_count(),
            full_reload = decision.is_full_reload(),
            "projection recomputed"
        );
        self.projection = next;
        decision
    }

    /// Marks or unmarks `tracker_id` as done on the selected date.
    pub fn toggle_completion(&mut self, tracker_id: TrackerId) -> Result<PatchDecision> {
        if self.selected_date > self.clock.today() {
            return Err(TrackerError::FutureCompletion(self.selected_date).into());
        }
        let known = self
            .categories
            .iter()
            .flat_map(|category| category.trackers.iter())
            .any(|tracker| tracker.id == tracker_id);
        if !known {
            return Err(TrackerError::UnknownTracker(tracker_id).into());
        }

        if self.ledger.is_completed(tracker_id, self.selected_date) {
            self.storage
                .remove_completion_record(tracker_id, self.selected_date)?;
        } else {
            self.storage
                .add_completion_record(TrackerRecord::on_day(tracker_id, self.selected_date))?;
        }

        let before = self.projection.position_of(tracker_id);
        let mut decision = self.apply(Trigger::StorageChanged(StorageChange::default()));
        // The checkmark lives outside the tracker value, so a row that stayed
        // put still needs a reload.
        if let (Some(position), PatchDecision::Patch(patch)) = (before, &mut decision) {
            let stayed = self.projection.position_of(tracker_id).is_some()
                && !patch.deleted.contains(&position)
                && !patch.updated.contains(&position)
                && !patch.moved.iter().any(|(from, _)| *from == position);
            if stayed {
                patch.updated.push(position);
                patch.updated.sort();
            }
        }
        Ok(decision)
    }

    pub fn cell_state(&self, tracker_id: TrackerId) -> CellState {
        CellState {
            completed: self.ledger.is_completed(tracker_id, self.selected_date),
            days_completed: self.ledger.completion_count(tracker_id),
            can_toggle: self.selected_date <= self.clock.today(),
        }
    }

    pub fn empty_state(&self) -> EmptyState {
        if !self.projection.is_empty() {
            EmptyState::Hidden
        } else if self.search_term.is_empty() && self.mode == FilterMode::All {
            EmptyState::NoTrackers
        } else {
            EmptyState::NothingFound
        }
    }

    pub fn stats(&self) -> CompletionStats {
        CompletionStats::compute(&self.categories, &self.ledger)
    }

    fn apply_today(&mut self) {
        self.selected_date = self.clock.today();
        self.mode = FilterMode::All;
        self.persist_mode();
    }

    fn persist_mode(&self) {
        if let Err(err) = self.preference.save(self.mode) {
            warn!(%err, mode = %self.mode, "unable to persist filter mode");
        }
    }

    fn recompute(&mut self) -> VisibleProjection {
        self.categories = self.fetch_categories();
        self.ledger = self.fetch_ledger();
        compute_visible(
            &self.categories,
            &self.ledger,
            self.selected_date,
            self.mode,
            Some(self.search_term.as_str()),
        )
    }

    fn fetch_categories(&self) -> Vec<TrackerCategory> {
        self.storage.fetch_categories().unwrap_or_else(|err| {
            warn!(%err, "category snapshot unavailable");
            Vec::new()
        })
    }

    fn fetch_ledger(&self) -> CompletionLedger {
        match self.storage.fetch_completion_records() {
            Ok(records) => CompletionLedger::from_records(records),
            Err(err) => {
                warn!(%err, "completion records unavailable");
                CompletionLedger::new()
            }
        }
    }
}
