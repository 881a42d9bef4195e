use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::TrackerError;
use crate::ledger::CompletionLedger;
use crate::schedule::Weekday;
use crate::tracker::{Tracker, TrackerCategory, TrackerId};

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum FilterMode {
    #[default]
    All,
    /// One-shot: moves the selected date to today, then behaves as `All`.
    Today,
    Finished,
    Unfinished,
}

impl FilterMode {
    pub const ALL: [FilterMode; 4] = [
        FilterMode::All,
        FilterMode::Today,
        FilterMode::Finished,
        FilterMode::Unfinished,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            FilterMode::All => "all",
            FilterMode::Today => "today",
            FilterMode::Finished => "finished",
            FilterMode::Unfinished => "unfinished",
        }
    }

    /// Whether the filter button should render as active.
    pub fn highlights_filter_button(self) -> bool {
        matches!(self, FilterMode::Finished | FilterMode::Unfinished)
    }
}

impl fmt::Display for FilterMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FilterMode {
    type Err = TrackerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|mode| mode.as_str() == s)
            .ok_or_else(|| TrackerError::UnknownFilterMode(s.to_string()))
    }
}

/// Zero-based (section, row) address of a tracker slot.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Position {
    pub section: usize,
    pub row: usize,
}

impl Position {
    pub fn new(section: usize, row: usize) -> Self {
        Self { section, row }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct VisibleSection {
    pub title: String,
    pub trackers: Vec<Tracker>,
}

/// Categories and trackers visible for one date, mode and search term.
/// Never contains an empty section.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct VisibleProjection {
    sections: Vec<VisibleSection>,
}

impl VisibleProjection {
    pub fn sections(&self) -> &[VisibleSection] {
        &self.sections
    }

    pub fn section_count(&self) -> usize {
        self.sections.len()
    }

    pub fn tracker_count(&self) -> usize {
        self.sections.iter().map(|section| section.trackers.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.sections.is_empty()
    }

    pub fn titles(&self) -> impl Iterator<Item = &str> + '_ {
        self.sections.iter().map(|section| section.title.as_str())
    }

    pub fn tracker_at(&self, position: Position) -> Option<&Tracker> {
        self.sections
            .get(position.section)?
            .trackers
            .get(position.row)
    }

    pub fn position_of(&self, tracker_id: TrackerId) -> Option<Position> {
        self.entries()
            .find(|(_, tracker)| tracker.id == tracker_id)
            .map(|(position, _)| position)
    }

    /// Every tracker with its position, section by section.
    pub fn entries(&self) -> impl Iterator<Item = (Position, &Tracker)> + '_ {
        self.sections
            .iter()
            .enumerate()
            .flat_map(|(section_idx, section)| {
                section
                    .trackers
                    .iter()
                    .enumerate()
                    .map(move |(row, tracker)| (Position::new(section_idx, row), tracker))
            })
    }

    /// Tracker identifiers per section, in display order.
    pub fn layout(&self) -> Vec<Vec<TrackerId>> {
        self.sections
            .iter()
            .map(|section| section.trackers.iter().map(|tracker| tracker.id).collect())
            .collect()
    }
}

/// Projects `categories` onto what should be visible on `selected_date`.
///
/// `FilterMode::Today` is evaluated like `All`; moving the date is the
/// caller's job. A missing or empty search term leaves the result unchanged.
pub fn compute_visible(
    categories: &[TrackerCategory],
    ledger: &CompletionLedger,
    selected_date: NaiveDate,
    mode: FilterMode,
    search_term: Option<&str>,
) -> VisibleProjection {
    let weekday = Weekday::of(selected_date);
    let search_term = search_term.filter(|term| !term.is_empty());

    let sections = categories
        .iter()
        .filter_map(|category| {
            let trackers: Vec<Tracker> = category
                .trackers
                .iter()
                .filter(|tracker| is_visible(tracker, ledger, selected_date, weekday, mode))
                .filter(|tracker| search_term.map_or(true, |term| tracker.name_matches(term)))
                .cloned()
                .collect();
            if trackers.is_empty() {
                return None;
            }
            Some(VisibleSection {
                title: category.title.clone(),
                trackers,
            })
        })
        .collect();

    VisibleProjection { sections }
}

fn is_visible(
    tracker: &Tracker,
    ledger: &CompletionLedger,
    selected_date: NaiveDate,
    weekday: Weekday,
    mode: FilterMode,
) -> bool {
    match mode {
        FilterMode::All | FilterMode::Today => {
            is_eligible_on(tracker, ledger, selected_date, weekday)
        }
        FilterMode::Finished => {
            is_scheduled_on(tracker, weekday) && ledger.is_completed(tracker.id, selected_date)
        }
        FilterMode::Unfinished => {
            is_scheduled_on(tracker, weekday) && !ledger.is_completed(tracker.id, selected_date)
        }
    }
}

/// Day eligibility: habits on their weekdays; one-off events until their
/// first completion, and afterwards only on the day they were completed.
fn is_eligible_on(
    tracker: &Tracker,
    ledger: &CompletionLedger,
    selected_date: NaiveDate,
    weekday: Weekday,
) -> bool {
    if !tracker.is_one_off() {
        return tracker.schedule.contains(weekday);
    }
    !ledger.has_ever_been_completed(tracker.id) || ledger.is_completed(tracker.id, selected_date)
}

// Completion filters gate on weekday only; one-off events always pass.
fn is_scheduled_on(tracker: &Tracker, weekday: Weekday) -> bool {
    tracker.is_one_off() || tracker.schedule.contains(weekday)
}

pub(crate) fn is_eligible_for_all(
    tracker: &Tracker,
    ledger: &CompletionLedger,
    selected_date: NaiveDate,
) -> bool {
    is_eligible_on(tracker, ledger, selected_date, Weekday::of(selected_date))
}
