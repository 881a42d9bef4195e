use std::collections::{HashMap, HashSet};

use anyhow::Result;
use serde::{Deserialize, Serialize};
use tracing::debug;

pub use crate::filter::Position;
use crate::filter::VisibleProjection;
use crate::tracker::{Tracker, TrackerId};

pub const DEFAULT_FULL_RELOAD_THRESHOLD: usize = 5;
pub const FULL_RELOAD_THRESHOLD_VAR: &str = "TRACKER_FULL_RELOAD_THRESHOLD";

/// Positional change notification from storage, addressed in the storage's
/// own backing order.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct StorageChange {
    pub inserted: Vec<Position>,
    pub deleted: Vec<Position>,
    pub updated: Vec<Position>,
    pub moved: Vec<(Position, Position)>,
}

impl StorageChange {
    pub fn inserted(position: Position) -> Self {
        Self {
            inserted: vec![position],
            ..Self::default()
        }
    }

    pub fn deleted(position: Position) -> Self {
        Self {
            deleted: vec![position],
            ..Self::default()
        }
    }

    pub fn updated(position: Position) -> Self {
        Self {
            updated: vec![position],
            ..Self::default()
        }
    }

    pub fn moved(from: Position, to: Position) -> Self {
        Self {
            moved: vec![(from, to)],
            ..Self::default()
        }
    }

    /// Inserted, deleted and updated positions; moves are gated separately.
    pub fn change_count(&self) -> usize {
        self.inserted.len() + self.deleted.len() + self.updated.len()
    }

    pub fn is_empty(&self) -> bool {
        self.change_count() == 0 && self.moved.is_empty()
    }
}

/// Collection-view batch update. Deletes, updates and move sources use the
/// old projection's coordinates; inserts and move targets use the new one's.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Patch {
    pub inserted: Vec<Position>,
    pub deleted: Vec<Position>,
    pub updated: Vec<Position>,
    pub moved: Vec<(Position, Position)>,
}

impl Patch {
    pub fn is_empty(&self) -> bool {
        self.inserted.is_empty()
            && self.deleted.is_empty()
            && self.updated.is_empty()
            && self.moved.is_empty()
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum ReloadReason {
    SectionsChanged,
    StorageMoves,
    MixedInsertDelete,
    TooManyChanges { count: usize },
    InconsistentSnapshot,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum PatchDecision {
    FullReload(ReloadReason),
    Patch(Patch),
}

impl PatchDecision {
    pub fn is_full_reload(&self) -> bool {
        matches!(self, PatchDecision::FullReload(_))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconcileConfig {
    /// Storage changes above this count are redrawn instead of animated.
    pub full_reload_threshold: usize,
}

impl Default for ReconcileConfig {
    fn default() -> Self {
        Self {
            full_reload_threshold: DEFAULT_FULL_RELOAD_THRESHOLD,
        }
    }
}

impl ReconcileConfig {
    /// Reads `TRACKER_FULL_RELOAD_THRESHOLD`; unparseable values are ignored.
    pub fn from_env() -> Result<Self> {
        let raw = std::env::var(FULL_RELOAD_THRESHOLD_VAR).ok();
        Ok(Self::with_threshold_override(raw.as_deref()))
    }

    fn with_threshold_override(raw: Option<&str>) -> Self {
        let mut config = Self::default();
        if let Some(value) = raw.and_then(|raw| raw.trim().parse::<usize>().ok()) {
            config.full_reload_threshold = value;
        }
        config
    }
}

/// Decides between a full reload and a per-item patch taking `old` to `new`.
pub fn reconcile(
    old: &VisibleProjection,
    new: &VisibleProjection,
    change: &StorageChange,
    config: &ReconcileConfig,
) -> PatchDecision {
    let decision = match coarse_gate(old, new, change, config) {
        Some(reason) => PatchDecision::FullReload(reason),
        None => diff(old, new),
    };
    debug!(?decision, "reconciled projection change");
    decision
}

fn coarse_gate(
    old: &VisibleProjection,
    new: &VisibleProjection,
    change: &StorageChange,
    config: &ReconcileConfig,
) -> Option<ReloadReason> {
    if old.section_count() != new.section_count() || !old.titles().eq(new.titles()) {
        return Some(ReloadReason::SectionsChanged);
    }
    if !change.moved.is_empty() {
        return Some(ReloadReason::StorageMoves);
    }
    if !change.inserted.is_empty() && !change.deleted.is_empty() {
        return Some(ReloadReason::MixedInsertDelete);
    }
    let count = change.change_count();
    if count > config.full_reload_threshold {
        return Some(ReloadReason::TooManyChanges { count });
    }
    None
}

/// Per-tracker placement: absolute position plus rank among the trackers
/// present in both projections.
struct Slot<'a> {
    position: Position,
    survivor_rank: Option<usize>,
    tracker: &'a Tracker,
}

fn index_slots<'a>(
    projection: &'a VisibleProjection,
    survivors: &HashSet<TrackerId>,
) -> Option<HashMap<TrackerId, Slot<'a>>> {
    let mut slots = HashMap::new();
    let mut rank_in_section: HashMap<usize, usize> = HashMap::new();
    for (position, tracker) in projection.entries() {
        let survivor_rank = survivors.contains(&tracker.id).then(|| {
            let rank = rank_in_section.entry(position.section).or_insert(0);
            *rank += 1;
            *rank - 1
        });
        let slot = Slot {
            position,
            survivor_rank,
            tracker,
        };
        if slots.insert(tracker.id, slot).is_some() {
            return None;
        }
    }
    Some(slots)
}

fn diff(old: &VisibleProjection, new: &VisibleProjection) -> PatchDecision {
    let old_ids: HashSet<TrackerId> = old.entries().map(|(_, tracker)| tracker.id).collect();
    let new_ids: HashSet<TrackerId> = new.entries().map(|(_, tracker)| tracker.id).collect();
    let common: HashSet<TrackerId> = old_ids.intersection(&new_ids).copied().collect();

    let (Some(old_slots), Some(new_slots)) = (index_slots(old, &common), index_slots(new, &common))
    else {
        return PatchDecision::FullReload(ReloadReason::InconsistentSnapshot);
    };

    let mut patch = Patch::default();
    for (id, slot) in &old_slots {
        if !new_ids.contains(id) {
            patch.deleted.push(slot.position);
        }
    }
    for (id, slot) in &new_slots {
        if !old_ids.contains(id) {
            patch.inserted.push(slot.position);
        }
    }
    for id in &common {
        let (Some(before), Some(after)) = (old_slots.get(id), new_slots.get(id)) else {
            return PatchDecision::FullReload(ReloadReason::InconsistentSnapshot);
        };
        let stationary = before.position.section == after.position.section
            && before.survivor_rank == after.survivor_rank;
        let changed = before.tracker != after.tracker;
        match (stationary, changed) {
            (true, false) => {}
            (true, true) => patch.updated.push(before.position),
            (false, false) => patch.moved.push((before.position, after.position)),
            (false, true) => {
                patch.deleted.push(before.position);
                patch.inserted.push(after.position);
            }
        }
    }

    patch.inserted.sort();
    patch.deleted.sort();
    patch.updated.sort();
    patch.moved.sort();
    PatchDecision::Patch(patch)
}
