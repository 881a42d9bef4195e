use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::TrackerError;
use crate::schedule::Schedule;

pub const MAX_NAME_LENGTH: usize = 38;

pub type TrackerId = Uuid;

/// A habit (non-empty schedule) or one-off event (empty schedule).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct Tracker {
    pub id: TrackerId,
    pub name: String,
    pub color: String,
    pub emoji: String,
    pub schedule: Schedule,
}

impl Tracker {
    pub fn is_one_off(&self) -> bool {
        self.schedule.is_one_off()
    }

    /// Case-insensitive substring match on the display name.
    pub fn name_matches(&self, term: &str) -> bool {
        self.name.to_lowercase().contains(&term.to_lowercase())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TrackerCategory {
    pub title: String,
    pub trackers: Vec<Tracker>,
}

impl TrackerCategory {
    pub fn new(title: impl Into<String>, trackers: Vec<Tracker>) -> Self {
        Self {
            title: title.into(),
            trackers,
        }
    }
}

/// User input for creating or editing a tracker.
#[derive(Debug, Clone, Default)]
pub struct TrackerDraft {
    pub name: String,
    pub color: String,
    pub emoji: String,
    pub schedule: Schedule,
}

impl TrackerDraft {
    pub fn new(name: impl Into<String>, schedule: Schedule) -> Self {
        Self {
            name: name.into(),
            schedule,
            ..Self::default()
        }
    }

    pub fn with_color(mut self, color: impl Into<String>) -> Self {
        self.color = color.into();
        self
    }

    pub fn with_emoji(mut self, emoji: impl Into<String>) -> Self {
        self.emoji = emoji.into();
        self
    }

    /// Validates the draft and assigns a fresh identifier.
    pub fn build(self) -> Result<Tracker, TrackerError> {
        self.into_tracker(Uuid::new_v4())
    }

    /// Validates the draft as an edit of `existing`; the identifier is kept.
    pub fn apply_to(self, existing: &Tracker) -> Result<Tracker, TrackerError> {
        self.into_tracker(existing.id)
    }

    fn into_tracker(self, id: TrackerId) -> Result<Tracker, TrackerError> {
        let name = self.name.trim().to_string();
        if name.is_empty() {
            return Err(TrackerError::EmptyName);
        }
        let length = name.chars().count();
        if length > MAX_NAME_LENGTH {
            return Err(TrackerError::NameTooLong {
                length,
                max: MAX_NAME_LENGTH,
            });
        }
        Ok(Tracker {
            id,
            name,
            color: self.color,
            emoji: self.emoji,
            schedule: self.schedule,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schedule::Weekday;

    #[test]
    fn build_trims_name_and_assigns_id() {
        let tracker = TrackerDraft::new("  Water plants ", Schedule::new([Weekday::Sunday]))
            .with_emoji("🌺")
            .with_color("#33CF69")
            .build()
            .unwrap();
        assert_eq!(tracker.name, "Water plants");
        assert_eq!(tracker.emoji, "🌺");
        assert!(!tracker.id.is_nil());
    }

    #[test]
    fn rejects_blank_and_overlong_names() {
        assert_eq!(
            TrackerDraft::new("   ", Schedule::one_off()).build(),
            Err(TrackerError::EmptyName)
        );
        let long = "й".repeat(MAX_NAME_LENGTH + 1);
        assert_eq!(
            TrackerDraft::new(long, Schedule::one_off()).build(),
            Err(TrackerError::NameTooLong {
                length: MAX_NAME_LENGTH + 1,
                max: MAX_NAME_LENGTH
            })
        );
        let exact = "й".repeat(MAX_NAME_LENGTH);
        assert!(TrackerDraft::new(exact, Schedule::one_off()).build().is_ok());
    }

    #[test]
    fn editing_keeps_identifier() {
        let original = TrackerDraft::new("Run", Schedule::every_day()).build().unwrap();
        let edited = TrackerDraft::new("Run 5k", Schedule::every_day())
            .apply_to(&original)
            .unwrap();
        assert_eq!(edited.id, original.id);
        assert_eq!(edited.name, "Run 5k");
    }

    #[test]
    fn name_match_ignores_case() {
        let tracker = TrackerDraft::new("Morning Run", Schedule::one_off()).build().unwrap();
        assert!(tracker.name_matches("morning"));
        assert!(tracker.name_matches("RUN"));
        assert!(!tracker.name_matches("swim"));
    }
}
