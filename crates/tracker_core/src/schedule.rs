use std::collections::BTreeSet;
use std::fmt;

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Day of the week with a canonical ordinal, Monday = 0 through Sunday = 6.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Weekday {
    Monday,
    Tuesday,
    Wednesday,
    Thursday,
    Friday,
    Saturday,
    Sunday,
}

impl Weekday {
    pub const ALL: [Weekday; 7] = [
        Weekday::Monday,
        Weekday::Tuesday,
        Weekday::Wednesday,
        Weekday::Thursday,
        Weekday::Friday,
        Weekday::Saturday,
        Weekday::Sunday,
    ];

    /// Converts a platform calendar weekday number (Sunday = 1 … Saturday = 7)
    /// into the canonical weekday. Defined for every integer.
    pub fn from_calendar_ordinal(calendar_weekday: i64) -> Self {
        let canonical = (calendar_weekday.rem_euclid(7) + 5) % 7;
        Self::ALL[canonical as usize]
    }

    pub fn from_ordinal(ordinal: i64) -> Option<Self> {
        usize::try_from(ordinal)
            .ok()
            .and_then(|idx| Self::ALL.get(idx).copied())
    }

    pub fn of(date: NaiveDate) -> Self {
        Self::from_calendar_ordinal(i64::from(date.weekday().number_from_sunday()))
    }

    pub fn ordinal(self) -> u8 {
        self as u8
    }

    pub fn name(self) -> &'static str {
        match self {
            Weekday::Monday => "Monday",
            Weekday::Tuesday => "Tuesday",
            Weekday::Wednesday => "Wednesday",
            Weekday::Thursday => "Thursday",
            Weekday::Friday => "Friday",
            Weekday::Saturday => "Saturday",
            Weekday::Sunday => "Sunday",
        }
    }

    pub fn short_name(self) -> &'static str {
        match self {
            Weekday::Monday => "Mon",
            Weekday::Tuesday => "Tue",
            Weekday::Wednesday => "Wed",
            Weekday::Thursday => "Thu",
            Weekday::Friday => "Fri",
            Weekday::Saturday => "Sat",
            Weekday::Sunday => "Sun",
        }
    }
}

impl fmt::Display for Weekday {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Weekly recurrence of a tracker. An empty schedule marks a one-off event.
///
/// Serialized as a list of canonical ordinals. Decoding drops elements that do
/// not name a weekday instead of failing.
#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq, Hash)]
#[serde(into = "Vec<u8>")]
pub struct Schedule {
    days: BTreeSet<Weekday>,
}

impl Schedule {
    pub fn new(days: impl IntoIterator<Item = Weekday>) -> Self {
        Self {
            days: days.into_iter().collect(),
        }
    }

    pub fn one_off() -> Self {
        Self::default()
    }

    pub fn every_day() -> Self {
        Self::new(Weekday::ALL)
    }

    pub fn from_ordinals(ordinals: impl IntoIterator<Item = i64>) -> Self {
        let mut days = BTreeSet::new();
        for ordinal in ordinals {
            match Weekday::from_ordinal(ordinal) {
                Some(day) => {
                    days.insert(day);
                }
                None => tracing::warn!(ordinal, "dropping out-of-range weekday ordinal"),
            }
        }
        Self { days }
    }

    pub fn is_one_off(&self) -> bool {
        self.days.is_empty()
    }

    pub fn contains(&self, day: Weekday) -> bool {
        self.days.contains(&day)
    }

    pub fn days(&self) -> impl Iterator<Item = Weekday> + '_ {
        self.days.iter().copied()
    }

    pub fn len(&self) -> usize {
        self.days.len()
    }

    pub fn is_empty(&self) -> bool {
        self.days.is_empty()
    }

    /// Comma separated short names, Monday first; "Every day" for a full week.
    pub fn short_names(&self) -> String {
        if self.days.len() == Weekday::ALL.len() {
            return "Every day".to_string();
        }
        self.days
            .iter()
            .map(|day| day.short_name())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl FromIterator<Weekday> for Schedule {
    fn from_iter<I: IntoIterator<Item = Weekday>>(iter: I) -> Self {
        Self::new(iter)
    }
}

impl From<Vec<i64>> for Schedule {
    fn from(ordinals: Vec<i64>) -> Self {
        Self::from_ordinals(ordinals)
    }
}

impl<'de> Deserialize<'de> for Schedule {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let elements = Vec::<Value>::deserialize(deserializer)?;
        let ordinals = elements.into_iter().filter_map(|element| {
            let ordinal = element.as_i64();
            if ordinal.is_none() {
                tracing::warn!(%element, "dropping non-integer weekday ordinal");
            }
            ordinal
        });
        Ok(Self::from_ordinals(ordinals))
    }
}

impl From<Schedule> for Vec<u8> {
    fn from(schedule: Schedule) -> Self {
        schedule.days.iter().map(|day| day.ordinal()).collect()
    }
}
