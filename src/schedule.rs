//! Output types: the structured timetable returned to callers.
//!
//! The JSON shape (camelCase keys, `lastUpdated` as epoch milliseconds,
//! `status` as `"OK"`/`"ERROR"`) is what front-ends consuming the CLI's
//! output expect, so the serde attributes here are part of the contract.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// Time ranges used to bucket entries when the caller does not supply its own.
pub const DEFAULT_TIME_SLOTS: [&str; 5] = [
    "08:00-10:00",
    "10:00-12:00",
    "13:00-15:00",
    "15:00-17:00",
    "17:00-19:00",
];

/// The schedule of one cohort, as extracted from one PDF.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupData {
    /// Canonical cohort identifier, e.g. `DEV101`.
    pub name: String,
    /// When the extraction finished.
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub last_updated: DateTime<Utc>,
    pub entries: Vec<ScheduleEntry>,
    pub status: GroupStatus,
    /// Reserved for a per-day digest; extraction always leaves it empty.
    pub monday_summary: Vec<ScheduleEntry>,
}

impl GroupData {
    /// Entries scheduled on `day`, in extraction order.
    pub fn entries_on(&self, day: DayOfWeek) -> impl Iterator<Item = &ScheduleEntry> {
        self.entries
            .iter()
            .filter(move |e| e.day.known() == Some(day))
    }
}

/// One class session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleEntry {
    pub group_name: String,
    pub day: ScheduleDay,
    /// Taken from the model as-is; not checked against the allowed slots.
    pub time_slot: String,
    pub room: String,
    pub professor: String,
}

/// Teaching days. Sunday is never scheduled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum DayOfWeek {
    Monday,
    Tuesday,
    Wednesday,
    Thursday,
    Friday,
    Saturday,
}

impl DayOfWeek {
    pub const ALL: [DayOfWeek; 6] = [
        DayOfWeek::Monday,
        DayOfWeek::Tuesday,
        DayOfWeek::Wednesday,
        DayOfWeek::Thursday,
        DayOfWeek::Friday,
        DayOfWeek::Saturday,
    ];

    /// Exact, case-sensitive lookup of the French day names used on timetables.
    pub fn from_french(label: &str) -> Option<Self> {
        match label {
            "Lundi" => Some(DayOfWeek::Monday),
            "Mardi" => Some(DayOfWeek::Tuesday),
            "Mercredi" => Some(DayOfWeek::Wednesday),
            "Jeudi" => Some(DayOfWeek::Thursday),
            "Vendredi" => Some(DayOfWeek::Friday),
            "Samedi" => Some(DayOfWeek::Saturday),
            _ => None,
        }
    }

    pub fn french_name(self) -> &'static str {
        match self {
            DayOfWeek::Monday => "Lundi",
            DayOfWeek::Tuesday => "Mardi",
            DayOfWeek::Wednesday => "Mercredi",
            DayOfWeek::Thursday => "Jeudi",
            DayOfWeek::Friday => "Vendredi",
            DayOfWeek::Saturday => "Samedi",
        }
    }
}

impl fmt::Display for DayOfWeek {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// The day of an entry: a known weekday, or the model's label verbatim.
///
/// Labels outside the lookup table are kept rather than rejected so that a
/// timetable with an odd spelling still comes through.
///
/// Serialised as a plain string: the French name for a known day, the raw
/// label otherwise. Deserialisation goes back through [`ScheduleDay::from_label`],
/// so the exact-table rule holds both ways and an English `"Monday"` stays
/// unrecognised after a round-trip. Constructing `Unrecognized("Lundi")` by
/// hand is the one value that does not survive: it reads back as `Known`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScheduleDay {
    Known(DayOfWeek),
    Unrecognized(String),
}

impl ScheduleDay {
    pub fn from_label(label: &str) -> Self {
        match DayOfWeek::from_french(label) {
            Some(day) => ScheduleDay::Known(day),
            None => ScheduleDay::Unrecognized(label.to_string()),
        }
    }

    pub fn known(&self) -> Option<DayOfWeek> {
        match self {
            ScheduleDay::Known(day) => Some(*day),
            ScheduleDay::Unrecognized(_) => None,
        }
    }
}

impl Serialize for ScheduleDay {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            ScheduleDay::Known(day) => serializer.serialize_str(day.french_name()),
            ScheduleDay::Unrecognized(raw) => serializer.serialize_str(raw),
        }
    }
}

impl<'de> Deserialize<'de> for ScheduleDay {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let label = String::deserialize(deserializer)?;
        Ok(ScheduleDay::from_label(&label))
    }
}

impl fmt::Display for ScheduleDay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScheduleDay::Known(day) => write!(f, "{day}"),
            ScheduleDay::Unrecognized(raw) => f.write_str(raw),
        }
    }
}

/// Outcome flag carried on every [`GroupData`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum GroupStatus {
    #[default]
    Ok,
    Error,
}
