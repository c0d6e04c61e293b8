//! Response normalization: model JSON text → [`GroupData`].
//!
//! ## Leniency rules
//!
//! - Empty text means `{}`.
//! - Text that is not JSON at all ([`ScheduleError::MalformedResponse`]) is
//!   downgraded by [`decode_or_empty`] to an empty schedule. A model that
//!   rambles instead of answering gives "no classes found", not a crash.
//! - A missing `groupName` or `entries` key defaults to empty.
//! - Day labels outside the French lookup table pass through verbatim.
//!
//! ## Strictness rules
//!
//! - JSON of the wrong shape is [`ScheduleError::InvalidResponse`].
//! - An entry without one of its four fields is [`ScheduleError::InvalidEntry`].
//!   Empty strings are accepted; only absence (or `null`) is rejected.

use crate::error::ScheduleError;
use crate::schedule::{GroupData, GroupStatus, ScheduleDay, ScheduleEntry};
use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, warn};

/// The response as declared by the schema, before validation.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawSchedule {
    #[serde(default)]
    pub group_name: Option<String>,
    #[serde(default)]
    pub entries: Option<Vec<RawEntry>>,
}

/// One entry as returned by the model. Every field is optional here so that
/// a missing one can be reported by name instead of as a serde error.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawEntry {
    #[serde(default)]
    pub day: Option<String>,
    #[serde(default)]
    pub time_slot: Option<String>,
    #[serde(default)]
    pub room: Option<String>,
    #[serde(default)]
    pub professor: Option<String>,
}

/// An entry with all required fields present.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidEntry {
    pub day: String,
    pub time_slot: String,
    pub room: String,
    pub professor: String,
}

impl RawEntry {
    /// Check the required fields; `index` is only used in the error.
    pub fn validate(self, index: usize) -> Result<ValidEntry, ScheduleError> {
        fn require(v: Option<String>, index: usize, field: &'static str) -> Result<String, ScheduleError> {
            v.ok_or(ScheduleError::InvalidEntry { index, field })
        }
        Ok(ValidEntry {
            day: require(self.day, index, "day")?,
            time_slot: require(self.time_slot, index, "timeSlot")?,
            room: require(self.room, index, "room")?,
            professor: require(self.professor, index, "professor")?,
        })
    }
}

static RE_JSON_FENCES: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)^```(?:json|JSON)?\s*\n(.*)\n```\s*$").unwrap());

/// Strip a BOM and outer code fences that schema-less providers add.
fn clean_response_text(text: &str) -> &str {
    let trimmed = text.trim_start_matches('\u{FEFF}').trim();
    match RE_JSON_FENCES.captures(trimmed) {
        Some(caps) => caps.get(1).map_or(trimmed, |m| m.as_str().trim()),
        None => trimmed,
    }
}

/// Decode response text strictly.
///
/// Returns [`ScheduleError::MalformedResponse`] for non-JSON text; callers
/// that want the lenient behaviour use [`decode_or_empty`].
pub fn decode_response(text: &str) -> Result<RawSchedule, ScheduleError> {
    let cleaned = clean_response_text(text);
    let cleaned = if cleaned.is_empty() { "{}" } else { cleaned };

    let value: Value = serde_json::from_str(cleaned).map_err(|e| ScheduleError::MalformedResponse {
        detail: e.to_string(),
    })?;

    serde_json::from_value(value).map_err(|e| ScheduleError::InvalidResponse {
        detail: e.to_string(),
    })
}

/// Decode response text, substituting an empty schedule for non-JSON text.
pub fn decode_or_empty(text: &str) -> Result<RawSchedule, ScheduleError> {
    match decode_response(text) {
        Err(ScheduleError::MalformedResponse { detail }) => {
            warn!("Model response is not JSON ({detail}); using an empty schedule");
            Ok(RawSchedule::default())
        }
        other => other,
    }
}

static RE_COHORT_CODE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\p{Lu}+)[\s_\-./]*(\p{Nd}+)").unwrap());

/// Canonical form of a cohort identifier, e.g. `"Groupe dev-101 "` → `"DEV101"`.
///
/// The first letters-then-digits run wins; separators between the two halves
/// are dropped. Without such a run, every non-alphanumeric character of the
/// upper-cased text is removed. Applying it twice changes nothing.
pub fn canonicalize_cohort_id(raw: &str) -> String {
    let upper = raw.trim().to_uppercase();
    if let Some(caps) = RE_COHORT_CODE.captures(&upper) {
        return format!("{}{}", &caps[1], &caps[2]);
    }
    upper.chars().filter(|c| c.is_alphanumeric()).collect()
}

/// Build the final record from a decoded response.
pub fn assemble(raw: RawSchedule, now: DateTime<Utc>) -> Result<GroupData, ScheduleError> {
    let name = canonicalize_cohort_id(raw.group_name.as_deref().unwrap_or(""));

    let entries = raw
        .entries
        .unwrap_or_default()
        .into_iter()
        .enumerate()
        .map(|(index, entry)| {
            let entry = entry.validate(index)?;
            let day = ScheduleDay::from_label(&entry.day);
            if day.known().is_none() {
                warn!("Entry #{index}: unrecognised day label {:?} kept as-is", entry.day);
            }
            Ok(ScheduleEntry {
                group_name: name.clone(),
                day,
                time_slot: entry.time_slot,
                room: entry.room,
                professor: entry.professor,
            })
        })
        .collect::<Result<Vec<_>, ScheduleError>>()?;

    debug!("Assembled {} entries for group '{}'", entries.len(), name);

    Ok(GroupData {
        name,
        last_updated: now,
        entries,
        status: GroupStatus::Ok,
        monday_summary: Vec::new(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schedule::DayOfWeek;

    #[test]
    fn canonicalize_examples() {
        assert_eq!(canonicalize_cohort_id("DEV101"), "DEV101");
        assert_eq!(canonicalize_cohort_id("  dev101 "), "DEV101");
        assert_eq!(canonicalize_cohort_id("Dev 101"), "DEV101");
        assert_eq!(canonicalize_cohort_id("DEV-101"), "DEV101");
        assert_eq!(canonicalize_cohort_id("Groupe DEV_101 (S1)"), "DEV101");
        assert_eq!(canonicalize_cohort_id("emploi_du_temps"), "EMPLOIDUTEMPS");
        assert_eq!(canonicalize_cohort_id(""), "");
    }

    #[test]
    fn canonicalize_keeps_accented_letters() {
        assert_eq!(canonicalize_cohort_id("GÉNIE 101"), "GÉNIE101");
        assert_eq!(canonicalize_cohort_id("génie-101"), "GÉNIE101");
        assert_eq!(canonicalize_cohort_id("Électricité 2"), "ÉLECTRICITÉ2");
        assert_eq!(canonicalize_cohort_id("Groupe Électronique_3 (S2)"), "ÉLECTRONIQUE3");
    }

    #[test]
    fn canonicalize_is_idempotent() {
        for raw in [
            "Groupe dev-101",
            "ID 2B",
            "Infographie",
            "",
            "tp 3 / td 4",
            "GÉNIE 101",
            "Électricité 2",
            "année préparatoire",
        ] {
            let once = canonicalize_cohort_id(raw);
            assert_eq!(canonicalize_cohort_id(&once), once, "input {raw:?}");
        }
    }

    #[test]
    fn decode_strips_fences_and_bom() {
        let raw = decode_response("\u{FEFF}```json\n{\"groupName\": \"DEV101\"}\n```").unwrap();
        assert_eq!(raw.group_name.as_deref(), Some("DEV101"));
        assert!(raw.entries.is_none());
    }

    #[test]
    fn empty_text_is_empty_object() {
        assert_eq!(decode_response("").unwrap(), RawSchedule::default());
        assert_eq!(decode_response("  \n").unwrap(), RawSchedule::default());
    }

    #[test]
    fn non_json_is_malformed_but_lenient() {
        let err = decode_response("Sorry, I cannot read this file.").unwrap_err();
        assert!(matches!(err, ScheduleError::MalformedResponse { .. }));
        assert_eq!(
            decode_or_empty("Sorry, I cannot read this file.").unwrap(),
            RawSchedule::default()
        );
    }

    #[test]
    fn wrong_shape_is_invalid_response() {
        for text in [r#"{"entries": "none"}"#, "[1, 2]", r#""DEV101""#] {
            let err = decode_or_empty(text).unwrap_err();
            assert!(
                matches!(err, ScheduleError::InvalidResponse { .. }),
                "{text}: got {err:?}"
            );
        }
    }

    #[test]
    fn missing_field_reports_index_and_name() {
        let raw = decode_response(
            r#"{"groupName":"DEV101","entries":[
                {"day":"Lundi","timeSlot":"08:00-10:00","room":"A1","professor":"X"},
                {"day":"Mardi","room":"A2","professor":null}
            ]}"#,
        )
        .unwrap();
        let err = assemble(raw, Utc::now()).unwrap_err();
        match err {
            ScheduleError::InvalidEntry { index, field } => {
                assert_eq!(index, 1);
                assert_eq!(field, "timeSlot");
            }
            other => panic!("expected InvalidEntry, got {other:?}"),
        }
    }

    #[test]
    fn empty_strings_are_accepted() {
        let raw = decode_response(
            r#"{"groupName":"g1","entries":[{"day":"","timeSlot":"","room":"","professor":""}]}"#,
        )
        .unwrap();
        let data = assemble(raw, Utc::now()).unwrap();
        assert_eq!(data.name, "G1");
        assert_eq!(data.entries[0].day, ScheduleDay::Unrecognized(String::new()));
        assert_eq!(data.entries[0].room, "");
    }

    #[test]
    fn assemble_maps_days_and_attaches_group() {
        let now = Utc::now();
        let raw = RawSchedule {
            group_name: Some("dev 101".into()),
            entries: Some(vec![
                RawEntry {
                    day: Some("Vendredi".into()),
                    time_slot: Some("15:00-17:00".into()),
                    room: Some("Salle 4".into()),
                    professor: Some("M. Alami".into()),
                },
                RawEntry {
                    day: Some("Friday".into()),
                    time_slot: Some("25:00-26:00".into()),
                    room: Some("B".into()),
                    professor: Some("Y".into()),
                },
            ]),
        };

        let data = assemble(raw, now).unwrap();
        assert_eq!(data.name, "DEV101");
        assert_eq!(data.last_updated, now);
        assert_eq!(data.status, GroupStatus::Ok);
        assert!(data.monday_summary.is_empty());

        assert_eq!(data.entries[0].day, ScheduleDay::Known(DayOfWeek::Friday));
        assert_eq!(data.entries[0].group_name, "DEV101");
        assert_eq!(data.entries[0].professor, "M. Alami");
        // Not a French label, and the slot is not in any allowed set: both kept.
        assert_eq!(data.entries[1].day, ScheduleDay::Unrecognized("Friday".into()));
        assert_eq!(data.entries[1].time_slot, "25:00-26:00");
    }
}
