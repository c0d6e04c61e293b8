//! Prompts and the response schema for timetable extraction.
//!
//! Everything the model is told lives here so that prompt changes never
//! touch request or error-handling code, and so tests can inspect the exact
//! text and schema without a live API.
//!
//! Callers can replace the prompt via
//! [`crate::config::ExtractionConfig::prompt_template`]; the schema is fixed
//! because the decoder in [`crate::pipeline::normalize`] depends on it.

use serde_json::{json, Value};

/// Default extraction prompt. `{filename}` and `{time_slots}` are substituted.
pub const DEFAULT_PROMPT_TEMPLATE: &str = r#"Extract schedule data.
Group Name: Extract from filename "{filename}" or content. Simplify to format like DEV101.
Entries: Map to days (Lundi-Samedi) and slots ({time_slots}).
Return JSON."#;

/// System message used by providers without native schema constraints.
///
/// The placeholder `{schema}` is replaced with [`response_schema`].
pub const SCHEMA_SYSTEM_PROMPT: &str = r#"You extract class timetables from PDF documents.
Respond with a single JSON object and nothing else: no prose, no code fences.
The object must validate against this JSON schema:

{schema}

Every entry must have all four fields. Use the French day name exactly as
listed (Lundi, Mardi, Mercredi, Jeudi, Vendredi, Samedi)."#;

/// Build the user prompt for one document.
pub fn extraction_prompt(filename: &str, time_slots: &[String], template: Option<&str>) -> String {
    template
        .unwrap_or(DEFAULT_PROMPT_TEMPLATE)
        .replace("{filename}", filename)
        .replace("{time_slots}", &time_slots.join(", "))
}

/// JSON schema the model output is constrained to.
///
/// Uses the OpenAPI subset Gemini accepts (`"type"` in upper case).
pub fn response_schema() -> Value {
    json!({
        "type": "OBJECT",
        "properties": {
            "groupName": { "type": "STRING" },
            "entries": {
                "type": "ARRAY",
                "items": {
                    "type": "OBJECT",
                    "properties": {
                        "day": { "type": "STRING" },
                        "timeSlot": { "type": "STRING" },
                        "room": { "type": "STRING" },
                        "professor": { "type": "STRING" }
                    }
                }
            }
        }
    })
}

/// Build the system message for schema-less providers.
pub fn schema_system_prompt() -> String {
    let schema = serde_json::to_string_pretty(&response_schema()).unwrap_or_default();
    SCHEMA_SYSTEM_PROMPT.replace("{schema}", &schema)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn slots() -> Vec<String> {
        vec!["08:00-10:00".into(), "10:00-12:00".into()]
    }

    #[test]
    fn prompt_mentions_filename_and_slots() {
        let p = extraction_prompt("DEV101_S1.pdf", &slots(), None);
        assert!(p.contains("\"DEV101_S1.pdf\""));
        assert!(p.contains("08:00-10:00, 10:00-12:00"));
        assert!(p.contains("Lundi-Samedi"));
        assert!(!p.contains('{'), "unsubstituted placeholder in: {p}");
    }

    #[test]
    fn custom_template() {
        let p = extraction_prompt("x.pdf", &slots(), Some("file={filename} slots={time_slots}"));
        assert_eq!(p, "file=x.pdf slots=08:00-10:00, 10:00-12:00");
    }

    #[test]
    fn schema_declares_entry_fields() {
        let schema = response_schema();
        assert_eq!(schema["properties"]["groupName"]["type"], "STRING");
        let item = &schema["properties"]["entries"]["items"]["properties"];
        for field in ["day", "timeSlot", "room", "professor"] {
            assert_eq!(item[field]["type"], "STRING", "field {field}");
        }
    }

    #[test]
    fn system_prompt_embeds_schema() {
        let p = schema_system_prompt();
        assert!(p.contains("\"timeSlot\""));
        assert!(!p.contains("{schema}"));
    }
}
