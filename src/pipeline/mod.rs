//! Pipeline stages for PDF-to-timetable extraction.
//!
//! Each submodule implements one step, testable on its own.
//!
//! ## Data Flow
//!
//! ```text
//! input ──▶ encode ──▶ llm ──▶ normalize
//! (path/URL) (base64)  (model)  (JSON → GroupData)
//! ```
//!
//! 1. [`input`]     — load a local file or download a URL, check `%PDF`
//! 2. [`encode`]    — base64-wrap the bytes for the inline request part
//! 3. [`llm`]       — the one network call, behind [`llm::ScheduleModel`]
//! 4. [`normalize`] — decode the JSON, canonicalise the cohort, map days

pub mod encode;
pub mod input;
pub mod llm;
pub mod normalize;
