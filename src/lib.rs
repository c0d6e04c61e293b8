//! # edgequake-timetable
//!
//! Extract a class timetable from a PDF using a generative model.
//!
//! Timetable PDFs come out of a dozen different export tools, with merged
//! cells, rotated headers and free-form room notes. Rather than parse them,
//! this crate sends the PDF to a multimodal model together with a JSON
//! schema, then reshapes the answer into [`GroupData`]: a canonical cohort
//! code plus one [`ScheduleEntry`] per class.
//!
//! ## Pipeline Overview
//!
//! ```text
//! PDF
//!  │
//!  ├─ 1. Input      local file or URL → bytes (+ %PDF check)
//!  ├─ 2. Encode     bytes → base64 inline part
//!  ├─ 3. Model      one schema-constrained request (Gemini by default)
//!  ├─ 4. Normalize  cohort code, French day names → DayOfWeek
//!  └─ 5. Output     GroupData (JSON via the CLI)
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use edgequake_timetable::{parse_schedule_file, ExtractionConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Credential from GEMINI_API_KEY
//!     let config = ExtractionConfig::from_env();
//!     let group = parse_schedule_file("DEV101.pdf", &config).await?;
//!     for entry in &group.entries {
//!         println!("{} {} {} {}", entry.day, entry.time_slot, entry.room, entry.professor);
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `pdf2schedule` binary (clap + anyhow + tracing-subscriber) |

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod error;
pub mod extract;
pub mod pipeline;
pub mod prompts;
pub mod schedule;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{ExtractionConfig, ExtractionConfigBuilder};
pub use error::ScheduleError;
pub use extract::{
    extract_with_model, parse_schedule_file, parse_schedule_pdf, parse_schedule_sync,
    parse_schedule_to_file,
};
pub use pipeline::llm::{ExtractionRequest, GeminiModel, ProviderModel, ScheduleModel};
pub use pipeline::normalize::canonicalize_cohort_id;
pub use schedule::{DayOfWeek, GroupData, GroupStatus, ScheduleDay, ScheduleEntry, DEFAULT_TIME_SLOTS};
