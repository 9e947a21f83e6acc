//! Intake analytics engine: per-day metrics, same-day advisory rules, multi-day patterns and a
//! keyed record store. The `intake_core` binary serves all of it over HTTP.

pub mod catalog;
pub mod config;
pub mod entry;
pub mod export;
pub mod metrics;
pub mod model;
pub mod parse;
pub mod quality;
pub mod report;
pub mod rules;
pub mod store;
pub mod timefmt;
pub mod trends;

pub use catalog::{Catalog, CatalogItem};
pub use config::{EngineConfig, Thresholds, TrendWindow, PRESETS};
pub use entry::{EntryError, EntryForm};
pub use metrics::{intake_level, intake_level_with, sleep_duration, total_intake, IntakeLevel, IntakeTotal};
pub use model::{DailyRecord, Participant, ParticipantId, Sensitivity, Symptoms};
pub use report::{build_report, Report};
pub use rules::{evaluate, Advice, Rule};
pub use store::{next_participant_id, MemoryStore, RecordStore, SqliteStore, StoreError, StoreResult};
pub use trends::{analyze, period_summary, short_term_alert, TrendAnalysis};
