// Library interface for sleeprs modules
// This allows integration tests to access the core functionality

pub mod calendar;
pub mod config;
pub mod error;
pub mod ingest;
pub mod journal;
pub mod logging;
pub mod models;
pub mod scoring;
pub mod timeline;

// Re-export commonly used types for convenience
pub use models::*;
pub use calendar::{DaySummary, MonthCalendar};
pub use config::AppConfig;
pub use error::{PayloadError, Result, SleepRsError};
pub use ingest::{IngestSummary, Ingestor};
pub use journal::Journal;
pub use logging::{LogConfig, LogFormat, LogLevel};
pub use scoring::{day_sleep_score, sleep_score, ScoreConfig, SleepScorer};
pub use timeline::{
    day_timeline, fill_interval_phases, fill_named_phases, DayTimeline, PhaseSegment, SleepTimeline,
};
