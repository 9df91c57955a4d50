use chrono::{DateTime, NaiveDate, Utc};

use crate::config::IngestSettings;
use crate::error::{PayloadError, Result};
use crate::journal::Journal;
use crate::models::{Provider, SleepRecord, StressRecord};

pub mod garmin;
pub mod withings;

/// A sleep record resolved to its calendar day
#[derive(Debug, Clone, PartialEq)]
pub struct IngestedSleep {
    pub date: NaiveDate,
    pub record: SleepRecord,
}

/// A stress record resolved to its calendar day
#[derive(Debug, Clone, PartialEq)]
pub struct IngestedStress {
    pub date: NaiveDate,
    pub record: StressRecord,
}

/// One entry of a vendor payload, still unparsed
///
/// The wearer's token is readable before the entry is validated, so entries
/// belonging to someone else are skipped whether or not they are well formed.
pub trait PayloadEntry {
    type Record;

    /// Access token identifying the wearer, when the vendor sends one
    fn access_token(&self) -> Option<&str>;

    /// Validate the entry and convert it into a dated record
    fn parse(self) -> Result<Self::Record>;
}

/// Trait for vendor payloads carrying a list of entries
pub trait PayloadSource {
    type Entry: PayloadEntry;

    /// Vendor the payload came from
    fn provider(&self) -> Provider;

    fn entries(self) -> Vec<Self::Entry>;
}

/// Outcome of pushing one payload into the journal
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IngestSummary {
    /// Records that created a new (day, provider) slot
    pub created: usize,
    /// Records that replaced an existing (day, provider) slot
    pub updated: usize,
    /// Entries dropped because they belong to another wearer
    pub skipped: usize,
    /// Entries of this wearer that failed validation
    pub rejected: usize,
    /// Days touched, in payload order
    pub dates: Vec<NaiveDate>,
}

impl IngestSummary {
    pub fn stored(&self) -> usize {
        self.created + self.updated
    }

    pub fn absorb(&mut self, other: IngestSummary) {
        self.created += other.created;
        self.updated += other.updated;
        self.skipped += other.skipped;
        self.rejected += other.rejected;
        self.dates.extend(other.dates);
    }

    fn record(&mut self, date: NaiveDate, replaced: bool) {
        if replaced {
            self.updated += 1;
        } else {
            self.created += 1;
        }
        self.dates.push(date);
    }
}

/// Drives payload entries into a [`Journal`], one at a time
///
/// When an access token is configured, entries carrying a different token
/// are skipped before parsing; entries without a token are always accepted.
/// A malformed entry is logged and counted, and the entries around it are
/// still stored.
#[derive(Debug, Clone, Default)]
pub struct Ingestor {
    access_token: Option<String>,
}

impl Ingestor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_access_token(token: impl Into<String>) -> Self {
        Self {
            access_token: Some(token.into()),
        }
    }

    pub fn from_settings(settings: &IngestSettings) -> Self {
        settings
            .garmin_access_token
            .clone()
            .map_or_else(Self::new, Self::with_access_token)
    }

    fn accepts(&self, token: Option<&str>) -> bool {
        match (&self.access_token, token) {
            (Some(expected), Some(actual)) => expected == actual,
            _ => true,
        }
    }

    fn drive<S, F>(&self, source: S, kind: &'static str, mut store: F) -> IngestSummary
    where
        S: PayloadSource,
        F: FnMut(<S::Entry as PayloadEntry>::Record) -> (NaiveDate, bool),
    {
        let provider = source.provider();
        let mut summary = IngestSummary::default();

        for entry in source.entries() {
            if !self.accepts(entry.access_token()) {
                tracing::error!(%provider, kind, "No user found for entry");
                summary.skipped += 1;
                continue;
            }
            match entry.parse() {
                Ok(record) => {
                    let (date, replaced) = store(record);
                    summary.record(date, replaced);
                }
                Err(err) => {
                    tracing::error!(%provider, kind, error = %err, "Rejected malformed entry");
                    summary.rejected += 1;
                }
            }
        }

        tracing::info!(
            %provider,
            kind,
            created = summary.created,
            updated = summary.updated,
            skipped = summary.skipped,
            rejected = summary.rejected,
            "Ingested payload"
        );
        summary
    }

    pub fn ingest_sleep<S>(&self, journal: &mut Journal, source: S) -> IngestSummary
    where
        S: PayloadSource,
        S::Entry: PayloadEntry<Record = IngestedSleep>,
    {
        self.drive(source, "sleep", |entry| {
            let replaced = journal.upsert_sleep(entry.date, entry.record).is_some();
            (entry.date, replaced)
        })
    }

    pub fn ingest_stress<S>(&self, journal: &mut Journal, source: S) -> IngestSummary
    where
        S: PayloadSource,
        S::Entry: PayloadEntry<Record = IngestedStress>,
    {
        self.drive(source, "stress", |entry| {
            let replaced = journal.upsert_stress(entry.date, entry.record).is_some();
            (entry.date, replaced)
        })
    }
}

/// Parse a YYYY-MM-DD calendar date
pub fn parse_calendar_date(value: &str) -> std::result::Result<NaiveDate, PayloadError> {
    value
        .parse::<NaiveDate>()
        .map_err(|_| PayloadError::InvalidDate {
            value: value.to_string(),
        })
}

/// Convert epoch seconds into a UTC instant
pub fn utc_from_epoch(seconds: i64) -> std::result::Result<DateTime<Utc>, PayloadError> {
    DateTime::from_timestamp(seconds, 0).ok_or(PayloadError::InvalidTimestamp { value: seconds })
}
