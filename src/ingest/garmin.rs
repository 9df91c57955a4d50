//! Garmin Health API push payloads
//!
//! Garmin posts summaries as JSON objects holding an array of entries under
//! a summary-type key (`sleeps`, `stressDetails`). Field names are camelCase
//! and all times are epoch seconds. Entries are kept as raw JSON until their
//! wearer has been checked, then parsed one by one.

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::marker::PhantomData;

use super::{
    parse_calendar_date, utc_from_epoch, IngestedSleep, IngestedStress, PayloadEntry,
    PayloadSource,
};
use crate::error::{PayloadError, Result};
use crate::models::{
    NamedPhases, PhaseData, PhaseWindow, Provider, SleepPhase, SleepRecord, StressRecord,
};

/// `{"sleeps": [...]}` push body
#[derive(Debug, Clone, Deserialize)]
pub struct GarminSleepPush {
    #[serde(default)]
    pub sleeps: Vec<Value>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GarminSleep {
    pub user_access_token: String,
    pub calendar_date: String,
    pub start_time_in_seconds: i64,
    pub start_time_offset_in_seconds: i32,
    pub duration_in_seconds: u32,
    pub rem_sleep_in_seconds: u32,
    pub deep_sleep_duration_in_seconds: u32,
    pub awake_duration_in_seconds: u32,
    #[serde(default)]
    pub sleep_levels_map: BTreeMap<String, Vec<GarminLevelWindow>>,
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GarminLevelWindow {
    pub start_time_in_seconds: i64,
    pub end_time_in_seconds: i64,
}

/// `{"stressDetails": [...]}` push body
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GarminStressPush {
    #[serde(default)]
    pub stress_details: Vec<Value>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GarminStressDetail {
    pub user_access_token: String,
    pub calendar_date: String,
    pub start_time_in_seconds: i64,
    pub start_time_offset_in_seconds: i32,
    pub duration_in_seconds: u32,
    #[serde(default)]
    pub time_offset_stress_level_values: BTreeMap<u32, i32>,
    #[serde(default)]
    pub time_offset_body_battery_values: BTreeMap<u32, i32>,
}

/// A Garmin summary type that converts into a dated record
pub trait GarminSummary: DeserializeOwned {
    type Record;

    fn to_record(&self) -> Result<Self::Record>;
}

/// One raw entry of a Garmin push, parsed as `T` on demand
#[derive(Debug, Clone)]
pub struct GarminEntry<T> {
    value: Value,
    kind: PhantomData<T>,
}

impl<T> GarminEntry<T> {
    pub fn new(value: Value) -> Self {
        Self {
            value,
            kind: PhantomData,
        }
    }
}

impl<T: GarminSummary> PayloadEntry for GarminEntry<T> {
    type Record = T::Record;

    fn access_token(&self) -> Option<&str> {
        self.value.get("userAccessToken").and_then(Value::as_str)
    }

    fn parse(self) -> Result<Self::Record> {
        let summary: T = serde_json::from_value(self.value).map_err(malformed)?;
        summary.to_record()
    }
}

fn malformed(err: serde_json::Error) -> PayloadError {
    PayloadError::Malformed {
        provider: Provider::Garmin.to_string(),
        reason: err.to_string(),
    }
}

fn empty(field: &str) -> PayloadError {
    PayloadError::Empty {
        field: field.to_string(),
    }
}

impl GarminSleepPush {
    pub fn from_json(body: &str) -> Result<Self> {
        let push: GarminSleepPush = serde_json::from_str(body).map_err(malformed)?;
        if push.sleeps.is_empty() {
            return Err(empty("sleeps").into());
        }
        Ok(push)
    }
}

impl GarminStressPush {
    pub fn from_json(body: &str) -> Result<Self> {
        let push: GarminStressPush = serde_json::from_str(body).map_err(malformed)?;
        if push.stress_details.is_empty() {
            return Err(empty("stressDetails").into());
        }
        Ok(push)
    }
}

impl GarminSleep {
    /// Keep the four known phases; anything else (`unmeasurable`) is dropped.
    ///
    /// Window ends must be valid instants. Windows are clipped to the sleep
    /// span `[start, end]`; a window left empty by clipping is dropped.
    fn named_phases(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> Result<NamedPhases> {
        let mut phases = NamedPhases::new();
        for (key, windows) in &self.sleep_levels_map {
            let Some(phase) = SleepPhase::from_key(key) else {
                tracing::debug!(key = %key, windows = windows.len(), "Ignoring unknown sleep level");
                continue;
            };
            let list = phases.entry(phase).or_default();
            for window in windows {
                let from = utc_from_epoch(window.start_time_in_seconds)?.max(start);
                let to = utc_from_epoch(window.end_time_in_seconds)?.min(end);
                if to < from {
                    tracing::debug!(%phase, ?window, "Dropping window outside the sleep span");
                    continue;
                }
                list.push(PhaseWindow {
                    start_time: from.timestamp(),
                    end_time: to.timestamp(),
                });
            }
        }
        Ok(phases)
    }
}

impl GarminSummary for GarminSleep {
    type Record = IngestedSleep;

    fn to_record(&self) -> Result<IngestedSleep> {
        let date = parse_calendar_date(&self.calendar_date)?;
        let start = utc_from_epoch(self.start_time_in_seconds)?;
        let end = utc_from_epoch(self.start_time_in_seconds.saturating_add(self.duration_in_seconds as i64))?;

        Ok(IngestedSleep {
            date,
            record: SleepRecord {
                provider: Provider::Garmin,
                duration_total: self.duration_in_seconds,
                duration_rem: self.rem_sleep_in_seconds,
                duration_deep: self.deep_sleep_duration_in_seconds,
                duration_awake: self.awake_duration_in_seconds,
                phases: PhaseData::Named(self.named_phases(start, end)?),
                start,
                end,
                offset: self.start_time_offset_in_seconds,
            },
        })
    }
}

impl GarminSummary for GarminStressDetail {
    type Record = IngestedStress;

    fn to_record(&self) -> Result<IngestedStress> {
        let date = parse_calendar_date(&self.calendar_date)?;
        let start = utc_from_epoch(self.start_time_in_seconds)?;
        let end = utc_from_epoch(self.start_time_in_seconds.saturating_add(self.duration_in_seconds as i64))?;

        Ok(IngestedStress {
            date,
            record: StressRecord {
                provider: Provider::Garmin,
                duration_total: self.duration_in_seconds,
                stress_values: self.time_offset_stress_level_values.clone(),
                battery_values: self.time_offset_body_battery_values.clone(),
                start,
                end,
                offset: self.start_time_offset_in_seconds,
            },
        })
    }
}

impl PayloadSource for GarminSleepPush {
    type Entry = GarminEntry<GarminSleep>;

    fn provider(&self) -> Provider {
        Provider::Garmin
    }

    fn entries(self) -> Vec<Self::Entry> {
        self.sleeps.into_iter().map(GarminEntry::new).collect()
    }
}

impl PayloadSource for GarminStressPush {
    type Entry = GarminEntry<GarminStressDetail>;

    fn provider(&self) -> Provider {
        Provider::Garmin
    }

    fn entries(self) -> Vec<Self::Entry> {
        self.stress_details.into_iter().map(GarminEntry::new).collect()
    }
}
