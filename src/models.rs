use chrono::{DateTime, FixedOffset, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use statrs::statistics::Statistics;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::error::{PayloadError, Result, SleepRsError};

/// Maximum length of the free-form day note
pub const MAX_NOTE_LENGTH: usize = 255;

/// Wearable vendor a record was pushed by
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    Garmin,
    Withings,
}

impl Provider {
    pub fn as_str(&self) -> &'static str {
        match self {
            Provider::Garmin => "garmin",
            Provider::Withings => "withings",
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Provider {
    type Err = PayloadError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "garmin" => Ok(Provider::Garmin),
            "withings" => Ok(Provider::Withings),
            _ => Err(PayloadError::UnknownProvider {
                name: s.to_string(),
            }),
        }
    }
}

/// Named sleep phases, in chart order
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SleepPhase {
    Awake,
    Light,
    Deep,
    Rem,
}

impl SleepPhase {
    pub const ALL: [SleepPhase; 4] = [
        SleepPhase::Awake,
        SleepPhase::Light,
        SleepPhase::Deep,
        SleepPhase::Rem,
    ];

    /// Look up a phase by its payload key
    pub fn from_key(key: &str) -> Option<Self> {
        match key.to_lowercase().as_str() {
            "awake" => Some(SleepPhase::Awake),
            "light" => Some(SleepPhase::Light),
            "deep" => Some(SleepPhase::Deep),
            "rem" => Some(SleepPhase::Rem),
            _ => None,
        }
    }
}

impl fmt::Display for SleepPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SleepPhase::Awake => write!(f, "Awake"),
            SleepPhase::Light => write!(f, "Light"),
            SleepPhase::Deep => write!(f, "Deep"),
            SleepPhase::Rem => write!(f, "REM"),
        }
    }
}

/// Category behind an interval-list state code
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SleepState {
    Awake,
    Light,
    Deep,
    Rem,
    Manual,
    Unspecified,
}

impl SleepState {
    /// Classify a raw state code. Unknown codes display as unspecified.
    pub fn from_code(code: u8) -> Self {
        match code {
            0 => SleepState::Awake,
            1 => SleepState::Light,
            2 => SleepState::Deep,
            3 => SleepState::Rem,
            4 => SleepState::Manual,
            _ => SleepState::Unspecified,
        }
    }

    /// The named phase this state corresponds to, if any
    pub fn phase(&self) -> Option<SleepPhase> {
        match self {
            SleepState::Awake => Some(SleepPhase::Awake),
            SleepState::Light => Some(SleepPhase::Light),
            SleepState::Deep => Some(SleepPhase::Deep),
            SleepState::Rem => Some(SleepPhase::Rem),
            SleepState::Manual | SleepState::Unspecified => None,
        }
    }
}

/// A `{start_time, end_time}` window inside a named phase list (epoch seconds)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhaseWindow {
    pub start_time: i64,
    pub end_time: i64,
}

/// A `{start, end, state}` interval (epoch seconds, raw state code)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateInterval {
    pub start: i64,
    pub end: i64,
    pub state: u8,
}

impl StateInterval {
    pub fn new(start: i64, end: i64, state: u8) -> Self {
        Self { start, end, state }
    }

    pub fn category(&self) -> SleepState {
        SleepState::from_code(self.state)
    }
}

/// Phase lists keyed by phase name
pub type NamedPhases = BTreeMap<SleepPhase, Vec<PhaseWindow>>;

/// Provider-specific representation of a night's phases
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "phases", rename_all = "snake_case")]
pub enum PhaseData {
    /// Phase name to window list (Garmin `sleepLevelsMap`)
    Named(NamedPhases),
    /// Flat list of state-coded intervals (Withings sleep series)
    Intervals(Vec<StateInterval>),
}

impl Default for PhaseData {
    fn default() -> Self {
        PhaseData::Named(NamedPhases::new())
    }
}

impl PhaseData {
    pub fn is_empty(&self) -> bool {
        match self {
            PhaseData::Named(phases) => phases.values().all(|w| w.is_empty()),
            PhaseData::Intervals(intervals) => intervals.is_empty(),
        }
    }
}

/// One night of sleep from one provider
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SleepRecord {
    pub provider: Provider,

    /// Total sleep duration in seconds
    pub duration_total: u32,

    /// REM sleep in seconds
    pub duration_rem: u32,

    /// Deep sleep in seconds
    pub duration_deep: u32,

    /// Time awake during the sleep window in seconds
    pub duration_awake: u32,

    pub phases: PhaseData,

    /// Start of the sleep window (UTC)
    pub start: DateTime<Utc>,

    /// End of the sleep window (UTC)
    pub end: DateTime<Utc>,

    /// Offset of the wearer's local time from UTC, in seconds
    pub offset: i32,
}

impl SleepRecord {
    /// Raw sleep score with the default scoring constants
    pub fn score(&self) -> f64 {
        crate::scoring::sleep_score(self.duration_total, self.duration_rem, self.duration_deep)
    }

    /// Light sleep, derived from the other stages
    pub fn duration_light(&self) -> u32 {
        self.duration_total
            .saturating_sub(self.duration_rem)
            .saturating_sub(self.duration_deep)
            .saturating_sub(self.duration_awake)
    }

    /// Chart timeline matching this record's phase representation
    pub fn timeline(&self) -> crate::timeline::SleepTimeline {
        crate::timeline::sleep_timeline(self)
    }

    /// Start of the window in the wearer's local time
    pub fn local_start(&self) -> Option<DateTime<FixedOffset>> {
        FixedOffset::east_opt(self.offset).map(|tz| self.start.with_timezone(&tz))
    }

    /// End of the window in the wearer's local time
    pub fn local_end(&self) -> Option<DateTime<FixedOffset>> {
        FixedOffset::east_opt(self.offset).map(|tz| self.end.with_timezone(&tz))
    }
}

/// Classification of a single stress sample
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StressLevel {
    /// Negative sample: the device could not measure (activity, motion)
    Unmeasured,
    Rest,
    Low,
    Medium,
    High,
}

impl StressLevel {
    pub fn from_value(value: i32) -> Self {
        match value {
            v if v < 0 => StressLevel::Unmeasured,
            0..=25 => StressLevel::Rest,
            26..=50 => StressLevel::Low,
            51..=75 => StressLevel::Medium,
            _ => StressLevel::High,
        }
    }
}

/// One day of stress and body-battery samples from one provider
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StressRecord {
    pub provider: Provider,

    /// Length of the sampled window in seconds
    pub duration_total: u32,

    /// Stress level keyed by offset in seconds from `start`
    pub stress_values: BTreeMap<u32, i32>,

    /// Body battery keyed by offset in seconds from `start`
    pub battery_values: BTreeMap<u32, i32>,

    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub offset: i32,
}

impl StressRecord {
    /// Mean of the measured (non-negative) stress samples
    pub fn average_stress(&self) -> Option<f64> {
        let measured: Vec<f64> = self
            .stress_values
            .values()
            .filter(|v| **v >= 0)
            .map(|v| *v as f64)
            .collect();
        if measured.is_empty() {
            return None;
        }
        Some(measured.iter().mean())
    }
}

/// Subjective notes a user attaches to a calendar day
///
/// Every field is optional; `merge` only overwrites fields that are set
/// in the update.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DayAnnotations {
    pub notes: Option<String>,
    pub alcohol_doses: Option<u16>,
    pub mood: Option<i16>,
    pub tiredness_morning: Option<i16>,
    pub tiredness_evening: Option<i16>,
    pub nap_minutes: Option<u16>,
    pub office: Option<bool>,
    pub vacation: Option<bool>,
}

impl DayAnnotations {
    pub fn validate(&self) -> Result<()> {
        if let Some(notes) = &self.notes {
            let len = notes.chars().count();
            if len > MAX_NOTE_LENGTH {
                return Err(SleepRsError::Validation(format!(
                    "notes are {} characters long, maximum is {}",
                    len, MAX_NOTE_LENGTH
                )));
            }
        }
        Ok(())
    }

    pub fn merge(&mut self, update: DayAnnotations) {
        macro_rules! take {
            ($($field:ident),*) => {
                $(if update.$field.is_some() { self.$field = update.$field; })*
            };
        }
        take!(
            notes,
            alcohol_doses,
            mood,
            tiredness_morning,
            tiredness_evening,
            nap_minutes,
            office,
            vacation
        );
    }

    pub fn is_empty(&self) -> bool {
        *self == DayAnnotations::default()
    }
}

/// A calendar day: the unit records and annotations hang off
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Day {
    pub date: NaiveDate,

    /// At most one sleep record per provider
    pub sleeps: BTreeMap<Provider, SleepRecord>,

    /// At most one stress record per provider
    pub stresses: BTreeMap<Provider, StressRecord>,

    pub annotations: DayAnnotations,
}

impl Day {
    pub fn new(date: NaiveDate) -> Self {
        Self {
            date,
            sleeps: BTreeMap::new(),
            stresses: BTreeMap::new(),
            annotations: DayAnnotations::default(),
        }
    }

    /// Insert or replace the sleep record for the record's provider,
    /// returning the one it replaced.
    pub fn upsert_sleep(&mut self, record: SleepRecord) -> Option<SleepRecord> {
        self.sleeps.insert(record.provider, record)
    }

    /// Insert or replace the stress record for the record's provider,
    /// returning the one it replaced.
    pub fn upsert_stress(&mut self, record: StressRecord) -> Option<StressRecord> {
        self.stresses.insert(record.provider, record)
    }

    pub fn sleep(&self, provider: Provider) -> Option<&SleepRecord> {
        self.sleeps.get(&provider)
    }

    pub fn stress(&self, provider: Provider) -> Option<&StressRecord> {
        self.stresses.get(&provider)
    }

    /// First sleep record in provider order
    pub fn primary_sleep(&self) -> Option<&SleepRecord> {
        self.sleeps.values().next()
    }

    pub fn has_data(&self) -> bool {
        !self.sleeps.is_empty() || !self.stresses.is_empty() || !self.annotations.is_empty()
    }
}
