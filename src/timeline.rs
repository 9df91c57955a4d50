//! Minute-resolution phase timelines for charting
//!
//! Providers report sleep phases as coarse intervals. Charts render them as
//! stacked one-minute bars, so each interval is expanded into micro-segments
//! stepping by [`BUCKET_SECONDS`] from its start through its end, end
//! included. An interval lasting `D` seconds therefore yields
//! `D / 60 + 1` buckets, the last one possibly starting exactly at the
//! interval's end. Intervals are expanded independently; nothing fills the
//! gaps between them.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::models::{
    Day, NamedPhases, PhaseData, Provider, SleepPhase, SleepRecord, SleepState, StateInterval,
    StressLevel, StressRecord,
};

/// Width of one chart bucket in seconds
pub const BUCKET_SECONDS: i64 = 60;

/// One-minute slice of an interval-list phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhaseSegment {
    pub start: i64,
    pub end: i64,
    pub state: u8,
}

impl PhaseSegment {
    pub fn category(&self) -> SleepState {
        SleepState::from_code(self.state)
    }
}

/// Point sample for a named-phase chart series
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChartPoint {
    pub timestamp_ms: i64,
    pub y: u8,
}

/// Stress sample placed on the wall clock
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StressPoint {
    pub timestamp_ms: i64,
    pub value: i32,
    pub level: StressLevel,
}

/// Body-battery sample placed on the wall clock
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatteryPoint {
    pub timestamp_ms: i64,
    pub value: i32,
}

/// Chart-ready timeline of one sleep record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "data", rename_all = "snake_case")]
pub enum SleepTimeline {
    Segments(Vec<PhaseSegment>),
    Points(BTreeMap<SleepPhase, Vec<ChartPoint>>),
}

impl SleepTimeline {
    pub fn len(&self) -> usize {
        match self {
            SleepTimeline::Segments(segments) => segments.len(),
            SleepTimeline::Points(points) => points.values().map(Vec::len).sum(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Stress and body-battery chart series of one stress record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StressTimeline {
    pub stress: Vec<StressPoint>,
    pub battery: Vec<BatteryPoint>,
}

/// Every chart series of one day, keyed by provider
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DayTimeline {
    pub date: chrono::NaiveDate,
    pub sleeps: BTreeMap<Provider, SleepTimeline>,
    pub stresses: BTreeMap<Provider, StressTimeline>,
}

/// Bucket starts from `start` through `end` inclusive. Empty when `end < start`.
pub fn bucket_starts(start: i64, end: i64) -> impl Iterator<Item = i64> {
    (start..=end).step_by(BUCKET_SECONDS as usize)
}

/// Lazily expand state-coded intervals into one-minute segments, in input order
pub fn interval_segments(intervals: &[StateInterval]) -> impl Iterator<Item = PhaseSegment> + '_ {
    intervals.iter().flat_map(|interval| {
        let state = interval.state;
        bucket_starts(interval.start, interval.end).map(move |start| PhaseSegment {
            start,
            end: start.saturating_add(BUCKET_SECONDS),
            state,
        })
    })
}

pub fn fill_interval_phases(intervals: &[StateInterval]) -> Vec<PhaseSegment> {
    interval_segments(intervals).collect()
}

/// Expand named phase windows into per-phase point series.
///
/// Only phases present in the input get a key; the map iterates in phase
/// order (awake, light, deep, REM). Buckets whose millisecond timestamp does
/// not fit in an `i64` are left out.
pub fn fill_named_phases(phases: &NamedPhases) -> BTreeMap<SleepPhase, Vec<ChartPoint>> {
    phases
        .iter()
        .map(|(phase, windows)| {
            let points = windows
                .iter()
                .flat_map(|w| bucket_starts(w.start_time, w.end_time))
                .filter_map(|t| t.checked_mul(1000))
                .map(|timestamp_ms| ChartPoint { timestamp_ms, y: 1 })
                .collect();
            (*phase, points)
        })
        .collect()
}

/// Pick the expansion matching the record's phase representation
pub fn sleep_timeline(record: &SleepRecord) -> SleepTimeline {
    match &record.phases {
        PhaseData::Named(phases) => SleepTimeline::Points(fill_named_phases(phases)),
        PhaseData::Intervals(intervals) => {
            SleepTimeline::Segments(fill_interval_phases(intervals))
        }
    }
}

/// Stress samples on the wall clock, ordered by offset
pub fn stress_series(record: &StressRecord) -> Vec<StressPoint> {
    let base = record.start.timestamp();
    record
        .stress_values
        .iter()
        .map(|(offset, value)| StressPoint {
            timestamp_ms: (base + *offset as i64) * 1000,
            value: *value,
            level: StressLevel::from_value(*value),
        })
        .collect()
}

/// Body-battery samples on the wall clock, ordered by offset
pub fn battery_series(record: &StressRecord) -> Vec<BatteryPoint> {
    let base = record.start.timestamp();
    record
        .battery_values
        .iter()
        .map(|(offset, value)| BatteryPoint {
            timestamp_ms: (base + *offset as i64) * 1000,
            value: *value,
        })
        .collect()
}

pub fn day_timeline(day: &Day) -> DayTimeline {
    DayTimeline {
        date: day.date,
        sleeps: day
            .sleeps
            .iter()
            .map(|(provider, record)| (*provider, record.timeline()))
            .collect(),
        stresses: day
            .stresses
            .iter()
            .map(|(provider, record)| {
                let series = StressTimeline {
                    stress: stress_series(record),
                    battery: battery_series(record),
                };
                (*provider, series)
            })
            .collect(),
    }
}
