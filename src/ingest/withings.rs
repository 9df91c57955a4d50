//! Withings sleep data
//!
//! A Withings night comes in two parts: the summary from the sleep summary
//! endpoint and the state series from the sleep endpoint. Both are fetched
//! by the caller after the notification arrives; this module only types and
//! combines them.

use chrono::{DateTime, Offset, TimeZone, Utc};
use chrono_tz::Tz;
use serde::Deserialize;

use super::{parse_calendar_date, utc_from_epoch, IngestedSleep, PayloadEntry, PayloadSource};
use crate::error::{PayloadError, Result};
use crate::models::{PhaseData, Provider, SleepRecord, StateInterval};

#[derive(Debug, Clone, Deserialize)]
pub struct WithingsSleepSummary {
    /// Calendar day the night belongs to (YYYY-MM-DD)
    pub date: String,
    pub startdate: i64,
    pub enddate: i64,
    /// IANA zone name of the wearer; UTC when absent
    #[serde(default)]
    pub timezone: Option<String>,
    pub data: WithingsSleepData,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WithingsSleepData {
    pub total_sleep_time: u32,
    pub remsleepduration: u32,
    pub deepsleepduration: u32,
    #[serde(default)]
    pub wakeupduration: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WithingsSleepSeries {
    #[serde(default)]
    pub series: Vec<WithingsSleepState>,
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct WithingsSleepState {
    pub startdate: i64,
    pub enddate: i64,
    pub state: u8,
}

/// Summary and series of a single night
#[derive(Debug, Clone)]
pub struct WithingsSleep {
    pub summary: WithingsSleepSummary,
    pub series: WithingsSleepSeries,
}

fn malformed(err: serde_json::Error) -> PayloadError {
    PayloadError::Malformed {
        provider: Provider::Withings.to_string(),
        reason: err.to_string(),
    }
}

/// Offset of `zone` from UTC in seconds at the instant `at`
fn zone_offset(zone: &str, at: DateTime<Utc>) -> std::result::Result<i32, PayloadError> {
    let tz: Tz = zone.parse().map_err(|_| PayloadError::Malformed {
        provider: Provider::Withings.to_string(),
        reason: format!("unknown timezone {}", zone),
    })?;
    Ok(tz.offset_from_utc_datetime(&at.naive_utc()).fix().local_minus_utc())
}

impl WithingsSleep {
    pub fn from_json(summary: &str, series: &str) -> Result<Self> {
        let summary: WithingsSleepSummary = serde_json::from_str(summary).map_err(malformed)?;
        let series: WithingsSleepSeries = serde_json::from_str(series).map_err(malformed)?;
        Ok(Self { summary, series })
    }

    pub fn to_record(&self) -> Result<IngestedSleep> {
        let date = parse_calendar_date(&self.summary.date)?;
        let start = utc_from_epoch(self.summary.startdate)?;
        let end = utc_from_epoch(self.summary.enddate)?;

        let offset = match &self.summary.timezone {
            Some(zone) => zone_offset(zone, start)?,
            None => 0,
        };

        let intervals = self
            .series
            .series
            .iter()
            .map(|s| StateInterval::new(s.startdate, s.enddate, s.state))
            .collect();

        let data = &self.summary.data;
        Ok(IngestedSleep {
            date,
            record: SleepRecord {
                provider: Provider::Withings,
                duration_total: data.total_sleep_time,
                duration_rem: data.remsleepduration,
                duration_deep: data.deepsleepduration,
                duration_awake: data.wakeupduration,
                phases: PhaseData::Intervals(intervals),
                start,
                end,
                offset,
            },
        })
    }
}

/// Withings sends no wearer token; the night is its own single entry
impl PayloadEntry for WithingsSleep {
    type Record = IngestedSleep;

    fn access_token(&self) -> Option<&str> {
        None
    }

    fn parse(self) -> Result<IngestedSleep> {
        self.to_record()
    }
}

impl PayloadSource for WithingsSleep {
    type Entry = WithingsSleep;

    fn provider(&self) -> Provider {
        Provider::Withings
    }

    fn entries(self) -> Vec<WithingsSleep> {
        vec![self]
    }
}
