//! Day summaries and month calendars
//!
//! Turns journal days into the flat values calendar views render: the day
//! score, the main night's durations and the user's annotations.

use chrono::{DateTime, Datelike, Duration, FixedOffset, NaiveDate, Weekday};
use serde::{Deserialize, Serialize};
use statrs::statistics::Statistics;

use crate::error::{Result, SleepRsError};
use crate::journal::Journal;
use crate::models::{Day, DayAnnotations, Provider, SleepRecord};
use crate::scoring::SleepScorer;

/// Everything a calendar cell or day page shows about one day
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DaySummary {
    pub date: NaiveDate,

    /// Display score across all sleep records; `None` without sleep data
    pub sleep_score: Option<i64>,

    /// Provider of the night the durations below come from
    pub provider: Option<Provider>,

    /// Bedtime and wake time on the wearer's clock
    pub bedtime: Option<DateTime<FixedOffset>>,
    pub wake_time: Option<DateTime<FixedOffset>>,

    pub total_sleep_seconds: Option<u32>,
    pub rem_seconds: Option<u32>,
    pub deep_seconds: Option<u32>,
    pub light_seconds: Option<u32>,
    pub awake_seconds: Option<u32>,

    /// Mean measured stress over all stress records
    pub average_stress: Option<f64>,

    pub annotations: DayAnnotations,
}

impl DaySummary {
    /// Summarise a day. The durations come from the preferred provider's
    /// record when present, otherwise from the first record.
    pub fn from_day(day: &Day, scorer: &SleepScorer, preferred: Option<Provider>) -> Self {
        let night: Option<&SleepRecord> = preferred
            .and_then(|p| day.sleep(p))
            .or_else(|| day.primary_sleep());

        let stress: Vec<f64> = day.stresses.values().filter_map(|s| s.average_stress()).collect();
        let average_stress = if stress.is_empty() {
            None
        } else {
            Some(stress.iter().mean())
        };

        DaySummary {
            date: day.date,
            sleep_score: scorer.score_day(day),
            provider: night.map(|n| n.provider),
            bedtime: night.and_then(SleepRecord::local_start),
            wake_time: night.and_then(SleepRecord::local_end),
            total_sleep_seconds: night.map(|n| n.duration_total),
            rem_seconds: night.map(|n| n.duration_rem),
            deep_seconds: night.map(|n| n.duration_deep),
            light_seconds: night.map(SleepRecord::duration_light),
            awake_seconds: night.map(|n| n.duration_awake),
            average_stress,
            annotations: day.annotations.clone(),
        }
    }
}

/// One cell of the month grid
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalendarCell {
    pub date: NaiveDate,

    /// False for the leading/trailing days of adjacent months
    pub in_month: bool,

    pub summary: Option<DaySummary>,
}

/// A month laid out as full weeks
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonthCalendar {
    pub year: i32,
    pub month: u32,
    pub first_weekday: Weekday,
    pub weeks: Vec<[CalendarCell; 7]>,
}

impl MonthCalendar {
    pub fn build(
        journal: &Journal,
        year: i32,
        month: u32,
        scorer: &SleepScorer,
        preferred: Option<Provider>,
        week_starts_monday: bool,
    ) -> Result<Self> {
        let first = NaiveDate::from_ymd_opt(year, month, 1).ok_or_else(|| {
            SleepRsError::Validation(format!("invalid month {:04}-{:02}", year, month))
        })?;
        let first_weekday = if week_starts_monday { Weekday::Mon } else { Weekday::Sun };

        let lead = (first.weekday().num_days_from_monday() + 7
            - first_weekday.num_days_from_monday())
            % 7;
        let lead = lead as i64;
        let mut cursor = first - Duration::days(lead);
        let mut weeks = Vec::new();

        loop {
            let week: [CalendarCell; 7] = std::array::from_fn(|i| {
                let date = cursor + Duration::days(i as i64);
                CalendarCell {
                    date,
                    in_month: date.month() == month && date.year() == year,
                    summary: journal
                        .day(date)
                        .filter(|day| day.has_data())
                        .map(|day| DaySummary::from_day(day, scorer, preferred)),
                }
            });
            weeks.push(week);
            cursor += Duration::days(7);

            if cursor.month() != month || cursor.year() != year {
                break;
            }
        }

        Ok(MonthCalendar {
            year,
            month,
            first_weekday,
            weeks,
        })
    }

    /// Summaries of the in-month days that have any data
    pub fn summaries(&self) -> impl Iterator<Item = &DaySummary> {
        self.weeks
            .iter()
            .flatten()
            .filter(|cell| cell.in_month)
            .filter_map(|cell| cell.summary.as_ref())
    }

    /// Mean of the in-month day scores
    pub fn average_score(&self) -> Option<f64> {
        let scores: Vec<f64> = self
            .summaries()
            .filter_map(|s| s.sleep_score)
            .map(|score| score as f64)
            .collect();
        if scores.is_empty() {
            return None;
        }
        Some(scores.iter().mean())
    }
}

/// Summaries for every journal day within `from..=to`
pub fn summarize_range(
    journal: &Journal,
    from: NaiveDate,
    to: NaiveDate,
    scorer: &SleepScorer,
    preferred: Option<Provider>,
) -> Vec<DaySummary> {
    if to < from {
        return Vec::new();
    }
    journal
        .range(from..=to)
        .map(|day| DaySummary::from_day(day, scorer, preferred))
        .collect()
}
