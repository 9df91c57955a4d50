//! In-memory day journal
//!
//! Days are keyed by calendar date and created on first touch. Sleep and
//! stress records are upserted per (day, provider): a second push for the
//! same pair replaces the first wholesale.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::ops::RangeInclusive;

use crate::error::Result;
use crate::models::{Day, DayAnnotations, Provider, SleepRecord, StressRecord};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Journal {
    days: BTreeMap<NaiveDate, Day>,
}

impl Journal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn day(&self, date: NaiveDate) -> Option<&Day> {
        self.days.get(&date)
    }

    /// Get the day for `date`, creating an empty one if needed
    pub fn day_mut_or_insert(&mut self, date: NaiveDate) -> &mut Day {
        self.days.entry(date).or_insert_with(|| Day::new(date))
    }

    /// Store a sleep record, replacing any earlier record from the same provider
    pub fn upsert_sleep(&mut self, date: NaiveDate, record: SleepRecord) -> Option<SleepRecord> {
        let provider = record.provider;
        let replaced = self.day_mut_or_insert(date).upsert_sleep(record);
        tracing::debug!(%date, %provider, replaced = replaced.is_some(), "Upserted sleep");
        replaced
    }

    /// Store a stress record, replacing any earlier record from the same provider
    pub fn upsert_stress(&mut self, date: NaiveDate, record: StressRecord) -> Option<StressRecord> {
        let provider = record.provider;
        let replaced = self.day_mut_or_insert(date).upsert_stress(record);
        tracing::debug!(%date, %provider, replaced = replaced.is_some(), "Upserted stress");
        replaced
    }

    /// Merge annotation fields into the day, creating it if needed
    pub fn annotate(&mut self, date: NaiveDate, update: DayAnnotations) -> Result<&Day> {
        update.validate()?;
        let day = self.day_mut_or_insert(date);
        day.annotations.merge(update);
        Ok(&*day)
    }

    pub fn sleep(&self, date: NaiveDate, provider: Provider) -> Option<&SleepRecord> {
        self.day(date).and_then(|d| d.sleep(provider))
    }

    pub fn days(&self) -> impl Iterator<Item = &Day> {
        self.days.values()
    }

    pub fn range(&self, dates: RangeInclusive<NaiveDate>) -> impl Iterator<Item = &Day> {
        self.days.range(dates).map(|(_, day)| day)
    }

    pub fn first_date(&self) -> Option<NaiveDate> {
        self.days.keys().next().copied()
    }

    pub fn last_date(&self) -> Option<NaiveDate> {
        self.days.keys().next_back().copied()
    }

    pub fn len(&self) -> usize {
        self.days.len()
    }

    pub fn is_empty(&self) -> bool {
        self.days.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SleepRsError;
    use crate::models::PhaseData;
    use chrono::{TimeZone, Utc};

    fn date(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 4, day).unwrap()
    }

    fn sleep(provider: Provider, total: u32) -> SleepRecord {
        let start = Utc.with_ymd_and_hms(2024, 4, 1, 23, 0, 0).unwrap();
        SleepRecord {
            provider,
            duration_total: total,
            duration_rem: 0,
            duration_deep: 0,
            duration_awake: 0,
            phases: PhaseData::default(),
            start,
            end: start + chrono::Duration::seconds(total as i64),
            offset: 0,
        }
    }

    #[test]
    fn test_upsert_is_last_write_wins() {
        let mut journal = Journal::new();
        assert!(journal.upsert_sleep(date(2), sleep(Provider::Garmin, 20_000)).is_none());
        let replaced = journal.upsert_sleep(date(2), sleep(Provider::Garmin, 26_000));

        assert_eq!(replaced.unwrap().duration_total, 20_000);
        assert_eq!(journal.len(), 1);
        assert_eq!(journal.day(date(2)).unwrap().sleeps.len(), 1);
        assert_eq!(
            journal.sleep(date(2), Provider::Garmin).unwrap().duration_total,
            26_000
        );
    }

    #[test]
    fn test_providers_do_not_collide() {
        let mut journal = Journal::new();
        journal.upsert_sleep(date(2), sleep(Provider::Garmin, 20_000));
        journal.upsert_sleep(date(2), sleep(Provider::Withings, 21_000));
        assert_eq!(journal.day(date(2)).unwrap().sleeps.len(), 2);
    }

    #[test]
    fn test_annotate_creates_and_merges() {
        let mut journal = Journal::new();
        journal
            .annotate(
                date(5),
                DayAnnotations {
                    mood: Some(2),
                    ..DayAnnotations::default()
                },
            )
            .unwrap();
        let day = journal
            .annotate(
                date(5),
                DayAnnotations {
                    nap_minutes: Some(20),
                    ..DayAnnotations::default()
                },
            )
            .unwrap();

        assert_eq!(day.annotations.mood, Some(2));
        assert_eq!(day.annotations.nap_minutes, Some(20));
    }

    #[test]
    fn test_annotate_rejects_long_notes() {
        let mut journal = Journal::new();
        let result = journal.annotate(
            date(5),
            DayAnnotations {
                notes: Some("z".repeat(300)),
                ..DayAnnotations::default()
            },
        );
        assert!(matches!(result, Err(SleepRsError::Validation(_))));
        assert!(journal.is_empty());
    }

    #[test]
    fn test_range_and_bounds() {
        let mut journal = Journal::new();
        for d in [3, 1, 9, 5] {
            journal.day_mut_or_insert(date(d));
        }
        let in_range: Vec<NaiveDate> = journal.range(date(2)..=date(5)).map(|d| d.date).collect();
        assert_eq!(in_range, vec![date(3), date(5)]);
        assert_eq!(journal.first_date(), Some(date(1)));
        assert_eq!(journal.last_date(), Some(date(9)));
    }
}
