use chrono::NaiveDate;
use sleeprs::calendar::{summarize_range, MonthCalendar};
use sleeprs::ingest::garmin::{GarminSleepPush, GarminStressPush};
use sleeprs::ingest::withings::WithingsSleep;
use sleeprs::ingest::Ingestor;
use sleeprs::timeline::{day_timeline, SleepTimeline};
use sleeprs::{DayAnnotations, Journal, Provider, SleepPhase, SleepScorer};

/// Integration tests that drive vendor payloads through the whole pipeline

#[cfg(test)]
mod integration_tests {
    use super::*;

    const GARMIN_SLEEPS: &str = r#"{
        "sleeps": [{
            "userAccessToken": "wearer-1",
            "calendarDate": "2024-03-02",
            "startTimeInSeconds": 1709332200,
            "startTimeOffsetInSeconds": 3600,
            "durationInSeconds": 27000,
            "remSleepInSeconds": 5400,
            "deepSleepDurationInSeconds": 3600,
            "awakeDurationInSeconds": 900,
            "sleepLevelsMap": {
                "deep": [{"startTimeInSeconds": 1709332200, "endTimeInSeconds": 1709332320}],
                "rem": [{"startTimeInSeconds": 1709332320, "endTimeInSeconds": 1709332380}]
            }
        }]
    }"#;

    const GARMIN_STRESS: &str = r#"{
        "stressDetails": [{
            "userAccessToken": "wearer-1",
            "calendarDate": "2024-03-02",
            "startTimeInSeconds": 1709337600,
            "startTimeOffsetInSeconds": 3600,
            "durationInSeconds": 540,
            "timeOffsetStressLevelValues": {"0": 20, "180": 40, "360": -1},
            "timeOffsetBodyBatteryValues": {"0": 80, "180": 79}
        }]
    }"#;

    const WITHINGS_SUMMARY: &str = r#"{
        "timezone": "Europe/Paris",
        "startdate": 1709330400,
        "enddate": 1709359200,
        "date": "2024-03-02",
        "data": {
            "total_sleep_time": 26400,
            "remsleepduration": 5400,
            "deepsleepduration": 4200,
            "wakeupduration": 1200
        }
    }"#;

    const WITHINGS_SERIES: &str = r#"{
        "series": [
            {"startdate": 1709330400, "enddate": 1709330520, "state": 0},
            {"startdate": 1709330520, "enddate": 1709330700, "state": 1}
        ]
    }"#;

    fn march(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, day).unwrap()
    }

    fn journal_with_all_payloads() -> Journal {
        let ingestor = Ingestor::new();
        let mut journal = Journal::new();
        ingestor
            .ingest_sleep(&mut journal, GarminSleepPush::from_json(GARMIN_SLEEPS).unwrap());
        ingestor
            .ingest_stress(&mut journal, GarminStressPush::from_json(GARMIN_STRESS).unwrap());
        ingestor
            .ingest_sleep(
                &mut journal,
                WithingsSleep::from_json(WITHINGS_SUMMARY, WITHINGS_SERIES).unwrap(),
            );
        journal
    }

    #[test]
    fn test_garmin_night_scores() {
        let ingestor = Ingestor::new();
        let mut journal = Journal::new();
        let summary = ingestor
            .ingest_sleep(&mut journal, GarminSleepPush::from_json(GARMIN_SLEEPS).unwrap());

        assert_eq!(summary.created, 1);
        assert_eq!(summary.dates, vec![march(2)]);

        let record = journal.sleep(march(2), Provider::Garmin).unwrap();
        // -1800 short, +900 deep surplus, -675 REM deficit
        assert!((record.score() - -1575.0).abs() < 1e-6);

        let scorer = SleepScorer::new();
        assert_eq!(scorer.score_day(journal.day(march(2)).unwrap()), Some(-16));
    }

    #[test]
    fn test_two_providers_share_a_day() {
        let journal = journal_with_all_payloads();
        let day = journal.day(march(2)).unwrap();

        assert_eq!(journal.len(), 1);
        assert_eq!(day.sleeps.len(), 2);
        assert_eq!(day.stresses.len(), 1);

        // mean(-1575, -1380) / 100 = -14.775
        assert_eq!(SleepScorer::new().score_day(day), Some(-15));
    }

    #[test]
    fn test_repeated_push_overwrites_record() {
        let ingestor = Ingestor::new();
        let mut journal = Journal::new();
        ingestor
            .ingest_sleep(&mut journal, GarminSleepPush::from_json(GARMIN_SLEEPS).unwrap());

        let corrected = GARMIN_SLEEPS.replace("\"durationInSeconds\": 27000", "\"durationInSeconds\": 28800");
        let summary = ingestor
            .ingest_sleep(&mut journal, GarminSleepPush::from_json(&corrected).unwrap());

        assert_eq!(summary.created, 0);
        assert_eq!(summary.updated, 1);
        let day = journal.day(march(2)).unwrap();
        assert_eq!(day.sleeps.len(), 1);
        assert_eq!(day.sleeps[&Provider::Garmin].duration_total, 28_800);
    }

    #[test]
    fn test_foreign_wearer_is_skipped() {
        let ingestor = Ingestor::with_access_token("wearer-2");
        let mut journal = Journal::new();
        let summary = ingestor
            .ingest_sleep(&mut journal, GarminSleepPush::from_json(GARMIN_SLEEPS).unwrap());

        assert_eq!(summary.skipped, 1);
        assert_eq!(summary.stored(), 0);
        assert!(journal.is_empty());

        // Withings carries no token and is always accepted
        let summary = ingestor
            .ingest_sleep(
                &mut journal,
                WithingsSleep::from_json(WITHINGS_SUMMARY, WITHINGS_SERIES).unwrap(),
            );
        assert_eq!(summary.created, 1);
    }

    #[test]
    fn test_day_timeline_covers_every_record() {
        let journal = journal_with_all_payloads();
        let timeline = day_timeline(journal.day(march(2)).unwrap());

        match &timeline.sleeps[&Provider::Garmin] {
            SleepTimeline::Points(points) => {
                assert_eq!(points[&SleepPhase::Deep].len(), 3);
                assert_eq!(points[&SleepPhase::Rem].len(), 2);
                assert_eq!(points[&SleepPhase::Deep][0].timestamp_ms, 1_709_332_200_000);
                assert!(!points.contains_key(&SleepPhase::Light));
            }
            other => panic!("unexpected Garmin timeline {:?}", other),
        }

        match &timeline.sleeps[&Provider::Withings] {
            SleepTimeline::Segments(segments) => {
                assert_eq!(segments.len(), 7);
                assert_eq!(segments[0].start, 1_709_330_400);
                assert_eq!(segments[0].end, 1_709_330_460);
            }
            other => panic!("unexpected Withings timeline {:?}", other),
        }

        let stress = &timeline.stresses[&Provider::Garmin];
        assert_eq!(stress.stress.len(), 3);
        assert_eq!(stress.battery.len(), 2);
        assert_eq!(stress.stress[1].timestamp_ms, (1_709_337_600 + 180) * 1000);

        let json = serde_json::to_string(&timeline).unwrap();
        assert!(json.contains("\"unmeasured\""));
    }

    #[test]
    fn test_calendar_with_annotations() {
        let mut journal = journal_with_all_payloads();
        journal
            .annotate(
                march(2),
                DayAnnotations {
                    mood: Some(4),
                    alcohol_doses: Some(1),
                    ..Default::default()
                },
            )
            .unwrap();
        journal
            .annotate(
                march(5),
                DayAnnotations {
                    vacation: Some(true),
                    ..Default::default()
                },
            )
            .unwrap();

        let scorer = SleepScorer::new();
        let calendar = MonthCalendar::build(&journal, 2024, 3, &scorer, Some(Provider::Withings), true)
            .unwrap();

        let summaries: Vec<_> = calendar.summaries().collect();
        assert_eq!(summaries.len(), 2);

        let night = summaries[0];
        assert_eq!(night.date, march(2));
        assert_eq!(night.sleep_score, Some(-15));
        assert_eq!(night.provider, Some(Provider::Withings));
        assert_eq!(night.total_sleep_seconds, Some(26_400));
        assert_eq!(night.average_stress, Some(30.0));
        assert_eq!(night.annotations.mood, Some(4));

        let holiday = summaries[1];
        assert_eq!(holiday.sleep_score, None);
        assert_eq!(holiday.annotations.vacation, Some(true));

        assert_eq!(calendar.average_score(), Some(-15.0));
    }

    #[test]
    fn test_range_summaries_across_days() {
        let ingestor = Ingestor::new();
        let mut journal = Journal::new();
        let next_night = GARMIN_SLEEPS.replace("2024-03-02", "2024-03-03");
        ingestor
            .ingest_sleep(&mut journal, GarminSleepPush::from_json(GARMIN_SLEEPS).unwrap());
        ingestor
            .ingest_sleep(&mut journal, GarminSleepPush::from_json(&next_night).unwrap());

        let summaries = summarize_range(&journal, march(1), march(31), &SleepScorer::new(), None);
        assert_eq!(summaries.len(), 2);
        assert!(summaries.iter().all(|s| s.sleep_score == Some(-16)));
    }
}
