//! Sleep quality scoring
//!
//! The score is a best-effort linear formula over sleep-stage durations. A
//! night is compared against an ideal of eight hours with 10% deep and 22.5%
//! REM sleep; every second above (or below) the ideal in each term adds (or
//! subtracts) one point:
//!
//! ```text
//! score = (total - 8h) + (deep - 0.10 * total) + (rem - 0.225 * total)
//! ```
//!
//! A perfectly ideal night scores exactly zero. The raw value is in
//! seconds-equivalent units; the day aggregate divides the mean by 100 for
//! display.
//!
//! # Usage
//!
//! ```rust
//! use sleeprs::scoring::{day_sleep_score, sleep_score};
//!
//! let ideal = sleep_score(8 * 3600, 6480, 2880);
//! assert!(ideal.abs() < 1e-9);
//!
//! assert_eq!(day_sleep_score(&[]), None);
//! assert_eq!(day_sleep_score(&[1200.0, 1800.0]), Some(15));
//! ```

use serde::{Deserialize, Serialize};
use statrs::statistics::Statistics;

use crate::models::{Day, SleepRecord};

/// Ideal sleep duration in seconds
pub const IDEAL_SLEEP_SECONDS: u32 = 8 * 3600;

/// Ideal share of deep sleep in the total
pub const IDEAL_DEEP_RATIO: f64 = 0.10;

/// Ideal share of REM sleep in the total
pub const IDEAL_REM_RATIO: f64 = 0.225;

/// Divisor applied to the mean raw score for the day-level display value
pub const DAY_SCORE_SCALE: f64 = 100.0;

/// Constants of the scoring formula
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoreConfig {
    /// Ideal total sleep in seconds (default: 28800)
    pub ideal_duration_secs: u32,

    /// Ideal deep sleep share of the total (default: 0.10)
    pub ideal_deep_ratio: f64,

    /// Ideal REM share of the total (default: 0.225)
    pub ideal_rem_ratio: f64,

    /// Day aggregate display divisor (default: 100)
    pub day_score_scale: f64,
}

impl Default for ScoreConfig {
    fn default() -> Self {
        ScoreConfig {
            ideal_duration_secs: IDEAL_SLEEP_SECONDS,
            ideal_deep_ratio: IDEAL_DEEP_RATIO,
            ideal_rem_ratio: IDEAL_REM_RATIO,
            day_score_scale: DAY_SCORE_SCALE,
        }
    }
}

/// Scorer parameterised by a [`ScoreConfig`]
#[derive(Debug, Clone, Default)]
pub struct SleepScorer {
    config: ScoreConfig,
}

impl SleepScorer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: ScoreConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ScoreConfig {
        &self.config
    }

    /// Raw score for one night. Awake time does not enter the formula.
    pub fn score(&self, total: u32, rem: u32, deep: u32) -> f64 {
        let total = total as f64;

        let sleep_gain = total - self.config.ideal_duration_secs as f64;

        let ideal_deep = total * self.config.ideal_deep_ratio;
        let deep_gain = deep as f64 - ideal_deep;

        let ideal_rem = total * self.config.ideal_rem_ratio;
        let rem_gain = rem as f64 - ideal_rem;

        sleep_gain + deep_gain + rem_gain
    }

    pub fn score_record(&self, record: &SleepRecord) -> f64 {
        self.score(record.duration_total, record.duration_rem, record.duration_deep)
    }

    /// Display score for a day: the mean raw score divided by the scale,
    /// rounded half-to-even. `None` when there is nothing to average.
    pub fn day_score(&self, scores: &[f64]) -> Option<i64> {
        if scores.is_empty() {
            return None;
        }

        let mean = scores.iter().mean();
        Some((mean / self.config.day_score_scale).round_ties_even() as i64)
    }

    pub fn score_day(&self, day: &Day) -> Option<i64> {
        let scores: Vec<f64> = day.sleeps.values().map(|r| self.score_record(r)).collect();
        self.day_score(&scores)
    }
}

/// Raw sleep score with the default constants
pub fn sleep_score(total: u32, rem: u32, deep: u32) -> f64 {
    SleepScorer::new().score(total, rem, deep)
}

/// Day display score with the default constants; `None` for an empty day
pub fn day_sleep_score(scores: &[f64]) -> Option<i64> {
    SleepScorer::new().day_score(scores)
}
