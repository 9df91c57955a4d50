use anyhow::{Context, Result};
use chrono::{DateTime, Datelike, FixedOffset, NaiveDate};
use clap::{Args, Parser, Subcommand};
use colored::*;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tabled::{builder::Builder, settings::Style, Table, Tabled};

use sleeprs::calendar::{summarize_range, DaySummary, MonthCalendar};
use sleeprs::ingest::garmin::{GarminSleepPush, GarminStressPush};
use sleeprs::ingest::withings::WithingsSleep;
use sleeprs::ingest::{parse_calendar_date, IngestSummary, Ingestor};
use sleeprs::logging::{init_logging, LogFormat};
use sleeprs::timeline::day_timeline;
use sleeprs::{AppConfig, DayAnnotations, Journal, SleepRsError, SleepScorer};

/// SleepRS - Sleep and Stress Metrics CLI
///
/// Reads wearable webhook payloads from disk, scores each night and renders
/// calendars and minute-resolution phase timelines.
#[derive(Parser)]
#[command(name = "sleeprs")]
#[command(author = "SleepRS Contributors")]
#[command(version = "0.1.0")]
#[command(about = "Sleep and Stress Metrics CLI", long_about = None)]
struct Cli {
    /// Sets a custom config file
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Increase verbosity of output
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Log output format
    #[arg(long, value_enum, value_name = "FORMAT")]
    log_format: Option<LogFormat>,

    #[command(subcommand)]
    command: Commands,
}

/// Payload files shared by every data command
#[derive(Args, Debug, Default)]
struct PayloadArgs {
    /// Garmin sleeps push body (repeatable, applied in order)
    #[arg(long, value_name = "FILE")]
    garmin_sleep: Vec<PathBuf>,

    /// Garmin stress details push body (repeatable, applied in order)
    #[arg(long, value_name = "FILE")]
    garmin_stress: Vec<PathBuf>,

    /// Withings sleep summary body
    #[arg(long, value_name = "FILE", requires = "withings_series")]
    withings_summary: Option<PathBuf>,

    /// Withings sleep series body
    #[arg(long, value_name = "FILE", requires = "withings_summary")]
    withings_series: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Ingest payloads and print per-day scores
    Ingest {
        #[command(flatten)]
        payloads: PayloadArgs,
    },

    /// Show a month calendar with day scores and annotations
    Calendar {
        /// Month to show (YYYY-MM)
        #[arg(short, long)]
        month: String,

        /// TOML file of day annotations keyed by date
        #[arg(short, long, value_name = "FILE")]
        notes: Option<PathBuf>,

        #[command(flatten)]
        payloads: PayloadArgs,
    },

    /// Print the filled chart timelines of one day as JSON
    Timeline {
        /// Day to render (YYYY-MM-DD)
        #[arg(short, long)]
        date: String,

        #[command(flatten)]
        payloads: PayloadArgs,
    },

    /// Score a single night from its durations in seconds
    Score {
        total: u32,
        rem: u32,
        deep: u32,
    },

    /// Show or initialise the configuration file
    Config {
        /// Print the active configuration
        #[arg(short, long)]
        show: bool,

        /// Write a default configuration file
        #[arg(short, long)]
        init: bool,
    },
}

/// One line of the per-day score table
#[derive(Tabled)]
struct ScoreRow {
    #[tabled(rename = "Date")]
    date: String,
    #[tabled(rename = "Provider")]
    provider: String,
    #[tabled(rename = "Score")]
    score: String,
    #[tabled(rename = "Bedtime")]
    bedtime: String,
    #[tabled(rename = "Wake")]
    wake: String,
    #[tabled(rename = "Total")]
    total: String,
    #[tabled(rename = "REM")]
    rem: String,
    #[tabled(rename = "Deep")]
    deep: String,
    #[tabled(rename = "Light")]
    light: String,
    #[tabled(rename = "Awake")]
    awake: String,
    #[tabled(rename = "Stress")]
    stress: String,
}

impl From<&DaySummary> for ScoreRow {
    fn from(summary: &DaySummary) -> Self {
        ScoreRow {
            date: summary.date.to_string(),
            provider: summary.provider.map(|p| p.to_string()).unwrap_or_else(dash),
            score: summary.sleep_score.map(|s| s.to_string()).unwrap_or_else(dash),
            bedtime: summary.bedtime.map(clock).unwrap_or_else(dash),
            wake: summary.wake_time.map(clock).unwrap_or_else(dash),
            total: summary.total_sleep_seconds.map(hours_minutes).unwrap_or_else(dash),
            rem: summary.rem_seconds.map(hours_minutes).unwrap_or_else(dash),
            deep: summary.deep_seconds.map(hours_minutes).unwrap_or_else(dash),
            light: summary.light_seconds.map(hours_minutes).unwrap_or_else(dash),
            awake: summary.awake_seconds.map(hours_minutes).unwrap_or_else(dash),
            stress: summary
                .average_stress
                .map(|s| format!("{:.0}", s))
                .unwrap_or_else(dash),
        }
    }
}

fn dash() -> String {
    "-".to_string()
}

fn clock(time: DateTime<FixedOffset>) -> String {
    time.format("%H:%M").to_string()
}

fn hours_minutes(seconds: u32) -> String {
    format!("{}h{:02}", seconds / 3600, seconds % 3600 / 60)
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let (mut config, load_error) = match &cli.config {
        Some(path) => (AppConfig::load_from_file(path)?, None),
        None => AppConfig::load_or_default(),
    };

    config.logging.level = config.logging.level.raised_by(cli.verbose);
    if let Some(format) = cli.log_format {
        config.logging.format = format;
    }
    init_logging(&config.logging)?;

    if let Some(err) = load_error {
        tracing::warn!(
            path = %AppConfig::default_config_path().display(),
            error = %err,
            "Config file not loaded, using defaults"
        );
    }

    if cli.verbose > 0 {
        eprintln!("{}", format!("Log level: {}", config.logging.level.to_filter()).dimmed());
    }

    match cli.command {
        Commands::Ingest { payloads } => {
            println!("{}", "Ingesting payloads...".green().bold());
            let (journal, summary) = load_journal(&config, &payloads)?;
            print_summary(&summary);

            let scorer = SleepScorer::with_config(config.scoring.clone());
            let (Some(from), Some(to)) = (journal.first_date(), journal.last_date()) else {
                println!("{}", "No days ingested".yellow());
                return Ok(());
            };
            let rows: Vec<ScoreRow> =
                summarize_range(&journal, from, to, &scorer, config.ingest.preferred_provider)
                    .iter()
                    .map(ScoreRow::from)
                    .collect();
            println!("{}", Table::new(rows).with(Style::rounded()));
        }

        Commands::Calendar {
            month,
            notes,
            payloads,
        } => {
            let first = parse_month(&month)?;
            let (mut journal, summary) = load_journal(&config, &payloads)?;
            if cli.verbose > 0 {
                print_summary(&summary);
            }
            if let Some(notes) = notes {
                apply_notes(&mut journal, &notes)?;
            }

            let scorer = SleepScorer::with_config(config.scoring.clone());
            let calendar = MonthCalendar::build(
                &journal,
                first.year(),
                first.month(),
                &scorer,
                config.ingest.preferred_provider,
                config.display.week_starts_monday,
            )
            .map_err(report)?;

            println!("{}", first.format("%B %Y").to_string().cyan().bold());
            println!("{}", render_calendar(&calendar));
            match calendar.average_score() {
                Some(average) => println!("  Average score: {:.1}", average),
                None => println!("  {}", "No sleep data this month".yellow()),
            }
        }

        Commands::Timeline { date, payloads } => {
            let date = parse_calendar_date(&date)
                .map_err(SleepRsError::from)
                .map_err(report)?;
            let (journal, _) = load_journal(&config, &payloads)?;
            let day = journal.day(date).ok_or_else(|| {
                report(SleepRsError::Validation(format!("no data for {}", date)))
            })?;
            println!("{}", serde_json::to_string_pretty(&day_timeline(day))?);
        }

        Commands::Score { total, rem, deep } => {
            let scorer = SleepScorer::with_config(config.scoring.clone());
            let score = scorer.score(total, rem, deep);
            let day = scorer.day_score(&[score]).unwrap_or_default();
            let line = format!("Score: {:.1} (day score {})", score, day);
            if score >= 0.0 {
                println!("{}", line.green().bold());
            } else {
                println!("{}", line.red().bold());
            }
        }

        Commands::Config { show, init } => {
            if init {
                let path = match &cli.config {
                    Some(path) => {
                        AppConfig::default().save_to_file(path)?;
                        path.clone()
                    }
                    None => AppConfig::default().save_default()?,
                };
                println!("{}", format!("✓ Wrote default configuration to {}", path.display()).green());
            }
            if show || !init {
                println!("{}", toml::to_string_pretty(&config)?);
            }
        }
    }

    Ok(())
}

/// Log a library error at its severity and surface it to the user
fn report(err: SleepRsError) -> anyhow::Error {
    if err.severity().to_tracing_level() == tracing::Level::WARN {
        tracing::warn!(error = %err, "Command failed");
    } else {
        tracing::error!(error = %err, "Command failed");
    }
    eprintln!("{}", err.user_message().red());
    err.into()
}

fn read_payload(path: &Path) -> Result<String> {
    fs::read_to_string(path).with_context(|| format!("Failed to read payload: {}", path.display()))
}

/// Build a journal from every payload file, in flag order per kind
fn load_journal(config: &AppConfig, payloads: &PayloadArgs) -> Result<(Journal, IngestSummary)> {
    let ingestor = Ingestor::from_settings(&config.ingest);
    let mut journal = Journal::new();
    let mut summary = IngestSummary::default();

    for path in &payloads.garmin_sleep {
        let push = GarminSleepPush::from_json(&read_payload(path)?)
            .map_err(report)
            .with_context(|| format!("Rejected Garmin sleep payload: {}", path.display()))?;
        summary.absorb(ingestor.ingest_sleep(&mut journal, push));
    }

    for path in &payloads.garmin_stress {
        let push = GarminStressPush::from_json(&read_payload(path)?)
            .map_err(report)
            .with_context(|| format!("Rejected Garmin stress payload: {}", path.display()))?;
        summary.absorb(ingestor.ingest_stress(&mut journal, push));
    }

    if let (Some(summary_path), Some(series_path)) =
        (&payloads.withings_summary, &payloads.withings_series)
    {
        let night = WithingsSleep::from_json(&read_payload(summary_path)?, &read_payload(series_path)?)
            .map_err(report)
            .with_context(|| format!("Rejected Withings payload: {}", summary_path.display()))?;
        summary.absorb(ingestor.ingest_sleep(&mut journal, night));
    }

    Ok((journal, summary))
}

fn print_summary(summary: &IngestSummary) {
    println!(
        "{}",
        format!(
            "✓ Stored {} records ({} new, {} updated)",
            summary.stored(),
            summary.created,
            summary.updated
        )
        .green()
    );
    if summary.skipped > 0 {
        println!(
            "{}",
            format!("  Skipped {} entries for other wearers", summary.skipped).yellow()
        );
    }
    if summary.rejected > 0 {
        println!(
            "{}",
            format!("  Rejected {} malformed entries", summary.rejected).red()
        );
    }
}

fn parse_month(value: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(&format!("{}-01", value), "%Y-%m-%d")
        .with_context(|| format!("Invalid month '{}', expected YYYY-MM", value))
}

/// Merge a `notes.toml` file of `"YYYY-MM-DD" = { mood = 3, ... }` tables
fn apply_notes(journal: &mut Journal, path: &Path) -> Result<()> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read notes file: {}", path.display()))?;
    let notes: BTreeMap<String, DayAnnotations> =
        toml::from_str(&content).with_context(|| "Failed to parse notes TOML")?;

    for (date, annotations) in notes {
        let date = parse_calendar_date(&date)
            .map_err(SleepRsError::from)
            .map_err(report)?;
        journal.annotate(date, annotations).map_err(report)?;
    }
    Ok(())
}

fn render_calendar(calendar: &MonthCalendar) -> Table {
    let mut builder = Builder::default();

    let header: Vec<String> = calendar.weeks[0]
        .iter()
        .map(|cell| cell.date.format("%a").to_string())
        .collect();
    builder.push_record(header);

    for week in &calendar.weeks {
        let row: Vec<String> = week
            .iter()
            .map(|cell| {
                if !cell.in_month {
                    return String::new();
                }
                let mut text = cell.date.day().to_string();
                if let Some(summary) = &cell.summary {
                    if let Some(score) = summary.sleep_score {
                        text.push_str(&format!("\n{}", score));
                    }
                    if !summary.annotations.is_empty() {
                        text.push_str(" *");
                    }
                }
                text
            })
            .collect();
        builder.push_record(row);
    }

    let mut table = builder.build();
    table.with(Style::rounded());
    table
}
