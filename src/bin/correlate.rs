//! Correlate CLI - batch driver for the habit correlation engine
//!
//! Commands:
//! - run: compute correlations for the users in an observation export
//! - doctor: diagnose engine capabilities and configuration

use clap::{Parser, Subcommand, ValueEnum};
use std::fs;
use std::io::{self, Read};
use std::path::PathBuf;
use std::process::ExitCode;

use chrono::{NaiveDate, Utc};
use habit_correlate::{
    CorrelationEngine, CorrelationInsight, CorrelationStore, EngineConfig, EngineError, Habit,
    HabitId, MemoryStore, ShapeCapability, UserId, ENGINE_VERSION,
};
use serde::Deserialize;

/// Correlate - batch correlation engine for habit tracking data
#[derive(Parser)]
#[command(name = "correlate")]
#[command(version = ENGINE_VERSION)]
#[command(about = "Compute pairwise habit correlations", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compute correlations for all users found in the input
    Run {
        /// Observations file: NDJSON or JSON array (use - for stdin)
        #[arg(short = 'i', long)]
        observations: PathBuf,

        /// Habits file: JSON array with archived flags; inferred from
        /// observations when omitted
        #[arg(long)]
        habits: Option<PathBuf>,

        /// Output file (use - for stdout)
        #[arg(short = 'o', long, default_value = "-")]
        output: PathBuf,

        /// Output format
        #[arg(long, default_value = "ndjson")]
        output_format: OutputFormat,

        /// Number of days to analyze, ending yesterday
        #[arg(long, default_value = "7")]
        days: u32,

        /// Compute correlations for a specific user only
        #[arg(long)]
        user_id: Option<UserId>,

        /// Minimum number of overlapping data points required per pair
        #[arg(long, default_value = "4")]
        min_sample_size: usize,

        /// Override "today" for window derivation (YYYY-MM-DD)
        #[arg(long)]
        today: Option<NaiveDate>,
    },

    /// Diagnose engine capabilities
    Doctor {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Clone, ValueEnum)]
enum OutputFormat {
    /// Newline-delimited JSON (one insight per line)
    Ndjson,
    /// JSON array of insights
    Json,
    /// Pretty-printed JSON
    JsonPretty,
}

/// One observation row of the export format
#[derive(Deserialize)]
struct ObservationRecord {
    user_id: UserId,
    habit_id: HabitId,
    date: NaiveDate,
    value: f64,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!(
                "{}",
                serde_json::to_string(&CliError::from(e))
                    .unwrap_or_else(|_| "Unknown error".to_string())
            );
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<(), CorrelateCliError> {
    match cli.command {
        Commands::Run {
            observations,
            habits,
            output,
            output_format,
            days,
            user_id,
            min_sample_size,
            today,
        } => cmd_run(
            &observations,
            habits.as_deref(),
            &output,
            output_format,
            days,
            user_id,
            min_sample_size,
            today,
        ),
        Commands::Doctor { json } => cmd_doctor(json),
    }
}

#[allow(clippy::too_many_arguments)]
fn cmd_run(
    observations_path: &PathBuf,
    habits_path: Option<&std::path::Path>,
    output: &PathBuf,
    output_format: OutputFormat,
    days: u32,
    user_id: Option<UserId>,
    min_sample_size: usize,
    today: Option<NaiveDate>,
) -> Result<(), CorrelateCliError> {
    let records = read_observations(observations_path)?;
    if records.is_empty() {
        return Err(CorrelateCliError::NoObservations);
    }

    let mut store = MemoryStore::new();

    if let Some(path) = habits_path {
        let data = fs::read_to_string(path)?;
        let habits: Vec<Habit> = serde_json::from_str(&data)?;
        for habit in habits {
            store.add_habit(habit);
        }
    } else {
        // No archived flags available: every observed habit counts as active
        for record in &records {
            store.add_habit(Habit {
                id: record.habit_id,
                user_id: record.user_id,
                archived: false,
            });
        }
    }

    for record in &records {
        store.record(record.habit_id, record.date, record.value);
    }

    let config = EngineConfig {
        window_days: days,
        min_sample_size,
        user_filter: user_id,
    };
    let engine = CorrelationEngine::new(config);

    let today = today.unwrap_or_else(|| Utc::now().date_naive());
    let report = engine.run(&mut store, today)?;

    eprintln!(
        "Computing correlations from {} to {}",
        report.window.start, report.window.end
    );
    for user_report in &report.reports {
        eprintln!(
            "  User {}: {} correlations",
            user_report.user_id, user_report.pairs_computed
        );
    }
    for failure in &report.failures {
        eprintln!("  User {} failed: {}", failure.user_id, failure.error);
    }
    eprintln!("Computed {} total correlations", report.total_pairs());

    let mut insights: Vec<CorrelationInsight> = Vec::new();
    for user_report in &report.reports {
        for result in store.list_correlations(user_report.user_id)? {
            insights.push(CorrelationInsight::from_result(&result));
        }
    }

    let output_data = format_output(&insights, &output_format)?;
    if output.to_string_lossy() == "-" {
        print!("{output_data}");
    } else {
        fs::write(output, output_data)?;
    }

    if report.failures.is_empty() {
        Ok(())
    } else {
        Err(CorrelateCliError::UsersFailed(report.failures.len()))
    }
}

fn cmd_doctor(json: bool) -> Result<(), CorrelateCliError> {
    let shape = habit_correlate::shape::capability();

    if json {
        let report = serde_json::json!({
            "version": ENGINE_VERSION,
            "shape_capability": shape,
            "default_window_days": habit_correlate::config::DEFAULT_WINDOW_DAYS,
            "default_min_sample_size": habit_correlate::config::DEFAULT_MIN_SAMPLE_SIZE,
        });
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("Correlate Doctor Report");
        println!("=======================");
        println!("Version: {ENGINE_VERSION}");
        match shape {
            ShapeCapability::Available => println!("[OK] shape distance engine available"),
            ShapeCapability::Unavailable => {
                println!("[WARN] shape distance engine not compiled in; the field will be null")
            }
        }
    }

    Ok(())
}

fn read_observations(path: &PathBuf) -> Result<Vec<ObservationRecord>, CorrelateCliError> {
    let data = if path.to_string_lossy() == "-" {
        let mut buffer = String::new();
        io::stdin().read_to_string(&mut buffer)?;
        buffer
    } else {
        fs::read_to_string(path)?
    };

    let trimmed = data.trim_start();
    if trimmed.starts_with('[') {
        Ok(serde_json::from_str(&data)?)
    } else {
        data.lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(|line| serde_json::from_str(line).map_err(CorrelateCliError::from))
            .collect()
    }
}

fn format_output(
    insights: &[CorrelationInsight],
    format: &OutputFormat,
) -> Result<String, CorrelateCliError> {
    match format {
        OutputFormat::Ndjson => {
            let mut lines: Vec<String> = Vec::new();
            for insight in insights {
                lines.push(serde_json::to_string(insight)?);
            }
            Ok(lines.join("\n") + "\n")
        }
        OutputFormat::Json => Ok(serde_json::to_string(insights)?),
        OutputFormat::JsonPretty => Ok(serde_json::to_string_pretty(insights)?),
    }
}

// Error types

#[derive(Debug)]
enum CorrelateCliError {
    Io(io::Error),
    Json(serde_json::Error),
    Engine(EngineError),
    NoObservations,
    UsersFailed(usize),
}

impl From<io::Error> for CorrelateCliError {
    fn from(e: io::Error) -> Self {
        CorrelateCliError::Io(e)
    }
}

impl From<serde_json::Error> for CorrelateCliError {
    fn from(e: serde_json::Error) -> Self {
        CorrelateCliError::Json(e)
    }
}

impl From<EngineError> for CorrelateCliError {
    fn from(e: EngineError) -> Self {
        CorrelateCliError::Engine(e)
    }
}

impl From<habit_correlate::StoreError> for CorrelateCliError {
    fn from(e: habit_correlate::StoreError) -> Self {
        CorrelateCliError::Engine(EngineError::Store(e))
    }
}

#[derive(serde::Serialize)]
struct CliError {
    code: String,
    message: String,
    hint: Option<String>,
}

impl From<CorrelateCliError> for CliError {
    fn from(e: CorrelateCliError) -> Self {
        match e {
            CorrelateCliError::Io(e) => CliError {
                code: "IO_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check file paths and permissions".to_string()),
            },
            CorrelateCliError::Json(e) => CliError {
                code: "JSON_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Expected {user_id, habit_id, date, value} records".to_string()),
            },
            CorrelateCliError::Engine(e) => CliError {
                code: "ENGINE_ERROR".to_string(),
                message: e.to_string(),
                hint: None,
            },
            CorrelateCliError::NoObservations => CliError {
                code: "NO_OBSERVATIONS".to_string(),
                message: "No observations found in input".to_string(),
                hint: Some("Ensure the input file is not empty".to_string()),
            },
            CorrelateCliError::UsersFailed(count) => CliError {
                code: "USERS_FAILED".to_string(),
                message: format!("{count} user(s) failed during the batch pass"),
                hint: Some("Failed users are fully recomputed on the next run".to_string()),
            },
        }
    }
}
