use anyhow::{Context, Result};
use chrono::{Duration, NaiveDate, Utc};
use clap::{Args, Parser, Subcommand};
use colored::*;
use rust_decimal::Decimal;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tabled::{settings::Style, Table, Tabled};

use recoveryrs::config::AppConfig;
use recoveryrs::database::Database;
use recoveryrs::events::{self, spawn_recovery_worker};
use recoveryrs::import::SessionCsvImporter;
use recoveryrs::logging::{init_logging, LogFormat, LogLevel};
use recoveryrs::models::{BiometricInputs, TrainingSession};
use recoveryrs::recovery::{RecoveryStatus, RecoveryStatusLabel};
use recoveryrs::service::{RecoveryService, ServiceConfig};
use recoveryrs::RecoveryError;

/// recoveryrs - Training Recovery CLI
///
/// Scores daily recovery from sleep and biometric inputs, tracks strength
/// training load, and suggests how hard to train today.
#[derive(Parser)]
#[command(name = "recoveryrs")]
#[command(version)]
#[command(about = "Training recovery and load tracking", long_about = None)]
struct Cli {
    /// Sets a custom config file
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Override the database file
    #[arg(long, value_name = "FILE")]
    database: Option<PathBuf>,

    /// User to act as (defaults to settings.default_user_id)
    #[arg(short, long)]
    user: Option<String>,

    /// Increase verbosity of output
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Log output format (pretty, json, compact)
    #[arg(long)]
    log_format: Option<LogFormat>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct BiometricArgs {
    /// Hours slept
    #[arg(long)]
    sleep_hours: Option<f64>,

    /// Sleep quality (1-10)
    #[arg(long)]
    sleep_quality: Option<u8>,

    /// Muscle soreness (1-10)
    #[arg(long)]
    soreness: Option<u8>,

    /// Stress level (1-10)
    #[arg(long)]
    stress: Option<u8>,

    /// Heart rate variability in ms
    #[arg(long)]
    hrv: Option<u16>,

    /// Resting heart rate in bpm
    #[arg(long)]
    rhr: Option<u16>,
}

impl From<BiometricArgs> for BiometricInputs {
    fn from(args: BiometricArgs) -> Self {
        BiometricInputs {
            sleep_hours: args.sleep_hours,
            sleep_quality: args.sleep_quality,
            muscle_soreness: args.soreness,
            stress_level: args.stress,
            hrv: args.hrv,
            resting_heart_rate: args.rhr,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Calculate a recovery score without storing it
    Score {
        #[command(flatten)]
        inputs: BiometricArgs,
    },

    /// Record this morning's recovery reading
    Record {
        #[command(flatten)]
        inputs: BiometricArgs,

        /// Free-text notes
        #[arg(short, long)]
        notes: Option<String>,
    },

    /// Record a completed training session
    Train {
        /// Exercise name
        #[arg(short, long)]
        exercise: String,

        /// Exercise type or muscle group (legs, chest, back, ...)
        #[arg(short = 't', long = "type", default_value = "general")]
        exercise_type: String,

        #[arg(long)]
        sets: Option<u32>,

        #[arg(long)]
        reps: Option<u32>,

        /// Weight per rep
        #[arg(short, long)]
        weight: Option<Decimal>,

        /// Duration in minutes
        #[arg(short, long)]
        duration: Option<u32>,

        /// Training date (YYYY-MM-DD, default: today)
        #[arg(long)]
        date: Option<NaiveDate>,
    },

    /// Import training sessions from a CSV file
    Import {
        /// Input CSV file
        #[arg(short, long)]
        file: PathBuf,

        /// Parse and report without storing
        #[arg(long)]
        dry_run: bool,
    },

    /// Show recovery status
    Status {
        /// Assessment date (YYYY-MM-DD, default: today)
        #[arg(short, long)]
        date: Option<NaiveDate>,

        /// Print JSON instead of text
        #[arg(long)]
        json: bool,
    },

    /// Show training load and acute:chronic ratio
    Load {
        /// Range start (YYYY-MM-DD, default: 6 days before --to)
        #[arg(short, long)]
        from: Option<NaiveDate>,

        /// Range end (YYYY-MM-DD, default: today)
        #[arg(short, long)]
        to: Option<NaiveDate>,

        /// Print one row per day
        #[arg(long)]
        daily: bool,
    },

    /// Suggest today's training
    Suggest,

    /// Show the recovery score trend
    Trend {
        /// Number of days to look back
        #[arg(short, long, default_value = "14")]
        days: u32,
    },

    /// Configure application settings
    Config {
        /// Print the active configuration
        #[arg(short, long)]
        show: bool,

        /// Write a default configuration file
        #[arg(long)]
        init: bool,

        /// Print the configuration file path
        #[arg(long)]
        path: bool,
    },
}

#[derive(Tabled)]
struct LoadRow {
    #[tabled(rename = "Date")]
    date: String,
    #[tabled(rename = "Volume")]
    volume: String,
    #[tabled(rename = "Acute")]
    acute: String,
    #[tabled(rename = "Chronic")]
    chronic: String,
    #[tabled(rename = "A:C")]
    ratio: String,
    #[tabled(rename = "Status")]
    status: String,
}

#[derive(Tabled)]
struct SuggestionRow {
    #[tabled(rename = "#")]
    priority: u8,
    #[tabled(rename = "Kind")]
    kind: String,
    #[tabled(rename = "Suggestion")]
    title: String,
    #[tabled(rename = "Details")]
    description: String,
}

fn main() {
    let cli = Cli::parse();

    if let Err(err) = run(cli) {
        let message = match err.downcast_ref::<RecoveryError>() {
            Some(recovery_err) => recovery_err.user_message(),
            None => format!("{:#}", err),
        };
        eprintln!("{} {}", "error:".red().bold(), message);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    let config_path = cli.config.clone().unwrap_or_else(AppConfig::default_config_path);
    let mut config = match &cli.config {
        Some(path) => AppConfig::load_from_file(path)?,
        None => AppConfig::load_or_default(),
    };

    if cli.verbose > 0 {
        config.logging.level = match cli.verbose {
            1 => LogLevel::Info,
            2 => LogLevel::Debug,
            _ => LogLevel::Trace,
        };
    }
    if let Some(format) = cli.log_format {
        config.logging.format = format;
    }
    if let Some(database) = &cli.database {
        config.settings.database_path = database.clone();
    }
    init_logging(&config.logging)?;

    match cli.command {
        Commands::Config { show, init, path } => {
            return manage_config(&mut config, &config_path, show, init, path);
        }
        Commands::Score { inputs } => {
            let inputs = BiometricInputs::from(inputs);
            inputs.validate().map_err(RecoveryError::from)?;
            let score = recoveryrs::calculate_recovery_score(&inputs);
            let label = RecoveryStatusLabel::from_score(score);

            println!("{} {}", "Recovery score:".bold(), score.to_string().bold());
            println!("  {} {}", colored_label(label), label.description().dimmed());
            return Ok(());
        }
        _ => {}
    }

    let user_id = cli
        .user
        .clone()
        .or_else(|| config.settings.default_user_id.clone())
        .context("No user given; pass --user or set settings.default_user_id")?;

    let database_file = config.database_file();
    if let Some(parent) = database_file.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create data directory: {}", parent.display()))?;
    }
    let database = Arc::new(
        Database::new(&database_file)
            .with_context(|| format!("Failed to open database: {}", database_file.display()))?,
    );
    let service = Arc::new(RecoveryService::new(
        database.clone(),
        database,
        ServiceConfig::from(&config),
    ));

    match cli.command {
        Commands::Record { inputs, notes } => {
            let reading = service.submit_reading(&user_id, inputs.into(), notes, None)?;
            let status = RecoveryStatus::from_reading(&reading, reading.timestamp.date_naive());

            println!("{}", "✓ Recovery reading recorded".green());
            print_status(&status);
        }

        Commands::Train {
            exercise,
            exercise_type,
            sets,
            reps,
            weight,
            duration,
            date,
        } => {
            let session = TrainingSession::new(
                user_id.as_str(),
                exercise,
                exercise_type,
                sets,
                reps,
                weight,
                duration,
                date.unwrap_or_else(|| Utc::now().date_naive()),
            );

            let adjusted = record_with_worker(&service, vec![session])?;
            println!("{}", "✓ Training session recorded".green());
            if adjusted > 0 {
                let status = service.current_recovery_status(&user_id)?;
                println!(
                    "  Recovery score now {} ({})",
                    status.overall_score.to_string().bold(),
                    colored_label(status.status_label)
                );
            }
        }

        Commands::Import { file, dry_run } => {
            println!("{}", "Importing training sessions...".green().bold());
            let report = SessionCsvImporter::new().import_file(&file, &user_id)?;

            for skipped in &report.skipped {
                println!("  {} line {}: {}", "skipped".yellow(), skipped.line, skipped.reason);
            }

            if dry_run {
                println!("  {} sessions parsed (dry run, nothing stored)", report.sessions.len());
            } else {
                let count = report.sessions.len();
                record_with_worker(&service, report.sessions)?;
                println!("{}", format!("✓ Imported {} sessions", count).green());
            }
        }

        Commands::Status { date, json } => {
            let status = match date {
                Some(date) => service.recovery_status_for_date(&user_id, date)?,
                None => service.current_recovery_status(&user_id)?,
            };

            if json {
                println!("{}", serde_json::to_string_pretty(&status)?);
            } else {
                print_status(&status);
            }
        }

        Commands::Load { from, to, daily } => {
            let end = to.unwrap_or_else(|| Utc::now().date_naive());
            let start = from.unwrap_or(end - Duration::days(6));

            if daily {
                let rows: Vec<LoadRow> = service
                    .training_load_series(&user_id, start, end)?
                    .into_iter()
                    .map(|day| LoadRow {
                        date: day.date.to_string(),
                        volume: day.daily_volume.round_dp(1).to_string(),
                        acute: day.acute_load.round_dp(1).to_string(),
                        chronic: day.chronic_load.round_dp(1).to_string(),
                        ratio: day.acute_chronic_ratio.round_dp(2).to_string(),
                        status: day.load_status.to_string(),
                    })
                    .collect();
                println!("{}", Table::new(rows).with(Style::rounded()));
            } else {
                let snapshot = service.calculate_training_load(&user_id, start, end)?;

                println!("{} {} to {}", "Training load".cyan().bold(), start, end);
                println!("  Total volume:   {}", snapshot.total_volume.round_dp(1));
                println!("  Training days:  {}", snapshot.session_count);
                println!("  Average volume: {}", snapshot.average_volume.round_dp(1));
                println!("  Acute load:     {}", snapshot.acute_load.round_dp(1));
                println!("  Chronic load:   {}", snapshot.chronic_load.round_dp(1));
                println!(
                    "  A:C ratio:      {} {}",
                    snapshot.acute_chronic_ratio.round_dp(2).to_string().bold(),
                    snapshot.load_status.to_string().cyan()
                );
                println!("  {}", snapshot.load_status.recommendation().dimmed());
            }
        }

        Commands::Suggest => {
            let rows: Vec<SuggestionRow> = service
                .training_suggestions(&user_id)?
                .into_iter()
                .map(|s| SuggestionRow {
                    priority: s.priority,
                    kind: s.kind.to_string(),
                    title: s.title,
                    description: s.description,
                })
                .collect();
            println!("{}", Table::new(rows).with(Style::rounded()));
        }

        Commands::Trend { days } => {
            let end = Utc::now().date_naive();
            let start = end - Duration::days(days.saturating_sub(1) as i64);

            match service.recovery_trend(&user_id, start, end)? {
                Some(trend) => {
                    println!("{} over {} readings", "Recovery trend".magenta().bold(), trend.reading_count);
                    println!("  Average: {:.1}", trend.average_score);
                    println!("  Range:   {} - {}", trend.min_score, trend.max_score);
                    println!("  Trend:   {:?}", trend.trend);
                }
                None => println!("{}", "No readings in this period".dimmed()),
            }
        }

        Commands::Score { .. } | Commands::Config { .. } => {}
    }

    Ok(())
}

/// Store sessions and wait for the recovery worker to apply their impact
///
/// Returns the number of readings the worker adjusted.
fn record_with_worker(service: &Arc<RecoveryService>, sessions: Vec<TrainingSession>) -> Result<usize> {
    let runtime = tokio::runtime::Runtime::new().context("Failed to start async runtime")?;

    runtime.block_on(async {
        let (publisher, receiver) = events::channel();
        service.attach_publisher(publisher);
        let worker = spawn_recovery_worker(Arc::clone(service), receiver);

        let mut result = Ok(());
        for session in sessions {
            if let Err(err) = service.record_training(session) {
                result = Err(err);
                break;
            }
        }
        service.detach_publisher();

        let stats = worker.await.context("Recovery worker stopped unexpectedly")?;
        if stats.failed > 0 {
            eprintln!(
                "{}",
                format!("warning: {} recovery adjustments failed", stats.failed).yellow()
            );
        }

        result?;
        Ok(stats.adjusted)
    })
}

fn manage_config(config: &mut AppConfig, path: &Path, show: bool, init: bool, print_path: bool) -> Result<()> {
    if print_path {
        println!("{}", path.display());
    }

    if init {
        if path.exists() {
            anyhow::bail!("Config file already exists: {}", path.display());
        }
        config.save_to_file(path)?;
        println!("{}", format!("✓ Wrote {}", path.display()).green());
    }

    if show || !(init || print_path) {
        println!("{}", toml::to_string_pretty(config)?);

        let database_file = config.database_file();
        if database_file.exists() {
            let stats = Database::new(&database_file)?.get_stats()?;
            println!(
                "{} {} readings, {} sessions, {} users",
                "Database:".bold(),
                stats.reading_count,
                stats.session_count,
                stats.user_count
            );
        }
    }

    Ok(())
}

fn colored_label(label: RecoveryStatusLabel) -> ColoredString {
    let text = label.to_string();
    match label {
        RecoveryStatusLabel::Excellent => text.green().bold(),
        RecoveryStatusLabel::Good => text.green(),
        RecoveryStatusLabel::Fair => text.yellow(),
        RecoveryStatusLabel::Poor => text.red(),
        RecoveryStatusLabel::Critical => text.red().bold(),
        RecoveryStatusLabel::Unknown => text.dimmed(),
    }
}

fn print_status(status: &RecoveryStatus) {
    println!(
        "{} {} on {}",
        "Recovery".bold(),
        colored_label(status.status_label),
        status.assessment_date
    );
    println!("  Score:               {}", status.overall_score.to_string().bold());
    println!("  Recommended:         {}", status.recommended_intensity);
    println!("  Est. recovery days:  {}", status.estimated_recovery_days);
    if let Some(sleep) = status.sleep_score {
        println!("  Sleep score:         {}", sleep);
    }
    for line in &status.advice {
        println!("  • {}", line);
    }
}
