use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::{info, warn};

use spam_detector_rust::config::AppConfig;
use spam_detector_rust::export;
use spam_detector_rust::logging::{init_logging, OperationTimer};
use spam_detector_rust::metrics::MetricsCollector;
use spam_detector_rust::models::OutputFormat;
use spam_detector_rust::service::SpamDetector;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Classify a single message
    Predict {
        /// The message text to classify
        message: String,

        /// Do not record the prediction in the history
        #[arg(long)]
        no_store: bool,
    },
    /// Classify messages from a file, one per line
    Batch {
        /// Path to a text file with one message per line
        #[arg(short, long)]
        input: PathBuf,

        /// Do not record the predictions in the history
        #[arg(long)]
        no_store: bool,
    },
    /// Show the most recent predictions
    History {
        /// Maximum number of predictions to show
        #[arg(short, long, default_value = "20")]
        limit: usize,
    },
    /// Show whole-history statistics
    Stats,
    /// Show per-day statistics
    Daily {
        /// Number of days to cover
        #[arg(short, long, default_value = "7")]
        days: u32,
    },
    /// Analyze the recent spam-volume trend
    Trend {
        /// Analysis window in days
        #[arg(short, long)]
        days: Option<u32>,
    },
    /// Export prediction history or daily statistics to a file
    Export {
        /// What to export: "predictions" or "daily"
        #[arg(short, long, default_value = "predictions")]
        what: String,

        /// Output format (csv or json)
        #[arg(short, long)]
        format: Option<String>,

        /// Output file path
        #[arg(short, long)]
        output: PathBuf,

        /// Row limit for prediction export
        #[arg(short, long, default_value = "10000")]
        limit: usize,

        /// Day window for daily export
        #[arg(short, long, default_value = "30")]
        days: u32,
    },
    /// Delete predictions older than the retention window
    Cleanup {
        /// Retention in days; predictions older than this are removed
        #[arg(short, long)]
        days: Option<u32>,
    },
    /// Rebuild all daily statistics from the prediction history
    Rebuild,
    /// Show the loaded classifier bundle
    ModelInfo,
}

fn main() -> Result<()> {
    // Load configuration
    let config = AppConfig::load()?;

    // Initialize logging and metrics
    let _log_guard = init_logging(Some(&config.get_log_level()), None)?;
    if let Err(error) = MetricsCollector::init() {
        warn!(%error, "Metrics recorder not installed");
    }

    info!("Starting spam-detector application");

    // Parse command line arguments
    let cli = Cli::parse();

    // Loading the model bundle is fatal; the service refuses to start
    // half-configured
    let detector = SpamDetector::from_config(&config)?;

    match &cli.command {
        Commands::Predict { message, no_store } => predict(&detector, message, !no_store)?,
        Commands::Batch { input, no_store } => batch(&detector, input, !no_store)?,
        Commands::History { limit } => history(&detector, *limit)?,
        Commands::Stats => stats(&detector)?,
        Commands::Daily { days } => daily(&detector, *days)?,
        Commands::Trend { days } => {
            trend(&detector, days.unwrap_or(config.trend.default_window_days))?;
        }
        Commands::Export {
            what,
            format,
            output,
            limit,
            days,
        } => run_export(&detector, &config, what, format.as_deref(), output, *limit, *days)?,
        Commands::Cleanup { days } => cleanup(&detector, *days)?,
        Commands::Rebuild => rebuild(&detector)?,
        Commands::ModelInfo => model_info(&detector),
    }

    Ok(())
}

/// Classify one message and print the verdict
fn predict(detector: &SpamDetector, message: &str, persist: bool) -> Result<()> {
    let result = detector.predict(message, persist)?;
    println!(
        "{} (confidence {:.1}%, spam {:.1}%, ham {:.1}%)",
        result.label,
        result.confidence * 100.0,
        result.spam_probability * 100.0,
        result.ham_probability * 100.0
    );
    Ok(())
}

/// Classify every non-empty line of the input file
fn batch(detector: &SpamDetector, input: &PathBuf, persist: bool) -> Result<()> {
    let content = std::fs::read_to_string(input)
        .with_context(|| format!("Failed to read {}", input.display()))?;
    let messages: Vec<String> = content
        .lines()
        .filter(|line| !line.trim().is_empty())
        .map(std::string::ToString::to_string)
        .collect();

    if messages.is_empty() {
        warn!("No messages found in input file");
        return Ok(());
    }

    let timer = OperationTimer::new("batch_predict");
    let results = detector.predict_batch(&messages, persist);
    for result in &results {
        println!("{}\t{:.3}\t{}", result.label, result.confidence, result.raw_message);
    }
    timer.finish();
    info!(
        classified = results.len(),
        submitted = messages.len(),
        "Batch finished"
    );
    Ok(())
}

/// Print the most recent predictions, newest first
fn history(detector: &SpamDetector, limit: usize) -> Result<()> {
    let predictions = detector.recent(limit)?;
    if predictions.is_empty() {
        println!("No predictions recorded yet");
        return Ok(());
    }
    for prediction in &predictions {
        println!(
            "#{} {} {} {:.3} {}",
            prediction.id,
            prediction.result.created_at.format("%Y-%m-%d %H:%M:%S"),
            prediction.result.label,
            prediction.result.confidence,
            prediction.result.raw_message
        );
    }
    Ok(())
}

/// Print whole-history statistics
fn stats(detector: &SpamDetector) -> Result<()> {
    let summary = detector.global_stats()?;
    println!("Total predictions: {}", summary.total);
    println!(
        "Spam: {} ({:.1}%)  Ham: {} ({:.1}%)",
        summary.spam_count, summary.spam_percentage, summary.ham_count, summary.ham_percentage
    );
    println!(
        "Avg confidence: {:.3} (spam {:.3}, ham {:.3})",
        summary.avg_confidence, summary.avg_spam_confidence, summary.avg_ham_confidence
    );
    Ok(())
}

/// Print per-day rollups, newest first
fn daily(detector: &SpamDetector, days: u32) -> Result<()> {
    let aggregates = detector.daily_stats(days)?;
    if aggregates.is_empty() {
        println!("No activity in the last {days} days");
        return Ok(());
    }
    println!("date\ttotal\tspam\tham\tavg_confidence");
    for aggregate in &aggregates {
        println!(
            "{}\t{}\t{}\t{}\t{:.3}",
            aggregate.date, aggregate.total, aggregate.spam_count, aggregate.ham_count, aggregate.avg_confidence
        );
    }
    Ok(())
}

/// Print the spam-volume trend over the given window
fn trend(detector: &SpamDetector, days: u32) -> Result<()> {
    let signal = detector.trend(days)?;
    println!(
        "Spam volume is {} ({:+.2}% over the last {} days; recent avg {:.2}/day, older avg {:.2}/day)",
        signal.direction, signal.change_percent, days, signal.recent_avg, signal.older_avg
    );
    Ok(())
}

/// Export predictions or daily statistics to a file
fn run_export(
    detector: &SpamDetector,
    config: &AppConfig,
    what: &str,
    format: Option<&str>,
    output: &PathBuf,
    limit: usize,
    days: u32,
) -> Result<()> {
    let format: OutputFormat = format
        .unwrap_or(&config.export.default_format)
        .parse()?;

    let timer = OperationTimer::new("export");
    let written = match what {
        "predictions" => {
            let predictions = detector.history(limit, 0)?;
            export::export_predictions(&predictions, format, output)?
        }
        "daily" => {
            let aggregates = detector.daily_stats(days)?;
            export::export_daily_stats(&aggregates, format, output)?
        }
        other => {
            return Err(anyhow::anyhow!(
                "Unknown export target: {other}. Use \"predictions\" or \"daily\""
            ));
        }
    };
    timer.finish();

    println!("Exported {} rows to {}", written, output.display());
    Ok(())
}

/// Remove predictions older than the retention window
fn cleanup(detector: &SpamDetector, days: Option<u32>) -> Result<()> {
    let (removed, days) = match days {
        Some(days) => (detector.delete_older_than(days)?, days),
        None => (detector.cleanup()?, detector.retention_days()),
    };
    println!("Removed {removed} predictions older than {days} days");
    Ok(())
}

/// Recompute every daily rollup from the prediction history
fn rebuild(detector: &SpamDetector) -> Result<()> {
    let rebuilt = detector.store().rebuild_daily_stats()?;
    println!("Rebuilt daily statistics for {rebuilt} days");
    Ok(())
}

/// Print the loaded classifier bundle summary
fn model_info(detector: &SpamDetector) {
    let info = detector.model_info();
    println!("Model version: {}", info.version);
    println!("Algorithm: {}", info.algorithm);
    println!("Feature count: {}", info.feature_count);
    if let Some(metrics) = &info.metrics {
        println!(
            "Offline metrics: accuracy {:.3}, precision {:.3}, recall {:.3}, f1 {:.3}",
            metrics.accuracy, metrics.precision, metrics.recall, metrics.f1
        );
    }
}
