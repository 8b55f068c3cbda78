//! Export utilities for prediction history and daily statistics.
//!
//! Writes stored predictions and daily rollups to CSV or JSON files so the
//! history can leave the database for spreadsheets or downstream analysis.

use crate::error::Result;
use crate::models::{DailyAggregate, OutputFormat, StoredPrediction};
use crate::validation::InputValidator;
use csv::Writer;
use std::fs::{create_dir_all, File};
use std::io::{BufWriter, Write};
use std::path::Path;
use tracing::info;

/// Write predictions to a file in the specified format.
///
/// Returns the number of rows written.
pub fn export_predictions(
    predictions: &[StoredPrediction],
    format: OutputFormat,
    file_path: &Path,
) -> Result<usize> {
    InputValidator::validate_output_path(file_path)?;
    if let Some(parent) = file_path.parent() {
        if !parent.as_os_str().is_empty() {
            create_dir_all(parent)?;
        }
    }

    match format {
        OutputFormat::Csv => write_predictions_csv(predictions, file_path)?,
        OutputFormat::Json => write_json_file(predictions, file_path)?,
    }

    info!(
        count = predictions.len(),
        path = %file_path.display(),
        "Predictions exported"
    );
    Ok(predictions.len())
}

/// Write daily aggregates to a file in the specified format.
///
/// Returns the number of rows written.
pub fn export_daily_stats(
    aggregates: &[DailyAggregate],
    format: OutputFormat,
    file_path: &Path,
) -> Result<usize> {
    InputValidator::validate_output_path(file_path)?;
    if let Some(parent) = file_path.parent() {
        if !parent.as_os_str().is_empty() {
            create_dir_all(parent)?;
        }
    }

    match format {
        OutputFormat::Csv => write_daily_stats_csv(aggregates, file_path)?,
        OutputFormat::Json => write_json_file(aggregates, file_path)?,
    }

    info!(
        count = aggregates.len(),
        path = %file_path.display(),
        "Daily statistics exported"
    );
    Ok(aggregates.len())
}

/// CSV with one prediction per row.
///
/// Header: `id, message, label, confidence, ham_probability,
/// spam_probability, model_version, created_at`
fn write_predictions_csv(predictions: &[StoredPrediction], file_path: &Path) -> Result<()> {
    let file = File::create(file_path)?;
    let mut writer = Writer::from_writer(file);

    writer.write_record([
        "id",
        "message",
        "label",
        "confidence",
        "ham_probability",
        "spam_probability",
        "model_version",
        "created_at",
    ])?;

    for prediction in predictions {
        let result = &prediction.result;
        writer.write_record([
            prediction.id.to_string(),
            result.raw_message.clone(),
            result.label.to_string(),
            format!("{:.6}", result.confidence),
            format!("{:.6}", result.ham_probability),
            format!("{:.6}", result.spam_probability),
            result.model_version.clone(),
            result.created_at.format("%Y-%m-%d %H:%M:%S").to_string(),
        ])?;
    }

    writer.flush()?;
    Ok(())
}

/// CSV with one calendar day per row
fn write_daily_stats_csv(aggregates: &[DailyAggregate], file_path: &Path) -> Result<()> {
    let file = File::create(file_path)?;
    let mut writer = Writer::from_writer(file);

    writer.write_record(["date", "total", "spam_count", "ham_count", "avg_confidence"])?;

    for aggregate in aggregates {
        writer.write_record([
            aggregate.date.format("%Y-%m-%d").to_string(),
            aggregate.total.to_string(),
            aggregate.spam_count.to_string(),
            aggregate.ham_count.to_string(),
            format!("{:.6}", aggregate.avg_confidence),
        ])?;
    }

    writer.flush()?;
    Ok(())
}

/// Pretty-printed JSON array of the serializable rows
fn write_json_file<T: serde::Serialize>(rows: &[T], file_path: &Path) -> Result<()> {
    let file = File::create(file_path)?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, rows)?;
    writer.flush()?;
    Ok(())
}
