//! Database operations and connection pooling
//!
//! The prediction store owns every persisted `PredictionResult` and the
//! daily rollups derived from them. Writes (append, retention delete,
//! rollup refresh) run in transactions on pooled connections; SQLite's
//! locking plus a busy timeout serializes them against each other while
//! reads observe consistent snapshots.

use std::fs;
use std::path::Path;
use std::time::Duration;

use anyhow::Context;
use chrono::{NaiveDate, NaiveDateTime, Utc};
use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::{params, Connection, OptionalExtension, Row};
use tracing::{debug, info};

use crate::error::{Result, SpamError};
use crate::models::{
    DailyAggregate, EvaluationMetrics, FeatureSet, ModelInfo, PredictionResult, StatsSummary,
    StoredPrediction,
};
use crate::schema::{daily_stats, models, predictions};

/// Type alias for the database connection pool
pub type DbPool = Pool<SqliteConnectionManager>;
/// Type alias for one pooled connection
pub type DbConnection = r2d2::PooledConnection<SqliteConnectionManager>;

/// Database manager for the prediction history and derived statistics
pub struct Database {
    pool: DbPool,
}

impl Database {
    /// Create a new database connection pool and run migrations.
    ///
    /// Accepts either a bare file path or a `sqlite:`-prefixed URL.
    pub fn new(database_url: &str) -> Result<Self> {
        let path = database_url
            .strip_prefix("sqlite:")
            .unwrap_or(database_url);

        // Create parent directory if it doesn't exist
        if let Some(parent) = Path::new(path).parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let manager = SqliteConnectionManager::file(path).with_init(|conn| {
            conn.pragma_update(None, "journal_mode", "WAL")?;
            conn.pragma_update(None, "foreign_keys", "ON")?;
            conn.busy_timeout(Duration::from_secs(5))
        });
        let pool = Pool::builder()
            .build(manager)
            .context("Failed to create database connection pool")?;

        let conn = pool.get().map_err(SpamError::from)?;
        Self::run_migrations(&conn)?;

        info!(path, "Prediction store ready");
        Ok(Self { pool })
    }

    /// Run database migrations
    fn run_migrations(conn: &Connection) -> Result<()> {
        conn.execute_batch(include_str!(
            "../migrations/2025-06-10-000000_create_predictions/up.sql"
        ))
        .context("Failed to run predictions migration")?;

        conn.execute_batch(include_str!(
            "../migrations/2025-06-10-000001_create_daily_stats/up.sql"
        ))
        .context("Failed to run daily_stats migration")?;

        conn.execute_batch(include_str!(
            "../migrations/2025-06-10-000002_create_models/up.sql"
        ))
        .context("Failed to run models migration")?;

        Ok(())
    }

    /// Get a connection from the pool
    pub fn get_connection(&self) -> Result<DbConnection> {
        self.pool.get().map_err(SpamError::from)
    }

    /// Append a prediction to the history and refresh that day's rollup in
    /// the same transaction. Returns the assigned row id.
    pub fn add_prediction(&self, result: &PredictionResult) -> Result<i64> {
        let mut conn = self.get_connection()?;
        let tx = conn.transaction()?;

        let features_json = serde_json::to_string(&result.features)?;
        tx.execute(
            &format!(
                "INSERT INTO {} ({}, {}, {}, {}, {}, {}, {}, {}, {}) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
                predictions::TABLE,
                predictions::RAW_MESSAGE,
                predictions::NORMALIZED_MESSAGE,
                predictions::LABEL,
                predictions::CONFIDENCE,
                predictions::HAM_PROBABILITY,
                predictions::SPAM_PROBABILITY,
                predictions::FEATURES,
                predictions::MODEL_VERSION,
                predictions::CREATED_AT
            ),
            params![
                result.raw_message,
                result.normalized_message,
                result.label.as_i64(),
                result.confidence,
                result.ham_probability,
                result.spam_probability,
                features_json,
                result.model_version,
                result.created_at
            ],
        )?;
        let id = tx.last_insert_rowid();

        Self::refresh_day_in(&tx, result.created_at.date())?;

        tx.commit()?;
        debug!(id, label = %result.label, "Prediction recorded");
        Ok(id)
    }

    /// Retrieve a page of the prediction history, most-recent-first
    pub fn get_predictions(&self, limit: usize, offset: usize) -> Result<Vec<StoredPrediction>> {
        let conn = self.get_connection()?;

        let mut stmt = conn.prepare(&format!(
            "SELECT * FROM {} ORDER BY {} DESC LIMIT ? OFFSET ?",
            predictions::TABLE,
            predictions::ID
        ))?;

        let rows = stmt.query_map(params![limit as i64, offset as i64], map_stored_prediction)?;

        let mut results = Vec::new();
        for row in rows {
            results.push(row?);
        }
        Ok(results)
    }

    /// Look up a single prediction by id
    pub fn get_prediction_by_id(&self, id: i64) -> Result<Option<StoredPrediction>> {
        let conn = self.get_connection()?;

        let prediction = conn
            .query_row(
                &format!(
                    "SELECT * FROM {} WHERE {} = ?",
                    predictions::TABLE,
                    predictions::ID
                ),
                params![id],
                map_stored_prediction,
            )
            .optional()?;

        Ok(prediction)
    }

    /// Delete predictions older than the given number of days, along with
    /// the daily rollups that can no longer be reproduced from the history.
    /// `days = 0` deletes everything. Returns the number of predictions
    /// removed; irreversible.
    pub fn delete_older_than(&self, days: u32) -> Result<usize> {
        let mut conn = self.get_connection()?;
        let tx = conn.transaction()?;

        // datetime() normalizes the stored ISO-8601 form so the string
        // comparison against the cutoff is well defined
        let deleted = tx.execute(
            &format!(
                "DELETE FROM {} WHERE datetime({}) < datetime('now', '-' || ? || ' days')",
                predictions::TABLE,
                predictions::CREATED_AT
            ),
            params![days],
        )?;
        // The boundary day may have lost only part of its predictions, so
        // its rollup is recomputed rather than deleted. An empty recompute
        // leaves a zero-total row, removed so replaying the history still
        // reproduces the rollup table exactly.
        let boundary: NaiveDate = tx.query_row(
            "SELECT date('now', '-' || ? || ' days')",
            params![days],
            |row| row.get(0),
        )?;
        tx.execute(
            &format!(
                "DELETE FROM {} WHERE {} < ?",
                daily_stats::TABLE,
                daily_stats::DATE
            ),
            params![boundary],
        )?;
        Self::refresh_day_in(&tx, boundary)?;
        tx.execute(
            &format!(
                "DELETE FROM {} WHERE {} = ? AND {} = 0",
                daily_stats::TABLE,
                daily_stats::DATE,
                daily_stats::TOTAL
            ),
            params![boundary],
        )?;

        tx.commit()?;
        info!(deleted, days, "Old predictions removed");
        Ok(deleted)
    }

    /// Whole-history statistics computed server-side in a single pass, so
    /// counts and averages are mutually consistent even under concurrent
    /// appends
    pub fn global_stats(&self) -> Result<StatsSummary> {
        let conn = self.get_connection()?;

        let (total, spam_count, ham_count, avg_all, avg_spam, avg_ham) = conn.query_row(
            &format!(
                "SELECT COUNT(*), \
                 COALESCE(SUM(CASE WHEN {label} = 1 THEN 1 ELSE 0 END), 0), \
                 COALESCE(SUM(CASE WHEN {label} = 0 THEN 1 ELSE 0 END), 0), \
                 AVG({conf}), \
                 AVG(CASE WHEN {label} = 1 THEN {conf} END), \
                 AVG(CASE WHEN {label} = 0 THEN {conf} END) \
                 FROM {table}",
                label = predictions::LABEL,
                conf = predictions::CONFIDENCE,
                table = predictions::TABLE
            ),
            [],
            |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    row.get::<_, i64>(1)?,
                    row.get::<_, i64>(2)?,
                    row.get::<_, Option<f64>>(3)?,
                    row.get::<_, Option<f64>>(4)?,
                    row.get::<_, Option<f64>>(5)?,
                ))
            },
        )?;

        let (spam_percentage, ham_percentage) = if total > 0 {
            (
                spam_count as f64 / total as f64 * 100.0,
                ham_count as f64 / total as f64 * 100.0,
            )
        } else {
            (0.0, 0.0)
        };

        Ok(StatsSummary {
            total,
            spam_count,
            ham_count,
            avg_confidence: avg_all.unwrap_or(0.0),
            avg_spam_confidence: avg_spam.unwrap_or(0.0),
            avg_ham_confidence: avg_ham.unwrap_or(0.0),
            spam_percentage,
            ham_percentage,
        })
    }

    /// Recompute and fully replace today's daily rollup from the
    /// predictions table. Idempotent; safe to call after every append.
    pub fn refresh_today(&self) -> Result<()> {
        self.refresh_day(Utc::now().date_naive())
    }

    /// Recompute and fully replace the rollup for one calendar date
    pub fn refresh_day(&self, date: NaiveDate) -> Result<()> {
        let conn = self.get_connection()?;
        Self::refresh_day_in(&conn, date)
    }

    fn refresh_day_in(conn: &Connection, date: NaiveDate) -> Result<()> {
        conn.execute(
            &format!(
                "INSERT OR REPLACE INTO {table} ({date}, {total}, {spam}, {ham}, {avg}) \
                 SELECT ?1, COUNT(*), \
                 COALESCE(SUM(CASE WHEN {label} = 1 THEN 1 ELSE 0 END), 0), \
                 COALESCE(SUM(CASE WHEN {label} = 0 THEN 1 ELSE 0 END), 0), \
                 COALESCE(AVG({conf}), 0) \
                 FROM {preds} WHERE date({created}) = ?1",
                table = daily_stats::TABLE,
                date = daily_stats::DATE,
                total = daily_stats::TOTAL,
                spam = daily_stats::SPAM_COUNT,
                ham = daily_stats::HAM_COUNT,
                avg = daily_stats::AVG_CONFIDENCE,
                label = predictions::LABEL,
                conf = predictions::CONFIDENCE,
                preds = predictions::TABLE,
                created = predictions::CREATED_AT
            ),
            params![date],
        )?;
        Ok(())
    }

    /// Daily rollups for the last N calendar days, most-recent-first.
    /// Days with no recorded activity simply do not appear.
    pub fn get_daily_stats(&self, days: u32) -> Result<Vec<DailyAggregate>> {
        let conn = self.get_connection()?;

        let mut stmt = conn.prepare(&format!(
            "SELECT {date}, {total}, {spam}, {ham}, {avg} FROM {table} \
             WHERE {date} >= date('now', '-' || ? || ' days') \
             ORDER BY {date} DESC",
            date = daily_stats::DATE,
            total = daily_stats::TOTAL,
            spam = daily_stats::SPAM_COUNT,
            ham = daily_stats::HAM_COUNT,
            avg = daily_stats::AVG_CONFIDENCE,
            table = daily_stats::TABLE
        ))?;

        let rows = stmt.query_map(params![days], map_daily_aggregate)?;

        let mut results = Vec::new();
        for row in rows {
            results.push(row?);
        }
        Ok(results)
    }

    /// Look up the rollup for one calendar date
    pub fn get_daily_stat(&self, date: NaiveDate) -> Result<Option<DailyAggregate>> {
        let conn = self.get_connection()?;

        let aggregate = conn
            .query_row(
                &format!(
                    "SELECT {date}, {total}, {spam}, {ham}, {avg} FROM {table} WHERE {date} = ?",
                    date = daily_stats::DATE,
                    total = daily_stats::TOTAL,
                    spam = daily_stats::SPAM_COUNT,
                    ham = daily_stats::HAM_COUNT,
                    avg = daily_stats::AVG_CONFIDENCE,
                    table = daily_stats::TABLE
                ),
                params![date],
                map_daily_aggregate,
            )
            .optional()?;

        Ok(aggregate)
    }

    /// Rebuild every daily rollup by replaying the full prediction
    /// history. Returns the number of day rows produced.
    pub fn rebuild_daily_stats(&self) -> Result<usize> {
        let mut conn = self.get_connection()?;
        let tx = conn.transaction()?;

        tx.execute(&format!("DELETE FROM {}", daily_stats::TABLE), [])?;
        let inserted = tx.execute(
            &format!(
                "INSERT INTO {table} ({date}, {total}, {spam}, {ham}, {avg}) \
                 SELECT date({created}), COUNT(*), \
                 COALESCE(SUM(CASE WHEN {label} = 1 THEN 1 ELSE 0 END), 0), \
                 COALESCE(SUM(CASE WHEN {label} = 0 THEN 1 ELSE 0 END), 0), \
                 COALESCE(AVG({conf}), 0) \
                 FROM {preds} GROUP BY date({created})",
                table = daily_stats::TABLE,
                date = daily_stats::DATE,
                total = daily_stats::TOTAL,
                spam = daily_stats::SPAM_COUNT,
                ham = daily_stats::HAM_COUNT,
                avg = daily_stats::AVG_CONFIDENCE,
                label = predictions::LABEL,
                conf = predictions::CONFIDENCE,
                preds = predictions::TABLE,
                created = predictions::CREATED_AT
            ),
            [],
        )?;

        tx.commit()?;
        info!(days = inserted, "Daily rollups rebuilt from history");
        Ok(inserted)
    }

    /// Record the loaded classifier bundle in the model registry
    pub fn record_model(&self, info: &ModelInfo) -> Result<()> {
        let conn = self.get_connection()?;

        let (accuracy, precision, recall, f1) = match &info.metrics {
            Some(m) => (Some(m.accuracy), Some(m.precision), Some(m.recall), Some(m.f1)),
            None => (None, None, None, None),
        };

        conn.execute(
            &format!(
                "INSERT INTO {table} ({version}, {algorithm}, {accuracy}, {precision}, {recall}, {f1}, {features}, {loaded}) \
                 VALUES (?, ?, ?, ?, ?, ?, ?, ?) \
                 ON CONFLICT({version}) DO UPDATE SET {loaded} = excluded.{loaded}",
                table = models::TABLE,
                version = models::VERSION,
                algorithm = models::ALGORITHM,
                accuracy = models::ACCURACY,
                precision = models::PRECISION_SCORE,
                recall = models::RECALL_SCORE,
                f1 = models::F1_SCORE,
                features = models::FEATURE_COUNT,
                loaded = models::LOADED_AT
            ),
            params![
                info.version,
                info.algorithm,
                accuracy,
                precision,
                recall,
                f1,
                info.feature_count as i64,
                Utc::now().naive_utc()
            ],
        )?;

        Ok(())
    }

    /// List every classifier bundle that has served predictions
    pub fn get_registered_models(&self) -> Result<Vec<RegisteredModel>> {
        let conn = self.get_connection()?;

        let mut stmt = conn.prepare(&format!(
            "SELECT {version}, {algorithm}, {accuracy}, {precision}, {recall}, {f1}, {features}, {loaded} \
             FROM {table} ORDER BY {loaded} DESC",
            version = models::VERSION,
            algorithm = models::ALGORITHM,
            accuracy = models::ACCURACY,
            precision = models::PRECISION_SCORE,
            recall = models::RECALL_SCORE,
            f1 = models::F1_SCORE,
            features = models::FEATURE_COUNT,
            loaded = models::LOADED_AT,
            table = models::TABLE
        ))?;

        let rows = stmt.query_map([], |row| {
            let metrics = match (
                row.get::<_, Option<f64>>(2)?,
                row.get::<_, Option<f64>>(3)?,
                row.get::<_, Option<f64>>(4)?,
                row.get::<_, Option<f64>>(5)?,
            ) {
                (Some(accuracy), Some(precision), Some(recall), Some(f1)) => {
                    Some(EvaluationMetrics {
                        accuracy,
                        precision,
                        recall,
                        f1,
                    })
                }
                _ => None,
            };
            Ok(RegisteredModel {
                version: row.get(0)?,
                algorithm: row.get(1)?,
                feature_count: row.get(6)?,
                loaded_at: row.get(7)?,
                metrics,
            })
        })?;

        let mut results = Vec::new();
        for row in rows {
            results.push(row?);
        }
        Ok(results)
    }
}

/// A classifier bundle recorded in the model registry
#[derive(Debug, Clone)]
pub struct RegisteredModel {
    /// Bundle version tag
    pub version: String,
    /// Training algorithm name
    pub algorithm: String,
    /// Feature space size
    pub feature_count: i64,
    /// When the serving core last loaded this bundle
    pub loaded_at: NaiveDateTime,
    /// Offline evaluation metrics, if recorded
    pub metrics: Option<EvaluationMetrics>,
}

/// Map a database row to a StoredPrediction
fn map_stored_prediction(row: &Row) -> rusqlite::Result<StoredPrediction> {
    let features: FeatureSet = match row.get::<_, Option<String>>(predictions::FEATURES)? {
        Some(json) => serde_json::from_str(&json).map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(7, rusqlite::types::Type::Text, Box::new(e))
        })?,
        None => FeatureSet::default(),
    };

    Ok(StoredPrediction {
        id: row.get(predictions::ID)?,
        result: PredictionResult {
            raw_message: row.get(predictions::RAW_MESSAGE)?,
            normalized_message: row.get(predictions::NORMALIZED_MESSAGE)?,
            label: crate::models::Label::from_i64(row.get(predictions::LABEL)?),
            confidence: row.get(predictions::CONFIDENCE)?,
            ham_probability: row.get(predictions::HAM_PROBABILITY)?,
            spam_probability: row.get(predictions::SPAM_PROBABILITY)?,
            features,
            model_version: row.get(predictions::MODEL_VERSION)?,
            created_at: row.get(predictions::CREATED_AT)?,
        },
    })
}

/// Map a database row to a DailyAggregate
fn map_daily_aggregate(row: &Row) -> rusqlite::Result<DailyAggregate> {
    Ok(DailyAggregate {
        date: row.get(0)?,
        total: row.get(1)?,
        spam_count: row.get(2)?,
        ham_count: row.get(3)?,
        avg_confidence: row.get(4)?,
    })
}

/// Initialize the database from the environment or the default location
pub fn establish_connection() -> Result<Database> {
    let database_url = std::env::var("DATABASE_URL")
        .unwrap_or_else(|_| "sqlite:data/spam_detector.db".to_string());
    Database::new(&database_url)
}
