//! Application Ledger — the durable, append-only record of every application attempt.
//!
//! Rows are never updated or deleted. A posting may collect any number of
//! `failed`/`skipped` rows but at most one `applied` row per platform, which the
//! partial unique index in the schema enforces.

use std::sync::Arc;

use chrono::{DateTime, Duration, NaiveTime, SecondsFormat, TimeZone, Utc};
use sqlx::SqlitePool;
use thiserror::Error;
use tracing::{debug, info};

use crate::db::create_pool;
use crate::models::{ApplicationRow, ApplicationStatus, Posting};

#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("{job_url} is already recorded as applied on {platform}")]
    Duplicate { platform: String, job_url: String },
}

/// Source of "now" for timestamps and calendar-day queries.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Timestamps are stored as fixed-width RFC 3339 UTC text so that string order
/// equals time order.
fn format_timestamp(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

#[derive(Clone)]
pub struct Ledger {
    pool: SqlitePool,
    clock: Arc<dyn Clock>,
}

impl Ledger {
    /// Opens (and if needed creates) the ledger database.
    pub async fn open(database_url: &str) -> Result<Self, LedgerError> {
        let pool = create_pool(database_url).await?;
        Ok(Self::from_pool(pool))
    }

    pub fn from_pool(pool: SqlitePool) -> Self {
        Self {
            pool,
            clock: Arc::new(SystemClock),
        }
    }

    #[cfg(test)]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// True if an `applied` record exists for this platform and job URL.
    pub async fn has_applied(&self, platform: &str, job_url: &str) -> Result<bool, LedgerError> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM applications WHERE platform = ? AND job_url = ? AND status = 'applied'",
        )
        .bind(platform)
        .bind(job_url)
        .fetch_one(&self.pool)
        .await?;
        Ok(count > 0)
    }

    /// Appends one record and returns its id.
    ///
    /// A second `applied` record for the same (platform, job_url) is rejected with
    /// `LedgerError::Duplicate`. `failed` and `skipped` records never conflict.
    pub async fn record(
        &self,
        platform: &str,
        posting: &Posting,
        status: ApplicationStatus,
        notes: Option<&str>,
    ) -> Result<i64, LedgerError> {
        let result = sqlx::query(
            r#"
            INSERT INTO applications
                (platform, job_title, company, date_applied, status, job_url, notes)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(platform)
        .bind(&posting.title)
        .bind(&posting.company)
        .bind(format_timestamp(self.clock.now()))
        .bind(status.as_str())
        .bind(&posting.url)
        .bind(notes)
        .execute(&self.pool)
        .await;

        match result {
            Ok(done) => {
                let id = done.last_insert_rowid();
                debug!(
                    "Ledger record {id}: {platform} {status} {} ({})",
                    posting.title, posting.url
                );
                Ok(id)
            }
            Err(sqlx::Error::Database(e)) if e.is_unique_violation() => {
                Err(LedgerError::Duplicate {
                    platform: platform.to_string(),
                    job_url: posting.url.clone(),
                })
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Number of `applied` records for `platform` dated within the current UTC day.
    pub async fn count_today(&self, platform: &str) -> Result<u32, LedgerError> {
        let now = self.clock.now();
        let day_start = Utc.from_utc_datetime(&now.date_naive().and_time(NaiveTime::MIN));
        let day_end = day_start + Duration::days(1);

        let count: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*) FROM applications
            WHERE platform = ? AND status = 'applied'
              AND date_applied >= ? AND date_applied < ?
            "#,
        )
        .bind(platform)
        .bind(format_timestamp(day_start))
        .bind(format_timestamp(day_end))
        .fetch_one(&self.pool)
        .await?;

        Ok(u32::try_from(count).unwrap_or(u32::MAX))
    }

    /// Most recent records first.
    pub async fn recent(&self, limit: u32) -> Result<Vec<ApplicationRow>, LedgerError> {
        Ok(sqlx::query_as::<_, ApplicationRow>(
            "SELECT * FROM applications ORDER BY id DESC LIMIT ?",
        )
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await?)
    }

    /// Closes every pooled connection. Further calls fail.
    pub async fn close(&self) {
        self.pool.close().await;
        info!("Ledger connection closed");
    }
}
