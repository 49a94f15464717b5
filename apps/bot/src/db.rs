use std::str::FromStr;
use std::time::Duration;

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::SqlitePool;
use tracing::info;

const SCHEMA: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS applications (
        id           INTEGER PRIMARY KEY AUTOINCREMENT,
        platform     TEXT NOT NULL,
        job_title    TEXT NOT NULL,
        company      TEXT NOT NULL,
        date_applied TEXT NOT NULL,
        status       TEXT NOT NULL CHECK (status IN ('applied', 'failed', 'skipped')),
        job_url      TEXT NOT NULL,
        notes        TEXT
    )
    "#,
    // At most one successful application per job on a platform.
    r#"
    CREATE UNIQUE INDEX IF NOT EXISTS applications_applied_once
        ON applications (platform, job_url) WHERE status = 'applied'
    "#,
    r#"
    CREATE INDEX IF NOT EXISTS applications_platform_date
        ON applications (platform, date_applied)
    "#,
];

/// Creates a SQLite connection pool and makes sure the ledger schema exists.
///
/// File databases get their parent directory created. In-memory databases are
/// pinned to a single connection that is never recycled, since every new
/// connection would see an empty database.
pub async fn create_pool(database_url: &str) -> Result<SqlitePool, sqlx::Error> {
    info!("Opening SQLite database {database_url}");

    let options = SqliteConnectOptions::from_str(database_url)?
        .create_if_missing(true)
        .busy_timeout(Duration::from_secs(5));

    let in_memory = database_url.contains(":memory:");
    let pool = if in_memory {
        SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await?
    } else {
        let filename = options.clone().get_filename();
        if let Some(parent) = filename.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        SqlitePoolOptions::new()
            .max_connections(4)
            .connect_with(options.journal_mode(SqliteJournalMode::Wal))
            .await?
    };

    for statement in SCHEMA {
        sqlx::query(statement).execute(&pool).await?;
    }

    info!("SQLite ledger ready");
    Ok(pool)
}
