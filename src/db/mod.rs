use std::{path::Path, str::FromStr, time::Duration};

use anyhow::Result;
use sqlx::{
    query,
    sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions},
};

pub mod analysis;

pub async fn init_pool(db_path: &Path) -> Result<SqlitePool> {
    let options = SqliteConnectOptions::from_str(&format!("sqlite://{}", db_path.display()))?
        .create_if_missing(true)
        .busy_timeout(Duration::from_secs(5))
        .journal_mode(SqliteJournalMode::Wal);

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(options)
        .await?;

    migrate(&pool).await?;
    tracing::info!(target: "db", path = %db_path.display(), "database ready");
    Ok(pool)
}

/// Single-connection in-memory database; the connection is never recycled
/// so the data lives as long as the pool.
#[cfg(test)]
pub(crate) async fn init_memory_pool() -> Result<SqlitePool> {
    let options = SqliteConnectOptions::from_str("sqlite::memory:")?;
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .min_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect_with(options)
        .await?;
    migrate(&pool).await?;
    Ok(pool)
}

async fn migrate(pool: &SqlitePool) -> Result<()> {
    query(
        r#"
        CREATE TABLE IF NOT EXISTS email_analysis (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            email_content TEXT NOT NULL,
            prediction TEXT NOT NULL CHECK (prediction IN ('spam', 'ham')),
            confidence REAL NOT NULL,
            latency_ms REAL NOT NULL,
            created_at TEXT NOT NULL,
            ip_address TEXT,
            user_agent TEXT NOT NULL DEFAULT ''
        )
        "#,
    )
    .execute(pool)
    .await?;

    query(
        r#"CREATE INDEX IF NOT EXISTS idx_email_analysis_created_at
            ON email_analysis (created_at DESC)"#,
    )
    .execute(pool)
    .await?;

    query(
        r#"CREATE INDEX IF NOT EXISTS idx_email_analysis_prediction
            ON email_analysis (prediction)"#,
    )
    .execute(pool)
    .await?;

    Ok(())
}
