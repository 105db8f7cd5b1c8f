use anyhow::Result;
use chrono::{DateTime, Duration, SecondsFormat, Utc};
use sqlx::{
    query, query_as,
    sqlite::{SqlitePool, SqliteRow},
    FromRow, Row,
};

use crate::domain::{AnalysisRecord, AnalysisStatistics, Label, NewAnalysis, WindowCounts};

#[derive(Clone)]
pub struct AnalysisRepository {
    pool: SqlitePool,
}

impl AnalysisRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }

    pub async fn insert(&self, entry: NewAnalysis) -> Result<i64> {
        let id = query(
            r#"INSERT INTO email_analysis
                (email_content, prediction, confidence, latency_ms, created_at, ip_address, user_agent)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)"#,
        )
        .bind(entry.email_content)
        .bind(entry.prediction.as_str())
        .bind(entry.confidence)
        .bind(entry.latency_ms)
        .bind(encode_timestamp(entry.created_at))
        .bind(entry.ip_address)
        .bind(entry.user_agent)
        .execute(&self.pool)
        .await?
        .last_insert_rowid();
        Ok(id)
    }

    /// Newest first.
    pub async fn recent(&self, limit: i64) -> Result<Vec<AnalysisRecord>> {
        let rows = query_as::<_, AnalysisRow>(
            r#"SELECT id, email_content, prediction, confidence, latency_ms, created_at, ip_address, user_agent
                FROM email_analysis
                ORDER BY created_at DESC, id DESC
                LIMIT ?1"#,
        )
        .bind(limit.max(0))
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(|row| row.0).collect())
    }

    pub async fn statistics(&self, now: DateTime<Utc>) -> Result<AnalysisStatistics> {
        let (total, spam, ham, avg_confidence, avg_latency_ms): (
            i64,
            Option<i64>,
            Option<i64>,
            Option<f64>,
            Option<f64>,
        ) = query_as(
            r#"SELECT COUNT(*),
                    SUM(CASE WHEN prediction = 'spam' THEN 1 ELSE 0 END),
                    SUM(CASE WHEN prediction = 'ham' THEN 1 ELSE 0 END),
                    AVG(confidence),
                    AVG(latency_ms)
                FROM email_analysis"#,
        )
        .fetch_one(&self.pool)
        .await?;

        let since = encode_timestamp(now - Duration::hours(24));
        let (recent_total, recent_spam, recent_ham): (i64, Option<i64>, Option<i64>) = query_as(
            r#"SELECT COUNT(*),
                    SUM(CASE WHEN prediction = 'spam' THEN 1 ELSE 0 END),
                    SUM(CASE WHEN prediction = 'ham' THEN 1 ELSE 0 END)
                FROM email_analysis
                WHERE created_at >= ?1"#,
        )
        .bind(since)
        .fetch_one(&self.pool)
        .await?;

        Ok(AnalysisStatistics {
            total,
            spam: spam.unwrap_or(0),
            ham: ham.unwrap_or(0),
            avg_confidence,
            avg_latency_ms,
            last_24h: WindowCounts {
                total: recent_total,
                spam: recent_spam.unwrap_or(0),
                ham: recent_ham.unwrap_or(0),
            },
        })
    }
}

/// Fixed-width UTC text so that string order matches time order.
fn encode_timestamp(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

struct AnalysisRow(AnalysisRecord);

impl<'r> FromRow<'r, SqliteRow> for AnalysisRow {
    fn from_row(row: &'r SqliteRow) -> std::result::Result<Self, sqlx::Error> {
        let prediction: String = row.try_get("prediction")?;
        let prediction = prediction
            .parse::<Label>()
            .map_err(|err| sqlx::Error::ColumnDecode {
                index: "prediction".to_string(),
                source: err.into(),
            })?;

        let created_at: String = row.try_get("created_at")?;
        let created_at = DateTime::parse_from_rfc3339(&created_at)
            .map_err(|err| sqlx::Error::ColumnDecode {
                index: "created_at".to_string(),
                source: Box::new(err),
            })?
            .with_timezone(&Utc);

        Ok(Self(AnalysisRecord {
            id: row.try_get("id")?,
            email_content: row.try_get("email_content")?,
            prediction,
            confidence: row.try_get("confidence")?,
            latency_ms: row.try_get("latency_ms")?,
            created_at,
            ip_address: row.try_get("ip_address")?,
            user_agent: row.try_get("user_agent")?,
        }))
    }
}
