use analysis_exchange::{AnalysisError, ReportStore, Result, StoredReportRecord};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::Row;
use tracing::info;

/// Postgres-backed implementation of [`ReportStore`].
pub struct PostgresReportStore {
    pool: PgPool,
}

impl PostgresReportStore {
    pub async fn connect(database_url: &str) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(5)
            .connect(database_url)
            .await
            .map_err(|e| AnalysisError::Storage(format!("failed to connect: {e}")))?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS reports (
                id BIGSERIAL PRIMARY KEY,
                owner_id TEXT NOT NULL,
                created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
                symptoms_text TEXT NOT NULL,
                seen_doctor BOOLEAN NOT NULL,
                report JSONB NOT NULL
            )
            "#,
        )
        .execute(&pool)
        .await
        .map_err(|e| AnalysisError::Storage(format!("failed to migrate reports table: {e}")))?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS reports_owner_created
                 ON reports (owner_id, created_at DESC)",
        )
        .execute(&pool)
        .await
        .map_err(|e| AnalysisError::Storage(format!("failed to create reports index: {e}")))?;

        info!("connected to Postgres report store");
        Ok(Self { pool })
    }
}

#[async_trait]
impl ReportStore for PostgresReportStore {
    async fn create(&self, record: StoredReportRecord) -> Result<()> {
        let report = serde_json::to_value(&record.report)
            .map_err(|e| AnalysisError::Storage(e.to_string()))?;

        sqlx::query(
            "INSERT INTO reports (owner_id, created_at, symptoms_text, seen_doctor, report)
             VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(&record.owner_id)
        .bind(record.created_at)
        .bind(&record.symptoms_text)
        .bind(record.seen_doctor)
        .bind(report)
        .execute(&self.pool)
        .await
        .map_err(|e| AnalysisError::Storage(e.to_string()))?;

        Ok(())
    }

    async fn recent_for_owner(
        &self,
        owner_id: &str,
        limit: usize,
    ) -> Result<Vec<StoredReportRecord>> {
        let rows = sqlx::query(
            "SELECT owner_id, created_at, symptoms_text, seen_doctor, report
             FROM reports WHERE owner_id = $1
             ORDER BY created_at DESC LIMIT $2",
        )
        .bind(owner_id)
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AnalysisError::Storage(e.to_string()))?;

        rows.into_iter()
            .map(|row| {
                let report: serde_json::Value = row
                    .try_get("report")
                    .map_err(|e| AnalysisError::Storage(e.to_string()))?;
                Ok(StoredReportRecord {
                    owner_id: row
                        .try_get("owner_id")
                        .map_err(|e| AnalysisError::Storage(e.to_string()))?,
                    created_at: row
                        .try_get::<DateTime<Utc>, _>("created_at")
                        .map_err(|e| AnalysisError::Storage(e.to_string()))?,
                    symptoms_text: row
                        .try_get("symptoms_text")
                        .map_err(|e| AnalysisError::Storage(e.to_string()))?,
                    seen_doctor: row
                        .try_get("seen_doctor")
                        .map_err(|e| AnalysisError::Storage(e.to_string()))?,
                    report: serde_json::from_value(report)
                        .map_err(|e| AnalysisError::Storage(e.to_string()))?,
                })
            })
            .collect()
    }
}
