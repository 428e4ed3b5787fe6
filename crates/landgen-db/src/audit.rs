//! Append-only attempt log.

use async_trait::async_trait;
use sqlx::{postgres::PgRow, Pool, Postgres, Row};
use uuid::Uuid;

use landgen_core::{AttemptRecord, AuditRepository, Error, Result};

/// PostgreSQL implementation of AuditRepository.
#[derive(Clone)]
pub struct PgAuditRepository {
    pool: Pool<Postgres>,
}

impl PgAuditRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    fn parse_attempt_row(row: &PgRow) -> Result<AttemptRecord> {
        let kind: String = row.try_get("kind")?;
        Ok(AttemptRecord {
            id: row.try_get("id")?,
            job_id: row.try_get("job_id")?,
            kind: kind.parse()?,
            subject_id: row.try_get("subject_id")?,
            attempt: row.try_get("attempt")?,
            success: row.try_get("success")?,
            error_message: row.try_get("error_message")?,
            duration_ms: row.try_get("duration_ms")?,
            created_at: row.try_get("created_at")?,
        })
    }
}

#[async_trait]
impl AuditRepository for PgAuditRepository {
    async fn record(&self, record: &AttemptRecord) -> Result<()> {
        sqlx::query(
            "INSERT INTO job_attempts (id, job_id, kind, subject_id, attempt, success,
                                       error_message, duration_ms, created_at)
             VALUES ($1, $2, $3::job_kind, $4, $5, $6, $7, $8, $9)",
        )
        .bind(record.id)
        .bind(record.job_id)
        .bind(record.kind.as_str())
        .bind(record.subject_id)
        .bind(record.attempt)
        .bind(record.success)
        .bind(&record.error_message)
        .bind(record.duration_ms)
        .bind(record.created_at)
        .execute(&self.pool)
        .await
        .map_err(Error::Database)?;
        Ok(())
    }

    async fn list_for_job(&self, job_id: Uuid) -> Result<Vec<AttemptRecord>> {
        let rows = sqlx::query(
            "SELECT id, job_id, kind::text AS kind, subject_id, attempt, success,
                    error_message, duration_ms, created_at
             FROM job_attempts
             WHERE job_id = $1
             ORDER BY created_at ASC, attempt ASC",
        )
        .bind(job_id)
        .fetch_all(&self.pool)
        .await
        .map_err(Error::Database)?;

        rows.iter().map(Self::parse_attempt_row).collect()
    }
}
