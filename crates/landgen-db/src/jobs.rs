//! Job repository implementation.

use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use sqlx::{postgres::PgRow, Pool, Postgres, Row};
use tracing::{debug, info};
use uuid::Uuid;

use landgen_core::{
    defaults, new_v7, EnqueueRequest, Error, Job, JobFilter, JobRepository, QueueStats, Result,
};

/// Columns selected for every job read, with enums cast to text.
const JOB_COLUMNS: &str = "id, kind::text AS kind, subject_id, owner_id, project_id, \
     status::text AS status, attempts, max_attempts, priority, created_at, started_at, \
     completed_at, updated_at, error_message";

/// PostgreSQL implementation of JobRepository.
#[derive(Clone)]
pub struct PgJobRepository {
    pool: Pool<Postgres>,
}

impl PgJobRepository {
    /// Create a new PgJobRepository with the given connection pool.
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Parse a job row into a Job struct.
    fn parse_job_row(row: &PgRow) -> Result<Job> {
        let kind: String = row.try_get("kind")?;
        let status: String = row.try_get("status")?;
        Ok(Job {
            id: row.try_get("id")?,
            kind: kind.parse()?,
            subject_id: row.try_get("subject_id")?,
            owner_id: row.try_get("owner_id")?,
            project_id: row.try_get("project_id")?,
            status: status.parse()?,
            attempts: row.try_get("attempts")?,
            max_attempts: row.try_get("max_attempts")?,
            priority: row.try_get("priority")?,
            created_at: row.try_get("created_at")?,
            started_at: row.try_get("started_at")?,
            completed_at: row.try_get("completed_at")?,
            updated_at: row.try_get("updated_at")?,
            error_message: row.try_get("error_message")?,
        })
    }

    fn parse_rows(rows: Vec<PgRow>) -> Result<Vec<Job>> {
        rows.iter().map(Self::parse_job_row).collect()
    }
}

#[async_trait]
impl JobRepository for PgJobRepository {
    async fn enqueue(&self, req: EnqueueRequest) -> Result<Vec<Uuid>> {
        req.validate()?;

        let mut tx = self.pool.begin().await.map_err(Error::Database)?;
        let mut ids = Vec::with_capacity(req.subject_ids.len());

        for subject_id in &req.subject_ids {
            let job_id = new_v7();
            let now = Utc::now();
            sqlx::query(
                "INSERT INTO job_queue (id, kind, subject_id, owner_id, project_id, status,
                                        attempts, max_attempts, priority, created_at, updated_at)
                 VALUES ($1, $2::job_kind, $3, $4, $5, 'queued'::job_status, 0, $6, $7, $8, $8)",
            )
            .bind(job_id)
            .bind(req.kind.as_str())
            .bind(subject_id)
            .bind(req.owner_id)
            .bind(req.project_id)
            .bind(req.max_attempts)
            .bind(req.priority)
            .bind(now)
            .execute(&mut *tx)
            .await
            .map_err(Error::Database)?;
            ids.push(job_id);
        }

        tx.commit().await.map_err(Error::Database)?;

        info!(
            subsystem = "db",
            component = "jobs",
            op = "enqueue",
            job_kind = %req.kind,
            project_id = %req.project_id,
            count = ids.len(),
            "Jobs enqueued"
        );
        Ok(ids)
    }

    async fn dequeue_batch(&self, limit: i64) -> Result<Vec<Job>> {
        let query = format!(
            "SELECT {JOB_COLUMNS} FROM job_queue
             WHERE status = 'queued'::job_status
             ORDER BY priority DESC, created_at ASC, id ASC
             LIMIT $1"
        );
        let rows = sqlx::query(&query)
            .bind(limit.max(0))
            .fetch_all(&self.pool)
            .await
            .map_err(Error::Database)?;

        Self::parse_rows(rows)
    }

    async fn claim(&self, job_id: Uuid) -> Result<Option<Job>> {
        let now = Utc::now();

        // Compare-and-swap on status: only one concurrent caller can match
        // the `status = 'queued'` predicate for a given row.
        let query = format!(
            "UPDATE job_queue
             SET status = 'processing'::job_status, attempts = attempts + 1,
                 started_at = $2, updated_at = $2
             WHERE id = $1
               AND status = 'queued'::job_status
               AND attempts < max_attempts
             RETURNING {JOB_COLUMNS}"
        );
        let row = sqlx::query(&query)
            .bind(job_id)
            .bind(now)
            .fetch_optional(&self.pool)
            .await
            .map_err(Error::Database)?;

        row.as_ref().map(Self::parse_job_row).transpose()
    }

    async fn complete(&self, job_id: Uuid) -> Result<bool> {
        let now = Utc::now();
        let result = sqlx::query(
            "UPDATE job_queue
             SET status = 'completed'::job_status, completed_at = $2, updated_at = $2,
                 error_message = NULL
             WHERE id = $1 AND status = 'processing'::job_status",
        )
        .bind(job_id)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(Error::Database)?;

        Ok(result.rows_affected() == 1)
    }

    async fn requeue(&self, job_id: Uuid, error: &str) -> Result<bool> {
        let now = Utc::now();
        let result = sqlx::query(
            "UPDATE job_queue
             SET status = 'queued'::job_status, started_at = NULL, updated_at = $2,
                 error_message = $3
             WHERE id = $1 AND status = 'processing'::job_status",
        )
        .bind(job_id)
        .bind(now)
        .bind(error)
        .execute(&self.pool)
        .await
        .map_err(Error::Database)?;

        Ok(result.rows_affected() == 1)
    }

    async fn fail(&self, job_id: Uuid, error: &str) -> Result<bool> {
        let now = Utc::now();
        let result = sqlx::query(
            "UPDATE job_queue
             SET status = 'failed'::job_status, completed_at = $2, updated_at = $2,
                 error_message = $3
             WHERE id = $1
               AND status IN ('queued'::job_status, 'processing'::job_status)",
        )
        .bind(job_id)
        .bind(now)
        .bind(error)
        .execute(&self.pool)
        .await
        .map_err(Error::Database)?;

        Ok(result.rows_affected() == 1)
    }

    async fn reclaim_stuck(&self, threshold: Duration) -> Result<u64> {
        let now = Utc::now();
        let threshold = chrono::Duration::from_std(threshold)
            .map_err(|e| Error::Config(format!("Invalid stuck threshold: {}", e)))?;
        let cutoff = now - threshold;

        let result = sqlx::query(
            "UPDATE job_queue
             SET status = 'queued'::job_status, started_at = NULL, updated_at = $2,
                 error_message = $3
             WHERE status = 'processing'::job_status AND started_at < $1",
        )
        .bind(cutoff)
        .bind(now)
        .bind(defaults::STUCK_JOB_MESSAGE)
        .execute(&self.pool)
        .await
        .map_err(Error::Database)?;

        let reclaimed = result.rows_affected();
        debug!(
            subsystem = "db",
            component = "jobs",
            op = "reclaim_stuck",
            reclaimed,
            %cutoff,
            "Stuck job sweep finished"
        );
        Ok(reclaimed)
    }

    async fn processing_count(&self) -> Result<i64> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM job_queue WHERE status = 'processing'::job_status",
        )
        .fetch_one(&self.pool)
        .await
        .map_err(Error::Database)?;
        Ok(count)
    }

    async fn get(&self, job_id: Uuid) -> Result<Option<Job>> {
        let query = format!("SELECT {JOB_COLUMNS} FROM job_queue WHERE id = $1");
        let row = sqlx::query(&query)
            .bind(job_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(Error::Database)?;

        row.as_ref().map(Self::parse_job_row).transpose()
    }

    async fn list(&self, filter: &JobFilter) -> Result<Vec<Job>> {
        let mut conditions = Vec::new();
        let mut param_idx = 1;

        if filter.status.is_some() {
            conditions.push(format!("status::text = ${}", param_idx));
            param_idx += 1;
        }
        if filter.kind.is_some() {
            conditions.push(format!("kind::text = ${}", param_idx));
            param_idx += 1;
        }
        if filter.subject_id.is_some() {
            conditions.push(format!("subject_id = ${}", param_idx));
            param_idx += 1;
        }

        let where_clause = if conditions.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", conditions.join(" AND "))
        };

        let query = format!(
            "SELECT {JOB_COLUMNS} FROM job_queue
             {}
             ORDER BY created_at DESC, id DESC
             LIMIT ${} OFFSET ${}",
            where_clause,
            param_idx,
            param_idx + 1
        );

        let mut q = sqlx::query(&query);
        if let Some(status) = filter.status {
            q = q.bind(status.as_str());
        }
        if let Some(kind) = filter.kind {
            q = q.bind(kind.as_str());
        }
        if let Some(subject_id) = filter.subject_id {
            q = q.bind(subject_id);
        }
        q = q.bind(filter.limit()).bind(filter.offset());

        let rows = q.fetch_all(&self.pool).await.map_err(Error::Database)?;
        Self::parse_rows(rows)
    }

    async fn list_for_subject(&self, subject_id: Uuid) -> Result<Vec<Job>> {
        let query = format!(
            "SELECT {JOB_COLUMNS} FROM job_queue
             WHERE subject_id = $1
             ORDER BY created_at DESC, id DESC"
        );
        let rows = sqlx::query(&query)
            .bind(subject_id)
            .fetch_all(&self.pool)
            .await
            .map_err(Error::Database)?;

        Self::parse_rows(rows)
    }

    async fn queue_stats(&self) -> Result<QueueStats> {
        let row = sqlx::query(
            "SELECT
                COUNT(*) FILTER (WHERE status = 'queued') AS queued,
                COUNT(*) FILTER (WHERE status = 'processing') AS processing,
                COUNT(*) FILTER (WHERE status = 'completed') AS completed,
                COUNT(*) FILTER (WHERE status = 'failed') AS failed,
                COUNT(*) AS total
             FROM job_queue",
        )
        .fetch_one(&self.pool)
        .await
        .map_err(Error::Database)?;

        Ok(QueueStats {
            queued: row.try_get("queued")?,
            processing: row.try_get("processing")?,
            completed: row.try_get("completed")?,
            failed: row.try_get("failed")?,
            total: row.try_get("total")?,
        })
    }
}
