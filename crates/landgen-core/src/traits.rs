//! Core traits for landgen abstractions.
//!
//! These traits define the interfaces that concrete implementations
//! must satisfy, enabling pluggable backends and testability.

use std::time::Duration;

use async_trait::async_trait;
use uuid::Uuid;

use crate::error::Result;
use crate::models::*;

// =============================================================================
// JOB STORE
// =============================================================================

/// Durable job table: the only shared mutable state of the dispatcher.
///
/// Every state transition is a conditional update, so two dispatcher cycles
/// racing on the same row can never both win.
#[async_trait]
pub trait JobRepository: Send + Sync {
    /// Insert one queued job per subject. Fails with `Error::Validation` on an
    /// empty subject list.
    async fn enqueue(&self, req: EnqueueRequest) -> Result<Vec<Uuid>>;

    /// Up to `limit` queued jobs, `priority DESC, created_at ASC`. Read only.
    async fn dequeue_batch(&self, limit: i64) -> Result<Vec<Job>>;

    /// Atomically move a queued job to `processing`, consuming one attempt.
    ///
    /// Returns `None` when the job is no longer queued (another cycle claimed
    /// it) or has no attempts left.
    async fn claim(&self, job_id: Uuid) -> Result<Option<Job>>;

    /// `processing -> completed`. Returns false if the job was not processing.
    async fn complete(&self, job_id: Uuid) -> Result<bool>;

    /// `processing -> queued`, keeping the error for diagnostics.
    async fn requeue(&self, job_id: Uuid, error: &str) -> Result<bool>;

    /// Any non-terminal state -> `failed`.
    async fn fail(&self, job_id: Uuid, error: &str) -> Result<bool>;

    /// Reset `processing` jobs started more than `threshold` ago back to
    /// `queued` without touching `attempts`. Returns the number reset.
    async fn reclaim_stuck(&self, threshold: Duration) -> Result<u64>;

    /// Number of jobs currently `processing`.
    async fn processing_count(&self) -> Result<i64>;

    /// Get job by ID.
    async fn get(&self, job_id: Uuid) -> Result<Option<Job>>;

    /// List jobs, newest first.
    async fn list(&self, filter: &JobFilter) -> Result<Vec<Job>>;

    /// All jobs ever created for a subject, newest first.
    async fn list_for_subject(&self, subject_id: Uuid) -> Result<Vec<Job>>;

    /// Counts per status.
    async fn queue_stats(&self) -> Result<QueueStats>;
}

// =============================================================================
// SUBJECTS
// =============================================================================

/// Landing page storage. The job core only writes status and result fields.
#[async_trait]
pub trait PageRepository: Send + Sync {
    async fn get(&self, page_id: Uuid) -> Result<Option<Page>>;

    /// Set the user-visible status; `error` is stored for the error state and
    /// cleared otherwise.
    async fn set_status(&self, page_id: Uuid, status: PageStatus, error: Option<&str>)
        -> Result<()>;

    /// Store generated content and mark the page `generated`.
    async fn record_content(&self, page_id: Uuid, content: &GeneratedContent) -> Result<()>;

    /// Store the WordPress page id/URL and mark the page `pushed`.
    async fn record_publication(&self, page_id: Uuid, published: &PublishedPage) -> Result<()>;
}

/// Per-project WordPress connection lookup.
#[async_trait]
pub trait SiteRepository: Send + Sync {
    async fn get_for_project(&self, project_id: Uuid) -> Result<Option<WordPressSite>>;
}

// =============================================================================
// AUDIT LOG
// =============================================================================

/// Append-only record of every processed attempt.
#[async_trait]
pub trait AuditRepository: Send + Sync {
    async fn record(&self, record: &AttemptRecord) -> Result<()>;

    /// Attempts for a job, oldest first.
    async fn list_for_job(&self, job_id: Uuid) -> Result<Vec<AttemptRecord>>;
}

// =============================================================================
// EFFECT EXECUTORS
// =============================================================================

/// LLM-backed generator for page content.
///
/// Must tolerate being called more than once for the same page.
#[async_trait]
pub trait ContentGenerator: Send + Sync {
    async fn generate(&self, page: &Page) -> Result<GeneratedContent>;

    /// Model name for logging.
    fn model_name(&self) -> &str;
}

/// Publishes rendered pages to WordPress.
///
/// Must be safe to call twice for the same page (upsert by page identity).
#[async_trait]
pub trait PagePublisher: Send + Sync {
    async fn publish(
        &self,
        page: &Page,
        content: &GeneratedContent,
        site: &WordPressSite,
    ) -> Result<PublishedPage>;
}
