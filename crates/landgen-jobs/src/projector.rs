//! Status projection and attempt auditing.
//!
//! Mirrors job progress onto the page the user sees and appends one audit
//! row per processed attempt.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tracing::warn;

use landgen_core::{
    new_v7, AttemptRecord, AuditRepository, Job, PageRepository, PageStatus, Result,
};

use crate::config::SubjectErrorPolicy;
use crate::handler::JobOutput;

/// Writes page status/result fields and audit rows for the dispatcher.
#[derive(Clone)]
pub struct StatusProjector {
    pages: Arc<dyn PageRepository>,
    audit: Arc<dyn AuditRepository>,
    policy: SubjectErrorPolicy,
}

impl StatusProjector {
    pub fn new(
        pages: Arc<dyn PageRepository>,
        audit: Arc<dyn AuditRepository>,
        policy: SubjectErrorPolicy,
    ) -> Self {
        Self {
            pages,
            audit,
            policy,
        }
    }

    pub fn policy(&self) -> SubjectErrorPolicy {
        self.policy
    }

    /// Page status while the job is running (`generating` / `queued`).
    pub async fn in_flight(&self, job: &Job) -> Result<()> {
        self.pages
            .set_status(job.subject_id, job.kind.in_flight_status(), None)
            .await
    }

    /// Store the handler's result on the page, which also sets the success status.
    pub async fn succeeded(&self, job: &Job, output: &JobOutput) -> Result<()> {
        match output {
            JobOutput::Content(content) => self.pages.record_content(job.subject_id, content).await,
            JobOutput::Published(published) => {
                self.pages
                    .record_publication(job.subject_id, published)
                    .await
            }
        }
    }

    /// Reflect a failed attempt on the page.
    ///
    /// `will_retry` is false when the job is about to become `failed`.
    pub async fn failed(&self, job: &Job, error: &str, will_retry: bool) -> Result<()> {
        if will_retry && self.policy == SubjectErrorPolicy::OnExhaustion {
            return Ok(());
        }
        self.pages
            .set_status(job.subject_id, PageStatus::Error, Some(error))
            .await
    }

    /// Append the audit row for an attempt. Audit failures never fail the job.
    pub async fn audit(&self, job: &Job, error: Option<&str>, duration: Duration) {
        let record = AttemptRecord {
            id: new_v7(),
            job_id: job.id,
            kind: job.kind,
            subject_id: job.subject_id,
            attempt: job.attempts,
            success: error.is_none(),
            error_message: error.map(str::to_string),
            duration_ms: duration.as_millis() as i64,
            created_at: Utc::now(),
        };

        if let Err(e) = self.audit.record(&record).await {
            warn!(
                subsystem = "jobs",
                component = "projector",
                op = "audit",
                job_id = %job.id,
                error = %e,
                "Failed to write attempt record"
            );
        }
    }
}
