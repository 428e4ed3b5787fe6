//! One-shot job dispatcher.
//!
//! A cycle reclaims stuck jobs, refuses to run while another cycle is still
//! processing, then works through a priority-ordered batch under a time
//! budget. Cycles are stateless: everything they need lives in the job store.

use std::collections::HashMap;
use std::sync::Arc;

use futures::stream::{self, StreamExt, TryStreamExt};
use serde::Serialize;
use tokio::time::Instant;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use landgen_core::{
    AuditRepository, Error, Job, JobKind, JobRepository, PageRepository, Result,
};

use crate::classify::{classify, FailureClass};
use crate::config::DispatcherConfig;
use crate::handler::{JobContext, JobHandler, JobOutput};
use crate::projector::StatusProjector;

/// Outcome of one job within a cycle.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JobRunResult {
    #[serde(rename = "jobID")]
    pub job_id: Uuid,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl JobRunResult {
    fn success(job_id: Uuid) -> Self {
        Self {
            job_id,
            success: true,
            error: None,
        }
    }

    fn failure(job_id: Uuid, error: String) -> Self {
        Self {
            job_id,
            success: false,
            error: Some(error),
        }
    }
}

/// Counters and per-job results of a cycle that ran.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DispatchSummary {
    /// Jobs this cycle attempted (succeeded + failed).
    pub processed: usize,
    pub succeeded: usize,
    /// Failed attempts, whether requeued or terminally failed.
    pub failed: usize,
    /// Dequeued jobs left `queued` because the budget ran out.
    pub deferred: usize,
    /// Stuck jobs reset by the reclaimer at cycle start.
    pub reclaimed: u64,
    pub results: Vec<JobRunResult>,
}

/// Result of [`Dispatcher::run_cycle`].
#[derive(Debug, Clone, PartialEq)]
pub enum DispatchOutcome {
    /// Another cycle still has jobs in flight; nothing was claimed.
    Skipped { processing: i64, reclaimed: u64 },
    Completed(DispatchSummary),
}

/// Per-job slot within a cycle.
enum Slot {
    Ran(JobRunResult),
    /// Not started: the budget was spent.
    Deferred,
    /// Another cycle claimed the job first.
    Lost,
}

/// Runs dispatch cycles against a job store.
pub struct Dispatcher {
    jobs: Arc<dyn JobRepository>,
    pages: Arc<dyn PageRepository>,
    projector: StatusProjector,
    handlers: HashMap<JobKind, Arc<dyn JobHandler>>,
    config: DispatcherConfig,
}

impl Dispatcher {
    pub fn new(
        jobs: Arc<dyn JobRepository>,
        pages: Arc<dyn PageRepository>,
        audit: Arc<dyn AuditRepository>,
        config: DispatcherConfig,
    ) -> Self {
        let projector = StatusProjector::new(pages.clone(), audit, config.subject_error_policy);
        Self {
            jobs,
            pages,
            projector,
            handlers: HashMap::new(),
            config,
        }
    }

    /// Register a handler, replacing any previous one for the same kind.
    pub fn with_handler<H: JobHandler + 'static>(mut self, handler: H) -> Self {
        let kind = handler.kind();
        self.handlers.insert(kind, Arc::new(handler));
        debug!(job_kind = %kind, "Registered job handler");
        self
    }

    pub fn config(&self) -> &DispatcherConfig {
        &self.config
    }

    /// Run one dispatch cycle.
    ///
    /// Failures of individual jobs are recorded in the summary. Errors from
    /// the job store itself abort the cycle and are returned.
    #[instrument(skip(self), fields(subsystem = "jobs", component = "dispatcher"))]
    pub async fn run_cycle(&self) -> Result<DispatchOutcome> {
        let cycle_start = Instant::now();
        let deadline = cycle_start + self.config.budget;

        let reclaimed = self.jobs.reclaim_stuck(self.config.stuck_threshold).await?;
        if reclaimed > 0 {
            warn!(
                op = "reclaim",
                reclaimed,
                threshold_secs = self.config.stuck_threshold.as_secs(),
                "Reset stuck jobs to queued"
            );
        }

        let processing = self.jobs.processing_count().await?;
        if processing > 0 {
            info!(op = "guard", processing, "Jobs still processing, skipping cycle");
            return Ok(DispatchOutcome::Skipped {
                processing,
                reclaimed,
            });
        }

        let batch = self.jobs.dequeue_batch(self.config.batch_size).await?;
        debug!(op = "dequeue", batch_len = batch.len(), "Dequeued batch");

        let slots: Vec<Slot> = stream::iter(batch)
            .map(|job| self.process(job, deadline))
            .buffered(self.config.concurrency.max(1))
            .try_collect()
            .await?;

        let mut summary = DispatchSummary {
            reclaimed,
            ..Default::default()
        };
        for slot in slots {
            match slot {
                Slot::Ran(result) => {
                    if result.success {
                        summary.succeeded += 1;
                    } else {
                        summary.failed += 1;
                    }
                    summary.results.push(result);
                }
                Slot::Deferred => summary.deferred += 1,
                Slot::Lost => {}
            }
        }
        summary.processed = summary.results.len();

        info!(
            op = "cycle",
            processed = summary.processed,
            succeeded = summary.succeeded,
            failed = summary.failed,
            deferred = summary.deferred,
            reclaimed,
            duration_ms = cycle_start.elapsed().as_millis() as u64,
            "Dispatch cycle finished"
        );
        Ok(DispatchOutcome::Completed(summary))
    }

    /// Take one dequeued job through claim, execution and bookkeeping.
    async fn process(&self, job: Job, deadline: Instant) -> Result<Slot> {
        if Instant::now() >= deadline {
            debug!(job_id = %job.id, "Budget spent, deferring job");
            return Ok(Slot::Deferred);
        }
        let start = Instant::now();

        if job.is_exhausted() {
            let message = Error::ExhaustedRetries {
                attempts: job.attempts,
                max_attempts: job.max_attempts,
            }
            .to_string();
            self.projector.failed(&job, &message, false).await?;
            if !self.jobs.fail(job.id, &message).await? {
                return Ok(Slot::Lost);
            }
            warn!(job_id = %job.id, job_kind = %job.kind, "Job exhausted its attempts");
            self.projector
                .audit(&job, Some(&message), start.elapsed())
                .await;
            return Ok(Slot::Ran(JobRunResult::failure(job.id, message)));
        }

        let Some(job) = self.jobs.claim(job.id).await? else {
            debug!(job_id = %job.id, "Job claimed by another cycle");
            return Ok(Slot::Lost);
        };

        self.projector.in_flight(&job).await?;

        let page = match self.pages.get(job.subject_id).await? {
            Some(page) => page,
            None => {
                let err = Error::NotFound(format!("page {}", job.subject_id));
                return self.handle_failure(&job, err, start).await;
            }
        };

        info!(
            job_id = %job.id,
            job_kind = %job.kind,
            subject_id = %job.subject_id,
            attempt = job.attempts,
            max_attempts = job.max_attempts,
            "Processing job"
        );

        let ctx = JobContext::new(job, page);
        let job = &ctx.job;
        match self.execute(&ctx).await {
            Ok(output) => match self.projector.succeeded(job, &output).await {
                Ok(()) => self.handle_success(job, start).await,
                Err(e) if e.is_infrastructure() => Err(e),
                Err(e) => self.handle_failure(job, e, start).await,
            },
            Err(e) => self.handle_failure(job, e, start).await,
        }
    }

    /// Run the registered handler under the per-job timeout.
    async fn execute(&self, ctx: &JobContext) -> Result<JobOutput> {
        let kind = ctx.job.kind;
        let handler = self
            .handlers
            .get(&kind)
            .ok_or_else(|| Error::Config(format!("No handler registered for {}", kind)))?;

        match tokio::time::timeout(self.config.job_timeout, handler.execute(ctx)).await {
            Ok(result) => result,
            Err(_) => Err(Error::Timeout {
                secs: self.config.job_timeout.as_secs(),
            }),
        }
    }

    async fn handle_success(&self, job: &Job, start: Instant) -> Result<Slot> {
        if !self.jobs.complete(job.id).await? {
            warn!(job_id = %job.id, "Job left processing before completion was recorded");
        }
        info!(
            job_id = %job.id,
            job_kind = %job.kind,
            duration_ms = start.elapsed().as_millis() as u64,
            "Job completed successfully"
        );
        self.projector.audit(job, None, start.elapsed()).await;
        Ok(Slot::Ran(JobRunResult::success(job.id)))
    }

    async fn handle_failure(&self, job: &Job, err: Error, start: Instant) -> Result<Slot> {
        let message = err.to_string();
        let will_retry = classify(&err) == FailureClass::Retryable && !job.is_exhausted();

        self.projector.failed(job, &message, will_retry).await?;
        let changed = if will_retry {
            self.jobs.requeue(job.id, &message).await?
        } else {
            self.jobs.fail(job.id, &message).await?
        };
        if !changed {
            warn!(job_id = %job.id, "Job left processing before the failure was recorded");
        }

        warn!(
            job_id = %job.id,
            job_kind = %job.kind,
            attempt = job.attempts,
            max_attempts = job.max_attempts,
            will_retry,
            error = %message,
            duration_ms = start.elapsed().as_millis() as u64,
            "Job attempt failed"
        );
        self.projector
            .audit(job, Some(&message), start.elapsed())
            .await;
        Ok(Slot::Ran(JobRunResult::failure(job.id, message)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_job_run_result_wire_shape() {
        let id = landgen_core::new_v7();
        let ok = serde_json::to_value(JobRunResult::success(id)).unwrap();
        assert_eq!(ok["jobID"], serde_json::json!(id));
        assert_eq!(ok["success"], serde_json::json!(true));
        assert!(ok.get("error").is_none());

        let failed = serde_json::to_value(JobRunResult::failure(id, "boom".into())).unwrap();
        assert_eq!(failed["error"], serde_json::json!("boom"));
    }

    #[test]
    fn test_summary_wire_shape() {
        let summary = DispatchSummary {
            processed: 2,
            succeeded: 1,
            failed: 1,
            deferred: 3,
            reclaimed: 0,
            results: vec![],
        };
        let json = serde_json::to_value(&summary).unwrap();
        assert_eq!(json["processed"], 2);
        assert_eq!(json["deferred"], 3);
        assert!(json.get("results").is_some());
    }
}
