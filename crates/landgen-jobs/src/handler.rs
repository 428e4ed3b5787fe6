//! Job handlers for each job kind.

use async_trait::async_trait;
use uuid::Uuid;

use landgen_core::{GeneratedContent, Job, JobKind, Page, PublishedPage, Result};

/// Context provided to job handlers.
pub struct JobContext {
    /// The claimed job, `attempts` already counting this run.
    pub job: Job,
    /// The job's subject as loaded right after the claim.
    pub page: Page,
}

impl JobContext {
    /// Create a new job context.
    pub fn new(job: Job, page: Page) -> Self {
        Self { job, page }
    }

    pub fn job_id(&self) -> Uuid {
        self.job.id
    }

    /// 1-based number of the attempt in progress.
    pub fn attempt(&self) -> i32 {
        self.job.attempts
    }
}

/// What a successful handler produced, applied to the page by the projector.
#[derive(Debug, Clone, PartialEq)]
pub enum JobOutput {
    /// Generated title/body/meta for the page.
    Content(GeneratedContent),
    /// The page now lives on WordPress.
    Published(PublishedPage),
}

/// Trait for job handlers.
///
/// Errors are classified by the dispatcher; return the most specific
/// [`landgen_core::Error`] variant available.
#[async_trait]
pub trait JobHandler: Send + Sync {
    /// The job kind this handler processes.
    fn kind(&self) -> JobKind;

    /// Execute the job. May run more than once for the same page.
    async fn execute(&self, ctx: &JobContext) -> Result<JobOutput>;

    /// Check if this handler can process the given job kind.
    fn can_handle(&self, kind: JobKind) -> bool {
        self.kind() == kind
    }
}
