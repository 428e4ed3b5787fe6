//! Content generation job handler.

use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use tracing::debug;

use landgen_core::{ContentGenerator, JobKind, Result};

use crate::handler::{JobContext, JobHandler, JobOutput};

/// Generates title, body and meta tags for a page.
pub struct ContentGenerationHandler {
    generator: Arc<dyn ContentGenerator>,
}

impl ContentGenerationHandler {
    pub fn new(generator: Arc<dyn ContentGenerator>) -> Self {
        Self { generator }
    }
}

#[async_trait]
impl JobHandler for ContentGenerationHandler {
    fn kind(&self) -> JobKind {
        JobKind::ContentGeneration
    }

    async fn execute(&self, ctx: &JobContext) -> Result<JobOutput> {
        let start = Instant::now();
        let content = self.generator.generate(&ctx.page).await?;

        debug!(
            subsystem = "jobs",
            component = "content_handler",
            job_id = %ctx.job_id(),
            subject_id = %ctx.page.id,
            model = self.generator.model_name(),
            attempt = ctx.attempt(),
            duration_ms = start.elapsed().as_millis() as u64,
            "Content generated"
        );
        Ok(JobOutput::Content(content))
    }
}
