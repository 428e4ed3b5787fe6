//! WordPress push job handler.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use landgen_core::{Error, JobKind, PagePublisher, Result, SiteRepository};

use crate::handler::{JobContext, JobHandler, JobOutput};

/// Publishes a generated page to its project's WordPress site.
pub struct WordPressPushHandler {
    publisher: Arc<dyn PagePublisher>,
    sites: Arc<dyn SiteRepository>,
}

impl WordPressPushHandler {
    pub fn new(publisher: Arc<dyn PagePublisher>, sites: Arc<dyn SiteRepository>) -> Self {
        Self { publisher, sites }
    }
}

#[async_trait]
impl JobHandler for WordPressPushHandler {
    fn kind(&self) -> JobKind {
        JobKind::WordpressPush
    }

    async fn execute(&self, ctx: &JobContext) -> Result<JobOutput> {
        let page = &ctx.page;

        let content = page.content().ok_or_else(|| {
            Error::Validation(format!("page {} has no generated content", page.id))
        })?;

        let site = self
            .sites
            .get_for_project(page.project_id)
            .await?
            .ok_or_else(|| {
                Error::NotFound(format!(
                    "no WordPress site connected for project {}",
                    page.project_id
                ))
            })?;

        let published = self.publisher.publish(page, &content, &site).await?;

        debug!(
            subsystem = "jobs",
            component = "publish_handler",
            job_id = %ctx.job_id(),
            subject_id = %page.id,
            wp_page_id = published.page_id,
            attempt = ctx.attempt(),
            "Page published"
        );
        Ok(JobOutput::Published(published))
    }
}
