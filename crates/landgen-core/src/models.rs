//! Core data models for landgen.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::defaults;
use crate::error::{Error, Result};

/// Generate a new time-ordered UUIDv7 identifier.
#[inline]
pub fn new_v7() -> Uuid {
    Uuid::now_v7()
}

// =============================================================================
// JOB TYPES
// =============================================================================

/// Kind of deferred work a job performs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum JobKind {
    /// Generate title, body and meta tags for a page with the LLM.
    #[serde(rename = "content-generation")]
    ContentGeneration,
    /// Publish a generated page to the project's WordPress site.
    #[serde(rename = "wordpress-push")]
    WordpressPush,
}

impl JobKind {
    /// Wire and database representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            JobKind::ContentGeneration => "content-generation",
            JobKind::WordpressPush => "wordpress-push",
        }
    }

    /// Page status written when a job of this kind is claimed.
    pub fn in_flight_status(&self) -> PageStatus {
        match self {
            JobKind::ContentGeneration => PageStatus::Generating,
            JobKind::WordpressPush => PageStatus::Queued,
        }
    }

    /// Page status written when a job of this kind succeeds.
    pub fn success_status(&self) -> PageStatus {
        match self {
            JobKind::ContentGeneration => PageStatus::Generated,
            JobKind::WordpressPush => PageStatus::Pushed,
        }
    }
}

impl fmt::Display for JobKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for JobKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "content-generation" => Ok(JobKind::ContentGeneration),
            "wordpress-push" => Ok(JobKind::WordpressPush),
            other => Err(Error::Validation(format!("Invalid job kind: {}", other))),
        }
    }
}

/// Status of a job in the queue.
///
/// `queued` and `processing` are the only non-terminal states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Queued,
    Processing,
    Completed,
    Failed,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Queued => "queued",
            JobStatus::Processing => "processing",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for JobStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "queued" => Ok(JobStatus::Queued),
            "processing" => Ok(JobStatus::Processing),
            "completed" => Ok(JobStatus::Completed),
            "failed" => Ok(JobStatus::Failed),
            other => Err(Error::Validation(format!("Invalid job status: {}", other))),
        }
    }
}

/// A persisted, retryable unit of deferred work.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Job {
    pub id: Uuid,
    pub kind: JobKind,
    /// The page this job acts on.
    pub subject_id: Uuid,
    pub owner_id: Uuid,
    pub project_id: Uuid,
    pub status: JobStatus,
    pub attempts: i32,
    pub max_attempts: i32,
    pub priority: i32,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub updated_at: DateTime<Utc>,
    pub error_message: Option<String>,
}

impl Job {
    /// True once every allowed attempt has been consumed.
    pub fn is_exhausted(&self) -> bool {
        self.attempts >= self.max_attempts
    }
}

/// Request to enqueue one job per subject.
#[derive(Debug, Clone)]
pub struct EnqueueRequest {
    pub kind: JobKind,
    pub subject_ids: Vec<Uuid>,
    pub owner_id: Uuid,
    pub project_id: Uuid,
    pub priority: i32,
    pub max_attempts: i32,
}

impl EnqueueRequest {
    /// Create a request with default priority and attempt limit.
    pub fn new(kind: JobKind, subject_ids: Vec<Uuid>, owner_id: Uuid, project_id: Uuid) -> Self {
        Self {
            kind,
            subject_ids,
            owner_id,
            project_id,
            priority: defaults::JOB_PRIORITY,
            max_attempts: defaults::JOB_MAX_ATTEMPTS,
        }
    }

    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_max_attempts(mut self, max_attempts: i32) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    /// Reject requests the store must not persist.
    pub fn validate(&self) -> Result<()> {
        if self.subject_ids.is_empty() {
            return Err(Error::Validation(
                "at least one subject id is required".to_string(),
            ));
        }
        if self.max_attempts < 1 {
            return Err(Error::Validation(format!(
                "max_attempts must be at least 1, got {}",
                self.max_attempts
            )));
        }
        Ok(())
    }
}

/// Filter for listing jobs.
#[derive(Debug, Clone, Default)]
pub struct JobFilter {
    pub status: Option<JobStatus>,
    pub kind: Option<JobKind>,
    pub subject_id: Option<Uuid>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

impl JobFilter {
    /// Effective limit, clamped to the listing maximum.
    pub fn limit(&self) -> i64 {
        self.limit
            .unwrap_or(defaults::JOB_LIST_LIMIT)
            .clamp(1, defaults::JOB_LIST_MAX_LIMIT)
    }

    pub fn offset(&self) -> i64 {
        self.offset.unwrap_or(0).max(0)
    }

    /// Whether a job passes the status/kind/subject predicates.
    pub fn matches(&self, job: &Job) -> bool {
        self.status.map_or(true, |s| job.status == s)
            && self.kind.map_or(true, |k| job.kind == k)
            && self.subject_id.map_or(true, |id| job.subject_id == id)
    }
}

/// Queue statistics summary.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QueueStats {
    pub queued: i64,
    pub processing: i64,
    pub completed: i64,
    pub failed: i64,
    pub total: i64,
}

/// One processed attempt, as written to the audit log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttemptRecord {
    pub id: Uuid,
    pub job_id: Uuid,
    pub kind: JobKind,
    pub subject_id: Uuid,
    pub attempt: i32,
    pub success: bool,
    pub error_message: Option<String>,
    pub duration_ms: i64,
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// SUBJECT TYPES
// =============================================================================

/// User-visible status of a landing page.
///
/// Generation: `pending -> generating -> generated | error`.
/// Publishing: `generated -> queued -> pushed | error`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PageStatus {
    Pending,
    Generating,
    Generated,
    Queued,
    Pushed,
    Error,
}

impl PageStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PageStatus::Pending => "pending",
            PageStatus::Generating => "generating",
            PageStatus::Generated => "generated",
            PageStatus::Queued => "queued",
            PageStatus::Pushed => "pushed",
            PageStatus::Error => "error",
        }
    }
}

impl fmt::Display for PageStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PageStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "pending" => Ok(PageStatus::Pending),
            "generating" => Ok(PageStatus::Generating),
            "generated" => Ok(PageStatus::Generated),
            "queued" => Ok(PageStatus::Queued),
            "pushed" => Ok(PageStatus::Pushed),
            "error" => Ok(PageStatus::Error),
            other => Err(Error::Validation(format!("Invalid page status: {}", other))),
        }
    }
}

/// A location x keyword landing page, the subject of every job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub project_id: Uuid,
    pub location: String,
    pub keyword: String,
    pub slug: String,
    pub status: PageStatus,
    pub title: Option<String>,
    pub body: Option<String>,
    pub meta_title: Option<String>,
    pub meta_description: Option<String>,
    pub wp_page_id: Option<i64>,
    pub wp_page_url: Option<String>,
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Page {
    /// Generated content stored on the page, if generation has completed.
    pub fn content(&self) -> Option<GeneratedContent> {
        match (&self.title, &self.body) {
            (Some(title), Some(body)) if !body.trim().is_empty() => Some(GeneratedContent {
                title: title.clone(),
                body: body.clone(),
                meta_title: self.meta_title.clone().unwrap_or_else(|| title.clone()),
                meta_description: self.meta_description.clone().unwrap_or_default(),
            }),
            _ => None,
        }
    }
}

/// Output of the content generator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneratedContent {
    pub title: String,
    pub body: String,
    pub meta_title: String,
    pub meta_description: String,
}

/// Output of the WordPress publisher.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PublishedPage {
    pub page_id: i64,
    pub page_url: String,
}

/// WordPress site a project publishes to.
#[derive(Clone, PartialEq, Serialize, Deserialize)]
pub struct WordPressSite {
    pub project_id: Uuid,
    pub site_url: String,
    pub username: String,
    /// WordPress application password.
    #[serde(skip_serializing)]
    pub app_password: String,
}

impl fmt::Debug for WordPressSite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WordPressSite")
            .field("project_id", &self.project_id)
            .field("site_url", &self.site_url)
            .field("username", &self.username)
            .field("app_password", &"<redacted>")
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_page() -> Page {
        let now = Utc::now();
        Page {
            id: new_v7(),
            owner_id: new_v7(),
            project_id: new_v7(),
            location: "Austin, TX".to_string(),
            keyword: "roof repair".to_string(),
            slug: "roof-repair-austin-tx".to_string(),
            status: PageStatus::Pending,
            title: None,
            body: None,
            meta_title: None,
            meta_description: None,
            wp_page_id: None,
            wp_page_url: None,
            error_message: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_job_kind_wire_names() {
        assert_eq!(
            serde_json::to_string(&JobKind::ContentGeneration).unwrap(),
            "\"content-generation\""
        );
        assert_eq!(
            serde_json::from_str::<JobKind>("\"wordpress-push\"").unwrap(),
            JobKind::WordpressPush
        );
        assert_eq!(
            "content-generation".parse::<JobKind>().unwrap(),
            JobKind::ContentGeneration
        );
        assert!("embedding".parse::<JobKind>().is_err());
    }

    #[test]
    fn test_job_kind_projection_states() {
        assert_eq!(
            JobKind::ContentGeneration.in_flight_status(),
            PageStatus::Generating
        );
        assert_eq!(
            JobKind::ContentGeneration.success_status(),
            PageStatus::Generated
        );
        assert_eq!(JobKind::WordpressPush.in_flight_status(), PageStatus::Queued);
        assert_eq!(JobKind::WordpressPush.success_status(), PageStatus::Pushed);
    }

    #[test]
    fn test_job_status_terminal() {
        assert!(!JobStatus::Queued.is_terminal());
        assert!(!JobStatus::Processing.is_terminal());
        assert!(JobStatus::Completed.is_terminal());
        assert!(JobStatus::Failed.is_terminal());
        assert_eq!("processing".parse::<JobStatus>().unwrap(), JobStatus::Processing);
    }

    #[test]
    fn test_enqueue_request_rejects_empty_subjects() {
        let req = EnqueueRequest::new(JobKind::ContentGeneration, vec![], new_v7(), new_v7());
        assert!(matches!(req.validate(), Err(Error::Validation(_))));
    }

    #[test]
    fn test_enqueue_request_rejects_zero_attempts() {
        let req = EnqueueRequest::new(
            JobKind::ContentGeneration,
            vec![new_v7()],
            new_v7(),
            new_v7(),
        )
        .with_max_attempts(0);
        assert!(matches!(req.validate(), Err(Error::Validation(_))));
    }

    #[test]
    fn test_enqueue_request_defaults() {
        let req = EnqueueRequest::new(JobKind::WordpressPush, vec![new_v7()], new_v7(), new_v7());
        assert_eq!(req.priority, defaults::JOB_PRIORITY);
        assert_eq!(req.max_attempts, defaults::JOB_MAX_ATTEMPTS);
        assert!(req.validate().is_ok());
    }

    #[test]
    fn test_job_filter_limit_clamped() {
        let filter = JobFilter {
            limit: Some(10_000),
            offset: Some(-4),
            ..Default::default()
        };
        assert_eq!(filter.limit(), defaults::JOB_LIST_MAX_LIMIT);
        assert_eq!(filter.offset(), 0);
        assert_eq!(JobFilter::default().limit(), defaults::JOB_LIST_LIMIT);
    }

    #[test]
    fn test_page_content_requires_title_and_body() {
        let mut page = sample_page();
        assert!(page.content().is_none());

        page.title = Some("Roof Repair in Austin".to_string());
        page.body = Some("   ".to_string());
        assert!(page.content().is_none());

        page.body = Some("<p>We fix roofs.</p>".to_string());
        let content = page.content().unwrap();
        assert_eq!(content.meta_title, "Roof Repair in Austin");
        assert_eq!(content.meta_description, "");
    }

    #[test]
    fn test_wordpress_site_debug_redacts_password() {
        let site = WordPressSite {
            project_id: new_v7(),
            site_url: "https://example.com".to_string(),
            username: "editor".to_string(),
            app_password: "abcd efgh ijkl".to_string(),
        };
        let debug = format!("{:?}", site);
        assert!(debug.contains("<redacted>"));
        assert!(!debug.contains("abcd efgh"));
        let json = serde_json::to_string(&site).unwrap();
        assert!(!json.contains("app_password"));
    }
}
