//! In-process store implementing every repository trait.
//!
//! Backs the dispatcher and API tests and local runs without PostgreSQL.
//! Each operation takes the single lock, so conditional transitions are
//! atomic exactly like their SQL counterparts.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::Mutex;
use uuid::Uuid;

use landgen_core::{
    defaults, new_v7, AttemptRecord, AuditRepository, EnqueueRequest, Error, GeneratedContent,
    Job, JobFilter, JobRepository, JobStatus, Page, PageRepository, PageStatus, PublishedPage,
    QueueStats, Result, SiteRepository, WordPressSite,
};

#[derive(Default)]
struct Inner {
    /// Jobs keyed by id, each with its insertion sequence for tie-breaks.
    jobs: HashMap<Uuid, (u64, Job)>,
    next_seq: u64,
    pages: HashMap<Uuid, Page>,
    sites: HashMap<Uuid, WordPressSite>,
    attempts: Vec<AttemptRecord>,
    unavailable: bool,
    audit_unavailable: bool,
}

impl Inner {
    fn check_available(&self) -> Result<()> {
        if self.unavailable {
            return Err(Error::Database(sqlx::Error::PoolTimedOut));
        }
        Ok(())
    }

    fn matching_jobs<F>(&self, mut pred: F) -> Vec<(u64, Job)>
    where
        F: FnMut(&Job) -> bool,
    {
        self.jobs
            .values()
            .filter(|(_, job)| pred(job))
            .cloned()
            .collect()
    }
}

/// Shared, cloneable in-memory store.
#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Mutex<Inner>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert_page(&self, page: Page) {
        self.inner.lock().await.pages.insert(page.id, page);
    }

    pub async fn remove_page(&self, page_id: Uuid) {
        self.inner.lock().await.pages.remove(&page_id);
    }

    pub async fn page(&self, page_id: Uuid) -> Option<Page> {
        self.inner.lock().await.pages.get(&page_id).cloned()
    }

    pub async fn upsert_site(&self, site: WordPressSite) {
        self.inner.lock().await.sites.insert(site.project_id, site);
    }

    pub async fn job(&self, job_id: Uuid) -> Option<Job> {
        self.inner
            .lock()
            .await
            .jobs
            .get(&job_id)
            .map(|(_, job)| job.clone())
    }

    /// Mutate a stored job in place, bypassing transition rules.
    ///
    /// Returns false when the job does not exist.
    pub async fn update_job<F>(&self, job_id: Uuid, f: F) -> bool
    where
        F: FnOnce(&mut Job),
    {
        match self.inner.lock().await.jobs.get_mut(&job_id) {
            Some((_, job)) => {
                f(job);
                true
            }
            None => false,
        }
    }

    /// Make every job-store call fail with a database error.
    pub async fn set_unavailable(&self, unavailable: bool) {
        self.inner.lock().await.unavailable = unavailable;
    }

    /// Make audit writes fail while everything else keeps working.
    pub async fn set_audit_unavailable(&self, unavailable: bool) {
        self.inner.lock().await.audit_unavailable = unavailable;
    }

    /// Every attempt recorded so far, in write order.
    pub async fn attempts(&self) -> Vec<AttemptRecord> {
        self.inner.lock().await.attempts.clone()
    }
}

#[async_trait]
impl JobRepository for MemoryStore {
    async fn enqueue(&self, req: EnqueueRequest) -> Result<Vec<Uuid>> {
        req.validate()?;
        let mut inner = self.inner.lock().await;
        inner.check_available()?;

        let mut ids = Vec::with_capacity(req.subject_ids.len());
        for subject_id in &req.subject_ids {
            let now = Utc::now();
            let job = Job {
                id: new_v7(),
                kind: req.kind,
                subject_id: *subject_id,
                owner_id: req.owner_id,
                project_id: req.project_id,
                status: JobStatus::Queued,
                attempts: 0,
                max_attempts: req.max_attempts,
                priority: req.priority,
                created_at: now,
                started_at: None,
                completed_at: None,
                updated_at: now,
                error_message: None,
            };
            let seq = inner.next_seq;
            inner.next_seq += 1;
            ids.push(job.id);
            inner.jobs.insert(job.id, (seq, job));
        }
        Ok(ids)
    }

    async fn dequeue_batch(&self, limit: i64) -> Result<Vec<Job>> {
        let inner = self.inner.lock().await;
        inner.check_available()?;

        let mut queued = inner.matching_jobs(|job| job.status == JobStatus::Queued);
        queued.sort_by(|(seq_a, a), (seq_b, b)| {
            b.priority
                .cmp(&a.priority)
                .then(a.created_at.cmp(&b.created_at))
                .then(seq_a.cmp(seq_b))
        });
        Ok(queued
            .into_iter()
            .take(limit.max(0) as usize)
            .map(|(_, job)| job)
            .collect())
    }

    async fn claim(&self, job_id: Uuid) -> Result<Option<Job>> {
        let mut inner = self.inner.lock().await;
        inner.check_available()?;

        match inner.jobs.get_mut(&job_id) {
            Some((_, job)) if job.status == JobStatus::Queued && !job.is_exhausted() => {
                let now = Utc::now();
                job.status = JobStatus::Processing;
                job.attempts += 1;
                job.started_at = Some(now);
                job.updated_at = now;
                Ok(Some(job.clone()))
            }
            _ => Ok(None),
        }
    }

    async fn complete(&self, job_id: Uuid) -> Result<bool> {
        let mut inner = self.inner.lock().await;
        inner.check_available()?;

        match inner.jobs.get_mut(&job_id) {
            Some((_, job)) if job.status == JobStatus::Processing => {
                let now = Utc::now();
                job.status = JobStatus::Completed;
                job.completed_at = Some(now);
                job.updated_at = now;
                job.error_message = None;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn requeue(&self, job_id: Uuid, error: &str) -> Result<bool> {
        let mut inner = self.inner.lock().await;
        inner.check_available()?;

        match inner.jobs.get_mut(&job_id) {
            Some((_, job)) if job.status == JobStatus::Processing => {
                job.status = JobStatus::Queued;
                job.started_at = None;
                job.updated_at = Utc::now();
                job.error_message = Some(error.to_string());
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn fail(&self, job_id: Uuid, error: &str) -> Result<bool> {
        let mut inner = self.inner.lock().await;
        inner.check_available()?;

        match inner.jobs.get_mut(&job_id) {
            Some((_, job)) if !job.status.is_terminal() => {
                let now = Utc::now();
                job.status = JobStatus::Failed;
                job.completed_at = Some(now);
                job.updated_at = now;
                job.error_message = Some(error.to_string());
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn reclaim_stuck(&self, threshold: Duration) -> Result<u64> {
        let mut inner = self.inner.lock().await;
        inner.check_available()?;

        let threshold = chrono::Duration::from_std(threshold)
            .map_err(|e| Error::Config(format!("Invalid stuck threshold: {}", e)))?;
        let now = Utc::now();
        let cutoff: DateTime<Utc> = now - threshold;

        let mut reclaimed = 0;
        for (_, job) in inner.jobs.values_mut() {
            let stuck = job.status == JobStatus::Processing
                && job.started_at.map_or(false, |started| started < cutoff);
            if stuck {
                job.status = JobStatus::Queued;
                job.started_at = None;
                job.updated_at = now;
                job.error_message = Some(defaults::STUCK_JOB_MESSAGE.to_string());
                reclaimed += 1;
            }
        }
        Ok(reclaimed)
    }

    async fn processing_count(&self) -> Result<i64> {
        let inner = self.inner.lock().await;
        inner.check_available()?;
        Ok(inner
            .jobs
            .values()
            .filter(|(_, job)| job.status == JobStatus::Processing)
            .count() as i64)
    }

    async fn get(&self, job_id: Uuid) -> Result<Option<Job>> {
        let inner = self.inner.lock().await;
        inner.check_available()?;
        Ok(inner.jobs.get(&job_id).map(|(_, job)| job.clone()))
    }

    async fn list(&self, filter: &JobFilter) -> Result<Vec<Job>> {
        let inner = self.inner.lock().await;
        inner.check_available()?;

        let mut jobs = inner.matching_jobs(|job| filter.matches(job));
        jobs.sort_by(|(seq_a, a), (seq_b, b)| {
            b.created_at.cmp(&a.created_at).then(seq_b.cmp(seq_a))
        });
        Ok(jobs
            .into_iter()
            .skip(filter.offset() as usize)
            .take(filter.limit() as usize)
            .map(|(_, job)| job)
            .collect())
    }

    async fn list_for_subject(&self, subject_id: Uuid) -> Result<Vec<Job>> {
        let inner = self.inner.lock().await;
        inner.check_available()?;

        let mut jobs = inner.matching_jobs(|job| job.subject_id == subject_id);
        jobs.sort_by(|(seq_a, a), (seq_b, b)| {
            b.created_at.cmp(&a.created_at).then(seq_b.cmp(seq_a))
        });
        Ok(jobs.into_iter().map(|(_, job)| job).collect())
    }

    async fn queue_stats(&self) -> Result<QueueStats> {
        let inner = self.inner.lock().await;
        inner.check_available()?;

        let mut stats = QueueStats::default();
        for (_, job) in inner.jobs.values() {
            match job.status {
                JobStatus::Queued => stats.queued += 1,
                JobStatus::Processing => stats.processing += 1,
                JobStatus::Completed => stats.completed += 1,
                JobStatus::Failed => stats.failed += 1,
            }
            stats.total += 1;
        }
        Ok(stats)
    }
}

#[async_trait]
impl PageRepository for MemoryStore {
    async fn get(&self, page_id: Uuid) -> Result<Option<Page>> {
        let inner = self.inner.lock().await;
        inner.check_available()?;
        Ok(inner.pages.get(&page_id).cloned())
    }

    async fn set_status(
        &self,
        page_id: Uuid,
        status: PageStatus,
        error: Option<&str>,
    ) -> Result<()> {
        let mut inner = self.inner.lock().await;
        inner.check_available()?;

        if let Some(page) = inner.pages.get_mut(&page_id) {
            page.status = status;
            page.error_message = match status {
                PageStatus::Error => error.map(str::to_string),
                _ => None,
            };
            page.updated_at = Utc::now();
        }
        Ok(())
    }

    async fn record_content(&self, page_id: Uuid, content: &GeneratedContent) -> Result<()> {
        let mut inner = self.inner.lock().await;
        inner.check_available()?;

        let page = inner
            .pages
            .get_mut(&page_id)
            .ok_or_else(|| Error::NotFound(format!("page {}", page_id)))?;
        page.title = Some(content.title.clone());
        page.body = Some(content.body.clone());
        page.meta_title = Some(content.meta_title.clone());
        page.meta_description = Some(content.meta_description.clone());
        page.status = PageStatus::Generated;
        page.error_message = None;
        page.updated_at = Utc::now();
        Ok(())
    }

    async fn record_publication(&self, page_id: Uuid, published: &PublishedPage) -> Result<()> {
        let mut inner = self.inner.lock().await;
        inner.check_available()?;

        let page = inner
            .pages
            .get_mut(&page_id)
            .ok_or_else(|| Error::NotFound(format!("page {}", page_id)))?;
        page.wp_page_id = Some(published.page_id);
        page.wp_page_url = Some(published.page_url.clone());
        page.status = PageStatus::Pushed;
        page.error_message = None;
        page.updated_at = Utc::now();
        Ok(())
    }
}

#[async_trait]
impl SiteRepository for MemoryStore {
    async fn get_for_project(&self, project_id: Uuid) -> Result<Option<WordPressSite>> {
        let inner = self.inner.lock().await;
        inner.check_available()?;
        Ok(inner.sites.get(&project_id).cloned())
    }
}

#[async_trait]
impl AuditRepository for MemoryStore {
    async fn record(&self, record: &AttemptRecord) -> Result<()> {
        let mut inner = self.inner.lock().await;
        inner.check_available()?;
        if inner.audit_unavailable {
            return Err(Error::Database(sqlx::Error::PoolTimedOut));
        }
        inner.attempts.push(record.clone());
        Ok(())
    }

    async fn list_for_job(&self, job_id: Uuid) -> Result<Vec<AttemptRecord>> {
        let inner = self.inner.lock().await;
        inner.check_available()?;
        Ok(inner
            .attempts
            .iter()
            .filter(|a| a.job_id == job_id)
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use landgen_core::JobKind;

    fn request(subjects: usize) -> EnqueueRequest {
        EnqueueRequest::new(
            JobKind::ContentGeneration,
            (0..subjects).map(|_| new_v7()).collect(),
            new_v7(),
            new_v7(),
        )
    }

    #[tokio::test]
    async fn test_enqueue_creates_one_queued_job_per_subject() {
        let store = MemoryStore::new();
        let ids = store.enqueue(request(3)).await.unwrap();
        assert_eq!(ids.len(), 3);

        for id in ids {
            let job = store.job(id).await.unwrap();
            assert_eq!(job.status, JobStatus::Queued);
            assert_eq!(job.attempts, 0);
            assert_eq!(job.max_attempts, defaults::JOB_MAX_ATTEMPTS);
            assert!(job.started_at.is_none());
        }
    }

    #[tokio::test]
    async fn test_enqueue_empty_is_validation_error() {
        let store = MemoryStore::new();
        let err = store.enqueue(request(0)).await.unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
        assert_eq!(store.queue_stats().await.unwrap().total, 0);
    }

    #[tokio::test]
    async fn test_dequeue_orders_by_priority_then_age() {
        let store = MemoryStore::new();
        let mut ids = Vec::new();
        for priority in [5, 1, 5, 3] {
            let id = store
                .enqueue(request(1).with_priority(priority))
                .await
                .unwrap()[0];
            ids.push(id);
        }

        let batch = store.dequeue_batch(10).await.unwrap();
        let order: Vec<Uuid> = batch.iter().map(|j| j.id).collect();
        assert_eq!(order, vec![ids[0], ids[2], ids[3], ids[1]]);

        let batch = store.dequeue_batch(2).await.unwrap();
        assert_eq!(batch.len(), 2);
    }

    #[tokio::test]
    async fn test_dequeue_does_not_claim() {
        let store = MemoryStore::new();
        store.enqueue(request(2)).await.unwrap();
        store.dequeue_batch(5).await.unwrap();
        assert_eq!(store.dequeue_batch(5).await.unwrap().len(), 2);
        assert_eq!(store.processing_count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_claim_is_exclusive() {
        let store = MemoryStore::new();
        let id = store.enqueue(request(1)).await.unwrap()[0];

        let first = store.claim(id).await.unwrap().unwrap();
        assert_eq!(first.status, JobStatus::Processing);
        assert_eq!(first.attempts, 1);
        assert!(first.started_at.is_some());

        assert!(store.claim(id).await.unwrap().is_none());
        assert_eq!(store.job(id).await.unwrap().attempts, 1);
    }

    #[tokio::test]
    async fn test_claim_refuses_exhausted_job() {
        let store = MemoryStore::new();
        let id = store
            .enqueue(request(1).with_max_attempts(1))
            .await
            .unwrap()[0];
        store.update_job(id, |job| job.attempts = 1).await;

        assert!(store.claim(id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_transitions_require_processing() {
        let store = MemoryStore::new();
        let id = store.enqueue(request(1)).await.unwrap()[0];

        assert!(!store.complete(id).await.unwrap());
        assert!(!store.requeue(id, "nope").await.unwrap());

        store.claim(id).await.unwrap();
        assert!(store.requeue(id, "HTTP 503").await.unwrap());
        let job = store.job(id).await.unwrap();
        assert_eq!(job.status, JobStatus::Queued);
        assert_eq!(job.error_message.as_deref(), Some("HTTP 503"));
        assert!(job.started_at.is_none());

        store.claim(id).await.unwrap();
        assert!(store.complete(id).await.unwrap());
        let job = store.job(id).await.unwrap();
        assert_eq!(job.status, JobStatus::Completed);
        assert!(job.completed_at.is_some());
        assert!(job.error_message.is_none());

        assert!(!store.fail(id, "late").await.unwrap());
    }

    #[tokio::test]
    async fn test_reclaim_stuck_keeps_attempts() {
        let store = MemoryStore::new();
        let ids = store.enqueue(request(2)).await.unwrap();
        store.claim(ids[0]).await.unwrap();
        store.claim(ids[1]).await.unwrap();
        store
            .update_job(ids[0], |job| {
                job.started_at = Some(Utc::now() - chrono::Duration::minutes(10))
            })
            .await;

        let reclaimed = store
            .reclaim_stuck(Duration::from_secs(300))
            .await
            .unwrap();
        assert_eq!(reclaimed, 1);

        let stuck = store.job(ids[0]).await.unwrap();
        assert_eq!(stuck.status, JobStatus::Queued);
        assert_eq!(stuck.attempts, 1);
        assert!(stuck.started_at.is_none());
        assert_eq!(
            stuck.error_message.as_deref(),
            Some(defaults::STUCK_JOB_MESSAGE)
        );

        let fresh = store.job(ids[1]).await.unwrap();
        assert_eq!(fresh.status, JobStatus::Processing);
    }

    #[tokio::test]
    async fn test_list_filters_and_pages() {
        let store = MemoryStore::new();
        let ids = store.enqueue(request(4)).await.unwrap();
        store.claim(ids[0]).await.unwrap();

        let processing = store
            .list(&JobFilter {
                status: Some(JobStatus::Processing),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(processing.len(), 1);
        assert_eq!(processing[0].id, ids[0]);

        let page = store
            .list(&JobFilter {
                limit: Some(2),
                offset: Some(1),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(page.len(), 2);
        assert_eq!(page[0].id, ids[2]);
        assert_eq!(page[1].id, ids[1]);
    }

    #[tokio::test]
    async fn test_unavailable_store_fails_with_infrastructure_error() {
        let store = MemoryStore::new();
        store.set_unavailable(true).await;
        let err = store.processing_count().await.unwrap_err();
        assert!(err.is_infrastructure());
    }
}
