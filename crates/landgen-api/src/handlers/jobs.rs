//! Job queue endpoints: enqueue, list, inspect.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use tracing::info;
use uuid::Uuid;

use landgen_core::{EnqueueRequest, JobFilter, JobKind, JobStatus};

use crate::{ApiError, AppState};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateJobsBody {
    pub kind: String,
    #[serde(rename = "subjectIDs")]
    pub subject_ids: Vec<Uuid>,
    #[serde(rename = "ownerID")]
    pub owner_id: Uuid,
    #[serde(rename = "projectID")]
    pub project_id: Uuid,
    pub priority: Option<i32>,
    pub max_attempts: Option<i32>,
}

/// `POST /api/v1/jobs`: enqueue one job per subject.
pub async fn create_jobs(
    State(state): State<AppState>,
    Json(body): Json<CreateJobsBody>,
) -> Result<impl IntoResponse, ApiError> {
    let kind: JobKind = body.kind.parse()?;

    let mut request = EnqueueRequest::new(kind, body.subject_ids, body.owner_id, body.project_id)
        .with_max_attempts(body.max_attempts.unwrap_or(state.default_max_attempts));
    if let Some(priority) = body.priority {
        request = request.with_priority(priority);
    }

    let job_ids = state.jobs.enqueue(request).await?;
    info!(
        subsystem = "api",
        op = "enqueue",
        job_kind = %kind,
        project_id = %body.project_id,
        count = job_ids.len(),
        "Jobs enqueued"
    );

    Ok((
        StatusCode::CREATED,
        Json(serde_json::json!({
            "jobsCreated": job_ids.len(),
            "jobIDs": job_ids,
        })),
    ))
}

#[derive(Debug, Deserialize)]
pub struct ListJobsQuery {
    pub status: Option<String>,
    pub kind: Option<String>,
    pub subject_id: Option<Uuid>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

impl ListJobsQuery {
    fn into_filter(self) -> Result<JobFilter, ApiError> {
        Ok(JobFilter {
            status: self
                .status
                .as_deref()
                .map(str::parse::<JobStatus>)
                .transpose()?,
            kind: self.kind.as_deref().map(str::parse::<JobKind>).transpose()?,
            subject_id: self.subject_id,
            limit: self.limit,
            offset: self.offset,
        })
    }
}

/// `GET /api/v1/jobs`: filtered listing plus queue totals.
pub async fn list_jobs(
    State(state): State<AppState>,
    Query(query): Query<ListJobsQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let filter = query.into_filter()?;
    let jobs = state.jobs.list(&filter).await?;
    let stats = state.jobs.queue_stats().await?;

    Ok(Json(serde_json::json!({
        "jobs": jobs,
        "limit": filter.limit(),
        "offset": filter.offset(),
        "total": stats.total,
        "queued": stats.queued,
        "processing": stats.processing,
    })))
}

/// `GET /api/v1/jobs/stats`
pub async fn queue_stats(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    let stats = state.jobs.queue_stats().await?;
    Ok(Json(stats))
}

/// `GET /api/v1/jobs/:id`
pub async fn get_job(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let job = state
        .jobs
        .get(id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Job not found".to_string()))?;
    Ok(Json(job))
}

/// `GET /api/v1/jobs/:id/attempts`: the job's audit trail, oldest first.
pub async fn list_attempts(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    if state.jobs.get(id).await?.is_none() {
        return Err(ApiError::NotFound("Job not found".to_string()));
    }
    let attempts = state.audit.list_for_job(id).await?;
    Ok(Json(attempts))
}
