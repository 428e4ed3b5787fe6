//! HTTP endpoint tests against the in-memory store.

use std::sync::Arc;

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use tower::ServiceExt;
use uuid::Uuid;

use landgen_api::{router, AppState};
use landgen_core::{new_v7, JobKind, JobRepository, JobStatus, Result};
use landgen_db::{
    test_fixtures::{pending_page, sample_content},
    MemoryStore,
};
use landgen_jobs::{Dispatcher, DispatcherConfig, JobContext, JobHandler, JobOutput};

struct InstantGenerator;

#[async_trait]
impl JobHandler for InstantGenerator {
    fn kind(&self) -> JobKind {
        JobKind::ContentGeneration
    }

    async fn execute(&self, _ctx: &JobContext) -> Result<JobOutput> {
        Ok(JobOutput::Content(sample_content()))
    }
}

fn app_with(store: &MemoryStore, secret: Option<&str>) -> Router {
    let dispatcher = Dispatcher::new(
        Arc::new(store.clone()),
        Arc::new(store.clone()),
        Arc::new(store.clone()),
        DispatcherConfig::default(),
    )
    .with_handler(InstantGenerator);

    let state = AppState::new(
        Arc::new(store.clone()),
        Arc::new(store.clone()),
        Arc::new(dispatcher),
    )
    .with_dispatch_secret(secret.map(str::to_string));
    router(state)
}

fn app(store: &MemoryStore) -> Router {
    app_with(store, None)
}

async fn send(app: Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, body)
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn post_empty(uri: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

/// Seed `n` pending pages and return their ids with the shared project id.
async fn seed_pages(store: &MemoryStore, n: usize) -> (Uuid, Vec<Uuid>) {
    let project_id = new_v7();
    let mut ids = Vec::new();
    for _ in 0..n {
        let page = pending_page(project_id);
        ids.push(page.id);
        store.insert_page(page).await;
    }
    (project_id, ids)
}

fn enqueue_body(kind: &str, subjects: &[Uuid], project_id: Uuid) -> Value {
    json!({
        "kind": kind,
        "subjectIDs": subjects,
        "ownerID": new_v7(),
        "projectID": project_id,
    })
}

#[tokio::test]
async fn test_health() {
    let store = MemoryStore::new();
    let (status, body) = send(app(&store), get("/health")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
}

#[tokio::test]
async fn test_create_jobs_returns_ids() {
    let store = MemoryStore::new();
    let (project_id, pages) = seed_pages(&store, 2).await;

    let (status, body) = send(
        app(&store),
        post_json(
            "/api/v1/jobs",
            enqueue_body("content-generation", &pages, project_id),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["jobsCreated"], 2);
    let ids = body["jobIDs"].as_array().unwrap();
    assert_eq!(ids.len(), 2);

    let job_id: Uuid = ids[0].as_str().unwrap().parse().unwrap();
    let job = store.job(job_id).await.unwrap();
    assert_eq!(job.status, JobStatus::Queued);
    assert_eq!(job.max_attempts, 3);
    assert_eq!(job.project_id, project_id);
}

#[tokio::test]
async fn test_create_jobs_honours_priority_and_max_attempts() {
    let store = MemoryStore::new();
    let (project_id, pages) = seed_pages(&store, 1).await;

    let mut body = enqueue_body("wordpress-push", &pages, project_id);
    body["priority"] = json!(7);
    body["maxAttempts"] = json!(5);
    let (status, body) = send(app(&store), post_json("/api/v1/jobs", body)).await;
    assert_eq!(status, StatusCode::CREATED);

    let job_id: Uuid = body["jobIDs"][0].as_str().unwrap().parse().unwrap();
    let job = store.job(job_id).await.unwrap();
    assert_eq!(job.kind, JobKind::WordpressPush);
    assert_eq!(job.priority, 7);
    assert_eq!(job.max_attempts, 5);
}

#[tokio::test]
async fn test_create_jobs_rejects_empty_subjects() {
    let store = MemoryStore::new();
    let (status, body) = send(
        app(&store),
        post_json(
            "/api/v1/jobs",
            enqueue_body("content-generation", &[], new_v7()),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("subject"));
    assert_eq!(store.queue_stats().await.unwrap().total, 0);
}

#[tokio::test]
async fn test_create_jobs_rejects_unknown_kind() {
    let store = MemoryStore::new();
    let (project_id, pages) = seed_pages(&store, 1).await;
    let (status, body) = send(
        app(&store),
        post_json("/api/v1/jobs", enqueue_body("keyword-research", &pages, project_id)),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("keyword-research"));
}

#[tokio::test]
async fn test_list_jobs_filters_by_status() {
    let store = MemoryStore::new();
    let (project_id, pages) = seed_pages(&store, 3).await;
    send(
        app(&store),
        post_json(
            "/api/v1/jobs",
            enqueue_body("content-generation", &pages, project_id),
        ),
    )
    .await;

    let (status, body) = send(app(&store), get("/api/v1/jobs?status=queued&limit=2")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["jobs"].as_array().unwrap().len(), 2);
    assert_eq!(body["total"], 3);

    let (_, body) = send(app(&store), get("/api/v1/jobs?status=failed")).await;
    assert!(body["jobs"].as_array().unwrap().is_empty());

    let (status, _) = send(app(&store), get("/api/v1/jobs?status=stuck")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_get_job_not_found() {
    let store = MemoryStore::new();
    let (status, body) = send(app(&store), get(&format!("/api/v1/jobs/{}", new_v7()))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "Job not found");

    let (status, _) = send(
        app(&store),
        get(&format!("/api/v1/jobs/{}/attempts", new_v7())),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_dispatch_runs_cycle_and_records_attempts() {
    let store = MemoryStore::new();
    let (project_id, pages) = seed_pages(&store, 2).await;
    let (_, created) = send(
        app(&store),
        post_json(
            "/api/v1/jobs",
            enqueue_body("content-generation", &pages, project_id),
        ),
    )
    .await;
    let job_id = created["jobIDs"][0].as_str().unwrap().to_string();

    let (status, body) = send(app(&store), post_empty("/api/v1/dispatch")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["processed"], 2);
    assert_eq!(body["succeeded"], 2);
    assert_eq!(body["failed"], 0);
    assert_eq!(body["results"][0]["success"], true);
    assert!(body["results"][0]["jobID"].is_string());

    let (_, job) = send(app(&store), get(&format!("/api/v1/jobs/{}", job_id))).await;
    assert_eq!(job["status"], "completed");
    assert_eq!(job["attempts"], 1);

    let (_, attempts) = send(
        app(&store),
        get(&format!("/api/v1/jobs/{}/attempts", job_id)),
    )
    .await;
    let attempts = attempts.as_array().unwrap();
    assert_eq!(attempts.len(), 1);
    assert_eq!(attempts[0]["success"], true);

    let (_, stats) = send(app(&store), get("/api/v1/jobs/stats")).await;
    assert_eq!(stats["completed"], 2);
    assert_eq!(stats["queued"], 0);
}

#[tokio::test]
async fn test_dispatch_skips_while_processing() {
    let store = MemoryStore::new();
    let (project_id, pages) = seed_pages(&store, 2).await;
    let (_, created) = send(
        app(&store),
        post_json(
            "/api/v1/jobs",
            enqueue_body("content-generation", &pages, project_id),
        ),
    )
    .await;
    let first: Uuid = created["jobIDs"][0].as_str().unwrap().parse().unwrap();
    store.claim(first).await.unwrap().unwrap();

    let (status, body) = send(app(&store), post_empty("/api/v1/dispatch")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body,
        json!({ "success": true, "skipped": true, "processing": 1 })
    );
    assert_eq!(store.queue_stats().await.unwrap().queued, 1);
}

#[tokio::test]
async fn test_dispatch_requires_bearer_secret() {
    let store = MemoryStore::new();

    let (status, body) = send(
        app_with(&store, Some("s3cret")),
        post_empty("/api/v1/dispatch"),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(body["error"].is_string());

    let wrong = Request::builder()
        .method("POST")
        .uri("/api/v1/dispatch")
        .header(header::AUTHORIZATION, "Bearer nope")
        .body(Body::empty())
        .unwrap();
    let (status, _) = send(app_with(&store, Some("s3cret")), wrong).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let right = Request::builder()
        .method("POST")
        .uri("/api/v1/dispatch")
        .header(header::AUTHORIZATION, "Bearer s3cret")
        .body(Body::empty())
        .unwrap();
    let (status, body) = send(app_with(&store, Some("s3cret")), right).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["processed"], 0);
}

#[tokio::test]
async fn test_dispatch_store_outage_is_500() {
    let store = MemoryStore::new();
    store.set_unavailable(true).await;

    let (status, body) = send(app(&store), post_empty("/api/v1/dispatch")).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(body["error"].as_str().unwrap().starts_with("Database error"));
}
