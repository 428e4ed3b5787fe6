use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use axum::http::{header, HeaderValue, Method};
use tower_http::cors::{AllowOrigin, CorsLayer};
use tracing::{info, warn};

use landgen_api::{router, AppState};
use landgen_core::defaults;
use landgen_db::{Database, PoolConfig};
use landgen_jobs::{dispatcher_for_database, DispatcherConfig};

/// Parse `ALLOWED_ORIGINS` (comma separated) into CORS origins.
fn parse_allowed_origins() -> Vec<HeaderValue> {
    let origins_str = std::env::var("ALLOWED_ORIGINS")
        .unwrap_or_else(|_| "http://localhost:3000".to_string());

    origins_str
        .split(',')
        .filter_map(|s| {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                return None;
            }
            match trimmed.parse::<HeaderValue>() {
                Ok(v) => Some(v),
                Err(e) => {
                    warn!("Invalid CORS origin '{}': {}", trimmed, e);
                    None
                }
            }
        })
        .collect()
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let _log_guard = landgen_jobs::telemetry::init_tracing(
        "landgen_api=info,landgen_jobs=info,landgen_db=info,landgen_inference=info,tower_http=info",
        "landgen-api.log",
    );

    let database_url =
        std::env::var("DATABASE_URL").unwrap_or_else(|_| defaults::DATABASE_URL.to_string());
    let host = std::env::var("HOST").unwrap_or_else(|_| defaults::SERVER_HOST.to_string());
    let port: u16 = std::env::var("PORT")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(defaults::SERVER_PORT);
    let default_max_attempts: i32 = std::env::var("JOB_MAX_ATTEMPTS")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(defaults::JOB_MAX_ATTEMPTS);

    info!("Connecting to database...");
    let db = Database::connect_with_config(&database_url, PoolConfig::from_env())
        .await
        .context("Failed to connect to database")?;
    info!("Database connected");

    info!("Running database migrations...");
    db.migrate().await.context("Failed to run migrations")?;
    info!("Database migrations complete");

    let config = DispatcherConfig::from_env().context("Invalid dispatcher configuration")?;
    info!(
        batch_size = config.batch_size,
        budget_secs = config.budget.as_secs(),
        job_timeout_secs = config.job_timeout.as_secs(),
        stuck_threshold_secs = config.stuck_threshold.as_secs(),
        concurrency = config.concurrency,
        "Dispatcher configured"
    );
    let dispatcher = dispatcher_for_database(&db, config).context("Failed to build dispatcher")?;

    let dispatch_secret = std::env::var("DISPATCH_SECRET").ok();
    if dispatch_secret.as_deref().map_or(true, |s| s.trim().is_empty()) {
        warn!("DISPATCH_SECRET not set, /api/v1/dispatch accepts unauthenticated requests");
    }

    let state = AppState::new(
        Arc::new(db.jobs.clone()),
        Arc::new(db.audit.clone()),
        Arc::new(dispatcher),
    )
    .with_dispatch_secret(dispatch_secret)
    .with_default_max_attempts(default_max_attempts);

    let app = router(state).layer(
        CorsLayer::new()
            .allow_origin(AllowOrigin::list(parse_allowed_origins()))
            .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
            .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE, header::ACCEPT])
            .max_age(std::time::Duration::from_secs(3600)),
    );

    let addr: SocketAddr = format!("{}:{}", host, port).parse()?;
    info!("Starting server on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
