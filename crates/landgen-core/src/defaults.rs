//! Centralized default values for landgen.
//!
//! Every tunable the dispatcher, the job store and the executors read from the
//! environment falls back to one of these constants.

// =============================================================================
// JOB QUEUE
// =============================================================================

/// Default maximum number of processing attempts per job.
pub const JOB_MAX_ATTEMPTS: i32 = 3;

/// Default job priority when the enqueuer does not supply one.
pub const JOB_PRIORITY: i32 = 0;

/// Error message written on jobs reset by the stuck-job reclaimer.
pub const STUCK_JOB_MESSAGE: &str = "stuck job reset";

/// Default page size for job listings.
pub const JOB_LIST_LIMIT: i64 = 50;

/// Upper bound on job listing page size.
pub const JOB_LIST_MAX_LIMIT: i64 = 500;

// =============================================================================
// DISPATCHER
// =============================================================================

/// Jobs selected per dispatch cycle.
pub const DISPATCH_BATCH_SIZE: i64 = 5;

/// Wall-clock budget for one dispatch cycle, in seconds.
pub const DISPATCH_BUDGET_SECS: u64 = 50;

/// Timeout applied to a single effect executor call, in seconds.
pub const DISPATCH_JOB_TIMEOUT_SECS: u64 = 30;

/// Age after which a `processing` job is presumed abandoned, in seconds.
pub const DISPATCH_STUCK_THRESHOLD_SECS: u64 = 300;

/// Jobs executed concurrently within one cycle (1 = strictly sequential).
pub const DISPATCH_CONCURRENCY: usize = 1;

// =============================================================================
// EFFECT EXECUTORS
// =============================================================================

/// Default OpenAI-compatible API endpoint for content generation.
pub const OPENAI_URL: &str = "https://api.openai.com/v1";

/// Default generation model.
pub const GEN_MODEL: &str = "gpt-4o-mini";

/// Timeout for generation requests in seconds.
pub const GEN_TIMEOUT_SECS: u64 = 25;

/// Timeout for WordPress REST requests in seconds.
pub const WORDPRESS_TIMEOUT_SECS: u64 = 20;

// =============================================================================
// SERVER
// =============================================================================

/// Default bind host for the API server.
pub const SERVER_HOST: &str = "0.0.0.0";

/// Default bind port for the API server.
pub const SERVER_PORT: u16 = 3000;

/// Default database URL.
pub const DATABASE_URL: &str = "postgres://localhost/landgen";
