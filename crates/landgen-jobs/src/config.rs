//! Dispatcher configuration.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use landgen_core::{defaults, Error, Result};

/// When a failed attempt becomes visible on the page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SubjectErrorPolicy {
    /// The page shows `error` after any failed attempt, even if a retry is queued.
    #[default]
    Immediate,
    /// The page keeps its in-flight status while retries remain.
    OnExhaustion,
}

impl SubjectErrorPolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            SubjectErrorPolicy::Immediate => "immediate",
            SubjectErrorPolicy::OnExhaustion => "on_exhaustion",
        }
    }
}

impl fmt::Display for SubjectErrorPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SubjectErrorPolicy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "immediate" => Ok(SubjectErrorPolicy::Immediate),
            "on_exhaustion" | "on-exhaustion" => Ok(SubjectErrorPolicy::OnExhaustion),
            other => Err(Error::Config(format!(
                "Invalid subject error policy: {}",
                other
            ))),
        }
    }
}

/// Configuration for one dispatch cycle.
#[derive(Debug, Clone)]
pub struct DispatcherConfig {
    /// Maximum jobs dequeued per cycle.
    pub batch_size: i64,
    /// Wall-clock budget for starting jobs within a cycle.
    pub budget: Duration,
    /// Upper bound for a single job's executor call.
    pub job_timeout: Duration,
    /// Age after which a `processing` job is considered abandoned.
    pub stuck_threshold: Duration,
    /// Jobs run at once within a cycle. 1 means strictly sequential.
    pub concurrency: usize,
    pub subject_error_policy: SubjectErrorPolicy,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            batch_size: defaults::DISPATCH_BATCH_SIZE,
            budget: Duration::from_secs(defaults::DISPATCH_BUDGET_SECS),
            job_timeout: Duration::from_secs(defaults::DISPATCH_JOB_TIMEOUT_SECS),
            stuck_threshold: Duration::from_secs(defaults::DISPATCH_STUCK_THRESHOLD_SECS),
            concurrency: defaults::DISPATCH_CONCURRENCY,
            subject_error_policy: SubjectErrorPolicy::default(),
        }
    }
}

fn env_parse<T: FromStr>(name: &str) -> Option<T> {
    std::env::var(name).ok().and_then(|v| v.trim().parse().ok())
}

impl DispatcherConfig {
    /// Create config from environment variables (with defaults).
    ///
    /// | Variable | Default | Description |
    /// |----------|---------|-------------|
    /// | `DISPATCH_BATCH_SIZE` | `5` | Jobs dequeued per cycle |
    /// | `DISPATCH_BUDGET_SECS` | `50` | Cycle time budget |
    /// | `DISPATCH_JOB_TIMEOUT_SECS` | `30` | Per-job timeout |
    /// | `DISPATCH_STUCK_THRESHOLD_SECS` | `300` | Stuck job threshold |
    /// | `DISPATCH_CONCURRENCY` | `1` | Jobs run at once |
    /// | `DISPATCH_SUBJECT_ERROR_POLICY` | `immediate` | `immediate` or `on_exhaustion` |
    ///
    /// Fails only on an unrecognised error policy; malformed numbers fall
    /// back to their defaults.
    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();

        let subject_error_policy = match std::env::var("DISPATCH_SUBJECT_ERROR_POLICY") {
            Ok(v) if !v.trim().is_empty() => v.parse()?,
            _ => defaults.subject_error_policy,
        };

        Ok(Self {
            batch_size: env_parse::<i64>("DISPATCH_BATCH_SIZE")
                .unwrap_or(defaults.batch_size)
                .max(1),
            budget: env_parse::<u64>("DISPATCH_BUDGET_SECS")
                .map(Duration::from_secs)
                .unwrap_or(defaults.budget),
            job_timeout: env_parse::<u64>("DISPATCH_JOB_TIMEOUT_SECS")
                .map(Duration::from_secs)
                .unwrap_or(defaults.job_timeout),
            stuck_threshold: env_parse::<u64>("DISPATCH_STUCK_THRESHOLD_SECS")
                .map(Duration::from_secs)
                .unwrap_or(defaults.stuck_threshold),
            concurrency: env_parse::<usize>("DISPATCH_CONCURRENCY")
                .unwrap_or(defaults.concurrency)
                .max(1),
            subject_error_policy,
        })
    }

    pub fn with_batch_size(mut self, batch_size: i64) -> Self {
        self.batch_size = batch_size;
        self
    }

    pub fn with_budget(mut self, budget: Duration) -> Self {
        self.budget = budget;
        self
    }

    pub fn with_job_timeout(mut self, timeout: Duration) -> Self {
        self.job_timeout = timeout;
        self
    }

    pub fn with_stuck_threshold(mut self, threshold: Duration) -> Self {
        self.stuck_threshold = threshold;
        self
    }

    /// Set concurrency (clamped to at least 1).
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    pub fn with_subject_error_policy(mut self, policy: SubjectErrorPolicy) -> Self {
        self.subject_error_policy = policy;
        self
    }
}
