//! # landgen-jobs
//!
//! Job dispatching for landgen.
//!
//! This crate provides:
//! - [`Dispatcher`], the stateless one-shot dispatch cycle
//! - Job handlers for content generation and WordPress pushes
//! - The WordPress publisher effect executor
//! - Failure classification and page status projection
//!
//! ## Example
//!
//! ```rust,ignore
//! use landgen_jobs::{Dispatcher, DispatcherConfig, DispatchOutcome};
//!
//! let dispatcher = landgen_jobs::dispatcher_for_database(&db, DispatcherConfig::from_env()?)?;
//! match dispatcher.run_cycle().await? {
//!     DispatchOutcome::Skipped { processing, .. } => println!("busy: {processing}"),
//!     DispatchOutcome::Completed(summary) => println!("{} processed", summary.processed),
//! }
//! ```

use std::sync::Arc;

use landgen_core::Result;
use landgen_db::Database;
use landgen_inference::OpenAIContentGenerator;

pub mod adapters;
pub mod classify;
pub mod config;
pub mod content_handler;
pub mod dispatcher;
pub mod handler;
pub mod projector;
pub mod publish_handler;
pub mod telemetry;

pub use adapters::{WordPressConfig, WordPressPublisher};
pub use classify::{classify, FailureClass};
pub use config::{DispatcherConfig, SubjectErrorPolicy};
pub use content_handler::ContentGenerationHandler;
pub use dispatcher::{DispatchOutcome, DispatchSummary, Dispatcher, JobRunResult};
pub use handler::{JobContext, JobHandler, JobOutput};
pub use projector::StatusProjector;
pub use publish_handler::WordPressPushHandler;

/// Build a dispatcher over PostgreSQL with the production executors.
///
/// The content generator and WordPress publisher read their settings from
/// the environment.
pub fn dispatcher_for_database(db: &Database, config: DispatcherConfig) -> Result<Dispatcher> {
    let generator = Arc::new(OpenAIContentGenerator::from_env()?);
    let publisher = Arc::new(WordPressPublisher::from_env()?);

    Ok(Dispatcher::new(
        Arc::new(db.jobs.clone()),
        Arc::new(db.pages.clone()),
        Arc::new(db.audit.clone()),
        config,
    )
    .with_handler(ContentGenerationHandler::new(generator))
    .with_handler(WordPressPushHandler::new(
        publisher,
        Arc::new(db.sites.clone()),
    )))
}
