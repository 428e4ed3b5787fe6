//! Run a single dispatch cycle and print its summary as JSON.
//!
//! Intended for a cron entry. Exits non-zero when the job store is
//! unreachable; individual job failures are reported in the summary.

use anyhow::Context;
use serde_json::json;
use tracing::error;

use landgen_core::defaults;
use landgen_db::{Database, PoolConfig};
use landgen_jobs::{dispatcher_for_database, DispatchOutcome, DispatcherConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let _log_guard = landgen_jobs::telemetry::init_tracing(
        "landgen_jobs=info,landgen_db=info,landgen_inference=info",
        "landgen-dispatch.log",
    );

    let database_url =
        std::env::var("DATABASE_URL").unwrap_or_else(|_| defaults::DATABASE_URL.to_string());
    let db = Database::connect_with_config(&database_url, PoolConfig::from_env())
        .await
        .context("Failed to connect to database")?;

    let config = DispatcherConfig::from_env().context("Invalid dispatcher configuration")?;
    let dispatcher =
        dispatcher_for_database(&db, config).context("Failed to build dispatcher")?;

    let outcome = match dispatcher.run_cycle().await {
        Ok(outcome) => outcome,
        Err(e) => {
            error!(error = %e, "Dispatch cycle aborted");
            return Err(e).context("Dispatch cycle aborted");
        }
    };

    let body = match outcome {
        DispatchOutcome::Skipped { processing, .. } => json!({
            "success": true,
            "skipped": true,
            "processing": processing,
        }),
        DispatchOutcome::Completed(summary) => {
            let mut body = serde_json::to_value(&summary)?;
            body["success"] = json!(true);
            body
        }
    };
    println!("{}", serde_json::to_string_pretty(&body)?);
    Ok(())
}
