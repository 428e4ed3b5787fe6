//! # landgen-db
//!
//! Persistence layer for the landgen job queue.
//!
//! This crate provides:
//! - Connection pool management
//! - The PostgreSQL job store, page, site and attempt-log repositories
//! - [`MemoryStore`], an in-process implementation of the same traits
//!
//! ## Example
//!
//! ```rust,ignore
//! use landgen_db::{Database, EnqueueRequest, JobKind, JobRepository};
//!
//! let db = Database::connect("postgres://localhost/landgen").await?;
//! let ids = db
//!     .jobs
//!     .enqueue(EnqueueRequest::new(JobKind::ContentGeneration, pages, owner, project))
//!     .await?;
//! ```

pub mod audit;
pub mod jobs;
pub mod memory;
pub mod pages;
pub mod pool;
pub mod sites;

// Always compiled so integration tests of downstream crates can use the fixtures.
pub mod test_fixtures;

// Re-export core types
pub use landgen_core::*;

pub use audit::PgAuditRepository;
pub use jobs::PgJobRepository;
pub use memory::MemoryStore;
pub use pages::PgPageRepository;
pub use pool::{create_pool, create_pool_with_config, PoolConfig};
pub use sites::PgSiteRepository;

/// Combined database context with all repositories.
#[derive(Clone)]
pub struct Database {
    /// The underlying connection pool.
    pub pool: sqlx::Pool<sqlx::Postgres>,
    /// Job store.
    pub jobs: PgJobRepository,
    /// Landing pages.
    pub pages: PgPageRepository,
    /// WordPress connections per project.
    pub sites: PgSiteRepository,
    /// Attempt log.
    pub audit: PgAuditRepository,
}

impl Database {
    /// Create a new Database instance from a connection pool.
    pub fn new(pool: sqlx::Pool<sqlx::Postgres>) -> Self {
        Self {
            jobs: PgJobRepository::new(pool.clone()),
            pages: PgPageRepository::new(pool.clone()),
            sites: PgSiteRepository::new(pool.clone()),
            audit: PgAuditRepository::new(pool.clone()),
            pool,
        }
    }

    /// Create a new Database instance by connecting to the given URL.
    pub async fn connect(url: &str) -> Result<Self> {
        let pool = create_pool(url).await?;
        Ok(Self::new(pool))
    }

    /// Create with custom pool configuration.
    pub async fn connect_with_config(url: &str, config: PoolConfig) -> Result<Self> {
        let pool = create_pool_with_config(url, config).await?;
        Ok(Self::new(pool))
    }

    /// Run pending migrations.
    #[cfg(feature = "migrations")]
    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("../../migrations")
            .run(&self.pool)
            .await
            .map_err(|e| Error::Database(sqlx::Error::Migrate(Box::new(e))))?;
        Ok(())
    }

    /// Get the underlying connection pool.
    pub fn pool(&self) -> &sqlx::Pool<sqlx::Postgres> {
        &self.pool
    }
}
