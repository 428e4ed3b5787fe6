//! WordPress site lookup.

use async_trait::async_trait;
use sqlx::{Pool, Postgres, Row};
use uuid::Uuid;

use landgen_core::{Error, Result, SiteRepository, WordPressSite};

/// PostgreSQL implementation of SiteRepository.
#[derive(Clone)]
pub struct PgSiteRepository {
    pool: Pool<Postgres>,
}

impl PgSiteRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Insert or replace the site a project publishes to.
    pub async fn upsert(&self, site: &WordPressSite) -> Result<()> {
        sqlx::query(
            "INSERT INTO wordpress_sites (project_id, site_url, username, app_password)
             VALUES ($1, $2, $3, $4)
             ON CONFLICT (project_id) DO UPDATE
             SET site_url = EXCLUDED.site_url, username = EXCLUDED.username,
                 app_password = EXCLUDED.app_password",
        )
        .bind(site.project_id)
        .bind(&site.site_url)
        .bind(&site.username)
        .bind(&site.app_password)
        .execute(&self.pool)
        .await
        .map_err(Error::Database)?;
        Ok(())
    }
}

#[async_trait]
impl SiteRepository for PgSiteRepository {
    async fn get_for_project(&self, project_id: Uuid) -> Result<Option<WordPressSite>> {
        let row = sqlx::query(
            "SELECT project_id, site_url, username, app_password
             FROM wordpress_sites WHERE project_id = $1",
        )
        .bind(project_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(Error::Database)?;

        row.map(|r| {
            Ok(WordPressSite {
                project_id: r.try_get("project_id")?,
                site_url: r.try_get("site_url")?,
                username: r.try_get("username")?,
                app_password: r.try_get("app_password")?,
            })
        })
        .transpose()
    }
}
