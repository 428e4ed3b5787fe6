//! Landing page repository implementation.

use async_trait::async_trait;
use chrono::Utc;
use sqlx::{postgres::PgRow, Pool, Postgres, Row};
use uuid::Uuid;

use landgen_core::{
    Error, GeneratedContent, Page, PageRepository, PageStatus, PublishedPage, Result,
};

/// PostgreSQL implementation of PageRepository.
#[derive(Clone)]
pub struct PgPageRepository {
    pool: Pool<Postgres>,
}

impl PgPageRepository {
    /// Create a new PgPageRepository with the given connection pool.
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    fn parse_page_row(row: &PgRow) -> Result<Page> {
        let status: String = row.try_get("status")?;
        Ok(Page {
            id: row.try_get("id")?,
            owner_id: row.try_get("owner_id")?,
            project_id: row.try_get("project_id")?,
            location: row.try_get("location")?,
            keyword: row.try_get("keyword")?,
            slug: row.try_get("slug")?,
            status: status.parse()?,
            title: row.try_get("title")?,
            body: row.try_get("body")?,
            meta_title: row.try_get("meta_title")?,
            meta_description: row.try_get("meta_description")?,
            wp_page_id: row.try_get("wp_page_id")?,
            wp_page_url: row.try_get("wp_page_url")?,
            error_message: row.try_get("error_message")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }

    /// Insert a page. Used by seeding and integration tests; page authoring
    /// itself lives outside the job core.
    pub async fn insert(&self, page: &Page) -> Result<()> {
        sqlx::query(
            "INSERT INTO pages (id, owner_id, project_id, location, keyword, slug, status,
                                title, body, meta_title, meta_description, wp_page_id,
                                wp_page_url, error_message, created_at, updated_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7::page_status, $8, $9, $10, $11, $12,
                     $13, $14, $15, $16)",
        )
        .bind(page.id)
        .bind(page.owner_id)
        .bind(page.project_id)
        .bind(&page.location)
        .bind(&page.keyword)
        .bind(&page.slug)
        .bind(page.status.as_str())
        .bind(&page.title)
        .bind(&page.body)
        .bind(&page.meta_title)
        .bind(&page.meta_description)
        .bind(page.wp_page_id)
        .bind(&page.wp_page_url)
        .bind(&page.error_message)
        .bind(page.created_at)
        .bind(page.updated_at)
        .execute(&self.pool)
        .await
        .map_err(Error::Database)?;
        Ok(())
    }
}

#[async_trait]
impl PageRepository for PgPageRepository {
    async fn get(&self, page_id: Uuid) -> Result<Option<Page>> {
        let row = sqlx::query(
            "SELECT id, owner_id, project_id, location, keyword, slug, status::text AS status,
                    title, body, meta_title, meta_description, wp_page_id, wp_page_url,
                    error_message, created_at, updated_at
             FROM pages WHERE id = $1",
        )
        .bind(page_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(Error::Database)?;

        row.as_ref().map(Self::parse_page_row).transpose()
    }

    async fn set_status(
        &self,
        page_id: Uuid,
        status: PageStatus,
        error: Option<&str>,
    ) -> Result<()> {
        let error = if status == PageStatus::Error { error } else { None };
        sqlx::query(
            "UPDATE pages SET status = $2::page_status, error_message = $3, updated_at = $4
             WHERE id = $1",
        )
        .bind(page_id)
        .bind(status.as_str())
        .bind(error)
        .bind(Utc::now())
        .execute(&self.pool)
        .await
        .map_err(Error::Database)?;
        Ok(())
    }

    async fn record_content(&self, page_id: Uuid, content: &GeneratedContent) -> Result<()> {
        let result = sqlx::query(
            "UPDATE pages
             SET title = $2, body = $3, meta_title = $4, meta_description = $5,
                 status = 'generated'::page_status, error_message = NULL, updated_at = $6
             WHERE id = $1",
        )
        .bind(page_id)
        .bind(&content.title)
        .bind(&content.body)
        .bind(&content.meta_title)
        .bind(&content.meta_description)
        .bind(Utc::now())
        .execute(&self.pool)
        .await
        .map_err(Error::Database)?;

        if result.rows_affected() == 0 {
            return Err(Error::NotFound(format!("page {}", page_id)));
        }
        Ok(())
    }

    async fn record_publication(&self, page_id: Uuid, published: &PublishedPage) -> Result<()> {
        let result = sqlx::query(
            "UPDATE pages
             SET wp_page_id = $2, wp_page_url = $3, status = 'pushed'::page_status,
                 error_message = NULL, updated_at = $4
             WHERE id = $1",
        )
        .bind(page_id)
        .bind(published.page_id)
        .bind(&published.page_url)
        .bind(Utc::now())
        .execute(&self.pool)
        .await
        .map_err(Error::Database)?;

        if result.rows_affected() == 0 {
            return Err(Error::NotFound(format!("page {}", page_id)));
        }
        Ok(())
    }
}
