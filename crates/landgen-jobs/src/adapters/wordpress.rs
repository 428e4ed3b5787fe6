//! WordPress publisher - pushes pages through the WordPress REST API.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use landgen_core::{
    defaults, Error, GeneratedContent, Page, PagePublisher, PublishedPage, Result, WordPressSite,
};

/// REST route for pages, relative to the site root.
const PAGES_ROUTE: &str = "/wp-json/wp/v2/pages";

/// Statuses searched when looking a page up by slug.
const LOOKUP_STATUSES: &str = "publish,future,draft,pending,private";

/// Configuration for the WordPress publisher.
#[derive(Debug, Clone)]
pub struct WordPressConfig {
    /// Request timeout in seconds. Keep below the dispatcher's per-job timeout.
    pub timeout_seconds: u64,
    /// Status given to pushed pages.
    pub publish_status: String,
}

impl Default for WordPressConfig {
    fn default() -> Self {
        Self {
            timeout_seconds: defaults::WORDPRESS_TIMEOUT_SECS,
            publish_status: "publish".to_string(),
        }
    }
}

impl WordPressConfig {
    /// Read configuration from environment variables.
    ///
    /// | Variable | Default |
    /// |----------|---------|
    /// | `WORDPRESS_TIMEOUT_SECS` | `20` |
    /// | `WORDPRESS_PUBLISH_STATUS` | `publish` |
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            timeout_seconds: std::env::var("WORDPRESS_TIMEOUT_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.timeout_seconds),
            publish_status: std::env::var("WORDPRESS_PUBLISH_STATUS")
                .ok()
                .filter(|v| !v.trim().is_empty())
                .unwrap_or(defaults.publish_status),
        }
    }
}

#[derive(Debug, Serialize)]
struct PagePayload<'a> {
    title: &'a str,
    content: &'a str,
    slug: &'a str,
    status: &'a str,
    excerpt: &'a str,
}

#[derive(Debug, Deserialize)]
struct WpPage {
    id: i64,
    #[serde(default)]
    link: String,
}

/// Publishes pages to WordPress with application-password basic auth.
///
/// Publishing is an upsert keyed on the page: a known `wp_page_id` is
/// updated in place, otherwise an existing page with the same slug is
/// updated, otherwise a new page is created. Running it twice for the same
/// page leaves a single WordPress page.
pub struct WordPressPublisher {
    client: Client,
    config: WordPressConfig,
}

impl WordPressPublisher {
    pub fn new(config: WordPressConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()
            .map_err(|e| Error::Config(format!("Failed to create HTTP client: {}", e)))?;

        info!(
            subsystem = "jobs",
            component = "wordpress",
            timeout_secs = config.timeout_seconds,
            publish_status = %config.publish_status,
            "Initializing WordPress publisher"
        );

        Ok(Self { client, config })
    }

    pub fn from_env() -> Result<Self> {
        Self::new(WordPressConfig::from_env())
    }

    fn pages_url(site: &WordPressSite) -> String {
        format!("{}{}", site.site_url.trim_end_matches('/'), PAGES_ROUTE)
    }

    fn authed(&self, req: RequestBuilder, site: &WordPressSite) -> RequestBuilder {
        req.basic_auth(&site.username, Some(&site.app_password))
    }

    /// Update an existing WordPress page. `Ok(None)` when it no longer exists.
    async fn update(
        &self,
        site: &WordPressSite,
        wp_page_id: i64,
        payload: &PagePayload<'_>,
    ) -> Result<Option<WpPage>> {
        let url = format!("{}/{}", Self::pages_url(site), wp_page_id);
        let response = self
            .authed(self.client.post(&url), site)
            .json(payload)
            .send()
            .await
            .map_err(transport_error)?;

        if response.status() == StatusCode::NOT_FOUND
            || response.status() == StatusCode::GONE
        {
            return Ok(None);
        }
        Ok(Some(parse_page(response).await?))
    }

    async fn find_by_slug(&self, site: &WordPressSite, slug: &str) -> Result<Option<WpPage>> {
        let response = self
            .authed(self.client.get(Self::pages_url(site)), site)
            .query(&[("slug", slug), ("status", LOOKUP_STATUSES)])
            .send()
            .await
            .map_err(transport_error)?;

        let response = check_status(response).await?;
        let pages: Vec<WpPage> = response
            .json()
            .await
            .map_err(|e| Error::ExternalService(format!("Invalid WordPress response: {}", e)))?;
        Ok(pages.into_iter().next())
    }

    async fn create(&self, site: &WordPressSite, payload: &PagePayload<'_>) -> Result<WpPage> {
        let response = self
            .authed(self.client.post(Self::pages_url(site)), site)
            .json(payload)
            .send()
            .await
            .map_err(transport_error)?;
        parse_page(response).await
    }
}

#[async_trait]
impl PagePublisher for WordPressPublisher {
    async fn publish(
        &self,
        page: &Page,
        content: &GeneratedContent,
        site: &WordPressSite,
    ) -> Result<PublishedPage> {
        let payload = PagePayload {
            title: &content.title,
            content: &content.body,
            slug: &page.slug,
            status: &self.config.publish_status,
            excerpt: &content.meta_description,
        };

        let mut published = None;
        if let Some(wp_page_id) = page.wp_page_id {
            published = self.update(site, wp_page_id, &payload).await?;
        }
        if published.is_none() {
            if let Some(existing) = self.find_by_slug(site, &page.slug).await? {
                published = self.update(site, existing.id, &payload).await?;
            }
        }
        let wp_page = match published {
            Some(wp_page) => wp_page,
            None => self.create(site, &payload).await?,
        };

        debug!(
            subsystem = "jobs",
            component = "wordpress",
            op = "publish",
            subject_id = %page.id,
            wp_page_id = wp_page.id,
            "WordPress page upserted"
        );

        Ok(PublishedPage {
            page_id: wp_page.id,
            page_url: wp_page.link,
        })
    }
}

fn transport_error(e: reqwest::Error) -> Error {
    Error::ExternalService(format!("WordPress request failed: {}", e))
}

/// Map a non-success WordPress response onto the failure taxonomy.
async fn check_status(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    let detail: String = body.chars().take(200).collect();
    let message = format!("WordPress returned {}: {}", status, detail);

    Err(match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Error::Config(message),
        StatusCode::BAD_REQUEST | StatusCode::UNPROCESSABLE_ENTITY => Error::Validation(message),
        StatusCode::NOT_FOUND => Error::Config(message),
        _ => Error::ExternalService(message),
    })
}

async fn parse_page(response: Response) -> Result<WpPage> {
    check_status(response)
        .await?
        .json()
        .await
        .map_err(|e| Error::ExternalService(format!("Invalid WordPress response: {}", e)))
}
