//! OpenAI-compatible content generator implementation.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::Client;
use tracing::{debug, info};

use landgen_core::{defaults, ContentGenerator, Error, GeneratedContent, Page, Result};

use super::error::{to_landgen_error, OpenAIErrorCode};
use super::types::*;
use crate::prompt::{build_user_prompt, parse_generated, SYSTEM_PROMPT};

/// Sampling temperature for page copy.
const GEN_TEMPERATURE: f32 = 0.7;

/// Configuration for the OpenAI-compatible generator.
#[derive(Debug, Clone)]
pub struct OpenAIConfig {
    /// Base URL for the API endpoint.
    pub base_url: String,
    /// API key for authentication (optional for local endpoints).
    pub api_key: Option<String>,
    /// Model to use for generation.
    pub gen_model: String,
    /// Request timeout in seconds. Keep below the dispatcher's per-job timeout.
    pub timeout_seconds: u64,
}

impl Default for OpenAIConfig {
    fn default() -> Self {
        Self {
            base_url: defaults::OPENAI_URL.to_string(),
            api_key: None,
            gen_model: defaults::GEN_MODEL.to_string(),
            timeout_seconds: defaults::GEN_TIMEOUT_SECS,
        }
    }
}

impl OpenAIConfig {
    /// Read configuration from environment variables.
    ///
    /// | Variable | Default |
    /// |----------|---------|
    /// | `OPENAI_BASE_URL` | `https://api.openai.com/v1` |
    /// | `OPENAI_API_KEY` | none |
    /// | `OPENAI_GEN_MODEL` | `gpt-4o-mini` |
    /// | `OPENAI_TIMEOUT` | `25` |
    pub fn from_env() -> Self {
        Self {
            base_url: std::env::var("OPENAI_BASE_URL")
                .unwrap_or_else(|_| defaults::OPENAI_URL.to_string()),
            api_key: std::env::var("OPENAI_API_KEY")
                .ok()
                .filter(|k| !k.is_empty()),
            gen_model: std::env::var("OPENAI_GEN_MODEL")
                .unwrap_or_else(|_| defaults::GEN_MODEL.to_string()),
            timeout_seconds: std::env::var("OPENAI_TIMEOUT")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults::GEN_TIMEOUT_SECS),
        }
    }
}

/// Content generator backed by an OpenAI-compatible chat completions API.
pub struct OpenAIContentGenerator {
    client: Client,
    config: OpenAIConfig,
}

impl OpenAIContentGenerator {
    /// Create a new generator with the given configuration.
    pub fn new(config: OpenAIConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()
            .map_err(|e| Error::Config(format!("Failed to create HTTP client: {}", e)))?;

        info!(
            subsystem = "inference",
            component = "openai",
            url = %config.base_url,
            model = %config.gen_model,
            timeout_secs = config.timeout_seconds,
            "Initializing OpenAI content generator"
        );

        Ok(Self { client, config })
    }

    /// Create from environment variables.
    pub fn from_env() -> Result<Self> {
        Self::new(OpenAIConfig::from_env())
    }

    /// Get the current configuration.
    pub fn config(&self) -> &OpenAIConfig {
        &self.config
    }

    /// Build a request with authentication if configured.
    fn build_request(&self, endpoint: &str) -> reqwest::RequestBuilder {
        let url = format!("{}{}", self.config.base_url.trim_end_matches('/'), endpoint);
        let mut req = self.client.post(&url);

        if let Some(ref api_key) = self.config.api_key {
            req = req.header("Authorization", format!("Bearer {}", api_key));
        }

        req.header("Content-Type", "application/json")
    }

    async fn complete(&self, messages: Vec<ChatMessage>) -> Result<String> {
        let request = ChatCompletionRequest {
            model: self.config.gen_model.clone(),
            messages,
            temperature: Some(GEN_TEMPERATURE),
            max_tokens: None,
            response_format: Some(ResponseFormat::json_object()),
        };

        let response = self
            .build_request("/chat/completions")
            .json(&request)
            .send()
            .await
            .map_err(|e| Error::ExternalService(format!("Request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let (error_type, message) = match response.json::<OpenAIErrorResponse>().await {
                Ok(body) => (body.error.error_type, body.error.message),
                Err(_) => ("unknown".to_string(), "Unknown error".to_string()),
            };
            let code = OpenAIErrorCode::from_response(status.as_u16(), &error_type);
            return Err(to_landgen_error(
                code,
                &format!("OpenAI returned {}: {}", status, message),
            ));
        }

        let result: ChatCompletionResponse = response
            .json()
            .await
            .map_err(|e| Error::ExternalService(format!("Failed to parse response: {}", e)))?;

        Ok(result
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .unwrap_or_default())
    }
}

#[async_trait]
impl ContentGenerator for OpenAIContentGenerator {
    async fn generate(&self, page: &Page) -> Result<GeneratedContent> {
        let start = Instant::now();
        let messages = vec![
            ChatMessage::system(SYSTEM_PROMPT),
            ChatMessage::user(build_user_prompt(page)),
        ];

        let raw = self.complete(messages).await?;
        let content = parse_generated(&raw)?;

        debug!(
            subsystem = "inference",
            component = "openai",
            op = "generate",
            subject_id = %page.id,
            model = %self.config.gen_model,
            body_len = content.body.len(),
            duration_ms = start.elapsed().as_millis() as u64,
            "Page content generated"
        );
        Ok(content)
    }

    fn model_name(&self) -> &str {
        &self.config.gen_model
    }
}
