//! Prompt construction and answer parsing for landing page generation.

use regex::Regex;
use serde::Deserialize;

use landgen_core::{Error, GeneratedContent, Page, Result};

/// Upper bound for the meta description, in characters.
pub const META_DESCRIPTION_MAX_CHARS: usize = 160;

/// System prompt fixing the answer shape.
pub const SYSTEM_PROMPT: &str = "You are an SEO copywriter producing local landing pages. \
Answer with a single JSON object and nothing else, using the keys \
\"title\", \"body\", \"meta_title\" and \"meta_description\". \
\"body\" is HTML using <h2>, <p> and <ul> only. \
\"meta_description\" is at most 160 characters.";

/// User prompt for one page.
pub fn build_user_prompt(page: &Page) -> String {
    format!(
        "Write a landing page for the service \"{keyword}\" in \"{location}\".\n\
         The page will be published at the slug \"{slug}\".\n\
         Mention {location} naturally in the title, the first paragraph and the meta title.",
        keyword = page.keyword,
        location = page.location,
        slug = page.slug,
    )
}

#[derive(Debug, Deserialize)]
struct RawContent {
    #[serde(default)]
    title: String,
    #[serde(default)]
    body: String,
    #[serde(default)]
    meta_title: Option<String>,
    #[serde(default)]
    meta_description: Option<String>,
}

/// Pull the JSON object out of a model answer.
///
/// Accepts a bare object, an object inside a ```json fence, or an object
/// surrounded by prose.
fn extract_json(raw: &str) -> Result<&str> {
    let fence = Regex::new(r"(?s)```(?:json)?\s*(\{.*\})\s*```")
        .map_err(|e| Error::Internal(format!("Invalid fence pattern: {}", e)))?;
    if let Some(inner) = fence.captures(raw).and_then(|c| c.get(1)) {
        return Ok(inner.as_str());
    }

    match (raw.find('{'), raw.rfind('}')) {
        (Some(start), Some(end)) if start < end => Ok(&raw[start..=end]),
        _ => Err(malformed("no JSON object in answer")),
    }
}

fn malformed(detail: impl std::fmt::Display) -> Error {
    // Retryable: the next sample may parse.
    Error::ExternalService(format!("Model returned malformed content: {}", detail))
}

/// Parse the model answer into page content.
pub fn parse_generated(raw: &str) -> Result<GeneratedContent> {
    let json = extract_json(raw)?;
    let parsed: RawContent = serde_json::from_str(json).map_err(malformed)?;

    let title = parsed.title.trim().to_string();
    let body = parsed.body.trim().to_string();
    if title.is_empty() {
        return Err(malformed("empty title"));
    }
    if body.is_empty() {
        return Err(malformed("empty body"));
    }

    let meta_title = parsed
        .meta_title
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
        .unwrap_or_else(|| title.clone());
    let meta_description: String = parsed
        .meta_description
        .unwrap_or_default()
        .trim()
        .chars()
        .take(META_DESCRIPTION_MAX_CHARS)
        .collect();

    Ok(GeneratedContent {
        title,
        body,
        meta_title,
        meta_description,
    })
}
