//! OpenAI-compatible content generator.
//!
//! Works with any endpoint that speaks the chat completions API (OpenAI,
//! Azure OpenAI, OpenRouter, Ollama in compatibility mode, vLLM, ...).
//!
//! # Example
//!
//! ```rust,no_run
//! use landgen_inference::openai::{OpenAIConfig, OpenAIContentGenerator};
//!
//! // From environment variables
//! let generator = OpenAIContentGenerator::from_env().unwrap();
//!
//! // Or with custom config
//! let config = OpenAIConfig {
//!     base_url: "http://localhost:11434/v1".to_string(),
//!     api_key: None,
//!     gen_model: "llama3".to_string(),
//!     timeout_seconds: 25,
//! };
//! let generator = OpenAIContentGenerator::new(config).unwrap();
//! ```

mod backend;
mod error;
mod types;

pub use backend::{OpenAIConfig, OpenAIContentGenerator};
pub use error::{to_landgen_error, OpenAIErrorCode};
pub use types::*;
