//! # landgen-inference
//!
//! Content generation backend for landgen.
//!
//! Provides [`OpenAIContentGenerator`], a [`landgen_core::ContentGenerator`]
//! that talks to any OpenAI-compatible `/chat/completions` endpoint and turns
//! the model's JSON answer into [`landgen_core::GeneratedContent`].

pub mod openai;
pub mod prompt;

pub use openai::{OpenAIConfig, OpenAIContentGenerator};
