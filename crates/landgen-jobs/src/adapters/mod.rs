//! Effect executor adapters.

pub mod wordpress;

pub use wordpress::{WordPressConfig, WordPressPublisher};
