//! # landgen-core
//!
//! Core types, traits, and abstractions for the landgen job queue.
//!
//! This crate provides the data model shared by the job store, the
//! dispatcher and the HTTP API, the error taxonomy the dispatcher classifies
//! failures with, and the repository/executor traits every backend implements.

pub mod defaults;
pub mod error;
pub mod models;
pub mod traits;

// Re-export commonly used types at crate root
pub use error::{Error, Result};
pub use models::*;
pub use traits::*;
