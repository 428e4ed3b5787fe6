//! HTTP handlers for landgen-api.

pub mod dispatch;
pub mod jobs;
