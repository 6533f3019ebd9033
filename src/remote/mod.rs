// ABOUTME: Remote processing API module
// ABOUTME: Typed HTTP client and wire models for submit, status and download

pub mod client;
pub mod models;

pub use client::ApiClient;
pub use models::{FileLabel, JobStatus, SubmitResponse};
