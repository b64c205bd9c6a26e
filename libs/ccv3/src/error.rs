//! Error types for the Cloud Controller client

use http::StatusCode;
use thiserror::Error;

use crate::models::ErrorResponse;

/// Errors returned by Cloud Controller requests
#[derive(Error, Debug)]
pub enum ClientError {
    #[error("HTTP error: {0}")]
    Request(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Resource not found: {0}")]
    ResourceNotFound(String),

    #[error("{detail} (status {status})")]
    Api { status: StatusCode, detail: String },

    #[error("Job {job_url} failed: {detail}")]
    JobFailed { job_url: String, detail: String },

    #[error("Timed out waiting for job {job_url}")]
    JobTimeout { job_url: String },

    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

impl ClientError {
    /// Map a non-success response onto an error kind
    pub fn from_response(status: StatusCode, body: &str) -> Self {
        let detail = serde_json::from_str::<ErrorResponse>(body)
            .ok()
            .and_then(|response| response.errors.into_iter().next())
            .map(|error| error.detail)
            .filter(|detail| !detail.is_empty())
            .unwrap_or_else(|| body.to_string());

        if status == StatusCode::NOT_FOUND {
            ClientError::ResourceNotFound(detail)
        } else {
            ClientError::Api { status, detail }
        }
    }
}
