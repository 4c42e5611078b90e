//! Error types, one per failure domain.
//!
//! Only [`RequestError`] ever reaches a client. Everything else happens after
//! the acknowledgment has been sent and ends up in the logs.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;

use crate::orchestrator::Phase;

/// Synchronous rejection of an inbound task.
#[derive(Debug, thiserror::Error)]
pub enum RequestError {
    #[error("secret does not match")]
    Authentication,
    #[error("{0}")]
    Validation(String),
}

impl RequestError {
    pub fn status(&self) -> StatusCode {
        match self {
            RequestError::Authentication => StatusCode::UNAUTHORIZED,
            RequestError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
        }
    }

    fn kind(&self) -> &'static str {
        match self {
            RequestError::Authentication => "unauthorized",
            RequestError::Validation(_) => "invalid_request",
        }
    }
}

impl IntoResponse for RequestError {
    fn into_response(self) -> Response {
        let body = serde_json::json!({
            "error": self.kind(),
            "detail": self.to_string(),
        });
        (self.status(), Json(body)).into_response()
    }
}

/// The AI provider call failed or produced nothing usable.
#[derive(Debug, thiserror::Error)]
pub enum GenerateError {
    #[error("AI provider request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("AI provider returned {status}: {body}")]
    Status {
        status: reqwest::StatusCode,
        body: String,
    },
    #[error("AI provider returned no content")]
    Empty,
}

/// A GitHub API call failed.
#[derive(Debug, thiserror::Error)]
pub enum PublishError {
    #[error("repository {0} already exists")]
    RepositoryExists(String),
    #[error("repository {0} not found")]
    RepositoryNotFound(String),
    #[error("{path} not found in repository {repo}")]
    FileNotFound { repo: String, path: String },
    #[error("GitHub request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("GitHub returned {status} while trying to {action}: {body}")]
    Status {
        action: &'static str,
        status: reqwest::StatusCode,
        body: String,
    },
    #[error("unreadable content for {path}: {reason}")]
    Content { path: String, reason: String },
}

/// The evaluation callback could not be delivered.
#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    #[error("callback request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("callback returned {status}: {body}")]
    Status {
        status: reqwest::StatusCode,
        body: String,
    },
}

/// Why a background run ended in the failed phase.
#[derive(Debug, thiserror::Error)]
pub enum RunError {
    #[error("generation failed: {0}")]
    Generate(#[from] GenerateError),
    #[error("publishing failed: {0}")]
    Publish(#[from] PublishError),
}

/// A failed run and the phase it stopped in.
#[derive(Debug, thiserror::Error)]
#[error("{error} (while {phase})")]
pub struct RunFailure {
    pub phase: Phase,
    pub error: RunError,
}

impl RunFailure {
    pub fn new(phase: Phase, error: impl Into<RunError>) -> Self {
        Self {
            phase,
            error: error.into(),
        }
    }
}
