use axum::{Json, http::StatusCode, response::IntoResponse};
use orbitcache_gaps::PropagationError;
use orbitcache_schema::ValidationError;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error as ThisError;

use super::IsRetryable;

#[derive(Debug, ThisError)]
pub enum OrbitError {
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Upstream error with status: {0}")]
    UpstreamStatus(StatusCode),

    #[error("HTTP request error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Database error: {0}")]
    Storage(#[from] sqlx::Error),

    #[error("Propagation error: {0}")]
    Propagation(#[from] PropagationError),

    #[error("Migration error: {0}")]
    Migration(String),

    #[error("Ractor error: {0}")]
    Actor(String),

    #[error("Cannot {action} while {from}")]
    InvalidTransition {
        from: &'static str,
        action: &'static str,
    },

    #[error("Invalid query: {0}")]
    InvalidQuery(String),

    #[error("{0} not found")]
    NotFound(&'static str),
}

impl IntoResponse for OrbitError {
    fn into_response(self) -> axum::response::Response {
        let (status, error_body) = match self {
            OrbitError::Storage(_)
            | OrbitError::Actor(_)
            | OrbitError::Migration(_)
            | OrbitError::Propagation(_) => {
                let status = StatusCode::INTERNAL_SERVER_ERROR;
                let body = ApiErrorObject {
                    code: "INTERNAL_ERROR".to_string(),
                    message: "An internal server error occurred.".to_string(),
                    details: None,
                };
                (status, body)
            }

            OrbitError::Validation(e) => {
                let status = StatusCode::BAD_GATEWAY;
                let body = ApiErrorObject {
                    code: "BAD_UPSTREAM_PAYLOAD".to_string(),
                    message: e.to_string(),
                    details: None,
                };
                (status, body)
            }

            OrbitError::Json(_) | OrbitError::Network(_) | OrbitError::UpstreamStatus(_) => {
                let status = StatusCode::BAD_GATEWAY;
                let body = ApiErrorObject {
                    code: "UPSTREAM_ERROR".to_string(),
                    message: "Upstream service error.".to_string(),
                    details: None,
                };
                (status, body)
            }

            OrbitError::InvalidTransition { from, action } => {
                let status = StatusCode::CONFLICT;
                let body = ApiErrorObject {
                    code: "INVALID_TRANSITION".to_string(),
                    message: format!("Cannot {action} while {from}."),
                    details: None,
                };
                (status, body)
            }

            OrbitError::InvalidQuery(message) => {
                let status = StatusCode::BAD_REQUEST;
                let body = ApiErrorObject {
                    code: "INVALID_QUERY".to_string(),
                    message,
                    details: None,
                };
                (status, body)
            }

            OrbitError::NotFound(what) => {
                let status = StatusCode::NOT_FOUND;
                let body = ApiErrorObject {
                    code: "NOT_FOUND".to_string(),
                    message: format!("No {what} cached yet."),
                    details: None,
                };
                (status, body)
            }
        };
        (status, Json(ApiErrorBody { inner: error_body })).into_response()
    }
}

/// Standardized API error response payload.
#[derive(Serialize)]
pub struct ApiErrorObject {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
}

#[derive(Serialize)]
pub struct ApiErrorBody {
    #[serde(rename = "error")]
    pub inner: ApiErrorObject,
}

impl IsRetryable for OrbitError {
    fn is_retryable(&self) -> bool {
        match self {
            OrbitError::Network(e) => e.is_timeout() || e.is_connect() || e.is_request(),
            OrbitError::UpstreamStatus(status) => {
                status.is_server_error() || *status == StatusCode::TOO_MANY_REQUESTS
            }
            _ => false,
        }
    }
}
