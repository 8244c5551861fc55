//! Errors surfaced to registry callers.
//!
//! Persistence failures never appear here: the store is a best-effort
//! mirror and its errors stay in the background mirror task and the logs.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use thiserror::Error;

use agentcy_common::ValidationError;

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("agent '{0}' not found")]
    AgentNotFound(String),

    #[error("client '{0}' not found")]
    ClientNotFound(String),

    /// Lookup id matched neither an agent nor a client.
    #[error("no agent or client named '{0}'")]
    NotFound(String),
}

#[derive(Serialize)]
struct ErrorResponse {
    error: ErrorBody,
}

#[derive(Serialize)]
struct ErrorBody {
    code: &'static str,
    message: String,
}

impl RegistryError {
    #[must_use]
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::AgentNotFound(_) | Self::ClientNotFound(_) | Self::NotFound(_) => {
                StatusCode::NOT_FOUND
            }
        }
    }

    fn code(&self) -> &'static str {
        match self {
            Self::Validation(_) => "VALIDATION_ERROR",
            Self::AgentNotFound(_) | Self::ClientNotFound(_) | Self::NotFound(_) => "NOT_FOUND",
        }
    }
}

impl IntoResponse for RegistryError {
    fn into_response(self) -> Response {
        let body = ErrorResponse {
            error: ErrorBody {
                code: self.code(),
                message: self.to_string(),
            },
        };
        (self.status_code(), Json(body)).into_response()
    }
}
