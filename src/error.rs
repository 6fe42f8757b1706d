//! HTTP-facing error taxonomy and its JSON rendering.

use hyper::{Body, Response, StatusCode};
use serde::Serialize;
use thiserror::Error;
use tracing::{error, warn};

use crate::sys_core::response::json_response;
use crate::sys_fileapi::core::RepoError;

/// Everything a handler can fail with.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Malformed or unacceptable request (400).
    #[error("{0}")]
    Validation(String),

    /// Unknown contract or route (404).
    #[error("{0}")]
    NotFound(String),

    /// Bad credentials (401).
    #[error("{0}")]
    Unauthorized(String),

    /// Server-side failure (500). `detail` is echoed to the client.
    #[error("{message}: {detail}")]
    Internal { message: String, detail: String },
}

#[derive(Serialize)]
struct ErrorBody<'a> {
    success: bool,
    message: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<&'a str>,
}

impl ApiError {
    pub fn internal(message: impl Into<String>, detail: impl ToString) -> Self {
        Self::Internal {
            message: message.into(),
            detail: detail.to_string(),
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Log the failure and render `{success: false, message, error?}`.
    pub fn into_response(self) -> Response<Body> {
        let status = self.status();
        let body = match &self {
            Self::Validation(message) | Self::NotFound(message) | Self::Unauthorized(message) => {
                warn!(status = status.as_u16(), %message, "request rejected");
                ErrorBody {
                    success: false,
                    message,
                    error: None,
                }
            }
            Self::Internal { message, detail } => {
                error!(%message, %detail, "request failed");
                ErrorBody {
                    success: false,
                    message,
                    error: Some(detail),
                }
            }
        };
        json_response(status, &body)
    }
}

impl From<RepoError> for ApiError {
    fn from(err: RepoError) -> Self {
        match err {
            RepoError::InvalidMediaType(_) => Self::Validation(err.to_string()),
            RepoError::NotFound(_) => Self::NotFound("File not found.".to_string()),
            RepoError::Io(e) => Self::internal("Storage operation failed.", e),
        }
    }
}
