//! Unified error response handling for the proxy service
//!
//! Every error the proxy itself produces (as opposed to errors relayed from
//! the upstream) is rendered as the same small JSON envelope.

use crate::proxy::types::ProxyError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

/// Standard error response format
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Unique error code for programmatic handling
    pub code: String,
    /// Human-readable error message
    pub message: String,
    /// Additional error details
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl ErrorResponse {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            details: None,
        }
    }

    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }

    pub fn into_response_with_status(self, status: StatusCode) -> Response {
        (status, Json(self)).into_response()
    }
}

/// Extension trait for consistent error formatting
pub trait ErrorResponseExt {
    /// Convert to standardized error response
    fn to_error_response(&self) -> ErrorResponse;

    /// Get the appropriate HTTP status code
    fn status_code(&self) -> StatusCode;
}

impl ErrorResponseExt for ProxyError {
    fn to_error_response(&self) -> ErrorResponse {
        use ProxyError::*;

        let code = match self {
            BodyRead(_) => "BODY_READ_ERROR",
            RequestTooLarge { .. } => "REQUEST_TOO_LARGE",
            InvalidUpstreamUrl(_) => "INVALID_UPSTREAM_URL",
            InvalidRequestPath(_) => "INVALID_REQUEST_PATH",
            UpstreamDispatch(_) => "UPSTREAM_DISPATCH_ERROR",
            ResponseBuild(_) => "INTERNAL_ERROR",
        };

        let response = ErrorResponse::new(code, self.to_string());
        match self {
            RequestTooLarge { max_size } => response.with_details(serde_json::json!({
                "max_size": max_size.as_ref()
            })),
            _ => response,
        }
    }

    fn status_code(&self) -> StatusCode {
        use ProxyError::*;

        match self {
            RequestTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            InvalidRequestPath(_) => StatusCode::BAD_REQUEST,
            BodyRead(_) | InvalidUpstreamUrl(_) | UpstreamDispatch(_) | ResponseBuild(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}
