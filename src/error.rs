// src/error.rs

use axum::{
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use std::time::Duration;
use thiserror::Error;

/// Errors raised by a document store backend
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Document already exists: {key}")]
    Conflict { key: String },

    #[error("Query failed: {message}")]
    Query { message: String },

    #[error("Database error {code} ({num}): {message}")]
    Database { code: u16, num: u32, message: String },

    #[error("Database request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Malformed document: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Cursor is exhausted")]
    CursorExhausted,
}

impl StoreError {
    /// ArangoDB error number for a unique constraint violation
    pub const ARANGO_CONFLICT: u32 = 1210;

    pub fn query(message: impl Into<String>) -> Self {
        Self::Query {
            message: message.into(),
        }
    }

    /// True when the write failed only because the document already exists
    pub fn is_conflict(&self) -> bool {
        match self {
            StoreError::Conflict { .. } => true,
            StoreError::Database { code, num, .. } => *code == 409 || *num == Self::ARANGO_CONFLICT,
            _ => false,
        }
    }
}

/// Main error type for the service
#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("{0}")]
    InvalidBody(#[source] serde_json::Error),

    #[error("Storage error: {0}")]
    Store(#[from] StoreError),

    #[error("Long-term storage error: {0}")]
    LongTerm(#[source] anyhow::Error),

    #[error("Database call timed out after {0:?}")]
    Timeout(Duration),
}

impl ServiceError {
    /// Get the HTTP status code for this error
    ///
    /// A malformed request body answers 503; clients of the service already
    /// depend on that code.
    pub fn status_code(&self) -> StatusCode {
        match self {
            ServiceError::InvalidBody(_) => StatusCode::SERVICE_UNAVAILABLE,
            ServiceError::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
            ServiceError::Store(_) | ServiceError::LongTerm(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Get the error code for API responses
    pub fn error_code(&self) -> &'static str {
        match self {
            ServiceError::InvalidBody(_) => "INVALID_BODY",
            ServiceError::Store(StoreError::Conflict { .. }) => "CONFLICT",
            ServiceError::Store(_) => "STORAGE_ERROR",
            ServiceError::LongTerm(_) => "LONG_TERM_STORAGE_ERROR",
            ServiceError::Timeout(_) => "TIMEOUT",
        }
    }

    /// Check if this error should be logged as a warning vs error
    pub fn is_client_error(&self) -> bool {
        matches!(self, ServiceError::InvalidBody(_))
    }
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let error_code = self.error_code();
        let message = self.to_string();

        if self.is_client_error() {
            tracing::warn!("Client error: {} ({})", message, error_code);
        } else {
            tracing::error!("Server error: {} ({})", message, error_code);
        }

        match self {
            // Body parse failures go back as the bare parser message
            ServiceError::InvalidBody(_) => (
                status,
                [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
                message,
            )
                .into_response(),
            _ => {
                let body = Json(json!({
                    "error": {
                        "code": error_code,
                        "message": message,
                        "status": status.as_u16()
                    },
                    "timestamp": chrono::Utc::now().to_rfc3339(),
                    "request_id": uuid::Uuid::new_v4().to_string()
                }));

                (status, body).into_response()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_conflict_detection() {
        assert!(StoreError::Conflict { key: "a".into() }.is_conflict());
        assert!(StoreError::Database {
            code: 409,
            num: StoreError::ARANGO_CONFLICT,
            message: "unique constraint violated".into()
        }
        .is_conflict());
        assert!(!StoreError::Database {
            code: 500,
            num: 4,
            message: "corrupted".into()
        }
        .is_conflict());
        assert!(!StoreError::query("syntax error").is_conflict());
    }

    #[test]
    fn test_invalid_body_maps_to_503() {
        let parse_error = serde_json::from_str::<serde_json::Value>("{not json").unwrap_err();
        let error = ServiceError::InvalidBody(parse_error);

        assert_eq!(error.status_code(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(error.error_code(), "INVALID_BODY");
        assert!(error.is_client_error());
        assert!(!error.to_string().is_empty());
    }

    #[test]
    fn test_invalid_body_response_is_plain_text() {
        let parse_error = serde_json::from_str::<serde_json::Value>("[").unwrap_err();
        let response = ServiceError::InvalidBody(parse_error).into_response();

        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
        let content_type = response.headers().get(header::CONTENT_TYPE).unwrap();
        assert!(content_type.to_str().unwrap().starts_with("text/plain"));
    }

    #[test]
    fn test_server_errors() {
        let error = ServiceError::Timeout(Duration::from_secs(5));
        assert_eq!(error.status_code(), StatusCode::GATEWAY_TIMEOUT);
        assert!(!error.is_client_error());

        let error = ServiceError::from(StoreError::Conflict { key: "k".into() });
        assert_eq!(error.error_code(), "CONFLICT");
        assert_eq!(error.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_long_term_failures_are_server_errors() {
        let error = ServiceError::LongTerm(anyhow::anyhow!("disk full"));
        assert_eq!(error.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(error.error_code(), "LONG_TERM_STORAGE_ERROR");
        assert!(!error.is_client_error());
    }
}
