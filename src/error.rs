//! Application error types

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

/// Application-wide error type
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Missing required fields: {}", .0.join(", "))]
    MissingFields(Vec<String>),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Authorization error: {0}")]
    Authorization(String),

    #[error("Not connected: {0}")]
    NotConnected(String),

    #[error("Unsupported broker: {0}")]
    UnsupportedBroker(String),

    /// The broker API accepted the request but reported a failure.
    #[error("Broker error: {message}")]
    Upstream {
        message: String,
        body: Option<Value>,
    },

    /// Transport-level failure reaching the broker API.
    #[error("Gateway error: {message}")]
    Gateway {
        message: String,
        body: Option<Value>,
    },

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::Validation(_) | AppError::MissingFields(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) | AppError::NotConnected(_) => StatusCode::NOT_FOUND,
            AppError::Authorization(_) => StatusCode::UNAUTHORIZED,
            AppError::UnsupportedBroker(_) | AppError::Upstream { .. } => StatusCode::BAD_REQUEST,
            AppError::Gateway { .. } => StatusCode::BAD_GATEWAY,
            AppError::Database(_)
            | AppError::Serialization(_)
            | AppError::Config(_)
            | AppError::Io(_)
            | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<reqwest::Error> for AppError {
    fn from(err: reqwest::Error) -> Self {
        AppError::Gateway {
            message: err.to_string(),
            body: None,
        }
    }
}

/// JSON error envelope returned to clients
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub message: String,
    #[serde(rename = "missingFields", skip_serializing_if = "Option::is_none")]
    pub missing_fields: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<Value>,
}

impl From<&AppError> for ErrorResponse {
    fn from(err: &AppError) -> Self {
        let missing_fields = match err {
            AppError::MissingFields(fields) => Some(fields.clone()),
            _ => None,
        };
        let error = match err {
            AppError::Upstream { body, .. } | AppError::Gateway { body, .. } => body.clone(),
            _ => None,
        };

        ErrorResponse {
            success: false,
            message: err.to_string(),
            missing_fields,
            error,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!("{}", self);
        }
        (status, Json(ErrorResponse::from(&self))).into_response()
    }
}

pub type Result<T> = std::result::Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(
            AppError::Validation("x".into()).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AppError::MissingFields(vec!["totp".into()]).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AppError::NotFound("broker".into()).status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            AppError::NotConnected("x".into()).status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            AppError::Authorization("x".into()).status_code(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            AppError::Gateway {
                message: "down".into(),
                body: None
            }
            .status_code(),
            StatusCode::BAD_GATEWAY
        );
    }

    #[test]
    fn test_missing_fields_in_envelope() {
        let err = AppError::MissingFields(vec!["client_id".into(), "totp".into()]);
        let resp = ErrorResponse::from(&err);
        assert!(!resp.success);
        assert_eq!(
            resp.missing_fields,
            Some(vec!["client_id".to_string(), "totp".to_string()])
        );
    }

    #[test]
    fn test_upstream_body_preserved() {
        let body = serde_json::json!({"status": false, "errorcode": "AB1007"});
        let err = AppError::Upstream {
            message: "Invalid totp".into(),
            body: Some(body.clone()),
        };
        let resp = ErrorResponse::from(&err);
        assert_eq!(resp.error, Some(body));
    }
}
