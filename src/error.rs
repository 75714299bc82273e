//! Structured error types for repository and HTTP responses.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use std::fmt;
use thiserror::Error;

/// Error categories shared by the repository, the HTTP boundary and the client store.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// A required field is missing or blank.
    ValidationError,
    /// The referenced id does not exist.
    NotFound,
    /// The operation is structurally disallowed (e.g. deleting the default list).
    Forbidden,
    /// Unexpected storage failure.
    InternalError,
}

impl ErrorCode {
    /// HTTP status reported for this category.
    pub fn status(self) -> StatusCode {
        match self {
            ErrorCode::ValidationError | ErrorCode::Forbidden => StatusCode::BAD_REQUEST,
            ErrorCode::NotFound => StatusCode::NOT_FOUND,
            ErrorCode::InternalError => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Structured error for repository operations.
#[derive(Debug, Clone, PartialEq, Serialize, Error)]
#[error("{message}")]
pub struct RepoError {
    pub code: ErrorCode,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl RepoError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            field: None,
            details: None,
        }
    }

    pub fn with_field(mut self, field: impl Into<String>) -> Self {
        self.field = Some(field.into());
        self
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    // Convenience constructors

    pub fn missing_field(field: &str) -> Self {
        Self::new(
            ErrorCode::ValidationError,
            format!("{} is required", field),
        )
        .with_field(field)
    }

    pub fn invalid_value(field: &str, reason: &str) -> Self {
        Self::new(ErrorCode::ValidationError, reason).with_field(field)
    }

    pub fn not_found(entity: &str, id: &str) -> Self {
        Self::new(ErrorCode::NotFound, format!("{} not found: {}", entity, id))
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Forbidden, message)
    }

    pub fn internal(err: impl fmt::Display) -> Self {
        Self::new(ErrorCode::InternalError, err.to_string())
    }

    pub fn is(&self, code: ErrorCode) -> bool {
        self.code == code
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(err: rusqlite::Error) -> Self {
        tracing::error!(error = %err, "storage failure");
        RepoError::internal(err)
    }
}

impl From<serde_json::Error> for RepoError {
    fn from(err: serde_json::Error) -> Self {
        RepoError::internal(err)
    }
}

// Allow using ? with anyhow errors by converting them
impl From<anyhow::Error> for RepoError {
    fn from(err: anyhow::Error) -> Self {
        match err.downcast::<RepoError>() {
            Ok(repo_err) => repo_err,
            Err(err) => RepoError::internal(err),
        }
    }
}

impl IntoResponse for RepoError {
    fn into_response(self) -> Response {
        (self.code.status(), Json(self)).into_response()
    }
}

/// Result type for repository operations.
pub type RepoResult<T> = std::result::Result<T, RepoError>;

/// Reject missing or blank required text.
pub fn require_text(field: &str, value: Option<&str>) -> RepoResult<()> {
    match value {
        Some(v) if !v.trim().is_empty() => Ok(()),
        _ => Err(RepoError::missing_field(field)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_codes_follow_categories() {
        assert_eq!(ErrorCode::ValidationError.status(), StatusCode::BAD_REQUEST);
        assert_eq!(ErrorCode::Forbidden.status(), StatusCode::BAD_REQUEST);
        assert_eq!(ErrorCode::NotFound.status(), StatusCode::NOT_FOUND);
        assert_eq!(
            ErrorCode::InternalError.status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn errors_compare_by_value() {
        let a = RepoError::not_found("Task", "t1");
        assert_eq!(a.clone(), a);
        assert_ne!(a, a.clone().with_details("extra"));
    }

    #[test]
    fn error_serializes_with_screaming_code() {
        let err = RepoError::missing_field("listId");
        let json = serde_json::to_value(&err).unwrap();
        assert_eq!(json["code"], "VALIDATION_ERROR");
        assert_eq!(json["field"], "listId");
        assert!(json.get("details").is_none());
    }

    #[test]
    fn anyhow_roundtrip_keeps_category() {
        let err: anyhow::Error = RepoError::forbidden("nope").into();
        let back = RepoError::from(err);
        assert_eq!(back.code, ErrorCode::Forbidden);

        let other = RepoError::from(anyhow::anyhow!("boom"));
        assert_eq!(other.code, ErrorCode::InternalError);
    }

    #[test]
    fn require_text_rejects_blank() {
        assert!(require_text("name", Some("Work")).is_ok());
        assert!(require_text("name", Some("   ")).is_err());
        assert!(require_text("name", None).is_err());
    }
}
