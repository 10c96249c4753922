//! # API Error Types
//!
//! Structured error type implementing `axum::response::IntoResponse`.
//! Maps domain errors from regula-core and regula-compliance to HTTP status
//! codes with a JSON body carrying an error code, message, and details.
//! Internal error details are never returned to clients.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use regula_compliance::{CatalogError, MatchError};
use regula_core::ValidationError;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;

/// Structured JSON error response body.
///
/// The `details` field carries additional context for client errors and is
/// omitted for 500-class errors.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorBody {
    pub error: ErrorDetail,
}

/// Inner error detail.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorDetail {
    /// Machine-readable error code (e.g., "NOT_FOUND", "CONFLICT").
    pub code: String,
    /// Human-readable error message.
    pub message: String,
    /// Additional details, present only for client errors.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

/// Application-level error type that implements [`IntoResponse`] for Axum.
#[derive(Error, Debug)]
pub enum AppError {
    /// Resource not found (404).
    #[error("not found: {0}")]
    NotFound(String),

    /// Request validation failed (422).
    #[error("validation error: {0}")]
    Validation(String),

    /// Request body could not be parsed (400).
    #[error("bad request: {0}")]
    BadRequest(String),

    /// Missing, invalid or expired credentials (401).
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// Ownership mismatch or insufficient role (403).
    #[error("forbidden: {0}")]
    Forbidden(String),

    /// Duplicate or invalid unique key (409).
    #[error("conflict: {0}")]
    Conflict(String),

    /// Internal server error (500). Message is logged but not returned to client.
    #[error("internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Return the HTTP status code and machine-readable error code for this error.
    fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            Self::NotFound(_) => (StatusCode::NOT_FOUND, "NOT_FOUND"),
            Self::Validation(_) => (StatusCode::UNPROCESSABLE_ENTITY, "VALIDATION_ERROR"),
            Self::BadRequest(_) => (StatusCode::BAD_REQUEST, "BAD_REQUEST"),
            Self::Unauthorized(_) => (StatusCode::UNAUTHORIZED, "UNAUTHORIZED"),
            Self::Forbidden(_) => (StatusCode::FORBIDDEN, "FORBIDDEN"),
            Self::Conflict(_) => (StatusCode::CONFLICT, "CONFLICT"),
            Self::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
        }
    }

    /// Map a database failure to a 500, logging the cause.
    ///
    /// Unique-constraint violations become `Conflict`: another writer got
    /// the key first.
    pub fn database(context: &str, err: sqlx::Error) -> Self {
        if err
            .as_database_error()
            .is_some_and(|db| db.is_unique_violation())
        {
            tracing::warn!(error = %err, context, "unique constraint violated");
            return Self::Conflict(format!("{context}: record already exists"));
        }
        tracing::error!(error = %err, context, "database operation failed");
        Self::Internal(format!("{context}: database operation failed"))
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();

        let message = match &self {
            Self::Internal(_) => "An internal error occurred".to_string(),
            other => other.to_string(),
        };

        if matches!(&self, Self::Internal(_)) {
            tracing::error!(error = %self, "internal server error");
        }

        let body = ErrorBody {
            error: ErrorDetail {
                code: code.to_string(),
                message,
                details: None,
            },
        };

        (status, Json(body)).into_response()
    }
}

/// An invalid CNPJ is reported as a conflict on the company's unique key;
/// every other primitive failure is a plain validation error.
impl From<ValidationError> for AppError {
    fn from(err: ValidationError) -> Self {
        match err {
            ValidationError::InvalidCnpj(_) => Self::Conflict(err.to_string()),
            other => Self::Validation(other.to_string()),
        }
    }
}

impl From<crate::password::PasswordError> for AppError {
    fn from(err: crate::password::PasswordError) -> Self {
        Self::Internal(err.to_string())
    }
}

impl From<MatchError> for AppError {
    fn from(err: MatchError) -> Self {
        match err {
            MatchError::CompanyNotFound(id) => Self::NotFound(format!("company {id} not found")),
            MatchError::Storage(e) => Self::Internal(e.to_string()),
        }
    }
}

impl From<CatalogError> for AppError {
    fn from(err: CatalogError) -> Self {
        match err {
            CatalogError::DuplicateCode { .. } => Self::Conflict(err.to_string()),
            CatalogError::InvalidRequirement { .. } | CatalogError::InvalidTable(_) => {
                Self::Validation(err.to_string())
            }
            other => Self::Internal(other.to_string()),
        }
    }
}
