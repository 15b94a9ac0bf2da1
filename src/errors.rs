//! Structured error types and codes for the HTTP surface.
//! Provides machine-readable codes for clients and field-level detail for
//! validation failures.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::experiment::ExperimentError;

/// Structured error response for API clients
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Machine-readable error code
    pub code: String,

    /// Human-readable error message
    pub message: String,

    /// Additional error context
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

/// Application error types with proper categorization
#[derive(Debug)]
pub enum AppError {
    // Validation errors (400)
    InvalidInput { field: String, reason: String },

    // Not found (404)
    TestNotFound(String),

    // State conflicts (409)
    TestNotActive(String),
    TestNoVariants(String),
    TestAlreadyExists(String),
    VariantNotInTest(String),
    InvalidTransition(String),

    // Internal (500)
    AssignmentFailed(String),
    StorageError(String),

    // Generic wrapper for external errors
    Internal(anyhow::Error),
}

impl AppError {
    /// Get error code for client identification
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidInput { .. } => "INVALID_INPUT",
            Self::TestNotFound(_) => "TEST_NOT_FOUND",
            Self::TestNotActive(_) => "TEST_NOT_ACTIVE",
            Self::TestNoVariants(_) => "TEST_NO_VARIANTS",
            Self::TestAlreadyExists(_) => "TEST_ALREADY_EXISTS",
            Self::VariantNotInTest(_) => "VARIANT_NOT_IN_TEST",
            Self::InvalidTransition(_) => "INVALID_TRANSITION",
            Self::AssignmentFailed(_) => "ASSIGNMENT_FAILED",
            Self::StorageError(_) => "STORAGE_ERROR",
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// Get HTTP status code
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidInput { .. } => StatusCode::BAD_REQUEST,

            Self::TestNotFound(_) => StatusCode::NOT_FOUND,

            Self::TestNotActive(_)
            | Self::TestNoVariants(_)
            | Self::TestAlreadyExists(_)
            | Self::VariantNotInTest(_)
            | Self::InvalidTransition(_) => StatusCode::CONFLICT,

            Self::AssignmentFailed(_) | Self::StorageError(_) | Self::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Get detailed error message
    pub fn message(&self) -> String {
        match self {
            Self::InvalidInput { field, reason } => {
                format!("Invalid input for field '{field}': {reason}")
            }
            Self::TestNotFound(id) => format!("Test not found: {id}"),
            Self::TestNotActive(id) => format!("Test is not active: {id}"),
            Self::TestNoVariants(id) => format!("Test has no variants: {id}"),
            Self::TestAlreadyExists(id) => format!("Test already exists: {id}"),
            Self::VariantNotInTest(msg) => msg.clone(),
            Self::InvalidTransition(msg) => msg.clone(),
            Self::AssignmentFailed(msg) => format!("Assignment failed: {msg}"),
            Self::StorageError(msg) => format!("Storage error: {msg}"),
            Self::Internal(err) => format!("Internal error: {err}"),
        }
    }

    /// Convert to structured error response
    pub fn to_response(&self) -> ErrorResponse {
        ErrorResponse {
            code: self.code().to_string(),
            message: self.message(),
            details: None,
        }
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message())
    }
}

impl std::error::Error for AppError {}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        Self::Internal(err)
    }
}

impl From<ExperimentError> for AppError {
    fn from(err: ExperimentError) -> Self {
        match err {
            ExperimentError::TestNotFound(id) => Self::TestNotFound(id),
            ExperimentError::TestNotActive(id) | ExperimentError::TestNotTracking(id) => {
                Self::TestNotActive(id)
            }
            ExperimentError::TestNoVariants(id) => Self::TestNoVariants(id),
            ExperimentError::TestAlreadyExists(id) => Self::TestAlreadyExists(id),
            ExperimentError::VariantNotInTest { .. } => Self::VariantNotInTest(err.to_string()),
            ExperimentError::InvalidWeights(msg) => Self::InvalidInput {
                field: "variants".to_string(),
                reason: msg,
            },
            ExperimentError::InvalidTransition(msg) => Self::InvalidTransition(msg),
            ExperimentError::AssignmentFailed(msg) => Self::AssignmentFailed(msg),
            ExperimentError::Storage(msg) => Self::StorageError(msg),
        }
    }
}

/// Axum IntoResponse implementation for proper HTTP responses
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = self.to_response();

        (status, Json(body)).into_response()
    }
}

/// Helper trait to convert validation errors
pub trait ValidationErrorExt<T> {
    fn map_validation_err(self, field: &str) -> Result<T>;
}

impl<T> ValidationErrorExt<T> for anyhow::Result<T> {
    fn map_validation_err(self, field: &str) -> Result<T> {
        self.map_err(|e| AppError::InvalidInput {
            field: field.to_string(),
            reason: e.to_string(),
        })
    }
}

/// Type alias for Results using AppError
pub type Result<T> = std::result::Result<T, AppError>;
