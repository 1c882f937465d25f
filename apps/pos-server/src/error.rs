//! # API Error Type
//!
//! Unified error type for HTTP handlers.
//!
//! ## Error Handling Strategy
//! Duplicates are first-class citizens, not generic failures: every
//! duplicate path (lock held, id match, content match, explicit bill
//! number collision) maps to `409 Conflict` with the existing bill number
//! attached, so the client can reconcile instead of retrying. Internal
//! details of database failures are logged but never leak to the caller.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;

use dhaba_core::{CoreError, ValidationError};
use dhaba_db::DbError;

use crate::services::submission::{DuplicateReason, SubmitError};

/// API error returned from HTTP handlers.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Resource not found (404).
    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    /// Input validation failed (400).
    #[error("{0}")]
    Validation(String),

    /// Duplicate order (409). `existing_bill_number` points the client at
    /// the bill that already exists, when known.
    #[error("Duplicate order: {message}")]
    Duplicate {
        message: String,
        existing_bill_number: Option<String>,
        existing_order_id: Option<i64>,
    },

    /// Business rule violation (422), e.g. reopening a completed order.
    #[error("{0}")]
    BusinessLogic(String),

    /// Bill number allocation exhausted its retry bound (500).
    #[error("Failed to generate unique bill number after multiple attempts")]
    AllocationExhausted,

    /// Database operation failed (500).
    #[error("Database error")]
    Database(String),
}

impl ApiError {
    /// Creates a not found error.
    pub fn not_found(entity: &str, id: impl ToString) -> Self {
        ApiError::NotFound {
            entity: entity.to_string(),
            id: id.to_string(),
        }
    }

    /// Creates a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        ApiError::Validation(message.into())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            ApiError::NotFound { entity, id } => (
                StatusCode::NOT_FOUND,
                json!({ "error": format!("{entity} not found"), "id": id }),
            ),
            ApiError::Validation(message) => {
                (StatusCode::BAD_REQUEST, json!({ "error": message }))
            }
            ApiError::Duplicate {
                message,
                existing_bill_number,
                existing_order_id,
            } => (
                StatusCode::CONFLICT,
                json!({
                    "error": "Duplicate order",
                    "message": message,
                    "existingBillNumber": existing_bill_number,
                    "existingOrderId": existing_order_id,
                }),
            ),
            ApiError::BusinessLogic(message) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                json!({ "error": message }),
            ),
            ApiError::AllocationExhausted => (
                StatusCode::INTERNAL_SERVER_ERROR,
                json!({ "error": "Failed to generate unique bill number after multiple attempts" }),
            ),
            ApiError::Database(detail) => {
                // Log the actual error but return a generic message
                tracing::error!(%detail, "Database operation failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    json!({ "error": "Database error" }),
                )
            }
        };

        (status, Json(body)).into_response()
    }
}

/// Converts database errors to API errors.
impl From<DbError> for ApiError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::NotFound { entity, id } => ApiError::NotFound { entity, id },
            DbError::UniqueViolation { field, value } => {
                ApiError::Validation(format!("{field} '{value}' already exists"))
            }
            DbError::ForeignKeyViolation { message } => {
                tracing::warn!(%message, "Foreign key violation");
                ApiError::Validation("Invalid reference".to_string())
            }
            other => ApiError::Database(other.to_string()),
        }
    }
}

/// Converts core errors to API errors.
impl From<CoreError> for ApiError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::OrderNotFound(id) => ApiError::not_found("Order", id),
            CoreError::InvalidStatusTransition { .. } => {
                ApiError::BusinessLogic(err.to_string())
            }
            CoreError::Validation(e) => ApiError::Validation(e.to_string()),
        }
    }
}

impl From<ValidationError> for ApiError {
    fn from(err: ValidationError) -> Self {
        ApiError::Validation(err.to_string())
    }
}

/// Converts submission pipeline errors to API errors.
impl From<SubmitError> for ApiError {
    fn from(err: SubmitError) -> Self {
        match err {
            SubmitError::Duplicate {
                reason,
                existing_bill_number,
                existing_order_id,
            } => {
                let message = match reason {
                    DuplicateReason::RequestInProgress => {
                        "This order is already being processed".to_string()
                    }
                    DuplicateReason::IdMatch
                    | DuplicateReason::ContentMatch
                    | DuplicateReason::BillNumberExists => {
                        "This order has already been processed".to_string()
                    }
                };
                ApiError::Duplicate {
                    message,
                    existing_bill_number,
                    existing_order_id,
                }
            }
            SubmitError::AllocationExhausted => ApiError::AllocationExhausted,
            SubmitError::Validation(e) => ApiError::Validation(e.to_string()),
            SubmitError::Db(e) => e.into(),
        }
    }
}
