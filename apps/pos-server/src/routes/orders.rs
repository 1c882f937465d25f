//! # Order Routes
//!
//! Submission, status updates, and deletion. Submission delegates to the
//! [`SubmissionService`] pipeline; the other two are row-level operations
//! where a missing id reports not-found rather than erroring.

use axum::extract::{Path, State};
use axum::Json;
use serde::{Deserialize, Serialize};
use tracing::debug;

use dhaba_core::{validate_status, CoreError, OrderPayload, OrderStatus};

use crate::error::ApiError;
use crate::routes::OkResponse;
use crate::services::SubmissionService;
use crate::state::AppState;

/// `POST /api/orders` acceptance body.
#[derive(Debug, Serialize)]
pub struct SubmitResponse {
    pub id: i64,
    pub success: bool,
    #[serde(rename = "billNumber")]
    pub bill_number: String,
}

/// `PUT /api/orders/{id}/status` request body.
#[derive(Debug, Deserialize)]
pub struct StatusUpdate {
    pub status: String,
}

/// Submits an order through the dedup pipeline.
pub async fn submit_order(
    State(state): State<AppState>,
    Json(payload): Json<OrderPayload>,
) -> Result<Json<SubmitResponse>, ApiError> {
    debug!(
        table = %payload.table_number,
        total = payload.total,
        items = payload.items.len(),
        "Order submission received"
    );

    let service = SubmissionService::new(&state);
    let receipt = service.submit(&payload).await?;

    Ok(Json(SubmitResponse {
        id: receipt.id,
        success: true,
        bill_number: receipt.bill_number,
    }))
}

/// Updates an order's status. Transitions are one-way: a completed order
/// is never reopened.
pub async fn update_status(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(body): Json<StatusUpdate>,
) -> Result<Json<OkResponse>, ApiError> {
    let status = validate_status(&body.status)?;

    let current = state
        .db
        .orders()
        .get_by_id(id)
        .await?
        .ok_or_else(|| ApiError::not_found("Order", id))?;

    if current.status == OrderStatus::Completed && status == OrderStatus::Pending {
        return Err(CoreError::InvalidStatusTransition {
            from: current.status.as_str().to_string(),
            to: status.as_str().to_string(),
        }
        .into());
    }

    state.db.orders().update_status(id, status).await?;
    Ok(Json(OkResponse::ok()))
}

/// Deletes an order (admin operation).
pub async fn delete_order(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<OkResponse>, ApiError> {
    state.db.orders().delete(id).await?;
    Ok(Json(OkResponse::ok()))
}
