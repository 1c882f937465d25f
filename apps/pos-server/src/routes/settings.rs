//! # Settings Routes
//!
//! Partial restaurant-profile updates and the QR configuration upsert.

use axum::extract::State;
use axum::Json;

use dhaba_core::{QrConfigUpdate, RestaurantSettingsUpdate};

use crate::error::ApiError;
use crate::routes::OkResponse;
use crate::state::AppState;

/// Applies a partial restaurant settings update.
pub async fn update_restaurant(
    State(state): State<AppState>,
    Json(update): Json<RestaurantSettingsUpdate>,
) -> Result<Json<OkResponse>, ApiError> {
    state.db.settings().update_restaurant(&update).await?;
    Ok(Json(OkResponse::ok()))
}

/// Updates or creates the QR configuration.
pub async fn update_qr_config(
    State(state): State<AppState>,
    Json(update): Json<QrConfigUpdate>,
) -> Result<Json<OkResponse>, ApiError> {
    state.db.settings().upsert_qr_config(&update).await?;
    Ok(Json(OkResponse::ok()))
}
