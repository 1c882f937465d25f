//! # Menu Routes
//!
//! Admin CRUD for menu items.

use axum::extract::{Path, State};
use axum::Json;

use dhaba_core::MenuItemInput;

use crate::error::ApiError;
use crate::routes::{CreatedResponse, OkResponse};
use crate::state::AppState;

/// Adds a menu item.
pub async fn add_item(
    State(state): State<AppState>,
    Json(item): Json<MenuItemInput>,
) -> Result<Json<CreatedResponse>, ApiError> {
    if item.name.trim().is_empty() {
        return Err(ApiError::validation("name is required"));
    }

    let id = state.db.menu().insert_item(&item).await?;
    Ok(Json(CreatedResponse::with_id(id)))
}

/// Updates a menu item in full.
pub async fn update_item(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(item): Json<MenuItemInput>,
) -> Result<Json<OkResponse>, ApiError> {
    state.db.menu().update_item(id, &item).await?;
    Ok(Json(OkResponse::ok()))
}

/// Deletes a menu item.
pub async fn delete_item(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<OkResponse>, ApiError> {
    state.db.menu().delete_item(id).await?;
    Ok(Json(OkResponse::ok()))
}
