//! # User Routes
//!
//! Admin CRUD for users plus the last-login stamp the client fires after a
//! successful credential match.

use axum::extract::{Path, State};
use axum::Json;
use serde::Deserialize;

use dhaba_core::UserInput;

use crate::error::ApiError;
use crate::routes::{CreatedResponse, OkResponse};
use crate::state::AppState;

/// `PUT /api/users/{id}/password` request body.
#[derive(Debug, Deserialize)]
pub struct PasswordUpdate {
    pub password: String,
}

/// Adds a user.
pub async fn add_user(
    State(state): State<AppState>,
    Json(user): Json<UserInput>,
) -> Result<Json<CreatedResponse>, ApiError> {
    if user.username.trim().is_empty() {
        return Err(ApiError::validation("username is required"));
    }

    let id = state.db.users().insert(&user).await?;
    Ok(Json(CreatedResponse::with_id(id)))
}

/// Updates a user's password.
pub async fn update_password(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(body): Json<PasswordUpdate>,
) -> Result<Json<OkResponse>, ApiError> {
    if body.password.is_empty() {
        return Err(ApiError::validation("password is required"));
    }

    state.db.users().update_password(id, &body.password).await?;
    Ok(Json(OkResponse::ok()))
}

/// Stamps a user's last login time.
pub async fn touch_last_login(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<OkResponse>, ApiError> {
    state.db.users().touch_last_login(id).await?;
    Ok(Json(OkResponse::ok()))
}

/// Deletes a user.
pub async fn delete_user(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<OkResponse>, ApiError> {
    state.db.users().delete(id).await?;
    Ok(Json(OkResponse::ok()))
}
