//! # HTTP Routes
//!
//! Router assembly and shared response shapes. Endpoint paths mirror the
//! client's expectations: `/api/orders` for submission, a consolidated
//! `/api/data` bootstrap read, and CRUD for the collaborator tables.

use axum::routing::{delete, get, post, put};
use axum::Router;
use serde::Serialize;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::state::AppState;

pub mod data;
pub mod health;
pub mod menu;
pub mod metrics;
pub mod orders;
pub mod settings;
pub mod users;

/// `{ "success": true }` — the plain acknowledgement body.
#[derive(Debug, Serialize)]
pub struct OkResponse {
    pub success: bool,
}

impl OkResponse {
    pub fn ok() -> Self {
        OkResponse { success: true }
    }
}

/// `{ "id": ..., "success": true }` — acknowledgement for inserts.
#[derive(Debug, Serialize)]
pub struct CreatedResponse {
    pub id: i64,
    pub success: bool,
}

impl CreatedResponse {
    pub fn with_id(id: i64) -> Self {
        CreatedResponse { id, success: true }
    }
}

/// Builds the application router with CORS and request tracing.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/api/health", get(health::health))
        .route("/api/data", get(data::bootstrap))
        .route("/api/sales-summary", get(data::sales_summary))
        .route("/api/orders", post(orders::submit_order))
        .route("/api/orders/{id}/status", put(orders::update_status))
        .route("/api/orders/{id}", delete(orders::delete_order))
        .route("/api/menu-items", post(menu::add_item))
        .route(
            "/api/menu-items/{id}",
            put(menu::update_item).delete(menu::delete_item),
        )
        .route("/api/users", post(users::add_user))
        .route("/api/users/{id}/password", put(users::update_password))
        .route("/api/users/{id}/last-login", put(users::touch_last_login))
        .route("/api/users/{id}", delete(users::delete_user))
        .route("/api/restaurant-settings", put(settings::update_restaurant))
        .route("/api/qr-config", put(settings::update_qr_config))
        .route("/api/metrics/locks", get(metrics::lock_stats))
        .route(
            "/api/metrics/duplicate-detection",
            get(metrics::detection_stats),
        )
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
