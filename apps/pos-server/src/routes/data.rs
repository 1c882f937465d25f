//! # Bootstrap and Reporting Routes
//!
//! `/api/data` is the consolidated read the client performs on
//! initialization: one response carrying the restaurant profile, users,
//! menu, payment modes, the full order list (newest first), and the QR
//! configuration.

use axum::extract::{Query, State};
use axum::Json;
use chrono::{DateTime, Datelike, NaiveTime, Utc};
use serde::{Deserialize, Serialize};

use dhaba_core::{MenuItem, Order, QrConfig, RestaurantSettings, User};
use dhaba_db::SalesSummary;

use crate::error::ApiError;
use crate::state::AppState;

/// The consolidated bootstrap dataset.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BootstrapData {
    pub restaurant: Option<RestaurantSettings>,
    pub users: Vec<User>,
    pub menu_categories: Vec<String>,
    pub menu_items: Vec<MenuItem>,
    pub payment_modes: Vec<String>,
    pub orders: Vec<Order>,
    pub qr_config: Option<QrConfig>,
}

/// Returns everything the client needs on startup in one read.
pub async fn bootstrap(State(state): State<AppState>) -> Result<Json<BootstrapData>, ApiError> {
    let db = &state.db;

    let data = BootstrapData {
        restaurant: db.settings().restaurant().await?,
        users: db.users().list().await?,
        menu_categories: db.menu().list_categories().await?,
        menu_items: db.menu().list_items().await?,
        payment_modes: db.settings().payment_modes().await?,
        orders: db.orders().list_all().await?,
        qr_config: db.settings().qr_config().await?,
    };

    Ok(Json(data))
}

/// `GET /api/sales-summary?period=today|week|month` query parameters.
#[derive(Debug, Deserialize)]
pub struct SummaryParams {
    pub period: Option<String>,
}

/// Aggregated completed-order totals for a reporting period.
#[derive(Debug, Serialize)]
pub struct SummaryResponse {
    pub period: String,
    #[serde(flatten)]
    pub summary: SalesSummary,
}

/// Completed-order aggregates since the start of the requested period.
pub async fn sales_summary(
    State(state): State<AppState>,
    Query(params): Query<SummaryParams>,
) -> Result<Json<SummaryResponse>, ApiError> {
    let period = params.period.unwrap_or_else(|| "today".to_string());
    let since = period_start(&period, state.clock.now());

    let summary = state.db.orders().sales_summary(since).await?;

    Ok(Json(SummaryResponse { period, summary }))
}

/// Start instant of a reporting period: today's midnight, Monday of the
/// current week, or the first of the current month. Unknown labels fall
/// back to "today".
fn period_start(period: &str, now: DateTime<Utc>) -> DateTime<Utc> {
    let today = now.date_naive();
    let start_date = match period {
        "week" => today - chrono::Days::new(u64::from(today.weekday().num_days_from_monday())),
        "month" => today.with_day(1).unwrap_or(today),
        _ => today,
    };
    start_date.and_time(NaiveTime::MIN).and_utc()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_period_start_boundaries() {
        // 2026-08-07 is a Friday
        let now = Utc.with_ymd_and_hms(2026, 8, 7, 14, 30, 0).unwrap();

        let today = period_start("today", now);
        assert_eq!(today, Utc.with_ymd_and_hms(2026, 8, 7, 0, 0, 0).unwrap());

        let week = period_start("week", now);
        assert_eq!(week, Utc.with_ymd_and_hms(2026, 8, 3, 0, 0, 0).unwrap());

        let month = period_start("month", now);
        assert_eq!(month, Utc.with_ymd_and_hms(2026, 8, 1, 0, 0, 0).unwrap());

        // Unknown periods behave like "today"
        assert_eq!(period_start("decade", now), today);
    }
}
