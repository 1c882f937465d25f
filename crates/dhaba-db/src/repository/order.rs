//! # Order Repository
//!
//! Database operations for orders: the persistence gateway of the
//! duplicate-prevention core, plus the lookups the duplicate detector runs.
//!
//! ## Submission Data Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    One Accepted Submission                              │
//! │                                                                         │
//! │  1. DETECT                                                             │
//! │     ├── get_by_id()          exact client-id match                     │
//! │     └── recent_matching()    content candidates in trailing window     │
//! │                                                                         │
//! │  2. ALLOCATE                                                           │
//! │     └── bill_number_exists() pre-check inside the retry loop           │
//! │                                                                         │
//! │  3. PERSIST                                                            │
//! │     └── insert()             UNIQUE(bill_number) is the last word      │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use tracing::{debug, warn};

use crate::error::{DbError, DbResult};
use dhaba_core::{Order, OrderItem, OrderOrigin, OrderStatus};

// =============================================================================
// Row Mapping
// =============================================================================

/// Raw row shape: `items` is the JSON string column.
#[derive(Debug, sqlx::FromRow)]
struct OrderRow {
    id: i64,
    bill_number: String,
    customer_name: Option<String>,
    customer_phone: Option<String>,
    table_number: String,
    items: String,
    subtotal: f64,
    gst_rate: f64,
    tax_amount: f64,
    total: f64,
    payment_mode: String,
    cashier_id: Option<i64>,
    cashier_name: Option<String>,
    status: OrderStatus,
    created_at: DateTime<Utc>,
    date: String,
    generated_by: OrderOrigin,
}

impl OrderRow {
    fn into_order(self) -> Order {
        // A row with unreadable items still renders as an order; losing the
        // line detail beats losing the bill
        let items: Vec<OrderItem> = match serde_json::from_str(&self.items) {
            Ok(items) => items,
            Err(e) => {
                warn!(id = self.id, error = %e, "Unparseable items column, returning empty list");
                Vec::new()
            }
        };

        Order {
            id: self.id,
            bill_number: self.bill_number,
            customer_name: self.customer_name,
            customer_phone: self.customer_phone,
            table_number: self.table_number,
            items,
            subtotal: self.subtotal,
            gst_rate: self.gst_rate,
            tax_amount: self.tax_amount,
            total: self.total,
            payment_mode: self.payment_mode,
            cashier_id: self.cashier_id,
            cashier_name: self.cashier_name,
            status: self.status,
            created_at: self.created_at,
            date: self.date,
            generated_by: self.generated_by,
        }
    }
}

const ORDER_COLUMNS: &str = "id, bill_number, customer_name, customer_phone, table_number, \
     items, subtotal, gst_rate, tax_amount, total, payment_mode, \
     cashier_id, cashier_name, status, created_at, date, generated_by";

// =============================================================================
// New Order
// =============================================================================

/// A fully resolved order ready for insertion: the bill number has already
/// been allocated (never a `TEMP-` placeholder) and the status decided.
#[derive(Debug, Clone)]
pub struct NewOrder {
    pub bill_number: String,
    pub customer_name: Option<String>,
    pub customer_phone: Option<String>,
    pub table_number: String,
    pub items: Vec<OrderItem>,
    pub subtotal: f64,
    pub gst_rate: f64,
    pub tax_amount: f64,
    pub total: f64,
    pub payment_mode: String,
    pub cashier_id: Option<i64>,
    pub cashier_name: Option<String>,
    pub status: OrderStatus,
    pub created_at: DateTime<Utc>,
    pub date: String,
    pub generated_by: OrderOrigin,
}

// =============================================================================
// Sales Summary
// =============================================================================

/// Aggregates over completed orders since a point in time.
#[derive(Debug, Clone, Default, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SalesSummary {
    pub total_orders: i64,
    pub total_sales: f64,
    pub total_subtotal: f64,
    pub total_tax: f64,
}

// =============================================================================
// Repository
// =============================================================================

/// Repository for order database operations.
#[derive(Debug, Clone)]
pub struct OrderRepository {
    pool: SqlitePool,
}

impl OrderRepository {
    /// Creates a new OrderRepository.
    pub fn new(pool: SqlitePool) -> Self {
        OrderRepository { pool }
    }

    /// Gets an order by row id.
    pub async fn get_by_id(&self, id: i64) -> DbResult<Option<Order>> {
        let row: Option<OrderRow> = sqlx::query_as(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders WHERE id = ?1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(OrderRow::into_order))
    }

    /// Gets an order by bill number.
    pub async fn get_by_bill_number(&self, bill_number: &str) -> DbResult<Option<Order>> {
        let row: Option<OrderRow> = sqlx::query_as(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders WHERE bill_number = ?1"
        ))
        .bind(bill_number)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(OrderRow::into_order))
    }

    /// Existence pre-check used inside the bill allocation retry loop.
    pub async fn bill_number_exists(&self, bill_number: &str) -> DbResult<bool> {
        let id: Option<i64> = sqlx::query_scalar("SELECT id FROM orders WHERE bill_number = ?1")
            .bind(bill_number)
            .fetch_optional(&self.pool)
            .await?;

        Ok(id.is_some())
    }

    /// Content-match candidates for the duplicate detector: orders created
    /// after `window_start` with the same customer name, table, grand total,
    /// and origin. Item-level comparison happens in the caller.
    pub async fn recent_matching(
        &self,
        window_start: DateTime<Utc>,
        customer_name: &str,
        table_number: &str,
        total: f64,
        generated_by: OrderOrigin,
    ) -> DbResult<Vec<Order>> {
        let rows: Vec<OrderRow> = sqlx::query_as(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders \
             WHERE created_at > ?1 \
               AND COALESCE(customer_name, '') = ?2 \
               AND table_number = ?3 \
               AND total = ?4 \
               AND generated_by = ?5"
        ))
        .bind(window_start)
        .bind(customer_name)
        .bind(table_number)
        .bind(total)
        .bind(generated_by)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(OrderRow::into_order).collect())
    }

    /// Inserts an order. Returns the new row id.
    ///
    /// A `DbError::UniqueViolation` on `orders.bill_number` here means a
    /// true race slipped past the pre-check; the caller surfaces it as a
    /// conflict, never retries blindly.
    pub async fn insert(&self, order: &NewOrder) -> DbResult<i64> {
        debug!(bill_number = %order.bill_number, table = %order.table_number, "Inserting order");

        let items_json = serde_json::to_string(&order.items)
            .map_err(|e| DbError::Internal(format!("items serialization failed: {e}")))?;

        let result = sqlx::query(
            "INSERT INTO orders ( \
                bill_number, customer_name, customer_phone, table_number, \
                items, subtotal, gst_rate, tax_amount, total, payment_mode, \
                cashier_id, cashier_name, status, created_at, date, generated_by \
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16)",
        )
        .bind(&order.bill_number)
        .bind(&order.customer_name)
        .bind(&order.customer_phone)
        .bind(&order.table_number)
        .bind(items_json)
        .bind(order.subtotal)
        .bind(order.gst_rate)
        .bind(order.tax_amount)
        .bind(order.total)
        .bind(&order.payment_mode)
        .bind(order.cashier_id)
        .bind(&order.cashier_name)
        .bind(order.status)
        .bind(order.created_at)
        .bind(&order.date)
        .bind(order.generated_by)
        .execute(&self.pool)
        .await?;

        Ok(result.last_insert_rowid())
    }

    /// Updates an order's status. Idempotent at the row level; a missing id
    /// reports not-found rather than erroring.
    pub async fn update_status(&self, id: i64, status: OrderStatus) -> DbResult<()> {
        let result = sqlx::query("UPDATE orders SET status = ?2 WHERE id = ?1")
            .bind(id)
            .bind(status)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Order", id.to_string()));
        }

        Ok(())
    }

    /// Deletes an order (admin operation).
    pub async fn delete(&self, id: i64) -> DbResult<()> {
        let result = sqlx::query("DELETE FROM orders WHERE id = ?1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Order", id.to_string()));
        }

        Ok(())
    }

    /// All orders, newest first (bootstrap dataset).
    pub async fn list_all(&self) -> DbResult<Vec<Order>> {
        let rows: Vec<OrderRow> = sqlx::query_as(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders ORDER BY created_at DESC"
        ))
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(OrderRow::into_order).collect())
    }

    /// Aggregates completed orders created at or after `since`.
    pub async fn sales_summary(&self, since: DateTime<Utc>) -> DbResult<SalesSummary> {
        let (total_orders, total_sales, total_subtotal, total_tax): (i64, f64, f64, f64) =
            sqlx::query_as(
                "SELECT COUNT(*), \
                        COALESCE(SUM(total), 0.0), \
                        COALESCE(SUM(subtotal), 0.0), \
                        COALESCE(SUM(tax_amount), 0.0) \
                 FROM orders \
                 WHERE created_at >= ?1 AND status = 'completed'",
            )
            .bind(since)
            .fetch_one(&self.pool)
            .await?;

        Ok(SalesSummary {
            total_orders,
            total_sales,
            total_subtotal,
            total_tax,
        })
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};
    use chrono::Duration;

    fn tea_order(bill_number: &str, created_at: DateTime<Utc>) -> NewOrder {
        NewOrder {
            bill_number: bill_number.to_string(),
            customer_name: Some("Ravi".to_string()),
            customer_phone: None,
            table_number: "5".to_string(),
            items: vec![OrderItem {
                name: "Tea".to_string(),
                price: 25.0,
                quantity: 2,
                total: 50.0,
            }],
            subtotal: 50.0,
            gst_rate: 5.0,
            tax_amount: 2.5,
            total: 52.5,
            payment_mode: "Cash".to_string(),
            cashier_id: None,
            cashier_name: Some("DIPANJOLI".to_string()),
            status: OrderStatus::Completed,
            created_at,
            date: created_at.format("%Y-%m-%d").to_string(),
            generated_by: OrderOrigin::Cashier,
        }
    }

    #[tokio::test]
    async fn test_insert_and_fetch_round_trip() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.orders();

        let id = repo.insert(&tea_order("1001", Utc::now())).await.unwrap();
        let order = repo.get_by_id(id).await.unwrap().unwrap();

        assert_eq!(order.bill_number, "1001");
        assert_eq!(order.items.len(), 1);
        assert_eq!(order.items[0].name, "Tea");
        assert_eq!(order.status, OrderStatus::Completed);
        assert!(repo.bill_number_exists("1001").await.unwrap());
        assert!(!repo.bill_number_exists("9999").await.unwrap());
    }

    #[tokio::test]
    async fn test_duplicate_bill_number_is_unique_violation() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.orders();

        repo.insert(&tea_order("1001", Utc::now())).await.unwrap();
        let err = repo.insert(&tea_order("1001", Utc::now())).await.unwrap_err();

        assert!(err.is_unique_violation_on("orders.bill_number"));
    }

    #[tokio::test]
    async fn test_recent_matching_respects_window() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.orders();
        let now = Utc::now();

        repo.insert(&tea_order("1001", now - Duration::minutes(10)))
            .await
            .unwrap();
        repo.insert(&tea_order("1002", now - Duration::minutes(2)))
            .await
            .unwrap();

        let candidates = repo
            .recent_matching(
                now - Duration::minutes(5),
                "Ravi",
                "5",
                52.5,
                OrderOrigin::Cashier,
            )
            .await
            .unwrap();

        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].bill_number, "1002");
    }

    #[tokio::test]
    async fn test_recent_matching_filters_on_origin_and_table() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.orders();
        let now = Utc::now();

        let mut admin_order = tea_order("1001", now);
        admin_order.generated_by = OrderOrigin::Admin;
        repo.insert(&admin_order).await.unwrap();

        let candidates = repo
            .recent_matching(
                now - Duration::minutes(5),
                "Ravi",
                "5",
                52.5,
                OrderOrigin::Cashier,
            )
            .await
            .unwrap();
        assert!(candidates.is_empty());
    }

    #[tokio::test]
    async fn test_update_status_missing_row_is_not_found() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.orders();

        let err = repo
            .update_status(424242, OrderStatus::Completed)
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_delete_missing_row_is_not_found() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.orders();

        let err = repo.delete(424242).await.unwrap_err();
        assert!(matches!(err, DbError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_sales_summary_counts_only_completed() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.orders();
        let now = Utc::now();

        repo.insert(&tea_order("1001", now)).await.unwrap();
        let mut pending = tea_order("1002", now);
        pending.status = OrderStatus::Pending;
        repo.insert(&pending).await.unwrap();

        let summary = repo.sales_summary(now - Duration::hours(1)).await.unwrap();
        assert_eq!(summary.total_orders, 1);
        assert!((summary.total_sales - 52.5).abs() < 0.001);
        assert!((summary.total_tax - 2.5).abs() < 0.001);
    }
}
