//! # Menu Repository
//!
//! Database operations for menu items and categories. Plain CRUD: menu
//! data is a collaborator of the submission core, consumed as-is.

use chrono::Utc;
use sqlx::SqlitePool;
use tracing::debug;

use crate::error::{DbError, DbResult};
use dhaba_core::{MenuItem, MenuItemInput};

/// Repository for menu database operations.
#[derive(Debug, Clone)]
pub struct MenuRepository {
    pool: SqlitePool,
}

impl MenuRepository {
    /// Creates a new MenuRepository.
    pub fn new(pool: SqlitePool) -> Self {
        MenuRepository { pool }
    }

    /// All menu items, in insertion order.
    pub async fn list_items(&self) -> DbResult<Vec<MenuItem>> {
        let items: Vec<MenuItem> = sqlx::query_as(
            "SELECT id, name, category, price, available, created_at, updated_at \
             FROM menu_items ORDER BY id",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(items)
    }

    /// All category names, alphabetically.
    pub async fn list_categories(&self) -> DbResult<Vec<String>> {
        let names: Vec<String> =
            sqlx::query_scalar("SELECT name FROM menu_categories ORDER BY name")
                .fetch_all(&self.pool)
                .await?;

        Ok(names)
    }

    /// Adds a menu item. Returns the new row id.
    pub async fn insert_item(&self, item: &MenuItemInput) -> DbResult<i64> {
        debug!(name = %item.name, category = %item.category, "Adding menu item");
        let now = Utc::now();

        let result = sqlx::query(
            "INSERT INTO menu_items (name, category, price, available, created_at, updated_at) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?5)",
        )
        .bind(&item.name)
        .bind(&item.category)
        .bind(item.price)
        .bind(item.available)
        .bind(now)
        .execute(&self.pool)
        .await?;

        Ok(result.last_insert_rowid())
    }

    /// Updates a menu item in full.
    pub async fn update_item(&self, id: i64, item: &MenuItemInput) -> DbResult<()> {
        let now = Utc::now();

        let result = sqlx::query(
            "UPDATE menu_items SET name = ?2, category = ?3, price = ?4, available = ?5, \
             updated_at = ?6 WHERE id = ?1",
        )
        .bind(id)
        .bind(&item.name)
        .bind(&item.category)
        .bind(item.price)
        .bind(item.available)
        .bind(now)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Menu item", id.to_string()));
        }

        Ok(())
    }

    /// Deletes a menu item.
    pub async fn delete_item(&self, id: i64) -> DbResult<()> {
        let result = sqlx::query("DELETE FROM menu_items WHERE id = ?1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Menu item", id.to_string()));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};

    fn chai() -> MenuItemInput {
        MenuItemInput {
            name: "Masala Chai".to_string(),
            category: "Beverages".to_string(),
            price: 25.0,
            available: true,
        }
    }

    #[tokio::test]
    async fn test_menu_item_crud() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.menu();

        let id = repo.insert_item(&chai()).await.unwrap();
        let items = repo.list_items().await.unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].name, "Masala Chai");

        let mut updated = chai();
        updated.price = 30.0;
        updated.available = false;
        repo.update_item(id, &updated).await.unwrap();

        let items = repo.list_items().await.unwrap();
        assert!((items[0].price - 30.0).abs() < f64::EPSILON);
        assert!(!items[0].available);

        repo.delete_item(id).await.unwrap();
        assert!(repo.list_items().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_update_missing_item_is_not_found() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let err = db.menu().update_item(7, &chai()).await.unwrap_err();
        assert!(matches!(err, DbError::NotFound { .. }));
    }
}
