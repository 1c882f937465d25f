//! # User Repository
//!
//! Database operations for POS users. Authentication is a plain credential
//! match performed by the client against the bootstrap dataset; this
//! repository only stores and serves the records.

use chrono::Utc;
use sqlx::SqlitePool;
use tracing::debug;

use crate::error::{DbError, DbResult};
use dhaba_core::{User, UserInput};

const USER_COLUMNS: &str =
    "id, username, password, role, name, phone, last_login, permissions";

/// Repository for user database operations.
#[derive(Debug, Clone)]
pub struct UserRepository {
    pool: SqlitePool,
}

impl UserRepository {
    /// Creates a new UserRepository.
    pub fn new(pool: SqlitePool) -> Self {
        UserRepository { pool }
    }

    /// All users, in insertion order.
    pub async fn list(&self) -> DbResult<Vec<User>> {
        let users: Vec<User> =
            sqlx::query_as(&format!("SELECT {USER_COLUMNS} FROM users ORDER BY id"))
                .fetch_all(&self.pool)
                .await?;

        Ok(users)
    }

    /// Number of users; a fresh database has zero and gets seeded.
    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users")
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }

    /// Adds a user. Returns the new row id.
    pub async fn insert(&self, user: &UserInput) -> DbResult<i64> {
        debug!(username = %user.username, role = %user.role, "Adding user");
        let now = Utc::now();

        let result = sqlx::query(
            "INSERT INTO users (username, password, role, name, phone, permissions, \
             created_at, updated_at) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?7)",
        )
        .bind(&user.username)
        .bind(&user.password)
        .bind(&user.role)
        .bind(&user.name)
        .bind(&user.phone)
        .bind(&user.permissions)
        .bind(now)
        .execute(&self.pool)
        .await?;

        Ok(result.last_insert_rowid())
    }

    /// Updates a user's password.
    pub async fn update_password(&self, id: i64, password: &str) -> DbResult<()> {
        let now = Utc::now();

        let result =
            sqlx::query("UPDATE users SET password = ?2, updated_at = ?3 WHERE id = ?1")
                .bind(id)
                .bind(password)
                .bind(now)
                .execute(&self.pool)
                .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("User", id.to_string()));
        }

        Ok(())
    }

    /// Stamps a user's last login time.
    pub async fn touch_last_login(&self, id: i64) -> DbResult<()> {
        let now = Utc::now();

        let result = sqlx::query("UPDATE users SET last_login = ?2 WHERE id = ?1")
            .bind(id)
            .bind(now)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("User", id.to_string()));
        }

        Ok(())
    }

    /// Deletes a user.
    pub async fn delete(&self, id: i64) -> DbResult<()> {
        let result = sqlx::query("DELETE FROM users WHERE id = ?1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("User", id.to_string()));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};

    fn cashier() -> UserInput {
        UserInput {
            username: "cashier1".to_string(),
            password: "cash123".to_string(),
            role: "cashier".to_string(),
            name: "Lina".to_string(),
            phone: None,
            permissions: Some("create_orders,print_own".to_string()),
        }
    }

    #[tokio::test]
    async fn test_user_lifecycle() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.users();

        assert_eq!(repo.count().await.unwrap(), 0);

        let id = repo.insert(&cashier()).await.unwrap();
        assert_eq!(repo.count().await.unwrap(), 1);

        repo.update_password(id, "newpass").await.unwrap();
        repo.touch_last_login(id).await.unwrap();

        let users = repo.list().await.unwrap();
        assert_eq!(users[0].password, "newpass");
        assert!(users[0].last_login.is_some());

        repo.delete(id).await.unwrap();
        assert_eq!(repo.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_duplicate_username_is_unique_violation() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.users();

        repo.insert(&cashier()).await.unwrap();
        let err = repo.insert(&cashier()).await.unwrap_err();
        assert!(matches!(err, DbError::UniqueViolation { .. }));
    }
}
