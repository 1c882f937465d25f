//! # Settings Repository
//!
//! Restaurant profile, payment modes, and QR configuration. The profile and
//! QR config behave as "latest row wins" singletons, mirroring how the
//! admin screens edit them.

use chrono::Utc;
use sqlx::SqlitePool;

use crate::error::DbResult;
use dhaba_core::{QrConfig, QrConfigUpdate, RestaurantSettings, RestaurantSettingsUpdate};

/// Repository for settings-adjacent tables.
#[derive(Debug, Clone)]
pub struct SettingsRepository {
    pool: SqlitePool,
}

impl SettingsRepository {
    /// Creates a new SettingsRepository.
    pub fn new(pool: SqlitePool) -> Self {
        SettingsRepository { pool }
    }

    // =========================================================================
    // Restaurant Profile
    // =========================================================================

    /// The current restaurant profile (latest row), if any.
    pub async fn restaurant(&self) -> DbResult<Option<RestaurantSettings>> {
        let settings: Option<RestaurantSettings> = sqlx::query_as(
            "SELECT id, name, address, gstin, fssai, phone, gst_rate, upi_id, \
             merchant_name, logo \
             FROM restaurant_settings ORDER BY id DESC LIMIT 1",
        )
        .fetch_optional(&self.pool)
        .await?;

        Ok(settings)
    }

    /// Applies a partial update to the current profile; only provided
    /// fields change.
    pub async fn update_restaurant(&self, update: &RestaurantSettingsUpdate) -> DbResult<()> {
        let now = Utc::now();

        sqlx::query(
            "UPDATE restaurant_settings SET \
                name = COALESCE(?1, name), \
                address = COALESCE(?2, address), \
                gstin = COALESCE(?3, gstin), \
                fssai = COALESCE(?4, fssai), \
                phone = COALESCE(?5, phone), \
                gst_rate = COALESCE(?6, gst_rate), \
                upi_id = COALESCE(?7, upi_id), \
                merchant_name = COALESCE(?8, merchant_name), \
                logo = COALESCE(?9, logo), \
                updated_at = ?10 \
             WHERE id = (SELECT id FROM restaurant_settings ORDER BY id DESC LIMIT 1)",
        )
        .bind(&update.name)
        .bind(&update.address)
        .bind(&update.gstin)
        .bind(&update.fssai)
        .bind(&update.phone)
        .bind(update.gst_rate)
        .bind(&update.upi_id)
        .bind(&update.merchant_name)
        .bind(&update.logo)
        .bind(now)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    // =========================================================================
    // Payment Modes
    // =========================================================================

    /// All payment mode labels, alphabetically.
    pub async fn payment_modes(&self) -> DbResult<Vec<String>> {
        let names: Vec<String> =
            sqlx::query_scalar("SELECT name FROM payment_modes ORDER BY name")
                .fetch_all(&self.pool)
                .await?;

        Ok(names)
    }

    // =========================================================================
    // QR Configuration
    // =========================================================================

    /// The current QR configuration (latest row), if any.
    pub async fn qr_config(&self) -> DbResult<Option<QrConfig>> {
        let config: Option<QrConfig> = sqlx::query_as(
            "SELECT id, upi_id, merchant_name, enabled, fixed_amount, uploaded_image \
             FROM qr_config ORDER BY id DESC LIMIT 1",
        )
        .fetch_optional(&self.pool)
        .await?;

        Ok(config)
    }

    /// Updates the latest QR configuration row, or inserts one when the
    /// table is empty.
    pub async fn upsert_qr_config(&self, update: &QrConfigUpdate) -> DbResult<()> {
        let now = Utc::now();

        let existing: Option<i64> =
            sqlx::query_scalar("SELECT id FROM qr_config ORDER BY id DESC LIMIT 1")
                .fetch_optional(&self.pool)
                .await?;

        match existing {
            Some(id) => {
                sqlx::query(
                    "UPDATE qr_config SET upi_id = ?2, merchant_name = ?3, enabled = ?4, \
                     fixed_amount = ?5, uploaded_image = ?6, updated_at = ?7 WHERE id = ?1",
                )
                .bind(id)
                .bind(&update.upi_id)
                .bind(&update.merchant_name)
                .bind(update.enabled)
                .bind(update.fixed_amount)
                .bind(&update.uploaded_image)
                .bind(now)
                .execute(&self.pool)
                .await?;
            }
            None => {
                sqlx::query(
                    "INSERT INTO qr_config (upi_id, merchant_name, enabled, fixed_amount, \
                     uploaded_image, created_at, updated_at) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?6)",
                )
                .bind(&update.upi_id)
                .bind(&update.merchant_name)
                .bind(update.enabled)
                .bind(update.fixed_amount)
                .bind(&update.uploaded_image)
                .bind(now)
                .execute(&self.pool)
                .await?;
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};
    use crate::seed;

    #[tokio::test]
    async fn test_partial_restaurant_update() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        seed::seed_defaults(&db).await.unwrap();
        let repo = db.settings();

        let before = repo.restaurant().await.unwrap().unwrap();

        let update = RestaurantSettingsUpdate {
            gst_rate: Some(12.0),
            ..Default::default()
        };
        repo.update_restaurant(&update).await.unwrap();

        let after = repo.restaurant().await.unwrap().unwrap();
        assert!((after.gst_rate - 12.0).abs() < f64::EPSILON);
        // Untouched fields survive
        assert_eq!(after.name, before.name);
        assert_eq!(after.upi_id, before.upi_id);
    }

    #[tokio::test]
    async fn test_qr_config_upsert() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.settings();

        assert!(repo.qr_config().await.unwrap().is_none());

        let update = QrConfigUpdate {
            upi_id: Some("dhaba@upi".to_string()),
            merchant_name: Some("Highway Dhaba".to_string()),
            enabled: true,
            fixed_amount: false,
            uploaded_image: None,
        };
        repo.upsert_qr_config(&update).await.unwrap();

        let config = repo.qr_config().await.unwrap().unwrap();
        assert_eq!(config.upi_id.as_deref(), Some("dhaba@upi"));

        // Second upsert edits the same row instead of stacking new ones
        let update = QrConfigUpdate {
            enabled: false,
            ..update
        };
        repo.upsert_qr_config(&update).await.unwrap();

        let config = repo.qr_config().await.unwrap().unwrap();
        assert!(!config.enabled);
    }
}
