//! # Default Dataset
//!
//! Populates a fresh database with a usable starting dataset: one
//! restaurant profile, an admin and two cashiers, a small menu, and the
//! standard payment modes. Runs at server startup and is a no-op whenever
//! any user already exists.

use chrono::Utc;
use tracing::info;

use crate::error::DbResult;
use crate::pool::Database;
use dhaba_core::{MenuItemInput, QrConfigUpdate, UserInput};

/// Default menu, priced in rupees.
const DEFAULT_MENU: &[(&str, &str, f64)] = &[
    ("Paneer Tikka", "Appetizers", 180.00),
    ("Butter Chicken", "Main Course", 280.00),
    ("Dal Makhani", "Main Course", 220.00),
    ("Chicken Biryani", "Main Course", 320.00),
    ("Masala Chai", "Beverages", 25.00),
    ("Lassi", "Beverages", 40.00),
    ("Gulab Jamun", "Desserts", 12.00),
    ("Malai Kalakand", "Desserts", 20.00),
];

const DEFAULT_CATEGORIES: &[&str] = &[
    "Appetizers",
    "Main Course",
    "Beverages",
    "Desserts",
    "Special Items",
];

const DEFAULT_PAYMENT_MODES: &[&str] = &["Cash", "UPI", "Card", "Online", "Credit"];

/// Seeds default data into an empty database.
///
/// Idempotent: checks the users table and returns immediately when the
/// database has already been set up.
pub async fn seed_defaults(db: &Database) -> DbResult<()> {
    if db.users().count().await? > 0 {
        return Ok(());
    }

    info!("Empty database, inserting default data");
    let now = Utc::now();

    sqlx::query(
        "INSERT INTO restaurant_settings (name, address, gstin, fssai, phone, gst_rate, \
         upi_id, merchant_name, created_at, updated_at) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?9)",
    )
    .bind("Highway Dhaba")
    .bind("NH-15 Bypass, Dibrugarh, Assam, PIN 786012")
    .bind("18AAAAA0000A1Z5")
    .bind("20323116000543")
    .bind("+91 9876543210")
    .bind(5.0_f64)
    .bind("highwaydhaba@upi")
    .bind("Highway Dhaba")
    .bind(now)
    .execute(db.pool())
    .await?;

    let users = [
        UserInput {
            username: "admin".to_string(),
            password: "admin123".to_string(),
            role: "admin".to_string(),
            name: "Restaurant Manager".to_string(),
            phone: Some("+91 9876543210".to_string()),
            permissions: Some(
                "generate_bills,export_data,print_all,edit_orders,delete_orders".to_string(),
            ),
        },
        UserInput {
            username: "cashier1".to_string(),
            password: "cash123".to_string(),
            role: "cashier".to_string(),
            name: "Dipanjoli".to_string(),
            phone: Some("+91 9876543211".to_string()),
            permissions: Some("create_orders,print_own,view_own_history".to_string()),
        },
        UserInput {
            username: "cashier2".to_string(),
            password: "cash456".to_string(),
            role: "cashier".to_string(),
            name: "Lina".to_string(),
            phone: Some("+91 9876543212".to_string()),
            permissions: Some("create_orders,print_own,view_own_history".to_string()),
        },
    ];
    for user in &users {
        db.users().insert(user).await?;
    }

    for category in DEFAULT_CATEGORIES {
        sqlx::query("INSERT INTO menu_categories (name, created_at) VALUES (?1, ?2)")
            .bind(category)
            .bind(now)
            .execute(db.pool())
            .await?;
    }

    for (name, category, price) in DEFAULT_MENU {
        db.menu()
            .insert_item(&MenuItemInput {
                name: (*name).to_string(),
                category: (*category).to_string(),
                price: *price,
                available: true,
            })
            .await?;
    }

    for mode in DEFAULT_PAYMENT_MODES {
        sqlx::query("INSERT INTO payment_modes (name, created_at) VALUES (?1, ?2)")
            .bind(mode)
            .bind(now)
            .execute(db.pool())
            .await?;
    }

    db.settings()
        .upsert_qr_config(&QrConfigUpdate {
            upi_id: Some("highwaydhaba@upi".to_string()),
            merchant_name: Some("Highway Dhaba".to_string()),
            enabled: true,
            fixed_amount: false,
            uploaded_image: None,
        })
        .await?;

    info!("Default data inserted");
    Ok(())
}
