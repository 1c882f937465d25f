//! # dhaba-db: Database Layer for Dhaba POS
//!
//! SQLite storage for the POS with sqlx for async operations.
//!
//! ## Module Organization
//!
//! - [`pool`] - Connection pool creation and configuration
//! - [`migrations`] - Embedded database migrations
//! - [`seed`] - Default dataset for a fresh database
//! - [`error`] - Database error types
//! - [`repository`] - Repository implementations (order, menu, user, settings)
//!
//! ## Usage
//!
//! ```rust,ignore
//! use dhaba_db::{Database, DbConfig};
//!
//! let db = Database::new(DbConfig::new("restaurant_pos.db")).await?;
//! let orders = db.orders().list_all().await?;
//! ```
//!
//! The orders repository is the persistence half of the duplicate-prevention
//! core: its UNIQUE constraint on `bill_number` is the invariant every
//! in-memory dedup layer ultimately leans on.

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;
pub mod seed;

// =============================================================================
// Re-exports
// =============================================================================

pub use error::{DbError, DbResult};
pub use pool::{Database, DbConfig};

// Repository re-exports for convenience
pub use repository::menu::MenuRepository;
pub use repository::order::{NewOrder, OrderRepository, SalesSummary};
pub use repository::settings::SettingsRepository;
pub use repository::user::UserRepository;
