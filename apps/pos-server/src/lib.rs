//! # Dhaba POS Server
//!
//! HTTP API for the restaurant POS. The interesting part is order
//! submission: every other route is plain CRUD over the collaborator
//! tables.
//!
//! ## Submission Pipeline
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                     POST /api/orders                                    │
//! │                                                                         │
//! │  validate (400 before any lock)                                        │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  fingerprint ──► RequestLockTable.acquire ──── held? ──► 409           │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  duplicate detector (id match, content match) ── match? ──► 409        │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  bill allocator + insert (≤5 attempts) ── explicit collision? ──► 409  │
//! │       │                                       exhausted? ──► 500       │
//! │       ▼                                                                 │
//! │  release lock (ALWAYS, on every exit path) ──► 200 {billNumber}        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

pub mod config;
pub mod error;
pub mod metrics;
pub mod routes;
pub mod services;
pub mod state;

pub use config::ServerConfig;
pub use routes::build_router;
pub use state::AppState;
