//! # tally-db: Record Store for Tally POS
//!
//! This crate provides database access for the Tally POS engine.
//! It uses SQLite with sqlx for async operations.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Tally POS Data Flow                              │
//! │                                                                         │
//! │  InvoiceService::complete (tally-engine)                               │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     tally-db (THIS CRATE)                       │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐    ┌───────────────┐    ┌──────────────┐  │   │
//! │  │   │   Database    │    │  Repositories │    │  Migrations  │  │   │
//! │  │   │   (pool.rs)   │    │ catalog.rs    │    │  (embedded)  │  │   │
//! │  │   │ SqlitePool    │◄───│ invoice.rs    │    │ 001_init.sql │  │   │
//! │  │   │ writer gate   │    └───────▲───────┘    └──────────────┘  │   │
//! │  │   └───────┬───────┘            │                              │   │
//! │  │           │            ┌───────┴───────────────────────┐      │   │
//! │  │           └───────────►│ store.rs: RecordStore,        │      │   │
//! │  │                        │ StoreTransaction (SQLite)     │      │   │
//! │  │                        └───────────────────────────────┘      │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     SQLite Database (tally.db)                  │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`pool`] - Connection pool creation and configuration
//! - [`migrations`] - Embedded database migrations
//! - [`error`] - Database error types
//! - [`repository`] - Catalog and invoice repositories
//! - [`store`] - Transactional Record Store port and its SQLite implementation
//!
//! ## Usage
//!
//! ```rust,ignore
//! use tally_db::{Database, DbConfig, RecordStore, StoreTransaction};
//!
//! let db = Database::new(DbConfig::new("tally.db")).await?;
//! let menu = db.catalog().list("tenant-1").await?;
//!
//! let mut tx = db.store().begin().await?;
//! let item = tx.lock_item("tenant-1", &menu[0].id).await?;
//! tx.commit().await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;
pub mod store;

// =============================================================================
// Re-exports
// =============================================================================

pub use error::{DbError, DbResult};
pub use pool::{Database, DbConfig};
pub use store::{RecordStore, SqliteStore, SqliteTransaction, StoreTransaction};

// Repository re-exports for convenience
pub use repository::catalog::CatalogRepository;
pub use repository::invoice::InvoiceRepository;
