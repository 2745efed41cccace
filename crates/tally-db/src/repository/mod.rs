//! # Repository Module
//!
//! Database repository implementations for Tally POS.
//!
//! ## Repository Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Caller                                                                │
//! │       │  db.catalog().list("tenant-1")                                 │
//! │       ▼                                                                 │
//! │  CatalogRepository / InvoiceRepository   (pool-backed reads, CRUD)     │
//! │       │                                                                 │
//! │       │  executor-generic query functions, also used by                │
//! │       │  SqliteTransaction in store.rs                                 │
//! │       ▼                                                                 │
//! │  SQLite Database                                                       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Available Repositories
//!
//! - [`CatalogRepository`](catalog::CatalogRepository) - Catalog item CRUD and stock
//! - [`InvoiceRepository`](invoice::InvoiceRepository) - Invoice lookups and listings

pub mod catalog;
pub mod invoice;
