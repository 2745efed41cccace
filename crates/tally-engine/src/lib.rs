//! # tally-engine: Invoice Lifecycle for Tally POS
//!
//! Turns invoice requests from a tenant admin into priced, stock-checked,
//! persisted invoices.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Tally POS Layers                                 │
//! │                                                                         │
//! │  Host (HTTP handler, desktop command, CLI)                             │
//! │       │  Principal + NewInvoice / OrderUpdate / CompleteOrder          │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                   tally-engine (THIS CRATE)                     │   │
//! │  │                                                                 │   │
//! │  │   service.rs ──► pricing.rs (catalog re-resolution)             │   │
//! │  │       │     └──► guard.rs   (stock reservation)                 │   │
//! │  │       │                                                         │   │
//! │  │   config.rs, error.rs, telemetry.rs                             │   │
//! │  └───────┼─────────────────────────────────────────────────────────┘   │
//! │          │                                                              │
//! │          ├──► tally-core  (merge, pricing math, numbering, policy)     │
//! │          └──► tally-db    (RecordStore over SQLite)                    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```rust,ignore
//! use tally_core::{Principal, RequestedLine};
//! use tally_engine::{bootstrap, EngineConfig, NewInvoice};
//!
//! tally_engine::telemetry::init_tracing();
//! let (db, invoices) = bootstrap(&EngineConfig::load(None)?).await?;
//!
//! let admin = Principal::tenant_admin("spice-hub");
//! let sale = invoices
//!     .create(&admin, NewInvoice::completed(vec![RequestedLine::item("chai", "Chai", 2, 2000)]))
//!     .await?;
//! println!("{} {}", sale.invoice.invoice_number, sale.invoice.total());
//! db.close().await;
//! ```

pub mod config;
pub mod error;
pub mod guard;
pub mod pricing;
pub mod service;
pub mod telemetry;

pub use config::{ConfigError, EngineConfig};
pub use error::{EngineError, EngineResult, ErrorCode, ErrorReport};
pub use guard::{StockGuard, StockMovement};
pub use service::{CompleteOrder, InvoiceService, NewInvoice, OrderUpdate};

use tally_db::{Database, SqliteStore};
use tracing::info;

/// Opens the configured database, runs migrations and builds the service.
pub async fn bootstrap(
    config: &EngineConfig,
) -> EngineResult<(Database, InvoiceService<SqliteStore>)> {
    let db = Database::new(config.db_config()).await?;
    let service = InvoiceService::from_config(db.store(), config);

    info!(
        path = %config.database.path.display(),
        prefix = %config.invoicing.prefix,
        "Invoice engine ready"
    );
    Ok((db, service))
}
