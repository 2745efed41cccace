//! # Record Store
//!
//! The transactional port the invoice engine is written against, and its
//! SQLite implementation.
//!
//! ## Shape
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  RecordStore (shared, Clone)                                            │
//! │  ├── begin() ─────────────────────► StoreTransaction (one operation)   │
//! │  │                                  ├── find_item / lock_item          │
//! │  │                                  ├── deduct_stock                   │
//! │  │                                  ├── find_invoice / lock_invoice    │
//! │  │                                  ├── find_pending_for_table         │
//! │  │                                  ├── invoice_number_exists          │
//! │  │                                  ├── insert_invoice / update_invoice│
//! │  │                                  ├── replace_lines / lines          │
//! │  │                                  └── commit / rollback              │
//! │  └── find_item / find_invoice / invoice_lines / list_invoices (reads)  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## SQLite Locking
//! SQLite locks the whole database, not rows. [`SqliteStore::begin`] first
//! takes the in-process writer gate, so write transactions from this process
//! run one at a time from `begin` until `commit`, `rollback` or drop.
//! `lock_*` additionally touches the row, which takes SQLite's write lock and
//! keeps other processes out too. Stock is deducted with a conditional
//! decrement, so a stale read can never drive stock below zero.
//!
//! Dropping a transaction without committing rolls it back.

use async_trait::async_trait;
use sqlx::{Sqlite, SqlitePool, Transaction};
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::{debug, warn};

use crate::error::{DbError, DbResult};
use crate::repository::{catalog, invoice};
use tally_core::access::ReadScope;
use tally_core::{CatalogItem, Invoice, InvoiceLine, InvoiceQuery};

// =============================================================================
// Ports
// =============================================================================

/// Persistent storage for catalog items and invoices.
#[async_trait]
pub trait RecordStore: Send + Sync {
    type Tx: StoreTransaction;

    /// Starts a write transaction.
    async fn begin(&self) -> DbResult<Self::Tx>;

    /// Reads an item within a tenant, outside any transaction.
    async fn find_item(&self, tenant_id: &str, item_id: &str) -> DbResult<Option<CatalogItem>>;

    /// Reads an invoice visible in `scope`.
    async fn find_invoice(&self, scope: &ReadScope, invoice_id: &str) -> DbResult<Option<Invoice>>;

    /// Reads an invoice's lines ordered by position.
    async fn invoice_lines(&self, invoice_id: &str) -> DbResult<Vec<InvoiceLine>>;

    /// Lists invoices visible in `scope`, newest first.
    async fn list_invoices(&self, scope: &ReadScope, query: &InvoiceQuery)
        -> DbResult<Vec<Invoice>>;
}

/// One atomic unit of work. All writes become visible on `commit` or not at all.
#[async_trait]
pub trait StoreTransaction: Send {
    async fn find_item(&mut self, tenant_id: &str, item_id: &str) -> DbResult<Option<CatalogItem>>;

    /// Reads an item and holds it against concurrent writers until the
    /// transaction ends.
    async fn lock_item(&mut self, tenant_id: &str, item_id: &str) -> DbResult<Option<CatalogItem>>;

    /// Subtracts `quantity` from stock.
    ///
    /// Returns `false`, changing nothing, when the item is stock-limited and
    /// holds less than `quantity`, or does not exist.
    async fn deduct_stock(&mut self, tenant_id: &str, item_id: &str, quantity: i64)
        -> DbResult<bool>;

    async fn find_invoice(&mut self, tenant_id: &str, invoice_id: &str)
        -> DbResult<Option<Invoice>>;

    /// Like `find_invoice`, but held against concurrent writers.
    async fn lock_invoice(&mut self, tenant_id: &str, invoice_id: &str)
        -> DbResult<Option<Invoice>>;

    /// The open order for a table, if any.
    async fn find_pending_for_table(
        &mut self,
        tenant_id: &str,
        table_number: i64,
    ) -> DbResult<Option<Invoice>>;

    async fn invoice_number_exists(&mut self, invoice_number: &str) -> DbResult<bool>;

    async fn insert_invoice(&mut self, invoice: &Invoice) -> DbResult<()>;

    async fn update_invoice(&mut self, invoice: &Invoice) -> DbResult<()>;

    /// Replaces every line of an invoice.
    async fn replace_lines(&mut self, invoice_id: &str, lines: &[InvoiceLine]) -> DbResult<()>;

    async fn lines(&mut self, invoice_id: &str) -> DbResult<Vec<InvoiceLine>>;

    async fn commit(self) -> DbResult<()>;

    async fn rollback(self) -> DbResult<()>;
}

// =============================================================================
// SQLite implementation
// =============================================================================

/// [`RecordStore`] over a SQLite pool. Obtain one with `Database::store()`.
#[derive(Debug, Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
    write_gate: Arc<Mutex<()>>,
}

impl SqliteStore {
    pub(crate) fn new(pool: SqlitePool, write_gate: Arc<Mutex<()>>) -> Self {
        SqliteStore { pool, write_gate }
    }
}

/// A write transaction holding the writer gate.
pub struct SqliteTransaction {
    tx: Transaction<'static, Sqlite>,
    // Released after `tx` is dropped (fields drop in declaration order)
    _gate: OwnedMutexGuard<()>,
}

#[async_trait]
impl RecordStore for SqliteStore {
    type Tx = SqliteTransaction;

    async fn begin(&self) -> DbResult<SqliteTransaction> {
        let gate = Arc::clone(&self.write_gate).lock_owned().await;
        let tx = self
            .pool
            .begin()
            .await
            .map_err(|e| DbError::TransactionFailed(e.to_string()))?;

        debug!("Write transaction started");
        Ok(SqliteTransaction { tx, _gate: gate })
    }

    async fn find_item(&self, tenant_id: &str, item_id: &str) -> DbResult<Option<CatalogItem>> {
        catalog::fetch_item(&self.pool, tenant_id, item_id).await
    }

    async fn find_invoice(&self, scope: &ReadScope, invoice_id: &str) -> DbResult<Option<Invoice>> {
        invoice::fetch_invoice(&self.pool, scope.tenant_id(), invoice_id).await
    }

    async fn invoice_lines(&self, invoice_id: &str) -> DbResult<Vec<InvoiceLine>> {
        invoice::fetch_lines(&self.pool, invoice_id).await
    }

    async fn list_invoices(
        &self,
        scope: &ReadScope,
        query: &InvoiceQuery,
    ) -> DbResult<Vec<Invoice>> {
        invoice::InvoiceRepository::new(self.pool.clone())
            .list(scope, query)
            .await
    }
}

#[async_trait]
impl StoreTransaction for SqliteTransaction {
    async fn find_item(&mut self, tenant_id: &str, item_id: &str) -> DbResult<Option<CatalogItem>> {
        catalog::fetch_item(&mut *self.tx, tenant_id, item_id).await
    }

    async fn lock_item(&mut self, tenant_id: &str, item_id: &str) -> DbResult<Option<CatalogItem>> {
        if !catalog::touch_item(&mut *self.tx, tenant_id, item_id).await? {
            return Ok(None);
        }
        catalog::fetch_item(&mut *self.tx, tenant_id, item_id).await
    }

    async fn deduct_stock(
        &mut self,
        tenant_id: &str,
        item_id: &str,
        quantity: i64,
    ) -> DbResult<bool> {
        catalog::decrement_stock(&mut *self.tx, tenant_id, item_id, quantity).await
    }

    async fn find_invoice(
        &mut self,
        tenant_id: &str,
        invoice_id: &str,
    ) -> DbResult<Option<Invoice>> {
        invoice::fetch_invoice(&mut *self.tx, Some(tenant_id), invoice_id).await
    }

    async fn lock_invoice(
        &mut self,
        tenant_id: &str,
        invoice_id: &str,
    ) -> DbResult<Option<Invoice>> {
        let touched =
            sqlx::query("UPDATE invoices SET status = status WHERE id = ?1 AND tenant_id = ?2")
                .bind(invoice_id)
                .bind(tenant_id)
                .execute(&mut *self.tx)
                .await?;

        if touched.rows_affected() == 0 {
            return Ok(None);
        }
        invoice::fetch_invoice(&mut *self.tx, Some(tenant_id), invoice_id).await
    }

    async fn find_pending_for_table(
        &mut self,
        tenant_id: &str,
        table_number: i64,
    ) -> DbResult<Option<Invoice>> {
        invoice::fetch_pending_for_table(&mut *self.tx, tenant_id, table_number).await
    }

    async fn invoice_number_exists(&mut self, invoice_number: &str) -> DbResult<bool> {
        invoice::number_exists(&mut *self.tx, invoice_number).await
    }

    async fn insert_invoice(&mut self, record: &Invoice) -> DbResult<()> {
        invoice::insert_invoice(&mut *self.tx, record).await
    }

    async fn update_invoice(&mut self, record: &Invoice) -> DbResult<()> {
        invoice::update_invoice(&mut *self.tx, record).await
    }

    async fn replace_lines(&mut self, invoice_id: &str, lines: &[InvoiceLine]) -> DbResult<()> {
        invoice::replace_lines(&mut *self.tx, invoice_id, lines).await
    }

    async fn lines(&mut self, invoice_id: &str) -> DbResult<Vec<InvoiceLine>> {
        invoice::fetch_lines(&mut *self.tx, invoice_id).await
    }

    async fn commit(self) -> DbResult<()> {
        self.tx
            .commit()
            .await
            .map_err(|e| DbError::TransactionFailed(e.to_string()))?;
        debug!("Write transaction committed");
        Ok(())
    }

    async fn rollback(self) -> DbResult<()> {
        self.tx.rollback().await.map_err(|e| {
            warn!(error = %e, "Rollback failed");
            DbError::TransactionFailed(e.to_string())
        })?;
        debug!("Write transaction rolled back");
        Ok(())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
