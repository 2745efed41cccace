//! # Invoice Repository
//!
//! Database operations for invoices and invoice lines.
//!
//! ## Invoice Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Invoice Lifecycle                                 │
//! │                                                                         │
//! │  1. OPEN TABLE ORDER                                                   │
//! │     └── insert_invoice() → Invoice { status: pending, table: 4 }       │
//! │     └── replace_lines()                                                │
//! │                                                                         │
//! │  2. EDIT ORDER (any number of times)                                   │
//! │     └── update_invoice() + replace_lines() → same id, same number      │
//! │                                                                         │
//! │  3. COMPLETE                                                           │
//! │     └── stock deducted, update_invoice() → status: completed           │
//! │                                                                         │
//! │  All three run inside one store transaction each (see store.rs).       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The repository itself serves reads outside a transaction: lookups and
//! listings for the read paths.

use sqlx::{Executor, Sqlite, SqliteConnection, SqlitePool};
use tracing::debug;

use crate::error::{DbError, DbResult};
use tally_core::access::ReadScope;
use tally_core::{Invoice, InvoiceLine, InvoiceQuery, InvoiceStatus};

const SELECT_INVOICE: &str = r#"
    SELECT
        id, tenant_id, invoice_number, status, table_number,
        customer_name, customer_phone, payment_mode,
        discount_amount_cents, discount_percent_bps,
        subtotal_cents, discount_cents, tax_cents, total_cents,
        created_at, updated_at, completed_at
    FROM invoices
"#;

const SELECT_LINE: &str = r#"
    SELECT
        id, invoice_id, tenant_id, position, item_id, item_name, quantity,
        unit_price_cents, discount_cents, tax_cents, total_cents
    FROM invoice_lines
"#;

// =============================================================================
// Executor-generic queries (shared by the repository and store transactions)
// =============================================================================

/// `tenant_id = None` means any tenant.
pub(crate) async fn fetch_invoice<'e, E>(
    executor: E,
    tenant_id: Option<&str>,
    invoice_id: &str,
) -> DbResult<Option<Invoice>>
where
    E: Executor<'e, Database = Sqlite>,
{
    let sql = format!("{SELECT_INVOICE} WHERE id = ?1 AND (?2 IS NULL OR tenant_id = ?2)");
    let invoice = sqlx::query_as::<_, Invoice>(&sql)
        .bind(invoice_id)
        .bind(tenant_id)
        .fetch_optional(executor)
        .await?;

    Ok(invoice)
}

pub(crate) async fn fetch_pending_for_table<'e, E>(
    executor: E,
    tenant_id: &str,
    table_number: i64,
) -> DbResult<Option<Invoice>>
where
    E: Executor<'e, Database = Sqlite>,
{
    let sql = format!(
        "{SELECT_INVOICE} WHERE tenant_id = ?1 AND table_number = ?2 AND status = 'pending'"
    );
    let invoice = sqlx::query_as::<_, Invoice>(&sql)
        .bind(tenant_id)
        .bind(table_number)
        .fetch_optional(executor)
        .await?;

    Ok(invoice)
}

pub(crate) async fn fetch_lines<'e, E>(executor: E, invoice_id: &str) -> DbResult<Vec<InvoiceLine>>
where
    E: Executor<'e, Database = Sqlite>,
{
    let sql = format!("{SELECT_LINE} WHERE invoice_id = ?1 ORDER BY position");
    let lines = sqlx::query_as::<_, InvoiceLine>(&sql)
        .bind(invoice_id)
        .fetch_all(executor)
        .await?;

    Ok(lines)
}

pub(crate) async fn number_exists<'e, E>(executor: E, invoice_number: &str) -> DbResult<bool>
where
    E: Executor<'e, Database = Sqlite>,
{
    let found: Option<i64> = sqlx::query_scalar("SELECT 1 FROM invoices WHERE invoice_number = ?1")
        .bind(invoice_number)
        .fetch_optional(executor)
        .await?;

    Ok(found.is_some())
}

pub(crate) async fn insert_invoice<'e, E>(executor: E, invoice: &Invoice) -> DbResult<()>
where
    E: Executor<'e, Database = Sqlite>,
{
    debug!(id = %invoice.id, invoice_number = %invoice.invoice_number, "Inserting invoice");

    sqlx::query(
        r#"
        INSERT INTO invoices (
            id, tenant_id, invoice_number, status, table_number,
            customer_name, customer_phone, payment_mode,
            discount_amount_cents, discount_percent_bps,
            subtotal_cents, discount_cents, tax_cents, total_cents,
            created_at, updated_at, completed_at
        ) VALUES (
            ?1, ?2, ?3, ?4, ?5,
            ?6, ?7, ?8,
            ?9, ?10,
            ?11, ?12, ?13, ?14,
            ?15, ?16, ?17
        )
        "#,
    )
    .bind(&invoice.id)
    .bind(&invoice.tenant_id)
    .bind(&invoice.invoice_number)
    .bind(invoice.status)
    .bind(invoice.table_number)
    .bind(&invoice.customer_name)
    .bind(&invoice.customer_phone)
    .bind(invoice.payment_mode)
    .bind(invoice.discount_amount_cents)
    .bind(invoice.discount_percent_bps)
    .bind(invoice.subtotal_cents)
    .bind(invoice.discount_cents)
    .bind(invoice.tax_cents)
    .bind(invoice.total_cents)
    .bind(invoice.created_at)
    .bind(invoice.updated_at)
    .bind(invoice.completed_at)
    .execute(executor)
    .await?;

    Ok(())
}

/// Overwrites every mutable column. `id`, `tenant_id`, `invoice_number` and
/// `created_at` never change.
pub(crate) async fn update_invoice<'e, E>(executor: E, invoice: &Invoice) -> DbResult<()>
where
    E: Executor<'e, Database = Sqlite>,
{
    debug!(id = %invoice.id, status = %invoice.status, "Updating invoice");

    let result = sqlx::query(
        r#"
        UPDATE invoices SET
            status = ?3,
            table_number = ?4,
            customer_name = ?5,
            customer_phone = ?6,
            payment_mode = ?7,
            discount_amount_cents = ?8,
            discount_percent_bps = ?9,
            subtotal_cents = ?10,
            discount_cents = ?11,
            tax_cents = ?12,
            total_cents = ?13,
            updated_at = ?14,
            completed_at = ?15
        WHERE id = ?1 AND tenant_id = ?2
        "#,
    )
    .bind(&invoice.id)
    .bind(&invoice.tenant_id)
    .bind(invoice.status)
    .bind(invoice.table_number)
    .bind(&invoice.customer_name)
    .bind(&invoice.customer_phone)
    .bind(invoice.payment_mode)
    .bind(invoice.discount_amount_cents)
    .bind(invoice.discount_percent_bps)
    .bind(invoice.subtotal_cents)
    .bind(invoice.discount_cents)
    .bind(invoice.tax_cents)
    .bind(invoice.total_cents)
    .bind(invoice.updated_at)
    .bind(invoice.completed_at)
    .execute(executor)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::not_found("Invoice", &invoice.id));
    }

    Ok(())
}

/// Deletes an invoice's lines and inserts `lines` in their place.
///
/// Takes a connection rather than a generic executor: it runs several
/// statements and must stay on one connection (the caller's transaction).
pub(crate) async fn replace_lines(
    conn: &mut SqliteConnection,
    invoice_id: &str,
    lines: &[InvoiceLine],
) -> DbResult<()> {
    debug!(invoice_id = %invoice_id, count = lines.len(), "Replacing invoice lines");

    sqlx::query("DELETE FROM invoice_lines WHERE invoice_id = ?1")
        .bind(invoice_id)
        .execute(&mut *conn)
        .await?;

    for line in lines {
        sqlx::query(
            r#"
            INSERT INTO invoice_lines (
                id, invoice_id, tenant_id, position, item_id, item_name, quantity,
                unit_price_cents, discount_cents, tax_cents, total_cents
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
            "#,
        )
        .bind(&line.id)
        .bind(invoice_id)
        .bind(&line.tenant_id)
        .bind(line.position)
        .bind(&line.item_id)
        .bind(&line.item_name)
        .bind(line.quantity)
        .bind(line.unit_price_cents)
        .bind(line.discount_cents)
        .bind(line.tax_cents)
        .bind(line.total_cents)
        .execute(&mut *conn)
        .await?;
    }

    Ok(())
}

// =============================================================================
// Repository
// =============================================================================

/// Repository for invoice reads.
#[derive(Debug, Clone)]
pub struct InvoiceRepository {
    pool: SqlitePool,
}

impl InvoiceRepository {
    /// Creates a new InvoiceRepository.
    pub fn new(pool: SqlitePool) -> Self {
        InvoiceRepository { pool }
    }

    /// Gets an invoice visible in `scope`.
    pub async fn get(&self, scope: &ReadScope, invoice_id: &str) -> DbResult<Option<Invoice>> {
        fetch_invoice(&self.pool, scope.tenant_id(), invoice_id).await
    }

    /// Gets an invoice's lines ordered by position.
    pub async fn lines(&self, invoice_id: &str) -> DbResult<Vec<InvoiceLine>> {
        fetch_lines(&self.pool, invoice_id).await
    }

    /// Lists invoices visible in `scope`, newest first.
    pub async fn list(&self, scope: &ReadScope, query: &InvoiceQuery) -> DbResult<Vec<Invoice>> {
        let query = query.clone().normalized();
        debug!(
            tenant_id = ?scope.tenant_id(),
            status = ?query.status,
            table_number = ?query.table_number,
            limit = query.limit,
            offset = query.offset,
            "Listing invoices"
        );

        let sql = format!(
            r#"{SELECT_INVOICE}
            WHERE (?1 IS NULL OR tenant_id = ?1)
              AND (?2 IS NULL OR status = ?2)
              AND (?3 IS NULL OR table_number = ?3)
            ORDER BY created_at DESC, id DESC
            LIMIT ?4 OFFSET ?5"#
        );
        let invoices = sqlx::query_as::<_, Invoice>(&sql)
            .bind(scope.tenant_id())
            .bind(query.status.map(|s: InvoiceStatus| s.as_str()))
            .bind(query.table_number)
            .bind(query.limit)
            .bind(query.offset)
            .fetch_all(&self.pool)
            .await?;

        Ok(invoices)
    }
}
