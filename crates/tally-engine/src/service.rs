//! # Invoice Service
//!
//! The invoice lifecycle. Each write operation runs in exactly one store
//! transaction, which is rolled back before any error is returned.
//!
//! ## Lifecycle
//! ```text
//!   create(pending, table n) ───► Pending ◄──── update_pending (re-price, no stock)
//!        │  (open order for n exists:          │
//!        │   lines replaced in place)          │ complete (re-price, reserve stock)
//!        │                                     ▼
//!   create(completed) ─────────────────► Completed (immutable)
//! ```
//!
//! ## Write Operation Flow
//! ```text
//! Principal ──require_invoice_writer──► tenant_id
//!     │
//!     ▼
//! begin ─► merge ─► resolve against catalog ─► price ─► [reserve stock] ─► persist
//!     │                                                                      │
//!     └──────────── any Err: rollback, return Err ◄──────────────────────────┤
//!                                                                     commit ▼
//! ```

use chrono::{NaiveDate, Utc};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::config::EngineConfig;
use crate::error::EngineResult;
use crate::guard::StockGuard;
use crate::pricing::price_request;
use tally_core::access::{read_scope, require_invoice_writer};
use tally_core::numbering::InvoiceNumberGenerator;
use tally_core::pricing::PricedInvoice;
use tally_core::validation::{
    validate_customer_name, validate_customer_phone, validate_discount_amount,
    validate_table_number,
};
use tally_core::{
    CoreError, Discount, Invoice, InvoiceLine, InvoiceQuery, InvoiceStatus, InvoiceWithLines,
    PaymentMode, Principal, RequestedLine,
};
use tally_db::{RecordStore, StoreTransaction};

// =============================================================================
// Requests
// =============================================================================

/// Request to create an invoice.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewInvoice {
    pub items: Vec<RequestedLine>,
    pub status: InvoiceStatus,
    #[serde(default)]
    pub table_number: Option<i64>,
    #[serde(default)]
    pub customer_name: Option<String>,
    #[serde(default)]
    pub customer_phone: Option<String>,
    #[serde(default)]
    pub payment_mode: PaymentMode,
    #[serde(default)]
    pub discount: Discount,
}

impl NewInvoice {
    /// A counter sale, finalized immediately.
    pub fn completed(items: Vec<RequestedLine>) -> Self {
        Self::with_status(items, InvoiceStatus::Completed)
    }

    /// An open order for a table.
    pub fn pending(items: Vec<RequestedLine>, table_number: i64) -> Self {
        Self {
            table_number: Some(table_number),
            ..Self::with_status(items, InvoiceStatus::Pending)
        }
    }

    fn with_status(items: Vec<RequestedLine>, status: InvoiceStatus) -> Self {
        Self {
            items,
            status,
            table_number: None,
            customer_name: None,
            customer_phone: None,
            payment_mode: PaymentMode::default(),
            discount: Discount::none(),
        }
    }
}

/// New lines for an open order. `None` fields keep their current values.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OrderUpdate {
    pub items: Vec<RequestedLine>,
    #[serde(default)]
    pub customer_name: Option<String>,
    #[serde(default)]
    pub customer_phone: Option<String>,
    #[serde(default)]
    pub payment_mode: Option<PaymentMode>,
    #[serde(default)]
    pub discount: Option<Discount>,
}

/// Finalizes an open order. `None` fields keep their current values.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CompleteOrder {
    #[serde(default)]
    pub customer_name: Option<String>,
    #[serde(default)]
    pub customer_phone: Option<String>,
    #[serde(default)]
    pub payment_mode: Option<PaymentMode>,
    #[serde(default)]
    pub discount: Option<Discount>,
}

/// Validated customer contact fields. Blank input becomes `None`.
struct Contact {
    name: Option<String>,
    phone: Option<String>,
}

impl Contact {
    fn parse(name: Option<&str>, phone: Option<&str>) -> EngineResult<Self> {
        Ok(Contact {
            name: validate_customer_name(name)?,
            phone: validate_customer_phone(phone)?,
        })
    }

    fn overwrite(self, invoice: &mut Invoice) {
        if self.name.is_some() {
            invoice.customer_name = self.name;
        }
        if self.phone.is_some() {
            invoice.customer_phone = self.phone;
        }
    }
}

// =============================================================================
// Service
// =============================================================================

/// Creates, updates, completes and reads invoices against a [`RecordStore`].
pub struct InvoiceService<S: RecordStore> {
    store: S,
    numbers: InvoiceNumberGenerator,
    rng: Mutex<StdRng>,
}

impl<S: RecordStore> InvoiceService<S> {
    pub fn new(store: S, numbers: InvoiceNumberGenerator) -> Self {
        Self::with_rng(store, numbers, StdRng::from_entropy())
    }

    pub fn from_config(store: S, config: &EngineConfig) -> Self {
        Self::new(store, config.number_generator())
    }

    /// Uses `rng` for invoice number suffixes. Seed it for reproducible numbers.
    pub fn with_rng(store: S, numbers: InvoiceNumberGenerator, rng: StdRng) -> Self {
        InvoiceService {
            store,
            numbers,
            rng: Mutex::new(rng),
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    // -------------------------------------------------------------------------
    // Writes
    // -------------------------------------------------------------------------

    /// Creates an invoice.
    ///
    /// A pending invoice for a table that already has an open order replaces
    /// that order's lines, keeping its id and number. A completed invoice
    /// deducts stock.
    pub async fn create(
        &self,
        principal: &Principal,
        request: NewInvoice,
    ) -> EngineResult<InvoiceWithLines> {
        let tenant_id = require_invoice_writer(principal, "create invoices")?;
        validate_table_number(request.table_number)?;
        validate_discount_amount(request.discount.amount_cents)?;
        let contact = Contact::parse(
            request.customer_name.as_deref(),
            request.customer_phone.as_deref(),
        )?;

        debug!(
            tenant_id = %tenant_id,
            status = %request.status,
            lines = request.items.len(),
            "Creating invoice"
        );

        let mut tx = self.store.begin().await?;
        let result = self.create_in(&mut tx, tenant_id, request, contact).await;
        let created = finish(tx, result).await?;

        info!(
            tenant_id = %tenant_id,
            invoice_id = %created.invoice.id,
            invoice_number = %created.invoice.invoice_number,
            status = %created.invoice.status,
            total_cents = created.invoice.total_cents,
            "Invoice saved"
        );
        Ok(created)
    }

    async fn create_in(
        &self,
        tx: &mut S::Tx,
        tenant_id: &str,
        request: NewInvoice,
        contact: Contact,
    ) -> EngineResult<InvoiceWithLines> {
        let priced = price_request(tx, tenant_id, &request.items, &request.discount).await?;

        match request.status {
            InvoiceStatus::Completed => {
                StockGuard::reserve(tx, tenant_id, &priced.lines).await?;
            }
            InvoiceStatus::Pending => {
                if let Some(table) = request.table_number {
                    if let Some(mut open) = tx.find_pending_for_table(tenant_id, table).await? {
                        debug!(invoice_id = %open.id, table, "Replacing lines of open table order");
                        open.customer_name = contact.name;
                        open.customer_phone = contact.phone;
                        open.payment_mode = request.payment_mode;
                        set_discount(&mut open, request.discount);
                        apply_totals(&mut open, &priced);
                        open.updated_at = Utc::now();

                        tx.update_invoice(&open).await?;
                        let lines = build_lines(&open, &priced);
                        tx.replace_lines(&open.id, &lines).await?;
                        return Ok(InvoiceWithLines {
                            invoice: open,
                            lines,
                        });
                    }
                }
            }
        }

        let now = Utc::now();
        let invoice_number = self.allocate_number(tx, tenant_id, now.date_naive()).await?;

        let mut invoice = Invoice {
            id: Uuid::new_v4().to_string(),
            tenant_id: tenant_id.to_string(),
            invoice_number,
            status: request.status,
            table_number: request.table_number,
            customer_name: contact.name,
            customer_phone: contact.phone,
            payment_mode: request.payment_mode,
            discount_amount_cents: None,
            discount_percent_bps: None,
            subtotal_cents: 0,
            discount_cents: 0,
            tax_cents: 0,
            total_cents: 0,
            created_at: now,
            updated_at: now,
            completed_at: (request.status == InvoiceStatus::Completed).then_some(now),
        };
        set_discount(&mut invoice, request.discount);
        apply_totals(&mut invoice, &priced);

        self.insert(tx, &invoice).await?;
        let lines = build_lines(&invoice, &priced);
        tx.replace_lines(&invoice.id, &lines).await?;

        Ok(InvoiceWithLines { invoice, lines })
    }

    /// Replaces the lines of an open order and re-prices it. Stock is untouched.
    pub async fn update_pending(
        &self,
        principal: &Principal,
        invoice_id: &str,
        update: OrderUpdate,
    ) -> EngineResult<InvoiceWithLines> {
        let tenant_id = require_invoice_writer(principal, "update invoices")?;
        validate_discount_amount(update.discount.and_then(|d| d.amount_cents))?;
        let contact = Contact::parse(
            update.customer_name.as_deref(),
            update.customer_phone.as_deref(),
        )?;

        let mut tx = self.store.begin().await?;
        let result = self
            .update_in(&mut tx, tenant_id, invoice_id, update, contact)
            .await;
        let updated = finish(tx, result).await?;

        info!(
            tenant_id = %tenant_id,
            invoice_id = %invoice_id,
            lines = updated.lines.len(),
            total_cents = updated.invoice.total_cents,
            "Open order updated"
        );
        Ok(updated)
    }

    async fn update_in(
        &self,
        tx: &mut S::Tx,
        tenant_id: &str,
        invoice_id: &str,
        update: OrderUpdate,
        contact: Contact,
    ) -> EngineResult<InvoiceWithLines> {
        let mut invoice = lock_pending(tx, tenant_id, invoice_id, "update lines").await?;

        let discount = update.discount.unwrap_or_else(|| invoice.requested_discount());
        let priced = price_request(tx, tenant_id, &update.items, &discount).await?;

        contact.overwrite(&mut invoice);
        if let Some(mode) = update.payment_mode {
            invoice.payment_mode = mode;
        }
        set_discount(&mut invoice, discount);
        apply_totals(&mut invoice, &priced);
        invoice.updated_at = Utc::now();

        tx.update_invoice(&invoice).await?;
        let lines = build_lines(&invoice, &priced);
        tx.replace_lines(&invoice.id, &lines).await?;

        Ok(InvoiceWithLines { invoice, lines })
    }

    /// Finalizes an open order: re-prices its lines against the current
    /// catalog, deducts stock and marks it completed.
    pub async fn complete(
        &self,
        principal: &Principal,
        invoice_id: &str,
        order: CompleteOrder,
    ) -> EngineResult<InvoiceWithLines> {
        let tenant_id = require_invoice_writer(principal, "complete invoices")?;
        validate_discount_amount(order.discount.and_then(|d| d.amount_cents))?;
        let contact = Contact::parse(
            order.customer_name.as_deref(),
            order.customer_phone.as_deref(),
        )?;

        let mut tx = self.store.begin().await?;
        let result = self
            .complete_in(&mut tx, tenant_id, invoice_id, order, contact)
            .await;
        let completed = finish(tx, result).await?;

        info!(
            tenant_id = %tenant_id,
            invoice_id = %invoice_id,
            invoice_number = %completed.invoice.invoice_number,
            total_cents = completed.invoice.total_cents,
            "Invoice completed"
        );
        Ok(completed)
    }

    async fn complete_in(
        &self,
        tx: &mut S::Tx,
        tenant_id: &str,
        invoice_id: &str,
        order: CompleteOrder,
        contact: Contact,
    ) -> EngineResult<InvoiceWithLines> {
        let mut invoice = lock_pending(tx, tenant_id, invoice_id, "complete").await?;

        let requested: Vec<RequestedLine> = tx
            .lines(invoice_id)
            .await?
            .iter()
            .map(InvoiceLine::to_requested)
            .collect();

        let discount = order.discount.unwrap_or_else(|| invoice.requested_discount());
        let priced = price_request(tx, tenant_id, &requested, &discount).await?;
        StockGuard::reserve(tx, tenant_id, &priced.lines).await?;

        let now = Utc::now();
        contact.overwrite(&mut invoice);
        if let Some(mode) = order.payment_mode {
            invoice.payment_mode = mode;
        }
        set_discount(&mut invoice, discount);
        apply_totals(&mut invoice, &priced);
        invoice.status = InvoiceStatus::Completed;
        invoice.completed_at = Some(now);
        invoice.updated_at = now;

        tx.update_invoice(&invoice).await?;
        let lines = build_lines(&invoice, &priced);
        tx.replace_lines(&invoice.id, &lines).await?;

        Ok(InvoiceWithLines { invoice, lines })
    }

    // -------------------------------------------------------------------------
    // Reads
    // -------------------------------------------------------------------------

    /// Reads one invoice with its lines.
    pub async fn get(
        &self,
        principal: &Principal,
        invoice_id: &str,
    ) -> EngineResult<InvoiceWithLines> {
        let scope = read_scope(principal)?;
        let invoice = self
            .store
            .find_invoice(&scope, invoice_id)
            .await?
            .ok_or_else(|| CoreError::InvoiceNotFound(invoice_id.to_string()))?;
        let lines = self.store.invoice_lines(&invoice.id).await?;

        Ok(InvoiceWithLines { invoice, lines })
    }

    /// Lists invoice headers, newest first.
    pub async fn list(
        &self,
        principal: &Principal,
        query: InvoiceQuery,
    ) -> EngineResult<Vec<Invoice>> {
        let scope = read_scope(principal)?;
        let query = query.normalized();
        debug!(?scope, ?query, "Listing invoices");
        Ok(self.store.list_invoices(&scope, &query).await?)
    }

    /// Every open table order with its lines, newest first.
    pub async fn list_pending(&self, principal: &Principal) -> EngineResult<Vec<InvoiceWithLines>> {
        self.list_pending_paged(principal, InvoiceQuery::MAX_LIMIT).await
    }

    async fn list_pending_paged(
        &self,
        principal: &Principal,
        page_size: i64,
    ) -> EngineResult<Vec<InvoiceWithLines>> {
        let scope = read_scope(principal)?;
        let mut query = InvoiceQuery {
            limit: page_size,
            ..InvoiceQuery::pending()
        };

        let mut orders = Vec::new();
        loop {
            let headers = self.store.list_invoices(&scope, &query).await?;
            let last_page = (headers.len() as i64) < page_size;
            for invoice in headers {
                let lines = self.store.invoice_lines(&invoice.id).await?;
                orders.push(InvoiceWithLines { invoice, lines });
            }
            if last_page {
                break;
            }
            query.offset += page_size;
        }

        debug!(?scope, count = orders.len(), "Listed open orders");
        Ok(orders)
    }

    // -------------------------------------------------------------------------
    // Invoice numbers
    // -------------------------------------------------------------------------

    async fn allocate_number(
        &self,
        tx: &mut S::Tx,
        tenant_id: &str,
        date: NaiveDate,
    ) -> EngineResult<String> {
        for attempt in 0..self.numbers.max_attempts() {
            let candidate = {
                let mut rng = self.rng.lock().await;
                self.numbers.candidate(tenant_id, date, attempt, &mut *rng)
            };

            if !tx.invoice_number_exists(&candidate).await? {
                return Ok(candidate);
            }
            warn!(
                attempt,
                invoice_number = %candidate,
                "Invoice number taken, retrying with a longer suffix"
            );
        }

        Err(CoreError::DuplicateInvoiceNumber {
            attempts: self.numbers.max_attempts(),
        }
        .into())
    }

    async fn insert(&self, tx: &mut S::Tx, invoice: &Invoice) -> EngineResult<()> {
        match tx.insert_invoice(invoice).await {
            Ok(()) => Ok(()),
            Err(e) if e.is_unique_violation_on("invoice_number") => {
                warn!(invoice_number = %invoice.invoice_number, "Invoice number taken at insert");
                Err(CoreError::DuplicateInvoiceNumber {
                    attempts: self.numbers.max_attempts(),
                }
                .into())
            }
            Err(e) => Err(e.into()),
        }
    }
}

// =============================================================================
// Helpers
// =============================================================================

/// Commits on success. On failure rolls back, then returns the original error.
async fn finish<T: StoreTransaction, V>(tx: T, result: EngineResult<V>) -> EngineResult<V> {
    match result {
        Ok(value) => {
            tx.commit().await?;
            Ok(value)
        }
        Err(err) => {
            warn!(error = %err, "Operation failed, rolling back");
            if let Err(rollback_err) = tx.rollback().await {
                error!(error = %rollback_err, "Rollback failed");
            }
            Err(err)
        }
    }
}

/// Locks an invoice that must still be pending.
async fn lock_pending<T: StoreTransaction>(
    tx: &mut T,
    tenant_id: &str,
    invoice_id: &str,
    operation: &'static str,
) -> EngineResult<Invoice> {
    let invoice = tx
        .lock_invoice(tenant_id, invoice_id)
        .await?
        .ok_or_else(|| CoreError::InvoiceNotFound(invoice_id.to_string()))?;

    if !invoice.is_pending() {
        return Err(CoreError::InvalidStateTransition {
            invoice_id: invoice.id,
            status: invoice.status,
            operation,
        }
        .into());
    }
    Ok(invoice)
}

fn set_discount(invoice: &mut Invoice, discount: Discount) {
    invoice.discount_amount_cents = discount.amount_cents;
    invoice.discount_percent_bps = discount.percent_bps;
}

fn apply_totals(invoice: &mut Invoice, priced: &PricedInvoice) {
    invoice.subtotal_cents = priced.subtotal.cents();
    invoice.discount_cents = priced.discount.cents();
    invoice.tax_cents = priced.tax.cents();
    invoice.total_cents = priced.total.cents();
}

fn build_lines(invoice: &Invoice, priced: &PricedInvoice) -> Vec<InvoiceLine> {
    priced
        .lines
        .iter()
        .enumerate()
        .map(|(position, line)| InvoiceLine {
            id: Uuid::new_v4().to_string(),
            invoice_id: invoice.id.clone(),
            tenant_id: invoice.tenant_id.clone(),
            position: position as i64,
            item_id: line.item_id.clone(),
            item_name: line.item_name.clone(),
            quantity: line.quantity,
            unit_price_cents: line.unit_price.cents(),
            discount_cents: line.discount.cents(),
            tax_cents: line.tax.cents(),
            total_cents: line.total.cents(),
        })
        .collect()
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{EngineError, ErrorCode};
    use std::sync::Arc;
    use tally_core::{CatalogItem, ValidationError};
    use tally_db::{Database, DbConfig, SqliteStore};

    const T1: &str = "spice-hub";
    const T2: &str = "dosa-corner";

    fn menu_item(
        id: &str,
        tenant: &str,
        price_cents: i64,
        tax_rate_bps: i64,
        stock: Option<i64>,
    ) -> CatalogItem {
        let now = Utc::now();
        CatalogItem {
            id: id.to_string(),
            tenant_id: tenant.to_string(),
            name: id.replace('-', " "),
            category: None,
            price_cents,
            tax_rate_bps,
            stock_quantity: stock.unwrap_or(0),
            limit_stock: stock.is_some(),
            created_at: now,
            updated_at: now,
        }
    }

    async fn setup() -> (Database, InvoiceService<SqliteStore>) {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let catalog = db.catalog();
        catalog.insert(&menu_item("paneer-tikka", T1, 24000, 500, Some(10))).await.unwrap();
        catalog.insert(&menu_item("butter-naan", T1, 5000, 500, Some(5))).await.unwrap();
        catalog.insert(&menu_item("veg-roll", T1, 16000, 500, Some(1))).await.unwrap();
        catalog.insert(&menu_item("masala-chai", T1, 2000, 1800, None)).await.unwrap();
        catalog.insert(&menu_item("item-a", T1, 6000, 1000, None)).await.unwrap();
        catalog.insert(&menu_item("item-b", T1, 4000, 0, None)).await.unwrap();
        catalog.insert(&menu_item("rava-dosa", T2, 12000, 500, Some(50))).await.unwrap();

        let service = InvoiceService::with_rng(
            db.store(),
            InvoiceNumberGenerator::default(),
            StdRng::seed_from_u64(7),
        );
        (db, service)
    }

    fn line(item_id: &str, quantity: i64) -> RequestedLine {
        // Client price is ignored for catalog items
        RequestedLine::item(item_id, item_id, quantity, 1)
    }

    async fn stock(db: &Database, tenant: &str, item_id: &str) -> i64 {
        db.catalog().get(tenant, item_id).await.unwrap().unwrap().stock_quantity
    }

    fn domain_err(err: EngineError) -> CoreError {
        match err {
            EngineError::Core(e) => e,
            other => panic!("expected a domain error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_create_completed_deducts_and_totals_reconcile() {
        let (db, service) = setup().await;
        let admin = Principal::tenant_admin(T1);

        let mut request = NewInvoice::completed(vec![
            line("paneer-tikka", 2),
            line("masala-chai", 3),
            RequestedLine::custom("Packing charge", 1, 1500),
        ]);
        request.discount = Discount::percent(1000);
        request.customer_name = Some("  Ananya  ".into());
        request.payment_mode = PaymentMode::Upi;

        let saved = service.create(&admin, request).await.unwrap();
        let invoice = &saved.invoice;

        assert_eq!(invoice.status, InvoiceStatus::Completed);
        assert!(invoice.completed_at.is_some());
        assert_eq!(invoice.customer_name.as_deref(), Some("Ananya"));
        assert!(invoice.invoice_number.starts_with("INV-SPICEH-"));
        assert_eq!(invoice.subtotal_cents, 48000 + 6000 + 1500);
        assert_eq!(invoice.discount_cents, 5550);

        let line_total: i64 = saved.lines.iter().map(|l| l.total_cents).sum();
        let line_discount: i64 = saved.lines.iter().map(|l| l.discount_cents).sum();
        assert_eq!(invoice.total_cents, line_total);
        assert_eq!(invoice.discount_cents, line_discount);
        assert_eq!(
            invoice.total_cents,
            invoice.subtotal_cents - invoice.discount_cents + invoice.tax_cents
        );

        let positions: Vec<i64> = saved.lines.iter().map(|l| l.position).collect();
        assert_eq!(positions, [0, 1, 2]);
        assert_eq!(stock(&db, T1, "paneer-tikka").await, 8);

        let fetched = service.get(&admin, &invoice.id).await.unwrap();
        assert_eq!(fetched.invoice.total_cents, invoice.total_cents);
        assert_eq!(fetched.lines, saved.lines);
    }

    #[tokio::test]
    async fn test_duplicate_lines_merge() {
        let (db, service) = setup().await;
        let admin = Principal::tenant_admin(T1);

        let saved = service
            .create(
                &admin,
                NewInvoice::completed(vec![line("butter-naan", 2), line("butter-naan", 3)]),
            )
            .await
            .unwrap();

        assert_eq!(saved.lines.len(), 1);
        assert_eq!(saved.lines[0].quantity, 5);
        assert_eq!(saved.lines[0].item_name, "butter naan");
        assert_eq!(stock(&db, T1, "butter-naan").await, 0);
    }

    #[tokio::test]
    async fn test_discount_split_sixty_forty() {
        let (_db, service) = setup().await;
        let admin = Principal::tenant_admin(T1);

        let mut request = NewInvoice::completed(vec![line("item-a", 1), line("item-b", 1)]);
        request.discount = Discount::amount(2000);

        let saved = service.create(&admin, request).await.unwrap();
        let totals: Vec<i64> = saved.lines.iter().map(|l| l.total_cents).collect();
        let discounts: Vec<i64> = saved.lines.iter().map(|l| l.discount_cents).collect();

        assert_eq!(discounts, [1200, 800]);
        assert_eq!(totals, [5280, 3200]);
        assert_eq!(saved.invoice.total_cents, 8480);
        assert_eq!(saved.invoice.tax_cents, 480);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_concurrent_completions_never_oversell() {
        let (db, service) = setup().await;
        let service = Arc::new(service);

        let handles: Vec<_> = (0..2)
            .map(|_| {
                let service = Arc::clone(&service);
                tokio::spawn(async move {
                    service
                        .create(
                            &Principal::tenant_admin(T1),
                            NewInvoice::completed(vec![line("paneer-tikka", 6)]),
                        )
                        .await
                })
            })
            .collect();

        let mut succeeded = 0;
        let mut short = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(_) => succeeded += 1,
                Err(e) => {
                    assert!(matches!(
                        domain_err(e),
                        CoreError::InsufficientStock { available: 4, requested: 6, .. }
                    ));
                    short += 1;
                }
            }
        }

        assert_eq!((succeeded, short), (1, 1));
        assert_eq!(stock(&db, T1, "paneer-tikka").await, 4);
    }

    #[tokio::test]
    async fn test_pending_update_complete_deducts_once() {
        let (db, service) = setup().await;
        let admin = Principal::tenant_admin(T1);

        let open = service
            .create(&admin, NewInvoice::pending(vec![line("paneer-tikka", 2)], 4))
            .await
            .unwrap();
        assert_eq!(open.invoice.status, InvoiceStatus::Pending);
        assert_eq!(stock(&db, T1, "paneer-tikka").await, 10);

        let updated = service
            .update_pending(
                &admin,
                &open.invoice.id,
                OrderUpdate {
                    items: vec![line("paneer-tikka", 3), line("butter-naan", 1)],
                    ..OrderUpdate::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.invoice.invoice_number, open.invoice.invoice_number);
        assert_eq!(stock(&db, T1, "paneer-tikka").await, 10);

        let completed = service
            .complete(
                &admin,
                &open.invoice.id,
                CompleteOrder {
                    customer_phone: Some("+91 98450 12345".into()),
                    payment_mode: Some(PaymentMode::Card),
                    ..CompleteOrder::default()
                },
            )
            .await
            .unwrap();

        assert_eq!(completed.invoice.status, InvoiceStatus::Completed);
        assert_eq!(completed.invoice.payment_mode, PaymentMode::Card);
        assert_eq!(completed.invoice.customer_phone.as_deref(), Some("+91 98450 12345"));
        assert_eq!(completed.lines.len(), 2);
        assert_eq!(completed.lines[0].quantity, 3);
        assert_eq!(stock(&db, T1, "paneer-tikka").await, 7);
        assert_eq!(stock(&db, T1, "butter-naan").await, 4);

        assert!(service.list_pending(&admin).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_complete_reprices_against_current_catalog() {
        let (db, service) = setup().await;
        let admin = Principal::tenant_admin(T1);

        let mut request = NewInvoice::pending(vec![line("item-b", 2)], 9);
        request.discount = Discount::amount(1000);
        let open = service.create(&admin, request).await.unwrap();
        assert_eq!(open.invoice.total_cents, 7000);

        let mut item = db.catalog().get(T1, "item-b").await.unwrap().unwrap();
        item.price_cents = 4500;
        db.catalog().update(&item).await.unwrap();

        let done = service
            .complete(&admin, &open.invoice.id, CompleteOrder::default())
            .await
            .unwrap();

        // Persisted discount carries over
        assert_eq!(done.invoice.discount_amount_cents, Some(1000));
        assert_eq!(done.lines[0].unit_price_cents, 4500);
        assert_eq!(done.invoice.total_cents, 8000);
    }

    #[tokio::test]
    async fn test_cross_tenant_item_is_not_found() {
        let (_db, service) = setup().await;
        let admin = Principal::tenant_admin(T1);

        let err = service
            .create(&admin, NewInvoice::completed(vec![line("rava-dosa", 1)]))
            .await
            .unwrap_err();

        assert_eq!(err.code(), ErrorCode::NotFound);
        assert!(matches!(
            domain_err(err),
            CoreError::ItemNotFound { item_id } if item_id == "rava-dosa"
        ));
        assert!(service.list(&admin, InvoiceQuery::default()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_pending_for_same_table_replaces_lines() {
        let (_db, service) = setup().await;
        let admin = Principal::tenant_admin(T1);

        let first = service
            .create(&admin, NewInvoice::pending(vec![line("masala-chai", 2)], 3))
            .await
            .unwrap();
        let second = service
            .create(
                &admin,
                NewInvoice::pending(vec![line("butter-naan", 1), line("item-a", 1)], 3),
            )
            .await
            .unwrap();

        assert_eq!(second.invoice.id, first.invoice.id);
        assert_eq!(second.invoice.invoice_number, first.invoice.invoice_number);

        let pending = service.list_pending(&admin).await.unwrap();
        assert_eq!(pending.len(), 1);
        let names: Vec<&str> = pending[0].lines.iter().map(|l| l.item_name.as_str()).collect();
        assert_eq!(names, ["butter naan", "item a"]);

        // Another table opens its own order
        service
            .create(&admin, NewInvoice::pending(vec![line("masala-chai", 1)], 4))
            .await
            .unwrap();
        assert_eq!(service.list_pending(&admin).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_failure_on_second_item_rolls_back_first() {
        let (db, service) = setup().await;
        let admin = Principal::tenant_admin(T1);

        let err = service
            .create(
                &admin,
                NewInvoice::completed(vec![line("butter-naan", 2), line("veg-roll", 3)]),
            )
            .await
            .unwrap_err();

        assert!(matches!(domain_err(err), CoreError::InsufficientStock { available: 1, .. }));
        assert_eq!(stock(&db, T1, "butter-naan").await, 5);
        assert_eq!(stock(&db, T1, "veg-roll").await, 1);
        assert!(service.list(&admin, InvoiceQuery::default()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_role_policy() {
        let (_db, service) = setup().await;
        let admin = Principal::tenant_admin(T1);
        let root = Principal::system_admin("platform");

        let err = service
            .create(&root, NewInvoice::completed(vec![line("masala-chai", 1)]))
            .await
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::Forbidden);

        let err = service
            .create(
                &Principal::tenant_admin(T1).deactivated(),
                NewInvoice::completed(vec![line("masala-chai", 1)]),
            )
            .await
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::InactiveAccount);

        let saved = service
            .create(&admin, NewInvoice::completed(vec![line("masala-chai", 1)]))
            .await
            .unwrap();

        // System admins read every tenant; other tenants see nothing
        let seen = service.get(&root, &saved.invoice.id).await.unwrap();
        assert_eq!(seen.invoice.tenant_id, T1);
        assert_eq!(seen.lines, saved.lines);
        let err = service
            .get(&Principal::tenant_admin(T2), &saved.invoice.id)
            .await
            .unwrap_err();
        assert!(matches!(domain_err(err), CoreError::InvoiceNotFound(_)));
        assert_eq!(service.list(&root, InvoiceQuery::default()).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_other_tenant_cannot_touch_pending_order() {
        let (db, service) = setup().await;
        let admin = Principal::tenant_admin(T1);
        let intruder = Principal::tenant_admin(T2);

        let open = service
            .create(&admin, NewInvoice::pending(vec![line("paneer-tikka", 2)], 6))
            .await
            .unwrap();

        let err = service
            .update_pending(
                &intruder,
                &open.invoice.id,
                OrderUpdate {
                    items: vec![line("rava-dosa", 1)],
                    ..OrderUpdate::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(domain_err(err), CoreError::InvoiceNotFound(_)));

        let err = service
            .complete(&intruder, &open.invoice.id, CompleteOrder::default())
            .await
            .unwrap_err();
        assert!(matches!(domain_err(err), CoreError::InvoiceNotFound(_)));

        let unchanged = service.get(&admin, &open.invoice.id).await.unwrap();
        assert_eq!(unchanged.invoice.status, InvoiceStatus::Pending);
        assert_eq!(unchanged.lines, open.lines);
        assert_eq!(stock(&db, T1, "paneer-tikka").await, 10);
        assert_eq!(stock(&db, T2, "rava-dosa").await, 50);
    }

    #[tokio::test]
    async fn test_system_admin_cannot_change_orders() {
        let (db, service) = setup().await;
        let admin = Principal::tenant_admin(T1);
        let root = Principal::system_admin("platform");

        let open = service
            .create(&admin, NewInvoice::pending(vec![line("butter-naan", 2)], 3))
            .await
            .unwrap();

        let update = OrderUpdate {
            items: vec![line("butter-naan", 5)],
            ..OrderUpdate::default()
        };
        let err = service.update_pending(&root, &open.invoice.id, update).await.unwrap_err();
        assert!(matches!(domain_err(err), CoreError::ForbiddenRole { .. }));

        let err = service
            .complete(&root, &open.invoice.id, CompleteOrder::default())
            .await
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::Forbidden);

        let unchanged = service.get(&admin, &open.invoice.id).await.unwrap();
        assert_eq!(unchanged.invoice.status, InvoiceStatus::Pending);
        assert_eq!(unchanged.lines, open.lines);
        assert_eq!(stock(&db, T1, "butter-naan").await, 5);
    }

    #[tokio::test]
    async fn test_completed_invoice_is_immutable() {
        let (db, service) = setup().await;
        let admin = Principal::tenant_admin(T1);

        let saved = service
            .create(&admin, NewInvoice::completed(vec![line("paneer-tikka", 1)]))
            .await
            .unwrap();

        let err = service
            .update_pending(
                &admin,
                &saved.invoice.id,
                OrderUpdate {
                    items: vec![line("paneer-tikka", 5)],
                    ..OrderUpdate::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(
            domain_err(err),
            CoreError::InvalidStateTransition { status: InvoiceStatus::Completed, .. }
        ));

        let err = service
            .complete(&admin, &saved.invoice.id, CompleteOrder::default())
            .await
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::InvalidState);

        let err = service
            .complete(&admin, "no-such-invoice", CompleteOrder::default())
            .await
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::NotFound);

        assert_eq!(stock(&db, T1, "paneer-tikka").await, 9);
        let fetched = service.get(&admin, &saved.invoice.id).await.unwrap();
        assert_eq!(fetched.invoice.status, InvoiceStatus::Completed);
        assert_eq!(fetched.lines, saved.lines);
    }

    #[tokio::test]
    async fn test_deleted_item_keeps_snapshot() {
        let (db, service) = setup().await;
        let admin = Principal::tenant_admin(T1);

        let saved = service
            .create(&admin, NewInvoice::completed(vec![line("item-a", 2)]))
            .await
            .unwrap();
        assert!(db.catalog().delete(T1, "item-a").await.unwrap());

        let fetched = service.get(&admin, &saved.invoice.id).await.unwrap();
        assert_eq!(fetched.lines[0].item_name, "item a");
        assert_eq!(fetched.lines[0].unit_price_cents, 6000);
        assert_eq!(fetched.lines[0].item_id.as_deref(), Some("item-a"));
    }

    #[tokio::test]
    async fn test_number_collision_extends_suffix() {
        let (db, service) = setup().await;
        let admin = Principal::tenant_admin(T1);

        let first = service
            .create(&admin, NewInvoice::completed(vec![line("masala-chai", 1)]))
            .await
            .unwrap();

        // Same seed draws the same first candidate
        let twin = InvoiceService::with_rng(
            db.store(),
            InvoiceNumberGenerator::default(),
            StdRng::seed_from_u64(7),
        );
        let second = twin
            .create(&admin, NewInvoice::completed(vec![line("masala-chai", 1)]))
            .await
            .unwrap();

        let suffix = |number: &str| number.rsplit('-').next().map(str::len);
        assert_eq!(suffix(&first.invoice.invoice_number), Some(8));
        assert_eq!(suffix(&second.invoice.invoice_number), Some(10));

        let exhausted = InvoiceService::with_rng(
            db.store(),
            InvoiceNumberGenerator::new("INV", 8, 1),
            StdRng::seed_from_u64(7),
        );
        let err = exhausted
            .create(&admin, NewInvoice::completed(vec![line("masala-chai", 1)]))
            .await
            .unwrap_err();
        assert!(matches!(domain_err(err), CoreError::DuplicateInvoiceNumber { attempts: 1 }));
    }

    #[tokio::test]
    async fn test_invalid_requests_are_rejected_before_writing() {
        let (_db, service) = setup().await;
        let admin = Principal::tenant_admin(T1);

        let err = service.create(&admin, NewInvoice::completed(vec![])).await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::ValidationError);

        let err = service
            .create(&admin, NewInvoice::pending(vec![line("masala-chai", 1)], 0))
            .await
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::ValidationError);

        let doubled = vec![line("masala-chai", 600), line("masala-chai", 600)];
        let err = service.create(&admin, NewInvoice::completed(doubled)).await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::ValidationError);

        // Would overflow i64 once multiplied by the quantity
        let huge = vec![RequestedLine::custom("Big", 3, i64::MAX / 2)];
        let err = service.create(&admin, NewInvoice::completed(huge)).await.unwrap_err();
        assert!(matches!(
            domain_err(err),
            CoreError::Validation(ValidationError::OutOfRange { ref field, .. }) if field == "price"
        ));

        let mut request = NewInvoice::completed(vec![line("masala-chai", 1)]);
        request.customer_phone = Some("call me".into());
        let err = service.create(&admin, request).await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::ValidationError);
    }

    #[tokio::test]
    async fn test_list_pending_reads_every_page() {
        let (_db, service) = setup().await;
        let admin = Principal::tenant_admin(T1);

        for table in 1..=5 {
            service
                .create(&admin, NewInvoice::pending(vec![line("masala-chai", 1)], table))
                .await
                .unwrap();
        }

        let orders = service.list_pending_paged(&admin, 2).await.unwrap();
        let mut tables: Vec<_> = orders.iter().filter_map(|o| o.invoice.table_number).collect();
        tables.sort_unstable();
        assert_eq!(tables, [1, 2, 3, 4, 5]);
        assert!(orders.iter().all(|o| o.lines.len() == 1));

        assert_eq!(service.list_pending(&admin).await.unwrap().len(), 5);
    }

    #[tokio::test]
    async fn test_list_filters_and_pages() {
        let (_db, service) = setup().await;
        let admin = Principal::tenant_admin(T1);

        for table in 1..=3 {
            service
                .create(&admin, NewInvoice::pending(vec![line("masala-chai", 1)], table))
                .await
                .unwrap();
        }
        service
            .create(&admin, NewInvoice::completed(vec![line("masala-chai", 1)]))
            .await
            .unwrap();

        let completed = service
            .list(
                &admin,
                InvoiceQuery {
                    status: Some(InvoiceStatus::Completed),
                    ..InvoiceQuery::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(completed.len(), 1);

        let table_two = service
            .list(
                &admin,
                InvoiceQuery {
                    table_number: Some(2),
                    ..InvoiceQuery::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(table_two.len(), 1);
        assert_eq!(table_two[0].table_number, Some(2));

        let page = service
            .list(
                &admin,
                InvoiceQuery {
                    limit: 0,
                    ..InvoiceQuery::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(page.len(), 1);
    }

    #[test]
    fn test_request_json_defaults() {
        let request: NewInvoice = serde_json::from_str(
            r#"{
                "items": [{"item_id": "masala-chai", "item_name": "Chai", "quantity": 2, "unit_price_cents": 2000, "tax_cents": 360}],
                "status": "completed"
            }"#,
        )
        .unwrap();

        assert_eq!(request.payment_mode, PaymentMode::Cash);
        assert_eq!(request.discount, Discount::none());
        assert_eq!(request.items[0].tax_cents, Some(360));
    }
}
