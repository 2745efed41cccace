//! # Domain Types
//!
//! Core domain types used throughout Tally POS.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │  CatalogItem    │   │    Invoice      │   │  InvoiceLine    │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  id (UUID)      │   │  id (UUID)      │   │  id (UUID)      │       │
//! │  │  tenant_id      │   │  invoice_number │   │  invoice_id     │       │
//! │  │  price_cents    │   │  status         │   │  item_name snap │       │
//! │  │  stock_quantity │   │  total_cents    │   │  unit_price snap│       │
//! │  └─────────────────┘   └─────────────────┘   └─────────────────┘       │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │    TaxRate      │   │ InvoiceStatus   │   │  PaymentMode    │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  bps (u32)      │   │  Pending        │   │  Cash           │       │
//! │  │  1000 = 10%     │   │  Completed      │   │  Upi / Card     │       │
//! │  └─────────────────┘   └─────────────────┘   └─────────────────┘       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Dual-Key Identity Pattern
//! Every entity has:
//! - `id`: UUID v4 - immutable, used for database relations
//! - Business ID: (invoice_number) - human-readable, printed on the bill

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use ts_rs::TS;

use crate::money::Money;

// =============================================================================
// Tax Rate
// =============================================================================

/// Tax rate represented in basis points (bps).
///
/// ## Why Basis Points?
/// 1 basis point = 0.01% = 1/10000
/// 500 bps = 5% (restaurant GST), 1800 bps = 18%
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct TaxRate(u32);

impl TaxRate {
    /// Creates a tax rate from basis points.
    #[inline]
    pub const fn from_bps(bps: u32) -> Self {
        TaxRate(bps)
    }

    /// Creates a tax rate from a fraction (`0.1` = 10%).
    ///
    /// Catalog screens collect rates as fractions; everything downstream uses bps.
    pub fn from_fraction(fraction: f64) -> Self {
        TaxRate((fraction * 10_000.0).round().max(0.0) as u32)
    }

    /// Returns the rate in basis points.
    #[inline]
    pub const fn bps(&self) -> u32 {
        self.0
    }

    /// Returns the rate as a percentage (for display only).
    #[inline]
    pub fn percentage(&self) -> f64 {
        self.0 as f64 / 100.0
    }

    /// Zero tax rate.
    #[inline]
    pub const fn zero() -> Self {
        TaxRate(0)
    }

    /// Checks if tax rate is zero.
    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }
}

impl Default for TaxRate {
    fn default() -> Self {
        TaxRate::zero()
    }
}

// =============================================================================
// Principal
// =============================================================================

/// Role of an authenticated caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Runs one business: manages its catalog and invoices.
    TenantAdmin,
    /// Platform operator: read-only view across every tenant.
    SystemAdmin,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::TenantAdmin => f.write_str("tenant_admin"),
            Role::SystemAdmin => f.write_str("system_admin"),
        }
    }
}

/// An authenticated caller, as resolved by the identity provider.
///
/// The engine never sees credentials; it trusts this value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Principal {
    /// Tenant the caller belongs to.
    pub tenant_id: String,
    pub role: Role,
    /// Deactivated accounts are rejected by every operation.
    pub is_active: bool,
}

impl Principal {
    /// An active tenant admin for `tenant_id`.
    pub fn tenant_admin(tenant_id: impl Into<String>) -> Self {
        Self {
            tenant_id: tenant_id.into(),
            role: Role::TenantAdmin,
            is_active: true,
        }
    }

    /// An active system admin.
    pub fn system_admin(tenant_id: impl Into<String>) -> Self {
        Self {
            tenant_id: tenant_id.into(),
            role: Role::SystemAdmin,
            is_active: true,
        }
    }

    /// Returns the same principal marked inactive.
    pub fn deactivated(mut self) -> Self {
        self.is_active = false;
        self
    }
}

// =============================================================================
// Catalog Item
// =============================================================================

/// A menu item a tenant sells.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct CatalogItem {
    /// Unique identifier (UUID v4).
    pub id: String,

    /// Tenant this item belongs to.
    pub tenant_id: String,

    /// Display name shown on the menu and on the bill.
    pub name: String,

    /// Free-form grouping ("Starters", "Beverages", ...).
    pub category: Option<String>,

    /// Price in cents (smallest currency unit).
    pub price_cents: i64,

    /// Tax rate in basis points (500 = 5%).
    pub tax_rate_bps: i64,

    /// Units on hand. May go negative only while `limit_stock` is off.
    pub stock_quantity: i64,

    /// Whether completing an invoice checks and deducts stock.
    pub limit_stock: bool,

    /// When the item was created.
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,

    /// When the item was last updated.
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl CatalogItem {
    /// Returns the price as a Money type.
    #[inline]
    pub fn price(&self) -> Money {
        Money::from_cents(self.price_cents)
    }

    /// Returns the tax rate. Out-of-range stored values read as zero.
    #[inline]
    pub fn tax_rate(&self) -> TaxRate {
        TaxRate::from_bps(u32::try_from(self.tax_rate_bps).unwrap_or(0))
    }
}

// =============================================================================
// Invoice Status
// =============================================================================

/// The lifecycle state of an invoice.
///
/// ```text
///   create(pending) ──► Pending ──► update_pending (lines replaced, no stock)
///                          │
///                          ▼ complete (stock deducted)
///   create(completed) ──► Completed  (immutable)
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum InvoiceStatus {
    /// Open table order: editable, no stock effect.
    Pending,
    /// Finalized: stock deducted, immutable.
    Completed,
}

impl InvoiceStatus {
    /// Stable lowercase name, matching the database representation.
    pub const fn as_str(&self) -> &'static str {
        match self {
            InvoiceStatus::Pending => "pending",
            InvoiceStatus::Completed => "completed",
        }
    }
}

impl Default for InvoiceStatus {
    fn default() -> Self {
        InvoiceStatus::Pending
    }
}

impl fmt::Display for InvoiceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Payment Mode
// =============================================================================

#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMode {
    /// Physical cash payment.
    Cash,
    /// UPI transfer (QR or VPA).
    Upi,
    /// Card payment on external terminal.
    Card,
}

impl Default for PaymentMode {
    fn default() -> Self {
        PaymentMode::Cash
    }
}

// =============================================================================
// Discount
// =============================================================================

/// An invoice-level discount request.
///
/// A positive `amount_cents` wins over `percent_bps`. Neither set means no
/// discount.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Discount {
    /// Flat amount off the subtotal, capped at the subtotal.
    #[serde(default)]
    pub amount_cents: Option<i64>,
    /// Percentage off in basis points, clamped to 0..=10000.
    #[serde(default)]
    pub percent_bps: Option<i64>,
}

impl Discount {
    /// No discount.
    pub const fn none() -> Self {
        Self {
            amount_cents: None,
            percent_bps: None,
        }
    }

    /// A flat amount off.
    pub const fn amount(cents: i64) -> Self {
        Self {
            amount_cents: Some(cents),
            percent_bps: None,
        }
    }

    /// A percentage off, in basis points.
    pub const fn percent(bps: i64) -> Self {
        Self {
            amount_cents: None,
            percent_bps: Some(bps),
        }
    }
}

// =============================================================================
// Requested Line
// =============================================================================

/// A line as submitted by the caller, before merging and catalog resolution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct RequestedLine {
    /// Catalog reference. Lines without one are priced as submitted, untaxed.
    #[serde(default)]
    pub item_id: Option<String>,
    pub item_name: String,
    pub quantity: i64,
    pub unit_price_cents: i64,
    /// Client-computed tax. Advisory only, always recomputed.
    #[serde(default)]
    pub tax_cents: Option<i64>,
}

impl RequestedLine {
    /// A line referencing a catalog item.
    pub fn item(
        item_id: impl Into<String>,
        item_name: impl Into<String>,
        quantity: i64,
        unit_price_cents: i64,
    ) -> Self {
        Self {
            item_id: Some(item_id.into()),
            item_name: item_name.into(),
            quantity,
            unit_price_cents,
            tax_cents: None,
        }
    }

    /// An ad-hoc line with no catalog reference.
    pub fn custom(item_name: impl Into<String>, quantity: i64, unit_price_cents: i64) -> Self {
        Self {
            item_id: None,
            item_name: item_name.into(),
            quantity,
            unit_price_cents,
            tax_cents: None,
        }
    }
}

// =============================================================================
// Invoice
// =============================================================================

/// An invoice header. Pending invoices double as open table orders.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Invoice {
    pub id: String,
    pub tenant_id: String,
    /// Human-readable, globally unique (`INV-TENANT-YYYYMMDD-SUFFIX`).
    pub invoice_number: String,
    pub status: InvoiceStatus,
    pub table_number: Option<i64>,
    pub customer_name: Option<String>,
    pub customer_phone: Option<String>,
    pub payment_mode: PaymentMode,
    /// Requested flat discount, kept so completion re-prices with it.
    pub discount_amount_cents: Option<i64>,
    /// Requested percentage discount, in basis points.
    pub discount_percent_bps: Option<i64>,
    /// Σ unit_price × quantity.
    pub subtotal_cents: i64,
    /// Σ line discount shares.
    pub discount_cents: i64,
    /// Σ line tax.
    pub tax_cents: i64,
    /// Σ line totals.
    pub total_cents: i64,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
    #[ts(as = "Option<String>")]
    pub completed_at: Option<DateTime<Utc>>,
}

impl Invoice {
    /// The discount that was requested for this invoice.
    pub fn requested_discount(&self) -> Discount {
        Discount {
            amount_cents: self.discount_amount_cents,
            percent_bps: self.discount_percent_bps,
        }
    }

    /// Returns the grand total as Money.
    #[inline]
    pub fn total(&self) -> Money {
        Money::from_cents(self.total_cents)
    }

    #[inline]
    pub fn is_pending(&self) -> bool {
        self.status == InvoiceStatus::Pending
    }
}

// =============================================================================
// Invoice Line
// =============================================================================

/// A persisted invoice line.
/// Uses snapshot pattern to freeze item data at time of sale.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct InvoiceLine {
    pub id: String,
    pub invoice_id: String,
    pub tenant_id: String,
    /// Ordering within the invoice, starting at 0.
    pub position: i64,
    /// Catalog item at time of sale. Not a foreign key: items may be deleted.
    pub item_id: Option<String>,
    /// Item name at time of sale (frozen).
    pub item_name: String,
    pub quantity: i64,
    /// Unit price in cents at time of sale (frozen).
    pub unit_price_cents: i64,
    /// This line's share of the invoice discount.
    pub discount_cents: i64,
    pub tax_cents: i64,
    /// unit_price × quantity − discount + tax.
    pub total_cents: i64,
}

impl InvoiceLine {
    /// Returns the unit price as Money.
    #[inline]
    pub fn unit_price(&self) -> Money {
        Money::from_cents(self.unit_price_cents)
    }

    /// Turns the snapshot back into a request, for re-pricing on completion.
    pub fn to_requested(&self) -> RequestedLine {
        RequestedLine {
            item_id: self.item_id.clone(),
            item_name: self.item_name.clone(),
            quantity: self.quantity,
            unit_price_cents: self.unit_price_cents,
            tax_cents: Some(self.tax_cents),
        }
    }
}

/// An invoice with its lines ordered by position.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct InvoiceWithLines {
    pub invoice: Invoice,
    pub lines: Vec<InvoiceLine>,
}

// =============================================================================
// Invoice Query
// =============================================================================

/// Filters for listing invoices. Results are newest first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct InvoiceQuery {
    #[serde(default)]
    pub status: Option<InvoiceStatus>,
    #[serde(default)]
    pub table_number: Option<i64>,
    #[serde(default = "InvoiceQuery::default_limit")]
    pub limit: i64,
    #[serde(default)]
    pub offset: i64,
}

impl InvoiceQuery {
    /// Page size used when the caller does not give one.
    pub const DEFAULT_LIMIT: i64 = 50;
    /// Largest page a caller may request.
    pub const MAX_LIMIT: i64 = 500;

    fn default_limit() -> i64 {
        Self::DEFAULT_LIMIT
    }

    /// Only pending invoices (open table orders).
    pub fn pending() -> Self {
        Self {
            status: Some(InvoiceStatus::Pending),
            ..Self::default()
        }
    }

    /// Clamps paging values into their allowed ranges.
    pub fn normalized(mut self) -> Self {
        self.limit = self.limit.clamp(1, Self::MAX_LIMIT);
        self.offset = self.offset.max(0);
        self
    }
}

impl Default for InvoiceQuery {
    fn default() -> Self {
        Self {
            status: None,
            table_number: None,
            limit: Self::DEFAULT_LIMIT,
            offset: 0,
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
