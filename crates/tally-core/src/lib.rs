//! # tally-core: Pure Business Logic for Tally POS
//!
//! This crate is the **heart** of Tally POS. It contains the invoice math and
//! business rules as pure functions with zero I/O dependencies.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Tally POS Architecture                           │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │              Caller (HTTP layer, already authenticated)         │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │ Principal + NewInvoice                 │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                 tally-engine (InvoiceService)                   │   │
//! │  │    create, update_pending, complete, list                       │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ tally-core (THIS CRATE) ★                       │   │
//! │  │                                                                 │   │
//! │  │   ┌─────────┐ ┌─────────┐ ┌─────────┐ ┌─────────┐ ┌─────────┐  │   │
//! │  │   │  types  │ │  money  │ │  merge  │ │ pricing │ │  stock  │  │   │
//! │  │   └─────────┘ └─────────┘ └─────────┘ └─────────┘ └─────────┘  │   │
//! │  │   ┌─────────┐ ┌───────────┐ ┌────────────┐                     │   │
//! │  │   │ access  │ │ numbering │ │ validation │                     │   │
//! │  │   └─────────┘ └───────────┘ └────────────┘                     │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                    tally-db (Record Store)                      │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain types (CatalogItem, Invoice, InvoiceLine, etc.)
//! - [`money`] - Money type with integer arithmetic (no floating point!)
//! - [`merge`] - Line-item merger keyed by item or name plus unit price
//! - [`pricing`] - Subtotal, discount allocation, per-line tax
//! - [`stock`] - Stock reservation rule
//! - [`access`] - Role policy for tenant admins and system admins
//! - [`numbering`] - Invoice number generation
//! - [`error`] - Domain error types
//! - [`validation`] - Business rule validation
//!
//! ## Example Usage
//!
//! ```rust
//! use tally_core::money::Money;
//! use tally_core::types::TaxRate;
//!
//! let price = Money::from_cents(1099);
//! let tax = price.calculate_tax(TaxRate::from_bps(825));
//!
//! // Tax on 10.99 at 8.25% = 0.91 (rounded)
//! assert_eq!(tax.cents(), 91);
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod access;
pub mod error;
pub mod merge;
pub mod money;
pub mod numbering;
pub mod pricing;
pub mod stock;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use error::{CoreError, CoreResult, ValidationError};
pub use money::Money;
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Maximum quantity of a single line after merging.
///
/// ## Business Reason
/// Prevents accidental over-ordering (e.g., typing 1000 instead of 10).
pub const MAX_LINE_QUANTITY: i64 = 999;

/// Maximum unit price in cents (100 million in currency units).
///
/// Together with [`MAX_LINE_QUANTITY`] and [`MAX_INVOICE_LINES`] this keeps
/// every invoice total well inside `i64`.
pub const MAX_PRICE_CENTS: i64 = 10_000_000_000;

/// Maximum number of distinct lines on one invoice.
pub const MAX_INVOICE_LINES: usize = 200;

/// Basis points in 100%.
pub const BPS_SCALE: i64 = 10_000;
