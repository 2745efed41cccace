//! # Stock Reservation Guard
//!
//! Deducts stock for every catalog item an invoice references, inside the
//! caller's transaction.
//!
//! ## Reservation Flow
//! ```text
//! PricedLine[] ──aggregate_demand──► { item_id → qty } (ordered)
//!                                          │
//!                         for each item:   ▼
//!                 lock_item ──► check_reservation ──► deduct_stock
//!                     │               │                    │
//!                  missing      InsufficientStock     false (raced)
//!                     └───────────────┴────────────────────┘
//!                                     │
//!                          Err, caller rolls back
//! ```
//!
//! Items are locked in key order so two completions never wait on each other
//! in opposite orders.

use tracing::{debug, warn};

use crate::error::EngineResult;
use tally_core::pricing::PricedLine;
use tally_core::stock::{aggregate_demand, check_reservation, Reservation};
use tally_core::CoreError;
use tally_db::StoreTransaction;

/// One stock change applied by a reservation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StockMovement {
    pub item_id: String,
    pub quantity: i64,
    pub remaining: i64,
}

/// Applies stock deductions for completed invoices.
pub struct StockGuard;

impl StockGuard {
    /// Reserves stock for `lines` within `tenant_id`.
    ///
    /// Returns the deductions made. Items with stock limiting off are skipped
    /// and produce no movement. On error some deductions may already be
    /// applied to `tx`; the caller must roll back.
    pub async fn reserve<T: StoreTransaction>(
        tx: &mut T,
        tenant_id: &str,
        lines: &[PricedLine],
    ) -> EngineResult<Vec<StockMovement>> {
        let demand = aggregate_demand(lines);
        let mut movements = Vec::with_capacity(demand.len());

        for (item_id, requested) in demand {
            let item = tx
                .lock_item(tenant_id, &item_id)
                .await?
                .ok_or_else(|| CoreError::ItemNotFound {
                    item_id: item_id.clone(),
                })?;

            let remaining = match check_reservation(&item, requested) {
                Ok(Reservation::Skip) => {
                    debug!(item_id = %item_id, "Stock limiting off, skipping");
                    continue;
                }
                Ok(Reservation::Deduct { remaining }) => remaining,
                Err(e) => {
                    warn!(
                        item_id = %item_id,
                        requested,
                        available = item.stock_quantity,
                        "Insufficient stock"
                    );
                    return Err(e.into());
                }
            };

            if !tx.deduct_stock(tenant_id, &item_id, requested).await? {
                warn!(item_id = %item_id, requested, "Conditional stock decrement matched no row");
                return Err(CoreError::InsufficientStock {
                    item_name: item.name,
                    available: item.stock_quantity,
                    requested,
                }
                .into());
            }

            debug!(item_id = %item_id, requested, remaining, "Stock deducted");
            movements.push(StockMovement {
                item_id,
                quantity: requested,
                remaining,
            });
        }

        Ok(movements)
    }
}
