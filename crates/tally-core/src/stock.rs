//! # Stock Rule
//!
//! Pure half of the stock reservation guard: how much of each item an invoice
//! needs, and whether an item can cover it. Locking and deducting live in
//! `tally-engine::guard`.
//!
//! ```text
//!   priced lines ──► aggregate_demand ──► { item_id → qty }  (sorted by id)
//!                                              │
//!                       for each: lock row, check_reservation
//!                                              │
//!          ┌───────────────────────────────────┼──────────────────────┐
//!          ▼                                   ▼                      ▼
//!   limit_stock off: Skip        stock ≥ qty: Deduct{remaining}   InsufficientStock
//! ```

use std::collections::BTreeMap;

use crate::error::{CoreError, CoreResult};
use crate::pricing::PricedLine;
use crate::types::CatalogItem;

/// Outcome of checking one item against its demand.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reservation {
    /// Stock limiting is off: no check, no deduction.
    Skip,
    /// Enough stock; `remaining` is the quantity after deduction.
    Deduct { remaining: i64 },
}

/// Sums quantities per referenced catalog item.
///
/// Lines without an item reference need no stock. The map is ordered, so
/// items are always locked in the same order.
pub fn aggregate_demand(lines: &[PricedLine]) -> BTreeMap<String, i64> {
    let mut demand = BTreeMap::new();
    for line in lines {
        if let Some(item_id) = &line.item_id {
            *demand.entry(item_id.clone()).or_insert(0) += line.quantity;
        }
    }
    demand
}

/// Checks whether `item` can cover `requested` units.
pub fn check_reservation(item: &CatalogItem, requested: i64) -> CoreResult<Reservation> {
    if !item.limit_stock {
        return Ok(Reservation::Skip);
    }

    if item.stock_quantity < requested {
        return Err(CoreError::InsufficientStock {
            item_name: item.name.clone(),
            available: item.stock_quantity,
            requested,
        });
    }

    Ok(Reservation::Deduct {
        remaining: item.stock_quantity - requested,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::money::Money;
    use crate::types::TaxRate;
    use chrono::Utc;

    fn item(stock: i64, limit: bool) -> CatalogItem {
        let now = Utc::now();
        CatalogItem {
            id: "i-1".into(),
            tenant_id: "t-1".into(),
            name: "Paneer Tikka".into(),
            category: Some("Starters".into()),
            price_cents: 24000,
            tax_rate_bps: 500,
            stock_quantity: stock,
            limit_stock: limit,
            created_at: now,
            updated_at: now,
        }
    }

    fn priced(item_id: Option<&str>, qty: i64) -> PricedLine {
        PricedLine {
            item_id: item_id.map(str::to_string),
            item_name: "x".into(),
            quantity: qty,
            unit_price: Money::from_cents(100),
            tax_rate: TaxRate::zero(),
            value: Money::from_cents(100 * qty),
            discount: Money::zero(),
            tax: Money::zero(),
            total: Money::from_cents(100 * qty),
        }
    }

    #[test]
    fn test_aggregate_demand_sums_and_sorts() {
        let demand = aggregate_demand(&[
            priced(Some("b"), 2),
            priced(None, 7),
            priced(Some("a"), 1),
            priced(Some("b"), 3),
        ]);

        let entries: Vec<_> = demand.into_iter().collect();
        assert_eq!(entries, vec![("a".to_string(), 1), ("b".to_string(), 5)]);
    }

    #[test]
    fn test_check_reservation() {
        assert_eq!(
            check_reservation(&item(10, true), 6).unwrap(),
            Reservation::Deduct { remaining: 4 }
        );
        assert_eq!(
            check_reservation(&item(6, true), 6).unwrap(),
            Reservation::Deduct { remaining: 0 }
        );
        assert_eq!(check_reservation(&item(0, false), 50).unwrap(), Reservation::Skip);
    }

    #[test]
    fn test_insufficient_stock_reports_figures() {
        let err = check_reservation(&item(3, true), 5).unwrap_err();
        match err {
            CoreError::InsufficientStock {
                item_name,
                available,
                requested,
            } => {
                assert_eq!(item_name, "Paneer Tikka");
                assert_eq!(available, 3);
                assert_eq!(requested, 5);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
