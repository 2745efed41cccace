//! # Pricing & Discount Calculator
//!
//! Turns resolved, merged lines plus a discount request into final figures.
//!
//! ## Calculation Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  lines (catalog price, tax rate)                                        │
//! │      │                                                                  │
//! │      ▼  subtotal = Σ unit_price × quantity                              │
//! │      ▼  discount = min(amount, subtotal)            if amount > 0       │
//! │                  = subtotal × clamp(bps) / 10000    else if percent     │
//! │      ▼  shares   = allocate(discount, line values)  (sum == discount)   │
//! │      ▼  taxable  = max(0, value − share)                                │
//! │      ▼  tax      = round_half_up(taxable × rate)                        │
//! │      ▼  total    = taxable + tax                                        │
//! │                                                                         │
//! │  Invoice figures are exact sums of line figures.                        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Example
//! ```rust
//! use tally_core::merge::MergedLine;
//! use tally_core::pricing::price_lines;
//! use tally_core::types::{Discount, TaxRate};
//! use tally_core::Money;
//!
//! let line = |name: &str, cents, bps| MergedLine {
//!     item_id: None,
//!     item_name: name.to_string(),
//!     quantity: 1,
//!     unit_price: Money::from_cents(cents),
//!     tax_rate: TaxRate::from_bps(bps),
//! };
//!
//! let priced = price_lines(
//!     vec![line("Thali", 6000, 1000), line("Lassi", 4000, 0)],
//!     &Discount::amount(2000),
//! );
//! assert_eq!(priced.total.cents(), 8480);
//! ```

use serde::{Deserialize, Serialize};

use crate::merge::MergedLine;
use crate::money::Money;
use crate::types::{Discount, TaxRate};
use crate::BPS_SCALE;

/// One fully priced line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PricedLine {
    pub item_id: Option<String>,
    pub item_name: String,
    pub quantity: i64,
    pub unit_price: Money,
    pub tax_rate: TaxRate,
    /// unit_price × quantity.
    pub value: Money,
    /// This line's share of the invoice discount.
    pub discount: Money,
    pub tax: Money,
    /// value − discount + tax.
    pub total: Money,
}

/// Priced lines plus invoice-level figures.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PricedInvoice {
    pub lines: Vec<PricedLine>,
    pub subtotal: Money,
    pub discount: Money,
    pub tax: Money,
    pub total: Money,
}

/// Resolves a discount request against a subtotal.
///
/// A positive amount wins and is capped at the subtotal. Otherwise the
/// percentage is clamped to 0..=100% and rounded half up. Never exceeds the
/// subtotal, never negative.
pub fn resolve_discount(subtotal: Money, discount: &Discount) -> Money {
    if !subtotal.is_positive() {
        return Money::zero();
    }

    match (discount.amount_cents, discount.percent_bps) {
        (Some(amount), _) if amount > 0 => Money::from_cents(amount).min(subtotal),
        (_, Some(bps)) => subtotal.percent_of(bps.clamp(0, BPS_SCALE)),
        _ => Money::zero(),
    }
}

/// Prices merged lines. Input order is kept.
///
/// Expects lines from [`consolidate`](crate::merge::consolidate), which bounds
/// prices and quantities so none of the sums below can overflow.
pub fn price_lines(lines: Vec<MergedLine>, discount: &Discount) -> PricedInvoice {
    let values: Vec<Money> = lines.iter().map(MergedLine::value).collect();
    let subtotal: Money = values.iter().sum();
    let discount = resolve_discount(subtotal, discount);
    let shares = discount.allocate(&values);

    let priced: Vec<PricedLine> = lines
        .into_iter()
        .zip(values)
        .zip(shares)
        .map(|((line, value), share)| {
            let taxable = (value - share).non_negative();
            let tax = taxable.calculate_tax(line.tax_rate);
            PricedLine {
                item_id: line.item_id,
                item_name: line.item_name,
                quantity: line.quantity,
                unit_price: line.unit_price,
                tax_rate: line.tax_rate,
                value,
                discount: share,
                tax,
                total: taxable + tax,
            }
        })
        .collect();

    PricedInvoice {
        subtotal,
        discount: priced.iter().map(|l| l.discount).sum(),
        tax: priced.iter().map(|l| l.tax).sum(),
        total: priced.iter().map(|l| l.total).sum(),
        lines: priced,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn line(name: &str, qty: i64, cents: i64, bps: u32) -> MergedLine {
        MergedLine {
            item_id: Some(format!("id-{name}")),
            item_name: name.to_string(),
            quantity: qty,
            unit_price: Money::from_cents(cents),
            tax_rate: TaxRate::from_bps(bps),
        }
    }

    #[test]
    fn test_discount_distribution_example() {
        let priced = price_lines(
            vec![line("Thali", 1, 6000, 1000), line("Lassi", 1, 4000, 0)],
            &Discount::amount(2000),
        );

        assert_eq!(priced.subtotal.cents(), 10000);
        assert_eq!(priced.discount.cents(), 2000);
        assert_eq!(priced.lines[0].discount.cents(), 1200);
        assert_eq!(priced.lines[1].discount.cents(), 800);
        assert_eq!(priced.lines[0].tax.cents(), 480);
        assert_eq!(priced.lines[1].tax.cents(), 0);
        assert_eq!(priced.lines[0].total.cents(), 5280);
        assert_eq!(priced.lines[1].total.cents(), 3200);
        assert_eq!(priced.total.cents(), 8480);
    }

    #[test]
    fn test_no_discount() {
        let priced = price_lines(vec![line("Chai", 3, 2000, 500)], &Discount::none());
        assert_eq!(priced.subtotal.cents(), 6000);
        assert_eq!(priced.discount, Money::zero());
        assert_eq!(priced.tax.cents(), 300);
        assert_eq!(priced.total.cents(), 6300);
    }

    #[test]
    fn test_amount_capped_at_subtotal() {
        let priced = price_lines(vec![line("Chai", 1, 2000, 1000)], &Discount::amount(5000));
        assert_eq!(priced.discount.cents(), 2000);
        assert_eq!(priced.tax, Money::zero());
        assert_eq!(priced.total, Money::zero());
    }

    #[test]
    fn test_amount_wins_over_percent() {
        let discount = Discount {
            amount_cents: Some(100),
            percent_bps: Some(5000),
        };
        assert_eq!(
            resolve_discount(Money::from_cents(10000), &discount).cents(),
            100
        );

        // zero amount falls through to the percentage
        let discount = Discount {
            amount_cents: Some(0),
            percent_bps: Some(5000),
        };
        assert_eq!(
            resolve_discount(Money::from_cents(10000), &discount).cents(),
            5000
        );
    }

    #[test]
    fn test_percent_clamped() {
        let subtotal = Money::from_cents(10000);
        assert_eq!(resolve_discount(subtotal, &Discount::percent(25_000)), subtotal);
        assert_eq!(resolve_discount(subtotal, &Discount::percent(-300)), Money::zero());
        assert_eq!(resolve_discount(subtotal, &Discount::percent(1250)).cents(), 1250);
    }

    #[test]
    fn test_zero_subtotal_with_discount() {
        let priced = price_lines(vec![line("Water", 2, 0, 1000)], &Discount::amount(500));
        assert_eq!(priced.discount, Money::zero());
        assert_eq!(priced.lines[0].discount, Money::zero());
        assert_eq!(priced.total, Money::zero());
    }

    #[test]
    fn test_shares_never_exceed_line_value() {
        let priced = price_lines(
            vec![
                line("A", 1, 1, 0),
                line("B", 1, 1, 0),
                line("C", 1, 1, 0),
            ],
            &Discount::amount(2),
        );
        for l in &priced.lines {
            assert!(l.discount <= l.value);
        }
        assert_eq!(priced.discount.cents(), 2);
    }

    fn arb_lines() -> impl Strategy<Value = Vec<MergedLine>> {
        prop::collection::vec((1i64..=20, 0i64..=50_000, 0u32..=2800), 1..12).prop_map(|raw| {
            raw.into_iter()
                .enumerate()
                .map(|(i, (qty, cents, bps))| line(&format!("item{i}"), qty, cents, bps))
                .collect()
        })
    }

    fn arb_discount() -> impl Strategy<Value = Discount> {
        prop_oneof![
            Just(Discount::none()),
            (0i64..=2_000_000).prop_map(Discount::amount),
            (-1000i64..=12_000).prop_map(Discount::percent),
        ]
    }

    proptest! {
        #[test]
        fn prop_invoice_reconciles_with_lines(lines in arb_lines(), discount in arb_discount()) {
            let priced = price_lines(lines, &discount);

            let line_totals: Money = priced.lines.iter().map(|l| l.total).sum();
            let line_values: Money = priced.lines.iter().map(|l| l.value).sum();
            let line_shares: Money = priced.lines.iter().map(|l| l.discount).sum();

            prop_assert_eq!(priced.total, line_totals);
            prop_assert_eq!(priced.subtotal, line_values);
            prop_assert_eq!(priced.discount, line_shares);
            prop_assert!(priced.discount <= priced.subtotal);
            prop_assert!(!priced.discount.is_negative());
            prop_assert_eq!(priced.total, priced.subtotal - priced.discount + priced.tax);

            for l in &priced.lines {
                prop_assert!(l.discount <= l.value);
                prop_assert_eq!(l.total, l.value - l.discount + l.tax);
            }
        }
    }
}
