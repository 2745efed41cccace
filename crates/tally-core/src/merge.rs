//! # Line-Item Merger
//!
//! Collapses duplicate requested lines into one line per item and price.
//!
//! ## Merge Key
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  RequestedLine                         MergeKey                         │
//! │                                                                         │
//! │  item_id = Some(id), price p   ──►     ById   { item_id, unit_price }   │
//! │  item_id = None,     price p   ──►     ByName { name,    unit_price }   │
//! │                                                                         │
//! │  [(Chai ×2 @20), (Chai ×3 @20)]  ──►  [(Chai ×5 @20)]                   │
//! │  [(Chai ×2 @20), (Chai ×1 @25)]  ──►  two lines (different price)       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Output order is the order in which each key was first seen, so the same
//! request always produces the same invoice lines.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::{CoreResult, ValidationError};
use crate::money::Money;
use crate::types::{RequestedLine, TaxRate};
use crate::validation::{
    validate_item_name, validate_line_count, validate_price_cents, validate_quantity,
};

/// Identity used to consolidate duplicate lines.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum MergeKey {
    ById { item_id: String, unit_price: Money },
    ByName { name: String, unit_price: Money },
}

/// One line per distinct [`MergeKey`], quantities summed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MergedLine {
    pub item_id: Option<String>,
    pub item_name: String,
    pub quantity: i64,
    pub unit_price: Money,
    /// Zero until the line is resolved against the catalog.
    pub tax_rate: TaxRate,
}

impl MergedLine {
    pub fn key(&self) -> MergeKey {
        match &self.item_id {
            Some(item_id) => MergeKey::ById {
                item_id: item_id.clone(),
                unit_price: self.unit_price,
            },
            None => MergeKey::ByName {
                name: self.item_name.clone(),
                unit_price: self.unit_price,
            },
        }
    }

    /// unit_price × quantity.
    #[inline]
    pub fn value(&self) -> Money {
        self.unit_price.multiply_quantity(self.quantity)
    }
}

/// Validates requested lines and merges duplicates.
///
/// Advisory client tax is dropped here. An empty request is rejected.
///
/// ## Example
/// ```rust
/// use tally_core::merge::merge_requested;
/// use tally_core::types::RequestedLine;
///
/// let merged = merge_requested(&[
///     RequestedLine::item("a", "Chai", 2, 2000),
///     RequestedLine::item("a", "Chai", 3, 2000),
/// ])
/// .unwrap();
/// assert_eq!(merged.len(), 1);
/// assert_eq!(merged[0].quantity, 5);
/// ```
pub fn merge_requested(lines: &[RequestedLine]) -> CoreResult<Vec<MergedLine>> {
    validate_line_count(lines.len())?;

    let mut converted = Vec::with_capacity(lines.len());
    for line in lines {
        validate_quantity(line.quantity)?;
        validate_item_name(&line.item_name)?;
        validate_price_cents(line.unit_price_cents)?;

        converted.push(MergedLine {
            item_id: line
                .item_id
                .as_deref()
                .map(str::trim)
                .filter(|id| !id.is_empty())
                .map(str::to_string),
            item_name: line.item_name.trim().to_string(),
            quantity: line.quantity,
            unit_price: Money::from_cents(line.unit_price_cents),
            tax_rate: TaxRate::zero(),
        });
    }

    consolidate(converted)
}

/// Merges lines sharing a key, keeping first-seen order.
///
/// Run again after catalog resolution: two lines for the same item submitted
/// at different client prices collapse once both carry the catalog price.
/// The merged quantity must still be within the per-line maximum, and every
/// price (catalog ones included) within [`MAX_PRICE_CENTS`]. The subtotal is
/// summed with checked arithmetic so pricing never overflows.
///
/// [`MAX_PRICE_CENTS`]: crate::MAX_PRICE_CENTS
pub fn consolidate(lines: Vec<MergedLine>) -> CoreResult<Vec<MergedLine>> {
    let mut index: HashMap<MergeKey, usize> = HashMap::with_capacity(lines.len());
    let mut merged: Vec<MergedLine> = Vec::with_capacity(lines.len());

    for line in lines {
        match index.get(&line.key()) {
            Some(&pos) => merged[pos].quantity += line.quantity,
            None => {
                index.insert(line.key(), merged.len());
                merged.push(line);
            }
        }
    }

    let mut subtotal = Money::zero();
    for line in &merged {
        validate_quantity(line.quantity)?;
        validate_price_cents(line.unit_price.cents())?;
        subtotal = line
            .unit_price
            .checked_multiply_quantity(line.quantity)
            .and_then(|value| subtotal.checked_add(value))
            .ok_or_else(|| ValidationError::OutOfRange {
                field: "subtotal".to_string(),
                min: 0,
                max: i64::MAX,
            })?;
    }

    Ok(merged)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CoreError;
    use crate::MAX_PRICE_CENTS;

    #[test]
    fn test_same_item_same_price_merges() {
        let merged = merge_requested(&[
            RequestedLine::item("a", "Chai", 2, 2000),
            RequestedLine::item("a", "Chai", 3, 2000),
        ])
        .unwrap();

        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].quantity, 5);
        assert_eq!(merged[0].value(), Money::from_cents(10000));
    }

    #[test]
    fn test_different_price_stays_separate() {
        let merged = merge_requested(&[
            RequestedLine::item("a", "Chai", 2, 2000),
            RequestedLine::item("a", "Chai", 1, 2500),
        ])
        .unwrap();
        assert_eq!(merged.len(), 2);
    }

    #[test]
    fn test_custom_lines_merge_by_name() {
        let merged = merge_requested(&[
            RequestedLine::custom("Corkage", 1, 5000),
            RequestedLine::item("x", "Corkage", 1, 5000),
            RequestedLine::custom(" Corkage ", 2, 5000),
        ])
        .unwrap();

        assert_eq!(merged.len(), 2);
        assert_eq!(merged[0].item_id, None);
        assert_eq!(merged[0].quantity, 3);
        assert_eq!(merged[1].item_id.as_deref(), Some("x"));
    }

    #[test]
    fn test_first_seen_order_kept() {
        let merged = merge_requested(&[
            RequestedLine::item("b", "Lassi", 1, 6000),
            RequestedLine::item("a", "Chai", 1, 2000),
            RequestedLine::item("b", "Lassi", 1, 6000),
        ])
        .unwrap();

        let names: Vec<_> = merged.iter().map(|l| l.item_name.as_str()).collect();
        assert_eq!(names, ["Lassi", "Chai"]);
    }

    #[test]
    fn test_advisory_tax_is_ignored() {
        let mut line = RequestedLine::item("a", "Chai", 1, 2000);
        line.tax_cents = Some(999_999);
        let merged = merge_requested(&[line]).unwrap();
        assert!(merged[0].tax_rate.is_zero());
    }

    #[test]
    fn test_empty_request_rejected() {
        assert!(matches!(
            merge_requested(&[]),
            Err(CoreError::Validation(ValidationError::Required { .. }))
        ));
    }

    #[test]
    fn test_invalid_lines_rejected() {
        assert!(merge_requested(&[RequestedLine::item("a", "Chai", 0, 2000)]).is_err());
        assert!(merge_requested(&[RequestedLine::item("a", "", 1, 2000)]).is_err());
        assert!(merge_requested(&[RequestedLine::item("a", "Chai", 1, -1)]).is_err());
    }

    #[test]
    fn test_merged_quantity_revalidated() {
        let result = merge_requested(&[
            RequestedLine::item("a", "Chai", 600, 2000),
            RequestedLine::item("a", "Chai", 600, 2000),
        ]);
        assert!(matches!(
            result,
            Err(CoreError::Validation(ValidationError::OutOfRange { .. }))
        ));
    }

    #[test]
    fn test_consolidate_after_repricing() {
        let mut lines = merge_requested(&[
            RequestedLine::item("a", "Chai", 2, 1500),
            RequestedLine::item("a", "Chai", 3, 2000),
        ])
        .unwrap();
        assert_eq!(lines.len(), 2);

        for line in &mut lines {
            line.unit_price = Money::from_cents(2000);
        }
        let lines = consolidate(lines).unwrap();
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].quantity, 5);
    }

    #[test]
    fn test_price_above_ceiling_rejected() {
        let result = merge_requested(&[RequestedLine::custom("Big", 3, i64::MAX / 2)]);
        assert!(matches!(
            result,
            Err(CoreError::Validation(ValidationError::OutOfRange { ref field, .. }))
                if field == "price"
        ));
    }

    #[test]
    fn test_largest_invoice_stays_in_range() {
        let lines: Vec<_> = (0..crate::MAX_INVOICE_LINES)
            .map(|i| RequestedLine::custom(format!("Line {i}"), 999, MAX_PRICE_CENTS))
            .collect();

        let merged = merge_requested(&lines).unwrap();
        let subtotal: Money = merged.iter().map(MergedLine::value).sum();
        assert_eq!(subtotal.cents(), MAX_PRICE_CENTS * 999 * crate::MAX_INVOICE_LINES as i64);
    }

    #[test]
    fn test_catalog_price_checked_on_consolidate() {
        let mut lines = merge_requested(&[RequestedLine::item("a", "Chai", 3, 2000)]).unwrap();
        lines[0].unit_price = Money::from_cents(i64::MAX / 2);

        assert!(matches!(
            consolidate(lines),
            Err(CoreError::Validation(ValidationError::OutOfRange { .. }))
        ));
    }
}
