//! # Catalog Resolution
//!
//! Re-prices requested lines against the tenant's catalog inside the
//! operation's transaction. Client-sent names, prices and tax are never
//! trusted for catalog items.
//!
//! ```text
//! RequestedLine[] ──merge_requested──► MergedLine[] (client prices, no tax)
//!                                          │
//!                              resolve_lines (find_item per id)
//!                                          │
//!                                          ▼
//!                          MergedLine[] (catalog name/price/tax, re-merged)
//!                                          │
//!                                   price_lines(discount)
//!                                          ▼
//!                                    PricedInvoice
//! ```

use std::collections::HashMap;
use tracing::debug;

use crate::error::EngineResult;
use tally_core::merge::{consolidate, merge_requested, MergedLine};
use tally_core::pricing::{price_lines, PricedInvoice};
use tally_core::{CatalogItem, CoreError, Discount, RequestedLine, TaxRate};
use tally_db::StoreTransaction;

/// Overwrites each referenced line with its catalog values and re-merges.
///
/// Lines without an item id keep their submitted name and price and carry no
/// tax. A missing item, or one owned by another tenant, fails with
/// `ItemNotFound`.
pub async fn resolve_lines<T: StoreTransaction>(
    tx: &mut T,
    tenant_id: &str,
    lines: Vec<MergedLine>,
) -> EngineResult<Vec<MergedLine>> {
    let mut catalog: HashMap<String, CatalogItem> = HashMap::new();
    let mut resolved = Vec::with_capacity(lines.len());

    for mut line in lines {
        let Some(item_id) = line.item_id.clone() else {
            line.tax_rate = TaxRate::zero();
            resolved.push(line);
            continue;
        };

        if !catalog.contains_key(&item_id) {
            let item = tx
                .find_item(tenant_id, &item_id)
                .await?
                .ok_or_else(|| CoreError::ItemNotFound {
                    item_id: item_id.clone(),
                })?;
            catalog.insert(item_id.clone(), item);
        }

        if let Some(item) = catalog.get(&item_id) {
            line.item_name = item.name.clone();
            line.unit_price = item.price();
            line.tax_rate = item.tax_rate();
        }
        resolved.push(line);
    }

    debug!(tenant_id = %tenant_id, items = catalog.len(), "Resolved lines against catalog");
    Ok(consolidate(resolved)?)
}

/// Merges, resolves and prices a request in one go.
pub async fn price_request<T: StoreTransaction>(
    tx: &mut T,
    tenant_id: &str,
    requested: &[RequestedLine],
    discount: &Discount,
) -> EngineResult<PricedInvoice> {
    let merged = merge_requested(requested)?;
    let resolved = resolve_lines(tx, tenant_id, merged).await?;
    Ok(price_lines(resolved, discount))
}
