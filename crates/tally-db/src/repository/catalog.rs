//! # Catalog Repository
//!
//! Database operations for catalog items.
//!
//! ## Key Operations
//! - CRUD for a tenant's menu
//! - Tenant-scoped lookups used by invoice pricing
//! - Conditional stock decrement used by the stock guard
//!
//! ## Conditional Decrement
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  UPDATE catalog_items                                                   │
//! │     SET stock_quantity = stock_quantity - :qty                          │
//! │   WHERE id = :id AND tenant_id = :tenant                                │
//! │     AND (limit_stock = 0 OR stock_quantity >= :qty)                     │
//! │                                                                         │
//! │  rows_affected = 1  → deducted                                          │
//! │  rows_affected = 0  → stock moved underneath us, caller rolls back      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::Utc;
use sqlx::{Executor, Sqlite, SqlitePool};
use tracing::debug;

use crate::error::{DbError, DbResult};
use tally_core::CatalogItem;

const SELECT_ITEM: &str = r#"
    SELECT
        id, tenant_id, name, category, price_cents, tax_rate_bps,
        stock_quantity, limit_stock, created_at, updated_at
    FROM catalog_items
"#;

// =============================================================================
// Executor-generic queries (shared by the repository and store transactions)
// =============================================================================

pub(crate) async fn fetch_item<'e, E>(
    executor: E,
    tenant_id: &str,
    item_id: &str,
) -> DbResult<Option<CatalogItem>>
where
    E: Executor<'e, Database = Sqlite>,
{
    let sql = format!("{SELECT_ITEM} WHERE id = ?1 AND tenant_id = ?2");
    let item = sqlx::query_as::<_, CatalogItem>(&sql)
        .bind(item_id)
        .bind(tenant_id)
        .fetch_optional(executor)
        .await?;

    Ok(item)
}

/// Takes SQLite's write lock by touching the row. Returns whether it exists.
pub(crate) async fn touch_item<'e, E>(executor: E, tenant_id: &str, item_id: &str) -> DbResult<bool>
where
    E: Executor<'e, Database = Sqlite>,
{
    let result = sqlx::query(
        "UPDATE catalog_items SET stock_quantity = stock_quantity WHERE id = ?1 AND tenant_id = ?2",
    )
    .bind(item_id)
    .bind(tenant_id)
    .execute(executor)
    .await?;

    Ok(result.rows_affected() == 1)
}

pub(crate) async fn decrement_stock<'e, E>(
    executor: E,
    tenant_id: &str,
    item_id: &str,
    quantity: i64,
) -> DbResult<bool>
where
    E: Executor<'e, Database = Sqlite>,
{
    debug!(item_id = %item_id, quantity, "Deducting stock");

    let result = sqlx::query(
        r#"
        UPDATE catalog_items SET
            stock_quantity = stock_quantity - ?3,
            updated_at = ?4
        WHERE id = ?1 AND tenant_id = ?2
          AND (limit_stock = 0 OR stock_quantity >= ?3)
        "#,
    )
    .bind(item_id)
    .bind(tenant_id)
    .bind(quantity)
    .bind(Utc::now())
    .execute(executor)
    .await?;

    Ok(result.rows_affected() == 1)
}

// =============================================================================
// Repository
// =============================================================================

/// Repository for catalog item operations.
///
/// ## Usage
/// ```rust,ignore
/// let repo = db.catalog();
/// repo.insert(&item).await?;
/// let menu = repo.list("tenant-1").await?;
/// ```
#[derive(Debug, Clone)]
pub struct CatalogRepository {
    pool: SqlitePool,
}

impl CatalogRepository {
    /// Creates a new CatalogRepository.
    pub fn new(pool: SqlitePool) -> Self {
        CatalogRepository { pool }
    }

    /// Gets an item by ID within a tenant.
    pub async fn get(&self, tenant_id: &str, item_id: &str) -> DbResult<Option<CatalogItem>> {
        fetch_item(&self.pool, tenant_id, item_id).await
    }

    /// Lists a tenant's items, ordered by category then name.
    pub async fn list(&self, tenant_id: &str) -> DbResult<Vec<CatalogItem>> {
        debug!(tenant_id = %tenant_id, "Listing catalog items");

        let sql = format!("{SELECT_ITEM} WHERE tenant_id = ?1 ORDER BY category, name");
        let items = sqlx::query_as::<_, CatalogItem>(&sql)
            .bind(tenant_id)
            .fetch_all(&self.pool)
            .await?;

        Ok(items)
    }

    /// Counts a tenant's items.
    pub async fn count(&self, tenant_id: &str) -> DbResult<i64> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM catalog_items WHERE tenant_id = ?1")
                .bind(tenant_id)
                .fetch_one(&self.pool)
                .await?;

        Ok(count)
    }

    /// Inserts a new item.
    pub async fn insert(&self, item: &CatalogItem) -> DbResult<()> {
        debug!(id = %item.id, name = %item.name, "Inserting catalog item");

        sqlx::query(
            r#"
            INSERT INTO catalog_items (
                id, tenant_id, name, category, price_cents, tax_rate_bps,
                stock_quantity, limit_stock, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
            "#,
        )
        .bind(&item.id)
        .bind(&item.tenant_id)
        .bind(&item.name)
        .bind(&item.category)
        .bind(item.price_cents)
        .bind(item.tax_rate_bps)
        .bind(item.stock_quantity)
        .bind(item.limit_stock)
        .bind(item.created_at)
        .bind(item.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Updates an item's editable fields.
    ///
    /// Past invoices are unaffected: lines keep their own snapshots.
    pub async fn update(&self, item: &CatalogItem) -> DbResult<()> {
        debug!(id = %item.id, "Updating catalog item");

        let result = sqlx::query(
            r#"
            UPDATE catalog_items SET
                name = ?3,
                category = ?4,
                price_cents = ?5,
                tax_rate_bps = ?6,
                stock_quantity = ?7,
                limit_stock = ?8,
                updated_at = ?9
            WHERE id = ?1 AND tenant_id = ?2
            "#,
        )
        .bind(&item.id)
        .bind(&item.tenant_id)
        .bind(&item.name)
        .bind(&item.category)
        .bind(item.price_cents)
        .bind(item.tax_rate_bps)
        .bind(item.stock_quantity)
        .bind(item.limit_stock)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("CatalogItem", &item.id));
        }

        Ok(())
    }

    /// Sets the stock level (restock or stock count correction).
    pub async fn set_stock(&self, tenant_id: &str, item_id: &str, quantity: i64) -> DbResult<()> {
        debug!(item_id = %item_id, quantity, "Setting stock");

        let result = sqlx::query(
            "UPDATE catalog_items SET stock_quantity = ?3, updated_at = ?4 WHERE id = ?1 AND tenant_id = ?2",
        )
        .bind(item_id)
        .bind(tenant_id)
        .bind(quantity)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("CatalogItem", item_id));
        }

        Ok(())
    }

    /// Deletes an item. Returns whether anything was deleted.
    pub async fn delete(&self, tenant_id: &str, item_id: &str) -> DbResult<bool> {
        debug!(item_id = %item_id, "Deleting catalog item");

        let result = sqlx::query("DELETE FROM catalog_items WHERE id = ?1 AND tenant_id = ?2")
            .bind(item_id)
            .bind(tenant_id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() == 1)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
