//! # Database Error Types
//!
//! Error types for database operations.
//!
//! ## Error Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Error Propagation                                    │
//! │                                                                         │
//! │  SQLite Error (sqlx::Error)                                            │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  DbError (this module) ← Adds context and categorization               │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  EngineError (tally-engine) ← Unique violations on invoice_number      │
//! │       │                        become DuplicateInvoiceNumber           │
//! │       ▼                                                                 │
//! │  ErrorReport { code, message } for the caller                          │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use thiserror::Error;

/// Record store failures.
#[derive(Debug, Error)]
pub enum DbError {
    /// No row matched, e.g. an UPDATE of a deleted catalog item.
    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    /// A UNIQUE index rejected the write. `field` is SQLite's column list,
    /// e.g. `invoices.invoice_number` or
    /// `invoices.tenant_id, invoices.table_number` (second open order for a table).
    #[error("Duplicate {field}: '{value}' already exists")]
    UniqueViolation { field: String, value: String },

    /// Lines written for an invoice that does not exist.
    #[error("Foreign key violation: {message}")]
    ForeignKeyViolation { message: String },

    /// A CHECK constraint rejected the row (negative stock, unknown status).
    #[error("Check constraint failed: {constraint}")]
    CheckViolation { constraint: String },

    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Migration failed: {0}")]
    MigrationFailed(String),

    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// BEGIN, COMMIT or ROLLBACK failed.
    #[error("Transaction failed: {0}")]
    TransactionFailed(String),

    /// No connection became free within `connect_timeout`.
    #[error("Connection pool exhausted")]
    PoolExhausted,

    #[error("Internal database error: {0}")]
    Internal(String),
}

impl DbError {
    /// Creates a NotFound error for a given entity type and ID.
    pub fn not_found(entity: impl Into<String>, id: impl Into<String>) -> Self {
        DbError::NotFound {
            entity: entity.into(),
            id: id.into(),
        }
    }

    /// Creates a UniqueViolation error.
    pub fn duplicate(field: impl Into<String>, value: impl Into<String>) -> Self {
        DbError::UniqueViolation {
            field: field.into(),
            value: value.into(),
        }
    }

    /// Whether this is a unique violation on `field` (e.g. `invoices.invoice_number`).
    pub fn is_unique_violation_on(&self, field: &str) -> bool {
        matches!(self, DbError::UniqueViolation { field: f, .. } if f.contains(field))
    }
}

/// Classifies sqlx errors. SQLite reports constraint failures only through
/// the message text, e.g. `UNIQUE constraint failed: invoices.invoice_number`.
impl From<sqlx::Error> for DbError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => DbError::not_found("Record", "unknown"),

            sqlx::Error::Database(db_err) => {
                let msg = db_err.message();
                let detail = |prefix: &str| {
                    msg.split(prefix)
                        .nth(1)
                        .map(str::trim)
                        .unwrap_or("unknown")
                        .to_string()
                };

                if msg.contains("UNIQUE constraint failed") {
                    DbError::duplicate(detail("UNIQUE constraint failed:"), "unknown")
                } else if msg.contains("FOREIGN KEY constraint failed") {
                    DbError::ForeignKeyViolation {
                        message: msg.to_string(),
                    }
                } else if msg.contains("CHECK constraint failed") {
                    DbError::CheckViolation {
                        constraint: detail("CHECK constraint failed:"),
                    }
                } else {
                    DbError::QueryFailed(msg.to_string())
                }
            }

            sqlx::Error::PoolTimedOut => DbError::PoolExhausted,
            sqlx::Error::PoolClosed => DbError::ConnectionFailed("pool is closed".to_string()),
            _ => DbError::Internal(err.to_string()),
        }
    }
}

impl From<sqlx::migrate::MigrateError> for DbError {
    fn from(err: sqlx::migrate::MigrateError) -> Self {
        DbError::MigrationFailed(err.to_string())
    }
}

/// Result type for database operations.
pub type DbResult<T> = Result<T, DbError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unique_violation_matching() {
        let err = DbError::duplicate("invoices.invoice_number", "INV-1");
        assert!(err.is_unique_violation_on("invoice_number"));
        assert!(!err.is_unique_violation_on("table_number"));
        assert!(!DbError::PoolExhausted.is_unique_violation_on("invoice_number"));
    }

    #[tokio::test]
    async fn test_check_constraint_is_classified() {
        let db = crate::Database::new(crate::DbConfig::in_memory()).await.unwrap();
        let err: DbError = sqlx::query(
            "INSERT INTO catalog_items (id, tenant_id, name, price_cents, tax_rate_bps, stock_quantity, limit_stock, created_at, updated_at)
             VALUES ('x', 't-1', 'Broken', -5, 0, 0, 0, '2026-01-01T00:00:00Z', '2026-01-01T00:00:00Z')",
        )
        .execute(db.pool())
        .await
        .unwrap_err()
        .into();

        assert!(matches!(err, DbError::CheckViolation { .. }), "{err:?}");
    }

    #[test]
    fn test_row_not_found_maps_to_not_found() {
        let err: DbError = sqlx::Error::RowNotFound.into();
        assert!(matches!(err, DbError::NotFound { .. }));
    }
}
