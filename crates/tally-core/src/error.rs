//! # Error Types
//!
//! Domain-specific error types for tally-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  tally-core errors (this file)                                         │
//! │  ├── CoreError        - Business rule violations                       │
//! │  └── ValidationError  - Input validation failures                      │
//! │                                                                         │
//! │  tally-db errors (separate crate)                                      │
//! │  └── DbError          - Database operation failures                    │
//! │                                                                         │
//! │  tally-engine errors                                                   │
//! │  └── EngineError      - Either of the above + ErrorReport for callers  │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError → EngineError → ErrorReport          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use thiserror::Error;

use crate::types::{InvoiceStatus, Role};

// =============================================================================
// Core Error
// =============================================================================

/// Core business logic errors.
///
/// Every variant carries enough structured detail to render a user-facing
/// message without re-querying anything.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Catalog item is missing, or belongs to another tenant.
    ///
    /// The two cases are deliberately indistinguishable so that a caller
    /// cannot probe for another tenant's item ids.
    #[error("Item not found: {item_id}")]
    ItemNotFound { item_id: String },

    /// Insufficient stock to complete the invoice.
    ///
    /// ## User Workflow
    /// ```text
    /// Complete order (Paneer Tikka × 5)
    ///      │
    ///      ▼
    /// Lock item row: stock=3, limit_stock=true
    ///      │
    ///      ▼
    /// InsufficientStock { item_name: "Paneer Tikka", available: 3, requested: 5 }
    ///      │
    ///      ▼
    /// Whole transaction rolled back, UI shows "Only 3 Paneer Tikka in stock"
    /// ```
    #[error("Insufficient stock for {item_name}: available {available}, requested {requested}")]
    InsufficientStock {
        item_name: String,
        available: i64,
        requested: i64,
    },

    /// Invoice is not in a state that allows the requested operation.
    ///
    /// ## When This Occurs
    /// - Updating the lines of a completed invoice
    /// - Completing an invoice twice
    #[error("Invoice {invoice_id} is {status}, cannot {operation}")]
    InvalidStateTransition {
        invoice_id: String,
        status: InvoiceStatus,
        operation: &'static str,
    },

    /// Could not find a free invoice number after all retries.
    #[error("Could not allocate a unique invoice number after {attempts} attempts")]
    DuplicateInvoiceNumber { attempts: u32 },

    /// Role is not permitted to perform this operation.
    #[error("Role {role} may not {operation}")]
    ForbiddenRole { role: Role, operation: &'static str },

    /// The caller's account is deactivated.
    #[error("Account {tenant_id} is inactive")]
    InactiveAccount { tenant_id: String },

    /// Invoice is missing, or belongs to another tenant.
    #[error("Invoice not found: {0}")]
    InvoiceNotFound(String),

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// These errors occur when caller input doesn't meet requirements.
/// Used for early validation before business logic runs.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    /// Value must be positive.
    #[error("{field} must be positive")]
    MustBePositive { field: String },

    /// Value has the wrong shape (e.g. letters in a phone number).
    #[error("{field} is invalid: {reason}")]
    InvalidFormat { field: String, reason: String },
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = CoreError::InsufficientStock {
            item_name: "Masala Dosa".to_string(),
            available: 3,
            requested: 5,
        };
        assert_eq!(
            err.to_string(),
            "Insufficient stock for Masala Dosa: available 3, requested 5"
        );

        let err = CoreError::InvalidStateTransition {
            invoice_id: "inv-1".to_string(),
            status: InvoiceStatus::Completed,
            operation: "update lines",
        };
        assert_eq!(err.to_string(), "Invoice inv-1 is completed, cannot update lines");

        let err = CoreError::ForbiddenRole {
            role: Role::SystemAdmin,
            operation: "create invoices",
        };
        assert_eq!(err.to_string(), "Role system_admin may not create invoices");
    }

    #[test]
    fn test_validation_converts_to_core_error() {
        let validation_err = ValidationError::Required {
            field: "items".to_string(),
        };
        let core_err: CoreError = validation_err.into();
        assert!(matches!(core_err, CoreError::Validation(_)));
        assert_eq!(core_err.to_string(), "Validation error: items is required");
    }
}
