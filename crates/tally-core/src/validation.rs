//! # Validation Module
//!
//! Input validation utilities for Tally POS.
//!
//! ## Where Checks Live
//! ```text
//! request fields ─► this module (names, phones, quantities, prices, tables)
//!                      │  ValidationError, before any row is read
//!                      ▼
//! SQLite CHECKs    ─► last line of defence: price >= 0, rate <= 10000,
//!                     limited stock >= 0, one open order per table
//! ```
//!
//! ## Usage
//! ```rust
//! use tally_core::validation::{validate_item_name, validate_quantity};
//!
//! validate_item_name("Masala Dosa").unwrap();
//! validate_quantity(5).unwrap();
//! ```

use crate::error::ValidationError;
use crate::{BPS_SCALE, MAX_INVOICE_LINES, MAX_LINE_QUANTITY, MAX_PRICE_CENTS};

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

const MAX_NAME_LEN: usize = 200;
const MAX_CUSTOMER_NAME_LEN: usize = 100;
const MAX_PHONE_LEN: usize = 20;

// =============================================================================
// String Validators
// =============================================================================

/// Validates an item name (catalog item or ad-hoc line).
///
/// ## Rules
/// - Must not be empty
/// - Must be between 1 and 200 characters
///
/// ## Example
/// ```rust
/// use tally_core::validation::validate_item_name;
///
/// assert!(validate_item_name("Paneer Tikka").is_ok());
/// assert!(validate_item_name("   ").is_err());
/// ```
pub fn validate_item_name(name: &str) -> ValidationResult<()> {
    let name = name.trim();

    if name.is_empty() {
        return Err(ValidationError::Required {
            field: "item_name".to_string(),
        });
    }

    if name.chars().count() > MAX_NAME_LEN {
        return Err(ValidationError::TooLong {
            field: "item_name".to_string(),
            max: MAX_NAME_LEN,
        });
    }

    Ok(())
}

/// Validates an optional customer name. Blank is treated as absent.
///
/// ## Returns
/// The trimmed name, or `None` if blank.
pub fn validate_customer_name(name: Option<&str>) -> ValidationResult<Option<String>> {
    let Some(name) = name.map(str::trim).filter(|n| !n.is_empty()) else {
        return Ok(None);
    };

    if name.chars().count() > MAX_CUSTOMER_NAME_LEN {
        return Err(ValidationError::TooLong {
            field: "customer_name".to_string(),
            max: MAX_CUSTOMER_NAME_LEN,
        });
    }

    Ok(Some(name.to_string()))
}

/// Validates an optional customer phone number. Blank is treated as absent.
///
/// ## Rules
/// - Digits, spaces, hyphens, and a leading `+`
/// - At most 20 characters
///
/// ## Example
/// ```rust
/// use tally_core::validation::validate_customer_phone;
///
/// assert_eq!(
///     validate_customer_phone(Some(" +91 98450-12345 ")).unwrap().as_deref(),
///     Some("+91 98450-12345")
/// );
/// assert!(validate_customer_phone(Some("call me")).is_err());
/// ```
pub fn validate_customer_phone(phone: Option<&str>) -> ValidationResult<Option<String>> {
    let Some(phone) = phone.map(str::trim).filter(|p| !p.is_empty()) else {
        return Ok(None);
    };

    if phone.len() > MAX_PHONE_LEN {
        return Err(ValidationError::TooLong {
            field: "customer_phone".to_string(),
            max: MAX_PHONE_LEN,
        });
    }

    let body = phone.strip_prefix('+').unwrap_or(phone);
    if !body
        .chars()
        .all(|c| c.is_ascii_digit() || c == ' ' || c == '-')
        || !body.chars().any(|c| c.is_ascii_digit())
    {
        return Err(ValidationError::InvalidFormat {
            field: "customer_phone".to_string(),
            reason: "must contain only digits, spaces, hyphens and a leading +".to_string(),
        });
    }

    Ok(Some(phone.to_string()))
}

// =============================================================================
// Numeric Validators
// =============================================================================

/// Validates a quantity value.
///
/// ## Rules
/// - Must be positive (> 0)
/// - Must not exceed MAX_LINE_QUANTITY (999)
///
/// Applied to every requested line and again to each merged line, so two
/// lines of 600 for the same item fail even though each is in range.
pub fn validate_quantity(qty: i64) -> ValidationResult<()> {
    if qty <= 0 {
        return Err(ValidationError::MustBePositive {
            field: "quantity".to_string(),
        });
    }

    if qty > MAX_LINE_QUANTITY {
        return Err(ValidationError::OutOfRange {
            field: "quantity".to_string(),
            min: 1,
            max: MAX_LINE_QUANTITY,
        });
    }

    Ok(())
}

/// Validates a price in cents.
///
/// ## Rules
/// - Must be non-negative (>= 0)
/// - Zero is allowed (complimentary items)
/// - Must not exceed MAX_PRICE_CENTS
///
/// ## Example
/// ```rust
/// use tally_core::validation::validate_price_cents;
///
/// assert!(validate_price_cents(1099).is_ok());
/// assert!(validate_price_cents(0).is_ok());
/// assert!(validate_price_cents(-100).is_err());
/// assert!(validate_price_cents(i64::MAX / 2).is_err());
/// ```
pub fn validate_price_cents(cents: i64) -> ValidationResult<()> {
    if !(0..=MAX_PRICE_CENTS).contains(&cents) {
        return Err(ValidationError::OutOfRange {
            field: "price".to_string(),
            min: 0,
            max: MAX_PRICE_CENTS,
        });
    }

    Ok(())
}

/// Validates a tax rate in basis points.
///
/// ## Rules
/// - Must be between 0 and 10000 (0% to 100%)
pub fn validate_tax_rate_bps(bps: i64) -> ValidationResult<()> {
    if !(0..=BPS_SCALE).contains(&bps) {
        return Err(ValidationError::OutOfRange {
            field: "tax_rate".to_string(),
            min: 0,
            max: BPS_SCALE,
        });
    }

    Ok(())
}

/// Validates a table number. Tables are numbered from 1.
pub fn validate_table_number(table: Option<i64>) -> ValidationResult<()> {
    match table {
        Some(n) if n <= 0 => Err(ValidationError::MustBePositive {
            field: "table_number".to_string(),
        }),
        _ => Ok(()),
    }
}

/// Validates a flat discount amount. Negative discounts are rejected.
pub fn validate_discount_amount(cents: Option<i64>) -> ValidationResult<()> {
    match cents {
        Some(c) if c < 0 => Err(ValidationError::OutOfRange {
            field: "discount_amount".to_string(),
            min: 0,
            max: i64::MAX,
        }),
        _ => Ok(()),
    }
}

// =============================================================================
// Collection Validators
// =============================================================================

/// Validates the number of lines on a request.
///
/// ## Rules
/// - At least one line
/// - Must not exceed MAX_INVOICE_LINES (200)
pub fn validate_line_count(count: usize) -> ValidationResult<()> {
    if count == 0 {
        return Err(ValidationError::Required {
            field: "items".to_string(),
        });
    }

    if count > MAX_INVOICE_LINES {
        return Err(ValidationError::OutOfRange {
            field: "items".to_string(),
            min: 1,
            max: MAX_INVOICE_LINES as i64,
        });
    }

    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================
