//! # Money Module
//!
//! Provides the `Money` type for handling monetary values safely.
//!
//! ## Why Integer Money?
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  THE FLOATING POINT PROBLEM                                             │
//! │                                                                         │
//! │  In floating point:                                                     │
//! │    0.1 + 0.2 = 0.30000000000000004  ❌ WRONG!                           │
//! │                                                                         │
//! │  Splitting a 10.00 discount three ways:                                 │
//! │    3.33 + 3.33 + 3.33 = 9.99        → Lost 0.01!                        │
//! │                                                                         │
//! │  OUR SOLUTION: Integer minor units + explicit allocation                │
//! │    1000 split [1,1,1] = [334, 333, 333]  (sums back to exactly 1000)    │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use tally_core::money::Money;
//!
//! let price = Money::from_cents(1099);
//! let line = price.multiply_quantity(2);
//! assert_eq!(line.cents(), 2198);
//!
//! let shares = Money::from_cents(1000).allocate(&[
//!     Money::from_cents(1),
//!     Money::from_cents(1),
//!     Money::from_cents(1),
//! ]);
//! assert_eq!(shares.iter().map(|m| m.cents()).sum::<i64>(), 1000);
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Mul, Sub, SubAssign};
use ts_rs::TS;

use crate::types::TaxRate;
use crate::BPS_SCALE;

// =============================================================================
// Money Type
// =============================================================================

/// Represents a monetary value in the smallest currency unit (paise, cents).
///
/// ## Design Decisions
/// - **i64 (signed)**: Subtraction stays closed, e.g. value minus discount
/// - **Single field tuple struct**: Zero-cost abstraction over i64
/// - **Derives**: Full serde support for JSON serialization
///
/// ## Where Money is Used
/// ```text
/// ┌─────────────────────────────────────────────────────────────────────────┐
/// │  CatalogItem.price ──► InvoiceLine.unit_price ──► line value            │
/// │                                                                         │
/// │  Σ line values = subtotal ──► discount ──► allocate(shares)            │
/// │                                                                         │
/// │  (value − share) ──► calculate_tax ──► line total ──► invoice total     │
/// └─────────────────────────────────────────────────────────────────────────┘
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Money(i64);

impl Money {
    /// Creates a Money value from cents (the smallest currency unit).
    #[inline]
    pub const fn from_cents(cents: i64) -> Self {
        Money(cents)
    }

    /// Creates a Money value from major and minor units.
    ///
    /// ## Example
    /// ```rust
    /// use tally_core::money::Money;
    ///
    /// assert_eq!(Money::from_major_minor(10, 99).cents(), 1099);
    /// assert_eq!(Money::from_major_minor(-5, 50).cents(), -550);
    /// ```
    #[inline]
    pub const fn from_major_minor(major: i64, minor: i64) -> Self {
        if major < 0 {
            Money(major * 100 - minor)
        } else {
            Money(major * 100 + minor)
        }
    }

    /// Returns the value in cents (smallest currency unit).
    #[inline]
    pub const fn cents(&self) -> i64 {
        self.0
    }

    /// Returns the major unit portion.
    #[inline]
    pub const fn major(&self) -> i64 {
        self.0 / 100
    }

    /// Returns the minor unit portion (always 0-99).
    #[inline]
    pub const fn minor_part(&self) -> i64 {
        (self.0 % 100).abs()
    }

    /// Returns zero money value.
    #[inline]
    pub const fn zero() -> Self {
        Money(0)
    }

    /// Checks if the value is zero.
    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// Checks if the value is positive (greater than zero).
    #[inline]
    pub const fn is_positive(&self) -> bool {
        self.0 > 0
    }

    /// Checks if the value is negative (less than zero).
    #[inline]
    pub const fn is_negative(&self) -> bool {
        self.0 < 0
    }

    /// Clamps negative values to zero.
    #[inline]
    pub const fn non_negative(&self) -> Self {
        if self.0 < 0 {
            Money(0)
        } else {
            *self
        }
    }

    /// Calculates tax, rounding half up to the nearest cent.
    ///
    /// ## Implementation
    /// Integer math: `(amount * bps + 5000) / 10000`.
    /// The +5000 provides rounding (5000/10000 = 0.5).
    ///
    /// ## Example
    /// ```rust
    /// use tally_core::money::Money;
    /// use tally_core::types::TaxRate;
    ///
    /// let base = Money::from_cents(4800);
    /// let tax = base.calculate_tax(TaxRate::from_bps(1000));
    /// assert_eq!(tax.cents(), 480);
    /// ```
    pub fn calculate_tax(&self, rate: TaxRate) -> Money {
        self.percent_of(rate.bps() as i64)
    }

    /// Returns `bps` basis points of this amount, rounded half up.
    ///
    /// Used for percentage discounts: `subtotal.percent_of(1500)` is 15%.
    pub fn percent_of(&self, bps: i64) -> Money {
        // i128 prevents overflow on large amounts
        let scaled = self.0 as i128 * bps as i128;
        let half = (BPS_SCALE / 2) as i128;
        let rounded = if scaled >= 0 {
            (scaled + half) / BPS_SCALE as i128
        } else {
            (scaled - half) / BPS_SCALE as i128
        };
        Money::from_cents(rounded as i64)
    }

    /// Multiplies money by a quantity.
    ///
    /// ## Example
    /// ```rust
    /// use tally_core::money::Money;
    ///
    /// let unit_price = Money::from_cents(299);
    /// assert_eq!(unit_price.multiply_quantity(3).cents(), 897);
    /// ```
    #[inline]
    pub const fn multiply_quantity(&self, qty: i64) -> Self {
        Money(self.0 * qty)
    }

    /// `multiply_quantity` that returns `None` on overflow.
    #[inline]
    pub const fn checked_multiply_quantity(&self, qty: i64) -> Option<Self> {
        match self.0.checked_mul(qty) {
            Some(cents) => Some(Money(cents)),
            None => None,
        }
    }

    /// Addition that returns `None` on overflow.
    #[inline]
    pub const fn checked_add(&self, other: Money) -> Option<Self> {
        match self.0.checked_add(other.0) {
            Some(cents) => Some(Money(cents)),
            None => None,
        }
    }

    /// Splits this amount across `weights` proportionally.
    ///
    /// Uses the largest-remainder method: every share is first floored, then
    /// the leftover cents go one each to the shares with the largest
    /// fractional remainder (earlier index wins a tie). The shares always sum
    /// to exactly `self`.
    ///
    /// A zero total weight yields all-zero shares instead of dividing by zero.
    ///
    /// ## Example
    /// ```rust
    /// use tally_core::money::Money;
    ///
    /// let discount = Money::from_cents(2000);
    /// let shares = discount.allocate(&[Money::from_cents(6000), Money::from_cents(4000)]);
    /// assert_eq!(shares, vec![Money::from_cents(1200), Money::from_cents(800)]);
    /// ```
    pub fn allocate(&self, weights: &[Money]) -> Vec<Money> {
        debug_assert!(self.0 >= 0, "allocate expects a non-negative amount");
        debug_assert!(weights.iter().all(|w| w.0 >= 0), "weights must be non-negative");

        let total_weight: i128 = weights.iter().map(|w| w.0 as i128).sum();
        if total_weight == 0 || self.0 == 0 {
            return vec![Money::zero(); weights.len()];
        }

        let amount = self.0 as i128;
        let mut shares = Vec::with_capacity(weights.len());
        let mut remainders = Vec::with_capacity(weights.len());
        let mut allocated: i128 = 0;

        for (idx, weight) in weights.iter().enumerate() {
            let exact = amount * weight.0 as i128;
            let floor = exact / total_weight;
            allocated += floor;
            shares.push(floor as i64);
            remainders.push((exact % total_weight, idx));
        }

        // Largest remainder first, lower index breaks ties
        remainders.sort_by(|a, b| b.0.cmp(&a.0).then(a.1.cmp(&b.1)));

        let leftover = (amount - allocated) as usize;
        for (_, idx) in remainders.into_iter().take(leftover) {
            shares[idx] += 1;
        }

        shares.into_iter().map(Money::from_cents).collect()
    }
}

// =============================================================================
// Trait Implementations
// =============================================================================

/// Display shows money with two decimals, without a currency symbol.
///
/// ## Note
/// Currency symbols and grouping belong to the front-end's locale handling.
impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        write!(f, "{}{}.{:02}", sign, self.major().abs(), self.minor_part())
    }
}

impl Default for Money {
    fn default() -> Self {
        Money::zero()
    }
}

impl Add for Money {
    type Output = Self;

    #[inline]
    fn add(self, other: Self) -> Self {
        Money(self.0 + other.0)
    }
}

impl AddAssign for Money {
    #[inline]
    fn add_assign(&mut self, other: Self) {
        self.0 += other.0;
    }
}

impl Sub for Money {
    type Output = Self;

    #[inline]
    fn sub(self, other: Self) -> Self {
        Money(self.0 - other.0)
    }
}

impl SubAssign for Money {
    #[inline]
    fn sub_assign(&mut self, other: Self) {
        self.0 -= other.0;
    }
}

impl Mul<i64> for Money {
    type Output = Self;

    #[inline]
    fn mul(self, qty: i64) -> Self {
        Money(self.0 * qty)
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Self {
        iter.fold(Money::zero(), |acc, m| acc + m)
    }
}

impl<'a> Sum<&'a Money> for Money {
    fn sum<I: Iterator<Item = &'a Money>>(iter: I) -> Self {
        iter.fold(Money::zero(), |acc, m| acc + *m)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
