//! # Invoice Numbering
//!
//! Builds human-readable invoice numbers:
//!
//! ```text
//!   INV-SPICEH-20260114-7QK2ZD4M
//!   ─┬─ ───┬── ───┬──── ───┬────
//!    │     │      │        └── random A-Z0-9, grows by 2 per collision retry
//!    │     │      └─────────── UTC date of creation
//!    │     └────────────────── first 6 alphanumerics of the tenant id
//!    └──────────────────────── configurable prefix
//! ```
//!
//! The generator only proposes candidates. Uniqueness is checked by the
//! caller inside its transaction, and the database enforces it again.

use chrono::NaiveDate;
use rand::Rng;

const SUFFIX_CHARSET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";
const TENANT_TAG_LEN: usize = 6;

/// Proposes invoice number candidates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvoiceNumberGenerator {
    prefix: String,
    suffix_len: usize,
    max_attempts: u32,
}

impl InvoiceNumberGenerator {
    pub const DEFAULT_PREFIX: &'static str = "INV";
    pub const DEFAULT_SUFFIX_LEN: usize = 8;
    pub const DEFAULT_MAX_ATTEMPTS: u32 = 5;

    pub fn new(prefix: impl Into<String>, suffix_len: usize, max_attempts: u32) -> Self {
        Self {
            prefix: prefix.into(),
            suffix_len: suffix_len.max(1),
            max_attempts: max_attempts.max(1),
        }
    }

    /// How many candidates a caller should try before giving up.
    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Suffix length for a given zero-based attempt.
    pub fn suffix_len_for(&self, attempt: u32) -> usize {
        self.suffix_len + 2 * attempt as usize
    }

    /// Returns a candidate number for `attempt` (zero-based).
    ///
    /// ## Example
    /// ```rust
    /// use chrono::NaiveDate;
    /// use rand::{rngs::StdRng, SeedableRng};
    /// use tally_core::numbering::InvoiceNumberGenerator;
    ///
    /// let generator = InvoiceNumberGenerator::default();
    /// let date = NaiveDate::from_ymd_opt(2026, 1, 14).unwrap();
    /// let mut rng = StdRng::seed_from_u64(7);
    ///
    /// let number = generator.candidate("spice-hub", date, 0, &mut rng);
    /// assert!(number.starts_with("INV-SPICEH-20260114-"));
    /// assert_eq!(number.len(), "INV-SPICEH-20260114-".len() + 8);
    /// ```
    pub fn candidate<R: Rng + ?Sized>(
        &self,
        tenant_id: &str,
        date: NaiveDate,
        attempt: u32,
        rng: &mut R,
    ) -> String {
        format!(
            "{}-{}-{}-{}",
            self.prefix,
            tenant_tag(tenant_id),
            date.format("%Y%m%d"),
            random_suffix(self.suffix_len_for(attempt), rng)
        )
    }
}

impl Default for InvoiceNumberGenerator {
    fn default() -> Self {
        Self::new(
            Self::DEFAULT_PREFIX,
            Self::DEFAULT_SUFFIX_LEN,
            Self::DEFAULT_MAX_ATTEMPTS,
        )
    }
}

/// First six alphanumerics of the tenant id, upper-cased.
fn tenant_tag(tenant_id: &str) -> String {
    let tag: String = tenant_id
        .chars()
        .filter(char::is_ascii_alphanumeric)
        .take(TENANT_TAG_LEN)
        .map(|c| c.to_ascii_uppercase())
        .collect();

    if tag.is_empty() {
        "TENANT".to_string()
    } else {
        tag
    }
}

fn random_suffix<R: Rng + ?Sized>(len: usize, rng: &mut R) -> String {
    (0..len)
        .map(|_| SUFFIX_CHARSET[rng.gen_range(0..SUFFIX_CHARSET.len())] as char)
        .collect()
}
