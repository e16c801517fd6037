//! Coins - multi-denomination monetary value
//!
//! Single source of truth for amount arithmetic and for the text encoding
//! used at the storage boundary (`"100coin,5stake"`).
//!
//! ## Design Principles
//! 1. Normalized form: denominations sorted, no zero entries, no duplicates
//! 2. Explicit errors: overflow and underflow are never silent
//! 3. Private fields: all mutations go through checked methods
//!
//! ## Usage
//! ```rust
//! use loan_ledger::coins::parse_coins;
//!
//! let amount = parse_coins("100coin,5stake").unwrap();
//! assert_eq!(amount.amount_of("coin"), 100);
//! assert_eq!(amount.to_string(), "100coin,5stake");
//! ```

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;

/// Denomination length bounds (first char included)
pub const MIN_DENOM_LEN: usize = 3;
pub const MAX_DENOM_LEN: usize = 128;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CoinsError {
    #[error("Invalid coin format: {0}")]
    InvalidFormat(String),

    #[error("Invalid denomination: {0}")]
    InvalidDenom(String),

    #[error("Duplicate denomination: {0}")]
    DuplicateDenom(String),

    #[error("Amount overflow for {0}")]
    Overflow(String),

    #[error("Insufficient {denom}: have {have}, need {need}")]
    Insufficient { denom: String, have: u128, need: u128 },
}

/// Multi-denomination amount.
///
/// # Invariants (ENFORCED by private field):
/// - No zero-quantity entries
/// - Denominations valid and unique (BTreeMap keeps them sorted)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Coins {
    inner: BTreeMap<String, u128>,
}

impl Coins {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// Quantity held in `denom` (zero if absent)
    #[inline]
    pub fn amount_of(&self, denom: &str) -> u128 {
        self.inner.get(denom).copied().unwrap_or(0)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, u128)> + '_ {
        self.inner.iter().map(|(d, a)| (d.as_str(), *a))
    }

    /// Sum of two values
    ///
    /// # Errors
    /// - `Overflow` if any denomination would exceed u128
    pub fn checked_add(&self, other: &Coins) -> Result<Coins, CoinsError> {
        let mut out = self.clone();
        for (denom, amount) in other.iter() {
            let slot = out.inner.entry(denom.to_string()).or_insert(0);
            *slot = slot
                .checked_add(amount)
                .ok_or_else(|| CoinsError::Overflow(denom.to_string()))?;
        }
        Ok(out)
    }

    /// Difference `self - other`
    ///
    /// # Errors
    /// - `Insufficient` on the first denomination where `self < other`
    pub fn checked_sub(&self, other: &Coins) -> Result<Coins, CoinsError> {
        let mut out = self.clone();
        for (denom, need) in other.iter() {
            let have = out.amount_of(denom);
            if have < need {
                return Err(CoinsError::Insufficient {
                    denom: denom.to_string(),
                    have,
                    need,
                });
            }
            let left = have - need;
            if left == 0 {
                out.inner.remove(denom);
            } else {
                out.inner.insert(denom.to_string(), left);
            }
        }
        Ok(out)
    }
}

impl fmt::Display for Coins {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, (denom, amount)) in self.inner.iter().enumerate() {
            if i > 0 {
                f.write_str(",")?;
            }
            write!(f, "{}{}", amount, denom)?;
        }
        Ok(())
    }
}

impl std::str::FromStr for Coins {
    type Err = CoinsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_coins(s)
    }
}

impl TryFrom<String> for Coins {
    type Error = CoinsError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        parse_coins(&value)
    }
}

impl From<Coins> for String {
    fn from(coins: Coins) -> Self {
        coins.to_string()
    }
}

/// Parse a comma-separated coin list into normalized `Coins`.
///
/// Each entry is `<integer><denom>`. Zero entries are dropped and the
/// empty string is the empty value.
///
/// # Errors
/// - `InvalidFormat` if an entry has no digits, no denom or a fraction
/// - `InvalidDenom` if the denomination breaks the naming rule
/// - `DuplicateDenom` if a denomination appears twice
/// - `Overflow` if the quantity does not fit u128
pub fn parse_coins(raw: &str) -> Result<Coins, CoinsError> {
    let raw = raw.trim();
    let mut coins = Coins::new();
    if raw.is_empty() {
        return Ok(coins);
    }

    let mut seen = Vec::new();
    for part in raw.split(',') {
        let part = part.trim();
        let split = part
            .find(|c: char| !c.is_ascii_digit())
            .ok_or_else(|| CoinsError::InvalidFormat(format!("missing denom in '{}'", part)))?;
        let (digits, denom) = part.split_at(split);
        if digits.is_empty() {
            return Err(CoinsError::InvalidFormat(format!(
                "missing amount in '{}'",
                part
            )));
        }
        validate_denom(denom)?;
        let amount: u128 = digits
            .parse()
            .map_err(|_| CoinsError::Overflow(denom.to_string()))?;

        if seen.iter().any(|d: &&str| *d == denom) {
            return Err(CoinsError::DuplicateDenom(denom.to_string()));
        }
        seen.push(denom);

        if amount > 0 {
            coins.inner.insert(denom.to_string(), amount);
        }
    }
    Ok(coins)
}

/// Denom rule: `[a-zA-Z][a-zA-Z0-9/:._-]{2,127}`
fn validate_denom(denom: &str) -> Result<(), CoinsError> {
    let mut chars = denom.chars();
    let first_ok = chars.next().is_some_and(|c| c.is_ascii_alphabetic());
    let rest_ok = chars.all(|c| c.is_ascii_alphanumeric() || "/:._-".contains(c));
    if !first_ok || !rest_ok || denom.len() < MIN_DENOM_LEN || denom.len() > MAX_DENOM_LEN {
        return Err(CoinsError::InvalidDenom(denom.to_string()));
    }
    Ok(())
}
