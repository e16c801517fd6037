//! Core types used throughout the system
//!
//! These are fundamental type aliases and identifiers used by all modules.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Loan ID - assigned sequentially at request time.
///
/// # Constraints:
/// - **Immutable**: Once assigned, NEVER changes
/// - **Sequential**: Assigned contiguously (0, 1, 2, ...)
pub type LoanId = u64;

/// Block height - the logical clock of the ledger.
///
/// Monotonic across the run. Deadlines are compared against it.
pub type BlockHeight = u64;

/// Sequence number for ordering audit entries
pub type SeqNum = u64;

/// Maximum address length (bech32 upper bound)
pub const MAX_ADDRESS_LEN: usize = 90;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AddressError {
    #[error("address is empty")]
    Empty,

    #[error("address too long: {0} chars")]
    TooLong(usize),

    #[error("address missing separator '1': {0}")]
    MissingSeparator(String),

    #[error("invalid character in address: {0}")]
    InvalidCharacter(String),
}

/// Account address.
///
/// Opaque and comparable. Authorization is plain equality against the
/// verified signer; no checksum is verified here.
///
/// # Format
/// `<hrp>1<data>`, lowercase ASCII alphanumerics, at most 90 chars.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Address(String);

impl Address {
    pub fn parse(raw: &str) -> Result<Self, AddressError> {
        if raw.is_empty() {
            return Err(AddressError::Empty);
        }
        if raw.len() > MAX_ADDRESS_LEN {
            return Err(AddressError::TooLong(raw.len()));
        }
        if !raw
            .bytes()
            .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit())
        {
            return Err(AddressError::InvalidCharacter(raw.to_string()));
        }
        // hrp and data must both be non-empty
        match raw.rfind('1') {
            Some(pos) if pos > 0 && pos + 1 < raw.len() => Ok(Self(raw.to_string())),
            _ => Err(AddressError::MissingSeparator(raw.to_string())),
        }
    }

    /// Human-readable prefix (everything before the last '1')
    pub fn prefix(&self) -> &str {
        match self.0.rfind('1') {
            Some(pos) => &self.0[..pos],
            None => "",
        }
    }

    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for Address {
    type Error = AddressError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Address::parse(&value)
    }
}

impl From<Address> for String {
    fn from(addr: Address) -> Self {
        addr.0
    }
}

impl std::str::FromStr for Address {
    type Err = AddressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Address::parse(s)
    }
}
