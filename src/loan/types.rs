//! Loan record types
//!
//! Two forms of the same record:
//! - [`StoredLoan`]: text-encoded form kept by the Loan Store
//! - [`Loan`]: typed form used by the state machine
//!
//! Conversion happens once per transition, at load time.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::error::LoanError;
use super::state::LoanState;
use crate::coins::{Coins, parse_coins};
use crate::core_types::{Address, BlockHeight, LoanId};

/// The five operations on a loan
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LoanAction {
    Request,
    Approve,
    Cancel,
    Liquidate,
    Repay,
}

impl LoanAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            LoanAction::Request => "request",
            LoanAction::Approve => "approve",
            LoanAction::Cancel => "cancel",
            LoanAction::Liquidate => "liquidate",
            LoanAction::Repay => "repay",
        }
    }

    pub fn from_str_opt(s: &str) -> Option<Self> {
        match s {
            "request" => Some(LoanAction::Request),
            "approve" => Some(LoanAction::Approve),
            "cancel" => Some(LoanAction::Cancel),
            "liquidate" => Some(LoanAction::Liquidate),
            "repay" => Some(LoanAction::Repay),
            _ => None,
        }
    }
}

impl fmt::Display for LoanAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Storage form. Every field except `id` is text; `lender` is empty
/// until approval.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredLoan {
    pub id: LoanId,
    pub amount: String,
    pub fee: String,
    pub collateral: String,
    pub deadline: String,
    pub state: String,
    pub borrower: String,
    pub lender: String,
}

/// Typed loan record
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Loan {
    pub id: LoanId,
    pub borrower: Address,
    pub lender: Option<Address>,
    pub amount: Coins,
    pub fee: Coins,
    pub collateral: Coins,
    pub deadline: BlockHeight,
    pub state: LoanState,
}

impl Loan {
    /// Decode and validate a stored record.
    ///
    /// # Errors
    /// - `MalformedAmount` for unparseable amount/fee/collateral/deadline
    /// - `MalformedAddress` for an invalid borrower or lender
    /// - `CorruptRecord` for an unknown state or a lender that disagrees
    ///   with the state
    pub fn from_stored(stored: &StoredLoan) -> Result<Self, LoanError> {
        let id = stored.id;
        let coins = |field: &'static str, value: &str| {
            parse_coins(value).map_err(|e| LoanError::MalformedAmount {
                id,
                field,
                value: value.to_string(),
                reason: e.to_string(),
            })
        };
        let address = |field: &'static str, value: &str| {
            Address::parse(value).map_err(|_| LoanError::MalformedAddress {
                id,
                field,
                value: value.to_string(),
            })
        };

        let state =
            LoanState::from_str_opt(&stored.state).ok_or_else(|| LoanError::CorruptRecord {
                id,
                reason: format!("unknown state '{}'", stored.state),
            })?;
        let borrower = address("borrower", &stored.borrower)?;
        let lender = if stored.lender.is_empty() {
            None
        } else {
            Some(address("lender", &stored.lender)?)
        };
        if lender.is_some() != state.has_lender() {
            return Err(LoanError::CorruptRecord {
                id,
                reason: format!("lender '{}' inconsistent with state {}", stored.lender, state),
            });
        }

        let deadline = stored
            .deadline
            .parse::<BlockHeight>()
            .map_err(|e| LoanError::MalformedAmount {
                id,
                field: "deadline",
                value: stored.deadline.clone(),
                reason: e.to_string(),
            })?;

        Ok(Self {
            id,
            borrower,
            lender,
            amount: coins("amount", &stored.amount)?,
            fee: coins("fee", &stored.fee)?,
            collateral: coins("collateral", &stored.collateral)?,
            deadline,
            state,
        })
    }

    /// Encode back to the storage form
    pub fn to_stored(&self) -> StoredLoan {
        StoredLoan {
            id: self.id,
            amount: self.amount.to_string(),
            fee: self.fee.to_string(),
            collateral: self.collateral.to_string(),
            deadline: self.deadline.to_string(),
            state: self.state.as_str().to_string(),
            borrower: self.borrower.to_string(),
            lender: self
                .lender
                .as_ref()
                .map(Address::to_string)
                .unwrap_or_default(),
        }
    }
}

/// Terms proposed by a borrower
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoanRequest {
    pub amount: Coins,
    pub fee: Coins,
    pub collateral: Coins,
    pub deadline: BlockHeight,
}

impl LoanRequest {
    /// Parse text-encoded terms.
    ///
    /// # Errors
    /// - `InvalidRequest` naming the first field that fails to parse
    pub fn parse(
        amount: &str,
        fee: &str,
        collateral: &str,
        deadline: &str,
    ) -> Result<Self, LoanError> {
        let coins = |field: &str, value: &str| {
            parse_coins(value)
                .map_err(|e| LoanError::InvalidRequest(format!("{} '{}': {}", field, value, e)))
        };
        Ok(Self {
            amount: coins("amount", amount)?,
            fee: coins("fee", fee)?,
            collateral: coins("collateral", collateral)?,
            deadline: deadline.trim().parse().map_err(|_| {
                LoanError::InvalidRequest(format!("deadline '{}' is not a block height", deadline))
            })?,
        })
    }
}
