//! Loan error types
//!
//! Every rejected transition surfaces exactly one of these, with no side
//! effects applied.

use thiserror::Error;

use super::state::LoanState;
use super::types::LoanAction;
use crate::bank::LedgerError;
use crate::core_types::{Address, BlockHeight, LoanId};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LoanError {
    // === Lookup ===
    #[error("key {0} doesn't exist")]
    NotFound(LoanId),

    // === Authorization ===
    #[error("Cannot {action}: {caller} is not the {role}")]
    Unauthorized {
        action: LoanAction,
        caller: Address,
        role: &'static str,
    },

    // === Lifecycle ===
    #[error("Wrong loan state: cannot {action} loan {id} in state {state}")]
    InvalidState {
        id: LoanId,
        action: LoanAction,
        state: LoanState,
    },

    #[error("Cannot liquidate before deadline: height {height} < deadline {deadline}")]
    DeadlineNotReached {
        deadline: BlockHeight,
        height: BlockHeight,
    },

    // === Request validation ===
    #[error("Invalid loan request: {0}")]
    InvalidRequest(String),

    // === Stored record corruption ===
    #[error("Loan {id}: malformed {field} '{value}': {reason}")]
    MalformedAmount {
        id: LoanId,
        field: &'static str,
        value: String,
        reason: String,
    },

    #[error("Loan {id}: malformed {field} address '{value}'")]
    MalformedAddress {
        id: LoanId,
        field: &'static str,
        value: String,
    },

    #[error("Loan {id}: corrupt record: {reason}")]
    CorruptRecord { id: LoanId, reason: String },

    // === Ledger ===
    #[error("Ledger transfer failed: {0}")]
    LedgerTransferFailed(#[from] LedgerError),
}

impl LoanError {
    /// Stable error code for logs and responses
    pub fn code(&self) -> &'static str {
        match self {
            LoanError::NotFound(_) => "NOT_FOUND",
            LoanError::Unauthorized { .. } => "UNAUTHORIZED",
            LoanError::InvalidState { .. } => "INVALID_STATE",
            LoanError::DeadlineNotReached { .. } => "DEADLINE_NOT_REACHED",
            LoanError::InvalidRequest(_) => "INVALID_REQUEST",
            LoanError::MalformedAmount { .. } => "MALFORMED_AMOUNT",
            LoanError::MalformedAddress { .. } => "MALFORMED_ADDRESS",
            LoanError::CorruptRecord { .. } => "CORRUPT_RECORD",
            LoanError::LedgerTransferFailed(_) => "LEDGER_TRANSFER_FAILED",
        }
    }

    /// Stored data was invalid. Unreachable for records written by this
    /// crate; seeing one means the store was corrupted upstream.
    pub fn is_invariant_violation(&self) -> bool {
        matches!(
            self,
            LoanError::MalformedAmount { .. }
                | LoanError::MalformedAddress { .. }
                | LoanError::CorruptRecord { .. }
        )
    }
}
