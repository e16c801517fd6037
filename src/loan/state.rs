//! Loan lifecycle states
//!
//! Stored as lowercase text at the storage boundary. The misspelled
//! `repayed` is the persisted name and must be kept for compatibility.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Loan states
///
/// ```text
/// requested --approve--> approved --repay-->     repayed
///                        approved --liquidate--> liquidated
/// requested --cancel-->  cancelled
/// ```
/// Terminal states: CANCELLED, LIQUIDATED, REPAYED
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LoanState {
    /// Created, collateral escrowed, waiting for a lender
    Requested,

    /// Funded by a lender, waiting for repayment or deadline
    Approved,

    /// Terminal: withdrawn by the borrower before approval
    Cancelled,

    /// Terminal: collateral seized by the lender after the deadline
    Liquidated,

    /// Terminal: principal and fee paid back, collateral returned
    Repayed,
}

impl LoanState {
    /// Check if this is a terminal state (no more transitions possible)
    #[inline]
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            LoanState::Cancelled | LoanState::Liquidated | LoanState::Repayed
        )
    }

    /// Whether a lender has been recorded in this state
    #[inline]
    pub fn has_lender(&self) -> bool {
        matches!(
            self,
            LoanState::Approved | LoanState::Liquidated | LoanState::Repayed
        )
    }

    /// Whether `self -> next` is an edge of the lifecycle graph
    pub fn can_transition_to(&self, next: LoanState) -> bool {
        matches!(
            (self, next),
            (LoanState::Requested, LoanState::Approved)
                | (LoanState::Requested, LoanState::Cancelled)
                | (LoanState::Approved, LoanState::Repayed)
                | (LoanState::Approved, LoanState::Liquidated)
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            LoanState::Requested => "requested",
            LoanState::Approved => "approved",
            LoanState::Cancelled => "cancelled",
            LoanState::Liquidated => "liquidated",
            LoanState::Repayed => "repayed",
        }
    }

    pub fn from_str_opt(s: &str) -> Option<Self> {
        match s {
            "requested" => Some(LoanState::Requested),
            "approved" => Some(LoanState::Approved),
            "cancelled" => Some(LoanState::Cancelled),
            "liquidated" => Some(LoanState::Liquidated),
            "repayed" => Some(LoanState::Repayed),
            _ => None,
        }
    }
}

impl fmt::Display for LoanState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
