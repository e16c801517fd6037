//! Loan messages, responses and events
//!
//! [`LoanMsg`] is what a signed request carries once its signature has been
//! verified upstream: the signer (`creator`) plus the loan id. Every other
//! input is read from the stored record.

use serde::Serialize;

use super::error::LoanError;
use super::machine::{BlockContext, LoanMachine};
use super::store::LoanStore;
use super::types::{LoanAction, LoanRequest};
use crate::bank::AccountLedger;
use crate::core_types::{Address, BlockHeight, LoanId};

/// Verified request routed to one transition
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoanMsg {
    Request {
        creator: Address,
        request: LoanRequest,
    },
    Approve {
        creator: Address,
        id: LoanId,
    },
    Cancel {
        creator: Address,
        id: LoanId,
    },
    Liquidate {
        creator: Address,
        id: LoanId,
    },
    Repay {
        creator: Address,
        id: LoanId,
    },
}

impl LoanMsg {
    pub fn action(&self) -> LoanAction {
        match self {
            LoanMsg::Request { .. } => LoanAction::Request,
            LoanMsg::Approve { .. } => LoanAction::Approve,
            LoanMsg::Cancel { .. } => LoanAction::Cancel,
            LoanMsg::Liquidate { .. } => LoanAction::Liquidate,
            LoanMsg::Repay { .. } => LoanAction::Repay,
        }
    }

    /// Verified signer
    pub fn creator(&self) -> &Address {
        match self {
            LoanMsg::Request { creator, .. }
            | LoanMsg::Approve { creator, .. }
            | LoanMsg::Cancel { creator, .. }
            | LoanMsg::Liquidate { creator, .. }
            | LoanMsg::Repay { creator, .. } => creator,
        }
    }
}

/// Success acknowledgment. Only `request` returns data (the new id).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum LoanResponse {
    Requested { id: LoanId },
    Ack,
}

/// Emitted once per successful transition
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum LoanEvent {
    Requested {
        id: LoanId,
        borrower: Address,
        height: BlockHeight,
    },
    Approved {
        id: LoanId,
        borrower: Address,
        lender: Address,
        height: BlockHeight,
    },
    Cancelled {
        id: LoanId,
        borrower: Address,
        height: BlockHeight,
    },
    Liquidated {
        id: LoanId,
        borrower: Address,
        lender: Address,
        height: BlockHeight,
    },
    Repayed {
        id: LoanId,
        borrower: Address,
        lender: Address,
        height: BlockHeight,
    },
}

impl<S: LoanStore, L: AccountLedger> LoanMachine<S, L> {
    /// Transition Dispatcher: route a message to its handler
    pub fn dispatch(
        &mut self,
        ctx: &BlockContext,
        msg: LoanMsg,
    ) -> Result<LoanResponse, LoanError> {
        match msg {
            LoanMsg::Request { creator, request } => self
                .request(ctx, &creator, request)
                .map(|id| LoanResponse::Requested { id }),
            LoanMsg::Approve { creator, id } => {
                self.approve(ctx, id, &creator).map(|_| LoanResponse::Ack)
            }
            LoanMsg::Cancel { creator, id } => {
                self.cancel(ctx, id, &creator).map(|_| LoanResponse::Ack)
            }
            LoanMsg::Liquidate { creator, id } => {
                self.liquidate(ctx, id, &creator).map(|_| LoanResponse::Ack)
            }
            LoanMsg::Repay { creator, id } => {
                self.repay(ctx, id, &creator).map(|_| LoanResponse::Ack)
            }
        }
    }
}
