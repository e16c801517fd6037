//! Loan State Machine
//!
//! Validates and applies loan transitions. Every transition follows the
//! same shape:
//!
//! ```text
//! load → authorize → check edge → check timing → stage transfers
//!      → validate batch → commit batch → mutate record → persist → event
//! ```
//!
//! # Atomicity
//!
//! Nothing is written before the batch validates. After validation the
//! only remaining steps are the ledger commit and the record write, so a
//! rejected call leaves balances and records untouched.
//!
//! # Check order
//!
//! existence → authorization → state → timing → balances, for every
//! transition including repay.

use tracing::{debug, error, info, warn};

use super::error::LoanError;
use super::msg::LoanEvent;
use super::state::LoanState;
use super::staging::TransferBatch;
use super::store::LoanStore;
use super::types::{Loan, LoanAction, LoanRequest};
use crate::bank::{Account, AccountLedger};
use crate::core_types::{Address, BlockHeight, LoanId};

/// Execution context of one transition
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockContext {
    pub height: BlockHeight,
}

impl BlockContext {
    pub fn at(height: BlockHeight) -> Self {
        Self { height }
    }
}

/// Loan State Machine over an injected store and ledger
pub struct LoanMachine<S: LoanStore, L: AccountLedger> {
    store: S,
    ledger: L,
    events: Vec<LoanEvent>,
}

impl<S: LoanStore, L: AccountLedger> LoanMachine<S, L> {
    pub fn new(store: S, ledger: L) -> Self {
        Self {
            store,
            ledger,
            events: Vec::new(),
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn ledger(&self) -> &L {
        &self.ledger
    }

    pub fn ledger_mut(&mut self) -> &mut L {
        &mut self.ledger
    }

    pub fn into_parts(self) -> (S, L) {
        (self.store, self.ledger)
    }

    /// Drain events emitted by successful transitions
    pub fn take_events(&mut self) -> Vec<LoanEvent> {
        std::mem::take(&mut self.events)
    }

    // ============================================================
    // QUERIES
    // ============================================================

    /// Load and decode one loan
    pub fn get_loan(&self, id: LoanId) -> Result<Loan, LoanError> {
        self.load(id)
    }

    /// All loans in ascending id order
    pub fn list_loans(&self) -> Result<Vec<Loan>, LoanError> {
        self.store
            .list()
            .iter()
            .map(|stored| Loan::from_stored(stored).inspect_err(log_corruption))
            .collect()
    }

    // ============================================================
    // TRANSITIONS
    // ============================================================

    /// Create a loan in `requested`, escrowing the collateral.
    ///
    /// # Errors
    /// - `InvalidRequest` if amount or collateral is empty or the deadline
    ///   is not in the future
    /// - `LedgerTransferFailed` if the borrower cannot fund the collateral
    pub fn request(
        &mut self,
        ctx: &BlockContext,
        caller: &Address,
        req: LoanRequest,
    ) -> Result<LoanId, LoanError> {
        let result = self.request_inner(ctx, caller, req);
        if let Err(e) = &result {
            log_rejection(LoanAction::Request, None, caller, e);
        }
        result
    }

    /// Fund a requested loan. The caller becomes the lender.
    ///
    /// # Errors
    /// `NotFound`, `InvalidState`, `LedgerTransferFailed`
    pub fn approve(
        &mut self,
        ctx: &BlockContext,
        id: LoanId,
        caller: &Address,
    ) -> Result<(), LoanError> {
        let result = self.approve_inner(ctx, id, caller);
        if let Err(e) = &result {
            log_rejection(LoanAction::Approve, Some(id), caller, e);
        }
        result
    }

    /// Borrower withdraws a requested loan and recovers the collateral.
    ///
    /// # Errors
    /// `NotFound`, `Unauthorized`, `InvalidState`, `LedgerTransferFailed`
    pub fn cancel(
        &mut self,
        ctx: &BlockContext,
        id: LoanId,
        caller: &Address,
    ) -> Result<(), LoanError> {
        let result = self.cancel_inner(ctx, id, caller);
        if let Err(e) = &result {
            log_rejection(LoanAction::Cancel, Some(id), caller, e);
        }
        result
    }

    /// Lender seizes the collateral once the deadline height is reached.
    ///
    /// # Errors
    /// `NotFound`, `Unauthorized`, `InvalidState`, `DeadlineNotReached`,
    /// `LedgerTransferFailed`
    pub fn liquidate(
        &mut self,
        ctx: &BlockContext,
        id: LoanId,
        caller: &Address,
    ) -> Result<(), LoanError> {
        let result = self.liquidate_inner(ctx, id, caller);
        if let Err(e) = &result {
            log_rejection(LoanAction::Liquidate, Some(id), caller, e);
        }
        result
    }

    /// Borrower pays principal and fee to the lender and gets the
    /// collateral back.
    ///
    /// # Errors
    /// `NotFound`, `Unauthorized`, `InvalidState`, `LedgerTransferFailed`
    pub fn repay(
        &mut self,
        ctx: &BlockContext,
        id: LoanId,
        caller: &Address,
    ) -> Result<(), LoanError> {
        let result = self.repay_inner(ctx, id, caller);
        if let Err(e) = &result {
            log_rejection(LoanAction::Repay, Some(id), caller, e);
        }
        result
    }

    fn request_inner(
        &mut self,
        ctx: &BlockContext,
        caller: &Address,
        req: LoanRequest,
    ) -> Result<LoanId, LoanError> {
        if req.amount.is_empty() {
            return Err(LoanError::InvalidRequest("amount must be positive".into()));
        }
        if req.collateral.is_empty() {
            return Err(LoanError::InvalidRequest(
                "collateral must be positive".into(),
            ));
        }
        if req.deadline <= ctx.height {
            return Err(LoanError::InvalidRequest(format!(
                "deadline {} must be after current height {}",
                req.deadline, ctx.height
            )));
        }

        let id = self.store.loan_count();
        let loan = Loan {
            id,
            borrower: caller.clone(),
            lender: None,
            amount: req.amount,
            fee: req.fee,
            collateral: req.collateral,
            deadline: req.deadline,
            state: LoanState::Requested,
        };

        let mut batch = TransferBatch::new();
        batch.push(Account::user(caller), Account::Escrow, &loan.collateral);
        self.settle(batch, &loan)?;

        info!(
            loan_id = id,
            borrower = %caller,
            amount = %loan.amount,
            collateral = %loan.collateral,
            deadline = loan.deadline,
            "Loan requested"
        );
        self.events.push(LoanEvent::Requested {
            id,
            borrower: caller.clone(),
            height: ctx.height,
        });
        Ok(id)
    }

    fn approve_inner(
        &mut self,
        ctx: &BlockContext,
        id: LoanId,
        caller: &Address,
    ) -> Result<(), LoanError> {
        let mut loan = self.load(id)?;
        ensure_transition(&loan, LoanAction::Approve, LoanState::Approved)?;

        let mut batch = TransferBatch::new();
        batch.push(
            Account::user(caller),
            Account::user(&loan.borrower),
            &loan.amount,
        );

        loan.lender = Some(caller.clone());
        loan.state = LoanState::Approved;
        self.settle(batch, &loan)?;

        info!(loan_id = id, lender = %caller, borrower = %loan.borrower, "Loan approved");
        self.events.push(LoanEvent::Approved {
            id,
            borrower: loan.borrower,
            lender: caller.clone(),
            height: ctx.height,
        });
        Ok(())
    }

    fn cancel_inner(
        &mut self,
        ctx: &BlockContext,
        id: LoanId,
        caller: &Address,
    ) -> Result<(), LoanError> {
        let mut loan = self.load(id)?;
        ensure_party(LoanAction::Cancel, caller, Some(&loan.borrower), "borrower")?;
        ensure_transition(&loan, LoanAction::Cancel, LoanState::Cancelled)?;

        let mut batch = TransferBatch::new();
        batch.push(
            Account::Escrow,
            Account::user(&loan.borrower),
            &loan.collateral,
        );

        loan.state = LoanState::Cancelled;
        self.settle(batch, &loan)?;

        info!(loan_id = id, borrower = %caller, "Loan cancelled");
        self.events.push(LoanEvent::Cancelled {
            id,
            borrower: loan.borrower,
            height: ctx.height,
        });
        Ok(())
    }

    fn liquidate_inner(
        &mut self,
        ctx: &BlockContext,
        id: LoanId,
        caller: &Address,
    ) -> Result<(), LoanError> {
        let mut loan = self.load(id)?;
        ensure_party(LoanAction::Liquidate, caller, loan.lender.as_ref(), "lender")?;
        ensure_transition(&loan, LoanAction::Liquidate, LoanState::Liquidated)?;
        if ctx.height < loan.deadline {
            return Err(LoanError::DeadlineNotReached {
                deadline: loan.deadline,
                height: ctx.height,
            });
        }

        let mut batch = TransferBatch::new();
        batch.push(Account::Escrow, Account::user(caller), &loan.collateral);

        loan.state = LoanState::Liquidated;
        self.settle(batch, &loan)?;

        info!(loan_id = id, lender = %caller, height = ctx.height, "Loan liquidated");
        self.events.push(LoanEvent::Liquidated {
            id,
            borrower: loan.borrower,
            lender: caller.clone(),
            height: ctx.height,
        });
        Ok(())
    }

    fn repay_inner(
        &mut self,
        ctx: &BlockContext,
        id: LoanId,
        caller: &Address,
    ) -> Result<(), LoanError> {
        let mut loan = self.load(id)?;
        ensure_party(LoanAction::Repay, caller, Some(&loan.borrower), "borrower")?;
        ensure_transition(&loan, LoanAction::Repay, LoanState::Repayed)?;

        let lender = loan.lender.clone().ok_or_else(|| LoanError::CorruptRecord {
            id,
            reason: "approved loan without lender".into(),
        })?;

        let borrower = Account::user(&loan.borrower);
        let mut batch = TransferBatch::new();
        batch
            .push(borrower.clone(), Account::user(&lender), &loan.amount)
            .push(borrower.clone(), Account::user(&lender), &loan.fee)
            .push(Account::Escrow, borrower, &loan.collateral);

        loan.state = LoanState::Repayed;
        self.settle(batch, &loan)?;

        info!(loan_id = id, borrower = %caller, lender = %lender, "Loan repayed");
        self.events.push(LoanEvent::Repayed {
            id,
            borrower: loan.borrower,
            lender,
            height: ctx.height,
        });
        Ok(())
    }

    // ============================================================
    // HELPERS
    // ============================================================

    fn load(&self, id: LoanId) -> Result<Loan, LoanError> {
        let stored = self.store.get(id).ok_or(LoanError::NotFound(id))?;
        Loan::from_stored(&stored).inspect_err(log_corruption)
    }

    /// Validate the batch, commit it, then persist the already-mutated
    /// record. On any validation failure nothing is written.
    fn settle(&mut self, batch: TransferBatch, loan: &Loan) -> Result<(), LoanError> {
        batch.validate(&self.ledger)?;
        debug!(loan_id = loan.id, legs = batch.legs().len(), "Transfer batch validated");

        if let Err(e) = batch.commit(&mut self.ledger) {
            error!(
                loan_id = loan.id,
                error = %e,
                "INVARIANT VIOLATION: validated batch failed to commit"
            );
            return Err(e.into());
        }

        self.store.put(loan.to_stored());
        Ok(())
    }
}

fn ensure_party(
    action: LoanAction,
    caller: &Address,
    expected: Option<&Address>,
    role: &'static str,
) -> Result<(), LoanError> {
    if expected == Some(caller) {
        Ok(())
    } else {
        Err(LoanError::Unauthorized {
            action,
            caller: caller.clone(),
            role,
        })
    }
}

/// The stored state must have a lifecycle edge to `next`
fn ensure_transition(loan: &Loan, action: LoanAction, next: LoanState) -> Result<(), LoanError> {
    if loan.state.can_transition_to(next) {
        Ok(())
    } else {
        Err(LoanError::InvalidState {
            id: loan.id,
            action,
            state: loan.state,
        })
    }
}

fn log_rejection(action: LoanAction, id: Option<LoanId>, caller: &Address, err: &LoanError) {
    if err.is_invariant_violation() {
        // already reported by log_corruption
        return;
    }
    warn!(
        action = %action,
        loan_id = ?id,
        caller = %caller,
        code = err.code(),
        "Transition rejected: {}",
        err
    );
}

fn log_corruption(err: &LoanError) {
    if err.is_invariant_violation() {
        error!(code = err.code(), "INVARIANT VIOLATION: stored loan corrupt: {}", err);
    }
}
