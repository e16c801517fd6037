//! Bank - Account Ledger
//!
//! Holds fungible balances per user address and for the module-owned
//! escrow account. The loan state machine only talks to the
//! [`AccountLedger`] trait; [`MemoryBank`] is the in-process implementation
//! used by the replay binary and by tests.
//!
//! # Escrow
//!
//! The escrow is ONE pooled balance shared by every loan. It is not split
//! per loan, so correctness of releases depends on loan bookkeeping.

use crate::coins::{Coins, CoinsError};
use crate::core_types::Address;
use rustc_hash::FxHashMap;
use serde::Serialize;
use std::fmt;
use thiserror::Error;

/// Name of the module escrow account in logs and dumps
pub const ESCROW_ACCOUNT_NAME: &str = "module:loan";

/// A balance holder: a user address or the module escrow
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum Account {
    User(Address),
    Escrow,
}

impl Account {
    pub fn user(addr: &Address) -> Self {
        Account::User(addr.clone())
    }
}

impl fmt::Display for Account {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Account::User(addr) => write!(f, "{}", addr),
            Account::Escrow => f.write_str(ESCROW_ACCOUNT_NAME),
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LedgerError {
    #[error("Insufficient funds in {account}: {reason}")]
    InsufficientFunds { account: String, reason: CoinsError },

    #[error("Balance overflow in {account}: {reason}")]
    Overflow { account: String, reason: CoinsError },
}

impl LedgerError {
    pub fn code(&self) -> &'static str {
        match self {
            LedgerError::InsufficientFunds { .. } => "INSUFFICIENT_FUNDS",
            LedgerError::Overflow { .. } => "BALANCE_OVERFLOW",
        }
    }
}

/// Account Ledger collaborator
///
/// User-to-user moves and escrow moves are separate operations, so an
/// implementation can restrict escrow access to the loan module. Each
/// call is all-or-nothing: on error no balance changes.
pub trait AccountLedger {
    /// Current balance of an account (empty if unknown)
    fn balance(&self, account: &Account) -> Coins;

    /// Move `amount` between two user accounts
    fn transfer(&mut self, from: &Address, to: &Address, amount: &Coins)
    -> Result<(), LedgerError>;

    /// Move `amount` out of the module escrow to a user
    fn transfer_from_escrow(&mut self, to: &Address, amount: &Coins) -> Result<(), LedgerError>;

    /// Move `amount` from a user into the module escrow
    fn transfer_to_escrow(&mut self, from: &Address, amount: &Coins) -> Result<(), LedgerError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum MovementOp {
    Debit,
    Credit,
}

impl MovementOp {
    pub fn as_str(&self) -> &'static str {
        match self {
            MovementOp::Debit => "debit",
            MovementOp::Credit => "credit",
        }
    }
}

/// One per-denomination balance change recorded by [`MemoryBank`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Movement {
    pub account: Account,
    pub denom: String,
    pub op: MovementOp,
    pub delta: u128,
    pub balance_after: u128,
}

/// In-memory ledger
///
/// Records every balance change in a movement journal so the audit log
/// can be written without the state machine knowing about it.
#[derive(Debug, Default)]
pub struct MemoryBank {
    balances: FxHashMap<Account, Coins>,
    journal: Vec<Movement>,
}

impl MemoryBank {
    pub fn new() -> Self {
        Self::default()
    }

    /// Genesis funding. Not journaled as a transfer.
    pub fn mint(&mut self, to: &Address, amount: &Coins) -> Result<(), LedgerError> {
        let account = Account::user(to);
        let current = self.balance(&account);
        let updated = current
            .checked_add(amount)
            .map_err(|reason| LedgerError::Overflow {
                account: account.to_string(),
                reason,
            })?;
        self.balances.insert(account, updated);
        Ok(())
    }

    /// All non-empty accounts, sorted for stable dumps
    pub fn accounts(&self) -> Vec<(&Account, &Coins)> {
        let mut out: Vec<_> = self.balances.iter().filter(|(_, c)| !c.is_empty()).collect();
        out.sort_by(|a, b| a.0.cmp(b.0));
        out
    }

    /// Drain recorded movements
    pub fn take_movements(&mut self) -> Vec<Movement> {
        std::mem::take(&mut self.journal)
    }

    fn record(&mut self, account: &Account, after: &Coins, op: MovementOp, amount: &Coins) {
        for (denom, delta) in amount.iter() {
            self.journal.push(Movement {
                account: account.clone(),
                denom: denom.to_string(),
                op,
                delta,
                balance_after: after.amount_of(denom),
            });
        }
    }

    fn move_funds(
        &mut self,
        from: &Account,
        to: &Account,
        amount: &Coins,
    ) -> Result<(), LedgerError> {
        if amount.is_empty() {
            return Ok(());
        }

        // Validate first
        let from_after =
            self.balance(from)
                .checked_sub(amount)
                .map_err(|reason| LedgerError::InsufficientFunds {
                    account: from.to_string(),
                    reason,
                })?;
        if from == to {
            return Ok(());
        }
        let to_after = self
            .balance(to)
            .checked_add(amount)
            .map_err(|reason| LedgerError::Overflow {
                account: to.to_string(),
                reason,
            })?;

        // Apply
        self.record(from, &from_after, MovementOp::Debit, amount);
        self.record(to, &to_after, MovementOp::Credit, amount);
        self.balances.insert(from.clone(), from_after);
        self.balances.insert(to.clone(), to_after);
        Ok(())
    }
}

impl AccountLedger for MemoryBank {
    fn balance(&self, account: &Account) -> Coins {
        self.balances.get(account).cloned().unwrap_or_default()
    }

    fn transfer(
        &mut self,
        from: &Address,
        to: &Address,
        amount: &Coins,
    ) -> Result<(), LedgerError> {
        self.move_funds(&Account::user(from), &Account::user(to), amount)
    }

    fn transfer_from_escrow(&mut self, to: &Address, amount: &Coins) -> Result<(), LedgerError> {
        self.move_funds(&Account::Escrow, &Account::user(to), amount)
    }

    fn transfer_to_escrow(&mut self, from: &Address, amount: &Coins) -> Result<(), LedgerError> {
        self.move_funds(&Account::user(from), &Account::Escrow, amount)
    }
}
