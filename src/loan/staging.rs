//! Transfer staging
//!
//! A transition collects all of its ledger movements into a
//! [`TransferBatch`], validates the whole batch against current balances,
//! and only then commits. Validation replays the legs in order on a
//! scratch copy, so an account debited twice is checked against its
//! combined outflow.
//!
//! With single-threaded execution nothing can change balances between
//! `validate` and `commit`, so a validated batch commits fully.

use rustc_hash::FxHashMap;

use crate::bank::{Account, AccountLedger, LedgerError};
use crate::coins::Coins;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferLeg {
    pub from: Account,
    pub to: Account,
    pub amount: Coins,
}

#[derive(Debug, Default, Clone)]
pub struct TransferBatch {
    legs: Vec<TransferLeg>,
}

impl TransferBatch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a leg. Empty amounts are skipped.
    pub fn push(&mut self, from: Account, to: Account, amount: &Coins) -> &mut Self {
        if !amount.is_empty() {
            self.legs.push(TransferLeg {
                from,
                to,
                amount: amount.clone(),
            });
        }
        self
    }

    pub fn legs(&self) -> &[TransferLeg] {
        &self.legs
    }

    /// Check that every leg would succeed, in order, without touching the
    /// ledger.
    pub fn validate<L: AccountLedger + ?Sized>(&self, ledger: &L) -> Result<(), LedgerError> {
        let mut scratch: FxHashMap<&Account, Coins> = FxHashMap::default();

        for leg in &self.legs {
            let from_bal = scratch
                .get(&leg.from)
                .cloned()
                .unwrap_or_else(|| ledger.balance(&leg.from));
            let from_after = from_bal.checked_sub(&leg.amount).map_err(|reason| {
                LedgerError::InsufficientFunds {
                    account: leg.from.to_string(),
                    reason,
                }
            })?;

            // A self-transfer only has to be covered; the balance stays put
            if leg.from == leg.to {
                continue;
            }
            scratch.insert(&leg.from, from_after);

            let to_bal = scratch
                .get(&leg.to)
                .cloned()
                .unwrap_or_else(|| ledger.balance(&leg.to));
            let to_after =
                to_bal
                    .checked_add(&leg.amount)
                    .map_err(|reason| LedgerError::Overflow {
                        account: leg.to.to_string(),
                        reason,
                    })?;
            scratch.insert(&leg.to, to_after);
        }
        Ok(())
    }

    /// Apply every leg in order. Call only after `validate`.
    ///
    /// Escrow legs go through the ledger's escrow operations; only
    /// user-to-user legs use the plain transfer.
    pub fn commit<L: AccountLedger + ?Sized>(self, ledger: &mut L) -> Result<(), LedgerError> {
        for leg in &self.legs {
            match (&leg.from, &leg.to) {
                (Account::User(from), Account::User(to)) => {
                    ledger.transfer(from, to, &leg.amount)?
                }
                (Account::User(from), Account::Escrow) => {
                    ledger.transfer_to_escrow(from, &leg.amount)?
                }
                (Account::Escrow, Account::User(to)) => {
                    ledger.transfer_from_escrow(to, &leg.amount)?
                }
                (Account::Escrow, Account::Escrow) => {}
            }
        }
        Ok(())
    }
}
