//! Loan Store
//!
//! Keyed mapping from loan id to stored record. Records are never deleted;
//! terminal loans stay as an audit trail.

use std::collections::BTreeMap;

use super::types::StoredLoan;
use crate::core_types::LoanId;

/// Loan Store collaborator
pub trait LoanStore {
    /// Fetch a record by id
    fn get(&self, id: LoanId) -> Option<StoredLoan>;

    /// Insert or overwrite the record with `loan.id`
    fn put(&mut self, loan: StoredLoan);

    /// Number of ids handed out so far; the next id to assign
    fn loan_count(&self) -> u64;

    /// All records in ascending id order
    fn list(&self) -> Vec<StoredLoan>;
}

/// In-memory store
#[derive(Debug, Default, Clone)]
pub struct MemoryLoanStore {
    loans: BTreeMap<LoanId, StoredLoan>,
    count: u64,
}

impl MemoryLoanStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.loans.len()
    }

    pub fn is_empty(&self) -> bool {
        self.loans.is_empty()
    }
}

impl LoanStore for MemoryLoanStore {
    fn get(&self, id: LoanId) -> Option<StoredLoan> {
        self.loans.get(&id).cloned()
    }

    fn put(&mut self, loan: StoredLoan) {
        self.count = self.count.max(loan.id.saturating_add(1));
        self.loans.insert(loan.id, loan);
    }

    fn loan_count(&self) -> u64 {
        self.count
    }

    fn list(&self) -> Vec<StoredLoan> {
        self.loans.values().cloned().collect()
    }
}
